/*!
shared.rs - helpers for the self-check client subcommands (`tools`, `call`).

Focus:
  - connect / fetch_tools: spawn the target MCP server over stdio, list tools
  - find_tool_case_insensitive
  - build_arguments_from_schema + primitive coercion of CLI strings
  - text_blocks: pull text content out of a tool result
*/

use anyhow::{Context, Result};
use rmcp::RoleClient;
use rmcp::ServiceExt;
use rmcp::service::RunningService;
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Instant;
use tokio::process::Command;

use crate::mcp::TargetSpec;

/* ---- Data Structures ---- */

/// Tools reported by a target server.
#[derive(Debug)]
pub struct ToolList {
    /// Raw tool objects (name, description, inputSchema, ...)
    pub tools: Vec<Value>,
    /// Spawn + handshake + list, in milliseconds
    pub elapsed_ms: u128,
}

impl ToolList {
    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

/// A parameter value before schema coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Provided {
    /// From `--param KEY=VALUE`; coerced using the schema type
    Raw(String),
    /// From a param file; already typed, passed through untouched
    Typed(Value),
}

/* ---- Spawn / Connect ---- */

/// Spawn the target and complete the MCP handshake.
pub async fn connect(spec: &TargetSpec) -> Result<RunningService<RoleClient, ()>> {
    let transport = TokioChildProcess::new(Command::new(&spec.program).configure(|c| {
        c.args(&spec.args);
        // Child logs go to stderr; keep them out of our output.
        c.stderr(std::process::Stdio::null());
    }))
    .with_context(|| format!("Failed to spawn MCP server: {spec}"))?;

    let service = ()
        .serve(transport)
        .await
        .with_context(|| format!("MCP handshake failed: {spec}"))?;
    tracing::debug!(target_spec = %spec, peer = ?service.peer_info(), "connected");
    Ok(service)
}

/// Spawn, list tools, shut down.
pub async fn fetch_tools(spec: &TargetSpec) -> Result<ToolList> {
    let started = Instant::now();
    let service = connect(spec).await?;

    let tools_resp = service
        .list_tools(Default::default())
        .await
        .context("Failed to list tools from MCP server")?;

    if let Err(e) = service.cancel().await {
        tracing::debug!(error = %e, "shutdown after list_tools failed");
    }

    let tools = serde_json::to_value(&tools_resp)
        .context("Failed to serialize tool list")?
        .get("tools")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(ToolList {
        tools,
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/* ---- Tool Object Utilities ---- */

/// Find a tool by name, ignoring ASCII case.
pub fn find_tool_case_insensitive<'a>(tools: &'a [Value], name: &str) -> Option<&'a Value> {
    tools.iter().find(|t| {
        t.get("name")
            .and_then(|v| v.as_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    })
}

/// Canonical name of a tool object (falls back to `<unnamed>`).
pub fn tool_name(tool: &Value) -> &str {
    tool.get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("<unnamed>")
}

/* ---- Argument Building / Schema Handling ---- */

/// Primary JSON type of a schema property. `["number","null"]` -> "number".
fn schema_type(prop: &Value) -> &str {
    match prop.get("type") {
        Some(Value::String(s)) => s,
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null")
            .unwrap_or("string"),
        _ => "string",
    }
}

/// Build a JSON arguments object for a tool from its `inputSchema`.
///
/// - Raw values are coerced by declared property type
///   (integer | number | boolean | array | string).
/// - Typed values (param file) pass through unchanged.
/// - Keys not in the schema pass through (raw ones as strings); the server decides.
/// - Missing required properties are an error.
pub fn build_arguments_from_schema(
    tool: &Value,
    provided: &HashMap<String, Provided>,
) -> Result<Map<String, Value>> {
    let schema = tool
        .get("inputSchema")
        .or_else(|| tool.get("input_schema"))
        .and_then(|v| v.as_object());

    let required: Vec<&str> = schema
        .and_then(|s| s.get("required"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|r| r.as_str()).collect())
        .unwrap_or_default();

    let props = schema
        .and_then(|s| s.get("properties"))
        .and_then(|v| v.as_object());

    for name in &required {
        if !provided.contains_key(*name) {
            anyhow::bail!("missing required parameter: {name}");
        }
    }

    let mut result = Map::new();
    for (key, value) in provided {
        let coerced = match value {
            Provided::Typed(v) => v.clone(),
            Provided::Raw(raw) => {
                let ptype = props
                    .and_then(|p| p.get(key))
                    .map(schema_type)
                    .unwrap_or("string");
                coerce_value(raw, ptype)
            }
        };
        result.insert(key.clone(), coerced);
    }
    Ok(result)
}

/// Coerce a raw CLI string into a JSON value using a primitive type hint.
/// Unparseable input stays a string so the server reports the mismatch.
pub fn coerce_value(raw: &str, type_hint: &str) -> Value {
    match type_hint {
        "integer" => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        "number" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        "boolean" => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "0" | "no" | "n" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        "array" => Value::Array(
            raw.split(',')
                .map(|s| Value::String(s.trim().to_string()))
                .collect(),
        ),
        _ => Value::String(raw.to_string()),
    }
}

/* ---- Result Handling ---- */

/// Text of every text content block in a tool result, in order.
pub fn text_blocks(call_result: &rmcp::model::CallToolResult) -> Vec<String> {
    serde_json::to_value(call_result)
        .ok()
        .and_then(|v| v.get("content").and_then(|c| c.as_array()).cloned())
        .unwrap_or_default()
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .map(str::to_string)
        .collect()
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool() -> Value {
        json!({
            "name": "tdl_download",
            "inputSchema": {
                "type": "object",
                "required": ["chat"],
                "properties": {
                    "chat": {"type": "string"},
                    "threads": {"type": ["integer", "null"]},
                    "timeoutSec": {"type": ["number", "null"]},
                    "group": {"type": ["boolean", "null"]},
                    "url": {"type": "array", "items": {"type": "string"}}
                }
            }
        })
    }

    fn raw(v: &str) -> Provided {
        Provided::Raw(v.to_string())
    }

    #[test]
    fn coerce_integer() {
        assert_eq!(coerce_value("42", "integer"), json!(42));
        assert_eq!(
            coerce_value("x42", "integer"),
            json!("x42"),
            "invalid integer remains string"
        );
    }

    #[test]
    fn coerce_boolean() {
        assert_eq!(coerce_value("true", "boolean"), json!(true));
        assert_eq!(coerce_value("No", "boolean"), json!(false));
        assert_eq!(coerce_value("maybe", "boolean"), json!("maybe"));
    }

    #[test]
    fn coerce_array() {
        assert_eq!(coerce_value("a,b, c", "array"), json!(["a", "b", "c"]));
    }

    #[test]
    fn nullable_types_use_primary_type() {
        let mut provided = HashMap::new();
        provided.insert("chat".to_string(), raw("me"));
        provided.insert("threads".to_string(), raw("8"));
        provided.insert("timeoutSec".to_string(), raw("2.5"));
        provided.insert("group".to_string(), raw("yes"));
        provided.insert("url".to_string(), raw("https://t.me/a/1,https://t.me/a/2"));

        let args = build_arguments_from_schema(&tool(), &provided).unwrap();
        assert_eq!(args["chat"], json!("me"));
        assert_eq!(args["threads"], json!(8));
        assert_eq!(args["timeoutSec"], json!(2.5));
        assert_eq!(args["group"], json!(true));
        assert_eq!(args["url"], json!(["https://t.me/a/1", "https://t.me/a/2"]));
    }

    #[test]
    fn typed_values_pass_through() {
        let mut provided = HashMap::new();
        provided.insert("chat".to_string(), raw("me"));
        provided.insert("url".to_string(), Provided::Typed(json!(["a,b"])));
        let args = build_arguments_from_schema(&tool(), &provided).unwrap();
        assert_eq!(args["url"], json!(["a,b"]), "file arrays are not re-split");
    }

    #[test]
    fn missing_required_is_error() {
        let provided = HashMap::new();
        let err = build_arguments_from_schema(&tool(), &provided).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: chat"));
    }

    #[test]
    fn find_tool_ignores_case() {
        let tools = vec![json!({"name": "tdl_help"}), json!({"name": "tdl_exec"})];
        let found = find_tool_case_insensitive(&tools, "TDL_EXEC").unwrap();
        assert_eq!(tool_name(found), "tdl_exec");
        assert!(find_tool_case_insensitive(&tools, "tdl_dl").is_none());
    }

    #[test]
    fn text_blocks_extracts_text() {
        let result = rmcp::model::CallToolResult::success(vec![rmcp::model::Content::text(
            "Exit Code: 0\n",
        )]);
        assert_eq!(text_blocks(&result), vec!["Exit Code: 0\n".to_string()]);
    }
}
