/*!
`call.rs`

Implements the `call` subcommand: spawn a gateway, invoke one tool and print
what it returned. Useful to check a tdl install end to end without an MCP host.

Parameters:
  --param KEY=VALUE               (repeatable; coerced by the tool's input schema)
  --param-file params.(json|yaml) (typed values; CLI --param overrides file entries)

JSON Output Shape:
{
  "status": "ok",
  "tool": "tdl_help",
  "target": "<command line>",
  "elapsed_ms": 42,
  "arguments": { ... },
  "result": { ...raw CallToolResult... }
}

Without --json the text content blocks are printed as-is (the rendered
markdown or JSON payload produced by the gateway).
*/

use anyhow::{Context, Result, bail};
use clap::Args;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Instant;

use crate::cmd::shared::{
    Provided, build_arguments_from_schema, connect, find_tool_case_insensitive, text_blocks,
    tool_name,
};
use crate::config::GatewayArgs;
use crate::mcp::{self, TargetSpec};

/// CLI arguments for `tdl-mcp call`
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name to invoke (case-insensitive)
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). CLI --param overrides file entries
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<String>,

    /// MCP server command line to spawn (falls back to TDL_MCP_TARGET, then this executable)
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Output JSON (arguments plus the raw call result)
    #[arg(long)]
    pub json: bool,
}

/// Entry point for the call subcommand.
pub fn execute_call(args: CallArgs, gateway: &GatewayArgs) -> Result<()> {
    let tool = args.tool.trim();
    if tool.is_empty() {
        bail!("tool name cannot be empty");
    }

    let mut provided = parse_params(&args.params)?;
    if let Some(path) = &args.param_file {
        load_param_file_into_map(path, &mut provided)?;
    }

    let spec = mcp::resolve_target(args.target.as_deref(), gateway)?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let started = Instant::now();
    let (name, arguments, result) = rt.block_on(invoke_tool(&spec, tool, &provided))?;
    let elapsed_ms = started.elapsed().as_millis();
    tracing::debug!(tool = %name, elapsed_ms = %elapsed_ms, "call finished");

    if args.json {
        let out = serde_json::json!({
            "status": "ok",
            "tool": name,
            "target": spec.original,
            "elapsed_ms": elapsed_ms,
            "arguments": arguments,
            "result": serde_json::to_value(&result).context("Failed to serialize call result")?,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for block in text_blocks(&result) {
            println!("{}", block.trim_end_matches('\n'));
        }
    }

    if result.is_error == Some(true) {
        bail!("tool '{name}' reported an error");
    }
    Ok(())
}

/// Spawn the target, resolve the tool, call it and shut down.
async fn invoke_tool(
    spec: &TargetSpec,
    tool: &str,
    provided: &HashMap<String, Provided>,
) -> Result<(String, Map<String, Value>, CallToolResult)> {
    let service = connect(spec).await?;

    let tools_resp = service
        .list_tools(Default::default())
        .await
        .context("Failed to list tools")?;
    let tools = serde_json::to_value(&tools_resp)?
        .get("tools")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let tool_obj = find_tool_case_insensitive(&tools, tool)
        .with_context(|| format!("tool '{tool}' not found"))?;
    let name = tool_name(tool_obj).to_string();
    let arguments =
        build_arguments_from_schema(tool_obj, provided).context("Failed to build arguments")?;

    let result = service
        .call_tool(CallToolRequestParam {
            name: name.clone().into(),
            arguments: if arguments.is_empty() {
                None
            } else {
                Some(arguments.clone())
            },
        })
        .await
        .with_context(|| format!("tool invocation failed: {name}"));

    if let Err(e) = service.cancel().await {
        tracing::debug!(error = %e, "shutdown after call_tool failed");
    }
    Ok((name, arguments, result?))
}

/// Parse repeated `KEY=VALUE` flags.
fn parse_params(raw: &[String]) -> Result<HashMap<String, Provided>> {
    let mut provided = HashMap::new();
    for kv in raw {
        let Some((k, v)) = kv.split_once('=') else {
            bail!("invalid --param (expected KEY=VALUE): {kv}");
        };
        let key = k.trim();
        if key.is_empty() {
            bail!("invalid --param (empty key): {kv}");
        }
        provided.insert(key.to_string(), Provided::Raw(v.trim().to_string()));
    }
    Ok(provided)
}

/// Merge a JSON/YAML param file; keys already given on the CLI are kept.
fn load_param_file_into_map(path: &str, provided: &mut HashMap<String, Provided>) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {path}"))?;
    let lower = path.to_ascii_lowercase();

    let value: Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml_v: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml_v).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    let Value::Object(obj) = value else {
        bail!("param file root must be an object");
    };
    for (k, v) in obj {
        provided.entry(k).or_insert(Provided::Typed(v));
    }
    Ok(())
}
