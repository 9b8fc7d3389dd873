/*!
`tools.rs`

Implements the `tools` subcommand: spawn a gateway (by default this
executable's `serve`), complete the MCP handshake and list the registered
tools. Doubles as a smoke test of a deployed configuration.

JSON Output Shape:
{
  "status": "ok",
  "target": "<command line>",
  "elapsed_ms": 12,
  "count": 7,
  "tools": [
    { "name": "tdl_help", "description": "...", "params": ["command", "namespace", ...] }
  ]
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use crate::cmd::shared::{ToolList, fetch_tools, tool_name};
use crate::config::GatewayArgs;
use crate::mcp;

/// CLI arguments for `tdl-mcp tools`
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,

    /// MCP server command line to spawn (falls back to TDL_MCP_TARGET, then this executable)
    #[arg(short = 't', long)]
    pub target: Option<String>,
}

/// Entry point for the tools subcommand.
pub fn execute_tools(args: ToolsArgs, gateway: &GatewayArgs) -> Result<()> {
    let spec = mcp::resolve_target(args.target.as_deref(), gateway)?;
    let rt = tokio::runtime::Runtime::new()?;
    let tool_list = rt.block_on(fetch_tools(&spec))?;
    tracing::debug!(count = tool_list.count(), elapsed_ms = %tool_list.elapsed_ms, "listed tools");

    if args.json {
        println!("{}", tools_json(&spec.original, &tool_list));
    } else {
        print!("{}", tools_text(&spec.to_string(), &tool_list));
    }
    Ok(())
}

/// Property names declared in a tool's input schema, sorted.
fn param_names(tool: &Value) -> Vec<String> {
    let mut names: Vec<String> = tool
        .get("inputSchema")
        .and_then(|s| s.get("properties"))
        .and_then(|p| p.as_object())
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();
    names.sort();
    names
}

fn description(tool: &Value) -> String {
    tool.get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .replace('\n', " ")
}

fn tools_json(target: &str, list: &ToolList) -> Value {
    let items: Vec<Value> = list
        .tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": tool_name(t),
                "description": description(t),
                "params": param_names(t),
            })
        })
        .collect();
    serde_json::json!({
        "status": "ok",
        "target": target,
        "elapsed_ms": list.elapsed_ms,
        "count": list.count(),
        "tools": items,
    })
}

fn tools_text(target: &str, list: &ToolList) -> String {
    let mut out = format!(
        "Tools ({}) - {target} [{} ms]\n",
        list.count(),
        list.elapsed_ms
    );
    if list.tools.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    let width = list
        .tools
        .iter()
        .map(|t| tool_name(t).len())
        .max()
        .unwrap_or(0);
    for (idx, t) in list.tools.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {:<width$}  {}\n",
            idx + 1,
            tool_name(t),
            description(t)
        ));
        let params = param_names(t);
        if !params.is_empty() {
            out.push_str(&format!("     {:<width$}  params: {}\n", "", params.join(", ")));
        }
    }
    out
}
