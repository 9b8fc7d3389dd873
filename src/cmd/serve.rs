/*!
`serve.rs`

Implements the `serve` subcommand (also the default when no subcommand is
given): run the tdl gateway as an MCP server over stdio.

stdout carries JSON-RPC frames only; logs go to stderr. Once the transport
is up, `tdl-mcp: ready` is written to stderr regardless of -q. The server
runs until the client closes the stream.
*/

use anyhow::{Context, Result};
use std::io::Write;
use rmcp::ServiceExt;
use rmcp::transport::stdio;

use crate::config::{GatewayArgs, GatewayConfig};
use crate::mcp::TdlGateway;

/// Readiness line hosts wait for on stderr.
pub const READY_LINE: &str = "tdl-mcp: ready";

/// Entry point for the serve subcommand.
pub fn execute_serve(args: &GatewayArgs) -> Result<()> {
    let config = GatewayConfig::try_from(args).context("Invalid gateway configuration")?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(serve_stdio(config))
}

async fn serve_stdio(config: GatewayConfig) -> Result<()> {
    tracing::info!(
        binary = %config.binary,
        max_timeout_secs = config.max_timeout.as_secs(),
        workdir = ?config.default_cwd,
        "starting tdl gateway"
    );

    let service = TdlGateway::new(config)
        .serve(stdio())
        .await
        .context("Failed to start MCP server on stdio")?;
    announce_ready(&mut std::io::stderr().lock());

    let reason = service
        .waiting()
        .await
        .context("MCP server task failed")?;
    tracing::info!(reason = ?reason, "tdl-mcp: stopped");
    Ok(())
}

/// Print the readiness line outside the log filter.
fn announce_ready<W: Write>(out: &mut W) {
    if let Err(e) = writeln!(out, "{READY_LINE}").and_then(|()| out.flush()) {
        tracing::debug!(error = %e, "failed to write readiness line");
    }
}
