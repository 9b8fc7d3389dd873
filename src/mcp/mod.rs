//! MCP side of the gateway: tool parameters, the server, and target parsing
//! for the self-check client (`tools` / `call` subcommands).
//!
//! parse_target -> TargetSpec (program + args, shell-style split)
//! resolve_target: explicit `-t` > TDL_MCP_TARGET env > this executable's `serve`
//! (carrying the caller's --tdl-bin / --max-timeout-sec / --workdir).
//!
use anyhow::{Context, Result, bail};
use shell_words::split as shell_split;
use std::fmt;

use crate::config::GatewayArgs;

pub mod params;
pub mod server;

pub use server::TdlGateway;

/// Environment fallback for the self-check target.
pub const TARGET_ENV: &str = "TDL_MCP_TARGET";

/// A local MCP server command line to spawn.
///
/// Keeps the original input for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub original: String,
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "local: {}", self.program)
        } else {
            write!(f, "local: {} {}", self.program, self.args.join(" "))
        }
    }
}

/// Parse a `--target` value into a `TargetSpec`.
///
/// The string is split with shell-style quoting rules; the first token is
/// the program. Examples:
/// - "tdl-mcp serve" -> program "tdl-mcp", args ["serve"]
/// - r#"./tdl-mcp --tdl-bin "/opt/tdl bin/tdl""# -> args ["--tdl-bin", "/opt/tdl bin/tdl"]
pub fn parse_target(raw: &str) -> Result<TargetSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Target string is empty");
    }

    let parts =
        shell_split(trimmed).context("Failed to parse target command line (shell splitting)")?;
    let Some((program, args)) = parts.split_first() else {
        bail!("No tokens produced when parsing target command line");
    };
    if program.is_empty() {
        bail!("Empty program name in target command line");
    }
    Ok(TargetSpec {
        original: raw.to_string(),
        program: program.clone(),
        args: args.to_vec(),
    })
}

/// This executable serving over stdio with the given gateway settings.
pub fn self_target(gateway: &GatewayArgs) -> Result<TargetSpec> {
    let exe = std::env::current_exe().context("Failed to locate the current executable")?;
    let program = exe.to_string_lossy().into_owned();
    let mut args = gateway.to_cli_args();
    args.push("serve".to_string());
    Ok(TargetSpec {
        original: shell_words::join(std::iter::once(&program).chain(&args)),
        program,
        args,
    })
}

/// Pick the target for the self-check client (flag > env > self).
pub fn resolve_target(explicit: Option<&str>, gateway: &GatewayArgs) -> Result<TargetSpec> {
    if let Some(raw) = explicit.filter(|s| !s.trim().is_empty()) {
        return parse_target(raw).with_context(|| format!("Invalid target '{raw}'"));
    }
    if let Ok(raw) = std::env::var(TARGET_ENV)
        && !raw.trim().is_empty()
    {
        return parse_target(&raw).with_context(|| format!("Invalid {TARGET_ENV} '{raw}'"));
    }
    self_target(gateway)
}
