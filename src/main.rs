use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod error;
mod exec;
mod mcp;
mod utils;

use cmd::{CallArgs, ToolsArgs};
use config::GatewayArgs;

/// tdl-mcp - MCP gateway for the tdl Telegram CLI
///
/// Command layout:
///   tdl-mcp [serve]                       Serve MCP over stdio (default)
///   tdl-mcp tools [--json] [-t "<target>"]
///   tdl-mcp call <TOOL> [--param k=v ...] [--param-file p.yaml] [-t "<target>"] [--json]
///
/// Global flags / env:
///   -v / -vv                 Increase verbosity (logs go to stderr)
///   -q / --quiet             Errors only
///   --tdl-bin / TDL_BIN      tdl executable (default "tdl")
///   --max-timeout-sec        Upper bound for any call (TDL_MCP_MAX_TIMEOUT_SEC)
///   --workdir                Default working directory (TDL_MCP_WORKDIR)
///   TDL_MCP_TARGET           Server command line for `tools` / `call` if -t not given
///
/// Examples:
///   tdl-mcp --tdl-bin /usr/local/bin/tdl
///   tdl-mcp tools
///   tdl-mcp call tdl_help --param command=dl
///   tdl-mcp call tdl_chat_ls --param namespace=work --json
#[derive(Parser, Debug)]
#[command(
    name = "tdl-mcp",
    version,
    author,
    about = "tdl-mcp - run tdl (Telegram downloader) subcommands as MCP tools",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    gateway: GatewayArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the MCP tools over stdio
    Serve,

    /// List the tools a gateway exposes
    Tools(ToolsArgs),

    /// Invoke one tool and print its result
    Call(CallArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd::execute_serve(&cli.gateway),
        Commands::Tools(args) => cmd::execute_tools(args, &cli.gateway),
        Commands::Call(args) => cmd::execute_call(args, &cli.gateway),
    }
}
