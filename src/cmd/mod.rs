/*!
Subcommand dispatcher module.

  serve   (serve.rs)  run the gateway as an MCP stdio server (default)
  tools   (tools.rs)  self-check: spawn a gateway, list its tools
  call    (call.rs)   self-check: spawn a gateway, invoke one tool
  shared  (shared.rs) spawn/connect, schema-driven argument building

Conventions:
  - Each subcommand module exposes one public `execute_*` function
    returning `anyhow::Result<()>`.
  - Argument structs derive `clap::Args` and are kept minimal.
*/

pub mod call;
pub mod serve;
pub mod shared;
pub mod tools;

pub use call::{CallArgs, execute_call};
pub use serve::execute_serve;
pub use tools::{ToolsArgs, execute_tools};
