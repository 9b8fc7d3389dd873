//! MCP server: the tool router that exposes tdl subcommands.
//!
//! Each `#[tool]` handler deserializes its parameters, then hands them to
//! `dispatch`, which validates, builds the argv, runs tdl and renders the
//! outcome. Execution failures come back as normal tool results; only bad
//! parameters produce `invalid_params`.

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, ErrorData, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ServerHandler, tool, tool_handler, tool_router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::params::{
    ChatExportParams, ChatListParams, ChatUsersParams, DownloadParams, ExecParams, HelpParams,
    Operation, UploadParams,
};
use crate::config::GatewayConfig;
use crate::exec::{self, render::render};

const INSTRUCTIONS: &str = "Tools wrapping the tdl Telegram CLI. Start with tdl_help to see \
available subcommands. Every tool accepts `namespace` (tdl session), `timeoutSec` and \
`response_format` (markdown|json). Failures (non-zero exit, timeout, missing binary) are \
reported inside the result text; combined stdout+stderr is capped at 25000 characters.";

#[derive(Clone)]
pub struct TdlGateway {
    config: Arc<GatewayConfig>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TdlGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Run tdl with an explicit argument vector (no shell). Use for subcommands without a dedicated tool. Default timeout 300s."
    )]
    async fn tdl_exec(
        &self,
        Parameters(params): Parameters<ExecParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(params).await
    }

    #[tool(description = "Show tdl help, optionally for one subcommand (e.g. dl, up, chat).")]
    async fn tdl_help(
        &self,
        Parameters(params): Parameters<HelpParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(params).await
    }

    #[tool(
        description = "Download files from Telegram message links (tdl dl). Default timeout 600s."
    )]
    async fn tdl_download(
        &self,
        Parameters(params): Parameters<DownloadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(params).await
    }

    #[tool(description = "List chats visible to the session (tdl chat ls).")]
    async fn tdl_chat_ls(
        &self,
        Parameters(params): Parameters<ChatListParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(params).await
    }

    #[tool(description = "Export messages of a chat (tdl chat export).")]
    async fn tdl_chat_export(
        &self,
        Parameters(params): Parameters<ChatExportParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(params).await
    }

    #[tool(description = "Export the member list of a channel or group (tdl chat users).")]
    async fn tdl_chat_users(
        &self,
        Parameters(params): Parameters<ChatUsersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(params).await
    }

    #[tool(
        description = "Upload local files or directories to a chat (tdl up). Default timeout 600s."
    )]
    async fn tdl_upload(
        &self,
        Parameters(params): Parameters<UploadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(params).await
    }
}

impl TdlGateway {
    /// Validate -> argv -> run -> render. One process per call.
    async fn dispatch<O: Operation>(&self, op: O) -> Result<CallToolResult, ErrorData> {
        if let Err(e) = op.check() {
            tracing::info!(tool = O::NAME, error = %e, "rejected parameters");
            return Err(e.into());
        }

        let mut request = self.config.request(op.argv()).timeout(op.timeout());
        if let Some(cwd) = op.cwd() {
            request = request.cwd(Some(PathBuf::from(cwd)));
        }

        tracing::info!(
            tool = O::NAME,
            argc = request.argv.len(),
            timeout_secs = request.timeout.as_secs_f64(),
            "invoking tdl"
        );
        tracing::debug!(tool = O::NAME, binary = %request.binary, argv = ?request.argv, "argument vector");

        let started = Instant::now();
        let outcome = exec::run(&request, self.config.max_timeout).await;
        tracing::info!(
            tool = O::NAME,
            exit_code = ?outcome.exit.code(),
            timed_out = outcome.timed_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tdl finished"
        );

        Ok(render(&outcome, op.response_format()).into())
    }
}

#[tool_handler]
impl ServerHandler for TdlGateway {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

/* ---- Tests ---- */
