//! Gateway configuration.
//!
//! Built once at startup from CLI flags / environment and handed to the
//! gateway by value. Nothing in the invocation path reads the environment.

use anyhow::{Result, bail};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::exec::InvocationRequest;

/// Upper bound accepted for any single invocation timeout (seconds).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Startup flags shared by every subcommand that builds a gateway.
#[derive(Args, Debug, Clone)]
pub struct GatewayArgs {
    /// tdl binary (name resolved through PATH, or an explicit path)
    #[arg(long = "tdl-bin", env = "TDL_BIN", default_value = "tdl", value_name = "PATH")]
    pub tdl_bin: String,

    /// Hard ceiling applied to every per-call timeoutSec
    #[arg(
        long = "max-timeout-sec",
        env = "TDL_MCP_MAX_TIMEOUT_SEC",
        default_value_t = MAX_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS),
        value_name = "SECS"
    )]
    pub max_timeout_sec: u64,

    /// Default working directory for spawned tdl processes
    #[arg(long = "workdir", env = "TDL_MCP_WORKDIR", value_name = "DIR")]
    pub workdir: Option<PathBuf>,
}

impl GatewayArgs {
    /// The same settings as root flags, for spawning this executable as a server.
    pub fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "--tdl-bin".to_string(),
            self.tdl_bin.clone(),
            "--max-timeout-sec".to_string(),
            self.max_timeout_sec.to_string(),
        ];
        if let Some(dir) = &self.workdir {
            args.push("--workdir".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }
        args
    }
}

/// Immutable settings consulted by every invocation.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub binary: String,
    pub max_timeout: Duration,
    pub default_cwd: Option<PathBuf>,
}

impl GatewayConfig {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            max_timeout: Duration::from_secs(MAX_TIMEOUT_SECS),
            default_cwd: None,
        }
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = max_timeout;
        self
    }

    pub fn with_default_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.default_cwd = cwd;
        self
    }

    /// Reject settings that would make every invocation fail the same way.
    pub fn validate(&self) -> Result<()> {
        if self.binary.trim().is_empty() {
            bail!("tdl binary must not be empty");
        }
        if self.max_timeout.is_zero() || self.max_timeout > Duration::from_secs(MAX_TIMEOUT_SECS) {
            bail!(
                "max timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds (got {:?})",
                self.max_timeout
            );
        }
        if let Some(dir) = &self.default_cwd
            && !dir.is_dir()
        {
            bail!("working directory is not a directory: {}", dir.display());
        }
        Ok(())
    }

    /// Start an invocation of the configured binary with the default cwd.
    pub fn request(&self, argv: Vec<String>) -> InvocationRequest {
        InvocationRequest::new(self.binary.clone(), argv).cwd(self.default_cwd.clone())
    }
}

impl TryFrom<&GatewayArgs> for GatewayConfig {
    type Error = anyhow::Error;

    fn try_from(args: &GatewayArgs) -> Result<Self> {
        let config = GatewayConfig::new(args.tdl_bin.trim())
            .with_max_timeout(Duration::from_secs(args.max_timeout_sec))
            .with_default_cwd(args.workdir.clone());
        config.validate()?;
        Ok(config)
    }
}
