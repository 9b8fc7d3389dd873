/*!
params.rs - tool parameter shapes, validation and argument-vector builders.

Every tool is one `Operation`:
  NAME                  tool name registered with the router
  DEFAULT_TIMEOUT_SECS  used when the caller omits timeoutSec
  check()               bounds validation (runs before anything is spawned)
  argv()                `-n <namespace>` (if any) + the operation's own tokens

Array-valued flags:
  tdl_download url      repeated:     -u A -u B
  tdl_download include  comma-joined: -i mp4,mp3
  tdl_download exclude  comma-joined: -e jpg,png
  tdl_upload path       repeated:     -p A -p B
Empty arrays emit nothing.
*/

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::MAX_TIMEOUT_SECS;
use crate::error::ParamError;
use crate::exec::render::ResponseFormat;

pub const NAMESPACE_MAX_CHARS: usize = 128;
pub const EXEC_ARG_MAX_CHARS: usize = 2048;
pub const EXEC_ARGV_MAX_ITEMS: usize = 200;
pub const STRING_MAX_CHARS: usize = 4096;
pub const ARRAY_MAX_ITEMS: usize = 200;
pub const MIN_TIMEOUT_SECS: u64 = 1;

/* ---- Shared Parameters ---- */

/// Parameters accepted by every tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommonParams {
    /// tdl namespace (passed as `-n <namespace>`), selects the stored login session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 128))]
    pub namespace: Option<String>,

    /// Process timeout in seconds (1-3600); each tool has its own default
    #[serde(default, rename = "timeoutSec", skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 3600))]
    pub timeout_sec: Option<f64>,

    /// Output encoding: `markdown` (default) or `json`
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl CommonParams {
    fn check(&self) -> Result<(), ParamError> {
        if let Some(ns) = &self.namespace {
            check_len("namespace", ns, NAMESPACE_MAX_CHARS)?;
        }
        if let Some(secs) = self.timeout_sec {
            check_range("timeoutSec", secs, MIN_TIMEOUT_SECS as f64, MAX_TIMEOUT_SECS as f64)?;
        }
        Ok(())
    }
}

/* ---- Operation Trait ---- */

pub trait Operation {
    const NAME: &'static str;
    const DEFAULT_TIMEOUT_SECS: u64;

    fn common(&self) -> &CommonParams;

    /// Operation-specific bounds; shared ones are checked by `check`.
    fn validate(&self) -> Result<(), ParamError> {
        Ok(())
    }

    /// Tokens after the namespace prefix.
    fn tokens(&self) -> Vec<String>;

    fn cwd(&self) -> Option<&str> {
        None
    }

    fn check(&self) -> Result<(), ParamError> {
        self.common().check()?;
        self.validate()
    }

    fn argv(&self) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(ns) = &self.common().namespace {
            argv.push("-n".to_string());
            argv.push(ns.clone());
        }
        argv.extend(self.tokens());
        argv
    }

    fn timeout(&self) -> Duration {
        match self.common().timeout_sec {
            Some(secs) => Duration::from_secs_f64(secs),
            None => Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    fn response_format(&self) -> ResponseFormat {
        self.common().response_format
    }
}

/* ---- Tool Parameters ---- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecParams {
    /// Raw tdl argument vector (without the binary), e.g. ["chat", "ls", "-o", "json"]
    #[schemars(length(min = 1, max = 200))]
    pub argv: Vec<String>,

    /// Working directory for the tdl process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(flatten)]
    pub common: CommonParams,
}

impl Operation for ExecParams {
    const NAME: &'static str = "tdl_exec";
    const DEFAULT_TIMEOUT_SECS: u64 = 300;

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn validate(&self) -> Result<(), ParamError> {
        check_items("argv", &self.argv, 1, EXEC_ARGV_MAX_ITEMS, EXEC_ARG_MAX_CHARS)?;
        if let Some(cwd) = &self.cwd {
            check_required("cwd", cwd, STRING_MAX_CHARS)?;
        }
        Ok(())
    }

    fn tokens(&self) -> Vec<String> {
        self.argv.clone()
    }

    fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HelpParams {
    /// Subcommand to describe (e.g. "dl", "chat"); omit for top-level help
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(flatten)]
    pub common: CommonParams,
}

impl Operation for HelpParams {
    const NAME: &'static str = "tdl_help";
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn validate(&self) -> Result<(), ParamError> {
        if let Some(command) = &self.command {
            check_len("command", command, STRING_MAX_CHARS)?;
        }
        Ok(())
    }

    fn tokens(&self) -> Vec<String> {
        match &self.command {
            Some(command) if !command.is_empty() => vec![command.clone(), "--help".into()],
            _ => vec!["--help".into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DownloadParams {
    /// Message links to download (each becomes `-u <url>`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<String>,

    /// Download directory (`-d`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// File extensions to include, sent comma-joined as one `-i` value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// File extensions to exclude, sent comma-joined as one `-e` value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Download albums / grouped messages as a whole (`--group`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<bool>,

    /// Restart the download from scratch (`--restart`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,

    /// Resume the previous download (`--continue`)
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub resume: Option<bool>,

    /// Parallel download threads (`-t`, 1-128)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 128))]
    pub threads: Option<u32>,

    /// Concurrent download tasks (`-l`, 1-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,

    #[serde(flatten)]
    pub common: CommonParams,
}

impl Operation for DownloadParams {
    const NAME: &'static str = "tdl_download";
    const DEFAULT_TIMEOUT_SECS: u64 = 600;

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn validate(&self) -> Result<(), ParamError> {
        check_items("url", &self.url, 0, ARRAY_MAX_ITEMS, STRING_MAX_CHARS)?;
        check_items("include", &self.include, 0, ARRAY_MAX_ITEMS, STRING_MAX_CHARS)?;
        check_items("exclude", &self.exclude, 0, ARRAY_MAX_ITEMS, STRING_MAX_CHARS)?;
        if let Some(dir) = &self.dir {
            check_required("dir", dir, STRING_MAX_CHARS)?;
        }
        if let Some(threads) = self.threads {
            check_range("threads", f64::from(threads), 1.0, 128.0)?;
        }
        if let Some(limit) = self.limit {
            check_range("limit", f64::from(limit), 1.0, 100.0)?;
        }
        Ok(())
    }

    fn tokens(&self) -> Vec<String> {
        let mut argv = vec!["dl".to_string()];
        for u in &self.url {
            argv.push("-u".into());
            argv.push(u.clone());
        }
        if let Some(dir) = &self.dir {
            argv.push("-d".into());
            argv.push(dir.clone());
        }
        if !self.include.is_empty() {
            argv.push("-i".into());
            argv.push(self.include.join(","));
        }
        if !self.exclude.is_empty() {
            argv.push("-e".into());
            argv.push(self.exclude.join(","));
        }
        if self.group == Some(true) {
            argv.push("--group".into());
        }
        if self.restart == Some(true) {
            argv.push("--restart".into());
        }
        if self.resume == Some(true) {
            argv.push("--continue".into());
        }
        if let Some(threads) = self.threads {
            argv.push("-t".into());
            argv.push(threads.to_string());
        }
        if let Some(limit) = self.limit {
            argv.push("-l".into());
            argv.push(limit.to_string());
        }
        argv
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatListParams {
    #[serde(flatten)]
    pub common: CommonParams,
}

impl Operation for ChatListParams {
    const NAME: &'static str = "tdl_chat_ls";
    const DEFAULT_TIMEOUT_SECS: u64 = 60;

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn tokens(&self) -> Vec<String> {
        vec!["chat".into(), "ls".into()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatExportParams {
    /// Chat ID or link to export
    pub chat: String,

    #[serde(flatten)]
    pub common: CommonParams,
}

impl Operation for ChatExportParams {
    const NAME: &'static str = "tdl_chat_export";
    const DEFAULT_TIMEOUT_SECS: u64 = 120;

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn validate(&self) -> Result<(), ParamError> {
        check_required("chat", &self.chat, STRING_MAX_CHARS)
    }

    fn tokens(&self) -> Vec<String> {
        vec!["chat".into(), "export".into(), "-u".into(), self.chat.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatUsersParams {
    /// Channel / group ID or link
    pub chat: String,

    #[serde(flatten)]
    pub common: CommonParams,
}

impl Operation for ChatUsersParams {
    const NAME: &'static str = "tdl_chat_users";
    const DEFAULT_TIMEOUT_SECS: u64 = 120;

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn validate(&self) -> Result<(), ParamError> {
        check_required("chat", &self.chat, STRING_MAX_CHARS)
    }

    fn tokens(&self) -> Vec<String> {
        vec!["chat".into(), "users".into(), "-u".into(), self.chat.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadParams {
    /// Local files or directories to upload (each becomes `-p <path>`)
    #[schemars(length(min = 1))]
    pub path: Vec<String>,

    /// Destination chat ID or link
    pub chat: String,

    #[serde(flatten)]
    pub common: CommonParams,
}

impl Operation for UploadParams {
    const NAME: &'static str = "tdl_upload";
    const DEFAULT_TIMEOUT_SECS: u64 = 600;

    fn common(&self) -> &CommonParams {
        &self.common
    }

    fn validate(&self) -> Result<(), ParamError> {
        check_items("path", &self.path, 1, ARRAY_MAX_ITEMS, STRING_MAX_CHARS)?;
        check_required("chat", &self.chat, STRING_MAX_CHARS)
    }

    fn tokens(&self) -> Vec<String> {
        let mut argv = vec!["up".to_string(), "-u".into(), self.chat.clone()];
        for p in &self.path {
            argv.push("-p".into());
            argv.push(p.clone());
        }
        argv
    }
}

/* ---- Bounds Helpers ---- */

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ParamError> {
    let got = value.chars().count();
    if got > max {
        return Err(ParamError::TooLong { field, max, got });
    }
    Ok(())
}

fn check_required(field: &'static str, value: &str, max: usize) -> Result<(), ParamError> {
    if value.trim().is_empty() {
        return Err(ParamError::Empty { field });
    }
    check_len(field, value, max)
}

/// Item count within `min..=max`; every item non-empty and at most `item_max` chars.
fn check_items(
    field: &'static str,
    items: &[String],
    min: usize,
    max: usize,
    item_max: usize,
) -> Result<(), ParamError> {
    let got = items.len();
    if got < min {
        return Err(ParamError::TooFewItems { field, min, got });
    }
    if got > max {
        return Err(ParamError::TooManyItems { field, max, got });
    }
    for item in items {
        check_required(field, item, item_max)?;
    }
    Ok(())
}

fn check_range(field: &'static str, got: f64, min: f64, max: f64) -> Result<(), ParamError> {
    if !got.is_finite() || got < min || got > max {
        return Err(ParamError::OutOfRange {
            field,
            min,
            max,
            got,
        });
    }
    Ok(())
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<T: serde::de::DeserializeOwned>(v: serde_json::Value) -> T {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn namespace_is_prepended_for_every_operation() {
        let help: HelpParams = parse(json!({"namespace": "work"}));
        assert_eq!(help.argv(), vec!["-n", "work", "--help"]);

        let ls: ChatListParams = parse(json!({"namespace": "work"}));
        assert_eq!(ls.argv(), vec!["-n", "work", "chat", "ls"]);

        let exec: ExecParams = parse(json!({"argv": ["version"], "namespace": "alt"}));
        assert_eq!(exec.argv(), vec!["-n", "alt", "version"]);
    }

    #[test]
    fn help_with_and_without_command() {
        let top: HelpParams = parse(json!({}));
        assert_eq!(top.argv(), vec!["--help"]);
        let dl: HelpParams = parse(json!({"command": "dl"}));
        assert_eq!(dl.argv(), vec!["dl", "--help"]);
        assert_eq!(dl.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn download_flag_order_and_array_conventions() {
        let p: DownloadParams = parse(json!({
            "url": ["https://t.me/a/1", "https://t.me/a/2"],
            "dir": "/tmp/dl",
            "include": ["mp4", "mp3"],
            "exclude": ["jpg"],
            "group": true,
            "restart": false,
            "continue": true,
            "threads": 8,
            "limit": 4
        }));
        assert_eq!(
            p.argv(),
            vec![
                "dl", "-u", "https://t.me/a/1", "-u", "https://t.me/a/2", "-d", "/tmp/dl", "-i",
                "mp4,mp3", "-e", "jpg", "--group", "--continue", "-t", "8", "-l", "4"
            ]
        );
        assert!(p.check().is_ok());
        assert_eq!(p.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn download_minimal_is_just_subcommand() {
        let p: DownloadParams = parse(json!({}));
        assert_eq!(p.argv(), vec!["dl"]);
    }

    #[test]
    fn download_thread_bounds() {
        let p: DownloadParams = parse(json!({"threads": 129}));
        assert!(matches!(
            p.check(),
            Err(ParamError::OutOfRange { field: "threads", .. })
        ));
        let p: DownloadParams = parse(json!({"limit": 0}));
        assert!(matches!(
            p.check(),
            Err(ParamError::OutOfRange { field: "limit", .. })
        ));
    }

    #[test]
    fn upload_repeats_path_flag() {
        let p: UploadParams = parse(json!({"path": ["a.mp4", "b dir/c.jpg"], "chat": "me"}));
        assert_eq!(
            p.argv(),
            vec!["up", "-u", "me", "-p", "a.mp4", "-p", "b dir/c.jpg"]
        );
        assert!(p.check().is_ok());
    }

    #[test]
    fn upload_requires_a_path() {
        let p: UploadParams = parse(json!({"path": [], "chat": "me"}));
        assert_eq!(
            p.check(),
            Err(ParamError::TooFewItems {
                field: "path",
                min: 1,
                got: 0
            })
        );
    }

    #[test]
    fn chat_export_and_users() {
        let e: ChatExportParams = parse(json!({"chat": "https://t.me/chan"}));
        assert_eq!(e.argv(), vec!["chat", "export", "-u", "https://t.me/chan"]);
        assert_eq!(e.timeout(), Duration::from_secs(120));
        let u: ChatUsersParams = parse(json!({"chat": "12345", "namespace": "n"}));
        assert_eq!(u.argv(), vec!["-n", "n", "chat", "users", "-u", "12345"]);
        let empty: ChatUsersParams = parse(json!({"chat": "  "}));
        assert_eq!(empty.check(), Err(ParamError::Empty { field: "chat" }));
    }

    #[test]
    fn exec_argv_bounds() {
        let empty: ExecParams = parse(json!({"argv": []}));
        assert!(matches!(empty.check(), Err(ParamError::TooFewItems { .. })));

        let too_many = vec!["x".to_string(); 201];
        let many: ExecParams = parse(json!({ "argv": too_many }));
        assert!(matches!(many.check(), Err(ParamError::TooManyItems { max: 200, .. })));

        let long_arg = "a".repeat(2049);
        let long: ExecParams = parse(json!({ "argv": [long_arg] }));
        assert!(matches!(long.check(), Err(ParamError::TooLong { max: 2048, .. })));

        let ok: ExecParams = parse(json!({"argv": ["chat", "ls"], "cwd": "/tmp"}));
        assert!(ok.check().is_ok());
        assert_eq!(ok.cwd(), Some("/tmp"));
        assert_eq!(ok.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn timeout_bounds_and_override() {
        let zero: ChatListParams = parse(json!({"timeoutSec": 0}));
        assert!(matches!(
            zero.check(),
            Err(ParamError::OutOfRange { field: "timeoutSec", .. })
        ));
        let huge: ChatListParams = parse(json!({"timeoutSec": 3601}));
        assert!(huge.check().is_err());

        let custom: ChatListParams = parse(json!({"timeoutSec": 2.5}));
        assert!(custom.check().is_ok());
        assert_eq!(custom.timeout(), Duration::from_millis(2500));

        let default: ChatListParams = parse(json!({}));
        assert_eq!(default.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn namespace_length_bound() {
        let ns_max = "a".repeat(128);
        let ok: ChatListParams = parse(json!({ "namespace": ns_max }));
        assert!(ok.check().is_ok());
        let ns_long = "a".repeat(129);
        let long: ChatListParams = parse(json!({ "namespace": ns_long }));
        assert!(matches!(
            long.check(),
            Err(ParamError::TooLong { field: "namespace", .. })
        ));
    }

    #[test]
    fn response_format_defaults_to_markdown() {
        let p: ChatListParams = parse(json!({}));
        assert_eq!(p.response_format(), ResponseFormat::Markdown);
        let p: ChatListParams = parse(json!({"response_format": "json"}));
        assert_eq!(p.response_format(), ResponseFormat::Json);
        assert!(serde_json::from_value::<ChatListParams>(json!({"response_format": "html"})).is_err());
    }
}
