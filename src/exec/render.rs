//! Response rendering: size ceiling, truncation and the two wire encodings.
//!
//! render(&ExecutionOutcome, ResponseFormat) -> RenderedResponse
//!
//! Pure and deterministic: the same outcome and format always produce the
//! same text.

use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ExecutionOutcome;

/// Combined size ceiling (characters) for the two captured streams.
pub const CHARACTER_LIMIT: usize = 25_000;

/// Per-stream cap once the ceiling is exceeded.
pub const STREAM_LIMIT: usize = CHARACTER_LIMIT / 2;

/// Output encoding requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Human-readable report with fenced stdout / stderr sections
    #[default]
    Markdown,
    /// Single JSON object: exit_code, stdout, stderr, timed_out, truncated
    Json,
}

/// Rendered text payload, ready to be wrapped into a one-block tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub format: ResponseFormat,
    pub text: String,
    pub truncated: bool,
}

impl From<RenderedResponse> for CallToolResult {
    fn from(rendered: RenderedResponse) -> Self {
        CallToolResult::success(vec![Content::text(rendered.text)])
    }
}

/// Streams after the ceiling has been applied.
struct Bounded<'a> {
    stdout: &'a str,
    stderr: &'a str,
    truncated: bool,
}

impl<'a> Bounded<'a> {
    /// Over the ceiling, each stream keeps its first `STREAM_LIMIT` characters,
    /// regardless of which one is larger.
    fn new(outcome: &'a ExecutionOutcome) -> Self {
        let total = outcome.stdout.chars().count() + outcome.stderr.chars().count();
        if total > CHARACTER_LIMIT {
            Bounded {
                stdout: prefix_chars(&outcome.stdout, STREAM_LIMIT),
                stderr: prefix_chars(&outcome.stderr, STREAM_LIMIT),
                truncated: true,
            }
        } else {
            Bounded {
                stdout: &outcome.stdout,
                stderr: &outcome.stderr,
                truncated: false,
            }
        }
    }
}

fn prefix_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn render(outcome: &ExecutionOutcome, format: ResponseFormat) -> RenderedResponse {
    let bounded = Bounded::new(outcome);
    let text = match format {
        ResponseFormat::Json => render_json(outcome, &bounded),
        ResponseFormat::Markdown => render_markdown(outcome, &bounded),
    };
    RenderedResponse {
        format,
        text,
        truncated: bounded.truncated,
    }
}

fn render_json(outcome: &ExecutionOutcome, bounded: &Bounded<'_>) -> String {
    serde_json::json!({
        "exit_code": outcome.exit.code(),
        "stdout": bounded.stdout,
        "stderr": bounded.stderr,
        "timed_out": outcome.timed_out,
        "truncated": bounded.truncated,
    })
    .to_string()
}

fn render_markdown(outcome: &ExecutionOutcome, bounded: &Bounded<'_>) -> String {
    let code = outcome
        .exit
        .code()
        .map_or_else(|| "null".to_string(), |c| c.to_string());
    let mut text = format!("Exit Code: {code}\n");
    if outcome.timed_out {
        text.push_str("**WARNING: command killed after exceeding its timeout**\n");
    }
    if bounded.truncated {
        text.push_str(&format!(
            "**WARNING: output truncated (limit of {CHARACTER_LIMIT} chars)**\n"
        ));
    }
    if !bounded.stdout.is_empty() {
        text.push_str(&format!("\n### stdout\n```\n{}\n```\n", bounded.stdout));
    }
    if !bounded.stderr.is_empty() {
        text.push_str(&format!("\n### stderr\n```\n{}\n```\n", bounded.stderr));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ExitState;

    fn outcome(stdout: &str, stderr: &str, exit: ExitState, timed_out: bool) -> ExecutionOutcome {
        ExecutionOutcome {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit,
            timed_out,
        }
    }

    /// Body of the fenced block that follows `### <name>`.
    fn section<'a>(text: &'a str, name: &str) -> Option<&'a str> {
        let start_marker = format!("### {name}\n```\n");
        let start = text.find(&start_marker)? + start_marker.len();
        let len = text[start..].find("\n```\n")?;
        Some(&text[start..start + len])
    }

    #[test]
    fn markdown_success_has_single_stdout_block() {
        let r = render(
            &outcome("hello\n", "", ExitState::Code(0), false),
            ResponseFormat::Markdown,
        );
        assert!(r.text.starts_with("Exit Code: 0\n"));
        assert_eq!(section(&r.text, "stdout"), Some("hello\n"));
        assert!(!r.text.contains("### stderr"));
        assert!(!r.text.contains("WARNING"));
        assert_eq!(r.text.matches("```").count(), 2);
        assert!(!r.truncated);
    }

    #[test]
    fn markdown_omits_empty_sections() {
        let r = render(&outcome("", "", ExitState::Code(1), false), ResponseFormat::Markdown);
        assert_eq!(r.text, "Exit Code: 1\n");
    }

    #[test]
    fn markdown_timeout_warning_and_null_code() {
        let r = render(
            &outcome("partial", "", ExitState::NoCode, true),
            ResponseFormat::Markdown,
        );
        assert!(r.text.starts_with("Exit Code: null\n"));
        assert!(r.text.contains("**WARNING: command killed after exceeding its timeout**"));
        assert_eq!(section(&r.text, "stdout"), Some("partial"));
    }

    #[test]
    fn markdown_spawn_failure_shows_sentinel_and_error() {
        let r = render(
            &outcome("", "Error: failed to start 'tdl': not found", ExitState::SpawnFailed, false),
            ResponseFormat::Markdown,
        );
        assert!(r.text.starts_with("Exit Code: -1\n"));
        assert_eq!(
            section(&r.text, "stderr"),
            Some("Error: failed to start 'tdl': not found")
        );
        assert!(!r.text.contains("### stdout"));
    }

    #[test]
    fn oversized_stdout_is_cut_to_half_the_ceiling() {
        let big = "x".repeat(30_000);
        let r = render(&outcome(&big, "", ExitState::Code(0), false), ResponseFormat::Markdown);
        assert!(r.truncated);
        assert!(r.text.contains("**WARNING: output truncated (limit of 25000 chars)**"));
        assert_eq!(section(&r.text, "stdout").map(str::len), Some(STREAM_LIMIT));
        assert!(!r.text.contains("### stderr"));
    }

    #[test]
    fn split_is_even_regardless_of_sizes() {
        let out = "o".repeat(24_000);
        let err = "e".repeat(2_000);
        let r = render(&outcome(&out, &err, ExitState::Code(0), false), ResponseFormat::Json);
        let v: serde_json::Value = serde_json::from_str(&r.text).unwrap();
        assert_eq!(v["stdout"].as_str().unwrap().len(), STREAM_LIMIT);
        // stderr was already under its half and stays whole
        assert_eq!(v["stderr"].as_str().unwrap().len(), 2_000);
        assert_eq!(v["truncated"], serde_json::json!(true));
    }

    #[test]
    fn at_ceiling_is_untouched() {
        let out = "o".repeat(20_000);
        let err = "e".repeat(5_000);
        let r = render(&outcome(&out, &err, ExitState::Code(0), false), ResponseFormat::Json);
        let v: serde_json::Value = serde_json::from_str(&r.text).unwrap();
        assert_eq!(v["stdout"].as_str().unwrap(), out);
        assert_eq!(v["stderr"].as_str().unwrap(), err);
        assert_eq!(v["truncated"], serde_json::json!(false));
        assert!(!r.truncated);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let out = "é".repeat(26_000);
        let r = render(&outcome(&out, "", ExitState::Code(0), false), ResponseFormat::Json);
        let v: serde_json::Value = serde_json::from_str(&r.text).unwrap();
        assert_eq!(v["stdout"].as_str().unwrap().chars().count(), STREAM_LIMIT);
    }

    #[test]
    fn json_has_expected_keys_and_types() {
        let r = render(
            &outcome("hello\n", "", ExitState::Code(0), false),
            ResponseFormat::Json,
        );
        let v: serde_json::Value = serde_json::from_str(&r.text).unwrap();
        let obj = v.as_object().unwrap();
        for key in ["exit_code", "stdout", "stderr", "timed_out", "truncated"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj["exit_code"], serde_json::json!(0));
        assert_eq!(obj["stdout"], serde_json::json!("hello\n"));
        assert!(obj["timed_out"].is_boolean());
        assert!(obj["truncated"].is_boolean());
    }

    #[test]
    fn json_encodes_missing_code_as_null() {
        let r = render(&outcome("", "", ExitState::NoCode, true), ResponseFormat::Json);
        let v: serde_json::Value = serde_json::from_str(&r.text).unwrap();
        assert!(v["exit_code"].is_null());
        assert_eq!(v["timed_out"], serde_json::json!(true));
    }

    #[test]
    fn rendering_is_idempotent() {
        let o = outcome(&"a".repeat(20_000), &"b".repeat(9_000), ExitState::Code(2), false);
        for format in [ResponseFormat::Markdown, ResponseFormat::Json] {
            assert_eq!(render(&o, format), render(&o, format));
        }
    }

    #[test]
    fn wraps_into_single_text_block() {
        let r = render(&outcome("hi", "", ExitState::Code(0), false), ResponseFormat::Markdown);
        let text = r.text.clone();
        let result: CallToolResult = r.into();
        let v = serde_json::to_value(&result).unwrap();
        let content = v["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], serde_json::json!("text"));
        assert_eq!(content[0]["text"], serde_json::json!(text));
    }

    #[test]
    fn response_format_parses_lowercase() {
        let f: ResponseFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(f, ResponseFormat::Json);
        assert_eq!(ResponseFormat::default(), ResponseFormat::Markdown);
        assert!(serde_json::from_str::<ResponseFormat>("\"xml\"").is_err());
    }
}
