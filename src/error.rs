//! Parameter validation errors.
//!
//! Raised before any process is spawned and surfaced to the MCP client as
//! `invalid_params`. Execution failures are never errors; they live in
//! `ExecutionOutcome`.

use rmcp::model::ErrorData;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds {max} characters (got {got})")]
    TooLong {
        field: &'static str,
        max: usize,
        got: usize,
    },

    #[error("{field} requires at least {min} item(s) (got {got})")]
    TooFewItems {
        field: &'static str,
        min: usize,
        got: usize,
    },

    #[error("{field} accepts at most {max} items (got {got})")]
    TooManyItems {
        field: &'static str,
        max: usize,
        got: usize,
    },

    #[error("{field} must be between {min} and {max} (got {got})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        got: f64,
    },
}

impl From<ParamError> for ErrorData {
    fn from(err: ParamError) -> Self {
        ErrorData::invalid_params(err.to_string(), None)
    }
}
