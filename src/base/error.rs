//! Typed errors for the orchestration core.

use thiserror::Error;

/// Failures the core reports to its callers.
///
/// Tool and parse failures never surface here during a turn; the loop turns them into
/// observations. These are for registration, schema coercion, and configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("a tool named `{0}` is already registered")]
    DuplicateToolName(String),
    #[error("`{name}` is not a valid tool, try one of [{}]", available.join(", "))]
    ToolNotFound { name: String, available: Vec<String> },
    #[error("invalid input for `{tool}`: {message}")]
    SchemaViolation { tool: String, message: String },
    #[error("language model error: {0}")]
    Model(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
