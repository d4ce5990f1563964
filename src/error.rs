//! Error types for the claude-relay CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Every variant maps to a fixed exit code; nonzero exit codes from the
//! external tool itself are relayed directly and never pass through here.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for claude-relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// User provided invalid arguments or an input file could not be read.
    #[error("{0}")]
    UserError(String),

    /// The external tool did not respond within the configured timeout.
    #[error(
        "Claude Code did not respond within {seconds}s. \
         Consider increasing --timeout for complex tasks."
    )]
    Timeout { seconds: u64 },

    /// The external tool binary was not found on PATH.
    #[error(
        "'{program}' command not found. \
         Install Claude Code CLI: npm install -g @anthropic-ai/claude-code"
    )]
    ToolNotFound { program: String },
}

impl RelayError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RelayError::UserError(_) => exit_codes::USER_ERROR,
            RelayError::Timeout { .. } => exit_codes::TIMEOUT,
            RelayError::ToolNotFound { .. } => exit_codes::TOOL_NOT_FOUND,
        }
    }
}

/// Result type alias for claude-relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
