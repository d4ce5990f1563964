//! Exit code constants for the claude-relay CLI.
//!
//! - 0: Success (the external tool exited 0)
//! - 1: Configuration error (missing prompt, unreadable plan file, bad env override)
//! - 124: External tool timed out
//! - 127: External tool binary not found
//!
//! When the external tool exits with any other nonzero code, that code is
//! relayed verbatim and does not appear here.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Configuration error: bad arguments, missing prompt, or unreadable plan file.
pub const USER_ERROR: i32 = 1;

/// The external tool did not finish within the configured timeout.
///
/// 124 is the conventional timeout code (shared with coreutils `timeout`).
pub const TIMEOUT: i32 = 124;

/// The external tool binary could not be found on PATH.
///
/// 127 is the conventional shell "command not found" code.
pub const TOOL_NOT_FOUND: i32 = 127;
