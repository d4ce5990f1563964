//! claude-relay: launcher for the Claude Code CLI.
//!
//! Translates a simplified flag surface into a `claude -p ...` invocation,
//! runs it once with a timeout, and relays the result directly or through a
//! durable JSON task file. This is the entry point: it parses arguments,
//! hands off to `launch`, and maps errors to exit codes.

mod cli;
pub mod command;
pub mod error;
pub mod exec;
pub mod exit_codes;
pub mod fs;
pub mod launch;
pub mod options;
pub mod task_file;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match launch::run(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
