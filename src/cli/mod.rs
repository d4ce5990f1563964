//! CLI argument parsing for claude-relay.
//!
//! Uses clap derive macros for declarative argument definitions. This module
//! only defines the surface; resolution into immutable invocation options
//! happens in the `options` module, and execution in `launch`.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Run Claude Code in non-interactive print mode.
///
/// Translates a simplified flag surface into a `claude -p ...` invocation,
/// runs it once with a timeout, and either relays the output directly or,
/// with --output, records the result in a durable JSON task file whose path
/// is the only thing printed.
#[derive(Parser, Debug)]
#[command(name = "claude-relay")]
#[command(author, version, about)]
#[command(after_help = "\
Examples:
  # Single analysis query (read-only, safe)
  claude-relay \"Analyze the architecture of src/\"

  # Start a new multi-turn session
  claude-relay --session <uuid> \"Read src/main.rs and suggest improvements\"

  # Resume an existing session
  claude-relay --resume <uuid> \"Apply the changes you suggested\"

  # Editing with an explicit tool allowlist
  claude-relay --allowed-tools \"Read,Edit(src/**),Bash(npm test)\" \"Fix the token bug\"

  # Delegate asynchronously via a task file
  claude-relay --output /tmp/task.json --plan-file plan.md
")]
pub struct Cli {
    /// The prompt to send to Claude Code (omit when using --plan-file).
    pub prompt: Option<String>,

    /// Create a new session with this UUID.
    #[arg(long, value_name = "UUID", group = "session_directive")]
    pub session: Option<String>,

    /// Resume an existing session by ID or name.
    #[arg(long, value_name = "ID", group = "session_directive")]
    pub resume: Option<String>,

    /// Continue the most recent session in the working directory.
    #[arg(long, group = "session_directive")]
    pub continue_session: bool,

    /// Set the permission mode (relies on Claude Code defaults when omitted).
    #[arg(long, value_name = "MODE", group = "permission_directive")]
    pub permission_mode: Option<PermissionMode>,

    /// Skip ALL permission checks (use only in isolated environments).
    #[arg(long, group = "permission_directive")]
    pub dangerously_skip_permissions: bool,

    /// Comma-separated tool allow rules, e.g. "Read,Edit(src/**),Bash(npm test)".
    ///
    /// The rule string is handed to Claude Code as one value token; it is
    /// never split into separate arguments.
    #[arg(long, value_name = "RULES")]
    pub allowed_tools: Option<String>,

    /// Comma-separated tool deny rules, e.g. "Bash,Write".
    #[arg(long, value_name = "RULES")]
    pub disallowed_tools: Option<String>,

    /// Model alias (sonnet, opus, haiku) or full model ID.
    ///
    /// Ignored when a third-party endpoint is configured via
    /// ANTHROPIC_BASE_URL or ANTHROPIC_API_KEY.
    #[arg(long)]
    pub model: Option<String>,

    /// Max agentic turns before stopping.
    #[arg(long, value_name = "N")]
    pub max_turns: Option<u32>,

    /// Max budget in USD before stopping.
    #[arg(long, value_name = "USD")]
    pub max_budget: Option<f64>,

    /// Output format for Claude Code's response.
    #[arg(long, value_name = "FORMAT")]
    pub output_format: Option<OutputFormat>,

    /// Append additional instructions to Claude Code's system prompt.
    #[arg(long, value_name = "TEXT")]
    pub append_system_prompt: Option<String>,

    /// Additional working directories, e.g. "../other-project,/shared/libs".
    #[arg(long, value_name = "PATHS", value_delimiter = ',')]
    pub add_dir: Vec<String>,

    /// Path to an MCP server configuration JSON file.
    #[arg(long, value_name = "PATH")]
    pub mcp_config: Option<String>,

    /// Subprocess timeout in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 600)]
    pub timeout: u64,

    /// Write results to a JSON task file instead of stdout.
    ///
    /// Enables task-file mode: the file transitions running -> terminal
    /// atomically, and the only stdout output is the file's absolute path.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Read the prompt from a file instead of the command line.
    #[arg(long, value_name = "PATH")]
    pub plan_file: Option<PathBuf>,

    /// Print the command that would be executed without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Permission modes understood by Claude Code.
///
/// Value names match the external tool's own spelling (camelCase), since
/// they are forwarded verbatim to `--permission-mode`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Claude Code's default interactive prompting.
    Default,
    /// Read-only planning mode.
    Plan,
    /// Auto-accept file edits.
    #[value(name = "acceptEdits")]
    AcceptEdits,
    /// Never prompt; deny anything not pre-approved.
    #[value(name = "dontAsk")]
    DontAsk,
    /// Bypass the permission system entirely.
    #[value(name = "bypassPermissions")]
    BypassPermissions,
}

impl PermissionMode {
    /// The exact token forwarded to the external tool.
    pub fn as_flag_value(self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::Plan => "plan",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::DontAsk => "dontAsk",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Output formats understood by Claude Code.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    StreamJson,
}

impl OutputFormat {
    /// The exact token forwarded to the external tool.
    pub fn as_flag_value(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::StreamJson => "stream-json",
        }
    }
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
