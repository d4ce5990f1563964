//! Invocation options for a single launcher run.
//!
//! The CLI surface in `cli` is a raw parse; this module resolves it, together
//! with a snapshot of the relevant environment variables, into an immutable
//! [`InvocationOptions`] value. All environment-driven behavior is decided
//! here, once, at startup. Nothing downstream consults the environment.

use crate::cli::{Cli, OutputFormat, PermissionMode};
use crate::error::{RelayError, Result};
use std::env;
use std::path::PathBuf;

/// Environment variable naming a third-party model endpoint base URL.
pub const ENV_BASE_URL: &str = "ANTHROPIC_BASE_URL";

/// Environment variable carrying a third-party endpoint API key.
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Environment variable overriding the base command for the external tool.
///
/// Parsed with shell-words, e.g. `CLAUDE_RELAY_CMD="npx claude -p"`.
pub const ENV_BASE_COMMAND: &str = "CLAUDE_RELAY_CMD";

/// Default base command: Claude Code in non-interactive print mode.
const DEFAULT_BASE_COMMAND: &[&str] = &["claude", "-p"];

/// Snapshot of the environment variables the launcher consults.
///
/// Captured exactly once per invocation so behavior cannot shift if the
/// environment changes mid-run.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    /// Whether a third-party model endpoint is configured. When set, the
    /// `--model` flag is suppressed so the endpoint's own routing applies.
    pub third_party_endpoint: bool,

    /// Raw base-command override, if any.
    pub base_command_override: Option<String>,
}

impl EnvSnapshot {
    /// Capture the snapshot from the process environment.
    ///
    /// Variables set to an empty string count as unset, matching how shell
    /// users "disable" a variable without unexporting it.
    pub fn capture() -> Self {
        Self {
            third_party_endpoint: env_non_empty(ENV_BASE_URL) || env_non_empty(ENV_API_KEY),
            base_command_override: env::var(ENV_BASE_COMMAND).ok().filter(|v| !v.is_empty()),
        }
    }
}

fn env_non_empty(name: &str) -> bool {
    env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}

/// Immutable options for one launcher invocation.
///
/// Invariants (enforced by the CLI groups and by [`InvocationOptions::resolve`]):
/// at most one of `session`/`resume` is set, at most one permission directive
/// is active, and `prompt` is non-empty.
#[derive(Debug, Clone)]
pub struct InvocationOptions {
    /// Leading tokens of the external command, e.g. `["claude", "-p"]`.
    pub base_command: Vec<String>,

    /// The prompt text, from the positional argument or the plan file.
    pub prompt: String,

    /// Create a new session with this UUID.
    pub session: Option<String>,

    /// Resume an existing session by ID; takes precedence over `session`.
    pub resume: Option<String>,

    /// Continue the most recent session in the working directory.
    pub continue_session: bool,

    /// Named permission mode.
    pub permission_mode: Option<PermissionMode>,

    /// Skip all permission checks; takes precedence over `permission_mode`.
    pub skip_permissions: bool,

    /// Tool allow rules as one comma/space-separated string.
    pub allowed_tools: Option<String>,

    /// Tool deny rules as one comma/space-separated string.
    pub disallowed_tools: Option<String>,

    /// Model alias or ID. Already `None` when a third-party endpoint is
    /// configured, regardless of what was passed on the command line.
    pub model: Option<String>,

    /// Max agentic turns before stopping.
    pub max_turns: Option<u32>,

    /// Max budget in USD before stopping.
    pub max_budget: Option<f64>,

    /// Output format for the external tool's response.
    pub output_format: Option<OutputFormat>,

    /// Additional system prompt text.
    pub append_system_prompt: Option<String>,

    /// Additional working directories.
    pub add_dirs: Vec<String>,

    /// MCP server configuration file path, passed through verbatim.
    pub mcp_config: Option<String>,

    /// Subprocess timeout in seconds.
    pub timeout_seconds: u64,

    /// Task file path; `Some` enables task-file mode.
    pub task_file: Option<PathBuf>,

    /// Print the command instead of executing it.
    pub dry_run: bool,
}

impl InvocationOptions {
    /// Resolve parsed CLI arguments and the environment snapshot into options.
    ///
    /// Fails with a configuration error (exit code 1) when the prompt is
    /// missing, the plan file cannot be read, or the base-command override
    /// does not parse as shell words.
    pub fn resolve(cli: Cli, env: &EnvSnapshot) -> Result<Self> {
        let base_command = resolve_base_command(env)?;
        let prompt = resolve_prompt(cli.prompt, cli.plan_file.as_deref())?;

        // Third-party endpoints do their own model routing; forcing --model
        // would conflict with it.
        let model = if env.third_party_endpoint {
            None
        } else {
            cli.model
        };

        Ok(Self {
            base_command,
            prompt,
            session: cli.session,
            resume: cli.resume,
            continue_session: cli.continue_session,
            permission_mode: cli.permission_mode,
            skip_permissions: cli.dangerously_skip_permissions,
            allowed_tools: cli.allowed_tools,
            disallowed_tools: cli.disallowed_tools,
            model,
            max_turns: cli.max_turns,
            max_budget: cli.max_budget,
            output_format: cli.output_format,
            append_system_prompt: cli.append_system_prompt,
            add_dirs: cli
                .add_dir
                .into_iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
            mcp_config: cli.mcp_config,
            timeout_seconds: cli.timeout,
            task_file: cli.output,
            dry_run: cli.dry_run,
        })
    }

    /// The session identifier recorded in the task file, if any.
    ///
    /// A resumed session keeps its ID; a fresh session uses the requested
    /// UUID. `--continue-session` has no ID to record.
    pub fn session_id(&self) -> Option<&str> {
        self.resume.as_deref().or(self.session.as_deref())
    }
}

fn resolve_base_command(env: &EnvSnapshot) -> Result<Vec<String>> {
    let Some(override_str) = &env.base_command_override else {
        return Ok(DEFAULT_BASE_COMMAND.iter().map(|s| s.to_string()).collect());
    };

    let tokens = shell_words::split(override_str).map_err(|e| {
        RelayError::UserError(format!(
            "failed to parse {} '{}': {}",
            ENV_BASE_COMMAND, override_str, e
        ))
    })?;

    if tokens.is_empty() {
        return Err(RelayError::UserError(format!(
            "{} is set but contains no command",
            ENV_BASE_COMMAND
        )));
    }

    Ok(tokens)
}

fn resolve_prompt(positional: Option<String>, plan_file: Option<&std::path::Path>) -> Result<String> {
    let prompt = match plan_file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::UserError(format!("plan file not found: '{}'", path.display()))
            } else {
                RelayError::UserError(format!(
                    "failed to read plan file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?,
        None => positional.unwrap_or_default(),
    };

    if prompt.is_empty() {
        return Err(RelayError::UserError(
            "prompt is required (provide as argument or via --plan-file)".to_string(),
        ));
    }

    Ok(prompt)
}
