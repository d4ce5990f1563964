//! Argument vector construction for the external tool.
//!
//! Pure mapping from [`InvocationOptions`] to the `claude` CLI's argument
//! grammar. The one subtle rule lives here: `--allowedTools`,
//! `--disallowedTools`, and `--add-dir` are variadic in that grammar and
//! greedily consume following non-flag tokens, so tool-rule lists are passed
//! as a single value token and the prompt is always placed after an explicit
//! `--` end-of-options marker. A prompt that itself starts with `-` therefore
//! still parses as positional text.

use crate::options::InvocationOptions;

/// Build the complete argument vector for one invocation.
///
/// The first element is the external program; the prompt is always the final
/// token. No side effects; mutual-exclusion invariants are enforced upstream
/// by the CLI parser, and this function only applies precedence when handed
/// an already-resolved options value.
pub fn build_args(opts: &InvocationOptions) -> Vec<String> {
    let mut cmd: Vec<String> = opts.base_command.clone();

    // Session management: resume takes precedence over explicit creation.
    if let Some(resume) = &opts.resume {
        cmd.push("--resume".to_string());
        cmd.push(resume.clone());
    } else if let Some(session) = &opts.session {
        cmd.push("--session-id".to_string());
        cmd.push(session.clone());
    }

    if opts.continue_session {
        cmd.push("--continue".to_string());
    }

    // Permission control: skipping all checks wins over a named mode.
    if opts.skip_permissions {
        cmd.push("--dangerously-skip-permissions".to_string());
    } else if let Some(mode) = opts.permission_mode {
        cmd.push("--permission-mode".to_string());
        cmd.push(mode.as_flag_value().to_string());
    }

    // Tool rules stay one token each; the external tool accepts comma or
    // space separated lists inside a single value.
    if let Some(allowed) = &opts.allowed_tools {
        cmd.push("--allowedTools".to_string());
        cmd.push(allowed.clone());
    }

    if let Some(disallowed) = &opts.disallowed_tools {
        cmd.push("--disallowedTools".to_string());
        cmd.push(disallowed.clone());
    }

    // Already None when a third-party endpoint is configured.
    if let Some(model) = &opts.model {
        cmd.push("--model".to_string());
        cmd.push(model.clone());
    }

    if let Some(max_turns) = opts.max_turns {
        cmd.push("--max-turns".to_string());
        cmd.push(max_turns.to_string());
    }

    if let Some(max_budget) = opts.max_budget {
        cmd.push("--max-budget-usd".to_string());
        cmd.push(max_budget.to_string());
    }

    if let Some(format) = opts.output_format {
        cmd.push("--output-format".to_string());
        cmd.push(format.as_flag_value().to_string());
    }

    if let Some(text) = &opts.append_system_prompt {
        cmd.push("--append-system-prompt".to_string());
        cmd.push(text.clone());
    }

    // Repeated pairs; unambiguous once the prompt sits behind the marker.
    for dir in &opts.add_dirs {
        cmd.push("--add-dir".to_string());
        cmd.push(dir.clone());
    }

    if let Some(mcp_config) = &opts.mcp_config {
        cmd.push("--mcp-config".to_string());
        cmd.push(mcp_config.clone());
    }

    // End option parsing so no variadic flag can swallow the prompt.
    cmd.push("--".to_string());
    cmd.push(opts.prompt.clone());

    cmd
}
