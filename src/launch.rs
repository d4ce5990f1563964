//! Invocation orchestration for claude-relay.
//!
//! Resolves options, builds the argument vector, and runs one of three
//! paths: dry-run (print the command), direct mode (relay output verbatim),
//! or task-file mode (announce/execute/finalize against a durable record).

use crate::cli::Cli;
use crate::command;
use crate::error::{RelayError, Result};
use crate::exec::{self, CapturedOutput, ExecOutcome};
use crate::exit_codes;
use crate::options::{EnvSnapshot, InvocationOptions};
use crate::task_file::TaskRecord;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Execute one launcher invocation end to end.
///
/// Returns the process exit code on the success path (including nonzero
/// codes relayed from the child); configuration, timeout, and not-found
/// failures surface as errors carrying their own exit codes.
pub fn run(cli: Cli) -> Result<i32> {
    let env = EnvSnapshot::capture();
    let opts = InvocationOptions::resolve(cli, &env)?;
    let argv = command::build_args(&opts);

    if opts.dry_run {
        println!("{}", shell_words::join(argv.iter().map(String::as_str)));
        return Ok(exit_codes::SUCCESS);
    }

    match opts.task_file.clone() {
        Some(path) => run_task_file(&argv, &opts, &path),
        None => run_direct(&argv, opts.timeout_seconds),
    }
}

/// Direct mode: run the tool and relay its captured output verbatim.
///
/// Stdout goes to stdout, stderr to stderr, and the child's exit code is
/// returned. Timeout and missing-binary outcomes become errors so the
/// caller reports them on stderr with the reserved exit codes.
pub fn run_direct(argv: &[String], timeout_seconds: u64) -> Result<i32> {
    match exec::execute(argv, Duration::from_secs(timeout_seconds))? {
        ExecOutcome::Completed(captured) => {
            relay_output(&captured)?;
            Ok(captured.exit_code)
        }
        ExecOutcome::TimedOut => Err(RelayError::Timeout {
            seconds: timeout_seconds,
        }),
        ExecOutcome::ToolNotFound { program } => Err(RelayError::ToolNotFound { program }),
    }
}

/// Task-file mode: deliver the result through a durable JSON record.
///
/// Three phases: announce a `running` record before spawning, execute
/// without forwarding any output, then finalize with the terminal record.
/// The only stdout output is the task file's absolute path, printed after
/// finalization so a caller reading it always finds a terminal record.
pub fn run_task_file(argv: &[String], opts: &InvocationOptions, path: &Path) -> Result<i32> {
    let path = absolute(path)?;
    let session_id = opts.session_id();

    TaskRecord::running(session_id).write(&path)?;

    let outcome = exec::execute(argv, Duration::from_secs(opts.timeout_seconds));

    let (record, exit_code) = match outcome {
        Ok(ExecOutcome::Completed(captured)) => {
            let code = captured.exit_code;
            (TaskRecord::finished(&captured, session_id), code)
        }
        Ok(ExecOutcome::TimedOut) => (
            TaskRecord::timeout(opts.timeout_seconds, session_id),
            exit_codes::TIMEOUT,
        ),
        Ok(ExecOutcome::ToolNotFound { program }) => (
            TaskRecord::tool_not_found(&program, session_id),
            exit_codes::TOOL_NOT_FOUND,
        ),
        Err(e) => {
            let code = e.exit_code();
            (TaskRecord::failure(e.to_string(), code, session_id), code)
        }
    };
    record.write(&path)?;

    println!("{}", path.display());
    Ok(exit_code)
}

/// Write captured output through to this process's own streams, unmodified.
fn relay_output(captured: &CapturedOutput) -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(captured.stdout.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| RelayError::UserError(format!("failed to write output: {}", e)))?;

    let mut stderr = std::io::stderr();
    stderr
        .write_all(captured.stderr.as_bytes())
        .and_then(|_| stderr.flush())
        .map_err(|e| RelayError::UserError(format!("failed to write output: {}", e)))?;

    Ok(())
}

/// Absolutize without touching the filesystem. The task file usually does
/// not exist yet, so `canonicalize` is not an option.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| {
        RelayError::UserError(format!("failed to get current working directory: {}", e))
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_file::TaskStatus;
    use clap::Parser;
    use serial_test::serial;
    use tempfile::TempDir;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn task_opts(output: &Path, timeout: u64, extra: &[&str]) -> InvocationOptions {
        let mut args = vec![
            "claude-relay".to_string(),
            "--output".to_string(),
            output.to_string_lossy().into_owned(),
            "--timeout".to_string(),
            timeout.to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        args.push("test prompt".to_string());

        InvocationOptions::resolve(Cli::try_parse_from(args).unwrap(), &EnvSnapshot::default())
            .unwrap()
    }

    fn read_record(path: &Path) -> serde_json::Value {
        let content = std::fs::read_to_string(path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn direct_mode_relays_child_exit_code() {
        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "exit 7"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "exit 7"]);

        assert_eq!(run_direct(&cmd, 10).unwrap(), 7);
    }

    #[test]
    fn direct_mode_missing_tool_maps_to_127() {
        let err = run_direct(&argv(&["claude-relay-no-such-binary-xyz"]), 5).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::TOOL_NOT_FOUND);
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn direct_mode_timeout_maps_to_124() {
        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "ping -n 10 127.0.0.1"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sleep", "10"]);

        let err = run_direct(&cmd, 1).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::TIMEOUT);
    }

    #[test]
    fn task_file_success_scenario() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        let opts = task_opts(&path, 10, &[]);

        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "echo| set /p=hello"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "printf hello"]);

        let code = run_task_file(&cmd, &opts, &path).unwrap();
        assert_eq!(code, 0);

        let json = read_record(&path);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["output"], "hello");
        assert_eq!(json["exit_code"], 0);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn task_file_timeout_scenario() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        let opts = task_opts(&path, 1, &[]);

        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "ping -n 10 127.0.0.1"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sleep", "10"]);

        let code = run_task_file(&cmd, &opts, &path).unwrap();
        assert_eq!(code, exit_codes::TIMEOUT);

        let json = read_record(&path);
        assert_eq!(json["status"], "timeout");
        assert_eq!(json["exit_code"], 124);
        assert!(!json["error"].as_str().unwrap().is_empty());
    }

    #[test]
    fn task_file_missing_tool_scenario() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        let opts = task_opts(&path, 5, &[]);

        let cmd = argv(&["claude-relay-no-such-binary-xyz"]);
        let code = run_task_file(&cmd, &opts, &path).unwrap();
        assert_eq!(code, exit_codes::TOOL_NOT_FOUND);

        let json = read_record(&path);
        assert_eq!(json["status"], "error");
        assert_eq!(json["exit_code"], 127);
        assert!(json["error"].as_str().unwrap().contains("not found"));
    }

    #[test]
    fn task_file_nonzero_exit_records_stderr() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        let opts = task_opts(&path, 10, &[]);

        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "echo bad 1>&2 & exit 2"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "printf bad >&2; exit 2"]);

        let code = run_task_file(&cmd, &opts, &path).unwrap();
        assert_eq!(code, 2);

        let json = read_record(&path);
        assert_eq!(json["status"], "error");
        assert_eq!(json["exit_code"], 2);
        assert!(json["error"].as_str().unwrap().contains("bad"));
    }

    #[test]
    fn task_file_carries_session_id_through_both_phases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        let opts = task_opts(&path, 10, &["--resume", "sess-42"]);

        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "echo done"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "printf done"]);

        run_task_file(&cmd, &opts, &path).unwrap();

        let json = read_record(&path);
        assert_eq!(json["session_id"], "sess-42");
    }

    #[test]
    fn running_record_is_observable_while_child_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task.json");
        let opts = task_opts(&path, 30, &[]);

        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "ping -n 3 127.0.0.1"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sleep", "2"]);

        let poll_path = path.clone();
        let handle = std::thread::spawn(move || run_task_file(&cmd, &opts, &poll_path));

        // The announce write happens before the spawn, so the running record
        // must become visible well before the child's two seconds are up.
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        let mut saw_running = false;
        while std::time::Instant::now() < deadline {
            if path.exists() {
                let record: crate::task_file::TaskRecord =
                    serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
                if record.status == TaskStatus::Running {
                    assert!(record.pid.is_some());
                    saw_running = true;
                    break;
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(saw_running, "running record never appeared");

        let code = handle.join().unwrap().unwrap();
        assert_eq!(code, 0);
        assert_eq!(read_record(&path)["status"], "completed");
    }

    #[test]
    fn relative_task_paths_are_absolutized() {
        let rel = Path::new("some/task.json");
        let abs = absolute(rel).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("some/task.json"));
    }

    #[test]
    #[serial]
    fn dry_run_prints_instead_of_executing() {
        // Point the base command at a nonexistent binary: if dry-run ever
        // executed, run() would report a not-found error instead of success.
        unsafe {
            std::env::set_var(
                crate::options::ENV_BASE_COMMAND,
                "claude-relay-no-such-binary-xyz -p",
            );
            std::env::remove_var(crate::options::ENV_BASE_URL);
            std::env::remove_var(crate::options::ENV_API_KEY);
        }

        let cli = Cli::try_parse_from([
            "claude-relay",
            "--dry-run",
            "--allowed-tools",
            "Read,Bash(npm test)",
            "hello",
        ])
        .unwrap();

        let code = run(cli).unwrap();
        assert_eq!(code, exit_codes::SUCCESS);

        unsafe {
            std::env::remove_var(crate::options::ENV_BASE_COMMAND);
        }
    }
}
