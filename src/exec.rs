//! External tool subprocess execution.
//!
//! Executes a built argument vector synchronously with a deadline, capturing
//! stdout and stderr fully in memory. One attempt per invocation: timeout is
//! the only cancellation mechanism, and retry policy belongs to the caller.

use crate::error::{RelayError, Result};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the runner checks whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured output of a finished child process.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Full stdout, decoded lossily as UTF-8.
    pub stdout: String,
    /// Full stderr, decoded lossily as UTF-8.
    pub stderr: String,
    /// The child's exit code. Signal-terminated children report 1.
    pub exit_code: i32,
}

impl CapturedOutput {
    /// Whether the child reported success.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of one execution attempt.
#[derive(Debug)]
pub enum ExecOutcome {
    /// The child ran to completion (with any exit code).
    Completed(CapturedOutput),
    /// The child was killed after exceeding the deadline. Partial output is
    /// discarded; the task record carries only the timeout description.
    TimedOut,
    /// The program was not found on PATH.
    ToolNotFound {
        /// The program name that failed to resolve.
        program: String,
    },
}

/// Run `argv` to completion with a deadline.
///
/// Stdout and stderr are piped and drained on dedicated threads so the child
/// can never block on a full pipe while the runner polls for exit. On
/// timeout the child is killed outright and reaped.
///
/// Spawn failures other than "not found" (e.g. permission denied) are
/// configuration errors.
pub fn execute(argv: &[String], timeout: Duration) -> Result<ExecOutcome> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| RelayError::UserError("empty command".to_string()))?;

    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ExecOutcome::ToolNotFound {
                program: program.clone(),
            });
        }
        Err(e) => {
            return Err(RelayError::UserError(format!(
                "failed to execute '{}': {}",
                program, e
            )));
        }
    };

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let (exit_code, timed_out) = wait_with_timeout(&mut child, timeout)?;

    // The readers finish once the pipes close: immediately on normal exit,
    // and right after the kill on timeout.
    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    if timed_out {
        return Ok(ExecOutcome::TimedOut);
    }

    Ok(ExecOutcome::Completed(CapturedOutput {
        stdout,
        stderr,
        exit_code,
    }))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Wait for a child process with a deadline.
///
/// Returns `(exit_code, timed_out)`.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(i32, bool)> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok((status.code().unwrap_or(1), false));
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process(child);
                    return Ok((0, true));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(RelayError::UserError(format!(
                    "failed to check process status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a process and wait for it to terminate.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "echo hello"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "printf hello"]);

        let outcome = execute(&cmd, Duration::from_secs(10)).unwrap();
        match outcome {
            ExecOutcome::Completed(out) => {
                assert!(out.is_success());
                assert_eq!(out.exit_code, 0);
                assert!(out.stdout.contains("hello"));
                assert!(out.stderr.is_empty());
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn captures_stderr_separately() {
        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "echo oops 1>&2"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "printf oops >&2"]);

        let outcome = execute(&cmd, Duration::from_secs(10)).unwrap();
        match outcome {
            ExecOutcome::Completed(out) => {
                assert!(out.stdout.is_empty());
                assert!(out.stderr.contains("oops"));
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn relays_nonzero_exit_codes() {
        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "exit 3"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "exit 3"]);

        let outcome = execute(&cmd, Duration::from_secs(10)).unwrap();
        match outcome {
            ExecOutcome::Completed(out) => {
                assert!(!out.is_success());
                assert_eq!(out.exit_code, 3);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn kills_child_on_timeout() {
        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "ping -n 10 127.0.0.1"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sleep", "10"]);

        let start = Instant::now();
        let outcome = execute(&cmd, Duration::from_secs(1)).unwrap();
        assert!(matches!(outcome, ExecOutcome::TimedOut));
        // Well under the child's own runtime: the kill actually happened.
        assert!(start.elapsed() < Duration::from_secs(8));
    }

    #[test]
    fn reports_missing_program() {
        let cmd = argv(&["claude-relay-no-such-binary-xyz"]);
        let outcome = execute(&cmd, Duration::from_secs(5)).unwrap();
        match outcome {
            ExecOutcome::ToolNotFound { program } => {
                assert_eq!(program, "claude-relay-no-such-binary-xyz");
            }
            other => panic!("expected not-found, got {:?}", other),
        }
    }

    #[test]
    fn rejects_empty_argv() {
        let err = execute(&[], Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[test]
    fn large_output_does_not_deadlock() {
        // Well past any OS pipe buffer size.
        #[cfg(windows)]
        let cmd = argv(&["cmd", "/c", "for /l %i in (1,1,20000) do @echo 0123456789abcdef"]);
        #[cfg(not(windows))]
        let cmd = argv(&["sh", "-c", "yes 0123456789abcdef | head -n 200000"]);

        let outcome = execute(&cmd, Duration::from_secs(30)).unwrap();
        match outcome {
            ExecOutcome::Completed(out) => {
                assert!(out.stdout.len() > 1_000_000);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }
}
