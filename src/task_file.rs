//! Durable task records for task-file mode.
//!
//! A task file is a single JSON object acting as a pollable record of one
//! invocation. It is created as a `running` placeholder immediately before
//! the child process starts and unconditionally overwritten with a terminal
//! record once the process exits, fails to start, or times out. Both writes
//! go through the atomic writer, so a concurrent poller always sees a
//! complete record.
//!
//! Status lifecycle: `running -> {completed, error, timeout}`.

use crate::error::Result;
use crate::exec::CapturedOutput;
use crate::exit_codes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Status tag of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The child process has been announced and is (about to be) running.
    Running,
    /// The child exited 0.
    Completed,
    /// The child exited nonzero, failed to start, or was not found.
    Error,
    /// The child was killed after exceeding the deadline.
    Timeout,
}

/// One invocation's durable status record.
///
/// The running and terminal shapes share this struct; absent fields are
/// omitted from the JSON. The terminal record replaces the running record
/// wholesale; `started_at` and `pid` do not carry over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Current lifecycle status.
    pub status: TaskStatus,

    /// When the invocation was announced (running records only).
    #[serde(
        with = "rfc3339_seconds",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub started_at: Option<DateTime<Utc>>,

    /// The launcher's process id (running records only), so pollers can
    /// detect an abandoned record after a crash.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pid: Option<u32>,

    /// Captured stdout (terminal records of processes that ran).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output: Option<String>,

    /// Error description: captured stderr, or the timeout/not-found message.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,

    /// Exit code of the invocation (terminal records only).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exit_code: Option<i32>,

    /// When the terminal record was written (terminal records only).
    #[serde(
        with = "rfc3339_seconds",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub completed_at: Option<DateTime<Utc>>,

    /// Session identifier carried through from the invocation options.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<String>,
}

impl TaskRecord {
    /// The announce-phase placeholder written before the child starts.
    pub fn running(session_id: Option<&str>) -> Self {
        Self {
            status: TaskStatus::Running,
            started_at: Some(Utc::now()),
            pid: Some(std::process::id()),
            output: None,
            error: None,
            exit_code: None,
            completed_at: None,
            session_id: session_id.map(str::to_string),
        }
    }

    /// Terminal record for a child that ran to completion.
    ///
    /// Exit 0 becomes `completed`, anything else `error`; stderr is attached
    /// as the error field only when non-empty.
    pub fn finished(captured: &CapturedOutput, session_id: Option<&str>) -> Self {
        let status = if captured.is_success() {
            TaskStatus::Completed
        } else {
            TaskStatus::Error
        };

        Self {
            status,
            output: Some(captured.stdout.clone()),
            error: (!captured.stderr.is_empty()).then(|| captured.stderr.clone()),
            exit_code: Some(captured.exit_code),
            ..Self::terminal_base(session_id)
        }
    }

    /// Terminal record for a timed-out child.
    pub fn timeout(seconds: u64, session_id: Option<&str>) -> Self {
        Self {
            status: TaskStatus::Timeout,
            error: Some(format!("Claude Code did not respond within {}s", seconds)),
            exit_code: Some(exit_codes::TIMEOUT),
            ..Self::terminal_base(session_id)
        }
    }

    /// Terminal record for a tool binary missing from PATH.
    pub fn tool_not_found(program: &str, session_id: Option<&str>) -> Self {
        Self {
            status: TaskStatus::Error,
            error: Some(format!("'{}' command not found", program)),
            exit_code: Some(exit_codes::TOOL_NOT_FOUND),
            ..Self::terminal_base(session_id)
        }
    }

    /// Terminal record for any other failure to start the child.
    pub fn failure(message: String, exit_code: i32, session_id: Option<&str>) -> Self {
        Self {
            status: TaskStatus::Error,
            error: Some(message),
            exit_code: Some(exit_code),
            ..Self::terminal_base(session_id)
        }
    }

    fn terminal_base(session_id: Option<&str>) -> Self {
        Self {
            status: TaskStatus::Error,
            started_at: None,
            pid: None,
            output: None,
            error: None,
            exit_code: None,
            completed_at: Some(Utc::now()),
            session_id: session_id.map(str::to_string),
        }
    }

    /// Durably write this record to `path` through the atomic writer.
    pub fn write(&self, path: &Path) -> Result<()> {
        crate::fs::atomic_write_json(path, self)
    }
}

/// RFC3339 timestamps at whole-second precision with a `Z` suffix
/// (`2026-08-07T12:34:56Z`), the format existing task-file pollers parse.
mod rfc3339_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
