//! Atomic file write operations.
//!
//! The task file must be valid, fully-formed JSON at every observable moment:
//! a concurrent reader polling the file may never see a truncated or partial
//! record, even if this process crashes mid-write.
//!
//! All writes follow the same pattern:
//! 1. Write content to a temporary file in the same directory as the target
//!    (same directory so the rename cannot cross a filesystem boundary)
//! 2. Sync the file to disk (fsync)
//! 3. Atomically rename the temporary file onto the target
//!
//! `std::fs::rename` replaces an existing destination on both POSIX (plain
//! `rename()`) and Windows (`MoveFileExW` with `MOVEFILE_REPLACE_EXISTING`),
//! so a single code path covers both platforms.
//!
//! On any failure the temporary file is removed before the error propagates,
//! leaving the previous target content intact.

use crate::error::{RelayError, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file.
///
/// The target file is either left in its previous complete state or fully
/// replaced by `content`; it is never observable in a partially-written
/// state.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;
    replace_and_sync_dir(&temp_path, path)
}

/// Atomically write a value as pretty-printed JSON with a trailing newline.
///
/// This is the serialization used for the task file: two-space indent plus a
/// final newline, so the file is both machine-parseable and `cat`-friendly.
pub fn atomic_write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let mut content = serde_json::to_vec_pretty(value)
        .map_err(|e| RelayError::UserError(format!("failed to serialize task record: {}", e)))?;
    content.push(b'\n');
    atomic_write(path, &content)
}

/// Build the temporary file path: `.{filename}.{pid}.tmp` in the target's
/// directory.
///
/// The pid suffix keeps concurrent writers (distinct launcher invocations
/// pointed at the same task file) from clobbering each other's temp files.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            RelayError::UserError(format!("invalid task file path '{}'", target.display()))
        })?;

    let temp_name = format!(".{}.{}.tmp", filename, std::process::id());
    Ok(parent.join(temp_name))
}

/// Write content to a file and sync it to disk, removing the file on failure.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        RelayError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        RelayError::UserError(format!("failed to write temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        RelayError::UserError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

/// Rename the temporary file onto the target, then sync the parent directory
/// so the new directory entry is durable.
fn replace_and_sync_dir(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        RelayError::UserError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
