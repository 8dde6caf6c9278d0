//! Shared file primitives for hook state and logs
//!
//! Two shapes of persistence: small JSON state files read and rewritten
//! whole, and append-only JSONL logs. Reads degrade to defaults so a
//! missing or mangled file never breaks a hook.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::WriteStrategy;

/// Timestamp format used in state files and trace records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in the trace timestamp format.
pub fn now_stamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Read a JSON state file, falling back to the default on any failure.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

/// Write a JSON state file, creating parent directories as needed.
///
/// With the rename strategy the content lands in a pid-suffixed temp file
/// first. Concurrent hooks for the same project can still interleave whole
/// writes, but no reader ever sees a half-written file.
pub fn write_json<T: Serialize>(path: &Path, value: &T, strategy: WriteStrategy) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value).context("Failed to serialize state")?;
    match strategy {
        WriteStrategy::Overwrite => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        WriteStrategy::Rename => {
            let tmp = path.with_extension(format!("{}.tmp", std::process::id()));
            fs::write(&tmp, content)
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
            fs::rename(&tmp, path)
                .with_context(|| format!("Failed to rename temp file to {}", path.display()))?;
        }
    }
    Ok(())
}

/// Append one record to a JSONL log, creating parent directories as needed.
/// The record and trailing newline go out in a single write.
pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut line = serde_json::to_string(record).context("Failed to serialize record")?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("Failed to append to {}", path.display()))?;
    Ok(())
}
