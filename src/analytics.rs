//! End-of-session metrics from the transcript
//!
//! Fires on SessionEnd. Scans the session transcript JSONL, tallies file
//! operations, commands, agents, and errors, and appends one summary record
//! to the session metrics log. A missing transcript still produces a record
//! so every session shows up in the log.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::HookEnvelope;
use crate::fields;
use crate::paths::HookPaths;
use crate::store;

/// Tallies collected from one transcript.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    pub duration_seconds: i64,
    pub files_created: Vec<String>,
    pub files_modified: Vec<String>,
    pub files_read: Vec<String>,
    pub bash_commands: Vec<String>,
    pub agents_used: BTreeMap<String, u64>,
    pub tools_used: BTreeMap<String, u64>,
    pub errors: Vec<String>,
    pub user_prompts: u64,
    pub assistant_messages: u64,
}

/// Scan a transcript JSONL file. Unreadable files yield empty metrics,
/// unparseable lines are skipped.
pub fn parse_transcript(path: &Path) -> SessionMetrics {
    let mut metrics = SessionMetrics::default();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return metrics,
    };

    let mut first_timestamp: Option<String> = None;
    let mut last_timestamp: Option<String> = None;
    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let entry: Value = match serde_json::from_str(line.trim()) {
            Ok(value) => value,
            Err(_) => continue,
        };

        if let Some(ts) = entry.get("timestamp").and_then(Value::as_str) {
            if first_timestamp.is_none() {
                first_timestamp = Some(ts.to_string());
            }
            last_timestamp = Some(ts.to_string());
        }

        match entry.get("type").and_then(Value::as_str).unwrap_or("") {
            "human" => metrics.user_prompts += 1,
            "assistant" => metrics.assistant_messages += 1,
            _ => {}
        }

        if let Some(tool_name) = entry.get("tool_name").and_then(Value::as_str) {
            *metrics.tools_used.entry(tool_name.to_string()).or_insert(0) += 1;

            let empty = Map::new();
            let input = entry
                .get("tool_input")
                .and_then(Value::as_object)
                .unwrap_or(&empty);
            match tool_name {
                "Write" => push_nonempty(&mut metrics.files_created, input.get("file_path")),
                "Edit" => push_nonempty(&mut metrics.files_modified, input.get("file_path")),
                "Read" => push_nonempty(&mut metrics.files_read, input.get("file_path")),
                "Bash" => {
                    if let Some(cmd) = input.get("command").and_then(Value::as_str) {
                        if !cmd.is_empty() {
                            metrics.bash_commands.push(cmd.chars().take(100).collect());
                        }
                    }
                }
                "Task" => {
                    let agent = input
                        .get("subagent_type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    *metrics.agents_used.entry(agent.to_string()).or_insert(0) += 1;
                }
                _ => {}
            }
        }

        if entry.get("is_error").map(fields::truthy).unwrap_or(false) {
            let content = entry.get("content");
            let text = match content.and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => content.map(Value::to_string).unwrap_or_default(),
            };
            metrics.errors.push(text.chars().take(100).collect());
        }
    }

    if let (Some(first), Some(last)) = (first_timestamp, last_timestamp) {
        metrics.duration_seconds = duration_between(&first, &last);
    }
    metrics
}

fn push_nonempty(target: &mut Vec<String>, value: Option<&Value>) {
    if let Some(path) = value.and_then(Value::as_str) {
        if !path.is_empty() {
            target.push(path.to_string());
        }
    }
}

/// Seconds between the first and last transcript timestamps. Only the first
/// 19 chars are parsed, in either T-separated or space-separated form.
fn duration_between(first: &str, last: &str) -> i64 {
    fn parse(ts: &str) -> Option<NaiveDateTime> {
        let head: String = ts.chars().take(19).collect();
        NaiveDateTime::parse_from_str(&head, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&head, store::TIMESTAMP_FORMAT))
            .ok()
    }
    match (parse(first), parse(last)) {
        (Some(start), Some(end)) => (end - start).num_seconds(),
        _ => 0,
    }
}

#[derive(Serialize)]
struct MetricsRecord<'a> {
    timestamp: String,
    session_id: &'a str,
    duration_seconds: i64,
    files_created_count: usize,
    files_modified_count: usize,
    files_read_count: usize,
    bash_commands_count: usize,
    agents_used: &'a BTreeMap<String, u64>,
    tools_used: &'a BTreeMap<String, u64>,
    errors_count: usize,
    user_prompts: u64,
    assistant_messages: u64,
}

/// Append one metrics record for the ending session.
pub fn run(envelope: &HookEnvelope, paths: &HookPaths) {
    let metrics = match envelope
        .transcript_path
        .as_deref()
        .filter(|path| !path.is_empty())
    {
        Some(path) => parse_transcript(Path::new(path)),
        None => SessionMetrics::default(),
    };

    let session_id = if envelope.session_id.is_empty() {
        "unknown"
    } else {
        envelope.session_id.as_str()
    };
    let record = MetricsRecord {
        timestamp: Local::now().to_rfc3339(),
        session_id,
        duration_seconds: metrics.duration_seconds,
        files_created_count: metrics.files_created.len(),
        files_modified_count: metrics.files_modified.len(),
        files_read_count: metrics.files_read.len(),
        bash_commands_count: metrics.bash_commands.len(),
        agents_used: &metrics.agents_used,
        tools_used: &metrics.tools_used,
        errors_count: metrics.errors.len(),
        user_prompts: metrics.user_prompts,
        assistant_messages: metrics.assistant_messages,
    };
    if let Err(err) = store::append_jsonl(&paths.session_metrics_log(), &record) {
        eprintln!("Failed to write session metrics: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_transcript(dir: &Path, lines: &[Value]) -> std::path::PathBuf {
        let path = dir.join("transcript.jsonl");
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_parse_transcript_tallies() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(
            dir.path(),
            &[
                json!({"timestamp": "2026-08-21T10:00:00.000Z", "type": "human"}),
                json!({"type": "assistant"}),
                json!({"tool_name": "Write", "tool_input": {"file_path": "/src/a.rs"}}),
                json!({"tool_name": "Edit", "tool_input": {"file_path": "/src/a.rs"}}),
                json!({"tool_name": "Read", "tool_input": {"file_path": ""}}),
                json!({"tool_name": "Bash", "tool_input": {"command": "cargo build --release"}}),
                json!({"tool_name": "Task", "tool_input": {"subagent_type": "QA Tester"}}),
                json!({"tool_name": "Task", "tool_input": {}}),
                json!({"is_error": true, "content": "something broke"}),
                json!({"timestamp": "2026-08-21T10:02:30.000Z", "type": "human"}),
            ],
        );
        let metrics = parse_transcript(&path);
        assert_eq!(metrics.user_prompts, 2);
        assert_eq!(metrics.assistant_messages, 1);
        assert_eq!(metrics.files_created, vec!["/src/a.rs"]);
        assert_eq!(metrics.files_modified, vec!["/src/a.rs"]);
        assert!(metrics.files_read.is_empty());
        assert_eq!(metrics.bash_commands, vec!["cargo build --release"]);
        assert_eq!(metrics.agents_used["QA Tester"], 1);
        assert_eq!(metrics.agents_used["unknown"], 1);
        assert_eq!(metrics.tools_used["Task"], 2);
        assert_eq!(metrics.errors, vec!["something broke"]);
        assert_eq!(metrics.duration_seconds, 150);
    }

    #[test]
    fn test_parse_transcript_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        std::fs::write(&path, "not json\n{\"type\": \"human\"}\n").unwrap();
        let metrics = parse_transcript(&path);
        assert_eq!(metrics.user_prompts, 1);
    }

    #[test]
    fn test_parse_transcript_missing_file() {
        let metrics = parse_transcript(Path::new("/definitely/not/here.jsonl"));
        assert_eq!(metrics.user_prompts, 0);
        assert_eq!(metrics.duration_seconds, 0);
    }

    #[test]
    fn test_bash_command_cut_to_100() {
        let dir = tempfile::tempdir().unwrap();
        let long = "x".repeat(300);
        let path = write_transcript(
            dir.path(),
            &[json!({"tool_name": "Bash", "tool_input": {"command": long}})],
        );
        let metrics = parse_transcript(&path);
        assert_eq!(metrics.bash_commands[0].chars().count(), 100);
    }

    #[test]
    fn test_duration_between_formats() {
        assert_eq!(
            duration_between("2026-08-21T10:00:00.000Z", "2026-08-21T10:01:00.000Z"),
            60
        );
        assert_eq!(
            duration_between("2026-08-21 10:00:00", "2026-08-21 10:00:45"),
            45
        );
        assert_eq!(duration_between("garbage", "2026-08-21 10:00:45"), 0);
    }

    #[test]
    fn test_run_appends_record() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HookPaths::for_project(dir.path());
        let transcript = write_transcript(
            dir.path(),
            &[
                json!({"timestamp": "2026-08-21T10:00:00Z", "type": "human"}),
                json!({"tool_name": "Bash", "tool_input": {"command": "ls"}}),
                json!({"timestamp": "2026-08-21T10:05:00Z"}),
            ],
        );
        let envelope = HookEnvelope {
            session_id: "sess-9".to_string(),
            hook_event_name: "SessionEnd".to_string(),
            transcript_path: Some(transcript.to_string_lossy().to_string()),
            ..Default::default()
        };
        run(&envelope, &paths);

        let content = std::fs::read_to_string(paths.session_metrics_log()).unwrap();
        let record: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(record["session_id"], "sess-9");
        assert_eq!(record["duration_seconds"], 300);
        assert_eq!(record["bash_commands_count"], 1);
        assert_eq!(record["user_prompts"], 1);
    }

    #[test]
    fn test_run_without_transcript_records_unknown_session() {
        let dir = tempfile::tempdir().unwrap();
        let paths = HookPaths::for_project(dir.path());
        let envelope = HookEnvelope {
            hook_event_name: "SessionEnd".to_string(),
            ..Default::default()
        };
        run(&envelope, &paths);

        let content = std::fs::read_to_string(paths.session_metrics_log()).unwrap();
        let record: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(record["session_id"], "unknown");
        assert_eq!(record["duration_seconds"], 0);
        assert_eq!(record["files_created_count"], 0);
    }
}
