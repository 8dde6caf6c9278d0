//! End-to-end flows across the hook pipeline
//!
//! Drives the hook handlers the way the host would: a Task delegation
//! opens, tools run under it, the delegation closes, and the logs and
//! stores tell a consistent story.

use serde_json::{json, Value};

use crate::analytics;
use crate::config::Config;
use crate::context;
use crate::envelope::HookEnvelope;
use crate::paths::HookPaths;
use crate::tasks::{self, TaskStore};
use crate::trace;

fn task_event(
    event: &str,
    tool_use_id: &str,
    input: Value,
    response: Option<Value>,
) -> HookEnvelope {
    HookEnvelope {
        session_id: "sess-e2e".to_string(),
        tool_use_id: tool_use_id.to_string(),
        tool_name: "Task".to_string(),
        hook_event_name: event.to_string(),
        tool_input: Some(input),
        tool_response: response,
        ..Default::default()
    }
}

fn tool_event(tool: &str, tool_use_id: &str, input: Value, response: Value) -> HookEnvelope {
    HookEnvelope {
        session_id: "sess-e2e".to_string(),
        tool_use_id: tool_use_id.to_string(),
        tool_name: tool.to_string(),
        hook_event_name: "PostToolUse".to_string(),
        permission_mode: "default".to_string(),
        cwd: "/work".to_string(),
        tool_input: Some(input),
        tool_response: Some(response),
        ..Default::default()
    }
}

fn trace_lines(paths: &HookPaths) -> Vec<Value> {
    std::fs::read_to_string(paths.tool_trace_log())
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_delegation_attribution_flow() {
    let dir = tempfile::tempdir().unwrap();
    let paths = HookPaths::for_project(dir.path());
    let config = Config::default();

    // Orchestrator delegates to the QA agent.
    tasks::run(
        &task_event(
            "PreToolUse",
            "toolu_90",
            json!({"subagent_type": "QA Tester", "description": "verify the fix"}),
            None,
        ),
        &paths,
        &config,
        None,
    );

    // A tool call while the delegation runs is credited to the subagent.
    trace::run(
        &tool_event("Bash", "toolu_91", json!({"command": "cargo test"}), json!({})),
        &paths,
        &config,
        None,
    );
    let lines = trace_lines(&paths);
    assert_eq!(lines.last().unwrap()["agent_name"], "Vera");
    assert_eq!(lines.last().unwrap()["subagent_type"], "QA Tester");

    // The delegation finishes.
    tasks::run(
        &task_event(
            "PostToolUse",
            "toolu_90",
            json!({"subagent_type": "QA Tester"}),
            Some(json!({"agent_id": "agent-33", "status": "completed"})),
        ),
        &paths,
        &config,
        None,
    );
    let state = TaskStore::load(&paths);
    assert_eq!(state.current_agent, None);
    assert_eq!(state.current_agent_id.as_deref(), Some("agent-33"));
    assert_eq!(state.tasks["toolu_90"].status, "completed");

    // Tool calls after completion fall back to the orchestrator.
    trace::run(
        &tool_event("Read", "toolu_92", json!({"file_path": "/src/lib.rs"}), json!({})),
        &paths,
        &config,
        None,
    );
    let lines = trace_lines(&paths);
    assert_eq!(lines.last().unwrap()["agent_name"], "Ezio");
    assert_eq!(lines.last().unwrap()["file_path"], "/src/lib.rs");
}

#[test]
fn test_trace_record_shape() {
    let dir = tempfile::tempdir().unwrap();
    let paths = HookPaths::for_project(dir.path());
    trace::run(
        &tool_event(
            "Grep",
            "toolu_93",
            json!({"pattern": "fn run", "query": "run"}),
            json!({"numMatches": 2, "stderr": ""}),
        ),
        &paths,
        &Config::default(),
        None,
    );

    let raw = std::fs::read_to_string(paths.tool_trace_log()).unwrap();
    let line = raw.lines().next().unwrap();
    assert!(line.starts_with("{\"timestamp\":"));

    let record: Value = serde_json::from_str(line).unwrap();
    for key in [
        "session_id",
        "tool_use_id",
        "tool_name",
        "is_mcp",
        "mcp_server",
        "permission_mode",
        "cwd",
        "agent_name",
        "model",
        "file_path",
        "pattern",
        "query",
        "num_matches",
        "has_stderr",
        "interrupted",
        "tool_input",
        "tool_response",
    ] {
        assert!(record.get(key).is_some(), "missing key {}", key);
    }
    assert_eq!(record["num_matches"], 2);
    assert_eq!(record["has_stderr"], false);
    assert_eq!(record["is_mcp"], false);
}

#[test]
fn test_share_store_accumulates_across_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let paths = HookPaths::for_project(dir.path());
    let config = Config::default();

    context::run_share(
        &task_event(
            "PostToolUse",
            "toolu_94",
            json!({"subagent_type": "Solution Architect"}),
            Some(json!({"content": [
                {"type": "text", "text": "We decided to use JSONL for all trace logs."}
            ]})),
        ),
        &paths,
        &config,
    );
    context::run_share(
        &task_event(
            "PostToolUse",
            "toolu_95",
            json!({"subagent_type": "QA Tester"}),
            Some(json!({"content": [
                {"type": "text", "text": "Watch out for the flaky tempdir cleanup on CI."}
            ]})),
        ),
        &paths,
        &config,
    );

    let raw = std::fs::read_to_string(paths.context_store()).unwrap();
    let entries: Vec<Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["agent"], "Sage");
    assert_eq!(entries[0]["category"], "decision");
    assert_eq!(entries[0]["expires_at"], Value::Null);
    assert_eq!(entries[1]["agent"], "Vera");
    assert_eq!(entries[1]["category"], "warning");
    assert!(entries[1]["expires_at"].is_string());
    assert_eq!(entries[0]["id"].as_str().unwrap().len(), 8);
}

#[test]
fn test_session_metrics_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paths = HookPaths::for_project(dir.path());
    let transcript = dir.path().join("transcript.jsonl");
    let lines = [
        json!({"timestamp": "2026-08-21T09:00:00Z", "type": "human"}),
        json!({"tool_name": "Task", "tool_input": {"subagent_type": "QA Tester"}}),
        json!({"tool_name": "Write", "tool_input": {"file_path": "/src/new.rs"}}),
        json!({"timestamp": "2026-08-21T09:10:00Z", "type": "assistant"}),
    ];
    let content: String = lines.iter().map(|line| format!("{}\n", line)).collect();
    std::fs::write(&transcript, content).unwrap();

    analytics::run(
        &HookEnvelope {
            session_id: "sess-e2e".to_string(),
            hook_event_name: "SessionEnd".to_string(),
            transcript_path: Some(transcript.to_string_lossy().to_string()),
            ..Default::default()
        },
        &paths,
    );

    let raw = std::fs::read_to_string(paths.session_metrics_log()).unwrap();
    let record: Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    assert_eq!(record["session_id"], "sess-e2e");
    assert_eq!(record["duration_seconds"], 600);
    assert_eq!(record["files_created_count"], 1);
    assert_eq!(record["agents_used"]["QA Tester"], 1);
    assert_eq!(record["user_prompts"], 1);
    assert_eq!(record["assistant_messages"], 1);
}
