//! Task delegation lifecycle tracking
//!
//! Fires on PreToolUse and PostToolUse for the Task tool. Pre registers the
//! delegation in the active task store and marks its agent current; Post
//! closes it out and clears the current agent. Both sides append an event
//! to the task trace log, so the log tells the delegation story even when
//! one side of a pair never arrived.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agents;
use crate::config::Config;
use crate::envelope::HookEnvelope;
use crate::fields::{normalize_payload, str_of};
use crate::paths::HookPaths;
use crate::store;

/// One tracked delegation, keyed by tool_use_id in the store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default)]
    pub tool_use_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub subagent_type: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prompt_preview: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Persistent task state shared by the trace hooks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskStore {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskEntry>,
    #[serde(default)]
    pub current_agent: Option<String>,
    #[serde(default)]
    pub current_agent_id: Option<String>,
}

impl TaskStore {
    pub fn load(paths: &HookPaths) -> Self {
        store::read_json_or_default(&paths.task_store())
    }

    /// First still-running task, by tool_use_id order.
    pub fn running_task(&self) -> Option<&TaskEntry> {
        self.tasks.values().find(|task| task.status == "running")
    }

    fn save(&self, paths: &HookPaths, config: &Config) {
        if let Err(err) = store::write_json(&paths.task_store(), self, config.state.write_strategy)
        {
            eprintln!("Failed to save task state: {}", err);
        }
    }
}

#[derive(Serialize)]
struct TaskStartedRecord<'a> {
    event: &'static str,
    timestamp: &'a str,
    #[serde(flatten)]
    task: &'a TaskEntry,
}

#[derive(Serialize)]
struct TaskCompletedRecord<'a> {
    event: &'static str,
    timestamp: &'a str,
    tool_use_id: &'a str,
    session_id: &'a str,
    subagent_type: Option<&'a str>,
    agent_name: Option<&'a str>,
    agent_id: Option<&'a str>,
    model: Option<&'a str>,
    status: &'a str,
    started_at: Option<&'a str>,
    completed_at: Option<&'a str>,
}

/// Dispatch on the hook event. Anything other than Pre/PostToolUse is not
/// ours to track.
pub fn run(envelope: &HookEnvelope, paths: &HookPaths, config: &Config, env_model: Option<&str>) {
    match envelope.hook_event_name.as_str() {
        "PreToolUse" => handle_start(envelope, paths, config, env_model),
        "PostToolUse" => handle_completion(envelope, paths, config, env_model),
        _ => {}
    }
}

fn handle_start(
    envelope: &HookEnvelope,
    paths: &HookPaths,
    config: &Config,
    env_model: Option<&str>,
) {
    let input = normalize_payload(envelope.tool_input.clone());
    let subagent_type = str_of(&input, &["subagent_type"]);
    let agent_name = subagent_type
        .as_deref()
        .and_then(agents::display_name);
    let entry = TaskEntry {
        tool_use_id: envelope.tool_use_id.clone(),
        session_id: envelope.session_id.clone(),
        subagent_type,
        agent_name: agent_name.clone(),
        model: resolve_model(&input, env_model),
        description: str_of(&input, &["description"]).unwrap_or_default(),
        prompt_preview: prompt_preview(&input),
        started_at: Some(store::now_stamp()),
        status: "running".to_string(),
        agent_id: None,
        completed_at: None,
    };

    let mut state = TaskStore::load(paths);
    state
        .tasks
        .insert(envelope.tool_use_id.clone(), entry.clone());
    state.current_agent = agent_name;
    state.current_agent_id = None;
    state.save(paths, config);

    let record = TaskStartedRecord {
        event: "task_started",
        timestamp: entry.started_at.as_deref().unwrap_or(""),
        task: &entry,
    };
    if let Err(err) = store::append_jsonl(&paths.task_trace_log(), &record) {
        eprintln!("Failed to append task trace: {}", err);
    }
}

fn handle_completion(
    envelope: &HookEnvelope,
    paths: &HookPaths,
    config: &Config,
    env_model: Option<&str>,
) {
    let input = normalize_payload(envelope.tool_input.clone());
    let response = normalize_payload(envelope.tool_response.clone());
    let subagent_type = str_of(&input, &["subagent_type"]);
    let agent_name = subagent_type
        .as_deref()
        .and_then(agents::display_name);
    let model = resolve_model(&input, env_model);
    let agent_id = str_of(&response, &["agent_id"])
        .filter(|id| !id.is_empty())
        .or_else(|| str_of(&response, &["agentId"]));
    let status = str_of(&response, &["status"]).unwrap_or_else(|| "completed".to_string());
    let now = store::now_stamp();

    let mut state = TaskStore::load(paths);
    match state.tasks.get_mut(&envelope.tool_use_id) {
        Some(entry) => {
            entry.agent_id = agent_id.clone();
            entry.status = status.clone();
            entry.completed_at = Some(now.clone());
        }
        None => {
            // Post without a matching Pre: synthesize so the store still
            // knows the delegation happened.
            state.tasks.insert(
                envelope.tool_use_id.clone(),
                TaskEntry {
                    tool_use_id: envelope.tool_use_id.clone(),
                    session_id: envelope.session_id.clone(),
                    subagent_type: subagent_type.clone(),
                    agent_name: agent_name.clone(),
                    model: model.clone(),
                    description: String::new(),
                    prompt_preview: String::new(),
                    started_at: None,
                    status: status.clone(),
                    agent_id: agent_id.clone(),
                    completed_at: Some(now.clone()),
                },
            );
        }
    }
    if state.current_agent == agent_name {
        state.current_agent = None;
        state.current_agent_id = agent_id.clone();
    }
    state.save(paths, config);

    let entry = state.tasks.get(&envelope.tool_use_id);
    let record = TaskCompletedRecord {
        event: "task_completed",
        timestamp: &now,
        tool_use_id: &envelope.tool_use_id,
        session_id: &envelope.session_id,
        subagent_type: subagent_type.as_deref(),
        agent_name: agent_name.as_deref(),
        agent_id: agent_id.as_deref(),
        model: model.as_deref(),
        status: &status,
        started_at: entry.and_then(|e| e.started_at.as_deref()),
        completed_at: entry.and_then(|e| e.completed_at.as_deref()),
    };
    if let Err(err) = store::append_jsonl(&paths.task_trace_log(), &record) {
        eprintln!("Failed to append task trace: {}", err);
    }
}

/// Model for the entry: the call's own model parameter when non-empty, else
/// the environment. The envelope-level model is the session's, not the
/// delegation's.
fn resolve_model(
    input: &serde_json::Map<String, serde_json::Value>,
    env_model: Option<&str>,
) -> Option<String> {
    str_of(input, &["model"])
        .filter(|model| !model.is_empty())
        .or_else(|| env_model.map(str::to_string))
}

/// First 200 chars of the delegation prompt. Non-string prompts are
/// JSON-encoded before the cut.
fn prompt_preview(input: &serde_json::Map<String, serde_json::Value>) -> String {
    match input.get("prompt") {
        None => String::new(),
        Some(serde_json::Value::String(text)) => truncate_raw(text),
        Some(other) => truncate_raw(&other.to_string()),
    }
}

fn truncate_raw(text: &str) -> String {
    if text.chars().count() <= 200 {
        text.to_string()
    } else {
        text.chars().take(200).collect()
    }
}
