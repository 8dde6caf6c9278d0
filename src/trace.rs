//! Per-invocation tool trace records
//!
//! Fires on PostToolUse for every tool. Each invocation becomes one JSONL
//! record: identity fields from the envelope, routed-tool breakdown, agent
//! attribution from the task store, tool-specific columns, and clipped raw
//! payloads. Records carry every column, null when absent, so the log is
//! uniform for downstream analysis.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::agents;
use crate::config::Config;
use crate::envelope::HookEnvelope;
use crate::fields;
use crate::paths::HookPaths;
use crate::store;
use crate::tasks::TaskStore;

const LIMIT_FILE_PATH: usize = 150;
const LIMIT_COMMAND: usize = 150;
const LIMIT_QUERY: usize = 150;
const LIMIT_DESCRIPTION: usize = 100;
const LIMIT_PATTERN: usize = 100;
const LIMIT_PAYLOAD: usize = 200;

/// Alias spellings for the file path column, input side first.
const FILE_PATH_KEYS: &[&str] = &["file_path", "filePath", "path"];

/// Tool-specific columns a rule can fill.
#[derive(Clone, Copy, Debug)]
enum Column {
    Command,
    Description,
    Pattern,
    Url,
    Query,
    Model,
}

/// One extraction rule: for a tool, fill a column from the first present
/// alias, checking input keys before response keys.
struct ExtractRule {
    tool: &'static str,
    column: Column,
    limit: Option<usize>,
    input: &'static [&'static str],
    response: &'static [&'static str],
}

const EXTRACT_RULES: &[ExtractRule] = &[
    ExtractRule {
        tool: "Bash",
        column: Column::Command,
        limit: Some(LIMIT_COMMAND),
        input: &["command", "cmd"],
        response: &[],
    },
    ExtractRule {
        tool: "Bash",
        column: Column::Description,
        limit: Some(LIMIT_DESCRIPTION),
        input: &["description"],
        response: &[],
    },
    ExtractRule {
        tool: "Glob",
        column: Column::Pattern,
        limit: Some(LIMIT_PATTERN),
        input: &["pattern"],
        response: &[],
    },
    ExtractRule {
        tool: "Grep",
        column: Column::Pattern,
        limit: Some(LIMIT_PATTERN),
        input: &["pattern"],
        response: &[],
    },
    ExtractRule {
        tool: "Grep",
        column: Column::Query,
        limit: Some(LIMIT_QUERY),
        input: &["query"],
        response: &[],
    },
    ExtractRule {
        tool: "WebFetch",
        column: Column::Url,
        limit: None,
        input: &["url"],
        response: &[],
    },
    ExtractRule {
        tool: "WebSearch",
        column: Column::Url,
        limit: None,
        input: &["url"],
        response: &[],
    },
    ExtractRule {
        tool: "WebSearch",
        column: Column::Query,
        limit: Some(LIMIT_QUERY),
        input: &["query"],
        response: &[],
    },
    ExtractRule {
        tool: "Task",
        column: Column::Model,
        limit: None,
        input: &["model"],
        response: &[],
    },
];

#[derive(Default)]
struct Columns {
    command: Option<String>,
    description: Option<String>,
    pattern: Option<String>,
    url: Option<String>,
    query: Option<String>,
    model: Option<String>,
}

impl Columns {
    fn set(&mut self, column: Column, value: Option<String>) {
        match column {
            Column::Command => self.command = value,
            Column::Description => self.description = value,
            Column::Pattern => self.pattern = value,
            Column::Url => self.url = value,
            Column::Query => self.query = value,
            Column::Model => self.model = value,
        }
    }
}

/// Server and tool halves of a routed tool name.
#[derive(Debug, PartialEq)]
struct McpName {
    server: String,
    tool: String,
}

/// Parse a routed tool name, either mcp__server__tool or mcp:server:tool.
/// The split is on the first delimiter pair, so server names with single
/// underscores survive and extra segments stay in the tool half.
fn parse_mcp_name(tool_name: &str) -> Option<McpName> {
    let rest = tool_name.strip_prefix("mcp")?;
    for delim in ["__", ":"] {
        if let Some(rest) = rest.strip_prefix(delim) {
            return rest.split_once(delim).map(|(server, tool)| McpName {
                server: server.to_string(),
                tool: tool.to_string(),
            });
        }
    }
    None
}

/// Who gets credit for a tool call.
#[derive(Debug, Default)]
struct Attribution {
    agent_name: Option<String>,
    subagent_type: Option<String>,
    model: Option<String>,
}

/// Attribute a call: Task calls name the spawned subagent, everything else
/// goes to the running task's agent, then the lingering current agent, then
/// the configured orchestrator.
fn attribute(
    tool_name: &str,
    input: &Map<String, Value>,
    state: &TaskStore,
    config: &Config,
) -> Attribution {
    let mut attribution = if tool_name == "Task" {
        let subagent_type = fields::str_of(input, &["subagent_type"]);
        Attribution {
            agent_name: subagent_type.as_deref().and_then(agents::display_name),
            subagent_type,
            model: fields::str_of(input, &["model"]),
        }
    } else if let Some(task) = state.running_task() {
        Attribution {
            agent_name: task.agent_name.clone(),
            subagent_type: task.subagent_type.clone(),
            model: task.model.clone(),
        }
    } else if let Some(current) = state
        .current_agent
        .as_ref()
        .filter(|name| !name.is_empty())
    {
        Attribution {
            agent_name: Some(current.clone()),
            subagent_type: None,
            model: None,
        }
    } else {
        Attribution::default()
    };

    let unnamed = attribution.agent_name.as_deref().map_or(true, str::is_empty);
    if unnamed && tool_name != "Task" {
        attribution.agent_name = Some(config.agents.orchestrator.clone());
    }
    attribution
}

/// One tool trace line. Field order is the on-disk column order.
#[derive(Debug, Serialize)]
pub struct TraceRecord {
    pub timestamp: String,
    pub session_id: String,
    pub tool_use_id: String,
    pub tool_name: String,
    pub is_mcp: bool,
    pub mcp_server: Option<String>,
    pub mcp_tool: Option<String>,
    pub permission_mode: String,
    pub cwd: String,
    pub agent_name: Option<String>,
    pub subagent_type: Option<String>,
    pub model: Option<String>,
    pub file_path: Option<String>,
    pub command: Option<String>,
    pub description: Option<String>,
    pub pattern: Option<String>,
    pub url: Option<String>,
    pub query: Option<String>,
    pub status: Option<Value>,
    pub num_files: Option<Value>,
    pub num_matches: Option<Value>,
    pub http_code: Option<Value>,
    pub bytes: Option<Value>,
    pub has_stderr: bool,
    pub interrupted: Option<Value>,
    pub tool_input: Option<String>,
    pub tool_response: Option<String>,
}

fn build_record(
    envelope: &HookEnvelope,
    state: &TaskStore,
    config: &Config,
    env_model: Option<&str>,
) -> TraceRecord {
    // Raw payloads are clipped before normalization so the log shows what
    // the host actually sent.
    let tool_input_log = envelope
        .tool_input
        .as_ref()
        .and_then(|value| fields::clip(value, Some(LIMIT_PAYLOAD)));
    let tool_response_log = envelope
        .tool_response
        .as_ref()
        .and_then(|value| fields::clip(value, Some(LIMIT_PAYLOAD)));

    let input = fields::normalize_payload(envelope.tool_input.clone());
    let response = fields::normalize_payload(envelope.tool_response.clone());

    let mcp = parse_mcp_name(&envelope.tool_name);
    let attribution = attribute(&envelope.tool_name, &input, state, config);

    let mut columns = Columns::default();
    for rule in EXTRACT_RULES {
        if rule.tool != envelope.tool_name {
            continue;
        }
        let value = fields::first_of(&input, rule.input)
            .or_else(|| fields::first_of(&response, rule.response));
        columns.set(rule.column, value.and_then(|v| fields::clip(v, rule.limit)));
    }

    // File path falls back to the response side when the input side is
    // absent or empty.
    let file_path = fields::first_of(&input, FILE_PATH_KEYS)
        .filter(|value| fields::truthy(value))
        .or_else(|| fields::first_of(&response, FILE_PATH_KEYS))
        .and_then(|value| fields::clip(value, Some(LIMIT_FILE_PATH)));

    let model = envelope
        .model
        .clone()
        .filter(|model| !model.is_empty())
        .or_else(|| columns.model.clone().filter(|model| !model.is_empty()))
        .or_else(|| attribution.model.clone().filter(|model| !model.is_empty()))
        .or_else(|| env_model.map(str::to_string));

    let has_stderr = response
        .get("stderr")
        .map(fields::truthy)
        .unwrap_or(false);

    TraceRecord {
        timestamp: store::now_stamp(),
        session_id: envelope.session_id.clone(),
        tool_use_id: envelope.tool_use_id.clone(),
        tool_name: envelope.tool_name.clone(),
        is_mcp: mcp.is_some(),
        mcp_server: mcp.as_ref().map(|name| name.server.clone()),
        mcp_tool: mcp.as_ref().map(|name| name.tool.clone()),
        permission_mode: envelope.permission_mode.clone(),
        cwd: envelope.cwd.clone(),
        agent_name: attribution.agent_name,
        subagent_type: attribution.subagent_type,
        model,
        file_path,
        command: columns.command,
        description: columns.description,
        pattern: columns.pattern,
        url: columns.url,
        query: columns.query,
        status: response.get("status").cloned(),
        num_files: fields::first_of(&response, &["numFiles", "num_files", "file_count"]).cloned(),
        num_matches: fields::first_of(&response, &["numMatches", "num_matches", "match_count"])
            .cloned(),
        http_code: fields::first_of(&response, &["httpCode", "http_code", "status_code"]).cloned(),
        bytes: fields::first_of(&response, &["bytes", "content_length"]).cloned(),
        has_stderr,
        interrupted: response.get("interrupted").cloned(),
        tool_input: tool_input_log,
        tool_response: tool_response_log,
    }
}

/// Trace one tool invocation to the tool trace log.
pub fn run(envelope: &HookEnvelope, paths: &HookPaths, config: &Config, env_model: Option<&str>) {
    let state = TaskStore::load(paths);
    let record = build_record(envelope, &state, config, env_model);
    if let Err(err) = store::append_jsonl(&paths.tool_trace_log(), &record) {
        eprintln!("Failed to write tool trace: {}", err);
    }
}
