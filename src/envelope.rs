//! Hook event envelope read from stdin
//!
//! The host feeds each hook one JSON object describing the event. Hooks are
//! observers: anything unreadable, including an empty object, means there is
//! nothing to observe and the hook exits quietly.

use std::io::Read;

use serde::Deserialize;
use serde_json::Value;

/// Event fields common to every hook invocation. Absent fields take their
/// defaults; unknown fields are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HookEnvelope {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub tool_use_id: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub hook_event_name: String,
    #[serde(default)]
    pub permission_mode: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
    #[serde(default)]
    pub tool_response: Option<Value>,
}

/// Read and parse an envelope. Returns None for unreadable input, non-JSON,
/// non-object JSON, or an empty object.
pub fn read_envelope(input: &mut impl Read) -> Option<HookEnvelope> {
    let mut raw = String::new();
    input.read_to_string(&mut raw).ok()?;
    let value: Value = serde_json::from_str(&raw).ok()?;
    let is_empty = value.as_object().map_or(true, |fields| fields.is_empty());
    if is_empty {
        return None;
    }
    serde_json::from_value(value).ok()
}
