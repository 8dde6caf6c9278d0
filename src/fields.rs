//! Field extraction and normalization for loose host JSON
//!
//! Tool inputs and responses vary by host version and tool family: keys come
//! in camelCase and snake_case spellings, payloads arrive as objects or as
//! JSON-encoded strings, and flag fields carry whatever type the tool felt
//! like returning. Every lookup in the trace pipeline goes through these
//! helpers.

use serde_json::{Map, Value};

/// Suffix appended to truncated values
const ELLIPSIS: &str = "...";

/// Return the value of the first alias key present in the map.
///
/// Presence wins over content: a key holding null stops the search, the same
/// way a null field shadows its aliases in the host's own payloads.
pub fn first_of<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| data.get(*key))
}

/// String view of the first present alias. Non-string values yield None.
pub fn str_of(data: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_of(data, keys)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Re-parse a payload that may be a JSON-encoded string instead of a
/// structure. Strings that do not parse pass through unchanged.
pub fn parse_json_field(value: Value) -> Value {
    if let Value::String(ref raw) = value {
        if let Ok(parsed) = serde_json::from_str(raw) {
            return parsed;
        }
    }
    value
}

/// Normalize a payload field into an object map: re-parse embedded JSON,
/// then treat anything that is not an object as empty.
pub fn normalize_payload(value: Option<Value>) -> Map<String, Value> {
    match value.map(parse_json_field) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Render a value as log text, optionally cut to a char limit. Strings are
/// kept as-is, anything else is JSON-encoded first. Null yields None.
pub fn clip(value: &Value, limit: Option<usize>) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let text = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    Some(match limit {
        Some(limit) => truncate(&text, limit),
        None => text,
    })
}

/// Cut text to a char limit. Truncated results are exactly `limit` chars
/// long, ellipsis included.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text
        .chars()
        .take(limit.saturating_sub(ELLIPSIS.len()))
        .collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Loose truthiness for host flags: null, false, zero, and empty strings or
/// collections all count as absent.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(num) => num.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
