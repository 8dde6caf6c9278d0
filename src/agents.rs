//! Agent role to display name mapping
//!
//! Subagent roles are verbose ("QA Tester", "Frontend QA Specialist"); the
//! crew gives each one a short callsign so traces and shared context read
//! like a conversation between named teammates.

use std::env;

/// Role to callsign table. Unknown roles pass through unchanged.
/// The last two rows are legacy spellings kept for older host versions.
const AGENT_NAMES: &[(&str, &str)] = &[
    ("Main Orchestrator", "Ezio"),
    ("General Worker", "Scout"),
    ("Solution Architect", "Sage"),
    ("AI Engineer", "Kai"),
    ("Frontend Engineer", "Iris"),
    ("DevOps Engineer", "Devo"),
    ("QA Tester", "Vera"),
    ("Frontend QA Specialist", "Luna"),
    ("general-purpose", "Scout"),
    ("Explore", "Scout"),
];

/// Env vars consulted for the active model, in priority order.
const MODEL_ENV_VARS: &[&str] = &["ANTHROPIC_MODEL", "CLAUDE_MODEL", "MODEL"];

/// Resolve a role string to its display name. Known roles map to their
/// callsign, unknown roles pass through, empty input yields None.
pub fn display_name(role: &str) -> Option<String> {
    if role.is_empty() {
        return None;
    }
    let name = AGENT_NAMES
        .iter()
        .find(|(known, _)| *known == role)
        .map(|(_, name)| *name)
        .unwrap_or(role);
    Some(name.to_string())
}

/// First non-empty model name from the environment.
pub fn model_from_env() -> Option<String> {
    MODEL_ENV_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|value| !value.is_empty()))
}
