//! Hook registration in the host's settings.json
//!
//! The install command wires every crewtrace subcommand into the project's
//! (or user's) .claude/settings.json. Merging is additive: our hooks are
//! identified by their command string, foreign hooks are never touched, and
//! a settings file we cannot parse is never overwritten.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use crate::config::WriteStrategy;
use crate::paths::HookPaths;
use crate::store;

/// Hook registrations: event, matcher, subcommand.
const REGISTRATIONS: &[(&str, Option<&str>, &str)] = &[
    ("PreToolUse", Some("Task"), "task-context"),
    ("PostToolUse", Some("Task"), "task-context"),
    ("PostToolUse", Some("Task"), "context-share"),
    ("PostToolUse", Some("*"), "tool-trace"),
    ("UserPromptSubmit", None, "inject-context"),
    ("SessionEnd", None, "session-analytics"),
];

/// Register all hooks in settings.json, project-level by default or
/// user-level with `user_level`.
pub fn install(paths: &HookPaths, user_level: bool) -> Result<()> {
    let binary = env::current_exe().context("Failed to resolve current executable")?;
    let settings_path = if user_level {
        dirs::home_dir()
            .context("Could not find home directory")?
            .join(".claude")
            .join("settings.json")
    } else {
        paths.settings_file()
    };
    merge_settings(&settings_path, &binary.to_string_lossy())
}

fn merge_settings(settings_path: &Path, binary: &str) -> Result<()> {
    let mut changed = false;

    // Load existing settings or create new. If settings.json is invalid, refuse to overwrite.
    let mut settings: Value = if settings_path.exists() {
        let content = fs::read_to_string(settings_path)
            .with_context(|| format!("Failed to read {}", settings_path.display()))?;
        serde_json::from_str(&content).with_context(|| {
            format!(
                "{} contains invalid JSON; refusing to overwrite",
                settings_path.display()
            )
        })?
    } else {
        changed = true;
        json!({})
    };

    settings
        .as_object_mut()
        .context("settings.json root must be a JSON object")?;

    // Ensure hooks object exists
    if settings.get("hooks").is_none() {
        settings["hooks"] = json!({});
        changed = true;
    }
    if !settings["hooks"].is_object() {
        bail!("settings.json hooks field must be a JSON object; refusing to overwrite");
    }

    for (event, matcher, subcommand) in REGISTRATIONS {
        let command = format!("{} {}", binary, subcommand);
        changed |= register(&mut settings["hooks"], event, *matcher, &command)?;
    }

    if !changed {
        return Ok(());
    }

    store::write_json(settings_path, &settings, WriteStrategy::Rename)
        .with_context(|| format!("Failed to write {}", settings_path.display()))
}

/// Ensure one command is registered exactly once under an event, in an
/// entry with the given matcher. Returns whether anything changed.
fn register(hooks: &mut Value, event: &str, matcher: Option<&str>, command: &str) -> Result<bool> {
    let mut changed = false;
    if hooks.get(event).is_none() {
        hooks[event] = json!([]);
        changed = true;
    }
    let entries = hooks[event]
        .as_array_mut()
        .with_context(|| format!("settings.json hooks.{} must be a JSON array", event))?;

    let is_our_hook = |hook: &Value| {
        hook.get("command")
            .and_then(|c| c.as_str())
            .is_some_and(|cmd| cmd == command)
    };

    // Keep the first occurrence and remove the rest, without touching other hooks.
    let mut kept_one = false;
    for entry in entries.iter_mut() {
        let Some(hooks_value) = entry.get_mut("hooks") else { continue };
        let Some(hooks_arr) = hooks_value.as_array_mut() else { continue };
        let before = hooks_arr.len();
        hooks_arr.retain(|hook| {
            if is_our_hook(hook) {
                if kept_one {
                    false
                } else {
                    kept_one = true;
                    true
                }
            } else {
                true
            }
        });
        if hooks_arr.len() != before {
            changed = true;
        }
    }

    if !kept_one {
        let our_hook = json!({"type": "command", "command": command});
        let mut placed = false;
        for entry in entries.iter_mut() {
            if !matcher_matches(entry, matcher) {
                continue;
            }
            let Some(hooks_arr) = entry.get_mut("hooks").and_then(Value::as_array_mut) else {
                continue;
            };
            hooks_arr.push(our_hook.clone());
            placed = true;
            break;
        }
        if !placed {
            let entry = match matcher {
                Some(matcher) => json!({"matcher": matcher, "hooks": [our_hook]}),
                None => json!({"hooks": [our_hook]}),
            };
            entries.push(entry);
        }
        changed = true;
    }

    // Drop any entries whose hooks array became empty (these were our-only entries).
    let before_len = entries.len();
    entries.retain(|entry| {
        entry
            .get("hooks")
            .and_then(|h| h.as_array())
            .map(|hooks_arr| !hooks_arr.is_empty())
            .unwrap_or(true)
    });
    if entries.len() != before_len {
        changed = true;
    }

    Ok(changed)
}

fn matcher_matches(entry: &Value, matcher: Option<&str>) -> bool {
    entry.get("matcher").and_then(Value::as_str) == matcher
}
