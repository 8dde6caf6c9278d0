//! Cross-agent context sharing
//!
//! When a finished Task's output contains a decision, constraint, pattern,
//! warning, or insight, the share hook stores it in the project context
//! file. The inject hook replays stored context on the next user prompt so
//! later agents inherit what earlier ones learned. Decisions never expire;
//! everything else lapses after a day.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Local};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agents;
use crate::config::Config;
use crate::envelope::HookEnvelope;
use crate::fields;
use crate::paths::HookPaths;
use crate::store;

/// Sentence classifiers, checked in order. The first matching category
/// claims the sentence.
const CATEGORY_PATTERNS: &[(&str, &[&str])] = &[
    (
        "decision",
        &[
            r"decided to use",
            r"we('ll| will) go with",
            r"the approach is",
            r"architecture decision",
            r"design choice",
        ],
    ),
    (
        "constraint",
        &[
            r"must (not |never )?",
            r"cannot",
            r"limitation",
            r"constraint",
            r"required to",
            r"performance requirement",
        ],
    ),
    (
        "pattern",
        &[
            r"pattern (is|we use)",
            r"convention is",
            r"standard approach",
            r"best practice",
            r"always use",
        ],
    ),
    (
        "warning",
        &[
            r"gotcha",
            r"be careful",
            r"watch out",
            r"don't forget",
            r"common mistake",
            r"bug (in|with)",
        ],
    ),
    (
        "insight",
        &[
            r"learned that",
            r"discovered that",
            r"found out",
            r"realized",
            r"key insight",
        ],
    ),
];

const CATEGORY_ICONS: &[(&str, &str)] = &[
    ("decision", "📋"),
    ("constraint", "⚠️"),
    ("pattern", "🔄"),
    ("warning", "🚨"),
    ("insight", "💡"),
];

/// Fallback response keys holding plain-text agent output.
const OUTPUT_KEYS: &[&str] = &["output", "result", "message", "text", "response"];

/// One stored piece of shared context.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn load_entries(paths: &HookPaths) -> Vec<ContextEntry> {
    store::read_json_or_default(&paths.context_store())
}

/// Persist entries, dropping expired ones and capping at the configured
/// maximum, oldest first.
fn save_entries(paths: &HookPaths, config: &Config, mut entries: Vec<ContextEntry>) {
    let now = Local::now();
    entries.retain(|entry| !is_expired(entry, &now));
    let max = config.context.max_entries;
    if entries.len() > max {
        let excess = entries.len() - max;
        entries.drain(..excess);
    }
    if let Err(err) = store::write_json(
        &paths.context_store(),
        &entries,
        config.state.write_strategy,
    ) {
        eprintln!("Failed to save shared context: {}", err);
    }
}

/// An entry is expired when its expiry parses and lies in the past.
/// Unparseable expiries keep the entry alive.
fn is_expired(entry: &ContextEntry, now: &DateTime<Local>) -> bool {
    match entry.expires_at.as_deref() {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(expires) => expires.with_timezone(&Local) < *now,
            Err(_) => false,
        },
        None => false,
    }
}

/// Split text into sentences and classify each against the category
/// patterns. Sentences under 20 chars are noise and skipped.
fn detect_shareable(text: &str) -> Vec<(String, String)> {
    let splitter = Regex::new(r"[.!?]\s+").unwrap();
    let patterns: Vec<(&str, Vec<Regex>)> = CATEGORY_PATTERNS
        .iter()
        .map(|(category, sources)| {
            let compiled = sources
                .iter()
                .map(|source| Regex::new(source).unwrap())
                .collect();
            (*category, compiled)
        })
        .collect();

    let mut results = Vec::new();
    for sentence in splitter.split(text) {
        let lowered = sentence.to_lowercase();
        let lowered = lowered.trim();
        if lowered.chars().count() < 20 {
            continue;
        }
        for (category, compiled) in &patterns {
            if compiled.iter().any(|pattern| pattern.is_match(lowered)) {
                results.push((category.to_string(), clean_sentence(sentence)));
                break;
            }
        }
    }
    results
}

fn clean_sentence(sentence: &str) -> String {
    let cleaned = sentence.trim();
    if cleaned.chars().count() > 200 {
        let cut: String = cleaned.chars().take(200).collect();
        format!("{}...", cut)
    } else {
        cleaned.to_string()
    }
}

/// Pull the agent's text output from a Task response: text blocks joined
/// with newlines, else the first non-empty string fallback key.
fn extract_output(response: &Map<String, Value>) -> String {
    let mut output = String::new();
    if let Some(Value::Array(blocks)) = response.get("content") {
        let parts: Vec<&str> = blocks
            .iter()
            .filter_map(Value::as_object)
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .map(|block| block.get("text").and_then(Value::as_str).unwrap_or(""))
            .collect();
        output = parts.join("\n");
    }
    if output.is_empty() {
        for key in OUTPUT_KEYS {
            if let Some(text) = response.get(*key).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    output
}

fn generate_id() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn nonempty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Share hook: classify a finished Task's output and store what it learned.
pub fn run_share(envelope: &HookEnvelope, paths: &HookPaths, config: &Config) {
    let input = fields::normalize_payload(envelope.tool_input.clone());
    let response = fields::normalize_payload(envelope.tool_response.clone());
    let role =
        fields::str_of(&input, &["subagent_type"]).unwrap_or_else(|| "unknown".to_string());
    let agent = agents::display_name(&role).unwrap_or(role);

    let output = extract_output(&response);
    if output.is_empty() {
        return;
    }
    let found = detect_shareable(&output);
    if found.is_empty() {
        return;
    }

    let mut entries = load_entries(paths);
    let mut added = Vec::new();
    let now = Local::now();
    for (category, content) in found {
        // Duplicate when the first 50 chars match a recent entry, including
        // ones added earlier in this same pass.
        let duplicate = entries
            .iter()
            .rev()
            .take(10)
            .any(|recent| recent.content.chars().take(50).eq(content.chars().take(50)));
        if duplicate {
            continue;
        }
        let expires_at = if category == "decision" {
            None
        } else {
            Some((now + Duration::hours(24)).to_rfc3339())
        };
        entries.push(ContextEntry {
            id: generate_id(),
            agent: agent.clone(),
            category: category.clone(),
            content: content.clone(),
            timestamp: now.to_rfc3339(),
            session_id: nonempty(&envelope.session_id),
            expires_at,
            tags: Vec::new(),
        });
        added.push((category, content));
    }

    if !added.is_empty() {
        save_entries(paths, config, entries);
        for (category, content) in &added {
            let preview: String = content.chars().take(80).collect();
            println!("💡 Context shared [{}]: {}...", category, preview);
        }
    }
}

/// Inject hook: print stored context as a block the host prepends to the
/// prompt. Prints nothing when there is nothing alive to inject.
pub fn run_inject(envelope: &HookEnvelope, paths: &HookPaths) {
    let now = Local::now();
    let entries: Vec<ContextEntry> = load_entries(paths)
        .into_iter()
        .filter(|entry| !is_expired(entry, &now))
        .collect();
    if entries.is_empty() {
        return;
    }
    let session_id = nonempty(&envelope.session_id);
    println!("{}", format_injection(&entries, session_id.as_deref()));
}

fn format_injection(entries: &[ContextEntry], session_id: Option<&str>) -> String {
    let (current, previous): (Vec<&ContextEntry>, Vec<&ContextEntry>) =
        entries.iter().partition(|entry| {
            session_id.is_some() && entry.session_id.as_deref() == session_id
        });

    let mut lines = vec![
        "<shared-agent-context>".to_string(),
        "The following context was shared by previous agents in this session:".to_string(),
        String::new(),
    ];
    if !current.is_empty() {
        lines.push("=== Current Session ===".to_string());
        push_groups(&mut lines, &current);
    }
    if !previous.is_empty() {
        if !current.is_empty() {
            lines.push("=== Previous Sessions ===".to_string());
        }
        push_groups(&mut lines, &previous);
    }
    lines.push("</shared-agent-context>".to_string());
    lines.join("\n")
}

/// Append grouped entries: categories in first-seen order, last 3 entries
/// per category, blank line after each group.
fn push_groups(lines: &mut Vec<String>, entries: &[&ContextEntry]) {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&ContextEntry>> = HashMap::new();
    for entry in entries {
        let category = if entry.category.is_empty() {
            "other"
        } else {
            entry.category.as_str()
        };
        if !groups.contains_key(category) {
            order.push(category);
        }
        groups.entry(category).or_default().push(entry);
    }

    for category in order {
        let items = &groups[category];
        let icon = CATEGORY_ICONS
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, icon)| *icon)
            .unwrap_or("•");
        lines.push(format!("{} {}:", icon, category.to_uppercase()));
        let start = items.len().saturating_sub(3);
        for item in &items[start..] {
            let agent = if item.agent.is_empty() {
                "Unknown"
            } else {
                item.agent.as_str()
            };
            lines.push(format!("  - [{}]: {}", agent, item.content));
        }
        lines.push(String::new());
    }
}
