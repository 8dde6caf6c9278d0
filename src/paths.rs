//! Project-relative locations for stores, logs, and settings
//!
//! Hooks run with an arbitrary working directory, so every path is resolved
//! against the project root the host hands us via CLAUDE_PROJECT_DIR. All
//! hook state lives under the project's .claude/ directory.

use std::env;
use std::path::{Path, PathBuf};

/// Env var the host sets to the project root when invoking hooks.
const PROJECT_DIR_VAR: &str = "CLAUDE_PROJECT_DIR";

/// Resolved anchor for all hook files.
#[derive(Clone, Debug)]
pub struct HookPaths {
    project_dir: PathBuf,
}

impl HookPaths {
    /// Resolve the project root: CLAUDE_PROJECT_DIR when set and non-empty,
    /// else the working directory.
    pub fn resolve() -> Self {
        let project_dir = env::var(PROJECT_DIR_VAR)
            .ok()
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::for_project(project_dir)
    }

    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn logs_dir(&self) -> PathBuf {
        self.project_dir.join(".claude").join("logs")
    }

    /// Active task store, keyed by tool_use_id.
    pub fn task_store(&self) -> PathBuf {
        self.logs_dir().join(".active_tasks.json")
    }

    /// Task lifecycle event log.
    pub fn task_trace_log(&self) -> PathBuf {
        self.logs_dir().join("task-trace.jsonl")
    }

    /// Per-invocation tool trace log.
    pub fn tool_trace_log(&self) -> PathBuf {
        self.logs_dir().join("tool-trace.jsonl")
    }

    /// Session metrics log.
    pub fn session_metrics_log(&self) -> PathBuf {
        self.logs_dir().join("session-metrics.jsonl")
    }

    /// Cross-agent shared context store.
    pub fn context_store(&self) -> PathBuf {
        self.project_dir
            .join(".claude")
            .join("context")
            .join("shared-context.json")
    }

    /// Host settings file holding hook registrations.
    pub fn settings_file(&self) -> PathBuf {
        self.project_dir.join(".claude").join("settings.json")
    }

    /// Optional crew configuration.
    pub fn config_file(&self) -> PathBuf {
        self.project_dir.join(".claude").join("crewtrace.toml")
    }
}
