//! Configuration for crewtrace hooks
//!
//! Loaded from the project's .claude/crewtrace.toml. Every field has a
//! default, so hooks work with no config file at all. Load failures surface
//! as errors; callers fall back to the defaults rather than aborting.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// How JSON state files are replaced on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStrategy {
    /// Write the file in place.
    #[default]
    Overwrite,
    /// Write a temp file, then rename it over the target.
    Rename,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub write_strategy: WriteStrategy,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AgentsConfig {
    /// Name attributed to tool calls no subagent claims
    #[serde(default = "default_orchestrator")]
    pub orchestrator: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContextConfig {
    /// Cap on stored shared-context entries, oldest dropped first
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

fn default_orchestrator() -> String {
    "Ezio".to_string()
}

fn default_max_entries() -> usize {
    50
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            orchestrator: default_orchestrator(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

impl Config {
    /// Load config from file, or return default if not found
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }
}
