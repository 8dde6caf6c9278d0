//! Operator view of the active task store

use anyhow::Result;

use crate::paths::HookPaths;
use crate::tasks::TaskStore;

/// Print the task store: raw JSON with `raw`, otherwise a short summary.
pub fn run(paths: &HookPaths, raw: bool) -> Result<()> {
    let state = TaskStore::load(paths);
    if raw {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("Project: {}", paths.project_dir().display());
    match &state.current_agent {
        Some(agent) => println!("Current agent: {}", agent),
        None => match &state.current_agent_id {
            Some(id) => println!("Current agent: none (last finished: {})", id),
            None => println!("Current agent: none"),
        },
    }

    let running: Vec<_> = state
        .tasks
        .values()
        .filter(|task| task.status == "running")
        .collect();
    let finished = state.tasks.len() - running.len();
    println!("Tasks: {} running, {} finished", running.len(), finished);

    if !running.is_empty() {
        println!();
        for task in running {
            let agent = task.agent_name.as_deref().unwrap_or("unnamed");
            let role = task.subagent_type.as_deref().unwrap_or("-");
            let started = task.started_at.as_deref().unwrap_or("-");
            println!(
                "  {}  {} ({})  started {}",
                task.tool_use_id, agent, role, started
            );
            if !task.description.is_empty() {
                println!("      {}", task.description);
            }
        }
    }
    Ok(())
}
