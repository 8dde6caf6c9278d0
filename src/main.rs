mod agents;
mod analytics;
mod cli;
mod config;
mod context;
mod envelope;
mod fields;
mod paths;
mod settings;
mod status;
mod store;
mod tasks;
mod trace;

#[cfg(test)]
mod pipeline_tests;

use std::io;

use anyhow::Result;

use crate::cli::Command;
use crate::config::Config;
use crate::envelope::HookEnvelope;
use crate::paths::HookPaths;

fn main() -> Result<()> {
    let command = cli::parse_args();
    let paths = HookPaths::resolve();

    match command {
        Command::TaskContext => run_hook(&paths, |envelope, paths, config| {
            tasks::run(envelope, paths, config, agents::model_from_env().as_deref());
        }),
        Command::ToolTrace => run_hook(&paths, |envelope, paths, config| {
            trace::run(envelope, paths, config, agents::model_from_env().as_deref());
        }),
        Command::ContextShare => run_hook(&paths, |envelope, paths, config| {
            context::run_share(envelope, paths, config);
        }),
        Command::InjectContext => run_hook(&paths, |envelope, paths, _config| {
            context::run_inject(envelope, paths);
        }),
        Command::SessionAnalytics => run_hook(&paths, |envelope, paths, _config| {
            analytics::run(envelope, paths);
        }),
        Command::Install { user } => settings::install(&paths, user)?,
        Command::Status { raw } => status::run(&paths, raw)?,
    }
    Ok(())
}

/// Hook commands always exit 0. An unreadable event means there is nothing
/// to observe, and write failures warn on stderr instead of blocking the
/// tool that triggered us.
fn run_hook(paths: &HookPaths, handler: impl FnOnce(&HookEnvelope, &HookPaths, &Config)) {
    let Some(envelope) = envelope::read_envelope(&mut io::stdin().lock()) else {
        return;
    };
    let config = Config::load(&paths.config_file()).unwrap_or_default();
    handler(&envelope, paths, &config);
}
