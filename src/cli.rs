//! Command line parsing for the crewtrace binary

use std::env;
use std::process;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Track Task delegation lifecycle (PreToolUse and PostToolUse)
    TaskContext,
    /// Log one tool invocation (PostToolUse, all tools)
    ToolTrace,
    /// Store shareable context from Task output (PostToolUse)
    ContextShare,
    /// Print stored context for prompt injection (UserPromptSubmit)
    InjectContext,
    /// Record end-of-session metrics (SessionEnd)
    SessionAnalytics,
    /// Register hooks in settings.json
    Install { user: bool },
    /// Show the active task store
    Status { raw: bool },
}

pub fn parse_args() -> Command {
    parse(env::args().skip(1))
}

fn parse(mut args: impl Iterator<Item = String>) -> Command {
    let Some(command) = args.next() else {
        print_usage();
        process::exit(1);
    };

    match command.as_str() {
        "task-context" => Command::TaskContext,
        "tool-trace" => Command::ToolTrace,
        "context-share" => Command::ContextShare,
        "inject-context" => Command::InjectContext,
        "session-analytics" => Command::SessionAnalytics,
        "install" => {
            let mut user = false;
            for arg in args {
                match arg.as_str() {
                    "--user" | "-u" => user = true,
                    other => {
                        eprintln!("Unknown install option: {}", other);
                        process::exit(1);
                    }
                }
            }
            Command::Install { user }
        }
        "status" => {
            let mut raw = false;
            for arg in args {
                match arg.as_str() {
                    "--raw" | "-r" => raw = true,
                    other => {
                        eprintln!("Unknown status option: {}", other);
                        process::exit(1);
                    }
                }
            }
            Command::Status { raw }
        }
        "help" | "--help" | "-h" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Usage: crewtrace <command>");
    println!();
    println!("Hook commands (read one JSON event from stdin):");
    println!("  task-context       Track Task delegation lifecycle");
    println!("  tool-trace         Log one tool invocation");
    println!("  context-share      Store shareable context from Task output");
    println!("  inject-context     Print stored context for prompt injection");
    println!("  session-analytics  Record end-of-session metrics");
    println!();
    println!("Commands:");
    println!("  install [--user]   Register hooks in settings.json");
    println!("  status [--raw]     Show the active task store");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_vec(args: &[&str]) -> Command {
        parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn test_parse_hook_commands() {
        assert_eq!(parse_vec(&["task-context"]), Command::TaskContext);
        assert_eq!(parse_vec(&["tool-trace"]), Command::ToolTrace);
        assert_eq!(parse_vec(&["context-share"]), Command::ContextShare);
        assert_eq!(parse_vec(&["inject-context"]), Command::InjectContext);
        assert_eq!(parse_vec(&["session-analytics"]), Command::SessionAnalytics);
    }

    #[test]
    fn test_parse_install_flags() {
        assert_eq!(parse_vec(&["install"]), Command::Install { user: false });
        assert_eq!(
            parse_vec(&["install", "--user"]),
            Command::Install { user: true }
        );
        assert_eq!(parse_vec(&["install", "-u"]), Command::Install { user: true });
    }

    #[test]
    fn test_parse_status_flags() {
        assert_eq!(parse_vec(&["status"]), Command::Status { raw: false });
        assert_eq!(parse_vec(&["status", "--raw"]), Command::Status { raw: true });
        assert_eq!(parse_vec(&["status", "-r"]), Command::Status { raw: true });
    }
}
