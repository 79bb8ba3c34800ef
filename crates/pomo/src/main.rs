//! pomo - a task list with a Pomodoro timer
//!
//! Usage:
//!   pomo add TITLE                 Add a task
//!   pomo list [--all|--current]    List tasks
//!   pomo set ID --current          Time this task
//!   pomo set ID --complete         Mark a task complete
//!   pomo remove ID                 Remove a task
//!   pomo timer start [--count-up]  Run the next interval
//!   pomo timer --show|--reset      Show or reset the session state
//!   pomo config --list|KEY VALUE   Show or change settings

mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pomo_core::{Config, Paths};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use pomo::countdown::Countdown;
use pomo::session::{SessionStore, SessionType};
use pomo::task::{self, Status, TaskStore};

/// Pomo - task list with a Pomodoro timer
#[derive(Parser)]
#[command(name = "pomo")]
#[command(about = "Simple todo list with a pomodoro timer")]
#[command(version)]
#[command(after_help = r#"WORKFLOW:
    pomo add "write the report"     # Add a task, prints its id
    pomo set <ID> --current         # Bind the timer to it
    pomo timer start                # Run the next interval
    pomo timer --show               # See what comes next

INTERVALS:
    Focus intervals alternate with short breaks. Every Nth completed
    focus interval (timers.interval, default 4) is followed by a long
    break instead.

TIMER KEYS:
    p / P        Pause
    c / C        Continue
    Esc, Ctrl-C  Quit (the interval is not recorded)

ALIASES:
    pomo a      # add
    pomo ls     # list
    pomo s      # set
    pomo rm     # remove
    pomo t      # timer
"#)]
struct Cli {
    /// Config file (default: ~/.config/pomo/config.toml)
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    #[command(alias = "a")]
    Add {
        /// Title of the task
        title: String,
    },

    /// List tasks (pending only by default)
    #[command(alias = "ls")]
    List {
        /// List all tasks regardless of their status
        #[arg(short, long)]
        all: bool,

        /// Show only the current task
        #[arg(short, long, conflicts_with = "all")]
        current: bool,
    },

    /// Set a task as current, or mark it complete
    #[command(alias = "s", alias = "set-status")]
    Set {
        /// Task id
        id: String,

        /// Use this task with the timer
        #[arg(long)]
        current: bool,

        /// Mark the task complete
        #[arg(long)]
        complete: bool,
    },

    /// Remove a task
    #[command(alias = "rm")]
    Remove {
        /// Task id
        id: String,
    },

    /// Control the pomodoro timer
    #[command(alias = "t")]
    Timer {
        /// Reset the session state
        #[arg(short, long)]
        reset: bool,

        /// Show the session state
        #[arg(short, long)]
        show: bool,

        #[command(subcommand)]
        command: Option<TimerCommands>,
    },

    /// Show or change the configuration
    Config {
        /// List the settings
        #[arg(short, long)]
        list: bool,

        /// Write a default config file
        #[arg(long, conflicts_with = "list")]
        init: bool,

        /// Setting to change, e.g. timers.focus
        #[arg(requires = "value")]
        key: Option<String>,

        /// New value, e.g. 50m
        value: Option<String>,
    },

    /// Show version
    Version,
}

#[derive(Subcommand)]
enum TimerCommands {
    /// Start the next interval for the current task
    Start {
        /// Show elapsed time instead of remaining time
        #[arg(long)]
        count_up: bool,
    },
}

// ANSI color codes
const GREEN: &str = "\x1b[0;32m";
const CYAN: &str = "\x1b[0;36m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config_file
        .clone()
        .unwrap_or_else(|| Paths::new().config_file());

    match cli.command {
        Some(Commands::Add { title }) => {
            let config = Config::load(&config_path)?;
            cmd_add(&open_tasks(&config)?, &title)
        }
        Some(Commands::List { all, current }) => {
            let config = Config::load(&config_path)?;
            cmd_list(&open_tasks(&config)?, all, current)
        }
        Some(Commands::Set {
            id,
            current,
            complete,
        }) => {
            let config = Config::load(&config_path)?;
            cmd_set(&open_tasks(&config)?, &id, current, complete)
        }
        Some(Commands::Remove { id }) => {
            let config = Config::load(&config_path)?;
            cmd_remove(&open_tasks(&config)?, &id)
        }
        Some(Commands::Timer {
            reset,
            show,
            command,
        }) => {
            let config = Config::load(&config_path)?;
            let sessions = open_sessions(&config)?;
            match command {
                Some(TimerCommands::Start { count_up }) => {
                    cmd_timer_start(&config, &open_tasks(&config)?, &sessions, count_up)
                }
                None => cmd_timer(&sessions, reset, show),
            }
        }
        Some(Commands::Config {
            list,
            init,
            key,
            value,
        }) => cmd_config(&config_path, list, init, key, value),
        Some(Commands::Version) => {
            println!("pomo version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            let config = Config::load(&config_path)?;
            cmd_list(&open_tasks(&config)?, false, false)
        }
    }
}

fn open_tasks(config: &Config) -> Result<TaskStore> {
    let path = config.database.task_path();
    TaskStore::open(&path)
        .with_context(|| format!("Failed to open task database: {}", path.display()))
}

fn open_sessions(config: &Config) -> Result<SessionStore> {
    let path = config.database.session_path();
    SessionStore::open(&path, config.timers.interval)
        .with_context(|| format!("Failed to open session database: {}", path.display()))
}

/// Add a task
fn cmd_add(store: &TaskStore, title: &str) -> Result<()> {
    let task = store.add(title)?;
    output::print_tasks(&[task]);
    Ok(())
}

/// List tasks
fn cmd_list(store: &TaskStore, all: bool, current: bool) -> Result<()> {
    let tasks = if current {
        vec![store.current_task()?]
    } else if all {
        store.list(|_| true)?
    } else {
        store.list(|t| t.status != Status::Complete)?
    };

    output::print_tasks(&tasks);
    Ok(())
}

/// Set a task as current and/or complete it
fn cmd_set(store: &TaskStore, id: &str, current: bool, complete: bool) -> Result<()> {
    let id = task::parse_id(id)?;

    if !current && !complete {
        bail!("nothing to set: pass --current or --complete");
    }

    if current {
        store.set_current_task(id)?;
        println!("{} Current task set", color(GREEN, "[ok]"));
    }

    if complete {
        let updated = store.set_state(id, Status::Complete)?;
        if store.clear_current_task(id)? {
            println!("{} Current task cleared", color(CYAN, "[info]"));
        }
        output::print_tasks(&[updated]);
    }

    Ok(())
}

/// Remove a task
fn cmd_remove(store: &TaskStore, id: &str) -> Result<()> {
    let id = task::parse_id(id)?;
    store.remove(id)?;
    println!("{} Task removed", color(GREEN, "[ok]"));
    Ok(())
}

/// Show or reset the session state
fn cmd_timer(sessions: &SessionStore, reset: bool, show: bool) -> Result<()> {
    if reset {
        sessions.reset()?;
        println!("{} Sessions reset", color(GREEN, "[ok]"));
    }

    if show {
        let session = sessions.session()?;
        output::print_session(
            session.current,
            session.next(sessions.interval()),
            session.count,
        );
    }

    Ok(())
}

/// Run the next interval against the current task
fn cmd_timer_start(
    config: &Config,
    tasks: &TaskStore,
    sessions: &SessionStore,
    count_up: bool,
) -> Result<()> {
    let current = tasks.current_task().context("current task is not set")?;
    let session_type = sessions.current()?;

    let duration = match session_type {
        SessionType::Focus => config.timers.focus_duration()?,
        SessionType::Short => config.timers.short_break_duration()?,
        SessionType::Long => config.timers.long_break_duration()?,
    };

    let mut countdown = Countdown::new(duration, current.clone(), session_type).count_up(count_up);
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(countdown.run())?;
    outcome.into_result()?;

    let current = if session_type == SessionType::Focus {
        tasks.add_session(current.id)?
    } else {
        current
    };
    let session = sessions.increment()?;

    println!("{} {} finished. {}", color(GREEN, "[ok]"), session_type, current.describe());
    println!(
        "{} Next up: {}",
        color(CYAN, "[info]"),
        session.current
    );
    Ok(())
}

/// Show, initialize or change the configuration
fn cmd_config(
    path: &Path,
    list: bool,
    init: bool,
    key: Option<String>,
    value: Option<String>,
) -> Result<()> {
    if init {
        Config::init(path)?;
        println!("{} Wrote default config to {}", color(GREEN, "[ok]"), path.display());
        return Ok(());
    }

    let mut config = Config::load(path)?;

    if list {
        for (key, value) in config.entries() {
            println!("{} = {}", key, value);
        }
        return Ok(());
    }

    match (key, value) {
        (Some(key), Some(value)) => {
            config.set(&key, &value)?;
            config.save(path)?;
            println!("{} {} = {}", color(GREEN, "[ok]"), key, value);
            Ok(())
        }
        _ => bail!("usage: pomo config KEY VALUE (or --list, --init)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_color_without_tty() {
        let result = color(GREEN, "test");
        assert!(result.contains("test"));
    }

    #[test]
    fn test_parse_timer_start() {
        let cli = Cli::try_parse_from(["pomo", "t", "start"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Timer {
                command: Some(TimerCommands::Start { count_up: false }),
                ..
            })
        ));
    }

    #[test]
    fn test_parse_timer_start_count_up() {
        let cli = Cli::try_parse_from(["pomo", "timer", "start", "--count-up"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Timer {
                command: Some(TimerCommands::Start { count_up: true }),
                ..
            })
        ));
    }

    #[test]
    fn test_list_flags_conflict() {
        assert!(Cli::try_parse_from(["pomo", "ls", "--all", "--current"]).is_err());
    }
}
