//! # Quick Reminders
//!
//! Terminal front end for the quick-access reminder engine: one-shot alarm
//! and task commands, a foreground `watch` loop that fires notifications, and
//! an interactive TUI.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive mode
//! quick-reminders
//!
//! # Alarms
//! quick-reminders alarm add "Standup" --date 2026-10-16 --time 09:30 --note "Bridge line 2"
//! quick-reminders alarm list --all
//! quick-reminders alarm done <ID>
//! quick-reminders alarm remove <ID>
//!
//! # Tasks
//! quick-reminders task add "Review open tickets" --priority high
//! quick-reminders task advance <ID>
//!
//! # Fire notifications while the terminal stays open
//! quick-reminders watch
//! ```
//!
//! IDs may be abbreviated to any unique prefix, as shown in the list tables.
//!
//! ## Data Storage
//!
//! Everything lives in one JSON file in the local data directory
//! (`~/.local/share/quick-reminders/store.json` on Linux). Override it with
//! the `REMINDERS_DB` environment variable. `REMINDERS_TICK_SECS` and
//! `REMINDERS_FIRE_POLICY` (`exact` or `catch-up`) tune the scheduler, and
//! `RUST_LOG` controls logging.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use tracing_subscriber::EnvFilter;

use quick_reminders::commands::*;
use quick_reminders::models::Priority;
use quick_reminders::tui::run_tui;

#[derive(Parser)]
#[command(name = "quick-reminders")]
#[command(about = "Quick-access alarms and tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage alarms
    Alarm {
        #[command(subcommand)]
        command: AlarmCommands,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Run the scheduler in the foreground and print notifications
    Watch {
        /// Also fire alarms whose minute passed while nothing was watching
        #[arg(long)]
        catch_up: bool,
    },
    /// Reset the database (delete all alarms and tasks)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum AlarmCommands {
    /// Add a new alarm
    Add {
        /// Alarm title (quoted if it has spaces)
        title: String,
        /// Date in YYYY-MM-DD
        #[arg(short, long)]
        date: String,
        /// Time in HH:mm
        #[arg(short, long)]
        time: String,
        /// Text shown in the notification
        #[arg(short, long)]
        note: Option<String>,
    },
    /// List upcoming alarms
    List {
        /// Include completed and past alarms
        #[arg(short, long)]
        all: bool,
    },
    /// Toggle an alarm between done and pending
    Done {
        id: String,
    },
    /// Remove an alarm
    Remove {
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a new task
    Add {
        /// Task title
        title: Option<String>,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// List tasks
    List,
    /// Move a task to its next status (pending, in-progress, completed)
    Advance {
        id: String,
    },
    /// Edit a task
    Edit {
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New description (empty to clear)
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Remove a task
    Remove {
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Ui));
    init_tracing(if interactive { "warn" } else { "quick_reminders=info" });

    match cli.command {
        Some(Commands::Alarm { command }) => match command {
            AlarmCommands::Add { title, date, time, note } => cmd_alarm_add(title, date, time, note, false),
            AlarmCommands::List { all } => cmd_alarm_list(all),
            AlarmCommands::Done { id } => cmd_alarm_toggle(id, false),
            AlarmCommands::Remove { id, force } => cmd_alarm_remove(id, force, false),
        },
        Some(Commands::Task { command }) => match command {
            TaskCommands::Add { title, description, priority } => cmd_task_add(title, description, priority, false),
            TaskCommands::List => cmd_task_list(),
            TaskCommands::Advance { id } => cmd_task_advance(id, false),
            TaskCommands::Edit { id, title, description } => cmd_task_edit(id, title, description, false),
            TaskCommands::Remove { id, force } => cmd_task_remove(id, force, false),
        },
        Some(Commands::Watch { catch_up }) => cmd_watch(catch_up),
        Some(Commands::Reset { force }) => cmd_reset(force),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return;
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "quick-reminders", &mut io::stdout());
        }
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui() {
                eprintln!("Error running TUI: {}", e);
            }
        }
    }
}
