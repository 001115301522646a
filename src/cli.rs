use crate::model::TaskType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taskboard", version, about = "Terminal to-do board with categories")]
pub struct Cli {
    /// Store file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// Log level: trace, debug, info, warn, error or off
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Directory for log files
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks grouped by category
    List {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Add a new task
    Add {
        /// Task text
        text: String,
        /// Category to file the task under
        #[arg(long, short = 'c')]
        category: String,
        /// recurring or one-off
        #[arg(long = "type", short = 't', default_value_t = TaskType::Recurring)]
        kind: TaskType,
    },
    /// Remove a task by id
    Remove {
        /// Task id
        id: u64,
    },
    /// Move a task to another category
    Move {
        /// Task id
        id: u64,
        /// Destination category
        category: String,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Launch the interactive TUI
    Tui {
        /// Keep everything in memory; nothing is written to the store file
        #[arg(long)]
        ephemeral: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Add a category
    Add {
        /// Category name
        name: String,
    },
    /// Remove a category together with its tasks
    Remove {
        /// Category name
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
