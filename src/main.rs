mod board;
mod cli;
mod commands;
mod logging;
mod model;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{CategoryCommand, Command};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let log_dir = match args.log_dir {
        Some(dir) => dir,
        None => storage::default_log_dir()?,
    };
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(logging::default_log_level());
    let _logger = logging::init_logging(level, &log_dir)?;

    let store = args.store;
    let command = args.command.unwrap_or(Command::Tui { ephemeral: false });
    match command {
        Command::List { category } => commands::list(store, category),
        Command::Add {
            text,
            category,
            kind,
        } => commands::add(store, text, category, kind),
        Command::Remove { id } => commands::remove(store, id),
        Command::Move { id, category } => commands::move_task(store, id, category),
        Command::Category { action } => match action {
            CategoryCommand::Add { name } => commands::add_category(store, name),
            CategoryCommand::Remove { name, yes } => commands::remove_category(store, name, yes),
        },
        Command::Tui { ephemeral } => commands::tui(store, ephemeral),
    }
}
