use crate::board::{Notice, NoticeLevel, Notifier, TaskBoard};
use crate::model::{Task, TaskId, TaskType};
use crate::storage::{default_store_path, FileStore, MemoryStore};
use crate::ui;
use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Prints successes and warnings. Errors travel back to `main` instead.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message),
            NoticeLevel::Warning => eprintln!("warning: {}", notice.message),
            NoticeLevel::Error => {}
        }
    }
}

type CliBoard = TaskBoard<FileStore, ConsoleNotifier>;

pub fn list(store: Option<PathBuf>, category: Option<String>) -> Result<()> {
    let board = open_board(store)?;
    if let Some(ref filter) = category {
        if !board.state().has_category(filter) {
            bail!("category not found: {}", filter);
        }
    }
    if board.categories().is_empty() {
        println!("No categories yet. Add one with `taskboard category add <NAME>`.");
        return Ok(());
    }
    for (name, tasks) in board.state().grouped() {
        if let Some(ref filter) = category {
            if name != filter {
                continue;
            }
        }
        println!("{}", name);
        if tasks.is_empty() {
            println!("  (empty)");
        }
        for task in tasks {
            print_task(task);
        }
        println!();
    }
    Ok(())
}

pub fn add(store: Option<PathBuf>, text: String, category: String, kind: TaskType) -> Result<()> {
    let mut board = open_board(store)?;
    board.drafts.task_text = text;
    board.drafts.category = category;
    board.drafts.kind = kind;
    let id = board.add_task()?.context("adding task")?;
    println!("  id {}", id);
    Ok(())
}

pub fn remove(store: Option<PathBuf>, id: TaskId) -> Result<()> {
    let mut board = open_board(store)?;
    board.remove_task(id)
}

pub fn move_task(store: Option<PathBuf>, id: TaskId, category: String) -> Result<()> {
    let mut board = open_board(store)?;
    let payload = board.start_drag(id);
    board
        .drop_on(payload, &category)?
        .with_context(|| format!("moving task {} to {}", id, category))?;
    Ok(())
}

pub fn add_category(store: Option<PathBuf>, name: String) -> Result<()> {
    let mut board = open_board(store)?;
    board.drafts.new_category = name;
    board.add_category()?;
    Ok(())
}

pub fn remove_category(store: Option<PathBuf>, name: String, yes: bool) -> Result<()> {
    let mut board = open_board(store)?;
    if !board.state().has_category(&name) {
        bail!("category not found: {}", name);
    }
    let pending = board.request_category_removal(&name);
    let confirmed = yes || prompt_yes_no(&format!("Remove category {:?}?", name))?;
    let removed = board.resolve_removal(pending, confirmed)?;
    if confirmed {
        println!("  {} task(s) removed with it", removed);
    } else {
        println!("Kept category {:?}", name);
    }
    Ok(())
}

pub fn tui(store: Option<PathBuf>, ephemeral: bool) -> Result<()> {
    if ephemeral {
        return ui::run(MemoryStore::new(), "in-memory".to_string());
    }
    let path = resolve_store_path(store)?;
    let store = FileStore::open(&path)?;
    let source = store.path().display().to_string();
    ui::run(store, source)
}

fn open_board(store: Option<PathBuf>) -> Result<CliBoard> {
    let path = resolve_store_path(store)?;
    TaskBoard::load(FileStore::open(path)?, ConsoleNotifier)
}

fn resolve_store_path(store: Option<PathBuf>) -> Result<PathBuf> {
    match store {
        Some(path) => Ok(path),
        None => default_store_path(),
    }
}

fn prompt_yes_no(question: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{} [y/N] ", question)?;
    stdout.flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_task(task: &Task) {
    println!("  - {}: {}", task.id, task.text);
    println!("    {} - {}", task.category, task.kind);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> Option<PathBuf> {
        Some(dir.path().join("store.yml"))
    }

    #[test]
    fn is_yes_accepts_only_affirmative_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn commands_share_state_through_the_store_file() {
        let dir = tempfile::tempdir().unwrap();
        add_category(store_in(&dir), "home".into()).unwrap();
        add_category(store_in(&dir), "work".into()).unwrap();
        add(store_in(&dir), "buy milk".into(), "home".into(), TaskType::OneOff).unwrap();

        let board = open_board(store_in(&dir)).unwrap();
        let id = board.tasks()[0].id;
        move_task(store_in(&dir), id, "work".into()).unwrap();
        assert_eq!(open_board(store_in(&dir)).unwrap().tasks()[0].category, "work");

        remove_category(store_in(&dir), "work".into(), true).unwrap();
        let board = open_board(store_in(&dir)).unwrap();
        assert!(board.tasks().is_empty());
        assert_eq!(board.categories(), ["home"]);
    }

    #[test]
    fn add_into_unknown_category_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = add(store_in(&dir), "x".into(), "nowhere".into(), TaskType::OneOff).unwrap_err();
        assert!(format!("{err:#}").contains("category not found"));
        assert!(open_board(store_in(&dir)).unwrap().tasks().is_empty());
    }

    #[test]
    fn duplicate_category_add_succeeds_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        add_category(store_in(&dir), "home".into()).unwrap();
        add_category(store_in(&dir), "home".into()).unwrap();
        add_category(store_in(&dir), "  ".into()).unwrap();
        assert_eq!(open_board(store_in(&dir)).unwrap().categories(), ["home"]);
    }

    #[test]
    fn removing_unknown_category_fails_before_prompting() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_category(store_in(&dir), "ghost".into(), false).is_err());
    }
}

