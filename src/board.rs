use crate::model::{BoardError, BoardState, Task, TaskId, TaskType};
use crate::storage::{load_state, save_categories, save_tasks, KeyValueStore};
use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};

pub type Outcome<T> = std::result::Result<T, BoardError>;

pub const REMOVE_CATEGORY_WARNING: &str = "Removing a category also removes its tasks!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

impl Notifier for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drafts {
    pub task_text: String,
    pub category: String,
    pub kind: TaskType,
    pub new_category: String,
}

/// Correlation token carried from drag start to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragPayload {
    task_id: TaskId,
}

impl DragPayload {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }
}

/// A category removal waiting for the user's answer.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    category: String,
}

impl PendingRemoval {
    pub fn category(&self) -> &str {
        &self.category
    }
}

pub struct TaskBoard<S: KeyValueStore, N: Notifier> {
    state: BoardState,
    store: S,
    notifier: N,
    pub drafts: Drafts,
    last_id: Option<TaskId>,
}

impl<S: KeyValueStore, N: Notifier> TaskBoard<S, N> {
    pub fn load(store: S, notifier: N) -> Result<Self> {
        let state = load_state(&store)?;
        info!(
            "event=board_load module=board tasks={} categories={}",
            state.tasks.len(),
            state.categories.len()
        );
        let last_id = state.max_task_id();
        Ok(TaskBoard {
            state,
            store,
            notifier,
            drafts: Drafts::default(),
            last_id,
        })
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn categories(&self) -> &[String] {
        &self.state.categories
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Adds a task from the drafts. On success the text draft is cleared and
    /// the selected category and type are kept for the next entry.
    pub fn add_task(&mut self) -> Result<Outcome<TaskId>> {
        let id = match self.peek_next_id() {
            Ok(id) => id,
            Err(err) => {
                warn!("event=task_add module=board status=rejected reason={}", err);
                self.notifier.notify(Notice::error(err.to_string()));
                return Ok(Err(err));
            }
        };
        let task = Task::new(
            id,
            self.drafts.task_text.clone(),
            self.drafts.category.clone(),
            self.drafts.kind,
        );
        if let Err(err) = self.state.add_task(task) {
            debug!("event=task_add module=board status=rejected reason={}", err);
            self.notifier.notify(Notice::error(err.to_string()));
            return Ok(Err(err));
        }
        self.last_id = Some(id);
        self.drafts.task_text.clear();
        self.persist_tasks()?;
        info!("event=task_add module=board status=ok id={}", id);
        self.notifier.notify(Notice::success("Task added"));
        Ok(Ok(id))
    }

    pub fn remove_task(&mut self, id: TaskId) -> Result<()> {
        let removed = self.state.remove_task(id).is_some();
        self.persist_tasks()?;
        info!(
            "event=task_remove module=board id={} found={}",
            id, removed
        );
        self.notifier.notify(Notice::success("Task removed"));
        Ok(())
    }

    pub fn add_category(&mut self) -> Result<bool> {
        let name = self.drafts.new_category.clone();
        if !self.state.add_category(&name) {
            debug!("event=category_add module=board status=ignored");
            return Ok(false);
        }
        self.drafts.new_category.clear();
        self.persist_categories()?;
        info!("event=category_add module=board status=ok name={}", name);
        self.notifier.notify(Notice::success("Category added"));
        Ok(true)
    }

    pub fn request_category_removal(&mut self, name: &str) -> PendingRemoval {
        self.notifier.notify(Notice::warning(REMOVE_CATEGORY_WARNING));
        PendingRemoval {
            category: name.to_string(),
        }
    }

    /// Second half of a category removal. Declining leaves everything as is.
    /// Returns the number of tasks deleted along with the category.
    pub fn resolve_removal(&mut self, pending: PendingRemoval, confirmed: bool) -> Result<usize> {
        if !confirmed {
            debug!(
                "event=category_remove module=board status=declined name={}",
                pending.category
            );
            return Ok(0);
        }
        let removed = self.state.remove_category(&pending.category);
        if self.drafts.category == pending.category {
            self.drafts.category.clear();
        }
        self.persist_categories()?;
        self.persist_tasks()?;
        info!(
            "event=category_remove module=board status=ok name={} tasks_removed={}",
            pending.category, removed
        );
        self.notifier.notify(Notice::success("Category removed"));
        Ok(removed)
    }

    pub fn start_drag(&self, task_id: TaskId) -> DragPayload {
        debug!("event=drag_start module=board id={}", task_id);
        DragPayload { task_id }
    }

    pub fn drop_on(&mut self, payload: DragPayload, category: &str) -> Result<Outcome<()>> {
        self.reassign_task(payload.task_id, category)
    }

    /// Moves a task to another category. An unknown task id is a no-op; an
    /// unknown category is rejected so that no task is left orphaned.
    pub fn reassign_task(&mut self, id: TaskId, category: &str) -> Result<Outcome<()>> {
        if !self.state.has_category(category) {
            let err = BoardError::UnknownCategory(category.to_string());
            self.notifier.notify(Notice::error(err.to_string()));
            return Ok(Err(err));
        }
        let found = self.state.reassign_task(id, category);
        self.persist_tasks()?;
        info!(
            "event=task_move module=board id={} category={} found={}",
            id, category, found
        );
        self.notifier.notify(Notice::success("Task moved"));
        Ok(Ok(()))
    }

    fn peek_next_id(&self) -> Outcome<TaskId> {
        let now = Utc::now().timestamp_millis().max(0) as TaskId;
        match self.last_id {
            Some(last) if now <= last => last.checked_add(1).ok_or(BoardError::IdsExhausted),
            _ => Ok(now),
        }
    }

    fn persist_tasks(&mut self) -> Result<()> {
        save_tasks(&mut self.store, &self.state.tasks)
    }

    fn persist_categories(&mut self) -> Result<()> {
        save_categories(&mut self.store, &self.state.categories)
    }
}
