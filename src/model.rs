use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = u64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskType {
    #[default]
    #[serde(rename = "recurring", alias = "codzienne")]
    Recurring,
    #[serde(rename = "one-off", alias = "jednorazowe")]
    OneOff,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("cannot add an empty task")]
    EmptyTaskText,
    #[error("cannot add a task without a category")]
    MissingCategory,
    #[error("category not found: {0}")]
    UnknownCategory(String),
    #[error("task ids exhausted")]
    IdsExhausted,
    #[error("unknown task type: {0} (expected recurring or one-off)")]
    UnknownTaskType(String),
}

/// The two collections a board owns. Every method here is a pure state
/// transition; persistence is layered on top by `board::TaskBoard`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub categories: Vec<String>,
}

impl BoardState {
    pub fn new(tasks: Vec<Task>, categories: Vec<String>) -> Self {
        BoardState { tasks, categories }
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    pub fn find_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn max_task_id(&self) -> Option<TaskId> {
        self.tasks.iter().map(|t| t.id).max()
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), BoardError> {
        if task.text.trim().is_empty() {
            return Err(BoardError::EmptyTaskText);
        }
        if task.category.trim().is_empty() {
            return Err(BoardError::MissingCategory);
        }
        if !self.has_category(&task.category) {
            return Err(BoardError::UnknownCategory(task.category));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    pub fn add_category(&mut self, name: &str) -> bool {
        if name.trim().is_empty() || self.has_category(name) {
            return false;
        }
        self.categories.push(name.to_string());
        true
    }

    /// Removes the category and every task filed under it. Returns how many
    /// tasks went with it.
    pub fn remove_category(&mut self, name: &str) -> usize {
        self.categories.retain(|c| c != name);
        let before = self.tasks.len();
        self.tasks.retain(|t| t.category != name);
        before - self.tasks.len()
    }

    pub fn reassign_task(&mut self, id: TaskId, category: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.category = category.to_string();
                true
            }
            None => false,
        }
    }

    pub fn tasks_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.category == category)
    }

    pub fn grouped(&self) -> Vec<(&str, Vec<&Task>)> {
        self.categories
            .iter()
            .map(|c| (c.as_str(), self.tasks_in(c).collect()))
            .collect()
    }
}

impl TaskType {
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::Recurring => "recurring",
            TaskType::OneOff => "one-off",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            TaskType::Recurring => TaskType::OneOff,
            TaskType::OneOff => TaskType::Recurring,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskType {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recurring" | "daily" | "codzienne" => Ok(TaskType::Recurring),
            "one-off" | "oneoff" | "once" | "jednorazowe" => Ok(TaskType::OneOff),
            other => Err(BoardError::UnknownTaskType(other.to_string())),
        }
    }
}

impl Task {
    pub fn new(
        id: TaskId,
        text: impl Into<String>,
        category: impl Into<String>,
        kind: TaskType,
    ) -> Self {
        Task {
            id,
            text: text.into(),
            category: category.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardState {
        BoardState::new(
            vec![
                Task::new(1, "buy milk", "home", TaskType::OneOff),
                Task::new(2, "stand-up", "work", TaskType::Recurring),
                Task::new(3, "water plants", "home", TaskType::Recurring),
            ],
            vec!["home".into(), "work".into()],
        )
    }

    #[test]
    fn add_task_rejects_blank_text_without_changes() {
        let mut state = board();
        let err = state
            .add_task(Task::new(9, "   ", "home", TaskType::OneOff))
            .unwrap_err();
        assert_eq!(err, BoardError::EmptyTaskText);
        assert_eq!(state, board());
    }

    #[test]
    fn add_task_rejects_missing_or_unknown_category() {
        let mut state = board();
        assert_eq!(
            state.add_task(Task::new(9, "x", "", TaskType::OneOff)),
            Err(BoardError::MissingCategory)
        );
        assert_eq!(
            state.add_task(Task::new(9, "x", "garden", TaskType::OneOff)),
            Err(BoardError::UnknownCategory("garden".into()))
        );
        assert_eq!(state.tasks.len(), 3);
    }

    #[test]
    fn remove_task_only_touches_matching_id() {
        let mut state = board();
        let removed = state.remove_task(2).unwrap();
        assert_eq!(removed.text, "stand-up");
        assert_eq!(state.tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(state.remove_task(42).is_none());
        assert_eq!(state.tasks.len(), 2);
    }

    #[test]
    fn add_category_is_case_sensitive_and_rejects_duplicates() {
        let mut state = board();
        assert!(!state.add_category("home"));
        assert!(!state.add_category("  "));
        assert!(state.add_category("Home"));
        assert_eq!(state.categories, vec!["home", "work", "Home"]);
    }

    #[test]
    fn remove_category_cascades_to_its_tasks() {
        let mut state = board();
        assert_eq!(state.remove_category("home"), 2);
        assert_eq!(state.categories, vec!["work"]);
        assert_eq!(state.tasks.len(), 1);
        assert!(state.tasks.iter().all(|t| t.category == "work"));
    }

    #[test]
    fn reassign_changes_only_the_category_of_one_task() {
        let mut state = board();
        assert!(state.reassign_task(1, "work"));
        let mut expected = board();
        expected.tasks[0].category = "work".into();
        assert_eq!(state, expected);
        assert!(!state.reassign_task(77, "work"));
        assert_eq!(state, expected);
    }

    #[test]
    fn grouped_follows_category_then_task_order() {
        let mut state = board();
        state.tasks.push(Task::new(4, "orphan", "gone", TaskType::OneOff));
        let groups = state.grouped();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "home");
        assert_eq!(
            groups[0].1.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn task_type_parses_labels_and_legacy_names() {
        assert_eq!("one-off".parse::<TaskType>().unwrap(), TaskType::OneOff);
        assert_eq!("Codzienne".parse::<TaskType>().unwrap(), TaskType::Recurring);
        assert!("weekly".parse::<TaskType>().is_err());
    }

    #[test]
    fn task_serializes_type_under_its_wire_name() {
        let json = serde_json::to_string(&Task::new(5, "a", "b", TaskType::OneOff)).unwrap();
        assert_eq!(json, r#"{"id":5,"text":"a","category":"b","type":"one-off"}"#);
        let legacy: Task =
            serde_json::from_str(r#"{"id":5,"text":"a","category":"b","type":"jednorazowe"}"#)
                .unwrap();
        assert_eq!(legacy.kind, TaskType::OneOff);
    }
}
