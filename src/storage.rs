use crate::model::{BoardState, Task};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const TASKS_KEY: &str = "tasks";
pub const CATEGORIES_KEY: &str = "categories";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let data =
                fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
            if data.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_yaml::from_str(&data).context("parsing store file")?
            }
        } else {
            BTreeMap::new()
        };
        debug!(
            "event=store_open module=storage path={} keys={}",
            path.display(),
            entries.len()
        );
        Ok(FileStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let serialized = serde_yaml::to_string(&self.entries).context("serializing store")?;
        fs::write(&self.path, serialized).with_context(|| format!("writing {:?}", self.path))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

/// Reads both collections. Missing or unparsable values come back empty.
pub fn load_state<S: KeyValueStore + ?Sized>(store: &S) -> Result<BoardState> {
    let tasks: Vec<Task> = load_array(store, TASKS_KEY)?;
    let categories: Vec<String> = load_array(store, CATEGORIES_KEY)?;
    Ok(BoardState::new(tasks, categories))
}

pub fn save_tasks<S: KeyValueStore + ?Sized>(store: &mut S, tasks: &[Task]) -> Result<()> {
    let value = serde_json::to_string(tasks).context("serializing tasks")?;
    store.set(TASKS_KEY, value)
}

pub fn save_categories<S: KeyValueStore + ?Sized>(
    store: &mut S,
    categories: &[String],
) -> Result<()> {
    let value = serde_json::to_string(categories).context("serializing categories")?;
    store.set(CATEGORIES_KEY, value)
}

fn load_array<S, T>(store: &S, key: &str) -> Result<Vec<T>>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get(key)? {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };
    match serde_json::from_str(&raw) {
        Ok(items) => Ok(items),
        Err(err) => {
            warn!(
                "event=store_value_invalid module=storage key={} error={}",
                key, err
            );
            Ok(Vec::new())
        }
    }
}

pub fn default_store_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("store.yml"))
}

pub fn default_log_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("logs"))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "taskboard").context("locating data directory")
}
