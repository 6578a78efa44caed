use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::task::{Category, Task, TaskPatch};

/// Persistence port for one serialized collection. The store writes the
/// whole snapshot after every mutation; `load` returns `None` when nothing
/// has been saved yet.
pub trait SnapshotStore {
    fn load(&self) -> anyhow::Result<Option<String>>;
    fn save(&self, snapshot: &str) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshot {
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    fn load(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            debug!("snapshot file missing");
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, snapshot), fields(file = %self.path.display()))]
    fn save(&self, snapshot: &str) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(snapshot.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        Ok(())
    }
}

/// In-memory port. Clones share the same cell, which lets tests stand in
/// for a second browser tab writing the same storage key.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    cell: Rc<RefCell<Option<String>>>,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(blob: &str) -> Self {
        let port = Self::default();
        *port.cell.borrow_mut() = Some(blob.to_string());
        port
    }

    pub fn contents(&self) -> Option<String> {
        self.cell.borrow().clone()
    }
}

impl SnapshotStore for MemorySnapshot {
    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.cell.borrow().clone())
    }

    fn save(&self, snapshot: &str) -> anyhow::Result<()> {
        *self.cell.borrow_mut() = Some(snapshot.to_string());
        Ok(())
    }
}

// Earlier snapshots stored a category-keyed map of bare task rows instead
// of the flat list. Accepted on load, never written back.
#[derive(Debug, Deserialize)]
struct LegacyTask {
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    details: Option<String>,
}

pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u64,
    port: Box<dyn SnapshotStore>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl TaskStore {
    /// Opens the store from whatever the port holds. Missing or malformed
    /// data degrades to an empty board, never to an error.
    #[tracing::instrument(skip(port))]
    pub fn open(port: Box<dyn SnapshotStore>) -> anyhow::Result<Self> {
        let tasks = load_tasks(port.as_ref())?;
        let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        debug!(count = tasks.len(), next_id, "opened task store");
        Ok(Self {
            tasks,
            next_id,
            port,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn by_category(&self, category: Category) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Creates a task at the front of its bucket's visual order and
    /// returns its id.
    #[tracing::instrument(skip(self, text, deadline, now))]
    pub fn add(
        &mut self,
        category: Category,
        text: String,
        deadline: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let id = self.next_id;
        self.next_id += 1;

        let task = Task::new(id, category, text, deadline, now);
        let at = self
            .tasks
            .iter()
            .position(|t| t.category == category)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(at, task);
        self.persist()?;
        debug!(id, category = category.key(), "task added");
        Ok(id)
    }

    /// Merges `patch` into the matching task. A missing id is a no-op that
    /// leaves both memory and storage untouched.
    #[tracing::instrument(skip(self, patch, now))]
    pub fn update(&mut self, id: u64, patch: TaskPatch, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "update on unknown id ignored");
            return Ok(false);
        };
        patch.apply(task);
        task.modified = now;
        self.persist()?;
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, id: u64) -> anyhow::Result<Option<Task>> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "remove on unknown id ignored");
            return Ok(None);
        };
        let removed = self.tasks.remove(pos);
        self.persist()?;
        Ok(Some(removed))
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_by_category(&mut self, category: Category) -> anyhow::Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.category != category);
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.persist()?;
        }
        debug!(removed, category = category.key(), "bulk delete");
        Ok(removed)
    }

    #[tracing::instrument(skip(self, now))]
    pub fn toggle_completed(
        &mut self,
        id: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<bool>> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle on unknown id ignored");
            return Ok(None);
        };
        task.completed = !task.completed;
        task.modified = now;
        let value = task.completed;
        self.persist()?;
        Ok(Some(value))
    }

    /// Relocates a task within or across buckets, preserving the relative
    /// order of everything else. `target_index` addresses the target
    /// bucket's projection after the task has been taken out; anything
    /// past the end appends. One snapshot write covers both buckets.
    #[tracing::instrument(skip(self, now))]
    pub fn move_task(
        &mut self,
        id: u64,
        target: Category,
        target_index: usize,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "move on unknown id ignored");
            return Ok(false);
        };
        let mut task = self.tasks.remove(pos);
        task.category = target;
        task.modified = now;

        let slots: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.category == target)
            .map(|(i, _)| i)
            .collect();
        let insert_at = if target_index < slots.len() {
            slots[target_index]
        } else if let Some(last) = slots.last() {
            last + 1
        } else {
            self.tasks.len()
        };

        self.tasks.insert(insert_at, task);
        self.persist()?;
        debug!(id, target = target.key(), target_index, "task moved");
        Ok(true)
    }

    /// Cross-tab reconciliation: replaces the in-memory list wholesale
    /// with whatever the port holds now. Last writer wins; local edits not
    /// yet saved by this instance are discarded.
    #[tracing::instrument(skip(self))]
    pub fn refresh(&mut self) -> anyhow::Result<()> {
        let tasks = load_tasks(self.port.as_ref())?;
        let loaded_max = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(loaded_max + 1);
        debug!(count = tasks.len(), "refreshed from storage");
        self.tasks = tasks;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn persist(&self) -> anyhow::Result<()> {
        let blob = serde_json::to_string(&self.tasks)?;
        self.port.save(&blob)
    }
}

fn load_tasks(port: &dyn SnapshotStore) -> anyhow::Result<Vec<Task>> {
    let Some(raw) = port.load()? else {
        return Ok(Vec::new());
    };
    match parse_snapshot(&raw, Utc::now()) {
        Ok(tasks) => Ok(tasks),
        Err(err) => {
            warn!(error = %err, "malformed task snapshot; starting empty");
            Ok(Vec::new())
        }
    }
}

fn parse_snapshot(raw: &str, now: DateTime<Utc>) -> anyhow::Result<Vec<Task>> {
    match serde_json::from_str::<Vec<Task>>(raw) {
        Ok(tasks) => Ok(tasks),
        Err(flat_err) => {
            let map: BTreeMap<String, Vec<LegacyTask>> = serde_json::from_str(raw)
                .map_err(|_| flat_err)
                .context("snapshot is neither a task list nor a category map")?;
            let mut out = Vec::new();
            let mut next = 1_u64;
            for category in Category::ALL {
                let Some(rows) = map.get(category.key()) else {
                    continue;
                };
                for row in rows {
                    let mut task = Task::new(next, category, row.text.clone(), None, now);
                    task.completed = row.completed;
                    task.details = row.details.clone().filter(|d| !d.is_empty());
                    out.push(task);
                    next += 1;
                }
            }
            Ok(out)
        }
    }
}
