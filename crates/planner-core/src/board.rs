use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument};

use crate::notify::Notifier;
use crate::reorder::{self, DropEvent};
use crate::store::TaskStore;
use crate::task::{Category, TaskPatch};

/// Translates user intents into store operations and tracks the transient
/// UI state: which task is marked for text editing and which task's note
/// editor is open. The two flows are independent of each other.
pub struct BoardController {
    store: TaskStore,
    notifier: Box<dyn Notifier>,
    text_limit: usize,
    editing: Option<u64>,
    note_open: Option<u64>,
}

impl BoardController {
    /// `text_limit` of 0 disables the length check.
    pub fn new(store: TaskStore, notifier: Box<dyn Notifier>, text_limit: usize) -> Self {
        Self {
            store,
            notifier,
            text_limit,
            editing: None,
            note_open: None,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn editing(&self) -> Option<u64> {
        self.editing
    }

    pub fn note_open(&self) -> Option<u64> {
        self.note_open
    }

    /// One submit action, two outcomes: updates the task under edit when
    /// one is marked, otherwise creates a task in `category`. Never both.
    /// Rejected input leaves the store untouched.
    #[instrument(skip(self, raw, deadline, now))]
    pub fn submit(
        &mut self,
        category: Category,
        raw: &str,
        deadline: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<u64>> {
        let text = raw.trim();
        if text.is_empty() {
            self.notifier.error("Task text cannot be empty");
            return Ok(None);
        }
        if self.text_limit > 0 && text.chars().count() > self.text_limit {
            self.notifier.error(&format!(
                "Task text is limited to {} characters",
                self.text_limit
            ));
            return Ok(None);
        }

        if let Some(id) = self.editing.take() {
            let patch = TaskPatch {
                text: Some(text.to_string()),
                deadline: deadline.map(Some),
                ..Default::default()
            };
            if self.store.update(id, patch, now)? {
                self.notifier.success("Task updated!");
                return Ok(Some(id));
            }
            debug!(id, "task under edit no longer exists");
            return Ok(None);
        }

        let id = self.store.add(category, text.to_string(), deadline, now)?;
        self.notifier.success("Task added!");
        Ok(Some(id))
    }

    /// Marks a task for editing and hands back its current text for the
    /// input box. Unknown ids leave edit mode untouched.
    pub fn begin_edit(&mut self, id: u64) -> Option<String> {
        let text = self.store.get(id)?.text.clone();
        self.editing = Some(id);
        Some(text)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Allowed while the task is mid-edit; doing so abandons the edit.
    #[instrument(skip(self, now))]
    pub fn toggle_completed(
        &mut self,
        id: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<bool>> {
        let flipped = self.store.toggle_completed(id, now)?;
        if flipped.is_some() && self.editing == Some(id) {
            debug!(id, "toggled while editing; edit cancelled");
            self.editing = None;
        }
        Ok(flipped)
    }

    /// Opens the note editor and hands back the current note text.
    pub fn open_note(&mut self, id: u64) -> Option<String> {
        let details = self.store.get(id)?.details.clone().unwrap_or_default();
        self.note_open = Some(id);
        Some(details)
    }

    /// Saves the open note and closes the editor. A note that trims to
    /// nothing clears the field.
    #[instrument(skip(self, text, now))]
    pub fn save_note(&mut self, text: &str, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let Some(id) = self.note_open.take() else {
            return Ok(false);
        };
        let trimmed = text.trim();
        let details = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        let patch = TaskPatch {
            details: Some(details),
            ..Default::default()
        };
        if self.store.update(id, patch, now)? {
            self.notifier.success("Details saved!");
            return Ok(true);
        }
        Ok(false)
    }

    pub fn close_note(&mut self) {
        self.note_open = None;
    }

    /// Deleting the task that owns the open note editor closes it; same
    /// for a pending edit mark.
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: u64) -> anyhow::Result<bool> {
        if self.store.remove(id)?.is_none() {
            return Ok(false);
        }
        if self.note_open == Some(id) {
            self.note_open = None;
        }
        if self.editing == Some(id) {
            self.editing = None;
        }
        self.notifier.success("Task deleted");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub fn clear_category(&mut self, category: Category) -> anyhow::Result<usize> {
        let removed = self.store.remove_by_category(category)?;
        if let Some(id) = self.note_open
            && self.store.get(id).is_none()
        {
            self.note_open = None;
        }
        if let Some(id) = self.editing
            && self.store.get(id).is_none()
        {
            self.editing = None;
        }
        self.notifier
            .success(&format!("Removed {removed} task(s) from {}", category.label()));
        Ok(removed)
    }

    #[instrument(skip(self, now))]
    pub fn move_task(
        &mut self,
        id: u64,
        category: Category,
        index: usize,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        self.store.move_task(id, category, index, now)
    }

    pub fn handle_drop(&mut self, event: DropEvent, now: DateTime<Utc>) -> anyhow::Result<bool> {
        reorder::apply_drop(&mut self.store, event, now)
    }
}
