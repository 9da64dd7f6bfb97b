//! Command interface consumed by the presentation layer.
//!
//! A [`Session`] owns the task store, the persistence adapter and the single
//! in-progress edit. Each successful command is followed by a best-effort save.

use std::collections::HashSet;

use tracing::info;

use crate::error::{NotFoundError, Result, TaskError};
use crate::fields::{ExportFormat, ImportStrategy};
use crate::persist::{self, KeyValueStore, Persistence};
use crate::store::{ForestRow, TaskStore};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::validate::Rules;

/// The task currently open for editing.
///
/// Nothing here reaches the store until [`Session::save_edit`]; cancelling just
/// drops the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    snapshot: Task,
    patch: TaskPatch,
}

impl EditBuffer {
    pub fn id(&self) -> &TaskId {
        self.snapshot.id()
    }

    /// The task as it was when editing started.
    pub fn snapshot(&self) -> &Task {
        &self.snapshot
    }

    pub fn patch(&self) -> &TaskPatch {
        &self.patch
    }
}

/// Store, persistence and edit state for one user session.
#[derive(Debug)]
pub struct Session<S> {
    store: TaskStore,
    persistence: Persistence<S>,
    editing: Option<EditBuffer>,
}

impl<S: KeyValueStore> Session<S> {
    /// Load whatever is persisted and start a session on it.
    pub fn open(persistence: Persistence<S>, rules: Rules) -> Self {
        let tasks = persistence.load();
        info!(count = tasks.len(), key = persistence.key(), "opened task list");
        Session {
            store: TaskStore::from_tasks(tasks, rules),
            persistence,
            editing: None,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    fn persist(&mut self) {
        self.persistence.save(self.store.tasks());
    }

    pub fn create_task(&mut self, draft: &TaskDraft) -> Result<Task> {
        let task = self.store.create(draft)?;
        self.persist();
        Ok(task)
    }

    /// Open `id` for editing, discarding any other unsaved edit.
    pub fn edit_task(&mut self, id: &TaskId) -> Result<&EditBuffer> {
        let snapshot = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| NotFoundError(id.clone()))?;
        Ok(self.editing.insert(EditBuffer {
            snapshot,
            patch: TaskPatch::default(),
        }))
    }

    pub fn editing(&self) -> Option<&EditBuffer> {
        self.editing.as_ref()
    }

    /// Record more field changes in the open edit.
    pub fn update_edit(&mut self, patch: TaskPatch) -> Result<()> {
        let buffer = self.editing.as_mut().ok_or(TaskError::NoEditInProgress)?;
        buffer.patch.merge(patch);
        Ok(())
    }

    /// Commit the open edit. On failure the buffer stays open for correction.
    pub fn save_edit(&mut self) -> Result<Task> {
        let buffer = self.editing.as_ref().ok_or(TaskError::NoEditInProgress)?;
        let task = self.store.edit(buffer.id(), &buffer.patch)?;
        self.editing = None;
        self.persist();
        Ok(task)
    }

    /// Drop the open edit and hand back the untouched task.
    pub fn cancel_edit(&mut self) -> Option<Task> {
        self.editing.take().map(|buffer| buffer.snapshot)
    }

    /// Delete `id` and its subtree. Returns the removed ids.
    pub fn delete_task(&mut self, id: &TaskId) -> Result<HashSet<TaskId>> {
        let removed = self.store.delete(id)?;
        if self.editing.as_ref().is_some_and(|b| removed.contains(b.id())) {
            self.editing = None;
        }
        self.persist();
        Ok(removed)
    }

    pub fn reparent_task(&mut self, id: &TaskId, new_parent: Option<&TaskId>) -> Result<Task> {
        let task = self.store.reparent(id, new_parent)?;
        self.persist();
        Ok(task)
    }

    pub fn list_tasks(&self) -> Vec<ForestRow<'_>> {
        self.store.forest()
    }

    /// Import a JSON array of tasks. Returns the number of records imported.
    pub fn import_tasks(&mut self, blob: &str, strategy: ImportStrategy) -> Result<usize> {
        let incoming = persist::parse_import(blob)?;
        let count = incoming.len();
        let touched: HashSet<TaskId> = incoming.iter().map(|t| t.id().clone()).collect();
        let merged = persist::import_merge(self.store.tasks(), incoming, strategy)?;
        self.store.replace_all(merged);

        let stale = self.editing.as_ref().is_some_and(|b| {
            touched.contains(b.id()) || self.store.get(b.id()).is_none()
        });
        if stale {
            self.editing = None;
        }
        info!(count, ?strategy, "imported tasks");
        self.persist();
        Ok(count)
    }

    pub fn export_tasks(&self, format: ExportFormat) -> Result<String> {
        Ok(persist::export(self.store.tasks(), format)?)
    }
}
