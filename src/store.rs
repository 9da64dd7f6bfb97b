//! The authoritative task collection and its mutation operations.
//!
//! Every mutation validates first and only then touches the collection, so a
//! failed create, edit or reparent leaves the store exactly as it was.

use std::collections::HashSet;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::dates;
use crate::error::{CycleError, ImportError, NotFoundError, Result, ValidationError};
use crate::hierarchy::{self, children_of, descendants_of, has_children, is_descendant};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch};
use crate::validate::{self, Rules};

/// One row of the forest view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestRow<'a> {
    pub task: &'a Task,
    pub depth: usize,
    /// Own progress for leaves, rolled-up progress for parents.
    pub progress: u8,
    pub has_children: bool,
}

/// In-memory task store.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    rules: Rules,
    /// Largest numeric id ever held, including deleted tasks.
    high_water: u64,
    /// Counter for `x<n>` ids once numeric ids are used up.
    spill: u64,
}

impl TaskStore {
    pub fn new(rules: Rules) -> Self {
        TaskStore {
            tasks: Vec::new(),
            rules,
            high_water: 0,
            spill: 0,
        }
    }

    /// Build a store around tasks that already passed [`check_structure`].
    ///
    /// Durations are re-derived so a stale stored value can never survive.
    pub fn from_tasks(tasks: Vec<Task>, rules: Rules) -> Self {
        let mut store = TaskStore::new(rules);
        store.replace_all(tasks);
        store
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    fn position(&self, id: &TaskId) -> Result<usize, NotFoundError> {
        self.tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| NotFoundError(id.clone()))
    }

    /// Swap in a whole new collection, e.g. after an import.
    pub fn replace_all(&mut self, mut tasks: Vec<Task>) {
        for t in tasks.iter_mut() {
            t.recompute_duration();
        }
        self.tasks = tasks;
        self.observe_ids();
    }

    fn observe_ids(&mut self) {
        let max = self.tasks.iter().filter_map(|t| t.id.as_number()).max();
        if let Some(max) = max {
            self.high_water = self.high_water.max(max);
        }
    }

    /// Fresh id from the millisecond clock, always above anything seen before.
    fn mint_id(&mut self) -> TaskId {
        let Some(next) = self.high_water.checked_add(1) else {
            return self.mint_spill_id();
        };
        let clock = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = clock.max(next);
        self.high_water = id;
        TaskId::from(id)
    }

    /// An imported id sits at `u64::MAX`, so no larger number exists.
    fn mint_spill_id(&mut self) -> TaskId {
        loop {
            self.spill = self.spill.saturating_add(1);
            let id = TaskId::new(format!("x{}", self.spill));
            if self.get(&id).is_none() {
                warn!(id = %id, "numeric ids exhausted, using fallback id");
                return id;
            }
        }
    }

    /// Create a task from a submitted draft, checked against the current time.
    pub fn create(&mut self, draft: &TaskDraft) -> Result<Task> {
        self.create_at(draft, dates::now())
    }

    /// Create a task as if submitted at `now`.
    pub fn create_at(&mut self, draft: &TaskDraft, now: NaiveDateTime) -> Result<Task> {
        let fields = validate::validate_draft(draft, &self.rules, now)?;
        if let Some(parent) = &draft.parent_id {
            self.position(parent)?;
        }

        let mut task = Task {
            id: self.mint_id(),
            title: fields.title,
            description: fields.description,
            assigned_to: fields.assigned_to,
            created_at: fields.created_at,
            due_at: fields.due_at,
            duration_days: 0,
            parent_id: draft.parent_id.clone(),
            progress: fields.progress.unwrap_or(0),
        };
        task.recompute_duration();
        debug!(id = %task.id, parent = ?task.parent_id, "created task");
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Apply `patch` to the task `id`, checked against the current time.
    pub fn edit(&mut self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        self.edit_at(id, patch, dates::now())
    }

    /// Apply `patch` as if saved at `now`. The task is replaced in one step.
    pub fn edit_at(&mut self, id: &TaskId, patch: &TaskPatch, now: NaiveDateTime) -> Result<Task> {
        let idx = self.position(id)?;
        let current = &self.tasks[idx];
        let fields = validate::validate_patch(current, patch, &self.rules, now)?;
        if fields.progress.is_some() && has_children(id, &self.tasks) {
            return Err(ValidationError::ProgressDerived(id.clone()).into());
        }
        if let Some(parent) = &patch.parent_id {
            if parent.as_ref() != current.parent_id.as_ref() {
                self.check_reparent(id, parent.as_ref())?;
            }
        }

        let mut updated = current.clone();
        updated.title = fields.title;
        updated.description = fields.description;
        updated.assigned_to = fields.assigned_to;
        updated.set_times(fields.created_at, fields.due_at);
        if let Some(parent) = &patch.parent_id {
            updated.parent_id = parent.clone();
        }
        if let Some(progress) = fields.progress {
            updated.progress = progress;
        }
        debug!(id = %id, "edited task");
        self.tasks[idx] = updated.clone();
        Ok(updated)
    }

    /// Check that `id` may hang under `new_parent` without closing a cycle.
    pub fn check_reparent(&self, id: &TaskId, new_parent: Option<&TaskId>) -> Result<()> {
        self.position(id)?;
        let Some(parent) = new_parent else {
            return Ok(());
        };
        if parent == id {
            return Err(CycleError::SelfParent(id.clone()).into());
        }
        self.position(parent)?;
        if is_descendant(parent, id, &self.tasks) {
            return Err(CycleError::WouldCycle {
                task: id.clone(),
                parent: parent.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Move `id` under `new_parent`, or to the root with `None`.
    pub fn reparent(&mut self, id: &TaskId, new_parent: Option<&TaskId>) -> Result<Task> {
        self.check_reparent(id, new_parent)?;
        let idx = self.position(id)?;
        let task = &mut self.tasks[idx];
        task.parent_id = new_parent.cloned();
        debug!(id = %id, parent = ?new_parent, "reparented task");
        Ok(task.clone())
    }

    /// Remove `id` and all its descendants. Returns every removed id.
    pub fn delete(&mut self, id: &TaskId) -> Result<HashSet<TaskId>> {
        self.position(id)?;
        let mut removed = descendants_of(id, &self.tasks);
        removed.insert(id.clone());
        self.tasks.retain(|t| !removed.contains(&t.id));
        debug!(id = %id, removed = removed.len(), "deleted task");
        Ok(removed)
    }

    /// Displayed progress of `id`: its own value, or the mean of its children.
    pub fn progress_of(&self, id: &TaskId) -> Option<u8> {
        derived_progress(id, &self.tasks)
    }

    /// Mean displayed progress across every task; `None` when empty.
    pub fn overall_progress(&self) -> Option<f64> {
        if self.tasks.is_empty() {
            return None;
        }
        let total: u32 = self
            .tasks
            .iter()
            .filter_map(|t| derived_progress(&t.id, &self.tasks))
            .map(u32::from)
            .sum();
        Some(f64::from(total) / self.tasks.len() as f64)
    }

    /// The whole forest in parent-first order.
    pub fn forest(&self) -> Vec<ForestRow<'_>> {
        hierarchy::forest(&self.tasks)
            .into_iter()
            .map(|(task, depth)| ForestRow {
                task,
                depth,
                progress: derived_progress(&task.id, &self.tasks).unwrap_or(task.progress),
                has_children: has_children(&task.id, &self.tasks),
            })
            .collect()
    }
}

/// Rolled-up progress, looking one level down only.
///
/// A parent reports the rounded mean of its immediate children's own progress;
/// grandchildren do not contribute.
pub fn derived_progress(id: &TaskId, tasks: &[Task]) -> Option<u8> {
    let task = tasks.iter().find(|t| &t.id == id)?;
    let children = children_of(id, tasks);
    if children.is_empty() {
        return Some(task.progress);
    }
    let n = children.len() as u32;
    let sum: u32 = children.iter().map(|c| u32::from(c.progress)).sum();
    u8::try_from((sum + n / 2) / n).ok()
}

/// Check a collection against the store invariants.
///
/// Ids are unique, every parent exists, the parent relation is acyclic,
/// `createdAt <= dueAt`, and progress is in range.
pub fn check_structure(tasks: &[Task]) -> Result<(), ImportError> {
    let mut ids = HashSet::new();
    for (index, t) in tasks.iter().enumerate() {
        if !ids.insert(&t.id) {
            return Err(ImportError::DuplicateId(t.id.clone()));
        }
        if t.created_at > t.due_at {
            return Err(ImportError::InvalidField {
                index,
                field: "dueAt",
                reason: "due date is before the created date".into(),
            });
        }
        if t.progress > 100 {
            return Err(ImportError::InvalidField {
                index,
                field: "progress",
                reason: format!("{} is above 100", t.progress),
            });
        }
    }
    if let Some((task, parent)) = hierarchy::find_dangling_parent(tasks) {
        return Err(ImportError::DanglingParent { task, parent });
    }
    if let Some(id) = hierarchy::find_cycle(tasks) {
        return Err(ImportError::Cycle(id));
    }
    Ok(())
}
