//! Task data structure and the input buffers used to create and edit tasks.
//!
//! A committed [`Task`] only ever changes through the store. New tasks start life
//! as a [`TaskDraft`] (the contents of the creation form) and edits are collected
//! in a [`TaskPatch`] until they are saved or dropped.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates::{self, minute_format};

/// Opaque, immutable task identifier.
///
/// Ids minted by the store are decimal strings, but any string read from an
/// import is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        TaskId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, if it is one the store could have minted.
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<u64> for TaskId {
    fn from(n: u64) -> Self {
        TaskId(n.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }
        Ok(match Raw::deserialize(d)? {
            Raw::Text(s) => TaskId(s),
            Raw::Number(n) => TaskId(n.to_string()),
        })
    }
}

/// A committed unit of work.
///
/// The persisted JSON layout uses camelCase keys:
/// `id, title, description, assignedTo, createdAt, dueAt, durationDays, parentId, progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub(crate) id: TaskId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(with = "minute_format")]
    pub(crate) created_at: NaiveDateTime,
    #[serde(with = "minute_format")]
    pub(crate) due_at: NaiveDateTime,
    #[serde(default)]
    pub(crate) duration_days: u32,
    #[serde(default)]
    pub(crate) parent_id: Option<TaskId>,
    #[serde(default)]
    pub(crate) progress: u8,
}

impl Task {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn due_at(&self) -> NaiveDateTime {
        self.due_at
    }

    /// Whole days between creation and due time; always derived.
    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn parent_id(&self) -> Option<&TaskId> {
        self.parent_id.as_ref()
    }

    /// Progress as last set on this task. Tasks with children report a
    /// rolled-up value through the store instead.
    pub fn own_progress(&self) -> u8 {
        self.progress
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub(crate) fn set_times(&mut self, created_at: NaiveDateTime, due_at: NaiveDateTime) {
        self.created_at = created_at;
        self.due_at = due_at;
        self.recompute_duration();
    }

    /// Re-derive `duration_days` from the two timestamps.
    pub(crate) fn recompute_duration(&mut self) {
        self.duration_days = dates::duration_in_days(self.created_at, self.due_at);
    }
}

/// Contents of the creation form before it is committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    /// Raw timestamp input, parsed on submission.
    pub created_at: String,
    pub due_at: String,
    pub parent_id: Option<TaskId>,
    pub progress: Option<u32>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn assigned_to(mut self, who: impl Into<String>) -> Self {
        self.assigned_to = who.into();
        self
    }

    pub fn window(mut self, created_at: impl Into<String>, due_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self.due_at = due_at.into();
        self
    }

    pub fn parent(mut self, parent: impl Into<TaskId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn progress(mut self, progress: u32) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Duration shown read-only in the form; unknown until both times parse.
    pub fn duration_preview(&self) -> Option<u32> {
        dates::duration_between(&self.created_at, &self.due_at)
    }

    /// True when nothing has been typed into the form.
    pub fn is_blank(&self) -> bool {
        [&self.title, &self.description, &self.assigned_to, &self.created_at, &self.due_at]
            .iter()
            .all(|s| s.trim().is_empty())
            && self.parent_id.is_none()
            && self.progress.is_none()
    }
}

/// Proposed changes to an existing task.
///
/// There is no duration field: the duration is re-derived from the
/// merged timestamps on save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub created_at: Option<String>,
    pub due_at: Option<String>,
    /// `Some(None)` moves the task to the root.
    pub parent_id: Option<Option<TaskId>>,
    pub progress: Option<u32>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Fold `later` on top of this patch; fields set in `later` win.
    pub fn merge(&mut self, later: TaskPatch) {
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.description.is_some() {
            self.description = later.description;
        }
        if later.assigned_to.is_some() {
            self.assigned_to = later.assigned_to;
        }
        if later.created_at.is_some() {
            self.created_at = later.created_at;
        }
        if later.due_at.is_some() {
            self.due_at = later.due_at;
        }
        if later.parent_id.is_some() {
            self.parent_id = later.parent_id;
        }
        if later.progress.is_some() {
            self.progress = later.progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_json_layout_uses_camel_case() {
        let json = r#"{
            "id": "17",
            "title": "Write report",
            "description": "Quarterly numbers",
            "assignedTo": "Jane Smith",
            "createdAt": "2024-01-01T10:00",
            "dueAt": "2024-01-03T11:00",
            "durationDays": 3,
            "parentId": null,
            "progress": 20
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id().as_str(), "17");
        assert_eq!(task.assigned_to, "Jane Smith");
        assert!(task.is_root());

        let value = serde_json::to_value(&task).unwrap();
        for key in ["id", "title", "description", "assignedTo", "createdAt", "dueAt", "durationDays", "parentId", "progress"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["createdAt"], "2024-01-01T10:00");
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let id: TaskId = serde_json::from_str("42").unwrap();
        assert_eq!(id, TaskId::from(42));
        assert_eq!(id.as_number(), Some(42));
        assert_eq!(TaskId::from("abc").as_number(), None);
    }

    #[test]
    fn test_draft_duration_preview() {
        let draft = TaskDraft::new("a", "b").window("2024-01-01T10:00", "");
        assert_eq!(draft.duration_preview(), None);
        let draft = draft.window("2024-01-01T10:00", "2024-01-02T09:00");
        assert_eq!(draft.duration_preview(), Some(1));
    }

    #[test]
    fn test_blank_draft() {
        assert!(TaskDraft::default().is_blank());
        assert!(TaskDraft::new("  ", "").is_blank());
        assert!(!TaskDraft::new("x", "").is_blank());
    }

    #[test]
    fn test_patch_merge_later_wins() {
        let mut patch = TaskPatch {
            title: Some("one".into()),
            progress: Some(10),
            ..Default::default()
        };
        patch.merge(TaskPatch {
            title: Some("two".into()),
            parent_id: Some(None),
            ..Default::default()
        });
        assert_eq!(patch.title.as_deref(), Some("two"));
        assert_eq!(patch.progress, Some(10));
        assert_eq!(patch.parent_id, Some(None));
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }
}
