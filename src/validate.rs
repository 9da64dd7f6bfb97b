//! Field and temporal validation shared by create and edit.
//!
//! Both paths funnel through [`validate_draft`] / [`validate_patch`] so the same
//! rules apply whichever way a task is written.

use chrono::NaiveDateTime;

use crate::dates::{format_timestamp, parse_timestamp};
use crate::error::ValidationError;
use crate::fields::{AssigneeLookup, Assignees};
use crate::task::{Task, TaskDraft, TaskPatch};

/// Policy knobs for validation.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    pub assignees: Assignees,
    /// Accept timestamps earlier than the submission time.
    pub allow_backdated: bool,
}

/// Field values that passed validation and are ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFields {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub created_at: NaiveDateTime,
    pub due_at: NaiveDateTime,
    pub progress: Option<u8>,
}

impl ValidationError {
    /// Short machine-readable tag for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "missing-field",
            ValidationError::InvalidTimestamp { .. } => "invalid-timestamp",
            ValidationError::DueBeforeCreated { .. } => "due-before-created",
            ValidationError::InPast { .. } => "in-past",
            ValidationError::UnknownAssignee(_) => "unknown-assignee",
            ValidationError::ProgressOutOfRange(_) => "progress-out-of-range",
            ValidationError::ProgressDerived(_) => "progress-derived",
        }
    }
}

/// Trimmed, non-empty text.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Empty, or a name the lookup knows.
pub fn check_assignee(value: &str, lookup: &dyn AssigneeLookup) -> Result<String, ValidationError> {
    let name = value.trim();
    if name.is_empty() || lookup.is_known(name) {
        Ok(name.to_string())
    } else {
        Err(ValidationError::UnknownAssignee(name.to_string()))
    }
}

/// Parse a timestamp that must be present.
pub fn require_timestamp(field: &'static str, raw: &str) -> Result<NaiveDateTime, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    parse_timestamp(raw).ok_or_else(|| ValidationError::InvalidTimestamp {
        field,
        value: raw.trim().to_string(),
    })
}

pub fn check_order(created_at: NaiveDateTime, due_at: NaiveDateTime) -> Result<(), ValidationError> {
    if created_at > due_at {
        return Err(ValidationError::DueBeforeCreated {
            created: format_timestamp(created_at),
            due: format_timestamp(due_at),
        });
    }
    Ok(())
}

pub fn check_not_past(
    field: &'static str,
    value: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<(), ValidationError> {
    if value < now {
        return Err(ValidationError::InPast {
            field,
            value: format_timestamp(value),
        });
    }
    Ok(())
}

pub fn check_progress(progress: u32) -> Result<u8, ValidationError> {
    u8::try_from(progress)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or(ValidationError::ProgressOutOfRange(progress))
}

/// Validate the creation form as submitted at `now`.
pub fn validate_draft(
    draft: &TaskDraft,
    rules: &Rules,
    now: NaiveDateTime,
) -> Result<ValidFields, ValidationError> {
    let title = require_text("title", &draft.title)?;
    let description = require_text("description", &draft.description)?;
    let assigned_to = check_assignee(&draft.assigned_to, &rules.assignees)?;
    let created_at = require_timestamp("createdAt", &draft.created_at)?;
    let due_at = require_timestamp("dueAt", &draft.due_at)?;
    check_order(created_at, due_at)?;
    if !rules.allow_backdated {
        check_not_past("createdAt", created_at, now)?;
        check_not_past("dueAt", due_at, now)?;
    }
    let progress = draft.progress.map(check_progress).transpose()?;
    Ok(ValidFields {
        title,
        description,
        assigned_to,
        created_at,
        due_at,
        progress,
    })
}

/// Validate `patch` merged over `current`.
///
/// Ordering is always re-checked; the past-time rule only applies to a
/// timestamp the patch actually changes, so editing the title of an old task
/// still works.
pub fn validate_patch(
    current: &Task,
    patch: &TaskPatch,
    rules: &Rules,
    now: NaiveDateTime,
) -> Result<ValidFields, ValidationError> {
    let title = require_text("title", patch.title.as_deref().unwrap_or(&current.title))?;
    let description = require_text(
        "description",
        patch.description.as_deref().unwrap_or(&current.description),
    )?;
    let assigned_to = match &patch.assigned_to {
        Some(name) => check_assignee(name, &rules.assignees)?,
        None => current.assigned_to.clone(),
    };

    let created_at = match &patch.created_at {
        Some(raw) => Some(require_timestamp("createdAt", raw)?),
        None => None,
    };
    let due_at = match &patch.due_at {
        Some(raw) => Some(require_timestamp("dueAt", raw)?),
        None => None,
    };
    if !rules.allow_backdated {
        if let Some(at) = created_at.filter(|at| *at != current.created_at) {
            check_not_past("createdAt", at, now)?;
        }
        if let Some(at) = due_at.filter(|at| *at != current.due_at) {
            check_not_past("dueAt", at, now)?;
        }
    }
    let created_at = created_at.unwrap_or(current.created_at);
    let due_at = due_at.unwrap_or(current.due_at);
    check_order(created_at, due_at)?;

    let progress = patch.progress.map(check_progress).transpose()?;
    Ok(ValidFields {
        title,
        description,
        assigned_to,
        created_at,
        due_at,
        progress,
    })
}
