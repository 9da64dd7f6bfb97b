//! Error types for task store, import and persistence operations.
//!
//! Every fallible operation returns one of these as a typed result. Only
//! [`PersistenceError`] is ever recovered locally (logged and dropped) since the
//! in-memory store stays the source of truth for a session.

use thiserror::Error;

use crate::task::TaskId;

/// A field or temporal rule was violated by a create or edit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} is not a valid date/time: '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("due date {due} is before the created date {created}")]
    DueBeforeCreated { created: String, due: String },

    #[error("{field} {value} is in the past")]
    InPast { field: &'static str, value: String },

    #[error("'{0}' is not a known assignee")]
    UnknownAssignee(String),

    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u32),

    #[error("progress of task {0} is derived from its subtasks and cannot be set")]
    ProgressDerived(TaskId),
}

/// A reparent would make a task its own ancestor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("task {0} cannot be its own parent")]
    SelfParent(TaskId),

    #[error("task {parent} is a subtask of {task}; making it the parent would create a cycle")]
    WouldCycle { task: TaskId, parent: TaskId },
}

/// An operation referenced a task id that is not in the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task {0} not found")]
pub struct NotFoundError(pub TaskId);

/// An import batch was rejected as a whole.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("import is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("import must be a JSON array of tasks")]
    NotAnArray,

    #[error("record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index} has an invalid '{field}': {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("task id {0} appears more than once in the import")]
    DuplicateId(TaskId),

    #[error("task {task} refers to missing parent {parent}")]
    DanglingParent { task: TaskId, parent: TaskId },

    #[error("imported tasks form a parent cycle through {0}")]
    Cycle(TaskId),
}

/// The key-value store could not be read or written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode tasks: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("stored tasks under '{key}' are malformed: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored tasks under '{key}' break the hierarchy rules: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: ImportError,
    },
}

/// Union of everything a task operation can fail with.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("no task is being edited")]
    NoEditInProgress,
}

/// Errors raised while loading `config.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T, E = TaskError> = std::result::Result<T, E>;
