//! Enumerations and lookup types used to categorise tasks and drive import/export.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Names accepted in `assignedTo` when no configuration overrides them.
pub const DEFAULT_ASSIGNEES: [&str; 5] = [
    "John Doe",
    "Jane Smith",
    "Alice Johnson",
    "Bob Brown",
    "Charlie Davis",
];

/// Source of valid assignee names.
///
/// The built-in [`Assignees`] list is a closed enumeration; anything that can
/// answer membership (a directory service, say) can stand in for it.
pub trait AssigneeLookup {
    fn is_known(&self, name: &str) -> bool;

    fn names(&self) -> Vec<String>;

    /// Case-insensitive substring matches; an empty query lists everyone.
    fn suggest(&self, query: &str) -> Vec<String> {
        let query = query.trim().to_lowercase();
        self.names()
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&query))
            .collect()
    }
}

/// Fixed list of assignee names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignees(Vec<String>);

impl Assignees {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Assignees(names.into_iter().map(Into::into).collect())
    }
}

impl Default for Assignees {
    fn default() -> Self {
        Assignees::new(DEFAULT_ASSIGNEES)
    }
}

impl AssigneeLookup for Assignees {
    fn is_known(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    fn names(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// How an import combines with the tasks already in the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImportStrategy {
    /// Overwrite tasks with matching ids, append new ones, keep the rest.
    #[default]
    Merge,
    /// Discard the current tasks and adopt the import wholesale.
    Replace,
}

/// Output shape of an export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Indented key/value blocks in parent-first order.
    Text,
    /// Pretty-printed array in the persisted layout.
    #[default]
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}
