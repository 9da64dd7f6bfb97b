//! Persistence of the task collection plus import and export.
//!
//! The whole collection lives as one JSON array under a single key of a
//! [`KeyValueStore`]. Saving is best effort: [`Persistence::save`] logs a failure
//! and carries on, since the in-memory store is the primary copy.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dates::{self, format_for_display, parse_timestamp};
use crate::error::{ImportError, PersistenceError};
use crate::fields::{ExportFormat, ImportStrategy};
use crate::hierarchy;
use crate::store::{check_structure, derived_progress};
use crate::task::{Task, TaskId};
use crate::validate::require_text;

/// Storage key used when none is configured.
pub const DEFAULT_KEY: &str = "tasks";

/// Fields every imported record must carry.
pub const REQUIRED_FIELDS: [&str; 6] = ["id", "title", "description", "assignedTo", "createdAt", "dueAt"];

/// Minimal string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// In-memory storage, mostly for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Copy the file behind `key` to `backup/<timestamp>_<key>.json`.
    pub fn backup(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let source = self.path_for(key);
        if !source.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", source.display()),
            )
            .into());
        }
        let backup_dir = self.dir.join("backup");
        fs::create_dir_all(&backup_dir)?;
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let target = backup_dir.join(format!("{timestamp}_{key}.json"));
        fs::copy(&source, &target)?;
        info!(path = %target.display(), "created backup");
        Ok(target)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

/// Saves and loads the task collection under one fixed key.
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Persistence {
            store,
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn try_save(&mut self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let blob = serde_json::to_string(tasks).map_err(PersistenceError::Encode)?;
        self.store.set(&self.key, &blob)?;
        debug!(key = %self.key, count = tasks.len(), "saved tasks");
        Ok(())
    }

    /// Save, logging instead of failing.
    pub fn save(&mut self, tasks: &[Task]) {
        if let Err(e) = self.try_save(tasks) {
            warn!(key = %self.key, error = %e, "failed to save tasks");
        }
    }

    pub fn try_load(&self) -> Result<Vec<Task>, PersistenceError> {
        let Some(blob) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };
        let mut tasks: Vec<Task> =
            serde_json::from_str(&blob).map_err(|source| PersistenceError::Decode {
                key: self.key.clone(),
                source,
            })?;
        for t in tasks.iter_mut() {
            t.recompute_duration();
        }
        check_structure(&tasks).map_err(|source| PersistenceError::Corrupt {
            key: self.key.clone(),
            source,
        })?;
        Ok(tasks)
    }

    /// Load, falling back to an empty collection on any problem.
    pub fn load(&self) -> Vec<Task> {
        match self.try_load() {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not load tasks, starting empty");
                Vec::new()
            }
        }
    }
}

/// Parse an import blob, validating each record's shape.
///
/// Any bad record rejects the whole batch.
pub fn parse_import(blob: &str) -> Result<Vec<Task>, ImportError> {
    let Value::Array(items) = serde_json::from_str::<Value>(blob)? else {
        return Err(ImportError::NotAnArray);
    };

    let mut tasks = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Some(record) = item.as_object() else {
            return Err(ImportError::InvalidField {
                index,
                field: "record",
                reason: "not an object".into(),
            });
        };
        for field in REQUIRED_FIELDS {
            if record.get(field).map_or(true, Value::is_null) {
                return Err(ImportError::MissingField { index, field });
            }
        }
        for field in ["title", "description"] {
            let text = record[field].as_str().unwrap_or_default();
            if let Err(e) = require_text(field, text) {
                return Err(ImportError::InvalidField {
                    index,
                    field,
                    reason: e.to_string(),
                });
            }
        }
        for field in ["createdAt", "dueAt"] {
            let parsed = record[field].as_str().and_then(parse_timestamp);
            if parsed.is_none() {
                return Err(ImportError::InvalidField {
                    index,
                    field,
                    reason: format!("'{}' is not a date/time", record[field]),
                });
            }
        }
        if let Some(progress) = record.get("progress").and_then(Value::as_u64) {
            if progress > 100 {
                return Err(ImportError::InvalidField {
                    index,
                    field: "progress",
                    reason: format!("{progress} is above 100"),
                });
            }
        }

        let mut task: Task = serde_json::from_value(item).map_err(|e| ImportError::InvalidField {
            index,
            field: "record",
            reason: e.to_string(),
        })?;
        task.recompute_duration();
        tasks.push(task);
    }
    Ok(tasks)
}

/// Combine `incoming` with `existing` under `strategy`.
///
/// `Replace` adopts `incoming` wholesale. `Merge` overwrites matching ids in
/// place, appends new ids and leaves everything else alone. The result must
/// satisfy the store invariants or the whole import is rejected.
pub fn import_merge(
    existing: &[Task],
    incoming: Vec<Task>,
    strategy: ImportStrategy,
) -> Result<Vec<Task>, ImportError> {
    let mut seen: HashSet<&TaskId> = HashSet::new();
    for t in &incoming {
        if !seen.insert(&t.id) {
            return Err(ImportError::DuplicateId(t.id.clone()));
        }
    }

    let merged = match strategy {
        ImportStrategy::Replace => incoming,
        ImportStrategy::Merge => {
            let mut out = existing.to_vec();
            for task in incoming {
                match out.iter_mut().find(|e| e.id == task.id) {
                    Some(slot) => *slot = task,
                    None => out.push(task),
                }
            }
            out
        }
    };
    check_structure(&merged)?;
    Ok(merged)
}

/// Pretty-printed JSON array in the persisted layout.
pub fn export_json(tasks: &[Task]) -> Result<String, PersistenceError> {
    serde_json::to_string_pretty(tasks).map_err(PersistenceError::Encode)
}

/// Indented key/value blocks, parents before their children.
pub fn export_text(tasks: &[Task]) -> String {
    let mut out = String::new();
    for (task, _) in hierarchy::forest(tasks) {
        let indent = "  ".repeat(hierarchy::depth_of(&task.id, tasks));
        let progress = derived_progress(&task.id, tasks).unwrap_or(task.progress);
        let assigned = if task.assigned_to.is_empty() { "-" } else { task.assigned_to.as_str() };
        let parent = task.parent_id.as_ref().map_or_else(|| "-".to_string(), TaskId::to_string);
        let lines = [
            format!("ID: {}", task.id),
            format!("Title: {}", task.title),
            format!("Description: {}", task.description),
            format!("Assigned To: {assigned}"),
            format!("Created On: {}", format_for_display(Some(task.created_at))),
            format!("Due By: {}", format_for_display(Some(task.due_at))),
            format!("Duration: {}", dates::format_duration(Some(task.duration_days))),
            format!("Parent: {parent}"),
            format!("Progress: {progress}%"),
        ];
        for line in lines {
            out.push_str(&indent);
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Render `tasks` in `format`.
pub fn export(tasks: &[Task], format: ExportFormat) -> Result<String, PersistenceError> {
    match format {
        ExportFormat::Text => Ok(export_text(tasks)),
        ExportFormat::Json => export_json(tasks),
    }
}

/// File name suggested for an export made at `at`.
pub fn suggested_filename(format: ExportFormat, at: NaiveDateTime) -> String {
    format!("tasks_{}.{}", at.format("%Y-%m-%d_%H-%M-%S"), format.extension())
}
