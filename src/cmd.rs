//! Command implementations for the CLI interface.
//!
//! Each handler drives the library's [`Session`] the way an interactive front end
//! would, then prints the outcome. Errors are reported on stderr and end the
//! process with status 1.

use std::fs;
use std::path::Path;

use clap::Subcommand;
use clap_complete::{generate, Shell};

use phased_tasks::dates::{self, format_duration, format_for_display, format_timestamp};
use phased_tasks::graph::TaskGraph;
use phased_tasks::hierarchy::ancestors_of;
use phased_tasks::persist::suggested_filename;
use phased_tasks::{
    AssigneeLookup, ExportFormat, FileStore, ForestRow, ImportStrategy, Session, TaskDraft, TaskId,
    TaskPatch,
};

pub type AppSession = Session<FileStore>;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Description (required).
        #[arg(long)]
        desc: String,
        /// Assignee; must be one of the configured names.
        #[arg(long)]
        assignee: Option<String>,
        /// Created on: YYYY-MM-DDTHH:MM. Defaults to now.
        #[arg(long)]
        created: Option<String>,
        /// Due by: YYYY-MM-DDTHH:MM.
        #[arg(long)]
        due: String,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Initial progress, 0-100.
        #[arg(long)]
        progress: Option<u32>,
    },

    /// List tasks as a tree.
    List {
        /// Print without tree indentation.
        #[arg(long)]
        flat: bool,
    },

    /// View a single task by ID or title.
    View {
        /// Task ID or title to view
        id: String,
        /// Show child subtree.
        #[arg(long)]
        children: bool,
        /// Show ancestor chain.
        #[arg(long)]
        parents: bool,
    },

    /// Edit fields on a task. The duration is always re-derived.
    Edit {
        /// Task ID or title to edit
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// Assignee; pass an empty string to clear.
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        created: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// New parent task ID or title.
        #[arg(long, conflicts_with = "root")]
        parent: Option<String>,
        /// Make this a main task.
        #[arg(long)]
        root: bool,
        /// Progress, 0-100. Only leaf tasks accept it.
        #[arg(long)]
        progress: Option<u32>,
    },

    /// Move a task under another task, or to the top level.
    Reparent {
        /// Task ID or title to move
        id: String,
        /// New parent task ID or title.
        #[arg(long, required_unless_present = "root", conflicts_with = "root")]
        parent: Option<String>,
        /// Make this a main task.
        #[arg(long)]
        root: bool,
    },

    /// Delete a task together with all its subtasks.
    Delete {
        /// Task ID or title to delete
        id: String,
    },

    /// Show overall progress across all tasks.
    Progress,

    /// Import tasks from a JSON array.
    Import {
        /// Input JSON file path
        input: String,
        /// merge | replace
        #[arg(long, value_enum, default_value_t = ImportStrategy::Merge)]
        strategy: ImportStrategy,
        /// Skip creating backup before import
        #[arg(long)]
        no_backup: bool,
    },

    /// Export tasks as indented text or JSON.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Output file path; "-" for stdout. Defaults to a timestamped name.
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Print the task graph in Graphviz DOT format.
    Graph,

    /// List assignees matching a query.
    Assignees {
        #[arg(default_value = "")]
        query: String,
    },

    /// Create a timestamped backup of the task data.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches and suggests using ID instead.
pub fn resolve_task_identifier(identifier: &str, session: &AppSession) -> Result<TaskId, String> {
    let store = session.store();
    let as_id = TaskId::from(identifier);
    if store.get(&as_id).is_some() {
        return Ok(as_id);
    }

    let wanted = identifier.to_lowercase();
    let matches: Vec<_> = store
        .tasks()
        .iter()
        .filter(|t| t.title.to_lowercase() == wanted)
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with ID or title '{identifier}'")),
        1 => Ok(matches[0].id().clone()),
        _ => {
            let mut msg = format!("Multiple tasks found with title '{identifier}':\n");
            for t in matches {
                msg.push_str(&format!("  ID {}: {}\n", t.id(), t.title));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(msg)
        }
    }
}

fn resolve_or_exit(identifier: &str, session: &AppSession) -> TaskId {
    resolve_task_identifier(identifier, session)
        .unwrap_or_else(|e| fail(format!("Error resolving task: {e}")))
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Print forest rows as a table, indenting titles by depth.
pub fn print_table(rows: &[ForestRow<'_>], indent: bool) {
    println!(
        "{:<14} {:<5} {:<9} {:<20} {:<14} {}",
        "ID", "Prog", "Duration", "Due By", "Assigned", "Title"
    );
    for row in rows {
        let t = row.task;
        let indent_str = if indent { "  ".repeat(row.depth) } else { String::new() };
        let marker = if row.has_children { "▸ " } else { "" };
        let assigned = if t.assigned_to.is_empty() { "-" } else { t.assigned_to.as_str() };
        println!(
            "{:<14} {:<5} {:<9} {:<20} {:<14} {}{}{}",
            truncate(t.id().as_str(), 14),
            format!("{}%", row.progress),
            format_duration(Some(t.duration_days())),
            format_for_display(Some(t.due_at())),
            truncate(assigned, 14),
            indent_str,
            marker,
            t.title
        );
    }
}

/// Add a new task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    session: &mut AppSession,
    title: String,
    desc: String,
    assignee: Option<String>,
    created: Option<String>,
    due: String,
    parent: Option<String>,
    progress: Option<u32>,
) {
    let parent_id = parent.map(|p| resolve_or_exit(&p, session));
    let created = created.unwrap_or_else(|| format_timestamp(dates::now()));
    let draft = TaskDraft {
        title,
        description: desc,
        assigned_to: assignee.unwrap_or_default(),
        created_at: created,
        due_at: due,
        parent_id,
        progress,
    };
    match session.create_task(&draft) {
        Ok(task) => println!(
            "Added task {} ({})",
            task.id(),
            format_duration(Some(task.duration_days()))
        ),
        Err(e) => fail(format!("Cannot add task: {e}")),
    }
}

/// List the whole forest.
pub fn cmd_list(session: &AppSession, flat: bool) {
    let rows = session.list_tasks();
    if rows.is_empty() {
        println!("No tasks available.");
        return;
    }
    print_table(&rows, !flat);
}

/// View detailed information about a specific task.
pub fn cmd_view(session: &AppSession, id: String, children: bool, parents: bool) {
    let task_id = resolve_or_exit(&id, session);
    let store = session.store();
    let Some(task) = store.get(&task_id) else {
        fail(format!("Task {task_id} not found."));
    };
    let progress = store.progress_of(&task_id).unwrap_or(task.own_progress());
    println!("ID:           {}", task.id());
    println!("Title:        {}", task.title);
    println!("Assigned To:  {}", if task.assigned_to.is_empty() { "-" } else { task.assigned_to.as_str() });
    println!("Created On:   {}", format_for_display(Some(task.created_at())));
    println!("Due By:       {}", format_for_display(Some(task.due_at())));
    println!("Duration:     {}", format_duration(Some(task.duration_days())));
    println!("Progress:     {progress}%");
    println!("Parent:       {}", task.parent_id().map_or_else(|| "-".into(), TaskId::to_string));
    println!("Description:\n{}\n", task.description);

    if parents {
        let chain = ancestors_of(&task_id, store.tasks());
        if chain.is_empty() {
            println!("Ancestors: -");
        } else {
            let chain: Vec<String> = chain.iter().map(|i| i.to_string()).collect();
            println!("Ancestors (closest first): {}", chain.join(" -> "));
        }
    }

    if children {
        println!("Children:");
        let rows = session.list_tasks();
        let start = rows.iter().position(|r| r.task.id() == &task_id);
        let subtree: Vec<_> = match start {
            Some(i) => rows[i + 1..]
                .iter()
                .take_while(|r| r.depth > rows[i].depth)
                .map(|r| (r, r.depth - rows[i].depth))
                .collect(),
            None => Vec::new(),
        };
        if subtree.is_empty() {
            println!("  -");
        }
        for (row, depth) in subtree {
            println!("{}- {} [{}%] (#{})", "  ".repeat(depth), row.task.title, row.progress, row.task.id());
        }
    }
}

/// Edit a task through the session's edit buffer.
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    session: &mut AppSession,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    assignee: Option<String>,
    created: Option<String>,
    due: Option<String>,
    parent: Option<String>,
    root: bool,
    progress: Option<u32>,
) {
    let task_id = resolve_or_exit(&id, session);
    let parent_id = match (parent, root) {
        (_, true) => Some(None),
        (Some(p), false) => Some(Some(resolve_or_exit(&p, session))),
        (None, false) => None,
    };
    let patch = TaskPatch {
        title,
        description: desc,
        assigned_to: assignee,
        created_at: created,
        due_at: due,
        parent_id,
        progress,
    };
    if patch.is_empty() {
        println!("Nothing to change.");
        return;
    }

    if let Err(e) = session.edit_task(&task_id) {
        fail(format!("Cannot edit task: {e}"));
    }
    let saved = session.update_edit(patch).and_then(|_| session.save_edit());
    match saved {
        Ok(task) => println!(
            "Updated task {} ({})",
            task.id(),
            format_duration(Some(task.duration_days()))
        ),
        Err(e) => {
            session.cancel_edit();
            fail(format!("Cannot update task: {e}"));
        }
    }
}

/// Move a task under a new parent or to the top level.
pub fn cmd_reparent(session: &mut AppSession, id: String, parent: Option<String>, root: bool) {
    let task_id = resolve_or_exit(&id, session);
    let parent_id = if root {
        None
    } else {
        parent.map(|p| resolve_or_exit(&p, session))
    };
    match session.reparent_task(&task_id, parent_id.as_ref()) {
        Ok(task) => match task.parent_id() {
            Some(p) => println!("Moved task {} under {}", task.id(), p),
            None => println!("Moved task {} to the top level", task.id()),
        },
        Err(e) => fail(format!("Cannot move task: {e}")),
    }
}

/// Delete a task and its whole subtree.
pub fn cmd_delete(session: &mut AppSession, id: String) {
    let task_id = resolve_or_exit(&id, session);
    match session.delete_task(&task_id) {
        Ok(removed) => println!("Deleted {} task(s).", removed.len()),
        Err(e) => fail(format!("Cannot delete task: {e}")),
    }
}

/// Print the mean progress of all tasks.
pub fn cmd_progress(session: &AppSession) {
    match session.store().overall_progress() {
        Some(p) => println!("Overall progress: {p:.1}% across {} task(s)", session.store().len()),
        None => println!("No tasks available."),
    }
}

/// Import tasks from a JSON file with automatic backup.
pub fn cmd_import(session: &mut AppSession, input: String, strategy: ImportStrategy, no_backup: bool) {
    if !no_backup && !session.store().is_empty() {
        let key = session.persistence().key().to_string();
        match session.persistence().store().backup(&key) {
            Ok(path) => println!("Created backup: {}", path.display()),
            Err(e) => fail(format!("Failed to create backup ({e}); rerun with --no-backup to skip it.")),
        }
    }

    let blob = fs::read_to_string(&input)
        .unwrap_or_else(|e| fail(format!("Failed to read '{input}': {e}")));
    match session.import_tasks(&blob, strategy) {
        Ok(count) => println!(
            "Import completed. {count} task(s) imported, {} in total.",
            session.store().len()
        ),
        Err(e) => fail(format!("Import rejected: {e}")),
    }
}

/// Export tasks to a file or stdout.
pub fn cmd_export(session: &AppSession, format: ExportFormat, output: Option<String>) {
    let content = session
        .export_tasks(format)
        .unwrap_or_else(|e| fail(format!("Export failed: {e}")));
    let output = output.unwrap_or_else(|| suggested_filename(format, dates::now()));
    if output == "-" {
        print!("{content}");
        return;
    }
    match fs::write(&output, content) {
        Ok(()) => println!("Exported {} task(s) to {}", session.store().len(), output),
        Err(e) => fail(format!("Failed to write '{output}': {e}")),
    }
}

/// Print the DOT graph of parent links.
pub fn cmd_graph(session: &AppSession) {
    print!("{}", TaskGraph::build(session.store().tasks()).to_dot());
}

/// List assignees matching `query`.
pub fn cmd_assignees(session: &AppSession, query: &str) {
    let names = session.store().rules().assignees.suggest(query);
    if names.is_empty() {
        println!("No assignees match '{query}'.");
    }
    for name in names {
        println!("{name}");
    }
}

/// Create a timestamped backup of the task file.
pub fn cmd_backup(session: &AppSession) {
    let key = session.persistence().key();
    match session.persistence().store().backup(key) {
        Ok(path) => println!("Backup created: {}", path.display()),
        Err(e) => fail(format!("Failed to create backup: {e}")),
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Where the data lives when `--data-dir` is given or not.
pub fn data_dir_or_default(dir: Option<&Path>) -> std::path::PathBuf {
    dir.map(Path::to_path_buf)
        .unwrap_or_else(phased_tasks::config::default_data_dir)
}
