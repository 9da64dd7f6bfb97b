//! # pt - Phased Tasks CLI
//!
//! Command-line front end for the `phased_tasks` library: a hierarchical task
//! list where every task has a created/due window, a derived duration in days,
//! an optional parent, and progress that rolls up from subtasks.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a main task and a subtask
//! pt add "Launch" --desc "Ship the product" --due 2030-02-01T17:00
//! pt add "Docs" --desc "Write the guide" --due 2030-01-20T17:00 --parent Launch --progress 40
//!
//! # See the tree with rolled-up progress
//! pt list
//!
//! # Round-trip through JSON
//! pt export --format json -o tasks.json
//! pt import tasks.json --strategy merge
//! ```
//!
//! Data is stored in `~/.phased-tasks/tasks.json`; an optional
//! `~/.phased-tasks/config.toml` sets the storage key, the assignee list and
//! whether backdated tasks are accepted. Set `RUST_LOG=debug` for diagnostics.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use phased_tasks::config::Config;
use phased_tasks::{FileStore, Persistence, Session};

pub mod cli;
pub mod cmd;

use cli::Cli;
use cmd::*;

fn install_tracing() {
    // RUST_LOG overrides; default keeps the terminal quiet apart from warnings.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    install_tracing();

    // Handle commands that don't need the task data first
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let data_dir = data_dir_or_default(cli.data_dir.as_deref());
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("Failed to create data directory {}: {}", data_dir.display(), e);
        std::process::exit(1);
    }
    let config = match Config::load(&data_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let persistence = Persistence::new(FileStore::new(&data_dir), config.storage_key.clone());
    let mut session = Session::open(persistence, config.rules());

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Add { title, desc, assignee, created, due, parent, progress } =>
            cmd_add(&mut session, title, desc, assignee, created, due, parent, progress),

        Commands::List { flat } => cmd_list(&session, flat),

        Commands::View { id, children, parents } => cmd_view(&session, id, children, parents),

        Commands::Edit { id, title, desc, assignee, created, due, parent, root, progress } =>
            cmd_edit(&mut session, id, title, desc, assignee, created, due, parent, root, progress),

        Commands::Reparent { id, parent, root } => cmd_reparent(&mut session, id, parent, root),

        Commands::Delete { id } => cmd_delete(&mut session, id),

        Commands::Progress => cmd_progress(&session),

        Commands::Import { input, strategy, no_backup } =>
            cmd_import(&mut session, input, strategy, no_backup),

        Commands::Export { format, output } => cmd_export(&session, format, output),

        Commands::Graph => cmd_graph(&session),

        Commands::Assignees { query } => cmd_assignees(&session, &query),

        Commands::Backup => cmd_backup(&session),
    }
}
