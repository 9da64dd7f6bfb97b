//! # Phased Tasks
//!
//! A hierarchical task list. Tasks form a forest through optional parent
//! links, carry a created/due window with a derived whole-day duration, and
//! parents report progress rolled up from their children.
//!
//! ## Layout
//!
//! - [`dates`]: timestamp parsing, display and day-duration arithmetic
//! - [`validate`]: field and temporal rules shared by create and edit
//! - [`hierarchy`]: ancestor/descendant queries and the forest ordering
//! - [`store`]: the authoritative [`TaskStore`] and its mutations
//! - [`persist`]: key-value persistence, import merge and export
//! - [`session`]: the command interface a front end drives
//! - [`graph`]: node/edge data for graph views
//!
//! ```no_run
//! use phased_tasks::{MemoryStore, Persistence, Rules, Session, TaskDraft};
//!
//! let mut session = Session::open(Persistence::new(MemoryStore::default(), "tasks"), Rules::default());
//! let task = session
//!     .create_task(&TaskDraft::new("Ship", "Cut the release").window("2030-01-01T09:00", "2030-01-03T17:00"))
//!     .unwrap();
//! assert_eq!(task.duration_days(), 3);
//! ```

pub mod config;
pub mod dates;
pub mod error;
pub mod fields;
pub mod graph;
pub mod hierarchy;
pub mod persist;
pub mod session;
pub mod store;
pub mod task;
pub mod validate;

pub use error::{CycleError, ImportError, NotFoundError, PersistenceError, TaskError, ValidationError};
pub use fields::{AssigneeLookup, Assignees, ExportFormat, ImportStrategy};
pub use persist::{FileStore, KeyValueStore, MemoryStore, Persistence};
pub use session::{EditBuffer, Session};
pub use store::{ForestRow, TaskStore};
pub use task::{Task, TaskDraft, TaskId, TaskPatch};
pub use validate::Rules;
