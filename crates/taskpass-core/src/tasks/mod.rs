//! Local to-do list stored in SQLite.
//!
//! # Responsibility
//! - Open (or create) the `todo.db` file and the `tasks` table.
//! - Provide create/read/update/delete over tasks.
//! - Keep an in-memory copy of the table that is rebuilt after every write.
//!
//! # Invariants
//! - Table bootstrap is idempotent; reopening never drops rows.
//! - After an awaited mutation the cached list equals the table contents.
//! - Update/delete of a missing id changes nothing and is not an error.

mod db;
mod store;

pub use db::{open_db, open_db_in_memory, DATABASE_FILE};
pub use store::{Task, TaskResult, TaskStore, TaskStoreError};
