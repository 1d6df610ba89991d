//! Connection bootstrap for the task database.

use std::path::Path;
use std::time::Instant;

use rusqlite::Connection;
use tracing::{error, info};

use super::store::TaskResult;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "todo.db";

const CREATE_TASKS_SQL: &str =
    "CREATE TABLE IF NOT EXISTS tasks (id INTEGER PRIMARY KEY AUTOINCREMENT, task TEXT);";

/// Opens (creating if absent) a database file and ensures the `tasks` table.
pub fn open_db(path: impl AsRef<Path>) -> TaskResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to open task database");
        e
    })?;

    bootstrap_connection(&conn)?;
    info!(
        path = %path.display(),
        duration_ms = started_at.elapsed().as_millis() as u64,
        "Task database ready"
    );
    Ok(conn)
}

/// Opens an in-memory database with the `tasks` table.
pub fn open_db_in_memory() -> TaskResult<Connection> {
    let conn = Connection::open_in_memory()?;
    bootstrap_connection(&conn)?;
    info!("In-memory task database ready");
    Ok(conn)
}

fn bootstrap_connection(conn: &Connection) -> TaskResult<()> {
    conn.execute_batch(CREATE_TASKS_SQL).map_err(|e| {
        error!(error = %e, "Failed to create tasks table");
        e
    })?;
    Ok(())
}
