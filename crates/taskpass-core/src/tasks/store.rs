use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use super::db::{open_db, open_db_in_memory};

const SELECT_TASKS_SQL: &str = "SELECT id, task FROM tasks ORDER BY id;";

/// One row of the `tasks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(rename = "task")]
    pub text: String,
}

#[derive(Error, Debug)]
pub enum TaskStoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type TaskResult<T> = Result<T, TaskStoreError>;

/// SQLite-backed task list with a read-through in-memory copy.
///
/// All statements run on the blocking pool against one shared connection,
/// so writes are serialized.
pub struct TaskStore {
    conn: Arc<Mutex<Connection>>,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Open (creating if absent) the database file and load the list
    pub async fn open(path: impl Into<PathBuf>) -> TaskResult<Self> {
        let path = path.into();
        let conn = tokio::task::spawn_blocking(move || open_db(&path)).await??;
        Self::from_connection(conn).await
    }

    pub async fn open_in_memory() -> TaskResult<Self> {
        let conn = open_db_in_memory()?;
        Self::from_connection(conn).await
    }

    async fn from_connection(conn: Connection) -> TaskResult<Self> {
        let mut store = Self {
            conn: Arc::new(Mutex::new(conn)),
            tasks: Vec::new(),
        };
        store.reload().await?;
        Ok(store)
    }

    /// Cached list as of the last completed operation
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Read every row straight from the table, ordered by id
    pub async fn list_tasks(&self) -> TaskResult<Vec<Task>> {
        self.with_conn(|conn| Ok(select_all(conn)?)).await
    }

    /// Rebuild the cached list from the table
    pub async fn reload(&mut self) -> TaskResult<()> {
        self.tasks = self.list_tasks().await?;
        Ok(())
    }

    pub async fn add_task(&mut self, text: &str) -> TaskResult<()> {
        let text = text.to_string();
        self.mutate("add", move |tx| {
            tx.execute("INSERT INTO tasks (task) VALUES (?1);", params![text])?;
            Ok(())
        })
        .await
    }

    /// Replace the text of task `id`; a missing id is a no-op
    pub async fn update_task(&mut self, id: i64, text: &str) -> TaskResult<()> {
        let text = text.to_string();
        self.mutate("update", move |tx| {
            let changed = tx.execute(
                "UPDATE tasks SET task = ?1 WHERE id = ?2;",
                params![text, id],
            )?;
            if changed == 0 {
                debug!(id, "Update matched no task");
            }
            Ok(())
        })
        .await
    }

    /// Delete task `id`; a missing id is a no-op
    pub async fn delete_task(&mut self, id: i64) -> TaskResult<()> {
        self.mutate("delete", move |tx| {
            let changed = tx.execute("DELETE FROM tasks WHERE id = ?1;", params![id])?;
            if changed == 0 {
                debug!(id, "Delete matched no task");
            }
            Ok(())
        })
        .await
    }

    /// Run `apply` and re-read the table inside one transaction.
    ///
    /// The transaction rolls back when dropped uncommitted, so any error
    /// leaves both the table and the cached list unchanged.
    async fn mutate<F>(&mut self, op: &'static str, apply: F) -> TaskResult<()>
    where
        F: FnOnce(&Transaction<'_>) -> rusqlite::Result<()> + Send + 'static,
    {
        let result = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                apply(&tx)?;
                let rows = select_all(&tx)?;
                tx.commit()?;
                Ok(rows)
            })
            .await;

        match result {
            Ok(rows) => {
                debug!(op, count = rows.len(), "Task list refreshed");
                self.tasks = rows;
                Ok(())
            }
            Err(e) => {
                error!(op, error = %e, "Task operation failed");
                Err(e)
            }
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> TaskResult<T>
    where
        F: FnOnce(&mut Connection) -> TaskResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| TaskStoreError::Poisoned)?;
            f(&mut *guard)
        })
        .await?
    }
}

fn select_all(conn: &Connection) -> rusqlite::Result<Vec<Task>> {
    let mut stmt = conn.prepare(SELECT_TASKS_SQL)?;
    let rows = stmt.query_map([], |row| {
        Ok(Task {
            id: row.get(0)?,
            text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        })
    })?;
    rows.collect()
}
