use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};

use quadrant_common::{Category, Task, TaskId, TaskPatch};

/// Async-safe handle to the task database.
///
/// Wraps `TaskDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<TaskDb>>,
}

impl DbHandle {
    pub fn new(db: TaskDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&TaskDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so `ORDER BY` on the text
/// column is chronological.
fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

pub struct TaskDb {
    conn: Connection,
}

impl TaskDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        // Other processes may hold the write lock briefly.
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS tasks (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    owner_id TEXT NOT NULL,
                    text TEXT NOT NULL,
                    category TEXT NOT NULL,
                    previous_category TEXT,
                    completed INTEGER NOT NULL DEFAULT 0,
                    completed_at TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id, created_at);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────────

    /// All tasks of one owner, oldest first.
    pub fn list_tasks(&self, owner_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, text, category, previous_category, completed, completed_at, created_at, updated_at
                 FROM tasks WHERE owner_id = ?1 ORDER BY created_at, seq",
            )
            .context("Failed to prepare list_tasks")?;
        let rows = stmt
            .query_map(params![owner_id], |row| {
                Ok(TaskRow {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    category: row.get(2)?,
                    previous_category: row.get(3)?,
                    completed: row.get(4)?,
                    completed_at: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            })
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            let r = row.context("Failed to read task row")?;
            tasks.push(r.into_task()?);
        }
        Ok(tasks)
    }

    pub fn task_exists(&self, owner_id: &str, id: &str) -> Result<bool> {
        let exists: bool = self
            .conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM tasks WHERE owner_id = ?1 AND id = ?2",
                params![owner_id, id],
                |row| row.get(0),
            )
            .context("Failed to look up task")?;
        Ok(exists)
    }

    // ── Writes ────────────────────────────────────────────────────────

    pub fn insert_task(
        &self,
        owner_id: &str,
        text: &str,
        category: Category,
        created_at: &DateTime<Utc>,
    ) -> Result<TaskId> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO tasks (id, owner_id, text, category, previous_category, completed, completed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?4, 0, NULL, ?5)",
                params![id, owner_id, text, category.as_str(), ts(created_at)],
            )
            .context("Failed to insert task")?;
        Ok(id)
    }

    /// Merge the set fields of `patch` into one task. Returns `false` when the
    /// owner has no task with that id.
    pub fn update_task(&self, owner_id: &str, id: &str, patch: &TaskPatch) -> Result<bool> {
        if !self.task_exists(owner_id, id)? {
            return Ok(false);
        }

        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        if let Some(text) = &patch.text {
            tx.execute(
                "UPDATE tasks SET text = ?1 WHERE owner_id = ?2 AND id = ?3",
                params![text, owner_id, id],
            )
            .context("Failed to update task text")?;
        }
        if let Some(c) = patch.category {
            tx.execute(
                "UPDATE tasks SET category = ?1 WHERE owner_id = ?2 AND id = ?3",
                params![c.as_str(), owner_id, id],
            )
            .context("Failed to update task category")?;
        }
        if let Some(c) = patch.previous_category {
            tx.execute(
                "UPDATE tasks SET previous_category = ?1 WHERE owner_id = ?2 AND id = ?3",
                params![c.as_str(), owner_id, id],
            )
            .context("Failed to update task previous_category")?;
        }
        if let Some(done) = patch.completed {
            tx.execute(
                "UPDATE tasks SET completed = ?1 WHERE owner_id = ?2 AND id = ?3",
                params![done, owner_id, id],
            )
            .context("Failed to update task completed")?;
        }
        if let Some(at) = &patch.completed_at {
            tx.execute(
                "UPDATE tasks SET completed_at = ?1 WHERE owner_id = ?2 AND id = ?3",
                params![at.as_ref().map(ts), owner_id, id],
            )
            .context("Failed to update task completed_at")?;
        }
        if let Some(at) = &patch.updated_at {
            tx.execute(
                "UPDATE tasks SET updated_at = ?1 WHERE owner_id = ?2 AND id = ?3",
                params![ts(at), owner_id, id],
            )
            .context("Failed to update task updated_at")?;
        }

        tx.commit().context("Failed to commit task update")?;
        Ok(true)
    }

    /// SQLite's `data_version` for this connection. It changes whenever
    /// another connection, in this process or another, commits to the file.
    pub fn data_version(&self) -> Result<i64> {
        self.conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))
            .context("Failed to read data_version")
    }

    /// Delete a set of tasks in one transaction. Ids the owner does not have
    /// are skipped. Returns how many rows went away.
    pub fn delete_tasks(&self, owner_id: &str, ids: &[TaskId]) -> Result<usize> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let mut removed = 0;
        for id in ids {
            removed += tx
                .execute(
                    "DELETE FROM tasks WHERE owner_id = ?1 AND id = ?2",
                    params![owner_id, id],
                )
                .with_context(|| format!("Failed to delete task {}", id))?;
        }
        tx.commit().context("Failed to commit batch delete")?;
        Ok(removed)
    }

    /// Write a row verbatim, bypassing category validation. Lets tests and
    /// imports reproduce documents written by older clients.
    pub fn insert_raw(&self, owner_id: &str, task: &Task) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO tasks (id, owner_id, text, category, previous_category, completed, completed_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    task.id,
                    owner_id,
                    task.text,
                    task.category,
                    task.previous_category,
                    task.completed,
                    task.completed_at.as_ref().map(ts),
                    ts(&task.created_at),
                    task.updated_at.as_ref().map(ts),
                ],
            )
            .context("Failed to insert raw task")?;
        Ok(())
    }
}

struct TaskRow {
    id: String,
    text: String,
    category: String,
    previous_category: Option<String>,
    completed: bool,
    completed_at: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

impl TaskRow {
    fn into_task(self) -> Result<Task> {
        Ok(Task {
            completed_at: self.completed_at.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: self.updated_at.as_deref().map(parse_ts).transpose()?,
            id: self.id,
            text: self.text,
            category: self.category,
            previous_category: self.previous_category,
            completed: self.completed,
        })
    }
}
