use std::sync::{Mutex, MutexGuard, PoisonError};

use cadence_core::{time, Task, TaskData, TaskStatus};
use rusqlite::{types::Type, Connection};
use tracing::{debug, info, instrument};

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::TaskStore;

const TASK_COLUMNS: &str = "id, schedule, enable, schedule_date, schedule_time, recur,
     is_recur_enabled, number_of_attempts, created_at, updated_at, expires_at,
     start_unix, end_unix, task_data, last_executed_at, is_complete, exception_message";

/// Thread-safe task store backed by a single SQLite connection.
///
/// Wraps the connection in a `Mutex`; every call holds the lock only for the
/// duration of one statement.
pub struct SqliteTaskStore {
    db: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Fresh in-memory database, handy for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read an INTEGER column that must hold a non-negative value.
fn column_to_unsigned<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: TryFrom<i64>,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    let raw: i64 = row.get(idx)?;
    T::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

/// Map a SELECT row (column order from TASK_COLUMNS) to a Task.
fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let schedule_raw: String = row.get(1)?;
    let schedule = schedule_raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into())
    })?;
    let data_json: String = row.get(13)?;
    let task_data: TaskData = serde_json::from_str(&data_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, Box::new(e)))?;

    Ok(Task {
        id: row.get(0)?,
        schedule,
        enable: row.get::<_, i64>(2)? != 0,
        schedule_date: row.get(3)?,
        schedule_time: row.get(4)?,
        recur: column_to_unsigned(row, 5)?,
        is_recur_enabled: row.get::<_, i64>(6)? != 0,
        number_of_attempts: column_to_unsigned(row, 7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        expires_at: row.get(10)?,
        start_unix: row.get(11)?,
        end_unix: row.get(12)?,
        task_data,
        status: TaskStatus {
            last_executed_at: row.get(14)?,
            is_complete: row.get::<_, i64>(15)? != 0,
            exception_message: row.get(16)?,
        },
    })
}

impl TaskStore for SqliteTaskStore {
    #[instrument(skip(self))]
    fn get_one(&self, id: &str) -> Result<Task> {
        let db = self.conn();
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        match db.query_row(&sql, [id], row_to_task) {
            Ok(task) => Ok(task),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound {
                id: id.to_string(),
            }),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    #[instrument(skip(self))]
    fn get_active(&self, now_unix: i64) -> Result<Vec<Task>> {
        let db = self.conn();
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE enable = 1
               AND end_unix >= ?1
               AND (is_recur_enabled = 1 OR last_executed_at IS NULL OR last_executed_at = '')
             ORDER BY start_unix"
        );
        let mut stmt = db.prepare(&sql)?;
        let tasks = stmt
            .query_map([now_unix], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(count = tasks.len(), "loaded active tasks");
        Ok(tasks)
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    fn insert(&self, task: &Task) -> Result<()> {
        let recur = i64::try_from(task.recur).map_err(|_| StoreError::OutOfRange {
            field: "recur",
            value: task.recur,
        })?;
        let data_json = serde_json::to_string(&task.task_data)?;
        let db = self.conn();
        db.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS})
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)"
            ),
            rusqlite::params![
                task.id,
                task.schedule.as_str(),
                task.enable as i64,
                task.schedule_date,
                task.schedule_time,
                recur,
                task.is_recur_enabled as i64,
                task.number_of_attempts as i64,
                task.created_at,
                task.updated_at,
                task.expires_at,
                task.start_unix,
                task.end_unix,
                data_json,
                task.status.last_executed_at,
                task.status.is_complete as i64,
                task.status.exception_message,
            ],
        )?;
        info!("task inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    fn update_enable(&self, id: &str, enable: bool) -> Result<()> {
        let now = time::now_timestamp();
        let db = self.conn();
        let n = db.execute(
            "UPDATE tasks SET enable = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![enable as i64, now, id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn update_task_status(
        &self,
        id: &str,
        exception_message: &str,
        is_complete: bool,
    ) -> Result<()> {
        let now = time::now_timestamp();
        let db = self.conn();
        let n = db.execute(
            "UPDATE tasks
             SET last_executed_at = ?1, is_complete = ?2, exception_message = ?3, updated_at = ?1
             WHERE id = ?4",
            rusqlite::params![now, is_complete as i64, exception_message, id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete(&self, id: &str) -> Result<()> {
        let db = self.conn();
        let n = db.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        info!("task deleted");
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        let db = self.conn();
        db.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
