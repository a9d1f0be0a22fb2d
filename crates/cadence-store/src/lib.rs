//! `cadence-store`: durable task records.
//!
//! The scheduler only depends on the [`TaskStore`] contract. [`SqliteTaskStore`]
//! is the implementation the gateway ships with: one `tasks` table, one row
//! per task, the outbound call description stored as JSON text.

pub mod db;
pub mod error;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::SqliteTaskStore;

use cadence_core::Task;

/// Data-access contract for persisted tasks.
///
/// Implementations must be safe to share between the API layer, the engine's
/// waiters and every in-flight executor.
pub trait TaskStore: Send + Sync {
    /// Fetch one task. Unknown ids yield [`StoreError::NotFound`].
    fn get_one(&self, id: &str) -> Result<Task>;

    /// Tasks that must be live after a restart: enabled, not expired at
    /// `now_unix`, and either recurring or never executed.
    fn get_active(&self, now_unix: i64) -> Result<Vec<Task>>;

    fn insert(&self, task: &Task) -> Result<()>;

    fn update_enable(&self, id: &str, enable: bool) -> Result<()>;

    /// Record the outcome of a run and stamp `last_executed_at` with the
    /// current time.
    fn update_task_status(&self, id: &str, exception_message: &str, is_complete: bool)
        -> Result<()>;

    /// Remove a task. Unknown ids yield [`StoreError::NotFound`].
    fn delete(&self, id: &str) -> Result<()>;

    /// Cheap liveness probe used by the health endpoint.
    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
