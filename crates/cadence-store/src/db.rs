use rusqlite::Connection;

use crate::error::Result;

/// Initialise the task schema in `conn`.
///
/// Creates the `tasks` table (idempotent) and an index on `(enable, end_unix)`
/// so the startup query for active tasks stays cheap.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT    NOT NULL PRIMARY KEY,
            schedule            TEXT    NOT NULL,   -- NOW | LATER
            enable              INTEGER NOT NULL DEFAULT 1,
            schedule_date       TEXT    NOT NULL DEFAULT '',
            schedule_time       TEXT    NOT NULL DEFAULT '',
            recur               INTEGER NOT NULL DEFAULT 0,
            is_recur_enabled    INTEGER NOT NULL DEFAULT 0,
            number_of_attempts  INTEGER NOT NULL DEFAULT 3,
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL,
            expires_at          TEXT    NOT NULL,
            start_unix          INTEGER NOT NULL,
            end_unix            INTEGER NOT NULL,
            task_data           TEXT    NOT NULL,   -- JSON-encoded TaskData
            last_executed_at    TEXT,               -- NULL until the first run ends
            is_complete         INTEGER NOT NULL DEFAULT 0,
            exception_message   TEXT    NOT NULL DEFAULT ''
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_tasks_active ON tasks (enable, end_unix);
        ",
    )?;
    Ok(())
}
