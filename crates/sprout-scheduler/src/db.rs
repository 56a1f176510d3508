use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `jobs` table (idempotent) and an index on `(status, next_run)`
/// so the polling query stays cheap with thousands of delayed jobs queued.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id          TEXT    NOT NULL PRIMARY KEY,
            job_key     TEXT    UNIQUE,     -- recurring registrations only
            name        TEXT    NOT NULL,
            schedule    TEXT    NOT NULL,   -- JSON-encoded Schedule enum
            action      TEXT    NOT NULL,   -- JSON-encoded CareJob
            status      TEXT    NOT NULL DEFAULT 'pending',
            last_run    TEXT,               -- RFC 3339 or NULL
            next_run    TEXT,               -- RFC 3339 or NULL
            run_count   INTEGER NOT NULL DEFAULT 0,
            attempts    INTEGER NOT NULL DEFAULT 0,
            last_error  TEXT,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;

        -- Efficient polling: SELECT … WHERE status = 'pending' AND next_run <= ?
        CREATE INDEX IF NOT EXISTS idx_jobs_due ON jobs (status, next_run);
        ",
    )?;
    Ok(())
}
