use rusqlite::{Connection, Result};

/// Initialise the plant table. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS plants (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            plant_type     TEXT    NOT NULL,
            water_level    INTEGER NOT NULL CHECK (water_level BETWEEN 0 AND 100),
            growth_points  INTEGER NOT NULL CHECK (growth_points >= 0),
            health_status  TEXT    NOT NULL,
            planted_at     TEXT    NOT NULL,
            revision       INTEGER NOT NULL DEFAULT 0
        ) STRICT;",
    )
}
