//! SQL DDL for the event store.
//!
//! Defines the append-only `events` table (one row per recorded observation,
//! with its embedding and optional causal edge) and the `schema_meta`
//! key/value table. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

/// All schema DDL statements.
const SCHEMA_SQL: &str = r#"
-- Append-only event log with self-referential causal edge
CREATE TABLE IF NOT EXISTS events (
    event_id INTEGER PRIMARY KEY,
    timestamp TEXT NOT NULL,
    effect_text TEXT NOT NULL CHECK(length(trim(effect_text)) > 0),
    embedding BLOB NOT NULL,
    cause_id INTEGER,
    causal_relationship TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
CREATE INDEX IF NOT EXISTS idx_events_cause ON events(cause_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
