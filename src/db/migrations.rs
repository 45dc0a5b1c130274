//! Schema evolution for the event store.
//!
//! The baseline DDL in [`crate::db::schema`] is version 1. Anything the
//! binary needs beyond it is an entry in [`MIGRATIONS`], applied in order on
//! open; the reached version is tracked under the `schema_version` key of
//! `schema_meta`. Versions only move forward.

use rusqlite::{Connection, OptionalExtension};

/// A single forward migration step.
struct Migration {
    version: u32,
    description: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// Ordered migrations beyond the baseline schema.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 2,
    description: "record embedding model and dimension",
    apply: record_embedding_metadata,
}];

/// The version a fully migrated database reports.
pub const LATEST_VERSION: u32 = 2;

/// Read the tracked schema version. A database without the key (or with an
/// unparsable value) reports 0 and will have every migration applied.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(meta_get(conn, "schema_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

/// Apply every migration newer than the tracked version, bumping the version
/// after each step so a failure resumes where it stopped.
pub fn apply_pending(conn: &Connection) -> rusqlite::Result<()> {
    let current = schema_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        (migration.apply)(conn)?;
        meta_set(conn, "schema_version", &migration.version.to_string())?;
    }

    Ok(())
}

/// The embedding model the stored vectors were produced with, if recorded.
pub fn stored_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    meta_get(conn, "embedding_model")
}

/// The dimension of the stored vectors, if recorded.
pub fn stored_embedding_dim(conn: &Connection) -> rusqlite::Result<Option<usize>> {
    Ok(meta_get(conn, "embedding_dim")?.and_then(|v| v.parse().ok()))
}

/// Overwrite the recorded embedding model, e.g. after re-embedding a store
/// with a new model.
pub fn record_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    meta_set(conn, "embedding_model", model)
}

/// Version 2: stored embeddings are raw f32 blobs, so nothing in a row says
/// which model produced them or how wide they are. Recording both lets a
/// reopen detect that the configured model no longer matches the vectors on
/// disk. Existing values are kept: a store that already declared its model
/// must not be relabelled by an upgrade.
fn record_embedding_metadata(conn: &Connection) -> rusqlite::Result<()> {
    meta_set_if_absent(conn, "embedding_model", "all-MiniLM-L6-v2")?;
    meta_set_if_absent(
        conn,
        "embedding_dim",
        &crate::embedding::EMBEDDING_DIM.to_string(),
    )
}

// ── schema_meta access ────────────────────────────────────────────────────────

fn meta_get(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

fn meta_set(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

fn meta_set_if_absent(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}
