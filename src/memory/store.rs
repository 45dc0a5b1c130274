//! Event store — the append-only persistence layer.
//!
//! [`insert_event`] is the single write entry point. Identifier allocation
//! and the row insert run inside one transaction, so concurrent writers on
//! the same connection handle can never be assigned the same `event_id`, and
//! restart recovery (`MAX(event_id)+1`) is crash-safe.
//!
//! Similarity is computed by the engine, not here: the read functions just
//! return rows and the callers scan. Exact linear scan is the intended
//! design at this scale.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::memory::types::Event;
use crate::memory::{bytes_to_embedding, embedding_to_bytes};

/// Aggregate counts over the event table.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_events: u64,
    pub linked_events: u64,
    pub orphan_events: u64,
    /// `linked / total`, or 0.0 for an empty store.
    pub chain_coverage: f64,
}

/// Fixed-width RFC 3339 timestamp. Fixed fractional digits keep lexicographic
/// order equal to chronological order for the `timestamp > ?` window scan.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn read_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    let raw_ts: String = row.get(1)?;
    let blob: Vec<u8> = row.get(3)?;
    Ok(Event {
        event_id: row.get(0)?,
        timestamp: parse_timestamp(&raw_ts)?,
        effect_text: row.get(2)?,
        embedding: bytes_to_embedding(&blob),
        cause_id: row.get(4)?,
        causal_relationship: row.get(5)?,
    })
}

const EVENT_COLUMNS: &str =
    "event_id, timestamp, effect_text, embedding, cause_id, causal_relationship";

/// Atomic append. Allocates the next dense `event_id` and stamps the
/// insertion time inside a single transaction. Returns the persisted row.
pub fn insert_event(
    conn: &mut Connection,
    effect_text: &str,
    embedding: &[f32],
    cause_id: Option<i64>,
    causal_relationship: Option<&str>,
) -> rusqlite::Result<Event> {
    let tx = conn.transaction()?;

    let next_id: i64 = tx.query_row(
        "SELECT COALESCE(MAX(event_id), 0) + 1 FROM events",
        [],
        |row| row.get(0),
    )?;

    let timestamp = Utc::now();
    tx.execute(
        "INSERT INTO events (event_id, timestamp, effect_text, embedding, cause_id, causal_relationship) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            next_id,
            format_timestamp(timestamp),
            effect_text,
            embedding_to_bytes(embedding),
            cause_id,
            causal_relationship,
        ],
    )?;

    tx.commit()?;

    Ok(Event {
        event_id: next_id,
        timestamp,
        effect_text: effect_text.to_string(),
        embedding: embedding.to_vec(),
        cause_id,
        causal_relationship: causal_relationship.map(str::to_string),
    })
}

/// Fetch a single event by id.
pub fn get_event(conn: &Connection, event_id: i64) -> rusqlite::Result<Option<Event>> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
        params![event_id],
        read_event,
    )
    .optional()
}

/// Events whose timestamp falls within the last `window_hours`, newest first,
/// capped at `limit`. This is the candidate pool for cause detection.
pub fn recent_events(
    conn: &Connection,
    window_hours: u64,
    limit: usize,
) -> rusqlite::Result<Vec<Event>> {
    let cutoff = Utc::now() - chrono::Duration::hours(window_hours as i64);

    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE timestamp > ?1 \
         ORDER BY event_id DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(params![format_timestamp(cutoff), limit as i64], read_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every event, oldest first. Scan source for the anchor search.
pub fn all_events(conn: &Connection) -> rusqlite::Result<Vec<Event>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY event_id"))?;
    let rows = stmt
        .query_map([], read_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Events whose `cause_id` equals the given id, oldest first. Supports
/// forward traversal.
pub fn children_of(conn: &Connection, event_id: i64) -> rusqlite::Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE cause_id = ?1 ORDER BY event_id"
    ))?;
    let rows = stmt
        .query_map(params![event_id], read_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Aggregate linkage statistics.
pub fn event_stats(conn: &Connection) -> rusqlite::Result<StoreStats> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    let linked: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE cause_id IS NOT NULL",
        [],
        |row| row.get(0),
    )?;

    let chain_coverage = if total > 0 {
        linked as f64 / total as f64
    } else {
        0.0
    };

    Ok(StoreStats {
        total_events: total as u64,
        linked_events: linked as u64,
        orphan_events: (total - linked) as u64,
        chain_coverage,
    })
}
