//! Chain traversal — anchor search plus backward and forward walks.
//!
//! Monotonic id ordering makes cycles impossible for well-formed data, but a
//! corrupted store could still produce one, so every walk carries a visited
//! set. A broken or cyclic chain degrades to the prefix collected so far; it
//! never fails a query.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::memory::types::Event;
use crate::memory::{cosine_similarity, store};

/// Find the event most similar to the query embedding, if any reaches the
/// threshold. Equal similarity prefers the newer event.
pub fn find_anchor(
    conn: &Connection,
    query_embedding: &[f32],
    threshold: f32,
) -> rusqlite::Result<Option<Event>> {
    let mut best_similarity = -1.0f32;
    let mut best: Option<Event> = None;

    for event in store::all_events(conn)? {
        if event.embedding.len() != query_embedding.len() {
            continue;
        }
        let similarity = cosine_similarity(query_embedding, &event.embedding);
        let newer = best
            .as_ref()
            .map(|b| event.timestamp > b.timestamp)
            .unwrap_or(true);
        if similarity > best_similarity || (similarity == best_similarity && newer) {
            best_similarity = similarity;
            best = Some(event);
        }
    }

    Ok(if best_similarity >= threshold { best } else { None })
}

/// Build the full chain around an anchor: ancestors back to the root, the
/// anchor itself, then up to `max_consequence_depth` forward hops. The result
/// is strictly chronological with distinct ids.
pub fn build_chain(
    conn: &Connection,
    anchor: Event,
    max_consequence_depth: usize,
) -> rusqlite::Result<Vec<Event>> {
    let mut visited: HashSet<i64> = HashSet::new();
    let mut chain = ascend(conn, anchor, &mut visited)?;
    let anchor_id = chain.last().map(|e| e.event_id);

    if let Some(anchor_id) = anchor_id {
        chain.extend(descend(conn, anchor_id, max_consequence_depth, &mut visited)?);
    }

    Ok(chain)
}

/// Walk `cause_id` links from the anchor to the root. Returns the collected
/// events in chronological order (root first, anchor last).
fn ascend(
    conn: &Connection,
    anchor: Event,
    visited: &mut HashSet<i64>,
) -> rusqlite::Result<Vec<Event>> {
    visited.insert(anchor.event_id);
    let mut chain = vec![anchor];

    loop {
        let (current_id, next_cause) = {
            let current = chain.last().expect("chain is never empty");
            (current.event_id, current.cause_id)
        };
        let Some(cause_id) = next_cause else {
            break; // root reached
        };

        if visited.contains(&cause_id) {
            tracing::error!(
                event_id = current_id,
                cause_id,
                "cycle detected in causal chain, truncating"
            );
            break;
        }

        match store::get_event(conn, cause_id)? {
            Some(cause) => {
                visited.insert(cause.event_id);
                chain.push(cause);
            }
            None => {
                tracing::warn!(
                    event_id = current_id,
                    cause_id,
                    "broken causal link, returning partial chain"
                );
                break;
            }
        }
    }

    chain.reverse();
    Ok(chain)
}

/// Extend forward from the anchor. Each hop takes the oldest child, matching
/// chronological order.
fn descend(
    conn: &Connection,
    anchor_id: i64,
    max_depth: usize,
    visited: &mut HashSet<i64>,
) -> rusqlite::Result<Vec<Event>> {
    let mut consequences = Vec::new();
    let mut current_id = anchor_id;

    for _ in 0..max_depth {
        let children = store::children_of(conn, current_id)?;
        let Some(child) = children.into_iter().next() else {
            break;
        };

        if visited.contains(&child.event_id) {
            tracing::error!(
                event_id = current_id,
                child_id = child.event_id,
                "cycle detected in consequence chain, truncating"
            );
            break;
        }

        visited.insert(child.event_id);
        current_id = child.event_id;
        consequences.push(child);
    }

    Ok(consequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::store::insert_event;
    use rusqlite::params;

    fn spike(dim: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        v[dim % 8] = 1.0;
        v
    }

    /// Insert a three-event chain 1 ← 2 ← 3 and return the connection.
    fn chained_db() -> Connection {
        let mut conn = db::open_memory_database().unwrap();
        let a = insert_event(&mut conn, "disk filled up", &spike(0), None, None).unwrap();
        let b = insert_event(
            &mut conn,
            "writes started failing",
            &spike(1),
            Some(a.event_id),
            Some("no space left"),
        )
        .unwrap();
        insert_event(
            &mut conn,
            "service was restarted",
            &spike(2),
            Some(b.event_id),
            Some("to clear the error"),
        )
        .unwrap();
        conn
    }

    #[test]
    fn anchor_is_most_similar_above_threshold() {
        let conn = chained_db();
        let anchor = find_anchor(&conn, &spike(1), 0.5).unwrap().unwrap();
        assert_eq!(anchor.effect_text, "writes started failing");
    }

    #[test]
    fn no_anchor_below_threshold() {
        let conn = chained_db();
        assert!(find_anchor(&conn, &spike(7), 0.5).unwrap().is_none());
    }

    #[test]
    fn no_anchor_on_empty_store() {
        let conn = db::open_memory_database().unwrap();
        assert!(find_anchor(&conn, &spike(0), 0.5).unwrap().is_none());
    }

    #[test]
    fn chain_ascends_to_root() {
        let conn = chained_db();
        let anchor = find_anchor(&conn, &spike(2), 0.5).unwrap().unwrap();
        let chain = build_chain(&conn, anchor, 0).unwrap();

        let ids: Vec<i64> = chain.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn chain_extends_forward_from_anchor() {
        let conn = chained_db();
        let anchor = find_anchor(&conn, &spike(0), 0.5).unwrap().unwrap();
        let chain = build_chain(&conn, anchor, 2).unwrap();

        let ids: Vec<i64> = chain.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn forward_extension_respects_depth_limit() {
        let conn = chained_db();
        let anchor = find_anchor(&conn, &spike(0), 0.5).unwrap().unwrap();
        let chain = build_chain(&conn, anchor, 1).unwrap();

        let ids: Vec<i64> = chain.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn forward_extension_picks_oldest_child() {
        let mut conn = db::open_memory_database().unwrap();
        let root = insert_event(&mut conn, "root", &spike(0), None, None).unwrap();
        let first = insert_event(&mut conn, "first child", &spike(1), Some(root.event_id), None)
            .unwrap();
        insert_event(&mut conn, "second child", &spike(2), Some(root.event_id), None).unwrap();

        let chain = build_chain(&conn, root, 1).unwrap();
        let ids: Vec<i64> = chain.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, first.event_id]);
    }

    #[test]
    fn broken_link_yields_partial_chain() {
        let conn = chained_db();
        // Point event 3's cause at a nonexistent row
        conn.execute("UPDATE events SET cause_id = 99 WHERE event_id = 3", [])
            .unwrap();

        let anchor = store::get_event(&conn, 3).unwrap().unwrap();
        let chain = build_chain(&conn, anchor, 0).unwrap();

        let ids: Vec<i64> = chain.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn cycle_is_detected_and_truncated() {
        let conn = chained_db();
        // Corrupt the root to close a 1 → 3 → 2 → 1 loop
        conn.execute(
            "UPDATE events SET cause_id = ?1 WHERE event_id = 1",
            params![3],
        )
        .unwrap();

        let anchor = store::get_event(&conn, 3).unwrap().unwrap();
        let chain = build_chain(&conn, anchor, 0).unwrap();

        let ids: Vec<i64> = chain.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn chain_ids_are_distinct_and_chronological() {
        let conn = chained_db();
        let anchor = find_anchor(&conn, &spike(1), 0.5).unwrap().unwrap();
        let chain = build_chain(&conn, anchor, 2).unwrap();

        let mut seen = HashSet::new();
        for pair in chain.windows(2) {
            assert!(pair[0].event_id < pair[1].event_id);
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        for event in &chain {
            assert!(seen.insert(event.event_id), "duplicate id in chain");
        }
    }
}
