//! Candidate search for the ingest path.
//!
//! Given a new event's embedding, rank recent events by cosine similarity and
//! return those plausible as the direct cause. The pool is bounded by the
//! configured time window and a fixed row cap; scoring is an exact scan.

use rusqlite::Connection;

use crate::config::LinkingConfig;
use crate::memory::types::Event;
use crate::memory::{cosine_similarity, store};

/// Upper bound on rows pulled from the store per candidate search.
const CANDIDATE_POOL_LIMIT: usize = 50;

/// A prior event considered as a potential cause, with its similarity to the
/// incoming event.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub similarity: f32,
    pub event: Event,
}

/// Return up to `max_potential_causes` prior events that might be the direct
/// cause of an event with the given embedding, ordered by similarity
/// descending. Ties prefer the more recent event, then the lower id.
pub fn find_potential_causes(
    conn: &Connection,
    effect_embedding: &[f32],
    effect_text: &str,
    config: &LinkingConfig,
) -> rusqlite::Result<Vec<Candidate>> {
    let pool = store::recent_events(conn, config.time_decay_hours, CANDIDATE_POOL_LIMIT)?;

    let mut candidates: Vec<Candidate> = pool
        .into_iter()
        .filter(|event| event.effect_text != effect_text)
        .filter_map(|event| {
            if event.embedding.len() != effect_embedding.len() {
                return None;
            }
            let similarity = cosine_similarity(effect_embedding, &event.embedding);
            tracing::debug!(
                event_id = event.event_id,
                similarity,
                threshold = config.similarity_threshold,
                "candidate scored"
            );
            (similarity >= config.similarity_threshold).then_some(Candidate { similarity, event })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.event.timestamp.cmp(&a.event.timestamp))
            .then_with(|| a.event.event_id.cmp(&b.event.event_id))
    });
    candidates.truncate(config.max_potential_causes);

    Ok(candidates)
}
