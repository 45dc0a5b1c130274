//! Core event type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded observation, matching the `events` table schema.
///
/// Events are append-only: once inserted they are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing, process-assigned, dense identifier.
    pub event_id: i64,
    /// UTC instant of insertion.
    pub timestamp: DateTime<Utc>,
    /// The recorded observation text. Never empty or whitespace-only.
    pub effect_text: String,
    /// Fixed-length embedding vector produced at insertion.
    pub embedding: Vec<f32>,
    /// The direct cause, if one was detected. `None` marks a root event.
    pub cause_id: Option<i64>,
    /// Short natural-language phrase describing why cause → effect.
    pub causal_relationship: Option<String>,
}

impl Event {
    /// `true` when this event has no recorded cause.
    pub fn is_root(&self) -> bool {
        self.cause_id.is_none()
    }
}
