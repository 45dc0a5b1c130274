//! Causal linking — deciding which candidate, if any, caused a new event.
//!
//! Candidates are judged in similarity order; the first affirmative wins. A
//! judge that errors or times out counts as "no link" for that candidate —
//! ingest must never fail because the judge is down. When no candidate is
//! affirmed but the top candidate is nearly identical, a soft link keeps dry
//! system-log sequences chained.

use crate::judge::CausalityJudge;
use crate::memory::causes::Candidate;

/// Relationship phrase recorded for soft links. Stored without surrounding
/// parentheses; the narrator adds them when rendering.
pub const SOFT_LINK_RELATIONSHIP: &str =
    "These events represent sequential steps in the same workflow.";

/// Outcome of causal linking for a new event.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDecision {
    pub cause_id: Option<i64>,
    pub relationship: Option<String>,
}

impl LinkDecision {
    fn root() -> Self {
        Self {
            cause_id: None,
            relationship: None,
        }
    }
}

/// Judge the ordered candidates and pick the cause of `effect_text`.
pub fn link_cause(
    judge: &dyn CausalityJudge,
    candidates: &[Candidate],
    effect_text: &str,
    soft_link_threshold: f32,
) -> LinkDecision {
    for candidate in candidates {
        match judge.judge(&candidate.event.effect_text, effect_text) {
            Ok(Some(phrase)) => {
                tracing::debug!(
                    cause_id = candidate.event.event_id,
                    relationship = %phrase,
                    "causal link affirmed"
                );
                return LinkDecision {
                    cause_id: Some(candidate.event.event_id),
                    relationship: Some(phrase),
                };
            }
            Ok(None) => {
                tracing::debug!(cause_id = candidate.event.event_id, "causal link rejected");
            }
            Err(e) => {
                // Treated the same as a rejection: judging is best-effort.
                tracing::warn!(
                    cause_id = candidate.event.event_id,
                    error = %e,
                    "causality judge failed, treating as no link"
                );
            }
        }
    }

    // Soft-link fallback: very high similarity to the top candidate chains
    // the events even without the judge's blessing.
    if let Some(top) = candidates.first() {
        if top.similarity >= soft_link_threshold {
            tracing::debug!(
                cause_id = top.event.event_id,
                similarity = top.similarity,
                "soft link attached"
            );
            return LinkDecision {
                cause_id: Some(top.event.event_id),
                relationship: Some(SOFT_LINK_RELATIONSHIP.to_string()),
            };
        }
    }

    LinkDecision::root()
}
