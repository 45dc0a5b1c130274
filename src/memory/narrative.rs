//! Narrative assembly — rendering an ordered chain as prose.
//!
//! The narrator trusts its input: the traverser already ordered and
//! deduplicated the chain. Connectors alternate to avoid monotony.

use crate::memory::types::Event;

/// Render a chronologically ordered chain as a single narrative string.
pub fn format_narrative(chain: &[Event]) -> String {
    let Some(first) = chain.first() else {
        return "No causal chain found.".to_string();
    };

    let mut narrative = format!("Initially, {}.", first.effect_text);

    for (i, event) in chain.iter().enumerate().skip(1) {
        let connector = if i % 2 == 1 {
            "This led to"
        } else {
            "which in turn caused"
        };
        let relationship = event
            .causal_relationship
            .as_ref()
            .map(|r| format!(" ({r})"))
            .unwrap_or_default();
        narrative.push_str(&format!(
            " {connector} {}{relationship}.",
            event.effect_text
        ));
    }

    narrative
}
