//! End-to-end ingest scenarios: judge-driven linking, soft-link fallback,
//! batch resilience, and the append-only invariants.

mod helpers;

use std::sync::Arc;

use helpers::{
    build_memory, build_memory_arc, chain_vectors, BrokenEmbedder, DenyingJudge, FailingJudge,
    MappedEmbedder, PairJudge,
};
use sequitur::error::MemoryError;
use sequitur::memory::core::MemoryOptions;

const SAGA: [&str; 5] = [
    "A bug report was filed for 'User login fails with 500 error'",
    "The production server logs were inspected, revealing a NullPointerException",
    "The UserAuthentication service code was reviewed, identifying a missing null check",
    "A patch was written to add the necessary null check",
    "The patch was deployed to production and the bug was marked resolved",
];

fn saga_embedder() -> MappedEmbedder {
    let vectors = chain_vectors(5);
    let entries: Vec<(&str, Vec<f32>)> = SAGA
        .iter()
        .zip(vectors.iter())
        .map(|(text, v)| (*text, v.clone()))
        .collect();
    MappedEmbedder::new(&entries)
}

fn saga_judge() -> PairJudge {
    PairJudge::new(&[
        (SAGA[0], SAGA[1], "the report prompted a log investigation"),
        (SAGA[1], SAGA[2], "the stack trace pointed at the auth service"),
        (SAGA[2], SAGA[3], "the review identified the fix to write"),
        (SAGA[3], SAGA[4], "the patch was shipped to close the bug"),
    ])
}

#[test]
fn saga_links_each_event_to_its_predecessor() {
    let memory = build_memory(saga_embedder(), saga_judge());

    let mut ids = Vec::new();
    for text in SAGA {
        ids.push(memory.add_event(text).unwrap());
    }
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let stats = memory.stats().unwrap();
    assert_eq!(stats.total_events, 5);
    assert_eq!(stats.linked_events, 4);
    assert_eq!(stats.orphan_events, 1);
    assert!((stats.chain_coverage - 0.8).abs() < 1e-9);
}

#[test]
fn first_event_is_always_a_root() {
    let memory = build_memory(saga_embedder(), saga_judge());
    memory.add_event(SAGA[0]).unwrap();

    let stats = memory.stats().unwrap();
    assert_eq!(stats.total_events, 1);
    assert_eq!(stats.linked_events, 0);
}

#[test]
fn soft_link_chains_events_the_judge_rejects() {
    let texts = [
        "Fixed bug #1234: NPE in user authentication",
        "Added regression tests for authentication flow",
        "Deployed hotfix v1.2.3 to production",
    ];
    let vectors = chain_vectors(3);
    let entries: Vec<(&str, Vec<f32>)> = texts
        .iter()
        .zip(vectors.iter())
        .map(|(t, v)| (*t, v.clone()))
        .collect();

    let memory = build_memory(MappedEmbedder::new(&entries), DenyingJudge);
    for text in texts {
        memory.add_event(text).unwrap();
    }

    // All pairwise similarities are above the soft-link threshold, so the
    // later events chain even though the judge said no to every pair.
    let narrative = memory.query(texts[2]).unwrap();
    assert!(narrative.starts_with("Initially, Fixed bug #1234"));
    assert!(narrative
        .contains("(These events represent sequential steps in the same workflow.)"));

    let stats = memory.stats().unwrap();
    assert_eq!(stats.linked_events, 2);
}

#[test]
fn dissimilar_events_stay_roots_when_judge_denies() {
    // Orthogonal embeddings: no candidates clear the similarity threshold.
    let memory = build_memory(MappedEmbedder::empty(), DenyingJudge);
    memory.add_event("completely unrelated event one").unwrap();
    memory.add_event("some other disconnected happening").unwrap();

    let stats = memory.stats().unwrap();
    assert_eq!(stats.linked_events, 0);
    assert_eq!(stats.orphan_events, 2);
}

#[test]
fn batch_survives_judge_outage() {
    let vectors = chain_vectors(10);
    let texts: Vec<String> = (0..10).map(|i| format!("pipeline step {i} completed")).collect();
    let entries: Vec<(&str, Vec<f32>)> = texts
        .iter()
        .zip(vectors.iter())
        .map(|(t, v)| (t.as_str(), v.clone()))
        .collect();

    let memory = build_memory(MappedEmbedder::new(&entries), FailingJudge);
    let result = memory.add_events_batch(&texts);

    assert_eq!(result.total, 10);
    assert_eq!(result.successful, 10);
    assert_eq!(result.failed, 0);
    assert!(result.errors.is_empty());
    assert_eq!(memory.stats().unwrap().total_events, 10);
}

#[test]
fn batch_collects_per_item_failures_without_aborting() {
    let memory = build_memory(MappedEmbedder::empty(), DenyingJudge);
    let texts = vec![
        "a valid event".to_string(),
        "   ".to_string(),
        "another valid event".to_string(),
        "x".repeat(10_001),
    ];

    let result = memory.add_events_batch(&texts);

    assert_eq!(result.total, 4);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 2);
    let failed_indexes: Vec<usize> = result.errors.iter().map(|e| e.index).collect();
    assert_eq!(failed_indexes, vec![1, 3]);
    assert_eq!(memory.stats().unwrap().total_events, 2);
}

#[test]
fn embedder_outage_fails_ingest_as_service_unavailable() {
    let memory = build_memory(BrokenEmbedder, DenyingJudge);
    assert!(matches!(
        memory.add_event("anything"),
        Err(MemoryError::ServiceUnavailable(_))
    ));
    assert_eq!(memory.stats().unwrap().total_events, 0);
}

#[test]
fn cause_ids_always_point_backward() {
    let memory = build_memory(saga_embedder(), saga_judge());
    for text in SAGA {
        memory.add_event(text).unwrap();
    }

    let narrative = memory.query(SAGA[4]).unwrap();
    // Chronological narrative implies ids ran 1..5 with backward causes
    assert!(narrative.starts_with("Initially, A bug report was filed"));
    for text in &SAGA[1..] {
        assert!(narrative.contains(text), "missing: {text}");
    }
}

#[test]
fn id_sequence_is_deterministic_for_fixed_collaborators() {
    let run = || {
        let memory = build_memory(saga_embedder(), saga_judge());
        SAGA.iter()
            .map(|t| memory.add_event(t).unwrap())
            .collect::<Vec<i64>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn ingest_uses_the_embedding_cache_for_repeated_text() {
    let embedder = Arc::new(saga_embedder());
    let memory = build_memory_arc(
        embedder.clone(),
        Arc::new(DenyingJudge),
        MemoryOptions::default(),
    );

    memory.add_event(SAGA[0]).unwrap();
    let after_first = embedder.call_count();
    // Query with the same text: the vector must come from the cache.
    memory.query(SAGA[0]).unwrap();
    assert_eq!(embedder.call_count(), after_first);
}
