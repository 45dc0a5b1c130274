#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sequitur::db;
use sequitur::embedding::EmbeddingProvider;
use sequitur::judge::CausalityJudge;
use sequitur::memory::core::{CausalMemory, MemoryOptions};

pub const DIM: usize = 384;

/// Deterministic embedding with a spike at position `seed`. Distinct seeds
/// produce orthogonal vectors.
pub fn spike(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[seed % DIM] = 1.0;
    v
}

/// Build `n` cumulative vectors along a shared dominant axis. Every pair has
/// high cosine similarity, and each vector is most similar to its immediate
/// predecessor — the shape of a workflow unfolding step by step.
pub fn chain_vectors(n: usize) -> Vec<Vec<f32>> {
    let mut vectors = Vec::with_capacity(n);
    let mut accum = vec![0.0f32; DIM];
    accum[0] = 1.0;
    for i in 0..n {
        if i > 0 {
            accum[i] += 0.3;
        }
        let norm: f32 = accum.iter().map(|x| x * x).sum::<f32>().sqrt();
        vectors.push(accum.iter().map(|x| x / norm).collect());
    }
    vectors
}

/// Embedder backed by an explicit text → vector table, falling back to a
/// deterministic hash spike for unmapped text.
pub struct MappedEmbedder {
    map: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
}

impl MappedEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            map: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for MappedEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(v) = self.map.get(text) {
            return Ok(v.clone());
        }
        let mut hash: usize = 17;
        for b in text.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(b as usize);
        }
        Ok(spike(hash))
    }
}

/// Embedder that always fails, for outage scenarios.
pub struct BrokenEmbedder;

impl EmbeddingProvider for BrokenEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("embedding model unreachable")
    }
}

/// Judge that denies every pair.
pub struct DenyingJudge;

impl CausalityJudge for DenyingJudge {
    fn judge(&self, _cause: &str, _effect: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Judge that errors on every call, simulating an unreachable endpoint.
pub struct FailingJudge;

impl CausalityJudge for FailingJudge {
    fn judge(&self, _cause: &str, _effect: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("judge endpoint unreachable")
    }
}

/// Judge that affirms exactly the configured (cause, effect) pairs.
pub struct PairJudge {
    pairs: HashMap<(String, String), String>,
}

impl PairJudge {
    pub fn new(pairs: &[(&str, &str, &str)]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|(cause, effect, phrase)| {
                    ((cause.to_string(), effect.to_string()), phrase.to_string())
                })
                .collect(),
        }
    }
}

impl CausalityJudge for PairJudge {
    fn judge(&self, cause: &str, effect: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .pairs
            .get(&(cause.to_string(), effect.to_string()))
            .cloned())
    }
}

/// Build an isolated engine over a fresh in-memory store.
pub fn build_memory(
    embedder: impl EmbeddingProvider + 'static,
    judge: impl CausalityJudge + 'static,
) -> CausalMemory {
    build_memory_arc(Arc::new(embedder), Arc::new(judge), MemoryOptions::default())
}

/// Arc-taking variant for tests that keep a handle on the collaborator
/// (call counting, scripted responses).
pub fn build_memory_arc(
    embedder: Arc<dyn EmbeddingProvider>,
    judge: Arc<dyn CausalityJudge>,
    options: MemoryOptions,
) -> CausalMemory {
    CausalMemory::new(db::open_memory_database().unwrap(), embedder, judge, options)
}
