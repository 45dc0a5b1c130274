//! Bounded LRU cache over text → embedding.
//!
//! A pure latency optimization with no correctness role: the cache is
//! process-local and lost on restart. Both the ingest and query paths consult
//! it, so repeated texts skip the embedding model entirely.

use linked_hash_map::LinkedHashMap;

use super::EmbeddingProvider;
use anyhow::Result;

/// LRU map from input text to its embedding. Insertion order doubles as
/// recency order: a hit re-inserts at the back, eviction pops the front.
pub struct EmbeddingCache {
    entries: LinkedHashMap<String, Vec<f32>>,
    capacity: usize,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LinkedHashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Return the cached embedding for `text`, computing and storing it via
    /// the provider on a miss. A hit promotes the entry to most recent.
    pub fn get_or_compute(
        &mut self,
        text: &str,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Vec<f32>> {
        if let Some(embedding) = self.entries.get_refresh(text) {
            tracing::debug!(len = text.len(), "embedding cache hit");
            return Ok(embedding.clone());
        }

        tracing::debug!(len = text.len(), "embedding cache miss");
        let embedding = provider.embed(text)?;

        self.entries.insert(text.to_string(), embedding.clone());
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }

        Ok(embedding)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts invocations and returns a length-derived vector.
    struct Counting {
        calls: AtomicUsize,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingProvider for Counting {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[test]
    fn hit_skips_the_provider() {
        let provider = Counting::new();
        let mut cache = EmbeddingCache::new(10);

        let first = cache.get_or_compute("hello", &provider).unwrap();
        let second = cache.get_or_compute("hello", &provider).unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let provider = Counting::new();
        let mut cache = EmbeddingCache::new(2);

        cache.get_or_compute("a", &provider).unwrap();
        cache.get_or_compute("b", &provider).unwrap();
        cache.get_or_compute("c", &provider).unwrap(); // evicts "a"
        assert_eq!(cache.len(), 2);

        cache.get_or_compute("a", &provider).unwrap(); // recompute
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn hit_refreshes_recency() {
        let provider = Counting::new();
        let mut cache = EmbeddingCache::new(2);

        cache.get_or_compute("a", &provider).unwrap();
        cache.get_or_compute("b", &provider).unwrap();
        cache.get_or_compute("a", &provider).unwrap(); // "a" is now MRU
        cache.get_or_compute("c", &provider).unwrap(); // evicts "b", not "a"

        cache.get_or_compute("a", &provider).unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn provider_error_is_not_cached() {
        struct Flaky {
            calls: AtomicUsize,
        }
        impl EmbeddingProvider for Flaky {
            fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("transient failure")
                }
                Ok(vec![1.0])
            }
        }

        let provider = Flaky {
            calls: AtomicUsize::new(0),
        };
        let mut cache = EmbeddingCache::new(10);

        assert!(cache.get_or_compute("x", &provider).is_err());
        assert!(cache.is_empty());
        assert!(cache.get_or_compute("x", &provider).is_ok());
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let provider = Counting::new();
        let mut cache = EmbeddingCache::new(0);
        cache.get_or_compute("a", &provider).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
