//! The memory facade — public ingest and query operations.
//!
//! [`CausalMemory`] owns the store handle, the embedding cache, and the two
//! external capabilities (embedder, judge). All operations are synchronous
//! and thread-safe; transports run them on the blocking pool.
//!
//! Lock discipline on ingest: candidates are read under the store lock, the
//! judge runs outside it, and the insert re-acquires it. Under concurrent
//! writers the link target is whichever candidate set was visible at read
//! time — causal linking is best-effort, not a correctness property.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use serde::Serialize;

use crate::config::{LinkingConfig, SequiturConfig, TraversalConfig};
use crate::embedding::cache::EmbeddingCache;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;
use crate::judge::CausalityJudge;
use crate::memory::store::StoreStats;
use crate::memory::{causes, chain, linker, narrative, store};

/// Maximum accepted length (in characters) of an event text.
pub const MAX_EFFECT_TEXT_LEN: usize = 10_000;
/// Maximum accepted length (in characters) of a query.
pub const MAX_QUERY_LEN: usize = 1_000;

/// Canonical reply when no event reaches the anchor threshold.
pub const NO_CONTEXT_MESSAGE: &str = "No relevant context found in memory.";

/// How often batch ingest reports progress.
const BATCH_PROGRESS_INTERVAL: usize = 100;

/// Engine knobs, detached from the full service config so tests can build
/// isolated instances.
#[derive(Debug, Clone)]
pub struct MemoryOptions {
    pub linking: LinkingConfig,
    pub traversal: TraversalConfig,
    pub embedding_cache_size: usize,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            linking: LinkingConfig::default(),
            traversal: TraversalConfig::default(),
            embedding_cache_size: 1000,
        }
    }
}

impl From<&SequiturConfig> for MemoryOptions {
    fn from(config: &SequiturConfig) -> Self {
        Self {
            linking: config.linking.clone(),
            traversal: config.traversal.clone(),
            embedding_cache_size: config.embedding.cache_size,
        }
    }
}

/// Per-item failure inside a batch ingest.
#[derive(Debug, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub error: String,
}

/// Outcome of [`CausalMemory::add_events_batch`].
#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
}

/// The causal memory engine.
pub struct CausalMemory {
    conn: Arc<Mutex<Connection>>,
    cache: Mutex<EmbeddingCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    judge: Arc<dyn CausalityJudge>,
    options: MemoryOptions,
}

impl CausalMemory {
    pub fn new(
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
        judge: Arc<dyn CausalityJudge>,
        options: MemoryOptions,
    ) -> Self {
        let cache = EmbeddingCache::new(options.embedding_cache_size);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: Mutex::new(cache),
            embedder,
            judge,
            options,
        }
    }

    /// Record a new event. Returns its assigned id.
    ///
    /// Judge failures are absorbed (the event still lands as a root or
    /// soft-linked); embedder failures abort with `ServiceUnavailable`.
    pub fn add_event(&self, effect_text: &str) -> Result<i64, MemoryError> {
        validate_text(effect_text, MAX_EFFECT_TEXT_LEN, "effect_text")?;

        let embedding = self.embed(effect_text)?;

        let candidates = {
            let conn = self.lock_conn()?;
            causes::find_potential_causes(&conn, &embedding, effect_text, &self.options.linking)?
        };

        // Judge outside the store lock: it may block for seconds.
        let decision = linker::link_cause(
            self.judge.as_ref(),
            &candidates,
            effect_text,
            self.options.linking.soft_link_threshold,
        );

        let event = {
            let mut conn = self.lock_conn()?;
            store::insert_event(
                &mut conn,
                effect_text,
                &embedding,
                decision.cause_id,
                decision.relationship.as_deref(),
            )?
        };

        tracing::info!(
            event_id = event.event_id,
            cause_id = ?event.cause_id,
            "event recorded"
        );
        Ok(event.event_id)
    }

    /// Ingest a batch of texts one at a time. Per-item failures are collected,
    /// never raised; memory use stays O(1) over the batch length.
    pub fn add_events_batch(&self, texts: &[String]) -> BatchResult {
        let total = texts.len();
        let mut successful = 0;
        let mut errors = Vec::new();

        for (index, text) in texts.iter().enumerate() {
            match self.add_event(text) {
                Ok(_) => successful += 1,
                Err(e) => {
                    tracing::warn!(index, error = %e, "batch item failed");
                    errors.push(BatchItemError {
                        index,
                        error: e.to_string(),
                    });
                }
            }
            let processed = index + 1;
            if processed % BATCH_PROGRESS_INTERVAL == 0 {
                tracing::info!(processed, total, "batch ingest progress");
            }
        }

        BatchResult {
            total,
            successful,
            failed: errors.len(),
            errors,
        }
    }

    /// Retrieve the causal narrative most relevant to the query.
    pub fn query(&self, query_text: &str) -> Result<String, MemoryError> {
        validate_text(query_text, MAX_QUERY_LEN, "query")?;

        let query_embedding = self.embed(query_text)?;

        let conn = self.lock_conn()?;
        let Some(anchor) = chain::find_anchor(
            &conn,
            &query_embedding,
            self.options.linking.similarity_threshold,
        )?
        else {
            return Ok(NO_CONTEXT_MESSAGE.to_string());
        };

        let chain = chain::build_chain(&conn, anchor, self.options.traversal.max_consequence_depth)?;
        Ok(narrative::format_narrative(&chain))
    }

    /// Backward-compatible alias for [`query`](Self::query).
    pub fn get_context(&self, query_text: &str) -> Result<String, MemoryError> {
        self.query(query_text)
    }

    /// Aggregate linkage statistics.
    pub fn stats(&self) -> Result<StoreStats, MemoryError> {
        let conn = self.lock_conn()?;
        Ok(store::event_stats(&conn)?)
    }

    /// `true` when the store answers a trivial query.
    pub fn store_reachable(&self) -> bool {
        self.stats().is_ok()
    }

    /// Flush the write-ahead log. Safe to call repeatedly.
    pub fn close(&self) {
        if let Ok(conn) = self.lock_conn() {
            let result: rusqlite::Result<()> =
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()));
            if let Err(e) = result {
                tracing::debug!(error = %e, "wal checkpoint skipped");
            }
        }
        tracing::info!("memory engine closed");
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| MemoryError::Internal(format!("embedding cache lock poisoned: {e}")))?;
        cache
            .get_or_compute(text, self.embedder.as_ref())
            .map_err(|e| MemoryError::ServiceUnavailable(e.to_string()))
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.conn
            .lock()
            .map_err(|e| MemoryError::Internal(format!("store lock poisoned: {e}")))
    }
}

fn validate_text(text: &str, max_len: usize, field: &str) -> Result<(), MemoryError> {
    if text.trim().is_empty() {
        return Err(MemoryError::Validation(format!(
            "{field} cannot be empty or contain only whitespace"
        )));
    }
    let len = text.chars().count();
    if len > max_len {
        return Err(MemoryError::Validation(format!(
            "{field} exceeds the maximum length of {max_len} characters (got {len})"
        )));
    }
    Ok(())
}
