//! Text-to-vector embedding.
//!
//! The engine treats embedding as a capability: anything that turns a string
//! into an L2-normalized vector of [`EMBEDDING_DIM`] floats. Production runs
//! all-MiniLM-L6-v2 locally through ONNX Runtime ([`local`]); tests
//! substitute deterministic stand-ins at construction. Repeated texts are
//! served from the bounded LRU in [`cache`] instead of the model.

pub mod cache;
pub mod local;

use std::sync::Arc;

use anyhow::Result;

/// Width of every stored embedding (the all-MiniLM-L6-v2 output size).
pub const EMBEDDING_DIM: usize = 384;

/// A synchronous text → vector capability.
///
/// Calls may block on model inference or network I/O; async callers route
/// through `tokio::task::spawn_blocking`. Vectors come back L2-normalized,
/// so cosine similarity over them reduces to a dot product.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector width this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Resolve the configured provider.
///
/// `"local"` is the only supported value today; the indirection exists so a
/// deployment can point at a remote embedding service without the engine
/// noticing.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(local::OnnxEmbedder::new(config)?)),
        other => anyhow::bail!(
            "embedding provider {other:?} is not supported; set embedding.provider to \"local\""
        ),
    }
}
