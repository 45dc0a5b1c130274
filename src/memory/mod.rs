//! Core memory engine — event storage, causal linking, chain traversal, and
//! narrative assembly.
//!
//! The write path runs through [`causes`] (candidate search) and [`linker`]
//! (causality judgement) into [`store`]. The read path runs through [`chain`]
//! (anchor search and traversal) into [`narrative`]. The facade in
//! [`core::CausalMemory`] wires both. Type definitions live in [`types`].

pub mod causes;
pub mod chain;
pub mod core;
pub mod linker;
pub mod narrative;
pub mod store;
pub mod types;

/// Cosine similarity between two vectors. Returns 0.0 when either norm is
/// zero or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Serialize an embedding as little-endian f32 bytes for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for v in embedding {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Deserialize an embedding from little-endian f32 bytes.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
