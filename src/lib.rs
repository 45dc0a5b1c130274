//! Causal event memory for AI agents and services — durable, queryable,
//! narrative.
//!
//! Sequitur records short natural-language events, automatically links each
//! new event to its most plausible cause, and answers queries with a
//! chronological narrative of the causal chain around the best-matching
//! event.
//!
//! # Architecture
//!
//! - **Storage**: SQLite, a single append-only `events` table with a
//!   self-referential causal edge. Similarity search is an exact cosine scan
//!   computed by the engine.
//! - **Embeddings**: Local ONNX Runtime with all-MiniLM-L6-v2
//!   (384 dimensions), fronted by a bounded LRU cache.
//! - **Causality**: An OpenAI-compatible chat model judges candidate cause
//!   pairs; a similarity-based soft link keeps dry log sequences chained when
//!   the judge declines or is unreachable.
//! - **Transports**: REST/JSON (axum) and the MCP tool protocol over stdio
//!   or HTTP/SSE, both over one shared engine instance.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, migrations, and health checks
//! - [`embedding`] — Text-to-vector pipeline and the embedding cache
//! - [`judge`] — The causality judgement capability
//! - [`memory`] — Core engine: store, candidate search, linking, traversal, narration
//! - [`api`] — REST/JSON surface
//! - [`server`] / [`tools`] — Tool-protocol server (stdio and SSE)

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod judge;
pub mod memory;
pub mod server;
pub mod tools;
