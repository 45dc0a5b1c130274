//! Tool-protocol server initialization for stdio and SSE transports.
//!
//! [`serve`] picks the transport: a configured port selects HTTP/SSE,
//! otherwise the server speaks over stdio. Both wire the database, embedding
//! provider, and judge into one shared [`CausalMemory`] instance.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;

use crate::config::SequiturConfig;
use crate::memory::core::{CausalMemory, MemoryOptions};
use crate::tools::MemoryTools;
use crate::{db, embedding, judge};

/// Shared setup: open the store, create the embedder and judge, and build
/// the memory engine.
pub fn setup_memory(config: &SequiturConfig) -> Result<Arc<CausalMemory>> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    // Warn on embedding model mismatch: stored vectors would not be
    // comparable to fresh ones.
    if let Ok(Some(stored_model)) = db::migrations::stored_embedding_model(&conn) {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed — existing vectors were built with a different model"
            );
        }
    }

    let embedder = embedding::create_provider(&config.embedding)?;
    tracing::info!("embedding provider ready");

    let judge = judge::create_judge(&config.judge)?;
    tracing::info!(model = %config.judge.model, "causality judge ready");

    Ok(Arc::new(CausalMemory::new(
        conn,
        embedder,
        judge,
        MemoryOptions::from(config),
    )))
}

/// Start the tool server, selecting the transport from config.
pub async fn serve(config: SequiturConfig) -> Result<()> {
    match config.server.port {
        Some(_) => serve_sse(config).await,
        None => serve_stdio(config).await,
    }
}

/// Start the tool server over stdio transport.
pub async fn serve_stdio(config: SequiturConfig) -> Result<()> {
    tracing::info!("starting tool server on stdio");

    let memory = setup_memory(&config)?;

    let tools = MemoryTools::new(memory.clone());
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("tool server running — waiting for client");

    server.waiting().await?;
    memory.close();
    tracing::info!("tool server shut down");

    Ok(())
}

/// Start the tool server over HTTP/SSE, binding `GET /` (liveness banner),
/// `GET /sse`, and `POST /messages`.
pub async fn serve_sse(config: SequiturConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port.context("SSE transport requires a port")?;
    let bind_addr: std::net::SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid bind address")?;

    tracing::info!(addr = %bind_addr, "starting tool server on SSE/HTTP");

    let memory = setup_memory(&config)?;

    let (sse_server, router) = SseServer::new(SseServerConfig {
        bind: bind_addr,
        sse_path: "/sse".to_string(),
        post_path: "/messages".to_string(),
        ct: CancellationToken::new(),
        sse_keep_alive: None,
    });

    let router = router.route("/", axum::routing::get(liveness));

    let memory_for_tools = memory.clone();
    let ct = sse_server.with_service(move || MemoryTools::new(memory_for_tools.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "tool server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down SSE server");
            ct.cancel();
        })
        .await?;

    memory.close();
    Ok(())
}

async fn liveness() -> &'static str {
    "Sequitur causal memory tool server. Connect via GET /sse, post messages to /messages."
}
