//! REST/JSON surface over the memory engine.
//!
//! Endpoints: `GET /` (service banner), `GET /health`, `POST /events`,
//! `POST /query`, `GET /stats`. Authentication is an optional shared
//! `x-api-key`; ingest and query carry independent per-IP rate limits. The
//! engine is synchronous, so handlers run it on the blocking pool.

pub mod error;
pub mod rate_limit;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::SequiturConfig;
use crate::memory::core::CausalMemory;
use error::ApiError;
use rate_limit::{IpRateLimiter, RouteClass};

const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub memory: Arc<CausalMemory>,
    pub limiter: Arc<IpRateLimiter>,
    pub api_key: Option<String>,
}

// ── Request / response bodies ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddEventRequest {
    pub effect_text: String,
}

#[derive(Debug, Serialize)]
pub struct AddEventResponse {
    pub event_id: i64,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub narrative: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database_connected: bool,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the REST router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/events", post(add_event))
        .route("/query", post(query))
        .route("/stats", get(stats))
        .with_state(state)
}

/// Build the CORS layer from the comma-separated origin list.
pub fn build_cors_layer(cors_origins: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-api-key"),
        ]);

    if cors_origins.trim() == "*" || cors_origins.trim().is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Run the REST server until ctrl-c.
pub async fn run_api(config: SequiturConfig) -> Result<()> {
    let port = config.server.port.unwrap_or(8000);
    let bind_addr = format!("{}:{}", config.server.host, port);

    let memory = crate::server::setup_memory(&config)?;
    let state = AppState {
        memory: memory.clone(),
        limiter: Arc::new(IpRateLimiter::new(
            config.api.rate_limit_events_per_min,
            config.api.rate_limit_query_per_min,
        )),
        api_key: config.api.api_key.clone(),
    };

    let app = router(state).layer(build_cors_layer(&config.api.cors_origins));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
        tracing::info!("shutting down REST API");
    })
    .await?;

    memory.close();
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Sequitur",
        "version": API_VERSION,
        "description": "Causal event memory service",
        "endpoints": {
            "health": "/health",
            "add_event": "/events (POST)",
            "query": "/query (POST)",
            "stats": "/stats"
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let memory = state.memory.clone();
    let connected = tokio::task::spawn_blocking(move || memory.store_reachable())
        .await
        .unwrap_or(false);

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            status: if connected { "healthy" } else { "unhealthy" },
            version: API_VERSION,
            database_connected: connected,
        }),
    )
}

async fn add_event(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<AddEventRequest>,
) -> Result<Json<AddEventResponse>, ApiError> {
    check_api_key(&state, &headers)?;
    check_rate_limit(&state, &headers, addr, RouteClass::Ingest)?;

    let memory = state.memory.clone();
    let event_id = tokio::task::spawn_blocking(move || memory.add_event(&request.effect_text))
        .await
        .map_err(|e| ApiError::internal(format!("ingest task failed: {e}")))??;

    Ok(Json(AddEventResponse {
        event_id,
        success: true,
    }))
}

async fn query(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    check_api_key(&state, &headers)?;
    check_rate_limit(&state, &headers, addr, RouteClass::Query)?;

    let memory = state.memory.clone();
    let narrative = tokio::task::spawn_blocking(move || memory.query(&request.query))
        .await
        .map_err(|e| ApiError::internal(format!("query task failed: {e}")))??;

    Ok(Json(QueryResponse {
        narrative,
        success: true,
    }))
}

async fn stats(
    State(state): State<AppState>,
) -> Result<Json<crate::memory::store::StoreStats>, ApiError> {
    let memory = state.memory.clone();
    let stats = tokio::task::spawn_blocking(move || memory.stats())
        .await
        .map_err(|e| ApiError::internal(format!("stats task failed: {e}")))??;
    Ok(Json(stats))
}

// ── Request plumbing ──────────────────────────────────────────────────────────

fn check_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(());
    };
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        return Err(ApiError::unauthorized());
    }
    Ok(())
}

fn check_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    addr: SocketAddr,
    class: RouteClass,
) -> Result<(), ApiError> {
    let ip = client_ip(headers, addr);
    state
        .limiter
        .check(ip, class)
        .map_err(ApiError::rate_limited)
}

/// Resolve the client IP, honouring proxy headers before the socket address.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> IpAddr {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse() {
                return ip;
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if let Ok(ip) = real_ip.trim().parse() {
            return ip;
        }
    }
    addr.ip()
}
