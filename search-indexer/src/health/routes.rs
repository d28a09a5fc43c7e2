//! HTTP routes for the health surface and the search endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info};

use question_events::SearchQuery;
use search_indexer_repository::SearchIndexProvider;

use super::HealthRegistry;

lazy_static! {
    /// `[tag]` token inside a search query, used as an exact tag filter.
    static ref TAG_FILTER: Regex = Regex::new(r"\[(.*?)\]").unwrap();
}

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<HealthRegistry>,
    pub provider: Arc<dyn SearchIndexProvider>,
}

impl AppState {
    pub fn new(registry: Arc<HealthRegistry>, provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self { registry, provider }
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/alive", get(alive))
        .route("/health/ready", get(ready))
        .route("/health", get(health))
        .route("/api/search", get(search))
        .with_state(state)
}

/// Bind and serve the HTTP surface until shutdown.
///
/// A bind failure is logged and surfaces through missing health endpoints;
/// it does not bring down the ingest.
pub async fn serve(state: AppState, port: u16, mut shutdown: broadcast::Receiver<()>) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind health endpoint");
            return;
        }
    };

    info!(addr = %addr, "Health endpoint listening");

    let server = axum::serve(listener, router(state)).with_graceful_shutdown(async move {
        let _ = shutdown.recv().await;
    });

    if let Err(e) = server.await {
        error!(error = %e, "HTTP server error");
    }
}

/// GET /alive - liveness; no dependency checks.
async fn alive() -> impl IntoResponse {
    Json(json!({
        "status": "Alive",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/ready - readiness; "ready"-tagged checks only.
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.registry.run_tagged("ready").await;
    let status = if report.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

/// GET /health - full diagnostic view of all checks.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.registry.run_all().await;
    let status = if report.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = json!({
        "service": "search-indexer",
        "version": env!("CARGO_PKG_VERSION"),
        "status": report.status,
        "checks": report.checks,
    });
    (status, Json(body))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
    page: Option<usize>,
    #[serde(rename = "perPage")]
    per_page: Option<usize>,
}

/// Split a raw query into text and an optional `[tag]` filter.
fn split_tag_filter(raw: &str) -> (String, Option<String>) {
    match TAG_FILTER.captures(raw) {
        Some(captures) => {
            let tag = captures.get(1).map(|m| m.as_str().to_string());
            let text = TAG_FILTER.replace(raw, "").trim().to_string();
            (text, tag.filter(|t| !t.is_empty()))
        }
        None => (raw.trim().to_string(), None),
    }
}

/// GET /api/search?query=...&page=&perPage=
///
/// Use `[tag]` inside the query to filter by tag, e.g. `async [tokio]`.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let raw = match params.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Query parameter is required" })),
            )
                .into_response();
        }
    };

    let (text, tag) = split_tag_filter(&raw);

    let mut query = SearchQuery::new(text).paginate(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(10),
    );
    if let Some(tag) = tag {
        query = query.with_tag(tag);
    }

    info!(
        query = %query.query,
        tag = query.tag.as_deref().unwrap_or(""),
        page = query.page,
        "Searching questions"
    );

    match state.provider.search(&query).await {
        Ok(response) => {
            info!(found = response.total_found, "Search completed");
            Json(response).into_response()
        }
        Err(e) => {
            error!(query = %query.query, error = %e, "Search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Search failed", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
