use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::warn;

use crate::state::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether Typesense answered its health check.
    pub search_engine: bool,
}

/// `GET /health`: always 200; reports search-engine reachability.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let search_engine = match state.matcher.backend().health().await {
        Ok(ok) => ok,
        Err(err) => {
            warn!(target: "api::health", error = %err, "search engine health check failed");
            false
        }
    };
    Json(HealthResponse {
        status: "ok",
        search_engine,
    })
}
