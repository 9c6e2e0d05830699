use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use catalog_search::DocumentEmbedding;
use tracing::warn;

use crate::{
    error_handler::{AppError, AppResult},
    state::app_state::AppState,
};

/// `GET /debug-embedding/{doc_id}`: stored name and vector of one product.
pub async fn debug_embedding_route(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> AppResult<Json<DocumentEmbedding>> {
    match state.matcher.document_embedding(&doc_id).await {
        Ok(doc) => Ok(Json(doc)),
        Err(err) => {
            warn!(
                target: "api::debug",
                doc_id = %doc_id,
                error = %err,
                "debug_embedding_route: lookup failed"
            );
            Err(AppError::NotFound(format!(
                "Failed to retrieve document: {err}"
            )))
        }
    }
}
