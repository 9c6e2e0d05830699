use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
};
use catalog_search::{MatchResult, parse_search_request};
use tracing::{debug, error, info};

use crate::{
    error_handler::{AppError, AppResult},
    middleware_layer::request_id::request_id_of,
    routes::search::search_payload::read_search_payload,
    state::app_state::AppState,
};

/// `POST /search`: match every invoice line against the catalog.
///
/// The payload is validated before any search or embedding call. Items are
/// processed on a separate task so an unexpected failure surfaces as a 500
/// without partial results.
pub async fn search_route(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> AppResult<Json<Vec<MatchResult>>> {
    let request_id = request_id_of(req.headers()).to_string();

    let payload = read_search_payload(req).await?;
    let items = parse_search_request(&payload)?;
    debug!(
        target: "api::search",
        request_id = %request_id,
        items = items.len(),
        "search_route: start"
    );

    let matcher = Arc::clone(&state.matcher);
    let results = tokio::spawn(async move { matcher.match_items(&items).await })
        .await
        .map_err(|err| {
            error!(
                target: "api::search",
                request_id = %request_id,
                error = %err,
                "search_route: batch task failed"
            );
            AppError::Internal(format!("Error processing file: {err}"))
        })?;

    info!(
        target: "api::search",
        request_id = %request_id,
        results = results.len(),
        "search_route: done"
    );
    Ok(Json(results))
}
