use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::{
    error_handler::{AppError, AppResult},
    middleware_layer::request_id::request_id_of,
    routes::json_payload::{is_empty_payload, parse_json_body},
    state::app_state::AppState,
};

/// `POST /save-mapping`: persist the operator's confirmed mappings verbatim.
pub async fn save_mapping_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let request_id = request_id_of(&headers);

    let mappings = match parse_json_body(&body) {
        Ok(Some(value)) if !is_empty_payload(&value) => value,
        Ok(_) => return Err(AppError::BadRequest("No mappings provided".into())),
        Err(err) => return Err(AppError::BadRequest(format!("Invalid JSON body: {err}"))),
    };

    debug!(
        target: "api::mapping",
        request_id = %request_id,
        path = %state.mappings.path().display(),
        "save_mapping_route: start"
    );

    state.mappings.save(&mappings).await.map_err(|err| {
        error!(
            target: "api::mapping",
            request_id = %request_id,
            error = %err,
            "save_mapping_route: write failed"
        );
        AppError::Internal(format!("Failed to save mappings: {err}"))
    })?;

    Ok(Json(json!({"message": "Mappings saved successfully"})))
}
