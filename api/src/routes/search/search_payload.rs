//! Input adapter for `/search`: a multipart `file` upload or a raw JSON body.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::Value;
use tracing::debug;

use crate::error_handler::{AppError, AppResult};
use crate::routes::json_payload::{is_empty_payload, parse_json_body};

const NO_DATA: &str = "No JSON data provided";

/// Extract the extraction document from either accepted request shape.
pub async fn read_search_payload(req: Request) -> AppResult<Value> {
    if is_multipart(&req) {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return match read_json_file(&mut multipart).await? {
            Some(value) => Ok(value),
            None => Err(AppError::BadRequest(NO_DATA.into())),
        };
    }

    let bytes = Bytes::from_request(req, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    match parse_json_body(&bytes) {
        Ok(Some(value)) if !is_empty_payload(&value) => Ok(value),
        Ok(_) => Err(AppError::BadRequest(NO_DATA.into())),
        Err(err) => Err(AppError::BadRequest(format!("Invalid JSON body: {err}"))),
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Parse the `file` field; `None` when the form carries no such field.
async fn read_json_file(multipart: &mut Multipart) -> AppResult<Option<Value>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if !file_name.ends_with(".json") {
            return Err(AppError::BadRequest("File must be a JSON file".into()));
        }
        let data = field.bytes().await?;
        debug!(
            target: "api::search",
            file = %file_name,
            bytes = data.len(),
            "received JSON upload"
        );
        return serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON file: {e}")));
    }
    Ok(None)
}
