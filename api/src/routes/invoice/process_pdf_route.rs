use axum::{
    Json,
    extract::{Multipart, multipart::MultipartRejection},
};
use serde_json::Value;
use tracing::info;

use crate::{
    error_handler::{AppError, AppResult},
    routes::invoice::sample_extraction::sample_extraction,
};

/// `POST /process-pdf`: stand-in for the invoice extractor.
///
/// Validates the upload and returns a canned extraction that `/search` accepts as is.
pub async fn process_pdf_route(
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Value>> {
    let Ok(mut multipart) = multipart else {
        return Err(AppError::BadRequest("No file uploaded".into()));
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if !file_name.ends_with(".pdf") {
            return Err(AppError::BadRequest("File must be a PDF".into()));
        }
        info!(target: "api::invoice", file = %file_name, "process_pdf_route: mock extraction");
        return Ok(Json(sample_extraction()));
    }

    Err(AppError::BadRequest("No file uploaded".into()))
}
