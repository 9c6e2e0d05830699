pub mod error_handler;
pub mod middleware_layer;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use catalog_search::CatalogConfig;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    error_handler::AppError,
    middleware_layer::request_id::request_id,
    routes::{
        debug::debug_embedding_route::debug_embedding_route, health_route::health_route,
        invoice::process_pdf_route::process_pdf_route,
        mapping::save_mapping_route::save_mapping_route, search::search_route::search_route,
    },
    state::app_state::{ApiConfig, AppState},
};

/// Upload cap for invoice files and extraction documents.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// All HTTP routes over the shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", post(search_route))
        .route("/save-mapping", post(save_mapping_route))
        .route("/debug-embedding/{doc_id}", get(debug_embedding_route))
        .route("/process-pdf", post(process_pdf_route))
        .route("/health", get(health_route))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

/// Load configuration, build the shared clients once and serve until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let api_cfg = ApiConfig::from_env();
    let catalog_cfg = CatalogConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&api_cfg, &catalog_cfg)?);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&api_cfg.address)
        .await
        .map_err(AppError::Bind)?;
    info!(
        address = %api_cfg.address,
        collection = %catalog_cfg.typesense.collection,
        typesense = %catalog_cfg.typesense.base_url(),
        embedding = %catalog_cfg.embedding.url,
        mapping_file = %api_cfg.mapping_file.display(),
        "invoice matcher listening"
    );

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
