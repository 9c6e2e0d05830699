//! Unified error type for the catalog-search crate.

use thiserror::Error;

/// Errors produced by the catalog matcher, the search-engine client and the importer.
#[derive(Debug, Error)]
pub enum CatalogError {
    // ── Configuration / environment ──────────────────────────────────────────
    /// Required environment variable is missing.
    #[error("missing env variable: {key}")]
    EnvMissing { key: String },

    /// Failed to parse an environment variable into the expected type.
    #[error("failed to parse env variable: {key} = '{value}'")]
    EnvParse { key: String, value: String },

    /// Configuration combination is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O & filesystem ────────────────────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // ── JSON / serialization ────────────────────────────────────────────────
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Transport ───────────────────────────────────────────────────────────
    /// HTTP transport failure talking to the search engine or the embedder.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The search engine answered, but with an error status or an error payload.
    #[error("search engine error: {0}")]
    SearchEngine(String),

    /// Requested document or collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    // ── Embeddings backend ──────────────────────────────────────────────────
    /// Embedding backend failed to produce a vector.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Embedding backend produced a vector that cannot be used.
    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),

    // ── Request validation ──────────────────────────────────────────────────
    /// The caller's payload is structurally invalid.
    #[error("{0}")]
    InvalidRequest(String),
}
