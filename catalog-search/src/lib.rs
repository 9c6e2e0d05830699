//! Public API:
//! - `CatalogMatcher`: normalize → embed → hybrid/lexical search → trim, per invoice line.
//! - `parse_search_request`: validate an extraction payload into `SearchItem`s.
//! - `load_catalog`: reset the products collection and import a JSONL catalog export.
//! - `CatalogConfig::from_env`: typed configuration for all of the above.

pub mod batch;
pub mod embedding;
pub mod errors;
pub mod import;
pub mod normalize;
pub mod search;
pub mod shaping;
pub mod structs;
pub mod typesense;

#[cfg(test)]
mod test_http;

use std::path::Path;

use tracing::info;

pub use batch::{CatalogMatcher, DocumentEmbedding, SearchItem, parse_search_request};
pub use errors::catalog_error::CatalogError;
pub use search::SearchOutcome;
pub use structs::catalog_config::CatalogConfig;
pub use structs::catalog_store::ImportStats;
pub use structs::match_result::{MatchHit, MatchResult, TrimmedDocument};

use embedding::HttpEmbedder;
use typesense::TypesenseClient;

/// Rebuild the catalog from a JSONL export using configuration from the environment.
///
/// `batch_size` overrides `IMPORT_BATCH_SIZE` when given.
pub async fn load_catalog<P: AsRef<Path>>(
    path: P,
    batch_size: Option<usize>,
) -> Result<ImportStats, CatalogError> {
    let mut cfg = CatalogConfig::from_env()?;
    if let Some(size) = batch_size {
        cfg.import.batch_size = size;
    }
    cfg.validate()?;

    info!(
        target: "catalog_search::import",
        path = %path.as_ref().display(),
        collection = %cfg.typesense.collection,
        batch_size = cfg.import.batch_size,
        "load_catalog: start"
    );

    let client = TypesenseClient::new(&cfg.typesense)?;
    let embedder = HttpEmbedder::new(&cfg.embedding)?;
    import::import_catalog(&client, &embedder, &cfg, path).await
}
