use std::path::PathBuf;
use std::sync::Arc;

use catalog_search::{CatalogConfig, CatalogMatcher};

use crate::error_handler::AppResult;
use crate::state::mapping_store::MappingStore;

/// HTTP-layer settings read from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen address, e.g. "0.0.0.0:5000".
    pub address: String,
    /// Where `/save-mapping` writes the confirmed mappings.
    pub mapping_file: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:5000".into(),
            mapping_file: PathBuf::from("mappings.json"),
        }
    }
}

impl ApiConfig {
    /// `API_ADDRESS` and `MAPPING_FILE`, with defaults for blank or unset values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            address: non_empty_env("API_ADDRESS").unwrap_or(defaults.address),
            mapping_file: non_empty_env("MAPPING_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.mapping_file),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Matching pipeline with the shared search and embedding clients.
    pub matcher: Arc<CatalogMatcher>,
    pub mappings: MappingStore,
}

impl AppState {
    pub fn new(matcher: CatalogMatcher, mappings: MappingStore) -> Self {
        Self {
            matcher: Arc::new(matcher),
            mappings,
        }
    }

    /// Build the process-wide clients once from configuration.
    pub fn from_config(api: &ApiConfig, catalog: &CatalogConfig) -> AppResult<Self> {
        let matcher = CatalogMatcher::from_config(catalog)?;
        Ok(Self::new(matcher, MappingStore::new(api.mapping_file.clone())))
    }
}
