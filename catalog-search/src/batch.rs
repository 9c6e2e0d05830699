//! Batch orchestration: request validation and the per-item matching pipeline.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::embedding::{EmbeddingsProvider, HttpEmbedder, query_embedding};
use crate::errors::catalog_error::CatalogError;
use crate::normalize::NormalizedQuery;
use crate::search::hybrid_search;
use crate::shaping::shape_hits;
use crate::structs::catalog_config::{CatalogConfig, NormalizerRules, SearchTuning};
use crate::structs::match_result::MatchResult;
use crate::typesense::{CatalogBackend, TypesenseClient};

/// Key of the item list in the extraction payload.
pub const ITEMS_FIELD: &str = "item_des";

/// One invoice line to match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchItem {
    /// Caller's identifier, echoed back untouched.
    pub id: Value,
    pub product_name: String,
}

/// Validate the payload shape and extract the usable items, in order.
///
/// Fails only when `item_des` is absent or not an array. Individual entries that
/// are not objects, lack `id`/`product_name`, or carry a blank name are skipped.
pub fn parse_search_request(payload: &Value) -> Result<Vec<SearchItem>, CatalogError> {
    let Some(entries) = payload.get(ITEMS_FIELD).and_then(Value::as_array) else {
        return Err(CatalogError::InvalidRequest(format!(
            "JSON must contain an '{ITEMS_FIELD}' list of products"
        )));
    };

    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let (Some(id), Some(name)) = (entry.get("id"), entry.get("product_name")) else {
            debug!(
                target: "catalog_search::batch",
                index,
                "skipping entry without id/product_name"
            );
            continue;
        };
        let Some(name) = name.as_str() else {
            warn!(
                target: "catalog_search::batch",
                index,
                id = %id,
                "skipping entry with non-text product_name"
            );
            continue;
        };
        if name.trim().is_empty() {
            warn!(
                target: "catalog_search::batch",
                index,
                id = %id,
                "skipping entry with empty product_name"
            );
            continue;
        }
        items.push(SearchItem {
            id: id.clone(),
            product_name: name.to_string(),
        });
    }
    Ok(items)
}

/// Stored document with its embedding, for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentEmbedding {
    pub id: Value,
    pub name: Value,
    pub name_embedding: Value,
}

/// Matching pipeline with its shared external clients.
///
/// Build once at startup and share behind an `Arc`; every call is independent.
pub struct CatalogMatcher {
    backend: Arc<dyn CatalogBackend>,
    embedder: Arc<dyn EmbeddingsProvider>,
    rules: NormalizerRules,
    tuning: SearchTuning,
    dim: usize,
}

impl CatalogMatcher {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        embedder: Arc<dyn EmbeddingsProvider>,
        cfg: &CatalogConfig,
    ) -> Self {
        Self {
            backend,
            embedder,
            rules: cfg.normalizer.clone(),
            tuning: cfg.search.clone(),
            dim: cfg.embedding.dim,
        }
    }

    /// Wire the Typesense client and the HTTP embedder from configuration.
    pub fn from_config(cfg: &CatalogConfig) -> Result<Self, CatalogError> {
        let backend = Arc::new(TypesenseClient::new(&cfg.typesense)?);
        let embedder = Arc::new(HttpEmbedder::new(&cfg.embedding)?);
        Ok(Self::new(backend, embedder, cfg))
    }

    pub fn backend(&self) -> &dyn CatalogBackend {
        self.backend.as_ref()
    }

    /// normalize → embed → tiered search → trim, for one item.
    pub async fn match_item(&self, item: &SearchItem) -> MatchResult {
        let query = NormalizedQuery::from_raw(&item.product_name, &self.rules);
        debug!(
            target: "catalog_search::batch",
            original = %item.product_name,
            lexical = %query.lexical,
            embedding = %query.embedding_text,
            "normalized query"
        );

        let embedding = query_embedding(self.embedder.as_ref(), self.dim, &query).await;
        let outcome =
            hybrid_search(self.backend.as_ref(), &self.tuning, &query, embedding.as_deref()).await;
        let tier = outcome.tier();
        let matches = shape_hits(outcome.into_hits());

        info!(
            target: "catalog_search::batch",
            id = %item.id,
            tier,
            matches = matches.len(),
            "item matched"
        );

        MatchResult {
            id: item.id.clone(),
            query: item.product_name.clone(),
            matches,
        }
    }

    /// Match items sequentially; output order equals input order.
    pub async fn match_items(&self, items: &[SearchItem]) -> Vec<MatchResult> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.match_item(item).await);
        }
        results
    }

    /// Fetch one stored document with its embedding.
    pub async fn document_embedding(&self, id: &str) -> Result<DocumentEmbedding, CatalogError> {
        let mut doc = self.backend.retrieve_document(id).await?;
        let mut take = |key: &str| {
            doc.remove(key)
                .ok_or_else(|| CatalogError::NotFound(format!("document {id} has no '{key}'")))
        };
        Ok(DocumentEmbedding {
            id: take("id")?,
            name: take("name")?,
            name_embedding: take("name_embedding")?,
        })
    }
}
