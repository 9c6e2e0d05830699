//! Two-tier catalog search: hybrid (lexical + vector) first, lexical-only second.
//!
//! The tiers are explicit. [`hybrid_search`] never fails; it reports which tier
//! produced the hits through [`SearchOutcome`]:
//!
//! 1. embedding available → multi-search with `vector_query`; non-empty → `Hybrid`
//! 2. no embedding, hybrid error, or zero hybrid hits → lexical search; non-empty → `LexicalOnly`
//! 3. lexical error or zero hits → `Empty`
//!
//! Each external call is attempted at most once.

use std::fmt::Write as _;

use tracing::{debug, info, warn};

use crate::normalize::NormalizedQuery;
use crate::structs::catalog_config::SearchTuning;
use crate::structs::catalog_store::RawHit;
use crate::typesense::{CatalogBackend, SearchParams};

/// Which tier produced the hits.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Hybrid(Vec<RawHit>),
    LexicalOnly(Vec<RawHit>),
    /// Nothing found, or every tier failed.
    Empty,
}

impl SearchOutcome {
    pub fn into_hits(self) -> Vec<RawHit> {
        match self {
            SearchOutcome::Hybrid(hits) | SearchOutcome::LexicalOnly(hits) => hits,
            SearchOutcome::Empty => Vec::new(),
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            SearchOutcome::Hybrid(_) => "hybrid",
            SearchOutcome::LexicalOnly(_) => "lexical",
            SearchOutcome::Empty => "empty",
        }
    }
}

/// Lexical-only parameters for `query`, filtered on names containing `dominant`.
pub fn lexical_params(tuning: &SearchTuning, query: &str, dominant: &str) -> SearchParams {
    SearchParams {
        q: query.to_string(),
        query_by: tuning.query_by.clone(),
        query_by_weights: tuning.query_by_weights.clone(),
        vector_query: None,
        filter_by: format!("{}:*{dominant}*", tuning.query_by),
        per_page: tuning.per_page,
        prefix: true,
        infix: "always".to_string(),
        sort_by: "_text_match:desc".to_string(),
        drop_tokens_threshold: tuning.drop_tokens_threshold,
        typo_tokens_threshold: tuning.typo_tokens_threshold,
        num_typos: tuning.num_typos,
        min_len_1typo: tuning.min_len_1typo,
        min_len_2typos: tuning.min_len_2typos,
    }
}

/// Lexical parameters plus the vector term, ranked by text match then distance.
pub fn hybrid_params(
    tuning: &SearchTuning,
    query: &str,
    dominant: &str,
    vector: &[f32],
) -> SearchParams {
    SearchParams {
        vector_query: Some(vector_query(tuning, vector)),
        sort_by: "_text_match:desc,_vector_distance:asc".to_string(),
        ..lexical_params(tuning, query, dominant)
    }
}

/// Render `field:([v0, v1, ...], k:K, ef_search:EF)`.
pub fn vector_query(tuning: &SearchTuning, vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 12 + 64);
    let _ = write!(out, "{}:([", tuning.vector_field);
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v}");
    }
    let _ = write!(out, "], k:{}, ef_search:{})", tuning.vector_k, tuning.ef_search);
    out
}

/// Run the tiered search for one normalized description.
pub async fn hybrid_search(
    backend: &dyn CatalogBackend,
    tuning: &SearchTuning,
    query: &NormalizedQuery,
    embedding: Option<&[f32]>,
) -> SearchOutcome {
    let Some(dominant) = query.dominant_token() else {
        warn!(
            target: "catalog_search::search",
            "hybrid_search: nothing searchable left after normalization"
        );
        return SearchOutcome::Empty;
    };

    if let Some(vector) = embedding {
        let params = hybrid_params(tuning, &query.lexical, dominant, vector);
        match backend.multi_search(&params).await {
            Ok(hits) if !hits.is_empty() => {
                info!(
                    target: "catalog_search::search",
                    query = %query.lexical,
                    hits = hits.len(),
                    "hybrid search succeeded"
                );
                log_top_hits(&hits);
                return SearchOutcome::Hybrid(hits);
            }
            Ok(_) => {
                debug!(
                    target: "catalog_search::search",
                    query = %query.lexical,
                    "hybrid search returned no hits, falling back to lexical"
                );
            }
            Err(err) => {
                warn!(
                    target: "catalog_search::search",
                    query = %query.lexical,
                    error = %err,
                    "hybrid search failed, falling back to lexical"
                );
            }
        }
    }

    let params = lexical_params(tuning, &query.lexical, dominant);
    match backend.search(&params).await {
        Ok(hits) if !hits.is_empty() => {
            info!(
                target: "catalog_search::search",
                query = %query.lexical,
                hits = hits.len(),
                "lexical search succeeded"
            );
            log_top_hits(&hits);
            SearchOutcome::LexicalOnly(hits)
        }
        Ok(_) => {
            info!(
                target: "catalog_search::search",
                query = %query.lexical,
                "lexical search returned no hits"
            );
            SearchOutcome::Empty
        }
        Err(err) => {
            warn!(
                target: "catalog_search::search",
                query = %query.lexical,
                error = %err,
                "lexical search failed"
            );
            SearchOutcome::Empty
        }
    }
}

fn log_top_hits(hits: &[RawHit]) {
    for hit in hits.iter().take(3) {
        debug!(
            target: "catalog_search::search",
            name = ?hit.document.get("name"),
            text_match = ?hit.text_match,
            vector_distance = ?hit.vector_distance,
            "match"
        );
    }
}
