//! Configuration layer: reads runtime settings from environment variables
//! and exposes strongly typed configs for Typesense, embeddings, query
//! normalization, search tuning and catalog import.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::catalog_error::CatalogError;

/// Embedding server flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Ollama `/api/embeddings`.
    Ollama,
    /// Hugging Face text-embeddings-inference `/embed`.
    Tei,
}

impl EmbeddingProviderKind {
    /// Parse from env string (case-insensitive). Defaults to Ollama.
    pub fn from_env(s: Option<String>) -> Result<Self, CatalogError> {
        let raw = s.unwrap_or_else(|| "ollama".to_string());
        match raw.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "tei" | "text-embeddings-inference" => Ok(Self::Tei),
            _ => Err(CatalogError::EnvParse {
                key: "EMBEDDING_PROVIDER".into(),
                value: raw,
            }),
        }
    }
}

/// Typesense connectivity and collection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypesenseConfig {
    pub host: String,
    pub port: u16,
    /// `http` or `https`.
    pub protocol: String,
    pub api_key: String,
    /// Collection holding the product catalog.
    pub collection: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl TypesenseConfig {
    /// Base URL such as `http://localhost:8108`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl Default for TypesenseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8108,
            protocol: "http".to_string(),
            api_key: String::new(),
            collection: "products".to_string(),
            timeout_secs: 2,
        }
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Base URL of the embedding server.
    pub url: String,
    /// Model identifier passed to the server.
    pub model: String,
    /// Expected dimensionality of every vector.
    pub dim: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Ollama,
            url: "http://localhost:11434".to_string(),
            model: "bkai-foundation-models/vietnamese-bi-encoder".to_string(),
            dim: 768,
            timeout_secs: 30,
        }
    }
}

/// Token filtering rules applied by the embedding-mode normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerRules {
    /// Tokens shorter than this are dropped unless kept explicitly.
    pub min_token_len: usize,
    /// Short tokens that survive the length filter (unit and pack-size codes).
    pub keep_tokens: Vec<String>,
    /// Tokens that are always dropped.
    pub drop_tokens: Vec<String>,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            keep_tokens: vec!["20".into(), "h".into(), "2".into()],
            drop_tokens: Vec::new(),
        }
    }
}

/// Search-engine query knobs shared by the hybrid and the lexical tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTuning {
    /// Indexed text field searched lexically.
    pub query_by: String,
    pub query_by_weights: String,
    /// Float-array field holding the document embedding.
    pub vector_field: String,
    pub per_page: usize,
    /// ANN candidate count.
    pub vector_k: usize,
    pub ef_search: usize,
    pub num_typos: u32,
    pub min_len_1typo: u32,
    pub min_len_2typos: u32,
    pub drop_tokens_threshold: u32,
    pub typo_tokens_threshold: u32,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            query_by: "name".to_string(),
            query_by_weights: "3".to_string(),
            vector_field: "name_embedding".to_string(),
            per_page: 10,
            vector_k: 400,
            ef_search: 1000,
            num_typos: 2,
            min_len_1typo: 3,
            min_len_2typos: 5,
            drop_tokens_threshold: 1,
            typo_tokens_threshold: 2,
        }
    }
}

/// Catalog import knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Documents per `documents/import` request.
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

/// Top-level runtime configuration for the catalog matcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub typesense: TypesenseConfig,
    pub embedding: EmbeddingConfig,
    pub normalizer: NormalizerRules,
    pub search: SearchTuning,
    pub import: ImportConfig,
}

impl CatalogConfig {
    /// Build configuration from environment variables.
    ///
    /// Environment variables used:
    /// - `TYPESENSE_HOST` (default: "localhost")
    /// - `TYPESENSE_PORT` (default: 8108)
    /// - `TYPESENSE_PROTOCOL` (default: "http")
    /// - `TYPESENSE_API_KEY` (required)
    /// - `TYPESENSE_COLLECTION` (default: "products")
    /// - `TYPESENSE_TIMEOUT_SECS` (default: 2)
    /// - `EMBEDDING_PROVIDER` ("ollama" | "tei"; default: "ollama")
    /// - `EMBEDDING_URL` (default: "http://localhost:11434")
    /// - `EMBEDDING_MODEL` (default: "bkai-foundation-models/vietnamese-bi-encoder")
    /// - `EMBEDDING_DIM` (default: 768)
    /// - `EMBEDDING_TIMEOUT_SECS` (default: 30)
    /// - `EMBED_MIN_TOKEN_LEN` (default: 3)
    /// - `EMBED_KEEP_TOKENS` (comma separated; default: "20,h,2")
    /// - `EMBED_DROP_TOKENS` (comma separated; default: empty)
    /// - `SEARCH_PER_PAGE` (default: 10)
    /// - `SEARCH_QUERY_BY_WEIGHTS` (default: "3")
    /// - `SEARCH_VECTOR_K` (default: 400)
    /// - `SEARCH_EF_SEARCH` (default: 1000)
    /// - `SEARCH_NUM_TYPOS` (default: 2)
    /// - `SEARCH_MIN_LEN_1TYPO` (default: 3)
    /// - `SEARCH_MIN_LEN_2TYPOS` (default: 5)
    /// - `SEARCH_DROP_TOKENS_THRESHOLD` (default: 1)
    /// - `SEARCH_TYPO_TOKENS_THRESHOLD` (default: 2)
    /// - `IMPORT_BATCH_SIZE` (default: 100)
    pub fn from_env() -> Result<Self, CatalogError> {
        let defaults = Self::default();

        let typesense = TypesenseConfig {
            host: read_string_env("TYPESENSE_HOST", &defaults.typesense.host),
            port: read_parsed_env("TYPESENSE_PORT", defaults.typesense.port)?,
            protocol: read_string_env("TYPESENSE_PROTOCOL", &defaults.typesense.protocol),
            api_key: std::env::var("TYPESENSE_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CatalogError::EnvMissing {
                    key: "TYPESENSE_API_KEY".into(),
                })?,
            collection: read_string_env("TYPESENSE_COLLECTION", &defaults.typesense.collection),
            timeout_secs: read_parsed_env(
                "TYPESENSE_TIMEOUT_SECS",
                defaults.typesense.timeout_secs,
            )?,
        };

        let embedding = EmbeddingConfig {
            provider: EmbeddingProviderKind::from_env(std::env::var("EMBEDDING_PROVIDER").ok())?,
            url: read_string_env("EMBEDDING_URL", &defaults.embedding.url),
            model: read_string_env("EMBEDDING_MODEL", &defaults.embedding.model),
            dim: read_parsed_env("EMBEDDING_DIM", defaults.embedding.dim)?,
            timeout_secs: read_parsed_env(
                "EMBEDDING_TIMEOUT_SECS",
                defaults.embedding.timeout_secs,
            )?,
        };

        let normalizer = NormalizerRules {
            min_token_len: read_parsed_env(
                "EMBED_MIN_TOKEN_LEN",
                defaults.normalizer.min_token_len,
            )?,
            keep_tokens: read_list_env("EMBED_KEEP_TOKENS", defaults.normalizer.keep_tokens),
            drop_tokens: read_list_env("EMBED_DROP_TOKENS", defaults.normalizer.drop_tokens),
        };

        let d = &defaults.search;
        let search = SearchTuning {
            query_by: d.query_by.clone(),
            query_by_weights: read_string_env("SEARCH_QUERY_BY_WEIGHTS", &d.query_by_weights),
            vector_field: d.vector_field.clone(),
            per_page: read_parsed_env("SEARCH_PER_PAGE", d.per_page)?,
            vector_k: read_parsed_env("SEARCH_VECTOR_K", d.vector_k)?,
            ef_search: read_parsed_env("SEARCH_EF_SEARCH", d.ef_search)?,
            num_typos: read_parsed_env("SEARCH_NUM_TYPOS", d.num_typos)?,
            min_len_1typo: read_parsed_env("SEARCH_MIN_LEN_1TYPO", d.min_len_1typo)?,
            min_len_2typos: read_parsed_env("SEARCH_MIN_LEN_2TYPOS", d.min_len_2typos)?,
            drop_tokens_threshold: read_parsed_env(
                "SEARCH_DROP_TOKENS_THRESHOLD",
                d.drop_tokens_threshold,
            )?,
            typo_tokens_threshold: read_parsed_env(
                "SEARCH_TYPO_TOKENS_THRESHOLD",
                d.typo_tokens_threshold,
            )?,
        };

        let import = ImportConfig {
            batch_size: read_parsed_env("IMPORT_BATCH_SIZE", defaults.import.batch_size)?,
        };

        let cfg = Self {
            typesense,
            embedding,
            normalizer,
            search,
            import,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Basic sanity checks shared by `from_env` and hand-built configs.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.embedding.dim == 0 {
            return Err(CatalogError::InvalidConfig("EMBEDDING_DIM must be > 0".into()));
        }
        if self.search.per_page == 0 {
            return Err(CatalogError::InvalidConfig("SEARCH_PER_PAGE must be > 0".into()));
        }
        if self.import.batch_size == 0 {
            return Err(CatalogError::InvalidConfig(
                "IMPORT_BATCH_SIZE must be > 0".into(),
            ));
        }
        if !matches!(self.typesense.protocol.as_str(), "http" | "https") {
            return Err(CatalogError::InvalidConfig(format!(
                "TYPESENSE_PROTOCOL must be http or https, got '{}'",
                self.typesense.protocol
            )));
        }
        Ok(())
    }
}

/// Read a string from env, falling back to `default` when unset or blank.
fn read_string_env(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse a value from env; unset means `default`, garbage is an error.
fn read_parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, CatalogError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => {
            v.trim().parse::<T>().map_err(|_| CatalogError::EnvParse {
                key: key.into(),
                value: v,
            })
        }
        _ => Ok(default),
    }
}

/// Read a comma-separated list. An explicitly empty variable yields an empty list.
fn read_list_env(key: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(key) {
        Ok(v) => parse_list(&v),
        Err(_) => default,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
