//! Embedding abstraction, the HTTP embedder, and vector validation.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::catalog_error::CatalogError;
use crate::normalize::NormalizedQuery;
use crate::structs::catalog_config::{EmbeddingConfig, EmbeddingProviderKind};

/// Values at or below this magnitude count as zero.
const ZERO_EPS: f32 = 1e-8;

/// Provider interface for embedding generation.
///
/// Implementations are shared across requests behind an `Arc` and must be safe
/// to call concurrently.
pub trait EmbeddingsProvider: Send + Sync {
    /// Produces a raw (not yet validated) embedding vector for `text`.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, CatalogError>>;
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct TeiEmbedRequest<'a> {
    inputs: &'a str,
    normalize: bool,
}

/// Embedder for an HTTP embedding server (Ollama or text-embeddings-inference).
///
/// Holds a single reused `reqwest::Client`.
pub struct HttpEmbedder {
    client: reqwest::Client,
    provider: EmbeddingProviderKind,
    model: String,
    url: String,
}

impl HttpEmbedder {
    /// Build the embedder; fails only if the HTTP client cannot be constructed.
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self, CatalogError> {
        let base = cfg.url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(CatalogError::InvalidConfig(format!(
                "EMBEDDING_URL must start with http:// or https://, got '{}'",
                cfg.url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        let url = match cfg.provider {
            EmbeddingProviderKind::Ollama => format!("{base}/api/embeddings"),
            EmbeddingProviderKind::Tei => format!("{base}/embed"),
        };

        Ok(Self {
            client,
            provider: cfg.provider,
            model: cfg.model.clone(),
            url,
        })
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>, CatalogError> {
        let req = OllamaEmbedRequest {
            model: &self.model,
            prompt: text,
        };
        let resp = self.client.post(&self.url).json(&req).send().await?;
        let resp = ensure_ok(resp, &self.url).await?;

        let parsed: OllamaEmbedResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Embedding(format!("parse embeddings json: {e}")))?;
        Ok(parsed.embedding)
    }

    async fn embed_tei(&self, text: &str) -> Result<Vec<f32>, CatalogError> {
        let req = TeiEmbedRequest {
            inputs: text,
            normalize: true,
        };
        let resp = self.client.post(&self.url).json(&req).send().await?;
        let resp = ensure_ok(resp, &self.url).await?;

        let parsed: Vec<Vec<f32>> = resp
            .json()
            .await
            .map_err(|e| CatalogError::Embedding(format!("parse embeddings json: {e}")))?;
        parsed
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::Embedding("empty embedding response".into()))
    }
}

impl EmbeddingsProvider for HttpEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, CatalogError>> {
        Box::pin(async move {
            match self.provider {
                EmbeddingProviderKind::Ollama => self.embed_ollama(text).await,
                EmbeddingProviderKind::Tei => self.embed_tei(text).await,
            }
        })
    }
}

async fn ensure_ok(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, CatalogError> {
    if resp.status() == StatusCode::OK {
        return Ok(resp);
    }
    let code = resp.status();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read body>".into());
    Err(CatalogError::Embedding(format!(
        "POST {url} non-200: {code}; body: {body}"
    )))
}

/// Check a raw vector and return it L2-normalized.
///
/// Rejects vectors of the wrong length, with non-finite components, or that are
/// numerically all-zero.
pub fn validate_embedding(mut vector: Vec<f32>, dim: usize) -> Result<Vec<f32>, CatalogError> {
    if vector.len() != dim {
        return Err(CatalogError::InvalidEmbedding(format!(
            "embedding dim {} != expected {dim}",
            vector.len()
        )));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(CatalogError::InvalidEmbedding(
            "embedding contains non-finite values".into(),
        ));
    }
    if vector.iter().all(|x| x.abs() <= ZERO_EPS) {
        return Err(CatalogError::InvalidEmbedding("embedding is all zeros".into()));
    }

    // Summed in f64: squares of large f32 components overflow f32.
    let norm = vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt();
    if !norm.is_finite() || norm <= 0.0 {
        return Err(CatalogError::InvalidEmbedding(format!(
            "embedding norm is not usable: {norm}"
        )));
    }
    for x in vector.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    Ok(vector)
}

/// Embed one text and validate the result.
pub async fn embed_validated(
    provider: &dyn EmbeddingsProvider,
    text: &str,
    dim: usize,
) -> Result<Vec<f32>, CatalogError> {
    if text.trim().is_empty() {
        return Err(CatalogError::Embedding("nothing to embed".into()));
    }
    let raw = provider.embed(text).await?;
    validate_embedding(raw, dim)
}

/// Produce the query vector for a normalized description, or `None`.
///
/// Any failure is logged and downgraded: callers treat `None` as
/// "skip the hybrid tier".
pub async fn query_embedding(
    provider: &dyn EmbeddingsProvider,
    dim: usize,
    query: &NormalizedQuery,
) -> Option<Vec<f32>> {
    let text = query.embedding_input();
    match embed_validated(provider, text, dim).await {
        Ok(vector) => {
            debug!(
                target: "catalog_search::embedding",
                text,
                head = ?&vector[..vector.len().min(5)],
                "query embedding ready"
            );
            Some(vector)
        }
        Err(err) => {
            warn!(
                target: "catalog_search::embedding",
                text,
                error = %err,
                "query embedding unavailable, lexical search only"
            );
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::structs::catalog_config::NormalizerRules;

    /// Test double returning a canned result and counting calls.
    pub(crate) struct FakeEmbedder {
        pub result: Result<Vec<f32>, String>,
        pub calls: std::sync::Mutex<Vec<String>>,
    }

    impl FakeEmbedder {
        pub(crate) fn ok(v: Vec<f32>) -> Self {
            Self {
                result: Ok(v),
                calls: Default::default(),
            }
        }

        pub(crate) fn failing(msg: &str) -> Self {
            Self {
                result: Err(msg.to_string()),
                calls: Default::default(),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EmbeddingsProvider for FakeEmbedder {
        fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, CatalogError>> {
            self.calls.lock().unwrap().push(text.to_string());
            let out = self.result.clone().map_err(CatalogError::Embedding);
            Box::pin(async move { out })
        }
    }

    #[test]
    fn valid_vector_is_unit_normalized() {
        let v = validate_embedding(vec![3.0, 4.0, 0.0], 3).unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn wrong_length_zero_and_nan_are_rejected() {
        assert!(matches!(
            validate_embedding(vec![1.0; 767], 768),
            Err(CatalogError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            validate_embedding(vec![0.0; 768], 768),
            Err(CatalogError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            validate_embedding(vec![1e-9; 4], 4),
            Err(CatalogError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            validate_embedding(vec![f32::NAN, 1.0], 2),
            Err(CatalogError::InvalidEmbedding(_))
        ));
    }

    #[test]
    fn huge_components_still_normalize_to_unit_length() {
        let v = validate_embedding(vec![3e19, 4e19], 2).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let v = validate_embedding(vec![f32::MAX, f32::MAX, 0.0], 3).unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn query_embedding_falls_back_to_lexical_text() {
        let fake = FakeEmbedder::ok(vec![1.0, 0.0]);
        let q = NormalizedQuery::from_raw("HQ 5", &NormalizerRules::default());
        let v = query_embedding(&fake, 2, &q).await;
        assert!(v.is_some());
        assert_eq!(fake.calls(), vec!["hq 5".to_string()]);
    }

    #[tokio::test]
    async fn query_embedding_swallows_failures() {
        let q = NormalizedQuery::from_raw("Refresh tears", &NormalizerRules::default());

        let failing = FakeEmbedder::failing("model offline");
        assert!(query_embedding(&failing, 2, &q).await.is_none());

        let degenerate = FakeEmbedder::ok(vec![0.0, 0.0]);
        assert!(query_embedding(&degenerate, 2, &q).await.is_none());

        let wrong_dim = FakeEmbedder::ok(vec![1.0, 0.0, 0.0]);
        assert!(query_embedding(&wrong_dim, 2, &q).await.is_none());
    }

    #[tokio::test]
    async fn empty_text_is_never_sent_to_the_model() {
        let fake = FakeEmbedder::ok(vec![1.0, 0.0]);
        let q = NormalizedQuery::from_raw("", &NormalizerRules::default());
        assert!(query_embedding(&fake, 2, &q).await.is_none());
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn embedder_rejects_bad_url() {
        let cfg = EmbeddingConfig {
            url: "localhost:11434".into(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            HttpEmbedder::new(&cfg),
            Err(CatalogError::InvalidConfig(_))
        ));
    }

    fn embedder_at(addr: std::net::SocketAddr, provider: EmbeddingProviderKind) -> HttpEmbedder {
        HttpEmbedder::new(&EmbeddingConfig {
            provider,
            url: format!("http://{addr}/"),
            model: "vi-encoder".into(),
            dim: 2,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn ollama_request_and_response() {
        let (addr, server) =
            crate::test_http::serve_once(200, r#"{"embedding":[0.1,0.2]}"#).await;
        let embedder = embedder_at(addr, EmbeddingProviderKind::Ollama);

        let v = embedder.embed("refresh tears").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2]);

        let req = server.await.unwrap();
        assert!(req.request_line().starts_with("POST /api/embeddings "));
        let sent: serde_json::Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({"model": "vi-encoder", "prompt": "refresh tears"})
        );
    }

    #[tokio::test]
    async fn tei_request_and_response() {
        let (addr, server) = crate::test_http::serve_once(200, "[[0.3,0.4]]").await;
        let embedder = embedder_at(addr, EmbeddingProviderKind::Tei);

        let v = embedder.embed("gel").await.unwrap();
        assert_eq!(v, vec![0.3, 0.4]);

        let req = server.await.unwrap();
        assert!(req.request_line().starts_with("POST /embed "));
        let sent: serde_json::Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(sent, serde_json::json!({"inputs": "gel", "normalize": true}));
    }

    #[tokio::test]
    async fn server_error_is_an_embedding_error() {
        let (addr, server) =
            crate::test_http::serve_once(500, r#"{"error":"model not loaded"}"#).await;
        let embedder = embedder_at(addr, EmbeddingProviderKind::Ollama);

        let err = embedder.embed("gel").await.unwrap_err();
        assert!(matches!(err, CatalogError::Embedding(ref m) if m.contains("model not loaded")));
        server.await.unwrap();
    }
}
