//! Typesense HTTP client: search, document retrieval, and collection admin.
//!
//! Keep the search-engine concerns isolated and easy to replace:
//! - [`CatalogBackend`] is everything the request path needs (search + lookup).
//! - [`CatalogAdmin`] is everything the offline importer needs (schema + bulk import).
//!
//! [`TypesenseClient`] implements both over the REST API using one reused
//! `reqwest::Client` and the `X-TYPESENSE-API-KEY` header. The client is bound to a
//! single collection (from [`TypesenseConfig`]).
//!
//! Vector queries are always sent through `POST /multi_search`: a 768-dim vector does
//! not fit into the query string of `GET .../documents/search`.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, trace};

use crate::errors::catalog_error::CatalogError;
use crate::structs::catalog_config::TypesenseConfig;
use crate::structs::catalog_store::{ProductDocument, RawHit};

const API_KEY_HEADER: &str = "x-typesense-api-key";

/// Bulk imports move large float arrays and get a longer budget than searches.
const ADMIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Parameters of one search against the products collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchParams {
    pub q: String,
    pub query_by: String,
    pub query_by_weights: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_query: Option<String>,
    pub filter_by: String,
    pub per_page: usize,
    pub prefix: bool,
    pub infix: String,
    pub sort_by: String,
    pub drop_tokens_threshold: u32,
    pub typo_tokens_threshold: u32,
    pub num_typos: u32,
    pub min_len_1typo: u32,
    pub min_len_2typos: u32,
}

/// Outcome of importing a single document line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportLineResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Read side of the catalog used while serving requests.
pub trait CatalogBackend: Send + Sync {
    /// Run one search through the multi-search endpoint (supports `vector_query`).
    fn multi_search<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> BoxFuture<'a, Result<Vec<RawHit>, CatalogError>>;

    /// Run one plain document search.
    fn search<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> BoxFuture<'a, Result<Vec<RawHit>, CatalogError>>;

    /// Fetch a stored document by id, all fields included.
    fn retrieve_document<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Map<String, Value>, CatalogError>>;

    /// `true` when the engine reports itself healthy.
    fn health(&self) -> BoxFuture<'_, Result<bool, CatalogError>>;
}

/// Write side of the catalog used by the import tooling.
pub trait CatalogAdmin: Send + Sync {
    fn create_collection<'a>(&'a self, schema: &'a Value)
    -> BoxFuture<'a, Result<Value, CatalogError>>;

    fn delete_collection(&self) -> BoxFuture<'_, Result<(), CatalogError>>;

    fn retrieve_collection(&self) -> BoxFuture<'_, Result<Value, CatalogError>>;

    /// Bulk import with `action=create`; one result per submitted document.
    fn import_documents<'a>(
        &'a self,
        docs: &'a [ProductDocument],
    ) -> BoxFuture<'a, Result<Vec<ImportLineResult>, CatalogError>>;

    fn create_document<'a>(
        &'a self,
        doc: &'a ProductDocument,
    ) -> BoxFuture<'a, Result<(), CatalogError>>;
}

/// REST client for a single Typesense collection.
#[derive(Clone)]
pub struct TypesenseClient {
    http: reqwest::Client,
    base: Url,
    collection: String,
    timeout: Duration,
}

impl TypesenseClient {
    /// Build the client. Does not touch the network.
    pub fn new(cfg: &TypesenseConfig) -> Result<Self, CatalogError> {
        let base = Url::parse(&cfg.base_url())
            .map_err(|e| CatalogError::InvalidConfig(format!("typesense url: {e}")))?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&cfg.api_key)
            .map_err(|_| CatalogError::InvalidConfig("TYPESENSE_API_KEY is not a valid header".into()))?;
        headers.insert(API_KEY_HEADER, key);

        let timeout = Duration::from_secs(cfg.timeout_secs);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base,
            collection: cfg.collection.clone(),
            timeout,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidConfig("typesense url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        method: &Method,
        url: &Url,
    ) -> Result<String, CatalogError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        trace!(
            target: "catalog_search::typesense",
            %method,
            %url,
            %status,
            bytes = body.len(),
            "typesense response"
        );
        check_status(status, method, url, body)
    }

    async fn run_multi_search(&self, params: &SearchParams) -> Result<Vec<RawHit>, CatalogError> {
        let url = self.endpoint(&["multi_search"])?;
        let body = multi_search_body(&self.collection, params);
        let req = self
            .http
            .post(url.clone())
            .timeout(self.timeout)
            .json(&body);
        let text = self.send(req, &Method::POST, &url).await?;
        parse_multi_search(&text)
    }

    async fn run_search(&self, params: &SearchParams) -> Result<Vec<RawHit>, CatalogError> {
        let url = self.endpoint(&["collections", self.collection.as_str(), "documents", "search"])?;
        let req = self.http.get(url.clone()).timeout(self.timeout).query(params);
        let text = self.send(req, &Method::GET, &url).await?;
        parse_search(&text)
    }

    async fn run_retrieve_document(&self, id: &str) -> Result<Map<String, Value>, CatalogError> {
        let url = self.endpoint(&["collections", self.collection.as_str(), "documents", id])?;
        let req = self.http.get(url.clone()).timeout(self.timeout);
        let text = self.send(req, &Method::GET, &url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn run_health(&self) -> Result<bool, CatalogError> {
        #[derive(Deserialize)]
        struct Health {
            #[serde(default)]
            ok: bool,
        }
        let url = self.endpoint(&["health"])?;
        let req = self.http.get(url.clone()).timeout(self.timeout);
        let text = self.send(req, &Method::GET, &url).await?;
        let health: Health = serde_json::from_str(&text)?;
        Ok(health.ok)
    }

    async fn run_create_collection(&self, schema: &Value) -> Result<Value, CatalogError> {
        let url = self.endpoint(&["collections"])?;
        let req = self.http.post(url.clone()).timeout(ADMIN_TIMEOUT).json(schema);
        let text = self.send(req, &Method::POST, &url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn run_delete_collection(&self) -> Result<(), CatalogError> {
        let url = self.endpoint(&["collections", self.collection.as_str()])?;
        let req = self.http.delete(url.clone()).timeout(ADMIN_TIMEOUT);
        self.send(req, &Method::DELETE, &url).await?;
        Ok(())
    }

    async fn run_retrieve_collection(&self) -> Result<Value, CatalogError> {
        let url = self.endpoint(&["collections", self.collection.as_str()])?;
        let req = self.http.get(url.clone()).timeout(self.timeout);
        let text = self.send(req, &Method::GET, &url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn run_import_documents(
        &self,
        docs: &[ProductDocument],
    ) -> Result<Vec<ImportLineResult>, CatalogError> {
        let mut url = self.endpoint(&["collections", self.collection.as_str(), "documents", "import"])?;
        url.query_pairs_mut().append_pair("action", "create");

        let body = to_jsonl(docs)?;
        debug!(
            target: "catalog_search::typesense",
            docs = docs.len(),
            bytes = body.len(),
            "importing documents"
        );
        let req = self
            .http
            .post(url.clone())
            .timeout(ADMIN_TIMEOUT)
            .header(CONTENT_TYPE, "text/plain")
            .body(body);
        let text = self.send(req, &Method::POST, &url).await?;
        parse_import_results(&text)
    }

    async fn run_create_document(&self, doc: &ProductDocument) -> Result<(), CatalogError> {
        let url = self.endpoint(&["collections", self.collection.as_str(), "documents"])?;
        let req = self.http.post(url.clone()).timeout(ADMIN_TIMEOUT).json(doc);
        self.send(req, &Method::POST, &url).await?;
        Ok(())
    }
}

impl CatalogBackend for TypesenseClient {
    fn multi_search<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> BoxFuture<'a, Result<Vec<RawHit>, CatalogError>> {
        Box::pin(self.run_multi_search(params))
    }

    fn search<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> BoxFuture<'a, Result<Vec<RawHit>, CatalogError>> {
        Box::pin(self.run_search(params))
    }

    fn retrieve_document<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Map<String, Value>, CatalogError>> {
        Box::pin(self.run_retrieve_document(id))
    }

    fn health(&self) -> BoxFuture<'_, Result<bool, CatalogError>> {
        Box::pin(self.run_health())
    }
}

impl CatalogAdmin for TypesenseClient {
    fn create_collection<'a>(
        &'a self,
        schema: &'a Value,
    ) -> BoxFuture<'a, Result<Value, CatalogError>> {
        Box::pin(self.run_create_collection(schema))
    }

    fn delete_collection(&self) -> BoxFuture<'_, Result<(), CatalogError>> {
        Box::pin(self.run_delete_collection())
    }

    fn retrieve_collection(&self) -> BoxFuture<'_, Result<Value, CatalogError>> {
        Box::pin(self.run_retrieve_collection())
    }

    fn import_documents<'a>(
        &'a self,
        docs: &'a [ProductDocument],
    ) -> BoxFuture<'a, Result<Vec<ImportLineResult>, CatalogError>> {
        Box::pin(self.run_import_documents(docs))
    }

    fn create_document<'a>(
        &'a self,
        doc: &'a ProductDocument,
    ) -> BoxFuture<'a, Result<(), CatalogError>> {
        Box::pin(self.run_create_document(doc))
    }
}

/// Map a non-2xx status to an error, keeping Typesense's `message` when present.
fn check_status(
    status: StatusCode,
    method: &Method,
    url: &Url,
    body: String,
) -> Result<String, CatalogError> {
    if status.is_success() {
        return Ok(body);
    }

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        return Err(CatalogError::NotFound(message));
    }
    Err(CatalogError::SearchEngine(format!(
        "{method} {}: {status}; {message}",
        url.path()
    )))
}

fn multi_search_body(collection: &str, params: &SearchParams) -> Value {
    let mut search = match serde_json::to_value(params) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    search.insert("collection".into(), Value::String(collection.to_string()));
    json!({ "searches": [Value::Object(search)] })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<RawHit>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct MultiSearchResponse {
    #[serde(default)]
    results: Vec<SearchResponse>,
}

fn parse_search(body: &str) -> Result<Vec<RawHit>, CatalogError> {
    let resp: SearchResponse = serde_json::from_str(body)?;
    into_hits(resp)
}

/// A multi-search call returns 200 even when the embedded search failed; the
/// failure is reported inside the per-search result.
fn parse_multi_search(body: &str) -> Result<Vec<RawHit>, CatalogError> {
    let resp: MultiSearchResponse = serde_json::from_str(body)?;
    match resp.results.into_iter().next() {
        Some(first) => into_hits(first),
        None => Ok(Vec::new()),
    }
}

fn into_hits(resp: SearchResponse) -> Result<Vec<RawHit>, CatalogError> {
    if let Some(err) = resp.error {
        let code = resp.code.map(|c| c.to_string()).unwrap_or_else(|| "?".into());
        return Err(CatalogError::SearchEngine(format!("search failed ({code}): {err}")));
    }
    Ok(resp.hits)
}

fn to_jsonl(docs: &[ProductDocument]) -> Result<String, CatalogError> {
    let mut out = String::new();
    for doc in docs {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&serde_json::to_string(doc)?);
    }
    Ok(out)
}

fn parse_import_results(body: &str) -> Result<Vec<ImportLineResult>, CatalogError> {
    body.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str::<ImportLineResult>(l).map_err(CatalogError::from))
        .collect()
}
