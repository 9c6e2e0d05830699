use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog product as exposed to callers: exactly these four fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimmedDocument {
    pub id: String,
    pub name: String,
    pub barcode: String,
    pub unit: String,
}

/// One candidate match for an invoice line.
///
/// `document` is `None` only when the stored record is missing one of the
/// required fields; `error` then says which one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchHit {
    pub document: Option<TrimmedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_match: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-item response: the caller's id and raw query plus ranked matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// Echoed verbatim from the request.
    pub id: Value,
    pub query: String,
    pub matches: Vec<MatchHit>,
}
