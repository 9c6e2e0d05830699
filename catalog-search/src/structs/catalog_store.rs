//! Data types for search-engine interaction: raw hits as returned by Typesense,
//! catalog rows read during import, indexed documents and import statistics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single hit as returned by Typesense, before trimming.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawHit {
    /// Full stored document, including fields we never return (e.g. the embedding).
    #[serde(default)]
    pub document: Map<String, Value>,
    /// Lexical relevance score.
    #[serde(default)]
    pub text_match: Option<u64>,
    /// Distance to the query vector (hybrid queries only).
    #[serde(default)]
    pub vector_distance: Option<f64>,
}

/// One catalog line of the import JSONL file.
///
/// Fields are kept as raw JSON: exports carry numeric ids, barcodes and units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductRow {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub barcode: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub unit: Option<Value>,
}

/// Document shape written into the products collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDocument {
    pub id: String,
    pub name: String,
    pub barcode: String,
    pub unit: String,
    pub name_embedding: Vec<f32>,
}

/// Summary statistics for a catalog import.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportStats {
    /// Rows parsed from the input file.
    pub read: usize,
    /// Documents the engine accepted.
    pub imported: usize,
    /// Rows dropped before indexing (unparsable line or unusable embedding).
    pub skipped: usize,
    /// Documents the engine rejected.
    pub failed: usize,
    pub duration_ms: u128,
}
