//! Trim raw engine hits down to the public match contract.

use serde_json::{Map, Value};
use tracing::warn;

use crate::structs::catalog_store::RawHit;
use crate::structs::match_result::{MatchHit, TrimmedDocument};

/// Keep `{id, name, barcode, unit}` and the engine scores; drop everything else.
///
/// A record missing one of the four fields is reported on this hit alone.
pub fn shape_hit(hit: RawHit) -> MatchHit {
    let RawHit {
        document,
        text_match,
        vector_distance,
    } = hit;

    match trim_document(&document) {
        Ok(doc) => MatchHit {
            document: Some(doc),
            text_match,
            vector_distance,
            error: None,
        },
        Err(field) => {
            warn!(
                target: "catalog_search::shaping",
                id = ?document.get("id"),
                field,
                "catalog record is missing a required field"
            );
            MatchHit {
                document: None,
                text_match,
                vector_distance,
                error: Some(format!("missing field: {field}")),
            }
        }
    }
}

pub fn shape_hits(hits: Vec<RawHit>) -> Vec<MatchHit> {
    hits.into_iter().map(shape_hit).collect()
}

/// Returns the name of the first missing field on failure.
fn trim_document(doc: &Map<String, Value>) -> Result<TrimmedDocument, &'static str> {
    Ok(TrimmedDocument {
        id: scalar_field(doc, "id")?,
        name: scalar_field(doc, "name")?,
        barcode: scalar_field(doc, "barcode")?,
        unit: scalar_field(doc, "unit")?,
    })
}

/// Strings pass through, numbers are rendered; anything else counts as missing.
fn scalar_field(doc: &Map<String, Value>, key: &'static str) -> Result<String, &'static str> {
    match doc.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(key),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(doc: Value) -> RawHit {
        RawHit {
            document: doc.as_object().cloned().unwrap(),
            text_match: Some(42),
            vector_distance: Some(0.3),
        }
    }

    #[test]
    fn extra_fields_are_dropped() {
        let hit = shape_hit(raw(json!({
            "id": "SP001",
            "name": "Refresh Tears 15ml",
            "barcode": "8934567",
            "unit": "Lọ",
            "name_embedding": [0.1, 0.2, 0.3],
            "price": 52000,
        })));
        let out = serde_json::to_value(&hit).unwrap();
        let doc = out["document"].as_object().unwrap();
        let mut keys: Vec<_> = doc.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["barcode", "id", "name", "unit"]);
        assert_eq!(out["text_match"], 42);
        assert_eq!(out["vector_distance"], 0.3);
        assert!(out.get("error").is_none());
    }

    #[test]
    fn numeric_fields_are_rendered_as_strings() {
        let hit = shape_hit(raw(json!({
            "id": "SP002", "name": "Gel", "barcode": 8934567001_u64, "unit": "Tube",
        })));
        assert_eq!(hit.document.unwrap().barcode, "8934567001");
    }

    #[test]
    fn missing_field_marks_only_that_hit() {
        let hits = shape_hits(vec![
            raw(json!({"id": "1", "name": "A", "barcode": "", "unit": ""})),
            raw(json!({"id": "2", "name": "B", "unit": ""})),
            raw(json!({"id": "3", "name": "C", "barcode": "", "unit": ""})),
        ]);
        assert_eq!(hits.len(), 3);
        assert!(hits[0].document.is_some());
        assert!(hits[1].document.is_none());
        assert_eq!(hits[1].error.as_deref(), Some("missing field: barcode"));
        assert!(hits[2].document.is_some());
    }
}
