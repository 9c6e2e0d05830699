//! Catalog import and collection administration.
//!
//! The import reads a JSONL export of the product catalog, embeds each name with
//! the same normalization rules the query side uses, and pushes documents to
//! Typesense in batches. When a batch request fails as a whole, its documents are
//! created one by one so a single bad row does not sink the batch.

use std::path::Path;
use std::time::Instant;

use serde_json::{Value, json};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::embedding::{EmbeddingsProvider, embed_validated};
use crate::errors::catalog_error::CatalogError;
use crate::normalize::NormalizedQuery;
use crate::structs::catalog_config::{CatalogConfig, NormalizerRules};
use crate::structs::catalog_store::{ImportStats, ProductDocument, ProductRow};
use crate::typesense::CatalogAdmin;

/// Collection schema for the product catalog.
pub fn catalog_schema(cfg: &CatalogConfig) -> Value {
    json!({
        "name": cfg.typesense.collection,
        "fields": [
            {"name": "id", "type": "string"},
            {
                "name": "name",
                "type": "string",
                "token_separators": ["-", ".", "/", "(", ")"],
                "symbols_to_index": [],
                "infix": true
            },
            {"name": "barcode", "type": "string", "optional": true},
            {"name": "unit", "type": "string", "optional": true},
            {"name": cfg.search.vector_field, "type": "float[]", "num_dim": cfg.embedding.dim}
        ],
        "hnsw_params": {"M": 32, "ef_construction": 400}
    })
}

/// Drop the collection if it exists, then create it from `schema`.
pub async fn reset_collection(
    admin: &dyn CatalogAdmin,
    schema: &Value,
) -> Result<Value, CatalogError> {
    match admin.delete_collection().await {
        Ok(()) => info!(target: "catalog_search::import", "deleted existing collection"),
        Err(CatalogError::NotFound(_)) => {
            info!(target: "catalog_search::import", "no existing collection to delete")
        }
        Err(err) => warn!(
            target: "catalog_search::import",
            error = %err,
            "collection delete failed, creating anyway"
        ),
    }
    let created = admin.create_collection(schema).await?;
    info!(
        target: "catalog_search::import",
        name = ?created.get("name"),
        "collection created"
    );
    Ok(created)
}

/// Current collection schema as reported by the engine.
pub async fn describe_collection(admin: &dyn CatalogAdmin) -> Result<Value, CatalogError> {
    admin.retrieve_collection().await
}

pub async fn drop_collection(admin: &dyn CatalogAdmin) -> Result<(), CatalogError> {
    admin.delete_collection().await?;
    info!(target: "catalog_search::import", "collection deleted");
    Ok(())
}

/// Reset the collection and import every row of the JSONL file at `path`.
pub async fn import_catalog<P: AsRef<Path>>(
    admin: &dyn CatalogAdmin,
    embedder: &dyn EmbeddingsProvider,
    cfg: &CatalogConfig,
    path: P,
) -> Result<ImportStats, CatalogError> {
    let started = Instant::now();
    reset_collection(admin, &catalog_schema(cfg)).await?;

    let file = File::open(path.as_ref()).await?;
    let mut lines = BufReader::new(file).lines();

    let batch_size = cfg.import.batch_size.max(1);
    let mut stats = ImportStats::default();
    let mut batch: Vec<ProductDocument> = Vec::with_capacity(batch_size);
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let row: ProductRow = match serde_json::from_str(&line) {
            Ok(row) => row,
            Err(err) => {
                warn!(
                    target: "catalog_search::import",
                    line = line_no,
                    error = %err,
                    "skipping unparsable line"
                );
                stats.skipped += 1;
                continue;
            }
        };
        stats.read += 1;

        match build_document(
            row,
            stats.read - 1,
            embedder,
            &cfg.normalizer,
            cfg.embedding.dim,
        )
        .await
        {
            Some(doc) => batch.push(doc),
            None => stats.skipped += 1,
        }

        if batch.len() >= batch_size {
            flush_batch(admin, &mut batch, &mut stats).await;
        }
    }
    if !batch.is_empty() {
        flush_batch(admin, &mut batch, &mut stats).await;
    }

    stats.duration_ms = started.elapsed().as_millis();
    info!(
        target: "catalog_search::import",
        read = stats.read,
        imported = stats.imported,
        skipped = stats.skipped,
        failed = stats.failed,
        duration_ms = stats.duration_ms as u64,
        "catalog import finished"
    );
    Ok(stats)
}

/// Turn one catalog row into an indexable document.
///
/// Returns `None` when the name is present but its embedding is unusable.
/// An empty name is indexed with a zero vector. `index` is the row position,
/// used for synthetic ids.
pub async fn build_document(
    row: ProductRow,
    index: usize,
    embedder: &dyn EmbeddingsProvider,
    rules: &NormalizerRules,
    dim: usize,
) -> Option<ProductDocument> {
    let name = scalar_text(row.name.as_ref()).unwrap_or_default();

    let name_embedding = if name.trim().is_empty() {
        vec![0.0; dim]
    } else {
        let query = NormalizedQuery::from_raw(&name, rules);
        match embed_validated(embedder, query.embedding_input(), dim).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(
                    target: "catalog_search::import",
                    name = %name,
                    error = %err,
                    "invalid embedding, row skipped"
                );
                return None;
            }
        }
    };

    let id = scalar_text(row.id.as_ref()).unwrap_or_else(|| format!("missing_id_{index}"));
    Some(ProductDocument {
        id,
        name,
        barcode: scalar_text(row.barcode.as_ref()).unwrap_or_default(),
        unit: scalar_text(row.unit.as_ref()).unwrap_or_default(),
        name_embedding,
    })
}

/// Non-empty string or number, rendered as text.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn flush_batch(
    admin: &dyn CatalogAdmin,
    batch: &mut Vec<ProductDocument>,
    stats: &mut ImportStats,
) {
    let docs = std::mem::take(batch);
    match admin.import_documents(&docs).await {
        Ok(results) => {
            for (doc, res) in docs.iter().zip(results.iter()) {
                if res.success {
                    stats.imported += 1;
                } else {
                    stats.failed += 1;
                    warn!(
                        target: "catalog_search::import",
                        id = %doc.id,
                        error = ?res.error,
                        "document rejected"
                    );
                }
            }
            // Engine answered with fewer lines than documents sent.
            stats.failed += docs.len().saturating_sub(results.len());
            info!(
                target: "catalog_search::import",
                docs = docs.len(),
                "batch imported"
            );
        }
        Err(err) => {
            warn!(
                target: "catalog_search::import",
                docs = docs.len(),
                error = %err,
                "batch import failed, creating documents one by one"
            );
            for doc in &docs {
                match admin.create_document(doc).await {
                    Ok(()) => {
                        stats.imported += 1;
                        debug!(target: "catalog_search::import", id = %doc.id, "fallback create ok");
                    }
                    Err(err) => {
                        stats.failed += 1;
                        warn!(
                            target: "catalog_search::import",
                            id = %doc.id,
                            name = %doc.name,
                            error = %err,
                            "fallback create failed"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::*;
    use crate::embedding::tests::FakeEmbedder;
    use crate::typesense::ImportLineResult;

    #[derive(Default)]
    struct FakeAdmin {
        fail_batches: bool,
        reject_ids: Vec<String>,
        collection_exists: bool,
        log: Mutex<Vec<String>>,
        batches: Mutex<Vec<Vec<ProductDocument>>>,
        created: Mutex<Vec<ProductDocument>>,
    }

    impl FakeAdmin {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl CatalogAdmin for FakeAdmin {
        fn create_collection<'a>(
            &'a self,
            schema: &'a Value,
        ) -> BoxFuture<'a, Result<Value, CatalogError>> {
            self.log.lock().unwrap().push("create".into());
            let out = Ok(schema.clone());
            Box::pin(async move { out })
        }

        fn delete_collection(&self) -> BoxFuture<'_, Result<(), CatalogError>> {
            self.log.lock().unwrap().push("delete".into());
            let out = if self.collection_exists {
                Ok(())
            } else {
                Err(CatalogError::NotFound("collection".into()))
            };
            Box::pin(async move { out })
        }

        fn retrieve_collection(&self) -> BoxFuture<'_, Result<Value, CatalogError>> {
            Box::pin(async { Ok(json!({"name": "products", "num_documents": 0})) })
        }

        fn import_documents<'a>(
            &'a self,
            docs: &'a [ProductDocument],
        ) -> BoxFuture<'a, Result<Vec<ImportLineResult>, CatalogError>> {
            self.batches.lock().unwrap().push(docs.to_vec());
            let out = if self.fail_batches {
                Err(CatalogError::SearchEngine("503 Not Ready".into()))
            } else {
                Ok(docs
                    .iter()
                    .map(|d| ImportLineResult {
                        success: !self.reject_ids.contains(&d.id),
                        error: None,
                    })
                    .collect())
            };
            Box::pin(async move { out })
        }

        fn create_document<'a>(
            &'a self,
            doc: &'a ProductDocument,
        ) -> BoxFuture<'a, Result<(), CatalogError>> {
            let out = if self.reject_ids.contains(&doc.id) {
                Err(CatalogError::SearchEngine("bad document".into()))
            } else {
                self.created.lock().unwrap().push(doc.clone());
                Ok(())
            };
            Box::pin(async move { out })
        }
    }

    fn config(batch_size: usize) -> CatalogConfig {
        let mut cfg = CatalogConfig::default();
        cfg.embedding.dim = 2;
        cfg.import.batch_size = batch_size;
        cfg
    }

    fn jsonl(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn schema_uses_configured_dimension() {
        let mut cfg = CatalogConfig::default();
        cfg.embedding.dim = 384;
        let schema = catalog_schema(&cfg);
        assert_eq!(schema["name"], "products");
        assert_eq!(schema["fields"][4]["name"], "name_embedding");
        assert_eq!(schema["fields"][4]["num_dim"], 384);
        assert_eq!(schema["fields"][1]["infix"], true);
        assert_eq!(schema["hnsw_params"]["M"], 32);
    }

    #[tokio::test]
    async fn reset_tolerates_missing_collection() {
        let admin = FakeAdmin::default();
        let schema = catalog_schema(&config(10));
        reset_collection(&admin, &schema).await.unwrap();
        assert_eq!(admin.log(), vec!["delete", "create"]);
    }

    #[tokio::test]
    async fn rows_become_documents_with_defaults() {
        let embedder = FakeEmbedder::ok(vec![3.0, 4.0]);
        let rules = NormalizerRules::default();

        let doc = build_document(
            ProductRow {
                id: Some(json!(1042)),
                barcode: None,
                name: Some("Refresh-tears mắt 15ml HQ.".into()),
                unit: None,
            },
            0,
            &embedder,
            &rules,
            2,
        )
        .await
        .unwrap();
        assert_eq!(doc.id, "1042");
        assert_eq!(doc.barcode, "");
        assert_eq!(doc.unit, "");
        assert!((doc.name_embedding[0] - 0.6).abs() < 1e-6);
        assert_eq!(embedder.calls(), vec!["refresh tears mat 15ml".to_string()]);

        let unnamed = build_document(ProductRow::default(), 7, &embedder, &rules, 2)
            .await
            .unwrap();
        assert_eq!(unnamed.id, "missing_id_7");
        assert_eq!(unnamed.name_embedding, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn numeric_fields_are_rendered_as_text() {
        let row: ProductRow =
            serde_json::from_str(r#"{"id": "A1", "barcode": 8934567001, "name": "Gel", "unit": 10}"#)
                .unwrap();
        let embedder = FakeEmbedder::ok(vec![1.0, 0.0]);
        let doc = build_document(row, 0, &embedder, &NormalizerRules::default(), 2)
            .await
            .unwrap();
        assert_eq!(doc.unit, "10");
        assert_eq!(doc.barcode, "8934567001");
        assert_eq!(doc.name, "Gel");
    }

    #[tokio::test]
    async fn numeric_unit_line_is_imported() {
        let file = jsonl(&[r#"{"id": "A1", "name": "Gel", "unit": 10}"#]);
        let admin = FakeAdmin::default();
        let embedder = FakeEmbedder::ok(vec![1.0, 0.0]);

        let stats = import_catalog(&admin, &embedder, &config(10), file.path())
            .await
            .unwrap();
        assert_eq!(stats.read, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.imported, 1);
        assert_eq!(admin.batches.lock().unwrap()[0][0].unit, "10");
    }

    #[tokio::test]
    async fn unusable_embedding_skips_the_row() {
        let embedder = FakeEmbedder::ok(vec![0.0, 0.0]);
        let row = ProductRow {
            name: Some("Gel".into()),
            ..Default::default()
        };
        assert!(
            build_document(row, 0, &embedder, &NormalizerRules::default(), 2)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn import_batches_and_counts() {
        let file = jsonl(&[
            r#"{"id": "A1", "barcode": "893001", "name": "Refresh Tears", "unit": "Lo"}"#,
            r#"{"id": "A2", "name": "Enterogermina"}"#,
            "not json",
            "",
            r#"{"id": "A3", "name": "Gel"}"#,
        ]);
        let admin = FakeAdmin {
            collection_exists: true,
            reject_ids: vec!["A3".into()],
            ..Default::default()
        };
        let embedder = FakeEmbedder::ok(vec![1.0, 1.0]);

        let stats = import_catalog(&admin, &embedder, &config(2), file.path())
            .await
            .unwrap();
        assert_eq!(stats.read, 3);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.failed, 1);

        let batches = admin.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1][0].id, "A3");
    }

    #[tokio::test]
    async fn failed_batch_falls_back_to_single_creates() {
        let file = jsonl(&[
            r#"{"id": "A1", "name": "Refresh Tears"}"#,
            r#"{"id": "A2", "name": "Enterogermina"}"#,
            r#"{"id": "A3", "name": "Gel"}"#,
        ]);
        let admin = FakeAdmin {
            fail_batches: true,
            reject_ids: vec!["A2".into()],
            ..Default::default()
        };
        let embedder = FakeEmbedder::ok(vec![1.0, 0.0]);

        let stats = import_catalog(&admin, &embedder, &config(2), file.path())
            .await
            .unwrap();
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.failed, 1);

        let created: Vec<_> = admin
            .created
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(created, vec!["A1", "A3"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let admin = FakeAdmin::default();
        let embedder = FakeEmbedder::ok(vec![1.0, 0.0]);
        let err = import_catalog(&admin, &embedder, &config(2), "/nonexistent/catalog.jsonl")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
