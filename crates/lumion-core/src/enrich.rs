//! Enrichment jobs: batch embeddings and LLM graph extraction.
//!
//! Both jobs read the current snapshot, rewrite one or two tables in the
//! artifact directory (Parquet and JSON lines), and install a new
//! snapshot. Per-row failures are counted, never fatal. Persistence
//! failures come back as `saved: false` with a reason.
//!
//! Jobs must not run concurrently with each other; the engine does not
//! serialize them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use lumion_db::{save_table, LoadedTable, Row, Table, TableEncoding};
use lumion_model::Embedding;

use crate::constants::{DOCUMENT_ID_COLUMN, EMBEDDING_COLUMN, ENTITIES_TABLE, RELATIONSHIPS_TABLE, TEXT_UNITS_TABLE};
use crate::engine::RetrievalEngine;
use crate::graph::{extraction_prompt, parse_graph_response};
use crate::scorer::cell_text;

/// Which enrichment job produced a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentJob {
    Embeddings,
    Graph,
}

/// Outcome of an enrichment job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentStatus {
    pub job: EnrichmentJob,
    /// Rows that received an embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
    /// Entities extracted across all rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<usize>,
    /// Relationships extracted across all rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<usize>,
    /// Rows whose provider call or parse failed.
    pub failed: usize,
    /// Whether the rewritten tables reached disk.
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl EnrichmentStatus {
    fn new(job: EnrichmentJob) -> Self {
        Self {
            job,
            updated: None,
            entities: None,
            relationships: None,
            failed: 0,
            saved: false,
            reason: None,
            finished_at: Utc::now(),
        }
    }

    fn skipped(job: EnrichmentJob, reason: &str) -> Self {
        debug!("{:?} enrichment skipped: {}", job, reason);
        Self {
            reason: Some(reason.to_string()),
            ..Self::new(job)
        }
    }
}

impl RetrievalEngine {
    /// Embed every text unit and persist the `embedding` column.
    pub fn enrich_embeddings(&self) -> EnrichmentStatus {
        self.enrich_embeddings_with(&mut |_, _| {})
    }

    /// [`Self::enrich_embeddings`] reporting `(done, total)` after each row.
    pub fn enrich_embeddings_with(&self, progress: &mut dyn FnMut(usize, usize)) -> EnrichmentStatus {
        let job = EnrichmentJob::Embeddings;
        if !self.embedder().is_configured() {
            return EnrichmentStatus::skipped(job, "no embedding provider configured");
        }

        let snapshot = self.snapshot();
        let Some(dir) = snapshot.artifact_dir() else {
            return EnrichmentStatus::skipped(job, "no artifact directory found");
        };
        let Some(table) = snapshot.text_units.table() else {
            return EnrichmentStatus::skipped(job, "text units table is not available");
        };
        let Some(text_column) = snapshot.text_column() else {
            return EnrichmentStatus::skipped(job, "text units table has no text column");
        };

        info!("Embedding {} text units", table.len());
        let total = table.len();
        let mut status = EnrichmentStatus::new(job);
        let (mut updated, mut failed) = (0usize, 0usize);

        let values: Vec<Value> = (0..total)
            .map(|i| {
                let value = match self.embedder().embed(&cell_text(table.get(i, text_column))) {
                    Embedding::Vector(vector) => {
                        updated += 1;
                        json!(vector)
                    }
                    Embedding::Unavailable => {
                        failed += 1;
                        Value::Null
                    }
                };
                progress(i + 1, total);
                value
            })
            .collect();

        let enriched = table.clone().with_column(EMBEDDING_COLUMN, values);
        match save_table(dir, TEXT_UNITS_TABLE, &enriched) {
            Ok(()) => status.saved = true,
            Err(e) => {
                warn!("Failed to persist embeddings: {}", e);
                status.reason = Some(e.to_string());
            }
        }

        self.install_snapshot(snapshot.with_text_units(LoadedTable::Present {
            table: enriched,
            encoding: TableEncoding::Parquet,
        }));

        info!("Embedded {} text units ({} failed)", updated, failed);
        status.updated = Some(updated);
        status.failed = failed;
        status.finished_at = Utc::now();
        status
    }

    /// Extract a code graph from up to `limit` text units with the LLM.
    ///
    /// The extracted entities and relationships replace the existing tables.
    pub fn enrich_graph(&self, limit: usize) -> EnrichmentStatus {
        self.enrich_graph_with(limit, &mut |_, _| {})
    }

    /// [`Self::enrich_graph`] reporting `(done, total)` after each row.
    pub fn enrich_graph_with(&self, limit: usize, progress: &mut dyn FnMut(usize, usize)) -> EnrichmentStatus {
        let job = EnrichmentJob::Graph;
        let Some(model) = self.completion() else {
            return EnrichmentStatus::skipped(job, "no completion model configured");
        };

        let snapshot = self.snapshot();
        let Some(dir) = snapshot.artifact_dir() else {
            return EnrichmentStatus::skipped(job, "no artifact directory found");
        };
        let Some(table) = snapshot.text_units.table() else {
            return EnrichmentStatus::skipped(job, "text units table is not available");
        };
        let Some(text_column) = snapshot.text_column() else {
            return EnrichmentStatus::skipped(job, "text units table has no text column");
        };

        let total = table.len().min(limit);
        info!("Extracting graph from {} text units with {}", total, model.name());

        let mut status = EnrichmentStatus::new(job);
        let mut entity_rows: Vec<Row> = Vec::new();
        let mut relationship_rows: Vec<Row> = Vec::new();

        for i in 0..total {
            let document_id = cell_text(table.get(i, DOCUMENT_ID_COLUMN));
            let prompt = extraction_prompt(&cell_text(table.get(i, text_column)));

            match model.complete(&prompt).map(|text| parse_graph_response(&text)) {
                Ok(Some(graph)) => {
                    entity_rows.extend(graph.entity_rows(&document_id));
                    relationship_rows.extend(graph.relationship_rows(&document_id));
                }
                Ok(None) => {
                    debug!("Row {}: response was not a graph", i);
                    status.failed += 1;
                }
                Err(e) => {
                    warn!("Row {}: graph extraction failed: {}", i, e);
                    status.failed += 1;
                }
            }
            progress(i + 1, total);
        }

        let entities = Table::new(
            columns(&["id", "name", "type", "description", DOCUMENT_ID_COLUMN]),
            entity_rows,
        );
        let relationships = Table::new(
            columns(&["source", "target", "type", DOCUMENT_ID_COLUMN]),
            relationship_rows,
        );

        let saved = save_table(dir, ENTITIES_TABLE, &entities)
            .and_then(|()| save_table(dir, RELATIONSHIPS_TABLE, &relationships));
        match saved {
            Ok(()) => status.saved = true,
            Err(e) => {
                warn!("Failed to persist extracted graph: {}", e);
                status.reason = Some(e.to_string());
            }
        }

        info!(
            "Extracted {} entities and {} relationships ({} rows failed)",
            entities.len(),
            relationships.len(),
            status.failed
        );
        status.entities = Some(entities.len());
        status.relationships = Some(relationships.len());
        status.finished_at = Utc::now();

        self.install_snapshot(snapshot.with_graph(
            LoadedTable::Present {
                table: entities,
                encoding: TableEncoding::Parquet,
            },
            LoadedTable::Present {
                table: relationships,
                encoding: TableEncoding::Parquet,
            },
        ));
        status
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use lumion_model::{CompletionModel, EmbeddingChain, EmbeddingProvider, ModelError, ModelResult};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[derive(Debug)]
    struct LengthEmbedder;

    impl EmbeddingProvider for LengthEmbedder {
        fn name(&self) -> &str {
            "length"
        }

        fn embed(&self, text: &str) -> ModelResult<Vec<f32>> {
            if text.contains("fail") {
                return Err(ModelError::http("length", "refused"));
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[derive(Debug)]
    struct ScriptedModel;

    impl CompletionModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete(&self, prompt: &str) -> ModelResult<String> {
            if prompt.contains("garbage") {
                return Ok("no graph here".to_string());
            }
            Ok(r#"Result: {"entities": [{"id": "cmp_Page", "name": "Page", "type": "Component"}],
                "relationships": [{"source": "cmp_Page", "target": "cmp_Header", "type": "RENDERS"}]}"#
                .to_string())
        }
    }

    fn setup(lines: &[&str]) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("out").join("1").join("artifacts");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("create_final_text_units.json"), lines.join("\n")).unwrap();
        (tmp, dir)
    }

    fn engine(root: &Path) -> RetrievalEngine {
        RetrievalEngine::new(EngineConfig {
            index_path: PathBuf::from("out"),
            ..EngineConfig::for_root(root)
        })
    }

    #[test]
    fn test_embeddings_require_provider() {
        let (tmp, _) = setup(&[r#"{"text": "alpha"}"#]);
        let status = engine(tmp.path()).enrich_embeddings();
        assert!(!status.saved);
        assert_eq!(status.reason.as_deref(), Some("no embedding provider configured"));
        assert_eq!(status.updated, None);
    }

    #[test]
    fn test_embeddings_count_failures_and_persist() {
        let (tmp, dir) = setup(&[r#"{"text": "alpha"}"#, r#"{"text": "fail here"}"#]);
        let engine = engine(tmp.path()).with_embedder(EmbeddingChain::new(vec![Box::new(LengthEmbedder)]));

        let mut calls = Vec::new();
        let status = engine.enrich_embeddings_with(&mut |done, total| calls.push((done, total)));
        assert!(status.saved, "{:?}", status.reason);
        assert_eq!(status.updated, Some(1));
        assert_eq!(status.failed, 1);
        assert_eq!(calls, vec![(1, 2), (2, 2)]);
        assert!(dir.join("create_final_text_units.parquet").exists());

        let snapshot = engine.snapshot();
        let table = snapshot.text_units.table().unwrap();
        assert_eq!(table.get(0, EMBEDDING_COLUMN), Some(&json!([5.0, 1.0])));
        assert_eq!(table.get(1, EMBEDDING_COLUMN), None);
    }

    #[test]
    fn test_graph_requires_model() {
        let (tmp, _) = setup(&[r#"{"text": "alpha"}"#]);
        let status = engine(tmp.path()).without_completion_model().enrich_graph(10);
        assert_eq!(status.reason.as_deref(), Some("no completion model configured"));
        assert!(!status.saved);
    }

    #[test]
    fn test_graph_replaces_tables() {
        let (tmp, dir) = setup(&[
            r#"{"document_id": "src/app/page.tsx", "text": "export default function Page() {}"}"#,
            r#"{"document_id": "src/lib/x.ts", "text": "garbage"}"#,
            r#"{"document_id": "src/lib/y.ts", "text": "never reached"}"#,
        ]);
        fs::write(dir.join("create_final_entities.json"), r#"{"id": "old", "name": "Old", "type": "File"}"#).unwrap();
        let engine = engine(tmp.path()).with_completion_model(Box::new(ScriptedModel));

        let status = engine.enrich_graph(2);
        assert!(status.saved, "{:?}", status.reason);
        assert_eq!(status.entities, Some(1));
        assert_eq!(status.relationships, Some(1));
        assert_eq!(status.failed, 1);

        let snapshot = engine.snapshot();
        let entities = snapshot.entities.table().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities.get(0, "id"), Some(&json!("cmp_Page")));
        assert_eq!(entities.get(0, "document_id"), Some(&json!("src/app/page.tsx")));

        let reloaded = lumion_db::load_table(Some(&dir), ENTITIES_TABLE);
        assert_eq!(reloaded.encoding(), Some(TableEncoding::Parquet));
        assert_eq!(reloaded.row_count(), Some(1));
    }
}
