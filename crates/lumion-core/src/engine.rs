//! Retrieval engine – the orchestrator for every query mode.
//!
//! The [`RetrievalEngine`] locates the active artifact directory, keeps the
//! loaded [`Snapshot`] cached, and answers local, global and drift queries
//! over it. Enrichment jobs live in [`crate::enrich`].

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, warn};

use lumion_db::{locate_latest_artifacts, TableEncoding};
use lumion_model::{create_completion_model, CompletionModel, EmbeddingChain};

use crate::config::EngineConfig;
use crate::constants::{
    COMMUNITY_RANKING_COLUMNS, GROUNDED_CONFIDENCE, NO_COMMUNITY_ANSWER, NO_CONTEXT_ANSWER,
    REPORT_COLUMNS, UNGROUNDED_CONFIDENCE,
};
use crate::errors::CoreResult;
use crate::filters::DocumentFilter;
use crate::relations::RelationMatcher;
use crate::scorer::{cell_text, lexical_score, preview};
use crate::search::{
    join_previews, rank_text_units, CommunityHit, DriftSearchRequest, DriftSearchResult,
    EntityHit, GlobalSearchRequest, GlobalSearchResult, LocalSearchRequest, LocalSearchResult,
    RankOptions, TimelineEntry, TimelineMetrics,
};
use crate::snapshot::Snapshot;

// ============================================================================
// Status types
// ============================================================================

/// Details of one entity, looked up by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityContext {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

/// Load state of one artifact table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStatus {
    pub name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<TableEncoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

/// What the engine currently serves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatus {
    /// Configured base path, resolved against the repository root.
    pub index_path: PathBuf,
    /// Selected artifact directory, if any.
    pub artifact_dir: Option<PathBuf>,
    pub text_column: Option<String>,
    pub tables: Vec<TableStatus>,
    pub embedding_providers: Vec<String>,
    pub completion_model: Option<String>,
}

// ============================================================================
// RetrievalEngine
// ============================================================================

/// Answers questions over the latest indexed artifacts.
///
/// # Construction
///
/// Use [`RetrievalEngine::with_defaults`] to load `~/.lumion/config.yaml`
/// and the environment, or [`RetrievalEngine::new`] with an explicit
/// config. Providers can be swapped with [`RetrievalEngine::with_embedder`]
/// and [`RetrievalEngine::with_completion_model`].
///
/// # Example
///
/// ```ignore
/// use lumion_core::{EngineConfig, LocalSearchRequest, RetrievalEngine};
///
/// let engine = RetrievalEngine::new(EngineConfig::for_root("."));
/// let result = engine.local_search(&LocalSearchRequest::new("what calls graphAPI"));
/// println!("{}", result.answer);
/// ```
#[derive(Debug)]
pub struct RetrievalEngine {
    config: EngineConfig,
    embedder: EmbeddingChain,
    completion: Option<Box<dyn CompletionModel>>,
    matcher: RelationMatcher,
    cache: RwLock<Option<Arc<Snapshot>>>,
}

impl RetrievalEngine {
    /// Create an engine whose providers come from `config.providers`.
    pub fn new(config: EngineConfig) -> Self {
        let embedder = EmbeddingChain::from_config(&config.providers);
        let completion = match create_completion_model(&config.providers) {
            Ok(model) => model,
            Err(e) => {
                warn!("Completion model unavailable: {}", e);
                None
            }
        };

        Self {
            config,
            embedder,
            completion,
            matcher: RelationMatcher::default(),
            cache: RwLock::new(None),
        }
    }

    /// Create an engine from the default config file plus the environment.
    pub fn with_defaults() -> CoreResult<Self> {
        let config = EngineConfig::load_default()?.with_env_overrides();
        Ok(Self::new(config))
    }

    /// Replace the embedding chain.
    pub fn with_embedder(mut self, embedder: EmbeddingChain) -> Self {
        self.embedder = embedder;
        self
    }

    /// Replace the completion model used by graph extraction.
    pub fn with_completion_model(mut self, model: Box<dyn CompletionModel>) -> Self {
        self.completion = Some(model);
        self
    }

    /// Remove the completion model.
    pub fn without_completion_model(mut self) -> Self {
        self.completion = None;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn embedder(&self) -> &EmbeddingChain {
        &self.embedder
    }

    pub(crate) fn completion(&self) -> Option<&dyn CompletionModel> {
        self.completion.as_deref()
    }

    // ------------------------------------------------------------------------
    // Snapshot cache
    // ------------------------------------------------------------------------

    /// The snapshot for the current latest artifact directory.
    ///
    /// The directory is re-located on every call; tables are reloaded only
    /// when it differs from the cached one.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let dir = locate_latest_artifacts(&self.config.index_path, &self.config.repo_root);

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(snapshot) = cache.as_ref() {
                if snapshot.artifact_dir() == dir.as_deref() {
                    return Arc::clone(snapshot);
                }
            }
        }

        debug!("Loading artifact snapshot from {:?}", dir);
        let snapshot = Arc::new(Snapshot::load(dir));
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Replace the cached snapshot.
    pub(crate) fn install_snapshot(&self, snapshot: Snapshot) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(Arc::new(snapshot));
    }

    /// Drop the cached snapshot so the next request reloads from disk.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = None;
    }

    // ------------------------------------------------------------------------
    // Local search
    // ------------------------------------------------------------------------

    /// Entity-grounded search over text units.
    pub fn local_search(&self, request: &LocalSearchRequest) -> LocalSearchResult {
        let snapshot = self.snapshot();
        let query_vector = self.embedder.embed(&request.query);
        let filter = DocumentFilter::compile(&request.filters, &[]);
        let options = RankOptions {
            top_k: request.top_k,
            offset: request.offset,
            min_score: request.min_score,
            filter: &filter,
            preview_chars: self.config.preview_chars,
        };

        let sources = rank_text_units(&snapshot, &request.query, query_vector.as_slice(), &options);
        let mut answer = if sources.is_empty() {
            NO_CONTEXT_ANSWER.to_string()
        } else {
            join_previews(&sources)
        };

        let entities = self.matching_entities(&snapshot, &request.query);

        let pattern = self.matcher.resolve(
            &request.query,
            snapshot.relationships.table(),
            snapshot.entities.table(),
        );
        if let Some(m) = &pattern {
            answer = m.answer();
        }

        let confidence = if !sources.is_empty() || pattern.is_some() {
            GROUNDED_CONFIDENCE
        } else {
            UNGROUNDED_CONFIDENCE
        };

        debug!(
            "local_search: {} source(s), {} entit(ies), pattern={:?}",
            sources.len(),
            entities.len(),
            pattern.as_ref().map(|m| m.pattern)
        );

        LocalSearchResult {
            answer,
            sources,
            entities,
            confidence,
            pattern: pattern.map(|m| m.pattern),
        }
    }

    /// Entities whose name shares a term with `query`, in table order.
    fn matching_entities(&self, snapshot: &Snapshot, query: &str) -> Vec<EntityHit> {
        let Some(table) = snapshot.entities.table() else {
            return Vec::new();
        };
        if !table.has_column("name") || !table.has_column("type") {
            return Vec::new();
        }

        (0..table.len())
            .filter_map(|i| {
                let name = cell_text(table.get(i, "name"));
                if name.is_empty() || lexical_score(&name, query) == 0 {
                    return None;
                }
                Some(EntityHit {
                    id: cell_text(table.get(i, "id")),
                    name,
                    kind: cell_text(table.get(i, "type")),
                })
            })
            .take(self.config.entity_limit)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Global search
    // ------------------------------------------------------------------------

    /// Community-level search over reports.
    pub fn global_search(&self, request: &GlobalSearchRequest) -> GlobalSearchResult {
        let snapshot = self.snapshot();
        let Some(table) = snapshot.community_reports.table().filter(|t| !t.is_empty()) else {
            return GlobalSearchResult::empty();
        };

        let body_column = table.first_present_column(REPORT_COLUMNS);
        let body = |i: usize| {
            body_column
                .as_deref()
                .map(|c| cell_text(table.get(i, c)))
                .unwrap_or_default()
        };
        let community_id = |i: usize| cell_text(table.get(i, "community_id"));

        let mut scored: Vec<(u32, usize)> = (0..table.len())
            .filter_map(|i| {
                let haystack = format!("{} {}", body(i), community_id(i));
                let score = lexical_score(&haystack, &request.query);
                (score > 0).then_some((score, i))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        if !scored.is_empty() {
            let communities: Vec<CommunityHit> = scored
                .into_iter()
                .take(request.top_k)
                .map(|(score, i)| CommunityHit {
                    score: f64::from(score),
                    community_id: community_id(i),
                    report_preview: preview(&body(i), self.config.preview_chars),
                })
                .collect();
            let answer = communities
                .iter()
                .map(|c| c.report_preview.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            return GlobalSearchResult {
                answer,
                communities,
                key_themes: Vec::new(),
                confidence: GROUNDED_CONFIDENCE,
                ranked_by: None,
            };
        }

        let Some(column) = table.first_present_column(COMMUNITY_RANKING_COLUMNS) else {
            return GlobalSearchResult::empty();
        };

        let mut ranked: Vec<(f64, usize)> = (0..table.len())
            .filter_map(|i| numeric(table.get(i, &column)).map(|v| (v, i)))
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let communities: Vec<CommunityHit> = ranked
            .into_iter()
            .take(request.top_k)
            .map(|(value, i)| CommunityHit {
                score: value,
                community_id: community_id(i),
                report_preview: preview(&body(i), self.config.preview_chars),
            })
            .collect();
        if communities.is_empty() {
            return GlobalSearchResult::empty();
        }

        let listing = communities
            .iter()
            .map(|c| format!("{} ({})", c.community_id, c.score))
            .collect::<Vec<_>>()
            .join(", ");
        debug!("global_search: no lexical match, ranked by '{}'", column);

        GlobalSearchResult {
            answer: format!("Top communities by {}: {}", column, listing),
            communities,
            key_themes: Vec::new(),
            confidence: GROUNDED_CONFIDENCE,
            ranked_by: Some(column),
        }
    }

    // ------------------------------------------------------------------------
    // Drift search
    // ------------------------------------------------------------------------

    /// Text unit search repeated for each period label, in order.
    pub fn drift_search(&self, request: &DriftSearchRequest) -> DriftSearchResult {
        let snapshot = self.snapshot();

        let timeline = request
            .periods
            .iter()
            .map(|period| {
                let scope = self.config.period_fragment(period).map(String::from);
                let scopes: Vec<String> = scope.iter().map(|s| regex::escape(s)).collect();
                let filter = DocumentFilter::compile(&request.filters, &scopes);

                let query = format!("{} {}", request.query, period);
                let query_vector = self.embedder.embed(&query);
                let options = RankOptions {
                    top_k: request.top_k,
                    offset: 0,
                    min_score: request.min_score,
                    filter: &filter,
                    preview_chars: self.config.preview_chars,
                };
                let citations = rank_text_units(&snapshot, &query, query_vector.as_slice(), &options);

                TimelineEntry {
                    period: period.clone(),
                    scope,
                    answer_preview: preview(&join_previews(&citations), self.config.preview_chars),
                    metrics: TimelineMetrics {
                        matches: citations.len(),
                    },
                }
            })
            .collect();

        DriftSearchResult {
            timeline,
            trends: Vec::new(),
            insights: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Look up an entity by id.
    pub fn entity_context(&self, entity_id: &str) -> Option<EntityContext> {
        let snapshot = self.snapshot();
        let table = snapshot.entities.table()?;
        if !table.has_column("id") {
            return None;
        }

        let i = (0..table.len()).find(|&i| cell_text(table.get(i, "id")) == entity_id)?;
        let optional = |column: &str| Some(cell_text(table.get(i, column))).filter(|s| !s.is_empty());
        Some(EntityContext {
            id: entity_id.to_string(),
            name: cell_text(table.get(i, "name")),
            kind: cell_text(table.get(i, "type")),
            description: optional("description"),
            document_id: optional("document_id"),
        })
    }

    /// Artifact directory and per-table load state.
    pub fn index_status(&self) -> IndexStatus {
        let snapshot = self.snapshot();
        let tables = snapshot
            .tables()
            .iter()
            .map(|(name, loaded)| TableStatus {
                name: name.to_string(),
                available: loaded.is_available(),
                encoding: loaded.encoding(),
                rows: loaded.row_count(),
            })
            .collect();

        IndexStatus {
            index_path: self.config.resolved_index_path(),
            artifact_dir: snapshot.artifact_dir().map(PathBuf::from),
            text_column: snapshot.text_column().map(String::from),
            tables,
            embedding_providers: self
                .embedder
                .provider_names()
                .into_iter()
                .map(String::from)
                .collect(),
            completion_model: self.completion.as_ref().map(|m| m.name().to_string()),
        }
    }
}

impl GlobalSearchResult {
    fn empty() -> Self {
        Self {
            answer: NO_COMMUNITY_ANSWER.to_string(),
            communities: Vec::new(),
            key_themes: Vec::new(),
            confidence: UNGROUNDED_CONFIDENCE,
            ranked_by: None,
        }
    }
}

/// A cell as a number: JSON numbers, or strings that parse as one.
fn numeric(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_run(root: &std::path::Path, run: &str, table: &str, lines: &[&str]) -> PathBuf {
        let dir = root.join("out").join(run).join("artifacts");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.json", table)), lines.join("\n")).unwrap();
        dir
    }

    fn engine(root: &std::path::Path) -> RetrievalEngine {
        let config = EngineConfig {
            index_path: PathBuf::from("out"),
            ..EngineConfig::for_root(root)
        };
        RetrievalEngine::new(config)
    }

    #[test]
    fn test_no_artifacts_gives_sentinel() {
        let tmp = TempDir::new().unwrap();
        let result = engine(tmp.path()).local_search(&LocalSearchRequest::new("anything"));
        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
        assert_eq!(result.confidence, UNGROUNDED_CONFIDENCE);
        assert!(result.sources.is_empty());
        assert!(result.entities.is_empty());
    }

    #[test]
    fn test_snapshot_reloads_when_newer_run_appears() {
        let tmp = TempDir::new().unwrap();
        write_run(tmp.path(), "100", "create_final_text_units", &[r#"{"text": "old alpha"}"#]);
        let engine = engine(tmp.path());

        let first = engine.local_search(&LocalSearchRequest::new("alpha"));
        assert_eq!(first.answer, "old alpha");
        let cached = engine.snapshot();
        assert!(Arc::ptr_eq(&cached, &engine.snapshot()));

        write_run(tmp.path(), "200", "create_final_text_units", &[r#"{"text": "new alpha"}"#]);
        let second = engine.local_search(&LocalSearchRequest::new("alpha"));
        assert_eq!(second.answer, "new alpha");
    }

    #[test]
    fn test_entities_limited_and_typed() {
        let tmp = TempDir::new().unwrap();
        let lines: Vec<String> = (0..8)
            .map(|i| format!(r#"{{"id": "e{}", "name": "Handler{}", "type": "Function"}}"#, i, i))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        write_run(tmp.path(), "1", "create_final_entities", &refs);

        let result = engine(tmp.path()).local_search(&LocalSearchRequest::new("handler"));
        assert_eq!(result.entities.len(), 5);
        assert_eq!(result.entities[0].id, "e0");
        assert_eq!(result.entities[0].kind, "Function");
        // Entities alone do not ground the answer.
        assert_eq!(result.confidence, UNGROUNDED_CONFIDENCE);
    }

    #[test]
    fn test_global_fallback_ranking() {
        let tmp = TempDir::new().unwrap();
        write_run(
            tmp.path(),
            "1",
            "create_final_community_reports",
            &[
                r#"{"community_id": "c1", "report": "routing layer", "density": 0.25}"#,
                r#"{"community_id": "c2", "report": "data access", "density": 0.75}"#,
            ],
        );

        let result = engine(tmp.path()).global_search(&GlobalSearchRequest::new("billing"));
        assert_eq!(result.answer, "Top communities by density: c2 (0.75), c1 (0.25)");
        assert_eq!(result.ranked_by.as_deref(), Some("density"));
        assert_eq!(result.confidence, GROUNDED_CONFIDENCE);
        assert!(result.key_themes.is_empty());
    }

    #[test]
    fn test_global_lexical_hit() {
        let tmp = TempDir::new().unwrap();
        write_run(
            tmp.path(),
            "1",
            "create_final_community_reports",
            &[
                r#"{"community_id": "c1", "report": "routing layer"}"#,
                r#"{"community_id": "c2", "report": "data access layer"}"#,
            ],
        );

        let result = engine(tmp.path()).global_search(&GlobalSearchRequest::new("data layer"));
        assert_eq!(result.communities.len(), 2);
        assert_eq!(result.communities[0].community_id, "c2");
        assert_eq!(result.answer, "data access layer\nrouting layer");
    }

    #[test]
    fn test_global_without_ranking_column() {
        let tmp = TempDir::new().unwrap();
        write_run(
            tmp.path(),
            "1",
            "create_final_community_reports",
            &[r#"{"community_id": "c1", "report": "routing"}"#],
        );
        let result = engine(tmp.path()).global_search(&GlobalSearchRequest::new("billing"));
        assert_eq!(result.answer, NO_COMMUNITY_ANSWER);
        assert_eq!(result.confidence, UNGROUNDED_CONFIDENCE);
    }

    #[test]
    fn test_entity_context() {
        let tmp = TempDir::new().unwrap();
        write_run(
            tmp.path(),
            "1",
            "create_final_entities",
            &[r#"{"id": "fn_a", "name": "Handler", "type": "Function", "description": "Handles requests"}"#],
        );
        let engine = engine(tmp.path());

        let context = engine.entity_context("fn_a").unwrap();
        assert_eq!(context.name, "Handler");
        assert_eq!(context.description.as_deref(), Some("Handles requests"));
        assert!(context.document_id.is_none());
        assert!(engine.entity_context("missing").is_none());
    }

    #[test]
    fn test_index_status() {
        let tmp = TempDir::new().unwrap();
        let dir = write_run(tmp.path(), "7", "create_final_text_units", &[r#"{"content": "x"}"#]);

        let status = engine(tmp.path()).index_status();
        assert_eq!(status.artifact_dir.as_deref(), Some(dir.as_path()));
        assert_eq!(status.text_column.as_deref(), Some("content"));
        assert_eq!(status.tables.len(), 4);
        assert!(status.tables[0].available);
        assert_eq!(status.tables[0].rows, Some(1));
        assert_eq!(status.tables[0].encoding, Some(TableEncoding::Json));
        assert!(!status.tables[1].available);
        assert!(status.embedding_providers.is_empty());
    }
}
