//! Search requests, results and the shared text unit ranking.
//!
//! ## Ranking pipeline
//!
//! 1. Score every text unit: lexical over the text column plus cosine
//!    against the stored embedding.
//! 2. Drop rows failing the document filter, and rows scoring `<= 0`.
//! 3. Stable sort by score, descending.
//! 4. Skip `offset`, take `top_k`, then drop rows below `min_score`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_TOP_K, EMBEDDING_COLUMN, PASSTHROUGH_COLUMNS, DOCUMENT_ID_COLUMN};
use crate::filters::{DocumentFilter, SearchFilters};
use crate::relations::RelationPattern;
use crate::scorer::{cell_text, combined_score, parse_embedding, preview};
use crate::snapshot::Snapshot;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

// ============================================================================
// Requests
// ============================================================================

/// A prior turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Entity-grounded search over text units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSearchRequest {
    pub query: String,

    /// Conversation so far. Carried with the request; not used for scoring.
    #[serde(default)]
    pub history: Vec<HistoryMessage>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub offset: usize,

    #[serde(default)]
    pub min_score: f64,

    #[serde(default)]
    pub filters: SearchFilters,
}

impl LocalSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            top_k: DEFAULT_TOP_K,
            offset: 0,
            min_score: 0.0,
            filters: SearchFilters::default(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Community-level search over reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSearchRequest {
    pub query: String,

    #[serde(default)]
    pub history: Vec<HistoryMessage>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl GlobalSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Text unit search repeated per labelled period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSearchRequest {
    pub query: String,

    /// Period labels, answered in this order.
    pub periods: Vec<String>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub min_score: f64,

    #[serde(default)]
    pub filters: SearchFilters,
}

impl DriftSearchRequest {
    pub fn new<I, S>(query: impl Into<String>, periods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            periods: periods.into_iter().map(Into::into).collect(),
            top_k: DEFAULT_TOP_K,
            min_score: 0.0,
            filters: SearchFilters::default(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// A ranked text unit backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub score: f64,
    pub row_index: usize,
    pub text_preview: String,
    /// Identifying columns present in the table (`document_id`, `chunk_id`, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// An entity whose name matches the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityHit {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalSearchResult {
    pub answer: String,
    pub sources: Vec<Citation>,
    pub entities: Vec<EntityHit>,
    /// 0.5 when grounded in citations or graph matches, else 0.1. Not calibrated.
    pub confidence: f64,
    /// Relation pattern that replaced the answer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<RelationPattern>,
}

/// A community report in a global answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityHit {
    /// Lexical score, or the ranking column value for fallback answers.
    pub score: f64,
    pub community_id: String,
    pub report_preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSearchResult {
    pub answer: String,
    pub communities: Vec<CommunityHit>,
    /// Always empty.
    pub key_themes: Vec<String>,
    pub confidence: f64,
    /// Numeric column used when no report matched lexically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranked_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineMetrics {
    pub matches: usize,
}

/// Drift search result for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub period: String,
    /// Document-id regex added for this period, if the label is known.
    pub scope: Option<String>,
    pub answer_preview: String,
    pub metrics: TimelineMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftSearchResult {
    pub timeline: Vec<TimelineEntry>,
    /// Always empty.
    pub trends: Vec<String>,
    /// Always empty.
    pub insights: Vec<String>,
}

// ============================================================================
// Text unit ranking
// ============================================================================

/// Paging and filtering applied to one ranking pass.
#[derive(Debug)]
pub(crate) struct RankOptions<'a> {
    pub top_k: usize,
    pub offset: usize,
    pub min_score: f64,
    pub filter: &'a DocumentFilter,
    pub preview_chars: usize,
}

/// Rank text units for `query` and build citations.
pub(crate) fn rank_text_units(
    snapshot: &Snapshot,
    query: &str,
    query_vector: &[f32],
    options: &RankOptions<'_>,
) -> Vec<Citation> {
    let (Some(table), Some(text_column)) = (snapshot.text_units_table(), snapshot.text_column()) else {
        return Vec::new();
    };
    let has_embeddings = !query_vector.is_empty() && table.has_column(EMBEDDING_COLUMN);

    let mut scored: Vec<(f64, usize)> = (0..table.len())
        .filter(|&i| options.filter.matches(&cell_text(table.get(i, DOCUMENT_ID_COLUMN))))
        .filter_map(|i| {
            let text = cell_text(table.get(i, text_column));
            let row_vector = if has_embeddings {
                table.get(i, EMBEDDING_COLUMN).and_then(parse_embedding).unwrap_or_default()
            } else {
                Vec::new()
            };
            let score = combined_score(&text, query, query_vector, &row_vector);
            (score > 0.0).then_some((score, i))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    scored
        .into_iter()
        .skip(options.offset)
        .take(options.top_k)
        .filter(|(score, _)| *score >= options.min_score)
        .map(|(score, i)| {
            let fields = PASSTHROUGH_COLUMNS
                .iter()
                .filter(|c| table.has_column(c))
                .map(|c| {
                    let value = table.rows()[i].get(*c).cloned().unwrap_or(Value::Null);
                    (c.to_string(), value)
                })
                .collect();
            Citation {
                score,
                row_index: i,
                text_preview: preview(&cell_text(table.get(i, text_column)), options.preview_chars),
                fields,
            }
        })
        .collect()
}

/// Citation previews joined one per line.
pub(crate) fn join_previews(citations: &[Citation]) -> String {
    citations
        .iter()
        .map(|c| c.text_preview.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
