//! # lumion-core
//!
//! Retrieval core for Lumion: answers natural-language questions over the
//! artifact tables written by an offline GraphRAG indexing run.
//!
//! ## Main Types
//!
//! - [`RetrievalEngine`] – entry point for every query mode and enrichment job
//! - [`EngineConfig`] – configuration (`~/.lumion/config.yaml` plus env)
//! - [`CoreError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`config`] – engine configuration
//! - [`engine`] – snapshot cache, local/global/drift search, inspection
//! - [`enrich`] – embedding and graph enrichment jobs
//! - [`filters`] – document-id filters
//! - [`graph`] – LLM extraction prompt and response parsing
//! - [`relations`] – structural query patterns over the relationship table
//! - [`scorer`] – lexical and cosine relevance
//! - [`search`] – request and result payloads
//! - [`snapshot`] – the tables of one artifact directory
//!
//! ## Example
//!
//! ```ignore
//! use lumion_core::{DriftSearchRequest, LocalSearchRequest, RetrievalEngine};
//!
//! let engine = RetrievalEngine::with_defaults()?;
//!
//! let local = engine.local_search(&LocalSearchRequest::new("what renders QueryInterface"));
//! println!("{} ({})", local.answer, local.confidence);
//!
//! let drift = engine.drift_search(&DriftSearchRequest::new("routing", ["Q1", "Q2"]));
//! for entry in drift.timeline {
//!     println!("{}: {} matches", entry.period, entry.metrics.matches);
//! }
//! ```

pub mod config;
pub mod constants;
pub mod engine;
pub mod enrich;
pub mod errors;
pub mod filters;
pub mod graph;
pub mod relations;
pub mod scorer;
pub mod search;
pub mod snapshot;

pub use config::EngineConfig;
pub use engine::{EntityContext, IndexStatus, RetrievalEngine, TableStatus};
pub use enrich::{EnrichmentJob, EnrichmentStatus};
pub use errors::{CoreError, CoreResult};
pub use filters::SearchFilters;
pub use graph::{parse_graph_response, ExtractedGraph};
pub use relations::{EntityKind, PatternMatch, RelationKind, RelationMatcher, RelationPattern};
pub use scorer::{cosine_similarity, lexical_score};
pub use search::{
    Citation, CommunityHit, DriftSearchRequest, DriftSearchResult, EntityHit, GlobalSearchRequest,
    GlobalSearchResult, HistoryMessage, LocalSearchRequest, LocalSearchResult, TimelineEntry,
    TimelineMetrics,
};
pub use snapshot::Snapshot;

// Provider types callers need to customize an engine.
pub use lumion_model::{CompletionModel, Embedding, EmbeddingChain, EmbeddingProvider};
