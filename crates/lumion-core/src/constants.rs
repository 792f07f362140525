//! Fixed names and defaults shared across the engine.

// ============================================================================
// Artifact tables
// ============================================================================

/// Logical name of the text unit table.
pub const TEXT_UNITS_TABLE: &str = "create_final_text_units";

/// Logical name of the entity table.
pub const ENTITIES_TABLE: &str = "create_final_entities";

/// Logical name of the relationship table.
pub const RELATIONSHIPS_TABLE: &str = "create_final_relationships";

/// Logical name of the community report table.
pub const COMMUNITY_REPORTS_TABLE: &str = "create_final_community_reports";

/// Default base path of indexer output, relative to the repository root.
pub const DEFAULT_INDEX_PATH: &str = "graphrag-pipeline/output";

// ============================================================================
// Columns
// ============================================================================

/// Accepted text payload columns, in preference order.
pub const TEXT_COLUMNS: &[&str] = &["text", "content", "chunk", "body", "unit_text"];

/// Accepted community report body columns, in preference order.
pub const REPORT_COLUMNS: &[&str] = &["text", "content", "chunk", "body", "unit_text", "report"];

/// Identifying columns copied into citations when present.
pub const PASSTHROUGH_COLUMNS: &[&str] =
    &["document_id", "chunk_id", "unit_id", "source", "entity_ids"];

/// Numeric columns used to rank communities when nothing matches lexically.
pub const COMMUNITY_RANKING_COLUMNS: &[&str] = &["density", "rank", "size", "components", "files"];

/// Column holding stored embeddings.
pub const EMBEDDING_COLUMN: &str = "embedding";

/// Column holding the document identifier.
pub const DOCUMENT_ID_COLUMN: &str = "document_id";

// ============================================================================
// Answers
// ============================================================================

/// Local search answer when nothing matched.
pub const NO_CONTEXT_ANSWER: &str = "No matching context found.";

/// Global search answer when no community matched.
pub const NO_COMMUNITY_ANSWER: &str = "No community insights found.";

/// Confidence when the answer is grounded in citations or graph matches.
pub const GROUNDED_CONFIDENCE: f64 = 0.5;

/// Confidence when nothing was found.
pub const UNGROUNDED_CONFIDENCE: f64 = 0.1;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_PREVIEW_CHARS: usize = 280;
pub const DEFAULT_ENTITY_LIMIT: usize = 5;
pub const DEFAULT_GRAPH_LIMIT: usize = 50;

// ============================================================================
// Relation patterns
// ============================================================================

/// API namespace tokens that turn a "call" question into a graph lookup.
pub const API_NAMESPACE_TOKENS: &[&str] = &["graphapi", "graphragapi"];

/// Prefix of component entity ids.
pub const COMPONENT_ID_PREFIX: &str = "cmp_";

/// Component assumed when a render question names none.
pub const FALLBACK_COMPONENT: &str = "QueryInterface";
