//! Relation pattern matching over free-text questions.
//!
//! Some questions are structural ("what calls graphAPI", "what renders
//! QueryInterface", "who imports @/lib/api") and are better answered from
//! the relationship table than from ranked text. The [`RelationMatcher`]
//! recognizes three patterns and, when one resolves to entity names,
//! produces an answer override.
//!
//! ## Patterns
//!
//! | Pattern | Trigger                                  | Edges    | Target test                      |
//! |---------|------------------------------------------|----------|----------------------------------|
//! | Call    | `call` + an API namespace token          | CALLS    | contains a mentioned token       |
//! | Render  | `render`                                 | RENDERS  | equals `cmp_<Candidate>`         |
//! | Import  | `import`                                 | IMPORTS  | contains a path token (or any)   |
//!
//! Patterns are evaluated in the order above and the last one that resolves
//! wins. Resolved names are deduplicated and sorted.
//!
//! Matching is best-effort: missing tables, missing columns or an unusable
//! regex yield no override rather than an error.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use tracing::debug;

use lumion_db::Table;

use crate::constants::{API_NAMESPACE_TOKENS, COMPONENT_ID_PREFIX, FALLBACK_COMPONENT};
use crate::scorer::cell_text;

// ============================================================================
// Vocabularies
// ============================================================================

/// Entity type vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    File,
    Component,
    Function,
    Hook,
    Import,
    Export,
    /// Any other type, preserved verbatim.
    Other(String),
}

impl EntityKind {
    /// Types the graph extraction prompt asks for.
    pub const EXTRACTED: [EntityKind; 6] = [
        Self::File,
        Self::Component,
        Self::Function,
        Self::Hook,
        Self::Import,
        Self::Export,
    ];

    /// Parse a type name case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            "component" => Self::Component,
            "function" => Self::Function,
            "hook" => Self::Hook,
            "import" => Self::Import,
            "export" => Self::Export,
            _ => Self::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::File => "File",
            Self::Component => "Component",
            Self::Function => "Function",
            Self::Hook => "Hook",
            Self::Import => "Import",
            Self::Export => "Export",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Relationship type vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Contains,
    Imports,
    Calls,
    Renders,
    UsesHook,
    Exports,
    /// CRM edge types and anything else, preserved verbatim.
    Other(String),
}

impl RelationKind {
    /// Types the graph extraction prompt asks for.
    pub const EXTRACTED: [RelationKind; 6] = [
        Self::Contains,
        Self::Imports,
        Self::Calls,
        Self::Renders,
        Self::UsesHook,
        Self::Exports,
    ];

    /// Parse a type name case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CONTAINS" => Self::Contains,
            "IMPORTS" => Self::Imports,
            "CALLS" => Self::Calls,
            "RENDERS" => Self::Renders,
            "USES_HOOK" => Self::UsesHook,
            "EXPORTS" => Self::Exports,
            _ => Self::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Contains => "CONTAINS",
            Self::Imports => "IMPORTS",
            Self::Calls => "CALLS",
            Self::Renders => "RENDERS",
            Self::UsesHook => "USES_HOOK",
            Self::Exports => "EXPORTS",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RelationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Edges
// ============================================================================

/// A typed edge read from the relationship table.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

/// Read every edge with a non-empty source and target.
///
/// Returns `None` when the table lacks `source`, `target` or `type`.
pub fn read_edges(table: &Table) -> Option<Vec<Edge>> {
    if !["source", "target", "type"].iter().all(|c| table.has_column(c)) {
        return None;
    }

    let edges = (0..table.len())
        .filter_map(|i| {
            let source = cell_text(table.get(i, "source"));
            let target = cell_text(table.get(i, "target"));
            if source.is_empty() || target.is_empty() {
                return None;
            }
            Some(Edge {
                source,
                target,
                kind: RelationKind::parse(&cell_text(table.get(i, "type"))),
            })
        })
        .collect();
    Some(edges)
}

/// Map entity ids to names. `None` when `id` or `name` is missing.
pub fn entity_names(table: &Table) -> Option<HashMap<String, String>> {
    if !table.has_column("id") || !table.has_column("name") {
        return None;
    }

    let names = (0..table.len())
        .filter_map(|i| {
            let id = cell_text(table.get(i, "id"));
            let name = cell_text(table.get(i, "name"));
            (!id.is_empty() && !name.is_empty()).then_some((id, name))
        })
        .collect();
    Some(names)
}

// ============================================================================
// RelationMatcher
// ============================================================================

/// Which structural pattern produced an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationPattern {
    Call,
    Render,
    Import,
}

impl RelationPattern {
    /// Evaluation order; later patterns override earlier ones.
    pub const ORDER: [RelationPattern; 3] = [Self::Call, Self::Render, Self::Import];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Render => "render",
            Self::Import => "import",
        }
    }
}

/// Names resolved by a pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternMatch {
    pub pattern: RelationPattern,
    /// Sorted, deduplicated entity names.
    pub names: Vec<String>,
}

impl PatternMatch {
    /// The override answer: one name per line.
    pub fn answer(&self) -> String {
        self.names.join("\n")
    }
}

/// Recognizes structural questions and resolves them against the graph.
#[derive(Debug, Clone)]
pub struct RelationMatcher {
    namespace_tokens: Vec<String>,
    component_prefix: String,
    fallback_component: String,
}

impl Default for RelationMatcher {
    fn default() -> Self {
        Self {
            namespace_tokens: API_NAMESPACE_TOKENS.iter().map(|t| t.to_string()).collect(),
            component_prefix: COMPONENT_ID_PREFIX.to_string(),
            fallback_component: FALLBACK_COMPONENT.to_string(),
        }
    }
}

impl RelationMatcher {
    /// Resolve `raw_query` against the relationship and entity tables.
    pub fn resolve(
        &self,
        raw_query: &str,
        relationships: Option<&Table>,
        entities: Option<&Table>,
    ) -> Option<PatternMatch> {
        let edges = read_edges(relationships?)?;
        let names = entity_names(entities?)?;
        let query = raw_query.to_lowercase();

        let mut resolved = None;
        for pattern in RelationPattern::ORDER {
            let sources = match pattern {
                RelationPattern::Call => self.call_sources(&query, &edges),
                RelationPattern::Render => self.render_sources(raw_query, &query, &edges),
                RelationPattern::Import => self.import_sources(raw_query, &query, &edges),
            };
            let Some(sources) = sources else { continue };

            let matched: BTreeSet<String> = sources
                .iter()
                .filter_map(|id| names.get(*id).cloned())
                .collect();
            if matched.is_empty() {
                debug!("{:?} pattern fired but no source resolved to an entity", pattern);
                continue;
            }

            debug!("{:?} pattern resolved {} name(s)", pattern, matched.len());
            resolved = Some(PatternMatch {
                pattern,
                names: matched.into_iter().collect(),
            });
        }
        resolved
    }

    /// Sources of CALLS edges targeting a mentioned API namespace.
    fn call_sources<'a>(&self, query: &str, edges: &'a [Edge]) -> Option<Vec<&'a str>> {
        if !query.contains("call") {
            return None;
        }
        let mentioned: Vec<&str> = self
            .namespace_tokens
            .iter()
            .map(String::as_str)
            .filter(|t| query.contains(t))
            .collect();
        if mentioned.is_empty() {
            return None;
        }

        Some(sources_of(edges, &RelationKind::Calls, |target| {
            let target = target.to_lowercase();
            mentioned.iter().any(|t| target.contains(t))
        }))
    }

    /// Sources of RENDERS edges targeting a named component.
    fn render_sources<'a>(&self, raw_query: &str, query: &str, edges: &'a [Edge]) -> Option<Vec<&'a str>> {
        if !query.contains("render") {
            return None;
        }

        let mut candidates = capitalized_tokens(raw_query);
        if let Some(captured) = render_object(raw_query) {
            if !candidates.contains(&captured) {
                candidates.push(captured);
            }
        }
        if candidates.is_empty() {
            candidates.push(self.fallback_component.clone());
        }

        let ids: Vec<String> = candidates
            .iter()
            .map(|name| format!("{}{}", self.component_prefix, name))
            .collect();
        Some(sources_of(edges, &RelationKind::Renders, |target| {
            ids.iter().any(|id| id == target)
        }))
    }

    /// Sources of IMPORTS edges targeting a mentioned path or package.
    fn import_sources<'a>(&self, raw_query: &str, query: &str, edges: &'a [Edge]) -> Option<Vec<&'a str>> {
        if !query.contains("import") {
            return None;
        }

        let tokens = path_tokens(raw_query);
        Some(sources_of(edges, &RelationKind::Imports, |target| {
            if tokens.is_empty() {
                return true;
            }
            let target = target.to_lowercase();
            tokens.iter().any(|t| target.contains(t.as_str()))
        }))
    }
}

fn sources_of<'a, F>(edges: &'a [Edge], kind: &RelationKind, target_matches: F) -> Vec<&'a str>
where
    F: Fn(&str) -> bool,
{
    edges
        .iter()
        .filter(|e| &e.kind == kind && target_matches(&e.target))
        .map(|e| e.source.as_str())
        .collect()
}

/// Tokens starting with an uppercase letter, stripped of punctuation.
fn capitalized_tokens(raw_query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in raw_query.split_whitespace() {
        let word = word.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_'));
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        if starts_upper && !tokens.iter().any(|t| t == word) {
            tokens.push(word.to_string());
        }
    }
    tokens
}

/// The word following "render"/"renders", if any.
fn render_object(raw_query: &str) -> Option<String> {
    static RENDER_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RENDER_RE
        .get_or_init(|| Regex::new(r"(?i)\brenders?\s+(\w+)").ok())
        .as_ref()?;
    re.captures(raw_query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Lower-cased tokens that look like a module path or a scoped package.
fn path_tokens(raw_query: &str) -> Vec<String> {
    raw_query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | ',' | '.' | ';' | ':' | '?' | '!' | '(' | ')')))
        .filter(|w| w.contains('/') || w.starts_with('@'))
        .map(str::to_lowercase)
        .collect()
}
