//! Document-id filters applied to text unit rows.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Caller-facing document filters. All set predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Exact `document_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    /// Substring of `document_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id_contains: Option<String>,

    /// Regex searched in `document_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id_regex: Option<String>,
}

impl SearchFilters {
    /// Whether no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.document_id.is_none()
            && self.document_id_contains.is_none()
            && self.document_id_regex.is_none()
    }
}

/// Compiled predicates over a row's `document_id`.
///
/// A regex that fails to compile stays in the set as a predicate that
/// matches nothing.
#[derive(Debug, Default)]
pub(crate) struct DocumentFilter {
    exact: Option<String>,
    contains: Option<String>,
    patterns: Vec<Option<Regex>>,
}

impl DocumentFilter {
    /// Compile caller filters plus extra scope patterns.
    pub(crate) fn compile(filters: &SearchFilters, scopes: &[String]) -> Self {
        let patterns = filters
            .document_id_regex
            .iter()
            .chain(scopes.iter())
            .map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    debug!("Ignoring invalid document_id regex '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            exact: filters.document_id.clone(),
            contains: filters.document_id_contains.clone(),
            patterns,
        }
    }

    /// Whether `document_id` passes every predicate.
    pub(crate) fn matches(&self, document_id: &str) -> bool {
        if self.exact.as_deref().is_some_and(|exact| exact != document_id) {
            return false;
        }
        if self
            .contains
            .as_deref()
            .is_some_and(|needle| !document_id.contains(needle))
        {
            return false;
        }
        self.patterns
            .iter()
            .all(|re| re.as_ref().is_some_and(|re| re.is_match(document_id)))
    }
}
