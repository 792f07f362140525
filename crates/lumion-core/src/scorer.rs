//! Lexical and vector relevance signals.
//!
//! The combined score of a candidate is `lexical + vector`. Both signals are
//! deliberately naive: no stemming, no stopwords, no normalization beyond
//! lower-casing. A candidate whose combined score is not positive is not
//! ranked at all.

use std::collections::HashSet;

use serde_json::Value;

/// Count distinct query terms that occur as a substring of `text`.
///
/// Terms are the whitespace-separated, lower-cased words of `query`.
pub fn lexical_score(text: &str, query: &str) -> u32 {
    let haystack = text.to_lowercase();
    let terms: HashSet<String> = query.split_whitespace().map(str::to_lowercase).collect();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count() as u32
}

/// Cosine similarity over the shared prefix of `a` and `b`.
///
/// Exactly `0.0` when either vector is empty or has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Combined relevance of a candidate.
pub fn combined_score(text: &str, query: &str, query_vector: &[f32], row_vector: &[f32]) -> f64 {
    f64::from(lexical_score(text, query)) + cosine_similarity(query_vector, row_vector)
}

/// Read a stored embedding cell.
///
/// Accepts a JSON array of numbers, or a string holding one (CSV round trips
/// store the list as text). Anything else is treated as no embedding.
pub fn parse_embedding(value: &Value) -> Option<Vec<f32>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .filter(|v| !v.is_empty()),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(Value::is_array)
            .and_then(|v| parse_embedding(&v)),
        _ => None,
    }
}

/// Render a cell as text: strings verbatim, null as empty, others as JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// The first `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lexical_counts_distinct_terms() {
        assert_eq!(lexical_score("Alpha beta", "alpha BETA gamma"), 2);
        assert_eq!(lexical_score("alpha", "alpha alpha"), 1);
        assert_eq!(lexical_score("anything", ""), 0);
    }

    #[test]
    fn test_lexical_is_substring_based() {
        assert_eq!(lexical_score("GraphQueryInterface", "query"), 1);
        assert_eq!(lexical_score("beta", "alphabet"), 0);
    }

    #[test]
    fn test_lexical_monotonic_in_found_terms() {
        let text = "alpha beta gamma";
        let mut previous = 0;
        for query in ["zeta", "alpha zeta", "alpha beta zeta", "alpha beta gamma zeta"] {
            let score = lexical_score(text, query);
            assert!(score >= previous);
            previous = score;
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn test_cosine_empty_and_zero() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_cosine_symmetric_and_bounded() {
        let pairs: [(&[f32], &[f32]); 3] = [
            (&[1.0, 2.0, 3.0], &[3.0, -2.0, 1.0]),
            (&[0.5, 0.5], &[0.5, 0.5]),
            (&[1.0, 0.0], &[-1.0, 0.0]),
        ];
        for (a, b) in pairs {
            let ab = cosine_similarity(a, b);
            assert!((ab - cosine_similarity(b, a)).abs() < 1e-12);
            assert!((-1.0..=1.0).contains(&ab));
        }
        assert!((cosine_similarity(&[0.5, 0.5], &[0.5, 0.5]) - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_combined_score() {
        assert_eq!(combined_score("alpha beta", "beta", &[], &[]), 1.0);
        let score = combined_score("nothing", "beta", &[1.0, 0.0], &[1.0, 0.0]);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_embedding() {
        assert_eq!(parse_embedding(&json!([0.25, 1])), Some(vec![0.25, 1.0]));
        assert_eq!(parse_embedding(&json!("[0.5, -0.5]")), Some(vec![0.5, -0.5]));
        assert_eq!(parse_embedding(&json!("not json")), None);
        assert_eq!(parse_embedding(&json!([])), None);
        assert_eq!(parse_embedding(&json!(null)), None);
    }

    #[test]
    fn test_preview_counts_chars() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("short", 280), "short");
    }
}
