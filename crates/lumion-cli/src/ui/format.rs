//! Text formatters shared by the table and message renderers.

use chrono::{DateTime, Utc};

/// Truncate `s` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// Collapse all whitespace runs (newlines included) to single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a relevance score. Lexical scores are whole numbers, so drop the
/// fraction when there is none.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 && score.abs() < 1e9 {
        format!("{:.0}", score)
    } else {
        format!("{:.3}", score)
    }
}

/// Format an enrichment timestamp.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format an optional count, `-` when absent.
pub fn format_count(count: Option<usize>) -> String {
    count.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}
