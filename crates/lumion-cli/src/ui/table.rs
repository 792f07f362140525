//! Table rendering with comfy-table.
//!
//! | Command  | Renderer                       |
//! |----------|--------------------------------|
//! | `local`  | `render_citations_table()`     |
//! | `global` | `render_communities_table()`   |
//! | `drift`  | `render_timeline_table()`      |
//! | `status` | `render_table_status()`        |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use lumion_core::constants::DOCUMENT_ID_COLUMN;
use lumion_core::{Citation, CommunityHit, TableStatus, TimelineEntry};

use super::format::{format_count, format_score, single_line, truncate_str};

/// Width left for the free-text column once the fixed columns are placed.
fn text_width(terminal_width: usize, fixed: usize) -> usize {
    terminal_width.saturating_sub(fixed).max(20)
}

fn bare_table(terminal_width: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_width(terminal_width as u16);
    table
}

/// Citations returned by local search.
///
/// ```text
///  #  SCORE  DOCUMENT           TEXT
///  0      2  src/app/page.tsx   export function Page() ...
/// ```
pub fn render_citations_table(citations: &[Citation], terminal_width: usize) -> String {
    if citations.is_empty() {
        return String::new();
    }

    let mut table = bare_table(terminal_width);
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("DOCUMENT"),
        Cell::new("TEXT"),
    ]);

    let preview_width = text_width(terminal_width, 48);
    for citation in citations {
        let document = citation
            .fields
            .get(DOCUMENT_ID_COLUMN)
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(citation.row_index).set_alignment(CellAlignment::Right),
            Cell::new(format_score(citation.score)).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(document, 32)),
            Cell::new(truncate_str(&single_line(&citation.text_preview), preview_width)),
        ]);
    }

    if let Some(column) = table.column_mut(2) {
        column.set_constraint(ColumnConstraint::LowerBoundary(Width::Fixed(10)));
    }

    table.trim_fmt().to_string()
}

/// Community reports returned by global search.
pub fn render_communities_table(communities: &[CommunityHit], terminal_width: usize) -> String {
    if communities.is_empty() {
        return String::new();
    }

    let mut table = bare_table(terminal_width);
    table.set_header(vec![
        Cell::new("COMMUNITY"),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("REPORT"),
    ]);

    let preview_width = text_width(terminal_width, 30);
    for hit in communities {
        table.add_row(vec![
            Cell::new(&hit.community_id),
            Cell::new(format_score(hit.score)).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&single_line(&hit.report_preview), preview_width)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// One row per requested drift period.
pub fn render_timeline_table(timeline: &[TimelineEntry], terminal_width: usize) -> String {
    if timeline.is_empty() {
        return String::new();
    }

    let mut table = bare_table(terminal_width);
    table.set_header(vec![
        Cell::new("PERIOD"),
        Cell::new("SCOPE"),
        Cell::new("MATCHES").set_alignment(CellAlignment::Right),
        Cell::new("PREVIEW"),
    ]);

    let preview_width = text_width(terminal_width, 44);
    for entry in timeline {
        table.add_row(vec![
            Cell::new(&entry.period),
            Cell::new(entry.scope.as_deref().unwrap_or("(all)")),
            Cell::new(entry.metrics.matches).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&single_line(&entry.answer_preview), preview_width)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Availability of each artifact table.
///
/// ```text
/// TABLE                            LOADED  ENCODING   ROWS
/// create_final_text_units          yes     parquet     128
/// create_final_community_reports   no      -             -
/// ```
pub fn render_table_status(tables: &[TableStatus], terminal_width: usize) -> String {
    let mut table = bare_table(terminal_width);
    table.set_header(vec![
        Cell::new("TABLE"),
        Cell::new("LOADED"),
        Cell::new("ENCODING"),
        Cell::new("ROWS").set_alignment(CellAlignment::Right),
    ]);

    for status in tables {
        let encoding = status
            .encoding
            .map(|e| e.extension().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&status.name),
            Cell::new(if status.available { "yes" } else { "no" }),
            Cell::new(encoding),
            Cell::new(format_count(status.rows)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumion_core::TimelineMetrics;
    use serde_json::{json, Map};

    #[test]
    fn test_citations_table() {
        let mut fields = Map::new();
        fields.insert("document_id".to_string(), json!("src/app/page.tsx"));
        let citations = vec![Citation {
            score: 2.0,
            row_index: 4,
            text_preview: "export function\nPage()".to_string(),
            fields,
        }];

        let output = render_citations_table(&citations, 100);
        assert!(output.contains("SCORE"));
        assert!(output.contains("src/app/page.tsx"));
        assert!(output.contains("export function Page()"));
        assert!(render_citations_table(&[], 100).is_empty());
    }

    #[test]
    fn test_timeline_table_marks_unscoped_periods() {
        let timeline = vec![TimelineEntry {
            period: "Q9".to_string(),
            scope: None,
            answer_preview: "routing helpers".to_string(),
            metrics: TimelineMetrics { matches: 2 },
        }];

        let output = render_timeline_table(&timeline, 100);
        assert!(output.contains("Q9"));
        assert!(output.contains("(all)"));
        assert!(output.contains("routing helpers"));
    }

    #[test]
    fn test_table_status_for_missing_table() {
        let tables = vec![TableStatus {
            name: "create_final_entities".to_string(),
            available: false,
            encoding: None,
            rows: None,
        }];

        let output = render_table_status(&tables, 100);
        assert!(output.contains("create_final_entities"));
        assert!(output.contains("no"));
    }
}
