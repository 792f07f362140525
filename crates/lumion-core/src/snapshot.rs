//! The set of tables loaded from one artifact directory.

use std::path::{Path, PathBuf};

use lumion_db::{load_table, LoadedTable, Table};

use crate::constants::{
    COMMUNITY_REPORTS_TABLE, ENTITIES_TABLE, RELATIONSHIPS_TABLE, TEXT_COLUMNS, TEXT_UNITS_TABLE,
};

/// The four artifact tables of one indexing run.
///
/// A snapshot never changes once built; enrichment jobs build a new one and
/// swap it into the engine cache.
#[derive(Debug, Clone)]
pub struct Snapshot {
    artifact_dir: Option<PathBuf>,
    pub text_units: LoadedTable,
    pub entities: LoadedTable,
    pub relationships: LoadedTable,
    pub community_reports: LoadedTable,
    text_column: Option<String>,
}

impl Snapshot {
    /// Load every table from `artifact_dir` (all absent when `None`).
    pub fn load(artifact_dir: Option<PathBuf>) -> Self {
        let dir = artifact_dir.as_deref();
        Self::from_tables(
            artifact_dir.clone(),
            load_table(dir, TEXT_UNITS_TABLE),
            load_table(dir, ENTITIES_TABLE),
            load_table(dir, RELATIONSHIPS_TABLE),
            load_table(dir, COMMUNITY_REPORTS_TABLE),
        )
    }

    /// Assemble a snapshot from already loaded tables.
    pub fn from_tables(
        artifact_dir: Option<PathBuf>,
        text_units: LoadedTable,
        entities: LoadedTable,
        relationships: LoadedTable,
        community_reports: LoadedTable,
    ) -> Self {
        let text_column = text_units
            .table()
            .and_then(|t| t.first_present_column(TEXT_COLUMNS));
        Self {
            artifact_dir,
            text_units,
            entities,
            relationships,
            community_reports,
            text_column,
        }
    }

    /// Directory the tables were loaded from.
    pub fn artifact_dir(&self) -> Option<&Path> {
        self.artifact_dir.as_deref()
    }

    /// Text payload column of the text unit table, resolved at load time.
    pub fn text_column(&self) -> Option<&str> {
        self.text_column.as_deref()
    }

    /// A copy with the text unit table replaced.
    pub fn with_text_units(&self, text_units: LoadedTable) -> Self {
        Self::from_tables(
            self.artifact_dir.clone(),
            text_units,
            self.entities.clone(),
            self.relationships.clone(),
            self.community_reports.clone(),
        )
    }

    /// A copy with the entity and relationship tables replaced.
    pub fn with_graph(&self, entities: LoadedTable, relationships: LoadedTable) -> Self {
        Self::from_tables(
            self.artifact_dir.clone(),
            self.text_units.clone(),
            entities,
            relationships,
            self.community_reports.clone(),
        )
    }

    /// Every table with its logical name, in a fixed order.
    pub fn tables(&self) -> [(&'static str, &LoadedTable); 4] {
        [
            (TEXT_UNITS_TABLE, &self.text_units),
            (ENTITIES_TABLE, &self.entities),
            (RELATIONSHIPS_TABLE, &self.relationships),
            (COMMUNITY_REPORTS_TABLE, &self.community_reports),
        ]
    }

    pub(crate) fn text_units_table(&self) -> Option<&Table> {
        self.text_units.table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_directory() {
        let snapshot = Snapshot::load(None);
        assert!(snapshot.artifact_dir().is_none());
        assert!(snapshot.tables().iter().all(|(_, t)| !t.is_available()));
        assert!(snapshot.text_column().is_none());
    }

    #[test]
    fn test_text_column_resolved_once() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("create_final_text_units.json"),
            "{\"document_id\": \"d\", \"content\": \"alpha\", \"body\": \"beta\"}\n",
        )
        .unwrap();

        let snapshot = Snapshot::load(Some(tmp.path().to_path_buf()));
        assert_eq!(snapshot.text_column(), Some("content"));
        assert!(snapshot.text_units.is_available());
        assert!(!snapshot.entities.is_available());
    }
}
