//! LLM graph extraction: prompt and response parsing.
//!
//! Models often wrap the requested JSON in prose or code fences, so parsing
//! is two-stage: a strict parse of the whole response, then a strict parse
//! of the first balanced `{...}` object found in it. Either stage yields a
//! complete [`ExtractedGraph`] or nothing.

use serde::Deserialize;
use serde_json::{json, Value};

use lumion_db::Row;

use crate::relations::{EntityKind, RelationKind};

/// Build the extraction prompt for one text unit.
pub fn extraction_prompt(text: &str) -> String {
    let entity_types: Vec<String> = EntityKind::EXTRACTED.iter().map(|k| k.to_string()).collect();
    let relation_types: Vec<String> = RelationKind::EXTRACTED.iter().map(|k| k.to_string()).collect();

    format!(
        "Extract a code knowledge graph from the source text below.\n\
         Respond with a single JSON object and nothing else, shaped as:\n\
         {{\"entities\": [{{\"id\": \"...\", \"name\": \"...\", \"type\": \"...\", \"description\": \"...\"}}],\n \
         \"relationships\": [{{\"source\": \"<entity id>\", \"target\": \"<entity id>\", \"type\": \"...\"}}]}}\n\
         Entity types: {}.\n\
         Relationship types: {}.\n\
         Prefix component ids with \"cmp_\".\n\n\
         Text:\n{}",
        entity_types.join(", "),
        relation_types.join(", "),
        text
    )
}

// ============================================================================
// ExtractedGraph
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedEntity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedRelationship {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Entities and relationships extracted from one text unit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractedGraph {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
}

impl ExtractedGraph {
    /// Entity rows tagged with `document_id`.
    ///
    /// Entities without a name are dropped; a missing id falls back to the name.
    pub fn entity_rows(&self, document_id: &str) -> Vec<Row> {
        self.entities
            .iter()
            .filter(|e| !e.name.trim().is_empty())
            .map(|e| {
                let id = if e.id.trim().is_empty() { &e.name } else { &e.id };
                to_row(json!({
                    "id": id,
                    "name": e.name,
                    "type": EntityKind::parse(&e.kind).as_str(),
                    "description": e.description.clone().unwrap_or_default(),
                    "document_id": document_id,
                }))
            })
            .collect()
    }

    /// Relationship rows tagged with `document_id`; edges missing an end are dropped.
    pub fn relationship_rows(&self, document_id: &str) -> Vec<Row> {
        self.relationships
            .iter()
            .filter(|r| !r.source.trim().is_empty() && !r.target.trim().is_empty())
            .map(|r| {
                to_row(json!({
                    "source": r.source,
                    "target": r.target,
                    "type": RelationKind::parse(&r.kind).as_str(),
                    "document_id": document_id,
                }))
            })
            .collect()
    }
}

fn to_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a model response into a graph.
pub fn parse_graph_response(response: &str) -> Option<ExtractedGraph> {
    serde_json::from_str::<ExtractedGraph>(response.trim())
        .ok()
        .or_else(|| {
            let object = first_balanced_object(response)?;
            serde_json::from_str::<ExtractedGraph>(object).ok()
        })
}

/// The first balanced `{...}` span, ignoring braces inside JSON strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_vocabularies() {
        let prompt = extraction_prompt("export function Page() {}");
        assert!(prompt.contains("File, Component, Function, Hook, Import, Export"));
        assert!(prompt.contains("CONTAINS, IMPORTS, CALLS, RENDERS, USES_HOOK, EXPORTS"));
        assert!(prompt.ends_with("export function Page() {}"));
    }

    #[test]
    fn test_strict_parse() {
        let graph = parse_graph_response(
            r#"{"entities": [{"id": "fn_a", "name": "Handler", "type": "Function"}], "relationships": []}"#,
        )
        .unwrap();
        assert_eq!(graph.entities.len(), 1);
        assert_eq!(graph.entities[0].kind, "Function");
    }

    #[test]
    fn test_recovers_object_from_prose() {
        let response = "Sure! Here is the graph:\n```json\n{\"entities\": [{\"name\": \"Page\", \"type\": \"component\", \"description\": \"uses {braces}\"}],\n\"relationships\": [{\"source\": \"cmp_Page\", \"target\": \"cmp_Header\", \"type\": \"renders\"}]}\n```\nLet me know.";
        let graph = parse_graph_response(response).unwrap();
        assert_eq!(graph.entities[0].description.as_deref(), Some("uses {braces}"));
        assert_eq!(graph.relationships[0].target, "cmp_Header");
    }

    #[test]
    fn test_unparseable_is_none() {
        assert!(parse_graph_response("I could not find any entities.").is_none());
        assert!(parse_graph_response("{\"entities\": [").is_none());
        assert!(parse_graph_response("{\"entities\": \"none\"}").is_none());
    }

    #[test]
    fn test_rows_are_tagged_and_normalized() {
        let graph = ExtractedGraph {
            entities: vec![
                ExtractedEntity {
                    name: "Page".to_string(),
                    kind: "component".to_string(),
                    ..Default::default()
                },
                ExtractedEntity::default(),
            ],
            relationships: vec![
                ExtractedRelationship {
                    source: "cmp_Page".to_string(),
                    target: "cmp_Header".to_string(),
                    kind: "renders".to_string(),
                },
                ExtractedRelationship {
                    source: "cmp_Page".to_string(),
                    ..Default::default()
                },
            ],
        };

        let entities = graph.entity_rows("src/app/page.tsx");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0]["id"], json!("Page"));
        assert_eq!(entities[0]["type"], json!("Component"));
        assert_eq!(entities[0]["document_id"], json!("src/app/page.tsx"));

        let relationships = graph.relationship_rows("src/app/page.tsx");
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0]["type"], json!("RENDERS"));
    }

    #[test]
    fn test_first_balanced_object() {
        assert_eq!(first_balanced_object("x {\"a\": {\"b\": 1}} y {}"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(first_balanced_object("{\"a\": \"}\"}"), Some("{\"a\": \"}\"}"));
        assert_eq!(first_balanced_object("no braces"), None);
    }
}
