//! Integration tests for `lumion status`, `entity`, the enrichment
//! commands and configuration errors.

mod common;

use std::fs;

use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use common::{lumion_cmd, stdout_json, write_table};

#[test]
fn test_status_without_artifacts() {
    let temp = TempDir::new().expect("create temp dir");

    let output = lumion_cmd(temp.path())
        .args(["status", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let status = stdout_json(&output.stdout);
    assert_eq!(status["artifact_dir"], json!(null));
    assert_eq!(status["embedding_providers"], json!([]));
    let tables = status["tables"].as_array().expect("tables array");
    assert_eq!(tables.len(), 4);
    assert!(tables.iter().all(|t| t["available"] == json!(false)));
}

#[test]
fn test_status_reports_loaded_tables() {
    let temp = TempDir::new().expect("create temp dir");
    write_table(
        temp.path(),
        "5",
        "create_final_text_units",
        &[json!({"document_id": "a.md", "text": "alpha"}), json!({"document_id": "b.md", "text": "beta"})],
    );

    lumion_cmd(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("create_final_text_units"))
        .stdout(predicate::str::contains("Text column: text"))
        .stdout(predicate::str::contains("Embeddings: (none)"));
}

#[test]
fn test_entity_lookup() {
    let temp = TempDir::new().expect("create temp dir");
    write_table(
        temp.path(),
        "1",
        "create_final_entities",
        &[json!({
            "id": "cmp_QueryInterface",
            "name": "QueryInterface",
            "type": "Component",
            "description": "Search box and results",
            "document_id": "src/components/query.tsx"
        })],
    );

    let output = lumion_cmd(temp.path())
        .args(["entity", "cmp_QueryInterface", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());
    let entity = stdout_json(&output.stdout);
    assert_eq!(entity["name"], json!("QueryInterface"));
    assert_eq!(entity["type"], json!("Component"));

    lumion_cmd(temp.path())
        .args(["entity", "cmp_Missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[err] Entity 'cmp_Missing' not found"));
}

#[test]
fn test_enrich_embeddings_without_provider_is_skipped() {
    let temp = TempDir::new().expect("create temp dir");
    write_table(temp.path(), "1", "create_final_text_units", &[json!({"text": "alpha"})]);

    let output = lumion_cmd(temp.path())
        .args(["enrich-embeddings", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let status = stdout_json(&output.stdout);
    assert_eq!(status["job"], json!("embeddings"));
    assert_eq!(status["saved"], json!(false));
    assert_eq!(status["reason"], json!("no embedding provider configured"));
}

#[test]
fn test_enrich_graph_without_model_is_skipped() {
    let temp = TempDir::new().expect("create temp dir");

    lumion_cmd(temp.path())
        .args(["enrich-graph", "--limit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[skip] Graph enrichment skipped: no completion model configured",
        ));
}

#[test]
fn test_invalid_config_file_fails() {
    let temp = TempDir::new().expect("create temp dir");
    fs::write(temp.path().join("lumion.yaml"), "previewChars: [not, a, number]\n").expect("write config");

    lumion_cmd(temp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"))
        .stderr(predicate::str::contains("Hint: Check your config at"));
}

#[test]
fn test_config_file_drift_periods() {
    let temp = TempDir::new().expect("create temp dir");
    fs::write(
        temp.path().join("lumion.yaml"),
        "driftPeriods:\n  legacy: src/old\n",
    )
    .expect("write config");
    write_table(
        temp.path(),
        "1",
        "create_final_text_units",
        &[
            json!({"document_id": "src/old/router.js", "text": "routing"}),
            json!({"document_id": "src/app/router.ts", "text": "routing"}),
        ],
    );

    let output = lumion_cmd(temp.path())
        .args(["drift", "routing", "--period", "legacy", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let result = stdout_json(&output.stdout);
    assert_eq!(result["timeline"][0]["scope"], json!("src/old"));
    assert_eq!(result["timeline"][0]["metrics"]["matches"], json!(1));
}
