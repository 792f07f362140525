//! Integration tests for `lumion local`, `global` and `drift`.

mod common;

use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use common::{lumion_cmd, stdout_json, write_table};

fn app_units(root: &std::path::Path) {
    write_table(
        root,
        "1700000000",
        "create_final_text_units",
        &[
            json!({"document_id": "src/app/page.tsx", "text": "routing for the app shell"}),
            json!({"document_id": "src/lib/router.ts", "text": "routing helpers"}),
            json!({"document_id": "README.md", "text": "project overview"}),
        ],
    );
}

// ============================================================================
// local
// ============================================================================

#[test]
fn test_local_json_returns_ranked_sources() {
    let temp = TempDir::new().expect("create temp dir");
    app_units(temp.path());

    let output = lumion_cmd(temp.path())
        .args(["local", "routing", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let result = stdout_json(&output.stdout);
    assert_eq!(result["answer"], json!("routing for the app shell\nrouting helpers"));
    assert_eq!(result["confidence"], json!(0.5));
    assert_eq!(result["sources"].as_array().map(Vec::len), Some(2));
    assert_eq!(result["sources"][0]["document_id"], json!("src/app/page.tsx"));
}

#[test]
fn test_local_filters_by_substring() {
    let temp = TempDir::new().expect("create temp dir");
    app_units(temp.path());

    let output = lumion_cmd(temp.path())
        .args(["local", "routing", "--contains", "src/lib", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let result = stdout_json(&output.stdout);
    assert_eq!(result["answer"], json!("routing helpers"));
}

#[test]
fn test_local_without_match_prints_sentinel() {
    let temp = TempDir::new().expect("create temp dir");
    app_units(temp.path());

    lumion_cmd(temp.path())
        .args(["local", "kubernetes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ANSWER"))
        .stdout(predicate::str::contains("No matching context found."))
        .stdout(predicate::str::contains("Confidence: 0.10"));
}

#[test]
fn test_local_call_pattern_from_graph() {
    let temp = TempDir::new().expect("create temp dir");
    write_table(
        temp.path(),
        "1",
        "create_final_entities",
        &[json!({"id": "fn_load", "name": "loadDashboard", "type": "Function"})],
    );
    write_table(
        temp.path(),
        "1",
        "create_final_relationships",
        &[json!({"source": "fn_load", "target": "graphapi.query", "type": "CALLS"})],
    );

    let output = lumion_cmd(temp.path())
        .args(["local", "who calls graphAPI", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let result = stdout_json(&output.stdout);
    assert_eq!(result["answer"], json!("loadDashboard"));
    assert_eq!(result["pattern"], json!("call"));
}

// ============================================================================
// global
// ============================================================================

#[test]
fn test_global_without_reports() {
    let temp = TempDir::new().expect("create temp dir");
    app_units(temp.path());

    let output = lumion_cmd(temp.path())
        .args(["global", "architecture", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let result = stdout_json(&output.stdout);
    assert_eq!(result["answer"], json!("No community insights found."));
    assert_eq!(result["communities"], json!([]));
}

// ============================================================================
// drift
// ============================================================================

#[test]
fn test_drift_json_timeline() {
    let temp = TempDir::new().expect("create temp dir");
    app_units(temp.path());

    let output = lumion_cmd(temp.path())
        .args(["drift", "routing", "--period", "Q1", "--period", "Q9", "--json"])
        .output()
        .expect("run lumion");
    assert!(output.status.success());

    let result = stdout_json(&output.stdout);
    let timeline = result["timeline"].as_array().expect("timeline array");
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0]["period"], json!("Q1"));
    assert_eq!(timeline[0]["scope"], json!("src/app"));
    assert_eq!(timeline[0]["metrics"]["matches"], json!(1));
    assert_eq!(timeline[1]["metrics"]["matches"], json!(2));
}

#[test]
fn test_drift_requires_period() {
    let temp = TempDir::new().expect("create temp dir");

    lumion_cmd(temp.path())
        .args(["drift", "routing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--period"));
}
