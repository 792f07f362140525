//! Shared test utilities for lumion-cli integration tests.

use std::fs;
use std::path::Path;

use assert_cmd::Command;

/// A `lumion` command isolated from the host: no providers, no home config,
/// no colors, rooted at `repo_root` with artifacts under `out/`.
#[allow(deprecated)]
pub fn lumion_cmd(repo_root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lumion").expect("lumion binary should exist");
    for var in [
        "GEMINI_API_KEY",
        "OLLAMA_URL",
        "OLLAMA_MODEL",
        "GRAPHRAG_INDEX_PATH",
        "LUMION_REPO_ROOT",
        "LUMION_CONFIG",
        "LUMION_COLOR",
        "LUMION_VERBOSE",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--color")
        .arg("never")
        .arg("--config")
        .arg(repo_root.join("lumion.yaml"))
        .arg("--repo-root")
        .arg(repo_root)
        .arg("--index-path")
        .arg("out");
    cmd
}

/// Write JSON-lines `records` as `table` in run `run`.
pub fn write_table(repo_root: &Path, run: &str, table: &str, records: &[serde_json::Value]) {
    let dir = repo_root.join("out").join(run).join("artifacts");
    fs::create_dir_all(&dir).expect("create artifacts dir");
    let lines: Vec<String> = records.iter().map(|r| r.to_string()).collect();
    fs::write(dir.join(format!("{}.json", table)), lines.join("\n")).expect("write table");
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}
