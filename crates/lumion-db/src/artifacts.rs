//! Artifact directory discovery.
//!
//! An indexing run writes its tables to `<base>/<timestamp>/artifacts/`.
//! The locator picks the most recent run that actually produced an
//! `artifacts/` directory:
//!
//! ```text
//! graphrag-pipeline/output/
//! ├── 1718000000/artifacts/   <- candidate
//! ├── 1718050000/artifacts/   <- candidate, selected (highest timestamp)
//! ├── 1718090000/             <- ignored, no artifacts/ subdirectory
//! └── scratch/artifacts/      <- candidate, ranks lowest (non-numeric)
//! ```

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// Name of the per-run subdirectory holding the tables.
pub const ARTIFACTS_SUBDIR: &str = "artifacts";

/// Marker identifying a repository root.
pub const REPO_MARKER: &str = ".git";

/// Find the repository root enclosing `start_dir`.
///
/// Walks up from `start_dir` to the first directory containing `.git`
/// (a directory, or a file for worktrees). Falls back to `start_dir` when no
/// ancestor is marked.
pub fn discover_repo_root(start_dir: &Path) -> PathBuf {
    let start = start_dir
        .canonicalize()
        .unwrap_or_else(|_| start_dir.to_path_buf());

    match start.ancestors().find(|dir| dir.join(REPO_MARKER).exists()) {
        Some(root) => {
            trace!("Repository root {} (from {})", root.display(), start.display());
            root.to_path_buf()
        }
        None => {
            debug!("No {} above {}; using it as the root", REPO_MARKER, start.display());
            start
        }
    }
}

/// Resolve `base_path` against `repo_root` unless it is already absolute.
pub fn resolve_base_path(base_path: &Path, repo_root: &Path) -> PathBuf {
    if base_path.is_absolute() {
        base_path.to_path_buf()
    } else {
        repo_root.join(base_path)
    }
}

/// Locate the most recent artifact directory under `base_path`.
///
/// Returns `None` when the resolved root does not exist or contains no
/// run directory with an `artifacts/` subdirectory. Never fails: an
/// unreadable root is treated like a missing one.
pub fn locate_latest_artifacts(base_path: &Path, repo_root: &Path) -> Option<PathBuf> {
    let root = resolve_base_path(base_path, repo_root);
    let entries = match fs::read_dir(&root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Artifact root {} not readable: {}", root.display(), e);
            return None;
        }
    };

    let mut candidates: Vec<(Option<u64>, String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let artifacts = entry.path().join(ARTIFACTS_SUBDIR);
            if !artifacts.is_dir() {
                trace!("Skipping {} (no artifacts dir)", entry.path().display());
                return None;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            Some((run_timestamp(&name), name, artifacts))
        })
        .collect();

    candidates.sort_by(|a, b| compare_runs((&a.0, &a.1), (&b.0, &b.1)));

    let selected = candidates.pop().map(|(_, _, path)| path);
    match &selected {
        Some(path) => debug!("Selected artifact directory {}", path.display()),
        None => debug!("No artifact directories under {}", root.display()),
    }
    selected
}

/// Parse a run directory name as a numeric timestamp.
fn run_timestamp(name: &str) -> Option<u64> {
    name.parse::<u64>().ok()
}

/// Order runs by timestamp; non-numeric names rank below every number.
fn compare_runs(a: (&Option<u64>, &String), b: (&Option<u64>, &String)) -> Ordering {
    match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(y).then_with(|| a.1.cmp(b.1)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.1.cmp(b.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_run(root: &Path, name: &str, with_artifacts: bool) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        if with_artifacts {
            fs::create_dir_all(dir.join(ARTIFACTS_SUBDIR)).unwrap();
        }
    }

    #[test]
    fn test_missing_root_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(locate_latest_artifacts(Path::new("does/not/exist"), tmp.path()).is_none());
    }

    #[test]
    fn test_no_candidates_is_none() {
        let tmp = TempDir::new().unwrap();
        make_run(tmp.path(), "1700000000", false);
        assert!(locate_latest_artifacts(tmp.path(), tmp.path()).is_none());
    }

    #[test]
    fn test_selects_highest_numeric_timestamp() {
        let tmp = TempDir::new().unwrap();
        make_run(tmp.path(), "900", true);
        make_run(tmp.path(), "1000", true);
        make_run(tmp.path(), "1100", false);
        make_run(tmp.path(), "latest", true);

        let found = locate_latest_artifacts(tmp.path(), Path::new("/unused")).unwrap();
        assert_eq!(found, tmp.path().join("1000").join(ARTIFACTS_SUBDIR));
    }

    #[test]
    fn test_numeric_order_not_lexicographic() {
        let tmp = TempDir::new().unwrap();
        make_run(tmp.path(), "99", true);
        make_run(tmp.path(), "100", true);

        let found = locate_latest_artifacts(tmp.path(), tmp.path()).unwrap();
        assert!(found.starts_with(tmp.path().join("100")));
    }

    #[test]
    fn test_non_numeric_only() {
        let tmp = TempDir::new().unwrap();
        make_run(tmp.path(), "alpha", true);
        make_run(tmp.path(), "beta", true);

        let found = locate_latest_artifacts(tmp.path(), tmp.path()).unwrap();
        assert!(found.starts_with(tmp.path().join("beta")));
    }

    #[test]
    fn test_relative_base_resolves_against_repo_root() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("pipeline").join("output");
        make_run(&base, "42", true);

        let found = locate_latest_artifacts(Path::new("pipeline/output"), tmp.path()).unwrap();
        assert_eq!(found, base.join("42").join(ARTIFACTS_SUBDIR));
    }

    #[test]
    fn test_locate_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        make_run(tmp.path(), "1", true);
        make_run(tmp.path(), "2", true);

        let first = locate_latest_artifacts(tmp.path(), tmp.path());
        let second = locate_latest_artifacts(tmp.path(), tmp.path());
        assert_eq!(first, second);
    }

    #[test]
    fn test_repo_root_found_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(REPO_MARKER)).unwrap();
        let nested = tmp.path().join("src").join("app");
        fs::create_dir_all(&nested).unwrap();

        let root = discover_repo_root(&nested);
        assert_eq!(root, tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_repo_root_accepts_worktree_marker_file() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("wt");
        fs::create_dir_all(repo.join("docs")).unwrap();
        fs::write(repo.join(REPO_MARKER), "gitdir: /elsewhere\n").unwrap();

        let root = discover_repo_root(&repo.join("docs"));
        assert_eq!(root, repo.canonicalize().unwrap());
    }
}
