//! Engine configuration.
//!
//! Loaded from `~/.lumion/config.yaml` when present, then overridden by
//! environment variables, then by CLI flags:
//!
//! ```yaml
//! indexPath: graphrag-pipeline/output
//! repoRoot: /srv/lumion
//! previewChars: 280
//! entityLimit: 5
//! driftPeriods:
//!   Q1: src/app
//!   Q2: src/components
//!   Q3: src/lib
//! providers:
//!   ollamaUrl: http://localhost:11434
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lumion_db::{discover_repo_root, resolve_base_path};
use lumion_model::ProviderConfig;

use crate::constants::{DEFAULT_ENTITY_LIMIT, DEFAULT_INDEX_PATH, DEFAULT_PREVIEW_CHARS};
use crate::errors::CoreError;

/// Environment variable overriding the artifact base path.
pub const INDEX_PATH_ENV: &str = "GRAPHRAG_INDEX_PATH";

/// Environment variable overriding the repository root.
pub const REPO_ROOT_ENV: &str = "LUMION_REPO_ROOT";

// ============================================================================
// EngineConfig
// ============================================================================

/// Configuration for a [`crate::RetrievalEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Base path of indexer output; relative paths resolve against `repo_root`.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Repository root used to resolve relative paths.
    ///
    /// Defaults to the nearest ancestor of the working directory holding
    /// `.git`, so commands run from a subdirectory find the same artifacts.
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,

    /// Characters kept in citation and timeline previews.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Maximum entities returned by local search.
    #[serde(default = "default_entity_limit")]
    pub entity_limit: usize,

    /// Drift period label to document-id path fragment.
    #[serde(default = "default_drift_periods")]
    pub drift_periods: BTreeMap<String, String>,

    /// Embedding and completion providers.
    #[serde(default)]
    pub providers: ProviderConfig,
}

fn default_index_path() -> PathBuf {
    PathBuf::from(DEFAULT_INDEX_PATH)
}

/// The repository enclosing the working directory, or the working directory.
fn default_repo_root() -> PathBuf {
    match std::env::current_dir() {
        Ok(cwd) => discover_repo_root(&cwd),
        Err(_) => PathBuf::from("."),
    }
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_entity_limit() -> usize {
    DEFAULT_ENTITY_LIMIT
}

/// Default period map: quarters scoped to the main source trees.
pub fn default_drift_periods() -> BTreeMap<String, String> {
    [("Q1", "src/app"), ("Q2", "src/components"), ("Q3", "src/lib")]
        .into_iter()
        .map(|(label, fragment)| (label.to_string(), fragment.to_string()))
        .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            repo_root: default_repo_root(),
            preview_chars: default_preview_chars(),
            entity_limit: default_entity_limit(),
            drift_periods: default_drift_periods(),
            providers: ProviderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults rooted at `repo_root`, without reading files or the environment.
    pub fn for_root(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            ..Self::default()
        }
    }

    /// Load `~/.lumion/config.yaml`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, CoreError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            CoreError::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// The Lumion home directory (`~/.lumion`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lumion"))
    }

    /// The default config file path (`~/.lumion/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join("config.yaml"))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(INDEX_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.index_path = PathBuf::from(path);
        }
        if let Some(root) = lookup(REPO_ROOT_ENV).filter(|p| !p.trim().is_empty()) {
            self.repo_root = PathBuf::from(root);
        }
        self.providers = self.providers.with_env_lookup(&lookup);
        self
    }

    /// `index_path` resolved against `repo_root`.
    pub fn resolved_index_path(&self) -> PathBuf {
        resolve_base_path(&self.index_path, &self.repo_root)
    }

    /// Path fragment scoped to a drift period label, if the label is known.
    pub fn period_fragment(&self, label: &str) -> Option<&str> {
        self.drift_periods.get(label).map(String::as_str)
    }

    /// Validate the configuration.
    ///
    /// Returns warnings for values that work but are probably unintended.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfiguration`] for an empty `indexPath`.
    pub fn validate(&self) -> Result<Vec<String>, CoreError> {
        let mut warnings = Vec::new();

        if self.index_path.as_os_str().is_empty() {
            return Err(CoreError::InvalidConfiguration {
                message: "indexPath cannot be empty".to_string(),
                hint: format!("Remove it to use the default ({})", DEFAULT_INDEX_PATH),
            });
        }

        if self.preview_chars == 0 {
            warnings.push("previewChars=0; citation previews will be empty".to_string());
        }

        if self.entity_limit == 0 {
            warnings.push("entityLimit=0; local search will return no entities".to_string());
        }

        for (label, fragment) in &self.drift_periods {
            if fragment.trim().is_empty() {
                warnings.push(format!(
                    "driftPeriods.{} has an empty fragment and matches every document",
                    label
                ));
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.index_path, PathBuf::from("graphrag-pipeline/output"));
        assert_eq!(config.preview_chars, 280);
        assert_eq!(config.entity_limit, 5);
        assert_eq!(config.period_fragment("Q2"), Some("src/components"));
        assert_eq!(config.period_fragment("Q9"), None);
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_default_repo_root_is_absolute() {
        let config = EngineConfig::default();
        assert!(config.repo_root.is_absolute());
        assert_eq!(config.repo_root, EngineConfig::default().repo_root);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = EngineConfig::from_path(&tmp.path().join("config.yaml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_from_path_partial_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(
            &path,
            "indexPath: /data/output\npreviewChars: 80\ndriftPeriods:\n  H1: src/server\n",
        )
        .unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.index_path, PathBuf::from("/data/output"));
        assert_eq!(config.preview_chars, 80);
        assert_eq!(config.entity_limit, 5);
        assert_eq!(config.period_fragment("H1"), Some("src/server"));
        assert_eq!(config.period_fragment("Q1"), None);
    }

    #[test]
    fn test_from_path_invalid_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "previewChars: [not, a, number]\n").unwrap();

        let err = EngineConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::for_root("/repo").with_env_lookup(|name| match name {
            INDEX_PATH_ENV => Some("out".to_string()),
            "OLLAMA_URL" => Some("http://localhost:11434".to_string()),
            _ => None,
        });
        assert_eq!(config.resolved_index_path(), PathBuf::from("/repo/out"));
        assert!(config.providers.has_embedding_provider());
    }

    #[test]
    fn test_validate_warnings_and_errors() {
        let config = EngineConfig {
            preview_chars: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate().unwrap().len(), 1);

        let config = EngineConfig {
            index_path: PathBuf::new(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfiguration { .. })
        ));
    }
}
