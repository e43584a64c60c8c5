//! Directory loader for model configuration units.

use crate::error::ConfigError;
use crate::model::ModelConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use validator::Validate;

/// A unit that was not loaded
#[derive(Debug)]
pub struct SkippedUnit {
    /// Unit path
    pub path: PathBuf,
    /// Why it was skipped
    pub error: ConfigError,
}

/// Outcome of one directory scan
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Valid units as `(model_id, config)`, in file-name order
    pub units: Vec<(String, ModelConfig)>,
    /// Units that failed to read, parse or validate
    pub skipped: Vec<SkippedUnit>,
}

impl LoadReport {
    /// Model ids of the loaded units
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|(id, _)| id.as_str())
    }
}

/// Load every `*.yaml` / `*.yml` unit in `dir`.
///
/// A bad unit is logged and reported in [`LoadReport::skipped`]; it never fails the
/// whole load. A missing directory yields an empty report.
///
/// # Errors
/// Returns `ConfigError::Io` if the directory exists but cannot be listed.
pub async fn load_model_configs(dir: impl AsRef<Path>) -> Result<LoadReport, ConfigError> {
    let dir = dir.as_ref();
    let mut report = LoadReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "Model config directory not found, no routes loaded");
            return Ok(report);
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut paths = Vec::new();
    loop {
        let entry = entries.next_entry().await.map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(entry) = entry else { break };

        let path = entry.path();
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_file && is_yaml(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        match load_unit(&path).await {
            Ok((model_id, config)) => {
                debug!(model = %model_id, path = %path.display(), "Loaded model config");
                report.units.push((model_id, config));
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Skipping invalid model config");
                report.skipped.push(SkippedUnit { path, error: e });
            }
        }
    }

    info!(
        dir = %dir.display(),
        loaded = report.units.len(),
        skipped = report.skipped.len(),
        "Model configs loaded"
    );

    Ok(report)
}

async fn load_unit(path: &Path) -> Result<(String, ModelConfig), ConfigError> {
    let model_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::InvalidModelId {
            path: path.to_path_buf(),
        })?
        .to_string();

    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let config = ModelConfig::from_yaml(&source).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    config.validate().map_err(|source| ConfigError::Validation {
        path: path.to_path_buf(),
        source,
    })?;

    Ok((model_id, config))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = "api:\n  url: http://localhost:8080/v1/chat/completions\nmodel:\n  path: /models/a.gguf\n";

    #[tokio::test]
    async fn test_loads_valid_units_in_order() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("fast.yaml"), VALID).expect("write");
        fs::write(dir.path().join("expert.yml"), VALID).expect("write");
        fs::write(dir.path().join("README.md"), "ignored").expect("write");

        let report = load_model_configs(dir.path()).await.expect("load");

        assert_eq!(report.model_ids().collect::<Vec<_>>(), vec!["expert", "fast"]);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_units_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("good.yaml"), VALID).expect("write");
        fs::write(dir.path().join("broken.yaml"), "api: [unclosed").expect("write");
        fs::write(
            dir.path().join("relative.yaml"),
            "api:\n  url: /relative\nmodel:\n  path: m\n",
        )
        .expect("write");

        let report = load_model_configs(dir.path()).await.expect("load");

        assert_eq!(report.model_ids().collect::<Vec<_>>(), vec!["good"]);
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .any(|s| matches!(s.error, ConfigError::Parse { .. })));
        assert!(report
            .skipped
            .iter()
            .any(|s| matches!(s.error, ConfigError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_unit_with_extra_keys_loads() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("expert.yaml"),
            format!("description: Expert model\nowner: research\n{VALID}"),
        )
        .expect("write");

        let report = load_model_configs(dir.path()).await.expect("load");

        assert_eq!(report.model_ids().collect::<Vec<_>>(), vec!["expert"]);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let report = load_model_configs(dir.path().join("absent"))
            .await
            .expect("load");

        assert!(report.units.is_empty());
        assert!(report.skipped.is_empty());
    }
}
