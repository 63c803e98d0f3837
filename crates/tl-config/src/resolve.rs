//! Configuration resolution: CLI path → `TL_CONFIG` → XDG config dir → defaults.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::pipeline::PipelineConfig;
use crate::validate::{validate, ValidationError, ValidationResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TL_CONFIG";

/// Directory name under the platform config dir.
const CONFIG_DIR_NAME: &str = "telemetry_lens";

/// File names probed inside the user config directory, in order.
const CONFIG_FILE_NAMES: [&str; 2] = ["config.toml", "config.json"];

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported config format for {} (expected .toml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("configuration failed validation: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Env(PathBuf),
    User(PathBuf),
    Defaults,
}

/// Candidate locations, in priority order.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub explicit: Option<PathBuf>,
    pub env: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Gather candidates from the CLI flag, the environment and the platform config dir.
    pub fn discover(explicit: Option<&Path>) -> Self {
        Self {
            explicit: explicit.map(Path::to_path_buf),
            env: std::env::var_os(CONFIG_ENV_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            user_dir: dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME)),
        }
    }
}

/// A loaded, validated configuration and its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub config: PipelineConfig,
    pub source: ConfigSource,
    pub warnings: Vec<String>,
}

/// Resolve and validate the effective configuration.
///
/// An explicit or env path that does not exist is an error; a missing user
/// config directory silently falls back to defaults.
pub fn resolve_config(paths: &ConfigPaths) -> Result<ResolvedConfig, ConfigError> {
    let (config, source) = if let Some(path) = &paths.explicit {
        (load_file(path)?, ConfigSource::Explicit(path.clone()))
    } else if let Some(path) = &paths.env {
        (load_file(path)?, ConfigSource::Env(path.clone()))
    } else if let Some(path) = paths.user_dir.as_deref().and_then(find_user_file) {
        (load_file(&path)?, ConfigSource::User(path))
    } else {
        debug!("no config file found, using defaults");
        (PipelineConfig::default(), ConfigSource::Defaults)
    };

    let ValidationResult { errors, warnings } = validate(&config);
    if !errors.is_empty() {
        return Err(ConfigError::Invalid(errors));
    }
    info!(source = ?source, "configuration resolved");
    Ok(ResolvedConfig {
        config,
        source,
        warnings,
    })
}

fn find_user_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Load a config file, choosing the parser by extension.
pub fn load_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("toml") => PipelineConfig::from_toml(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        Some("json") => PipelineConfig::from_json(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_paths_use_defaults() {
        let resolved = resolve_config(&ConfigPaths::default()).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, PipelineConfig::default());
    }

    #[test]
    fn explicit_toml_wins_over_env() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("a.toml");
        let env = dir.path().join("b.json");
        fs::write(&explicit, "[aggregate]\nmax_points = 42\n").unwrap();
        fs::write(&env, r#"{"aggregate": {"max_points": 7}}"#).unwrap();

        let paths = ConfigPaths {
            explicit: Some(explicit.clone()),
            env: Some(env),
            user_dir: None,
        };
        let resolved = resolve_config(&paths).unwrap();
        assert_eq!(resolved.config.aggregate.max_points, 42);
        assert_eq!(resolved.source, ConfigSource::Explicit(explicit));
    }

    #[test]
    fn user_dir_probed_when_nothing_explicit() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"aggregate": {"kpi_cap": 3}}"#).unwrap();
        let paths = ConfigPaths {
            user_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let resolved = resolve_config(&paths).unwrap();
        assert_eq!(resolved.config.aggregate.kpi_cap, 3);
        assert!(matches!(resolved.source, ConfigSource::User(_)));
    }

    #[test]
    fn missing_user_dir_falls_back() {
        let dir = tempdir().unwrap();
        let paths = ConfigPaths {
            user_dir: Some(dir.path().join("nope")),
            ..Default::default()
        };
        assert_eq!(resolve_config(&paths).unwrap().source, ConfigSource::Defaults);
    }

    #[test]
    fn missing_explicit_is_error() {
        let paths = ConfigPaths {
            explicit: Some(PathBuf::from("/definitely/not/here.toml")),
            ..Default::default()
        };
        assert!(matches!(resolve_config(&paths), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn bad_json_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.toml");
        fs::write(&path, "[aggregate]\nbucket_secs = 0\n").unwrap();
        let paths = ConfigPaths {
            explicit: Some(path),
            ..Default::default()
        };
        match resolve_config(&paths) {
            Err(ConfigError::Invalid(errors)) => {
                assert_eq!(errors[0].field, "aggregate.bucket_secs")
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn unknown_extension_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.yaml");
        fs::write(&path, "a: 1").unwrap();
        assert!(matches!(load_file(&path), Err(ConfigError::UnsupportedFormat(_))));
    }
}
