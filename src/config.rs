//! Explorer configuration: JSON file with every field defaulted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SPEC_URL: &str = "http://localhost:5029/swagger/v1/swagger.json";
pub const DEFAULT_STORE_PATH: &str = ".openapi-explorer/state.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExplorerConfig {
    #[serde(default = "ExplorerConfig::default_spec_url")]
    pub spec_url: String,
    /// Overrides the base URL derived from `spec_url`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// SQLite file holding persisted state, or `:memory:`.
    #[serde(default = "ExplorerConfig::default_store_path")]
    pub store_path: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            spec_url: Self::default_spec_url(),
            base_url: None,
            store_path: Self::default_store_path(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExplorerConfig {
    fn default_spec_url() -> String {
        DEFAULT_SPEC_URL.to_string()
    }

    fn default_store_path() -> String {
        DEFAULT_STORE_PATH.to_string()
    }

    fn normalize(mut self) -> Self {
        let defaults = Self::default();
        if self.spec_url.trim().is_empty() {
            self.spec_url = defaults.spec_url;
        }
        if self.store_path.trim().is_empty() {
            self.store_path = defaults.store_path;
        }
        if self.base_url.as_deref().is_some_and(|b| b.trim().is_empty()) {
            self.base_url = None;
        }
        if self.logging.level.trim().is_empty() {
            self.logging.level = defaults.logging.level;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

/// Read the config at `path`, or return defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ExplorerConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ExplorerConfig::default());
    };
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: ExplorerConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cfg.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_config_without_path_uses_defaults() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.spec_url, DEFAULT_SPEC_URL);
        assert_eq!(cfg.store_path, DEFAULT_STORE_PATH);
        assert_eq!(cfg.base_url, None);
        assert_eq!(cfg.logging, LoggingConfig::default());
    }

    #[test]
    fn load_config_fills_missing_fields() {
        let file = write_config(r#"{"base_url": "http://api.local", "logging": {"json": true}}"#);
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.spec_url, DEFAULT_SPEC_URL);
        assert_eq!(cfg.base_url.as_deref(), Some("http://api.local"));
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.logging.json);
    }

    #[test]
    fn load_config_normalizes_blank_strings() {
        let file = write_config(
            r#"{"spec_url": " ", "store_path": "", "base_url": "", "logging": {"level": ""}}"#,
        );
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg, ExplorerConfig::default());
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_config_reports_invalid_json() {
        let file = write_config("{not json");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
