//! Configuration management for deskdb.
//!
//! Loads the TOML configuration file and turns it into the plain option
//! structs the driver takes.

use crate::db::{EngineKind, SqliteOptions};
use crate::driver::DriverOptions;
use crate::error::{DeskError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for deskdb.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Engine backend.
    #[serde(default)]
    pub engine: EngineKind,

    /// Session behaviour.
    #[serde(default)]
    pub session: SessionConfig,

    /// Result rendering.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds to wait on a locked database file.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Refresh linked tables after a one-shot mutating statement.
    #[serde(default = "default_true")]
    pub refresh_links_after_execute: bool,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            busy_timeout_secs: default_busy_timeout_secs(),
            refresh_links_after_execute: default_true(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// "table" or "json".
    #[serde(default = "default_format")]
    pub format: String,

    /// Widest a table cell is printed before truncation.
    #[serde(default = "default_max_column_width")]
    pub max_column_width: usize,
}

fn default_format() -> String {
    "table".to_string()
}

fn default_max_column_width() -> usize {
    40
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            max_column_width: default_max_column_width(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deskdb")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file; a missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| DeskError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            DeskError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.output.format.as_str(), "table" | "json") {
            return Err(DeskError::config(format!(
                "Unknown output format '{}'. Expected 'table' or 'json'",
                self.output.format
            )));
        }
        if self.output.max_column_width < 3 {
            return Err(DeskError::config("max_column_width must be at least 3"));
        }
        Ok(())
    }

    /// Engine options derived from the session settings.
    pub fn sqlite_options(&self) -> SqliteOptions {
        SqliteOptions {
            busy_timeout: Duration::from_secs(self.session.busy_timeout_secs),
        }
    }

    /// Driver options derived from the session settings.
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            refresh_links_after_execute: self.session.refresh_links_after_execute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
engine = "sqlite"

[session]
busy_timeout_secs = 30
refresh_links_after_execute = false

[output]
format = "json"
max_column_width = 12
"#;
        let config = Config::parse_toml(toml, Path::new("config.toml")).unwrap();

        assert_eq!(config.engine, EngineKind::Sqlite);
        assert_eq!(config.sqlite_options().busy_timeout, Duration::from_secs(30));
        assert!(!config.driver_options().refresh_links_after_execute);
        assert_eq!(config.output.format, "json");
        assert_eq!(config.output.max_column_width, 12);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::parse_toml("", Path::new("config.toml")).unwrap();

        assert_eq!(config.engine, EngineKind::Sqlite);
        assert_eq!(config.session.busy_timeout_secs, 5);
        assert!(config.session.refresh_links_after_execute);
        assert_eq!(config.output.format, "table");
        assert_eq!(config.output.max_column_width, 40);
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let err = Config::parse_toml("engine = \"access\"", Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, DeskError::Config(_)));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = Config::parse_toml("[output]\nformat = \"csv\"", Path::new("config.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("Unknown output format"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from_file(Path::new("/nonexistent/deskdb.toml")).unwrap();
        assert_eq!(config.output.max_column_width, 40);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nbusy_timeout_secs = 1").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.session.busy_timeout_secs, 1);
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = Config::default_path();
        assert!(path.ends_with("deskdb/config.toml"));
    }
}
