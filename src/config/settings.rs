//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::DEFAULT_MAX_MESSAGE_BYTES;
use crate::store::GLOBAL_PROJECT_SLUG;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Largest accepted request frame, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Slug of the project tool calls use when they name none.
    #[serde(default = "default_project")]
    pub default_project: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            database_path: default_database_path(),
            max_message_bytes: default_max_message_bytes(),
            default_project: default_project(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_bytes == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_message_bytes must be greater than zero".to_string(),
            });
        }

        if self.default_project.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "default_project must not be empty".to_string(),
            });
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "database_path must not be empty".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }

        Ok(())
    }

    /// Returns the configuration with `~` expanded in every path.
    #[must_use]
    pub fn with_expanded_paths(mut self) -> Self {
        self.database_path = super::expand_home(&self.database_path);
        self.logging.file = self.logging.file.map(|f| super::expand_home(&f));
        self
    }
}

fn default_database_path() -> PathBuf {
    super::default_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("memories.db")
}

const fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

fn default_project() -> String {
    GLOBAL_PROJECT_SLUG.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(config.default_project, "global");
        assert!(config.database_path.ends_with("memories.db"));
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "database_path": "/var/lib/memories/store.db",
            "max_message_bytes": 65536,
            "default_project": "work",
            "logging": {
                "level": "debug",
                "file": "/tmp/mcp-memories.log"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/memories/store.db")
        );
        assert_eq!(config.max_message_bytes, 65536);
        assert_eq!(config.default_project, "work");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/tmp/mcp-memories.log"))
        );
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
        assert!(config.file.is_none());
    }

    #[test]
    fn reject_zero_message_limit() {
        let config: Config = serde_json::from_str(r#"{"max_message_bytes": 0}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_message_bytes"));
    }

    #[test]
    fn reject_blank_default_project() {
        let config: Config = serde_json::from_str(r#"{"default_project": "  "}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_invalid_log_level() {
        let config: Config = serde_json::from_str(r#"{"logging": {"level": "loud"}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let config: Config = serde_json::from_str(r#"{"logging": {"level": "INFO"}}"#).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
