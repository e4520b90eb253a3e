//! Engine configuration.
//!
//! Loaded from JSON. Every field is optional; missing fields take defaults.

use crate::budget::DeploymentBudget;
use crate::lifecycle::GuardRules;
use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Configuration load failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub rules: GuardRules,
    /// Deployments allowed per session; `None` is unlimited.
    pub deployment_quota: Option<u32>,
    /// SQLite file; `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Initial deployment budget for a session.
    pub fn deployment_budget(&self) -> DeploymentBudget {
        DeploymentBudget::from_quota(self.deployment_quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.rules.min_publish_title_chars, 3);
        assert_eq!(config.deployment_budget(), DeploymentBudget::unlimited());
    }

    #[test]
    fn partial_rules_keep_remaining_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"rules": {"min_objectives": 2}, "deployment_quota": 4, "logging": {"level": "warn"}}"#,
        )
        .unwrap();
        assert_eq!(config.rules.min_objectives, 2);
        assert_eq!(config.rules.min_publish_title_chars, 3);
        assert_eq!(config.deployment_budget().remaining(), Some(4));
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{rules:").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
