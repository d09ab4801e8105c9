//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe database location, lock wait budget and logging settings.
//! - Parse JSON configuration documents and validate them before use.
//!
//! # Invariants
//! - A missing `db_path` means an in-memory database.
//! - `busy_timeout_ms` must be positive; lock waits are delegated to SQLite.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_BUSY_TIMEOUT_MS: u64 = 10 * 60 * 1_000;

/// Top-level configuration for opening a document store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite database file. `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// How long a transaction waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Optional file logging settings.
    pub log: Option<LogConfig>,
}

/// File logging settings forwarded to [`crate::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// One of `trace|debug|info|warn|error`.
    #[serde(default = "default_log_level_string")]
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log: None,
        }
    }
}

impl CoreConfig {
    /// Configuration for a database file at `path` with default settings.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks value-level invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::InvalidBusyTimeout(self.busy_timeout_ms));
        }
        if let Some(path) = &self.db_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDbPath);
            }
        }
        if let Some(log) = &self.log {
            if log.level.trim().is_empty() {
                return Err(ConfigError::EmptyLogLevel);
            }
            if !log.dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(log.dir.clone()));
            }
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_log_level_string() -> String {
    crate::logging::default_log_level().to_string()
}

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidBusyTimeout(u64),
    EmptyDbPath,
    EmptyLogLevel,
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::InvalidBusyTimeout(value) => write!(
                f,
                "busy_timeout_ms must be within 1..={MAX_BUSY_TIMEOUT_MS}, got {value}"
            ),
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
            Self::EmptyLogLevel => write!(f, "log.level cannot be empty"),
            Self::RelativeLogDir(dir) => {
                write!(f, "log.dir must be an absolute path, got `{}`", dir.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.db_path.is_none());
    }

    #[test]
    fn parses_full_document() {
        let config = CoreConfig::from_json_str(
            r#"{
                "db_path": "/var/lib/docvault/store.sqlite3",
                "busy_timeout_ms": 250,
                "log": { "level": "debug", "dir": "/var/log/docvault" }
            }"#,
        )
        .expect("full config should parse");

        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/docvault/store.sqlite3"))
        );
        assert_eq!(config.busy_timeout_ms, 250);
        let log = config.log.expect("log section should be present");
        assert_eq!(log.level, "debug");
        assert_eq!(log.dir, PathBuf::from("/var/log/docvault"));
    }

    #[test]
    fn rejects_zero_busy_timeout() {
        let err = CoreConfig::from_json_str(r#"{"busy_timeout_ms": 0}"#)
            .expect_err("zero timeout must be rejected");
        assert!(matches!(err, ConfigError::InvalidBusyTimeout(0)));
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = CoreConfig::from_json_str(r#"{"log": {"level": "info", "dir": "logs"}}"#)
            .expect_err("relative log dir must be rejected");
        assert!(matches!(err, ConfigError::RelativeLogDir(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = CoreConfig::from_json_str(r#"{"dbpath": "/tmp/x"}"#)
            .expect_err("typo'd field must be rejected");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
