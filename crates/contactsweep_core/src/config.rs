//! Runtime configuration for service hosts (CLI, FFI).
//!
//! Precedence: defaults < JSON file < environment overrides.

use crate::capability::{
    CapabilityError, GrantedCapabilities, CAPABILITY_READ_CONTACTS, CAPABILITY_WRITE_CONTACTS,
};
use crate::logging::{default_log_level, normalize_level, LoggingError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "CONTACTSWEEP_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CONTACTSWEEP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CONTACTSWEEP_LOG_DIR";
/// Comma-separated capability ids, e.g. `read_contacts,write_contacts`.
pub const ENV_CAPABILITIES: &str = "CONTACTSWEEP_CAPABILITIES";

const DEFAULT_DB_FILE_NAME: &str = "contactsweep_contacts.sqlite3";

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub granted_capabilities: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            granted_capabilities: vec![
                CAPABILITY_READ_CONTACTS.to_string(),
                CAPABILITY_WRITE_CONTACTS.to_string(),
            ],
        }
    }
}

/// Configuration load and validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    EmptyDbPath,
    LogLevel(LoggingError),
    Capability(CapabilityError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::EmptyDbPath => write!(f, "db_path must not be empty"),
            Self::LogLevel(err) => write!(f, "{err}"),
            Self::Capability(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::LogLevel(err) => Some(err),
            Self::Capability(err) => Some(err),
            Self::EmptyDbPath => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<CapabilityError> for ConfigError {
    fn from(value: CapabilityError) -> Self {
        Self::Capability(value)
    }
}

impl DedupConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Applies `CONTACTSWEEP_*` process environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(db_path) = non_blank(ENV_DB_PATH) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(log_dir) = non_blank(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(log_dir));
        }
        if let Some(capabilities) = non_blank(ENV_CAPABILITIES) {
            self.granted_capabilities = capabilities
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect();
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        normalize_level(&self.log_level).map_err(ConfigError::LogLevel)?;
        self.capabilities()?;
        Ok(())
    }

    pub fn capabilities(&self) -> Result<GrantedCapabilities, ConfigError> {
        Ok(GrantedCapabilities::parse(self.granted_capabilities.as_slice())?)
    }
}
