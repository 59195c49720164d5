//! Layered runtime settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file,
//! then `CIRCLECAST_*` environment variables (`__` separates nesting, e.g.
//! `CIRCLECAST_SESSION__TTL_SECS=600`).

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "circlecast.toml";
const ENV_PREFIX: &str = "CIRCLECAST";

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Lifetime of a freshly issued token.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub min_password_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
    pub search: SearchSettings,
}

/// Business limits handed to the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePolicy {
    pub session_ttl_ms: i64,
    pub min_password_len: usize,
    pub default_search_limit: u32,
    pub max_search_limit: u32,
}

impl Default for ServicePolicy {
    fn default() -> Self {
        Self {
            session_ttl_ms: 60 * 60 * 1000,
            min_password_len: 8,
            default_search_limit: 20,
            max_search_limit: 100,
        }
    }
}

impl Settings {
    /// Loads defaults, `./circlecast.toml` if present, then the environment.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Path::new(DEFAULT_CONFIG_FILE), false)
    }

    /// Loads defaults, the given TOML file (which must exist), then the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(path.as_ref(), true)
    }

    fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let defaults = ServicePolicy::default();
        let config = Config::builder()
            .set_default("database.path", "circlecast.db")?
            .set_default("session.ttl_secs", defaults.session_ttl_ms / 1000)?
            .set_default("auth.min_password_len", defaults.min_password_len as i64)?
            .set_default("logging.level", crate::logging::default_log_level())?
            .set_default("search.default_limit", i64::from(defaults.default_search_limit))?
            .set_default("search.max_limit", i64::from(defaults.max_search_limit))?
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::Message(
                "session.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.auth.min_password_len == 0 {
            return Err(ConfigError::Message(
                "auth.min_password_len must be greater than zero".to_string(),
            ));
        }
        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err(ConfigError::Message(format!(
                "search.default_limit must be within 1..={}",
                self.search.max_limit
            )));
        }
        Ok(())
    }

    /// Projects the settings the services enforce.
    pub fn policy(&self) -> ServicePolicy {
        let ttl_ms = self.session.ttl_secs.saturating_mul(1000);
        ServicePolicy {
            session_ttl_ms: i64::try_from(ttl_ms).unwrap_or(i64::MAX),
            min_password_len: self.auth.min_password_len,
            default_search_limit: self.search.default_limit,
            max_search_limit: self.search.max_limit,
        }
    }
}
