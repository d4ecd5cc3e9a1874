//! Process configuration from environment variables.
//!
//! # Responsibility
//! - Load an optional `.env` file before reading the environment.
//! - Resolve store location and logging settings for the entry point.
//!
//! # Invariants
//! - A missing `.env` file is not an error; a malformed one is.
//! - Log level and log dir follow the same rules as `init_logging`.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "PERSONBOOK_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "PERSONBOOK_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "PERSONBOOK_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    EnvFile(dotenvy::Error),
    InvalidValue { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvFile(err) => write!(f, "failed to load .env file: {err}"),
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EnvFile(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<dotenvy::Error> for ConfigError {
    fn from(value: dotenvy::Error) -> Self {
        Self::EnvFile(value)
    }
}

/// Resolved process settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite file path. `None` runs against a private in-memory store.
    pub db_path: Option<PathBuf>,
    /// Normalized log level.
    pub log_level: &'static str,
    /// Absolute log directory. `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let log_level = match read(LOG_LEVEL_ENV) {
            Some(value) => normalize_level(&value).map_err(|message| ConfigError::InvalidValue {
                key: LOG_LEVEL_ENV,
                message,
            })?,
            None => default_log_level(),
        };

        let log_dir = read(LOG_DIR_ENV)
            .map(|value| normalize_log_dir(&value))
            .transpose()
            .map_err(|message| ConfigError::InvalidValue {
                key: LOG_DIR_ENV,
                message,
            })?;

        Ok(Self {
            db_path: read(DB_PATH_ENV).map(|value| PathBuf::from(value.trim())),
            log_level,
            log_dir,
        })
    }
}

/// Loads `.env` from the current directory or its parents.
///
/// Returns `Ok(false)` when no file exists.
pub fn load_dotenv() -> Result<bool, ConfigError> {
    env_file_outcome(dotenvy::dotenv())
}

/// Loads the env file at `path`.
///
/// Returns `Ok(false)` when the file does not exist. Any other I/O failure,
/// such as `path` naming a directory, is an error.
pub fn load_dotenv_from(path: &Path) -> Result<bool, ConfigError> {
    env_file_outcome(dotenvy::from_path(path))
}

fn env_file_outcome<T>(result: Result<T, dotenvy::Error>) -> Result<bool, ConfigError> {
    match result {
        Ok(_) => Ok(true),
        Err(dotenvy::Error::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
