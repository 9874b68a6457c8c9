#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for seatring
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/seatring/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;
pub mod sections;

pub use sections::{GeneralConfig, TableConfig};

use constants::{ENV_COLOR, ENV_CYCLES, ENV_OUTPUT, ENV_SIZE, ENV_WORK_MS, MIN_TABLE_SIZE};
use serde::{Deserialize, Serialize};
use seatring_errors::{ConfigError, Error};
use seatring_types::{ColorChoice, OutputFormat};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub table: TableConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("seatring").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::from(ConfigError::NotFound {
                    path: path.display().to_string(),
                })
            } else {
                Error::io_with_path(&e, path)
            }
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or has fields of
    /// the wrong type.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// Missing files and hosts without a config directory both yield the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let Ok(config_path) = Self::default_path() else {
            return Ok(Self::default());
        };

        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading config file");
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file.
    /// If path is None, uses the default loading behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(output) = std::env::var(ENV_OUTPUT) {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_OUTPUT.to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        if let Ok(color) = std::env::var(ENV_COLOR) {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_COLOR.to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Ok(size) = std::env::var(ENV_SIZE) {
            self.table.size = size.parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_SIZE.to_string(),
                value: size,
            })?;
        }

        if let Ok(cycles) = std::env::var(ENV_CYCLES) {
            self.table.cycles_per_worker =
                cycles.parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_CYCLES.to_string(),
                    value: cycles,
                })?;
        }

        if let Ok(work_ms) = std::env::var(ENV_WORK_MS) {
            self.table.work_duration_ms =
                work_ms.parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_WORK_MS.to_string(),
                    value: work_ms,
                })?;
        }

        Ok(())
    }

    /// Check values that cannot be expressed in the TOML types alone
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the table has fewer than two
    /// resources.
    pub fn validate(&self) -> Result<(), Error> {
        if self.table.size < MIN_TABLE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "table.size".to_string(),
                value: self.table.size.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
