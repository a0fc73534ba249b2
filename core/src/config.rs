//! Configuration
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `runloop.toml` in the working directory (optional), or the file given
//!    to [`ConfigBuilder::config_path`] (required)
//! 3. Environment variables prefixed `RUNLOOP_`, with `__` between nested
//!    keys (`RUNLOOP_BENCH__DEPTH=5000`)

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "runloop.toml";
const ENV_PREFIX: &str = "RUNLOOP";

/* ===================== Errors ===================== */

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/* ===================== Sections ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Colored output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Steps per chain
    pub depth: usize,

    /// Runs per benchmark
    pub iterations: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            depth: 100_000,
            iterations: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for the tokio context; tokio's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

/* ===================== Config ===================== */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub bench: BenchConfig,
    pub runtime: RuntimeConfig,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bench.depth == 0 {
            return Err(ConfigError::Invalid {
                field: "bench.depth",
                message: "must be at least 1".to_string(),
            });
        }
        if self.bench.iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "bench.iterations",
                message: "must be at least 1".to_string(),
            });
        }
        if self.runtime.worker_threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "runtime.worker_threads",
                message: "must be at least 1 when set".to_string(),
            });
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log.filter",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/* ===================== Builder ===================== */

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Explicit config file; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `RUNLOOP_*` environment variables
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let mut builder = config::Config::builder();

        builder = match &self.config_path {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => {
                builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false))
            }
        };

        if !self.skip_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
