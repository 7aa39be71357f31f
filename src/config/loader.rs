//! Configuration Loader
//!
//! Environment-aware configuration loading. Layers built-in defaults, an
//! optional TOML file and `CREDENTIALS_DISPATCH__*` environment variables
//! using the `config` crate, then validates the merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::DispatchConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File looked up relative to the working directory when no path is given
pub const DEFAULT_CONFIG_BASENAME: &str = "config/credentials-dispatch";

/// Prefix for environment overrides, e.g. `CREDENTIALS_DISPATCH__GATES__CREDENTIALS_ENABLED`
pub const ENV_PREFIX: &str = "CREDENTIALS_DISPATCH";

/// Loaded, validated configuration together with its provenance
#[derive(Debug)]
pub struct ConfigManager {
    config: DispatchConfig,
    environment: String,
    source_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_path(None)
    }

    /// Load configuration, reading `path` as a required TOML file when given
    pub fn load_from_path(path: Option<&Path>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigurationError::ConfigFileNotFound {
                    path: path.to_path_buf(),
                });
            }
        }

        let mut builder =
            Config::builder().add_source(Config::try_from(&DispatchConfig::default())?);

        builder = match path {
            Some(path) => {
                builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
            }
            None => builder.add_source(
                File::with_name(DEFAULT_CONFIG_BASENAME)
                    .format(FileFormat::Toml)
                    .required(false),
            ),
        };

        let merged = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("gates.learner_records_orgs"),
            )
            .build()?;

        let config: DispatchConfig = merged.try_deserialize()?;
        config.validate()?;

        debug!(
            environment = %environment,
            source = ?path,
            "Configuration merged: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = %environment,
            credentials_enabled = config.gates.credentials_enabled,
            queue_backend = ?config.queue.backend,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source_path: path.map(Path::to_path_buf),
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: DispatchConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source_path: None,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Explicit file this configuration was read from, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("CREDENTIALS_DISPATCH_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}
