//! # Credentials Dispatch Configuration
//!
//! Layered configuration for the dispatch core. Values come from built-in
//! defaults, then an optional TOML file, then `CREDENTIALS_DISPATCH__*`
//! environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use credentials_dispatch::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let refresh = manager.config().gates.refresh_interval();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring credentials-dispatch.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Feature gate defaults and cache policy
    pub gates: GatesConfig,

    /// Work queue backend selection
    pub queue: QueueConfig,

    /// Feature-flag audit logging
    pub audit: AuditConfig,

    /// Log output format
    pub logging: LoggingConfig,
}

impl DispatchConfig {
    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.gates.refresh_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "gates.refresh_interval_seconds",
                "0",
                "refresh interval must be at least one second",
            ));
        }

        if self.queue.backend == QueueBackend::Spool {
            match &self.queue.spool_path {
                Some(path) if !path.as_os_str().is_empty() => {}
                _ => {
                    return Err(ConfigurationError::invalid_value(
                        "queue.spool_path",
                        "",
                        "spool backend requires a spool_path; \
                         set queue.backend = \"in_memory\" to opt into a process-local queue",
                    ))
                }
            }
        }

        for org in &self.gates.learner_records_orgs {
            if org.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "gates.learner_records_orgs",
                    org.clone(),
                    "organization names cannot be blank",
                ));
            }
        }

        Ok(())
    }
}

/// Feature gate configuration
///
/// Gates that are not named here are closed. `overrides` is applied last and
/// can open or close any gate by its full name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatesConfig {
    pub credentials_enabled: bool,
    /// Organizations with the learner record feature turned on
    pub learner_records_orgs: Vec<String>,
    pub auto_certificate_generation: bool,
    /// Publish `CertAwarded` signals to the event bus
    pub certificate_created_signal: bool,
    /// Publish `CertRevoked` signals to the event bus
    pub certificate_revoked_signal: bool,
    pub overrides: HashMap<String, bool>,
    pub refresh_interval_seconds: u64,
}

impl Default for GatesConfig {
    fn default() -> Self {
        Self {
            credentials_enabled: false,
            learner_records_orgs: Vec::new(),
            auto_certificate_generation: false,
            certificate_created_signal: false,
            certificate_revoked_signal: false,
            overrides: HashMap::new(),
            refresh_interval_seconds: 30,
        }
    }
}

impl GatesConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

/// Work queue backend
///
/// The default spool backend hands items to an external relay and needs a
/// `spool_path`. The in-memory backend keeps items inside the process and
/// must be selected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackend {
    /// Process-local; accepted items are lost when the process exits
    InMemory,
    #[default]
    Spool,
}

impl QueueBackend {
    /// Whether accepted items outlive the process
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Spool)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    /// JSON-lines file the spool backend appends work items to
    pub spool_path: Option<PathBuf>,
}

impl QueueConfig {
    /// Opt into the process-local queue
    pub fn in_memory() -> Self {
        Self {
            backend: QueueBackend::InMemory,
            spool_path: None,
        }
    }

    pub fn spool(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: QueueBackend::Spool,
            spool_path: Some(path.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}
