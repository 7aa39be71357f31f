use std::collections::HashMap;

use super::{
    learner_records_gate, AUTO_CERTIFICATE_GENERATION, CREDENTIALS_ENABLED,
    SEND_CERTIFICATE_CREATED_SIGNAL, SEND_CERTIFICATE_REVOKED_SIGNAL,
};
use crate::config::{ConfigResult, GatesConfig};

/// Where gate states come from
pub trait FeatureGateSource: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Current state of every gate this source defines
    fn load(&self) -> ConfigResult<HashMap<String, bool>>;
}

/// Gates defined by the `[gates]` configuration section
#[derive(Debug, Clone)]
pub struct ConfigGateSource {
    gates: HashMap<String, bool>,
}

impl ConfigGateSource {
    pub fn new(config: &GatesConfig) -> Self {
        let mut gates = HashMap::new();
        gates.insert(CREDENTIALS_ENABLED.to_string(), config.credentials_enabled);
        gates.insert(
            AUTO_CERTIFICATE_GENERATION.to_string(),
            config.auto_certificate_generation,
        );
        gates.insert(
            SEND_CERTIFICATE_CREATED_SIGNAL.to_string(),
            config.certificate_created_signal,
        );
        gates.insert(
            SEND_CERTIFICATE_REVOKED_SIGNAL.to_string(),
            config.certificate_revoked_signal,
        );
        for org in &config.learner_records_orgs {
            gates.insert(learner_records_gate(org), true);
        }
        for (name, enabled) in &config.overrides {
            gates.insert(name.to_lowercase(), *enabled);
        }
        Self { gates }
    }
}

impl FeatureGateSource for ConfigGateSource {
    fn name(&self) -> &str {
        "config"
    }

    fn load(&self) -> ConfigResult<HashMap<String, bool>> {
        Ok(self.gates.clone())
    }
}
