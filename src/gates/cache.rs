use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::source::FeatureGateSource;
use crate::config::{ConfigResult, ConfigurationError};

/// Immutable view of gate states at one point in time
#[derive(Debug, Clone)]
pub struct GateSnapshot {
    gates: HashMap<String, bool>,
    loaded_at: Instant,
}

impl GateSnapshot {
    pub fn new(gates: HashMap<String, bool>) -> Self {
        Self {
            gates: gates
                .into_iter()
                .map(|(name, enabled)| (name.to_lowercase(), enabled))
                .collect(),
            loaded_at: Instant::now(),
        }
    }

    /// Snapshot in which every gate is closed
    pub fn closed() -> Self {
        Self::new(HashMap::new())
    }

    /// Whether `gate` is open; undefined gates are closed
    pub fn is_enabled(&self, gate: &str) -> bool {
        self.gates
            .get(&gate.to_lowercase())
            .copied()
            .unwrap_or(false)
    }

    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }
}

/// Gate snapshot cache with a time-based refresh policy
pub struct CachedGates {
    source: Arc<dyn FeatureGateSource>,
    refresh_interval: Duration,
    current: RwLock<Option<Arc<GateSnapshot>>>,
}

impl CachedGates {
    pub fn new(source: Arc<dyn FeatureGateSource>, refresh_interval: Duration) -> Self {
        Self {
            source,
            refresh_interval,
            current: RwLock::new(None),
        }
    }

    /// Current snapshot, reloading from the source when stale or invalidated
    pub fn snapshot(&self) -> ConfigResult<Arc<GateSnapshot>> {
        if let Some(snapshot) = self.current.read().as_ref() {
            if snapshot.age() < self.refresh_interval {
                return Ok(Arc::clone(snapshot));
            }
        }

        let mut current = self.current.write();
        // Another caller may have refreshed while we waited for the lock
        if let Some(snapshot) = current.as_ref() {
            if snapshot.age() < self.refresh_interval {
                return Ok(Arc::clone(snapshot));
            }
        }

        let gates = self.source.load().map_err(|e| {
            ConfigurationError::gate_source_unavailable(self.source.name(), e.to_string())
        })?;
        debug!(
            source = self.source.name(),
            gate_count = gates.len(),
            "Refreshed feature gate snapshot"
        );

        let snapshot = Arc::new(GateSnapshot::new(gates));
        *current = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the cached snapshot so the next read reloads from the source
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }
}

impl std::fmt::Debug for CachedGates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedGates")
            .field("source", &self.source.name())
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}
