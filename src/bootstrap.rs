//! # Dispatch System Bootstrap
//!
//! Composes the dispatch core from configuration: feature gates, the work
//! submitter, snapshot storage, the event bus with its program credential
//! subscriptions, and the waffle audit observer.
//!
//! The event bus is fully wired before it is shared; after bootstrap it is
//! only read.

use std::sync::Arc;
use tracing::{info, warn};

use crate::audit::WaffleObserver;
use crate::config::ConfigManager;
use crate::dispatch::TaskDispatcher;
use crate::error::Result;
use crate::events::{EventBus, EventType, PublishReport};
use crate::gates::{CachedGates, ConfigGateSource, FeatureGateSource};
use crate::handlers::{
    publish_certificate_event, register_program_handlers, CourseOverviewHandlers, PublishOutcome,
};
use crate::messaging::{submitter_from_config, WorkSubmitter};
use crate::models::{CertificateRecord, CourseRunKey};
use crate::snapshots::{
    CourseContentSource, InMemoryContentSource, InMemorySnapshotStore, SnapshotProvider,
};

/// Collaborators the host may supply; anything left `None` is built from
/// configuration (the submitter) or defaults to an in-memory implementation
#[derive(Default)]
pub struct BootstrapComponents {
    pub gate_source: Option<Arc<dyn FeatureGateSource>>,
    pub submitter: Option<Arc<dyn WorkSubmitter>>,
    pub snapshots: Option<Arc<dyn SnapshotProvider>>,
    pub content: Option<Arc<dyn CourseContentSource>>,
}

/// Summary of a running dispatch system
#[derive(Debug, Clone)]
pub struct SystemStatus {
    pub environment: String,
    pub queue_backend: &'static str,
    pub subscriptions: usize,
    pub audit_enabled: bool,
}

pub struct DispatchSystem {
    config_manager: Arc<ConfigManager>,
    bus: Arc<EventBus>,
    dispatcher: Arc<TaskDispatcher>,
    gates: Arc<CachedGates>,
    submitter: Arc<dyn WorkSubmitter>,
    snapshots: Arc<dyn SnapshotProvider>,
    course_handlers: CourseOverviewHandlers,
    waffle_observer: WaffleObserver,
}

impl DispatchSystem {
    /// Bootstrap with every collaborator built from configuration
    pub fn bootstrap(config_manager: Arc<ConfigManager>) -> Result<Self> {
        Self::bootstrap_with(config_manager, BootstrapComponents::default())
    }

    pub fn bootstrap_with(
        config_manager: Arc<ConfigManager>,
        components: BootstrapComponents,
    ) -> Result<Self> {
        let config = config_manager.config();

        let gate_source = components
            .gate_source
            .unwrap_or_else(|| Arc::new(ConfigGateSource::new(&config.gates)));
        let gates = Arc::new(CachedGates::new(gate_source, config.gates.refresh_interval()));

        let submitter = match components.submitter {
            Some(submitter) => submitter,
            None => {
                if !config.queue.backend.is_durable() {
                    warn!("In-memory work queue selected; queued tasks are lost on exit");
                }
                submitter_from_config(&config.queue)?
            }
        };
        let snapshots = components
            .snapshots
            .unwrap_or_else(|| Arc::new(InMemorySnapshotStore::new()));
        let content = components
            .content
            .unwrap_or_else(|| Arc::new(InMemoryContentSource::new()));

        let dispatcher = Arc::new(TaskDispatcher::new(
            Arc::clone(&gates),
            Arc::clone(&submitter),
            Arc::clone(&snapshots),
        ));

        let mut bus = EventBus::new();
        register_program_handlers(&mut bus, Arc::clone(&dispatcher));
        let bus = Arc::new(bus);

        let course_handlers =
            CourseOverviewHandlers::new(Arc::clone(&snapshots), content, Arc::clone(&bus));

        info!(
            environment = %config_manager.environment(),
            queue_backend = submitter.backend_name(),
            subscriptions = bus.handler_count(),
            "🚀 Credentials dispatch system bootstrapped"
        );

        Ok(Self {
            waffle_observer: WaffleObserver::new(config.audit.enabled),
            config_manager,
            bus,
            dispatcher,
            gates,
            submitter,
            snapshots,
            course_handlers,
        })
    }

    /// Course run `key` was published
    pub async fn course_published(&self, key: &CourseRunKey) -> Result<PublishOutcome> {
        self.course_handlers.on_course_published(key).await
    }

    /// Course run `key` was deleted
    pub async fn course_deleted(&self, key: &CourseRunKey) -> Result<PublishReport> {
        self.course_handlers.on_course_deleted(key).await
    }

    /// A certificate was awarded; `None` while the created signal is off
    pub async fn certificate_awarded(
        &self,
        record: CertificateRecord,
    ) -> Result<Option<PublishReport>> {
        publish_certificate_event(&self.bus, &self.gates, EventType::CertAwarded, record).await
    }

    pub async fn certificate_changed(
        &self,
        record: CertificateRecord,
    ) -> Result<Option<PublishReport>> {
        publish_certificate_event(&self.bus, &self.gates, EventType::CertChanged, record).await
    }

    /// A certificate was revoked; `None` while the revoked signal is off
    pub async fn certificate_revoked(
        &self,
        record: CertificateRecord,
    ) -> Result<Option<PublishReport>> {
        publish_certificate_event(&self.bus, &self.gates, EventType::CertRevoked, record).await
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            environment: self.config_manager.environment().to_string(),
            queue_backend: self.submitter.backend_name(),
            subscriptions: self.bus.handler_count(),
            audit_enabled: self.waffle_observer.is_enabled(),
        }
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config_manager
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn dispatcher(&self) -> &Arc<TaskDispatcher> {
        &self.dispatcher
    }

    pub fn gates(&self) -> &Arc<CachedGates> {
        &self.gates
    }

    pub fn submitter(&self) -> &Arc<dyn WorkSubmitter> {
        &self.submitter
    }

    pub fn snapshots(&self) -> &Arc<dyn SnapshotProvider> {
        &self.snapshots
    }

    pub fn waffle_observer(&self) -> &WaffleObserver {
        &self.waffle_observer
    }
}

impl std::fmt::Debug for DispatchSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchSystem")
            .field("status", &self.status())
            .finish()
    }
}
