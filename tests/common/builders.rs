use chrono::{DateTime, TimeZone, Utc};
use credentials_dispatch::bootstrap::{BootstrapComponents, DispatchSystem};
use credentials_dispatch::config::{ConfigManager, DispatchConfig, QueueConfig};
use credentials_dispatch::messaging::InMemoryWorkQueue;
use credentials_dispatch::models::{CertificatesDisplayBehavior, CourseOverviewSnapshot};
use credentials_dispatch::snapshots::{InMemoryContentSource, InMemorySnapshotStore};
use std::sync::Arc;

pub const COURSE_KEY: &str = "course-v1:edX+DemoX+2024_T1";

/// Dispatch system over in-memory collaborators the test can inspect
pub struct TestSystem {
    pub system: DispatchSystem,
    pub queue: Arc<InMemoryWorkQueue>,
    pub store: Arc<InMemorySnapshotStore>,
    pub content: Arc<InMemoryContentSource>,
}

pub fn test_system(credentials_enabled: bool, learner_records_orgs: &[&str]) -> TestSystem {
    let mut config = DispatchConfig {
        queue: QueueConfig::in_memory(),
        ..DispatchConfig::default()
    };
    config.gates.credentials_enabled = credentials_enabled;
    config.gates.certificate_created_signal = true;
    config.gates.certificate_revoked_signal = true;
    config.gates.learner_records_orgs = learner_records_orgs
        .iter()
        .map(|s| s.to_string())
        .collect();

    let queue = Arc::new(InMemoryWorkQueue::new());
    let store = Arc::new(InMemorySnapshotStore::new());
    let content = Arc::new(InMemoryContentSource::new());

    let system = DispatchSystem::bootstrap_with(
        ConfigManager::from_config(config).expect("valid test config"),
        BootstrapComponents {
            submitter: Some(queue.clone()),
            snapshots: Some(store.clone()),
            content: Some(content.clone()),
            ..BootstrapComponents::default()
        },
    )
    .expect("bootstrap");

    TestSystem {
        system,
        queue,
        store,
        content,
    }
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
}

/// Instructor-paced run starting on March 1st with early certificates
pub fn base_overview() -> CourseOverviewSnapshot {
    CourseOverviewSnapshot::new(COURSE_KEY)
        .with_start(Some(day(1)))
        .with_end(Some(day(28)))
        .with_display_behavior(Some(CertificatesDisplayBehavior::EarlyNoInfo))
}
