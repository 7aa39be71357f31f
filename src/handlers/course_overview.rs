//! # Course Overview Handlers
//!
//! React to course publish and delete notifications: refresh the stored
//! overview snapshot, detect what changed and publish the resulting events.
//!
//! Start date and pacing events are published as soon as the new snapshot is
//! stored. Certificate availability events are deferred to a [`UnitOfWork`]
//! and only reach subscribers once the snapshot update has succeeded. Once
//! stored, the unit is always committed, even when an immediate publish
//! fails; the first failure is returned afterwards.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DispatchError, Result};
use crate::events::{ChangeDetector, ChangeEvent, EventBus, EventType, PublishReport, UnitOfWork};
use crate::logging::log_dispatch_operation;
use crate::models::CourseRunKey;
use crate::snapshots::{CourseContentSource, SnapshotProvider};

/// Result of handling a publish notification
#[derive(Debug, Default)]
pub struct PublishOutcome {
    /// Events detected for the course run, in detection order
    pub events: Vec<ChangeEvent>,
    /// Reports for every event actually published
    pub reports: Vec<PublishReport>,
}

impl PublishOutcome {
    pub fn event_types(&self) -> Vec<EventType> {
        self.events.iter().map(|e| e.event_type).collect()
    }
}

pub struct CourseOverviewHandlers {
    snapshots: Arc<dyn SnapshotProvider>,
    content: Arc<dyn CourseContentSource>,
    bus: Arc<EventBus>,
    detector: ChangeDetector,
}

impl CourseOverviewHandlers {
    pub fn new(
        snapshots: Arc<dyn SnapshotProvider>,
        content: Arc<dyn CourseContentSource>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            snapshots,
            content,
            bus,
            detector: ChangeDetector::new(),
        }
    }

    /// Handle a course publish notification for `key`
    ///
    /// Fails with `NotFound` when the content source has nothing published
    /// for `key`. Storage errors abort before anything is published. After a
    /// successful store every detected event is published.
    pub async fn on_course_published(&self, key: &CourseRunKey) -> Result<PublishOutcome> {
        let previous = match self.snapshots.get(key).await {
            Ok(previous) => previous,
            // a provider that reports absence as an error means "no previous state"
            Err(DispatchError::NotFound(_)) => None,
            Err(err) => return Err(err),
        };
        let updated = self
            .content
            .load_overview(key)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("published course {key}")))?;

        let mut unit = UnitOfWork::begin();
        let events = self.detector.detect(previous.as_ref(), &updated);

        if let Err(err) = self.snapshots.put(updated).await {
            warn!(course_key = %key, error = %err, "Failed to store course overview");
            unit.rollback();
            return Err(err);
        }

        let mut reports = Vec::new();
        let mut first_error = None;
        for event in &events {
            match event.event_type {
                EventType::CertAvailabilityChanged => unit.publish_on_commit(event.clone()),
                _ => {
                    if event.event_type == EventType::Created {
                        info!(
                            course_key = %key,
                            "Course overview created, importing course details"
                        );
                    }
                    match self.bus.publish(event).await {
                        Ok(report) => reports.push(report),
                        Err(err) => {
                            warn!(
                                course_key = %key,
                                event_type = %event.event_type,
                                error = %err,
                                "Immediate publish failed"
                            );
                            first_error.get_or_insert(err);
                        }
                    }
                }
            }
        }

        // The snapshot is stored, so deferred events go out regardless
        match unit.commit(&self.bus).await {
            Ok(committed) => reports.extend(committed),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        log_dispatch_operation(
            "course_published",
            &events
                .iter()
                .map(|e| e.event_type.name())
                .collect::<Vec<_>>()
                .join(","),
            key.as_str(),
            "handled",
            None,
        );

        Ok(PublishOutcome { events, reports })
    }

    /// Handle a course delete notification for `key`
    ///
    /// The `Deleted` event is published whether or not a snapshot was stored.
    pub async fn on_course_deleted(&self, key: &CourseRunKey) -> Result<PublishReport> {
        let existed = self.snapshots.remove(key).await?;
        info!(course_key = %key, had_snapshot = existed, "Course deleted, removing course details");

        self.bus.publish(&ChangeEvent::deleted(key.clone())).await
    }
}

impl std::fmt::Debug for CourseOverviewHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourseOverviewHandlers")
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{fn_subscriber, DispatchMode, EventHandlerError};
    use crate::models::{CertificatesDisplayBehavior, CourseOverviewSnapshot};
    use crate::snapshots::{InMemoryContentSource, InMemorySnapshotStore};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    const KEY: &str = "course-v1:edX+DemoX+2024_T1";

    struct Fixture {
        handlers: CourseOverviewHandlers,
        store: Arc<InMemorySnapshotStore>,
        content: Arc<InMemoryContentSource>,
        seen: Arc<Mutex<Vec<EventType>>>,
    }

    fn recording_bus(seen: Arc<Mutex<Vec<EventType>>>) -> EventBus {
        let mut bus = EventBus::new();
        for event_type in EventType::ALL {
            let seen = Arc::clone(&seen);
            bus.subscribe(
                event_type,
                "recorder",
                DispatchMode::Robust,
                Arc::new(fn_subscriber(move |event: ChangeEvent| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock().push(event.event_type);
                        Ok(())
                    }
                })),
            );
        }
        bus
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemorySnapshotStore::new());
        let content = Arc::new(InMemoryContentSource::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handlers = CourseOverviewHandlers::new(
            store.clone(),
            content.clone(),
            Arc::new(recording_bus(Arc::clone(&seen))),
        );
        Fixture {
            handlers,
            store,
            content,
            seen,
        }
    }

    fn base() -> CourseOverviewSnapshot {
        CourseOverviewSnapshot::new(KEY)
            .with_start(Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()))
            .with_display_behavior(Some(CertificatesDisplayBehavior::EarlyNoInfo))
    }

    #[tokio::test]
    async fn test_first_publish_creates() {
        let f = fixture();
        f.content.publish(base());

        let outcome = f.handlers.on_course_published(&CourseRunKey::new(KEY)).await.unwrap();
        assert_eq!(outcome.event_types(), vec![EventType::Created]);
        assert_eq!(*f.seen.lock(), vec![EventType::Created]);
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_republish_without_changes_publishes_nothing() {
        let f = fixture();
        f.store.put(base()).await.unwrap();
        f.content.publish(base());

        let outcome = f.handlers.on_course_published(&CourseRunKey::new(KEY)).await.unwrap();
        assert!(outcome.events.is_empty());
        assert!(f.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cert_availability_published_after_immediate_events() {
        let f = fixture();
        f.store.put(base()).await.unwrap();
        f.content.publish(
            base()
                .with_self_paced(true)
                .with_certificate_available_date(Some(
                    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                )),
        );

        let outcome = f.handlers.on_course_published(&CourseRunKey::new(KEY)).await.unwrap();
        assert_eq!(
            outcome.event_types(),
            vec![EventType::PacingChanged, EventType::CertAvailabilityChanged]
        );
        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(
            *f.seen.lock(),
            vec![EventType::PacingChanged, EventType::CertAvailabilityChanged]
        );
        assert!(f
            .store
            .get(&CourseRunKey::new(KEY))
            .await
            .unwrap()
            .unwrap()
            .self_paced);
    }

    #[tokio::test]
    async fn test_unpublished_course_is_not_found() {
        let f = fixture();
        let err = f
            .handlers
            .on_course_published(&CourseRunKey::new(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
        assert!(f.seen.lock().is_empty());
    }

    struct FailingPutStore {
        inner: InMemorySnapshotStore,
    }

    #[async_trait]
    impl SnapshotProvider for FailingPutStore {
        async fn get(&self, key: &CourseRunKey) -> Result<Option<CourseOverviewSnapshot>> {
            self.inner.get(key).await
        }

        async fn put(&self, _snapshot: CourseOverviewSnapshot) -> Result<()> {
            Err(DispatchError::Configuration("store offline".to_string()))
        }

        async fn remove(&self, key: &CourseRunKey) -> Result<bool> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_store_publishes_nothing() {
        let inner = InMemorySnapshotStore::new();
        inner.put(base()).await.unwrap();
        let store = Arc::new(FailingPutStore { inner });
        let content = Arc::new(InMemoryContentSource::new());
        content.publish(base().with_end(Some(Utc::now())).with_display_behavior(Some(
            CertificatesDisplayBehavior::End,
        )));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handlers =
            CourseOverviewHandlers::new(store, content, Arc::new(recording_bus(Arc::clone(&seen))));

        assert!(handlers
            .on_course_published(&CourseRunKey::new(KEY))
            .await
            .is_err());
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_immediate_publish_still_commits_deferred_events() {
        let store = Arc::new(InMemorySnapshotStore::new());
        store.put(base()).await.unwrap();
        let content = Arc::new(InMemoryContentSource::new());
        content.publish(
            base()
                .with_self_paced(true)
                .with_certificate_available_date(Some(
                    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                )),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = recording_bus(Arc::clone(&seen));
        bus.subscribe(
            EventType::PacingChanged,
            "pacing_sync",
            DispatchMode::Strict,
            Arc::new(fn_subscriber(|_event: ChangeEvent| async {
                Err(EventHandlerError::Failed("pacing sync unavailable".to_string()))
            })),
        );
        let handlers = CourseOverviewHandlers::new(store.clone(), content, Arc::new(bus));

        let err = handlers
            .on_course_published(&CourseRunKey::new(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerFailed { .. }));

        let cert_events = seen
            .lock()
            .iter()
            .filter(|t| **t == EventType::CertAvailabilityChanged)
            .count();
        assert_eq!(cert_events, 1);
        assert!(store
            .get(&CourseRunKey::new(KEY))
            .await
            .unwrap()
            .unwrap()
            .self_paced);
    }

    #[tokio::test]
    async fn test_delete_removes_snapshot_and_publishes() {
        let f = fixture();
        f.store.put(base()).await.unwrap();

        let report = f.handlers.on_course_deleted(&CourseRunKey::new(KEY)).await.unwrap();
        assert_eq!(report.event_type, EventType::Deleted);
        assert_eq!(report.delivered, 1);
        assert!(f.store.is_empty());
    }
}
