//! # Program Credential Subscribers
//!
//! Wires the [`TaskDispatcher`] onto the event bus and exposes the entry
//! points for the certificate lifecycle signals.
//!
//! | dispatch_id                              | Event                     | Mode   |
//! |------------------------------------------|---------------------------|--------|
//! | `handle_course_cert_awarded`             | `CertAwarded`             | Strict |
//! | `handle_course_cert_changed`             | `CertChanged`             | Strict |
//! | `handle_course_cert_revoked`             | `CertRevoked`             | Strict |
//! | `course_certificate_date_change_handler` | `CertAvailabilityChanged` | Robust |
//! | `update_cert_settings_on_pacing_change`  | `PacingChanged`           | Robust |
//!
//! Certificate lifecycle failures reach the code that changed the
//! certificate. Course date and pacing failures are logged and do not
//! interrupt course publishing.
//!
//! `CertAwarded` and `CertRevoked` only reach the bus while their signal gate
//! is open.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::dispatch::TaskDispatcher;
use crate::error::{DispatchError, Result};
use crate::events::{
    ChangeEvent, DispatchMode, EventBus, EventHandlerError, EventSubscriber, EventType,
    PublishReport,
};
use crate::gates::{CachedGates, SEND_CERTIFICATE_CREATED_SIGNAL, SEND_CERTIFICATE_REVOKED_SIGNAL};
use crate::models::CertificateRecord;

pub const CERT_AWARDED_DISPATCH_ID: &str = "handle_course_cert_awarded";
pub const CERT_CHANGED_DISPATCH_ID: &str = "handle_course_cert_changed";
pub const CERT_REVOKED_DISPATCH_ID: &str = "handle_course_cert_revoked";
pub const CERT_DATE_CHANGE_DISPATCH_ID: &str = "course_certificate_date_change_handler";
pub const PACING_CHANGE_DISPATCH_ID: &str = "update_cert_settings_on_pacing_change";

/// Subscriptions installed by [`register_program_handlers`]
pub const PROGRAM_SUBSCRIPTIONS: [(EventType, &str, DispatchMode); 5] = [
    (EventType::CertAwarded, CERT_AWARDED_DISPATCH_ID, DispatchMode::Strict),
    (EventType::CertChanged, CERT_CHANGED_DISPATCH_ID, DispatchMode::Strict),
    (EventType::CertRevoked, CERT_REVOKED_DISPATCH_ID, DispatchMode::Strict),
    (
        EventType::CertAvailabilityChanged,
        CERT_DATE_CHANGE_DISPATCH_ID,
        DispatchMode::Robust,
    ),
    (EventType::PacingChanged, PACING_CHANGE_DISPATCH_ID, DispatchMode::Robust),
];

/// Event bus adapter around a shared [`TaskDispatcher`]
#[derive(Debug, Clone)]
pub struct DispatcherSubscriber {
    dispatcher: Arc<TaskDispatcher>,
}

impl DispatcherSubscriber {
    pub fn new(dispatcher: Arc<TaskDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl EventSubscriber for DispatcherSubscriber {
    async fn handle_event(
        &self,
        event: &ChangeEvent,
    ) -> std::result::Result<(), EventHandlerError> {
        self.dispatcher.on_event(event).await?;
        Ok(())
    }
}

/// Subscribe `dispatcher` to every event that schedules credentials work
///
/// Calling this again replaces the earlier registrations instead of adding
/// duplicates.
pub fn register_program_handlers(bus: &mut EventBus, dispatcher: Arc<TaskDispatcher>) {
    let subscriber: Arc<dyn EventSubscriber> = Arc::new(DispatcherSubscriber::new(dispatcher));
    for (event_type, dispatch_id, mode) in PROGRAM_SUBSCRIPTIONS {
        bus.subscribe(event_type, dispatch_id, mode, Arc::clone(&subscriber));
    }
}

/// Gate that must be open for `event_type` to be signalled, if any
pub fn certificate_signal_gate(event_type: EventType) -> Option<&'static str> {
    match event_type {
        EventType::CertAwarded => Some(SEND_CERTIFICATE_CREATED_SIGNAL),
        EventType::CertRevoked => Some(SEND_CERTIFICATE_REVOKED_SIGNAL),
        _ => None,
    }
}

/// Publish a certificate lifecycle signal
///
/// `event_type` must be one of `CertAwarded`, `CertChanged` or `CertRevoked`.
/// Returns `Ok(None)` without publishing when the signal gate for
/// `event_type` is closed or the gate source cannot be read.
pub async fn publish_certificate_event(
    bus: &EventBus,
    gates: &CachedGates,
    event_type: EventType,
    record: CertificateRecord,
) -> Result<Option<PublishReport>> {
    let event = ChangeEvent::certificate(event_type, record).ok_or_else(|| {
        DispatchError::Configuration(format!("{event_type} is not a certificate lifecycle event"))
    })?;

    if let Some(gate) = certificate_signal_gate(event_type) {
        let open = match gates.snapshot() {
            Ok(snapshot) => snapshot.is_enabled(gate),
            Err(err) => {
                warn!(
                    gate = gate,
                    error = %err,
                    "Gate source unavailable, treating gates as closed"
                );
                false
            }
        };
        if !open {
            debug!(
                event_type = %event_type,
                entity_key = %event.entity_key,
                gate = gate,
                "Certificate signal disabled, not publishing"
            );
            return Ok(None);
        }
    }

    bus.publish(&event).await.map(Some)
}
