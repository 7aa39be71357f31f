//! Change event types shared by the detector, the bus and the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{CertificateRecord, CertificatesDisplayBehavior, CourseRunKey};

/// Fixed set of events the core publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A course overview was stored for the first time
    Created,
    /// A course run was removed from the content store
    Deleted,
    StartDateChanged,
    PacingChanged,
    /// Certificate available date, display behavior, or end date (for
    /// end-tied certificates) changed
    CertAvailabilityChanged,
    CertAwarded,
    /// A course certificate was updated (awarded or revoked) and must be synced
    CertChanged,
    CertRevoked,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::Created,
        EventType::Deleted,
        EventType::StartDateChanged,
        EventType::PacingChanged,
        EventType::CertAvailabilityChanged,
        EventType::CertAwarded,
        EventType::CertChanged,
        EventType::CertRevoked,
    ];

    /// Dotted event name used in logs and idempotency keys
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "course.created",
            Self::Deleted => "course.deleted",
            Self::StartDateChanged => "course.start_date_changed",
            Self::PacingChanged => "course.pacing_changed",
            Self::CertAvailabilityChanged => "course.cert_date_changed",
            Self::CertAwarded => "certificate.awarded",
            Self::CertChanged => "certificate.changed",
            Self::CertRevoked => "certificate.revoked",
        }
    }

    /// Certificate lifecycle events carry a certificate record as their payload
    pub fn is_certificate_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::CertAwarded | Self::CertChanged | Self::CertRevoked
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Old or new value carried by a change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    None,
    Date(Option<DateTime<Utc>>),
    Flag(bool),
    DisplayBehavior(Option<CertificatesDisplayBehavior>),
    Certificate(CertificateRecord),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None | Self::Date(None) | Self::DisplayBehavior(None) => f.write_str("None"),
            Self::Date(Some(date)) => f.write_str(&date.to_rfc3339()),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::DisplayBehavior(Some(behavior)) => write!(f, "{behavior}"),
            Self::Certificate(record) => write!(
                f,
                "{}:{}:{}:{}",
                record.username, record.course_key, record.mode, record.status
            ),
        }
    }
}

/// Immutable record of a detected change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Identity of this observed instance; equivalent events get distinct ids
    pub event_id: Uuid,
    pub event_type: EventType,
    pub entity_key: CourseRunKey,
    pub before: FieldValue,
    pub after: FieldValue,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        event_type: EventType,
        entity_key: CourseRunKey,
        before: FieldValue,
        after: FieldValue,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            entity_key,
            before,
            after,
            timestamp: Utc::now(),
        }
    }

    pub fn created(entity_key: CourseRunKey) -> Self {
        Self::new(EventType::Created, entity_key, FieldValue::None, FieldValue::None)
    }

    pub fn deleted(entity_key: CourseRunKey) -> Self {
        Self::new(EventType::Deleted, entity_key, FieldValue::None, FieldValue::None)
    }

    /// Certificate lifecycle event keyed by the certificate's course run
    ///
    /// Returns `None` when `event_type` is not a certificate lifecycle event.
    pub fn certificate(event_type: EventType, record: CertificateRecord) -> Option<Self> {
        if !event_type.is_certificate_lifecycle() {
            return None;
        }
        Some(Self::new(
            event_type,
            record.course_key.clone(),
            FieldValue::None,
            FieldValue::Certificate(record),
        ))
    }

    /// Certificate payload of a lifecycle event
    pub fn certificate_record(&self) -> Option<&CertificateRecord> {
        match &self.after {
            FieldValue::Certificate(record) => Some(record),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_unique() {
        let mut names: Vec<_> = EventType::ALL.iter().map(EventType::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventType::ALL.len());
    }

    #[test]
    fn test_certificate_constructor_rejects_course_events() {
        let record =
            CertificateRecord::new("learner", "course-v1:edX+DemoX+T1", "verified", "downloadable");
        assert!(ChangeEvent::certificate(EventType::PacingChanged, record.clone()).is_none());

        let event = ChangeEvent::certificate(EventType::CertAwarded, record.clone()).unwrap();
        assert_eq!(event.entity_key.as_str(), "course-v1:edX+DemoX+T1");
        assert_eq!(event.certificate_record(), Some(&record));
    }

    #[test]
    fn test_equivalent_events_have_distinct_ids() {
        let key = CourseRunKey::new("course-v1:edX+DemoX+T1");
        let first = ChangeEvent::created(key.clone());
        let second = ChangeEvent::created(key);
        assert_ne!(first.event_id, second.event_id);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Date(None).to_string(), "None");
        assert_eq!(FieldValue::Flag(true).to_string(), "true");
        assert_eq!(
            FieldValue::DisplayBehavior(Some(CertificatesDisplayBehavior::End)).to_string(),
            "end"
        );
    }
}
