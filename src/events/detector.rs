//! # Change Detector
//!
//! Compares the previous and updated overview of a course run and produces the
//! change events other parts of the system react to.
//!
//! Watched fields, in evaluation order:
//!
//! | Field(s)                                        | Event                     |
//! |-------------------------------------------------|---------------------------|
//! | `start`                                         | `StartDateChanged`        |
//! | `self_paced`                                    | `PacingChanged`           |
//! | available date / display behavior / end (`End`) | `CertAvailabilityChanged` |
//!
//! The certificate availability rule fires at most one event even when several
//! of its sub-conditions hold, because consumers treat it as a single signal.

use tracing::info;

use super::types::{ChangeEvent, EventType, FieldValue};
use crate::models::{CertificatesDisplayBehavior, CourseOverviewSnapshot};

/// Stateless snapshot comparator
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect changes between `previous` and `updated`
    ///
    /// A missing `previous` snapshot means the course run is new; only a
    /// `Created` event is produced in that case. Each event type appears at
    /// most once in the result.
    pub fn detect(
        &self,
        previous: Option<&CourseOverviewSnapshot>,
        updated: &CourseOverviewSnapshot,
    ) -> Vec<ChangeEvent> {
        let Some(previous) = previous else {
            return vec![ChangeEvent::created(updated.id.clone())];
        };

        [
            Self::start_date_change(previous, updated),
            Self::pacing_change(previous, updated),
            Self::cert_availability_change(previous, updated),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn start_date_change(
        previous: &CourseOverviewSnapshot,
        updated: &CourseOverviewSnapshot,
    ) -> Option<ChangeEvent> {
        if previous.start == updated.start {
            return None;
        }

        let before = FieldValue::Date(previous.start);
        let after = FieldValue::Date(updated.start);
        info!(
            course = %updated.id,
            previous = %before,
            new = %after,
            "Course start date changed"
        );

        Some(ChangeEvent::new(
            EventType::StartDateChanged,
            updated.id.clone(),
            before,
            after,
        ))
    }

    fn pacing_change(
        previous: &CourseOverviewSnapshot,
        updated: &CourseOverviewSnapshot,
    ) -> Option<ChangeEvent> {
        if previous.self_paced == updated.self_paced {
            return None;
        }

        Some(ChangeEvent::new(
            EventType::PacingChanged,
            updated.id.clone(),
            FieldValue::Flag(previous.self_paced),
            FieldValue::Flag(updated.self_paced),
        ))
    }

    /// Available date, then display behavior, then end date for end-tied
    /// certificates. The first condition that holds decides the payload.
    fn cert_availability_change(
        previous: &CourseOverviewSnapshot,
        updated: &CourseOverviewSnapshot,
    ) -> Option<ChangeEvent> {
        let course = &updated.id;

        let (before, after) = if previous.certificate_available_date
            != updated.certificate_available_date
        {
            let change = (
                FieldValue::Date(previous.certificate_available_date),
                FieldValue::Date(updated.certificate_available_date),
            );
            info!(
                course = %course,
                previous = %change.0,
                new = %change.1,
                "Certificate available date changed, firing certificate date change"
            );
            change
        } else if previous.certificates_display_behavior != updated.certificates_display_behavior {
            let change = (
                FieldValue::DisplayBehavior(previous.certificates_display_behavior),
                FieldValue::DisplayBehavior(updated.certificates_display_behavior),
            );
            info!(
                course = %course,
                previous = %change.0,
                new = %change.1,
                "Certificates display behavior changed, firing certificate date change"
            );
            change
        } else if previous.certificates_display_behavior
            == Some(CertificatesDisplayBehavior::End)
            && updated.certificates_display_behavior == Some(CertificatesDisplayBehavior::End)
            && previous.end != updated.end
        {
            let change = (FieldValue::Date(previous.end), FieldValue::Date(updated.end));
            info!(
                course = %course,
                previous = %change.0,
                new = %change.1,
                "End date changed for end-tied certificates, firing certificate date change"
            );
            change
        } else {
            return None;
        };

        Some(ChangeEvent::new(
            EventType::CertAvailabilityChanged,
            course.clone(),
            before,
            after,
        ))
    }
}
