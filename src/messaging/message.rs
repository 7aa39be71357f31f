//! # Work Item Structures
//!
//! Units of deferred work handed to the external queue, and the task names
//! the credentials workers understand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::events::EventType;
use crate::models::CourseRunKey;

/// Namespace for deterministic idempotency keys
const IDEMPOTENCY_NAMESPACE: Uuid = Uuid::from_u128(0x6c1e_4b8a_93d2_4f0e_a5a1_0c3e_7d2b_9f41);

/// Tasks executed by the credentials workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    /// Determine program certificates a learner is now eligible for
    AwardProgramCertificates,
    /// Sync a course certificate award or revocation
    AwardCourseCertificate,
    RevokeProgramCertificates,
    UpdateCertificateVisibleDateOnCourseUpdate,
    UpdateCertificateAvailableDateOnCourseUpdate,
    /// Enqueue date updates for every course run
    BackfillDateForAllCourseRuns,
}

impl TaskName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwardProgramCertificates => "award_program_certificates",
            Self::AwardCourseCertificate => "award_course_certificate",
            Self::RevokeProgramCertificates => "revoke_program_certificates",
            Self::UpdateCertificateVisibleDateOnCourseUpdate => {
                "update_certificate_visible_date_on_course_update"
            }
            Self::UpdateCertificateAvailableDateOnCourseUpdate => {
                "update_certificate_available_date_on_course_update"
            }
            Self::BackfillDateForAllCourseRuns => "backfill_date_for_all_course_runs",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred work submitted to the external at-least-once queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub task_name: TaskName,
    /// Positional task arguments
    pub args: Vec<serde_json::Value>,
    pub idempotency_key: Uuid,
    pub enqueued_at: DateTime<Utc>,
    /// Event instance that produced this item, if any
    pub source_event_id: Option<Uuid>,
}

impl WorkItem {
    /// Work item for an observed change event
    pub fn for_event(
        task_name: TaskName,
        args: Vec<serde_json::Value>,
        entity_key: &CourseRunKey,
        event_type: EventType,
        source_event_id: Uuid,
    ) -> Self {
        Self {
            task_name,
            args,
            idempotency_key: idempotency_key(entity_key, event_type, task_name),
            enqueued_at: Utc::now(),
            source_event_id: Some(source_event_id),
        }
    }

    /// Operator-triggered work item; every invocation is a distinct run
    pub fn manual(task_name: TaskName, args: Vec<serde_json::Value>) -> Self {
        Self {
            task_name,
            args,
            idempotency_key: Uuid::new_v4(),
            enqueued_at: Utc::now(),
            source_event_id: None,
        }
    }

    /// Convert to JSON for queue storage
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Create from JSON from queue
    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }
}

/// Deterministic key for the work a `(entity_key, event_type)` pair produces
///
/// The task name is part of the key so that an event fanning out to several
/// tasks yields distinct keys for each of them.
pub fn idempotency_key(
    entity_key: &CourseRunKey,
    event_type: EventType,
    task_name: TaskName,
) -> Uuid {
    let name = format!("{entity_key}:{}:{}", event_type.name(), task_name.as_str());
    Uuid::new_v5(&IDEMPOTENCY_NAMESPACE, name.as_bytes())
}
