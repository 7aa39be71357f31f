//! # Task Dispatcher
//!
//! Turns change events into work items for the credentials workers.
//!
//! ## Flow
//!
//! ```text
//! ChangeEvent ─▶ gate snapshot ─▶ task templates ─▶ instance dedup ─▶ WorkSubmitter
//!                 (closed ⇒ none)   (0, 1 or 2)       (event_id, task)
//! ```
//!
//! Every item carries an idempotency key derived from the event's entity key
//! and type, so the at-least-once queue can drop redeliveries downstream. The
//! dispatcher itself guarantees that a single observed event instance is
//! submitted at most once per task.

use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::events::{ChangeEvent, EventType};
use crate::gates::{learner_records_gate, CachedGates, GateSnapshot, CREDENTIALS_ENABLED};
use crate::messaging::{TaskName, WorkItem, WorkSubmitter};
use crate::snapshots::SnapshotProvider;

/// Event instances remembered for duplicate suppression
pub const DEFAULT_TRACKED_INSTANCES: usize = 10_000;

/// Bounded memory of `(event_id, task)` pairs already submitted
#[derive(Debug)]
struct SubmittedInstances {
    capacity: usize,
    seen: HashSet<(Uuid, TaskName)>,
    order: VecDeque<(Uuid, TaskName)>,
}

impl SubmittedInstances {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    #[cfg(test)]
    fn contains(&self, entry: &(Uuid, TaskName)) -> bool {
        self.seen.contains(entry)
    }

    /// Claim `entry` for submission; false when it is already claimed
    fn try_reserve(&mut self, entry: (Uuid, TaskName)) -> bool {
        if !self.seen.insert(entry) {
            return false;
        }
        self.order.push_back(entry);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    /// Drop a claim whose submission failed so a redelivery can retry it
    fn release(&mut self, entry: &(Uuid, TaskName)) {
        if self.seen.remove(entry) {
            self.order.retain(|claimed| claimed != entry);
        }
    }
}

pub struct TaskDispatcher {
    gates: Arc<CachedGates>,
    submitter: Arc<dyn WorkSubmitter>,
    snapshots: Arc<dyn SnapshotProvider>,
    submitted: Mutex<SubmittedInstances>,
}

impl TaskDispatcher {
    pub fn new(
        gates: Arc<CachedGates>,
        submitter: Arc<dyn WorkSubmitter>,
        snapshots: Arc<dyn SnapshotProvider>,
    ) -> Self {
        Self::with_capacity(gates, submitter, snapshots, DEFAULT_TRACKED_INSTANCES)
    }

    pub fn with_capacity(
        gates: Arc<CachedGates>,
        submitter: Arc<dyn WorkSubmitter>,
        snapshots: Arc<dyn SnapshotProvider>,
        tracked_instances: usize,
    ) -> Self {
        Self {
            gates,
            submitter,
            snapshots,
            submitted: Mutex::new(SubmittedInstances::new(tracked_instances)),
        }
    }

    /// Schedule the work `event` calls for
    ///
    /// Returns `Ok(None)` when nothing was submitted: a gate is closed, the
    /// gate source is unreachable, the event type maps to no tasks, or this
    /// event instance was already handled. An instance is claimed before it
    /// is handed to the queue, so concurrent deliveries of it submit once.
    /// Queue failures are returned as `DispatchError::Submission` and release
    /// the claim; items accepted before the failure stay recorded and are not
    /// resubmitted for the same instance.
    pub async fn on_event(&self, event: &ChangeEvent) -> Result<Option<Vec<WorkItem>>> {
        let gates = match self.gates.snapshot() {
            Ok(gates) => gates,
            Err(e) => {
                warn!(
                    event_type = %event.event_type,
                    entity_key = %event.entity_key,
                    error = %e,
                    "Feature gates unavailable, treating credentials sync as disabled"
                );
                return Ok(None);
            }
        };

        if !self.gates_open(&gates, event) {
            return Ok(None);
        }

        let items = self.build_work_items(event).await?;
        if items.is_empty() {
            debug!(
                event_type = %event.event_type,
                entity_key = %event.entity_key,
                "No work for event"
            );
            return Ok(None);
        }

        let mut submitted = Vec::with_capacity(items.len());
        for item in items {
            let instance = (event.event_id, item.task_name);
            // Claimed before the await so concurrent deliveries of one instance cannot both submit
            if !self.submitted.lock().try_reserve(instance) {
                debug!(
                    event_id = %event.event_id,
                    task_name = %item.task_name,
                    "Event instance already submitted, skipping"
                );
                continue;
            }

            if let Err(err) = self.submitter.submit(&item).await {
                self.submitted.lock().release(&instance);
                return Err(err);
            }

            info!(
                event_type = %event.event_type,
                entity_key = %event.entity_key,
                task_name = %item.task_name,
                idempotency_key = %item.idempotency_key,
                backend = self.submitter.backend_name(),
                "Enqueued credentials task"
            );
            submitted.push(item);
        }

        if submitted.is_empty() {
            Ok(None)
        } else {
            Ok(Some(submitted))
        }
    }

    fn gates_open(&self, gates: &GateSnapshot, event: &ChangeEvent) -> bool {
        if !gates.is_enabled(CREDENTIALS_ENABLED) {
            debug!(
                event_type = %event.event_type,
                entity_key = %event.entity_key,
                gate = CREDENTIALS_ENABLED,
                "Credentials sync disabled, no work scheduled"
            );
            return false;
        }

        // Course certificates only feed learner records today
        if event.event_type == EventType::CertChanged {
            let org = event.entity_key.org();
            if !gates.is_enabled(&learner_records_gate(org)) {
                warn!("Skipping send cert: the Learner Record feature is disabled for org [{org}]");
                return false;
            }
        }

        true
    }

    async fn build_work_items(&self, event: &ChangeEvent) -> Result<Vec<WorkItem>> {
        let course_key = event.entity_key.as_str();
        let item = |task: TaskName, args: Vec<serde_json::Value>| {
            WorkItem::for_event(task, args, &event.entity_key, event.event_type, event.event_id)
        };

        let items = match event.event_type {
            EventType::CertAwarded | EventType::CertChanged | EventType::CertRevoked => {
                let Some(record) = event.certificate_record() else {
                    warn!(
                        event_type = %event.event_type,
                        entity_key = %event.entity_key,
                        "Certificate event without certificate payload, ignoring"
                    );
                    return Ok(Vec::new());
                };

                match event.event_type {
                    EventType::CertAwarded => {
                        debug!(
                            user = %record.username,
                            course_key = %record.course_key,
                            mode = %record.mode,
                            status = %record.status,
                            "Handling certificate awarded"
                        );
                        vec![item(TaskName::AwardProgramCertificates, vec![json!(record.username)])]
                    }
                    EventType::CertChanged => {
                        debug!(
                            user = %record.username,
                            course_key = %record.course_key,
                            mode = %record.mode,
                            status = %record.status,
                            "Handling certificate changed"
                        );
                        vec![item(
                            TaskName::AwardCourseCertificate,
                            vec![json!(record.username), json!(course_key)],
                        )]
                    }
                    _ => {
                        info!(
                            user = %record.username,
                            course_key = %record.course_key,
                            mode = %record.mode,
                            status = %record.status,
                            "Handling certificate revoked"
                        );
                        vec![item(
                            TaskName::RevokeProgramCertificates,
                            vec![json!(record.username), json!(course_key)],
                        )]
                    }
                }
            }
            EventType::CertAvailabilityChanged => {
                info!(course_key = %course_key, "Handling certificate date change");
                vec![
                    item(
                        TaskName::UpdateCertificateVisibleDateOnCourseUpdate,
                        vec![json!(course_key)],
                    ),
                    item(
                        TaskName::UpdateCertificateAvailableDateOnCourseUpdate,
                        vec![json!(course_key)],
                    ),
                ]
            }
            EventType::PacingChanged => {
                // Only a switch to self-paced can leave a stale available date behind
                let current = match self.snapshots.get(&event.entity_key).await {
                    Ok(current) => current,
                    Err(DispatchError::NotFound(_)) => None,
                    Err(err) => return Err(err),
                };
                match current {
                    Some(overview) if overview.self_paced => {
                        info!(course_key = %course_key, "Handling pacing change to self-paced");
                        vec![
                            item(
                                TaskName::UpdateCertificateAvailableDateOnCourseUpdate,
                                vec![json!(course_key)],
                            ),
                            item(
                                TaskName::UpdateCertificateVisibleDateOnCourseUpdate,
                                vec![json!(course_key)],
                            ),
                        ]
                    }
                    _ => Vec::new(),
                }
            }
            EventType::Created | EventType::Deleted | EventType::StartDateChanged => Vec::new(),
        };

        Ok(items)
    }
}

impl std::fmt::Debug for TaskDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDispatcher")
            .field("gates", &self.gates)
            .field("backend", &self.submitter.backend_name())
            .finish()
    }
}
