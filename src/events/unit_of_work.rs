//! # Unit of Work
//!
//! Holds effects that may only become visible after the enclosing state
//! transition is durably committed. Publications registered here are flushed
//! to the bus by [`UnitOfWork::commit`] and discarded by
//! [`UnitOfWork::rollback`] or by dropping the unit of work uncommitted.

use tracing::{debug, warn};

use super::bus::{EventBus, PublishReport};
use super::types::ChangeEvent;
use crate::error::{DispatchError, Result};

/// Deferred effect attached to a unit of work
#[derive(Debug, Clone)]
pub enum PendingEffect {
    Publish(ChangeEvent),
}

#[derive(Debug, Default)]
pub struct UnitOfWork {
    pending: Vec<PendingEffect>,
    finished: bool,
}

impl UnitOfWork {
    pub fn begin() -> Self {
        Self::default()
    }

    /// Schedule `event` for publication once this unit of work commits
    pub fn publish_on_commit(&mut self, event: ChangeEvent) {
        debug!(
            event_type = %event.event_type,
            entity_key = %event.entity_key,
            "Deferring publication until commit"
        );
        self.pending.push(PendingEffect::Publish(event));
    }

    pub fn pending(&self) -> &[PendingEffect] {
        &self.pending
    }

    /// Flush pending publications to `bus` in the order they were scheduled
    ///
    /// Every pending publication is attempted exactly once. If any of them
    /// fails loudly, the remaining ones are still published and the first
    /// failure is returned afterwards.
    pub async fn commit(mut self, bus: &EventBus) -> Result<Vec<PublishReport>> {
        self.finished = true;
        let pending = std::mem::take(&mut self.pending);

        let mut reports = Vec::with_capacity(pending.len());
        let mut first_error: Option<DispatchError> = None;

        for effect in pending {
            match effect {
                PendingEffect::Publish(event) => match bus.publish(&event).await {
                    Ok(report) => reports.push(report),
                    Err(err) => {
                        warn!(
                            event_type = %event.event_type,
                            entity_key = %event.entity_key,
                            error = %err,
                            "Commit-triggered publication failed"
                        );
                        first_error.get_or_insert(err);
                    }
                },
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(reports),
        }
    }

    /// Discard pending publications without dispatching them
    pub fn rollback(mut self) {
        self.finished = true;
        if !self.pending.is_empty() {
            debug!(discarded = self.pending.len(), "Unit of work rolled back");
        }
        self.pending.clear();
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished && !self.pending.is_empty() {
            warn!(
                discarded = self.pending.len(),
                "Unit of work dropped without commit, discarding pending publications"
            );
        }
    }
}
