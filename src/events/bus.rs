//! # Event Bus
//!
//! Statically typed publish/subscribe registry keyed by [`EventType`].
//!
//! ## Dispatch Rules
//!
//! - Handlers for an event type run one after another, in registration order,
//!   and `publish` returns only after the last one finishes.
//! - Registering a handler again under the same `dispatch_id` for the same
//!   event type replaces the earlier registration in place.
//! - Every subscription declares a [`DispatchMode`]. `Robust` handlers have
//!   their failures logged and collected while dispatch continues. A failing
//!   `Strict` handler stops dispatch and its error is returned to the publisher.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use credentials_dispatch::events::{
//!     fn_subscriber, ChangeEvent, DispatchMode, EventBus, EventType,
//! };
//! use credentials_dispatch::models::CourseRunKey;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut bus = EventBus::new();
//! bus.subscribe(
//!     EventType::Created,
//!     "import_course_details",
//!     DispatchMode::Robust,
//!     Arc::new(fn_subscriber(|event: ChangeEvent| async move {
//!         println!("created {}", event.entity_key);
//!         Ok(())
//!     })),
//! );
//!
//! let report = bus
//!     .publish(&ChangeEvent::created(CourseRunKey::new("course-v1:edX+DemoX+T1")))
//!     .await?;
//! assert_eq!(report.delivered, 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use super::types::{ChangeEvent, EventType};
use crate::error::{DispatchError, Result};

/// How a subscriber's failure affects the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Log and collect the failure, keep dispatching
    Robust,
    /// Stop dispatching and return the failure to the publisher
    Strict,
}

/// Errors returned by event handlers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventHandlerError {
    /// Failure from the dispatch core, propagated as-is by strict subscriptions
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    Failed(String),
}

/// Trait for event subscribers
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn handle_event(&self, event: &ChangeEvent) -> std::result::Result<(), EventHandlerError>;
}

/// Subscriber backed by an async closure
pub struct FnSubscriber<F>(F);

/// Wrap an async closure as an [`EventSubscriber`]
pub fn fn_subscriber<F, Fut>(f: F) -> FnSubscriber<F>
where
    F: Fn(ChangeEvent) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<(), EventHandlerError>> + Send,
{
    FnSubscriber(f)
}

#[async_trait]
impl<F, Fut> EventSubscriber for FnSubscriber<F>
where
    F: Fn(ChangeEvent) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<(), EventHandlerError>> + Send,
{
    async fn handle_event(
        &self,
        event: &ChangeEvent,
    ) -> std::result::Result<(), EventHandlerError> {
        (self.0)(event.clone()).await
    }
}

/// A registered handler
#[derive(Clone)]
pub struct Subscription {
    pub event_type: EventType,
    pub dispatch_id: String,
    pub mode: DispatchMode,
    pub handler: Arc<dyn EventSubscriber>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event_type", &self.event_type)
            .field("dispatch_id", &self.dispatch_id)
            .field("mode", &self.mode)
            .field("handler", &"<Arc<dyn EventSubscriber>>")
            .finish()
    }
}

/// A robust handler failure collected during dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFailure {
    pub dispatch_id: String,
    pub error: EventHandlerError,
}

/// Outcome of a successful `publish`
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub event_type: EventType,
    /// Handlers that completed without error
    pub delivered: usize,
    pub failures: Vec<HandlerFailure>,
}

/// Publish/subscribe registry
///
/// Built with `&mut` during startup, then shared behind an `Arc` while
/// traffic is served.
#[derive(Default)]
pub struct EventBus {
    subscriptions: HashMap<EventType, Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
        }
    }

    /// Register `handler` for `event_type`
    ///
    /// Returns `true` when an existing registration with the same
    /// `dispatch_id` was replaced.
    pub fn subscribe(
        &mut self,
        event_type: EventType,
        dispatch_id: impl Into<String>,
        mode: DispatchMode,
        handler: Arc<dyn EventSubscriber>,
    ) -> bool {
        let subscription = Subscription {
            event_type,
            dispatch_id: dispatch_id.into(),
            mode,
            handler,
        };

        let handlers = self.subscriptions.entry(event_type).or_default();
        if let Some(existing) = handlers
            .iter_mut()
            .find(|s| s.dispatch_id == subscription.dispatch_id)
        {
            debug!(
                event_type = %event_type,
                dispatch_id = %subscription.dispatch_id,
                "Replacing existing subscription"
            );
            *existing = subscription;
            return true;
        }

        info!(
            event_type = %event_type,
            dispatch_id = %subscription.dispatch_id,
            mode = ?subscription.mode,
            "Registered subscriber"
        );
        handlers.push(subscription);
        false
    }

    /// Dispatch `event` to every handler subscribed to its type
    pub async fn publish(&self, event: &ChangeEvent) -> Result<PublishReport> {
        let mut report = PublishReport {
            event_type: event.event_type,
            delivered: 0,
            failures: Vec::new(),
        };

        let Some(handlers) = self.subscriptions.get(&event.event_type) else {
            debug!(event_type = %event.event_type, "No subscribers for event type");
            return Ok(report);
        };

        for subscription in handlers {
            match subscription.handler.handle_event(event).await {
                Ok(()) => report.delivered += 1,
                Err(err) => match subscription.mode {
                    DispatchMode::Strict => {
                        error!(
                            event_type = %event.event_type,
                            entity_key = %event.entity_key,
                            dispatch_id = %subscription.dispatch_id,
                            error = %err,
                            "Strict subscriber failed, aborting dispatch"
                        );
                        return Err(match err {
                            EventHandlerError::Dispatch(inner) => inner,
                            EventHandlerError::Failed(reason) => DispatchError::HandlerFailed {
                                dispatch_id: subscription.dispatch_id.clone(),
                                event_type: event.event_type,
                                reason,
                            },
                        });
                    }
                    DispatchMode::Robust => {
                        error!(
                            event_type = %event.event_type,
                            entity_key = %event.entity_key,
                            dispatch_id = %subscription.dispatch_id,
                            error = %err,
                            "Subscriber failed, continuing dispatch"
                        );
                        report.failures.push(HandlerFailure {
                            dispatch_id: subscription.dispatch_id.clone(),
                            error: err,
                        });
                    }
                },
            }
        }

        Ok(report)
    }

    /// Subscriptions for `event_type`, in dispatch order
    pub fn subscriptions(&self, event_type: EventType) -> &[Subscription] {
        self.subscriptions
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All registered subscriptions, grouped by event type in enum order
    pub fn all_subscriptions(&self) -> Vec<&Subscription> {
        EventType::ALL
            .iter()
            .flat_map(|event_type| self.subscriptions(*event_type))
            .collect()
    }

    /// Get the total number of handlers across all event types
    pub fn handler_count(&self) -> usize {
        self.subscriptions.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.subscriptions.len())
            .field("handler_count", &self.handler_count())
            .finish()
    }
}
