pub mod bus;
pub mod detector;
pub mod types;
pub mod unit_of_work;

// Re-export key types for convenience
pub use bus::{
    fn_subscriber, DispatchMode, EventBus, EventHandlerError, EventSubscriber, HandlerFailure,
    PublishReport, Subscription,
};
pub use detector::ChangeDetector;
pub use types::{ChangeEvent, EventType, FieldValue};
pub use unit_of_work::{PendingEffect, UnitOfWork};
