//! # Handlers Module
//!
//! Entry points for host notifications and the bus subscriptions that turn
//! detected changes into credentials work.

pub mod course_overview;
pub mod programs;

pub use course_overview::{CourseOverviewHandlers, PublishOutcome};
pub use programs::{
    certificate_signal_gate, publish_certificate_event, register_program_handlers,
    DispatcherSubscriber, PROGRAM_SUBSCRIPTIONS,
};
