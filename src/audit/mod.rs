//! # Audit Module
//!
//! Structured audit trail for feature-flag changes.

pub mod waffle_observer;

pub use waffle_observer::{describe_fields, WaffleKind, WaffleObserver, WaffleRecord, AUDIT_TARGET};
