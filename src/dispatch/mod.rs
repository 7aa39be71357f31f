//! # Dispatch Module
//!
//! Maps change events to credentials work items and submits them.

pub mod task_dispatcher;

pub use task_dispatcher::{TaskDispatcher, DEFAULT_TRACKED_INSTANCES};
