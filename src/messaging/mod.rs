//! # Messaging Module
//!
//! Work items and the submitters that hand them to the external task queue.

pub mod message;
pub mod submitter;

pub use message::{idempotency_key, TaskName, WorkItem};
pub use submitter::{submitter_from_config, InMemoryWorkQueue, SpoolFileQueue, WorkSubmitter};
