//! Error types for credentials dispatch.
//!

use crate::config::ConfigurationError;
use crate::events::EventType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// A feature gate source or downstream dependency could not be reached
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The external work queue rejected or failed to accept a work item
    #[error("Submission of {task_name} failed: {reason}")]
    Submission { task_name: String, reason: String },
    /// A strict subscriber failed while handling an event
    #[error("Handler '{dispatch_id}' failed on {event_type}: {reason}")]
    HandlerFailed {
        dispatch_id: String,
        event_type: EventType,
        reason: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DispatchError {
    pub fn submission(task_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Submission {
            task_name: task_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this failure came from the work queue rather than from gating or lookup
    pub fn is_submission(&self) -> bool {
        matches!(self, Self::Submission { .. })
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(error: serde_json::Error) -> Self {
        DispatchError::Serialization(error.to_string())
    }
}

impl From<ConfigurationError> for DispatchError {
    fn from(error: ConfigurationError) -> Self {
        DispatchError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
