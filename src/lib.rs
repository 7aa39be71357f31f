#![allow(clippy::doc_markdown)] // Allow technical terms like TOML, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Credentials Dispatch
//!
//! Course change detection and certificate task dispatch for the credentials
//! service.
//!
//! ## Overview
//!
//! When a course run is published, its stored overview is compared against
//! the freshly published one. Changes that matter to credentials (start date,
//! pacing, certificate availability) become typed events on an in-process
//! bus. Subscribers consult feature gates and turn those events into work
//! items for an external at-least-once task queue, each carrying an
//! idempotency key so redeliveries can be dropped downstream.
//!
//! Certificate lifecycle signals (awarded, changed, revoked) take the same
//! route from the bus onward.
//!
//! ## Module Organization
//!
//! - [`models`] - Course overview snapshots and certificate records
//! - [`events`] - Change events, the detector, the event bus and units of work
//! - [`gates`] - Feature gates with cached snapshots
//! - [`dispatch`] - Event to work item mapping and submission
//! - [`messaging`] - Work items and queue submitters
//! - [`handlers`] - Course publish/delete handling and program credential subscriptions
//! - [`audit`] - Feature-flag audit logging
//! - [`bootstrap`] - Composition of the dispatch system from configuration
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use credentials_dispatch::bootstrap::DispatchSystem;
//! use credentials_dispatch::config::ConfigManager;
//! use credentials_dispatch::models::CourseRunKey;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = DispatchSystem::bootstrap(ConfigManager::load()?)?;
//!
//! let outcome = system
//!     .course_published(&CourseRunKey::new("course-v1:edX+DemoX+2024_T1"))
//!     .await?;
//! println!("detected {:?}", outcome.event_types());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod audit;
pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod gates;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod snapshots;

pub use bootstrap::{BootstrapComponents, DispatchSystem};
pub use config::{ConfigManager, DispatchConfig};
pub use dispatch::TaskDispatcher;
pub use error::{DispatchError, Result};
pub use events::{ChangeDetector, ChangeEvent, EventBus, EventType, UnitOfWork};
pub use messaging::{TaskName, WorkItem, WorkSubmitter};
pub use models::{CertificateRecord, CourseOverviewSnapshot, CourseRunKey};
