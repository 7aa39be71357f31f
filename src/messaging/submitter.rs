//! # Work Submission
//!
//! Capability boundary between the dispatch core and the external work
//! queue. The queue owns delivery, retries and backoff; submitters only hand
//! items over and report whether the handoff was accepted.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::message::WorkItem;
use crate::config::{QueueBackend, QueueConfig};
use crate::error::{DispatchError, Result};

/// Hands work items to an external at-least-once queue
#[async_trait]
pub trait WorkSubmitter: Send + Sync {
    /// Submit one item; returns once the queue has accepted it
    async fn submit(&self, item: &WorkItem) -> Result<()>;

    /// Get the backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Build the submitter selected by configuration
pub fn submitter_from_config(config: &QueueConfig) -> Result<Arc<dyn WorkSubmitter>> {
    match config.backend {
        QueueBackend::InMemory => Ok(Arc::new(InMemoryWorkQueue::new())),
        QueueBackend::Spool => {
            let path = config.spool_path.clone().ok_or_else(|| {
                DispatchError::Configuration("spool backend requires queue.spool_path".to_string())
            })?;
            Ok(Arc::new(SpoolFileQueue::new(path)))
        }
    }
}

/// Process-local queue that records submitted items
///
/// Used for local runs and as a stand-in in tests. Can be switched into a
/// rejecting state to simulate an unavailable queue.
#[derive(Debug, Default)]
pub struct InMemoryWorkQueue {
    items: Mutex<Vec<WorkItem>>,
    rejecting: AtomicBool,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent submissions fail (`true`) or succeed (`false`)
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Items accepted so far, in submission order
    pub fn items(&self) -> Vec<WorkItem> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Remove and return all accepted items
    pub fn drain(&self) -> Vec<WorkItem> {
        std::mem::take(&mut *self.items.lock())
    }
}

#[async_trait]
impl WorkSubmitter for InMemoryWorkQueue {
    async fn submit(&self, item: &WorkItem) -> Result<()> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(DispatchError::submission(
                item.task_name.as_str(),
                "in-memory queue is rejecting submissions",
            ));
        }

        debug!(
            task_name = %item.task_name,
            idempotency_key = %item.idempotency_key,
            "Accepted work item"
        );
        self.items.lock().push(item.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

/// Appends each work item as one JSON line to a spool file
///
/// An external relay moves spooled items into the task broker.
#[derive(Debug)]
pub struct SpoolFileQueue {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl SpoolFileQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WorkSubmitter for SpoolFileQueue {
    async fn submit(&self, item: &WorkItem) -> Result<()> {
        let mut line = serde_json::to_string(item)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let spool_error =
            |e: std::io::Error| DispatchError::submission(item.task_name.as_str(), e.to_string());

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(spool_error)?;
        file.write_all(line.as_bytes()).await.map_err(spool_error)?;
        file.flush().await.map_err(spool_error)?;

        info!(
            task_name = %item.task_name,
            idempotency_key = %item.idempotency_key,
            spool = %self.path.display(),
            "Spooled work item"
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "spool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::message::TaskName;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_queue_records_items() {
        let queue = InMemoryWorkQueue::new();
        let item = WorkItem::manual(TaskName::AwardProgramCertificates, vec![json!("learner")]);

        queue.submit(&item).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items()[0], item);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_queue_rejection() {
        let queue = InMemoryWorkQueue::new();
        queue.set_rejecting(true);

        let item = WorkItem::manual(TaskName::AwardProgramCertificates, vec![]);
        let err = queue.submit(&item).await.unwrap_err();
        assert!(err.is_submission());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_spool_queue_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.jsonl");
        let queue = SpoolFileQueue::new(&path);

        let first = WorkItem::manual(TaskName::BackfillDateForAllCourseRuns, vec![]);
        let second = WorkItem::manual(TaskName::AwardProgramCertificates, vec![json!("learner")]);
        queue.submit(&first).await.unwrap();
        queue.submit(&second).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: WorkItem = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, second);
    }

    #[tokio::test]
    async fn test_spool_queue_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let queue = SpoolFileQueue::new(dir.path().join("missing").join("spool.jsonl"));

        let item = WorkItem::manual(TaskName::BackfillDateForAllCourseRuns, vec![]);
        assert!(queue.submit(&item).await.unwrap_err().is_submission());
    }

    #[test]
    fn test_submitter_from_config() {
        let in_memory = submitter_from_config(&QueueConfig::in_memory()).unwrap();
        assert_eq!(in_memory.backend_name(), "in_memory");

        let spool = submitter_from_config(&QueueConfig::spool("/tmp/spool.jsonl")).unwrap();
        assert_eq!(spool.backend_name(), "spool");

        // the default backend is durable and needs a path
        assert!(submitter_from_config(&QueueConfig::default()).is_err());

        let missing = submitter_from_config(&QueueConfig {
            backend: QueueBackend::Spool,
            spool_path: None,
        });
        assert!(missing.is_err());
    }
}
