//! # Operator Commands
//!
//! Library side of the management binaries, kept here so it can be exercised
//! without spawning a process.

use tracing::info;

use crate::error::Result;
use crate::messaging::{TaskName, WorkItem, WorkSubmitter};

/// Enqueue one `backfill_date_for_all_course_runs` task
///
/// The task fans out certificate date updates for every course run. It is
/// used to populate or repair the certificate available dates held by the
/// credentials service. Each invocation enqueues a distinct run.
///
/// ```rust
/// use credentials_dispatch::commands::enqueue_backfill;
/// use credentials_dispatch::messaging::InMemoryWorkQueue;
///
/// # tokio_test::block_on(async {
/// let queue = InMemoryWorkQueue::new();
/// let item = enqueue_backfill(&queue).await.unwrap();
/// assert_eq!(item.task_name.as_str(), "backfill_date_for_all_course_runs");
/// # });
/// ```
pub async fn enqueue_backfill(submitter: &dyn WorkSubmitter) -> Result<WorkItem> {
    let item = WorkItem::manual(TaskName::BackfillDateForAllCourseRuns, Vec::new());
    submitter.submit(&item).await?;

    info!(
        task_name = %item.task_name,
        idempotency_key = %item.idempotency_key,
        backend = submitter.backend_name(),
        "Enqueued certificate date backfill"
    );
    Ok(item)
}
