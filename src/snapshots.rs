//! # Snapshot Providers
//!
//! Read access to stored course overview snapshots and to freshly published
//! course content. Both are capability traits so hosts can back them with
//! their own storage; in-memory implementations are provided.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::models::{CourseOverviewSnapshot, CourseRunKey};

/// Stored overview snapshots, keyed by course run
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Current snapshot for `key`, or `None` if none is stored
    async fn get(&self, key: &CourseRunKey) -> Result<Option<CourseOverviewSnapshot>>;

    /// Store `snapshot`, replacing any previous one for the same key
    async fn put(&self, snapshot: CourseOverviewSnapshot) -> Result<()>;

    /// Remove the snapshot for `key`; returns whether one existed
    async fn remove(&self, key: &CourseRunKey) -> Result<bool>;
}

/// Source of the authoritative overview right after a course is published
#[async_trait]
pub trait CourseContentSource: Send + Sync {
    async fn load_overview(&self, key: &CourseRunKey) -> Result<Option<CourseOverviewSnapshot>>;
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: DashMap<CourseRunKey, CourseOverviewSnapshot>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl SnapshotProvider for InMemorySnapshotStore {
    async fn get(&self, key: &CourseRunKey) -> Result<Option<CourseOverviewSnapshot>> {
        Ok(self.snapshots.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, snapshot: CourseOverviewSnapshot) -> Result<()> {
        self.snapshots.insert(snapshot.id.clone(), snapshot);
        Ok(())
    }

    async fn remove(&self, key: &CourseRunKey) -> Result<bool> {
        Ok(self.snapshots.remove(key).is_some())
    }
}

/// Published course content held in memory
#[derive(Debug, Default)]
pub struct InMemoryContentSource {
    published: DashMap<CourseRunKey, CourseOverviewSnapshot>,
}

impl InMemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `snapshot` the published content for its course run
    pub fn publish(&self, snapshot: CourseOverviewSnapshot) {
        self.published.insert(snapshot.id.clone(), snapshot);
    }

    pub fn unpublish(&self, key: &CourseRunKey) {
        self.published.remove(key);
    }
}

#[async_trait]
impl CourseContentSource for InMemoryContentSource {
    async fn load_overview(&self, key: &CourseRunKey) -> Result<Option<CourseOverviewSnapshot>> {
        Ok(self.published.get(key).map(|entry| entry.value().clone()))
    }
}
