//! Task store: owner-scoped documents with live snapshot push.
//!
//! ```text
//!   caller ──create/update/batch_delete──> TaskStore ──write──> SQLite
//!                                             │
//!                                  change feed (broadcast: owner id)
//!                                             │
//!   Subscription <──Vec<Task> snapshot── per-subscriber task ──list──┘
//! ```
//!
//! Mutations return no documents. Their effect is observed through the next
//! snapshot pushed to every live `Subscription` of the same owner.

pub mod db;
pub mod sqlite;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use quadrant_common::{Category, Task, TaskId, TaskPatch};

use crate::errors::StoreError;

pub use sqlite::SqliteTaskStore;

/// One pushed snapshot: the owner's full task list, oldest first.
pub type Snapshot = Result<Vec<Task>, StoreError>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Start a live query of the owner's tasks. The first item is the
    /// current state; another follows every change to the owner's tasks.
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError>;

    async fn create(&self, owner_id: &str, text: &str, category: Category)
        -> Result<TaskId, StoreError>;

    /// Merge the set fields of `patch`. Fields left `None` are untouched.
    async fn update(&self, owner_id: &str, task_id: &str, patch: TaskPatch)
        -> Result<(), StoreError>;

    /// Remove all of `task_ids` or none of them.
    async fn batch_delete(&self, owner_id: &str, task_ids: &[TaskId]) -> Result<usize, StoreError>;
}

pub(crate) fn require_owner(owner_id: &str) -> Result<(), StoreError> {
    if owner_id.trim().is_empty() {
        return Err(StoreError::MissingOwner);
    }
    Ok(())
}

/// Handle to a live query. Dropping it cancels the query.
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(
        rx: mpsc::Receiver<Snapshot>,
        token: CancellationToken,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            rx,
            token,
            handle: Some(handle),
        }
    }

    /// Wait for the next snapshot. Returns `None` once cancelled or once the
    /// store side has gone away; buffered snapshots are never delivered
    /// after cancellation.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        self.rx.close();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Read the owner's current tasks once through a short-lived subscription.
pub async fn first_snapshot(store: &dyn TaskStore, owner_id: &str) -> Result<Vec<Task>, StoreError> {
    let mut sub = store.subscribe(owner_id).await?;
    let snapshot = sub.next().await.ok_or(StoreError::SubscriptionClosed)?;
    sub.cancel();
    snapshot
}
