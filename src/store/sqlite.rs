use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{OnceCell, broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use quadrant_common::{Category, Task, TaskId, TaskPatch};

use super::db::{DbHandle, TaskDb};
use super::{Snapshot, Subscription, TaskStore, require_owner};
use crate::errors::StoreError;

/// Snapshots buffered per subscriber before the pushing task waits.
const SUBSCRIBER_BUFFER: usize = 16;

/// Capacity of the change feed. Subscribers that fall further behind
/// re-read once and carry on.
const CHANGE_FEED_CAPACITY: usize = 256;

/// How often a file-backed store checks for commits by other processes.
const EXTERNAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
enum Change {
    /// This store wrote tasks for the owner.
    Owner(String),
    /// Another connection committed to the file. The owner is unknown.
    External,
}

/// Polls `data_version` for a file-backed store. Started by the first
/// subscription and stopped when the last store clone drops.
struct ExternalWatch {
    started: OnceCell<()>,
    token: CancellationToken,
}

impl Drop for ExternalWatch {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// SQLite-backed store. Every mutation announces the owner id on a
/// broadcast change feed; each subscription re-reads and pushes a full
/// snapshot when its owner is announced. A store opened on a file also
/// announces commits made by other processes sharing that file.
#[derive(Clone)]
pub struct SqliteTaskStore {
    db: DbHandle,
    changes: broadcast::Sender<Change>,
    external: Option<Arc<ExternalWatch>>,
}

impl SqliteTaskStore {
    pub fn new(db: TaskDb) -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            db: DbHandle::new(db),
            changes,
            external: None,
        }
    }

    /// Open (or create) the store file, creating its directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create store directory")?;
        }
        let db = TaskDb::new(path).context("Failed to initialize task database")?;
        let mut store = Self::new(db);
        store.external = Some(Arc::new(ExternalWatch {
            started: OnceCell::new(),
            token: CancellationToken::new(),
        }));
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(TaskDb::new_in_memory()?))
    }

    /// Direct database access for imports and tests.
    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    fn announce(&self, owner_id: &str) {
        // No receivers simply means no live subscriptions.
        let _ = self.changes.send(Change::Owner(owner_id.to_string()));
    }

    /// Start the external-commit watcher once. The baseline version is read
    /// here, before the caller's first snapshot, so no commit is missed.
    async fn ensure_external_watch(&self) -> Result<(), StoreError> {
        let Some(watch) = &self.external else {
            return Ok(());
        };
        watch
            .started
            .get_or_try_init(|| async {
                let baseline = self
                    .db
                    .call(|db| db.data_version())
                    .await
                    .map_err(StoreError::Database)?;
                tokio::spawn(watch_external_commits(
                    self.db.clone(),
                    self.changes.clone(),
                    watch.token.clone(),
                    baseline,
                ));
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(())
    }
}

async fn watch_external_commits(
    db: DbHandle,
    changes: broadcast::Sender<Change>,
    token: CancellationToken,
    mut last: i64,
) {
    tracing::debug!("watching for external commits");
    let mut tick = tokio::time::interval(EXTERNAL_POLL_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => {}
        }
        match db.call(|db| db.data_version()).await {
            Ok(version) if version != last => {
                last = version;
                tracing::debug!(version, "external commit detected");
                let _ = changes.send(Change::External);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to poll data_version"),
        }
    }
    tracing::debug!("external commit watcher stopped");
}

async fn load_snapshot(db: &DbHandle, owner_id: &str) -> Snapshot {
    let owner = owner_id.to_string();
    let snapshot = db
        .call(move |db| db.list_tasks(&owner))
        .await
        .map_err(StoreError::Database);
    if let Err(e) = &snapshot {
        tracing::warn!(owner = owner_id, error = %e, "failed to load snapshot");
    }
    snapshot
}

/// Pushes snapshots for one owner, remembering the last one delivered so
/// external commits by other owners do not repeat it.
struct SnapshotPusher {
    db: DbHandle,
    owner: String,
    tx: mpsc::Sender<Snapshot>,
    last: Option<Vec<Task>>,
}

impl SnapshotPusher {
    /// Load and push one snapshot. Returns `false` when the subscriber is gone.
    async fn push(&mut self) -> bool {
        let snapshot = load_snapshot(&self.db, &self.owner).await;
        self.last = snapshot.as_ref().ok().cloned();
        self.tx.send(snapshot).await.is_ok()
    }

    /// Like `push`, but skips a snapshot identical to the last one.
    async fn push_if_changed(&mut self) -> bool {
        let snapshot = load_snapshot(&self.db, &self.owner).await;
        if let (Ok(tasks), Some(last)) = (&snapshot, &self.last) {
            if tasks == last {
                return true;
            }
        }
        self.last = snapshot.as_ref().ok().cloned();
        self.tx.send(snapshot).await.is_ok()
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription, StoreError> {
        require_owner(owner_id)?;
        self.ensure_external_watch().await?;

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let token = CancellationToken::new();
        // Subscribe to the feed before the first read so no change can slip
        // between the initial snapshot and the loop below.
        let mut changes = self.changes.subscribe();
        let mut pusher = SnapshotPusher {
            db: self.db.clone(),
            owner: owner_id.to_string(),
            tx,
            last: None,
        };
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            tracing::debug!(owner = %pusher.owner, "subscription started");
            if !pusher.push().await {
                return;
            }
            loop {
                let delivered = tokio::select! {
                    _ = cancelled.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(Change::Owner(changed)) if changed == pusher.owner => pusher.push().await,
                        Ok(Change::Owner(_)) => continue,
                        Ok(Change::External) => pusher.push_if_changed().await,
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::debug!(owner = %pusher.owner, missed, "change feed lagged, re-reading");
                            pusher.push().await
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };
                if !delivered {
                    break;
                }
            }
            tracing::debug!(owner = %pusher.owner, "subscription stopped");
        });

        Ok(Subscription::new(rx, token, handle))
    }

    async fn create(
        &self,
        owner_id: &str,
        text: &str,
        category: Category,
    ) -> Result<TaskId, StoreError> {
        require_owner(owner_id)?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(StoreError::EmptyText);
        }

        let owner = owner_id.to_string();
        let id = self
            .db
            .call(move |db| db.insert_task(&owner, &text, category, &Utc::now()))
            .await
            .map_err(StoreError::Database)?;
        tracing::info!(owner = owner_id, task = %id, category = %category, "task created");
        self.announce(owner_id);
        Ok(id)
    }

    async fn update(
        &self,
        owner_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<(), StoreError> {
        require_owner(owner_id)?;
        if patch.is_empty() {
            return Ok(());
        }
        if let Some(text) = &patch.text {
            if text.trim().is_empty() {
                return Err(StoreError::EmptyText);
            }
        }

        let owner = owner_id.to_string();
        let id = task_id.to_string();
        let found = self
            .db
            .call(move |db| db.update_task(&owner, &id, &patch))
            .await
            .map_err(StoreError::Database)?;
        if !found {
            return Err(StoreError::TaskNotFound {
                id: task_id.to_string(),
            });
        }
        tracing::info!(owner = owner_id, task = task_id, "task updated");
        self.announce(owner_id);
        Ok(())
    }

    async fn batch_delete(&self, owner_id: &str, task_ids: &[TaskId]) -> Result<usize, StoreError> {
        require_owner(owner_id)?;
        if task_ids.is_empty() {
            return Ok(0);
        }

        let owner = owner_id.to_string();
        let ids = task_ids.to_vec();
        let removed = self
            .db
            .call(move |db| db.delete_tasks(&owner, &ids))
            .await
            .map_err(StoreError::Database)?;
        tracing::info!(owner = owner_id, removed, "tasks deleted");
        self.announce(owner_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::first_snapshot;

    async fn next_tasks(sub: &mut Subscription) -> Vec<quadrant_common::Task> {
        tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .expect("snapshot within timeout")
            .expect("subscription open")
            .expect("snapshot loaded")
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_snapshot() {
        let store = SqliteTaskStore::in_memory().unwrap();
        store.create("u1", "first", Category::DEFAULT).await.unwrap();

        let mut sub = store.subscribe("u1").await.unwrap();
        let tasks = next_tasks(&mut sub).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "first");
    }

    #[tokio::test]
    async fn test_every_mutation_pushes_a_full_snapshot() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let mut sub = store.subscribe("u1").await.unwrap();
        assert!(next_tasks(&mut sub).await.is_empty());

        let id = store.create("u1", "  Buy milk  ", Category::ViktigtBratttom).await.unwrap();
        let tasks = next_tasks(&mut sub).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "Buy milk");

        let patch = TaskPatch {
            category: Some(Category::BratttomInteViktigt),
            ..Default::default()
        };
        store.update("u1", &id, patch).await.unwrap();
        let tasks = next_tasks(&mut sub).await;
        assert_eq!(tasks[0].category, "bratttom_inte_viktigt");

        store.batch_delete("u1", &[id]).await.unwrap();
        assert!(next_tasks(&mut sub).await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshots_are_scoped_to_owner() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let mut alice = store.subscribe("alice").await.unwrap();
        assert!(next_tasks(&mut alice).await.is_empty());

        store.create("bob", "bob's task", Category::DEFAULT).await.unwrap();
        store.create("alice", "alice's task", Category::DEFAULT).await.unwrap();

        // Bob's write does not produce a snapshot for alice; the next one is hers.
        let tasks = next_tasks(&mut alice).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "alice's task");
    }

    #[tokio::test]
    async fn test_cancelled_subscription_stops_delivering() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let mut sub = store.subscribe("u1").await.unwrap();
        next_tasks(&mut sub).await;

        sub.cancel();
        assert!(sub.is_cancelled());
        store.create("u1", "after cancel", Category::DEFAULT).await.unwrap();
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_two_sessions_see_the_same_change() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let mut a = store.subscribe("u1").await.unwrap();
        let mut b = store.subscribe("u1").await.unwrap();
        next_tasks(&mut a).await;
        next_tasks(&mut b).await;

        store.create("u1", "shared", Category::DEFAULT).await.unwrap();
        assert_eq!(next_tasks(&mut a).await[0].text, "shared");
        assert_eq!(next_tasks(&mut b).await[0].text, "shared");
    }

    #[tokio::test]
    async fn test_create_requires_owner_and_text() {
        let store = SqliteTaskStore::in_memory().unwrap();
        assert!(matches!(
            store.create("", "x", Category::DEFAULT).await,
            Err(StoreError::MissingOwner)
        ));
        assert!(matches!(
            store.create("u1", "   ", Category::DEFAULT).await,
            Err(StoreError::EmptyText)
        ));
        assert!(matches!(store.subscribe(" ").await, Err(StoreError::MissingOwner)));
    }

    #[tokio::test]
    async fn test_update_unknown_task_fails() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let patch = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        match store.update("u1", "nope", patch).await {
            Err(StoreError::TaskNotFound { id }) => assert_eq!(id, "nope"),
            other => panic!("Expected TaskNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_rejects_blank_text() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let id = store.create("u1", "keep", Category::DEFAULT).await.unwrap();
        let patch = TaskPatch {
            text: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update("u1", &id, patch).await,
            Err(StoreError::EmptyText)
        ));
        assert_eq!(first_snapshot(&store, "u1").await.unwrap()[0].text, "keep");
    }

    #[tokio::test]
    async fn test_batch_delete_leaves_other_tasks() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let a = store.create("u1", "a", Category::DEFAULT).await.unwrap();
        let b = store.create("u1", "b", Category::DEFAULT).await.unwrap();
        let removed = store.batch_delete("u1", &[a]).await.unwrap();
        assert_eq!(removed, 1);
        let tasks = first_snapshot(&store, "u1").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, b);
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.db");
        let store = SqliteTaskStore::open(&path).unwrap();
        store.create("u1", "on disk", Category::DEFAULT).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_commit_from_another_process_reaches_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let board = SqliteTaskStore::open(&path).unwrap();
        let cli = SqliteTaskStore::open(&path).unwrap();

        let mut sub = board.subscribe("ada").await.unwrap();
        assert!(next_tasks(&mut sub).await.is_empty());

        cli.create("ada", "added elsewhere", Category::DEFAULT).await.unwrap();
        let tasks = next_tasks(&mut sub).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "added elsewhere");

        let id = tasks[0].id.clone();
        cli.batch_delete("ada", &[id]).await.unwrap();
        assert!(next_tasks(&mut sub).await.is_empty());
    }

    #[tokio::test]
    async fn test_external_commit_for_another_owner_is_not_repeated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let board = SqliteTaskStore::open(&path).unwrap();
        let cli = SqliteTaskStore::open(&path).unwrap();

        let mut sub = board.subscribe("ada").await.unwrap();
        assert!(next_tasks(&mut sub).await.is_empty());

        cli.create("grace", "not ada's", Category::DEFAULT).await.unwrap();
        cli.create("ada", "ada's", Category::DEFAULT).await.unwrap();

        // Whatever ticks observe the two commits, ada never sees an
        // unchanged empty board again; the next snapshot is hers.
        let tasks = next_tasks(&mut sub).await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "ada's");
    }
}
