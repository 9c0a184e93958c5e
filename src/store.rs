//! Persisted queue store: the durable `{queue, active}` snapshot.
//!
//! The snapshot file is the sole source of truth for resuming after a
//! restart. Every mutation rewrites the whole file; a failed write is logged
//! and the store keeps operating in memory, since the next successful
//! mutation rewrites the full state anyway.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::task::Task;

pub type SharedStore = Arc<Mutex<QueueStore>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk shape of the store. `active` holds the task currently in flight;
/// it is never also present in `queue`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub queue: VecDeque<Task>,
    #[serde(default)]
    pub active: Option<Task>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct QueueStore {
    path: PathBuf,
    snap: Snapshot,
}

impl QueueStore {
    /// Load the snapshot at `path`. A missing or unreadable file yields an
    /// empty store; so does a corrupt one (including an unknown task tag).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snap = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Snapshot>(&content) {
                Ok(snap) => {
                    debug!(
                        path = %path.display(),
                        queued = snap.queue.len(),
                        active = snap.active.is_some(),
                        "loaded queue snapshot"
                    );
                    snap
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt snapshot, starting empty");
                    Snapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable snapshot, starting empty");
                Snapshot::default()
            }
        };
        Self { path, snap }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seed the default idle task when the store came up completely empty,
    /// so the agent is never left with no instructions at all.
    pub fn bootstrap(&mut self) {
        if self.snap.queue.is_empty() && self.snap.active.is_none() {
            self.snap.queue.push_back(Task::default_afk());
            self.persist();
        }
    }

    pub fn active(&self) -> Option<&Task> {
        self.snap.active.as_ref()
    }

    pub fn queue_len(&self) -> usize {
        self.snap.queue.len()
    }

    pub fn queued(&self) -> impl Iterator<Item = &Task> {
        self.snap.queue.iter()
    }

    /// Append a task at the tail.
    pub fn push(&mut self, task: Task) {
        self.snap.queue.push_back(task);
        self.persist();
    }

    /// Pop the queue head into the active slot. Returns None when a task is
    /// already active or the queue is empty.
    pub fn promote_next(&mut self) -> Option<Task> {
        if self.snap.active.is_some() {
            return None;
        }
        let task = self.snap.queue.pop_front()?;
        self.snap.active = Some(task.clone());
        self.persist();
        Some(task)
    }

    /// Clear the active slot after normal completion. No-op when a stop
    /// already cleared it.
    pub fn complete_active(&mut self) {
        if self.snap.active.take().is_some() {
            self.persist();
        }
    }

    /// Drop everything: queued backlog and the active slot.
    pub fn clear(&mut self) {
        self.snap.queue.clear();
        self.snap.active = None;
        self.persist();
    }

    fn persist(&mut self) {
        self.snap.saved_at = Some(Utc::now());
        if let Err(e) = self.save() {
            warn!(error = %e, "snapshot write failed, continuing in memory");
        }
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(&self.snap)?;
        std::fs::write(&self.path, json).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("drudge-store-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_starts_empty_and_bootstraps_afk() {
        let path = temp_path();
        let mut store = QueueStore::load(&path);
        assert_eq!(store.queue_len(), 0);
        assert!(store.active().is_none());

        store.bootstrap();
        assert_eq!(store.queue_len(), 1);
        assert_eq!(store.queued().next(), Some(&Task::default_afk()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_bootstrap_is_a_noop_when_state_exists() {
        let path = temp_path();
        let mut store = QueueStore::load(&path);
        store.push(Task::Wait { ms: 10 });
        store.bootstrap();
        assert_eq!(store.queue_len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_promote_moves_head_out_of_queue() {
        let path = temp_path();
        let mut store = QueueStore::load(&path);
        store.push(Task::Wait { ms: 1 });
        store.push(Task::Wait { ms: 2 });

        let promoted = store.promote_next().unwrap();
        assert_eq!(promoted, Task::Wait { ms: 1 });
        assert_eq!(store.active(), Some(&Task::Wait { ms: 1 }));
        // The active task must not remain in the queue.
        assert_eq!(store.queue_len(), 1);
        assert_eq!(store.queued().next(), Some(&Task::Wait { ms: 2 }));

        // A second promote while one is active is refused.
        assert!(store.promote_next().is_none());

        store.complete_active();
        assert!(store.active().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_complete_active_is_noop_when_empty() {
        let path = temp_path();
        let mut store = QueueStore::load(&path);
        store.complete_active();
        assert!(store.active().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_snapshot_survives_reload_with_active_task() {
        let path = temp_path();
        {
            let mut store = QueueStore::load(&path);
            store.push(Task::Goto {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                range: 1.0,
            });
            store.push(Task::Wait { ms: 50 });
            store.promote_next();
        }

        // Simulated restart: the active task resumes as-is, not re-queued.
        let store = QueueStore::load(&path);
        assert_eq!(
            store.active(),
            Some(&Task::Goto {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                range: 1.0
            })
        );
        assert_eq!(store.queue_len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path();
        std::fs::write(&path, "{not json").unwrap();
        let store = QueueStore::load(&path);
        assert_eq!(store.queue_len(), 0);
        assert!(store.active().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unknown_task_tag_counts_as_corrupt() {
        let path = temp_path();
        std::fs::write(
            &path,
            r#"{"queue":[{"type":"selfDestruct"}],"active":null}"#,
        )
        .unwrap();
        let store = QueueStore::load(&path);
        assert_eq!(store.queue_len(), 0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_clear_empties_queue_and_active() {
        let path = temp_path();
        let mut store = QueueStore::load(&path);
        store.push(Task::Wait { ms: 1 });
        store.push(Task::Wait { ms: 2 });
        store.promote_next();
        store.clear();
        assert_eq!(store.queue_len(), 0);
        assert!(store.active().is_none());

        let reloaded = QueueStore::load(&path);
        assert_eq!(reloaded.queue_len(), 0);
        assert!(reloaded.active().is_none());

        let _ = std::fs::remove_file(&path);
    }
}
