//! Registry of live per-task tick loops.
//!
//! Every running task handler is tracked here so a global stop can cancel
//! all outstanding tick sources in one pass.

use dashmap::DashMap;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct TickRegistry {
    live: DashMap<Uuid, AbortHandle>,
}

impl TickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a spawned handler. The caller keeps the `JoinHandle` to await;
    /// the registry only keeps the abort side.
    pub fn track<T>(&self, handle: &JoinHandle<T>) -> Uuid {
        let id = Uuid::new_v4();
        self.live.insert(id, handle.abort_handle());
        id
    }

    /// Forget a handler that finished on its own.
    pub fn release(&self, id: Uuid) {
        self.live.remove(&id);
    }

    /// Abort every tracked handler. Used by the global stop.
    pub fn cancel_all(&self) {
        let count = self.live.len();
        for entry in self.live.iter() {
            entry.value().abort();
        }
        self.live.clear();
        if count > 0 {
            debug!(count, "cancelled tick callbacks");
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
