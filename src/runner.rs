//! Queue runner: the single consumer that drives tasks to completion.
//!
//! One logical loop, gated by a re-entrancy guard: resume the persisted
//! active task (crash recovery), otherwise promote the queue head; execute
//! it; persist the transition. A failed task is retried in place with a
//! fixed backoff, forever; a stop command is the only way to abandon it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::adapter::GameAdapter;
use crate::executor::{TaskExecutor, TaskError};
use crate::task::Task;
use crate::AgentContext;

/// Sleep between queue checks while nothing is queued.
pub const IDLE_INTERVAL: Duration = Duration::from_millis(1700);

/// Fixed delay before retrying a failed active task.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(2500);

pub struct QueueRunner<A: GameAdapter> {
    ctx: AgentContext<A>,
    executor: TaskExecutor<A>,
    running: AtomicBool,
    idle_interval: Duration,
    retry_backoff: Duration,
}

impl<A: GameAdapter> QueueRunner<A> {
    pub fn new(ctx: AgentContext<A>) -> Self {
        let executor = TaskExecutor::new(
            Arc::clone(&ctx.adapter),
            Arc::clone(&ctx.config),
            Arc::clone(&ctx.ticks),
        );
        Self {
            ctx,
            executor,
            running: AtomicBool::new(false),
            idle_interval: IDLE_INTERVAL,
            retry_backoff: RETRY_BACKOFF,
        }
    }

    /// Override the idle and backoff pacing. Tests use short intervals.
    pub fn with_timing(mut self, idle: Duration, backoff: Duration) -> Self {
        self.idle_interval = idle;
        self.retry_backoff = backoff;
        self
    }

    /// Drain the queue until the session is gone. A second concurrent call
    /// returns immediately.
    pub async fn run(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("queue runner already active, refusing second instance");
            return;
        }

        let mut attempts: u32 = 0;
        while self.ctx.adapter.connected() {
            let task = self.next_task();
            let Some(task) = task else {
                sleep(self.idle_interval).await;
                continue;
            };

            debug!(task = task.kind(), "executing task");
            match self.executor.execute(task.clone()).await {
                Ok(()) => {
                    attempts = 0;
                    self.ctx.store.lock().complete_active();
                    info!(task = task.kind(), "task completed");
                }
                Err(TaskError::Cancelled) => {
                    // Stop already cleared the store; nothing to persist.
                    attempts = 0;
                    debug!(task = task.kind(), "task cancelled");
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        task = task.kind(),
                        attempts,
                        error = %e,
                        "task failed, retrying after backoff"
                    );
                    sleep(self.retry_backoff).await;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("session ended, queue runner stopped");
    }

    /// The active task if one survives from a previous cycle (or a previous
    /// process), otherwise the promoted queue head.
    fn next_task(&self) -> Option<Task> {
        let mut store = self.ctx.store.lock();
        match store.active().cloned() {
            Some(task) => Some(task),
            None => store.promote_next(),
        }
    }
}
