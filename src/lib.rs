pub mod adapter;
pub mod commands;
pub mod config;
pub mod executor;
pub mod runner;
pub mod sim;
pub mod store;
pub mod target;
pub mod task;
pub mod ticks;

use std::sync::Arc;

use adapter::GameAdapter;
use config::BotConfig;
use store::SharedStore;
use ticks::TickRegistry;

/// Shared application context: the live session adapter, the persisted queue
/// store, the tick registry and the boot config. Created once at startup and
/// handed to the runner and the command dispatcher.
pub struct AgentContext<A: GameAdapter> {
    pub config: Arc<BotConfig>,
    pub adapter: Arc<A>,
    pub store: SharedStore,
    pub ticks: Arc<TickRegistry>,
}

impl<A: GameAdapter> Clone for AgentContext<A> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            adapter: Arc::clone(&self.adapter),
            store: Arc::clone(&self.store),
            ticks: Arc::clone(&self.ticks),
        }
    }
}
