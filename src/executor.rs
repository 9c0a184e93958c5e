//! Task executor: dispatches one task descriptor to its handler.
//!
//! Each handler runs as a spawned tick loop tracked in the [`TickRegistry`],
//! so a global stop aborts it mid-flight. Finite handlers return on their
//! own; infinite ones loop until aborted. The executor propagates handler
//! outcomes untransformed and maps an abort to [`TaskError::Cancelled`].

use std::sync::Arc;
use std::time::Duration;

use nalgebra::Point3;
use rand::Rng;
use thiserror::Error;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, trace};

use crate::adapter::{BlockPos, GameAdapter, Goal, GoalSignal};
use crate::config::BotConfig;
use crate::target::select_target;
use crate::task::Task;
use crate::ticks::TickRegistry;

/// Hard ceiling on a single goto attempt.
pub const GOTO_TIMEOUT: Duration = Duration::from_secs(120);

/// Radius the block-clicking approach walks to before ticking.
const BLOCK_APPROACH_RANGE: f64 = 2.0;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("no path to target")]
    NoPath,
    #[error("movement stuck")]
    Stuck,
    #[error("goal not reached within {0:?}")]
    Timeout(Duration),
    #[error("movement planner dropped the goal")]
    PlannerGone,
    #[error("{action} failed: {message}")]
    Action {
        action: &'static str,
        message: String,
    },
    #[error("cancelled by stop")]
    Cancelled,
    #[error("task handler panicked: {0}")]
    Panicked(String),
}

pub struct TaskExecutor<A: GameAdapter> {
    adapter: Arc<A>,
    config: Arc<BotConfig>,
    ticks: Arc<TickRegistry>,
}

impl<A: GameAdapter> TaskExecutor<A> {
    pub fn new(adapter: Arc<A>, config: Arc<BotConfig>, ticks: Arc<TickRegistry>) -> Self {
        Self {
            adapter,
            config,
            ticks,
        }
    }

    /// Run one task to completion. Infinite tasks park here until a global
    /// stop aborts their handler.
    pub async fn execute(&self, task: Task) -> Result<(), TaskError> {
        let adapter = Arc::clone(&self.adapter);
        let config = Arc::clone(&self.config);
        let handle = tokio::spawn(run_handler(adapter, config, task));
        let id = self.ticks.track(&handle);
        let result = handle.await;
        self.ticks.release(id);
        match result {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_cancelled() => Err(TaskError::Cancelled),
            Err(join_err) => Err(TaskError::Panicked(join_err.to_string())),
        }
    }
}

async fn run_handler<A: GameAdapter>(
    adapter: Arc<A>,
    config: Arc<BotConfig>,
    task: Task,
) -> Result<(), TaskError> {
    match task {
        Task::Wait { ms } => {
            sleep(Duration::from_millis(ms)).await;
            Ok(())
        }
        Task::Goto { x, y, z, range } => run_goto(&*adapter, Point3::new(x, y, z), range).await,
        Task::Follow {
            player,
            distance,
            every_ms,
        } => run_follow(&*adapter, &player, distance, every_ms).await,
        Task::RightClickItem { every_ms, times } => {
            run_right_click_item(&*adapter, every_ms, times).await
        }
        Task::RightClickBlock {
            x,
            y,
            z,
            every_ms,
            times,
        } => run_right_click_block(&*adapter, &config, BlockPos::new(x, y, z), every_ms, times).await,
        Task::AttackLoop { every_ms } => {
            let every_ms = every_ms.unwrap_or(config.combat.every_ms);
            run_attack_loop(&*adapter, &config, every_ms).await
        }
        Task::Afk { every_ms } => run_afk(&*adapter, every_ms).await,
    }
}

/// Issue a movement goal and wait for arrival, an unrecoverable path state,
/// or the timeout, whichever comes first. The goal is cleared on every exit.
async fn run_goto<A: GameAdapter>(
    adapter: &A,
    target: Point3<f64>,
    range: f64,
) -> Result<(), TaskError> {
    let signal = adapter.set_goal(Goal { target, range });
    let outcome = tokio::time::timeout(GOTO_TIMEOUT, signal).await;
    adapter.clear_goal();
    match outcome {
        Ok(Ok(GoalSignal::Arrived)) => Ok(()),
        Ok(Ok(GoalSignal::NoPath)) => Err(TaskError::NoPath),
        Ok(Ok(GoalSignal::Stuck)) => Err(TaskError::Stuck),
        Ok(Err(_)) => Err(TaskError::PlannerGone),
        Err(_) => Err(TaskError::Timeout(GOTO_TIMEOUT)),
    }
}

async fn run_follow<A: GameAdapter>(
    adapter: &A,
    player: &str,
    distance: f64,
    every_ms: u64,
) -> Result<(), TaskError> {
    let mut tick = interval(Duration::from_millis(every_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        match adapter.player_position(player) {
            Some(pos) => {
                // Re-issue a proximity goal at the player's current spot;
                // the planner replaces the previous goal.
                drop(adapter.set_goal(Goal {
                    target: pos,
                    range: distance,
                }));
            }
            None => trace!(player, "follow target not in view, skipping tick"),
        }
    }
}

async fn run_right_click_item<A: GameAdapter>(
    adapter: &A,
    every_ms: u64,
    times: u32,
) -> Result<(), TaskError> {
    let mut tick = interval(Duration::from_millis(every_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut done = 0u32;
    loop {
        tick.tick().await;
        adapter.activate_item().map_err(|e| TaskError::Action {
            action: "activate item",
            message: e,
        })?;
        done += 1;
        if times > 0 && done >= times {
            return Ok(());
        }
    }
}

async fn run_right_click_block<A: GameAdapter>(
    adapter: &A,
    config: &BotConfig,
    pos: BlockPos,
    every_ms: u64,
    times: u32,
) -> Result<(), TaskError> {
    let center = pos.center();
    run_goto(adapter, center, BLOCK_APPROACH_RANGE).await?;

    let mut tick = interval(Duration::from_millis(every_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut done = 0u32;
    loop {
        tick.tick().await;
        if adapter.block_at(pos).is_none() {
            trace!(?pos, "no block at target, skipping tick");
            continue;
        }
        let agent = adapter.agent();
        let dist = (center - agent.position).norm();
        if dist > config.interact_distance {
            // Drifted out of reach; walk back in and skip this activation.
            drop(adapter.set_goal(Goal {
                target: center,
                range: BLOCK_APPROACH_RANGE,
            }));
            continue;
        }
        adapter.look_at(center);
        adapter.activate_block(pos).map_err(|e| TaskError::Action {
            action: "activate block",
            message: e,
        })?;
        done += 1;
        if times > 0 && done >= times {
            adapter.clear_goal();
            return Ok(());
        }
    }
}

async fn run_attack_loop<A: GameAdapter>(
    adapter: &A,
    config: &BotConfig,
    every_ms: u64,
) -> Result<(), TaskError> {
    let mut tick = interval(Duration::from_millis(every_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        adapter.swing_arm();
        let agent = adapter.agent();
        let entities = adapter.entities();
        let picked = select_target(&agent, &entities, &config.combat, |from, to| {
            adapter.has_line_of_sight(from, to)
        });
        if let Some(entity) = picked {
            // Attack failures are non-fatal; the loop keeps swinging.
            if let Err(e) = adapter.attack(entity.id) {
                debug!(entity = entity.id, error = %e, "attack failed");
            }
        }
    }
}

async fn run_afk<A: GameAdapter>(adapter: &A, every_ms: u64) -> Result<(), TaskError> {
    let mut tick = interval(Duration::from_millis(every_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        let agent = adapter.agent();
        let (yaw, pitch) = {
            let mut rng = rand::thread_rng();
            (
                agent.yaw + rng.gen_range(-0.2..=0.2),
                agent.pitch + rng.gen_range(-0.1..=0.1),
            )
        };
        adapter.set_look(yaw, pitch);
    }
}
