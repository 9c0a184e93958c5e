//! Capability surface the core consumes from the game-client library.
//!
//! Everything the task handlers and the target selector need from the live
//! session goes through [`GameAdapter`]: world snapshot reads, the movement
//! planner, and primitive actions. Movement goals report back through a
//! single-shot channel so a waiter can race the signal against a timeout and
//! the planner side never blocks on a departed waiter.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Center of the block volume, the point movement and look aim at.
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }
}

/// One entity as seen in the current world snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: u32,
    pub kind: String,
    pub name: Option<String>,
    pub position: Point3<f64>,
    pub height: f64,
}

/// One block as seen in the current world snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSnapshot {
    pub pos: BlockPos,
    pub name: String,
}

/// The agent's own pose. Yaw/pitch in radians; height is the eye offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentState {
    pub entity_id: u32,
    pub position: Point3<f64>,
    pub yaw: f64,
    pub pitch: f64,
    pub height: f64,
}

impl AgentState {
    pub fn eye_position(&self) -> Point3<f64> {
        Point3::new(
            self.position.x,
            self.position.y + self.height,
            self.position.z,
        )
    }
}

/// A proximity goal for the movement planner: get within `range` of `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goal {
    pub target: Point3<f64>,
    pub range: f64,
}

/// Terminal planner signal for an issued goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalSignal {
    Arrived,
    NoPath,
    Stuck,
}

/// Session lifecycle events surfaced by the game client.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Joined,
    Disconnected { reason: String },
    Kicked { reason: String },
    Error { message: String },
}

pub trait GameAdapter: Send + Sync + 'static {
    // World snapshot
    fn agent(&self) -> AgentState;
    fn entities(&self) -> Vec<EntitySnapshot>;
    fn player_position(&self, name: &str) -> Option<Point3<f64>>;
    fn block_at(&self, pos: BlockPos) -> Option<BlockSnapshot>;
    fn has_line_of_sight(&self, from: Point3<f64>, to: Point3<f64>) -> bool;

    // Movement planner. Issuing a new goal replaces the previous one; the
    // returned receiver resolves at most once.
    fn set_goal(&self, goal: Goal) -> oneshot::Receiver<GoalSignal>;
    fn clear_goal(&self);

    // Primitive actions
    fn set_look(&self, yaw: f64, pitch: f64);
    fn look_at(&self, target: Point3<f64>);
    fn activate_item(&self) -> Result<(), String>;
    fn activate_block(&self, pos: BlockPos) -> Result<(), String>;
    fn attack(&self, entity_id: u32) -> Result<(), String>;
    fn swing_arm(&self);
    fn send_chat(&self, message: &str);

    // Session lifecycle
    fn connected(&self) -> bool;
    fn next_event(&self) -> Option<SessionEvent>;
}
