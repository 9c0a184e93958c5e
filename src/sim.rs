//! In-process simulated world implementing the adapter surface.
//!
//! The binary runs against this when no real game client is wired in, and
//! the tests use it to script planner outcomes and count primitive actions.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nalgebra::Point3;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::adapter::{
    AgentState, BlockPos, BlockSnapshot, EntitySnapshot, GameAdapter, Goal, GoalSignal,
    SessionEvent,
};

/// How the simulated planner resolves issued goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerScript {
    /// Teleport to the target and signal `Arrived` after a travel delay.
    Arrive { travel_ms: u64 },
    /// Signal `Stuck` immediately.
    Stuck,
    /// Signal `NoPath` immediately.
    NoPath,
    /// Hold the goal until a test resolves it via [`SimAdapter::resolve_goal`].
    Manual,
}

/// Counters for primitive actions, for assertions.
#[derive(Debug, Default)]
pub struct ActionLog {
    pub item_activations: AtomicU32,
    pub block_activations: AtomicU32,
    pub attacks: AtomicU32,
    pub swings: AtomicU32,
    pub look_updates: AtomicU32,
}

#[derive(Debug)]
struct SimWorld {
    agent: AgentState,
    entities: Vec<EntitySnapshot>,
    blocks: HashMap<BlockPos, String>,
    players: HashMap<String, Point3<f64>>,
    goal: Option<Goal>,
    pending: Option<oneshot::Sender<GoalSignal>>,
    events: VecDeque<SessionEvent>,
    chat_log: Vec<String>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self {
            agent: AgentState {
                entity_id: 0,
                position: Point3::origin(),
                yaw: 0.0,
                pitch: 0.0,
                height: 1.6,
            },
            entities: Vec::new(),
            blocks: HashMap::new(),
            players: HashMap::new(),
            goal: None,
            pending: None,
            events: VecDeque::new(),
            chat_log: Vec::new(),
        }
    }
}

pub struct SimAdapter {
    world: Arc<Mutex<SimWorld>>,
    planner: PlannerScript,
    pub actions: ActionLog,
    fail_actions: AtomicBool,
    blind: AtomicBool,
    connected: AtomicBool,
}

impl SimAdapter {
    pub fn new(planner: PlannerScript) -> Self {
        Self {
            world: Arc::new(Mutex::new(SimWorld::default())),
            planner,
            actions: ActionLog::default(),
            fail_actions: AtomicBool::new(false),
            blind: AtomicBool::new(false),
            connected: AtomicBool::new(true),
        }
    }

    pub fn add_entity(&self, id: u32, kind: &str, position: Point3<f64>) {
        self.world.lock().entities.push(EntitySnapshot {
            id,
            kind: kind.to_string(),
            name: None,
            position,
            height: 1.8,
        });
    }

    pub fn add_block(&self, pos: BlockPos, name: &str) {
        self.world.lock().blocks.insert(pos, name.to_string());
    }

    pub fn add_player(&self, name: &str, position: Point3<f64>) {
        self.world.lock().players.insert(name.to_string(), position);
    }

    pub fn move_player(&self, name: &str, position: Point3<f64>) {
        if let Some(p) = self.world.lock().players.get_mut(name) {
            *p = position;
        }
    }

    /// Make every fallible primitive return an error.
    pub fn fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }

    /// Make line-of-sight checks report everything hidden.
    pub fn set_blind(&self, blind: bool) {
        self.blind.store(blind, Ordering::SeqCst);
    }

    pub fn disconnect(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        self.world.lock().events.push_back(SessionEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    pub fn has_goal(&self) -> bool {
        self.world.lock().goal.is_some()
    }

    pub fn current_goal(&self) -> Option<Goal> {
        self.world.lock().goal
    }

    /// Resolve the held goal (Manual planner only). `Arrived` also moves the
    /// agent to the goal target like the real planner would.
    pub fn resolve_goal(&self, signal: GoalSignal) {
        let mut world = self.world.lock();
        if let Some(tx) = world.pending.take() {
            if signal == GoalSignal::Arrived {
                if let Some(goal) = world.goal {
                    world.agent.position = goal.target;
                }
            }
            world.goal = None;
            let _ = tx.send(signal);
        }
    }

    pub fn chat_log(&self) -> Vec<String> {
        self.world.lock().chat_log.clone()
    }

    fn action_result(&self, counter: &AtomicU32) -> Result<(), String> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.fail_actions.load(Ordering::SeqCst) {
            Err("simulated action failure".to_string())
        } else {
            Ok(())
        }
    }
}

impl GameAdapter for SimAdapter {
    fn agent(&self) -> AgentState {
        self.world.lock().agent
    }

    fn entities(&self) -> Vec<EntitySnapshot> {
        self.world.lock().entities.clone()
    }

    fn player_position(&self, name: &str) -> Option<Point3<f64>> {
        self.world.lock().players.get(name).copied()
    }

    fn block_at(&self, pos: BlockPos) -> Option<BlockSnapshot> {
        self.world
            .lock()
            .blocks
            .get(&pos)
            .map(|name| BlockSnapshot {
                pos,
                name: name.clone(),
            })
    }

    fn has_line_of_sight(&self, _from: Point3<f64>, _to: Point3<f64>) -> bool {
        !self.blind.load(Ordering::SeqCst)
    }

    fn set_goal(&self, goal: Goal) -> oneshot::Receiver<GoalSignal> {
        let (tx, rx) = oneshot::channel();
        let mut world = self.world.lock();
        world.goal = Some(goal);
        world.pending = None;
        match self.planner {
            PlannerScript::Manual => world.pending = Some(tx),
            PlannerScript::NoPath => {
                world.goal = None;
                let _ = tx.send(GoalSignal::NoPath);
            }
            PlannerScript::Stuck => {
                world.goal = None;
                let _ = tx.send(GoalSignal::Stuck);
            }
            PlannerScript::Arrive { travel_ms } => {
                let world = Arc::clone(&self.world);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(travel_ms)).await;
                    let mut w = world.lock();
                    // Only resolve if this goal is still the current one.
                    if w.goal == Some(goal) {
                        w.agent.position = goal.target;
                        w.goal = None;
                        let _ = tx.send(GoalSignal::Arrived);
                    }
                });
            }
        }
        rx
    }

    fn clear_goal(&self) {
        let mut world = self.world.lock();
        world.goal = None;
        world.pending = None;
    }

    fn set_look(&self, yaw: f64, pitch: f64) {
        let mut world = self.world.lock();
        world.agent.yaw = yaw;
        world.agent.pitch = pitch;
        self.actions.look_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn look_at(&self, target: Point3<f64>) {
        let mut world = self.world.lock();
        let eye = world.agent.eye_position();
        let d = target - eye;
        let horiz = (d.x * d.x + d.z * d.z).sqrt();
        world.agent.yaw = f64::atan2(-d.x, -d.z);
        world.agent.pitch = f64::atan2(d.y, horiz);
        self.actions.look_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn activate_item(&self) -> Result<(), String> {
        self.action_result(&self.actions.item_activations)
    }

    fn activate_block(&self, _pos: BlockPos) -> Result<(), String> {
        self.action_result(&self.actions.block_activations)
    }

    fn attack(&self, _entity_id: u32) -> Result<(), String> {
        self.action_result(&self.actions.attacks)
    }

    fn swing_arm(&self) {
        self.actions.swings.fetch_add(1, Ordering::SeqCst);
    }

    fn send_chat(&self, message: &str) {
        self.world.lock().chat_log.push(message.to_string());
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn next_event(&self) -> Option<SessionEvent> {
        self.world.lock().events.pop_front()
    }
}
