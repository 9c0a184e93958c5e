//! Task descriptors: one serializable record per unit of agent behavior.

use serde::{Deserialize, Serialize};

/// A single unit of work for the agent. Serialized into the queue snapshot
/// and produced by chat commands, so field names and tags are stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Task {
    /// Do nothing for a fixed duration, then complete.
    Wait { ms: u64 },
    /// Walk to a world coordinate; completes on arrival.
    Goto {
        x: f64,
        y: f64,
        z: f64,
        #[serde(default = "default_goto_range")]
        range: f64,
    },
    /// Keep re-issuing a proximity goal toward a named player. Never completes.
    Follow {
        player: String,
        #[serde(default = "default_follow_distance")]
        distance: f64,
        #[serde(default = "default_follow_every_ms")]
        every_ms: u64,
    },
    /// Activate the held item on a fixed interval. `times == 0` runs forever.
    RightClickItem {
        #[serde(default = "default_item_every_ms")]
        every_ms: u64,
        #[serde(default)]
        times: u32,
    },
    /// Activate the block at a coordinate on a fixed interval, walking into
    /// range first. `times == 0` runs forever.
    RightClickBlock {
        x: i32,
        y: i32,
        z: i32,
        #[serde(default = "default_block_every_ms")]
        every_ms: u64,
        #[serde(default)]
        times: u32,
    },
    /// Swing, pick the best target in view, attack it. Never completes.
    /// Interval defaults to the combat config when not given.
    AttackLoop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        every_ms: Option<u64>,
    },
    /// Idle look jitter so the agent is never motionless. Never completes.
    Afk {
        #[serde(default = "default_afk_every_ms")]
        every_ms: u64,
    },
}

fn default_goto_range() -> f64 {
    1.0
}

fn default_follow_distance() -> f64 {
    3.0
}

fn default_follow_every_ms() -> u64 {
    700
}

fn default_item_every_ms() -> u64 {
    250
}

fn default_block_every_ms() -> u64 {
    500
}

fn default_afk_every_ms() -> u64 {
    5000
}

impl Task {
    /// Stable tag for logs and replies.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Wait { .. } => "wait",
            Task::Goto { .. } => "goto",
            Task::Follow { .. } => "follow",
            Task::RightClickItem { .. } => "rightClickItem",
            Task::RightClickBlock { .. } => "rightClickBlock",
            Task::AttackLoop { .. } => "attackLoop",
            Task::Afk { .. } => "afk",
        }
    }

    /// True when the handler never returns on its own and only an external
    /// stop ends it.
    pub fn is_infinite(&self) -> bool {
        match self {
            Task::Wait { .. } | Task::Goto { .. } => false,
            Task::Follow { .. } | Task::AttackLoop { .. } | Task::Afk { .. } => true,
            Task::RightClickItem { times, .. } | Task::RightClickBlock { times, .. } => *times == 0,
        }
    }

    /// Default idle task seeded when the store bootstraps empty.
    pub fn default_afk() -> Self {
        Task::Afk {
            every_ms: default_afk_every_ms(),
        }
    }

    pub fn follow(player: impl Into<String>) -> Self {
        Task::Follow {
            player: player.into(),
            distance: default_follow_distance(),
            every_ms: default_follow_every_ms(),
        }
    }

    pub fn unbounded_right_click_item() -> Self {
        Task::RightClickItem {
            every_ms: default_item_every_ms(),
            times: 0,
        }
    }

    pub fn unbounded_right_click_block(x: i32, y: i32, z: i32) -> Self {
        Task::RightClickBlock {
            x,
            y,
            z,
            every_ms: default_block_every_ms(),
            times: 0,
        }
    }
}
