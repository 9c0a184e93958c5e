//! Boot configuration, resolved once from flags/environment and immutable after.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

/// What to do when the session ends: exit and let a supervisor restart the
/// process (it resumes from the persisted snapshot), or reconnect in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisconnectPolicy {
    Exit,
    Reconnect,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "drudge")]
#[command(about = "Chat-commanded game agent with a persistent task queue", long_about = None)]
pub struct BotConfig {
    /// Server host
    #[arg(long, env = "DRUDGE_HOST", default_value = "localhost")]
    pub host: String,

    /// Server port
    #[arg(long, env = "DRUDGE_PORT", default_value_t = 25565)]
    pub port: u16,

    /// Protocol version string
    #[arg(long, env = "DRUDGE_VERSION", default_value = "1.20.1")]
    pub version: String,

    /// Identity the agent connects as
    #[arg(long, env = "DRUDGE_USERNAME", default_value = "drudge")]
    pub username: String,

    /// Auth mode (offline or an account auth scheme)
    #[arg(long, env = "DRUDGE_AUTH", default_value = "offline")]
    pub auth: String,

    /// Chat command prefix
    #[arg(long, env = "DRUDGE_PREFIX", default_value = "#")]
    pub prefix: String,

    /// Comma-separated operator names allowed to command the agent.
    /// Empty means anyone may.
    #[arg(long, env = "DRUDGE_OPERATORS", value_delimiter = ',', default_value = "")]
    pub operators: Vec<String>,

    /// Max distance for block interaction
    #[arg(long, env = "DRUDGE_INTERACT_DISTANCE", default_value_t = 4.5)]
    pub interact_distance: f64,

    /// Behavior when the session drops
    #[arg(long, env = "DRUDGE_ON_DISCONNECT", value_enum, default_value = "exit")]
    pub on_disconnect: DisconnectPolicy,

    /// Queue snapshot file (default: ~/.drudge/state.json)
    #[arg(long, env = "DRUDGE_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    #[command(flatten)]
    pub combat: CombatConfig,
}

/// Combat tuning for the attack loop and target selection.
#[derive(Debug, Clone, Args)]
pub struct CombatConfig {
    /// Max straight-line distance from eye to target
    #[arg(long = "attack-range", env = "DRUDGE_ATTACK_RANGE", default_value_t = 4.0)]
    pub range: f64,

    /// Min cosine between look direction and target direction
    #[arg(long = "attack-fov-cos", env = "DRUDGE_ATTACK_FOV_COS", default_value_t = 0.6)]
    pub fov_cos: f64,

    /// Attack tick interval in milliseconds
    #[arg(long = "attack-every-ms", env = "DRUDGE_ATTACK_EVERY_MS", default_value_t = 600)]
    pub every_ms: u64,

    /// Comma-separated entity kinds eligible as targets
    #[arg(
        long = "attack-kinds",
        env = "DRUDGE_ATTACK_KINDS",
        value_delimiter = ',',
        default_value = "hostile"
    )]
    pub kinds: Vec<String>,
}

impl BotConfig {
    /// True when `name` may command the agent. An empty operator list means
    /// the command surface is unrestricted.
    pub fn is_operator(&self, name: &str) -> bool {
        let mut restricted = false;
        for op in &self.operators {
            let op = op.trim();
            if op.is_empty() {
                continue;
            }
            restricted = true;
            if op == name {
                return true;
            }
        }
        !restricted
    }

    /// Config as if launched with no flags. Used by tests and the sim harness.
    pub fn defaults() -> Self {
        Self::parse_from(["drudge"])
    }

    pub fn state_file_path(&self) -> PathBuf {
        match &self.state_file {
            Some(path) => path.clone(),
            None => match home::home_dir() {
                Some(home) => home.join(".drudge/state.json"),
                None => PathBuf::from("drudge-state.json"),
            },
        }
    }
}

impl CombatConfig {
    pub fn is_eligible_kind(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotConfig::parse_from(["drudge"]);
        assert_eq!(config.port, 25565);
        assert_eq!(config.prefix, "#");
        assert_eq!(config.interact_distance, 4.5);
        assert_eq!(config.on_disconnect, DisconnectPolicy::Exit);
        assert_eq!(config.combat.range, 4.0);
        assert_eq!(config.combat.kinds, vec!["hostile".to_string()]);
    }

    #[test]
    fn test_empty_operator_list_allows_anyone() {
        let config = BotConfig::parse_from(["drudge"]);
        assert!(config.is_operator("Alice"));
        assert!(config.is_operator("Bob"));
    }

    #[test]
    fn test_operator_list_restricts() {
        let config = BotConfig::parse_from(["drudge", "--operators", "Alice,Carol"]);
        assert!(config.is_operator("Alice"));
        assert!(config.is_operator("Carol"));
        assert!(!config.is_operator("Bob"));
    }

    #[test]
    fn test_combat_flags() {
        let config = BotConfig::parse_from([
            "drudge",
            "--attack-range",
            "6.0",
            "--attack-kinds",
            "hostile,player",
        ]);
        assert_eq!(config.combat.range, 6.0);
        assert!(config.combat.is_eligible_kind("player"));
        assert!(!config.combat.is_eligible_kind("villager"));
    }
}
