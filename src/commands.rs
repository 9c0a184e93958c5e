//! Chat command dispatcher: authorized operators mutate the queue by chat.
//!
//! Messages that don't start with the prefix are ignored; prefixed messages
//! from non-operators are dropped silently so the command surface leaks
//! nothing to strangers. Every enqueue command stops whatever is running
//! first, then pushes the new task.

use tracing::{debug, info};

use crate::adapter::GameAdapter;
use crate::task::Task;
use crate::AgentContext;

/// Global stop: cancel every live tick callback, clear any movement goal,
/// empty the queue and the active slot, persist the now-empty state.
pub fn stop_all<A: GameAdapter>(ctx: &AgentContext<A>) {
    ctx.ticks.cancel_all();
    ctx.adapter.clear_goal();
    ctx.store.lock().clear();
    info!("stopped: queue cleared, ticks cancelled");
}

pub struct CommandDispatcher<A: GameAdapter> {
    ctx: AgentContext<A>,
}

impl<A: GameAdapter> CommandDispatcher<A> {
    pub fn new(ctx: AgentContext<A>) -> Self {
        Self { ctx }
    }

    pub fn dispatch(&self, sender: &str, message: &str) {
        let Some(rest) = message.strip_prefix(&self.ctx.config.prefix) else {
            return;
        };
        if !self.ctx.config.is_operator(sender) {
            debug!(sender, "ignoring command from non-operator");
            return;
        }

        let mut parts = rest.split_whitespace();
        let Some(command) = parts.next() else {
            return;
        };
        let args: Vec<&str> = parts.collect();

        match command {
            "help" => self.reply(&format!(
                "commands: {p}help {p}stop {p}afk {p}goto <x> <y> <z> [range] {p}follow <player> \
                 {p}rc {p}rcblock <x> <y> <z> {p}lc {p}attack {p}attackcfg",
                p = self.ctx.config.prefix
            )),
            "stop" => {
                stop_all(&self.ctx);
                self.reply("stopped");
            }
            "afk" => self.stop_then_push(Task::default_afk()),
            "goto" => self.cmd_goto(&args),
            "follow" => self.cmd_follow(&args),
            "rc" => self.stop_then_push(Task::unbounded_right_click_item()),
            "rcblock" => self.cmd_rcblock(&args),
            "lc" | "attack" => self.stop_then_push(Task::AttackLoop { every_ms: None }),
            "attackcfg" => {
                let combat = &self.ctx.config.combat;
                self.reply(&format!(
                    "attack: range={} fovCos={} everyMs={} kinds={}",
                    combat.range,
                    combat.fov_cos,
                    combat.every_ms,
                    combat.kinds.join(",")
                ));
            }
            other => {
                debug!(sender, command = other, "unknown command");
                self.reply(&format!("unknown command: {}", other));
            }
        }
    }

    fn cmd_goto(&self, args: &[&str]) {
        let usage = || {
            self.reply(&format!(
                "usage: {}goto <x> <y> <z> [range]",
                self.ctx.config.prefix
            ))
        };
        if args.len() < 3 || args.len() > 4 {
            usage();
            return;
        }
        let coords: Result<Vec<f64>, _> = args.iter().map(|a| a.parse::<f64>()).collect();
        let Ok(coords) = coords else {
            usage();
            return;
        };
        let range = if coords.len() == 4 { coords[3] } else { 1.0 };
        self.stop_then_push(Task::Goto {
            x: coords[0],
            y: coords[1],
            z: coords[2],
            range,
        });
    }

    fn cmd_follow(&self, args: &[&str]) {
        let [player] = args else {
            self.reply(&format!(
                "usage: {}follow <player>",
                self.ctx.config.prefix
            ));
            return;
        };
        self.stop_then_push(Task::follow(player.to_string()));
    }

    fn cmd_rcblock(&self, args: &[&str]) {
        let usage = || {
            self.reply(&format!(
                "usage: {}rcblock <x> <y> <z>",
                self.ctx.config.prefix
            ))
        };
        let [x, y, z] = args else {
            usage();
            return;
        };
        let (Ok(x), Ok(y), Ok(z)) = (x.parse::<i32>(), y.parse::<i32>(), z.parse::<i32>()) else {
            usage();
            return;
        };
        self.stop_then_push(Task::unbounded_right_click_block(x, y, z));
    }

    fn stop_then_push(&self, task: Task) {
        stop_all(&self.ctx);
        let kind = task.kind();
        self.ctx.store.lock().push(task);
        info!(task = kind, "queued task");
        self.reply(&format!("ok: {}", kind));
    }

    fn reply(&self, message: &str) {
        self.ctx.adapter.send_chat(message);
    }
}

impl<A: GameAdapter> Clone for CommandDispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::sim::{PlannerScript, SimAdapter};
    use crate::store::QueueStore;
    use crate::ticks::TickRegistry;
    use clap::Parser;
    use std::sync::Arc;
    use uuid::Uuid;

    fn context(config: BotConfig) -> AgentContext<SimAdapter> {
        let path = std::env::temp_dir().join(format!("drudge-cmd-{}.json", Uuid::new_v4()));
        AgentContext {
            config: Arc::new(config),
            adapter: Arc::new(SimAdapter::new(PlannerScript::Manual)),
            store: QueueStore::load(path).into_shared(),
            ticks: Arc::new(TickRegistry::new()),
        }
    }

    #[test]
    fn test_non_prefixed_text_is_ignored() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "hello there");
        assert_eq!(ctx.store.lock().queue_len(), 0);
        assert!(ctx.adapter.chat_log().is_empty());
    }

    #[test]
    fn test_unauthorized_sender_gets_no_reply_and_no_mutation() {
        let config = BotConfig::parse_from(["drudge", "--operators", "Alice"]);
        let ctx = context(config);
        ctx.store.lock().push(Task::Wait { ms: 10 });

        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Bob", "#stop");

        assert_eq!(ctx.store.lock().queue_len(), 1);
        assert!(ctx.adapter.chat_log().is_empty());
    }

    #[test]
    fn test_goto_enqueues_after_stop() {
        let ctx = context(BotConfig::defaults());
        ctx.store.lock().push(Task::Wait { ms: 10 });

        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#goto 10 64 -3 2");

        let store = ctx.store.lock();
        assert_eq!(store.queue_len(), 1);
        assert_eq!(
            store.queued().next(),
            Some(&Task::Goto {
                x: 10.0,
                y: 64.0,
                z: -3.0,
                range: 2.0
            })
        );
    }

    #[test]
    fn test_goto_default_range() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#goto 1 2 3");
        assert_eq!(
            ctx.store.lock().queued().next(),
            Some(&Task::Goto {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                range: 1.0
            })
        );
    }

    #[test]
    fn test_malformed_goto_replies_usage_without_mutation() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#goto ten 0 10");

        assert_eq!(ctx.store.lock().queue_len(), 0);
        let chat = ctx.adapter.chat_log();
        assert_eq!(chat.len(), 1);
        assert!(chat[0].starts_with("usage: #goto"));
    }

    #[test]
    fn test_follow_requires_player_arg() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#follow");
        assert_eq!(ctx.store.lock().queue_len(), 0);
        assert!(ctx.adapter.chat_log()[0].starts_with("usage:"));

        dispatcher.dispatch("Alice", "#follow Steve");
        assert_eq!(
            ctx.store.lock().queued().next(),
            Some(&Task::Follow {
                player: "Steve".to_string(),
                distance: 3.0,
                every_ms: 700
            })
        );
    }

    #[test]
    fn test_rc_and_attack_enqueue_unbounded_loops() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());

        dispatcher.dispatch("Alice", "#rc");
        assert_eq!(
            ctx.store.lock().queued().next(),
            Some(&Task::RightClickItem {
                every_ms: 250,
                times: 0
            })
        );

        dispatcher.dispatch("Alice", "#lc");
        assert_eq!(
            ctx.store.lock().queued().next(),
            Some(&Task::AttackLoop { every_ms: None })
        );
    }

    #[test]
    fn test_rcblock_parses_ints() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#rcblock 3 64 -2");
        assert_eq!(
            ctx.store.lock().queued().next(),
            Some(&Task::RightClickBlock {
                x: 3,
                y: 64,
                z: -2,
                every_ms: 500,
                times: 0
            })
        );

        dispatcher.dispatch("Alice", "#rcblock 3.5 64 -2");
        assert!(ctx
            .adapter
            .chat_log()
            .iter()
            .any(|m| m.starts_with("usage: #rcblock")));
    }

    #[test]
    fn test_attackcfg_reports_without_mutation() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#attackcfg");
        assert_eq!(ctx.store.lock().queue_len(), 0);
        let chat = ctx.adapter.chat_log();
        assert!(chat[0].contains("range=4"));
    }

    #[test]
    fn test_unknown_command_replies() {
        let ctx = context(BotConfig::defaults());
        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#dance");
        assert_eq!(ctx.adapter.chat_log(), vec!["unknown command: dance"]);
    }

    #[test]
    fn test_stop_clears_everything() {
        let ctx = context(BotConfig::defaults());
        ctx.store.lock().push(Task::Wait { ms: 10 });
        ctx.store.lock().push(Task::default_afk());
        ctx.store.lock().promote_next();

        let dispatcher = CommandDispatcher::new(ctx.clone());
        dispatcher.dispatch("Alice", "#stop");

        let store = ctx.store.lock();
        assert_eq!(store.queue_len(), 0);
        assert!(store.active().is_none());
        assert_eq!(ctx.ticks.live_count(), 0);
    }
}
