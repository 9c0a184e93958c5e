use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nalgebra::Point3;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use drudge::adapter::{BlockPos, GameAdapter, SessionEvent};
use drudge::commands::{stop_all, CommandDispatcher};
use drudge::config::{BotConfig, DisconnectPolicy};
use drudge::runner::QueueRunner;
use drudge::sim::{PlannerScript, SimAdapter};
use drudge::store::QueueStore;
use drudge::ticks::TickRegistry;
use drudge::AgentContext;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = Arc::new(BotConfig::parse());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drudge=info")),
        )
        .init();

    info!(
        host = %config.host,
        port = config.port,
        username = %config.username,
        "starting agent"
    );

    let mut reconnect_delay = Duration::from_secs(5);
    loop {
        run_session(Arc::clone(&config)).await;

        match config.on_disconnect {
            DisconnectPolicy::Exit => {
                info!("session ended, exiting");
                break;
            }
            DisconnectPolicy::Reconnect => {
                warn!(delay = ?reconnect_delay, "session ended, reconnecting");
                tokio::time::sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(Duration::from_secs(300));
            }
        }
    }
}

/// Run one full session against the built-in simulated world. Chat arrives
/// on stdin as `sender: message` lines (bare lines count as the console).
async fn run_session(config: Arc<BotConfig>) {
    let adapter = Arc::new(demo_world());

    let mut store = QueueStore::load(config.state_file_path());
    store.bootstrap();
    info!(path = %store.path().display(), "queue store ready");

    let ctx = AgentContext {
        config,
        adapter: Arc::clone(&adapter),
        store: store.into_shared(),
        ticks: Arc::new(TickRegistry::new()),
    };

    let dispatcher = CommandDispatcher::new(ctx.clone());
    let chat_pump = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let (sender, text) = match line.split_once(": ") {
                Some((name, text)) => (name.to_string(), text.to_string()),
                None => ("console".to_string(), line),
            };
            dispatcher.dispatch(&sender, &text);
        }
    });

    let events = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            loop {
                while let Some(event) = ctx.adapter.next_event() {
                    match event {
                        SessionEvent::Joined => info!("joined"),
                        SessionEvent::Disconnected { reason } => {
                            warn!(%reason, "disconnected");
                            // Cancel live tick loops so a parked infinite task
                            // releases the runner; the snapshot stays intact
                            // for resume.
                            ctx.ticks.cancel_all();
                            ctx.adapter.clear_goal();
                        }
                        SessionEvent::Kicked { reason } => {
                            warn!(%reason, "kicked");
                            ctx.ticks.cancel_all();
                            ctx.adapter.clear_goal();
                        }
                        SessionEvent::Error { message } => warn!(%message, "session error"),
                    }
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        })
    };

    let runner = QueueRunner::new(ctx.clone());
    tokio::select! {
        _ = runner.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping");
            stop_all(&ctx);
            adapter.disconnect("interrupted");
        }
    }

    chat_pump.abort();
    events.abort();
}

/// A small world so the agent has something to act on out of the box.
fn demo_world() -> SimAdapter {
    let sim = SimAdapter::new(PlannerScript::Arrive { travel_ms: 400 });
    sim.add_entity(1, "hostile", Point3::new(3.0, 1.6, -2.0));
    sim.add_entity(2, "hostile", Point3::new(-2.0, 1.6, -6.0));
    sim.add_player("Steve", Point3::new(8.0, 0.0, 8.0));
    sim.add_block(BlockPos::new(2, 1, 0), "lever");
    sim
}
