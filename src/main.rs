//! Playground Sync bot - a headless client that joins the playground.
//!
//! Connects to the relay selected by the environment, enters as a player,
//! says hello in chat and logs what it sees until interrupted.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use playground_sync::sync::transport::WsConnector;
use playground_sync::{ClientConfig, Command, CommandExecutor, Player, SyncContext, WorldState};

/// How often the bot logs a world summary
const SUMMARY_INTERVAL: Duration = Duration::from_secs(10);

fn log_summary(state: &WorldState) {
    let mut names: Vec<&str> = state.players.values().map(|p| p.name.as_str()).collect();
    names.sort_unstable();
    info!(
        "World: {} players [{}], {} structures, {} chat messages",
        state.players.len(),
        names.join(", "),
        state.structures.len(),
        state.messages.len()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playground_sync=info".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    info!(
        "Environment {:?}, relay endpoint {}",
        config.environment,
        config.endpoint()
    );

    let name = std::env::var("PLAYER_NAME").unwrap_or_else(|_| Player::random_name());
    let player = Player::create(name);
    let player_id = player.id.clone();

    let connector = Arc::new(WsConnector::new(config.reconnect_delay));
    let ctx = SyncContext::new(config);
    let executor = CommandExecutor::new(ctx.clone(), connector);

    executor.execute(Command::Initialize { player })?;
    executor.execute(Command::SendChatMessage {
        message: "Hello from the playground bot!".to_string(),
    })?;

    let mut connection_state = ctx.connection_state();
    let mut summary = tokio::time::interval(SUMMARY_INTERVAL);

    info!("Joined as {}, press Ctrl-C to leave", player_id);

    loop {
        tokio::select! {
            _ = summary.tick() => log_summary(&ctx.state()),

            changed = connection_state.changed() => {
                if changed.is_err() {
                    break;
                }
                info!("Connection {:?}", *connection_state.borrow_and_update());
            }

            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Shutting down");
                break;
            }
        }
    }

    executor.shutdown().await;
    Ok(())
}
