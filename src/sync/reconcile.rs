//! Drift correction between this client and its peers.
//!
//! Two mechanisms, both last-write-wins:
//! - Full-state pull/push: the relay may ask this client to publish its whole
//!   state (first joiner bootstrap) or push a whole state to adopt.
//! - Heartbeat: the local player record is re-broadcast on a fixed interval,
//!   so missed key or target events heal without sequence numbers.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::connection::ConnectionState;
use super::context::SyncContext;
use super::protocol::Event;
use super::{SyncError, SyncResult};
use crate::world::{Action, WorldState};

/// Answer to a `full_state_request`: everything this client knows
pub fn full_state_response(ctx: &SyncContext) -> Event {
    let state = WorldState::clone(&ctx.state());
    Event::FullStateResponse { state }
}

/// Adopt a state pushed by the relay, keeping this client's identity.
///
/// The local player record survives a pushed state that lacks it. Bubble
/// timers are rebuilt from the adopted records.
pub fn adopt_full_state(ctx: &SyncContext, mut state: WorldState) -> SyncResult<()> {
    info!(
        "Adopting full state: {} players, {} structures",
        state.players.len(),
        state.structures.len()
    );

    if let Some(local) = ctx.store().local_player() {
        if !state.players.contains_key(&local.id) {
            debug!("Pushed state lacks local player {}, keeping it", local.id);
            Arc::make_mut(&mut state.players).insert(local.id.clone(), local);
        }
    }

    ctx.evictions().cancel_all();
    let adopted = ctx.dispatch(Action::ReplaceState(state))?;
    for player in adopted.players.values() {
        ctx.evictions().resync_player(player);
    }
    Ok(())
}

/// Re-dispatch the local player record and broadcast it
pub fn broadcast_local_player(ctx: &SyncContext) -> SyncResult<()> {
    let player = ctx.store().local_player().ok_or(SyncError::NotInitialized)?;
    let player = (*player).clone();
    ctx.dispatch(Action::UpdatePlayer(player.clone()))?;
    ctx.send(Event::UpdatePlayer { player })
}

/// Start the heartbeat. It runs until the context shuts down and only sends
/// while connected.
pub fn spawn_heartbeat(ctx: Arc<SyncContext>) -> JoinHandle<()> {
    let period = ctx.config().heartbeat_interval;
    let mut shutdown = ctx.shutdown_receiver();

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if ctx.current_connection_state() != ConnectionState::Connected {
                        debug!("Heartbeat skipped: not connected");
                        continue;
                    }
                    match broadcast_local_player(&ctx) {
                        Ok(()) => debug!("Heartbeat sent"),
                        Err(SyncError::ConnectionClosed) => {
                            warn!("Heartbeat stopping: outbound queue closed");
                            break;
                        }
                        Err(e) => warn!("Heartbeat skipped: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Heartbeat shutting down");
                    break;
                }
            }
        }
    })
}
