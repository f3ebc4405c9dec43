//! The explicit context shared by every sync component.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::debug;

use super::connection::ConnectionState;
use super::protocol::Event;
use super::throttle::Throttle;
use super::timers::EvictionScheduler;
use super::{SyncError, SyncResult};
use crate::config::ClientConfig;
use crate::world::{Action, Message, ReduceError, Store, WorldState};

/// Everything one client session shares: store, outbound queue, timers and
/// connection status.
///
/// Built once at startup and handed to the connection manager, the executor
/// and the read path as an `Arc`.
pub struct SyncContext {
    config: ClientConfig,
    store: Store,
    outbound_tx: mpsc::UnboundedSender<Event>,
    /// Claimed by the connection task while it runs
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
    evictions: EvictionScheduler,
    target_throttle: Throttle<Event>,
    connection_state: watch::Sender<ConnectionState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncContext {
    pub fn new(config: ClientConfig) -> Arc<Self> {
        let store = Store::new(WorldState::new(config.cell_size));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = broadcast::channel(1);

        let throttle_tx = outbound_tx.clone();
        let target_throttle = Throttle::new(config.target_throttle, move |event: Event| {
            let _ = throttle_tx.send(event);
        });

        Arc::new(Self {
            evictions: EvictionScheduler::new(store.clone()),
            config,
            store,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            target_throttle,
            connection_state,
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Current world snapshot (the read path)
    pub fn state(&self) -> Arc<WorldState> {
        self.store.state()
    }

    /// Apply a purely local action, bypassing the executor
    pub fn dispatch(&self, action: Action) -> Result<Arc<WorldState>, ReduceError> {
        self.store.dispatch(action)
    }

    /// Queue an event for the relay.
    ///
    /// Events queued while no connection is running are sent once one is.
    pub fn send(&self, event: Event) -> SyncResult<()> {
        debug!("Queueing {}", event.type_name());
        self.outbound_tx
            .send(event)
            .map_err(|_| SyncError::ConnectionClosed)
    }

    /// Show a chat message: add it to the log and the player's bubbles and
    /// schedule the bubble's removal
    pub fn show_message(&self, message: Message) -> SyncResult<()> {
        self.store.dispatch(Action::AddPlayerMessage {
            player_id: message.player_id.clone(),
            message: message.clone(),
        })?;
        self.evictions.schedule(&message);
        Ok(())
    }

    /// Tear down side effects owned by the local player: pending bubble
    /// evictions run immediately and an unsent target change is dropped.
    pub fn clear_local_side_effects(&self) {
        let Some(local_id) = self.store.local_player_id() else {
            return;
        };
        let flushed = self.evictions.flush_player(&local_id);
        let dropped = self.target_throttle.cancel();
        debug!(
            "Cleared local side effects: {} evictions flushed, pending target dropped: {}",
            flushed, dropped
        );
    }

    pub fn evictions(&self) -> &EvictionScheduler {
        &self.evictions
    }

    pub fn target_throttle(&self) -> &Throttle<Event> {
        &self.target_throttle
    }

    /// Subscribe to connection state changes
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection_state.subscribe()
    }

    pub fn current_connection_state(&self) -> ConnectionState {
        *self.connection_state.borrow()
    }

    pub(crate) fn set_connection_state(&self, state: ConnectionState) {
        let previous = self.connection_state.send_replace(state);
        if previous != state {
            debug!("Connection state {:?} -> {:?}", previous, state);
        }
    }

    pub(crate) fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.outbound_rx.lock().take()
    }

    pub(crate) fn restore_outbound(&self, rx: mpsc::UnboundedReceiver<Event>) {
        *self.outbound_rx.lock() = Some(rx);
    }

    /// Get a shutdown receiver
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Stop background tasks and pending timers
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        self.evictions.cancel_all();
        self.target_throttle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Player;

    fn initialized_context() -> Arc<SyncContext> {
        let ctx = SyncContext::new(ClientConfig::default());
        ctx.dispatch(Action::UpdateLocalPlayer {
            player_id: "A".to_string(),
            player: Player::new("A", "Alice"),
        })
        .unwrap();
        ctx
    }

    #[test]
    fn test_context_starts_disconnected() {
        let ctx = SyncContext::new(ClientConfig::default().with_cell_size(4.0));
        assert_eq!(ctx.current_connection_state(), ConnectionState::Disconnected);
        assert_eq!(ctx.state().cell_size, 4.0);
        assert!(ctx.state().local_player_id.is_none());
    }

    #[test]
    fn test_send_queues_in_order() {
        let ctx = SyncContext::new(ClientConfig::default());
        ctx.send(Event::FullStateRequest).unwrap();
        ctx.send(Event::UpdatePlayer {
            player: Player::new("A", "Alice"),
        })
        .unwrap();

        let mut rx = ctx.take_outbound().unwrap();
        assert_eq!(rx.try_recv().unwrap(), Event::FullStateRequest);
        assert_eq!(rx.try_recv().unwrap().type_name(), "update_player");
        assert!(ctx.take_outbound().is_none());

        ctx.restore_outbound(rx);
        assert!(ctx.take_outbound().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_message_schedules_eviction() {
        let ctx = initialized_context();
        ctx.show_message(Message::new("A", "hi")).unwrap();
        assert_eq!(ctx.store().local_player().unwrap().visible_messages.len(), 1);
        assert_eq!(ctx.evictions().pending_for("A"), 1);

        tokio::time::sleep(std::time::Duration::from_millis(5001)).await;
        assert!(ctx.store().local_player().unwrap().visible_messages.is_empty());
        assert_eq!(ctx.state().messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_local_side_effects() {
        let ctx = initialized_context();
        ctx.show_message(Message::new("A", "bye")).unwrap();
        ctx.target_throttle().submit(Event::FullStateRequest);

        ctx.clear_local_side_effects();

        assert!(ctx.store().local_player().unwrap().visible_messages.is_empty());
        assert_eq!(ctx.evictions().pending_for("A"), 0);
        assert!(!ctx.target_throttle().has_pending());
        // The local player itself stays
        assert!(ctx.store().local_player().is_some());
    }
}
