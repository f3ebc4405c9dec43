//! Connection lifecycle and inbound routing.
//!
//! One task per connection owns the transport, the outbound queue and the
//! inbound loop. It ends when the transport finishes or the
//! [`ConnectionHandle`] is closed (or dropped).

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::context::SyncContext;
use super::protocol::{Event, EventCodec};
use super::reconcile;
use super::transport::{Connector, Transport, TransportSignal};
use super::{SyncError, SyncResult};
use crate::world::{Action, Message, Player};

/// Where the link to the relay stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The link dropped and the transport is trying to restore it
    Reconnecting,
}

/// Opens connections to the relay
pub struct ConnectionManager;

impl ConnectionManager {
    /// Spawn the connection task for the configured endpoint
    pub fn open(ctx: Arc<SyncContext>, connector: Arc<dyn Connector>) -> ConnectionHandle {
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(run_connection(ctx, connector, close_rx));
        ConnectionHandle {
            close_tx: Some(close_tx),
            task,
        }
    }
}

/// Owner of a running connection task
pub struct ConnectionHandle {
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Close the transport and wait for the task to finish
    pub async fn close(self) {
        let ConnectionHandle { close_tx, task } = self;
        if let Some(tx) = close_tx {
            let _ = tx.send(());
        }
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                error!("Connection task failed: {}", e);
            }
        }
    }

    /// Stop the task without closing the transport
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run_connection(
    ctx: Arc<SyncContext>,
    connector: Arc<dyn Connector>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let endpoint = ctx.config().endpoint().to_string();
    ctx.set_connection_state(ConnectionState::Connecting);
    info!("Connecting to relay at {}", endpoint);

    let Some(mut transport) =
        connect_with_retry(&ctx, connector.as_ref(), &endpoint, &mut close_rx).await
    else {
        ctx.set_connection_state(ConnectionState::Disconnected);
        return;
    };

    let Some(mut outbound) = ctx.take_outbound() else {
        error!("Another connection already owns the outbound queue");
        let _ = transport.close().await;
        ctx.set_connection_state(ConnectionState::Disconnected);
        return;
    };

    if let Err(e) = send_enter_request(&ctx, transport.as_mut()).await {
        warn!("Failed to send player_enter_request: {}", e);
    }
    ctx.set_connection_state(ConnectionState::Connected);

    // Outbound events wait in the queue while the link is down
    let mut connected = true;

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                info!("Closing connection to {}", endpoint);
                break;
            }

            Some(event) = outbound.recv(), if connected => {
                if let Err(e) = send_event(transport.as_mut(), &event).await {
                    warn!("Failed to send {}: {}", event.type_name(), e);
                }
            }

            signal = transport.recv() => match signal {
                Some(TransportSignal::Message(text)) => {
                    let event = match EventCodec::decode(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("Dropping frame from relay: {}", e);
                            continue;
                        }
                    };
                    if let Some(reply) = route_inbound(&ctx, event) {
                        if let Err(e) = send_event(transport.as_mut(), &reply).await {
                            warn!("Failed to send {}: {}", reply.type_name(), e);
                        }
                    }
                }

                Some(TransportSignal::Disconnected { reason }) => {
                    warn!(
                        "Lost connection to relay: {}",
                        reason.as_deref().unwrap_or("no reason given")
                    );
                    connected = false;
                    ctx.set_connection_state(ConnectionState::Reconnecting);
                    if let Some(player) = ctx.store().local_player() {
                        route_inbound(&ctx, Event::PlayerExit { player: (*player).clone() });
                    }
                }

                Some(TransportSignal::Reconnected) => {
                    info!("Reconnected to relay, re-entering");
                    if let Err(e) = send_enter_request(&ctx, transport.as_mut()).await {
                        warn!("Failed to send player_enter_request: {}", e);
                    }
                    connected = true;
                    ctx.set_connection_state(ConnectionState::Connected);
                }

                None => {
                    info!("Transport to {} finished", endpoint);
                    break;
                }
            },
        }
    }

    if let Err(e) = transport.close().await {
        debug!("Transport close failed: {}", e);
    }
    ctx.restore_outbound(outbound);
    ctx.set_connection_state(ConnectionState::Disconnected);
}

/// Connect, retrying every `reconnect_delay` until it works or the handle
/// closes
async fn connect_with_retry(
    ctx: &SyncContext,
    connector: &dyn Connector,
    endpoint: &str,
    close_rx: &mut oneshot::Receiver<()>,
) -> Option<Box<dyn Transport>> {
    let delay = ctx.config().reconnect_delay;
    let mut attempt: u32 = 1;

    loop {
        tokio::select! {
            _ = &mut *close_rx => {
                info!("Gave up connecting to {}", endpoint);
                return None;
            }
            result = connector.connect(endpoint) => match result {
                Ok(transport) => return Some(transport),
                Err(e) => error!(
                    "Failed to connect to {} (attempt {}), retrying in {:?}: {}",
                    endpoint, attempt, delay, e
                ),
            },
        }

        tokio::select! {
            _ = &mut *close_rx => {
                info!("Gave up connecting to {}", endpoint);
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

async fn send_event(transport: &mut dyn Transport, event: &Event) -> SyncResult<()> {
    let text = EventCodec::encode(event)?;
    transport.send(text).await?;
    debug!("Sent {}", event.type_name());
    Ok(())
}

async fn send_enter_request(ctx: &SyncContext, transport: &mut dyn Transport) -> SyncResult<()> {
    let player = ctx.store().local_player().ok_or(SyncError::NotInitialized)?;
    let request = Event::PlayerEnterRequest {
        player: (*player).clone(),
    };
    send_event(transport, &request).await
}

fn apply(ctx: &SyncContext, action: Action) -> SyncResult<()> {
    ctx.dispatch(action)?;
    Ok(())
}

/// Upsert a whole player record and re-arm timers for the bubbles it carries
fn upsert_player(ctx: &SyncContext, player: Player) -> SyncResult<()> {
    ctx.dispatch(Action::UpdatePlayer(player.clone()))?;
    ctx.evictions().resync_player(&player);
    Ok(())
}

/// Apply one event received from the relay.
///
/// Events originating from the local player are not applied again, except
/// chat, which is only ever shown on echo, and an own `player_enter` arriving
/// while the local record is missing. Returns the event to send back, if the
/// relay asked for one.
pub fn route_inbound(ctx: &SyncContext, event: Event) -> Option<Event> {
    let event_type = event.type_name();
    if !event.is_inbound() {
        warn!("Dropping outbound-only event {} received from relay", event_type);
        return None;
    }

    let local_id = ctx.store().local_player_id();
    let is_local = |player_id: &str| local_id.as_deref() == Some(player_id);
    if event.player_id().is_some_and(is_local)
        && !matches!(
            event,
            Event::PlayerEnter { .. } | Event::PlayerExit { .. } | Event::ChatMessage { .. }
        )
    {
        debug!("Ignoring own {} echo", event_type);
        return None;
    }

    let result = match event {
        Event::PlayerEnter { player } if is_local(&player.id) => {
            if ctx.store().local_player().is_some() {
                debug!("Ignoring own player_enter echo");
                Ok(())
            } else {
                warn!("Local player {} missing, restoring it from player_enter", player.id);
                upsert_player(ctx, player)
            }
        }

        Event::PlayerEnter { player } => {
            info!("Player {} ({}) entered", player.id, player.name);
            upsert_player(ctx, player)
        }

        Event::PlayerExit { player } if is_local(&player.id) => {
            ctx.clear_local_side_effects();
            Ok(())
        }

        Event::PlayerExit { player } => {
            info!("Player {} ({}) exited", player.id, player.name);
            let cancelled = ctx.evictions().cancel_player(&player.id);
            debug!("Cancelled {} evictions for {}", cancelled, player.id);
            apply(ctx, Action::RemovePlayer { player_id: player.id })
        }

        Event::FullStateRequest => {
            debug!("Relay requested full state");
            return Some(reconcile::full_state_response(ctx));
        }

        Event::FullStateUpdate { state } => reconcile::adopt_full_state(ctx, state),

        Event::InputKeyDown { player_id, key } => apply(
            ctx,
            Action::UpdatePlayerKeyState {
                player_id,
                key,
                pressed: true,
            },
        ),

        Event::InputKeyUp { player_id, key } => apply(
            ctx,
            Action::UpdatePlayerKeyState {
                player_id,
                key,
                pressed: false,
            },
        ),

        Event::PlayerTargetChange { player_id, target } => {
            apply(ctx, Action::UpdatePlayerTarget { player_id, target })
        }

        Event::ChatMessage {
            player_id,
            message,
            time,
        } => ctx.show_message(Message {
            message,
            player_id,
            time,
        }),

        Event::UpdateStructure { structure, .. } => apply(ctx, Action::UpdateStructure(structure)),

        Event::UpdatePlayer { player } => upsert_player(ctx, player),

        Event::PlayerEnterRequest { .. } | Event::FullStateResponse { .. } => Ok(()),
    };

    if let Err(e) = result {
        warn!("Failed to apply {}: {}", event_type, e);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::sync::transport::{memory_pair, MemoryConnector, RelayHandle, TransportError};
    use crate::world::{Structure, Vec3, WorldState};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Refuses the first `failures` attempts, then hands out its transport
    struct FlakyConnector {
        failures: AtomicUsize,
        attempts: AtomicUsize,
        inner: MemoryConnector,
    }

    impl FlakyConnector {
        fn new(failures: usize, inner: MemoryConnector) -> Self {
            Self {
                failures: AtomicUsize::new(failures),
                attempts: AtomicUsize::new(0),
                inner,
            }
        }
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let refused = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            self.inner.connect(endpoint).await
        }
    }

    fn initialized_context() -> Arc<SyncContext> {
        let ctx = SyncContext::new(ClientConfig::default().with_relay_url("mem://relay"));
        ctx.dispatch(Action::UpdateLocalPlayer {
            player_id: "A".to_string(),
            player: Player::new("A", "Alice"),
        })
        .unwrap();
        ctx
    }

    async fn wait_for_state(ctx: &SyncContext, state: ConnectionState) {
        let mut rx = ctx.connection_state();
        rx.wait_for(|s| *s == state).await.unwrap();
    }

    /// Open a connection and consume the enter request
    async fn connected(ctx: &Arc<SyncContext>) -> (ConnectionHandle, RelayHandle) {
        let (transport, mut relay) = memory_pair();
        let handle = ConnectionManager::open(ctx.clone(), Arc::new(MemoryConnector::new(transport)));
        match relay.next_event().await {
            Some(Event::PlayerEnterRequest { player }) => assert_eq!(player.id, "A"),
            other => panic!("Expected player_enter_request, got {:?}", other),
        }
        wait_for_state(ctx, ConnectionState::Connected).await;
        (handle, relay)
    }

    /// Every frame sent before this one has been routed once it returns
    async fn sync_point(relay: &mut RelayHandle) {
        relay.send_event(&Event::FullStateRequest).unwrap();
        match relay.next_event().await {
            Some(Event::FullStateResponse { .. }) => {}
            other => panic!("Expected full_state_response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_sends_enter_request_before_queued_events() {
        let ctx = initialized_context();
        ctx.send(Event::UpdatePlayer {
            player: Player::new("A", "Alice"),
        })
        .unwrap();

        let (handle, mut relay) = connected(&ctx).await;
        assert_eq!(
            relay.next_event().await.map(|e| e.type_name()),
            Some("update_player")
        );
        assert_eq!(ctx.current_connection_state(), ConnectionState::Connected);

        handle.close().await;
    }

    #[tokio::test]
    async fn test_close_while_connect_keeps_failing() {
        let ctx = initialized_context();
        let (transport, _relay) = memory_pair();
        let connector = Arc::new(MemoryConnector::new(transport));
        connector.connect("mem://relay").await.unwrap();

        let handle = ConnectionManager::open(ctx.clone(), connector);
        handle.close().await;

        assert_eq!(ctx.current_connection_state(), ConnectionState::Disconnected);
        assert!(ctx.take_outbound().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_connect_is_retried() {
        let ctx = SyncContext::new(
            ClientConfig::default()
                .with_relay_url("mem://relay")
                .with_reconnect_delay(Duration::from_millis(1000)),
        );
        ctx.dispatch(Action::UpdateLocalPlayer {
            player_id: "A".to_string(),
            player: Player::new("A", "Alice"),
        })
        .unwrap();

        let (transport, mut relay) = memory_pair();
        let connector = Arc::new(FlakyConnector::new(3, MemoryConnector::new(transport)));
        let start = tokio::time::Instant::now();
        let handle = ConnectionManager::open(ctx.clone(), connector.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(ctx.current_connection_state(), ConnectionState::Connecting);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

        match relay.next_event().await {
            Some(Event::PlayerEnterRequest { player }) => assert_eq!(player.id, "A"),
            other => panic!("Expected player_enter_request, got {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 4);
        wait_for_state(&ctx, ConnectionState::Connected).await;

        handle.close().await;
    }

    #[tokio::test]
    async fn test_remote_player_lifecycle() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;

        let bob = Player::new("B", "Bob");
        relay
            .send_event(&Event::PlayerEnter { player: bob.clone() })
            .unwrap();
        relay
            .send_event(&Event::InputKeyDown {
                player_id: "B".to_string(),
                key: "w".to_string(),
            })
            .unwrap();
        sync_point(&mut relay).await;
        assert!(ctx.store().player("B").unwrap().is_pressed("w"));

        relay.send_event(&Event::PlayerExit { player: bob }).unwrap();
        sync_point(&mut relay).await;
        assert!(ctx.store().player("B").is_none());

        // A late eviction for the departed player is a no-op
        ctx.dispatch(Action::RemoveOldestPlayerMessage {
            player_id: "B".to_string(),
        })
        .unwrap();
        assert!(ctx.store().player("B").is_none());

        handle.close().await;
    }

    #[tokio::test]
    async fn test_own_echoes_are_ignored() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;

        relay
            .send_event(&Event::InputKeyDown {
                player_id: "A".to_string(),
                key: "w".to_string(),
            })
            .unwrap();
        relay
            .send_event(&Event::UpdatePlayer {
                player: Player::new("A", "Mallory"),
            })
            .unwrap();
        relay
            .send_event(&Event::PlayerEnter {
                player: Player::new("A", "Mallory"),
            })
            .unwrap();
        relay
            .send_event(&Event::PlayerTargetChange {
                player_id: "A".to_string(),
                target: Vec3::new(1.0, 2.0, 3.0),
            })
            .unwrap();
        sync_point(&mut relay).await;

        let local = ctx.store().local_player().unwrap();
        assert!(!local.is_pressed("w"));
        assert_eq!(local.name, "Alice");
        assert_eq!(local.target, Vec3::zero());

        handle.close().await;
    }

    #[tokio::test]
    async fn test_own_chat_echo_is_shown() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;

        relay
            .send_event(&Event::chat(Message::new("A", "hello")))
            .unwrap();
        sync_point(&mut relay).await;

        let local = ctx.store().local_player().unwrap();
        assert_eq!(local.visible_messages.len(), 1);
        assert_eq!(ctx.state().messages.len(), 1);
        assert_eq!(ctx.evictions().pending_for("A"), 1);

        handle.close().await;
    }

    #[tokio::test]
    async fn test_remote_structure_applied() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;

        let structure = Structure::new(
            "B",
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            Vec3::new(0.0, 1.0, 0.0),
        )
        .unwrap()
        .with_id("s1");
        relay
            .send_event(&Event::UpdateStructure {
                player_id: "B".to_string(),
                structure,
            })
            .unwrap();
        sync_point(&mut relay).await;

        assert_eq!(ctx.state().structure("s1").unwrap().owner_id, "B");
        handle.close().await;
    }

    #[tokio::test]
    async fn test_full_state_update_keeps_identity() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;

        let mut pushed = WorldState::default();
        Arc::make_mut(&mut pushed.players)
            .insert("B".to_string(), Arc::new(Player::new("B", "Bob")));
        relay
            .send_event(&Event::FullStateUpdate { state: pushed })
            .unwrap();
        sync_point(&mut relay).await;

        let state = ctx.state();
        assert_eq!(state.local_player_id.as_deref(), Some("A"));
        assert!(state.player("B").is_some());

        handle.close().await;
    }

    #[tokio::test]
    async fn test_full_state_request_answered_with_current_state() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;

        relay.send_event(&Event::FullStateRequest).unwrap();
        match relay.next_event().await {
            Some(Event::FullStateResponse { state }) => {
                assert!(state.player("A").is_some());
                assert_eq!(state.local_player_id.as_deref(), Some("A"));
            }
            other => panic!("Expected full_state_response, got {:?}", other),
        }

        handle.close().await;
    }

    #[tokio::test]
    async fn test_invalid_frames_are_dropped() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;
        let before = ctx.state();

        relay.send_raw("not json");
        relay.send_raw(r#"{"type":"input_mouse_move","playerId":"B"}"#);
        relay.send_raw(r#"{"type":"input_key_down","key":"w"}"#);
        relay
            .send_event(&Event::PlayerEnterRequest {
                player: Player::new("B", "Bob"),
            })
            .unwrap();
        sync_point(&mut relay).await;

        assert_eq!(*ctx.state(), *before);
        assert_eq!(ctx.current_connection_state(), ConnectionState::Connected);
        handle.close().await;
    }

    #[tokio::test]
    async fn test_disconnect_keeps_local_player_and_reconnect_reenters() {
        let ctx = initialized_context();
        let (handle, mut relay) = connected(&ctx).await;
        ctx.show_message(Message::new("A", "brb")).unwrap();

        relay.disconnect(Some("relay restart"));
        wait_for_state(&ctx, ConnectionState::Reconnecting).await;

        let local = ctx.store().local_player().unwrap();
        assert_eq!(local.name, "Alice");
        assert!(local.visible_messages.is_empty());
        assert_eq!(ctx.evictions().pending_for("A"), 0);

        // Queued while down, flushed after the enter request
        ctx.send(Event::UpdatePlayer {
            player: (*local).clone(),
        })
        .unwrap();
        assert!(relay.try_next_event().is_none());

        relay.reconnect();
        match relay.next_event().await {
            Some(Event::PlayerEnterRequest { player }) => assert_eq!(player.id, "A"),
            other => panic!("Expected player_enter_request, got {:?}", other),
        }
        assert_eq!(
            relay.next_event().await.map(|e| e.type_name()),
            Some("update_player")
        );
        wait_for_state(&ctx, ConnectionState::Connected).await;

        handle.close().await;
    }

    #[tokio::test]
    async fn test_close_releases_outbound_queue() {
        let ctx = initialized_context();
        let (handle, _relay) = connected(&ctx).await;

        handle.close().await;
        assert_eq!(ctx.current_connection_state(), ConnectionState::Disconnected);
        assert!(ctx.take_outbound().is_some());
    }

    #[tokio::test]
    async fn test_transport_end_disconnects() {
        let ctx = initialized_context();
        let (handle, relay) = connected(&ctx).await;

        drop(relay);
        wait_for_state(&ctx, ConnectionState::Disconnected).await;
        handle.close().await;
    }

    #[tokio::test]
    async fn test_route_remote_exit_cancels_evictions() {
        let ctx = initialized_context();
        route_inbound(
            &ctx,
            Event::PlayerEnter {
                player: Player::new("B", "Bob"),
            },
        );
        route_inbound(&ctx, Event::chat(Message::new("B", "hi")));
        assert_eq!(ctx.evictions().pending_for("B"), 1);

        route_inbound(
            &ctx,
            Event::PlayerExit {
                player: Player::new("B", "Bob"),
            },
        );
        assert_eq!(ctx.evictions().pending_for("B"), 0);
        assert!(ctx.store().player("B").is_none());
    }

    #[tokio::test]
    async fn test_own_enter_restores_missing_local_player() {
        let ctx = initialized_context();

        // A relay-side bug drops the local record without clearing our identity
        ctx.dispatch(Action::RemovePlayer {
            player_id: "A".to_string(),
        })
        .unwrap();
        assert!(ctx.store().local_player().is_none());

        route_inbound(
            &ctx,
            Event::PlayerEnter {
                player: Player::new("A", "Alice"),
            },
        );
        assert_eq!(ctx.store().local_player().unwrap().name, "Alice");
        tokio_test::assert_ok!(reconcile::broadcast_local_player(&ctx));
    }

    #[tokio::test]
    async fn test_full_state_without_local_player_keeps_it() {
        let ctx = initialized_context();
        let mut pushed = WorldState::default();
        Arc::make_mut(&mut pushed.players)
            .insert("B".to_string(), Arc::new(Player::new("B", "Bob")));

        route_inbound(&ctx, Event::FullStateUpdate { state: pushed });
        route_inbound(
            &ctx,
            Event::PlayerEnter {
                player: Player::new("A", "Mallory"),
            },
        );

        let local = ctx.store().local_player().unwrap();
        assert_eq!(local.name, "Alice");
        assert!(ctx.store().player("B").is_some());
        tokio_test::assert_ok!(reconcile::broadcast_local_player(&ctx));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bubbles_in_upserted_records_expire() {
        let ctx = initialized_context();
        let mut bob = Player::new("B", "Bob");
        bob.visible_messages.push(Message::new("B", "hi all"));

        route_inbound(&ctx, Event::PlayerEnter { player: bob.clone() });
        assert_eq!(ctx.evictions().pending_for("B"), 1);

        // A heartbeat carrying the same bubble replaces the timer
        route_inbound(&ctx, Event::UpdatePlayer { player: bob });
        assert_eq!(ctx.evictions().pending_for("B"), 1);

        tokio::time::sleep(Duration::from_millis(5001)).await;
        assert!(ctx.store().player("B").unwrap().visible_messages.is_empty());
        assert_eq!(ctx.evictions().tracked_players(), 0);
    }

    #[test]
    fn test_route_outbound_only_event_is_dropped() {
        let ctx = initialized_context();
        let reply = route_inbound(
            &ctx,
            Event::FullStateResponse {
                state: WorldState::default(),
            },
        );
        assert!(reply.is_none());
        assert_eq!(ctx.state().players.len(), 1);
    }
}
