//! Scheduled removal of chat bubbles.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::world::{Action, Message, Player, PlayerId, Store};

/// How long every bubble stays visible
pub const BASE_MESSAGE_LIFETIME: Duration = Duration::from_millis(5000);

/// Extra visibility per full 100 characters
pub const LIFETIME_PER_100_CHARS: Duration = Duration::from_millis(1000);

/// Visibility time of a message: 5s plus 1s per full 100 characters
pub fn message_lifetime(message: &Message) -> Duration {
    let hundreds = (message.char_len() / 100) as u32;
    BASE_MESSAGE_LIFETIME + LIFETIME_PER_100_CHARS * hundreds
}

/// Visibility time a message has left, judged by its timestamp.
///
/// Timestamps in the future count as just sent.
pub fn remaining_lifetime(message: &Message) -> Duration {
    let age = (Utc::now() - message.time).to_std().unwrap_or(Duration::ZERO);
    message_lifetime(message).saturating_sub(age)
}

struct PendingEviction {
    id: u64,
    handle: AbortHandle,
}

/// Runs one delayed `remove_oldest_player_message` per displayed message.
///
/// Timers firing after their player left are harmless: the reducer ignores
/// evictions for unknown players.
pub struct EvictionScheduler {
    store: Store,
    pending: Arc<DashMap<PlayerId, Vec<PendingEviction>>>,
    next_id: AtomicU64,
}

impl EvictionScheduler {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            pending: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Schedule eviction of a message that was just shown.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, message: &Message) -> Duration {
        let delay = message_lifetime(message);
        self.schedule_in(&message.player_id, delay);
        delay
    }

    /// Replace a player's timers with one per bubble in its record.
    ///
    /// Used when a whole player record arrives from the relay, since its
    /// bubbles were never scheduled here. Each bubble keeps whatever lifetime
    /// its timestamp leaves it.
    pub fn resync_player(&self, player: &Player) -> usize {
        self.cancel_player(&player.id);
        for message in &player.visible_messages {
            self.schedule_in(&player.id, remaining_lifetime(message));
        }
        player.visible_messages.len()
    }

    fn schedule_in(&self, player_id: &str, delay: Duration) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let store = self.store.clone();
        let pending = Arc::clone(&self.pending);

        // The entry stays locked until the handle is stored, so a timer that
        // fires right away still finds itself to remove
        let mut evictions = self.pending.entry(player_id.to_string()).or_default();
        let task = tokio::spawn({
            let player_id = player_id.to_string();
            async move {
                tokio::time::sleep(delay).await;
                let _ = store.dispatch(Action::RemoveOldestPlayerMessage {
                    player_id: player_id.clone(),
                });
                pending.remove_if_mut(&player_id, |_, evictions| {
                    evictions.retain(|e| e.id != id);
                    evictions.is_empty()
                });
            }
        });
        evictions.push(PendingEviction {
            id,
            handle: task.abort_handle(),
        });

        debug!("Eviction of message from {} in {:?}", player_id, delay);
    }

    /// Abort a player's pending evictions; returns how many were still pending
    pub fn cancel_player(&self, player_id: &str) -> usize {
        let Some((_, evictions)) = self.pending.remove(player_id) else {
            return 0;
        };

        let mut cancelled = 0;
        for eviction in evictions {
            if !eviction.handle.is_finished() {
                eviction.handle.abort();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Evict a player's pending bubbles now instead of waiting for their timers
    pub fn flush_player(&self, player_id: &str) -> usize {
        let flushed = self.cancel_player(player_id);
        for _ in 0..flushed {
            let _ = self.store.dispatch(Action::RemoveOldestPlayerMessage {
                player_id: player_id.to_string(),
            });
        }
        flushed
    }

    pub fn cancel_all(&self) {
        let players: Vec<PlayerId> = self.pending.iter().map(|e| e.key().clone()).collect();
        for player_id in players {
            self.cancel_player(&player_id);
        }
    }

    /// Number of evictions still waiting for a player
    pub fn pending_for(&self, player_id: &str) -> usize {
        self.pending
            .get(player_id)
            .map(|evictions| {
                evictions
                    .iter()
                    .filter(|e| !e.handle.is_finished())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Number of players with at least one eviction outstanding
    pub fn tracked_players(&self) -> usize {
        self.pending.len()
    }
}
