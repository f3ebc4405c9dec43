//! Shared handle to the current world snapshot.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::error;

use super::{reduce, Action, Player, ReduceError, WorldState};

/// The single mutable slot holding the current [`WorldState`].
///
/// Readers clone the inner `Arc` and keep a consistent snapshot for as long as
/// they hold it. Writers run the reducer under the write lock, so every
/// dispatch is atomic with respect to every other.
#[derive(Clone, Default)]
pub struct Store {
    state: Arc<RwLock<Arc<WorldState>>>,
}

impl Store {
    pub fn new(initial: WorldState) -> Self {
        Self {
            state: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<WorldState> {
        self.state.read().clone()
    }

    /// Run an action through the reducer and publish the result.
    ///
    /// On a precondition violation the state is left untouched.
    pub fn dispatch(&self, action: Action) -> Result<Arc<WorldState>, ReduceError> {
        let mut slot = self.state.write();
        match reduce(&slot, action) {
            Ok(next) => {
                *slot = next.clone();
                Ok(next)
            }
            Err(e) => {
                error!("Rejected action: {}", e);
                Err(e)
            }
        }
    }

    pub fn local_player_id(&self) -> Option<String> {
        self.state.read().local_player_id.clone()
    }

    pub fn local_player(&self) -> Option<Arc<Player>> {
        self.state.read().local_player().cloned()
    }

    pub fn player(&self, player_id: &str) -> Option<Arc<Player>> {
        self.state.read().player(player_id).cloned()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Store")
            .field("players", &state.players.len())
            .field("structures", &state.structures.len())
            .field("local_player_id", &state.local_player_id)
            .finish()
    }
}
