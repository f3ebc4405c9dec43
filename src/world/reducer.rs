//! Pure state transitions.
//!
//! [`reduce`] never mutates its input. Collections are copy-on-write through
//! `Arc::make_mut`, so only the branch an action touches is copied and every
//! other branch is shared with the previous snapshot.

use std::sync::Arc;
use tracing::debug;

use super::{Action, Player, WorldState};

/// Precondition violations raised by [`reduce`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReduceError {
    #[error("Action {action} requires a player id")]
    MissingPlayerId { action: &'static str },

    #[error("Action {action} names player {expected} but carries player {actual}")]
    PlayerIdMismatch {
        action: &'static str,
        expected: String,
        actual: String,
    },
}

/// Apply an action, producing the next state
pub fn reduce(state: &Arc<WorldState>, action: Action) -> Result<Arc<WorldState>, ReduceError> {
    let name = action.name();
    if action.player_id().is_some_and(str::is_empty) {
        return Err(ReduceError::MissingPlayerId { action: name });
    }

    let mut next = WorldState::clone(state);

    match action {
        Action::UpdatePlayer(player) => {
            Arc::make_mut(&mut next.players).insert(player.id.clone(), Arc::new(player));
        }

        Action::RemovePlayer { player_id } => {
            if next.players.contains_key(&player_id) {
                Arc::make_mut(&mut next.players).remove(&player_id);
            } else {
                debug!("remove_player: {} not present", player_id);
            }
        }

        Action::UpdateLocalPlayer { player_id, player } => {
            if player.id != player_id {
                return Err(ReduceError::PlayerIdMismatch {
                    action: name,
                    expected: player_id,
                    actual: player.id,
                });
            }
            Arc::make_mut(&mut next.players).insert(player_id.clone(), Arc::new(player));
            next.local_player_id = Some(player_id);
        }

        Action::UpdateStructure(structure) => {
            Arc::make_mut(&mut next.structures).insert(structure.id.clone(), Arc::new(structure));
        }

        Action::ReplaceState(mut replacement) => {
            replacement.local_player_id = state.local_player_id.clone();
            return Ok(Arc::new(replacement));
        }

        Action::UpdatePlayerKeyState {
            player_id,
            key,
            pressed,
        } => {
            modify_player(&mut next, &player_id, name, |player| {
                player.key_states.insert(key, pressed);
            });
        }

        Action::AddPlayerMessage { player_id, message } => {
            Arc::make_mut(&mut next.messages).push(message.clone());
            modify_player(&mut next, &player_id, name, |player| {
                player.visible_messages.push(message);
            });
        }

        Action::RemoveOldestPlayerMessage { player_id } => {
            let has_messages = next
                .players
                .get(&player_id)
                .is_some_and(|p| !p.visible_messages.is_empty());
            if has_messages {
                modify_player(&mut next, &player_id, name, |player| {
                    player.visible_messages.remove(0);
                });
            } else {
                debug!("{}: nothing to evict for {}", name, player_id);
            }
        }

        Action::UpdatePlayerTarget { player_id, target } => {
            modify_player(&mut next, &player_id, name, |player| {
                player.target = target;
            });
        }

        Action::UpdatePartialPoints(points) => {
            next.partial_points = Arc::new(points);
        }
    }

    Ok(Arc::new(next))
}

/// Copy one player out of the shared map, edit it and put it back.
/// Unknown players are left alone.
fn modify_player<F>(state: &mut WorldState, player_id: &str, action: &'static str, f: F)
where
    F: FnOnce(&mut Player),
{
    if !state.players.contains_key(player_id) {
        debug!("{}: unknown player {}", action, player_id);
        return;
    }
    if let Some(player) = Arc::make_mut(&mut state.players).get_mut(player_id) {
        f(Arc::make_mut(player));
    }
}
