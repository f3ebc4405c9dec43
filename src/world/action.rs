//! Actions accepted by the reducer.

use super::{Message, Player, PlayerId, Structure, Vec3, WorldState};

/// Every way the world state can change
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Upsert a player by id
    UpdatePlayer(Player),
    /// Delete a player; no-op if absent
    RemovePlayer { player_id: PlayerId },
    /// Mark which player is this client and upsert it (once, at initialization)
    UpdateLocalPlayer { player_id: PlayerId, player: Player },
    /// Upsert a structure by id, replacing the whole record
    UpdateStructure(Structure),
    /// Replace the root state, keeping the current local player id
    ReplaceState(WorldState),
    UpdatePlayerKeyState {
        player_id: PlayerId,
        key: String,
        pressed: bool,
    },
    AddPlayerMessage { player_id: PlayerId, message: Message },
    RemoveOldestPlayerMessage { player_id: PlayerId },
    UpdatePlayerTarget { player_id: PlayerId, target: Vec3 },
    UpdatePartialPoints(Vec<Vec3>),
}

impl Action {
    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::UpdatePlayer(_) => "update_player",
            Action::RemovePlayer { .. } => "remove_player",
            Action::UpdateLocalPlayer { .. } => "update_local_player",
            Action::UpdateStructure(_) => "update_structure",
            Action::ReplaceState(_) => "replace_state",
            Action::UpdatePlayerKeyState { .. } => "update_player_key_state",
            Action::AddPlayerMessage { .. } => "add_player_message",
            Action::RemoveOldestPlayerMessage { .. } => "remove_oldest_player_message",
            Action::UpdatePlayerTarget { .. } => "update_player_target",
            Action::UpdatePartialPoints(_) => "update_partial_points",
        }
    }

    /// Player the action addresses, for actions that must name one
    pub fn player_id(&self) -> Option<&str> {
        match self {
            Action::UpdatePlayer(player) => Some(&player.id),
            Action::RemovePlayer { player_id }
            | Action::UpdateLocalPlayer { player_id, .. }
            | Action::UpdatePlayerKeyState { player_id, .. }
            | Action::AddPlayerMessage { player_id, .. }
            | Action::RemoveOldestPlayerMessage { player_id }
            | Action::UpdatePlayerTarget { player_id, .. } => Some(player_id),
            Action::UpdateStructure(_) | Action::ReplaceState(_) | Action::UpdatePartialPoints(_) => {
                None
            }
        }
    }
}
