//! Shared world model mirrored by every client.
//!
//! This module holds the data the relay keeps in sync between clients:
//! - Players (avatars with key states, aim target and visible chat bubbles)
//! - Structures (extruded polygons placed in the world)
//! - The in-progress polygon of the local drawing tool
//! - The global chat log
//!
//! State is never mutated in place. Every change goes through [`reducer::reduce`],
//! which returns a new [`WorldState`] sharing all untouched branches with the
//! previous snapshot.

pub mod action;
pub mod player;
pub mod polygon;
pub mod reducer;
pub mod store;
pub mod structure;

pub use action::Action;
pub use player::{Message, Player};
pub use reducer::{reduce, ReduceError};
pub use store::Store;
pub use structure::{ExtrusionParams, Structure};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Unique identifier for a player
pub type PlayerId = String;

/// Unique identifier for a structure
pub type StructureId = String;

/// Grid cell size used when no configuration overrides it
pub const BASE_CELL_SIZE: f64 = 10.0;

/// Default tolerance for point equality
pub const POINT_EPSILON: f64 = 0.001;

/// Errors raised while constructing world entities
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("Polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),

    #[error("Structure normal has zero length")]
    DegenerateNormal,

    #[error("Point {index} lies {distance:.3} off the structure plane")]
    NotCoplanar { index: usize, distance: f64 },
}

/// A point or direction in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(self) -> Option<Vec3> {
        let len = self.length();
        if len <= f64::EPSILON {
            None
        } else {
            Some(self.scale(1.0 / len))
        }
    }

    /// Euclidean distance below `threshold`
    pub fn approx_eq(self, other: Vec3, threshold: f64) -> bool {
        self.sub(other).length() < threshold
    }
}

/// Root of the mirrored world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    #[serde(default)]
    pub players: Arc<HashMap<PlayerId, Arc<Player>>>,
    #[serde(default)]
    pub structures: Arc<HashMap<StructureId, Arc<Structure>>>,
    /// Vertices of the polygon currently being drawn by the local player
    #[serde(default)]
    pub partial_points: Arc<Vec<Vec3>>,
    /// Global chat log, never pruned
    #[serde(default)]
    pub messages: Arc<Vec<Message>>,
    /// Which player entry is this client's own avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_player_id: Option<PlayerId>,
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
}

fn default_cell_size() -> f64 {
    BASE_CELL_SIZE
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(BASE_CELL_SIZE)
    }
}

impl WorldState {
    pub fn new(cell_size: f64) -> Self {
        Self {
            players: Arc::default(),
            structures: Arc::default(),
            partial_points: Arc::default(),
            messages: Arc::default(),
            local_player_id: None,
            cell_size,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Arc<Player>> {
        self.players.get(player_id)
    }

    pub fn structure(&self, structure_id: &str) -> Option<&Arc<Structure>> {
        self.structures.get(structure_id)
    }

    /// The local client's own avatar, once initialized
    pub fn local_player(&self) -> Option<&Arc<Player>> {
        self.local_player_id
            .as_deref()
            .and_then(|id| self.players.get(id))
    }

    pub fn is_local(&self, player_id: &str) -> bool {
        self.local_player_id.as_deref() == Some(player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_math() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(a.cross(b), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(a.dot(b), 0.0);
        assert_eq!(Vec3::new(3.0, 4.0, 0.0).length(), 5.0);
        assert!(Vec3::zero().normalized().is_none());
    }

    #[test]
    fn test_approx_eq_threshold() {
        let a = Vec3::new(1.0, 1.0, 1.0);
        assert!(a.approx_eq(Vec3::new(1.0005, 1.0, 1.0), POINT_EPSILON));
        assert!(!a.approx_eq(Vec3::new(1.01, 1.0, 1.0), POINT_EPSILON));
    }

    #[test]
    fn test_world_state_deserialize_defaults() {
        let state: WorldState = serde_json::from_str("{}").unwrap();
        assert!(state.players.is_empty());
        assert!(state.local_player_id.is_none());
        assert_eq!(state.cell_size, BASE_CELL_SIZE);
    }

    #[test]
    fn test_local_player_lookup() {
        let mut state = WorldState::default();
        let player = Player::new("p1", "Alice");
        Arc::make_mut(&mut state.players).insert("p1".to_string(), Arc::new(player));
        assert!(state.local_player().is_none());

        state.local_player_id = Some("p1".to_string());
        assert_eq!(state.local_player().unwrap().name, "Alice");
        assert!(state.is_local("p1"));
        assert!(!state.is_local("p2"));
    }
}
