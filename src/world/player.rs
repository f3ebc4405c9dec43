//! Player avatars and their chat bubbles.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{PlayerId, Vec3};

/// Number of selectable avatar skins
pub const PLAYER_SKIN_COUNT: u32 = 13;

/// Half-extent of the square new players spawn in
const SPAWN_EXTENT: f64 = 100.0;

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message: String,
    pub player_id: PlayerId,
    pub time: DateTime<Utc>,
}

impl Message {
    pub fn new(player_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            player_id: player_id.into(),
            time: Utc::now(),
        }
    }

    /// Length in characters, which drives how long the bubble stays visible
    pub fn char_len(&self) -> usize {
        self.message.chars().count()
    }
}

/// A connected player's avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Point the avatar is aiming at
    #[serde(default)]
    pub target: Vec3,
    /// Movement keys currently held, by wire key name
    #[serde(default)]
    pub key_states: BTreeMap<String, bool>,
    /// Chat bubbles currently shown above the avatar, oldest first
    #[serde(default)]
    pub visible_messages: Vec<Message>,
    #[serde(default, alias = "skindex")]
    pub skin_index: u32,
    #[serde(default)]
    pub y_rotation: f64,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: Vec3::zero(),
            target: Vec3::zero(),
            key_states: BTreeMap::new(),
            visible_messages: Vec::new(),
            skin_index: 0,
            y_rotation: 0.0,
        }
    }

    /// Create a fresh player with a random id and spawn position.
    ///
    /// The skin is derived from the name so the same name always gets the same look.
    pub fn create(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut rng = rand::thread_rng();
        let id = rng.gen_range(0..10_000u32).to_string();
        let position = Vec3::new(
            rng.gen_range(-SPAWN_EXTENT..=SPAWN_EXTENT),
            0.0,
            rng.gen_range(-SPAWN_EXTENT..=SPAWN_EXTENT),
        );

        Self {
            skin_index: skin_for_name(&name),
            position,
            ..Self::new(id, name)
        }
    }

    /// Random alphanumeric name of 3 to 12 characters
    pub fn random_name() -> String {
        let mut rng = rand::thread_rng();
        let len = rng.gen_range(3..=12);
        (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn is_pressed(&self, key: &str) -> bool {
        self.key_states.get(key).copied().unwrap_or(false)
    }
}

/// Skin index for a player name.
///
/// The length is counted in UTF-16 units so browser clients pick the same skin.
pub fn skin_for_name(name: &str) -> u32 {
    let len = name.encode_utf16().count() as u64;
    ((len * 5003) % PLAYER_SKIN_COUNT as u64) as u32
}
