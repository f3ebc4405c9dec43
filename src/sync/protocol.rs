//! JSON event protocol spoken with the relay server.
//!
//! Every frame is a single JSON object with a `type` tag and a flat payload:
//!
//! ```json
//! {"type": "input_key_down", "playerId": "4711", "key": "w"}
//! ```
//!
//! The relay rebroadcasts events between clients and never interprets them
//! beyond routing, so both directions share one [`Event`] enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::world::{Message, Player, PlayerId, Structure, Vec3, WorldState};

/// Maximum frame size (16MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Protocol errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Message has no type field")]
    MissingType,

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid {event_type} payload: {reason}")]
    InvalidPayload { event_type: String, reason: String },

    #[error("Message too large: {0} bytes (max: {1})")]
    MessageTooLarge(usize, usize),

    #[error("Unrecognized movement key: {0}")]
    UnrecognizedKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Serialization(err.to_string())
    }
}

/// Events exchanged with the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Event {
    /// Ask the relay to admit this client's player
    PlayerEnterRequest { player: Player },

    /// A player joined (possibly ourselves)
    PlayerEnter { player: Player },

    /// A player left
    PlayerExit { player: Player },

    /// The relay asks this client to publish its whole state
    FullStateRequest,

    /// Answer to [`Event::FullStateRequest`]
    FullStateResponse { state: WorldState },

    /// The relay pushes a complete state to adopt
    FullStateUpdate { state: WorldState },

    InputKeyDown { player_id: PlayerId, key: String },

    InputKeyUp { player_id: PlayerId, key: String },

    /// Aim target changed
    PlayerTargetChange { player_id: PlayerId, target: Vec3 },

    ChatMessage {
        player_id: PlayerId,
        message: String,
        time: DateTime<Utc>,
    },

    /// Structure created or edited
    UpdateStructure {
        player_id: PlayerId,
        structure: Structure,
    },

    /// Full player record (heartbeat)
    UpdatePlayer { player: Player },
}

impl Event {
    /// Every `type` tag this client understands
    pub const TYPE_NAMES: &'static [&'static str] = &[
        "player_enter_request",
        "player_enter",
        "player_exit",
        "full_state_request",
        "full_state_response",
        "full_state_update",
        "input_key_down",
        "input_key_up",
        "player_target_change",
        "chat_message",
        "update_structure",
        "update_player",
    ];

    /// The wire `type` tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::PlayerEnterRequest { .. } => "player_enter_request",
            Event::PlayerEnter { .. } => "player_enter",
            Event::PlayerExit { .. } => "player_exit",
            Event::FullStateRequest => "full_state_request",
            Event::FullStateResponse { .. } => "full_state_response",
            Event::FullStateUpdate { .. } => "full_state_update",
            Event::InputKeyDown { .. } => "input_key_down",
            Event::InputKeyUp { .. } => "input_key_up",
            Event::PlayerTargetChange { .. } => "player_target_change",
            Event::ChatMessage { .. } => "chat_message",
            Event::UpdateStructure { .. } => "update_structure",
            Event::UpdatePlayer { .. } => "update_player",
        }
    }

    /// The player an event originates from or is about
    pub fn player_id(&self) -> Option<&str> {
        match self {
            Event::PlayerEnterRequest { player }
            | Event::PlayerEnter { player }
            | Event::PlayerExit { player }
            | Event::UpdatePlayer { player } => Some(&player.id),
            Event::InputKeyDown { player_id, .. }
            | Event::InputKeyUp { player_id, .. }
            | Event::PlayerTargetChange { player_id, .. }
            | Event::ChatMessage { player_id, .. }
            | Event::UpdateStructure { player_id, .. } => Some(player_id),
            Event::FullStateRequest
            | Event::FullStateResponse { .. }
            | Event::FullStateUpdate { .. } => None,
        }
    }

    /// Whether a client may receive this event from the relay
    pub fn is_inbound(&self) -> bool {
        !matches!(
            self,
            Event::PlayerEnterRequest { .. } | Event::FullStateResponse { .. }
        )
    }

    /// Whether a client may send this event to the relay
    pub fn is_outbound(&self) -> bool {
        !matches!(
            self,
            Event::PlayerEnter { .. }
                | Event::PlayerExit { .. }
                | Event::FullStateRequest
                | Event::FullStateUpdate { .. }
        )
    }

    /// Chat event for a message
    pub fn chat(message: Message) -> Self {
        Event::ChatMessage {
            player_id: message.player_id,
            message: message.message,
            time: message.time,
        }
    }
}

/// Movement keys the client forwards; everything else is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKey {
    A,
    W,
    S,
    D,
    F,
    E,
    Q,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl MovementKey {
    pub const ALL: [MovementKey; 12] = [
        MovementKey::A,
        MovementKey::W,
        MovementKey::S,
        MovementKey::D,
        MovementKey::F,
        MovementKey::E,
        MovementKey::Q,
        MovementKey::Space,
        MovementKey::ArrowUp,
        MovementKey::ArrowDown,
        MovementKey::ArrowLeft,
        MovementKey::ArrowRight,
    ];

    /// Wire name of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKey::A => "a",
            MovementKey::W => "w",
            MovementKey::S => "s",
            MovementKey::D => "d",
            MovementKey::F => "f",
            MovementKey::E => "e",
            MovementKey::Q => "q",
            MovementKey::Space => "space",
            MovementKey::ArrowUp => "ArrowUp",
            MovementKey::ArrowDown => "ArrowDown",
            MovementKey::ArrowLeft => "ArrowLeft",
            MovementKey::ArrowRight => "ArrowRight",
        }
    }
}

impl FromStr for MovementKey {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ProtocolError::UnrecognizedKey(s.to_string()))
    }
}

impl fmt::Display for MovementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text codec for [`Event`] frames
pub struct EventCodec;

impl EventCodec {
    /// Encode an event to a JSON text frame
    pub fn encode(event: &Event) -> Result<String, ProtocolError> {
        let text = serde_json::to_string(event)?;
        if text.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge(text.len(), MAX_MESSAGE_SIZE));
        }
        Ok(text)
    }

    /// Decode a JSON text frame.
    ///
    /// A frame with an unrecognized `type` is reported as
    /// [`ProtocolError::UnknownEventType`] rather than a generic parse error, so
    /// callers can tell a newer peer from a broken one.
    pub fn decode(text: &str) -> Result<Event, ProtocolError> {
        if text.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge(text.len(), MAX_MESSAGE_SIZE));
        }

        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidFormat(e.to_string()))?;

        let event_type = value
            .as_object()
            .ok_or_else(|| ProtocolError::InvalidFormat("Expected a JSON object".to_string()))?
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();

        if !Event::TYPE_NAMES.contains(&event_type.as_str()) {
            return Err(ProtocolError::UnknownEventType(event_type));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
            event_type,
            reason: e.to_string(),
        })
    }
}
