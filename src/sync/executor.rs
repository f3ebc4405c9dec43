//! Translates user intents into local dispatches and outbound events.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connection::{ConnectionHandle, ConnectionManager};
use super::context::SyncContext;
use super::protocol::{Event, MovementKey};
use super::reconcile;
use super::transport::Connector;
use super::{SyncError, SyncResult};
use crate::world::{Action, Message, Player, PlayerId, Structure, Vec3};

/// Commands issued by the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    /// Adopt the local player and connect; must come first
    Initialize { player: Player },
    KeyDown { key: String },
    KeyUp { key: String },
    UpdatePlayerTarget { target: Vec3 },
    SendChatMessage { message: String },
    UpdateStructure { structure: Structure },
    /// Re-broadcast the local player record
    UpdatePlayer,
    /// Local-only: vertices of the polygon being drawn
    UpdatePartialPoints { points: Vec<Vec3> },
}

impl Command {
    pub const TYPE_NAMES: &'static [&'static str] = &[
        "initialize",
        "key_down",
        "key_up",
        "update_player_target",
        "send_chat_message",
        "update_structure",
        "update_player",
        "update_partial_points",
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            Command::Initialize { .. } => "initialize",
            Command::KeyDown { .. } => "key_down",
            Command::KeyUp { .. } => "key_up",
            Command::UpdatePlayerTarget { .. } => "update_player_target",
            Command::SendChatMessage { .. } => "send_chat_message",
            Command::UpdateStructure { .. } => "update_structure",
            Command::UpdatePlayer => "update_player",
            Command::UpdatePartialPoints { .. } => "update_partial_points",
        }
    }
}

/// The write path of the client.
///
/// Every command applies locally first: the local player's state is
/// authoritative and never waits for the relay.
pub struct CommandExecutor {
    ctx: Arc<SyncContext>,
    connector: Arc<dyn Connector>,
    connection: Mutex<Option<ConnectionHandle>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl CommandExecutor {
    pub fn new(ctx: Arc<SyncContext>, connector: Arc<dyn Connector>) -> Self {
        Self {
            ctx,
            connector,
            connection: Mutex::new(None),
            heartbeat: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    pub fn is_initialized(&self) -> bool {
        self.ctx.store().local_player_id().is_some()
    }

    /// Run a command.
    ///
    /// Must be called from within a tokio runtime: initialization spawns the
    /// connection and heartbeat tasks and target changes start a timer.
    pub fn execute(&self, command: Command) -> SyncResult<()> {
        debug!("Executing {}", command.type_name());

        let player_id = match command {
            Command::Initialize { player } => return self.initialize(player),
            _ => self.require_local()?,
        };

        match command {
            Command::Initialize { .. } => Ok(()),

            Command::KeyDown { key } => self.key_change(player_id, &key, true),

            Command::KeyUp { key } => self.key_change(player_id, &key, false),

            Command::UpdatePlayerTarget { target } => {
                self.ctx.dispatch(Action::UpdatePlayerTarget {
                    player_id: player_id.clone(),
                    target,
                })?;
                self.ctx
                    .target_throttle()
                    .submit(Event::PlayerTargetChange { player_id, target });
                Ok(())
            }

            Command::SendChatMessage { message } => {
                self.ctx.send(Event::chat(Message::new(player_id, message)))
            }

            Command::UpdateStructure { structure } => {
                self.ctx.dispatch(Action::UpdateStructure(structure.clone()))?;
                self.ctx.send(Event::UpdateStructure {
                    player_id,
                    structure,
                })
            }

            Command::UpdatePlayer => reconcile::broadcast_local_player(&self.ctx),

            Command::UpdatePartialPoints { points } => {
                self.ctx.dispatch(Action::UpdatePartialPoints(points))?;
                Ok(())
            }
        }
    }

    /// Run a command given by name and JSON payload.
    ///
    /// Unknown names are logged and ignored.
    pub fn execute_raw(&self, action_type: &str, data: Value) -> SyncResult<()> {
        if !Command::TYPE_NAMES.contains(&action_type) {
            warn!("Ignoring unknown command {}", action_type);
            return Ok(());
        }

        let invalid = |reason: String| SyncError::InvalidCommand {
            action_type: action_type.to_string(),
            reason,
        };

        let mut fields = match data {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => return Err(invalid(format!("Expected an object payload, got {}", other))),
        };
        fields.insert("type".to_string(), Value::String(action_type.to_string()));

        let command: Command =
            serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(e.to_string()))?;
        self.execute(command)
    }

    /// Stop the heartbeat, pending timers and the connection
    pub async fn shutdown(&self) {
        self.ctx.shutdown();

        let heartbeat = self.heartbeat.lock().take();
        if let Some(heartbeat) = heartbeat {
            let _ = heartbeat.await;
        }

        let connection = self.connection.lock().take();
        if let Some(connection) = connection {
            connection.close().await;
        }
        info!("Client shut down");
    }

    fn initialize(&self, player: Player) -> SyncResult<()> {
        if self.is_initialized() {
            return Err(SyncError::AlreadyInitialized);
        }

        info!("Initializing as {} ({})", player.id, player.name);
        self.ctx.dispatch(Action::UpdateLocalPlayer {
            player_id: player.id.clone(),
            player,
        })?;

        let connection = ConnectionManager::open(self.ctx.clone(), self.connector.clone());
        *self.connection.lock() = Some(connection);
        *self.heartbeat.lock() = Some(reconcile::spawn_heartbeat(self.ctx.clone()));
        Ok(())
    }

    fn require_local(&self) -> SyncResult<PlayerId> {
        self.ctx
            .store()
            .local_player_id()
            .ok_or(SyncError::NotInitialized)
    }

    fn key_change(&self, player_id: PlayerId, key: &str, pressed: bool) -> SyncResult<()> {
        let Ok(key) = key.parse::<MovementKey>() else {
            debug!("Ignoring unrecognized key {:?}", key);
            return Ok(());
        };
        let key = key.as_str().to_string();

        self.ctx.dispatch(Action::UpdatePlayerKeyState {
            player_id: player_id.clone(),
            key: key.clone(),
            pressed,
        })?;

        let event = if pressed {
            Event::InputKeyDown { player_id, key }
        } else {
            Event::InputKeyUp { player_id, key }
        };
        self.ctx.send(event)
    }
}
