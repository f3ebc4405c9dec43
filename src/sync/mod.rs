//! Synchronization with the relay server.
//!
//! This module implements the client side of the relay protocol:
//! - JSON event protocol shared by all clients
//! - Connection lifecycle (connect, disconnect, reconnect) and inbound routing
//! - Command executor translating user intents into dispatches and events
//! - Full-state reconciliation and the periodic heartbeat
//! - Throttling of high-frequency events and chat bubble eviction

pub mod connection;
pub mod context;
pub mod executor;
pub mod protocol;
pub mod reconcile;
pub mod throttle;
pub mod timers;
pub mod transport;

pub use connection::{ConnectionHandle, ConnectionManager, ConnectionState};
pub use context::SyncContext;
pub use executor::{Command, CommandExecutor};
pub use protocol::{Event, EventCodec, MovementKey, ProtocolError};
pub use transport::{Connector, Transport, TransportError, TransportSignal};

pub use crate::world::{PlayerId, StructureId};

use crate::config::ConfigError;
use crate::world::{ReduceError, WorldError};

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// A command other than `initialize` ran before initialization
    #[error("Client is not initialized")]
    NotInitialized,

    #[error("Client is already initialized")]
    AlreadyInitialized,

    /// A recognized command with a payload that does not fit it
    #[error("Invalid command {action_type}: {reason}")]
    InvalidCommand { action_type: String, reason: String },

    /// The outbound queue has no consumer anymore
    #[error("Connection closed")]
    ConnectionClosed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
