//! Playground Sync - client-side synchronization core for the multiplayer
//! building playground.
//!
//! Each client keeps a full mirror of the shared world (players, structures,
//! chat) and exchanges events with a relay server that rebroadcasts them:
//! - `world`: world model and the pure reducer over it
//! - `sync`: protocol, connection lifecycle, command executor, reconciliation
//! - `config`: endpoint and timing configuration

pub mod config;
pub mod sync;
pub mod world;

pub use config::{ClientConfig, ConfigError, Environment};
pub use sync::{
    Command, CommandExecutor, ConnectionState, Event, SyncContext, SyncError, SyncResult,
};
pub use world::{Action, Player, Store, Structure, Vec3, WorldState};
