//! Client registry using Actor pattern.
//!
//! The registry is the single owner of every live client connection. The
//! acceptor adds clients and the broadcast loop runs send passes, both by
//! sending commands over a tokio mpsc channel. Because the actor handles one
//! command at a time, a send pass always sees a stable client list: a client
//! added mid-pass is queued behind it and first visited by the next pass.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │    Acceptor     │────▶│  RegistryActor  │────▶│ Broadcast Channel│
//! └─────────────────┘     └─────────────────┘     └──────────────────┘
//!         ▲                       │                       │
//!         │   RegistryCommand     │   RegistryEvent       │
//! ┌───────┴─────────┐             ▼                       ▼
//! │  BroadcastLoop  │     Vec<ClientConnection>      Observers
//! └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

mod actor;
mod client;
mod commands;
mod handle;

pub use actor::RegistryActor;
pub use client::{ClientConnection, ClientWriter};
pub use commands::{
    BroadcastOutcome, RegistryCommand, RegistryError, RegistryEvent, RemovalReason,
};
pub use handle::RegistryHandle;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 100;

/// Spawn the registry actor and return a handle for interaction.
///
/// # Arguments
///
/// * `write_timeout` - Bound on each client write during a send pass
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use nttyd::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry(Duration::from_secs(10));
///     let count = handle.client_count().await;
/// }
/// ```
pub fn spawn_registry(write_timeout: Duration) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = RegistryActor::new(cmd_rx, event_tx.clone(), write_timeout);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx, event_tx)
}
