//! Registry actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `RegistryEvent`: Events published by the registry for observers
//! - `BroadcastOutcome`: Result of one send pass

use ntty_core::{ClientId, TextRecord};
use thiserror::Error;
use tokio::sync::oneshot;

use super::client::ClientConnection;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// The actor handles commands one at a time, so every command observes the
/// client list exactly as the previous command left it.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Append a newly accepted client.
    ///
    /// Wakes parked `WaitUntilNonEmpty` callers if the registry was empty.
    Add {
        /// The connection to register (boxed to keep the enum small)
        client: Box<ClientConnection>,
        /// Acknowledged once the client is part of the registry
        respond_to: oneshot::Sender<()>,
    },

    /// Run one send pass: write the record to every client, pruning failures.
    Broadcast {
        /// Record to deliver
        record: TextRecord,
        /// Channel to send the pass outcome
        respond_to: oneshot::Sender<BroadcastOutcome>,
    },

    /// Answer once the registry holds at least one client.
    ///
    /// Answered immediately if it already does, otherwise parked until the
    /// next `Add`.
    WaitUntilNonEmpty {
        respond_to: oneshot::Sender<()>,
    },

    /// Get the number of registered clients.
    ClientCount {
        respond_to: oneshot::Sender<usize>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The command or response channel was closed.
    ///
    /// This indicates the actor has shut down.
    #[error("registry channel closed")]
    ChannelClosed,
}

// ============================================================================
// Pass Outcome
// ============================================================================

/// What one send pass achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Clients that received the whole record.
    pub delivered: usize,

    /// Clients removed because their write failed.
    pub pruned: Vec<ClientId>,
}

impl BroadcastOutcome {
    /// Whether at least one client received the record.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.delivered > 0
    }
}

// ============================================================================
// Registry Events
// ============================================================================

/// Events published by the registry to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A client was registered.
    ClientAdded {
        client_id: ClientId,
        peer: String,
    },

    /// A client was removed from the registry.
    ClientRemoved {
        client_id: ClientId,
        reason: RemovalReason,
    },
}

/// Reason why a client was removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// A write to the client returned an error.
    WriteFailed,

    /// A write to the client did not complete within the write timeout.
    WriteTimedOut,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "write failed"),
            Self::WriteTimedOut => write!(f, "write timed out"),
        }
    }
}

impl RemovalReason {
    /// Classifies a write error.
    pub fn from_io_error(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::WriteTimedOut,
            _ => Self::WriteFailed,
        }
    }
}
