//! Error types for the relay.

use ntty_core::CodecError;
use thiserror::Error;

use crate::registry::RegistryError;
use crate::server::ServerError;

/// Errors that stop the relay.
///
/// Per-client failures never appear here; they only prune the client.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The listener could not be set up.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Reading the input source failed.
    #[error("input error: {0}")]
    Input(#[from] CodecError),

    /// The registry actor stopped unexpectedly.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
