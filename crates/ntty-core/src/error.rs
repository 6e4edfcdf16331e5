//! Error types for decoding the input stream.

use thiserror::Error;

/// Errors that can occur while splitting input into records.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The underlying reader failed.
    #[error("input read failed: {0}")]
    Io(#[from] std::io::Error),
}
