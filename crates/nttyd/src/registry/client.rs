//! A registered client connection.

use std::fmt;
use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use ntty_core::{ClientId, TextRecord};

/// Type alias for the write side of a client connection.
pub type ClientWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One accepted downstream connection.
///
/// Owned by the registry actor once registered; the stream is closed when
/// the connection is dropped.
pub struct ClientConnection {
    id: ClientId,
    peer: String,
    connected_at: DateTime<Utc>,
    writer: ClientWriter,
}

impl ClientConnection {
    /// Creates a new connection.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier assigned by the acceptor
    /// * `peer` - Human-readable peer address, used only for logging
    /// * `writer` - The stream records are written to
    pub fn new(id: ClientId, peer: impl Into<String>, writer: ClientWriter) -> Self {
        Self {
            id,
            peer: peer.into(),
            connected_at: Utc::now(),
            writer,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Time since the connection was accepted.
    pub fn connected_for(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }

    /// Writes the whole record and flushes, bounded by `write_timeout`.
    ///
    /// A timeout is reported as `io::ErrorKind::TimedOut`.
    pub async fn send(&mut self, record: &TextRecord, write_timeout: Duration) -> io::Result<()> {
        let write = async {
            self.writer.write_all(record.as_bytes()).await?;
            self.writer.flush().await?;
            Ok::<(), io::Error>(())
        };

        match timeout(write_timeout, write).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("write did not complete within {write_timeout:?}"),
            )),
        }
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}
