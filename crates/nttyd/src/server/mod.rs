//! TCP server for the relay.
//!
//! The server:
//! - Binds a TCP listener with a small backlog
//! - Runs an `Acceptor` that registers each accepted connection
//! - Supports shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Acceptor     │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐
//! │ RegistryHandle  │
//! │     add()       │
//! └─────────────────┘
//! ```

mod acceptor;

pub use acceptor::{Acceptor, ACCEPT_RETRY_DELAY};

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

/// Binds a TCP listener on `addr` with the given listen backlog.
///
/// # Errors
///
/// - `ServerError::Bind` if the socket cannot be created, bound or put into
///   listening state
pub fn bind_listener(addr: SocketAddr, backlog: u32) -> Result<TcpListener, ServerError> {
    let bind = || -> io::Result<TcpListener> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(backlog)
    };

    let listener = bind().map_err(|source| ServerError::Bind { addr, source })?;

    let local = listener.local_addr().unwrap_or(addr);
    info!(addr = %local, backlog, "Listening");

    Ok(listener)
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}
