//! Accepts TCP connections and registers them with the client registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ntty_core::ClientId;

use crate::registry::{ClientConnection, RegistryHandle};

/// Pause after a failed accept, so descriptor exhaustion does not spin.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Connection acceptor.
///
/// Hands every accepted stream to the registry. Accept errors are logged
/// and retried forever; only cancellation or registry shutdown stop it.
pub struct Acceptor {
    /// Bound listener
    listener: TcpListener,

    /// Handle to the client registry
    registry: RegistryHandle,

    /// Cancellation token for shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating client IDs
    connection_counter: AtomicU64,
}

impl Acceptor {
    /// Creates a new acceptor.
    pub fn new(
        listener: TcpListener,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            listener,
            registry,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        }
    }

    /// Runs the accept loop until cancelled or the registry shuts down.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!("Acceptor shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let id = ClientId::new(
                                self.connection_counter.fetch_add(1, Ordering::Relaxed),
                            );
                            if !self.register(id, stream, addr.to_string()).await {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            if !back_off(&self.cancel_token, ACCEPT_RETRY_DELAY).await {
                                debug!("Acceptor shutdown requested");
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!("Acceptor stopped");
    }

    /// Registers one stream. Returns `false` if the registry is gone.
    async fn register(&self, id: ClientId, stream: TcpStream, peer: String) -> bool {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(client_id = %id, error = %e, "Failed to set TCP_NODELAY");
        }

        let client = ClientConnection::new(id, peer, Box::new(stream));
        match self.registry.add(client).await {
            Ok(()) => true,
            Err(e) => {
                warn!(client_id = %id, error = %e, "Registry unavailable, stopping acceptor");
                false
            }
        }
    }
}

/// Sleeps for `delay`. Returns `false` if cancelled first.
async fn back_off(cancel_token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel_token.cancelled() => false,
        _ = sleep(delay) => true,
    }
}
