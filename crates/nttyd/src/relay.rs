//! Wires listener, registry, acceptor and broadcast loop into one relay.

use std::io;
use std::net::SocketAddr;

use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::broadcast::{BroadcastLoop, BroadcastSummary};
use crate::config::RelayConfig;
use crate::error::RelayResult;
use crate::registry::{spawn_registry, RegistryHandle};
use crate::server::{bind_listener, Acceptor};

/// A bound relay, ready to run.
pub struct Relay {
    config: RelayConfig,
    listener: TcpListener,
    registry: RegistryHandle,
}

impl Relay {
    /// Binds the listener and spawns the client registry.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `RelayError::Server` if the listener cannot be bound
    pub async fn bind(config: RelayConfig) -> RelayResult<Self> {
        let listener = bind_listener(config.bind_addr, config.backlog)?;
        let registry = spawn_registry(config.write_timeout);

        Ok(Self {
            config,
            listener,
            registry,
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle to this relay's client registry.
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Broadcasts `input` until it is exhausted or `cancel_token` is cancelled.
    ///
    /// The acceptor is stopped on return. Clients already connected stay
    /// registered for as long as some registry handle is alive.
    ///
    /// # Errors
    ///
    /// - `RelayError::Input` if reading `input` fails
    /// - `RelayError::Registry` if the registry actor stopped
    pub async fn run<R>(self, input: R, cancel_token: CancellationToken) -> RelayResult<BroadcastSummary>
    where
        R: AsyncRead + Unpin,
    {
        let Relay {
            config,
            listener,
            registry,
        } = self;

        let acceptor_token = cancel_token.child_token();
        let acceptor = Acceptor::new(listener, registry.clone(), acceptor_token.clone());
        let acceptor_task = tokio::spawn(acceptor.run());

        let result = BroadcastLoop::from_reader(input, config.max_line_bytes, registry, cancel_token)
            .run()
            .await;

        acceptor_token.cancel();
        let _ = acceptor_task.await;

        if let Ok(summary) = &result {
            info!(
                delivered = summary.records_delivered,
                retried = summary.records_retried,
                pruned = summary.clients_pruned,
                reason = ?summary.stop_reason,
                "Relay stopped"
            );
        }

        result
    }
}

/// Binds according to `config` and runs the relay over `input`.
///
/// # Errors
///
/// See [`Relay::bind`] and [`Relay::run`].
pub async fn run_relay<R>(
    config: RelayConfig,
    input: R,
    cancel_token: CancellationToken,
) -> RelayResult<BroadcastSummary>
where
    R: AsyncRead + Unpin,
{
    Relay::bind(config).await?.run(input, cancel_token).await
}
