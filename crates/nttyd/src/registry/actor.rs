//! Registry actor - owns every client connection and processes commands.
//!
//! The RegistryActor is the single owner of the client list. Commands are
//! handled strictly one at a time, which gives each send pass exclusive
//! access to the list without any lock.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Responder send failures are ignored (the caller went away)
//! - Event publish failures are ignored (nobody is subscribed)

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use ntty_core::TextRecord;

use super::client::ClientConnection;
use super::commands::{BroadcastOutcome, RegistryCommand, RegistryEvent, RemovalReason};

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns all client state.
///
/// # Ownership
///
/// The actor owns:
/// - `clients`: live connections in accept order
/// - `waiters`: responders parked by `WaitUntilNonEmpty` while `clients` is empty
///
/// Client handles are written and closed only here.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Live connections, traversed in this order during a send pass
    clients: Vec<ClientConnection>,

    /// Parked `WaitUntilNonEmpty` responders
    waiters: Vec<oneshot::Sender<()>>,

    /// Event publisher for observers
    event_publisher: broadcast::Sender<RegistryEvent>,

    /// Bound on each client write
    write_timeout: Duration,
}

impl RegistryActor {
    /// Creates a new registry actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `event_publisher` - Broadcast channel for publishing events
    /// * `write_timeout` - Per-client write bound during a send pass
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        event_publisher: broadcast::Sender<RegistryEvent>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            receiver,
            clients: Vec::new(),
            waiters: Vec::new(),
            event_publisher,
            write_timeout,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    /// Remaining clients are dropped, closing their connections.
    pub async fn run(mut self) {
        debug!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        debug!(clients = self.clients.len(), "Registry actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    async fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Add { client, respond_to } => {
                self.handle_add(*client);
                let _ = respond_to.send(());
            }
            RegistryCommand::Broadcast { record, respond_to } => {
                let outcome = self.handle_broadcast(&record).await;
                let _ = respond_to.send(outcome);
            }
            RegistryCommand::WaitUntilNonEmpty { respond_to } => {
                self.handle_wait_until_non_empty(respond_to);
            }
            RegistryCommand::ClientCount { respond_to } => {
                let _ = respond_to.send(self.clients.len());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_add(&mut self, client: ClientConnection) {
        let was_empty = self.clients.is_empty();

        info!(
            client_id = %client.id(),
            peer = %client.peer(),
            clients = self.clients.len() + 1,
            "Client accepted"
        );

        let _ = self.event_publisher.send(RegistryEvent::ClientAdded {
            client_id: client.id(),
            peer: client.peer().to_string(),
        });
        self.clients.push(client);

        if was_empty {
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    /// One send pass.
    ///
    /// Survivors are moved into a fresh list that replaces `clients` when the
    /// pass ends, so removing any entry never disturbs traversal of the rest.
    async fn handle_broadcast(&mut self, record: &TextRecord) -> BroadcastOutcome {
        let pending = std::mem::take(&mut self.clients);
        let mut survivors = Vec::with_capacity(pending.len());
        let mut outcome = BroadcastOutcome::default();

        for mut client in pending {
            match client.send(record, self.write_timeout).await {
                Ok(()) => {
                    outcome.delivered += 1;
                    survivors.push(client);
                }
                Err(e) => {
                    let reason = RemovalReason::from_io_error(&e);
                    warn!(
                        client_id = %client.id(),
                        peer = %client.peer(),
                        connected_secs = client.connected_for().num_seconds(),
                        error = %e,
                        "Client disconnected"
                    );
                    outcome.pruned.push(client.id());
                    let _ = self.event_publisher.send(RegistryEvent::ClientRemoved {
                        client_id: client.id(),
                        reason,
                    });
                    // Dropping the connection closes its socket.
                    drop(client);
                }
            }
        }

        self.clients = survivors;

        debug!(
            bytes = record.len(),
            delivered = outcome.delivered,
            pruned = outcome.pruned.len(),
            remaining = self.clients.len(),
            "Send pass complete"
        );

        outcome
    }

    fn handle_wait_until_non_empty(&mut self, respond_to: oneshot::Sender<()>) {
        if self.clients.is_empty() {
            // Drop waiters whose caller has already gone away.
            self.waiters.retain(|w| !w.is_closed());
            self.waiters.push(respond_to);
        } else {
            let _ = respond_to.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{spawn_registry, RegistryHandle};
    use ntty_core::ClientId;
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio::time::timeout;

    const WRITE_TIMEOUT: Duration = Duration::from_secs(1);
    const WAIT: Duration = Duration::from_millis(100);

    /// Registers a client backed by an in-memory pipe and returns the read end.
    async fn add_client(handle: &RegistryHandle, n: u64) -> DuplexStream {
        let (writer, reader) = tokio::io::duplex(1024);
        let client = ClientConnection::new(ClientId::new(n), format!("test-{n}"), Box::new(writer));
        handle.add(client).await.unwrap();
        reader
    }

    async fn read_record(reader: &mut DuplexStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        timeout(WAIT, reader.read_exact(&mut buf))
            .await
            .expect("record within timeout")
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let handle = spawn_registry(WRITE_TIMEOUT);
        let mut a = add_client(&handle, 1).await;
        let mut b = add_client(&handle, 2).await;

        let outcome = handle.broadcast(TextRecord::from("hello\n")).await.unwrap();
        assert_eq!(outcome.delivered, 2);
        assert!(outcome.pruned.is_empty());

        assert_eq!(read_record(&mut a, 6).await, b"hello\n");
        assert_eq!(read_record(&mut b, 6).await, b"hello\n");
    }

    #[tokio::test]
    async fn test_broadcast_with_no_clients_delivers_nothing() {
        let handle = spawn_registry(WRITE_TIMEOUT);
        let outcome = handle.broadcast(TextRecord::from("x\n")).await.unwrap();
        assert_eq!(outcome, BroadcastOutcome::default());
        assert!(!outcome.is_consumed());
    }

    /// Five clients, failure injected at `failing` positions; every other
    /// client must still receive both records.
    async fn assert_prune_keeps_neighbours(failing: &[usize]) {
        let handle = spawn_registry(WRITE_TIMEOUT);
        let mut readers = Vec::new();
        for n in 0..5u64 {
            readers.push(Some(add_client(&handle, n).await));
        }
        for &idx in failing {
            readers[idx] = None; // drop the read end
        }

        let first = handle.broadcast(TextRecord::from("one\n")).await.unwrap();
        assert_eq!(first.delivered, 5 - failing.len());
        let expected: Vec<ClientId> = failing.iter().map(|&i| ClientId::new(i as u64)).collect();
        assert_eq!(first.pruned, expected);
        assert_eq!(handle.client_count().await.unwrap(), 5 - failing.len());

        let second = handle.broadcast(TextRecord::from("two\n")).await.unwrap();
        assert_eq!(second.delivered, 5 - failing.len());
        assert!(second.pruned.is_empty());

        for reader in readers.iter_mut().flatten() {
            assert_eq!(read_record(reader, 8).await, b"one\ntwo\n");
        }
    }

    #[tokio::test]
    async fn test_prune_head() {
        assert_prune_keeps_neighbours(&[0]).await;
    }

    #[tokio::test]
    async fn test_prune_middle() {
        assert_prune_keeps_neighbours(&[2]).await;
    }

    #[tokio::test]
    async fn test_prune_tail() {
        assert_prune_keeps_neighbours(&[4]).await;
    }

    #[tokio::test]
    async fn test_prune_adjacent_and_ends() {
        assert_prune_keeps_neighbours(&[0, 1, 4]).await;
    }

    #[tokio::test]
    async fn test_prune_all_empties_registry() {
        let handle = spawn_registry(WRITE_TIMEOUT);
        drop(add_client(&handle, 1).await);
        drop(add_client(&handle, 2).await);

        let outcome = handle.broadcast(TextRecord::from("x\n")).await.unwrap();
        assert_eq!(outcome.delivered, 0);
        assert_eq!(outcome.pruned.len(), 2);
        assert_eq!(handle.client_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_non_empty() {
        let handle = spawn_registry(WRITE_TIMEOUT);
        let _a = add_client(&handle, 1).await;

        timeout(WAIT, handle.wait_until_non_empty())
            .await
            .expect("no wait with a client present")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_blocks_until_add() {
        let handle = spawn_registry(WRITE_TIMEOUT);

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.wait_until_non_empty().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let _a = add_client(&handle, 1).await;
        timeout(WAIT, waiter)
            .await
            .expect("waiter woken by add")
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_is_discarded() {
        let handle = spawn_registry(WRITE_TIMEOUT);

        // Give up on a wait, then wait again; the second one must still wake.
        let _ = timeout(Duration::from_millis(10), handle.wait_until_non_empty()).await;

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.wait_until_non_empty().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let _a = add_client(&handle, 1).await;
        timeout(WAIT, waiter).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_events_published_for_add_and_remove() {
        let handle = spawn_registry(WRITE_TIMEOUT);
        let mut events = handle.subscribe();

        drop(add_client(&handle, 9).await);
        handle.broadcast(TextRecord::from("x\n")).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            RegistryEvent::ClientAdded {
                client_id: ClientId::new(9),
                peer: "test-9".to_string(),
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            RegistryEvent::ClientRemoved {
                client_id: ClientId::new(9),
                reason: RemovalReason::WriteFailed,
            }
        );
    }
}
