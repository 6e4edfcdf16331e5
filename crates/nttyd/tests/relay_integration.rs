//! Integration tests for the relay over real TCP sockets.
//!
//! These tests run a complete relay (listener, acceptor, registry, broadcast
//! loop) on an ephemeral loopback port and feed it input through an
//! in-memory pipe.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::net::SocketAddr;
use std::time::Duration;

use nttyd::broadcast::{BroadcastSummary, StopReason};
use nttyd::config::RelayConfig;
use nttyd::registry::RegistryHandle;
use nttyd::relay::Relay;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for bytes or state changes
const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between registry polls
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long "nothing arrives" is observed for
const QUIET_PERIOD: Duration = Duration::from_millis(100);

// ============================================================================
// Test Helpers
// ============================================================================

/// Running relay with its input pipe and registry handle.
struct TestRelay {
    addr: SocketAddr,
    registry: RegistryHandle,
    input: Option<DuplexStream>,
    cancel_token: CancellationToken,
    task: JoinHandle<nttyd::error::RelayResult<BroadcastSummary>>,
}

impl TestRelay {
    async fn spawn() -> Self {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            write_timeout: Duration::from_secs(1),
            ..RelayConfig::default()
        };

        let relay = Relay::bind(config).await.expect("bind relay");
        let addr = relay.local_addr().unwrap();
        let registry = relay.registry();
        let (input, input_rx) = tokio::io::duplex(4096);
        let cancel_token = CancellationToken::new();

        let task = tokio::spawn(relay.run(input_rx, cancel_token.clone()));

        TestRelay {
            addr,
            registry,
            input: Some(input),
            cancel_token,
            task,
        }
    }

    /// Connects a client and waits until the registry holds it.
    async fn connect(&self) -> TestClient {
        let before = self.registry.client_count().await.unwrap();
        let stream = TcpStream::connect(self.addr).await.expect("connect to relay");
        self.wait_for_clients(before + 1).await;
        TestClient { stream }
    }

    async fn wait_for_clients(&self, expected: usize) {
        let start = tokio::time::Instant::now();
        while start.elapsed() < WAIT_TIMEOUT {
            if self.registry.client_count().await.unwrap() == expected {
                return;
            }
            sleep(POLL_INTERVAL).await;
        }
        panic!(
            "registry never reached {expected} clients (has {})",
            self.registry.client_count().await.unwrap()
        );
    }

    async fn feed(&mut self, line: &str) {
        let input = self.input.as_mut().expect("input still open");
        input.write_all(line.as_bytes()).await.unwrap();
    }

    /// Closes the input and waits for the broadcast loop to finish.
    async fn finish(mut self) -> (BroadcastSummary, RegistryHandle) {
        drop(self.input.take());
        let summary = timeout(WAIT_TIMEOUT, self.task)
            .await
            .expect("relay finishes after end of input")
            .unwrap()
            .unwrap();
        (summary, self.registry)
    }
}

struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    async fn expect(&mut self, expected: &str) {
        let mut buf = vec![0u8; expected.len()];
        timeout(WAIT_TIMEOUT, self.stream.read_exact(&mut buf))
            .await
            .expect("bytes within timeout")
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&buf), expected);
    }

    /// Asserts no bytes and no EOF arrive for a short while.
    async fn expect_silence(&mut self) {
        let mut buf = [0u8; 1];
        let result = timeout(QUIET_PERIOD, self.stream.read(&mut buf)).await;
        assert!(result.is_err(), "unexpected read result: {result:?}");
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_client_receives_line() {
    let mut relay = TestRelay::spawn().await;
    let mut c1 = relay.connect().await;

    relay.feed("hello\n").await;
    c1.expect("hello\n").await;
}

#[tokio::test]
async fn test_disconnected_client_is_pruned() {
    let mut relay = TestRelay::spawn().await;
    let mut c1 = relay.connect().await;
    let mut c2 = relay.connect().await;

    relay.feed("a\n").await;
    c1.expect("a\n").await;
    c2.expect("a\n").await;

    drop(c1);

    relay.feed("b\n").await;
    c2.expect("b\n").await;

    // The kernel may accept one write to a closed peer before it fails, so
    // keep feeding until the relay notices.
    let mut pruned = false;
    for _ in 0..50 {
        relay.feed("c\n").await;
        c2.expect("c\n").await;
        if relay.registry.client_count().await.unwrap() == 1 {
            pruned = true;
            break;
        }
    }
    assert!(pruned, "closed client was never pruned");

    let (summary, _registry) = relay.finish().await;
    assert_eq!(summary.clients_pruned, 1);
}

#[tokio::test]
async fn test_line_read_before_any_client_is_delivered_to_first() {
    let mut relay = TestRelay::spawn().await;

    relay.feed("early\n").await;
    sleep(QUIET_PERIOD).await;

    let mut c1 = relay.connect().await;
    c1.expect("early\n").await;

    relay.feed("next\n").await;
    c1.expect("next\n").await;
}

#[tokio::test]
async fn test_end_of_input_keeps_clients_connected() {
    let mut relay = TestRelay::spawn().await;
    let mut c1 = relay.connect().await;

    relay.feed("x\n").await;
    c1.expect("x\n").await;

    let (summary, registry) = relay.finish().await;
    assert_eq!(summary.stop_reason, StopReason::InputExhausted);
    assert_eq!(summary.records_delivered, 1);

    assert_eq!(registry.client_count().await.unwrap(), 1);
    c1.expect_silence().await;
}

// ============================================================================
// Ordering and membership
// ============================================================================

#[tokio::test]
async fn test_late_client_sees_only_later_lines() {
    let mut relay = TestRelay::spawn().await;
    let mut c1 = relay.connect().await;

    relay.feed("first\n").await;
    c1.expect("first\n").await;

    let mut c2 = relay.connect().await;
    relay.feed("second\n").await;

    c1.expect("second\n").await;
    c2.expect("second\n").await;
}

#[tokio::test]
async fn test_many_clients_receive_same_sequence() {
    let mut relay = TestRelay::spawn().await;
    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(relay.connect().await);
    }

    for line in ["1\n", "2\n", "3\n"] {
        relay.feed(line).await;
    }

    for client in &mut clients {
        client.expect("1\n2\n3\n").await;
    }
}

#[tokio::test]
async fn test_unterminated_last_line_is_relayed() {
    let mut relay = TestRelay::spawn().await;
    let mut c1 = relay.connect().await;

    relay.feed("no newline").await;
    let (summary, _registry) = relay.finish().await;

    c1.expect("no newline").await;
    assert_eq!(summary.records_delivered, 1);
}

#[tokio::test]
async fn test_cancel_stops_relay() {
    let relay = TestRelay::spawn().await;
    let _c1 = relay.connect().await;

    relay.cancel_token.cancel();
    let summary = timeout(WAIT_TIMEOUT, relay.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
}
