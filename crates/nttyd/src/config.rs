//! Runtime configuration for the relay.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Listen backlog for connections not yet accepted.
pub const DEFAULT_BACKLOG: u32 = 10;

/// Upper bound on a single client write before the client is dropped.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one relay instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,

    /// Listen backlog.
    pub backlog: u32,

    /// Per-client write timeout during a send pass.
    pub write_timeout: Duration,

    /// Longest relayed input line, terminator included. Longer lines are
    /// skipped. `None` relays lines of any length.
    pub max_line_bytes: Option<usize>,
}

impl RelayConfig {
    /// Creates a config listening on all IPv4 interfaces at `port`.
    pub fn for_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            ..Self::default()
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            backlog: DEFAULT_BACKLOG,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_line_bytes: None,
        }
    }
}
