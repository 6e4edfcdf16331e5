//! Client identifiers.

use std::fmt;

/// Prefix used when displaying client identifiers.
pub const CLIENT_ID_PREFIX: &str = "client-";

/// Identifier for one accepted client connection.
///
/// Assigned by the acceptor from a monotonically increasing counter, so
/// identifiers are unique for the lifetime of the process and sort in
/// accept order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClientId(u64);

impl ClientId {
    /// Creates a new ClientId from a connection number.
    pub fn new(number: u64) -> Self {
        Self(number)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CLIENT_ID_PREFIX}{}", self.0)
    }
}

impl From<u64> for ClientId {
    fn from(number: u64) -> Self {
        Self(number)
    }
}
