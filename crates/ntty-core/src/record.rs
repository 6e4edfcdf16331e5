//! The unit of broadcast.

use std::fmt;

use bytes::Bytes;

/// One line of input, including its terminator exactly as it was read.
///
/// The final line of an input stream may have no terminator; it is kept
/// as-is. Cloning is cheap (reference-counted), so the same record can be
/// retained across several send passes without copying.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct TextRecord(Bytes);

impl TextRecord {
    /// Wraps raw line bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes, terminator included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the record, returning the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl fmt::Debug for TextRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextRecord({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl From<&'static str> for TextRecord {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for TextRecord {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl AsRef<[u8]> for TextRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
