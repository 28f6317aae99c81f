//! Canonical byte encoding for signed data.
//!
//! Signatures never cover JSON or any map-based serialization. Signed
//! messages are built by concatenating fields in a fixed order:
//!
//! - a domain label first (raw bytes, fixed per message type),
//! - fixed-width values written as-is (integers big-endian),
//! - variable-length values prefixed with a u32 big-endian length,
//! - sequences prefixed with a u32 big-endian element count.
//!
//! **CRITICAL**: Changing the order or the framing of any message breaks
//! every existing signature.

/// Builder for a canonical signed message.
#[derive(Debug, Clone)]
pub struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    /// Start a message with its domain label.
    pub fn new(domain: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(domain.len() + 128);
        buf.extend_from_slice(domain);
        Self { buf }
    }

    /// Append a single byte.
    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    /// Append a signed 64-bit integer, big-endian.
    pub fn i64(mut self, value: i64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Append a fixed-width field without a length prefix.
    pub fn fixed(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a variable-length field with a length prefix.
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.put_len(bytes.len());
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a UTF-8 string with a length prefix.
    pub fn str(self, s: &str) -> Self {
        self.bytes(s.as_bytes())
    }

    /// Append a sequence of strings: count, then each length-prefixed.
    pub fn strs<'a, I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        self.put_len(items.len());
        for item in items {
            self = self.str(item);
        }
        self
    }

    /// Finish and return the message bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn put_len(&mut self, len: usize) {
        // Signed fields are bounded well below 4 GiB by the container limits.
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_be_bytes());
    }
}
