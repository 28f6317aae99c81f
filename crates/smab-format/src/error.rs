//! Error types for header, container and payload codecs.

use smab_core::CoreError;
use thiserror::Error;

/// Errors that can occur while encoding or decoding file structures.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A required header field is absent.
    #[error("missing header field: {0}")]
    MissingField(&'static str),

    /// A header field is present but cannot be decoded.
    #[error("invalid header field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// The header or container structure is unreadable.
    #[error("malformed: {0}")]
    Malformed(String),

    /// The container does not start with the expected magic bytes.
    #[error("bad magic: {0:02x?}")]
    BadMagic([u8; 4]),

    /// Container or header version this build cannot read.
    #[error("unsupported {what} version: {found} (supported: {supported})")]
    UnsupportedVersion {
        what: &'static str,
        found: u8,
        supported: u8,
    },

    /// The input ended inside a section.
    #[error("truncated container: {0}")]
    Truncated(&'static str),

    /// A length prefix exceeds the configured bound.
    #[error("{what} length {len} exceeds limit {max}")]
    TooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// A replacement header does not describe the same sealed file.
    #[error("header mismatch: {0}")]
    HeaderMismatch(&'static str),

    /// The payload breaks a record invariant.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Payload CBOR could not be produced or read.
    #[error("payload encoding error: {0}")]
    PayloadEncoding(String),

    /// Cryptographic failure from the core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for format operations.
pub type Result<T> = std::result::Result<T, FormatError>;
