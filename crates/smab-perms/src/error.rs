//! Error types for the update token protocol.

use smab_core::FileId;
use thiserror::Error;

/// Reasons an update token is rejected.
///
/// A rejected token is never partially applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Token signature does not verify against the header's owner key, or
    /// the header handed to the issuer is not validly signed.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token signature is valid, but it was issued against a different
    /// allow-list than the header it is being applied to.
    #[error("token was issued against a different allow-list")]
    StaleHeader,

    /// Token expiry is not in the future.
    #[error("token expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },

    /// Token nonce was already consumed for this file.
    #[error("token already applied")]
    Replayed,

    /// Token targets a different file.
    #[error("token targets file {found}, header is {expected}")]
    TargetMismatch { expected: FileId, found: FileId },

    /// Token bytes cannot be decoded.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The issuing keypair does not own the header.
    #[error("keypair does not own this file")]
    NotOwner,

    /// The replay cache could not be consulted.
    #[error("nonce store error: {0}")]
    Store(String),
}

/// Result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;
