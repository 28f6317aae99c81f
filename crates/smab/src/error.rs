//! Error types for the facade.

use smab_aggregate::AggregateError;
use smab_core::CoreError;
use smab_format::FormatError;
use smab_perms::TokenError;
use smab_store::StoreError;
use thiserror::Error;

/// Errors that can occur during SMAB operations.
#[derive(Debug, Error)]
pub enum SmabError {
    /// The password does not match the header's key-verification hash.
    /// Reported before any decryption is attempted.
    #[error("password does not match this file")]
    PasswordMismatch,

    /// The header names a different owner than the caller expected.
    #[error("file is owned by {found}, expected {expected}")]
    OwnerMismatch { expected: String, found: String },

    /// Token lifetime is zero or beyond the configured maximum.
    #[error("invalid token ttl {ttl_secs}s (max {max_secs}s)")]
    InvalidTtl { ttl_secs: u64, max_secs: u64 },

    /// Encoded payload exceeds the configured bound.
    #[error("payload of {len} bytes exceeds limit {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// Configuration rejected by [`SmabConfig::validate`](crate::SmabConfig::validate).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cryptographic failure: authentication failure or invalid signature.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Header, container or payload codec error.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Update token rejected.
    #[error("update token rejected: {0}")]
    Token(#[from] TokenError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Aggregation error.
    #[error("aggregation error: {0}")]
    Aggregate(#[from] AggregateError),
}

/// Result type for SMAB operations.
pub type Result<T> = std::result::Result<T, SmabError>;
