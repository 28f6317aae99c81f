//! Error types for SMAB core primitives.

use thiserror::Error;

/// Errors raised by the cryptographic primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Signature did not verify against the given key and message.
    #[error("invalid signature")]
    InvalidSignature,

    /// Bytes do not describe a usable Ed25519 public key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// AEAD tag mismatch. Wrong key, wrong associated data and tampered
    /// ciphertext are deliberately reported as the same failure.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// The cipher refused to encrypt (buffer too large for the construction).
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Key derivation was asked for an impossible output.
    #[error("key derivation error: {0}")]
    KeyDerivationError(String),

    /// A content hash is empty or contains a separator character.
    #[error("invalid content hash: {0:?}")]
    InvalidContentHash(String),

    /// A fixed-length value had the wrong length.
    #[error("invalid length for {what}: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
