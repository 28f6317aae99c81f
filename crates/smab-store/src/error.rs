//! Error types for the store module.

use smab_format::FormatError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container bytes on disk could not be parsed.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
