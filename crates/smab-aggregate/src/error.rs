//! Error types for content aggregation.

use smab_core::ContentHash;
use smab_format::FormatError;
use thiserror::Error;

/// Errors that can occur while aggregating modded files.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// No local file backs this hash. Recorded in the aggregation report;
    /// the group is skipped and the export continues.
    #[error("unresolved content hash: {0}")]
    UnresolvedContentHash(ContentHash),

    /// A modded file was declared without any game path.
    #[error("modded file has no game paths")]
    EmptyGamePaths,

    /// An exclusion pattern failed to compile.
    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The aggregated payload breaks a record invariant.
    #[error("aggregated payload invalid: {0}")]
    Format(#[from] FormatError),
}

/// Result type for aggregation.
pub type Result<T> = std::result::Result<T, AggregateError>;
