//! # SMAB Store
//!
//! Persistence for modular actor base files.
//!
//! ## Key Types
//!
//! - [`SqliteNonceStore`] - persistent [`NonceStore`](smab_perms::NonceStore)
//!   for consumed update-token nonces
//! - [`write_container_file`] / [`read_container_file`] - atomic container I/O
//!
//! ## Usage
//!
//! ```rust,no_run
//! use smab_store::SqliteNonceStore;
//!
//! let nonces = SqliteNonceStore::open("nonces.db").unwrap();
//! // token.apply(&header, &nonces, &clock)?;
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic writes**: temp file, fsync, rename; the temp file is removed
//!   on failure
//! - **Single writer per file id**: the format has no concurrency field, so
//!   callers serialize writers to the same file

pub mod error;
pub mod files;
pub mod migration;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use files::{read_container, read_container_file, write_container, write_container_file};
pub use sqlite::SqliteNonceStore;
