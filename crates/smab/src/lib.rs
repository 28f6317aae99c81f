//! # SMAB
//!
//! Modular actor base files: a bundle of character-appearance assets packed
//! into one encrypted, owner-signed container whose allow-list can be
//! amended later without re-encrypting the payload.
//!
//! ## Overview
//!
//! - [`Smab::create_container`] derives keys from a password, seals a
//!   payload and signs the header. [`Smab::export_object`] aggregates the
//!   payload from modded files first.
//! - [`Smab::open_container`] checks the password, decrypts, verifies the
//!   header signature and returns an [`ActorBaseData`] view.
//! - [`Smab::issue_update_token`] lets the owner grant or revoke hashes.
//! - [`Smab::apply_update_token`] / [`Smab::amend_container`] accept a token
//!   and produce a new signed header over the same ciphertext.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use smab::{ActorBaseFileData, Keypair, Smab, SmabConfig};
//!
//! let smab = Smab::in_memory(SmabConfig::default()).unwrap();
//! let owner = Keypair::generate();
//!
//! let bytes = smab
//!     .create_container(b"hunter2", &owner, &ActorBaseFileData::with_description("demo"))
//!     .unwrap();
//! let view = smab.open_container(&bytes, b"hunter2").unwrap();
//! assert_eq!(view.description(), "demo");
//! ```
//!
//! ## Re-exports
//!
//! - `smab::core` - key derivation, AEAD, signatures
//! - `smab::format` - header, container and payload codecs
//! - `smab::perms` - update tokens and replay protection
//! - `smab::aggregate` - payload aggregation from modded files
//! - `smab::store` - SQLite nonce store and atomic file I/O

pub mod config;
pub mod engine;
pub mod error;
pub mod view;

pub use smab_aggregate as aggregate;
pub use smab_core as core;
pub use smab_format as format;
pub use smab_perms as perms;
pub use smab_store as store;

pub use config::SmabConfig;
pub use engine::Smab;
pub use error::{Result, SmabError};
pub use view::{ActorBaseData, Replacement};

pub use smab_core::{AllowList, ContentHash, FileId, Keypair, OwnerPublicKey};
pub use smab_format::{ActorBaseFileData, FileModData, FileSwap, SmabHeader};
pub use smab_perms::{UpdateToken, UpdateTokenPayload};
