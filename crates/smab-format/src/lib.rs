//! # SMAB Format
//!
//! Byte-level formats of a modular actor base file.
//!
//! ## Overview
//!
//! A container is a small binary frame around a JSON header and a sealed
//! payload:
//!
//! ```text
//! magic "SMAB" | version u8 | header_len u32 | header JSON
//! | nonce [12] | tag [16] | ciphertext_len u32 | ciphertext
//! ```
//!
//! All integers are little-endian.
//!
//! - [`SmabHeader`] - signed metadata: id, salt, key hash, owner key, allow-lists
//! - [`Container`] - the outer frame
//! - [`ActorBaseFileData`] - the plaintext payload, with [`FileModData`] and
//!   [`FileSwap`] records
//!
//! Headers are never edited in place. A new allow-list means a new header
//! with a new owner signature; see [`SmabHeader::with_allowed_hashes`].

pub mod container;
pub mod error;
pub mod header;
pub mod payload;

pub use container::{Container, CONTAINER_VERSION, DEFAULT_MAX_SECTION_LEN, MAGIC};
pub use error::{FormatError, Result};
pub use header::{SmabHeader, HEADER_SIGN_DOMAIN, HEADER_VERSION};
pub use payload::{normalize_game_path, ActorBaseFileData, FileModData, FileSwap};
