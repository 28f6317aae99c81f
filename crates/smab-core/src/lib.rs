//! # SMAB Core
//!
//! Pure primitives for modular actor base (SMAB) files: password-based key
//! derivation, authenticated encryption, owner signatures, and the canonical
//! byte encodings those signatures cover.
//!
//! This crate contains no I/O and no logging. Every function is a pure
//! computation that reports failure through [`CoreError`].
//!
//! ## Key Types
//!
//! - [`Keypair`] / [`OwnerPublicKey`] / [`OwnerSignature`] - Ed25519 owner identity
//! - [`FileSecret`] / [`KeyHash`] / [`Salt`] - values derived from a file password
//! - [`Sealed`] - detached ChaCha20-Poly1305 output (ciphertext, nonce, tag)
//! - [`FileId`] / [`ContentHash`] / [`AllowList`] - identifiers carried by headers
//!
//! ## Key Independence
//!
//! The verification hash stored in a header and the key that encrypts the
//! payload both come from the same password, but through separate
//! derivations (see [`kdf`]). Recovering one does not yield the other.

pub mod aead;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod kdf;
pub mod types;

pub use aead::{open, seal, AeadNonce, AuthTag, Sealed, NONCE_LEN, TAG_LEN};
pub use canonical::CanonicalWriter;
pub use crypto::{Keypair, OwnerPublicKey, OwnerSignature};
pub use error::{CoreError, Result};
pub use kdf::{
    derive_file_secret, derive_key_hash, verify_key_hash, FileSecret, KeyHash, Salt,
    DEFAULT_KDF_ITERATIONS, KEY_HASH_LEN, SALT_LEN,
};
pub use types::{AllowList, ContentHash, FileId};
