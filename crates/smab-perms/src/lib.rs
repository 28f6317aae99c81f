//! # SMAB Permissions
//!
//! Update tokens that amend a file's allow-list without touching its
//! encrypted payload.
//!
//! ## Overview
//!
//! The allow-list in a header decides which other content may be layered
//! onto a base file. Only the owner can change it, and only by issuing a
//! signed [`UpdateToken`]:
//!
//! 1. The owner calls [`UpdateToken::issue`] with the current header and the
//!    hashes to add and remove.
//! 2. Anyone holding the file calls [`UpdateToken::apply`], which checks the
//!    target id, both signatures and the expiry, consumes the nonce in a
//!    [`NonceStore`], and returns a new signed header.
//!
//! A token is valid only once per file. The nonce cache is shared mutable
//! state and every [`NonceStore`] makes check-and-record atomic.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use smab_perms::{MemoryNonceStore, SystemClock, UpdateToken};
//!
//! // let token = UpdateToken::issue(&owner, &header, add, remove, expires_at)?;
//! // let new_header = token.apply(&header, &MemoryNonceStore::new(), &SystemClock)?;
//! ```

pub mod clock;
pub mod error;
pub mod replay;
pub mod token;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, TokenError};
pub use replay::{MemoryNonceStore, NonceStore, TokenNonce, TOKEN_NONCE_LEN};
pub use token::{UpdateToken, UpdateTokenPayload, TOKEN_SIGN_DOMAIN};
