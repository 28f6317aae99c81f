//! # SMAB Testkit
//!
//! Testing utilities for SMAB files.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed inputs with expected signing messages,
//!   signatures and key hashes, for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: an owner, a cheap KDF configuration and a fixed clock
//!
//! ## Golden Vectors
//!
//! ```rust
//! use smab_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, signature) in verify_all_vectors() {
//!     assert!(matches, "{name}: {signature}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use smab_testkit::generators::{actor_base_payload, AllowListDelta};
//!
//! proptest! {
//!     #[test]
//!     fn removal_wins(delta: AllowListDelta) {
//!         let next = delta.current.apply_delta(&delta.add, &delta.remove);
//!         prop_assert_eq!(next, delta.expected());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use smab_testkit::fixtures::{demo_payload, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let bytes = fixture.create(&demo_payload()).unwrap();
//! assert_eq!(fixture.open(&bytes).unwrap().description(), "demo");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{demo_payload, fixture_config, multi_party_fixtures, TestFixture};
pub use generators::{actor_base_payload, AllowListDelta};
pub use vectors::{header_vectors, token_vectors, verify_all_vectors, HeaderVector, TokenVector};
