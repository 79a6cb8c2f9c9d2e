//! # Sharechain Testkit
//!
//! Testing utilities for sharechain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed blocks with known hashes that pin the hash contract
//! - **Generators**: proptest strategies for block data, chains and participants
//! - **Fixtures**: a coordinator over in-memory stores with named participants
//!
//! ## Golden Vectors
//!
//! Any implementation that reproduces these hashes can verify a ledger
//! written by this one:
//!
//! ```rust
//! use sharechain_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, hash) in verify_all_vectors() {
//!     assert!(ok, "{} hashed to {}", name, hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sharechain_testkit::generators::chain;
//!
//! proptest! {
//!     #[test]
//!     fn built_chains_validate(blocks in chain(8)) {
//!         prop_assert!(sharechain_core::is_valid(&blocks));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use sharechain_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_participants(&["alice", "bob"]);
//! let alice = fixture.participant("alice");
//! assert_eq!(alice.id, "alice");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{Participant, TestFixture};
pub use generators::{block_data, chain, mutate, BlockField};
pub use vectors::{all_vectors, golden_chain, verify_all_vectors, GoldenVector};
