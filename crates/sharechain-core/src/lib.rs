//! # Sharechain Core
//!
//! Pure primitives for the sharechain ledger: blocks, canonical encoding,
//! and the hash-chain rules that link them.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the ledger data structures, and every function here is safe to call
//! concurrently.
//!
//! ## Key Types
//!
//! - [`Block`] - One hash-committed entry in the ledger
//! - [`BlockData`] - The application record a block commits to
//! - [`Sha256Hash`] - 32-byte digest used for block and content hashes
//! - [`ChainValidationError`] - The first point where a chain diverges
//!
//! ## Hash Contract
//!
//! A block hash is `hex(SHA-256(index || timestamp || canonical_json(data) || previous_hash))`.
//! See [`canonical`] for the exact byte layout every producer must reproduce.

pub mod block;
pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod error;

pub use block::{now_timestamp, Block, BlockData, GENESIS_PREVIOUS_HASH};
pub use canonical::{canonical_data_bytes, hash_input};
pub use chain::{append, append_at, compute_hash, is_valid, validate};
pub use crypto::Sha256Hash;
pub use error::{ChainError, ChainValidationError, DivergenceKind, Result};
