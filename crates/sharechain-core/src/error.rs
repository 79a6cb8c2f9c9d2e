//! Error types for the sharechain core.

use thiserror::Error;

/// Errors that can occur while building blocks.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The block data cannot be canonically encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted block could not be decoded.
    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Why a chain stopped validating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceKind {
    /// The stored hash does not match the hash recomputed from the block's fields.
    HashMismatch,
    /// `previous_hash` does not match the preceding block's `hash`.
    BrokenLink,
    /// The index is not exactly one more than the preceding block's index.
    IndexGap,
    /// A block claiming index 0 does not carry the genesis `previous_hash`.
    BadGenesis,
    /// The block's data could not be re-encoded for hashing.
    Unencodable,
}

/// The first divergence found while validating a chain.
///
/// `position` is the offset into the validated slice; `index` is the index
/// the block declares (which may itself be the tampered field).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chain diverges at position {position} (declared index {index}): {kind:?}")]
pub struct ChainValidationError {
    pub position: usize,
    pub index: u64,
    pub kind: DivergenceKind,
}
