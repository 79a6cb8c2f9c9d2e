//! Error types for sharing operations.

use sharechain_core::{ChainError, ChainValidationError};
use sharechain_envelope::EnvelopeError;
use sharechain_store::StoreError;
use thiserror::Error;

use crate::directory::DirectoryError;

/// Errors that can occur while sharing or maintaining the ledger.
#[derive(Debug, Error)]
pub enum ShareError {
    /// A block could not be built.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// The stored ledger does not validate.
    #[error("ledger validation failed: {0}")]
    Validation(#[from] ChainValidationError),

    /// Encryption or key-wrapping error.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Key directory lookup failed.
    #[error("key directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A re-wrapped key did not open to the original content key.
    ///
    /// The whole group is abandoned; nothing was written.
    #[error("share verification failed for object {object_id}")]
    ShareVerificationFailed { object_id: String },

    /// The ledger tail kept moving; every append attempt lost.
    #[error("ledger append conflict after {attempts} attempts")]
    LedgerAppendConflict { attempts: u32 },

    /// A share needs at least one object.
    #[error("cannot share an empty group")]
    EmptyGroup,

    /// A block does not describe the group it is being completed for.
    #[error("block does not match share: {0}")]
    BlockMismatch(String),
}

/// Result type for sharing operations.
pub type Result<T> = std::result::Result<T, ShareError>;
