//! Error types for envelope encryption.

use thiserror::Error;

/// Errors that can occur during envelope operations.
///
/// None of these ever carry partially decrypted data.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Ciphertext failed authentication or is structurally invalid.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Key material has the wrong shape for the cipher.
    #[error("key mismatch: expected {expected} bytes, got {got}")]
    KeyMismatch { expected: usize, got: usize },

    /// A wrapped key does not open with the supplied private key, or is malformed.
    #[error("key unwrap failed: {0}")]
    KeyUnwrap(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
