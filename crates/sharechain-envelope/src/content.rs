//! Authenticated content encryption.
//!
//! Output format: `version (1) || nonce (12) || ciphertext || tag (16)`.
//! Any modification of any byte makes [`decrypt`] fail.

use crate::crypto::{ContentKey, EncryptionNonce, NONCE_LEN, TAG_LEN};
use crate::error::{EnvelopeError, Result};

/// Format byte for ChaCha20-Poly1305 content with a random 96-bit nonce.
pub const CONTENT_FORMAT_V1: u8 = 1;

const HEADER_LEN: usize = 1 + NONCE_LEN;

/// Encrypt content under a content key.
pub fn encrypt(content: &[u8], key: &ContentKey) -> Result<Vec<u8>> {
    let nonce = EncryptionNonce::generate();
    let sealed = key.encrypt(content, &nonce)?;

    let mut out = Vec::with_capacity(HEADER_LEN + sealed.len());
    out.push(CONTENT_FORMAT_V1);
    out.extend_from_slice(nonce.as_bytes());
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt content produced by [`encrypt`].
pub fn decrypt(ciphertext: &[u8], key: &ContentKey) -> Result<Vec<u8>> {
    if ciphertext.len() < HEADER_LEN + TAG_LEN {
        return Err(EnvelopeError::Integrity(format!(
            "ciphertext too short: {} bytes",
            ciphertext.len()
        )));
    }

    let (header, sealed) = ciphertext.split_at(HEADER_LEN);
    if header[0] != CONTENT_FORMAT_V1 {
        return Err(EnvelopeError::Integrity(format!(
            "unsupported content format: {}",
            header[0]
        )));
    }

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&header[1..]);
    key.decrypt(sealed, &EncryptionNonce::from_bytes(nonce))
}

/// Decrypt with raw key bytes, rejecting keys of the wrong size first.
pub fn decrypt_with_key_bytes(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let key = ContentKey::from_slice(key)?;
    decrypt(ciphertext, &key)
}
