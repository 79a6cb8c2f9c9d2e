//! Encrypted objects and their key lifecycle.
//!
//! An object starts out with its content key wrapped for the owner only
//! ([`KeyState::Created`]). A successful share adds a receiver-wrapped key
//! ([`KeyState::Shared`]); sharing again replaces the receiver. The
//! owner-wrapped key is never removed.

use serde::{Deserialize, Serialize};
use sharechain_core::Sha256Hash;

use crate::content;
use crate::crypto::{ContentKey, X25519PublicKey, X25519SecretKey};
use crate::error::{EnvelopeError, Result};
use crate::wrap::{self, WrappedKey};

/// Where an object is in its key lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyState {
    /// Only the owner can open the object.
    Created,
    /// The owner and one receiver can open the object.
    Shared { receiver_id: String },
}

/// Metadata for one encrypted document.
///
/// The ciphertext itself lives with the caller; this record carries only the
/// hash that identifies it and the wrapped keys that open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObject {
    pub object_id: String,
    pub file_name: String,
    /// Lowercase hex SHA-256 of the ciphertext bytes.
    pub content_hash: String,
    pub owner_wrapped_key: WrappedKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_wrapped_key: Option<WrappedKey>,
}

impl EncryptedObject {
    /// Current lifecycle state.
    pub fn key_state(&self) -> KeyState {
        match (&self.receiver_id, &self.receiver_wrapped_key) {
            (Some(receiver_id), Some(_)) => KeyState::Shared {
                receiver_id: receiver_id.clone(),
            },
            _ => KeyState::Created,
        }
    }

    /// Record a receiver-wrapped key, replacing any previous receiver.
    pub fn attach_receiver(&mut self, receiver_id: impl Into<String>, wrapped: WrappedKey) {
        self.receiver_id = Some(receiver_id.into());
        self.receiver_wrapped_key = Some(wrapped);
    }

    /// Check that `ciphertext` is the content this object describes.
    pub fn verify_content(&self, ciphertext: &[u8]) -> Result<()> {
        let actual = content_hash(ciphertext);
        if actual != self.content_hash {
            return Err(EnvelopeError::Integrity(format!(
                "content hash mismatch for {}: expected {}, got {}",
                self.object_id, self.content_hash, actual
            )));
        }
        Ok(())
    }

    /// Unwrap whichever key this secret opens: the owner's first, then the receiver's.
    pub fn unwrap_for(&self, secret: &X25519SecretKey) -> Result<ContentKey> {
        match wrap::unwrap_key(&self.owner_wrapped_key, secret) {
            Ok(key) => Ok(key),
            Err(owner_err) => match &self.receiver_wrapped_key {
                Some(receiver) => wrap::unwrap_key(receiver, secret),
                None => Err(owner_err),
            },
        }
    }
}

/// Lowercase hex SHA-256 of a ciphertext.
pub fn content_hash(ciphertext: &[u8]) -> String {
    Sha256Hash::hash(ciphertext).to_hex()
}

/// The hash recorded on the ledger for a group of objects.
///
/// A single object contributes its own hash. Larger groups hash the member
/// hashes joined by `\n`, in the order given.
pub fn combined_content_hash(objects: &[EncryptedObject]) -> String {
    match objects {
        [single] => single.content_hash.clone(),
        _ => {
            let joined = objects
                .iter()
                .map(|o| o.content_hash.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            Sha256Hash::hash(joined.as_bytes()).to_hex()
        }
    }
}

/// Encrypt new content for its owner.
///
/// Generates a fresh content key, encrypts, hashes the ciphertext and wraps
/// the key for `owner`. Returns the object record and the ciphertext.
pub fn seal_content(
    plaintext: &[u8],
    owner: &X25519PublicKey,
    object_id: impl Into<String>,
    file_name: impl Into<String>,
) -> Result<(EncryptedObject, Vec<u8>)> {
    let key = ContentKey::generate();
    let ciphertext = content::encrypt(plaintext, &key)?;
    let owner_wrapped_key = wrap::wrap_key(&key, owner)?;

    let object = EncryptedObject {
        object_id: object_id.into(),
        file_name: file_name.into(),
        content_hash: content_hash(&ciphertext),
        owner_wrapped_key,
        receiver_id: None,
        receiver_wrapped_key: None,
    };
    Ok((object, ciphertext))
}

/// Decrypt an object's content as its owner or its receiver.
///
/// The ciphertext is checked against `content_hash` before any key is touched.
pub fn open_content(
    object: &EncryptedObject,
    ciphertext: &[u8],
    secret: &X25519SecretKey,
) -> Result<Vec<u8>> {
    object.verify_content(ciphertext)?;
    let key = object.unwrap_for(secret)?;
    content::decrypt(ciphertext, &key)
}
