//! Unwrapped key material with its provenance.

use std::fmt;

use crate::content;
use crate::crypto::{ContentKey, X25519PublicKey};
use crate::error::Result;

/// A content key that has been unwrapped for a participant.
///
/// Holds plaintext key material, so it is neither `Serialize` nor `Clone`.
/// The key zeroizes when the envelope drops.
pub struct KeyEnvelope {
    key: ContentKey,
    recipient: X25519PublicKey,
    ephemeral_public: X25519PublicKey,
}

impl KeyEnvelope {
    pub(crate) fn new(
        key: ContentKey,
        recipient: X25519PublicKey,
        ephemeral_public: X25519PublicKey,
    ) -> Self {
        Self {
            key,
            recipient,
            ephemeral_public,
        }
    }

    /// The unwrapped content key.
    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    /// The participant the key was wrapped for.
    pub fn recipient(&self) -> X25519PublicKey {
        self.recipient
    }

    /// Ephemeral public key of the wrap this envelope was opened from.
    pub fn ephemeral_public(&self) -> X25519PublicKey {
        self.ephemeral_public
    }

    /// Decrypt content sealed under this key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        content::decrypt(ciphertext, &self.key)
    }

    /// Take the key out of the envelope.
    pub fn into_key(self) -> ContentKey {
        self.key
    }
}

impl fmt::Debug for KeyEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEnvelope")
            .field("key", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}
