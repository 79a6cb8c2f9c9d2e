//! Key wrapping: sealing a content key to a participant's public key.
//!
//! The default scheme ([`SealedBoxWrap`]) is an X25519 sealed box. Every wrap
//! generates a fresh ephemeral key pair, derives a wrapping key from the
//! ECDH shared secret (Blake3 `derive_key`, binding both public keys), and
//! encrypts the content key with ChaCha20-Poly1305 under a random nonce.
//! Two wraps of the same key for the same recipient never produce the same
//! bytes.
//!
//! The wrapper keeps the ephemeral secret in a [`WrapWitness`]. With it the
//! wrapper can derive the same shared secret the recipient will, and so
//! prove a freshly wrapped key opens for the recipient without ever holding
//! the recipient's private key.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::crypto::{ContentKey, EncryptionNonce, X25519PublicKey, X25519SecretKey};
use crate::envelope::KeyEnvelope;
use crate::error::{EnvelopeError, Result};

/// Format identifier for wrapped keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum WrapFormat {
    /// Ephemeral X25519 + Blake3 KDF + ChaCha20-Poly1305.
    X25519ChaCha20Poly1305 = 1,
}

/// A content key sealed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Wrapping scheme.
    pub format: WrapFormat,

    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used for encryption.
    pub nonce: EncryptionNonce,

    /// The content key, encrypted with the derived wrapping key (includes tag).
    pub encrypted_key: Vec<u8>,
}

impl WrappedKey {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| EnvelopeError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// Malformed input is reported as an unwrap failure: the caller cannot
    /// tell a corrupted wrapped key from one that was never valid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes)
            .map_err(|e| EnvelopeError::KeyUnwrap(format!("malformed wrapped key: {}", e)))
    }
}

/// The ephemeral secret behind one wrap, kept by the wrapper for verification.
pub struct WrapWitness {
    ephemeral: X25519SecretKey,
    recipient: X25519PublicKey,
}

impl WrapWitness {
    /// The recipient this witness was produced for.
    pub fn recipient(&self) -> X25519PublicKey {
        self.recipient
    }
}

impl fmt::Debug for WrapWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrapWitness(recipient={:?})", self.recipient)
    }
}

/// A key-wrapping scheme.
///
/// Implementations must be non-deterministic per wrap and must fail
/// (never return a different key) when unwrapping with the wrong secret.
pub trait KeyWrap: Send + Sync {
    /// Wrap `key` for `recipient`, returning the witness of the wrap.
    fn wrap_key_with_witness(
        &self,
        key: &ContentKey,
        recipient: &X25519PublicKey,
    ) -> Result<(WrappedKey, WrapWitness)>;

    /// Open a wrapped key using the witness of the wrap that produced it.
    fn open_with_witness(&self, wrapped: &WrappedKey, witness: &WrapWitness) -> Result<ContentKey>;

    /// Unwrap with the recipient's private key.
    fn unwrap_key(&self, wrapped: &WrappedKey, secret: &X25519SecretKey) -> Result<ContentKey>;

    /// Wrap `key` for `recipient`.
    fn wrap_key(&self, key: &ContentKey, recipient: &X25519PublicKey) -> Result<WrappedKey> {
        self.wrap_key_with_witness(key, recipient)
            .map(|(wrapped, _)| wrapped)
    }

    /// Unwrap with `owner_secret`, then wrap the same key for `new_recipient`.
    fn rewrap_key(
        &self,
        wrapped: &WrappedKey,
        owner_secret: &X25519SecretKey,
        new_recipient: &X25519PublicKey,
    ) -> Result<WrappedKey> {
        let key = self.unwrap_key(wrapped, owner_secret)?;
        self.wrap_key(&key, new_recipient)
    }

    /// Unwrap into a [`KeyEnvelope`] that records where the key came from.
    fn open_envelope(&self, wrapped: &WrappedKey, secret: &X25519SecretKey) -> Result<KeyEnvelope> {
        let key = self.unwrap_key(wrapped, secret)?;
        Ok(KeyEnvelope::new(
            key,
            secret.public_key(),
            wrapped.ephemeral_public,
        ))
    }
}

/// X25519 sealed-box key wrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct SealedBoxWrap;

impl SealedBoxWrap {
    fn open(
        wrapped: &WrappedKey,
        ours: &X25519SecretKey,
        theirs: &X25519PublicKey,
        recipient: &X25519PublicKey,
    ) -> Result<ContentKey> {
        match wrapped.format {
            WrapFormat::X25519ChaCha20Poly1305 => {}
        }

        let shared = ours
            .diffie_hellman(theirs)
            .ok_or_else(|| EnvelopeError::KeyUnwrap("non-contributory key agreement".into()))?;
        let wrapping_key = shared.derive_wrapping_key(&wrapped.ephemeral_public, recipient);

        let key_bytes = Zeroizing::new(
            wrapping_key
                .decrypt(&wrapped.encrypted_key, &wrapped.nonce)
                .map_err(|_| {
                    EnvelopeError::KeyUnwrap("wrapped key does not open with this key".into())
                })?,
        );

        ContentKey::from_slice(&key_bytes).map_err(|_| {
            EnvelopeError::KeyUnwrap(format!(
                "invalid key length: expected 32, got {}",
                key_bytes.len()
            ))
        })
    }
}

impl KeyWrap for SealedBoxWrap {
    fn wrap_key_with_witness(
        &self,
        key: &ContentKey,
        recipient: &X25519PublicKey,
    ) -> Result<(WrappedKey, WrapWitness)> {
        let ephemeral = X25519SecretKey::generate();
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.diffie_hellman(recipient).ok_or_else(|| {
            EnvelopeError::Encryption("recipient public key is a low-order point".into())
        })?;
        let wrapping_key = shared.derive_wrapping_key(&ephemeral_public, recipient);

        let nonce = EncryptionNonce::generate();
        let encrypted_key = wrapping_key.encrypt(key.as_bytes(), &nonce)?;

        let wrapped = WrappedKey {
            format: WrapFormat::X25519ChaCha20Poly1305,
            ephemeral_public,
            nonce,
            encrypted_key,
        };
        let witness = WrapWitness {
            ephemeral,
            recipient: *recipient,
        };
        Ok((wrapped, witness))
    }

    fn open_with_witness(&self, wrapped: &WrappedKey, witness: &WrapWitness) -> Result<ContentKey> {
        if witness.ephemeral.public_key() != wrapped.ephemeral_public {
            return Err(EnvelopeError::KeyUnwrap(
                "witness does not belong to this wrapped key".into(),
            ));
        }
        Self::open(wrapped, &witness.ephemeral, &witness.recipient, &witness.recipient)
    }

    fn unwrap_key(&self, wrapped: &WrappedKey, secret: &X25519SecretKey) -> Result<ContentKey> {
        let recipient = secret.public_key();
        Self::open(wrapped, secret, &wrapped.ephemeral_public, &recipient)
    }
}

/// Wrap a content key for a recipient with the default scheme.
pub fn wrap_key(key: &ContentKey, recipient: &X25519PublicKey) -> Result<WrappedKey> {
    SealedBoxWrap.wrap_key(key, recipient)
}

/// Unwrap a content key with the default scheme.
pub fn unwrap_key(wrapped: &WrappedKey, secret: &X25519SecretKey) -> Result<ContentKey> {
    SealedBoxWrap.unwrap_key(wrapped, secret)
}

/// Re-wrap a content key for a new recipient with the default scheme.
pub fn rewrap_key(
    wrapped: &WrappedKey,
    owner_secret: &X25519SecretKey,
    new_recipient: &X25519PublicKey,
) -> Result<WrappedKey> {
    SealedBoxWrap.rewrap_key(wrapped, owner_secret, new_recipient)
}

/// Unwrap into a [`KeyEnvelope`] with the default scheme.
pub fn open_envelope(wrapped: &WrappedKey, secret: &X25519SecretKey) -> Result<KeyEnvelope> {
    SealedBoxWrap.open_envelope(wrapped, secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ParticipantKeypair;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_roundtrip() {
        let recipient = ParticipantKeypair::generate();
        let key = ContentKey::generate();

        let wrapped = wrap_key(&key, &recipient.public_key()).unwrap();
        let recovered = unwrap_key(&wrapped, recipient.secret()).unwrap();

        assert_eq!(key, recovered);
    }

    #[test]
    fn test_wrap_non_deterministic() {
        let recipient = ParticipantKeypair::generate();
        let key = ContentKey::generate();

        let a = wrap_key(&key, &recipient.public_key()).unwrap();
        let b = wrap_key(&key, &recipient.public_key()).unwrap();

        assert_ne!(a.ephemeral_public, b.ephemeral_public);
        assert_ne!(a.encrypted_key, b.encrypted_key);
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let recipient = ParticipantKeypair::generate();
        let stranger = ParticipantKeypair::generate();
        let wrapped = wrap_key(&ContentKey::generate(), &recipient.public_key()).unwrap();

        assert!(matches!(
            unwrap_key(&wrapped, stranger.secret()),
            Err(EnvelopeError::KeyUnwrap(_))
        ));
    }

    #[test]
    fn test_tampered_wrapped_key_fails() {
        let recipient = ParticipantKeypair::generate();
        let mut wrapped = wrap_key(&ContentKey::generate(), &recipient.public_key()).unwrap();
        wrapped.encrypted_key[0] ^= 0x01;

        assert!(matches!(
            unwrap_key(&wrapped, recipient.secret()),
            Err(EnvelopeError::KeyUnwrap(_))
        ));
    }

    #[test]
    fn test_swapped_ephemeral_fails() {
        let recipient = ParticipantKeypair::generate();
        let mut wrapped = wrap_key(&ContentKey::generate(), &recipient.public_key()).unwrap();
        wrapped.ephemeral_public = ParticipantKeypair::generate().public_key();

        assert!(unwrap_key(&wrapped, recipient.secret()).is_err());
    }

    #[test]
    fn test_bytes_roundtrip_and_malformed() {
        let recipient = ParticipantKeypair::generate();
        let key = ContentKey::generate();
        let wrapped = wrap_key(&key, &recipient.public_key()).unwrap();

        let bytes = wrapped.to_bytes().unwrap();
        let parsed = WrappedKey::from_bytes(&bytes).unwrap();
        assert_eq!(unwrap_key(&parsed, recipient.secret()).unwrap(), key);

        assert!(matches!(
            WrappedKey::from_bytes(&bytes[..bytes.len() / 2]),
            Err(EnvelopeError::KeyUnwrap(_))
        ));
    }

    #[test]
    fn test_rewrap_preserves_key() {
        let owner = ParticipantKeypair::generate();
        let friend = ParticipantKeypair::generate();
        let key = ContentKey::generate();

        let for_owner = wrap_key(&key, &owner.public_key()).unwrap();
        let for_friend = rewrap_key(&for_owner, owner.secret(), &friend.public_key()).unwrap();

        assert_eq!(unwrap_key(&for_friend, friend.secret()).unwrap(), key);
        assert!(unwrap_key(&for_friend, owner.secret()).is_err());
    }

    #[test]
    fn test_rewrap_requires_owner_secret() {
        let owner = ParticipantKeypair::generate();
        let intruder = ParticipantKeypair::generate();
        let for_owner = wrap_key(&ContentKey::generate(), &owner.public_key()).unwrap();

        assert!(matches!(
            rewrap_key(&for_owner, intruder.secret(), &intruder.public_key()),
            Err(EnvelopeError::KeyUnwrap(_))
        ));
    }

    #[test]
    fn test_witness_opens_own_wrap() {
        let recipient = ParticipantKeypair::generate();
        let key = ContentKey::generate();

        let (wrapped, witness) = SealedBoxWrap
            .wrap_key_with_witness(&key, &recipient.public_key())
            .unwrap();

        assert_eq!(witness.recipient(), recipient.public_key());
        assert_eq!(SealedBoxWrap.open_with_witness(&wrapped, &witness).unwrap(), key);
    }

    #[test]
    fn test_witness_rejects_other_wrap() {
        let recipient = ParticipantKeypair::generate();
        let key = ContentKey::generate();

        let (_, witness) = SealedBoxWrap
            .wrap_key_with_witness(&key, &recipient.public_key())
            .unwrap();
        let other = wrap_key(&key, &recipient.public_key()).unwrap();

        assert!(SealedBoxWrap.open_with_witness(&other, &witness).is_err());
    }

    #[test]
    fn test_open_envelope_provenance() {
        let recipient = ParticipantKeypair::generate();
        let key = ContentKey::generate();
        let wrapped = wrap_key(&key, &recipient.public_key()).unwrap();

        let envelope = open_envelope(&wrapped, recipient.secret()).unwrap();
        assert_eq!(envelope.key(), &key);
        assert_eq!(envelope.recipient(), recipient.public_key());
        assert_eq!(envelope.ephemeral_public(), wrapped.ephemeral_public);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_wrap_unwrap(key in any::<[u8; 32]>(), seed in any::<[u8; 32]>()) {
            let recipient = ParticipantKeypair::from_seed(seed);
            let key = ContentKey::from_bytes(key);

            let wrapped = wrap_key(&key, &recipient.public_key()).unwrap();
            prop_assert_eq!(unwrap_key(&wrapped, recipient.secret()).unwrap(), key);
        }

        #[test]
        fn prop_rewrap_preserves_identity(
            key in any::<[u8; 32]>(),
            seed1 in any::<[u8; 32]>(),
            seed2 in any::<[u8; 32]>(),
        ) {
            let first = ParticipantKeypair::from_seed(seed1);
            let second = ParticipantKeypair::from_seed(seed2);
            let key = ContentKey::from_bytes(key);

            let wrapped = wrap_key(&key, &first.public_key()).unwrap();
            let rewrapped = rewrap_key(&wrapped, first.secret(), &second.public_key()).unwrap();
            prop_assert_eq!(unwrap_key(&rewrapped, second.secret()).unwrap(), key);
        }
    }
}
