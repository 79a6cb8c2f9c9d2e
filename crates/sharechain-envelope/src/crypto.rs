//! Cryptographic primitives for envelope encryption.
//!
//! Provides X25519 key agreement and ChaCha20-Poly1305 authenticated encryption.
//! Secret material is zeroized on drop and never implements `Debug` output
//! of its bytes.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{EnvelopeError, Result};

/// Length of a content key in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

/// Length of a ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Length of the Poly1305 authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Domain separation for deriving wrapping keys from X25519 shared secrets.
const WRAP_KDF_CONTEXT: &str = "sharechain-envelope v1 key wrap";

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub(crate) fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Pub({})", &self.to_hex()[..16])
    }
}

/// An X25519 private key.
///
/// Not `Clone` and not `Debug`. The inner `StaticSecret` zeroizes on drop.
pub struct X25519SecretKey(StaticSecret);

impl X25519SecretKey {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(OsRng))
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Export the raw bytes. The copy is zeroized when dropped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    /// Key agreement with a peer's public key.
    ///
    /// Returns `None` when the result is non-contributory (the peer key was
    /// a low-order point), which never happens for honestly generated keys.
    pub(crate) fn diffie_hellman(&self, peer: &X25519PublicKey) -> Option<SharedKey> {
        let shared = self.0.diffie_hellman(&peer.to_dalek());
        if !shared.was_contributory() {
            return None;
        }
        Some(SharedKey(*shared.as_bytes()))
    }
}

/// A participant's X25519 key pair.
pub struct ParticipantKeypair {
    secret: X25519SecretKey,
    public: X25519PublicKey,
}

impl ParticipantKeypair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        Self::from_secret(X25519SecretKey::generate())
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_secret(X25519SecretKey::from_bytes(seed))
    }

    /// Wrap an existing secret.
    pub fn from_secret(secret: X25519SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Borrow the private key.
    pub fn secret(&self) -> &X25519SecretKey {
        &self.secret
    }

    /// Give up the pair and keep the private key.
    pub fn into_secret(self) -> X25519SecretKey {
        self.secret
    }
}

impl fmt::Debug for ParticipantKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantKeypair({:?})", self.public)
    }
}

/// A shared secret derived from X25519 key agreement.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SharedKey([u8; 32]);

impl SharedKey {
    /// Derive the symmetric key that wraps a content key.
    ///
    /// Binds both public keys of the exchange into the derivation.
    pub(crate) fn derive_wrapping_key(
        &self,
        ephemeral_public: &X25519PublicKey,
        recipient_public: &X25519PublicKey,
    ) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key(WRAP_KDF_CONTEXT);
        hasher.update(&self.0);
        hasher.update(ephemeral_public.as_bytes());
        hasher.update(recipient_public.as_bytes());
        ContentKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit symmetric content key for ChaCha20-Poly1305.
///
/// Zeroized on drop. Comparison does not short-circuit.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_LEN]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; CONTENT_KEY_LEN] =
            bytes.try_into().map_err(|_| EnvelopeError::KeyMismatch {
                expected: CONTENT_KEY_LEN,
                got: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| EnvelopeError::Encryption(e.to_string()))
    }

    /// Decrypt data with this key. Fails if authentication fails.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| EnvelopeError::Integrity("authentication failed".into()))
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for ContentKey {}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// Generate a fresh content key from the OS RNG.
pub fn generate_content_key() -> ContentKey {
    ContentKey::generate()
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; NONCE_LEN]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}
