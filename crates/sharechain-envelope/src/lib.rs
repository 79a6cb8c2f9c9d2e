//! # Sharechain Envelope
//!
//! Envelope encryption for shared documents.
//!
//! ## Encryption Model
//!
//! Encrypted content uses a two-layer key model:
//!
//! 1. **Content Key**: A symmetric key (ChaCha20-Poly1305) that encrypts the document
//! 2. **Wrapped Keys**: The content key sealed to a participant's X25519 public key
//!
//! Sharing a document never touches its ciphertext. The owner unwraps the
//! content key and wraps it again for the recipient ([`rewrap_key`]); the
//! key value is identical before and after.
//!
//! ## Usage
//!
//! ```rust
//! use sharechain_envelope::{
//!     decrypt, encrypt, generate_content_key, rewrap_key, unwrap_key, wrap_key,
//!     ParticipantKeypair,
//! };
//!
//! let owner = ParticipantKeypair::generate();
//! let friend = ParticipantKeypair::generate();
//!
//! let key = generate_content_key();
//! let ciphertext = encrypt(b"quarterly numbers", &key).unwrap();
//! let for_owner = wrap_key(&key, &owner.public_key()).unwrap();
//!
//! let for_friend = rewrap_key(&for_owner, owner.secret(), &friend.public_key()).unwrap();
//! let recovered = unwrap_key(&for_friend, friend.secret()).unwrap();
//! assert_eq!(decrypt(&ciphertext, &recovered).unwrap(), b"quarterly numbers");
//! ```

pub mod content;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod object;
pub mod wrap;

pub use content::{decrypt, decrypt_with_key_bytes, encrypt, CONTENT_FORMAT_V1};
pub use crypto::{
    generate_content_key, ContentKey, EncryptionNonce, ParticipantKeypair, X25519PublicKey,
    X25519SecretKey,
};
pub use envelope::KeyEnvelope;
pub use error::{EnvelopeError, Result};
pub use object::{
    combined_content_hash, content_hash, open_content, seal_content, EncryptedObject, KeyState,
};
pub use wrap::{
    open_envelope, rewrap_key, unwrap_key, wrap_key, KeyWrap, SealedBoxWrap, WrapFormat,
    WrapWitness, WrappedKey,
};
