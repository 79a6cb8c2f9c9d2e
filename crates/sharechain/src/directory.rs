//! Key directory: where participant key material comes from.
//!
//! The application owns identities and authentication. The coordinator
//! only needs to look up public keys, and to obtain a private key when the
//! caller is allowed to act as that participant.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use sharechain_envelope::{ParticipantKeypair, X25519PublicKey, X25519SecretKey};
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors from key lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No key is registered for this participant.
    #[error("participant not found: {0}")]
    NotFound(String),

    /// The caller may not use this participant's private key.
    #[error("not authorized to use the private key of {0}")]
    Unauthorized(String),
}

/// Source of participant key material.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Look up a participant's public key.
    async fn get_public_key(&self, participant_id: &str) -> Result<X25519PublicKey, DirectoryError>;

    /// Obtain a participant's private key.
    async fn get_private_key(&self, participant_id: &str)
        -> Result<X25519SecretKey, DirectoryError>;
}

struct Entry {
    public: X25519PublicKey,
    secret: Option<Zeroizing<[u8; 32]>>,
}

/// In-memory key directory.
///
/// Private keys are only handed out for participants that have been
/// explicitly authorized.
#[derive(Default)]
pub struct MemoryKeyDirectory {
    entries: RwLock<HashMap<String, Entry>>,
    authorized: RwLock<HashSet<String>>,
}

impl MemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant with both halves of its key pair.
    pub fn register(&self, participant_id: impl Into<String>, keypair: &ParticipantKeypair) {
        let entry = Entry {
            public: keypair.public_key(),
            secret: Some(keypair.secret().to_bytes()),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(participant_id.into(), entry);
    }

    /// Register a participant whose private key this directory never holds.
    pub fn register_public(&self, participant_id: impl Into<String>, public: X25519PublicKey) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                participant_id.into(),
                Entry {
                    public,
                    secret: None,
                },
            );
    }

    /// Allow private-key access for a participant.
    pub fn authorize(&self, participant_id: impl Into<String>) {
        self.authorized
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(participant_id.into());
    }

    /// Withdraw private-key access for a participant.
    pub fn revoke(&self, participant_id: &str) {
        self.authorized
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(participant_id);
    }
}

#[async_trait]
impl KeyDirectory for MemoryKeyDirectory {
    async fn get_public_key(&self, participant_id: &str) -> Result<X25519PublicKey, DirectoryError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(participant_id)
            .map(|e| e.public)
            .ok_or_else(|| DirectoryError::NotFound(participant_id.to_string()))
    }

    async fn get_private_key(
        &self,
        participant_id: &str,
    ) -> Result<X25519SecretKey, DirectoryError> {
        let authorized = self
            .authorized
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(participant_id);

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .get(participant_id)
            .ok_or_else(|| DirectoryError::NotFound(participant_id.to_string()))?;

        match (&entry.secret, authorized) {
            (Some(secret), true) => Ok(X25519SecretKey::from_bytes(**secret)),
            _ => Err(DirectoryError::Unauthorized(participant_id.to_string())),
        }
    }
}
