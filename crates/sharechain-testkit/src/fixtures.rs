//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::BTreeMap;
use std::time::Duration;

use sharechain::{CoordinatorConfig, MemoryKeyDirectory, SharingCoordinator};
use sharechain_core::Sha256Hash;
use sharechain_envelope::ParticipantKeypair;
use sharechain_store::{MemoryLedger, MemoryObjectStore};

/// A named participant with a deterministic key pair.
pub struct Participant {
    pub id: String,
    pub keypair: ParticipantKeypair,
}

impl Participant {
    /// Create a participant whose keys are derived from its id.
    ///
    /// The seed is the SHA-256 of the id, so distinct ids get distinct keys.
    pub fn new(id: &str) -> Self {
        let Sha256Hash(seed) =
            Sha256Hash::hash_parts([b"sharechain-testkit participant".as_slice(), id.as_bytes()]);
        Self {
            id: id.to_string(),
            keypair: ParticipantKeypair::from_seed(seed),
        }
    }
}

/// A coordinator over in-memory stores plus a directory of participants.
pub struct TestFixture {
    pub coordinator: SharingCoordinator<MemoryLedger, MemoryObjectStore>,
    pub directory: MemoryKeyDirectory,
    participants: BTreeMap<String, Participant>,
}

impl TestFixture {
    /// Create an empty fixture with fast retry timings.
    pub fn new() -> Self {
        let config = CoordinatorConfig::default()
            .initial_backoff(Duration::from_millis(1))
            .max_backoff(Duration::from_millis(8));
        Self {
            coordinator: SharingCoordinator::new(
                MemoryLedger::new(),
                MemoryObjectStore::new(),
                config,
            ),
            directory: MemoryKeyDirectory::new(),
            participants: BTreeMap::new(),
        }
    }

    /// Create a fixture with each participant registered and authorized.
    pub fn with_participants(ids: &[&str]) -> Self {
        let mut fixture = Self::new();
        for id in ids {
            fixture.add_participant(id);
        }
        fixture
    }

    /// Register and authorize a participant.
    pub fn add_participant(&mut self, id: &str) -> &Participant {
        let participant = Participant::new(id);
        self.directory.register(id, &participant.keypair);
        self.directory.authorize(id);
        self.participants
            .entry(id.to_string())
            .or_insert(participant)
    }

    /// Look up a registered participant.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never registered.
    pub fn participant(&self, id: &str) -> &Participant {
        match self.participants.get(id) {
            Some(p) => p,
            None => panic!("participant {} not registered in fixture", id),
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharechain::{KeyDirectory, ShareContext};

    #[test]
    fn test_participant_keys_deterministic() {
        let a = Participant::new("alice");
        let b = Participant::new("alice");
        let c = Participant::new("bob");

        assert_eq!(a.keypair.public_key(), b.keypair.public_key());
        assert_ne!(a.keypair.public_key(), c.keypair.public_key());
    }

    #[test]
    fn test_long_ids_get_distinct_keys() {
        // Same bytes repeated, lengths 256 apart.
        let short = Participant::new(&"ab".repeat(10));
        let long = Participant::new(&"ab".repeat(138));

        assert_ne!(short.keypair.public_key(), long.keypair.public_key());
    }

    #[tokio::test]
    async fn test_fixture_share_roundtrip() {
        let fixture = TestFixture::with_participants(&["alice", "bob"]);
        let alice = fixture.participant("alice");
        fixture.coordinator.bootstrap().await.unwrap();

        assert_eq!(
            fixture.directory.get_public_key("bob").await.unwrap(),
            fixture.participant("bob").keypair.public_key()
        );

        let (object, _) = fixture
            .coordinator
            .seal_and_register(b"hi", &alice.keypair.public_key(), "obj", "hi.txt")
            .await
            .unwrap();
        let result = fixture
            .coordinator
            .share_with_directory(
                &fixture.directory,
                &[object],
                "alice",
                "bob",
                &ShareContext::new("hi.txt", "alice"),
            )
            .await
            .unwrap();

        assert_eq!(result.block.index, 1);
    }
}
