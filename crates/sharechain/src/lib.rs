//! # Sharechain
//!
//! Verified document sharing recorded on a hash-chained ledger.
//!
//! ## Overview
//!
//! - **Ledger**: an append-only chain of blocks; each block commits to the
//!   previous one by hash, so any edit to history is detectable
//! - **Envelopes**: documents are encrypted once under a content key; the
//!   key is wrapped per participant and re-wrapped to share
//! - **Coordinator**: rewraps, proves every new wrap opens, records the
//!   share on the ledger, then persists the receiver keys
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sharechain::{CoordinatorConfig, ShareContext, SharingCoordinator};
//! use sharechain::envelope::ParticipantKeypair;
//! use sharechain::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("sharechain.db").unwrap();
//!     let coordinator =
//!         SharingCoordinator::new(store.clone(), store, CoordinatorConfig::default());
//!     coordinator.bootstrap().await.unwrap();
//!
//!     let alice = ParticipantKeypair::generate();
//!     let bob = ParticipantKeypair::generate();
//!
//!     let (object, _ciphertext) = coordinator
//!         .seal_and_register(b"draft", &alice.public_key(), "doc-1", "draft.txt")
//!         .await
//!         .unwrap();
//!
//!     let context = ShareContext::new("draft.txt", "alice");
//!     let result = coordinator
//!         .share(&[object], alice.secret(), &bob.public_key(), "bob", &context)
//!         .await
//!         .unwrap();
//!     println!("recorded at block {}", result.block.index);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sharechain::core` - blocks and hash-chain rules
//! - `sharechain::envelope` - content encryption and key wrapping
//! - `sharechain::store` - ledger and object storage

pub mod config;
pub mod coordinator;
pub mod directory;
pub mod error;

pub use sharechain_core as core;
pub use sharechain_envelope as envelope;
pub use sharechain_store as store;

pub use config::CoordinatorConfig;
pub use coordinator::{ShareContext, ShareResult, SharingCoordinator};
pub use directory::{DirectoryError, KeyDirectory, MemoryKeyDirectory};
pub use error::{Result, ShareError};

pub use sharechain_core::{Block, BlockData};
pub use sharechain_envelope::{EncryptedObject, ParticipantKeypair, X25519PublicKey, X25519SecretKey};
