//! # Sharechain Store
//!
//! Storage for the sharechain ledger and encrypted-object metadata.
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - append-only block storage with compare-and-swap appends
//! - [`ObjectStore`] - encrypted-object records and their wrapped keys
//! - [`SqliteStore`] - SQLite-based persistent storage implementing both
//! - [`MemoryLedger`], [`MemoryObjectStore`] - in-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sharechain_core::{append, BlockData};
//! use sharechain_store::{AppendResult, LedgerStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     let genesis = append(None, BlockData::genesis()).unwrap();
//!     let result = store.append_if_tail_matches("0", &genesis).await.unwrap();
//!     assert_eq!(result, AppendResult::Appended);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No forks**: at most one block per index; the SQLite table keys on it
//! - **Stale appends**: a block built on an old tail is reported as `Conflict`
//! - **Receiver keys**: attaching a receiver key overwrites, so retries are safe

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryLedger, MemoryObjectStore};
pub use sqlite::SqliteStore;
pub use traits::{tail_hash, AppendResult, LedgerStore, ObjectStore};
