//! Storage traits: the abstract interface for ledger and object persistence.
//!
//! These traits keep the coordinator storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use sharechain_core::{Block, GENESIS_PREVIOUS_HASH};
use sharechain_envelope::{EncryptedObject, WrappedKey};

use crate::error::{Result, StoreError};

/// Result of a compare-and-swap append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// The block is now the tail of the ledger.
    Appended,
    /// The ledger tail moved; nothing was written.
    Conflict {
        /// The tail as it is now (`None` only if the ledger is still empty).
        current_tail: Option<Block>,
    },
}

/// Append-only block storage with a single tail.
///
/// # Design Notes
///
/// - **One block per index**: a second block at an existing index is never stored.
/// - **Compare-and-swap**: an append names the tail hash it was built on
///   (`"0"` for an empty ledger). If the tail moved, the append reports
///   `Conflict` and the caller rebuilds the block.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// The last block, or `None` for an empty ledger.
    async fn get_tail(&self) -> Result<Option<Block>>;

    /// Append `block` if the current tail hash equals `expected_previous_hash`.
    ///
    /// Fails with `InvalidData` when the block itself does not extend the
    /// expected tail (wrong index or `previous_hash`).
    async fn append_if_tail_matches(
        &self,
        expected_previous_hash: &str,
        block: &Block,
    ) -> Result<AppendResult>;

    /// Get a block by index.
    async fn get_block(&self, index: u64) -> Result<Option<Block>>;

    /// Get blocks with `start <= index <= end`, ordered by index.
    async fn get_blocks(&self, start: u64, end: u64) -> Result<Vec<Block>>;

    /// Number of blocks in the ledger.
    async fn len(&self) -> Result<u64>;

    /// Whether the ledger has no blocks.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Every block, in order.
    async fn all_blocks(&self) -> Result<Vec<Block>> {
        match self.len().await? {
            0 => Ok(Vec::new()),
            n => self.get_blocks(0, n - 1).await,
        }
    }
}

/// Metadata storage for encrypted objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Insert or replace an object record.
    async fn put_object(&self, object: &EncryptedObject) -> Result<()>;

    /// Get an object by id.
    async fn get_object(&self, object_id: &str) -> Result<Option<EncryptedObject>>;

    /// Record the receiver-wrapped key for an object.
    ///
    /// Overwrites any previous receiver, so repeating the call is harmless.
    /// Fails with `NotFound` for an unknown object.
    async fn attach_receiver_key(
        &self,
        object_id: &str,
        receiver_id: &str,
        wrapped: &WrappedKey,
    ) -> Result<()>;
}

/// Hash a block must name as `previous_hash` to follow `tail`.
pub fn tail_hash(tail: Option<&Block>) -> &str {
    tail.map_or(GENESIS_PREVIOUS_HASH, |b| b.hash.as_str())
}

/// Check that `block` extends `tail`.
pub(crate) fn check_extends(tail: Option<&Block>, block: &Block) -> Result<()> {
    let expected_index = tail.map_or(0, |b| b.index + 1);
    if block.index != expected_index {
        return Err(StoreError::InvalidData(format!(
            "block index {} does not follow tail (expected {})",
            block.index, expected_index
        )));
    }
    if block.previous_hash != tail_hash(tail) {
        return Err(StoreError::InvalidData(format!(
            "block {} links to {}, tail is {}",
            block.index,
            block.previous_hash,
            tail_hash(tail)
        )));
    }
    Ok(())
}
