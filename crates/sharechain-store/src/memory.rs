//! In-memory implementations of the storage traits.
//!
//! These are primarily for testing. They have the same semantics as SQLite
//! but keep everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use sharechain_core::Block;
use sharechain_envelope::{EncryptedObject, WrappedKey};

use crate::error::{Result, StoreError};
use crate::traits::{check_extends, tail_hash, AppendResult, LedgerStore, ObjectStore};

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::InvalidData("in-memory store lock poisoned".into())
}

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. The tail check and the push
/// happen under one write lock.
#[derive(Default)]
pub struct MemoryLedger {
    blocks: RwLock<Vec<Block>>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger holding `blocks` as-is, without any checks.
    ///
    /// Lets tests load a ledger that was tampered with at rest.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: RwLock::new(blocks),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get_tail(&self) -> Result<Option<Block>> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks.last().cloned())
    }

    async fn append_if_tail_matches(
        &self,
        expected_previous_hash: &str,
        block: &Block,
    ) -> Result<AppendResult> {
        let mut blocks = self.blocks.write().map_err(poisoned)?;
        let tail = blocks.last();

        if tail_hash(tail) != expected_previous_hash {
            return Ok(AppendResult::Conflict {
                current_tail: tail.cloned(),
            });
        }
        check_extends(tail, block)?;

        blocks.push(block.clone());
        Ok(AppendResult::Appended)
    }

    async fn get_block(&self, index: u64) -> Result<Option<Block>> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks.iter().find(|b| b.index == index).cloned())
    }

    async fn get_blocks(&self, start: u64, end: u64) -> Result<Vec<Block>> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks
            .iter()
            .filter(|b| b.index >= start && b.index <= end)
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<u64> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks.len() as u64)
    }
}

/// In-memory object metadata store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, EncryptedObject>>,
}

impl MemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, object: &EncryptedObject) -> Result<()> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        objects.insert(object.object_id.clone(), object.clone());
        Ok(())
    }

    async fn get_object(&self, object_id: &str) -> Result<Option<EncryptedObject>> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects.get(object_id).cloned())
    }

    async fn attach_receiver_key(
        &self,
        object_id: &str,
        receiver_id: &str,
        wrapped: &WrappedKey,
    ) -> Result<()> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        let object = objects
            .get_mut(object_id)
            .ok_or_else(|| StoreError::NotFound(format!("object {}", object_id)))?;
        object.attach_receiver(receiver_id, wrapped.clone());
        Ok(())
    }
}
