//! The sharing coordinator: verified key rewrapping recorded on the ledger.
//!
//! A share runs in a fixed order:
//!
//! 1. every object's content key is unwrapped with the owner's key, wrapped
//!    for the recipient, and the new wrap is opened again and compared;
//! 2. one block is appended for the whole group, retrying on tail conflicts;
//! 3. only then are the receiver keys persisted.
//!
//! A failure in step 1 leaves no trace. A crash after step 2 leaves a
//! durable block whose receiver keys [`SharingCoordinator::complete_share`]
//! can restore.

use std::sync::Arc;

use sharechain_core::{append, validate, Block, BlockData};
use sharechain_envelope::{
    combined_content_hash, seal_content, EncryptedObject, KeyWrap,
    SealedBoxWrap, WrappedKey, X25519PublicKey, X25519SecretKey,
};
use sharechain_store::{tail_hash, AppendResult, LedgerStore, ObjectStore, StoreError};
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::directory::KeyDirectory;
use crate::error::{Result, ShareError};

/// Who is sharing what, as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareContext {
    /// Recorded as the block's `fileName`: the file or folder name.
    pub group_name: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
}

impl ShareContext {
    pub fn new(group_name: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            receiver_name: None,
        }
    }

    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn receiver_name(mut self, name: impl Into<String>) -> Self {
        self.receiver_name = Some(name.into());
        self
    }
}

/// Outcome of a successful share.
#[derive(Debug, Clone)]
pub struct ShareResult {
    /// The block recording the share.
    pub block: Block,
    /// The objects with their receiver keys attached.
    pub objects: Vec<EncryptedObject>,
    /// Append attempts made (1 when there was no contention; 0 when resumed).
    pub attempts: u32,
}

/// Coordinates sharing between the envelope layer, the ledger and the object store.
pub struct SharingCoordinator<L, O, W = SealedBoxWrap> {
    ledger: Arc<L>,
    objects: Arc<O>,
    wrap: W,
    config: CoordinatorConfig,
}

impl<L: LedgerStore, O: ObjectStore> SharingCoordinator<L, O> {
    /// Create a coordinator with the default key-wrapping scheme.
    pub fn new(ledger: L, objects: O, config: CoordinatorConfig) -> Self {
        Self::from_shared(Arc::new(ledger), Arc::new(objects), config)
    }

    /// Create a coordinator over stores shared with other coordinators.
    pub fn from_shared(ledger: Arc<L>, objects: Arc<O>, config: CoordinatorConfig) -> Self {
        Self {
            ledger,
            objects,
            wrap: SealedBoxWrap,
            config,
        }
    }
}

impl<L: LedgerStore, O: ObjectStore, W: KeyWrap> SharingCoordinator<L, O, W> {
    /// Swap the key-wrapping scheme.
    pub fn with_key_wrap<W2: KeyWrap>(self, wrap: W2) -> SharingCoordinator<L, O, W2> {
        SharingCoordinator {
            ledger: self.ledger,
            objects: self.objects,
            wrap,
            config: self.config,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Make sure the ledger starts with a genesis block and return it.
    ///
    /// On an existing ledger this validates the stored chain first when
    /// `verify_chain_on_bootstrap` is set.
    pub async fn bootstrap(&self) -> Result<Block> {
        if !self.ledger.is_empty().await? {
            if self.config.verify_chain_on_bootstrap {
                self.verify_ledger().await?;
            }
            return self.genesis_block().await;
        }

        let genesis = append(None, BlockData::genesis())?;
        match self.ledger.append_if_tail_matches(tail_hash(None), &genesis).await? {
            AppendResult::Appended => {
                info!(hash = %genesis.hash, "created ledger genesis block");
                Ok(genesis)
            }
            AppendResult::Conflict { .. } => {
                debug!("genesis block appended concurrently");
                self.genesis_block().await
            }
        }
    }

    /// Validate every stored block. Returns the ledger length.
    pub async fn verify_ledger(&self) -> Result<u64> {
        let blocks = self.ledger.all_blocks().await?;
        validate(&blocks).map_err(|e| {
            warn!(position = e.position, kind = ?e.kind, "ledger failed validation");
            e
        })?;
        debug!(blocks = blocks.len(), "ledger validated");
        Ok(blocks.len() as u64)
    }

    async fn genesis_block(&self) -> Result<Block> {
        self.ledger
            .get_block(0)
            .await?
            .ok_or_else(|| StoreError::NotFound("genesis block".into()).into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Objects
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt new content for its owner and store the object record.
    ///
    /// Returns the record and the ciphertext; storing the ciphertext is up
    /// to the caller.
    pub async fn seal_and_register(
        &self,
        content: &[u8],
        owner_public: &X25519PublicKey,
        object_id: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<(EncryptedObject, Vec<u8>)> {
        let (object, ciphertext) = seal_content(content, owner_public, object_id, file_name)?;
        self.objects.put_object(&object).await?;
        debug!(object_id = %object.object_id, "registered object");
        Ok((object, ciphertext))
    }

    /// Look up a stored object.
    pub async fn get_object(&self, object_id: &str) -> Result<Option<EncryptedObject>> {
        Ok(self.objects.get_object(object_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sharing
    // ─────────────────────────────────────────────────────────────────────────

    /// Share a group of objects with one recipient.
    pub async fn share(
        &self,
        objects: &[EncryptedObject],
        owner_secret: &X25519SecretKey,
        recipient_public: &X25519PublicKey,
        recipient_id: &str,
        context: &ShareContext,
    ) -> Result<ShareResult> {
        if objects.is_empty() {
            return Err(ShareError::EmptyGroup);
        }
        info!(
            group = %context.group_name,
            objects = objects.len(),
            recipient = recipient_id,
            "sharing group"
        );

        let wrapped = self.rewrap_verified(objects, owner_secret, recipient_public)?;

        let data = share_record(objects, recipient_id, context);
        let (block, attempts) = self.append_with_retry(data).await?;

        let objects = self.persist_receiver_keys(objects, wrapped, recipient_id).await?;

        info!(index = block.index, attempts, "share recorded");
        Ok(ShareResult {
            block,
            objects,
            attempts,
        })
    }

    /// Share, resolving both participants through a key directory.
    ///
    /// Lookups happen before any cryptography; a failed lookup writes nothing.
    pub async fn share_with_directory<D: KeyDirectory + ?Sized>(
        &self,
        directory: &D,
        objects: &[EncryptedObject],
        owner_id: &str,
        recipient_id: &str,
        context: &ShareContext,
    ) -> Result<ShareResult> {
        let owner_secret = directory.get_private_key(owner_id).await?;
        let recipient_public = directory.get_public_key(recipient_id).await?;

        self.share(objects, &owner_secret, &recipient_public, recipient_id, context)
            .await
    }

    /// Restore receiver keys, resolving the recipient named by the block.
    pub async fn complete_share_with_directory<D: KeyDirectory + ?Sized>(
        &self,
        directory: &D,
        block: &Block,
        objects: &[EncryptedObject],
        owner_id: &str,
    ) -> Result<ShareResult> {
        let recipient_id = block.data.receiver_id.as_deref().ok_or_else(|| {
            ShareError::BlockMismatch(format!("block {} names no receiver", block.index))
        })?;
        let owner_secret = directory.get_private_key(owner_id).await?;
        let recipient_public = directory.get_public_key(recipient_id).await?;

        self.complete_share(block, objects, &owner_secret, &recipient_public)
            .await
    }

    /// Restore receiver keys for a share whose block is already on the ledger.
    ///
    /// Safe to repeat. The block must be stored, name the group's combined
    /// hash, and name a receiver.
    ///
    /// `recipient_public` must belong to the block's `receiverId`; it is not
    /// checked here. [`complete_share_with_directory`] resolves it from the
    /// block instead.
    ///
    /// [`complete_share_with_directory`]: SharingCoordinator::complete_share_with_directory
    pub async fn complete_share(
        &self,
        block: &Block,
        objects: &[EncryptedObject],
        owner_secret: &X25519SecretKey,
        recipient_public: &X25519PublicKey,
    ) -> Result<ShareResult> {
        if objects.is_empty() {
            return Err(ShareError::EmptyGroup);
        }

        let expected_hash = combined_content_hash(objects);
        if block.data.file_hash != expected_hash {
            return Err(ShareError::BlockMismatch(format!(
                "block {} records file hash {}, group hashes to {}",
                block.index, block.data.file_hash, expected_hash
            )));
        }
        let recipient_id = block.data.receiver_id.clone().ok_or_else(|| {
            ShareError::BlockMismatch(format!("block {} names no receiver", block.index))
        })?;
        if self.ledger.get_block(block.index).await?.as_ref() != Some(block) {
            return Err(ShareError::BlockMismatch(format!(
                "block {} is not on the ledger",
                block.index
            )));
        }

        let wrapped = self.rewrap_verified(objects, owner_secret, recipient_public)?;
        let objects = self
            .persist_receiver_keys(objects, wrapped, &recipient_id)
            .await?;

        info!(index = block.index, recipient = %recipient_id, "share completed");
        Ok(ShareResult {
            block: block.clone(),
            objects,
            attempts: 0,
        })
    }

    /// Rewrap every object's key for the recipient and prove each new wrap opens.
    ///
    /// A wrong owner key surfaces as [`ShareError::Envelope`]; only a new wrap
    /// that fails to open to the same content key is a verification failure.
    fn rewrap_verified(
        &self,
        objects: &[EncryptedObject],
        owner_secret: &X25519SecretKey,
        recipient_public: &X25519PublicKey,
    ) -> Result<Vec<WrappedKey>> {
        objects
            .iter()
            .map(|object| self.rewrap_one(object, owner_secret, recipient_public))
            .collect()
    }

    fn rewrap_one(
        &self,
        object: &EncryptedObject,
        owner_secret: &X25519SecretKey,
        recipient_public: &X25519PublicKey,
    ) -> Result<WrappedKey> {
        let key = self
            .wrap
            .unwrap_key(&object.owner_wrapped_key, owner_secret)
            .map_err(|e| {
                warn!(object_id = %object.object_id, error = %e, "owner key did not open object");
                e
            })?;
        let (wrapped, witness) = self.wrap.wrap_key_with_witness(&key, recipient_public)?;

        let verified = match self.wrap.open_with_witness(&wrapped, &witness) {
            Ok(reopened) => reopened == key,
            Err(e) => {
                debug!(object_id = %object.object_id, error = %e, "rewrapped key did not open");
                false
            }
        };
        if !verified {
            warn!(object_id = %object.object_id, "share verification failed");
            return Err(ShareError::ShareVerificationFailed {
                object_id: object.object_id.clone(),
            });
        }
        Ok(wrapped)
    }

    /// Append a block carrying `data`, rebuilding it on the new tail after each conflict.
    async fn append_with_retry(&self, data: BlockData) -> Result<(Block, u32)> {
        let max_attempts = self.config.max_append_attempts();
        let mut tail = self.ledger.get_tail().await?;

        for attempt in 1..=max_attempts {
            let block = append(tail.as_ref(), data.clone())?;
            let expected = tail_hash(tail.as_ref()).to_string();

            match self.ledger.append_if_tail_matches(&expected, &block).await? {
                AppendResult::Appended => {
                    debug!(index = block.index, attempt, "appended share block");
                    return Ok((block, attempt));
                }
                AppendResult::Conflict { current_tail } => {
                    warn!(
                        attempt,
                        tail_index = current_tail.as_ref().map(|b| b.index),
                        "ledger tail moved during append"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff(attempt - 1)).await;
                        tail = self.ledger.get_tail().await?;
                    }
                }
            }
        }

        Err(ShareError::LedgerAppendConflict {
            attempts: max_attempts,
        })
    }

    async fn persist_receiver_keys(
        &self,
        objects: &[EncryptedObject],
        wrapped: Vec<WrappedKey>,
        recipient_id: &str,
    ) -> Result<Vec<EncryptedObject>> {
        let mut updated = Vec::with_capacity(objects.len());

        for (object, wrapped) in objects.iter().zip(wrapped) {
            match self
                .objects
                .attach_receiver_key(&object.object_id, recipient_id, &wrapped)
                .await
            {
                Ok(()) => {}
                Err(StoreError::NotFound(_)) => {
                    let mut record = object.clone();
                    record.attach_receiver(recipient_id, wrapped.clone());
                    self.objects.put_object(&record).await?;
                }
                Err(e) => return Err(e.into()),
            }

            let mut object = object.clone();
            object.attach_receiver(recipient_id, wrapped);
            updated.push(object);
        }

        Ok(updated)
    }
}

/// The ledger record for one share.
fn share_record(
    objects: &[EncryptedObject],
    recipient_id: &str,
    context: &ShareContext,
) -> BlockData {
    let mut data = BlockData::new(
        context.group_name.clone(),
        combined_content_hash(objects),
        context.sender_id.clone(),
    )
    .receiver_id(recipient_id);
    data.sender_name = context.sender_name.clone();
    data.receiver_name = context.receiver_name.clone();
    data
}
