//! Block: one hash-committed entry in the ledger.
//!
//! Blocks are immutable once appended. The JSON form produced by
//! [`Block::to_json`] is the persisted shape other implementations read:
//!
//! ```text
//! { "index", "timestamp", "data": { "fileName", "fileHash", "senderId",
//!   "senderName"?, "receiverId"?, "receiverName"?, "timestamp" },
//!   "previousHash", "hash" }
//! ```

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::compute_hash;
use crate::error::{ChainError, Result};

/// `previous_hash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// The application record committed by a block.
///
/// Field order is part of the hash contract: it is the order the fields
/// appear in the canonical JSON. Do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    /// File name, or group (folder) name for a multi-object share.
    pub file_name: String,
    /// Content hash of the ciphertext, or the combined hash of a group.
    pub file_hash: String,
    /// Participant id of the sender.
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    /// When the recorded event happened (ISO-8601).
    pub timestamp: String,
}

impl BlockData {
    /// Create a record with the required fields and the current time.
    pub fn new(
        file_name: impl Into<String>,
        file_hash: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_hash: file_hash.into(),
            sender_id: sender_id.into(),
            sender_name: None,
            receiver_id: None,
            receiver_name: None,
            timestamp: now_timestamp(),
        }
    }

    /// The record carried by the genesis block.
    pub fn genesis() -> Self {
        Self::new("Genesis Block", "0", "0")
    }

    /// Set the sender's display name.
    pub fn sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Set the receiver id.
    pub fn receiver_id(mut self, id: impl Into<String>) -> Self {
        self.receiver_id = Some(id.into());
        self
    }

    /// Set the receiver's display name.
    pub fn receiver_name(mut self, name: impl Into<String>) -> Self {
        self.receiver_name = Some(name.into());
        self
    }

    /// Override the event timestamp.
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }
}

/// One linked entry in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain. 0 is genesis.
    pub index: u64,
    /// Wall-clock creation time (ISO-8601). Advisory only.
    pub timestamp: String,
    /// The committed record.
    pub data: BlockData,
    /// Hash of the block at `index - 1`, or `"0"` for genesis.
    pub previous_hash: String,
    /// Hash over `(index, timestamp, data, previous_hash)`.
    pub hash: String,
}

impl Block {
    /// Whether this is the first block of a chain.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Recompute this block's hash from its declared fields.
    pub fn recompute_hash(&self) -> Result<String> {
        compute_hash(self.index, &self.timestamp, &self.data, &self.previous_hash)
    }

    /// Whether the stored hash matches the recomputed one.
    pub fn verify_hash(&self) -> bool {
        matches!(self.recompute_hash(), Ok(h) if h == self.hash)
    }

    /// Serialize to the persisted JSON shape.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ChainError::Serialization(e.to_string()))
    }

    /// Parse from the persisted JSON shape.
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| ChainError::Decoding(e.to_string()))
    }
}

/// Current UTC time as ISO-8601 with millisecond precision (`...Z`).
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
