//! SQLite implementation of the storage traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via `tokio::task::spawn_blocking`. One
//! connection serves both the ledger and the object tables.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};

use sharechain_core::{Block, BlockData};
use sharechain_envelope::{EncryptedObject, WrappedKey};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{check_extends, tail_hash, AppendResult, LedgerStore, ObjectStore};

const BLOCK_COLUMNS: &str = "block_index, timestamp, data, previous_hash, hash";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

fn to_sql_index(index: u64) -> Result<i64> {
    i64::try_from(index)
        .map_err(|_| StoreError::InvalidData(format!("block index {} out of range", index)))
}

fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    let index: i64 = row.get("block_index")?;
    let data: String = row.get("data")?;

    let index = u64::try_from(index)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;
    let data: BlockData = serde_json::from_str(&data)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Block {
        index,
        timestamp: row.get("timestamp")?,
        data,
        previous_hash: row.get("previous_hash")?,
        hash: row.get("hash")?,
    })
}

fn row_to_object(row: &rusqlite::Row<'_>) -> rusqlite::Result<EncryptedObject> {
    let owner: Vec<u8> = row.get("owner_wrapped_key")?;
    let receiver: Option<Vec<u8>> = row.get("receiver_wrapped_key")?;

    let decode = |idx: usize, bytes: &[u8]| {
        WrappedKey::from_bytes(bytes)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Blob, Box::new(e)))
    };

    Ok(EncryptedObject {
        object_id: row.get("object_id")?,
        file_name: row.get("file_name")?,
        content_hash: row.get("content_hash")?,
        owner_wrapped_key: decode(3, &owner)?,
        receiver_id: row.get("receiver_id")?,
        receiver_wrapped_key: receiver.as_deref().map(|b| decode(5, b)).transpose()?,
    })
}

fn encode_wrapped(wrapped: &WrappedKey) -> Result<Vec<u8>> {
    wrapped
        .to_bytes()
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn query_tail(conn: &Connection) -> Result<Option<Block>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM blocks ORDER BY block_index DESC LIMIT 1",
            BLOCK_COLUMNS
        ),
        [],
        row_to_block,
    )
    .optional()
    .map_err(StoreError::from)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn get_tail(&self) -> Result<Option<Block>> {
        self.run(|conn| query_tail(conn)).await
    }

    async fn append_if_tail_matches(
        &self,
        expected_previous_hash: &str,
        block: &Block,
    ) -> Result<AppendResult> {
        let expected = expected_previous_hash.to_string();
        let block = block.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let tail = query_tail(&tx)?;
            if tail_hash(tail.as_ref()) != expected {
                debug!(index = block.index, "ledger tail moved, append rejected");
                return Ok(AppendResult::Conflict { current_tail: tail });
            }
            check_extends(tail.as_ref(), &block)?;

            let data = serde_json::to_string(&block.data)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            let inserted = tx.execute(
                "INSERT INTO blocks (block_index, timestamp, data, previous_hash, hash, appended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    to_sql_index(block.index)?,
                    block.timestamp,
                    data,
                    block.previous_hash,
                    block.hash,
                    now_millis(),
                ],
            );

            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    warn!(index = block.index, "block rejected by ledger constraints");
                    return Ok(AppendResult::Conflict {
                        current_tail: query_tail(&tx)?,
                    });
                }
                Err(e) => return Err(e.into()),
            }

            tx.commit()?;
            debug!(index = block.index, hash = %block.hash, "appended block");
            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn get_block(&self, index: u64) -> Result<Option<Block>> {
        let index = to_sql_index(index)?;

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM blocks WHERE block_index = ?1", BLOCK_COLUMNS),
                params![index],
                row_to_block,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_blocks(&self, start: u64, end: u64) -> Result<Vec<Block>> {
        if start > end {
            return Ok(Vec::new());
        }
        let start = to_sql_index(start)?;
        let end = i64::try_from(end).unwrap_or(i64::MAX);

        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM blocks WHERE block_index >= ?1 AND block_index <= ?2
                 ORDER BY block_index",
                BLOCK_COLUMNS
            ))?;
            let blocks = stmt
                .query_map(params![start, end], row_to_block)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(blocks)
        })
        .await
    }

    async fn len(&self) -> Result<u64> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
            u64::try_from(count)
                .map_err(|_| StoreError::InvalidData(format!("negative block count {}", count)))
        })
        .await
    }
}

#[async_trait]
impl ObjectStore for SqliteStore {
    async fn put_object(&self, object: &EncryptedObject) -> Result<()> {
        let owner = encode_wrapped(&object.owner_wrapped_key)?;
        let receiver = object
            .receiver_wrapped_key
            .as_ref()
            .map(encode_wrapped)
            .transpose()?;
        let object = object.clone();

        self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO objects (
                    object_id, file_name, content_hash, owner_wrapped_key,
                    receiver_id, receiver_wrapped_key, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    object.object_id,
                    object.file_name,
                    object.content_hash,
                    owner,
                    object.receiver_id,
                    receiver,
                    now_millis(),
                ],
            )?;
            debug!(object_id = %object.object_id, "stored object");
            Ok(())
        })
        .await
    }

    async fn get_object(&self, object_id: &str) -> Result<Option<EncryptedObject>> {
        let object_id = object_id.to_string();

        self.run(move |conn| {
            conn.query_row(
                "SELECT object_id, file_name, content_hash, owner_wrapped_key,
                        receiver_id, receiver_wrapped_key
                 FROM objects WHERE object_id = ?1",
                params![object_id],
                row_to_object,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn attach_receiver_key(
        &self,
        object_id: &str,
        receiver_id: &str,
        wrapped: &WrappedKey,
    ) -> Result<()> {
        let object_id = object_id.to_string();
        let receiver_id = receiver_id.to_string();
        let wrapped = encode_wrapped(wrapped)?;

        self.run(move |conn| {
            let updated = conn.execute(
                "UPDATE objects SET receiver_id = ?1, receiver_wrapped_key = ?2, updated_at = ?3
                 WHERE object_id = ?4",
                params![receiver_id, wrapped, now_millis(), object_id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("object {}", object_id)));
            }
            debug!(%object_id, %receiver_id, "attached receiver key");
            Ok(())
        })
        .await
    }
}
