//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration transforms the
//! schema from version N to N+1.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// Idempotent: it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
        info!(from = current, to = CURRENT_VERSION, "migrated ledger schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: ledger blocks.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE blocks (
            block_index INTEGER PRIMARY KEY,  -- one block per index, no forks
            timestamp TEXT NOT NULL,          -- ISO-8601, advisory
            data TEXT NOT NULL,               -- BlockData as JSON
            previous_hash TEXT NOT NULL,      -- "0" for genesis
            hash TEXT NOT NULL UNIQUE,        -- lowercase hex SHA-256
            appended_at INTEGER NOT NULL      -- local time of append (Unix ms)
        );
        "#,
    )?;

    Ok(())
}

/// Migration v2: encrypted-object metadata.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE objects (
            object_id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            content_hash TEXT NOT NULL,       -- hex SHA-256 of the ciphertext
            owner_wrapped_key BLOB NOT NULL,  -- CBOR WrappedKey
            receiver_id TEXT,                 -- set once shared
            receiver_wrapped_key BLOB,        -- CBOR WrappedKey, set once shared
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX idx_objects_content_hash ON objects(content_hash);
        "#,
    )?;

    Ok(())
}
