//! Canonical encoding of block data for hashing.
//!
//! The hash input of a block is the concatenation, with no separators, of:
//!
//! 1. `index` as a base-10 ASCII integer
//! 2. `timestamp` as UTF-8
//! 3. the canonical JSON of `data`
//! 4. `previous_hash` as UTF-8
//!
//! Canonical JSON of `data` is a single JSON object with keys in the fixed
//! order `fileName, fileHash, senderId, senderName, receiverId,
//! receiverName, timestamp`, absent optional keys omitted, no whitespace,
//! and serde_json's string escaping. Every producer must emit exactly these
//! bytes or the chain cannot be re-verified elsewhere.

use crate::block::BlockData;
use crate::error::{ChainError, Result};

/// Encode block data to canonical JSON bytes.
///
/// Any field value is accepted, empty strings included; the bytes are
/// whatever the fixed-order serialization produces.
pub fn canonical_data_bytes(data: &BlockData) -> Result<Vec<u8>> {
    serde_json::to_vec(data).map_err(|e| ChainError::Serialization(e.to_string()))
}

/// Build the exact bytes a block hash is computed over.
pub fn hash_input(
    index: u64,
    timestamp: &str,
    data: &BlockData,
    previous_hash: &str,
) -> Result<Vec<u8>> {
    let data_bytes = canonical_data_bytes(data)?;
    let index = index.to_string();

    let mut buf =
        Vec::with_capacity(index.len() + timestamp.len() + data_bytes.len() + previous_hash.len());
    buf.extend_from_slice(index.as_bytes());
    buf.extend_from_slice(timestamp.as_bytes());
    buf.extend_from_slice(&data_bytes);
    buf.extend_from_slice(previous_hash.as_bytes());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> BlockData {
        BlockData::new("a.txt", "0", "u1").timestamp("2024-05-01T10:00:00.000Z")
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let a = canonical_data_bytes(&data()).unwrap();
        let b = canonical_data_bytes(&data()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_order_fixed() {
        let full = data()
            .sender_name("Uma")
            .receiver_id("u2")
            .receiver_name("Ravi");
        let json = String::from_utf8(canonical_data_bytes(&full).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"fileName":"a.txt","fileHash":"0","senderId":"u1","senderName":"Uma","receiverId":"u2","receiverName":"Ravi","timestamp":"2024-05-01T10:00:00.000Z"}"#
        );
    }

    #[test]
    fn test_hash_input_layout() {
        let input = hash_input(7, "T", &data(), "prev").unwrap();
        let s = String::from_utf8(input).unwrap();
        assert!(s.starts_with("7T{"));
        assert!(s.ends_with("}prev"));
    }

    #[test]
    fn test_empty_fields_encode() {
        let sparse = BlockData::new("", "0", "").timestamp("");
        let json = String::from_utf8(canonical_data_bytes(&sparse).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"fileName":"","fileHash":"0","senderId":"","timestamp":""}"#
        );
    }

    #[test]
    fn test_escaping_is_stable() {
        let tricky = BlockData::new("quote\"and\\slash\n", "0", "u1").timestamp("t");
        let json = String::from_utf8(canonical_data_bytes(&tricky).unwrap()).unwrap();
        assert!(json.contains(r#""fileName":"quote\"and\\slash\n""#));
    }
}
