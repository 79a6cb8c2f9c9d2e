//! Golden test vectors for the block hash.
//!
//! Each vector is one block of a fixed four-block chain. The expected hashes
//! were computed independently from the documented hash input, so a
//! change to canonical encoding, field order or concatenation shows up here.

use sharechain_core::{append_at, canonical_data_bytes, Block, BlockData};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Block timestamp.
    pub timestamp: &'static str,
    /// Block data.
    pub data: BlockData,
    /// Expected canonical JSON of `data`.
    pub expected_canonical: &'static str,
    /// Expected block hash (hex).
    pub expected_hash: &'static str,
}

/// Get all golden test vectors, in chain order.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "genesis",
            timestamp: "2024-01-01T00:00:00.000Z",
            data: BlockData::genesis().timestamp("2024-01-01T00:00:00.000Z"),
            expected_canonical: r#"{"fileName":"Genesis Block","fileHash":"0","senderId":"0","timestamp":"2024-01-01T00:00:00.000Z"}"#,
            expected_hash: "945a43db75fc4ddc3c6f5182ffaa95209fdf2f2c10c153af4d9494ce2f2a4e43",
        },
        GoldenVector {
            name: "single file with all optional fields",
            timestamp: "2024-01-01T00:01:00.123Z",
            data: BlockData::new(
                "report.pdf",
                "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
                "alice",
            )
            .sender_name("Alice")
            .receiver_id("bob")
            .receiver_name("Bob")
            .timestamp("2024-01-01T00:01:00.000Z"),
            expected_canonical: r#"{"fileName":"report.pdf","fileHash":"9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08","senderId":"alice","senderName":"Alice","receiverId":"bob","receiverName":"Bob","timestamp":"2024-01-01T00:01:00.000Z"}"#,
            expected_hash: "6fbd74ca0165f52bc5fa794bd0f6ca675361c249924560ba39013ba862fa48ed",
        },
        GoldenVector {
            name: "folder share without display names",
            timestamp: "2024-01-02T09:30:15.500Z",
            data: BlockData::new(
                "Q3 folder",
                "60303ae22b998861bce3b28f33eec1be758a213c86c93c076dbe9f558c11c752",
                "bob",
            )
            .receiver_id("carol")
            .timestamp("2024-01-02T09:30:15.000Z"),
            expected_canonical: r#"{"fileName":"Q3 folder","fileHash":"60303ae22b998861bce3b28f33eec1be758a213c86c93c076dbe9f558c11c752","senderId":"bob","receiverId":"carol","timestamp":"2024-01-02T09:30:15.000Z"}"#,
            expected_hash: "13f6c2a51c43bc6cb936ddd041748882f9c9e967f7b86fa2da21191768d56c1f",
        },
        GoldenVector {
            name: "non-ASCII names and escaped quotes",
            timestamp: "2024-01-03T18:00:00.000Z",
            data: BlockData::new(
                "résumé.txt",
                "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
                "carol",
            )
            .sender_name("Carol \"C\" Díaz")
            .timestamp("2024-01-03T18:00:00.000Z"),
            expected_canonical: r#"{"fileName":"résumé.txt","fileHash":"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824","senderId":"carol","senderName":"Carol \"C\" Díaz","timestamp":"2024-01-03T18:00:00.000Z"}"#,
            expected_hash: "a18bce072647bb2d389cd2b5b50dfe2ec1c3d0264bef1664e9aa939f0030b8c1",
        },
    ]
}

/// Build the chain the vectors describe.
pub fn golden_chain() -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for vector in all_vectors() {
        match append_at(blocks.last(), vector.data, vector.timestamp) {
            Ok(block) => blocks.push(block),
            Err(_) => break,
        }
    }
    blocks
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches, computed_hash)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let chain = golden_chain();
    all_vectors()
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let hash = chain.get(i).map(|b| b.hash.clone()).unwrap_or_default();
            (v.name.to_string(), hash == v.expected_hash, hash)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharechain_core::validate;

    #[test]
    fn test_golden_hashes() {
        for (name, ok, hash) in verify_all_vectors() {
            assert!(ok, "vector '{}' hashed to {}", name, hash);
        }
    }

    #[test]
    fn test_golden_canonical_json() {
        for vector in all_vectors() {
            let bytes = canonical_data_bytes(&vector.data).unwrap();
            assert_eq!(
                String::from_utf8(bytes).unwrap(),
                vector.expected_canonical,
                "vector '{}'",
                vector.name
            );
        }
    }

    #[test]
    fn test_golden_chain_links_and_validates() {
        let chain = golden_chain();
        assert_eq!(chain.len(), 4);
        assert!(chain[0].is_genesis());
        for pair in chain.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
        }
        assert!(validate(&chain).is_ok());
    }
}
