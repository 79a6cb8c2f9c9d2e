//! Hash-chain rules: computing, appending, and validating blocks.
//!
//! Everything here is a pure function. The chain tail is always passed in
//! explicitly; there is no global "latest block".

use crate::block::{now_timestamp, Block, BlockData, GENESIS_PREVIOUS_HASH};
use crate::canonical::hash_input;
use crate::crypto::Sha256Hash;
use crate::error::{ChainValidationError, DivergenceKind, Result};

/// Compute a block hash: lowercase hex SHA-256 over the canonical hash input.
pub fn compute_hash(
    index: u64,
    timestamp: &str,
    data: &BlockData,
    previous_hash: &str,
) -> Result<String> {
    let input = hash_input(index, timestamp, data, previous_hash)?;
    Ok(Sha256Hash::hash(&input).to_hex())
}

/// Build the block that follows `tail`, stamped with the current time.
///
/// `None` produces the genesis block.
pub fn append(tail: Option<&Block>, data: BlockData) -> Result<Block> {
    append_at(tail, data, now_timestamp())
}

/// Build the block that follows `tail` with an explicit timestamp.
pub fn append_at(tail: Option<&Block>, data: BlockData, timestamp: impl Into<String>) -> Result<Block> {
    let (index, previous_hash) = match tail {
        None => (0, GENESIS_PREVIOUS_HASH.to_string()),
        Some(tail) => (tail.index + 1, tail.hash.clone()),
    };
    let timestamp = timestamp.into();
    let hash = compute_hash(index, &timestamp, &data, &previous_hash)?;

    Ok(Block {
        index,
        timestamp,
        data,
        previous_hash,
        hash,
    })
}

/// Validate an ordered run of blocks.
///
/// Each block's hash is recomputed from its own fields, and each adjacent
/// pair must have contiguous indices and a matching link. The run does not
/// have to start at genesis, but a block declaring index 0 must carry the
/// genesis `previous_hash`. Stops at the first divergence.
pub fn validate(blocks: &[Block]) -> std::result::Result<(), ChainValidationError> {
    let mut prev: Option<&Block> = None;

    for (position, block) in blocks.iter().enumerate() {
        let diverge = |kind| ChainValidationError {
            position,
            index: block.index,
            kind,
        };

        match block.recompute_hash() {
            Ok(hash) if hash == block.hash => {}
            Ok(_) => return Err(diverge(DivergenceKind::HashMismatch)),
            Err(_) => return Err(diverge(DivergenceKind::Unencodable)),
        }

        match prev {
            Some(prev) => {
                if prev.index.checked_add(1) != Some(block.index) {
                    return Err(diverge(DivergenceKind::IndexGap));
                }
                if block.previous_hash != prev.hash {
                    return Err(diverge(DivergenceKind::BrokenLink));
                }
            }
            None => {
                if block.index == 0 && block.previous_hash != GENESIS_PREVIOUS_HASH {
                    return Err(diverge(DivergenceKind::BadGenesis));
                }
            }
        }

        prev = Some(block);
    }

    Ok(())
}

/// Boolean form of [`validate`].
pub fn is_valid(blocks: &[Block]) -> bool {
    validate(blocks).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2024-03-01T12:00:00.000Z";

    fn payload(n: u32) -> BlockData {
        BlockData::new(format!("file-{}.bin", n), format!("{:064x}", n), "sender")
            .timestamp(TS)
    }

    fn build_chain(len: u32) -> Vec<Block> {
        let mut chain: Vec<Block> = Vec::new();
        for n in 0..len {
            let block = append_at(chain.last(), payload(n), TS).unwrap();
            chain.push(block);
        }
        chain
    }

    #[test]
    fn test_genesis_block() {
        let genesis = append_at(None, BlockData::new("g", "0", "0").timestamp(TS), TS).unwrap();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert!(genesis.is_genesis());
        assert!(genesis.verify_hash());
    }

    #[test]
    fn test_append_links_to_tail() {
        let genesis = append_at(None, payload(0), TS).unwrap();
        let next = append_at(Some(&genesis), payload(1), TS).unwrap();
        assert_eq!(next.index, 1);
        assert_eq!(next.previous_hash, genesis.hash);
        assert_ne!(next.hash, genesis.hash);
    }

    #[test]
    fn test_compute_hash_deterministic() {
        let a = compute_hash(5, TS, &payload(1), "abc").unwrap();
        let b = compute_hash(5, TS, &payload(1), "abc").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_compute_hash_sensitive_to_each_input() {
        let base = compute_hash(5, TS, &payload(1), "abc").unwrap();
        assert_ne!(base, compute_hash(6, TS, &payload(1), "abc").unwrap());
        assert_ne!(base, compute_hash(5, "other", &payload(1), "abc").unwrap());
        assert_ne!(base, compute_hash(5, TS, &payload(2), "abc").unwrap());
        assert_ne!(base, compute_hash(5, TS, &payload(1), "abd").unwrap());
    }

    #[test]
    fn test_append_accepts_empty_fields() {
        let genesis = append_at(None, BlockData::new("", "0", "").timestamp(TS), TS).unwrap();
        let next = append_at(Some(&genesis), BlockData::new("f", "", "s").timestamp(""), "").unwrap();

        assert!(genesis.verify_hash());
        assert!(is_valid(&[genesis, next]));
    }

    #[test]
    fn test_externally_hashed_genesis_validates() {
        use sha2::{Digest, Sha256};

        let data = BlockData::new("", "0", "").timestamp(TS);
        let json = r#"{"fileName":"","fileHash":"0","senderId":"","timestamp":"2024-03-01T12:00:00.000Z"}"#;
        let hash = hex::encode(Sha256::digest(format!("0{}{}0", TS, json).as_bytes()));
        let foreign = Block {
            index: 0,
            timestamp: TS.to_string(),
            data,
            previous_hash: "0".to_string(),
            hash,
        };

        assert_eq!(validate(&[foreign]), Ok(()));
    }

    #[test]
    fn test_validate_empty_and_single() {
        assert!(is_valid(&[]));
        assert!(is_valid(&build_chain(1)));
    }

    #[test]
    fn test_validate_built_chain() {
        assert!(is_valid(&build_chain(10)));
    }

    #[test]
    fn test_validate_subrange() {
        let chain = build_chain(6);
        assert!(is_valid(&chain[2..5]));
    }

    #[test]
    fn test_broken_previous_hash_reports_index() {
        let mut chain = build_chain(3);
        chain[1].previous_hash = "deadbeef".into();

        let err = validate(&chain).unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.index, 1);
    }

    #[test]
    fn test_relinked_block_detected_by_link() {
        let mut chain = build_chain(3);
        // Rewrite block 1 consistently (valid self-hash) but pointing elsewhere.
        chain[1].previous_hash = "f00d".into();
        chain[1].hash = chain[1].recompute_hash().unwrap();

        let err = validate(&chain).unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.kind, DivergenceKind::BrokenLink);
    }

    #[test]
    fn test_tampered_payload_detected() {
        let mut chain = build_chain(4);
        chain[2].data.file_hash = "tampered".into();

        let err = validate(&chain).unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.kind, DivergenceKind::HashMismatch);
    }

    #[test]
    fn test_tampered_genesis_detected() {
        let mut chain = build_chain(3);
        chain[0].timestamp = "1999-01-01T00:00:00.000Z".into();

        let err = validate(&chain).unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_index_gap_detected() {
        let chain = build_chain(4);
        let gapped = vec![chain[0].clone(), chain[2].clone()];

        let err = validate(&gapped).unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.kind, DivergenceKind::IndexGap);
    }

    #[test]
    fn test_bad_genesis_link() {
        let mut genesis = append_at(None, payload(0), TS).unwrap();
        genesis.previous_hash = "1".into();
        genesis.hash = genesis.recompute_hash().unwrap();

        let err = validate(&[genesis]).unwrap_err();
        assert_eq!(err.kind, DivergenceKind::BadGenesis);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_window_of_a_valid_chain_validates(len in 1u32..16, start in 0usize..16, width in 0usize..16) {
                let chain = build_chain(len);
                let start = start.min(chain.len());
                let end = (start + width).min(chain.len());
                prop_assert!(is_valid(&chain[start..end]));
            }

            #[test]
            fn dropping_a_middle_block_is_an_index_gap(len in 3u32..12, pick in any::<prop::sample::Index>()) {
                let mut chain = build_chain(len);
                let removed = 1 + pick.index(chain.len() - 2);
                chain.remove(removed);

                let err = validate(&chain).unwrap_err();
                prop_assert_eq!(err.position, removed);
                prop_assert_eq!(err.kind, DivergenceKind::IndexGap);
            }
        }
    }
}
