//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sharechain_core::{append_at, Block, BlockData};
use sharechain_envelope::ParticipantKeypair;

const GENESIS_TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";

/// Generate a participant key pair.
pub fn participant() -> impl Strategy<Value = ParticipantKeypair> {
    any::<[u8; 32]>().prop_map(ParticipantKeypair::from_seed)
}

/// Generate an ISO-8601 UTC timestamp with millisecond precision.
pub fn timestamp() -> impl Strategy<Value = String> {
    (2000u32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60, 0u32..1000).prop_map(
        |(y, mo, d, h, mi, s, ms)| {
            format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
                y, mo, d, h, mi, s, ms
            )
        },
    )
}

/// Generate a lowercase hex SHA-256 digest.
pub fn hex_hash() -> impl Strategy<Value = String> {
    "[0-9a-f]{64}".prop_map(String::from)
}

/// Generate a non-empty identifier or display name, including non-ASCII text.
pub fn field_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9._-]{1,24}".prop_map(String::from),
        "\\PC{1,16}".prop_map(String::from),
    ]
}

/// Generate block data with every combination of optional fields.
pub fn block_data() -> impl Strategy<Value = BlockData> {
    (
        field_text(),
        hex_hash(),
        field_text(),
        proptest::option::of(field_text()),
        proptest::option::of(field_text()),
        proptest::option::of(field_text()),
        timestamp(),
    )
        .prop_map(
            |(file_name, file_hash, sender_id, sender_name, receiver_id, receiver_name, ts)| {
                BlockData {
                    file_name,
                    file_hash,
                    sender_id,
                    sender_name,
                    receiver_id,
                    receiver_name,
                    timestamp: ts,
                }
            },
        )
}

/// Generate a valid chain of 1 to `max_len` blocks starting at genesis.
pub fn chain(max_len: usize) -> impl Strategy<Value = Vec<Block>> {
    prop::collection::vec((block_data(), timestamp()), 0..max_len.max(1)).prop_map(|entries| {
        let genesis = (
            BlockData::genesis().timestamp(GENESIS_TIMESTAMP),
            GENESIS_TIMESTAMP.to_string(),
        );

        let mut blocks: Vec<Block> = Vec::with_capacity(entries.len() + 1);
        for (data, ts) in std::iter::once(genesis).chain(entries) {
            match append_at(blocks.last(), data, ts) {
                Ok(block) => blocks.push(block),
                Err(_) => break,
            }
        }
        blocks
    })
}

/// A single block field that can be tampered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockField {
    Index,
    Timestamp,
    FileName,
    FileHash,
    SenderId,
    ReceiverId,
    DataTimestamp,
    PreviousHash,
    Hash,
}

impl Arbitrary for BlockField {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(BlockField::Index),
            Just(BlockField::Timestamp),
            Just(BlockField::FileName),
            Just(BlockField::FileHash),
            Just(BlockField::SenderId),
            Just(BlockField::ReceiverId),
            Just(BlockField::DataTimestamp),
            Just(BlockField::PreviousHash),
            Just(BlockField::Hash),
        ]
        .boxed()
    }
}

/// Change one field of a block so it differs from its original value.
///
/// The stored hash is left alone (except for `Hash` itself), as an
/// at-rest edit would leave it.
pub fn mutate(block: &mut Block, field: BlockField) {
    fn flip(s: &mut String) {
        s.push('x');
    }

    match field {
        BlockField::Index => block.index = block.index.wrapping_add(7),
        BlockField::Timestamp => flip(&mut block.timestamp),
        BlockField::FileName => flip(&mut block.data.file_name),
        BlockField::FileHash => flip(&mut block.data.file_hash),
        BlockField::SenderId => flip(&mut block.data.sender_id),
        BlockField::ReceiverId => match &mut block.data.receiver_id {
            Some(id) => flip(id),
            None => block.data.receiver_id = Some("intruder".into()),
        },
        BlockField::DataTimestamp => flip(&mut block.data.timestamp),
        BlockField::PreviousHash => flip(&mut block.previous_hash),
        BlockField::Hash => flip(&mut block.hash),
    }
}
