//! Property tests for the ledger and envelope invariants.

use proptest::prelude::*;

use sharechain::{ShareContext, ShareError};
use sharechain_core::{append, append_at, is_valid, validate, Block, BlockData, DivergenceKind};
use sharechain_envelope::{
    combined_content_hash, decrypt, encrypt, open_content, rewrap_key, unwrap_key, wrap_key,
    ContentKey,
};
use sharechain_store::LedgerStore;
use sharechain_testkit::generators::{block_data, chain, mutate, participant, BlockField};
use sharechain_testkit::TestFixture;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn appended_chains_validate(blocks in chain(12)) {
        prop_assert!(is_valid(&blocks));
    }

    #[test]
    fn any_single_mutation_is_detected(
        blocks in chain(8),
        pick in any::<prop::sample::Index>(),
        field: BlockField,
    ) {
        let position = pick.index(blocks.len());
        let mut tampered = blocks.clone();
        mutate(&mut tampered[position], field);

        let err = validate(&tampered).unwrap_err();
        prop_assert!(err.position <= position);
    }

    #[test]
    fn json_roundtrip_keeps_chain_valid(blocks in chain(6)) {
        let reloaded: Vec<Block> = blocks
            .iter()
            .map(|b| Block::from_json(&b.to_json().unwrap()).unwrap())
            .collect();
        prop_assert_eq!(&reloaded, &blocks);
        prop_assert!(is_valid(&reloaded));
    }

    #[test]
    fn append_extends_tail(data in block_data(), blocks in chain(4)) {
        let tail = blocks.last().unwrap();
        let next = append(Some(tail), data).unwrap();

        prop_assert_eq!(next.index, tail.index + 1);
        prop_assert_eq!(&next.previous_hash, &tail.hash);
        let mut extended = blocks.clone();
        extended.push(next);
        prop_assert!(is_valid(&extended));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn wrap_then_unwrap_recovers_key(key in any::<[u8; 32]>(), recipient in participant()) {
        let key = ContentKey::from_slice(&key).unwrap();
        let wrapped = wrap_key(&key, &recipient.public_key()).unwrap();
        prop_assert_eq!(unwrap_key(&wrapped, recipient.secret()).unwrap(), key);
    }

    #[test]
    fn rewrap_preserves_key_identity(
        key in any::<[u8; 32]>(),
        first in participant(),
        second in participant(),
    ) {
        let key = ContentKey::from_slice(&key).unwrap();
        let wrapped = wrap_key(&key, &first.public_key()).unwrap();
        let rewrapped = rewrap_key(&wrapped, first.secret(), &second.public_key()).unwrap();
        prop_assert_eq!(unwrap_key(&rewrapped, second.secret()).unwrap(), key);
    }

    #[test]
    fn bit_flips_never_decrypt(
        content in prop::collection::vec(any::<u8>(), 0..512),
        pick in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let key = ContentKey::generate();
        let mut ciphertext = encrypt(&content, &key).unwrap();
        let byte = pick.index(ciphertext.len());
        ciphertext[byte] ^= 1 << bit;

        prop_assert!(decrypt(&ciphertext, &key).is_err());
    }

    #[test]
    fn shares_record_group_hash(sizes in 1usize..5, shares in 1usize..4) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let fixture = TestFixture::with_participants(&["alice", "bob"]);
            let alice = fixture.participant("alice");
            let bob = fixture.participant("bob");
            fixture.coordinator.bootstrap().await.unwrap();

            for share in 0..shares {
                let mut group = Vec::new();
                let mut ciphertexts = Vec::new();
                for n in 0..sizes {
                    let (object, ciphertext) = fixture
                        .coordinator
                        .seal_and_register(
                            format!("share {} part {}", share, n).as_bytes(),
                            &alice.keypair.public_key(),
                            format!("s{}-o{}", share, n),
                            format!("part-{}.bin", n),
                        )
                        .await
                        .unwrap();
                    group.push(object);
                    ciphertexts.push(ciphertext);
                }

                let result = fixture
                    .coordinator
                    .share(
                        &group,
                        alice.keypair.secret(),
                        &bob.keypair.public_key(),
                        &bob.id,
                        &ShareContext::new(format!("share-{}", share), "alice"),
                    )
                    .await
                    .unwrap();

                assert_eq!(result.block.data.file_hash, combined_content_hash(&group));
                for (object, ciphertext) in result.objects.iter().zip(&ciphertexts) {
                    assert!(open_content(object, ciphertext, bob.keypair.secret()).is_ok());
                }
            }

            let blocks = fixture.coordinator.ledger().all_blocks().await.unwrap();
            assert_eq!(blocks.len(), shares + 1);
            assert!(is_valid(&blocks));
        });
    }
}

#[test]
fn genesis_then_append_then_relink_scenario() {
    let genesis = append_at(
        None,
        BlockData::new("Genesis Block", "0", "0").timestamp("2024-01-01T00:00:00.000Z"),
        "2024-01-01T00:00:00.000Z",
    )
    .unwrap();
    assert_eq!(genesis.index, 0);
    assert_eq!(genesis.previous_hash, "0");

    let p1 = append_at(
        Some(&genesis),
        BlockData::new("a.txt", "aa", "alice").timestamp("2024-01-01T00:00:01.000Z"),
        "2024-01-01T00:00:01.000Z",
    )
    .unwrap();
    assert_eq!(p1.index, 1);
    assert_eq!(p1.previous_hash, genesis.hash);

    let p2 = append_at(
        Some(&p1),
        BlockData::new("b.txt", "bb", "alice").timestamp("2024-01-01T00:00:02.000Z"),
        "2024-01-01T00:00:02.000Z",
    )
    .unwrap();

    let mut chain = vec![genesis, p1, p2];
    chain[1].previous_hash = "f".repeat(64);

    let err = validate(&chain).unwrap_err();
    assert_eq!(err.position, 1);
    assert_eq!(err.index, 1);
    assert_eq!(err.kind, DivergenceKind::HashMismatch);
}

#[tokio::test]
async fn empty_share_is_rejected_without_writes() {
    let fixture = TestFixture::with_participants(&["alice", "bob"]);
    fixture.coordinator.bootstrap().await.unwrap();
    let alice = fixture.participant("alice");
    let bob = fixture.participant("bob");

    let result = fixture
        .coordinator
        .share(
            &[],
            alice.keypair.secret(),
            &bob.keypair.public_key(),
            "bob",
            &ShareContext::new("nothing", "alice"),
        )
        .await;

    assert!(matches!(result, Err(ShareError::EmptyGroup)));
    assert_eq!(fixture.coordinator.ledger().len().await.unwrap(), 1);
}
