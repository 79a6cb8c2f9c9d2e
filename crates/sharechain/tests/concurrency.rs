//! Two coordinators racing for the same ledger tail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use sharechain::core::{validate, Block};
use sharechain::envelope::ParticipantKeypair;
use sharechain::store::{AppendResult, LedgerStore, MemoryLedger, MemoryObjectStore, StoreError};
use sharechain::{CoordinatorConfig, ShareContext, SharingCoordinator};

/// Holds the first `gated` tail reads until all of them have arrived, so
/// both writers build their block on the same tail.
struct BarrierLedger {
    inner: MemoryLedger,
    barrier: Barrier,
    reads: AtomicUsize,
    gated: usize,
}

impl BarrierLedger {
    fn new(gated: usize) -> Self {
        Self {
            inner: MemoryLedger::new(),
            barrier: Barrier::new(gated),
            reads: AtomicUsize::new(0),
            gated,
        }
    }
}

#[async_trait]
impl LedgerStore for BarrierLedger {
    async fn get_tail(&self) -> Result<Option<Block>, StoreError> {
        let tail = self.inner.get_tail().await?;
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.gated {
            self.barrier.wait().await;
        }
        Ok(tail)
    }

    async fn append_if_tail_matches(
        &self,
        expected_previous_hash: &str,
        block: &Block,
    ) -> Result<AppendResult, StoreError> {
        self.inner
            .append_if_tail_matches(expected_previous_hash, block)
            .await
    }

    async fn get_block(&self, index: u64) -> Result<Option<Block>, StoreError> {
        self.inner.get_block(index).await
    }

    async fn get_blocks(&self, start: u64, end: u64) -> Result<Vec<Block>, StoreError> {
        self.inner.get_blocks(start, end).await
    }

    async fn len(&self) -> Result<u64, StoreError> {
        self.inner.len().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_shares_land_on_consecutive_blocks() {
    let ledger = Arc::new(BarrierLedger::new(2));
    let objects = Arc::new(MemoryObjectStore::new());
    let config = CoordinatorConfig::default()
        .initial_backoff(Duration::from_millis(1))
        .verify_chain_on_bootstrap(false);

    let first = SharingCoordinator::from_shared(ledger.clone(), objects.clone(), config.clone());
    let second = SharingCoordinator::from_shared(ledger.clone(), objects.clone(), config);

    // Seed genesis directly so the gated reads belong to the two shares.
    let genesis = sharechain::core::append(None, sharechain::BlockData::genesis()).unwrap();
    ledger.inner.append_if_tail_matches("0", &genesis).await.unwrap();

    let alice = ParticipantKeypair::generate();
    let bob = ParticipantKeypair::generate();
    let carol = ParticipantKeypair::generate();

    let (doc_a, _) = first
        .seal_and_register(b"for bob", &alice.public_key(), "doc-a", "a.txt")
        .await
        .unwrap();
    let (doc_b, _) = second
        .seal_and_register(b"for carol", &alice.public_key(), "doc-b", "b.txt")
        .await
        .unwrap();

    let (group_a, group_b) = ([doc_a], [doc_b]);
    let (bob_public, carol_public) = (bob.public_key(), carol.public_key());
    let ctx_a = ShareContext::new("a.txt", "alice");
    let ctx_b = ShareContext::new("b.txt", "alice");
    let (ra, rb) = tokio::join!(
        first.share(&group_a, alice.secret(), &bob_public, "bob", &ctx_a),
        second.share(&group_b, alice.secret(), &carol_public, "carol", &ctx_b),
    );
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    let mut indices = [ra.block.index, rb.block.index];
    indices.sort_unstable();
    assert_eq!(indices, [1, 2]);

    let mut attempts = [ra.attempts, rb.attempts];
    attempts.sort_unstable();
    assert_eq!(attempts, [1, 2]);

    let (early, late) = if ra.block.index == 1 { (&ra, &rb) } else { (&rb, &ra) };
    assert_eq!(late.block.previous_hash, early.block.hash);

    let blocks = ledger.all_blocks().await.unwrap();
    assert_eq!(blocks.len(), 3);
    assert!(validate(&blocks).is_ok());
}
