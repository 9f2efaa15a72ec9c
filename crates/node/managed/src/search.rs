//! Search for the latest local-unsafe block that is still consistent with canonical L1.

use crate::{L1BlockStore, L2BlockStore, ManagedModeError, StoreError};
use kona_interop::L2BlockInfo;
use std::{fmt::Display, future::Future, time::Duration};
use tracing::{debug, trace, warn};

/// Runs a store lookup of `what`, giving up after `deadline`.
pub(crate) async fn lookup<T>(
    deadline: Duration,
    what: impl Display,
    query: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, ManagedModeError> {
    match tokio::time::timeout(deadline, query).await {
        Ok(result) => result.map_err(|err| ManagedModeError::from_lookup(what, err)),
        Err(_) => {
            warn!(target: "managed_mode", %what, ?deadline, "Store lookup timed out");
            Err(ManagedModeError::Timeout(what.to_string()))
        }
    }
}

/// Returns the last index in `[0, len)` on the probed path for which `valid` holds.
///
/// Leans left: an invalid probe moves the upper bound down, a valid one moves the lower bound
/// up. With a monotone predicate (valid, then invalid) this is the boundary.
pub(crate) async fn search_last_valid<F, Fut, E>(len: u64, mut valid: F) -> Result<Option<u64>, E>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let (mut lo, mut hi) = (0, len);
    let mut last = None;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if valid(mid).await? {
            last = Some(mid);
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(last)
}

/// Checks local-unsafe blocks against canonical L1.
///
/// Every store lookup is bounded by `query_timeout`; one that times out aborts the search.
#[derive(Debug)]
pub(crate) struct LocalValidity<'a, L2, L1> {
    l2: &'a L2,
    l1: &'a L1,
    genesis_number: u64,
    query_timeout: Duration,
}

impl<'a, L2, L1> LocalValidity<'a, L2, L1>
where
    L2: L2BlockStore,
    L1: L1BlockStore,
{
    pub(crate) const fn new(
        l2: &'a L2,
        l1: &'a L1,
        genesis_number: u64,
        query_timeout: Duration,
    ) -> Self {
        Self { l2, l1, genesis_number, query_timeout }
    }

    async fn block(&self, number: u64) -> Result<L2BlockInfo, ManagedModeError> {
        let what = format!("L2 block #{number}");
        lookup(self.query_timeout, what, self.l2.l2_block_ref_by_number(number)).await
    }

    /// Returns the block at `number` if its L1 origin is canonical.
    async fn valid_block(&self, number: u64) -> Result<Option<L2BlockInfo>, ManagedModeError> {
        let block = self.block(number).await?;
        let origin = lookup(
            self.query_timeout,
            format!("L1 block #{}", block.l1_origin.number),
            self.l1.l1_block_ref_by_number(block.l1_origin.number),
        )
        .await?;

        let valid = origin.hash == block.l1_origin.hash;
        trace!(
            target: "managed_mode",
            block_number = number,
            l1_origin = block.l1_origin.number,
            valid,
            "Checked local unsafe block"
        );
        Ok(valid.then_some(block))
    }

    /// Finds the latest local-unsafe block at or below the current tip whose L1 origin is
    /// canonical.
    ///
    /// Blocks above `target` are binary searched first. If none of them is valid, walks back
    /// from `target` (or from the tip, if the target is ahead of it) one block at a time. The
    /// genesis block is always valid.
    pub(crate) async fn find_latest_valid_local_unsafe(
        &self,
        target: u64,
    ) -> Result<L2BlockInfo, ManagedModeError> {
        let latest =
            lookup(self.query_timeout, "latest local unsafe block", self.l2.latest_unsafe()).await?;

        let mut number = if latest.number() > target {
            let offset = target + 1;
            let found = search_last_valid(latest.number() - target, |i| async move {
                Ok::<_, ManagedModeError>(self.valid_block(offset + i).await?.is_some())
            })
            .await?;

            if let Some(i) = found {
                debug!(target: "managed_mode", block_number = offset + i, "Found valid local unsafe block above target");
                return self.block(offset + i).await;
            }
            target
        } else {
            latest.number()
        };

        loop {
            if number <= self.genesis_number {
                return self.block(self.genesis_number).await;
            }
            if let Some(block) = self.valid_block(number).await? {
                debug!(target: "managed_mode", block_number = number, "Found valid local unsafe block");
                return Ok(block);
            }
            number -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        L2Payload,
        test_utils::{InMemoryL1Store, InMemoryL2Store, l1_block, l2_block, l2_block_on_fork},
    };
    use alloy_primitives::B256;
    use async_trait::async_trait;
    use kona_interop::Receipts;
    use mockall::mock;
    use std::convert::Infallible;
    use tokio::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(5);

    mock! {
        #[derive(Debug)]
        pub L2Store {}

        #[async_trait]
        impl L2BlockStore for L2Store {
            async fn l2_block_ref_by_number(&self, number: u64) -> Result<L2BlockInfo, StoreError>;
            async fn l2_block_ref_by_hash(&self, hash: B256) -> Result<L2BlockInfo, StoreError>;
            async fn latest_unsafe(&self) -> Result<L2BlockInfo, StoreError>;
            async fn receipts_by_hash(&self, hash: B256) -> Result<Receipts, StoreError>;
            async fn payload_by_hash(&self, hash: B256) -> Result<L2Payload, StoreError>;
        }
    }

    /// L2 blocks `0..=tip`, those in `stale` built on a reorged-out L1 fork.
    fn stores(tip: u64, stale: impl Fn(u64) -> bool) -> (InMemoryL2Store, InMemoryL1Store) {
        let l1 = InMemoryL1Store::default();
        for n in 0..=tip {
            l1.insert(l1_block(n, 0));
        }
        let l2 = InMemoryL2Store::default();
        for n in 0..=tip {
            l2.insert_block(l2_block_on_fork(n, n, if stale(n) { 1 } else { 0 }));
        }
        (l2, l1)
    }

    #[tokio::test]
    async fn test_search_last_valid_boundary() {
        for boundary in 0..10u64 {
            let found = search_last_valid(10, |i| async move { Ok::<_, Infallible>(i < boundary) })
                .await
                .unwrap();
            assert_eq!(found, boundary.checked_sub(1));
        }
    }

    #[tokio::test]
    async fn test_search_last_valid_empty_range() {
        let found = search_last_valid(0, |_| async { Ok::<_, Infallible>(true) }).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_all_valid_returns_tip() {
        let (l2, l1) = stores(100, |_| false);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let block = validity.find_latest_valid_local_unsafe(40).await.unwrap();
        assert_eq!(block.number(), 100);
    }

    #[tokio::test]
    async fn test_boundary_above_target() {
        let (l2, l1) = stores(100, |n| n > 73);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let block = validity.find_latest_valid_local_unsafe(40).await.unwrap();
        assert_eq!(block.number(), 73);
    }

    #[tokio::test]
    async fn test_walkback_below_stale_target() {
        // Target 101 is ahead of the tip; 100 is stale, 96..=99 are valid.
        let (l2, l1) = stores(100, |n| n == 100 || n < 96);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let block = validity.find_latest_valid_local_unsafe(101).await.unwrap();
        assert_eq!(block.number(), 99);
    }

    #[tokio::test]
    async fn test_walkback_from_target() {
        let (l2, l1) = stores(20, |n| n > 12);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let block = validity.find_latest_valid_local_unsafe(15).await.unwrap();
        assert_eq!(block.number(), 12);
    }

    #[tokio::test]
    async fn test_walkback_stops_at_genesis() {
        let (l2, l1) = stores(10, |_| true);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let block = validity.find_latest_valid_local_unsafe(10).await.unwrap();
        assert_eq!(block.number(), 0);
    }

    #[tokio::test]
    async fn test_lookup_error_is_propagated() {
        let (l2, l1) = stores(10, |n| n > 5);
        l1.remove(5);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let err = validity.find_latest_valid_local_unsafe(8).await.unwrap_err();
        assert!(matches!(err, ManagedModeError::BlockNotFound(_)));
    }

    #[tokio::test]
    async fn test_backend_failure_aborts_search() {
        let mut l2 = MockL2Store::new();
        l2.expect_latest_unsafe().returning(|| Ok(l2_block(30)));
        l2.expect_l2_block_ref_by_number()
            .returning(|number| match number {
                n if n > 25 => Err(StoreError::Backend("connection reset".to_string())),
                n => Ok(l2_block(n)),
            });
        let l1 = InMemoryL1Store::with_chain(30);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let err = validity.find_latest_valid_local_unsafe(20).await.unwrap_err();
        assert!(matches!(err, ManagedModeError::Internal(_)));
    }

    #[tokio::test]
    async fn test_latest_unsafe_failure_is_propagated() {
        let mut l2 = MockL2Store::new();
        l2.expect_latest_unsafe().returning(|| Err(StoreError::NotFound("head".to_string())));
        l2.expect_l2_block_ref_by_number().never();
        let l1 = InMemoryL1Store::with_chain(1);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let err = validity.find_latest_valid_local_unsafe(5).await.unwrap_err();
        assert!(matches!(err, ManagedModeError::BlockNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_lookup_aborts_search() {
        let l2 = InMemoryL2Store::with_chain(30);
        l2.stall_above(Some(25));
        let l1 = InMemoryL1Store::with_chain(30);
        let validity = LocalValidity::new(&l2, &l1, 0, TIMEOUT);

        let started = Instant::now();
        let err = validity.find_latest_valid_local_unsafe(20).await.unwrap_err();
        assert_eq!(err, ManagedModeError::Timeout("L2 block #26".to_string()));
        assert!(started.elapsed() >= TIMEOUT && started.elapsed() < TIMEOUT * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_timeout() {
        let err = lookup(TIMEOUT, "L1 block #3", std::future::pending::<Result<(), StoreError>>())
            .await
            .unwrap_err();
        assert_eq!(err, ManagedModeError::Timeout("L1 block #3".to_string()));

        let missing = async { Err::<(), _>(StoreError::NotFound("3".into())) };
        let err = lookup(TIMEOUT, "L1 block #3", missing).await.unwrap_err();
        assert_eq!(err, ManagedModeError::BlockNotFound("L1 block #3".to_string()));
    }
}
