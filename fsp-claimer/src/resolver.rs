//! Claimable epoch range resolution.

use std::ops::RangeInclusive;

use ethers::types::Address;
use tracing::debug;

use crate::{error::ClaimerError, ledger::RewardLedger, types::RewardEpochId};

/// Non-empty inclusive range of epochs a beneficiary may still claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochRange {
    start: RewardEpochId,
    end: RewardEpochId,
}

impl EpochRange {
    /// Build a range, `None` when `end < start`.
    pub fn new(start: RewardEpochId, end: RewardEpochId) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    pub fn start(&self) -> RewardEpochId {
        self.start
    }

    pub fn end(&self) -> RewardEpochId {
        self.end
    }

    pub fn epochs(&self) -> RangeInclusive<RewardEpochId> {
        self.start..=self.end
    }

    pub fn contains(&self, epoch: RewardEpochId) -> bool {
        self.epochs().contains(&epoch)
    }
}

/// Resolve the epochs `beneficiary` may still claim.
///
/// The start is the beneficiary's own "next claimable" counter, the end is
/// the ledger-wide claimable upper bound. The range may contain epochs that
/// are not finalized or not published yet.
pub async fn resolve_range(
    ledger: &dyn RewardLedger,
    beneficiary: Address,
) -> Result<Option<EpochRange>, ClaimerError> {
    let start = ledger.next_claimable_epoch(beneficiary).await?;
    let (_, end) = ledger.claimable_epoch_range().await?;

    let range = EpochRange::new(start, end);
    match range {
        Some(range) => debug!(
            "Claimable range for {:?}: [{}, {}]",
            beneficiary,
            range.start(),
            range.end()
        ),
        None => debug!(
            "Nothing new to claim for {:?} (next {}, claimable up to {})",
            beneficiary, start, end
        ),
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_when_end_before_start() {
        assert_eq!(EpochRange::new(101, 100), None);
    }

    #[test]
    fn test_single_epoch_range() {
        let range = EpochRange::new(100, 100).unwrap();
        assert_eq!(range.epochs().collect::<Vec<_>>(), vec![100]);
    }

    #[test]
    fn test_contains() {
        let range = EpochRange::new(100, 103).unwrap();
        assert!(range.contains(100));
        assert!(range.contains(103));
        assert!(!range.contains(104));
        assert!(!range.contains(99));
    }
}
