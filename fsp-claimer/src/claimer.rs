//! Epoch resolution pipeline for one claim type.
//!
//! Resolves the claimable range, keeps the finalized epochs, fetches each
//! epoch's dataset and matches the beneficiary's claim. Everything here is
//! read-only; submission lives in [`crate::submitter`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    batch::ClaimBatch,
    config::ClaimProfile,
    dataset::DatasetSource,
    error::ClaimerError,
    ledger::RewardLedger,
    matcher::find_claim,
    resolver::{resolve_range, EpochRange},
    types::{ClaimProofStruct, ClaimType, EpochReward, RewardEpochId},
};

/// Claim resolution for one beneficiary and claim type.
#[derive(Clone)]
pub struct RewardClaimer {
    profile: ClaimProfile,
    ledger: Arc<dyn RewardLedger>,
    datasets: Arc<dyn DatasetSource>,
}

impl RewardClaimer {
    pub fn new(
        profile: ClaimProfile,
        ledger: Arc<dyn RewardLedger>,
        datasets: Arc<dyn DatasetSource>,
    ) -> Self {
        Self {
            profile,
            ledger,
            datasets,
        }
    }

    pub fn profile(&self) -> ClaimProfile {
        self.profile
    }

    pub fn claim_type(&self) -> ClaimType {
        self.profile.claim_type
    }

    /// Epochs the beneficiary has not claimed yet, `None` when empty.
    pub async fn resolve_range(&self) -> Result<Option<EpochRange>, ClaimerError> {
        resolve_range(self.ledger.as_ref(), self.profile.beneficiary).await
    }

    /// Release datasets of epochs that can no longer be claimed by anyone.
    pub async fn prune_datasets(&self) -> Result<(), ClaimerError> {
        let (start, _) = self.ledger.claimable_epoch_range().await?;
        self.datasets.prune_before(start).await;
        Ok(())
    }

    /// Epochs in the claimable range whose rewards hash is finalized.
    pub async fn list_claimable_epochs(&self) -> Result<Vec<RewardEpochId>, ClaimerError> {
        let Some(range) = self.resolve_range().await? else {
            return Ok(Vec::new());
        };

        let mut epochs = Vec::new();
        for epoch in range.epochs() {
            let rewards_hash = self.ledger.rewards_hash(epoch).await?;
            if rewards_hash.is_zero() {
                debug!("Rewards hash for epoch {} is not signed yet, skipping", epoch);
                continue;
            }
            epochs.push(epoch);
        }
        Ok(epochs)
    }

    /// Fetch `epoch`'s dataset and match this profile's claim in it.
    pub async fn find_claim(&self, epoch: RewardEpochId) -> Option<ClaimProofStruct> {
        let dataset = self.datasets.fetch(epoch).await?;
        let claim = find_claim(&dataset, self.profile.beneficiary, self.profile.claim_type);
        if claim.is_none() {
            debug!(
                "No {} reward for {:?} in epoch {}",
                self.profile.claim_type, self.profile.beneficiary, epoch
            );
        }
        claim
    }

    /// Batch of every claim that can be settled now.
    ///
    /// Epochs without a published dataset or without a matching entry are
    /// skipped.
    pub async fn collect_claims(&self) -> Result<ClaimBatch, ClaimerError> {
        let mut batch = ClaimBatch::new(self.profile.claim_type, self.profile.beneficiary);

        for epoch in self.list_claimable_epochs().await? {
            if let Some(claim) = self.find_claim(epoch).await {
                batch.push(claim)?;
            }
        }
        Ok(batch)
    }

    /// Single-epoch batch, `None` when nothing is claimable for `epoch`.
    pub async fn collect_epoch(
        &self,
        epoch: RewardEpochId,
    ) -> Result<Option<ClaimBatch>, ClaimerError> {
        let (_, end) = self.ledger.claimable_epoch_range().await?;
        if epoch > end {
            return Err(ClaimerError::NotClaimable { epoch, end });
        }

        let Some(claim) = self.find_claim(epoch).await else {
            info!("No claimable {} rewards found for epoch {}", self.profile.claim_type, epoch);
            return Ok(None);
        };

        let mut batch = ClaimBatch::new(self.profile.claim_type, self.profile.beneficiary);
        batch.push(claim)?;
        Ok(Some(batch))
    }

    /// Claimable epochs with the matched amount, if any.
    pub async fn list_rewards(&self) -> Result<Vec<EpochReward>, ClaimerError> {
        let mut rewards = Vec::new();
        for epoch in self.list_claimable_epochs().await? {
            let amount = self.find_claim(epoch).await.map(|claim| claim.body.amount);
            rewards.push(EpochReward { epoch, amount });
        }
        Ok(rewards)
    }
}
