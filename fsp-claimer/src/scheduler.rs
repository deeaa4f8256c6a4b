//! Periodic auto-claiming.
//!
//! Each claim type runs in its own task. A task runs one full cycle
//! (resolve, fetch, match, submit and wait for the receipt), then sleeps for
//! the polling interval. The stop signal is only observed between cycles.

use std::{sync::Arc, time::Duration};

use ethers::{types::Address, utils::format_ether};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    claimer::RewardClaimer,
    config::ClaimerConfig,
    dataset::DatasetSource,
    error::ClaimerError,
    ledger::{EvmClaimSender, RewardLedger},
    submitter::ClaimSubmitter,
    types::{ClaimType, CycleOutcome, RewardEpochId},
};

/// Resolution plus submission for one claim type.
#[derive(Clone)]
pub struct ClaimPipeline {
    claimer: RewardClaimer,
    submitter: ClaimSubmitter,
    recipient: Address,
    wrap: bool,
}

impl ClaimPipeline {
    pub fn new(
        claimer: RewardClaimer,
        submitter: ClaimSubmitter,
        recipient: Address,
        wrap: bool,
    ) -> Self {
        Self {
            claimer,
            submitter,
            recipient,
            wrap,
        }
    }

    /// Build the EVM pipeline for `claim_type`.
    ///
    /// Fails with a configuration error, without touching the network, when
    /// the claim type's beneficiary, recipient or executor key is missing.
    pub fn from_config(
        config: &ClaimerConfig,
        claim_type: ClaimType,
        ledger: Arc<dyn RewardLedger>,
        datasets: Arc<dyn DatasetSource>,
    ) -> Result<Self, ClaimerError> {
        let profile = config.profile(claim_type)?;
        let executor = config.executor(claim_type)?;

        let sender = EvmClaimSender::new(
            &config.rpc_url,
            executor.wallet,
            config.network.chain_id(),
            config.network.contracts().reward_manager,
        )?;
        debug!(
            "{} claims are sent by executor {:?}",
            claim_type,
            sender.executor_address()
        );

        Ok(Self::new(
            RewardClaimer::new(profile, ledger, datasets),
            ClaimSubmitter::new(Arc::new(sender)),
            executor.recipient,
            executor.wrap,
        ))
    }

    pub fn claim_type(&self) -> ClaimType {
        self.claimer.claim_type()
    }

    pub fn claimer(&self) -> &RewardClaimer {
        &self.claimer
    }

    /// Claim every outstanding reward of this claim type.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, ClaimerError> {
        let claim_type = self.claim_type();
        self.claimer.prune_datasets().await?;
        let batch = self.claimer.collect_claims().await?;

        if batch.is_empty() {
            info!("No claimable {} rewards found", claim_type);
            return Ok(CycleOutcome::NothingToClaim);
        }

        let epochs = batch
            .epochs()
            .iter()
            .map(|epoch| epoch.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!("{} reward tuples found for epochs: {}", claim_type, epochs);
        for claim in batch.claims() {
            info!(
                "Epoch {}: {}",
                claim.body.reward_epoch_id,
                format_ether(claim.body.amount)
            );
        }

        let receipt = self.submitter.submit(&batch, self.recipient, self.wrap).await?;
        Ok(CycleOutcome::Claimed(receipt))
    }

    /// Claim the rewards of a single epoch.
    pub async fn claim_epoch(&self, epoch: RewardEpochId) -> Result<CycleOutcome, ClaimerError> {
        let Some(batch) = self.claimer.collect_epoch(epoch).await? else {
            return Ok(CycleOutcome::NothingToClaim);
        };

        info!(
            "Found {} of {} rewards for epoch {}",
            format_ether(batch.total_amount()),
            self.claim_type(),
            epoch
        );
        let receipt = self.submitter.submit(&batch, self.recipient, self.wrap).await?;
        Ok(CycleOutcome::Claimed(receipt))
    }
}

/// Runs every configured claim type on a fixed period.
pub struct AutoClaimer {
    pipelines: Vec<Arc<ClaimPipeline>>,
    interval: Duration,
}

impl AutoClaimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            pipelines: Vec::new(),
            interval,
        }
    }

    pub fn with_pipeline(mut self, pipeline: ClaimPipeline) -> Self {
        self.pipelines.push(Arc::new(pipeline));
        self
    }

    pub fn claim_types(&self) -> Vec<ClaimType> {
        self.pipelines.iter().map(|p| p.claim_type()).collect()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle of every claim type concurrently.
    ///
    /// A failing claim type does not affect the others.
    pub async fn run_tick(&self) -> Vec<(ClaimType, Result<CycleOutcome, ClaimerError>)> {
        join_all(self.pipelines.iter().map(|pipeline| async move {
            (pipeline.claim_type(), pipeline.run_cycle().await)
        }))
        .await
    }

    /// Poll until `stop` is cancelled.
    pub async fn run(self, stop: CancellationToken) {
        info!(
            "Starting auto-claimer for {:?}, polling every {:?}",
            self.claim_types(),
            self.interval
        );

        let handles: Vec<_> = self
            .pipelines
            .into_iter()
            .map(|pipeline| tokio::spawn(poll(pipeline, self.interval, stop.clone())))
            .collect();

        for handle in join_all(handles).await {
            if let Err(e) = handle {
                error!("Auto-claim task panicked: {}", e);
            }
        }
        info!("Auto-claimer stopped");
    }
}

async fn poll(pipeline: Arc<ClaimPipeline>, interval: Duration, stop: CancellationToken) {
    let claim_type = pipeline.claim_type();

    while !stop.is_cancelled() {
        match pipeline.run_cycle().await {
            Ok(CycleOutcome::Claimed(receipt)) => info!(
                "Claimed {} {} rewards for epochs {:?} in {:?}",
                format_ether(receipt.total_amount),
                claim_type,
                receipt.claimed_epochs,
                receipt.transaction_hash
            ),
            Ok(CycleOutcome::NothingToClaim) => {}
            Err(e) => error!("{} auto-claim cycle failed: {}", claim_type, e),
        }

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!("{} auto-claim task finished", claim_type);
}
