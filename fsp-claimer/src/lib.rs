//! fsp-claimer
//!
//! Claims Flare FSP rewards. For a beneficiary and claim type it resolves the
//! epochs that can still be claimed, matches the beneficiary's entry in each
//! epoch's published reward dataset, and settles all matched entries in a
//! single `RewardManager.claim` transaction.
//!
//! Pipeline:
//! 1. Resolve the claimable epoch range from the ledger
//! 2. Keep epochs whose rewards hash is finalized
//! 3. Fetch and validate each epoch's dataset
//! 4. Match the beneficiary's claim and build an ordered batch
//! 5. Submit the batch and wait for the receipt

use std::sync::Arc;

pub mod batch;
pub mod claimer;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod network;
pub mod resolver;
pub mod scheduler;
pub mod submitter;
pub mod types;

pub use batch::ClaimBatch;
pub use claimer::RewardClaimer;
pub use config::{ClaimProfile, ClaimTypeStrategy, ClaimerConfig, ExecutorCredentials};
pub use dataset::{parse_dataset, CachedDatasetSource, DatasetSource, HttpDatasetSource};
pub use error::{ClaimerError, DatasetError};
pub use ledger::{ClaimCall, ClaimSender, EvmClaimSender, EvmLedger, RewardLedger, SettledClaim};
pub use matcher::{find_claim, find_claim_with_duplicates};
pub use network::{Network, NetworkContracts};
pub use resolver::{resolve_range, EpochRange};
pub use scheduler::{AutoClaimer, ClaimPipeline};
pub use submitter::ClaimSubmitter;
pub use types::{
    ClaimProofStruct, ClaimReceipt, ClaimType, CycleOutcome, EpochReward, RewardClaim,
    RewardClaimEntry, RewardDataset, RewardEpochId,
};

/// Shared read-side clients.
#[derive(Clone)]
pub struct Connections {
    pub ledger: Arc<dyn RewardLedger>,
    pub datasets: Arc<dyn DatasetSource>,
}

/// Connect the EVM ledger and the cached dataset source for `config`.
pub fn connect(config: &ClaimerConfig) -> Result<Connections, ClaimerError> {
    let ledger = EvmLedger::new(&config.rpc_url, config.network.contracts())?;
    let datasets = CachedDatasetSource::new(HttpDatasetSource::new(
        config.rewards_data_base_url.clone(),
    ));

    Ok(Connections {
        ledger: Arc::new(ledger),
        datasets: Arc::new(datasets),
    })
}
