//! Claim batch submission.

use std::sync::Arc;

use ethers::types::Address;
use tracing::info;

use crate::{
    batch::ClaimBatch,
    error::ClaimerError,
    ledger::{ClaimCall, ClaimSender},
    types::ClaimReceipt,
};

/// Submits claim batches and waits for settlement.
///
/// Failures of the underlying call are returned as they are; nothing is
/// retried here.
#[derive(Clone)]
pub struct ClaimSubmitter {
    sender: Arc<dyn ClaimSender>,
}

impl ClaimSubmitter {
    pub fn new(sender: Arc<dyn ClaimSender>) -> Self {
        Self { sender }
    }

    /// Claim every reward in `batch` for its beneficiary, paying `recipient`.
    ///
    /// The ledger is asked to settle up to the batch's maximum epoch.
    pub async fn submit(
        &self,
        batch: &ClaimBatch,
        recipient: Address,
        wrap: bool,
    ) -> Result<ClaimReceipt, ClaimerError> {
        let reference_epoch = batch.reference_epoch().ok_or(ClaimerError::EmptyBatch)?;

        info!(
            "Claiming {} rewards for {:?} up to epoch {}...",
            batch.claim_type(),
            batch.beneficiary(),
            reference_epoch
        );

        let settled = self
            .sender
            .send_claim(ClaimCall {
                beneficiary: batch.beneficiary(),
                recipient,
                reward_epoch_id: reference_epoch,
                wrap,
                proofs: batch.claims(),
            })
            .await?;

        info!(
            "{} rewards claimed successfully, transaction hash: {:?}",
            batch.claim_type(),
            settled.transaction_hash
        );

        Ok(ClaimReceipt {
            transaction_hash: settled.transaction_hash,
            block_number: settled.block_number,
            gas_used: settled.gas_used,
            reference_epoch,
            claimed_epochs: batch.epochs(),
            total_amount: batch.total_amount(),
        })
    }
}
