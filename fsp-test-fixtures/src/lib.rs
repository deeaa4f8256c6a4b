//! In-memory ledger and dataset fixtures shared by the claimer tests.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use fsp_claimer::{
    ClaimCall, ClaimProofStruct, ClaimSender, ClaimType, ClaimerError, DatasetSource,
    RewardClaim, RewardClaimEntry, RewardDataset, RewardEpochId, RewardLedger, SettledClaim,
};
use serde_json::{json, Value};

/// Sample identity address used as fee beneficiary.
pub fn identity_address() -> Address {
    Address::repeat_byte(0xab)
}

/// Sample signing policy address used as direct beneficiary.
pub fn signing_policy_address() -> Address {
    Address::repeat_byte(0x5a)
}

/// Sample reward recipient.
pub fn recipient_address() -> Address {
    Address::repeat_byte(0xce)
}

/// One reward claim entry with a deterministic proof.
pub fn claim_entry(
    epoch: RewardEpochId,
    beneficiary: Address,
    claim_type: ClaimType,
    amount: U256,
) -> RewardClaimEntry {
    RewardClaimEntry {
        merkle_proof: vec![
            H256::from_low_u64_be(epoch),
            H256::from_low_u64_be(amount.low_u64()),
        ],
        claim: RewardClaim {
            reward_epoch_id: epoch,
            beneficiary,
            amount,
            claim_type,
        },
    }
}

/// Dataset for `epoch` holding `entries`.
pub fn dataset(epoch: RewardEpochId, entries: Vec<RewardClaimEntry>) -> RewardDataset {
    RewardDataset {
        reward_epoch_id: epoch,
        no_of_weight_based_claims: entries.len() as u64,
        reward_claims: entries,
        merkle_root: H256::from_low_u64_be(0xfeed_0000 + epoch),
    }
}

/// Wire representation of a dataset, as published.
pub fn dataset_json(dataset: &RewardDataset) -> Value {
    let claims: Vec<Value> = dataset
        .reward_claims
        .iter()
        .map(|entry| {
            let proof: Vec<String> = entry.merkle_proof.iter().map(|node| hex32(node)).collect();
            json!([
                proof,
                [
                    entry.claim.reward_epoch_id,
                    format!("0x{}", hex::encode(entry.claim.beneficiary.as_bytes())),
                    entry.claim.amount.to_string(),
                    entry.claim.claim_type.as_u8(),
                ]
            ])
        })
        .collect();

    json!({
        "rewardEpochId": dataset.reward_epoch_id,
        "rewardClaims": claims,
        "noOfWeightBasedClaims": dataset.no_of_weight_based_claims,
        "merkleRoot": hex32(&dataset.merkle_root),
    })
}

fn hex32(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Claim recorded by [`MockLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedClaim {
    pub beneficiary: Address,
    pub recipient: Address,
    pub reward_epoch_id: RewardEpochId,
    pub wrap: bool,
    pub proofs: Vec<ClaimProofStruct>,
}

#[derive(Default)]
struct LedgerState {
    next_claimable: HashMap<Address, RewardEpochId>,
    default_next_claimable: RewardEpochId,
    range: (RewardEpochId, RewardEpochId),
    unfinalized: BTreeSet<RewardEpochId>,
    rejected: HashMap<Address, String>,
    claims: Vec<RecordedClaim>,
}

/// In-memory reward ledger.
///
/// A successful claim advances the beneficiary's next claimable epoch past the
/// claimed epoch, like the real contract does.
#[derive(Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
    hash_queries: Arc<AtomicUsize>,
    range_queries: Arc<AtomicUsize>,
}

impl MockLedger {
    /// Ledger whose global claimable range is `[start, end]`.
    pub fn new(start: RewardEpochId, end: RewardEpochId) -> Self {
        let ledger = Self::default();
        {
            let mut state = ledger.state.lock().unwrap();
            state.range = (start, end);
            state.default_next_claimable = start;
        }
        ledger
    }

    pub fn set_next_claimable(&self, beneficiary: Address, epoch: RewardEpochId) {
        self.state
            .lock()
            .unwrap()
            .next_claimable
            .insert(beneficiary, epoch);
    }

    pub fn set_range(&self, start: RewardEpochId, end: RewardEpochId) {
        self.state.lock().unwrap().range = (start, end);
    }

    /// Report an all-zero rewards hash for `epoch`.
    pub fn mark_unfinalized(&self, epoch: RewardEpochId) {
        self.state.lock().unwrap().unfinalized.insert(epoch);
    }

    /// Revert every claim made for `beneficiary`.
    pub fn reject_claims_for(&self, beneficiary: Address, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected
            .insert(beneficiary, reason.to_string());
    }

    pub fn claims(&self) -> Vec<RecordedClaim> {
        self.state.lock().unwrap().claims.clone()
    }

    pub fn hash_queries(&self) -> usize {
        self.hash_queries.load(Ordering::SeqCst)
    }

    pub fn range_queries(&self) -> usize {
        self.range_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RewardLedger for MockLedger {
    async fn next_claimable_epoch(
        &self,
        beneficiary: Address,
    ) -> Result<RewardEpochId, ClaimerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .next_claimable
            .get(&beneficiary)
            .copied()
            .unwrap_or(state.default_next_claimable))
    }

    async fn claimable_epoch_range(
        &self,
    ) -> Result<(RewardEpochId, RewardEpochId), ClaimerError> {
        self.range_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().range)
    }

    async fn rewards_hash(&self, epoch: RewardEpochId) -> Result<H256, ClaimerError> {
        self.hash_queries.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().unwrap().unfinalized.contains(&epoch) {
            Ok(H256::zero())
        } else {
            Ok(H256::from_low_u64_be(0xbeef_0000 + epoch))
        }
    }
}

#[async_trait]
impl ClaimSender for MockLedger {
    async fn send_claim(&self, call: ClaimCall<'_>) -> Result<SettledClaim, ClaimerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.rejected.get(&call.beneficiary) {
            return Err(ClaimerError::Submission(reason.clone()));
        }

        state
            .next_claimable
            .insert(call.beneficiary, call.reward_epoch_id + 1);
        state.claims.push(RecordedClaim {
            beneficiary: call.beneficiary,
            recipient: call.recipient,
            reward_epoch_id: call.reward_epoch_id,
            wrap: call.wrap,
            proofs: call.proofs.to_vec(),
        });

        Ok(SettledClaim {
            transaction_hash: H256::from_low_u64_be(state.claims.len() as u64),
            block_number: Some(1_000 + state.claims.len() as u64),
            gas_used: Some(U256::from(210_000u64)),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DATASETS
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory dataset source that records every fetch.
#[derive(Clone, Default)]
pub struct MemoryDatasets {
    datasets: Arc<Mutex<HashMap<RewardEpochId, Arc<RewardDataset>>>>,
    fetches: Arc<Mutex<Vec<RewardEpochId>>>,
}

impl MemoryDatasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, dataset: RewardDataset) {
        self.datasets
            .lock()
            .unwrap()
            .insert(dataset.reward_epoch_id, Arc::new(dataset));
    }

    /// Epochs requested so far, in order.
    pub fn fetches(&self) -> Vec<RewardEpochId> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatasetSource for MemoryDatasets {
    async fn fetch(&self, epoch: RewardEpochId) -> Option<Arc<RewardDataset>> {
        self.fetches.lock().unwrap().push(epoch);
        self.datasets.lock().unwrap().get(&epoch).cloned()
    }
}
