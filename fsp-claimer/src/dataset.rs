//! Published reward dataset retrieval and schema validation.
//!
//! One dataset exists per network and epoch, at
//! `{base}/{epoch}/reward-distribution-data-tuples.json`. A dataset that cannot
//! be fetched or does not pass validation is reported as not found: callers
//! treat it the same as an epoch whose rewards are not published yet.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    error::DatasetError,
    types::{ClaimType, RewardClaim, RewardClaimEntry, RewardDataset, RewardEpochId},
};

/// File name of the per-epoch dataset.
pub const DATASET_FILE_NAME: &str = "reward-distribution-data-tuples.json";

/// Source of validated reward datasets.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch the dataset for an epoch, `None` when unavailable.
    async fn fetch(&self, epoch: RewardEpochId) -> Option<Arc<RewardDataset>>;

    /// Drop anything retained for epochs before `epoch`.
    ///
    /// No epoch below the ledger's claimable start can be claimed again, so
    /// nothing older is needed. Sources that keep no state ignore this.
    async fn prune_before(&self, _epoch: RewardEpochId) {}
}

#[async_trait]
impl<S: DatasetSource + ?Sized> DatasetSource for Arc<S> {
    async fn fetch(&self, epoch: RewardEpochId) -> Option<Arc<RewardDataset>> {
        (**self).fetch(epoch).await
    }

    async fn prune_before(&self, epoch: RewardEpochId) {
        (**self).prune_before(epoch).await
    }
}

/// Dataset source backed by the network's public rewards repository.
#[derive(Clone, Debug)]
pub struct HttpDatasetSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDatasetSource {
    /// Create a source reading from `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a source with a preconfigured HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Location of the dataset for `epoch`.
    pub fn dataset_url(&self, epoch: RewardEpochId) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            epoch,
            DATASET_FILE_NAME
        )
    }

    async fn try_fetch(&self, epoch: RewardEpochId) -> Result<RewardDataset, DatasetError> {
        let response = self.client.get(self.dataset_url(epoch)).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DatasetError::NotPublished);
        }
        if !status.is_success() {
            return Err(DatasetError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let dataset = parse_dataset(&body)?;
        if dataset.reward_epoch_id != epoch {
            return Err(DatasetError::Schema(format!(
                "requested epoch {} but dataset is for epoch {}",
                epoch, dataset.reward_epoch_id
            )));
        }
        Ok(dataset)
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    async fn fetch(&self, epoch: RewardEpochId) -> Option<Arc<RewardDataset>> {
        match self.try_fetch(epoch).await {
            Ok(dataset) => {
                debug!(
                    "Fetched reward data for epoch {} ({} claims)",
                    epoch,
                    dataset.reward_claims.len()
                );
                Some(Arc::new(dataset))
            }
            Err(DatasetError::NotPublished) => {
                debug!("Reward data for epoch {} is not published yet", epoch);
                None
            }
            Err(e) => {
                warn!("Error fetching rewards data for epoch {}: {}", epoch, e);
                None
            }
        }
    }
}

/// Memoising wrapper around another source.
///
/// Published datasets are never retracted, so a dataset that was found once
/// stays valid. Misses are not cached.
pub struct CachedDatasetSource<S> {
    inner: S,
    cache: RwLock<HashMap<RewardEpochId, Arc<RewardDataset>>>,
}

impl<S: DatasetSource> CachedDatasetSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached datasets.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

}

#[async_trait]
impl<S: DatasetSource> DatasetSource for CachedDatasetSource<S> {
    async fn fetch(&self, epoch: RewardEpochId) -> Option<Arc<RewardDataset>> {
        if let Some(dataset) = self.cache.read().await.get(&epoch) {
            return Some(Arc::clone(dataset));
        }

        let dataset = self.inner.fetch(epoch).await?;
        self.cache
            .write()
            .await
            .entry(epoch)
            .or_insert_with(|| Arc::clone(&dataset));
        Some(dataset)
    }

    async fn prune_before(&self, epoch: RewardEpochId) {
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|cached, _| *cached >= epoch);
        if cache.len() < before {
            debug!(
                "Evicted {} cached datasets before epoch {}",
                before - cache.len(),
                epoch
            );
        }
        drop(cache);

        self.inner.prune_before(epoch).await;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRewardDataset {
    reward_epoch_id: u64,
    reward_claims: Vec<RawRewardClaim>,
    no_of_weight_based_claims: u64,
    merkle_root: String,
}

/// `[merkleProof, [rewardEpochId, beneficiary, amount, claimType]]`
type RawRewardClaim = (Vec<String>, (u64, String, String, u8));

/// Parse and validate a dataset document.
pub fn parse_dataset(bytes: &[u8]) -> Result<RewardDataset, DatasetError> {
    let raw: RawRewardDataset = serde_json::from_slice(bytes)?;

    let reward_claims = raw
        .reward_claims
        .into_iter()
        .enumerate()
        .map(|(index, claim)| validate_claim(index, raw.reward_epoch_id, claim))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RewardDataset {
        reward_epoch_id: raw.reward_epoch_id,
        reward_claims,
        no_of_weight_based_claims: raw.no_of_weight_based_claims,
        merkle_root: parse_hash("merkleRoot", &raw.merkle_root)?,
    })
}

fn validate_claim(
    index: usize,
    dataset_epoch: RewardEpochId,
    (proof, (epoch, beneficiary, amount, claim_type)): RawRewardClaim,
) -> Result<RewardClaimEntry, DatasetError> {
    let field = |name: &str| format!("rewardClaims[{}].{}", index, name);

    if epoch != dataset_epoch {
        return Err(DatasetError::Schema(format!(
            "{}: epoch {} does not match dataset epoch {}",
            field("rewardEpochId"),
            epoch,
            dataset_epoch
        )));
    }

    let merkle_proof = proof
        .iter()
        .map(|node| parse_hash(&field("merkleProof"), node))
        .collect::<Result<Vec<_>, _>>()?;

    let claim_type = ClaimType::try_from(claim_type).map_err(|value| {
        DatasetError::Schema(format!("{}: unknown claim type {}", field("claimType"), value))
    })?;

    Ok(RewardClaimEntry {
        merkle_proof,
        claim: RewardClaim {
            reward_epoch_id: epoch,
            beneficiary: parse_address(&field("beneficiary"), &beneficiary)?,
            amount: parse_amount(&field("amount"), &amount)?,
            claim_type,
        },
    })
}

fn decode_prefixed_hex(field: &str, value: &str, len: usize) -> Result<Vec<u8>, DatasetError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| DatasetError::Schema(format!("{}: missing 0x prefix", field)))?;
    if digits.len() != len * 2 {
        return Err(DatasetError::Schema(format!(
            "{}: expected {} hex digits, got {}",
            field,
            len * 2,
            digits.len()
        )));
    }
    hex::decode(digits).map_err(|e| DatasetError::Schema(format!("{}: {}", field, e)))
}

fn parse_hash(field: &str, value: &str) -> Result<H256, DatasetError> {
    Ok(H256::from_slice(&decode_prefixed_hex(field, value, 32)?))
}

/// Parse a 20-byte address. Any letter case is accepted.
fn parse_address(field: &str, value: &str) -> Result<Address, DatasetError> {
    Ok(Address::from_slice(&decode_prefixed_hex(field, value, 20)?))
}

fn parse_amount(field: &str, value: &str) -> Result<U256, DatasetError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DatasetError::Schema(format!(
            "{}: '{}' is not a decimal integer",
            field, value
        )));
    }
    U256::from_dec_str(value).map_err(|e| DatasetError::Schema(format!("{}: {}", field, e)))
}
