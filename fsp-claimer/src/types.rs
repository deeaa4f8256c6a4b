//! Type definitions for reward claiming.
//!
//! This module provides types for:
//! - Claim types and reward epoch identifiers
//! - Published reward datasets and their claim tuples
//! - Submission-ready claim proofs and settlement receipts

use std::{fmt, str::FromStr};

use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::error::ClaimerError;

/// Reward epoch identifier. Strictly increasing, never reused.
pub type RewardEpochId = u64;

/// Category of reward entitlement.
///
/// The discriminant is the wire value used both in published datasets and in
/// the `RewardManager.claim` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ClaimType {
    Direct = 0,
    Fee = 1,
    Wnat = 2,
    Mirror = 3,
    Cchain = 4,
}

impl ClaimType {
    /// Every claim type, in wire order.
    pub const ALL: [ClaimType; 5] = [
        ClaimType::Direct,
        ClaimType::Fee,
        ClaimType::Wnat,
        ClaimType::Mirror,
        ClaimType::Cchain,
    ];

    /// Get the wire value.
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Get the display name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Direct => "DIRECT",
            ClaimType::Fee => "FEE",
            ClaimType::Wnat => "WNAT",
            ClaimType::Mirror => "MIRROR",
            ClaimType::Cchain => "CCHAIN",
        }
    }
}

impl TryFrom<u8> for ClaimType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ClaimType::ALL
            .into_iter()
            .find(|claim_type| claim_type.as_u8() == value)
            .ok_or(value)
    }
}

impl FromStr for ClaimType {
    type Err = ClaimerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ClaimType::ALL
            .into_iter()
            .find(|claim_type| claim_type.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ClaimerError::Config(format!("unknown claim type '{}'", s)))
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim body as published in the dataset and passed to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardClaim {
    pub reward_epoch_id: RewardEpochId,
    /// Beneficiary address (or node id for mirror claims).
    pub beneficiary: Address,
    /// Amount in wei. Parsed from a decimal string, never via floats.
    pub amount: U256,
    pub claim_type: ClaimType,
}

/// One entry of a published reward dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardClaimEntry {
    pub merkle_proof: Vec<H256>,
    pub claim: RewardClaim,
}

/// Validated reward dataset for one epoch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardDataset {
    pub reward_epoch_id: RewardEpochId,
    pub reward_claims: Vec<RewardClaimEntry>,
    pub no_of_weight_based_claims: u64,
    pub merkle_root: H256,
}

/// Matched, submission-ready claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimProofStruct {
    pub merkle_proof: Vec<H256>,
    pub body: RewardClaim,
}

impl From<&RewardClaimEntry> for ClaimProofStruct {
    fn from(entry: &RewardClaimEntry) -> Self {
        Self {
            merkle_proof: entry.merkle_proof.clone(),
            body: entry.claim.clone(),
        }
    }
}

/// Settlement confirmation for a submitted batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    /// Epoch passed to the ledger, the batch maximum.
    pub reference_epoch: RewardEpochId,
    pub claimed_epochs: Vec<RewardEpochId>,
    pub total_amount: U256,
}

/// Claimable epoch with its matched amount, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpochReward {
    pub epoch: RewardEpochId,
    pub amount: Option<U256>,
}

/// Result of one auto-claim cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    NothingToClaim,
    Claimed(ClaimReceipt),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_type_wire_values() {
        assert_eq!(ClaimType::Direct.as_u8(), 0);
        assert_eq!(ClaimType::Cchain.as_u8(), 4);
        assert_eq!(ClaimType::try_from(1), Ok(ClaimType::Fee));
        assert_eq!(ClaimType::try_from(5), Err(5));
    }

    #[test]
    fn test_claim_type_parse() {
        assert_eq!("fee".parse::<ClaimType>().unwrap(), ClaimType::Fee);
        assert_eq!(" Direct ".parse::<ClaimType>().unwrap(), ClaimType::Direct);
        assert_eq!("WNAT".parse::<ClaimType>().unwrap(), ClaimType::Wnat);
        assert!("staking".parse::<ClaimType>().is_err());
    }
}
