//! Ordered batches of matched claims.

use ethers::types::{Address, U256};

use crate::{
    error::ClaimerError,
    types::{ClaimProofStruct, ClaimType, RewardEpochId},
};

/// Matched claims for one beneficiary and claim type, settled in one call.
///
/// Claims are kept in strictly increasing epoch order; the last one is the
/// reference epoch passed to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimBatch {
    claim_type: ClaimType,
    beneficiary: Address,
    claims: Vec<ClaimProofStruct>,
}

impl ClaimBatch {
    pub fn new(claim_type: ClaimType, beneficiary: Address) -> Self {
        Self {
            claim_type,
            beneficiary,
            claims: Vec::new(),
        }
    }

    /// Append a claim, rejecting one that breaks ordering or homogeneity.
    pub fn push(&mut self, claim: ClaimProofStruct) -> Result<(), ClaimerError> {
        if claim.body.claim_type != self.claim_type {
            return Err(ClaimerError::InvalidBatch(format!(
                "claim type {} does not match batch type {}",
                claim.body.claim_type, self.claim_type
            )));
        }
        if claim.body.beneficiary != self.beneficiary {
            return Err(ClaimerError::InvalidBatch(format!(
                "beneficiary {:?} does not match batch beneficiary {:?}",
                claim.body.beneficiary, self.beneficiary
            )));
        }
        if let Some(last) = self.reference_epoch() {
            if claim.body.reward_epoch_id <= last {
                return Err(ClaimerError::InvalidBatch(format!(
                    "epoch {} does not follow epoch {}",
                    claim.body.reward_epoch_id, last
                )));
            }
        }

        self.claims.push(claim);
        Ok(())
    }

    pub fn claim_type(&self) -> ClaimType {
        self.claim_type
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn claims(&self) -> &[ClaimProofStruct] {
        &self.claims
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn epochs(&self) -> Vec<RewardEpochId> {
        self.claims.iter().map(|c| c.body.reward_epoch_id).collect()
    }

    /// Maximum epoch in the batch, the ledger settles up to it.
    pub fn reference_epoch(&self) -> Option<RewardEpochId> {
        self.claims.last().map(|c| c.body.reward_epoch_id)
    }

    pub fn total_amount(&self) -> U256 {
        self.claims
            .iter()
            .fold(U256::zero(), |sum, c| sum.saturating_add(c.body.amount))
    }

    pub fn into_claims(self) -> Vec<ClaimProofStruct> {
        self.claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RewardClaim;

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn claim(epoch: RewardEpochId, claim_type: ClaimType, beneficiary: Address) -> ClaimProofStruct {
        ClaimProofStruct {
            merkle_proof: vec![],
            body: RewardClaim {
                reward_epoch_id: epoch,
                beneficiary,
                amount: U256::from(epoch * 10),
                claim_type,
            },
        }
    }

    #[test]
    fn test_reference_epoch_is_maximum() {
        let mut batch = ClaimBatch::new(ClaimType::Fee, alice());
        assert_eq!(batch.reference_epoch(), None);

        batch.push(claim(100, ClaimType::Fee, alice())).unwrap();
        batch.push(claim(102, ClaimType::Fee, alice())).unwrap();
        batch.push(claim(103, ClaimType::Fee, alice())).unwrap();

        assert_eq!(batch.reference_epoch(), Some(103));
        assert_eq!(batch.epochs(), vec![100, 102, 103]);
        assert_eq!(batch.total_amount(), U256::from(3050));
    }

    #[test]
    fn test_rejects_non_increasing_epoch() {
        let mut batch = ClaimBatch::new(ClaimType::Fee, alice());
        batch.push(claim(101, ClaimType::Fee, alice())).unwrap();

        assert!(matches!(
            batch.push(claim(101, ClaimType::Fee, alice())),
            Err(ClaimerError::InvalidBatch(_))
        ));
        assert!(batch.push(claim(100, ClaimType::Fee, alice())).is_err());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_rejects_foreign_claims() {
        let mut batch = ClaimBatch::new(ClaimType::Direct, alice());
        assert!(batch.push(claim(100, ClaimType::Fee, alice())).is_err());
        assert!(batch
            .push(claim(100, ClaimType::Direct, Address::repeat_byte(0xb0)))
            .is_err());
        assert!(batch.is_empty());
    }
}
