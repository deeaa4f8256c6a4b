//! Locating a beneficiary's entitlement inside a dataset.

use ethers::types::Address;
use tracing::warn;

use crate::types::{ClaimProofStruct, ClaimType, RewardClaimEntry, RewardDataset};

/// Whether `entry` belongs to `beneficiary` for `claim_type`.
///
/// Addresses are compared as bytes, which makes the hex comparison case
/// insensitive.
pub fn is_eligible(entry: &RewardClaimEntry, beneficiary: Address, claim_type: ClaimType) -> bool {
    entry.claim.claim_type == claim_type && entry.claim.beneficiary == beneficiary
}

/// Find the claim for `(beneficiary, claim_type)` in `dataset`.
///
/// The caller picks the address that matches the claim type (identity address
/// for fee rewards, signing policy address for direct rewards, ...). `None`
/// means the beneficiary earned nothing in this epoch. If the dataset holds
/// more than one matching entry the first one wins and a diagnostic is logged.
pub fn find_claim(
    dataset: &RewardDataset,
    beneficiary: Address,
    claim_type: ClaimType,
) -> Option<ClaimProofStruct> {
    let (claim, duplicates) = find_claim_with_duplicates(dataset, beneficiary, claim_type)?;
    if duplicates > 0 {
        warn!(
            epoch = dataset.reward_epoch_id,
            beneficiary = ?beneficiary,
            claim_type = %claim_type,
            duplicates,
            "Dataset holds more than one matching claim, using the first"
        );
    }

    Some(claim)
}

/// First matching claim, with the number of further entries that also match.
pub fn find_claim_with_duplicates(
    dataset: &RewardDataset,
    beneficiary: Address,
    claim_type: ClaimType,
) -> Option<(ClaimProofStruct, usize)> {
    let mut matches = dataset
        .reward_claims
        .iter()
        .filter(|entry| is_eligible(entry, beneficiary, claim_type));

    let first = matches.next()?;
    Some((ClaimProofStruct::from(first), matches.count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RewardClaim;
    use ethers::types::{H256, U256};

    fn entry(beneficiary: Address, claim_type: ClaimType, amount: u64) -> RewardClaimEntry {
        RewardClaimEntry {
            merkle_proof: vec![H256::from_low_u64_be(amount)],
            claim: RewardClaim {
                reward_epoch_id: 100,
                beneficiary,
                amount: U256::from(amount),
                claim_type,
            },
        }
    }

    fn dataset(entries: Vec<RewardClaimEntry>) -> RewardDataset {
        RewardDataset {
            reward_epoch_id: 100,
            reward_claims: entries,
            no_of_weight_based_claims: 0,
            merkle_root: H256::repeat_byte(1),
        }
    }

    #[test]
    fn test_finds_single_match() {
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        let dataset = dataset(vec![
            entry(bob, ClaimType::Fee, 1),
            entry(alice, ClaimType::Direct, 2),
            entry(alice, ClaimType::Fee, 3),
        ]);

        let claim = find_claim(&dataset, alice, ClaimType::Fee).unwrap();
        assert_eq!(claim.body.amount, U256::from(3));
        assert_eq!(claim.merkle_proof, vec![H256::from_low_u64_be(3)]);
    }

    #[test]
    fn test_claim_type_must_match() {
        let alice = Address::repeat_byte(0xa1);
        let dataset = dataset(vec![entry(alice, ClaimType::Direct, 2)]);
        assert!(find_claim(&dataset, alice, ClaimType::Fee).is_none());
    }

    #[test]
    fn test_no_match_is_none() {
        let others = dataset(vec![entry(Address::repeat_byte(0xb0), ClaimType::Fee, 1)]);
        assert!(find_claim(&others, Address::repeat_byte(0xa1), ClaimType::Fee).is_none());

        let empty = dataset(vec![]);
        assert!(find_claim(&empty, Address::zero(), ClaimType::Fee).is_none());
    }

    #[test]
    fn test_duplicate_match_takes_first() {
        let alice = Address::repeat_byte(0xa1);
        let dataset = dataset(vec![
            entry(alice, ClaimType::Fee, 5),
            entry(alice, ClaimType::Fee, 6),
        ]);
        let claim = find_claim(&dataset, alice, ClaimType::Fee).unwrap();
        assert_eq!(claim.body.amount, U256::from(5));
    }

    #[test]
    fn test_duplicate_matches_are_counted() {
        let alice = Address::repeat_byte(0xa1);
        let dataset = dataset(vec![
            entry(alice, ClaimType::Fee, 5),
            entry(alice, ClaimType::Direct, 7),
            entry(alice, ClaimType::Fee, 6),
        ]);

        let (claim, duplicates) =
            find_claim_with_duplicates(&dataset, alice, ClaimType::Fee).unwrap();
        assert_eq!(claim.body.amount, U256::from(5));
        assert_eq!(duplicates, 1);

        let (_, duplicates) =
            find_claim_with_duplicates(&dataset, alice, ClaimType::Direct).unwrap();
        assert_eq!(duplicates, 0);

        assert!(find_claim_with_duplicates(&dataset, alice, ClaimType::Wnat).is_none());
    }
}
