//! Reward ledger access.
//!
//! Reads go through `eth_call` against `RewardManager` and
//! `FlareSystemsManager`; claims are signed by a per-claim-type executor
//! wallet and awaited until mined.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    abi::{ParamType, Token},
    prelude::*,
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, H256, U256},
    utils::keccak256,
};
use tracing::{debug, info};

use crate::{
    error::ClaimerError,
    network::NetworkContracts,
    types::{ClaimProofStruct, RewardEpochId},
};

const GET_NEXT_CLAIMABLE_REWARD_EPOCH_ID: &str = "getNextClaimableRewardEpochId(address)";
const GET_REWARD_EPOCH_IDS_WITH_CLAIMABLE_REWARDS: &str =
    "getRewardEpochIdsWithClaimableRewards()";
const REWARDS_HASH: &str = "rewardsHash(uint256)";
const CLAIM: &str = "claim(address,address,uint24,bool,(bytes32[],(uint24,bytes20,uint120,uint8))[])";

/// Read side of the reward ledger.
#[async_trait]
pub trait RewardLedger: Send + Sync {
    /// Next epoch `beneficiary` has not claimed yet.
    async fn next_claimable_epoch(&self, beneficiary: Address)
        -> Result<RewardEpochId, ClaimerError>;

    /// Global `(start, end)` range of epochs with claimable rewards.
    async fn claimable_epoch_range(&self) -> Result<(RewardEpochId, RewardEpochId), ClaimerError>;

    /// Signed rewards hash of an epoch. All zero until finalized.
    async fn rewards_hash(&self, epoch: RewardEpochId) -> Result<H256, ClaimerError>;
}

/// Arguments of a `RewardManager.claim` call.
#[derive(Clone, Copy, Debug)]
pub struct ClaimCall<'a> {
    pub beneficiary: Address,
    pub recipient: Address,
    pub reward_epoch_id: RewardEpochId,
    pub wrap: bool,
    pub proofs: &'a [ClaimProofStruct],
}

/// Mined claim transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettledClaim {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

/// Write side of the reward ledger.
#[async_trait]
pub trait ClaimSender: Send + Sync {
    /// Send a claim and wait until it is mined.
    async fn send_claim(&self, call: ClaimCall<'_>) -> Result<SettledClaim, ClaimerError>;
}

/// `RewardLedger` over an EVM JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct EvmLedger {
    provider: Arc<Provider<Http>>,
    contracts: NetworkContracts,
}

impl EvmLedger {
    pub fn new(rpc_url: &str, contracts: NetworkContracts) -> Result<Self, ClaimerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ClaimerError::Config(format!("invalid RPC URL {}: {}", rpc_url, e)))?;

        Ok(Self {
            provider: Arc::new(provider),
            contracts,
        })
    }

    async fn view(
        &self,
        to: Address,
        signature: &str,
        args: &[Token],
        outputs: &[ParamType],
    ) -> Result<Vec<Token>, ClaimerError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(to)
            .data(Bytes::from(calldata(signature, args)))
            .into();

        let raw = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| ClaimerError::Ledger(format!("{} failed: {}", signature, e)))?;

        ethers::abi::decode(outputs, &raw).map_err(|e| {
            ClaimerError::Ledger(format!("failed to decode {} response: {}", signature, e))
        })
    }
}

#[async_trait]
impl RewardLedger for EvmLedger {
    async fn next_claimable_epoch(
        &self,
        beneficiary: Address,
    ) -> Result<RewardEpochId, ClaimerError> {
        let tokens = self
            .view(
                self.contracts.reward_manager,
                GET_NEXT_CLAIMABLE_REWARD_EPOCH_ID,
                &[Token::Address(beneficiary)],
                &[ParamType::Uint(256)],
            )
            .await?;
        epoch_at(&tokens, 0)
    }

    async fn claimable_epoch_range(
        &self,
    ) -> Result<(RewardEpochId, RewardEpochId), ClaimerError> {
        let tokens = self
            .view(
                self.contracts.reward_manager,
                GET_REWARD_EPOCH_IDS_WITH_CLAIMABLE_REWARDS,
                &[],
                &[ParamType::Uint(24), ParamType::Uint(24)],
            )
            .await?;
        Ok((epoch_at(&tokens, 0)?, epoch_at(&tokens, 1)?))
    }

    async fn rewards_hash(&self, epoch: RewardEpochId) -> Result<H256, ClaimerError> {
        let tokens = self
            .view(
                self.contracts.flare_systems_manager,
                REWARDS_HASH,
                &[Token::Uint(U256::from(epoch))],
                &[ParamType::FixedBytes(32)],
            )
            .await?;

        match tokens.into_iter().next() {
            Some(Token::FixedBytes(bytes)) if bytes.len() == 32 => Ok(H256::from_slice(&bytes)),
            other => Err(ClaimerError::Ledger(format!(
                "unexpected rewardsHash response: {:?}",
                other
            ))),
        }
    }
}

/// `ClaimSender` signing with a local executor wallet.
pub struct EvmClaimSender {
    client: Arc<SignerMiddleware<Provider<Http>, LocalWallet>>,
    reward_manager: Address,
}

impl EvmClaimSender {
    pub fn new(
        rpc_url: &str,
        wallet: LocalWallet,
        chain_id: u64,
        reward_manager: Address,
    ) -> Result<Self, ClaimerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ClaimerError::Config(format!("invalid RPC URL {}: {}", rpc_url, e)))?;

        let client = SignerMiddleware::new(provider, wallet.with_chain_id(chain_id));

        Ok(Self {
            client: Arc::new(client),
            reward_manager,
        })
    }

    /// Address that pays for claim transactions.
    pub fn executor_address(&self) -> Address {
        self.client.address()
    }
}

#[async_trait]
impl ClaimSender for EvmClaimSender {
    async fn send_claim(&self, call: ClaimCall<'_>) -> Result<SettledClaim, ClaimerError> {
        let tx = TransactionRequest::new()
            .to(self.reward_manager)
            .data(Bytes::from(encode_claim(&call)));

        debug!(
            "Sending claim for {:?} up to epoch {} to {:?}",
            call.beneficiary, call.reward_epoch_id, self.reward_manager
        );

        let pending_tx = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| ClaimerError::Submission(e.to_string()))?;
        let tx_hash = pending_tx.tx_hash();

        info!("Transaction {:?} submitted, waiting for confirmation...", tx_hash);

        let receipt = pending_tx
            .await
            .map_err(|e| ClaimerError::Submission(e.to_string()))?
            .ok_or_else(|| {
                ClaimerError::Submission(format!("transaction {:?} was dropped", tx_hash))
            })?;

        if receipt.status != Some(U64::from(1u64)) {
            return Err(ClaimerError::Submission(format!(
                "transaction {:?} reverted",
                tx_hash
            )));
        }

        Ok(SettledClaim {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            gas_used: receipt.gas_used,
        })
    }
}

fn calldata(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = keccak256(signature.as_bytes())[..4].to_vec();
    data.extend_from_slice(&ethers::abi::encode(args));
    data
}

/// ABI-encode a `RewardManager.claim` call.
pub fn encode_claim(call: &ClaimCall<'_>) -> Vec<u8> {
    let proofs = call
        .proofs
        .iter()
        .map(|proof| {
            Token::Tuple(vec![
                Token::Array(
                    proof
                        .merkle_proof
                        .iter()
                        .map(|node| Token::FixedBytes(node.as_bytes().to_vec()))
                        .collect(),
                ),
                Token::Tuple(vec![
                    Token::Uint(U256::from(proof.body.reward_epoch_id)),
                    Token::FixedBytes(proof.body.beneficiary.as_bytes().to_vec()),
                    Token::Uint(proof.body.amount),
                    Token::Uint(U256::from(proof.body.claim_type.as_u8())),
                ]),
            ])
        })
        .collect();

    calldata(
        CLAIM,
        &[
            Token::Address(call.beneficiary),
            Token::Address(call.recipient),
            Token::Uint(U256::from(call.reward_epoch_id)),
            Token::Bool(call.wrap),
            Token::Array(proofs),
        ],
    )
}

fn epoch_at(tokens: &[Token], index: usize) -> Result<RewardEpochId, ClaimerError> {
    let value = tokens
        .get(index)
        .cloned()
        .and_then(Token::into_uint)
        .ok_or_else(|| ClaimerError::Ledger(format!("missing epoch id at output {}", index)))?;

    if value > U256::from(u64::MAX) {
        return Err(ClaimerError::Ledger(format!("epoch id {} out of range", value)));
    }
    Ok(value.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClaimType, RewardClaim};

    #[test]
    fn test_claim_selector() {
        let call = ClaimCall {
            beneficiary: Address::repeat_byte(0x11),
            recipient: Address::repeat_byte(0x22),
            reward_epoch_id: 7,
            wrap: true,
            proofs: &[],
        };
        let data = encode_claim(&call);
        assert_eq!(&data[..4], &keccak256(CLAIM.as_bytes())[..4]);
    }

    #[test]
    fn test_encode_claim_round_trip() {
        let proofs = vec![ClaimProofStruct {
            merkle_proof: vec![H256::repeat_byte(0xaa), H256::repeat_byte(0xbb)],
            body: RewardClaim {
                reward_epoch_id: 102,
                beneficiary: Address::repeat_byte(0x33),
                amount: U256::exp10(18),
                claim_type: ClaimType::Fee,
            },
        }];
        let call = ClaimCall {
            beneficiary: Address::repeat_byte(0x33),
            recipient: Address::repeat_byte(0x44),
            reward_epoch_id: 102,
            wrap: false,
            proofs: &proofs,
        };

        let data = encode_claim(&call);
        let claim_tuple = ParamType::Tuple(vec![
            ParamType::Array(Box::new(ParamType::FixedBytes(32))),
            ParamType::Tuple(vec![
                ParamType::Uint(24),
                ParamType::FixedBytes(20),
                ParamType::Uint(120),
                ParamType::Uint(8),
            ]),
        ]);
        let tokens = ethers::abi::decode(
            &[
                ParamType::Address,
                ParamType::Address,
                ParamType::Uint(24),
                ParamType::Bool,
                ParamType::Array(Box::new(claim_tuple)),
            ],
            &data[4..],
        )
        .unwrap();

        assert_eq!(tokens[0], Token::Address(call.beneficiary));
        assert_eq!(tokens[1], Token::Address(call.recipient));
        assert_eq!(tokens[2], Token::Uint(U256::from(102)));
        assert_eq!(tokens[3], Token::Bool(false));

        let Token::Array(entries) = &tokens[4] else {
            panic!("proofs are not an array");
        };
        let Token::Tuple(entry) = &entries[0] else {
            panic!("proof entry is not a tuple");
        };
        assert_eq!(
            entry[1],
            Token::Tuple(vec![
                Token::Uint(U256::from(102)),
                Token::FixedBytes(vec![0x33; 20]),
                Token::Uint(U256::exp10(18)),
                Token::Uint(U256::from(1)),
            ])
        );
    }

    #[test]
    fn test_epoch_at_rejects_missing_output() {
        assert!(epoch_at(&[], 0).is_err());
        assert_eq!(epoch_at(&[Token::Uint(U256::from(230))], 0).unwrap(), 230);
    }
}
