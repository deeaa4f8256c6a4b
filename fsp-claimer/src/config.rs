//! Claimer configuration.
//!
//! Configuration is read once at startup from the process environment and
//! then shared read-only. Values that are present are validated immediately;
//! values a claim type needs but that are absent are reported when that claim
//! type is used, before any network call.

use std::{collections::BTreeMap, time::Duration};

use ethers::{signers::LocalWallet, types::Address};

use crate::{error::ClaimerError, network::Network, types::ClaimType};

/// Default auto-claim polling period.
pub const DEFAULT_AUTO_CLAIM_INTERVAL: Duration = Duration::from_secs(12 * 60);

/// Claim types used when `CLAIM_TYPES` is not set.
pub const DEFAULT_CLAIM_TYPES: [ClaimType; 2] = [ClaimType::Direct, ClaimType::Fee];

const NETWORK_VAR: &str = "NETWORK";
const REWARDS_DATA_BASE_URL_VAR: &str = "REWARDS_DATA_BASE_URL";
const RECIPIENT_VAR: &str = "CLAIM_RECIPIENT_ADDRESS";
const WRAP_REWARDS_VAR: &str = "WRAP_REWARDS";
const EXECUTOR_KEY_VAR: &str = "CLAIM_EXECUTOR_PRIVATE_KEY";
const CLAIM_TYPES_VAR: &str = "CLAIM_TYPES";
const INTERVAL_VAR: &str = "AUTO_CLAIM_INTERVAL_SECS";

/// Where a claim type takes its beneficiary and signing key from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimTypeStrategy {
    pub claim_type: ClaimType,
    /// Variable holding the beneficiary address.
    pub beneficiary_var: &'static str,
    /// Variable holding a dedicated executor key; falls back to
    /// `CLAIM_EXECUTOR_PRIVATE_KEY`.
    pub executor_key_var: &'static str,
    /// What the beneficiary address is, for messages.
    pub beneficiary_role: &'static str,
}

const STRATEGIES: [ClaimTypeStrategy; 5] = [
    ClaimTypeStrategy {
        claim_type: ClaimType::Direct,
        beneficiary_var: "SIGNING_POLICY_ADDRESS",
        executor_key_var: "DIRECT_EXECUTOR_PRIVATE_KEY",
        beneficiary_role: "signing policy address",
    },
    ClaimTypeStrategy {
        claim_type: ClaimType::Fee,
        beneficiary_var: "IDENTITY_ADDRESS",
        executor_key_var: "FEE_EXECUTOR_PRIVATE_KEY",
        beneficiary_role: "identity address",
    },
    ClaimTypeStrategy {
        claim_type: ClaimType::Wnat,
        beneficiary_var: RECIPIENT_VAR,
        executor_key_var: "WNAT_EXECUTOR_PRIVATE_KEY",
        beneficiary_role: "recipient address",
    },
    ClaimTypeStrategy {
        claim_type: ClaimType::Mirror,
        beneficiary_var: "MIRROR_NODE_ID",
        executor_key_var: "MIRROR_EXECUTOR_PRIVATE_KEY",
        beneficiary_role: "node id",
    },
    ClaimTypeStrategy {
        claim_type: ClaimType::Cchain,
        beneficiary_var: "CCHAIN_ADDRESS",
        executor_key_var: "CCHAIN_EXECUTOR_PRIVATE_KEY",
        beneficiary_role: "C-chain stake address",
    },
];

impl ClaimTypeStrategy {
    /// Look up the strategy of a claim type.
    pub fn of(claim_type: ClaimType) -> &'static ClaimTypeStrategy {
        &STRATEGIES[claim_type.as_u8() as usize]
    }
}

/// Claim type bound to its beneficiary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimProfile {
    pub claim_type: ClaimType,
    pub beneficiary: Address,
}

/// Everything needed to submit claims for one claim type.
#[derive(Clone, Debug)]
pub struct ExecutorCredentials {
    pub wallet: LocalWallet,
    pub recipient: Address,
    pub wrap: bool,
}

/// Immutable claimer configuration.
#[derive(Clone, Debug)]
pub struct ClaimerConfig {
    pub network: Network,
    pub rpc_url: String,
    pub rewards_data_base_url: String,
    pub recipient: Option<Address>,
    pub wrap_rewards: bool,
    /// Claim types the auto-claimer runs.
    pub claim_types: Vec<ClaimType>,
    pub auto_claim_interval: Duration,
    beneficiaries: BTreeMap<ClaimType, Address>,
    executors: BTreeMap<ClaimType, LocalWallet>,
}

impl ClaimerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ClaimerError> {
        let source = ::config::Config::builder()
            .add_source(::config::Environment::default())
            .build()?;
        Self::from_source(&source)
    }

    /// Load configuration from an already built source.
    ///
    /// Keys are the lower-cased variable names.
    pub fn from_source(source: &::config::Config) -> Result<Self, ClaimerError> {
        let get = |var: &str| {
            source
                .get_string(&var.to_lowercase())
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let network: Network = get(NETWORK_VAR)
            .ok_or_else(|| {
                ClaimerError::Config(format!("{} environment variable is not set", NETWORK_VAR))
            })?
            .parse()?;

        let rpc_url = get(network.rpc_env_var())
            .unwrap_or_else(|| network.default_rpc_url().to_string());

        let rewards_data_base_url = get(REWARDS_DATA_BASE_URL_VAR)
            .unwrap_or_else(|| network.default_rewards_data_base_url());

        let recipient = get(RECIPIENT_VAR)
            .map(|value| parse_address(RECIPIENT_VAR, &value))
            .transpose()?;

        let wrap_rewards = get(WRAP_REWARDS_VAR)
            .map(|value| !value.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let claim_types = match get(CLAIM_TYPES_VAR) {
            Some(value) => parse_claim_types(&value)?,
            None => DEFAULT_CLAIM_TYPES.to_vec(),
        };

        let auto_claim_interval = match get(INTERVAL_VAR) {
            Some(value) => parse_interval(&value)?,
            None => DEFAULT_AUTO_CLAIM_INTERVAL,
        };

        let shared_executor = get(EXECUTOR_KEY_VAR)
            .map(|value| parse_wallet(EXECUTOR_KEY_VAR, &value))
            .transpose()?;

        let mut beneficiaries = BTreeMap::new();
        let mut executors = BTreeMap::new();
        for strategy in &STRATEGIES {
            if let Some(value) = get(strategy.beneficiary_var) {
                beneficiaries.insert(
                    strategy.claim_type,
                    parse_address(strategy.beneficiary_var, &value)?,
                );
            }

            let executor = match get(strategy.executor_key_var) {
                Some(value) => Some(parse_wallet(strategy.executor_key_var, &value)?),
                None => shared_executor.clone(),
            };
            if let Some(wallet) = executor {
                executors.insert(strategy.claim_type, wallet);
            }
        }

        Ok(Self {
            network,
            rpc_url,
            rewards_data_base_url,
            recipient,
            wrap_rewards,
            claim_types,
            auto_claim_interval,
            beneficiaries,
            executors,
        })
    }

    /// Beneficiary binding for `claim_type`.
    pub fn profile(&self, claim_type: ClaimType) -> Result<ClaimProfile, ClaimerError> {
        let strategy = ClaimTypeStrategy::of(claim_type);
        let beneficiary = self.beneficiaries.get(&claim_type).copied().ok_or_else(|| {
            ClaimerError::Config(format!(
                "claiming {} requires {} ({}) environment variable to be set",
                claim_type, strategy.beneficiary_var, strategy.beneficiary_role
            ))
        })?;

        Ok(ClaimProfile {
            claim_type,
            beneficiary,
        })
    }

    /// Profiles of every claim type whose beneficiary is configured.
    pub fn available_profiles(&self) -> Vec<ClaimProfile> {
        self.beneficiaries
            .iter()
            .map(|(&claim_type, &beneficiary)| ClaimProfile {
                claim_type,
                beneficiary,
            })
            .collect()
    }

    /// Signing key, recipient and wrap flag for `claim_type`.
    pub fn executor(&self, claim_type: ClaimType) -> Result<ExecutorCredentials, ClaimerError> {
        let recipient = self.recipient.ok_or_else(|| {
            ClaimerError::Config(format!("{} environment variable is not set", RECIPIENT_VAR))
        })?;

        let wallet = self.executors.get(&claim_type).cloned().ok_or_else(|| {
            ClaimerError::Config(format!(
                "{} (or {}) environment variable is not set",
                EXECUTOR_KEY_VAR,
                ClaimTypeStrategy::of(claim_type).executor_key_var
            ))
        })?;

        Ok(ExecutorCredentials {
            wallet,
            recipient,
            wrap: self.wrap_rewards,
        })
    }
}

fn parse_address(var: &str, value: &str) -> Result<Address, ClaimerError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.len() != 40 {
        return Err(ClaimerError::Config(format!(
            "{} must be a 20-byte hex address (got '{}')",
            var, value
        )));
    }
    digits
        .parse()
        .map_err(|_| ClaimerError::Config(format!("{} is not a valid address: '{}'", var, value)))
}

fn parse_wallet(var: &str, value: &str) -> Result<LocalWallet, ClaimerError> {
    // never echo the key itself
    value
        .parse()
        .map_err(|_| ClaimerError::Config(format!("{} is not a valid private key", var)))
}

fn parse_claim_types(value: &str) -> Result<Vec<ClaimType>, ClaimerError> {
    let mut claim_types = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let claim_type: ClaimType = part.parse()?;
        if !claim_types.contains(&claim_type) {
            claim_types.push(claim_type);
        }
    }
    if claim_types.is_empty() {
        return Err(ClaimerError::Config(format!(
            "{} must name at least one claim type",
            CLAIM_TYPES_VAR
        )));
    }
    Ok(claim_types)
}

fn parse_interval(value: &str) -> Result<Duration, ClaimerError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ClaimerError::Config(format!(
            "{} must be a positive number of seconds (got '{}')",
            INTERVAL_VAR, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::Signer;

    // Well-known development key, never funded on a real network.
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const IDENTITY: &str = "0x1111111111111111111111111111111111111111";
    const SIGNING_POLICY: &str = "0x2222222222222222222222222222222222222222";
    const RECIPIENT: &str = "0x3333333333333333333333333333333333333333";

    fn load(vars: &[(&str, &str)]) -> Result<ClaimerConfig, ClaimerError> {
        let mut builder = ::config::Config::builder();
        for (key, value) in vars {
            builder = builder.set_override(key.to_lowercase(), *value).unwrap();
        }
        ClaimerConfig::from_source(&builder.build().unwrap())
    }

    #[test]
    fn test_strategy_lookup() {
        for claim_type in ClaimType::ALL {
            assert_eq!(ClaimTypeStrategy::of(claim_type).claim_type, claim_type);
        }
        assert_eq!(
            ClaimTypeStrategy::of(ClaimType::Fee).beneficiary_var,
            "IDENTITY_ADDRESS"
        );
    }

    #[test]
    fn test_network_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("NETWORK"));
        assert!(load(&[("NETWORK", "mainnet")]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("NETWORK", "flare")]).unwrap();
        assert_eq!(config.network, Network::Flare);
        assert_eq!(config.rpc_url, Network::Flare.default_rpc_url());
        assert_eq!(
            config.rewards_data_base_url,
            Network::Flare.default_rewards_data_base_url()
        );
        assert!(config.wrap_rewards);
        assert_eq!(config.claim_types, DEFAULT_CLAIM_TYPES.to_vec());
        assert_eq!(config.auto_claim_interval, Duration::from_secs(720));
        assert!(config.available_profiles().is_empty());
    }

    #[test]
    fn test_rpc_override_follows_network() {
        let config = load(&[
            ("NETWORK", "songbird"),
            ("SONGBIRD_RPC", "http://localhost:9650/ext/bc/C/rpc"),
            ("FLARE_RPC", "http://ignored"),
        ])
        .unwrap();
        assert_eq!(config.rpc_url, "http://localhost:9650/ext/bc/C/rpc");
    }

    #[test]
    fn test_wrap_rewards_only_disabled_by_false() {
        for (value, expected) in [("false", false), ("FALSE", false), ("no", true), ("true", true)] {
            let config = load(&[("NETWORK", "coston2"), ("WRAP_REWARDS", value)]).unwrap();
            assert_eq!(config.wrap_rewards, expected, "WRAP_REWARDS={}", value);
        }
    }

    #[test]
    fn test_profiles_follow_strategy_table() {
        let config = load(&[
            ("NETWORK", "flare"),
            ("IDENTITY_ADDRESS", IDENTITY),
            ("CLAIM_RECIPIENT_ADDRESS", RECIPIENT),
        ])
        .unwrap();

        let fee = config.profile(ClaimType::Fee).unwrap();
        assert_eq!(fee.beneficiary, IDENTITY.parse::<Address>().unwrap());

        let wnat = config.profile(ClaimType::Wnat).unwrap();
        assert_eq!(wnat.beneficiary, RECIPIENT.parse::<Address>().unwrap());

        let err = config.profile(ClaimType::Direct).unwrap_err();
        assert!(err.to_string().contains("SIGNING_POLICY_ADDRESS"));
        assert_eq!(err.error_code(), "CONFIG_ERROR");

        let types: Vec<_> = config
            .available_profiles()
            .into_iter()
            .map(|p| p.claim_type)
            .collect();
        assert_eq!(types, vec![ClaimType::Fee, ClaimType::Wnat]);
    }

    #[test]
    fn test_executor_requires_recipient_and_key() {
        let config = load(&[("NETWORK", "flare"), ("SIGNING_POLICY_ADDRESS", SIGNING_POLICY)])
            .unwrap();
        let err = config.executor(ClaimType::Direct).unwrap_err();
        assert!(err.to_string().contains("CLAIM_RECIPIENT_ADDRESS"));

        let config = load(&[
            ("NETWORK", "flare"),
            ("SIGNING_POLICY_ADDRESS", SIGNING_POLICY),
            ("CLAIM_RECIPIENT_ADDRESS", RECIPIENT),
        ])
        .unwrap();
        let err = config.executor(ClaimType::Direct).unwrap_err();
        assert!(err.to_string().contains("CLAIM_EXECUTOR_PRIVATE_KEY"));
    }

    #[test]
    fn test_shared_executor_key() {
        let config = load(&[
            ("NETWORK", "flare"),
            ("CLAIM_RECIPIENT_ADDRESS", RECIPIENT),
            ("CLAIM_EXECUTOR_PRIVATE_KEY", KEY),
            ("WRAP_REWARDS", "false"),
        ])
        .unwrap();

        let direct = config.executor(ClaimType::Direct).unwrap();
        let fee = config.executor(ClaimType::Fee).unwrap();
        assert_eq!(direct.wallet.address(), fee.wallet.address());
        assert_eq!(direct.recipient, RECIPIENT.parse::<Address>().unwrap());
        assert!(!direct.wrap);
    }

    #[test]
    fn test_invalid_values_fail_at_load() {
        assert!(load(&[("NETWORK", "flare"), ("IDENTITY_ADDRESS", "0x1234")]).is_err());
        assert!(load(&[("NETWORK", "flare"), ("CLAIM_EXECUTOR_PRIVATE_KEY", "0xnothex")]).is_err());
        assert!(load(&[("NETWORK", "flare"), ("CLAIM_TYPES", "direct,staking")]).is_err());
        assert!(load(&[("NETWORK", "flare"), ("AUTO_CLAIM_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_private_key_not_echoed() {
        let err = load(&[("NETWORK", "flare"), ("FEE_EXECUTOR_PRIVATE_KEY", "0xdeadbeef")])
            .unwrap_err();
        assert!(!err.to_string().contains("deadbeef"));
    }

    #[test]
    fn test_claim_types_are_deduplicated() {
        let config = load(&[("NETWORK", "flare"), ("CLAIM_TYPES", "fee, direct,FEE")]).unwrap();
        assert_eq!(config.claim_types, vec![ClaimType::Fee, ClaimType::Direct]);
    }
}
