//! Supported Flare networks and their deployment constants.

use std::{fmt, str::FromStr};

use ethers::types::{Address, H160};
use serde::{Deserialize, Serialize};

use crate::error::ClaimerError;

/// Flare network identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Coston,
    Coston2,
    Songbird,
    Flare,
}

/// Contract addresses deployed on a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkContracts {
    pub flare_systems_manager: Address,
    pub reward_manager: Address,
}

// FlareSystemsManager 0x85680Dd93755Fe5d0789773fd0896cEE51F9e358
const COSTON_FLARE_SYSTEMS_MANAGER: Address = H160([
    0x85, 0x68, 0x0d, 0xd9, 0x37, 0x55, 0xfe, 0x5d, 0x07, 0x89,
    0x77, 0x3f, 0xd0, 0x89, 0x6c, 0xee, 0x51, 0xf9, 0xe3, 0x58,
]);
// RewardManager 0xA17197b7Bdff7Be7c3Da39ec08981FB716B70d3A
const COSTON_REWARD_MANAGER: Address = H160([
    0xa1, 0x71, 0x97, 0xb7, 0xbd, 0xff, 0x7b, 0xe7, 0xc3, 0xda,
    0x39, 0xec, 0x08, 0x98, 0x1f, 0xb7, 0x16, 0xb7, 0x0d, 0x3a,
]);

// FlareSystemsManager 0xbC1F76CEB521Eb5484b8943B5462D08ea96617A1
const COSTON2_FLARE_SYSTEMS_MANAGER: Address = H160([
    0xbc, 0x1f, 0x76, 0xce, 0xb5, 0x21, 0xeb, 0x54, 0x84, 0xb8,
    0x94, 0x3b, 0x54, 0x62, 0xd0, 0x8e, 0xa9, 0x66, 0x17, 0xa1,
]);
// RewardManager 0xB4f43E342c5c77e6fe060c0481Fe313Ff2503454
const COSTON2_REWARD_MANAGER: Address = H160([
    0xb4, 0xf4, 0x3e, 0x34, 0x2c, 0x5c, 0x77, 0xe6, 0xfe, 0x06,
    0x0c, 0x04, 0x81, 0xfe, 0x31, 0x3f, 0xf2, 0x50, 0x34, 0x54,
]);

// FlareSystemsManager 0x421c69E22f48e14Fc2d2Ee3812c59bfb81c38516
const SONGBIRD_FLARE_SYSTEMS_MANAGER: Address = H160([
    0x42, 0x1c, 0x69, 0xe2, 0x2f, 0x48, 0xe1, 0x4f, 0xc2, 0xd2,
    0xee, 0x38, 0x12, 0xc5, 0x9b, 0xfb, 0x81, 0xc3, 0x85, 0x16,
]);
// RewardManager 0xE26AD68b17224951b5740F33926Cc438764eB9a7
const SONGBIRD_REWARD_MANAGER: Address = H160([
    0xe2, 0x6a, 0xd6, 0x8b, 0x17, 0x22, 0x49, 0x51, 0xb5, 0x74,
    0x0f, 0x33, 0x92, 0x6c, 0xc4, 0x38, 0x76, 0x4e, 0xb9, 0xa7,
]);

// FlareSystemsManager 0x89e50DC0380e597ecE79c8494bAAFD84537AD0D4
const FLARE_FLARE_SYSTEMS_MANAGER: Address = H160([
    0x89, 0xe5, 0x0d, 0xc0, 0x38, 0x0e, 0x59, 0x7e, 0xce, 0x79,
    0xc8, 0x49, 0x4b, 0xaa, 0xfd, 0x84, 0x53, 0x7a, 0xd0, 0xd4,
]);
// RewardManager 0xC8f55c5aA2C752eE285Bd872855C749f4ee6239B
const FLARE_REWARD_MANAGER: Address = H160([
    0xc8, 0xf5, 0x5c, 0x5a, 0xa2, 0xc7, 0x52, 0xee, 0x28, 0x5b,
    0xd8, 0x72, 0x85, 0x5c, 0x74, 0x9f, 0x4e, 0xe6, 0x23, 0x9b,
]);

const TESTNET_REWARDS_BASE: &str =
    "https://gitlab.com/timivesel/ftsov2-testnet-rewards/-/raw/main/rewards-data";
const MAINNET_REWARDS_BASE: &str =
    "https://raw.githubusercontent.com/flare-foundation/fsp-rewards/refs/heads/main";

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Coston,
        Network::Coston2,
        Network::Songbird,
        Network::Flare,
    ];

    /// Get the string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Coston => "coston",
            Network::Coston2 => "coston2",
            Network::Songbird => "songbird",
            Network::Flare => "flare",
        }
    }

    /// EVM chain id used when signing claim transactions.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Coston => 16,
            Network::Coston2 => 114,
            Network::Songbird => 19,
            Network::Flare => 14,
        }
    }

    /// Public RPC endpoint used when no override is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Coston => "https://coston-api.flare.network/ext/bc/C/rpc",
            Network::Coston2 => "https://coston2-api.flare.network/ext/bc/C/rpc",
            Network::Songbird => "https://songbird-api.flare.network/ext/bc/C/rpc",
            Network::Flare => "https://flare-api.flare.network/ext/bc/C/rpc",
        }
    }

    /// Environment variable that overrides the RPC endpoint.
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            Network::Coston => "COSTON_RPC",
            Network::Coston2 => "COSTON2_RPC",
            Network::Songbird => "SONGBIRD_RPC",
            Network::Flare => "FLARE_RPC",
        }
    }

    /// Base location of the published reward datasets.
    pub fn default_rewards_data_base_url(&self) -> String {
        match self {
            Network::Coston | Network::Coston2 => {
                format!("{}/{}", TESTNET_REWARDS_BASE, self.as_str())
            }
            Network::Songbird | Network::Flare => {
                format!("{}/{}", MAINNET_REWARDS_BASE, self.as_str())
            }
        }
    }

    /// Get the deployed contract addresses.
    pub fn contracts(&self) -> NetworkContracts {
        let (flare_systems_manager, reward_manager) = match self {
            Network::Coston => (COSTON_FLARE_SYSTEMS_MANAGER, COSTON_REWARD_MANAGER),
            Network::Coston2 => (COSTON2_FLARE_SYSTEMS_MANAGER, COSTON2_REWARD_MANAGER),
            Network::Songbird => (SONGBIRD_FLARE_SYSTEMS_MANAGER, SONGBIRD_REWARD_MANAGER),
            Network::Flare => (FLARE_FLARE_SYSTEMS_MANAGER, FLARE_REWARD_MANAGER),
        };
        NetworkContracts {
            flare_systems_manager,
            reward_manager,
        }
    }

    /// Ticker of the native token, used when printing amounts.
    pub fn symbol(&self) -> &'static str {
        match self {
            Network::Coston => "CFLR",
            Network::Coston2 => "C2FLR",
            Network::Songbird => "SGB",
            Network::Flare => "FLR",
        }
    }
}

impl FromStr for Network {
    type Err = ClaimerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Network::ALL
            .into_iter()
            .find(|network| network.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ClaimerError::Config(format!("network '{}' is not supported", s)))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_addresses() {
        let expected = [
            (
                Network::Coston,
                "0x85680Dd93755Fe5d0789773fd0896cEE51F9e358",
                "0xA17197b7Bdff7Be7c3Da39ec08981FB716B70d3A",
            ),
            (
                Network::Coston2,
                "0xbC1F76CEB521Eb5484b8943B5462D08ea96617A1",
                "0xB4f43E342c5c77e6fe060c0481Fe313Ff2503454",
            ),
            (
                Network::Songbird,
                "0x421c69E22f48e14Fc2d2Ee3812c59bfb81c38516",
                "0xE26AD68b17224951b5740F33926Cc438764eB9a7",
            ),
            (
                Network::Flare,
                "0x89e50DC0380e597ecE79c8494bAAFD84537AD0D4",
                "0xC8f55c5aA2C752eE285Bd872855C749f4ee6239B",
            ),
        ];

        for (network, flare_systems_manager, reward_manager) in expected {
            let contracts = network.contracts();
            assert_eq!(
                contracts.flare_systems_manager,
                flare_systems_manager.parse::<Address>().unwrap()
            );
            assert_eq!(
                contracts.reward_manager,
                reward_manager.parse::<Address>().unwrap()
            );
        }
    }

    #[test]
    fn test_native_token_symbol() {
        assert_eq!(Network::Flare.symbol(), "FLR");
        assert_eq!(Network::Songbird.symbol(), "SGB");
        assert_eq!(Network::Coston.symbol(), "CFLR");
        assert_eq!(Network::Coston2.symbol(), "C2FLR");
    }

    #[test]
    fn test_rewards_data_location() {
        assert_eq!(
            Network::Flare.default_rewards_data_base_url(),
            "https://raw.githubusercontent.com/flare-foundation/fsp-rewards/refs/heads/main/flare"
        );
        assert!(Network::Coston2
            .default_rewards_data_base_url()
            .ends_with("/rewards-data/coston2"));
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("songbird".parse::<Network>().unwrap(), Network::Songbird);
        assert_eq!("Coston2".parse::<Network>().unwrap(), Network::Coston2);
        assert!("mainnet".parse::<Network>().is_err());
    }
}
