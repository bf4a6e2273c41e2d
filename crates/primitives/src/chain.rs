use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// The consensus engine a chain config assumes, used only to decide whether
/// block/uncle rewards are paid out during re-execution (§4.4 step 6).
///
/// Clique and other PoA engines pay no block reward; a chain running one
/// that's misidentified as Ethash would fail every state-root check on
/// every block, so the genesis hash lookup in [`ChainConfig::for_genesis`]
/// is the thing standing between a correct config and total validation
/// failure on a non-mainnet deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Engine {
    Ethash,
    Clique,
    /// Any engine this validator doesn't model the reward schedule of.
    /// Treated like a already-merged chain: no reward accrual at all.
    NoOp,
}

/// Block-number (or, post-Merge, timestamp) activation points for the
/// hardforks that change re-execution behavior.
///
/// Every field is `Some` only if the fork is scheduled; `None` means "never
/// activates on this chain". Fields are block-activated up through Paris and
/// timestamp-activated from Shanghai onward, mirroring how mainnet itself
/// was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hardforks {
    pub homestead_block: Option<u64>,
    pub byzantium_block: Option<u64>,
    pub constantinople_block: Option<u64>,
    pub petersburg_block: Option<u64>,
    pub istanbul_block: Option<u64>,
    pub berlin_block: Option<u64>,
    pub london_block: Option<u64>,
    /// Block at which the engine switched from PoW to PoS (TTD reached).
    /// `None` means the chain has not merged.
    pub paris_block: Option<u64>,
    pub shanghai_time: Option<u64>,
    pub cancun_time: Option<u64>,
}

impl Hardforks {
    pub fn is_byzantium(&self, block: u64) -> bool {
        self.byzantium_block.is_some_and(|b| block >= b)
    }

    pub fn is_constantinople(&self, block: u64) -> bool {
        self.constantinople_block.is_some_and(|b| block >= b)
    }

    pub fn is_london(&self, block: u64) -> bool {
        self.london_block.is_some_and(|b| block >= b)
    }

    /// Whether the chain has merged by the given block, and therefore pays
    /// no block/uncle reward from this point on.
    pub fn is_paris(&self, block: u64) -> bool {
        self.paris_block.is_some_and(|b| block >= b)
    }

    pub fn is_shanghai(&self, timestamp: u64) -> bool {
        self.shanghai_time.is_some_and(|t| timestamp >= t)
    }

    pub fn is_cancun(&self, timestamp: u64) -> bool {
        self.cancun_time.is_some_and(|t| timestamp >= t)
    }
}

/// Everything re-execution needs to know about the chain being validated
/// that isn't carried in a block header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub engine: Engine,
    pub hardforks: Hardforks,
}

impl ChainConfig {
    /// Ethereum mainnet, keyed by its genesis hash.
    pub const MAINNET_GENESIS_HASH: B256 =
        alloy_primitives::b256!("d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa0");

    pub fn mainnet() -> Self {
        ChainConfig {
            chain_id: 1,
            engine: Engine::Ethash,
            hardforks: Hardforks {
                homestead_block: Some(1_150_000),
                byzantium_block: Some(4_370_000),
                constantinople_block: Some(7_280_000),
                petersburg_block: Some(7_280_000),
                istanbul_block: Some(9_069_000),
                berlin_block: Some(12_244_000),
                london_block: Some(12_965_000),
                paris_block: Some(15_537_394),
                shanghai_time: Some(1_681_338_455),
                cancun_time: Some(1_710_338_135),
            },
        }
    }

    /// Sepolia testnet, keyed by its genesis hash.
    pub const SEPOLIA_GENESIS_HASH: B256 =
        alloy_primitives::b256!("25a5cc106eea7138acab33231d7160d69cb777ee0c2c553fcddf5138993e6dd0");

    pub fn sepolia() -> Self {
        ChainConfig {
            chain_id: 11155111,
            engine: Engine::Ethash,
            hardforks: Hardforks {
                homestead_block: Some(0),
                byzantium_block: Some(0),
                constantinople_block: Some(0),
                petersburg_block: Some(0),
                istanbul_block: Some(0),
                berlin_block: Some(0),
                london_block: Some(0),
                paris_block: Some(1_450_409),
                shanghai_time: Some(1_677_557_088),
                cancun_time: Some(1_706_655_072),
            },
        }
    }

    /// Goerli testnet, keyed by its genesis hash. Retained for completeness
    /// even though the network has since been deprecated in favor of Sepolia.
    pub const GOERLI_GENESIS_HASH: B256 =
        alloy_primitives::b256!("bf7e331f7f7c1dd2e05159666b3bf8bc7a8a3a9eb1d518969eab529dd9b88c1a");

    pub fn goerli() -> Self {
        ChainConfig {
            chain_id: 5,
            engine: Engine::Clique,
            hardforks: Hardforks {
                homestead_block: Some(0),
                byzantium_block: Some(0),
                constantinople_block: Some(0),
                petersburg_block: Some(0),
                istanbul_block: Some(1_561_651),
                berlin_block: Some(4_460_644),
                london_block: Some(5_062_605),
                paris_block: Some(7_382_819),
                shanghai_time: Some(1_678_832_736),
                cancun_time: Some(1_705_473_120),
            },
        }
    }

    /// Looks up the well-known chain config matching a genesis hash, falling
    /// back to a permissive default when the hash is unrecognized: every
    /// hardfork activated from genesis, no reward accrual. This keeps a
    /// private or custom index from silently triggering reward-accrual state
    /// mismatches with no way to supply its real chain config.
    pub fn for_genesis(genesis_hash: B256) -> Self {
        match genesis_hash {
            h if h == Self::MAINNET_GENESIS_HASH => Self::mainnet(),
            h if h == Self::SEPOLIA_GENESIS_HASH => Self::sepolia(),
            h if h == Self::GOERLI_GENESIS_HASH => Self::goerli(),
            _ => Self::permissive_default(),
        }
    }

    /// All hardforks active from genesis, merged engine (no reward accrual).
    /// Used when a chain config file is not supplied and the genesis hash
    /// doesn't match a network this validator recognizes by default.
    pub fn permissive_default() -> Self {
        ChainConfig {
            chain_id: 0,
            engine: Engine::NoOp,
            hardforks: Hardforks {
                homestead_block: Some(0),
                byzantium_block: Some(0),
                constantinople_block: Some(0),
                petersburg_block: Some(0),
                istanbul_block: Some(0),
                berlin_block: Some(0),
                london_block: Some(0),
                paris_block: Some(0),
                shanghai_time: Some(0),
                cancun_time: Some(0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_genesis_resolves_to_mainnet_config() {
        let cfg = ChainConfig::for_genesis(ChainConfig::MAINNET_GENESIS_HASH);
        assert_eq!(cfg.chain_id, 1);
        assert_eq!(cfg.engine, Engine::Ethash);
    }

    #[test]
    fn unknown_genesis_falls_back_to_permissive_default() {
        let cfg = ChainConfig::for_genesis(B256::repeat_byte(0xab));
        assert_eq!(cfg.engine, Engine::NoOp);
        assert!(cfg.hardforks.is_paris(0));
    }

    #[test]
    fn goerli_is_clique_with_no_reward_accrual_expectation_from_merge() {
        let cfg = ChainConfig::goerli();
        assert_eq!(cfg.engine, Engine::Clique);
        assert!(cfg.hardforks.is_paris(7_382_819));
        assert!(!cfg.hardforks.is_paris(7_382_818));
    }
}
