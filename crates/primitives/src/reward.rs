use alloy_primitives::U256;

use crate::chain::Hardforks;

const ETHER: u64 = 1_000_000_000_000_000_000;

/// The static block reward paid to a block's beneficiary, before any uncle
/// adjustment: 5 ether pre-Byzantium, 3 ether from Byzantium, 2 ether from
/// Constantinople onward.
pub fn base_block_reward(hardforks: &Hardforks, block_number: u64) -> U256 {
    if hardforks.is_constantinople(block_number) {
        U256::from(2) * U256::from(ETHER)
    } else if hardforks.is_byzantium(block_number) {
        U256::from(3) * U256::from(ETHER)
    } else {
        U256::from(5) * U256::from(ETHER)
    }
}

/// The reward paid to an uncle's own beneficiary: `(uncle_number + 8 -
/// block_number) * base_reward / 8`.
pub fn ommer_reward(base_reward: U256, block_number: u64, uncle_number: u64) -> U256 {
    let distance = U256::from(uncle_number + 8 - block_number);
    distance * base_reward / U256::from(8)
}

/// The extra reward a block's beneficiary collects per included uncle:
/// `base_reward / 32`.
pub fn block_reward_per_uncle(base_reward: U256) -> U256 {
    base_reward / U256::from(32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;

    #[test]
    fn base_reward_steps_down_at_byzantium_and_constantinople() {
        let hardforks = ChainConfig::mainnet().hardforks;
        assert_eq!(base_block_reward(&hardforks, 4_369_999), U256::from(5) * U256::from(ETHER));
        assert_eq!(base_block_reward(&hardforks, 4_370_000), U256::from(3) * U256::from(ETHER));
        assert_eq!(base_block_reward(&hardforks, 7_280_000), U256::from(2) * U256::from(ETHER));
    }

    #[test]
    fn ommer_reward_at_max_distance() {
        let base = U256::from(5) * U256::from(ETHER);
        // an uncle one block behind the including block gets 7/8 of the base reward
        let reward = ommer_reward(base, 100, 99);
        assert_eq!(reward, base * U256::from(7) / U256::from(8));
    }

    #[test]
    fn block_reward_per_uncle_is_one_32nd() {
        let base = U256::from(5) * U256::from(ETHER);
        assert_eq!(block_reward_per_uncle(base), base / U256::from(32));
    }
}
