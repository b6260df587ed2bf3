//! Chain configuration
//!
//! Injected into `Blockchain::new`; there are no process-wide protocol
//! globals.

use serde::{Deserialize, Serialize};

/// Consensus parameters for one chain instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Desired spacing between blocks, in milliseconds
    pub target_block_time: u64,
    /// Retarget window length, in blocks
    pub difficulty_adjustment_interval: u64,
    /// Difficulty of the genesis block (leading zero hex digits, >= 1)
    pub initial_difficulty: u32,
    /// Base coinbase reward per block
    pub block_reward: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            target_block_time: 10_000,
            difficulty_adjustment_interval: 10,
            initial_difficulty: 2,
            block_reward: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_sane() {
        let config = ChainConfig::default();
        assert!(config.initial_difficulty >= 1);
        assert!(config.difficulty_adjustment_interval > 0);
        assert!(config.target_block_time > 0);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = ChainConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("targetBlockTime").is_some());
        assert!(json.get("difficultyAdjustmentInterval").is_some());
        let back: ChainConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
