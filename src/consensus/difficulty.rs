//! Difficulty retargeting
//!
//! Coarse, bounded adjustment: at each retarget boundary the difficulty
//! moves by at most one step, floored at 1. Not proportional to the
//! observed deviation.

use crate::consensus::{Block, ChainConfig};

/// Difficulty for the block that would extend `chain`
///
/// Pure function. Off a retarget boundary this is the tip's difficulty.
/// At a boundary (next index divisible by the adjustment interval) the
/// elapsed time over the last window is compared to
/// `target_block_time * interval`: under half raises difficulty by one,
/// over double lowers it by one (never below 1).
pub fn calculate_next_difficulty(chain: &[Block], config: &ChainConfig) -> u32 {
    let tip = match chain.last() {
        Some(block) => block,
        None => return config.initial_difficulty,
    };

    let interval = config.difficulty_adjustment_interval;
    let next_index = tip.index() + 1;
    if interval == 0 || next_index % interval != 0 {
        return tip.difficulty();
    }

    let window = interval as usize;
    let window_start = match chain.len().checked_sub(window).map(|i| &chain[i]) {
        Some(block) => block,
        None => return tip.difficulty(),
    };

    let actual = tip.timestamp().saturating_sub(window_start.timestamp());
    let expected = config.target_block_time.saturating_mul(interval);

    if actual < expected / 2 {
        tip.difficulty() + 1
    } else if actual > expected.saturating_mul(2) {
        tip.difficulty().saturating_sub(1).max(1)
    } else {
        tip.difficulty()
    }
}
