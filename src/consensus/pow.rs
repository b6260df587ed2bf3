//! Proof of work
//!
//! Nonce search against the difficulty target, and independent
//! verification of claimed solutions. Expected attempts grow as
//! 16^difficulty.

use crate::consensus::Block;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Mining errors
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("nonce space exhausted at difficulty {0}; the chain is misconfigured")]
    NonceSpaceExhausted(u32),
    #[error("mining interrupted")]
    Interrupted,
}

/// Result of a successful nonce search
#[derive(Debug, Clone)]
pub struct MiningOutcome {
    /// The mined block, carrying the winning nonce and hash
    pub block: Block,
    pub nonce: u64,
    pub hash: crate::crypto::Hash,
    pub attempts: u64,
    pub elapsed: Duration,
    /// Attempts per second over the search
    pub hash_rate: f64,
}

/// Search the nonce space from 0 until the hash meets the difficulty
///
/// Exhausting the nonce space is a configuration error, not a normal
/// outcome.
pub fn mine(block: &Block) -> Result<MiningOutcome, MiningError> {
    let start = Instant::now();
    let mut nonce = 0u64;
    let mut attempts = 0u64;

    loop {
        attempts += 1;
        let hash = block.header_hash_with_nonce(nonce);
        if hash.leading_zero_hex_digits() >= block.difficulty() {
            return Ok(outcome(block, nonce, attempts, start));
        }
        nonce = nonce
            .checked_add(1)
            .ok_or(MiningError::NonceSpaceExhausted(block.difficulty()))?;
    }
}

/// Like `mine`, but aborts when the stop flag is raised
///
/// Lets a caller cancel a long search (a competing block arrived, the
/// process is shutting down) without waiting for a solution.
pub fn mine_interruptible(block: &Block, stop: &AtomicBool) -> Result<MiningOutcome, MiningError> {
    let start = Instant::now();
    let mut nonce = 0u64;
    let mut attempts = 0u64;

    loop {
        if stop.load(Ordering::Relaxed) {
            return Err(MiningError::Interrupted);
        }

        attempts += 1;
        let hash = block.header_hash_with_nonce(nonce);
        if hash.leading_zero_hex_digits() >= block.difficulty() {
            return Ok(outcome(block, nonce, attempts, start));
        }
        nonce = nonce
            .checked_add(1)
            .ok_or(MiningError::NonceSpaceExhausted(block.difficulty()))?;
    }
}

/// Independently re-check a block's proof of work
///
/// Recomputes the hash from the header fields; a miner's self-reported
/// hash is never trusted.
pub fn verify(block: &Block) -> bool {
    let recomputed = block.header_hash_with_nonce(block.nonce());
    recomputed == *block.hash() && recomputed.leading_zero_hex_digits() >= block.difficulty()
}

fn outcome(block: &Block, nonce: u64, attempts: u64, start: Instant) -> MiningOutcome {
    let mined = block.with_nonce(nonce);
    let hash = *mined.hash();
    let elapsed = start.elapsed();
    let hash_rate = attempts as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    MiningOutcome {
        block: mined,
        nonce,
        hash,
        attempts,
        elapsed,
        hash_rate,
    }
}
