//! ORE blockchain core library
//!
//! A UTXO-ledger cryptocurrency core with proof-of-work consensus:
//! signed transactions, Merkle-committed blocks, adjustable difficulty,
//! and longest-valid-chain replacement. Runs single-process against an
//! in-memory chain; networking, persistence, and APIs live elsewhere.

pub mod consensus;
pub mod crypto;
pub mod mining;
pub mod storage;
pub mod transaction;
pub mod wallet;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds.
///
/// All block and transaction timestamps use this resolution.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
