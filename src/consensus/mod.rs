//! Consensus module - blocks, proof of work, difficulty, and the chain

mod block;
mod chain;
mod config;
pub mod difficulty;
pub mod pow;

pub use block::*;
pub use chain::*;
pub use config::*;
pub use pow::{MiningError, MiningOutcome};
