//! Mining module - candidate assembly and the block miner

mod miner;

pub use miner::*;
