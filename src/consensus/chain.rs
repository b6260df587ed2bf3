//! The blockchain: append-only block sequence plus its UTXO projection
//!
//! The UTXO set is always the fold of the chain from genesis to tip.
//! Validation runs to completion before any mutation, so a rejected
//! block leaves both the chain and the projection untouched.

use crate::consensus::{difficulty, pow, Block, ChainConfig};
use crate::crypto::Hash;
use crate::storage::UtxoSet;
use crate::transaction::Outpoint;
use std::collections::HashSet;
use thiserror::Error;

/// Chain validation errors (internal; predicate APIs fold these to bool)
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain is already initialized")]
    AlreadyInitialized,
    #[error("chain is not initialized")]
    NotInitialized,
    #[error("genesis block must have index 0, got {0}")]
    NotGenesis(u64),
    #[error("candidate chain is empty")]
    EmptyChain,
    #[error("invalid genesis block")]
    InvalidGenesis,
    #[error("expected index {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },
    #[error("previous hash does not match the tip")]
    PreviousHashMismatch,
    #[error("proof of work does not meet the difficulty target")]
    InvalidProofOfWork,
    #[error("timestamp {actual} does not advance past the tip's {tip}")]
    NonIncreasingTimestamp { tip: u64, actual: u64 },
    #[error("outpoint {0:?} spent twice within one block")]
    DoubleSpendInBlock(Outpoint),
    #[error("input references spent or unknown outpoint {0:?}")]
    SpentOrUnknownOutpoint(Outpoint),
}

/// Snapshot of the chain for observability callers
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    pub height: u64,
    pub block_count: usize,
    pub tip_hash: Hash,
    pub difficulty: u32,
    pub next_difficulty: u32,
    pub utxo_count: usize,
}

/// Append-only block sequence owning the UTXO projection
#[derive(Debug, Clone)]
pub struct Blockchain {
    chain: Vec<Block>,
    utxo_set: UtxoSet,
    config: ChainConfig,
}

impl Blockchain {
    /// Create an uninitialized chain; add a genesis block before use
    pub fn new(config: ChainConfig) -> Self {
        Self {
            chain: Vec::new(),
            utxo_set: UtxoSet::new(),
            config,
        }
    }

    /// Install the genesis block and seed the UTXO set from it
    pub fn initialize_with_genesis_block(&mut self, block: Block) -> Result<(), ChainError> {
        if !self.chain.is_empty() {
            return Err(ChainError::AlreadyInitialized);
        }
        if block.index() != 0 {
            return Err(ChainError::NotGenesis(block.index()));
        }

        for tx in block.transactions() {
            self.utxo_set.apply_transaction(tx);
        }
        self.chain.push(block);
        Ok(())
    }

    /// Current tip, if initialized
    pub fn tip(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Tip index (0 for a genesis-only chain)
    pub fn height(&self) -> u64 {
        self.tip().map(Block::index).unwrap_or(0)
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn get_balance(&self, address: &str) -> u64 {
        self.utxo_set.get_balance(address)
    }

    /// Difficulty required of the next block
    pub fn calculate_next_difficulty(&self) -> u32 {
        difficulty::calculate_next_difficulty(&self.chain, &self.config)
    }

    /// Validate a candidate against the tip and UTXO set, then apply it
    ///
    /// Predicate form: false on any failure, chain unchanged. Inputs are
    /// checked for existence only; signatures are verified when a
    /// transaction enters the pending pool, not re-run here.
    pub fn add_block(&mut self, block: Block) -> bool {
        let result = self
            .tip()
            .ok_or(ChainError::NotInitialized)
            .and_then(|tip| Self::validate_new_block(&block, tip))
            .and_then(|_| Self::validate_block_spends(&block, &self.utxo_set));

        match result {
            Ok(()) => {
                for tx in block.transactions() {
                    self.utxo_set.apply_transaction(tx);
                }
                self.chain.push(block);
                true
            }
            Err(reason) => {
                log::warn!("rejecting block {}: {}", block.index(), reason);
                false
            }
        }
    }

    /// Whole-chain validity: genesis shape plus pairwise block checks
    pub fn is_valid_chain(&self) -> bool {
        Self::validate_chain(&self.chain).is_ok()
    }

    /// Adopt a strictly longer chain if it fully re-validates
    ///
    /// The UTXO set is rebuilt from scratch from the candidate; on any
    /// failure the current chain stays in place.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> bool {
        if candidate.len() <= self.chain.len() {
            log::warn!(
                "rejecting replacement chain: length {} does not exceed {}",
                candidate.len(),
                self.chain.len()
            );
            return false;
        }

        match Self::validate_chain(&candidate) {
            Ok(rebuilt) => {
                log::info!(
                    "replacing chain at height {} with candidate at height {}",
                    self.height(),
                    candidate.len() as u64 - 1
                );
                self.chain = candidate;
                self.utxo_set = rebuilt;
                true
            }
            Err(reason) => {
                log::warn!("rejecting replacement chain: {}", reason);
                false
            }
        }
    }

    /// Observability snapshot
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.height(),
            block_count: self.chain.len(),
            tip_hash: self.tip().map(|b| *b.hash()).unwrap_or_default(),
            difficulty: self.tip().map(Block::difficulty).unwrap_or(0),
            next_difficulty: self.calculate_next_difficulty(),
            utxo_count: self.utxo_set.len(),
        }
    }

    // Header-level checks of one block against its predecessor.
    fn validate_new_block(block: &Block, tip: &Block) -> Result<(), ChainError> {
        if block.index() != tip.index() + 1 {
            return Err(ChainError::IndexMismatch {
                expected: tip.index() + 1,
                actual: block.index(),
            });
        }
        if block.previous_hash() != tip.hash() {
            return Err(ChainError::PreviousHashMismatch);
        }
        if !pow::verify(block) {
            return Err(ChainError::InvalidProofOfWork);
        }
        if block.timestamp() <= tip.timestamp() {
            return Err(ChainError::NonIncreasingTimestamp {
                tip: tip.timestamp(),
                actual: block.timestamp(),
            });
        }
        Ok(())
    }

    // Every non-coinbase input must consume a distinct, currently
    // unspent outpoint.
    fn validate_block_spends(block: &Block, utxo_set: &UtxoSet) -> Result<(), ChainError> {
        let mut consumed: HashSet<Outpoint> = HashSet::new();
        for tx in block.transactions() {
            if tx.is_coinbase() {
                continue;
            }
            for input in tx.inputs() {
                let outpoint = *input.outpoint();
                if !consumed.insert(outpoint) {
                    return Err(ChainError::DoubleSpendInBlock(outpoint));
                }
                if !utxo_set.contains(&outpoint) {
                    return Err(ChainError::SpentOrUnknownOutpoint(outpoint));
                }
            }
        }
        Ok(())
    }

    // Validate a standalone chain and produce its UTXO projection.
    fn validate_chain(blocks: &[Block]) -> Result<UtxoSet, ChainError> {
        let genesis = blocks.first().ok_or(ChainError::EmptyChain)?;
        if genesis.index() != 0
            || *genesis.previous_hash() != Hash::zero()
            || genesis.transactions().is_empty()
            || !genesis.verify_hash()
        {
            return Err(ChainError::InvalidGenesis);
        }

        let mut utxo_set = UtxoSet::new();
        for tx in genesis.transactions() {
            utxo_set.apply_transaction(tx);
        }

        for pair in blocks.windows(2) {
            let (prev, block) = (&pair[0], &pair[1]);
            Self::validate_new_block(block, prev)?;
            Self::validate_block_spends(block, &utxo_set)?;
            for tx in block.transactions() {
                utxo_set.apply_transaction(tx);
            }
        }

        Ok(utxo_set)
    }
}
