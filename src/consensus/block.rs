//! Block structure
//!
//! Immutable: the merkle root and hash are fixed at construction, and
//! `with_nonce` returns a fresh block rather than mutating in place.

use crate::consensus::ChainConfig;
use crate::crypto::{double_sha256, Hash, MerkleError, MerkleProof, MerkleTree};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Block construction errors
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block must contain at least one transaction")]
    NoTransactions,
    #[error("difficulty must be at least 1")]
    ZeroDifficulty,
    #[error(transparent)]
    Merkle(#[from] MerkleError),
}

/// A block: header fields plus the committed transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub(crate) index: u64,
    pub(crate) previous_hash: Hash,
    pub(crate) timestamp: u64,
    pub(crate) merkle_root: Hash,
    pub(crate) difficulty: u32,
    pub(crate) nonce: u64,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) hash: Hash,
}

impl Block {
    /// Create a block at nonce 0; transactions[0] is expected to be the
    /// coinbase for non-genesis blocks
    pub fn new(
        index: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        difficulty: u32,
        timestamp: u64,
    ) -> Result<Self, BlockError> {
        if transactions.is_empty() {
            return Err(BlockError::NoTransactions);
        }
        if difficulty == 0 {
            return Err(BlockError::ZeroDifficulty);
        }

        let ids: Vec<Hash> = transactions.iter().map(|tx| *tx.id()).collect();
        let merkle_root = *MerkleTree::new(&ids)?.root();

        let mut block = Self {
            index,
            previous_hash,
            timestamp,
            merkle_root,
            difficulty,
            nonce: 0,
            transactions,
            hash: Hash::zero(),
        };
        block.hash = block.header_hash_with_nonce(0);
        Ok(block)
    }

    /// Create the genesis block: index 0, zero previous hash, one
    /// coinbase, the configured initial difficulty
    pub fn genesis(coinbase: Transaction, config: &ChainConfig) -> Result<Self, BlockError> {
        Self::new(
            0,
            Hash::zero(),
            vec![coinbase],
            config.initial_difficulty,
            crate::now_millis(),
        )
    }

    /// A copy of this block with a different nonce and recomputed hash
    pub fn with_nonce(&self, nonce: u64) -> Self {
        let mut block = self.clone();
        block.nonce = nonce;
        block.hash = block.header_hash_with_nonce(nonce);
        block
    }

    /// Header hash for an arbitrary nonce, without cloning the block
    ///
    /// The miner probes the nonce space through this.
    pub fn header_hash_with_nonce(&self, nonce: u64) -> Hash {
        let mut bytes = Vec::with_capacity(92);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.previous_hash.0);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.merkle_root.0);
        bytes.extend_from_slice(&self.difficulty.to_le_bytes());
        bytes.extend_from_slice(&nonce.to_le_bytes());
        double_sha256(&bytes)
    }

    /// Check the stored hash against a fresh recomputation
    pub fn verify_hash(&self) -> bool {
        self.hash == self.header_hash_with_nonce(self.nonce)
    }

    /// The proof-of-work acceptance test: enough leading zero hex digits
    pub fn has_valid_hash(&self) -> bool {
        self.hash.leading_zero_hex_digits() >= self.difficulty
    }

    /// Inclusion proof for one of this block's transactions
    pub fn transaction_proof(&self, id: &Hash) -> Result<MerkleProof, BlockError> {
        let ids: Vec<Hash> = self.transactions.iter().map(|tx| *tx.id()).collect();
        Ok(MerkleTree::new(&ids)?.get_proof(id)?)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn previous_hash(&self) -> &Hash {
        &self.previous_hash
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn merkle_root(&self) -> &Hash {
        &self.merkle_root
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;

    fn coinbase(height: u64) -> Transaction {
        Transaction::coinbase("miner", 50, height).unwrap()
    }

    fn block() -> Block {
        Block::new(1, sha256(b"prev"), vec![coinbase(1)], 2, 1_000).unwrap()
    }

    #[test]
    fn test_empty_transactions_rejected() {
        let result = Block::new(1, Hash::zero(), vec![], 1, 0);
        assert!(matches!(result, Err(BlockError::NoTransactions)));
    }

    #[test]
    fn test_zero_difficulty_rejected() {
        let result = Block::new(1, Hash::zero(), vec![coinbase(1)], 0, 0);
        assert!(matches!(result, Err(BlockError::ZeroDifficulty)));
    }

    #[test]
    fn test_hash_cached_and_consistent() {
        let block = block();
        assert!(block.verify_hash());
        assert_eq!(*block.hash(), block.header_hash_with_nonce(block.nonce()));
    }

    #[test]
    fn test_with_nonce_recomputes_hash() {
        let block = block();
        let renonced = block.with_nonce(42);

        assert_eq!(renonced.nonce(), 42);
        assert_ne!(renonced.hash(), block.hash());
        assert!(renonced.verify_hash());
        // Everything else is untouched
        assert_eq!(renonced.merkle_root(), block.merkle_root());
        assert_eq!(renonced.index(), block.index());
    }

    #[test]
    fn test_committed_fields_change_hash() {
        let base = block();
        let other_prev = Block::new(1, sha256(b"other"), vec![coinbase(1)], 2, 1_000).unwrap();
        let other_time = Block::new(1, sha256(b"prev"), vec![coinbase(1)], 2, 2_000).unwrap();
        let other_diff = Block::new(1, sha256(b"prev"), vec![coinbase(1)], 3, 1_000).unwrap();
        let other_index = Block::new(2, sha256(b"prev"), vec![coinbase(1)], 2, 1_000).unwrap();

        assert_ne!(base.hash(), other_prev.hash());
        assert_ne!(base.hash(), other_time.hash());
        assert_ne!(base.hash(), other_diff.hash());
        assert_ne!(base.hash(), other_index.hash());
    }

    #[test]
    fn test_merkle_root_commits_transactions() {
        let a = Block::new(1, Hash::zero(), vec![coinbase(1)], 1, 0).unwrap();
        let b = Block::new(1, Hash::zero(), vec![coinbase(2)], 1, 0).unwrap();
        assert_ne!(a.merkle_root(), b.merkle_root());
    }

    #[test]
    fn test_genesis_shape() {
        let config = ChainConfig::default();
        let genesis = Block::genesis(coinbase(0), &config).unwrap();

        assert_eq!(genesis.index(), 0);
        assert_eq!(*genesis.previous_hash(), Hash::zero());
        assert_eq!(genesis.difficulty(), config.initial_difficulty);
        assert_eq!(genesis.transactions().len(), 1);
        assert!(genesis.transactions()[0].is_coinbase());
    }

    #[test]
    fn test_transaction_proof() {
        let txs = vec![coinbase(1)];
        let id = *txs[0].id();
        let block = Block::new(1, Hash::zero(), txs, 1, 0).unwrap();

        let proof = block.transaction_proof(&id).unwrap();
        assert!(MerkleTree::verify(&id, &proof, block.merkle_root()));
        assert!(block.transaction_proof(&sha256(b"absent")).is_err());
    }

    #[test]
    fn test_wire_layout() {
        let block = block();
        let value = serde_json::to_value(&block).unwrap();

        assert_eq!(value["index"], 1);
        assert!(value["previousHash"].is_string());
        assert!(value["merkleRoot"].is_string());
        assert_eq!(value["difficulty"], 2);
        assert_eq!(value["nonce"], 0);
        assert!(value["transactions"].is_array());
        assert!(value["hash"].is_string());

        let back: Block = serde_json::from_value(value).unwrap();
        assert_eq!(back, block);
        assert!(back.verify_hash());
    }
}
