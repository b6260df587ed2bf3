//! Block miner
//!
//! Assembles candidate blocks - fee-ordered transaction selection and a
//! coinbase paying reward plus collected fees - and runs the proof of
//! work against the current tip.

use crate::consensus::{pow, Block, BlockError, Blockchain, MiningError, MiningOutcome};
use crate::storage::UtxoSet;
use crate::transaction::{Transaction, TransactionError};
use thiserror::Error;

/// Miner errors
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("cannot mine on an uninitialized chain")]
    ChainNotInitialized,
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Mining(#[from] MiningError),
}

/// Assembles and mines blocks paying one reward address
#[derive(Debug, Clone)]
pub struct Miner {
    address: String,
}

impl Miner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Assemble a candidate block from the given transactions and mine it
    ///
    /// Fees are summed against the current UTXO set; a candidate whose
    /// fee cannot be computed (unknown outpoint, inputs short of outputs)
    /// is skipped rather than failing the whole block. The coinbase pays
    /// `block_reward + fees` at the next height.
    pub fn mine_block(
        &self,
        blockchain: &Blockchain,
        candidates: Vec<Transaction>,
    ) -> Result<MiningOutcome, MinerError> {
        let tip = blockchain.tip().ok_or(MinerError::ChainNotInitialized)?;
        let utxo_set = blockchain.utxo_set();

        let mut fees = 0u64;
        let mut included = Vec::with_capacity(candidates.len() + 1);
        for tx in candidates {
            if tx.is_coinbase() {
                log::warn!("skipping candidate {}: coinbase from the pool", tx.id());
                continue;
            }
            match tx.try_fee(utxo_set) {
                Some(fee) => {
                    fees = fees.saturating_add(fee);
                    included.push(tx);
                }
                None => {
                    log::warn!("skipping candidate {}: fee cannot be computed", tx.id());
                }
            }
        }

        let height = tip.index() + 1;
        let reward = blockchain.config().block_reward.saturating_add(fees);
        let coinbase = Transaction::coinbase(self.address.clone(), reward, height)?;

        let mut transactions = vec![coinbase];
        transactions.extend(included);

        let block = Block::new(
            height,
            *tip.hash(),
            transactions,
            blockchain.calculate_next_difficulty(),
            crate::now_millis().max(tip.timestamp() + 1),
        )?;

        Ok(pow::mine(&block)?)
    }

    /// Mine a block carrying only the coinbase
    pub fn mine_empty_block(&self, blockchain: &Blockchain) -> Result<MiningOutcome, MinerError> {
        self.mine_block(blockchain, Vec::new())
    }

    /// Pick up to `max` transactions from a pool, highest fee first
    ///
    /// Transactions with unknowable fees are left behind.
    pub fn select_transactions(
        pool: &[Transaction],
        utxo_set: &UtxoSet,
        max: usize,
    ) -> Vec<Transaction> {
        let mut priced: Vec<(u64, &Transaction)> = pool
            .iter()
            .filter(|tx| !tx.is_coinbase())
            .filter_map(|tx| tx.try_fee(utxo_set).map(|fee| (fee, tx)))
            .collect();
        priced.sort_by(|(fee_a, tx_a), (fee_b, tx_b)| {
            fee_b.cmp(fee_a).then_with(|| tx_a.id().cmp(tx_b.id()))
        });
        priced
            .into_iter()
            .take(max)
            .map(|(_, tx)| tx.clone())
            .collect()
    }
}
