//! Staged transaction construction
//!
//! Collects a source keypair, recipients, fee, and change address, then
//! selects the source's UTXOs greedy largest-first until the target is
//! covered. Deterministic for a given UTXO set and targets; makes no
//! attempt to minimize fees or input count.

use crate::storage::UtxoSet;
use crate::transaction::{
    signer, SignError, Transaction, TransactionError, TxInput, TxOutput,
};
use crate::wallet::Keypair;
use thiserror::Error;

/// Builder errors
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no source keypair set; call from() first")]
    MissingSource,
    #[error("no recipients set; call to() first")]
    NoRecipients,
    #[error("recipient amount must be positive")]
    ZeroAmount,
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Sign(#[from] SignError),
}

/// Staged builder for unsigned (or signed) transfers
#[derive(Debug, Default, Clone)]
pub struct TransactionBuilder {
    source: Option<Keypair>,
    recipients: Vec<(String, u64)>,
    fee: u64,
    change_address: Option<String>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source keypair; its address is the default change address
    pub fn from(mut self, keypair: &Keypair) -> Self {
        self.source = Some(keypair.clone());
        self
    }

    /// Add a recipient
    pub fn to(mut self, address: impl Into<String>, amount: u64) -> Result<Self, BuildError> {
        if amount == 0 {
            return Err(BuildError::ZeroAmount);
        }
        self.recipients.push((address.into(), amount));
        Ok(self)
    }

    /// Set the miner fee (default 0)
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Override where change is returned
    pub fn with_change_address(mut self, address: impl Into<String>) -> Self {
        self.change_address = Some(address.into());
        self
    }

    /// Build an unsigned transaction against the given UTXO set
    pub fn build(&self, utxo_set: &UtxoSet) -> Result<Transaction, BuildError> {
        let source = self.source.as_ref().ok_or(BuildError::MissingSource)?;
        if self.recipients.is_empty() {
            return Err(BuildError::NoRecipients);
        }

        let target: u64 = self
            .recipients
            .iter()
            .map(|(_, amount)| amount)
            .sum::<u64>()
            .saturating_add(self.fee);

        // Greedy largest-first selection over the source's UTXOs; the
        // amount-descending sort (outpoint tiebreak) keeps it deterministic.
        let mut available = utxo_set.get_by_address(&source.address);
        available.sort_by(|(op_a, out_a), (op_b, out_b)| {
            out_b.amount().cmp(&out_a.amount()).then(op_a.cmp(op_b))
        });

        let mut selected = Vec::new();
        let mut accumulated = 0u64;
        for (outpoint, output) in available {
            if accumulated >= target {
                break;
            }
            accumulated = accumulated.saturating_add(output.amount());
            selected.push(outpoint);
        }

        if accumulated < target {
            return Err(BuildError::InsufficientFunds {
                have: accumulated,
                need: target,
            });
        }

        let inputs: Vec<TxInput> = selected.into_iter().map(TxInput::new).collect();

        let mut outputs = Vec::with_capacity(self.recipients.len() + 1);
        for (address, amount) in &self.recipients {
            outputs.push(TxOutput::new(*amount, address.clone())?);
        }

        let change = accumulated - target;
        if change > 0 {
            let change_address = self
                .change_address
                .clone()
                .unwrap_or_else(|| source.address.clone());
            outputs.push(TxOutput::new(change, change_address)?);
        }

        Ok(Transaction::new(inputs, outputs, crate::now_millis())?)
    }

    /// Build and sign every input with the source keypair
    pub fn build_and_sign(&self, utxo_set: &UtxoSet) -> Result<Transaction, BuildError> {
        let source = self.source.as_ref().ok_or(BuildError::MissingSource)?;
        let mut tx = self.build(utxo_set)?;
        signer::sign_transaction(&mut tx, source)?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;
    use crate::transaction::Outpoint;

    fn fund(utxo_set: &mut UtxoSet, address: &str, amounts: &[u64]) {
        for (i, amount) in amounts.iter().enumerate() {
            utxo_set.add(
                Outpoint::new(sha256(&[i as u8]), i as u64),
                TxOutput::new(*amount, address).unwrap(),
            );
        }
    }

    #[test]
    fn test_missing_source_is_state_error() {
        let result = TransactionBuilder::new()
            .to("recipient", 10)
            .unwrap()
            .build(&UtxoSet::new());
        assert!(matches!(result, Err(BuildError::MissingSource)));
    }

    #[test]
    fn test_no_recipients_is_state_error() {
        let keypair = Keypair::generate().unwrap();
        let result = TransactionBuilder::new()
            .from(&keypair)
            .build(&UtxoSet::new());
        assert!(matches!(result, Err(BuildError::NoRecipients)));
    }

    #[test]
    fn test_zero_recipient_amount_rejected() {
        assert!(matches!(
            TransactionBuilder::new().to("recipient", 0),
            Err(BuildError::ZeroAmount)
        ));
    }

    #[test]
    fn test_insufficient_funds() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[30, 20]);

        let result = TransactionBuilder::new()
            .from(&keypair)
            .to("recipient", 100)
            .unwrap()
            .build(&utxo_set);

        assert!(matches!(
            result,
            Err(BuildError::InsufficientFunds { have: 50, need: 100 })
        ));
    }

    #[test]
    fn test_transfer_with_change() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[100]);

        let tx = TransactionBuilder::new()
            .from(&keypair)
            .to("recipient", 40)
            .unwrap()
            .build(&utxo_set)
            .unwrap();

        assert_eq!(tx.inputs().len(), 1);
        assert_eq!(tx.outputs().len(), 2);
        assert_eq!(tx.outputs()[0].amount(), 40);
        assert_eq!(tx.outputs()[0].address(), "recipient");
        assert_eq!(tx.outputs()[1].amount(), 60);
        assert_eq!(tx.outputs()[1].address(), keypair.address);
    }

    #[test]
    fn test_exact_spend_has_no_change_output() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[40]);

        let tx = TransactionBuilder::new()
            .from(&keypair)
            .to("recipient", 40)
            .unwrap()
            .build(&utxo_set)
            .unwrap();

        assert_eq!(tx.outputs().len(), 1);
    }

    #[test]
    fn test_largest_first_selection() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[10, 80, 25]);

        // 80 alone covers 70; the smaller UTXOs stay unspent
        let tx = TransactionBuilder::new()
            .from(&keypair)
            .to("recipient", 70)
            .unwrap()
            .build(&utxo_set)
            .unwrap();

        assert_eq!(tx.inputs().len(), 1);
        let selected = utxo_set.get(tx.inputs()[0].outpoint()).unwrap();
        assert_eq!(selected.amount(), 80);
    }

    #[test]
    fn test_fee_counts_toward_target() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[100]);

        let tx = TransactionBuilder::new()
            .from(&keypair)
            .to("recipient", 40)
            .unwrap()
            .with_fee(5)
            .build(&utxo_set)
            .unwrap();

        // change = 100 - 40 - 5
        assert_eq!(tx.outputs()[1].amount(), 55);
        assert_eq!(tx.fee(&utxo_set).unwrap(), 5);
    }

    #[test]
    fn test_explicit_change_address() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[100]);

        let tx = TransactionBuilder::new()
            .from(&keypair)
            .to("recipient", 40)
            .unwrap()
            .with_change_address("cold-storage")
            .build(&utxo_set)
            .unwrap();

        assert_eq!(tx.outputs()[1].address(), "cold-storage");
    }

    #[test]
    fn test_build_and_sign_verifies() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[100, 30]);

        let tx = TransactionBuilder::new()
            .from(&keypair)
            .to("recipient", 120)
            .unwrap()
            .build_and_sign(&utxo_set)
            .unwrap();

        assert_eq!(tx.inputs().len(), 2);
        assert!(signer::verify_transaction(&tx, &utxo_set));
        assert!(tx.input_amount(&utxo_set).unwrap() >= tx.output_amount());
    }

    #[test]
    fn test_multiple_recipients() {
        let keypair = Keypair::generate().unwrap();
        let mut utxo_set = UtxoSet::new();
        fund(&mut utxo_set, &keypair.address, &[100]);

        let tx = TransactionBuilder::new()
            .from(&keypair)
            .to("alpha", 20)
            .unwrap()
            .to("beta", 30)
            .unwrap()
            .build(&utxo_set)
            .unwrap();

        assert_eq!(tx.outputs().len(), 3);
        assert_eq!(tx.output_amount(), 100);
    }
}
