//! Transaction structures
//!
//! UTXO-model value types: an outpoint names one output of a prior
//! transaction, inputs consume outpoints, outputs create new spendable
//! value locked to an address. A transaction's id commits to its
//! outpoints, outputs, and timestamp; signatures are attached afterwards
//! and never change the id.

use crate::crypto::{sha256, Hash};
use crate::storage::UtxoSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transaction errors
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction must have at least one input")]
    NoInputs,
    #[error("transaction must have at least one output")]
    NoOutputs,
    #[error("output amount must be positive")]
    ZeroAmount,
    #[error("output address must not be empty")]
    EmptyAddress,
    #[error("referenced outpoint {0:?} is not in the UTXO set")]
    UnknownOutpoint(Outpoint),
    #[error("input amount {input} is less than output amount {output}")]
    NegativeFee { input: u64, output: u64 },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reference to a single output of a prior transaction
///
/// Used directly as the UTXO-set map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outpoint {
    pub transaction_id: Hash,
    pub output_index: u64,
}

impl Outpoint {
    pub fn new(transaction_id: Hash, output_index: u64) -> Self {
        Self {
            transaction_id,
            output_index,
        }
    }
}

/// A spendable output: an amount locked to an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub(crate) amount: u64,
    pub(crate) address: String,
}

impl TxOutput {
    pub fn new(amount: u64, address: impl Into<String>) -> Result<Self, TransactionError> {
        let address = address.into();
        if amount == 0 {
            return Err(TransactionError::ZeroAmount);
        }
        if address.is_empty() {
            return Err(TransactionError::EmptyAddress);
        }
        Ok(Self { amount, address })
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

/// An input consuming one outpoint
///
/// Starts unsigned; the signer fills in signature and public key as hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    pub(crate) outpoint: Outpoint,
    pub(crate) signature: String,
    pub(crate) public_key: String,
}

impl TxInput {
    pub fn new(outpoint: Outpoint) -> Self {
        Self {
            outpoint,
            signature: String::new(),
            public_key: String::new(),
        }
    }

    pub fn outpoint(&self) -> &Outpoint {
        &self.outpoint
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty() && !self.public_key.is_empty()
    }
}

/// Canonical signing content: everything the id commits to
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SigningContent<'a> {
    inputs: Vec<&'a Outpoint>,
    outputs: &'a [TxOutput],
    timestamp: u64,
}

/// A complete transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub(crate) id: Hash,
    pub(crate) inputs: Vec<TxInput>,
    pub(crate) outputs: Vec<TxOutput>,
    pub(crate) timestamp: u64,
}

impl Transaction {
    /// Create a transaction; the id is fixed here and never changes
    pub fn new(
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        timestamp: u64,
    ) -> Result<Self, TransactionError> {
        if inputs.is_empty() {
            return Err(TransactionError::NoInputs);
        }
        if outputs.is_empty() {
            return Err(TransactionError::NoOutputs);
        }

        let id = compute_id(&inputs, &outputs, timestamp)?;
        Ok(Self {
            id,
            inputs,
            outputs,
            timestamp,
        })
    }

    /// Create a coinbase transaction paying the block reward
    ///
    /// The sentinel input points at the zero transaction id; the block
    /// height is used as the output index so coinbase outpoints stay
    /// unique across heights.
    pub fn coinbase(
        address: impl Into<String>,
        amount: u64,
        height: u64,
    ) -> Result<Self, TransactionError> {
        let sentinel = TxInput::new(Outpoint::new(Hash::zero(), height));
        let reward = TxOutput::new(amount, address)?;
        Self::new(vec![sentinel], vec![reward], crate::now_millis())
    }

    /// Coinbase transactions are recognized structurally
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].outpoint.transaction_id == Hash::zero()
    }

    pub fn id(&self) -> &Hash {
        &self.id
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Recompute the canonical content hash from the current fields
    ///
    /// Equals the id for an untampered transaction; verification hashes
    /// this rather than trusting the stored id.
    pub fn signing_hash(&self) -> Result<Hash, TransactionError> {
        compute_id(&self.inputs, &self.outputs, self.timestamp)
    }

    /// Sum of output amounts
    pub fn output_amount(&self) -> u64 {
        self.outputs.iter().map(|output| output.amount).sum()
    }

    /// Sum of input amounts, resolved through the UTXO set
    pub fn input_amount(&self, utxo_set: &UtxoSet) -> Result<u64, TransactionError> {
        let mut total = 0u64;
        for input in &self.inputs {
            let output = utxo_set
                .get(&input.outpoint)
                .ok_or(TransactionError::UnknownOutpoint(input.outpoint))?;
            total = total.saturating_add(output.amount);
        }
        Ok(total)
    }

    /// Fee = input amount − output amount
    pub fn fee(&self, utxo_set: &UtxoSet) -> Result<u64, TransactionError> {
        let input = self.input_amount(utxo_set)?;
        let output = self.output_amount();
        input
            .checked_sub(output)
            .ok_or(TransactionError::NegativeFee { input, output })
    }

    /// Fee if it can be computed; None when any outpoint is unknown or
    /// inputs do not cover outputs. Callers decide the skip policy.
    pub fn try_fee(&self, utxo_set: &UtxoSet) -> Option<u64> {
        self.fee(utxo_set).ok()
    }

    /// Pure structural validity predicate; never fails hard
    ///
    /// False when any output is zero, any referenced outpoint is missing,
    /// or inputs do not cover outputs. Coinbase transactions create value
    /// by construction and only need positive outputs.
    pub fn is_valid(&self, utxo_set: &UtxoSet) -> bool {
        if self.outputs.iter().any(|output| output.amount == 0) {
            return false;
        }
        if self.is_coinbase() {
            return true;
        }
        match self.input_amount(utxo_set) {
            Ok(input) => input >= self.output_amount(),
            Err(_) => false,
        }
    }
}

fn compute_id(
    inputs: &[TxInput],
    outputs: &[TxOutput],
    timestamp: u64,
) -> Result<Hash, TransactionError> {
    let content = SigningContent {
        inputs: inputs.iter().map(|input| &input.outpoint).collect(),
        outputs,
        timestamp,
    };
    let bytes = serde_json::to_vec(&content)?;
    Ok(sha256(&bytes))
}
