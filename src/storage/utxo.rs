//! UTXO set implementation
//!
//! In-memory index of unspent transaction outputs, keyed by outpoint.
//! An outpoint is present iff its output was created by an applied
//! transaction and not yet consumed. Absence is an empty result, never
//! an error.

use crate::transaction::{Outpoint, Transaction, TxOutput};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// One serialized UTXO-set entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub outpoint: Outpoint,
    pub output: TxOutput,
}

/// Set of all unspent transaction outputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    utxos: HashMap<Outpoint, TxOutput>,
}

impl UtxoSet {
    /// Create a new empty UTXO set
    pub fn new() -> Self {
        Self {
            utxos: HashMap::new(),
        }
    }

    /// Check whether an outpoint is unspent
    pub fn contains(&self, outpoint: &Outpoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    /// Get the output for an outpoint, if unspent
    pub fn get(&self, outpoint: &Outpoint) -> Option<&TxOutput> {
        self.utxos.get(outpoint)
    }

    /// Add an output under its outpoint
    pub fn add(&mut self, outpoint: Outpoint, output: TxOutput) {
        self.utxos.insert(outpoint, output);
    }

    /// Remove an outpoint (when spent)
    pub fn remove(&mut self, outpoint: &Outpoint) -> Option<TxOutput> {
        self.utxos.remove(outpoint)
    }

    /// All unspent outputs locked to an address, in deterministic order
    pub fn get_by_address(&self, address: &str) -> Vec<(Outpoint, &TxOutput)> {
        let mut found: Vec<(Outpoint, &TxOutput)> = self
            .utxos
            .iter()
            .filter(|(_, output)| output.address() == address)
            .map(|(outpoint, output)| (*outpoint, output))
            .collect();
        found.sort_by_key(|(outpoint, _)| *outpoint);
        found
    }

    /// Total unspent amount locked to an address
    pub fn get_balance(&self, address: &str) -> u64 {
        self.utxos
            .values()
            .filter(|output| output.address() == address)
            .map(|output| output.amount())
            .sum()
    }

    /// Apply a transaction: consume its inputs, create its outputs
    ///
    /// Coinbase sentinel inputs consume nothing.
    pub fn apply_transaction(&mut self, tx: &Transaction) {
        if !tx.is_coinbase() {
            for input in tx.inputs() {
                self.remove(input.outpoint());
            }
        }

        for (index, output) in tx.outputs().iter().enumerate() {
            self.add(Outpoint::new(*tx.id(), index as u64), output.clone());
        }
    }

    /// Number of unspent outpoints
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Entries in outpoint order
    pub fn entries(&self) -> Vec<UtxoEntry> {
        let mut entries: Vec<UtxoEntry> = self
            .utxos
            .iter()
            .map(|(outpoint, output)| UtxoEntry {
                outpoint: *outpoint,
                output: output.clone(),
            })
            .collect();
        entries.sort_by_key(|entry| entry.outpoint);
        entries
    }
}

// The wire form is an ordered entry list, not a map keyed by a composite
// struct.
impl Serialize for UtxoSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for entry in entries {
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for UtxoSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<UtxoEntry>::deserialize(deserializer)?;
        let mut set = UtxoSet::new();
        for entry in entries {
            set.add(entry.outpoint, entry.output);
        }
        Ok(set)
    }
}
