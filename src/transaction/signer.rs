//! Per-input transaction signing and verification
//!
//! Every signature covers the whole transaction's canonical content, not
//! just the input it sits on. A signer attesting only to their own
//! outpoint would let anyone rewrite the outputs after signing without
//! invalidating a single signature.

use crate::crypto::{self, Hash};
use crate::storage::UtxoSet;
use crate::transaction::{Outpoint, Transaction, TransactionError};
use crate::wallet::{Keypair, WalletError, WalletRegistry};
use thiserror::Error;

/// Signing errors
#[derive(Debug, Error)]
pub enum SignError {
    #[error("input index {index} out of range for {len} inputs")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("expected {inputs} keypairs for {inputs} inputs, got {keypairs}")]
    ArityMismatch { keypairs: usize, inputs: usize },
    #[error("referenced outpoint {0:?} is not in the UTXO set")]
    UtxoNotFound(Outpoint),
    #[error("no keypair registered for address {0}")]
    KeypairNotFound(String),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Sign one input with a keypair
///
/// No-op if the input is already signed. The message is the transaction's
/// canonical content hash, so any later change to the outputs invalidates
/// the signature.
pub fn sign_input(
    tx: &mut Transaction,
    index: usize,
    keypair: &Keypair,
) -> Result<(), SignError> {
    let len = tx.inputs.len();
    if index >= len {
        return Err(SignError::IndexOutOfRange { index, len });
    }
    if tx.inputs[index].is_signed() {
        return Ok(());
    }

    let message = tx.signing_hash()?;
    let signature = keypair.sign(message.to_hex().as_bytes())?;
    tx.inputs[index].signature = signature;
    tx.inputs[index].public_key = keypair.public_key.clone();
    Ok(())
}

/// Sign every input with a single keypair
pub fn sign_transaction(tx: &mut Transaction, keypair: &Keypair) -> Result<(), SignError> {
    for index in 0..tx.inputs.len() {
        sign_input(tx, index, keypair)?;
    }
    Ok(())
}

/// Sign inputs positionally with one keypair each
pub fn sign_transaction_with_keypairs(
    tx: &mut Transaction,
    keypairs: &[Keypair],
) -> Result<(), SignError> {
    if keypairs.len() != tx.inputs.len() {
        return Err(SignError::ArityMismatch {
            keypairs: keypairs.len(),
            inputs: tx.inputs.len(),
        });
    }
    for (index, keypair) in keypairs.iter().enumerate() {
        sign_input(tx, index, keypair)?;
    }
    Ok(())
}

/// Sign each input with the keypair owning its referenced UTXO
///
/// The owning address is resolved through the UTXO set, then looked up in
/// the registry.
pub fn sign_transaction_with_registry(
    tx: &mut Transaction,
    utxo_set: &UtxoSet,
    registry: &WalletRegistry,
) -> Result<(), SignError> {
    for index in 0..tx.inputs.len() {
        let outpoint = tx.inputs[index].outpoint;
        let output = utxo_set
            .get(&outpoint)
            .ok_or(SignError::UtxoNotFound(outpoint))?;
        let keypair = registry
            .get(output.address())
            .ok_or_else(|| SignError::KeypairNotFound(output.address().to_string()))?
            .clone();
        sign_input(tx, index, &keypair)?;
    }
    Ok(())
}

/// Verify a transaction's signatures and ownership against the UTXO set
///
/// Predicate form: any failure is false, never an error. Coinbase
/// transactions carry no real inputs and verify trivially.
pub fn verify_transaction(tx: &Transaction, utxo_set: &UtxoSet) -> bool {
    if tx.is_coinbase() {
        return true;
    }

    // Hash the current fields rather than trusting the stored id; a
    // post-signing mutation shows up here.
    let message: Hash = match tx.signing_hash() {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    let message_bytes = message.to_hex();

    for input in tx.inputs() {
        if !input.is_signed() {
            return false;
        }

        let output = match utxo_set.get(input.outpoint()) {
            Some(output) => output,
            None => return false,
        };

        let signer_address = match crypto::address_from_public_key(input.public_key()) {
            Ok(address) => address,
            Err(_) => return false,
        };
        if signer_address != output.address() {
            return false;
        }

        if !crypto::verify(
            message_bytes.as_bytes(),
            input.signature(),
            input.public_key(),
        ) {
            return false;
        }
    }

    true
}
