//! Wallet implementation
//!
//! Key generation and an address-keyed registry of keypairs. The wallet
//! never touches consensus state; registries are created and injected by
//! the caller, there is no ambient instance.

use crate::crypto::{self, AddressError, SignatureError};
use crate::storage::UtxoSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// An ECDSA keypair with its derived address, all hex/text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keypair {
    private_key: String,
    pub public_key: String,
    pub address: String,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn generate() -> Result<Self, WalletError> {
        let (private_key, public_key) = crypto::generate_keypair();
        let address = crypto::address_from_public_key(&public_key)?;
        Ok(Self {
            private_key,
            public_key,
            address,
        })
    }

    /// Rebuild a keypair from an exported private key
    pub fn from_private_key(private_key: impl Into<String>) -> Result<Self, WalletError> {
        let private_key = private_key.into();
        let public_key = crypto::derive_public_key(&private_key)?;
        let address = crypto::address_from_public_key(&public_key)?;
        Ok(Self {
            private_key,
            public_key,
            address,
        })
    }

    /// Export the private key hex
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Sign a message with this keypair's private key
    pub fn sign(&self, message: &[u8]) -> Result<String, WalletError> {
        Ok(crypto::sign(message, &self.private_key)?)
    }
}

/// Address-keyed keypair registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletRegistry {
    keys: HashMap<String, Keypair>,
}

impl WalletRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Generate a key and register it under its address
    pub fn generate_key(&mut self) -> Result<Keypair, WalletError> {
        let keypair = Keypair::generate()?;
        self.keys.insert(keypair.address.clone(), keypair.clone());
        Ok(keypair)
    }

    /// Register an existing keypair
    pub fn insert(&mut self, keypair: Keypair) {
        self.keys.insert(keypair.address.clone(), keypair);
    }

    /// Look up the keypair owning an address
    pub fn get(&self, address: &str) -> Option<&Keypair> {
        self.keys.get(address)
    }

    /// All registered addresses
    pub fn addresses(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }

    /// Total unspent balance across all registered addresses
    pub fn total_balance(&self, utxo_set: &UtxoSet) -> u64 {
        self.keys
            .keys()
            .map(|address| utxo_set.get_balance(address))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
