//! Storage module - the UTXO projection of the chain

mod utxo;

pub use utxo::*;
