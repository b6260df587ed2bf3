//! Wallet module - keypairs and an injectable wallet registry

mod wallet;

pub use wallet::*;
