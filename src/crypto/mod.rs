//! Cryptography module - SHA-256 hashing, ECDSA signatures, addresses, Merkle trees

mod address;
mod hash;
mod keys;
mod merkle;

pub use address::*;
pub use hash::*;
pub use keys::*;
pub use merkle::*;
