//! Address codec
//!
//! An address is the Base58 encoding of RIPEMD-160(SHA-256(public key)),
//! where the public key is the SEC1 compressed point. Base58 excludes the
//! ambiguous glyphs 0/O/I/l.

use super::{ripemd160, sha256};
use thiserror::Error;

/// Address codec errors
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid public key hex")]
    InvalidPublicKey,
    #[error("invalid base58 encoding")]
    InvalidBase58,
}

/// Encode bytes as Base58 text
pub fn base58_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode Base58 text back to bytes
pub fn base58_decode(text: &str) -> Result<Vec<u8>, AddressError> {
    bs58::decode(text)
        .into_vec()
        .map_err(|_| AddressError::InvalidBase58)
}

/// Derive the address for a hex-encoded public key
pub fn address_from_public_key(public_key: &str) -> Result<String, AddressError> {
    let key_bytes = hex::decode(public_key).map_err(|_| AddressError::InvalidPublicKey)?;
    if key_bytes.is_empty() {
        return Err(AddressError::InvalidPublicKey);
    }
    let key_hash = ripemd160(sha256(&key_bytes).as_bytes());
    Ok(base58_encode(&key_hash))
}
