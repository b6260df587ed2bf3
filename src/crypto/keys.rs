//! ECDSA signature implementation
//!
//! Uses the secp256k1 curve. Keys and signatures are exchanged as
//! lowercase hex strings: private keys are 32-byte scalars, public keys
//! SEC1 compressed points (33 bytes), signatures fixed 64-byte.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// Signature errors
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature encoding")]
    InvalidSignature,
}

/// Generate a fresh keypair, returned as (private hex, public hex)
pub fn generate_keypair() -> (String, String) {
    let signing_key = SigningKey::random(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    (
        hex::encode(signing_key.to_bytes()),
        hex::encode(verifying_key.to_encoded_point(true).as_bytes()),
    )
}

/// Derive the compressed public key from a private key
pub fn derive_public_key(private_key: &str) -> Result<String, SignatureError> {
    let signing_key = signing_key_from_hex(private_key)?;
    let verifying_key = signing_key.verifying_key();
    Ok(hex::encode(verifying_key.to_encoded_point(true).as_bytes()))
}

/// Sign a message with a private key, returning the signature as hex
pub fn sign(message: &[u8], private_key: &str) -> Result<String, SignatureError> {
    let signing_key = signing_key_from_hex(private_key)?;
    let signature: Signature = signing_key.sign(message);
    Ok(hex::encode(signature.to_bytes()))
}

/// Verify a signature over a message
///
/// Predicate form: malformed keys or signatures verify as false.
pub fn verify(message: &[u8], signature: &str, public_key: &str) -> bool {
    let verifying_key = match verifying_key_from_hex(public_key) {
        Ok(vk) => vk,
        Err(_) => return false,
    };

    let sig_bytes = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let sig = match Signature::from_slice(&sig_bytes) {
        Ok(s) => s,
        Err(_) => return false,
    };

    verifying_key.verify(message, &sig).is_ok()
}

fn signing_key_from_hex(private_key: &str) -> Result<SigningKey, SignatureError> {
    let bytes = hex::decode(private_key).map_err(|_| SignatureError::InvalidPrivateKey)?;
    SigningKey::from_slice(&bytes).map_err(|_| SignatureError::InvalidPrivateKey)
}

fn verifying_key_from_hex(public_key: &str) -> Result<VerifyingKey, SignatureError> {
    let bytes = hex::decode(public_key).map_err(|_| SignatureError::InvalidPublicKey)?;
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| SignatureError::InvalidPublicKey)
}
