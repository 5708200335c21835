//! Payload canonicalization and secp256k1 signatures.
//!
//! A request is signed over `sha256(serialize(content))`, where `serialize`
//! is compact JSON with fields in the order the signer wrote them. Parsing
//! goes through `serde_json` with `preserve_order`, so re-serializing a
//! received `content` reproduces the signer's bytes. Reordering fields
//! therefore changes the digest.
//!
//! Signatures are 64-byte compact `r || s`, hex-encoded, low-S normalized.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::Signature;
use relledger_schema::SignedRequest;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use k256::ecdsa::{SigningKey, VerifyingKey};

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("key must be 32 bytes, got {0}")]
    Length(usize),

    #[error("key is not a valid secp256k1 scalar")]
    Scalar,

    #[error("signing failed: {0}")]
    Sign(#[from] k256::ecdsa::Error),
}

/// The exact byte string a signature covers.
pub fn canonical_bytes(content: &Value) -> Vec<u8> {
    content.to_string().into_bytes()
}

/// SHA-256 of [`canonical_bytes`].
pub fn content_digest(content: &Value) -> [u8; 32] {
    let digest = Sha256::digest(canonical_bytes(content));
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Parse a hex-encoded 32-byte secret as a secp256k1 private scalar.
pub fn signing_key_from_hex(key_hex: &str) -> Result<SigningKey, KeyError> {
    let bytes = hex::decode(key_hex.trim())?;
    if bytes.len() != 32 {
        return Err(KeyError::Length(bytes.len()));
    }
    SigningKey::from_slice(&bytes).map_err(|_| KeyError::Scalar)
}

/// Public key for stored key material.
///
/// The ledger keeps the signer's secret and rebuilds the public half from it
/// on every verification. Existing clients depend on this derivation.
pub fn verifying_key_from_material(key_hex: &str) -> Result<VerifyingKey, KeyError> {
    Ok(*signing_key_from_hex(key_hex)?.verifying_key())
}

/// Hex signature over `content`.
pub fn sign_content(content: &Value, key: &SigningKey) -> Result<String, KeyError> {
    let signature: Signature = key.sign_prehash(&content_digest(content))?;
    Ok(hex::encode(signature.to_bytes()))
}

/// Build the full request body a client posts.
pub fn sign_request(
    content: Value,
    username: impl Into<String>,
    key: &SigningKey,
) -> Result<SignedRequest, KeyError> {
    let signature = sign_content(&content, key)?;
    Ok(SignedRequest {
        content,
        username: username.into(),
        signature,
    })
}

/// Whether `signature_hex` is a valid signature over `content` by `key`.
///
/// Undecodable or high-S signatures are simply invalid.
pub fn verify_content(content: &Value, signature_hex: &str, key: &VerifyingKey) -> bool {
    let Ok(bytes) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify_prehash(&content_digest(content), &signature)
        .is_ok()
}
