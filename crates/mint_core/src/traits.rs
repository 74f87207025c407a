//! Core traits and error types

use crate::kdf::KeyId;
use secp256k1::SecretKey;
use thiserror::Error;

/// Error types for cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid commitment")]
    InvalidCommitment,
    #[error("Invalid scalar")]
    InvalidScalar,
    #[error("Key derivation failed")]
    Derivation,
}

/// Trait for deterministic key derivation.
///
/// A key derivation object is read-only: the same `KeyId` always yields the
/// same scalar, so callers may share one instance across threads.
pub trait Kdf {
    /// Derive the secret scalar for the given key id
    fn derive_key(&self, id: &KeyId) -> Result<SecretKey, CryptoError>;
}
