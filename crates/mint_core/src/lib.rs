//! Core cryptography for the Mint treasury
//! Schnorr signatures, Pedersen commitments, and hierarchical key derivation
//! over secp256k1

pub mod kdf;
pub mod pedersen;
pub mod schnorr;
pub mod traits;
pub mod types;

pub use kdf::{KeyId, SeedKdf};
pub use pedersen::{commit, commit_value, generator_h, Commitment};
pub use schnorr::{sign, verify, Signature};
pub use traits::{CryptoError, Kdf};
pub use types::{Amount, AmountBig, Height, PeerId, GENESIS_HEIGHT, MAX_HEIGHT};
