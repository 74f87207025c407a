//! Genesis treasury for a confidential-transaction chain
//!
//! The issuing authority plans a multi-year emission schedule per
//! beneficiary wallet (`Treasury::create_plan`), each wallet answers with
//! committed outputs and value proofs (`Response::create`), the issuer
//! checks every response (`Response::is_valid`), and the accepted
//! contributions are packed into the chain's first blocks
//! (`Treasury::build`).

pub mod error;
pub mod executor;
pub mod request;
pub mod response;
pub mod treasury;


pub use error::TreasuryError;
pub use request::{Request, RequestCoin, RequestGroup};
pub use response::{Response, ResponseCoin, ResponseGroup};
pub use treasury::{Entry, Parameters, Treasury};

use mint_core::{CryptoError, Kdf, KeyId, PeerId};
use secp256k1::{Secp256k1, SecretKey, Signing};

/// Derivation tag of the wallet identity key (index 0). Fixed forever,
/// part of the on-chain contract.
pub const KEY_TAG_WALLET_ID: [u8; 4] = *b"tRid";

/// Derivation tag of treasury output blinding keys
pub const KEY_TAG_OUTPUT: [u8; 4] = *b"Tres";

/// Derivation tag of treasury kernel blinding keys
pub const KEY_TAG_KERNEL: [u8; 4] = *b"KeR3";

/// Derive a wallet's treasury identity: the peer id plus the secret scalar
/// that signs for it
pub fn wallet_identity<C: Signing, K: Kdf>(
    secp: &Secp256k1<C>,
    kdf: &K,
) -> Result<(PeerId, SecretKey), CryptoError> {
    let sk = kdf.derive_key(&KeyId::new(0, KEY_TAG_WALLET_ID))?;
    Ok(PeerId::from_secret(secp, sk))
}
