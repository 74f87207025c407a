//! Shared helpers for the treasury integration tests

use mint_core::{PeerId, SeedKdf};
use mint_treasury::wallet_identity;
use secp256k1::Secp256k1;

/// A test wallet: deterministic key material plus its treasury identity
pub fn test_wallet(seed: u8) -> (PeerId, SeedKdf) {
    let secp = Secp256k1::new();
    let kdf = SeedKdf::from_seed([seed; 32]);
    let (peer_id, _) = wallet_identity(&secp, &kdf).expect("identity derivation");
    (peer_id, kdf)
}
