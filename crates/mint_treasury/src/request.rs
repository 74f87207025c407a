//! Issuer-side plan types

use mint_core::{Amount, AmountBig, Height, PeerId};
use serde::{Deserialize, Serialize};

/// A promised coin: `value` units becoming spendable no earlier than
/// `incubation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCoin {
    pub value: Amount,
    pub incubation: Height,
}

/// Coins that will be offered to the block packer together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGroup {
    pub coins: Vec<RequestCoin>,
}

impl RequestGroup {
    /// Add this group's total value into a running subsidy
    pub fn add_subsidy(&self, subsidy: &mut AmountBig) {
        for coin in &self.coins {
            *subsidy += coin.value as AmountBig;
        }
    }
}

/// An emission plan for one beneficiary wallet. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub wallet_id: PeerId,
    pub groups: Vec<RequestGroup>,
}
