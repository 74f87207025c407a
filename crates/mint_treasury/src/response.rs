//! Wallet-side responses: committed outputs, value proofs, and the
//! aggregate signature

use crate::executor;
use crate::request::{Request, RequestGroup};
use crate::{wallet_identity, TreasuryError, KEY_TAG_KERNEL, KEY_TAG_OUTPUT};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use mint_chain::reader::{netto_size, summarize, TxReader};
use mint_chain::transaction::{Input, Output, TxBase, TxKernel};
use mint_chain::ChainError;
use mint_core::pedersen::{self, Commitment};
use mint_core::schnorr::{self, Signature};
use mint_core::{CryptoError, Kdf, KeyId, PeerId, GENESIS_HEIGHT, MAX_HEIGHT};
use secp256k1::{PublicKey, Secp256k1, Signing, Verification};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An issued coin: the confidential output plus a signature proving the
/// commitment encodes exactly the promised value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCoin {
    pub output: Output,
    pub value_sig: Signature,
}

impl ResponseCoin {
    /// Message signed by the value proof: the hash of the commitment
    pub fn sig_msg(&self) -> [u8; 32] {
        coin_sig_msg(&self.output.commitment)
    }
}

fn coin_sig_msg(commitment: &Commitment) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(commitment.as_bytes());
    hasher.finalize().into()
}

/// One issued group: coins in request order, a zero-fee kernel giving the
/// group a transaction identity, and the base carrying the offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseGroup {
    pub coins: Vec<ResponseCoin>,
    pub kernel: TxKernel,
    pub base: TxBase,
}

impl ResponseGroup {
    /// Issue the coins of one request group. `index0` is the derivation
    /// counter for the group's first coin; the group consumes
    /// `coins + 1` consecutive counters, the last one for the kernel.
    pub fn create<C, K>(
        secp: &Secp256k1<C>,
        group: &RequestGroup,
        kdf: &K,
        index0: u64,
    ) -> Result<ResponseGroup, CryptoError>
    where
        C: Signing + Verification,
        K: Kdf,
    {
        let mut index = index0;
        let mut coins = Vec::with_capacity(group.coins.len());
        let mut blinding_sum = [0u8; 32];

        for promised in &group.coins {
            let blinding = kdf.derive_key(&KeyId::new(index, KEY_TAG_OUTPUT))?;
            index += 1;

            let output = Output::create(secp, &blinding, promised.value, promised.incubation)?;
            let value_sig = schnorr::sign(secp, &coin_sig_msg(&output.commitment), &blinding)?;

            blinding_sum = pedersen::scalar_add(&blinding_sum, &blinding.secret_bytes())?;
            coins.push(ResponseCoin { output, value_sig });
        }

        let kernel_key = kdf.derive_key(&KeyId::new(index, KEY_TAG_KERNEL))?;
        let kernel = TxKernel::create(secp, &kernel_key)?;
        blinding_sum = pedersen::scalar_add(&blinding_sum, &kernel_key.secret_bytes())?;

        Ok(ResponseGroup {
            coins,
            kernel,
            base: TxBase {
                offset: pedersen::scalar_negate(&blinding_sum)?,
            },
        })
    }

    /// Check this group against its request group: structure, kernel,
    /// per-coin value proofs, and group mass conservation
    pub fn is_valid<C: Signing + Verification>(
        &self,
        secp: &Secp256k1<C>,
        group: &RequestGroup,
    ) -> bool {
        if self.coins.len() != group.coins.len() {
            return false;
        }

        if self.kernel.fee != 0
            || self.kernel.height_min > GENESIS_HEIGHT
            || self.kernel.height_max != MAX_HEIGHT
        {
            return false;
        }

        let Ok(summary) = summarize(secp, &self.base, &mut self.reader()) else {
            return false;
        };

        let mut value_sum: u128 = 0;
        for (coin, promised) in self.coins.iter().zip(&group.coins) {
            if coin.output.is_public()
                || coin.output.coinbase
                || coin.output.incubation != promised.incubation
            {
                return false;
            }

            let Ok(mut point) = coin.output.commitment.to_point() else {
                return false;
            };

            // P = C - H·v is the blinding point iff C really encodes v
            if promised.value != 0 {
                let Ok(Some(value_term)) = pedersen::commit_value(secp, promised.value as u128)
                else {
                    return false;
                };
                let Ok(p) = point.combine(&value_term.negate(secp)) else {
                    return false;
                };
                point = p;
            }

            if schnorr::verify(secp, &coin.value_sig, &coin.sig_msg(), &point).is_err() {
                return false;
            }
            value_sum += promised.value as u128;
        }

        let Ok(expected) = expected_group_sum(secp, value_sum, &self.base.offset) else {
            return false;
        };
        summary.sum == expected
    }

    pub fn reader(&self) -> GroupReader<'_> {
        GroupReader {
            group: self,
            next_output: 0,
            kernel_done: false,
        }
    }

    /// Serialized size of this group's outputs and kernel, without body
    /// framing
    pub fn netto_size(&self) -> Result<usize, ChainError> {
        netto_size(&mut self.reader())
    }
}

/// `H·Σv + G·(−offset)`, the sum a balanced group must reproduce
fn expected_group_sum<C: Signing + Verification>(
    secp: &Secp256k1<C>,
    value_sum: u128,
    offset: &[u8; 32],
) -> Result<Option<PublicKey>, CryptoError> {
    let mut points = Vec::with_capacity(2);
    if let Some(value_term) = pedersen::commit_value(secp, value_sum)? {
        points.push(value_term);
    }
    if let Some(offset_term) = pedersen::scalar_mul_g(secp, &pedersen::scalar_negate(offset)?)? {
        points.push(offset_term);
    }
    pedersen::sum_points(&points)
}

/// Streaming view over a response group: no inputs, the outputs in stored
/// order, then the single kernel
#[derive(Clone)]
pub struct GroupReader<'a> {
    group: &'a ResponseGroup,
    next_output: usize,
    kernel_done: bool,
}

impl TxReader for GroupReader<'_> {
    fn reset(&mut self) {
        self.next_output = 0;
        self.kernel_done = false;
    }

    fn next_input(&mut self) -> Option<&Input> {
        None
    }

    fn next_output(&mut self) -> Option<&Output> {
        let coin = self.group.coins.get(self.next_output)?;
        self.next_output += 1;
        Some(&coin.output)
    }

    fn next_kernel(&mut self) -> Option<&TxKernel> {
        if self.kernel_done {
            return None;
        }
        self.kernel_done = true;
        Some(&self.group.kernel)
    }
}

/// A wallet's full answer to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub wallet_id: PeerId,
    pub groups: Vec<ResponseGroup>,
    pub agg_sig: Signature,
}

impl Response {
    /// Issue all groups of `request` with key material from `kdf`.
    ///
    /// Returns `Ok(None)` when the derived wallet identity does not match
    /// the request. On success `next_index` has advanced by
    /// `Σ(coins + 1)` over all groups, independent of worker scheduling:
    /// each parallel worker derives its starting counter from the request's
    /// prefix sums rather than from any shared mutable state.
    pub fn create<K>(
        request: &Request,
        kdf: &K,
        next_index: &mut u64,
    ) -> Result<Option<Response>, TreasuryError>
    where
        K: Kdf + Sync,
    {
        let secp = Secp256k1::new();

        let (peer_id, identity) = wallet_identity(&secp, kdf)?;
        if peer_id != request.wallet_id {
            return Ok(None);
        }

        let index0 = *next_index;
        let starts: Vec<u64> = request
            .groups
            .iter()
            .scan(index0, |counter, group| {
                let start = *counter;
                *counter += group.coins.len() as u64 + 1;
                Some(start)
            })
            .collect();

        let results = executor::map(request.groups.len(), |g| {
            let secp = Secp256k1::new();
            ResponseGroup::create(&secp, &request.groups[g], kdf, starts[g])
        });

        let mut groups = Vec::with_capacity(results.len());
        for result in results {
            groups.push(result?);
        }

        *next_index = index0
            + request
                .groups
                .iter()
                .map(|g| g.coins.len() as u64 + 1)
                .sum::<u64>();

        let agg_sig = schnorr::sign(&secp, &hash_outputs(&groups), &identity)?;
        debug!(groups = groups.len(), "treasury response created");

        Ok(Some(Response {
            wallet_id: request.wallet_id,
            groups,
            agg_sig,
        }))
    }

    /// Re-check everything the responder claims: per-group proofs in
    /// parallel, then the aggregate signature under the wallet identity.
    /// Any failure anywhere makes the whole response invalid.
    pub fn is_valid(&self, request: &Request) -> bool {
        if self.groups.len() != request.groups.len() || self.wallet_id != request.wallet_id {
            return false;
        }

        let groups_valid = executor::verify_all(self.groups.len(), |g| {
            // One verification context per task, shared by every proof in
            // the group
            let secp = Secp256k1::new();
            self.groups[g].is_valid(&secp, &request.groups[g])
        });
        if !groups_valid {
            return false;
        }

        let secp = Secp256k1::new();
        let Ok(wallet_point) = request.wallet_id.to_point() else {
            return false;
        };
        schnorr::verify(&secp, &self.agg_sig, &hash_outputs(&self.groups), &wallet_point).is_ok()
    }
}

/// Hash of all output commitments in group order, the aggregate signature
/// message
pub fn hash_outputs(groups: &[ResponseGroup]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    for group in groups {
        for coin in &group.coins {
            hasher.update(coin.output.commitment.as_bytes());
        }
    }
    hasher.finalize().into()
}
