//! The treasury container: plan creation, block packing, persistence

use crate::executor;
use crate::request::{Request, RequestCoin, RequestGroup};
use crate::response::Response;
use crate::TreasuryError;
use mint_chain::block::{BlockBody, MAX_BODY_SIZE};
use mint_chain::codec;
use mint_core::{Amount, Height, PeerId, GENESIS_HEIGHT};
use secp256k1::Secp256k1;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Emission schedule parameters, in blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub step_min: Height,
    pub max_diff_per_block: Height,
    pub max_height: Height,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            step_min: 1440 * 30,             // 1 month
            max_diff_per_block: 1440 * 90,   // 3 months
            max_height: 1440 * 360 * 5,      // 5 year plan
        }
    }
}

/// One peer's slot in the ceremony. An entry without a response is a peer
/// that has not answered yet; the packer skips it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub request: Request,
    pub response: Option<Response>,
}

/// The issuance ceremony state: one entry per beneficiary wallet, walked in
/// peer id order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    pub entries: BTreeMap<PeerId, Entry>,
}

/// The block being filled during one horizon walk, with its exact size
/// bookkeeping
struct OpenBlock {
    body: BlockBody,
    overhead: usize,
    total: usize,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan the emission for one wallet. Any previous plan for the same
    /// peer is discarded; plans are never edited in place.
    ///
    /// Each coin is worth `per_block_avg × step_min` and incubates one
    /// `step_min` stride after the previous; a new group starts whenever
    /// the height span since the group's first coin reaches
    /// `max_diff_per_block`.
    pub fn create_plan(
        &mut self,
        peer_id: PeerId,
        per_block_avg: Amount,
        pars: &Parameters,
    ) -> &mut Entry {
        assert!(pars.step_min > 0, "step_min must be positive");

        let value = per_block_avg * pars.step_min;
        let mut groups: Vec<RequestGroup> = Vec::new();

        let mut group_start = 0;
        let mut h = 0;
        while h < pars.max_height {
            if groups.is_empty() || h - group_start >= pars.max_diff_per_block {
                groups.push(RequestGroup::default());
                group_start = h;
            }
            if let Some(group) = groups.last_mut() {
                group.coins.push(RequestCoin {
                    value,
                    incubation: h,
                });
            }
            h += pars.step_min;
        }

        debug!(peer = ?peer_id, groups = groups.len(), "treasury plan created");

        let entry = Entry {
            request: Request {
                wallet_id: peer_id,
                groups,
            },
            response: None,
        };
        match self.entries.entry(peer_id) {
            btree_map::Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
                occupied.into_mut()
            }
            btree_map::Entry::Vacant(vacant) => vacant.insert(entry),
        }
    }

    /// Pack every answered entry into a sequence of genesis blocks
    pub fn build(&self) -> Result<Vec<BlockBody>, TreasuryError> {
        self.build_with_limit(MAX_BODY_SIZE)
    }

    /// [`Treasury::build`] against a caller-chosen body size budget
    pub fn build_with_limit(&self, max_body_size: usize) -> Result<Vec<BlockBody>, TreasuryError> {
        // All plans are assumed to share group and incubation parameters,
        // so the same group index lines up across peers.
        let peers: Vec<(&PeerId, &Entry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.response.is_some())
            .collect();

        let mut blocks: Vec<BlockBody> = Vec::new();
        let empty_overhead = BlockBody::overhead_for(0)?;

        let mut horizon = 0usize;
        loop {
            let mut any_group = false;
            let mut open: Option<OpenBlock> = None;

            let mut i = 0;
            while i < peers.len() {
                let (_, entry) = peers[i];
                let (Some(response), Some(request_group)) =
                    (entry.response.as_ref(), entry.request.groups.get(horizon))
                else {
                    i += 1;
                    continue;
                };
                let Some(group) = response.groups.get(horizon) else {
                    i += 1;
                    continue;
                };
                any_group = true;

                let block = open.get_or_insert_with(|| OpenBlock {
                    body: BlockBody::default(),
                    overhead: empty_overhead,
                    total: empty_overhead,
                });

                let netto = group.netto_size()?;

                let mut subsidy_next = block.body.subsidy;
                request_group.add_subsidy(&mut subsidy_next);

                // Body framing depends slightly on the subsidy's encoded
                // width, so the overhead is re-probed after every peer
                let overhead_next = BlockBody::overhead_for(subsidy_next)?;
                let prefix_growth =
                    vec_prefix_growth(block.body.outputs.len(), group.coins.len())
                        + vec_prefix_growth(block.body.kernels.len(), 1);

                let projected =
                    block.total + netto + prefix_growth + overhead_next - block.overhead;

                if projected <= max_body_size {
                    block.body.extend_from(&mut group.reader());
                    block.body.merge_offset(&group.base.offset)?;
                    block.body.subsidy = subsidy_next;
                    block.total = projected;
                    block.overhead = overhead_next;
                    debug_assert_eq!(block.body.encoded_size()?, block.total);
                    i += 1;
                } else if block.body.kernels.is_empty() {
                    return Err(TreasuryError::GroupTooLarge);
                } else {
                    // Flushing resets the overhead baseline, so the same
                    // peer is retried against a fresh block
                    if let Some(flushed) = open.take() {
                        debug!(
                            horizon,
                            size = flushed.total,
                            "block flushed mid-walk"
                        );
                        blocks.push(flushed.body);
                    }
                }
            }

            if !any_group {
                break;
            }
            if let Some(block) = open.take() {
                blocks.push(block.body);
            }
            horizon += 1;
        }

        let valid = executor::verify_each_mut(&mut blocks, |i, body| {
            let secp = Secp256k1::new();
            body.normalize();
            body.validate(&secp, GENESIS_HEIGHT + i as Height, true).is_ok()
        });
        if !valid {
            return Err(TreasuryError::InvalidBlock);
        }

        info!(blocks = blocks.len(), "treasury build complete");
        Ok(blocks)
    }

    /// Snapshot the ceremony state to disk in canonical form
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TreasuryError> {
        let bytes = codec::to_vec(self)?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| TreasuryError::Storage(e.to_string()))?;
        debug!(path = %path.as_ref().display(), "treasury state saved");
        Ok(())
    }

    /// Restore a ceremony snapshot written by [`Treasury::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TreasuryError> {
        let bytes =
            std::fs::read(path.as_ref()).map_err(|e| TreasuryError::Storage(e.to_string()))?;
        Ok(codec::from_slice(&bytes)?)
    }
}

/// Growth of a vector's varint length prefix when `added` elements join
/// `len` existing ones
fn vec_prefix_growth(len: usize, added: usize) -> usize {
    codec::varint_len((len + added) as u64) - codec::varint_len(len as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet_identity;
    use mint_core::SeedKdf;

    fn peer(seed: u8) -> (PeerId, SeedKdf) {
        let secp = Secp256k1::new();
        let kdf = SeedKdf::from_seed([seed; 32]);
        let (peer_id, _) = wallet_identity(&secp, &kdf).unwrap();
        (peer_id, kdf)
    }

    #[test]
    fn test_single_group_plan_shape() {
        let (peer_id, _) = peer(1);
        let pars = Parameters {
            step_min: 1,
            max_diff_per_block: 1000,
            max_height: 3,
        };

        let mut treasury = Treasury::new();
        let entry = treasury.create_plan(peer_id, 10, &pars);

        assert_eq!(entry.request.wallet_id, peer_id);
        assert_eq!(entry.request.groups.len(), 1);
        let coins = &entry.request.groups[0].coins;
        assert_eq!(coins.len(), 3);
        for (i, coin) in coins.iter().enumerate() {
            assert_eq!(coin.value, 10);
            assert_eq!(coin.incubation, i as Height);
        }
    }

    #[test]
    fn test_plan_splits_groups_on_height_span() {
        let (peer_id, _) = peer(2);
        let pars = Parameters {
            step_min: 1,
            max_diff_per_block: 2,
            max_height: 5,
        };

        let mut treasury = Treasury::new();
        let entry = treasury.create_plan(peer_id, 1, &pars);

        let counts: Vec<usize> = entry
            .request
            .groups
            .iter()
            .map(|g| g.coins.len())
            .collect();
        assert_eq!(counts, vec![2, 2, 1]);

        let incubations: Vec<Vec<Height>> = entry
            .request
            .groups
            .iter()
            .map(|g| g.coins.iter().map(|c| c.incubation).collect())
            .collect();
        assert_eq!(incubations, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn test_replanning_discards_previous_entry() {
        let (peer_id, _) = peer(3);
        let mut treasury = Treasury::new();

        treasury.create_plan(
            peer_id,
            1,
            &Parameters {
                step_min: 1,
                max_diff_per_block: 10,
                max_height: 8,
            },
        );
        let entry = treasury.create_plan(
            peer_id,
            2,
            &Parameters {
                step_min: 2,
                max_diff_per_block: 10,
                max_height: 8,
            },
        );

        assert_eq!(entry.request.groups.len(), 1);
        assert_eq!(entry.request.groups[0].coins.len(), 4);
        assert_eq!(entry.request.groups[0].coins[0].value, 4);
        assert_eq!(treasury.entries.len(), 1);
    }

    #[test]
    fn test_plan_value_scales_with_step() {
        let (peer_id, _) = peer(4);
        let pars = Parameters {
            step_min: 5,
            max_diff_per_block: 100,
            max_height: 20,
        };

        let mut treasury = Treasury::new();
        let entry = treasury.create_plan(peer_id, 3, &pars);

        for coin in &entry.request.groups[0].coins {
            assert_eq!(coin.value, 15);
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (peer_id, _) = peer(5);
        let mut treasury = Treasury::new();
        treasury.create_plan(peer_id, 7, &Parameters::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ceremony.bin");

        treasury.save(&path).unwrap();
        let restored = Treasury::load(&path).unwrap();
        assert_eq!(treasury, restored);
    }

    #[test]
    fn test_build_without_responses_is_empty() {
        let (peer_id, _) = peer(6);
        let mut treasury = Treasury::new();
        treasury.create_plan(peer_id, 7, &Parameters::default());

        let blocks = treasury.build().unwrap();
        assert!(blocks.is_empty());
    }
}
