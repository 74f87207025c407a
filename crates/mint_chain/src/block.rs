//! Block bodies: merge, normalization, and validation
//!
//! Balance convention: a body is balanced when
//! `Σ outputs − Σ inputs + Σ excess + H·fees == H·subsidy + G·(−offset)`.
//! Both sides are evaluated as point sums and compared for equality.

use crate::codec;
use crate::error::ChainError;
use crate::reader::{summarize, TxReader};
use crate::transaction::{Input, Output, TxBase, TxKernel};
use mint_core::pedersen::{self, Commitment};
use mint_core::{AmountBig, Height};
use secp256k1::{PublicKey, Secp256k1, Signing, Verification};
use serde::{Deserialize, Serialize};

/// Upper bound on the serialized size of one block body
pub const MAX_BODY_SIZE: usize = 0x0010_0000;

/// A block body: element vectors plus the merged offset and the subsidy
/// created by this block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub kernels: Vec<TxKernel>,
    pub offset: [u8; 32],
    pub subsidy: AmountBig,
}

impl BlockBody {
    /// Exact canonical serialized size
    pub fn encoded_size(&self) -> Result<usize, ChainError> {
        codec::encoded_size(self)
    }

    /// Size of an empty body carrying the given subsidy. The varint codec
    /// makes this grow with the subsidy's encoded width.
    pub fn overhead_for(subsidy: AmountBig) -> Result<usize, ChainError> {
        let body = BlockBody {
            subsidy,
            ..BlockBody::default()
        };
        body.encoded_size()
    }

    pub fn reader(&self) -> BodyReader<'_> {
        BodyReader {
            body: self,
            next_input: 0,
            next_output: 0,
            next_kernel: 0,
        }
    }

    /// Append every element the reader yields, preserving stream order
    pub fn extend_from<R: TxReader>(&mut self, reader: &mut R) {
        reader.reset();
        while let Some(input) = reader.next_input() {
            self.inputs.push(*input);
        }
        while let Some(output) = reader.next_output() {
            self.outputs.push(output.clone());
        }
        while let Some(kernel) = reader.next_kernel() {
            self.kernels.push(kernel.clone());
        }
    }

    /// Fold another offset scalar into this body's offset
    pub fn merge_offset(&mut self, other: &[u8; 32]) -> Result<(), ChainError> {
        self.offset = pedersen::scalar_add(&self.offset, other)?;
        Ok(())
    }

    /// Bring the body to canonical form: elements sorted by commitment
    pub fn normalize(&mut self) {
        self.inputs.sort_by_key(|i| i.commitment);
        self.outputs.sort_by(|a, b| a.commitment.cmp(&b.commitment));
        self.kernels.sort_by(|a, b| a.excess.cmp(&b.excess));
    }

    /// Validate the body as a block at `height`. With `allow_subsidy` the
    /// body may create new value (the genesis bootstrap allowance);
    /// otherwise the subsidy must be zero.
    pub fn validate<C: Signing + Verification>(
        &self,
        secp: &Secp256k1<C>,
        height: Height,
        allow_subsidy: bool,
    ) -> Result<(), ChainError> {
        if !is_sorted_unique(self.inputs.iter().map(|i| &i.commitment))
            || !is_sorted_unique(self.outputs.iter().map(|o| &o.commitment))
            || !is_sorted_unique(self.kernels.iter().map(|k| &k.excess))
        {
            return Err(ChainError::NotNormalized);
        }

        for kernel in &self.kernels {
            if kernel.height_min > height || kernel.height_max < height {
                return Err(ChainError::KernelHeightRange);
            }
        }

        if !allow_subsidy && self.subsidy != 0 {
            return Err(ChainError::UnexpectedSubsidy);
        }

        let base = TxBase { offset: self.offset };
        let summary = summarize(secp, &base, &mut self.reader())?;

        let lhs = opt_combine(summary.sum, pedersen::commit_value(secp, summary.total_fee as u128)?)?;
        let rhs = opt_combine(
            pedersen::commit_value(secp, self.subsidy)?,
            pedersen::scalar_mul_g(secp, &pedersen::scalar_negate(&self.offset)?)?,
        )?;

        if lhs != rhs {
            return Err(ChainError::Unbalanced);
        }
        Ok(())
    }
}

fn opt_combine(
    a: Option<PublicKey>,
    b: Option<PublicKey>,
) -> Result<Option<PublicKey>, ChainError> {
    match (a, b) {
        (Some(a), Some(b)) => a
            .combine(&b)
            .map(Some)
            .map_err(|_| ChainError::Unbalanced),
        (Some(p), None) | (None, Some(p)) => Ok(Some(p)),
        (None, None) => Ok(None),
    }
}

fn is_sorted_unique<'a, I: Iterator<Item = &'a Commitment>>(mut iter: I) -> bool {
    let Some(mut prev) = iter.next() else {
        return true;
    };
    for next in iter {
        if next <= prev {
            return false;
        }
        prev = next;
    }
    true
}

/// Cursor over a block body's elements
#[derive(Clone)]
pub struct BodyReader<'a> {
    body: &'a BlockBody,
    next_input: usize,
    next_output: usize,
    next_kernel: usize,
}

impl TxReader for BodyReader<'_> {
    fn reset(&mut self) {
        self.next_input = 0;
        self.next_output = 0;
        self.next_kernel = 0;
    }

    fn next_input(&mut self) -> Option<&Input> {
        let input = self.body.inputs.get(self.next_input)?;
        self.next_input += 1;
        Some(input)
    }

    fn next_output(&mut self) -> Option<&Output> {
        let output = self.body.outputs.get(self.next_output)?;
        self.next_output += 1;
        Some(output)
    }

    fn next_kernel(&mut self) -> Option<&TxKernel> {
        let kernel = self.body.kernels.get(self.next_kernel)?;
        self.next_kernel += 1;
        Some(kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mint_core::pedersen::scalar_negate;
    use mint_core::GENESIS_HEIGHT;
    use secp256k1::SecretKey;

    fn rand_key() -> SecretKey {
        SecretKey::new(&mut secp256k1::rand::thread_rng())
    }

    /// One-output one-kernel body creating `value` with a correct offset
    fn subsidy_body(secp: &Secp256k1<secp256k1::All>, value: u64) -> BlockBody {
        let blinding = rand_key();
        let kernel_key = rand_key();

        let output = Output::create(secp, &blinding, value, 0).unwrap();
        let kernel = TxKernel::create(secp, &kernel_key).unwrap();

        let sum = pedersen::scalar_add(&blinding.secret_bytes(), &kernel_key.secret_bytes())
            .unwrap();

        BlockBody {
            inputs: Vec::new(),
            outputs: vec![output],
            kernels: vec![kernel],
            offset: scalar_negate(&sum).unwrap(),
            subsidy: value as u128,
        }
    }

    #[test]
    fn test_balanced_genesis_body_validates() {
        let secp = Secp256k1::new();
        let mut body = subsidy_body(&secp, 30);
        body.normalize();
        body.validate(&secp, GENESIS_HEIGHT, true).unwrap();
    }

    #[test]
    fn test_subsidy_requires_allowance() {
        let secp = Secp256k1::new();
        let mut body = subsidy_body(&secp, 30);
        body.normalize();
        assert!(matches!(
            body.validate(&secp, GENESIS_HEIGHT, false),
            Err(ChainError::UnexpectedSubsidy)
        ));
    }

    #[test]
    fn test_wrong_subsidy_is_unbalanced() {
        let secp = Secp256k1::new();
        let mut body = subsidy_body(&secp, 30);
        body.subsidy = 31;
        body.normalize();
        assert!(matches!(
            body.validate(&secp, GENESIS_HEIGHT, true),
            Err(ChainError::Unbalanced)
        ));
    }

    #[test]
    fn test_merged_bodies_validate_after_normalize() {
        let secp = Secp256k1::new();
        let mut a = subsidy_body(&secp, 10);
        let b = subsidy_body(&secp, 20);

        a.extend_from(&mut b.reader());
        a.merge_offset(&b.offset).unwrap();
        a.subsidy += b.subsidy;

        a.normalize();
        a.validate(&secp, GENESIS_HEIGHT, true).unwrap();

        // Forcing the outputs out of order must be rejected
        a.outputs.swap(0, 1);
        assert!(matches!(
            a.validate(&secp, GENESIS_HEIGHT, true),
            Err(ChainError::NotNormalized)
        ));
    }

    #[test]
    fn test_overhead_grows_with_subsidy_width() {
        let small = BlockBody::overhead_for(1).unwrap();
        let large = BlockBody::overhead_for(u64::MAX as u128).unwrap();
        assert!(large > small);
    }

    #[test]
    fn test_kernel_height_range_enforced() {
        let secp = Secp256k1::new();
        let mut body = subsidy_body(&secp, 5);
        body.kernels[0].height_min = GENESIS_HEIGHT + 10;
        body.normalize();
        assert!(matches!(
            body.validate(&secp, GENESIS_HEIGHT, true),
            Err(ChainError::KernelHeightRange)
        ));
    }
}
