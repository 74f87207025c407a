//! Transaction body elements: inputs, outputs, kernels, and the offset base

use crate::error::ChainError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use mint_core::pedersen::{self, Commitment};
use mint_core::schnorr::{self, Signature};
use mint_core::{Amount, CryptoError, Height, MAX_HEIGHT};
use secp256k1::{PublicKey, Secp256k1, SecretKey, Signing, Verification};
use serde::{Deserialize, Serialize};

const KERNEL_SIG_TAG: &[u8] = b"mint.kernel.v1";

/// A spent output, referenced by its commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub commitment: Commitment,
}

/// A transaction output.
///
/// Confidential outputs carry only the commitment; `public_value` is set for
/// outputs whose value is disclosed in clear. `incubation` is the earliest
/// height at which the output becomes spendable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub commitment: Commitment,
    pub coinbase: bool,
    pub public_value: Option<Amount>,
    pub incubation: Height,
}

impl Output {
    /// Create a confidential output committing to `value` under `blinding`
    pub fn create<C: Signing + Verification>(
        secp: &Secp256k1<C>,
        blinding: &SecretKey,
        value: Amount,
        incubation: Height,
    ) -> Result<Output, CryptoError> {
        Ok(Output {
            commitment: pedersen::commit(secp, value, blinding)?,
            coinbase: false,
            public_value: None,
            incubation,
        })
    }

    pub fn is_public(&self) -> bool {
        self.public_value.is_some()
    }
}

/// A transaction kernel: fee, height bounds, excess commitment, and a
/// signature by the excess key over the kernel preimage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxKernel {
    pub fee: Amount,
    pub height_min: Height,
    pub height_max: Height,
    pub excess: Commitment,
    pub signature: Signature,
}

impl TxKernel {
    /// Create a zero-fee kernel with an unbounded height range, signed with
    /// the given excess key
    pub fn create<C: Signing + Verification>(
        secp: &Secp256k1<C>,
        excess_key: &SecretKey,
    ) -> Result<TxKernel, CryptoError> {
        let fee = 0;
        let height_min = 0;
        let height_max = MAX_HEIGHT;

        let excess = Commitment::from_point(&PublicKey::from_secret_key(secp, excess_key));
        let msg = kernel_sig_msg(fee, height_min, height_max);
        let signature = schnorr::sign(secp, &msg, excess_key)?;

        Ok(TxKernel {
            fee,
            height_min,
            height_max,
            excess,
            signature,
        })
    }

    pub fn sig_msg(&self) -> [u8; 32] {
        kernel_sig_msg(self.fee, self.height_min, self.height_max)
    }

    /// Check the kernel signature against its excess point
    pub fn verify<C: Signing + Verification>(
        &self,
        secp: &Secp256k1<C>,
    ) -> Result<(), ChainError> {
        let excess = self.excess.to_point()?;
        schnorr::verify(secp, &self.signature, &self.sig_msg(), &excess)
            .map_err(|_| ChainError::KernelSignature)
    }
}

fn kernel_sig_msg(fee: Amount, height_min: Height, height_max: Height) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(KERNEL_SIG_TAG);
    hasher.update(fee.to_be_bytes());
    hasher.update(height_min.to_be_bytes());
    hasher.update(height_max.to_be_bytes());
    hasher.finalize().into()
}

/// Transaction-wide data: the blinding offset published so verifiers can
/// cancel the `G·blinding` terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxBase {
    pub offset: [u8; 32],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_roundtrip() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());

        let kernel = TxKernel::create(&secp, &sk).unwrap();
        assert_eq!(kernel.fee, 0);
        assert_eq!(kernel.height_min, 0);
        assert_eq!(kernel.height_max, MAX_HEIGHT);
        kernel.verify(&secp).unwrap();
    }

    #[test]
    fn test_kernel_rejects_field_tampering() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());

        let mut kernel = TxKernel::create(&secp, &sk).unwrap();
        kernel.fee = 1;
        assert!(kernel.verify(&secp).is_err());
    }

    #[test]
    fn test_output_create_is_confidential() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());

        let output = Output::create(&secp, &sk, 10, 0).unwrap();
        assert!(!output.coinbase);
        assert!(!output.is_public());
        assert!(output.commitment.to_point().is_ok());
    }
}
