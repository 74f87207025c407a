//! Pedersen commitments `C = G·blinding + H·value`
//!
//! `G` is the secp256k1 base point; `H` is a second generator derived from a
//! fixed tag. The curve library cannot represent the zero scalar or the point
//! at infinity, so the helpers here treat zero explicitly and balance checks
//! elsewhere are phrased as point equality rather than sum-to-zero.

use crate::traits::CryptoError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Signing, Verification};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

const GENERATOR_H_TAG: &[u8] = b"mint.pedersen.generator-H.v1";

/// A compressed commitment point
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Commitment([u8; 33]);

impl Commitment {
    pub fn from_bytes(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }

    pub fn from_point(point: &PublicKey) -> Self {
        Self(point.serialize())
    }

    /// Decode to a curve point, failing if the bytes are not on the curve
    pub fn to_point(&self) -> Result<PublicKey, CryptoError> {
        PublicKey::from_slice(&self.0).map_err(|_| CryptoError::InvalidCommitment)
    }

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 33] {
        self.0
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(self.0))
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CommitmentVisitor;

        impl<'de> Visitor<'de> for CommitmentVisitor {
            type Value = Commitment;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 33 byte compressed point")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Commitment, E> {
                let bytes: [u8; 33] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(Commitment(bytes))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Commitment, A::Error> {
                let mut bytes = [0u8; 33];
                for (i, b) in bytes.iter_mut().enumerate() {
                    *b = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Commitment(bytes))
            }
        }

        deserializer.deserialize_bytes(CommitmentVisitor)
    }
}

/// The value generator `H`, derived once from the fixed tag
pub fn generator_h<C: Signing>(secp: &Secp256k1<C>) -> PublicKey {
    static GENERATOR_H: OnceLock<PublicKey> = OnceLock::new();
    *GENERATOR_H.get_or_init(|| {
        let mut digest: [u8; 32] = {
            let mut hasher = Blake2b::<U32>::new();
            hasher.update(GENERATOR_H_TAG);
            hasher.finalize().into()
        };
        // Re-hash until the digest is a valid scalar
        loop {
            if let Ok(sk) = SecretKey::from_slice(&digest) {
                return PublicKey::from_secret_key(secp, &sk);
            }
            let mut hasher = Blake2b::<U32>::new();
            hasher.update(digest);
            digest = hasher.finalize().into();
        }
    })
}

fn scalar_from_amount(value: u128) -> Result<Scalar, CryptoError> {
    let mut bytes = [0u8; 32];
    bytes[16..].copy_from_slice(&value.to_be_bytes());
    Scalar::from_be_bytes(bytes).map_err(|_| CryptoError::InvalidScalar)
}

/// Commit to `value` under `blinding`
pub fn commit<C: Signing + Verification>(
    secp: &Secp256k1<C>,
    value: u64,
    blinding: &SecretKey,
) -> Result<Commitment, CryptoError> {
    let mut point = PublicKey::from_secret_key(secp, blinding);
    if let Some(hv) = commit_value(secp, value as u128)? {
        point = point.combine(&hv).map_err(|_| CryptoError::InvalidCommitment)?;
    }
    Ok(Commitment::from_point(&point))
}

/// The value term `H·value`; `None` when the value is zero.
/// Takes the wide amount type so block subsidies can use it directly.
pub fn commit_value<C: Signing + Verification>(
    secp: &Secp256k1<C>,
    value: u128,
) -> Result<Option<PublicKey>, CryptoError> {
    if value == 0 {
        return Ok(None);
    }
    let scalar = scalar_from_amount(value)?;
    let point = generator_h(secp)
        .mul_tweak(secp, &scalar)
        .map_err(|_| CryptoError::InvalidCommitment)?;
    Ok(Some(point))
}

/// Add two scalars given in 32-byte form; all-zero bytes denote zero
pub fn scalar_add(a: &[u8; 32], b: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    if is_zero(a) {
        return Ok(*b);
    }
    if is_zero(b) {
        return Ok(*a);
    }
    let a = SecretKey::from_slice(a).map_err(|_| CryptoError::InvalidScalar)?;
    let b = Scalar::from_be_bytes(*b).map_err(|_| CryptoError::InvalidScalar)?;
    match a.add_tweak(&b) {
        Ok(sum) => Ok(sum.secret_bytes()),
        // The only failure left is a sum that landed exactly on zero
        Err(_) => Ok([0u8; 32]),
    }
}

/// Negate a scalar given in 32-byte form
pub fn scalar_negate(a: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    if is_zero(a) {
        return Ok(*a);
    }
    let sk = SecretKey::from_slice(a).map_err(|_| CryptoError::InvalidScalar)?;
    Ok(sk.negate().secret_bytes())
}

/// `G·a` for a 32-byte scalar; `None` when the scalar is zero
pub fn scalar_mul_g<C: Signing>(
    secp: &Secp256k1<C>,
    a: &[u8; 32],
) -> Result<Option<PublicKey>, CryptoError> {
    if is_zero(a) {
        return Ok(None);
    }
    let sk = SecretKey::from_slice(a).map_err(|_| CryptoError::InvalidScalar)?;
    Ok(Some(PublicKey::from_secret_key(secp, &sk)))
}

/// Sum a list of points; `None` for the empty list
pub fn sum_points(points: &[PublicKey]) -> Result<Option<PublicKey>, CryptoError> {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut acc = *first;
    for p in iter {
        acc = acc.combine(p).map_err(|_| CryptoError::InvalidCommitment)?;
    }
    Ok(Some(acc))
}

fn is_zero(bytes: &[u8; 32]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_is_binding_to_value() {
        let secp = Secp256k1::new();
        let blinding = SecretKey::new(&mut secp256k1::rand::thread_rng());

        let a = commit(&secp, 100, &blinding).unwrap();
        let b = commit(&secp, 101, &blinding).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_commit_hides_value_under_blinding() {
        let secp = Secp256k1::new();
        let b1 = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let b2 = SecretKey::new(&mut secp256k1::rand::thread_rng());

        let a = commit(&secp, 100, &b1).unwrap();
        let b = commit(&secp, 100, &b2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_commitment_opens_by_subtracting_value_term() {
        let secp = Secp256k1::new();
        let blinding = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let value = 5000u64;

        let c = commit(&secp, value, &blinding).unwrap();

        // C - H·v must equal G·b
        let hv = commit_value(&secp, value as u128).unwrap().unwrap();
        let p = c.to_point().unwrap().combine(&hv.negate(&secp)).unwrap();
        assert_eq!(p, PublicKey::from_secret_key(&secp, &blinding));
    }

    #[test]
    fn test_scalar_add_and_negate_cancel() {
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let a = sk.secret_bytes();
        let neg = scalar_negate(&a).unwrap();

        assert_eq!(scalar_add(&a, &neg).unwrap(), [0u8; 32]);
        assert_eq!(scalar_add(&a, &[0u8; 32]).unwrap(), a);
    }

    #[test]
    fn test_generator_h_differs_from_g() {
        let secp = Secp256k1::new();
        let one = SecretKey::from_slice(&{
            let mut b = [0u8; 32];
            b[31] = 1;
            b
        })
        .unwrap();
        let g = PublicKey::from_secret_key(&secp, &one);
        assert_ne!(generator_h(&secp), g);
    }
}
