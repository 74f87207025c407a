//! Schnorr signatures over secp256k1
//!
//! A signature is a 33-byte nonce point `R` and a 32-byte scalar `k`
//! satisfying `G·k == R + e·P` for the challenge
//! `e = Blake2b256(R || msg || P)`.

use crate::traits::CryptoError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Signing, Verification};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Schnorr signature: compressed nonce point plus response scalar
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub nonce_point: [u8; 33],
    pub k: [u8; 32],
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..33].copy_from_slice(&self.nonce_point);
        out[33..].copy_from_slice(&self.k);
        out
    }

    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        let mut nonce_point = [0u8; 33];
        let mut k = [0u8; 32];
        nonce_point.copy_from_slice(&bytes[..33]);
        k.copy_from_slice(&bytes[33..]);
        Self { nonce_point, k }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.to_bytes()))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SigVisitor;

        impl<'de> Visitor<'de> for SigVisitor {
            type Value = Signature;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 65 byte Schnorr signature")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Signature, E> {
                let bytes: [u8; 65] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(Signature::from_bytes(bytes))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Signature, A::Error> {
                let mut bytes = [0u8; 65];
                for (i, b) in bytes.iter_mut().enumerate() {
                    *b = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Signature::from_bytes(bytes))
            }
        }

        deserializer.deserialize_bytes(SigVisitor)
    }
}

/// Compute the challenge `e = H(R || msg || P)`
fn challenge(
    nonce_point: &[u8; 33],
    message: &[u8; 32],
    public_key: &[u8; 33],
) -> Result<Scalar, CryptoError> {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(nonce_point);
    hasher.update(message);
    hasher.update(public_key);
    let digest: [u8; 32] = hasher.finalize().into();

    Scalar::from_be_bytes(digest).map_err(|_| CryptoError::InvalidScalar)
}

/// Sign a 32-byte message with a fresh random nonce
pub fn sign<C: Signing>(
    secp: &Secp256k1<C>,
    message: &[u8; 32],
    sk: &SecretKey,
) -> Result<Signature, CryptoError> {
    let public_key = PublicKey::from_secret_key(secp, sk);

    let nonce = SecretKey::new(&mut secp256k1::rand::thread_rng());
    let nonce_point = PublicKey::from_secret_key(secp, &nonce).serialize();

    let e = challenge(&nonce_point, message, &public_key.serialize())?;

    // z = nonce + e * sk, all mod the curve order
    let es = sk.mul_tweak(&e).map_err(|_| CryptoError::InvalidScalar)?;
    let es = Scalar::from_be_bytes(es.secret_bytes()).map_err(|_| CryptoError::InvalidScalar)?;
    let z = nonce.add_tweak(&es).map_err(|_| CryptoError::InvalidScalar)?;

    Ok(Signature {
        nonce_point,
        k: z.secret_bytes(),
    })
}

/// Verify a signature against a 32-byte message and a public key
pub fn verify<C: Signing + Verification>(
    secp: &Secp256k1<C>,
    sig: &Signature,
    message: &[u8; 32],
    public_key: &PublicKey,
) -> Result<(), CryptoError> {
    let nonce_point =
        PublicKey::from_slice(&sig.nonce_point).map_err(|_| CryptoError::InvalidSignature)?;

    let e = challenge(&sig.nonce_point, message, &public_key.serialize())?;

    let z = SecretKey::from_slice(&sig.k).map_err(|_| CryptoError::InvalidSignature)?;
    let g_z = PublicKey::from_secret_key(secp, &z);

    let p_e = public_key
        .mul_tweak(secp, &e)
        .map_err(|_| CryptoError::InvalidSignature)?;
    let expected = nonce_point
        .combine(&p_e)
        .map_err(|_| CryptoError::InvalidSignature)?;

    if g_z != expected {
        return Err(CryptoError::InvalidSignature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_msg() -> [u8; 32] {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(b"schnorr test message");
        hasher.finalize().into()
    }

    #[test]
    fn test_sign_and_verify() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let pk = PublicKey::from_secret_key(&secp, &sk);
        let msg = test_msg();

        let sig = sign(&secp, &msg, &sk).expect("signing should succeed");
        verify(&secp, &sig, &msg, &pk).expect("verification should succeed");
    }

    #[test]
    fn test_tampered_message_fails() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let pk = PublicKey::from_secret_key(&secp, &sk);
        let msg = test_msg();

        let sig = sign(&secp, &msg, &sk).unwrap();

        let mut tampered = msg;
        tampered[0] ^= 0x01;
        assert!(verify(&secp, &sig, &tampered, &pk).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let other = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let other_pk = PublicKey::from_secret_key(&secp, &other);
        let msg = test_msg();

        let sig = sign(&secp, &msg, &sk).unwrap();
        assert!(verify(&secp, &sig, &msg, &other_pk).is_err());
    }

    #[test]
    fn test_tampered_signature_bytes_fail() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let pk = PublicKey::from_secret_key(&secp, &sk);
        let msg = test_msg();

        let sig = sign(&secp, &msg, &sk).unwrap();

        for i in [0usize, 34, 64] {
            let mut bytes = sig.to_bytes();
            bytes[i] ^= 0x01;
            let bad = Signature::from_bytes(bytes);
            assert!(verify(&secp, &bad, &msg, &pk).is_err(), "byte {i}");
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let sig = sign(&secp, &test_msg(), &sk).unwrap();

        let bytes = bincode::serde::encode_to_vec(sig, bincode::config::standard()).unwrap();
        let (back, _): (Signature, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(sig, back);
    }
}
