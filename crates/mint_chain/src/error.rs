//! Error types for transaction and block handling

use mint_core::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("encoding failed: {0}")]
    Encode(String),
    #[error("decoding failed: {0}")]
    Decode(String),
    #[error("amount overflow")]
    AmountOverflow,
    #[error("kernel signature invalid")]
    KernelSignature,
    #[error("kernel height range does not cover the block height")]
    KernelHeightRange,
    #[error("body elements out of canonical order")]
    NotNormalized,
    #[error("subsidy present where none is allowed")]
    UnexpectedSubsidy,
    #[error("body does not balance")]
    Unbalanced,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
