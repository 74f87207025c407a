//! Treasury error types

use mint_chain::ChainError;
use mint_core::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreasuryError {
    /// A single response group exceeds the block size budget. Unrecoverable:
    /// no treasury can be emitted from this plan.
    #[error("treasury group too large")]
    GroupTooLarge,
    /// A packed block failed post-build validation
    #[error("invalid block generated")]
    InvalidBlock,
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
