//! Transaction body primitives for the Mint treasury
//! Outputs, kernels, block bodies, streaming readers, and the canonical
//! binary codec

pub mod block;
pub mod codec;
pub mod error;
pub mod reader;
pub mod transaction;

pub use block::{BlockBody, BodyReader, MAX_BODY_SIZE};
pub use error::ChainError;
pub use reader::{netto_size, summarize, TxReader, TxSummary};
pub use transaction::{Input, Output, TxBase, TxKernel};
