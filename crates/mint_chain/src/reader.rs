//! Streaming access to transaction elements
//!
//! A `TxReader` is a resettable cursor over the inputs, outputs, and kernels
//! of some containing structure. Readers are plain borrows; they never own
//! the elements they yield.

use crate::error::ChainError;
use crate::transaction::{Input, Output, TxBase, TxKernel};
use crate::codec;
use mint_core::pedersen;
use mint_core::Amount;
use secp256k1::{PublicKey, Secp256k1, Signing, Verification};

/// Cursor over transaction elements in storage order
pub trait TxReader {
    fn reset(&mut self);
    fn next_input(&mut self) -> Option<&Input>;
    fn next_output(&mut self) -> Option<&Output>;
    fn next_kernel(&mut self) -> Option<&TxKernel>;
}

/// Accumulated result of a streaming pass
#[derive(Debug, Clone)]
pub struct TxSummary {
    /// `Σ outputs − Σ inputs + Σ kernel excess`, `None` for the empty stream
    pub sum: Option<PublicKey>,
    /// The offset scalar copied from the transaction base
    pub offset: [u8; 32],
    pub total_fee: Amount,
}

/// Walk the reader once, verifying every kernel signature and accumulating
/// the commitment sum used by balance checks
pub fn summarize<C, R>(
    secp: &Secp256k1<C>,
    base: &TxBase,
    reader: &mut R,
) -> Result<TxSummary, ChainError>
where
    C: Signing + Verification,
    R: TxReader,
{
    reader.reset();

    let mut points: Vec<PublicKey> = Vec::new();
    let mut total_fee: Amount = 0;

    while let Some(input) = reader.next_input() {
        let point = input.commitment.to_point()?;
        points.push(point.negate(secp));
    }

    while let Some(output) = reader.next_output() {
        points.push(output.commitment.to_point()?);
    }

    while let Some(kernel) = reader.next_kernel() {
        kernel.verify(secp)?;
        total_fee = total_fee
            .checked_add(kernel.fee)
            .ok_or(ChainError::AmountOverflow)?;
        points.push(kernel.excess.to_point()?);
    }

    Ok(TxSummary {
        sum: pedersen::sum_points(&points)?,
        offset: base.offset,
        total_fee,
    })
}

/// Serialized size of the streamed elements alone, excluding any framing of
/// the structure that holds them
pub fn netto_size<R: TxReader>(reader: &mut R) -> Result<usize, ChainError> {
    reader.reset();

    let mut size = 0;
    while let Some(input) = reader.next_input() {
        size += codec::encoded_size(input)?;
    }
    while let Some(output) = reader.next_output() {
        size += codec::encoded_size(output)?;
    }
    while let Some(kernel) = reader.next_kernel() {
        size += codec::encoded_size(kernel)?;
    }
    Ok(size)
}
