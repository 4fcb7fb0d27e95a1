//! This module contains the error type for operations on the fixed-width
//! [`crate::value::BitVector`] values.

use thiserror::Error;

/// Errors that occur while operating on bit-vector values.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Division of a bit-vector by zero")]
    DivisionByZero,

    #[error("A bit-vector cannot be {width:?} bits wide")]
    InvalidWidth { width: u16 },

    #[error("Cannot extend a {from:?}-bit value to the narrower width {to:?}")]
    NarrowingExtension { from: u16, to: u16 },

    #[error("Bit scan over a zero value has no defined result")]
    UndefinedBitScan,

    #[error("Cannot broadcast a {lane:?}-bit lane across {target:?} bits")]
    InvalidBroadcast { lane: u16, target: u16 },

    #[error("The mask for a bit-range operation must be non-zero")]
    EmptyBitRange,
}

/// The result type for operations on bit-vector values.
pub type Result<T> = std::result::Result<T, Error>;
