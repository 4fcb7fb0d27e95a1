//! This module contains errors pertaining to the evaluation of semantic
//! expressions against the runtime contexts.

use thiserror::Error;

use crate::error::value;

/// Errors that occur while reading or writing expressions against a CPU and
/// memory context.
///
/// Evaluation failures promise nothing about state beyond what had already
/// succeeded by the time they are returned.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("A `{form}` expression cannot be read")]
    NotReadable { form: String },

    #[error("A `{form}` expression cannot be written")]
    NotWritable { form: String },

    #[error("A `{form}` expression does not denote an address")]
    NoAddress { form: String },

    #[error("Expected {expected:?} data slots for the operation but found {actual:?}")]
    SlotCountMismatch { expected: usize, actual: usize },

    #[error("No register with the identifier {id:?} exists in this context")]
    UnknownRegister { id: u32 },

    #[error("Memory at linear address {address:#x} ({count:?} bytes) is not mapped")]
    UnmappedMemory { address: u64, count: usize },

    #[error("A memory access of {bits:?} bits is not a whole number of bytes")]
    InvalidAccessSize { bits: u16 },

    #[error("No variable named `{name}` is live in the scratch store")]
    UnknownVariable { name: String },

    #[error(transparent)]
    Value(#[from] value::Error),
}

/// The result type for evaluation of expressions against runtime contexts.
pub type Result<T> = std::result::Result<T, Error>;
