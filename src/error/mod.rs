//! This module contains the primary error type for the library's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.
//!
//! # Anyhow
//!
//! All of the errors implement [`std::error::Error`], and hence can be used
//! with [`anyhow::Error`] internally. It is _not_ recommended to use that
//! error type in the interface of the library, as this forces clients to
//! also use `anyhow`.

pub mod container;
pub mod emulation;
pub mod evaluation;
pub mod execution;
pub mod value;

use std::rc::Rc;

use thiserror::Error;

/// The interface result type for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by
/// the clients of the library) should be members of this enum.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// Errors from operations on bit-vector values.
    #[error(transparent)]
    Value(#[from] value::Error),

    /// Errors from evaluating expressions against the runtime contexts.
    #[error(transparent)]
    Evaluation(#[from] evaluation::Error),

    /// Errors from the emulator subsystem.
    #[error(transparent)]
    Emulation(#[from] emulation::Error),

    /// Errors from the execution engine, located at a document address.
    #[error(transparent)]
    Execution(#[from] execution::LocatedError),

    /// Unknown errors, usually from the dependencies of the library.
    ///
    /// It is wrapped in an [`Rc`] to ensure that it can be cloned like the
    /// other error types in this interface error.
    #[error(transparent)]
    Other(Rc<anyhow::Error>),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(Rc::new(value))
    }
}
