//! This module contains errors pertaining to the emulation of semantic
//! blocks by an [`crate::emulator::Emulator`].

use thiserror::Error;

use crate::error::evaluation;

/// Errors that occur during emulation of a semantic block.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// A hook callback asked for execution to stop. This is a cooperative
    /// stop request rather than a failure, and the execution engine treats
    /// it as a normal termination.
    #[error("Emulation was stopped by a hook callback")]
    StoppedByHook,

    /// The watchdog asked for execution to stop.
    #[error("Emulation was stopped by the watchdog")]
    StoppedByWatchdog,

    #[error("The emulator cannot execute a `{form}` expression")]
    Unsupported { form: String },

    #[error("A semantic loop exceeded the iteration limit of {limit:?}")]
    LoopLimitExceeded { limit: usize },

    #[error("The program pointer register is not known for the current mode")]
    NoProgramPointer,

    #[error(transparent)]
    Evaluation(#[from] evaluation::Error),
}

impl Error {
    /// Checks whether the error is a cooperative stop request rather than a
    /// genuine failure.
    #[must_use]
    pub fn is_stop_request(&self) -> bool {
        matches!(self, Self::StoppedByHook | Self::StoppedByWatchdog)
    }
}

/// The result type for emulator operations.
pub type Result<T> = std::result::Result<T, Error>;
