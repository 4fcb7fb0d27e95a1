//! This module contains errors pertaining to the execution engine's
//! fetch-decode-lift-execute loop and its hook management.

use std::rc::Rc;

use thiserror::Error;

use crate::error::{container, emulation, evaluation};

/// Errors that occur while the execution engine drives emulation over the
/// document.
#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error("No emulator has been configured on the execution")]
    NoEmulator,

    #[error("The execution has not been initialised with runtime contexts")]
    NotInitialized,

    #[error("No emulator factory is registered under the name `{name}`")]
    UnknownEmulator { name: String },

    #[error("The architecture reports no program pointer register for mode {mode:?}")]
    InvalidProgramPointer { mode: u8 },

    #[error("The program pointer register is only {bits:?} bits wide")]
    ProgramPointerTooNarrow { bits: u16 },

    #[error("The document could not be mapped into the memory context")]
    DocumentNotMappable,

    #[error("The operating system failed to initialise the contexts: {_0}")]
    OperatingSystemFailed(Rc<anyhow::Error>),

    #[error("Disassembly failed: {_0}")]
    DisassemblyFailed(Rc<anyhow::Error>),

    #[error("The lifted instruction could not be stored into the document")]
    CellWriteFailed,

    #[error("The document returned no instruction cell after lifting")]
    MissingInstruction,

    #[error("The emulator failed to execute the block: {_0}")]
    EmulationFailed(#[from] emulation::Error),

    #[error("The program pointer register could not be accessed: {_0}")]
    ProgramPointerAccess(#[from] evaluation::Error),

    #[error("No label named `{name}` resolves to an address in the document")]
    UnknownFunction { name: String },

    #[error("The label `{name}` is neither a function nor an import and cannot be hooked")]
    NotHookable { name: String },

    #[error("The hook sentinel could not be written over the function entry")]
    HookWriteFailed,

    #[error("The emulator refused the hook registration")]
    HookRegistrationFailed,
}

/// An execution error with the document address at which it occurred.
pub type LocatedError = container::Located<Error>;

/// The result type for methods on the execution engine.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach addresses to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, address: crate::address::Address) -> Self::Located {
        container::Located {
            location: address,
            payload: self,
        }
    }
}
