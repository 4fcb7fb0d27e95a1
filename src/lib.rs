//! This library implements the semantic core of an interactive binary
//! analysis platform: an intermediate representation of instruction
//! semantics, and an execution engine that emulates a program over that
//! representation while disassembling code lazily as it is reached.
//!
//! # How it Works
//!
//! From a very high level, executing a program under analysis proceeds as
//! follows:
//!
//! 1. An architecture plugin decodes machine code into
//!    [`document::Instruction`]s, each carrying a list of
//!    [`expression::Expression`]s (the semantics) describing what the
//!    instruction does to the registers and memory.
//! 2. The [`execution::Execution`] engine walks the program from an entry
//!    point, fetching instruction cells from the [`document::Document`] and
//!    asking the architecture to disassemble any address the document does
//!    not know yet. The semantics of consecutive instructions are gathered
//!    into blocks, delimited by control-flow instructions and bracketed by
//!    synthetic system markers.
//! 3. Each block is handed to an [`emulator::Emulator`], which applies the
//!    semantics to the [`context::CpuContext`] and
//!    [`context::MemoryContext`]. The reference backend is the
//!    [`emulator::InterpreterEmulator`], which evaluates the expressions
//!    directly.
//! 4. The engine reads the program counter back out of the CPU context and
//!    continues with the next block, until execution runs off the mapped
//!    file, a hook asks for a stop, or something fails.
//!
//! Hooks can be attached to every instruction or to named functions; the
//! latter work by overwriting the function's entry with a fake address the
//! emulator recognises.
//!
//! # Basic Usage
//!
//! Semantics can also be built and run directly, without a document or an
//! architecture in the picture:
//!
//! ```
//! use std::rc::Rc;
//!
//! use semantic_execution_engine::{
//!     arch::CpuInformation,
//!     context::{CpuContext, FlatMemoryContext, RegisterFileContext},
//!     emulator::{interpreter::Config, Emulator, InterpreterEmulator},
//!     expression::{BinaryOperator, Expression},
//!     watchdog::{LazyWatchdog, Watchdog},
//!     Address,
//! };
//!
//! let info = CpuInformation::builder()
//!     .with_register(0, "r0", 32)
//!     .build()
//!     .in_rc();
//!
//! // r0 = r0 + 1, as an architecture would emit it.
//! let increment = Expression::assignment(
//!     Expression::identifier(0, &info),
//!     Expression::binary(
//!         BinaryOperator::Add,
//!         Expression::identifier(0, &info),
//!         Expression::bit_vector(32, 1u64),
//!     ),
//! );
//! assert_eq!(increment.to_string(), "(Id32(r0) = (Id32(r0) + int32(0x1)))");
//!
//! let mut cpu = RegisterFileContext::new(Rc::clone(&info));
//! let mut memory = FlatMemoryContext::new();
//! let mut interpreter =
//!     InterpreterEmulator::new(Rc::clone(&info), Config::default(), LazyWatchdog.in_rc());
//!
//! interpreter
//!     .execute(&mut cpu, &mut memory, Address::new(0, 0), &[increment])
//!     .unwrap();
//! assert_eq!(cpu.read_register(0, 32).unwrap().to_u64(), 1);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod address;
pub mod arch;
pub mod constant;
pub mod context;
pub mod document;
pub mod emulator;
pub mod error;
pub mod execution;
pub mod expression;
pub mod value;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use address::Address;
pub use execution::Execution;
pub use expression::Expression;
pub use value::BitVector;
