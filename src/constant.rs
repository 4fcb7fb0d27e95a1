//! This module contains constants that are needed throughout the codebase.

/// The widest value that a [`crate::value::BitVector`] can represent, in
/// bits.
///
/// This is bounded by the 256-bit integer that backs the bit-vector store.
/// Architectures with wider aggregate registers are expressed through vector
/// identifiers instead.
pub const MAXIMUM_VALUE_WIDTH: u16 = 256;

/// The first fake linear address handed out when hooking a function.
///
/// The bytes at a hooked function's entry point are overwritten with one of
/// these sentinels, so executing the function lands the program counter in a
/// range the emulator has hooks registered for.
pub const HOOK_ADDRESS_BASE: u64 = 0xDEAD_7700;

/// The distance between consecutively allocated fake hook addresses.
pub const HOOK_ADDRESS_STEP: u64 = 4;

/// The narrowest program-pointer register that the execution engine will
/// drive, in bits.
pub const MINIMUM_PROGRAM_POINTER_WIDTH: u16 = 8;

/// The default maximum number of iterations that the interpreter will run a
/// single `while` semantic loop for before giving up on it.
pub const DEFAULT_LOOP_ITERATION_LIMIT: usize = 0x1_0000;

/// The default number of evaluated expressions between polls of the
/// watchdog during interpretation.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 100;
