//! This module contains the interfaces that architecture plugins and
//! operating-system personas implement, together with [`CpuInformation`],
//! the immutable register dictionary that everything consults when turning
//! register identifiers into names, widths and roles.

use std::{collections::HashMap, fmt::Debug, rc::Rc};

use bimap::BiHashMap;

use crate::{
    address::Address,
    context::{CpuContext, MemoryContext},
    document::{BinaryStream, Document, Instruction},
};

/// The identifier of a register within an architecture's register file.
pub type RegisterId = u32;

/// The architectural role a register can play, independent of its name.
///
/// Roles are resolved per CPU mode, as the register fulfilling a role can
/// change with the mode (`eip` against `rip`, for example).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RegisterRole {
    /// The register holding the address of the executing instruction.
    ProgramPointer,

    /// The register holding the top of the call stack.
    StackPointer,

    /// The register anchoring the current stack frame.
    FramePointer,

    /// The register holding the condition flags.
    Flags,
}

/// An immutable dictionary describing an architecture's register file: the
/// bidirectional identifier ↔ name mapping, the width of each register, and
/// which register plays which architectural role in each CPU mode.
///
/// Instances are built once by the architecture through
/// [`CpuInformationBuilder`] and then shared immutably by every expression
/// and context that needs them.
#[derive(Clone, Debug)]
pub struct CpuInformation {
    /// The bidirectional mapping between register identifiers and names.
    names: BiHashMap<RegisterId, String>,

    /// The width of each register in bits.
    widths: HashMap<RegisterId, u16>,

    /// The register fulfilling each role, per CPU mode.
    roles: HashMap<(RegisterRole, u8), RegisterId>,
}

impl CpuInformation {
    /// Creates a builder for a new register dictionary.
    #[must_use]
    pub fn builder() -> CpuInformationBuilder {
        CpuInformationBuilder::default()
    }

    /// Gets the name of the register identified by `id`, if it exists.
    #[must_use]
    pub fn name_of(&self, id: RegisterId) -> Option<&str> {
        self.names.get_by_left(&id).map(String::as_str)
    }

    /// Gets the identifier of the register named `name`, if it exists.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<RegisterId> {
        self.names.get_by_right(name).copied()
    }

    /// Gets the width in bits of the register identified by `id`, if it
    /// exists.
    #[must_use]
    pub fn width_of(&self, id: RegisterId) -> Option<u16> {
        self.widths.get(&id).copied()
    }

    /// Gets the register fulfilling `role` in the CPU mode `mode`, if the
    /// architecture declared one.
    #[must_use]
    pub fn register_by_role(&self, role: RegisterRole, mode: u8) -> Option<RegisterId> {
        self.roles.get(&(role, mode)).copied()
    }

    /// Wraps the dictionary into an [`Rc`] for sharing.
    #[must_use]
    pub fn in_rc(self) -> Rc<Self> {
        Rc::new(self)
    }
}

/// The builder through which an architecture declares its register file.
#[derive(Clone, Debug, Default)]
pub struct CpuInformationBuilder {
    names: BiHashMap<RegisterId, String>,
    widths: HashMap<RegisterId, u16>,
    roles: HashMap<(RegisterRole, u8), RegisterId>,
}

impl CpuInformationBuilder {
    /// Declares the register `id` with the given `name` and width in `bits`.
    #[must_use]
    pub fn with_register(mut self, id: RegisterId, name: impl Into<String>, bits: u16) -> Self {
        self.names.insert(id, name.into());
        self.widths.insert(id, bits);
        self
    }

    /// Declares that the register `id` fulfils `role` in the CPU mode
    /// `mode`.
    #[must_use]
    pub fn with_role(mut self, role: RegisterRole, mode: u8, id: RegisterId) -> Self {
        self.roles.insert((role, mode), id);
        self
    }

    /// Finalises the dictionary.
    #[must_use]
    pub fn build(self) -> CpuInformation {
        CpuInformation {
            names: self.names,
            widths: self.widths,
            roles: self.roles,
        }
    }
}

/// The interface to an architecture plugin.
///
/// The architecture owns the shape of its register file, knows how to decode
/// machine code into [`Instruction`]s carrying semantic expressions, and
/// constructs the runtime contexts that the execution engine drives.
pub trait Architecture
where
    Self: Debug,
{
    /// Gets the register dictionary for this architecture.
    fn cpu_information(&self) -> Rc<CpuInformation>;

    /// Constructs a fresh CPU context with every register zeroed.
    fn make_cpu_context(&self) -> Box<dyn CpuContext>;

    /// Constructs a fresh, unmapped memory context.
    fn make_memory_context(&self) -> Box<dyn MemoryContext>;

    /// Decodes one instruction from `stream` at `offset` under the CPU mode
    /// `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the bytes at `offset` do not decode to an
    /// instruction of this architecture.
    fn disassemble(
        &self,
        stream: &BinaryStream,
        offset: u64,
        mode: u8,
    ) -> anyhow::Result<Instruction>;

    /// Computes the program-pointer value that is architecturally visible
    /// while the instruction at `address` executes.
    ///
    /// For most architectures this is the address of the next instruction,
    /// but pipelined architectures may expose a different value.
    fn current_address(&self, address: &Address, instruction: &Instruction) -> Address;
}

/// The interface to an operating-system persona, which knows how to prepare
/// freshly created contexts with the process environment the analysed
/// program expects.
pub trait OperatingSystem
where
    Self: Debug,
{
    /// Initialises the runtime contexts with the program arguments,
    /// environment, and working directory.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the persona cannot lay out the process image.
    fn initialize_context(
        &self,
        document: &Document,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        args: &[String],
        env: &[String],
        working_directory: &str,
    ) -> anyhow::Result<()>;
}
