//! This module contains the CPU context: the register file and mode of the
//! emulated processor, together with its view of address translation.

use std::{
    collections::BTreeMap,
    fmt::{Debug, Display, Formatter},
    rc::Rc,
};

use crate::{
    address::Address,
    arch::{CpuInformation, RegisterId},
    error::evaluation::{Error, Result},
    value::BitVector,
};

/// The interface to the register file and mode of an emulated processor.
///
/// Architectures with non-trivial address translation (segmentation, for
/// example) provide their own implementation; [`RegisterFileContext`] is the
/// generic flat-translation implementation that suffices for everything
/// else.
pub trait CpuContext
where
    Self: Debug + Display,
{
    /// Gets the register dictionary this context was built for.
    fn cpu_information(&self) -> &Rc<CpuInformation>;

    /// Reads the low `bits` bits of the register identified by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no such register exists.
    fn read_register(&self, id: RegisterId, bits: u16) -> Result<BitVector>;

    /// Writes `value` into the register identified by `id`, truncated or
    /// zero-extended to the register's width.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no such register exists.
    fn write_register(&mut self, id: RegisterId, value: &BitVector) -> Result<()>;

    /// Translates `address` to a linear address, if this context can.
    fn translate(&self, address: &Address) -> Option<u64>;

    /// Gets the current CPU mode.
    fn mode(&self) -> u8;

    /// Sets the current CPU mode.
    fn set_mode(&mut self, mode: u8);
}

/// The generic CPU context: a register file over a register dictionary,
/// with flat address translation.
///
/// Registers read as zero until first written.
#[derive(Clone, Debug)]
pub struct RegisterFileContext {
    /// The register dictionary describing the file.
    cpu_information: Rc<CpuInformation>,

    /// The current value of each register that has been written.
    registers: BTreeMap<RegisterId, BitVector>,

    /// The current CPU mode.
    mode: u8,
}

impl RegisterFileContext {
    /// Constructs a new context over `cpu_information` with every register
    /// zeroed and the mode set to zero.
    #[must_use]
    pub fn new(cpu_information: Rc<CpuInformation>) -> Self {
        Self {
            cpu_information,
            registers: BTreeMap::new(),
            mode: 0,
        }
    }

    /// Gets the declared width of `id`, or the unknown-register error.
    fn width_of(&self, id: RegisterId) -> Result<u16> {
        self.cpu_information
            .width_of(id)
            .ok_or(Error::UnknownRegister { id })
    }
}

impl CpuContext for RegisterFileContext {
    fn cpu_information(&self) -> &Rc<CpuInformation> {
        &self.cpu_information
    }

    fn read_register(&self, id: RegisterId, bits: u16) -> Result<BitVector> {
        let width = self.width_of(id)?;
        let stored = self
            .registers
            .get(&id)
            .copied()
            .unwrap_or_else(|| BitVector::new(width, 0u64));
        Ok(BitVector::new(bits, stored.value()))
    }

    fn write_register(&mut self, id: RegisterId, value: &BitVector) -> Result<()> {
        let width = self.width_of(id)?;
        if value.width() != width {
            log::debug!(
                "width mismatch writing register {id}: register is {width} bits, value is {} bits",
                value.width()
            );
        }
        self.registers.insert(id, BitVector::new(width, value.value()));
        Ok(())
    }

    fn translate(&self, address: &Address) -> Option<u64> {
        Some(address.offset())
    }

    fn mode(&self) -> u8 {
        self.mode
    }

    fn set_mode(&mut self, mode: u8) {
        self.mode = mode;
    }
}

/// Dumps the mode and every written register, one per line, for
/// diagnostics.
impl Display for RegisterFileContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "mode: {}", self.mode)?;
        for (id, value) in &self.registers {
            let name = self.cpu_information.name_of(*id).unwrap_or("<unknown>");
            writeln!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}
