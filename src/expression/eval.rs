//! This module contains the evaluation of expressions against the runtime
//! contexts: reading values out of locations, writing values into them, and
//! computing the addresses that memory expressions denote.
//!
//! Only literal and location expressions evaluate here. Operations,
//! conditions and the other composite forms are the emulator's business;
//! the tree itself stays agnostic of how they are given meaning.

use std::collections::VecDeque;

use ethnum::U256;

use crate::{
    address::Address,
    context::{CpuContext, MemoryContext},
    error::evaluation::{Error, Result},
    expression::Expression,
    value::BitVector,
};

/// The container through which values move in and out of expressions.
///
/// Reads fill the container and writes drain it from the front, which gives
/// multi-register locations their deque discipline.
pub type DataContainer = VecDeque<BitVector>;

impl Expression {
    /// Reads the value the expression denotes into `data`.
    ///
    /// Single-valued expressions expect a container holding exactly one
    /// slot and replace it. A dereferencing memory expression fills every
    /// slot of the container from consecutive addresses, and an aggregate
    /// register replaces the container with one value per member register,
    /// front corresponding to the last member.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the expression is not readable, the container is
    /// mis-sized, or the context access fails. No promise is made about the
    /// contents of `data` after a failure beyond what had already
    /// succeeded.
    pub fn read(
        &self,
        cpu: &dyn CpuContext,
        memory: &dyn MemoryContext,
        data: &mut DataContainer,
    ) -> Result<()> {
        match self {
            Self::BitVector(value) => {
                let slot = single_slot(data)?;
                *slot = *value;
                Ok(())
            }
            Self::Identifier {
                id,
                cpu_information,
            } => {
                let width = cpu_information
                    .width_of(*id)
                    .ok_or(Error::UnknownRegister { id: *id })?;
                let slot = single_slot(data)?;
                *slot = cpu.read_register(*id, width)?;
                Ok(())
            }
            Self::VectorIdentifier {
                ids,
                cpu_information,
            } => {
                data.clear();
                for id in ids {
                    let width = cpu_information
                        .width_of(*id)
                        .ok_or(Error::UnknownRegister { id: *id })?;
                    data.push_front(cpu.read_register(*id, width)?);
                }
                Ok(())
            }
            Self::Memory {
                access_bits,
                dereference,
                ..
            } => {
                let address = self.address_in(cpu, memory)?;
                let mut linear = cpu
                    .translate(&address)
                    .unwrap_or_else(|| address.offset());
                if *dereference {
                    let count = access_bytes(*access_bits)?;
                    for slot in data.iter_mut() {
                        let mut buffer = vec![0u8; count];
                        memory.read(linear, &mut buffer)?;
                        *slot = BitVector::new(*access_bits, u256_from_le(&buffer));
                        linear += count as u64;
                    }
                } else {
                    let slot = single_slot(data)?;
                    *slot = BitVector::new(*access_bits, linear);
                }
                Ok(())
            }
            _ => Err(Error::NotReadable {
                form: self.kind().to_string(),
            }),
        }
    }

    /// Writes values from the front of `data` into the location the
    /// expression denotes.
    ///
    /// Register writes consume the data they use; memory writes leave the
    /// container untouched and store each value at consecutive addresses. A
    /// non-dereferencing memory expression is writable only when its offset
    /// is a register, in which case the value is stored into that register.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the expression is not writable, the container is
    /// mis-sized, or the context access fails. No promise is made about
    /// state after a failure beyond what had already succeeded.
    pub fn write(
        &self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        data: &mut DataContainer,
    ) -> Result<()> {
        match self {
            Self::Identifier { id, .. } => {
                let value = data.front().copied().ok_or(Error::SlotCountMismatch {
                    expected: 1,
                    actual: 0,
                })?;
                cpu.write_register(*id, &value)?;
                data.pop_front();
                Ok(())
            }
            Self::VectorIdentifier { ids, .. } => {
                for id in ids.iter().rev() {
                    let value = data.front().copied().ok_or(Error::SlotCountMismatch {
                        expected: ids.len(),
                        actual: 0,
                    })?;
                    cpu.write_register(*id, &value)?;
                    data.pop_front();
                }
                Ok(())
            }
            Self::Memory {
                offset,
                dereference,
                ..
            } => {
                if *dereference {
                    let address = self.address_in(cpu, memory)?;
                    let mut linear = cpu
                        .translate(&address)
                        .unwrap_or_else(|| address.offset());
                    for value in data.iter() {
                        let count = access_bytes(value.width())?;
                        memory.write(linear, &value.value().to_le_bytes()[..count])?;
                        linear += count as u64;
                    }
                    Ok(())
                } else {
                    // Without a dereference the write retargets the address
                    // computation itself, which is only meaningful when the
                    // offset is a bare register.
                    let Self::Identifier { id, .. } = offset.as_ref() else {
                        return Err(Error::NotWritable {
                            form: self.kind().to_string(),
                        });
                    };
                    if data.len() != 1 {
                        return Err(Error::SlotCountMismatch {
                            expected: 1,
                            actual: data.len(),
                        });
                    }
                    let value = *data.front().expect("the container holds one value");
                    cpu.write_register(*id, &value)?;
                    Ok(())
                }
            }
            _ => Err(Error::NotWritable {
                form: self.kind().to_string(),
            }),
        }
    }

    /// Computes the `(base, offset)` address a memory expression denotes,
    /// reading its base and offset children against the contexts.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the expression is not a memory expression or if
    /// reading a child fails.
    pub fn address_in(
        &self,
        cpu: &dyn CpuContext,
        memory: &dyn MemoryContext,
    ) -> Result<Address> {
        let Self::Memory { base, offset, .. } = self else {
            return Err(Error::NoAddress {
                form: self.kind().to_string(),
            });
        };

        let base_value = match base {
            Some(base) => {
                let mut data: DataContainer = DataContainer::from(vec![BitVector::from_bool(false)]);
                base.read(cpu, memory, &mut data)?;
                data.front().map_or(0, BitVector::to_u64)
            }
            None => 0,
        };

        let mut data: DataContainer = DataContainer::from(vec![BitVector::from_bool(false)]);
        offset.read(cpu, memory, &mut data)?;
        let offset_value = data.front().map_or(0, BitVector::to_u64);

        Ok(Address::new(base_value, offset_value))
    }
}

/// Gets the single slot of a one-value container.
fn single_slot(data: &mut DataContainer) -> Result<&mut BitVector> {
    if data.len() != 1 {
        return Err(Error::SlotCountMismatch {
            expected: 1,
            actual: data.len(),
        });
    }
    Ok(data.front_mut().expect("the container holds one value"))
}

/// Converts an access size in bits to whole bytes.
fn access_bytes(bits: u16) -> Result<usize> {
    if bits == 0 || bits % 8 != 0 || bits / 8 > 32 {
        return Err(Error::InvalidAccessSize { bits });
    }
    Ok(usize::from(bits / 8))
}

/// Builds a 256-bit value from up to 32 little-endian bytes.
fn u256_from_le(bytes: &[u8]) -> U256 {
    let mut padded = [0u8; 32];
    padded[..bytes.len()].copy_from_slice(bytes);
    U256::from_le_bytes(padded)
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        arch::CpuInformation,
        context::{CpuContext, FlatMemoryContext, RegisterFileContext},
        error::evaluation::Error,
        expression::{eval::DataContainer, Expression},
        value::BitVector,
    };

    fn cpu_information() -> Rc<CpuInformation> {
        CpuInformation::builder()
            .with_register(0, "eax", 32)
            .with_register(1, "ebx", 32)
            .with_register(2, "xmm0_lo", 64)
            .with_register(3, "xmm0_hi", 64)
            .build()
            .in_rc()
    }

    fn contexts() -> (RegisterFileContext, FlatMemoryContext) {
        let cpu = RegisterFileContext::new(cpu_information());
        let mut memory = FlatMemoryContext::new();
        memory.map_region(0x1000, (0u8..64).collect());
        (cpu, memory)
    }

    /// A container of `count` zeroed slots.
    fn slots(count: usize) -> DataContainer {
        DataContainer::from(vec![BitVector::from_bool(false); count])
    }

    #[test]
    fn literals_read_their_value() {
        let (cpu, memory) = contexts();
        let literal = Expression::bit_vector(32, 0x1234u64);

        let mut data = slots(1);
        literal.read(&cpu, &memory, &mut data).unwrap();
        assert_eq!(data[0], BitVector::new(32, 0x1234u64));

        assert!(matches!(
            literal.write(&mut contexts().0, &mut contexts().1, &mut slots(1)),
            Err(Error::NotWritable { .. })
        ));
    }

    #[test]
    fn registers_round_trip() {
        let (mut cpu, mut memory) = contexts();
        let info = cpu_information();
        let eax = Expression::identifier(0, &info);

        let mut data = DataContainer::from(vec![BitVector::new(32, 0xdead_beefu64)]);
        eax.write(&mut cpu, &mut memory, &mut data).unwrap();
        assert!(data.is_empty());

        let mut data = slots(1);
        eax.read(&cpu, &memory, &mut data).unwrap();
        assert_eq!(data[0].to_u64(), 0xdead_beef);
        assert_eq!(data[0].width(), 32);
    }

    #[test]
    fn aggregate_registers_use_a_deque_discipline() {
        let (mut cpu, mut memory) = contexts();
        let info = cpu_information();
        cpu.write_register(2, &BitVector::new(64, 0x11u64)).unwrap();
        cpu.write_register(3, &BitVector::new(64, 0x22u64)).unwrap();

        let xmm0 = Expression::vector_identifier(vec![2, 3], &info);
        assert_eq!(xmm0.bit_size(), 128);

        // Reading pushes each member to the front, so the front of the
        // result corresponds to the last member.
        let mut data = DataContainer::new();
        xmm0.read(&cpu, &memory, &mut data).unwrap();
        assert_eq!(data[0].to_u64(), 0x22);
        assert_eq!(data[1].to_u64(), 0x11);

        // Writing consumes from the front in reversed member order, so a
        // read-then-write round-trips.
        xmm0.write(&mut cpu, &mut memory, &mut data).unwrap();
        assert!(data.is_empty());
        assert_eq!(cpu.read_register(2, 64).unwrap().to_u64(), 0x11);
        assert_eq!(cpu.read_register(3, 64).unwrap().to_u64(), 0x22);
    }

    #[test]
    fn dereferencing_memory_reads_consecutive_slots() {
        let (cpu, memory) = contexts();
        let load = Expression::memory(16, None, Expression::bit_vector(64, 0x1000u64), true);

        let mut data = slots(3);
        load.read(&cpu, &memory, &mut data).unwrap();
        assert_eq!(data[0].to_u64(), 0x0100);
        assert_eq!(data[1].to_u64(), 0x0302);
        assert_eq!(data[2].to_u64(), 0x0504);
    }

    #[test]
    fn address_memory_reads_the_linear_address() {
        let (cpu, memory) = contexts();
        let address_of = Expression::memory(32, None, Expression::bit_vector(64, 0x1010u64), false);

        let mut data = slots(1);
        address_of.read(&cpu, &memory, &mut data).unwrap();
        assert_eq!(data[0], BitVector::new(32, 0x1010u64));
    }

    #[test]
    fn memory_writes_store_consecutive_values() {
        let (mut cpu, mut memory) = contexts();
        let store = Expression::memory(16, None, Expression::bit_vector(64, 0x1020u64), true);

        let mut data = DataContainer::from(vec![
            BitVector::new(16, 0xaabbu64),
            BitVector::new(16, 0xccddu64),
        ]);
        store.write(&mut cpu, &mut memory, &mut data).unwrap();

        let mut read_back = slots(2);
        store.read(&cpu, &memory, &mut read_back).unwrap();
        assert_eq!(read_back[0].to_u64(), 0xaabb);
        assert_eq!(read_back[1].to_u64(), 0xccdd);
    }

    #[test]
    fn address_writes_retarget_the_offset_register() {
        let (mut cpu, mut memory) = contexts();
        let info = cpu_information();
        let address_of = Expression::memory(32, None, Expression::identifier(1, &info), false);

        let mut data = DataContainer::from(vec![BitVector::new(32, 0x2000u64)]);
        address_of.write(&mut cpu, &mut memory, &mut data).unwrap();
        assert_eq!(cpu.read_register(1, 32).unwrap().to_u64(), 0x2000);

        let literal_offset =
            Expression::memory(32, None, Expression::bit_vector(32, 0x2000u64), false);
        assert!(matches!(
            literal_offset.write(&mut cpu, &mut memory, &mut slots(1)),
            Err(Error::NotWritable { .. })
        ));
    }

    #[test]
    fn memory_addresses_come_from_the_children() {
        let (mut cpu, memory) = contexts();
        let info = cpu_information();
        cpu.write_register(1, &BitVector::new(32, 0x30u64)).unwrap();

        let load = Expression::memory(
            32,
            Some(Expression::bit_vector(16, 2u64)),
            Expression::identifier(1, &info),
            true,
        );
        let address = load.address_in(&cpu, &memory).unwrap();
        assert_eq!(address.base(), 2);
        assert_eq!(address.offset(), 0x30);
    }
}
