//! This module contains the memory context: the flat linear byte storage
//! that the emulated program reads and writes.

use std::{
    collections::BTreeMap,
    fmt::{Debug, Display, Formatter},
};

use crate::{
    context::cpu::CpuContext,
    document::Document,
    error::evaluation::{Error, Result},
};

/// The interface to the linear memory of an emulated program.
pub trait MemoryContext
where
    Self: Debug + Display,
{
    /// Fills `buffer` from memory starting at the linear `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any requested byte is not mapped.
    fn read(&self, address: u64, buffer: &mut [u8]) -> Result<()>;

    /// Stores `bytes` into memory starting at the linear `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any written byte is not mapped.
    fn write(&mut self, address: u64, bytes: &[u8]) -> Result<()>;

    /// Copies every mapped region of `document` into this context, placing
    /// each at the linear address `cpu` translates its address to.
    ///
    /// Returns whether the whole document could be mapped.
    fn map_document(&mut self, document: &Document, cpu: &dyn CpuContext) -> bool;
}

/// The generic memory context: disjoint byte regions keyed by their linear
/// start address.
#[derive(Clone, Debug, Default)]
pub struct FlatMemoryContext {
    /// The mapped regions, keyed by start address.
    regions: BTreeMap<u64, Vec<u8>>,
}

impl FlatMemoryContext {
    /// Constructs a new context with nothing mapped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `bytes` at the linear `address`.
    ///
    /// Overlaps with existing regions are not merged; the caller is
    /// responsible for laying out disjoint regions.
    pub fn map_region(&mut self, address: u64, bytes: Vec<u8>) {
        self.regions.insert(address, bytes);
    }

    /// Finds the region containing `count` bytes at `address`, returning
    /// its start and the offset of `address` within it.
    fn locate(&self, address: u64, count: usize) -> Result<(u64, usize)> {
        let not_mapped = Error::UnmappedMemory { address, count };
        let (start, bytes) = self
            .regions
            .range(..=address)
            .next_back()
            .ok_or(not_mapped.clone())?;
        let offset = usize::try_from(address - start).map_err(|_| not_mapped.clone())?;
        if offset + count > bytes.len() {
            return Err(not_mapped);
        }
        Ok((*start, offset))
    }
}

impl MemoryContext for FlatMemoryContext {
    fn read(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        let (start, offset) = self.locate(address, buffer.len())?;
        let bytes = &self.regions[&start];
        buffer.copy_from_slice(&bytes[offset..offset + buffer.len()]);
        Ok(())
    }

    fn write(&mut self, address: u64, bytes: &[u8]) -> Result<()> {
        let (start, offset) = self.locate(address, bytes.len())?;
        let region = self
            .regions
            .get_mut(&start)
            .expect("the located region is present");
        region[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn map_document(&mut self, document: &Document, cpu: &dyn CpuContext) -> bool {
        for region in document.regions() {
            let Some(bytes) = document.binary().slice(region.file_offset(), region.size()) else {
                return false;
            };
            let address = region.address();
            let linear = cpu.translate(&address).unwrap_or_else(|| address.offset());
            self.map_region(linear, bytes.to_vec());
        }
        true
    }
}

/// Lists the mapped regions for diagnostics.
impl Display for FlatMemoryContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (start, bytes) in &self.regions {
            writeln!(
                f,
                "{start:#018x}..{:#018x} ({} bytes)",
                start + bytes.len() as u64,
                bytes.len()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        address::Address,
        arch::CpuInformation,
        context::{
            cpu::RegisterFileContext,
            memory::{FlatMemoryContext, MemoryContext},
        },
        document::{BinaryStream, Document, MappedRegion},
        error::evaluation::Error,
    };

    #[test]
    fn reads_back_written_bytes() {
        let mut memory = FlatMemoryContext::new();
        memory.map_region(0x1000, vec![0; 16]);

        memory.write(0x1004, &[0xde, 0xad]).unwrap();
        let mut buffer = [0u8; 2];
        memory.read(0x1004, &mut buffer).unwrap();
        assert_eq!(buffer, [0xde, 0xad]);
    }

    #[test]
    fn rejects_unmapped_accesses() {
        let mut memory = FlatMemoryContext::new();
        memory.map_region(0x1000, vec![0; 16]);

        let mut buffer = [0u8; 4];
        assert_eq!(
            memory.read(0x0f00, &mut buffer).unwrap_err(),
            Error::UnmappedMemory {
                address: 0x0f00,
                count: 4
            }
        );
        assert_eq!(
            memory.write(0x100e, &[0; 4]).unwrap_err(),
            Error::UnmappedMemory {
                address: 0x100e,
                count: 4
            }
        );
    }

    #[test]
    fn maps_a_document_through_the_cpu() {
        let document = Document::new(BinaryStream::new(vec![1, 2, 3, 4]))
            .with_region(MappedRegion::new(Address::new(0, 0x2000), 1, 3, 0));
        let cpu = RegisterFileContext::new(CpuInformation::builder().build().in_rc());

        let mut memory = FlatMemoryContext::new();
        assert!(memory.map_document(&document, &cpu));

        let mut buffer = [0u8; 3];
        memory.read(0x2000, &mut buffer).unwrap();
        assert_eq!(buffer, [2, 3, 4]);
    }

    #[test]
    fn refuses_documents_that_overrun_the_file() {
        let document = Document::new(BinaryStream::new(vec![1, 2]))
            .with_region(MappedRegion::new(Address::new(0, 0x2000), 0, 8, 0));
        let cpu = RegisterFileContext::new(CpuInformation::builder().build().in_rc());

        let mut memory = FlatMemoryContext::new();
        assert!(!memory.map_document(&document, &cpu));
    }
}
