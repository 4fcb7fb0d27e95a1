//! This module contains the [`Document`], the address-keyed database of
//! what the analysis knows about the binary: its raw bytes, the mapping of
//! addresses onto those bytes, the decoded cells, and the label table.

pub mod cell;

use std::collections::{BTreeMap, HashMap};

pub use cell::{Cell, Instruction, InstructionFlow};

use crate::address::Address;

/// The raw bytes of the analysed file.
#[derive(Clone, Debug, Default)]
pub struct BinaryStream {
    bytes: Vec<u8>,
}

impl BinaryStream {
    /// Constructs a new stream over `bytes`.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Gets the length of the stream in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Checks whether the stream is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Gets the `length` bytes of the stream beginning at `offset`, if they
    /// are all within the file.
    #[must_use]
    pub fn slice(&self, offset: u64, length: u64) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(usize::try_from(length).ok()?)?;
        self.bytes.get(start..end)
    }
}

/// A contiguous range of the file mapped at an address, together with the
/// CPU mode in which its code executes.
#[derive(Clone, Copy, Debug)]
pub struct MappedRegion {
    /// The address at which the region is mapped.
    address: Address,

    /// The offset of the region's first byte within the file.
    file_offset: u64,

    /// The length of the region in bytes.
    size: u64,

    /// The CPU mode for code within the region.
    mode: u8,
}

impl MappedRegion {
    /// Constructs a new region mapping `size` bytes of the file starting at
    /// `file_offset` to `address`.
    #[must_use]
    pub fn new(address: Address, file_offset: u64, size: u64, mode: u8) -> Self {
        Self {
            address,
            file_offset,
            size,
            mode,
        }
    }

    /// Gets the address at which the region is mapped.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Gets the offset of the region within the file.
    #[must_use]
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Gets the length of the region in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Gets the CPU mode for code within the region.
    #[must_use]
    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Checks whether `address` falls within the region.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        address.base() == self.address.base()
            && address.offset() >= self.address.offset()
            && address.offset() - self.address.offset() < self.size
    }
}

/// The classification of a labelled address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LabelKind {
    /// A function defined in the binary.
    Function,

    /// A function imported from elsewhere.
    Imported,

    /// A datum.
    Data,
}

/// A name attached to an address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Label {
    /// The name.
    name: String,

    /// What the named address is.
    kind: LabelKind,
}

impl Label {
    /// Constructs a new label.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LabelKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Gets the name of the label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the classification of the label.
    #[must_use]
    pub fn kind(&self) -> LabelKind {
        self.kind
    }
}

/// The address-keyed database of the analysed binary.
///
/// The document owns the raw bytes of the file, the regions mapping
/// addresses onto them, the cells recording what has been decoded at each
/// address, and the label table naming addresses.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// The raw bytes of the analysed file.
    binary: BinaryStream,

    /// The regions mapping addresses onto the file.
    regions: Vec<MappedRegion>,

    /// The decoded cells, keyed by address.
    cells: BTreeMap<Address, Cell>,

    /// The labels, keyed by address.
    labels: BTreeMap<Address, Label>,

    /// The reverse label index, from name to address.
    label_addresses: HashMap<String, Address>,
}

impl Document {
    /// Constructs a new document over the raw `binary` with no mapped
    /// regions, cells, or labels.
    #[must_use]
    pub fn new(binary: BinaryStream) -> Self {
        Self {
            binary,
            ..Self::default()
        }
    }

    /// Maps a region of the file, consuming and returning the document for
    /// chaining during construction.
    #[must_use]
    pub fn with_region(mut self, region: MappedRegion) -> Self {
        self.regions.push(region);
        self
    }

    /// Attaches `label` to `address`, consuming and returning the document
    /// for chaining during construction.
    #[must_use]
    pub fn with_label(mut self, address: Address, label: Label) -> Self {
        self.add_label(address, label);
        self
    }

    /// Gets the raw bytes of the analysed file.
    #[must_use]
    pub fn binary(&self) -> &BinaryStream {
        &self.binary
    }

    /// Gets the regions mapping addresses onto the file.
    #[must_use]
    pub fn regions(&self) -> &[MappedRegion] {
        self.regions.as_slice()
    }

    /// Gets the cell at `address`, if one has been decoded there.
    #[must_use]
    pub fn cell(&self, address: &Address) -> Option<&Cell> {
        self.cells.get(address)
    }

    /// Stores `cell` at `address`.
    ///
    /// An existing cell is only replaced when `overwrite` is set; the return
    /// value reports whether the cell was stored.
    pub fn set_cell(&mut self, address: Address, cell: Cell, overwrite: bool) -> bool {
        if !overwrite && self.cells.contains_key(&address) {
            return false;
        }
        self.cells.insert(address, cell);
        true
    }

    /// Removes the cell at `address`, invalidating whatever was decoded
    /// there.
    pub fn clear_cell(&mut self, address: &Address) {
        self.cells.remove(address);
    }

    /// Converts `address` to the offset of its first byte within the file,
    /// if the address is mapped.
    #[must_use]
    pub fn address_to_file_offset(&self, address: &Address) -> Option<u64> {
        self.regions.iter().find(|region| region.contains(address)).map(|region| {
            region.file_offset() + (address.offset() - region.address().offset())
        })
    }

    /// Gets the CPU mode for code at `address`. Unmapped addresses report
    /// mode zero.
    #[must_use]
    pub fn mode(&self, address: &Address) -> u8 {
        self.regions
            .iter()
            .find(|region| region.contains(address))
            .map_or(0, MappedRegion::mode)
    }

    /// Attaches `label` to `address`, replacing any previous label there.
    pub fn add_label(&mut self, address: Address, label: Label) {
        self.label_addresses.insert(label.name().to_string(), address);
        self.labels.insert(address, label);
    }

    /// Resolves a label `name` to the address it is attached to.
    #[must_use]
    pub fn address_of_label(&self, name: &str) -> Option<Address> {
        self.label_addresses.get(name).copied()
    }

    /// Gets the label attached to `address`, if any.
    #[must_use]
    pub fn label_at(&self, address: &Address) -> Option<&Label> {
        self.labels.get(address)
    }
}
