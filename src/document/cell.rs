//! This module contains the definition of [`Cell`], the unit of content of
//! the document, and of the decoded [`Instruction`] that is the cell kind
//! the execution engine consumes.

use crate::expression::Expression;

/// How control continues after an instruction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InstructionFlow {
    /// Control falls through to the next instruction.
    Sequential,

    /// Control transfers, conditionally or not, to another address.
    Branch,

    /// Control transfers to a callee that is expected to return.
    Call,

    /// Control returns to a caller.
    Return,
}

impl InstructionFlow {
    /// Checks whether an instruction with this flow terminates a semantic
    /// block.
    #[must_use]
    pub fn ends_block(&self) -> bool {
        !matches!(self, Self::Sequential)
    }
}

/// A decoded machine instruction: its mnemonic, its encoded length, how
/// control continues after it, and the semantic expressions describing what
/// it does.
#[derive(Clone, Debug)]
pub struct Instruction {
    /// The instruction mnemonic, for diagnostics.
    mnemonic: String,

    /// The length of the encoded instruction in bytes.
    length: u16,

    /// How control continues after this instruction.
    flow: InstructionFlow,

    /// The semantic expressions describing the effect of the instruction.
    semantics: Vec<Expression>,
}

impl Instruction {
    /// Constructs a new instruction with no semantics attached.
    #[must_use]
    pub fn new(mnemonic: impl Into<String>, length: u16, flow: InstructionFlow) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            length,
            flow,
            semantics: Vec::new(),
        }
    }

    /// Attaches the semantic expressions describing the instruction.
    #[must_use]
    pub fn with_semantics(mut self, semantics: impl Into<Vec<Expression>>) -> Self {
        self.semantics = semantics.into();
        self
    }

    /// Gets the instruction mnemonic.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Gets the length of the encoded instruction in bytes.
    #[must_use]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Gets the control flow continuation of the instruction.
    #[must_use]
    pub fn flow(&self) -> InstructionFlow {
        self.flow
    }

    /// Gets the semantic expressions describing the instruction.
    #[must_use]
    pub fn semantics(&self) -> &[Expression] {
        self.semantics.as_slice()
    }
}

/// A unit of the document: the decoded meaning the analysis has assigned to
/// a range of bytes at some address.
#[derive(Clone, Debug)]
pub enum Cell {
    /// A decoded machine instruction.
    Instruction(Instruction),

    /// Raw data bytes.
    Data(Vec<u8>),

    /// A string of text.
    String(String),
}

impl Cell {
    /// Gets the instruction contained in the cell, if it is one.
    #[must_use]
    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Self::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    /// Gets the number of bytes of the document the cell covers.
    #[must_use]
    pub fn length(&self) -> u64 {
        match self {
            Self::Instruction(instruction) => u64::from(instruction.length()),
            Self::Data(bytes) => bytes.len() as u64,
            Self::String(text) => text.len() as u64,
        }
    }
}
