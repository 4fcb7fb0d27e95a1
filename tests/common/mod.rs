//! This module contains common testing utilities for testing this library.
#![cfg(test)]

use std::rc::Rc;

use anyhow::bail;
use semantic_execution_engine::{
    address::Address,
    arch::{Architecture, CpuInformation, RegisterRole},
    context::{CpuContext, FlatMemoryContext, MemoryContext, RegisterFileContext},
    document::{BinaryStream, Document, Instruction, InstructionFlow, MappedRegion},
    emulator::InterpreterEmulator,
    execution::Execution,
    expression::{BinaryOperator, Expression},
    value::BitVector,
};

/// The register holding the accumulator of the test machine.
#[allow(unused)] // It is actually
pub const R0: u32 = 0;

/// The register holding the program counter of the test machine.
pub const PC: u32 = 1;

/// The address at which test programs are mapped.
pub const LOAD_ADDRESS: u64 = 0x40_0000;

/// A deliberately tiny test architecture: a 32-bit accumulator machine with
/// one general register and a program counter.
///
/// The instruction encodings are:
///
/// | Bytes                | Mnemonic  | Effect                                |
/// |----------------------|-----------|---------------------------------------|
/// | `01`                 | `inc`     | `r0 = r0 + 1`                         |
/// | `02 ii`              | `add`     | `r0 = r0 + imm8`                      |
/// | `03 rr`              | `jmp`     | `pc = pc + simm8` (block-ending)      |
/// | `04`                 | `hlt`     | `pc = 0xffff_0000` (block-ending)     |
/// | `05 aa aa aa aa`     | `calli`   | `pc = Mem32(addr32)` (block-ending)   |
#[derive(Debug)]
pub struct CounterArchitecture {
    cpu_information: Rc<CpuInformation>,
}

impl CounterArchitecture {
    pub fn new() -> Self {
        let cpu_information = CpuInformation::builder()
            .with_register(R0, "r0", 32)
            .with_register(PC, "pc", 32)
            .with_role(RegisterRole::ProgramPointer, 0, PC)
            .build()
            .in_rc();
        Self { cpu_information }
    }

    pub fn in_rc() -> Rc<dyn Architecture> {
        Rc::new(Self::new())
    }

    fn r0(&self) -> Expression {
        Expression::identifier(R0, &self.cpu_information)
    }

    fn pc(&self) -> Expression {
        Expression::identifier(PC, &self.cpu_information)
    }
}

impl Architecture for CounterArchitecture {
    fn cpu_information(&self) -> Rc<CpuInformation> {
        Rc::clone(&self.cpu_information)
    }

    fn make_cpu_context(&self) -> Box<dyn CpuContext> {
        Box::new(RegisterFileContext::new(Rc::clone(&self.cpu_information)))
    }

    fn make_memory_context(&self) -> Box<dyn MemoryContext> {
        Box::new(FlatMemoryContext::new())
    }

    fn disassemble(
        &self,
        stream: &BinaryStream,
        offset: u64,
        _mode: u8,
    ) -> anyhow::Result<Instruction> {
        let Some(opcode) = stream.slice(offset, 1) else {
            bail!("offset {offset} is outside the file");
        };
        let instruction = match opcode[0] {
            0x01 => Instruction::new("inc", 1, InstructionFlow::Sequential).with_semantics(vec![
                Expression::assignment(
                    self.r0(),
                    Expression::binary(
                        BinaryOperator::Add,
                        self.r0(),
                        Expression::bit_vector(32, 1u64),
                    ),
                ),
            ]),
            0x02 => {
                let Some(operand) = stream.slice(offset + 1, 1) else {
                    bail!("truncated `add` at offset {offset}");
                };
                Instruction::new("add", 2, InstructionFlow::Sequential).with_semantics(vec![
                    Expression::assignment(
                        self.r0(),
                        Expression::binary(
                            BinaryOperator::Add,
                            self.r0(),
                            Expression::bit_vector(32, u64::from(operand[0])),
                        ),
                    ),
                ])
            }
            0x03 => {
                let Some(operand) = stream.slice(offset + 1, 1) else {
                    bail!("truncated `jmp` at offset {offset}");
                };
                let displacement = i64::from(operand[0] as i8);
                Instruction::new("jmp", 2, InstructionFlow::Branch).with_semantics(vec![
                    Expression::assignment(
                        self.pc(),
                        Expression::binary(
                            BinaryOperator::Add,
                            self.pc(),
                            Expression::from(BitVector::from_signed(32, displacement)),
                        ),
                    ),
                ])
            }
            0x04 => Instruction::new("hlt", 1, InstructionFlow::Return).with_semantics(vec![
                Expression::assignment(self.pc(), Expression::bit_vector(32, 0xffff_0000u64)),
            ]),
            0x05 => {
                let Some(operand) = stream.slice(offset + 1, 4) else {
                    bail!("truncated `calli` at offset {offset}");
                };
                let slot = u64::from(u32::from_le_bytes(
                    operand.try_into().expect("the slice is four bytes"),
                ));
                Instruction::new("calli", 5, InstructionFlow::Call).with_semantics(vec![
                    Expression::assignment(
                        self.pc(),
                        Expression::memory(32, None, Expression::bit_vector(32, slot), true),
                    ),
                ])
            }
            byte => bail!("unknown opcode {byte:#04x} at offset {offset}"),
        };
        Ok(instruction)
    }

    fn current_address(&self, address: &Address, instruction: &Instruction) -> Address {
        address
            .advanced_by(u64::from(instruction.length()))
            .with_offset_bits(32)
    }
}

/// Constructs a document with `program` mapped at [`LOAD_ADDRESS`].
#[allow(unused)] // It is actually
pub fn document_for(program: &[u8]) -> Document {
    let size = program.len() as u64;
    Document::new(BinaryStream::new(program.to_vec()))
        .with_region(MappedRegion::new(Address::new(0, LOAD_ADDRESS), 0, size, 0))
}

/// Constructs an initialised execution over `document`, with the
/// interpreter installed through the module-manager path.
pub fn new_execution(document: Document) -> anyhow::Result<Execution> {
    InterpreterEmulator::register();

    let mut execution = Execution::new(document, CounterArchitecture::in_rc(), None);
    execution
        .initialize(0, &[], &[], "/")
        .map_err(|e| anyhow::anyhow!("initialisation failed: {e}"))?;
    execution
        .set_emulator(InterpreterEmulator::NAME)
        .map_err(|e| anyhow::anyhow!("emulator installation failed: {e}"))?;
    Ok(execution)
}

/// Gets the current value of a register from the execution's CPU context.
pub fn register_value(execution: &Execution, id: u32) -> u64 {
    execution
        .cpu_context()
        .expect("the execution is initialised")
        .read_register(id, 32)
        .expect("the register exists")
        .to_u64()
}

/// The entry address of a mapped test program.
pub fn entry() -> Address {
    Address::new(0, LOAD_ADDRESS).with_offset_bits(32)
}
