//! This module contains the execution engine: the fetch-decode-lift-execute
//! loop that drives an emulator over the document, disassembling code
//! lazily as the program counter reaches it, and the function-hook
//! machinery built on fake-address redirection.

use std::{collections::HashMap, rc::Rc, sync::Mutex};

use crate::{
    address::Address,
    arch::{Architecture, CpuInformation, OperatingSystem, RegisterRole},
    constant::{HOOK_ADDRESS_BASE, HOOK_ADDRESS_STEP, MINIMUM_PROGRAM_POINTER_WIDTH},
    context::{CpuContext, MemoryContext},
    document::{Cell, Document, LabelKind},
    emulator::{Emulator, HookCallback, HookKind, ModuleManager},
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expression::Expression,
    value::BitVector,
};

/// The execution engine.
///
/// The engine owns the document being executed and the runtime contexts it
/// creates during [`Self::initialize`]; the architecture and the optional
/// operating-system persona are shared collaborators. Emulation itself is
/// delegated to a pluggable [`Emulator`], installed by name through
/// [`Self::set_emulator`].
///
/// # Lazy lifting
///
/// The engine does not require the document to be disassembled in advance.
/// Whenever the program counter reaches an address without an instruction
/// cell, the architecture is asked to decode one there and the result is
/// written back into the document, so each address is lifted at most once
/// per run unless its cell is invalidated in between.
#[derive(Debug)]
pub struct Execution {
    /// The document being executed.
    document: Document,

    /// The architecture of the document's code.
    architecture: Rc<dyn Architecture>,

    /// The operating-system persona preparing the process image, if any.
    operating_system: Option<Rc<dyn OperatingSystem>>,

    /// The architecture's register dictionary.
    cpu_information: Rc<CpuInformation>,

    /// The CPU context, present between initialisation and teardown.
    cpu: Option<Box<dyn CpuContext>>,

    /// The memory context, present between initialisation and teardown.
    memory: Option<Box<dyn MemoryContext>>,

    /// The installed emulation backend, if any.
    emulator: Option<Box<dyn Emulator>>,

    /// The names of hooked functions, keyed by their fake address.
    ///
    /// Hook callbacks run on the emulation thread while clients may query
    /// [`Self::hook_name`] from elsewhere, so the table is guarded. The
    /// lock is only ever held around the table accesses themselves.
    hook_names: Mutex<HashMap<u64, String>>,

    /// The next fake address to hand out when hooking a function.
    next_hook_address: u64,
}

impl Execution {
    /// Constructs a new engine over `document` for the given architecture,
    /// with an optional operating-system persona.
    #[must_use]
    pub fn new(
        document: Document,
        architecture: Rc<dyn Architecture>,
        operating_system: Option<Rc<dyn OperatingSystem>>,
    ) -> Self {
        let cpu_information = architecture.cpu_information();
        Self {
            document,
            architecture,
            operating_system,
            cpu_information,
            cpu: None,
            memory: None,
            emulator: None,
            hook_names: Mutex::new(HashMap::new()),
            next_hook_address: HOOK_ADDRESS_BASE,
        }
    }

    /// Gets the document being executed.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Gets the document being executed, for modification.
    #[must_use]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Gets the CPU context, if the engine has been initialised.
    #[must_use]
    pub fn cpu_context(&self) -> Option<&dyn CpuContext> {
        self.cpu.as_deref()
    }

    /// Gets the CPU context for modification, if the engine has been
    /// initialised.
    #[must_use]
    pub fn cpu_context_mut(&mut self) -> Option<&mut dyn CpuContext> {
        match self.cpu {
            Some(ref mut cpu) => Some(cpu.as_mut()),
            None => None,
        }
    }

    /// Gets the memory context, if the engine has been initialised.
    #[must_use]
    pub fn memory_context(&self) -> Option<&dyn MemoryContext> {
        self.memory.as_deref()
    }

    /// Gets the memory context for modification, if the engine has been
    /// initialised.
    #[must_use]
    pub fn memory_context_mut(&mut self) -> Option<&mut dyn MemoryContext> {
        match self.memory {
            Some(ref mut memory) => Some(memory.as_mut()),
            None => None,
        }
    }

    /// Gets the installed emulator, if any, for backend-specific
    /// introspection.
    #[must_use]
    pub fn emulator(&self) -> Option<&dyn Emulator> {
        self.emulator.as_deref()
    }

    /// Creates fresh runtime contexts, maps the document into memory, sets
    /// the CPU `mode`, and lets the operating-system persona lay out the
    /// process image with `args`, `env` and `working_directory`.
    ///
    /// Any contexts from an earlier initialisation are dropped first.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the document cannot be mapped or the persona
    /// fails.
    pub fn initialize(
        &mut self,
        mode: u8,
        args: &[String],
        env: &[String],
        working_directory: &str,
    ) -> Result<()> {
        self.cpu = None;
        self.memory = None;

        let mut cpu = self.architecture.make_cpu_context();
        let mut memory = self.architecture.make_memory_context();

        if !memory.map_document(&self.document, cpu.as_ref()) {
            return Err(Error::DocumentNotMappable.locate(Address::default()));
        }
        cpu.set_mode(mode);

        if let Some(operating_system) = &self.operating_system {
            operating_system
                .initialize_context(
                    &self.document,
                    cpu.as_mut(),
                    memory.as_mut(),
                    args,
                    env,
                    working_directory,
                )
                .map_err(|error| {
                    Error::OperatingSystemFailed(Rc::new(error)).locate(Address::default())
                })?;
        }

        self.cpu = Some(cpu);
        self.memory = Some(memory);
        Ok(())
    }

    /// Installs the emulation backend registered under `name` with the
    /// process-wide [`ModuleManager`].
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no backend is registered under that name.
    pub fn set_emulator(&mut self, name: &str) -> Result<()> {
        let Some(emulator) = ModuleManager::emulator(name, Rc::clone(&self.cpu_information))
        else {
            return Err(Error::UnknownEmulator {
                name: name.to_string(),
            }
            .locate(Address::default()));
        };
        self.emulator = Some(emulator);
        Ok(())
    }

    /// Installs an already-constructed emulation backend, for clients that
    /// need a non-default configuration.
    pub fn set_emulator_instance(&mut self, emulator: Box<dyn Emulator>) {
        self.emulator = Some(emulator);
    }

    /// Runs the program from `entry` until execution leaves the file, a
    /// hook requests a stop, or something fails.
    ///
    /// Blocks of semantics are assembled instruction by instruction,
    /// lifting instructions that the document does not hold yet, until a
    /// control-flow instruction ends the block; each block is handed to the
    /// emulator, and the program counter is read back to find the next
    /// block.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the engine is not ready (no emulator, not
    /// initialised, no usable program-pointer register), or if lifting,
    /// emulation, or the program-counter read-back fails. Running off the
    /// mapped file and cooperative stops requested by hooks terminate
    /// normally. Every failure is also logged.
    #[allow(clippy::too_many_lines)] // The loop reads better unsplit.
    pub fn execute(&mut self, entry: Address) -> Result<()> {
        let Some(emulator) = self.emulator.as_mut() else {
            log::error!("no emulator is installed; refusing to execute");
            return Err(Error::NoEmulator.locate(entry));
        };
        let (Some(cpu), Some(memory)) = (self.cpu.as_mut(), self.memory.as_mut()) else {
            log::error!("the execution is not initialised; refusing to execute");
            return Err(Error::NotInitialized.locate(entry));
        };

        let mode = cpu.mode();
        let Some(pc_register) = self
            .cpu_information
            .register_by_role(RegisterRole::ProgramPointer, mode)
        else {
            log::error!("the architecture reports no program pointer register for mode {mode}");
            return Err(Error::InvalidProgramPointer { mode }.locate(entry));
        };
        let pc_bits = self.cpu_information.width_of(pc_register).unwrap_or(0);
        if pc_bits < MINIMUM_PROGRAM_POINTER_WIDTH {
            log::error!("the program pointer register is only {pc_bits} bits wide");
            return Err(Error::ProgramPointerTooNarrow { bits: pc_bits }.locate(entry));
        }

        cpu.write_register(pc_register, &BitVector::new(pc_bits, entry.offset()))
            .map_err(|error| Error::ProgramPointerAccess(error).locate(entry))?;

        let mut current = entry;
        loop {
            let block_start = current;
            let mut semantics: Vec<Expression> = Vec::new();

            // Assemble one block of semantics, lifting as needed.
            loop {
                if self
                    .document
                    .cell(&current)
                    .and_then(Cell::as_instruction)
                    .is_none()
                {
                    log::info!("not an instruction, trying to disassemble it: {current}");
                    let Some(offset) = self.document.address_to_file_offset(&current) else {
                        log::info!("the instruction at {current} is not contained in the file");
                        log::info!("execution finished\n{cpu}\n{memory}");
                        return Ok(());
                    };
                    let instruction = match self.architecture.disassemble(
                        self.document.binary(),
                        offset,
                        cpu.mode(),
                    ) {
                        Ok(instruction) => instruction,
                        Err(error) => {
                            log::error!("unable to disassemble the instruction at {current}");
                            log::info!("execution finished\n{cpu}\n{memory}");
                            return Err(Error::DisassemblyFailed(Rc::new(error)).locate(current));
                        }
                    };
                    if !self
                        .document
                        .set_cell(current, Cell::Instruction(instruction), true)
                    {
                        log::error!("unable to store the instruction at {current}");
                        log::info!("execution finished\n{cpu}\n{memory}");
                        return Err(Error::CellWriteFailed.locate(current));
                    }
                }

                let Some(instruction) = self.document.cell(&current).and_then(Cell::as_instruction)
                else {
                    log::error!("unable to get the instruction at {current}");
                    log::info!("execution finished\n{cpu}\n{memory}");
                    return Err(Error::MissingInstruction.locate(current));
                };

                // The program-pointer value the instruction observes is the
                // architecture's business, not ours.
                let pc_after = self.architecture.current_address(&current, instruction);

                semantics.push(Expression::system("dump_insn", current));
                semantics.push(Expression::assignment(
                    Expression::identifier(pc_register, &self.cpu_information),
                    Expression::bit_vector(pc_after.offset_bits(), pc_after.offset()),
                ));

                if instruction.semantics().is_empty() {
                    log::warn!(
                        "no semantics available for `{}` at {current}",
                        instruction.mnemonic()
                    );
                }
                let lifted: Vec<Expression> = instruction.semantics().to_vec();
                let ends_block = instruction.flow().ends_block();
                current = current.advanced_by(u64::from(instruction.length()));

                semantics.extend(lifted);
                semantics.push(Expression::system("check_exec_hook", Address::default()));

                if ends_block {
                    break;
                }
            }

            match emulator.execute(cpu.as_mut(), memory.as_mut(), block_start, &semantics) {
                Ok(()) => {}
                Err(error) if error.is_stop_request() => {
                    log::info!("emulation of the block at {block_start} stopped: {error}");
                    log::info!("execution finished\n{cpu}\n{memory}");
                    return Ok(());
                }
                Err(error) => {
                    log::error!("failed to execute the block at {block_start}: {error}");
                    log::info!("execution finished\n{cpu}\n{memory}");
                    return Err(Error::EmulationFailed(error).locate(block_start));
                }
            }

            let next = cpu
                .read_register(pc_register, pc_bits)
                .map_err(|error| Error::ProgramPointerAccess(error).locate(current))?;
            current.set_offset(next.to_u64());
        }
    }

    /// Registers `callback` to fire before every executed instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no emulator is installed.
    pub fn hook_instruction(&mut self, callback: HookCallback) -> Result<()> {
        let Some(emulator) = self.emulator.as_mut() else {
            return Err(Error::NoEmulator.locate(Address::default()));
        };
        emulator.add_instruction_hook(callback);
        Ok(())
    }

    /// Hooks the function labelled `name`, arranging for `callback` to fire
    /// whenever the emulated program calls it.
    ///
    /// The first program-pointer-sized bytes of the function are
    /// overwritten with a fresh fake address, so calling the function lands
    /// the program counter on a sentinel the emulator has an execute hook
    /// registered for. While the hook runs, [`Self::hook_name`] reports
    /// which function was reached.
    ///
    /// Registration is all-or-nothing: on failure the fake-address counter
    /// is not advanced and no table entry is left behind.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no emulator is installed, the label is missing or
    /// not hookable, or the sentinel cannot be placed.
    pub fn hook_function(&mut self, name: &str, callback: HookCallback) -> Result<()> {
        if self.emulator.is_none() {
            return Err(Error::NoEmulator.locate(Address::default()));
        }

        let Some(address) = self.document.address_of_label(name) else {
            return Err(Error::UnknownFunction {
                name: name.to_string(),
            }
            .locate(Address::default()));
        };
        let hookable = self
            .document
            .label_at(&address)
            .is_some_and(|label| {
                matches!(label.kind(), LabelKind::Function | LabelKind::Imported)
            });
        if !hookable {
            return Err(Error::NotHookable {
                name: name.to_string(),
            }
            .locate(address));
        }

        let mode = self.document.mode(&address);
        let Some(pc_register) = self
            .cpu_information
            .register_by_role(RegisterRole::ProgramPointer, mode)
        else {
            return Err(Error::InvalidProgramPointer { mode }.locate(address));
        };
        let pc_bytes = usize::from(self.cpu_information.width_of(pc_register).unwrap_or(0) / 8);
        if pc_bytes == 0 {
            return Err(Error::ProgramPointerTooNarrow { bits: 0 }.locate(address));
        }

        let (Some(cpu), Some(memory)) = (self.cpu.as_mut(), self.memory.as_mut()) else {
            return Err(Error::NotInitialized.locate(address));
        };
        let emulator = self
            .emulator
            .as_mut()
            .expect("the emulator was checked above");

        let fake_address = self.next_hook_address;
        let sentinel_bytes = fake_address.to_le_bytes();
        let sentinel = &sentinel_bytes[..pc_bytes];
        if !emulator.write_memory(cpu.as_mut(), memory.as_mut(), &address, sentinel) {
            return Err(Error::HookWriteFailed.locate(address));
        }

        {
            let mut hook_names = self
                .hook_names
                .lock()
                .expect("the hook table is not poisoned");
            hook_names.insert(fake_address, name.to_string());
        }

        if !emulator.add_hook(fake_address, HookKind::Execute, callback) {
            self.hook_names
                .lock()
                .expect("the hook table is not poisoned")
                .remove(&fake_address);
            return Err(Error::HookRegistrationFailed.locate(address));
        }

        self.next_hook_address += HOOK_ADDRESS_STEP;
        Ok(())
    }

    /// Gets the name of the hooked function the program counter currently
    /// rests on, if it rests on one.
    ///
    /// This is the query hook callbacks use to learn which function they
    /// were invoked for.
    #[must_use]
    pub fn hook_name(&self) -> Option<String> {
        let cpu = self.cpu.as_deref()?;
        let pc_register = self
            .cpu_information
            .register_by_role(RegisterRole::ProgramPointer, cpu.mode())?;
        let width = self.cpu_information.width_of(pc_register)?;
        let value = cpu.read_register(pc_register, width).ok()?;

        let hook_names = self
            .hook_names
            .lock()
            .expect("the hook table is not poisoned");
        hook_names.get(&value.to_u64()).cloned()
    }
}
