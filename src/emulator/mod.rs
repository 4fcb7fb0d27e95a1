//! This module contains the [`Emulator`] interface through which the
//! execution engine runs semantic blocks, the hook machinery shared by all
//! emulators, and the process-wide [`ModuleManager`] registry that resolves
//! emulator names to factories.

pub mod interpreter;

use std::{
    collections::HashMap,
    fmt::Debug,
    rc::Rc,
    sync::{Mutex, OnceLock},
};

pub use interpreter::InterpreterEmulator;

use downcast_rs::{impl_downcast, Downcast};

use crate::{
    address::Address,
    arch::CpuInformation,
    context::{CpuContext, MemoryContext},
    error::emulation::Result,
    expression::Expression,
};

/// The events a per-address hook can be registered for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HookKind {
    /// The program counter reached the hooked address.
    Execute,

    /// The hooked address was read from.
    MemoryRead,

    /// The hooked address was written to.
    MemoryWrite,
}

/// A hook callback, invoked with the runtime contexts.
///
/// Returning `false` asks the emulator to stop executing.
pub type HookCallback = Rc<dyn Fn(&mut dyn CpuContext, &mut dyn MemoryContext) -> bool>;

/// This trait forms the core of the emulator representation: the set of
/// operations that the execution engine requires of every emulation
/// backend.
///
/// # Object Safety
///
/// This trait must remain
/// [object safe](https://doc.rust-lang.org/reference/items/traits.html#object-safety)
/// as emulators are held and invoked through dynamic dispatch.
///
/// # Self Bounds
///
/// The bounds on `Self` are required for the following reasons:
///
/// - [`Debug`] to provide representations that aid in debugging.
/// - [`Downcast`] so that a client holding a boxed emulator can recover the
///   concrete backend when it needs backend-specific operations.
pub trait Emulator
where
    Self: Debug + Downcast,
{
    /// Executes the semantic `block` that was lifted starting at
    /// `block_address`, mutating the contexts as the semantics direct.
    ///
    /// The emulator may have applied part of the block's effects by the
    /// time it fails; no rollback is attempted, and the caller inspects the
    /// contexts directly.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if an expression cannot be executed, or if a hook or
    /// the watchdog requests a stop.
    fn execute(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        block_address: Address,
        block: &[Expression],
    ) -> Result<()>;

    /// Registers `callback` to fire when `kind` occurs at the linear
    /// `address`, returning whether the registration was accepted.
    fn add_hook(&mut self, address: u64, kind: HookKind, callback: HookCallback) -> bool;

    /// Registers `callback` to fire before every executed instruction.
    fn add_instruction_hook(&mut self, callback: HookCallback);

    /// Writes `bytes` into the emulated memory at `address`, translating
    /// through the CPU context, and returns whether the write succeeded.
    fn write_memory(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        address: &Address,
        bytes: &[u8],
    ) -> bool;
}

impl_downcast!(Emulator);

/// The type of the factory functions through which emulators are
/// instantiated by name.
pub type EmulatorFactory = fn(Rc<CpuInformation>) -> Box<dyn Emulator>;

/// The process-wide registry of emulator factories.
///
/// Emulation backends register themselves under a name once per process;
/// the execution engine then instantiates them by that name.
pub struct ModuleManager;

impl ModuleManager {
    /// Gets the registry storage, creating it on first use.
    fn registry() -> &'static Mutex<HashMap<String, EmulatorFactory>> {
        static REGISTRY: OnceLock<Mutex<HashMap<String, EmulatorFactory>>> = OnceLock::new();
        REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
    }

    /// Registers `factory` under `name`, replacing any factory previously
    /// registered with that name.
    pub fn register_emulator(name: impl Into<String>, factory: EmulatorFactory) {
        Self::registry()
            .lock()
            .expect("the emulator registry is not poisoned")
            .insert(name.into(), factory);
    }

    /// Instantiates the emulator registered under `name` over the provided
    /// register dictionary.
    #[must_use]
    pub fn emulator(name: &str, cpu_information: Rc<CpuInformation>) -> Option<Box<dyn Emulator>> {
        let factory = *Self::registry()
            .lock()
            .expect("the emulator registry is not poisoned")
            .get(name)?;
        Some(factory(cpu_information))
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        arch::CpuInformation,
        emulator::{InterpreterEmulator, ModuleManager},
    };

    #[test]
    fn resolves_registered_factories_by_name() {
        ModuleManager::register_emulator("test-interpreter", InterpreterEmulator::factory);

        let info = CpuInformation::builder().build().in_rc();
        let emulator = ModuleManager::emulator("test-interpreter", Rc::clone(&info));
        assert!(emulator.is_some());
        assert!(emulator.unwrap().downcast_ref::<InterpreterEmulator>().is_some());

        assert!(ModuleManager::emulator("no-such-backend", info).is_none());
    }
}
