//! This module contains the reference emulation backend: a concrete
//! interpreter that evaluates semantic expressions directly against the
//! runtime contexts.
//!
//! The interpreter is deliberately unclever. It exists to give semantics a
//! meaning that is easy to audit, to be the executable specification that
//! faster backends are measured against, and to make the execution engine
//! usable without any external emulation machinery.

use std::{collections::HashMap, rc::Rc};

use derivative::Derivative;

use crate::{
    address::Address,
    arch::CpuInformation,
    constant::DEFAULT_LOOP_ITERATION_LIMIT,
    context::{CpuContext, MemoryContext},
    emulator::{Emulator, HookCallback, HookKind},
    error::{
        emulation::{Error, Result},
        evaluation,
    },
    expression::{
        eval::DataContainer, BinaryOperator, Comparison, Condition, Expression, UnaryOperator,
        VariableAction,
    },
    value::BitVector,
    watchdog::{DynWatchdog, LazyWatchdog, Watchdog},
};

/// The configuration for the interpreter backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of iterations a single `while` semantic loop may
    /// run for before the interpreter gives up on it.
    ///
    /// Defaults to [`DEFAULT_LOOP_ITERATION_LIMIT`].
    pub loop_iteration_limit: usize,
}

impl Config {
    /// Sets the `loop_iteration_limit` config parameter to `value`.
    #[must_use]
    pub fn with_loop_iteration_limit(mut self, value: usize) -> Self {
        self.loop_iteration_limit = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let loop_iteration_limit = DEFAULT_LOOP_ITERATION_LIMIT;
        Self {
            loop_iteration_limit,
        }
    }
}

/// The name-keyed scratch store backing variable expressions during
/// interpretation.
///
/// Variables exist from their allocation to their release, and only a live
/// variable can be read or written.
#[derive(Clone, Debug, Default)]
pub struct VariableStore {
    slots: HashMap<String, BitVector>,
}

impl VariableStore {
    /// Brings the variable `name` into existence, zeroed, with the given
    /// width.
    pub fn allocate(&mut self, name: &str, bits: u16) {
        if self
            .slots
            .insert(name.to_string(), BitVector::new(bits, 0u64))
            .is_some()
        {
            log::warn!("reallocating the live variable `{name}`");
        }
    }

    /// Releases the variable `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no such variable is live.
    pub fn free(&mut self, name: &str) -> evaluation::Result<()> {
        self.slots
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| evaluation::Error::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Reads the value of the variable `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no such variable is live.
    pub fn read(&self, name: &str) -> evaluation::Result<BitVector> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| evaluation::Error::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Writes `value` into the variable `name`, truncated to the variable's
    /// declared width.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no such variable is live.
    pub fn write(&mut self, name: &str, value: &BitVector) -> evaluation::Result<()> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| evaluation::Error::UnknownVariable {
                name: name.to_string(),
            })?;
        *slot = BitVector::new(slot.width(), value.value());
        Ok(())
    }
}

/// The reference emulation backend: a direct interpreter of semantic
/// expressions.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct InterpreterEmulator {
    /// The register dictionary of the emulated architecture.
    cpu_information: Rc<CpuInformation>,

    /// The configuration of the interpreter.
    config: Config,

    /// The watchdog polled between evaluated expressions.
    watchdog: DynWatchdog,

    /// The per-address hooks, keyed by linear address.
    #[derivative(Debug = "ignore")]
    hooks: HashMap<u64, Vec<(HookKind, HookCallback)>>,

    /// The hooks that fire before every executed instruction.
    #[derivative(Debug = "ignore")]
    instruction_hooks: Vec<HookCallback>,

    /// The scratch store backing variable expressions.
    variables: VariableStore,

    /// The number of expressions evaluated, for watchdog pacing.
    evaluations: usize,
}

impl InterpreterEmulator {
    /// The name the interpreter registers itself under.
    pub const NAME: &'static str = "interpreter";

    /// Constructs a new interpreter over the given register dictionary.
    #[must_use]
    pub fn new(cpu_information: Rc<CpuInformation>, config: Config, watchdog: DynWatchdog) -> Self {
        Self {
            cpu_information,
            config,
            watchdog,
            hooks: HashMap::new(),
            instruction_hooks: Vec::new(),
            variables: VariableStore::default(),
            evaluations: 0,
        }
    }

    /// The factory through which the module manager instantiates the
    /// interpreter with its default configuration.
    #[must_use]
    pub fn factory(cpu_information: Rc<CpuInformation>) -> Box<dyn Emulator> {
        Box::new(Self::new(
            cpu_information,
            Config::default(),
            LazyWatchdog.in_rc(),
        ))
    }

    /// Registers the interpreter with the process-wide module manager under
    /// [`Self::NAME`].
    pub fn register() {
        crate::emulator::ModuleManager::register_emulator(Self::NAME, Self::factory);
    }

    /// Gets the scratch variable store, for introspection.
    #[must_use]
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Executes one statement-position expression.
    fn step(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        expression: &Expression,
    ) -> Result<()> {
        self.poll_watchdog()?;
        match expression {
            Expression::Assignment {
                destination,
                source,
            } => self.assign(cpu, memory, destination, source),
            Expression::Bind { expressions } => {
                for expression in expressions {
                    self.step(cpu, memory, expression)?;
                }
                Ok(())
            }
            Expression::IfElse {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.test(cpu, memory, condition)? {
                    self.step(cpu, memory, then_expr)
                } else if let Some(else_expr) = else_expr {
                    self.step(cpu, memory, else_expr)
                } else {
                    Ok(())
                }
            }
            Expression::While { condition, body } => {
                let limit = self.config.loop_iteration_limit;
                let mut iterations = 0usize;
                while self.test(cpu, memory, condition)? {
                    if iterations >= limit {
                        return Err(Error::LoopLimitExceeded { limit });
                    }
                    iterations += 1;
                    self.step(cpu, memory, body)?;
                }
                Ok(())
            }
            Expression::System { name, address } => self.marker(cpu, memory, name, *address),
            Expression::Variable { name, action, bits } => {
                match action {
                    VariableAction::Allocate => self.variables.allocate(name, *bits),
                    VariableAction::Free => self.variables.free(name)?,
                    // A bare use in statement position has no effect.
                    VariableAction::Use => {}
                }
                Ok(())
            }
            Expression::Track { tracked, .. } => self.step(cpu, memory, tracked),
            Expression::Binary {
                operator: BinaryOperator::Exchange,
                left,
                right,
            } => self.exchange(cpu, memory, left, right),
            _ => Err(Error::Unsupported {
                form: format!("{} in statement position", expression.kind()),
            }),
        }
    }

    /// Executes an assignment.
    fn assign(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        destination: &Expression,
        source: &Expression,
    ) -> Result<()> {
        let slots = match destination {
            Expression::VectorIdentifier { ids, .. } => ids.len(),
            _ => 1,
        };

        // Container-readable sources fill all the slots the destination
        // needs; anything else is evaluated as a single scalar.
        let mut data: DataContainer = match source {
            Expression::BitVector(_)
            | Expression::Identifier { .. }
            | Expression::VectorIdentifier { .. }
            | Expression::Memory { .. } => {
                let mut data =
                    DataContainer::from(vec![BitVector::from_bool(false); slots]);
                source.read(cpu, memory, &mut data)?;
                data
            }
            _ => {
                if slots != 1 {
                    return Err(Error::Unsupported {
                        form: format!(
                            "{} as the source of a {slots}-slot assignment",
                            source.kind()
                        ),
                    });
                }
                DataContainer::from(vec![self.evaluate(cpu, memory, source)?])
            }
        };

        self.write_value(cpu, memory, destination, &mut data)
    }

    /// Writes the values in `data` into `destination`.
    fn write_value(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        destination: &Expression,
        data: &mut DataContainer,
    ) -> Result<()> {
        if let Expression::Variable { name, .. } = destination {
            let value = data.front().copied().ok_or(
                evaluation::Error::SlotCountMismatch {
                    expected: 1,
                    actual: 0,
                },
            )?;
            self.variables.write(name, &value)?;
            return Ok(());
        }
        destination.write(cpu, memory, data)?;
        Ok(())
    }

    /// Executes an exchange statement, swapping the values of two
    /// locations.
    fn exchange(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        left: &Expression,
        right: &Expression,
    ) -> Result<()> {
        let left_value = self.evaluate(cpu, memory, left)?;
        let right_value = self.evaluate(cpu, memory, right)?;
        self.write_value(cpu, memory, left, &mut DataContainer::from(vec![right_value]))?;
        self.write_value(cpu, memory, right, &mut DataContainer::from(vec![left_value]))
    }

    /// Evaluates a value-position expression to a single bit-vector.
    fn evaluate(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        expression: &Expression,
    ) -> Result<BitVector> {
        self.poll_watchdog()?;
        match expression {
            Expression::BitVector(value) => Ok(*value),
            Expression::Identifier { .. } | Expression::Memory { .. } => {
                let mut data = DataContainer::from(vec![BitVector::from_bool(false)]);
                expression.read(cpu, memory, &mut data)?;
                Ok(data[0])
            }
            Expression::Unary { operator, operand } => {
                let value = self.evaluate(cpu, memory, operand)?;
                self.apply_unary(*operator, value)
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(cpu, memory, left)?;
                let right = self.evaluate(cpu, memory, right)?;
                self.apply_binary(*operator, left, right)
            }
            Expression::Ternary {
                condition,
                when_true,
                when_false,
            } => {
                if self.test(cpu, memory, condition)? {
                    self.evaluate(cpu, memory, when_true)
                } else {
                    self.evaluate(cpu, memory, when_false)
                }
            }
            Expression::Variable {
                name,
                action: VariableAction::Use,
                ..
            } => Ok(self.variables.read(name)?),
            Expression::Track { tracked, .. } => self.evaluate(cpu, memory, tracked),
            _ => Err(Error::Unsupported {
                form: format!("{} in value position", expression.kind()),
            }),
        }
    }

    /// Applies a unary operation to an evaluated operand.
    fn apply_unary(&self, operator: UnaryOperator, value: BitVector) -> Result<BitVector> {
        let result = match operator {
            UnaryOperator::Not => !value,
            UnaryOperator::Negate => -value,
            UnaryOperator::SwapBytes => value.swap_bytes(),
            UnaryOperator::BitScanForward => value.bit_scan_forward().map_err(evaluation::Error::from)?,
            UnaryOperator::BitScanReverse => value.bit_scan_reverse().map_err(evaluation::Error::from)?,
        };
        Ok(result)
    }

    /// Applies a binary operation to evaluated operands.
    fn apply_binary(
        &self,
        operator: BinaryOperator,
        left: BitVector,
        right: BitVector,
    ) -> Result<BitVector> {
        /// Narrows a sizing operand to a width in bits.
        fn width_operand(value: &BitVector) -> u16 {
            value.to_u64() as u16
        }

        let result = match operator {
            BinaryOperator::Exchange => {
                return Err(Error::Unsupported {
                    form: "an exchange in value position".to_string(),
                })
            }
            BinaryOperator::And => left & right,
            BinaryOperator::Or => left | right,
            BinaryOperator::Xor => left ^ right,
            BinaryOperator::ShiftLeft => left.shift_left(&right),
            BinaryOperator::LogicalShiftRight => left.logical_shift_right(&right),
            BinaryOperator::ArithmeticShiftRight => left.arithmetic_shift_right(&right),
            BinaryOperator::RotateLeft => left.rotate_left(&right),
            BinaryOperator::RotateRight => left.rotate_right(&right),
            BinaryOperator::Add => left + right,
            BinaryOperator::AddFloat => self.add_float(left, right)?,
            BinaryOperator::Subtract => left - right,
            BinaryOperator::Multiply => left * right,
            BinaryOperator::SignedDivide => {
                left.signed_div(&right).map_err(evaluation::Error::from)?
            }
            BinaryOperator::UnsignedDivide => {
                left.unsigned_div(&right).map_err(evaluation::Error::from)?
            }
            BinaryOperator::SignedModulo => {
                left.signed_rem(&right).map_err(evaluation::Error::from)?
            }
            BinaryOperator::UnsignedModulo => {
                left.unsigned_rem(&right).map_err(evaluation::Error::from)?
            }
            BinaryOperator::SignExtend => left
                .sign_extend(width_operand(&right))
                .map_err(evaluation::Error::from)?,
            BinaryOperator::ZeroExtend => left
                .zero_extend(width_operand(&right))
                .map_err(evaluation::Error::from)?,
            BinaryOperator::InsertBits => {
                left.insert_bits(&right).map_err(evaluation::Error::from)?
            }
            BinaryOperator::ExtractBits => {
                left.extract_bits(&right).map_err(evaluation::Error::from)?
            }
            BinaryOperator::Broadcast => left
                .broadcast(width_operand(&right))
                .map_err(evaluation::Error::from)?,
        };
        Ok(result)
    }

    /// Adds two values under their floating-point reinterpretation.
    ///
    /// Only the 32-bit and 64-bit encodings have a defined floating-point
    /// reinterpretation here.
    fn add_float(&self, left: BitVector, right: BitVector) -> Result<BitVector> {
        let width = left.width().max(right.width());
        match width {
            32 => {
                let sum =
                    f32::from_bits(left.to_u64() as u32) + f32::from_bits(right.to_u64() as u32);
                Ok(BitVector::new(32, sum.to_bits()))
            }
            64 => {
                let sum = f64::from_bits(left.to_u64()) + f64::from_bits(right.to_u64());
                Ok(BitVector::new(64, sum.to_bits()))
            }
            _ => Err(Error::Unsupported {
                form: format!("floating-point addition over {width} bits"),
            }),
        }
    }

    /// Evaluates a condition to its truth value.
    fn test(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        condition: &Condition,
    ) -> Result<bool> {
        use std::cmp::Ordering;

        let reference = self.evaluate(cpu, memory, &condition.reference)?;
        let test = self.evaluate(cpu, memory, &condition.test)?;

        let unsigned = reference.unsigned_cmp(&test);
        let signed = reference.signed_cmp(&test);
        let holds = match condition.comparison {
            Comparison::Equal => unsigned == Ordering::Equal,
            Comparison::NotEqual => unsigned != Ordering::Equal,
            Comparison::UnsignedGreater => unsigned == Ordering::Greater,
            Comparison::UnsignedGreaterOrEqual => unsigned != Ordering::Less,
            Comparison::UnsignedLess => unsigned == Ordering::Less,
            Comparison::UnsignedLessOrEqual => unsigned != Ordering::Greater,
            Comparison::SignedGreater => signed == Ordering::Greater,
            Comparison::SignedGreaterOrEqual => signed != Ordering::Less,
            Comparison::SignedLess => signed == Ordering::Less,
            Comparison::SignedLessOrEqual => signed != Ordering::Greater,
        };
        Ok(holds)
    }

    /// Processes a system marker.
    fn marker(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        name: &str,
        address: Address,
    ) -> Result<()> {
        match name {
            "dump_insn" => {
                log::debug!("executing instruction at {address}");
                for callback in &self.instruction_hooks {
                    if !callback(cpu, memory) {
                        return Err(Error::StoppedByHook);
                    }
                }
                Ok(())
            }
            "check_exec_hook" => {
                let pc_register = self
                    .cpu_information
                    .register_by_role(crate::arch::RegisterRole::ProgramPointer, cpu.mode())
                    .ok_or(Error::NoProgramPointer)?;
                let width = self
                    .cpu_information
                    .width_of(pc_register)
                    .ok_or(Error::NoProgramPointer)?;
                let target = cpu
                    .read_register(pc_register, width)
                    .map_err(Error::Evaluation)?
                    .to_u64();
                if let Some(callbacks) = self.hooks.get(&target) {
                    for (kind, callback) in callbacks {
                        if *kind == HookKind::Execute && !callback(cpu, memory) {
                            return Err(Error::StoppedByHook);
                        }
                    }
                }
                Ok(())
            }
            _ => {
                log::debug!("ignoring unknown system marker `{name}` at {address}");
                Ok(())
            }
        }
    }

    /// Counts an evaluation and polls the watchdog at the configured
    /// interval.
    fn poll_watchdog(&mut self) -> Result<()> {
        self.evaluations = self.evaluations.wrapping_add(1);
        if self.evaluations % self.watchdog.poll_every() == 0 && self.watchdog.should_stop() {
            return Err(Error::StoppedByWatchdog);
        }
        Ok(())
    }
}

impl Emulator for InterpreterEmulator {
    fn execute(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        block_address: Address,
        block: &[Expression],
    ) -> Result<()> {
        log::debug!("executing semantic block at {block_address}");
        for expression in block {
            self.step(cpu, memory, expression)?;
        }
        Ok(())
    }

    fn add_hook(&mut self, address: u64, kind: HookKind, callback: HookCallback) -> bool {
        self.hooks.entry(address).or_default().push((kind, callback));
        true
    }

    fn add_instruction_hook(&mut self, callback: HookCallback) {
        self.instruction_hooks.push(callback);
    }

    fn write_memory(
        &mut self,
        cpu: &mut dyn CpuContext,
        memory: &mut dyn MemoryContext,
        address: &Address,
        bytes: &[u8],
    ) -> bool {
        let linear = cpu.translate(address).unwrap_or_else(|| address.offset());
        memory.write(linear, bytes).is_ok()
    }
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, rc::Rc};

    use crate::{
        address::Address,
        arch::{CpuInformation, RegisterRole},
        context::{CpuContext, FlatMemoryContext, RegisterFileContext},
        emulator::{interpreter::Config, Emulator, HookKind, InterpreterEmulator},
        error::emulation::Error,
        expression::{BinaryOperator, Comparison, Expression, VariableAction},
        value::BitVector,
        watchdog::{LazyWatchdog, Watchdog},
    };

    fn cpu_information() -> Rc<CpuInformation> {
        CpuInformation::builder()
            .with_register(0, "eax", 32)
            .with_register(1, "ebx", 32)
            .with_register(2, "eip", 32)
            .with_role(RegisterRole::ProgramPointer, 0, 2)
            .build()
            .in_rc()
    }

    fn harness() -> (InterpreterEmulator, RegisterFileContext, FlatMemoryContext) {
        let info = cpu_information();
        let interpreter =
            InterpreterEmulator::new(Rc::clone(&info), Config::default(), LazyWatchdog.in_rc());
        let cpu = RegisterFileContext::new(info);
        let mut memory = FlatMemoryContext::new();
        memory.map_region(0x1000, vec![0u8; 64]);
        (interpreter, cpu, memory)
    }

    #[test]
    fn clears_a_register_through_xor() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        let info = cpu_information();
        cpu.write_register(0, &BitVector::new(32, 0xdead_beefu64)).unwrap();

        let clear = Expression::assignment(
            Expression::identifier(0, &info),
            Expression::binary(
                BinaryOperator::Xor,
                Expression::identifier(0, &info),
                Expression::identifier(0, &info),
            ),
        );

        interpreter
            .execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &[clear])
            .unwrap();
        assert_eq!(cpu.read_register(0, 32).unwrap().to_u64(), 0);
    }

    #[test]
    fn branches_take_the_matching_arm() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        let info = cpu_information();
        cpu.write_register(0, &BitVector::new(32, 5u64)).unwrap();

        let branch = Expression::if_else(
            Comparison::UnsignedGreater,
            Expression::identifier(0, &info),
            Expression::bit_vector(32, 3u64),
            Expression::assignment(
                Expression::identifier(1, &info),
                Expression::bit_vector(32, 1u64),
            ),
            Some(Expression::assignment(
                Expression::identifier(1, &info),
                Expression::bit_vector(32, 2u64),
            )),
        );
        interpreter
            .execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &[branch])
            .unwrap();
        assert_eq!(cpu.read_register(1, 32).unwrap().to_u64(), 1);
    }

    #[test]
    fn loops_run_until_their_condition_fails() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        let info = cpu_information();
        cpu.write_register(0, &BitVector::new(32, 4u64)).unwrap();

        // while (eax != 0) { ebx = ebx + 2; eax = eax - 1 }
        let body = Expression::bind(vec![
            Expression::assignment(
                Expression::identifier(1, &info),
                Expression::binary(
                    BinaryOperator::Add,
                    Expression::identifier(1, &info),
                    Expression::bit_vector(32, 2u64),
                ),
            ),
            Expression::assignment(
                Expression::identifier(0, &info),
                Expression::binary(
                    BinaryOperator::Subtract,
                    Expression::identifier(0, &info),
                    Expression::bit_vector(32, 1u64),
                ),
            ),
        ]);
        let countdown = Expression::while_loop(
            Comparison::NotEqual,
            Expression::identifier(0, &info),
            Expression::bit_vector(32, 0u64),
            body,
        );

        interpreter
            .execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &[countdown])
            .unwrap();
        assert_eq!(cpu.read_register(0, 32).unwrap().to_u64(), 0);
        assert_eq!(cpu.read_register(1, 32).unwrap().to_u64(), 8);
    }

    #[test]
    fn runaway_loops_hit_the_iteration_limit() {
        let info = cpu_information();
        let mut interpreter = InterpreterEmulator::new(
            Rc::clone(&info),
            Config::default().with_loop_iteration_limit(10),
            LazyWatchdog.in_rc(),
        );
        let mut cpu = RegisterFileContext::new(info.clone());
        let mut memory = FlatMemoryContext::new();

        let forever = Expression::while_loop(
            Comparison::Equal,
            Expression::bit_vector(1, 1u64),
            Expression::bit_vector(1, 1u64),
            Expression::assignment(
                Expression::identifier(0, &info),
                Expression::bit_vector(32, 0u64),
            ),
        );
        let result =
            interpreter.execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &[forever]);
        assert_eq!(result.unwrap_err(), Error::LoopLimitExceeded { limit: 10 });
    }

    #[test]
    fn variables_live_between_allocation_and_release() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        let info = cpu_information();
        cpu.write_register(0, &BitVector::new(32, 0x1234u64)).unwrap();

        let block = [
            Expression::variable("tmp", VariableAction::Allocate, 32),
            Expression::assignment(
                Expression::variable("tmp", VariableAction::Use, 0),
                Expression::identifier(0, &info),
            ),
            Expression::assignment(
                Expression::identifier(1, &info),
                Expression::variable("tmp", VariableAction::Use, 0),
            ),
            Expression::variable("tmp", VariableAction::Free, 0),
        ];
        interpreter
            .execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &block)
            .unwrap();
        assert_eq!(cpu.read_register(1, 32).unwrap().to_u64(), 0x1234);
        assert!(interpreter.variables().read("tmp").is_err());
    }

    #[test]
    fn exchanges_swap_two_locations() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        let info = cpu_information();
        cpu.write_register(0, &BitVector::new(32, 1u64)).unwrap();
        cpu.write_register(1, &BitVector::new(32, 2u64)).unwrap();

        let exchange = Expression::binary(
            BinaryOperator::Exchange,
            Expression::identifier(0, &info),
            Expression::identifier(1, &info),
        );
        interpreter
            .execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &[exchange])
            .unwrap();
        assert_eq!(cpu.read_register(0, 32).unwrap().to_u64(), 2);
        assert_eq!(cpu.read_register(1, 32).unwrap().to_u64(), 1);
    }

    #[test]
    fn execute_hooks_fire_at_their_address() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        cpu.write_register(2, &BitVector::new(32, 0xdead_7700u64)).unwrap();

        let fired = Rc::new(Cell::new(false));
        let seen = Rc::clone(&fired);
        assert!(interpreter.add_hook(
            0xdead_7700,
            HookKind::Execute,
            Rc::new(move |_, _| {
                seen.set(true);
                true
            }),
        ));

        let block = [Expression::system("check_exec_hook", Address::default())];
        interpreter
            .execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &block)
            .unwrap();
        assert!(fired.get());
    }

    #[test]
    fn a_hook_returning_false_stops_execution() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        interpreter.add_instruction_hook(Rc::new(|_, _| false));

        let block = [
            Expression::system("dump_insn", Address::new(0, 0x1000)),
            Expression::assignment(
                Expression::identifier(0, &cpu_information()),
                Expression::bit_vector(32, 7u64),
            ),
        ];
        let result = interpreter.execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &block);
        assert_eq!(result.unwrap_err(), Error::StoppedByHook);
        // The stop happened before the assignment ran.
        assert_eq!(cpu.read_register(0, 32).unwrap().to_u64(), 0);
    }

    #[test]
    fn adds_under_the_floating_point_reinterpretation() {
        let (mut interpreter, mut cpu, mut memory) = harness();
        let info = cpu_information();

        let sum = Expression::assignment(
            Expression::identifier(0, &info),
            Expression::binary(
                BinaryOperator::AddFloat,
                Expression::bit_vector(32, 1.5f32.to_bits()),
                Expression::bit_vector(32, 2.25f32.to_bits()),
            ),
        );
        interpreter
            .execute(&mut cpu, &mut memory, Address::new(0, 0x1000), &[sum])
            .unwrap();
        let bits = cpu.read_register(0, 32).unwrap().to_u64() as u32;
        assert_eq!(f32::from_bits(bits), 3.75);
    }
}
