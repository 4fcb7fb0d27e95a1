//! This module contains the definition of [`Expression`], the semantic
//! representation that architectures emit as the meaning of each decoded
//! instruction, together with its supporting types.
//!
//! An expression is a tree: the nodes are typed operations and the leaves
//! are literal values, registers, memory accesses and symbolic placeholders.
//! Trees are built through the factory functions on [`Expression`], rendered
//! through [`Display`](std::fmt::Display), rewritten through
//! [`ExpressionVisitor`](visitor::ExpressionVisitor) or
//! [`Expression::update_child`], and evaluated against the runtime contexts
//! through the operations in [`eval`].

pub mod display;
pub mod eval;
pub mod track;
pub mod visitor;

use std::rc::Rc;

use crate::{
    address::Address,
    arch::{CpuInformation, RegisterId},
    value::BitVector,
};

/// The type of a boxed expression, as used for the children of expression
/// nodes.
pub type BoxedExpression = Box<Expression>;

/// The unary operations of the semantic representation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnaryOperator {
    /// Bitwise complement.
    Not,

    /// Two's complement negation.
    Negate,

    /// Byte-order reversal.
    SwapBytes,

    /// Index of the lowest set bit.
    BitScanForward,

    /// Index of the highest set bit.
    BitScanReverse,
}

/// The binary operations of the semantic representation.
///
/// The width-changing operations (`SignExtend`, `ZeroExtend`, `InsertBits`,
/// `ExtractBits`, `Broadcast`) take their sizing operand on the right-hand
/// side: a target width for the extensions and the broadcast, and a bit mask
/// for the bit-range pair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOperator {
    /// Swaps the values of two locations.
    Exchange,
    And,
    Or,
    Xor,
    ShiftLeft,
    LogicalShiftRight,
    ArithmeticShiftRight,
    RotateLeft,
    RotateRight,
    Add,
    /// Addition under the floating-point reinterpretation of the operands.
    AddFloat,
    Subtract,
    Multiply,
    SignedDivide,
    UnsignedDivide,
    SignedModulo,
    UnsignedModulo,
    SignExtend,
    ZeroExtend,
    InsertBits,
    ExtractBits,
    Broadcast,
}

/// The comparisons a condition can apply between its reference and test
/// children.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Comparison {
    Equal,
    NotEqual,
    UnsignedGreater,
    UnsignedGreaterOrEqual,
    UnsignedLess,
    UnsignedLessOrEqual,
    SignedGreater,
    SignedGreaterOrEqual,
    SignedLess,
    SignedLessOrEqual,
}

/// The lifecycle actions of a named temporary variable.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VariableAction {
    /// Brings the variable into existence with a declared width.
    Allocate,

    /// Releases the variable.
    Free,

    /// Reads or writes the live variable.
    Use,
}

/// The kinds of symbolic placeholder an architecture or analysis can emit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SymbolicKind {
    Unknown,
    ReturnValue,
    Parameter,
    Undefined,
}

/// The variant tag of an expression, used when only the shape of a node
/// matters.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExpressionKind {
    BitVector,
    Identifier,
    VectorIdentifier,
    Memory,
    Unary,
    Binary,
    Assignment,
    Ternary,
    IfElse,
    While,
    Bind,
    Variable,
    Track,
    Symbolic,
    System,
}

/// The result of structurally comparing two expressions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Equivalence {
    /// Same variant, equal scalar attributes, and identical children in
    /// order.
    Identical,

    /// Same variant, but the attributes or children differ.
    SameVariant,

    /// Different variants.
    Different,
}

/// The comparison that guards the conditional expression forms, shared by
/// the ternary, if-else and while nodes.
#[derive(Clone, Debug)]
pub struct Condition {
    /// The comparison to apply.
    pub comparison: Comparison,

    /// The value being examined.
    pub reference: BoxedExpression,

    /// The value it is examined against.
    pub test: BoxedExpression,
}

impl Condition {
    /// Constructs a new condition comparing `reference` against `test`.
    #[must_use]
    pub fn new(comparison: Comparison, reference: Expression, test: Expression) -> Self {
        Self {
            comparison,
            reference: Box::new(reference),
            test: Box::new(test),
        }
    }

    /// Structurally compares two conditions.
    #[must_use]
    pub fn compare(&self, other: &Condition) -> Equivalence {
        if self.comparison == other.comparison
            && self.reference.compare(&other.reference) == Equivalence::Identical
            && self.test.compare(&other.test) == Equivalence::Identical
        {
            Equivalence::Identical
        } else {
            Equivalence::SameVariant
        }
    }
}

/// A node of the semantic expression tree.
///
/// Nodes are immutable after construction, with the sole exception of
/// [`Self::update_child`], which performs a single in-place child
/// substitution for rewrite passes. Trees are built through the factory
/// functions below; cloning a node deep-copies its children and shares only
/// the immutable register dictionary.
#[derive(Clone, Debug)]
pub enum Expression {
    /// A literal integer; a literal boolean is the 1-bit case.
    BitVector(BitVector),

    /// A named register.
    Identifier {
        id: RegisterId,
        cpu_information: Rc<CpuInformation>,
    },

    /// An aggregate of registers acting as one wide location, such as a
    /// floating-point stack or a group of vector lanes.
    VectorIdentifier {
        ids: Vec<RegisterId>,
        cpu_information: Rc<CpuInformation>,
    },

    /// A memory access of `access_bits` bits at `base:offset`. When
    /// `dereference` is false the node denotes the address computation
    /// itself rather than the pointed-to storage.
    Memory {
        access_bits: u16,
        base: Option<BoxedExpression>,
        offset: BoxedExpression,
        dereference: bool,
    },

    /// A unary operation on a child expression.
    Unary {
        operator: UnaryOperator,
        operand: BoxedExpression,
    },

    /// A binary operation on two child expressions.
    Binary {
        operator: BinaryOperator,
        left: BoxedExpression,
        right: BoxedExpression,
    },

    /// A write of the source value into the destination location.
    Assignment {
        destination: BoxedExpression,
        source: BoxedExpression,
    },

    /// A value selected between two alternatives by a condition.
    Ternary {
        condition: Condition,
        when_true: BoxedExpression,
        when_false: BoxedExpression,
    },

    /// An imperative branch on a condition, with an optional else arm.
    IfElse {
        condition: Condition,
        then_expr: BoxedExpression,
        else_expr: Option<BoxedExpression>,
    },

    /// A bounded loop running its body while the condition holds.
    While {
        condition: Condition,
        body: BoxedExpression,
    },

    /// A compound of expressions executed in order.
    Bind { expressions: Vec<Expression> },

    /// A named temporary used as scratch storage by emitted semantics.
    Variable {
        name: String,
        action: VariableAction,
        bits: u16,
    },

    /// An annotation attaching the address and operand position a
    /// sub-expression came from, consumed by data-flow passes.
    Track {
        tracked: BoxedExpression,
        address: Address,
        position: u8,
    },

    /// A placeholder for a value the analysis cannot resolve.
    Symbolic {
        kind: SymbolicKind,
        label: String,
        address: Address,
        expression: Option<BoxedExpression>,
    },

    /// A synthetic marker with no direct semantics, consumed by the emulator
    /// as an out-of-band signal.
    System { name: String, address: Address },
}

impl Expression {
    /// Constructs a literal of `width` bits holding `value`.
    #[must_use]
    pub fn bit_vector(width: u16, value: impl Into<ethnum::U256>) -> Self {
        Self::BitVector(BitVector::new(width, value))
    }

    /// Constructs the 1-bit literal encoding of `value`.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::BitVector(BitVector::from_bool(value))
    }

    /// Constructs a register reference.
    #[must_use]
    pub fn identifier(id: RegisterId, cpu_information: &Rc<CpuInformation>) -> Self {
        Self::Identifier {
            id,
            cpu_information: Rc::clone(cpu_information),
        }
    }

    /// Constructs an aggregate register reference over `ids`, in order.
    #[must_use]
    pub fn vector_identifier(
        ids: impl Into<Vec<RegisterId>>,
        cpu_information: &Rc<CpuInformation>,
    ) -> Self {
        Self::VectorIdentifier {
            ids: ids.into(),
            cpu_information: Rc::clone(cpu_information),
        }
    }

    /// Constructs a memory access of `access_bits` bits.
    #[must_use]
    pub fn memory(
        access_bits: u16,
        base: Option<Expression>,
        offset: Expression,
        dereference: bool,
    ) -> Self {
        Self::Memory {
            access_bits,
            base: base.map(Box::new),
            offset: Box::new(offset),
            dereference,
        }
    }

    /// Constructs a unary operation.
    #[must_use]
    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Self::Unary {
            operator,
            operand: Box::new(operand),
        }
    }

    /// Constructs a binary operation.
    #[must_use]
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Constructs an assignment of `source` into `destination`.
    ///
    /// A destination that is not a location expression is a construction
    /// defect: it is logged, and the node is still created.
    #[must_use]
    pub fn assignment(destination: Expression, source: Expression) -> Self {
        if !destination.is_location() {
            log::warn!("assignment destination `{destination}` is not a location expression");
        }
        Self::Assignment {
            destination: Box::new(destination),
            source: Box::new(source),
        }
    }

    /// Constructs a value selection between `when_true` and `when_false`.
    #[must_use]
    pub fn ternary(
        comparison: Comparison,
        reference: Expression,
        test: Expression,
        when_true: Expression,
        when_false: Expression,
    ) -> Self {
        Self::Ternary {
            condition: Condition::new(comparison, reference, test),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }

    /// Constructs an imperative branch with an optional else arm.
    #[must_use]
    pub fn if_else(
        comparison: Comparison,
        reference: Expression,
        test: Expression,
        then_expr: Expression,
        else_expr: Option<Expression>,
    ) -> Self {
        Self::IfElse {
            condition: Condition::new(comparison, reference, test),
            then_expr: Box::new(then_expr),
            else_expr: else_expr.map(Box::new),
        }
    }

    /// Constructs a bounded semantic loop.
    #[must_use]
    pub fn while_loop(
        comparison: Comparison,
        reference: Expression,
        test: Expression,
        body: Expression,
    ) -> Self {
        Self::While {
            condition: Condition::new(comparison, reference, test),
            body: Box::new(body),
        }
    }

    /// Constructs a compound of expressions executed in order.
    #[must_use]
    pub fn bind(expressions: impl Into<Vec<Expression>>) -> Self {
        Self::Bind {
            expressions: expressions.into(),
        }
    }

    /// Constructs a variable lifecycle node.
    ///
    /// A zero-width allocation, or a width given to an action other than
    /// allocation, is a construction defect: it is logged, and the node is
    /// still created.
    #[must_use]
    pub fn variable(name: impl Into<String>, action: VariableAction, bits: u16) -> Self {
        let name = name.into();
        if bits == 0 && action == VariableAction::Allocate {
            log::warn!("allocating the zero-width variable `{name}`");
        }
        if bits != 0 && action != VariableAction::Allocate {
            log::warn!("variable `{name}` takes no width for actions other than allocation");
        }
        Self::Variable { name, action, bits }
    }

    /// Constructs a provenance annotation around `tracked`.
    #[must_use]
    pub fn track(tracked: Expression, address: Address, position: u8) -> Self {
        Self::Track {
            tracked: Box::new(tracked),
            address,
            position,
        }
    }

    /// Constructs a symbolic placeholder.
    #[must_use]
    pub fn symbolic(
        kind: SymbolicKind,
        label: impl Into<String>,
        address: Address,
        expression: Option<Expression>,
    ) -> Self {
        Self::Symbolic {
            kind,
            label: label.into(),
            address,
            expression: expression.map(Box::new),
        }
    }

    /// Constructs a synthetic marker for the emulator.
    #[must_use]
    pub fn system(name: impl Into<String>, address: Address) -> Self {
        Self::System {
            name: name.into(),
            address,
        }
    }

    /// Gets the variant tag of the node.
    #[must_use]
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Self::BitVector(_) => ExpressionKind::BitVector,
            Self::Identifier { .. } => ExpressionKind::Identifier,
            Self::VectorIdentifier { .. } => ExpressionKind::VectorIdentifier,
            Self::Memory { .. } => ExpressionKind::Memory,
            Self::Unary { .. } => ExpressionKind::Unary,
            Self::Binary { .. } => ExpressionKind::Binary,
            Self::Assignment { .. } => ExpressionKind::Assignment,
            Self::Ternary { .. } => ExpressionKind::Ternary,
            Self::IfElse { .. } => ExpressionKind::IfElse,
            Self::While { .. } => ExpressionKind::While,
            Self::Bind { .. } => ExpressionKind::Bind,
            Self::Variable { .. } => ExpressionKind::Variable,
            Self::Track { .. } => ExpressionKind::Track,
            Self::Symbolic { .. } => ExpressionKind::Symbolic,
            Self::System { .. } => ExpressionKind::System,
        }
    }

    /// Checks whether the node denotes a writable location: a register, an
    /// aggregate register, a dereferencing memory access, or a variable.
    #[must_use]
    pub fn is_location(&self) -> bool {
        match self {
            Self::Identifier { .. } | Self::VectorIdentifier { .. } | Self::Variable { .. } => true,
            Self::Memory { dereference, .. } => *dereference,
            _ => false,
        }
    }

    /// Computes the width in bits of the value the node denotes.
    ///
    /// Nodes that denote no value (assignments, conditions, binds, symbols
    /// and system markers) report zero.
    #[must_use]
    pub fn bit_size(&self) -> u16 {
        match self {
            Self::BitVector(value) => value.width(),
            Self::Identifier {
                id,
                cpu_information,
            } => cpu_information.width_of(*id).unwrap_or(0),
            Self::VectorIdentifier {
                ids,
                cpu_information,
            } => ids
                .iter()
                .map(|id| cpu_information.width_of(*id).unwrap_or(0))
                .sum(),
            Self::Memory { access_bits, .. } => *access_bits,
            Self::Unary { operand, .. } => operand.bit_size(),
            Self::Binary { left, right, .. } => left.bit_size().max(right.bit_size()),
            Self::Variable { bits, .. } => *bits,
            Self::Track { tracked, .. } => tracked.bit_size(),
            Self::Assignment { .. }
            | Self::Ternary { .. }
            | Self::IfElse { .. }
            | Self::While { .. }
            | Self::Bind { .. }
            | Self::Symbolic { .. }
            | Self::System { .. } => 0,
        }
    }

    /// Counts the nodes of the tree rooted at this node, itself included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|child| child.node_count()).sum::<usize>()
    }

    /// Converts a dereferencing memory access into its address-of form.
    ///
    /// Returns [`None`] for any other node.
    #[must_use]
    pub fn to_address(&self) -> Option<Expression> {
        match self {
            Self::Memory {
                access_bits,
                base,
                offset,
                ..
            } => Some(Self::Memory {
                access_bits: *access_bits,
                base: base.clone(),
                offset: offset.clone(),
                dereference: false,
            }),
            _ => None,
        }
    }

    /// Structurally compares two trees.
    ///
    /// [`Equivalence::Identical`] requires the same variant, equal scalar
    /// attributes, and identical children in construction order; two nodes
    /// of the same variant that differ anywhere below that are
    /// [`Equivalence::SameVariant`]; different variants are
    /// [`Equivalence::Different`].
    #[must_use]
    pub fn compare(&self, other: &Expression) -> Equivalence {
        use Equivalence::{Different, Identical, SameVariant};

        /// Whether two child expressions compare identical.
        fn identical(a: &Expression, b: &Expression) -> bool {
            a.compare(b) == Identical
        }

        /// Whether two optional children compare identical, treating two
        /// absences as identical.
        fn identical_opt(a: Option<&BoxedExpression>, b: Option<&BoxedExpression>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => identical(a, b),
                _ => false,
            }
        }

        let same = |matches: bool| if matches { Identical } else { SameVariant };

        match (self, other) {
            (Self::BitVector(a), Self::BitVector(b)) => same(a == b),
            (
                Self::Identifier {
                    id: a_id,
                    cpu_information: a_info,
                },
                Self::Identifier {
                    id: b_id,
                    cpu_information: b_info,
                },
            ) => same(a_id == b_id && Rc::ptr_eq(a_info, b_info)),
            (
                Self::VectorIdentifier {
                    ids: a_ids,
                    cpu_information: a_info,
                },
                Self::VectorIdentifier {
                    ids: b_ids,
                    cpu_information: b_info,
                },
            ) => same(a_ids == b_ids && Rc::ptr_eq(a_info, b_info)),
            (
                Self::Memory {
                    access_bits: a_bits,
                    base: a_base,
                    offset: a_offset,
                    dereference: a_deref,
                },
                Self::Memory {
                    access_bits: b_bits,
                    base: b_base,
                    offset: b_offset,
                    dereference: b_deref,
                },
            ) => same(
                a_bits == b_bits
                    && a_deref == b_deref
                    && identical_opt(a_base.as_ref(), b_base.as_ref())
                    && identical(a_offset, b_offset),
            ),
            (
                Self::Unary {
                    operator: a_op,
                    operand: a_child,
                },
                Self::Unary {
                    operator: b_op,
                    operand: b_child,
                },
            ) => same(a_op == b_op && identical(a_child, b_child)),
            (
                Self::Binary {
                    operator: a_op,
                    left: a_left,
                    right: a_right,
                },
                Self::Binary {
                    operator: b_op,
                    left: b_left,
                    right: b_right,
                },
            ) => same(a_op == b_op && identical(a_left, b_left) && identical(a_right, b_right)),
            (
                Self::Assignment {
                    destination: a_destination,
                    source: a_source,
                },
                Self::Assignment {
                    destination: b_destination,
                    source: b_source,
                },
            ) => same(identical(a_destination, b_destination) && identical(a_source, b_source)),
            (
                Self::Ternary {
                    condition: a_condition,
                    when_true: a_true,
                    when_false: a_false,
                },
                Self::Ternary {
                    condition: b_condition,
                    when_true: b_true,
                    when_false: b_false,
                },
            ) => same(
                a_condition.compare(b_condition) == Identical
                    && identical(a_true, b_true)
                    && identical(a_false, b_false),
            ),
            (
                Self::IfElse {
                    condition: a_condition,
                    then_expr: a_then,
                    else_expr: a_else,
                },
                Self::IfElse {
                    condition: b_condition,
                    then_expr: b_then,
                    else_expr: b_else,
                },
            ) => same(
                a_condition.compare(b_condition) == Identical
                    && identical(a_then, b_then)
                    && identical_opt(a_else.as_ref(), b_else.as_ref()),
            ),
            (
                Self::While {
                    condition: a_condition,
                    body: a_body,
                },
                Self::While {
                    condition: b_condition,
                    body: b_body,
                },
            ) => same(a_condition.compare(b_condition) == Identical && identical(a_body, b_body)),
            (
                Self::Bind {
                    expressions: a_exprs,
                },
                Self::Bind {
                    expressions: b_exprs,
                },
            ) => same(
                a_exprs.len() == b_exprs.len()
                    && a_exprs.iter().zip(b_exprs).all(|(a, b)| identical(a, b)),
            ),
            (
                Self::Variable {
                    name: a_name,
                    action: a_action,
                    bits: a_bits,
                },
                Self::Variable {
                    name: b_name,
                    action: b_action,
                    bits: b_bits,
                },
            ) => same(a_name == b_name && a_action == b_action && a_bits == b_bits),
            (
                Self::Track {
                    tracked: a_tracked,
                    address: a_address,
                    position: a_position,
                },
                Self::Track {
                    tracked: b_tracked,
                    address: b_address,
                    position: b_position,
                },
            ) => same(
                a_address == b_address
                    && a_position == b_position
                    && identical(a_tracked, b_tracked),
            ),
            (
                Self::Symbolic {
                    kind: a_kind,
                    label: a_label,
                    address: a_address,
                    expression: a_expr,
                },
                Self::Symbolic {
                    kind: b_kind,
                    label: b_label,
                    address: b_address,
                    expression: b_expr,
                },
            ) => same(
                a_kind == b_kind
                    && a_label == b_label
                    && a_address == b_address
                    && identical_opt(a_expr.as_ref(), b_expr.as_ref()),
            ),
            (
                Self::System {
                    name: a_name,
                    address: a_address,
                },
                Self::System {
                    name: b_name,
                    address: b_address,
                },
            ) => same(a_name == b_name && a_address == b_address),
            _ => Different,
        }
    }

    /// Substitutes `replacement` for the first child of this tree that
    /// compares [`Equivalence::Identical`] to `old`, returning whether a
    /// substitution happened.
    ///
    /// The direct children are examined first, in construction order; only
    /// then is each child recursed into, in the same order. One call
    /// replaces at most one node, and the root itself is never replaced.
    pub fn update_child(&mut self, old: &Expression, replacement: &Expression) -> bool {
        let mut slots = self.child_slots();
        for slot in &mut slots {
            if slot.compare(old) == Equivalence::Identical {
                **slot = replacement.clone();
                return true;
            }
        }
        for slot in slots {
            if slot.update_child(old, replacement) {
                return true;
            }
        }
        false
    }

    /// Gathers the direct children of the node in construction order.
    #[must_use]
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Self::BitVector(_)
            | Self::Identifier { .. }
            | Self::VectorIdentifier { .. }
            | Self::Variable { .. }
            | Self::System { .. } => vec![],
            Self::Memory { base, offset, .. } => base
                .iter()
                .map(AsRef::as_ref)
                .chain(std::iter::once(offset.as_ref()))
                .collect(),
            Self::Unary { operand, .. } => vec![operand.as_ref()],
            Self::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::Assignment {
                destination,
                source,
            } => vec![destination.as_ref(), source.as_ref()],
            Self::Ternary {
                condition,
                when_true,
                when_false,
            } => vec![
                condition.reference.as_ref(),
                condition.test.as_ref(),
                when_true.as_ref(),
                when_false.as_ref(),
            ],
            Self::IfElse {
                condition,
                then_expr,
                else_expr,
            } => {
                let mut children = vec![
                    condition.reference.as_ref(),
                    condition.test.as_ref(),
                    then_expr.as_ref(),
                ];
                if let Some(else_expr) = else_expr {
                    children.push(else_expr.as_ref());
                }
                children
            }
            Self::While { condition, body } => {
                vec![
                    condition.reference.as_ref(),
                    condition.test.as_ref(),
                    body.as_ref(),
                ]
            }
            Self::Bind { expressions } => expressions.iter().collect(),
            Self::Track { tracked, .. } => vec![tracked.as_ref()],
            Self::Symbolic { expression, .. } => {
                expression.iter().map(AsRef::as_ref).collect()
            }
        }
    }

    /// Gathers mutable handles on the direct children of the node in
    /// construction order.
    fn child_slots(&mut self) -> Vec<&mut Expression> {
        match self {
            Self::BitVector(_)
            | Self::Identifier { .. }
            | Self::VectorIdentifier { .. }
            | Self::Variable { .. }
            | Self::System { .. } => vec![],
            Self::Memory { base, offset, .. } => base
                .iter_mut()
                .map(AsMut::as_mut)
                .chain(std::iter::once(offset.as_mut()))
                .collect(),
            Self::Unary { operand, .. } => vec![operand.as_mut()],
            Self::Binary { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            Self::Assignment {
                destination,
                source,
            } => vec![destination.as_mut(), source.as_mut()],
            Self::Ternary {
                condition,
                when_true,
                when_false,
            } => vec![
                condition.reference.as_mut(),
                condition.test.as_mut(),
                when_true.as_mut(),
                when_false.as_mut(),
            ],
            Self::IfElse {
                condition,
                then_expr,
                else_expr,
            } => {
                let mut slots: Vec<&mut Expression> = vec![
                    condition.reference.as_mut(),
                    condition.test.as_mut(),
                    then_expr.as_mut(),
                ];
                if let Some(else_expr) = else_expr {
                    slots.push(else_expr.as_mut());
                }
                slots
            }
            Self::While { condition, body } => {
                vec![
                    condition.reference.as_mut(),
                    condition.test.as_mut(),
                    body.as_mut(),
                ]
            }
            Self::Bind { expressions } => expressions.iter_mut().collect(),
            Self::Track { tracked, .. } => vec![tracked.as_mut()],
            Self::Symbolic { expression, .. } => {
                expression.iter_mut().map(AsMut::as_mut).collect()
            }
        }
    }
}

impl From<BitVector> for Expression {
    fn from(value: BitVector) -> Self {
        Self::BitVector(value)
    }
}
