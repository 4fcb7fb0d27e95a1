//! This module contains the textual rendering of the semantic
//! representation.
//!
//! The forms produced here are stable: analyses and tests match on them, so
//! changing a rendering is a breaking change.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::expression::{
    BinaryOperator, Comparison, Condition, Expression, ExpressionKind, SymbolicKind,
    UnaryOperator, VariableAction,
};

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Self::Not => "~",
            Self::Negate => "-",
            Self::SwapBytes => "⇄",
            Self::BitScanForward => "bsf",
            Self::BitScanReverse => "bsr",
        };
        write!(f, "{token}")
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Self::Exchange => "↔",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::ShiftLeft => "<<",
            Self::LogicalShiftRight => ">>{u}",
            Self::ArithmeticShiftRight => ">>{s}",
            Self::RotateLeft => "rol",
            Self::RotateRight => "ror",
            Self::Add => "+",
            Self::AddFloat => "+{f}",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::SignedDivide => "/{s}",
            Self::UnsignedDivide => "/{u}",
            Self::SignedModulo => "%{s}",
            Self::UnsignedModulo => "%{u}",
            Self::SignExtend => "↗{s}",
            Self::ZeroExtend => "↗{z}",
            Self::InsertBits => "<insert_bits>",
            Self::ExtractBits => "<extract_bits>",
            Self::Broadcast => "<bcast>",
        };
        write!(f, "{token}")
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::UnsignedGreater => "u>",
            Self::UnsignedGreaterOrEqual => "u>=",
            Self::UnsignedLess => "u<",
            Self::UnsignedLessOrEqual => "u<=",
            Self::SignedGreater => "s>",
            Self::SignedGreaterOrEqual => "s>=",
            Self::SignedLess => "s<",
            Self::SignedLessOrEqual => "s<=",
        };
        write!(f, "{token}")
    }
}

impl Display for VariableAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Self::Allocate => "alloc",
            Self::Free => "free",
            Self::Use => "use",
        };
        write!(f, "{token}")
    }
}

impl Display for SymbolicKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Self::Unknown => "unknown",
            Self::ReturnValue => "retval",
            Self::Parameter => "parm",
            Self::Undefined => "undef",
        };
        write!(f, "{token}")
    }
}

/// The variant names as used in diagnostics.
impl Display for ExpressionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BitVector => "bit-vector",
            Self::Identifier => "identifier",
            Self::VectorIdentifier => "vector identifier",
            Self::Memory => "memory",
            Self::Unary => "unary operation",
            Self::Binary => "binary operation",
            Self::Assignment => "assignment",
            Self::Ternary => "ternary condition",
            Self::IfElse => "if-else condition",
            Self::While => "while condition",
            Self::Bind => "bind",
            Self::Variable => "variable",
            Self::Track => "track",
            Self::Symbolic => "symbolic",
            Self::System => "system marker",
        };
        write!(f, "{name}")
    }
}

/// Renders the condition as `(<reference> <comparison> <test>)`.
impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.reference, self.comparison, self.test)
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BitVector(value) => write!(f, "int{}({value})", value.width()),
            Self::Identifier {
                id,
                cpu_information,
            } => {
                // An identifier the dictionary does not know renders as
                // nothing, matching the unresolvable-name behaviour of the
                // rest of the platform.
                let Some(name) = cpu_information.name_of(*id) else {
                    return Ok(());
                };
                let width = cpu_information.width_of(*id).unwrap_or(0);
                write!(f, "Id{width}({name})")
            }
            Self::VectorIdentifier {
                ids,
                cpu_information,
            } => {
                let mut names = Vec::with_capacity(ids.len());
                for id in ids {
                    let Some(name) = cpu_information.name_of(*id) else {
                        return Ok(());
                    };
                    names.push(name);
                }
                write!(f, "{{ {} }}", names.iter().join(", "))
            }
            Self::Memory {
                access_bits,
                base,
                offset,
                dereference,
            } => {
                let family = if *dereference { "Mem" } else { "Addr" };
                match base {
                    Some(base) => write!(f, "{family}{access_bits}({base}:{offset})"),
                    None => write!(f, "{family}{access_bits}({offset})"),
                }
            }
            Self::Unary { operator, operand } => write!(f, "{operator}({operand})"),
            Self::Binary {
                operator,
                left,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Self::Assignment {
                destination,
                source,
            } => write!(f, "({destination} = {source})"),
            Self::Ternary {
                condition,
                when_true,
                when_false,
            } => write!(f, "{condition} ? ({when_true}) : {when_false})"),
            Self::IfElse {
                condition,
                then_expr,
                else_expr,
            } => match else_expr {
                Some(else_expr) => {
                    write!(f, "if {condition} {{ {then_expr} }} else {{ {else_expr} }}")
                }
                None => write!(f, "if {condition} {{ {then_expr} }}"),
            },
            Self::While { condition, body } => write!(f, "while {condition} {{ {body} }}"),
            Self::Bind { expressions } => {
                write!(f, "{}", expressions.iter().join("; "))
            }
            Self::Variable { name, action, bits } => write!(f, "Var{bits}[{action}] {name}"),
            Self::Track {
                tracked,
                address,
                position,
            } => write!(f, "Trk({address}, {position}, {tracked})"),
            Self::Symbolic {
                kind,
                label,
                address,
                expression,
            } => match expression {
                Some(expression) => {
                    write!(f, "Sym({kind}, \"{label}\", {address}, {expression})")
                }
                None => write!(f, "Sym({kind}, \"{label}\", {address})"),
            },
            Self::System { name, address } => write!(f, "{address} {name}"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        address::Address,
        arch::CpuInformation,
        expression::{
            BinaryOperator, Comparison, Expression, SymbolicKind, UnaryOperator, VariableAction,
        },
    };

    /// A dictionary with the registers the rendering tests refer to.
    fn cpu_information() -> Rc<CpuInformation> {
        CpuInformation::builder()
            .with_register(0, "eax", 32)
            .with_register(1, "ebx", 32)
            .with_register(2, "zf", 1)
            .with_register(3, "st0", 80)
            .with_register(4, "st1", 80)
            .build()
            .in_rc()
    }

    #[test]
    fn renders_literals() {
        let literal = Expression::bit_vector(32, 0x1234u64);
        assert_eq!(literal.to_string(), "int32(0x1234)");
        assert_eq!(literal.bit_size(), 32);

        assert_eq!(Expression::boolean(true).to_string(), "int1(0x1)");
    }

    #[test]
    fn renders_identifiers() {
        let info = cpu_information();
        assert_eq!(Expression::identifier(0, &info).to_string(), "Id32(eax)");
        assert_eq!(
            Expression::vector_identifier(vec![3, 4], &info).to_string(),
            "{ st0, st1 }"
        );
        assert_eq!(Expression::identifier(9, &info).to_string(), "");
    }

    #[test]
    fn renders_operations() {
        let info = cpu_information();
        let sum = Expression::binary(
            BinaryOperator::Add,
            Expression::identifier(0, &info),
            Expression::bit_vector(32, 1u64),
        );
        assert_eq!(sum.to_string(), "(Id32(eax) + int32(0x1))");
        assert_eq!(sum.bit_size(), 32);

        let negated = Expression::unary(UnaryOperator::Negate, Expression::identifier(1, &info));
        assert_eq!(negated.to_string(), "-(Id32(ebx))");

        let shifted = Expression::binary(
            BinaryOperator::LogicalShiftRight,
            Expression::identifier(0, &info),
            Expression::bit_vector(8, 2u64),
        );
        assert_eq!(shifted.to_string(), "(Id32(eax) >>{u} int8(0x2))");
    }

    #[test]
    fn renders_assignments() {
        let info = cpu_information();
        let clear = Expression::assignment(
            Expression::identifier(0, &info),
            Expression::binary(
                BinaryOperator::Xor,
                Expression::identifier(0, &info),
                Expression::identifier(0, &info),
            ),
        );
        assert_eq!(clear.to_string(), "(Id32(eax) = (Id32(eax) ^ Id32(eax)))");
    }

    #[test]
    fn renders_memory_in_both_forms() {
        let info = cpu_information();
        let load = Expression::memory(
            16,
            Some(Expression::identifier(1, &info)),
            Expression::bit_vector(32, 0x10u64),
            true,
        );
        assert_eq!(load.to_string(), "Mem16(Id32(ebx):int32(0x10))");

        let address_of = load.to_address().unwrap();
        assert_eq!(address_of.to_string(), "Addr16(Id32(ebx):int32(0x10))");

        let plain = Expression::memory(8, None, Expression::bit_vector(32, 0x20u64), true);
        assert_eq!(plain.to_string(), "Mem8(int32(0x20))");
    }

    #[test]
    fn renders_conditionals() {
        let info = cpu_information();
        let if_else = Expression::if_else(
            Comparison::Equal,
            Expression::identifier(2, &info),
            Expression::boolean(true),
            Expression::assignment(
                Expression::identifier(0, &info),
                Expression::bit_vector(32, 1u64),
            ),
            Some(Expression::assignment(
                Expression::identifier(0, &info),
                Expression::bit_vector(32, 2u64),
            )),
        );
        assert_eq!(
            if_else.to_string(),
            "if (Id1(zf) == int1(0x1)) { (Id32(eax) = int32(0x1)) } else { (Id32(eax) = int32(0x2)) }"
        );

        let ternary = Expression::ternary(
            Comparison::UnsignedLess,
            Expression::identifier(0, &info),
            Expression::bit_vector(32, 10u64),
            Expression::bit_vector(32, 1u64),
            Expression::bit_vector(32, 0u64),
        );
        assert_eq!(
            ternary.to_string(),
            "(Id32(eax) u< int32(0xa)) ? (int32(0x1)) : int32(0x0))"
        );

        let countdown = Expression::while_loop(
            Comparison::NotEqual,
            Expression::identifier(1, &info),
            Expression::bit_vector(32, 0u64),
            Expression::assignment(
                Expression::identifier(1, &info),
                Expression::binary(
                    BinaryOperator::Subtract,
                    Expression::identifier(1, &info),
                    Expression::bit_vector(32, 1u64),
                ),
            ),
        );
        assert_eq!(
            countdown.to_string(),
            "while (Id32(ebx) != int32(0x0)) { (Id32(ebx) = (Id32(ebx) - int32(0x1))) }"
        );
    }

    #[test]
    fn renders_compounds_and_markers() {
        let info = cpu_information();
        let bound = Expression::bind(vec![
            Expression::assignment(
                Expression::identifier(0, &info),
                Expression::bit_vector(32, 1u64),
            ),
            Expression::assignment(
                Expression::identifier(1, &info),
                Expression::bit_vector(32, 2u64),
            ),
        ]);
        assert_eq!(
            bound.to_string(),
            "(Id32(eax) = int32(0x1)); (Id32(ebx) = int32(0x2))"
        );

        let scratch = Expression::variable("tmp", VariableAction::Allocate, 32);
        assert_eq!(scratch.to_string(), "Var32[alloc] tmp");

        let marker = Expression::system("dump_insn", Address::new(0, 0x401000));
        assert_eq!(marker.to_string(), "0:0000000000401000 dump_insn");

        let tracked = Expression::track(
            Expression::identifier(0, &info),
            Address::new(0, 0x401000),
            1,
        );
        assert_eq!(
            tracked.to_string(),
            "Trk(0:0000000000401000, 1, Id32(eax))"
        );

        let placeholder = Expression::symbolic(
            SymbolicKind::ReturnValue,
            "malloc",
            Address::new(0, 0x401010),
            None,
        );
        assert_eq!(
            placeholder.to_string(),
            "Sym(retval, \"malloc\", 0:0000000000401010)"
        );
    }
}
