//! This module contains the visitor over the semantic representation.
//!
//! A visitor is a rewrite pass: each hook returns `Some` replacement for
//! the node it was handed, or `None` to keep it. The default hooks descend
//! into the children and rebuild a node only when one of its children was
//! replaced, so a visitor only needs to override the variants it cares
//! about.

use std::rc::Rc;

use crate::{
    address::Address,
    arch::{CpuInformation, RegisterId},
    expression::{
        BinaryOperator, Comparison, Condition, Expression, SymbolicKind, UnaryOperator,
        VariableAction,
    },
    value::BitVector,
};

impl Expression {
    /// Hands the node to `visitor`, returning its replacement, or [`None`]
    /// when the visitor leaves the node in place.
    pub fn visit<V>(&self, visitor: &mut V) -> Option<Expression>
    where
        V: ExpressionVisitor + ?Sized,
    {
        visitor.visit(self)
    }

    /// Rewrites the tree through `visitor`, returning the (possibly
    /// unchanged) result as an owned tree.
    #[must_use]
    pub fn rewritten<V>(&self, visitor: &mut V) -> Expression
    where
        V: ExpressionVisitor + ?Sized,
    {
        self.visit(visitor).unwrap_or_else(|| self.clone())
    }
}

/// The rewrite-pass visitor over expressions.
///
/// Every hook returns `Some` to replace the node it was handed and `None`
/// to keep it. The composite-node defaults recurse into children through
/// [`Self::visit`], so overriding a leaf hook is enough to rewrite that
/// leaf everywhere in a tree.
#[allow(unused_variables)] // The default hooks deliberately ignore their inputs.
pub trait ExpressionVisitor {
    /// Dispatches the node to the hook matching its variant.
    fn visit(&mut self, expression: &Expression) -> Option<Expression> {
        match expression {
            Expression::BitVector(value) => self.visit_bit_vector(value),
            Expression::Identifier {
                id,
                cpu_information,
            } => self.visit_identifier(*id, cpu_information),
            Expression::VectorIdentifier {
                ids,
                cpu_information,
            } => self.visit_vector_identifier(ids, cpu_information),
            Expression::Memory {
                access_bits,
                base,
                offset,
                dereference,
            } => self.visit_memory(*access_bits, base.as_deref(), offset, *dereference),
            Expression::Unary { operator, operand } => self.visit_unary(*operator, operand),
            Expression::Binary {
                operator,
                left,
                right,
            } => self.visit_binary(*operator, left, right),
            Expression::Assignment {
                destination,
                source,
            } => self.visit_assignment(destination, source),
            Expression::Ternary {
                condition,
                when_true,
                when_false,
            } => self.visit_ternary(condition, when_true, when_false),
            Expression::IfElse {
                condition,
                then_expr,
                else_expr,
            } => self.visit_if_else(condition, then_expr, else_expr.as_deref()),
            Expression::While { condition, body } => self.visit_while(condition, body),
            Expression::Bind { expressions } => self.visit_bind(expressions),
            Expression::Variable { name, action, bits } => {
                self.visit_variable(name, *action, *bits)
            }
            Expression::Track {
                tracked,
                address,
                position,
            } => self.visit_track(tracked, *address, *position),
            Expression::Symbolic {
                kind,
                label,
                address,
                expression,
            } => self.visit_symbolic(*kind, label, *address, expression.as_deref()),
            Expression::System { name, address } => self.visit_system(name, *address),
        }
    }

    fn visit_bit_vector(&mut self, value: &BitVector) -> Option<Expression> {
        None
    }

    fn visit_identifier(
        &mut self,
        id: RegisterId,
        cpu_information: &Rc<CpuInformation>,
    ) -> Option<Expression> {
        None
    }

    fn visit_vector_identifier(
        &mut self,
        ids: &[RegisterId],
        cpu_information: &Rc<CpuInformation>,
    ) -> Option<Expression> {
        None
    }

    fn visit_variable(
        &mut self,
        name: &str,
        action: VariableAction,
        bits: u16,
    ) -> Option<Expression> {
        None
    }

    fn visit_system(&mut self, name: &str, address: Address) -> Option<Expression> {
        None
    }

    fn visit_memory(
        &mut self,
        access_bits: u16,
        base: Option<&Expression>,
        offset: &Expression,
        dereference: bool,
    ) -> Option<Expression> {
        let new_base = base.map(|base| (self.visit(base), base));
        let new_offset = self.visit(offset);
        let base_changed = new_base.as_ref().is_some_and(|(new, _)| new.is_some());
        if new_offset.is_none() && !base_changed {
            return None;
        }
        Some(Expression::memory(
            access_bits,
            new_base.map(|(new, old)| new.unwrap_or_else(|| old.clone())),
            new_offset.unwrap_or_else(|| offset.clone()),
            dereference,
        ))
    }

    fn visit_unary(&mut self, operator: UnaryOperator, operand: &Expression) -> Option<Expression> {
        self.visit(operand)
            .map(|operand| Expression::unary(operator, operand))
    }

    fn visit_binary(
        &mut self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Option<Expression> {
        let new_left = self.visit(left);
        let new_right = self.visit(right);
        if new_left.is_none() && new_right.is_none() {
            return None;
        }
        Some(Expression::binary(
            operator,
            new_left.unwrap_or_else(|| left.clone()),
            new_right.unwrap_or_else(|| right.clone()),
        ))
    }

    fn visit_assignment(
        &mut self,
        destination: &Expression,
        source: &Expression,
    ) -> Option<Expression> {
        let new_destination = self.visit(destination);
        let new_source = self.visit(source);
        if new_destination.is_none() && new_source.is_none() {
            return None;
        }
        Some(Expression::assignment(
            new_destination.unwrap_or_else(|| destination.clone()),
            new_source.unwrap_or_else(|| source.clone()),
        ))
    }

    fn visit_ternary(
        &mut self,
        condition: &Condition,
        when_true: &Expression,
        when_false: &Expression,
    ) -> Option<Expression> {
        let (comparison, new_condition) = self.visit_condition(condition);
        let new_true = self.visit(when_true);
        let new_false = self.visit(when_false);
        if new_condition.is_none() && new_true.is_none() && new_false.is_none() {
            return None;
        }
        let (reference, test) = new_condition.unwrap_or_else(|| {
            (
                condition.reference.as_ref().clone(),
                condition.test.as_ref().clone(),
            )
        });
        Some(Expression::ternary(
            comparison,
            reference,
            test,
            new_true.unwrap_or_else(|| when_true.clone()),
            new_false.unwrap_or_else(|| when_false.clone()),
        ))
    }

    fn visit_if_else(
        &mut self,
        condition: &Condition,
        then_expr: &Expression,
        else_expr: Option<&Expression>,
    ) -> Option<Expression> {
        let (comparison, new_condition) = self.visit_condition(condition);
        let new_then = self.visit(then_expr);
        let new_else = else_expr.map(|else_expr| (self.visit(else_expr), else_expr));
        let else_changed = new_else.as_ref().is_some_and(|(new, _)| new.is_some());
        if new_condition.is_none() && new_then.is_none() && !else_changed {
            return None;
        }
        let (reference, test) = new_condition.unwrap_or_else(|| {
            (
                condition.reference.as_ref().clone(),
                condition.test.as_ref().clone(),
            )
        });
        Some(Expression::if_else(
            comparison,
            reference,
            test,
            new_then.unwrap_or_else(|| then_expr.clone()),
            new_else.map(|(new, old)| new.unwrap_or_else(|| old.clone())),
        ))
    }

    fn visit_while(&mut self, condition: &Condition, body: &Expression) -> Option<Expression> {
        let (comparison, new_condition) = self.visit_condition(condition);
        let new_body = self.visit(body);
        if new_condition.is_none() && new_body.is_none() {
            return None;
        }
        let (reference, test) = new_condition.unwrap_or_else(|| {
            (
                condition.reference.as_ref().clone(),
                condition.test.as_ref().clone(),
            )
        });
        Some(Expression::while_loop(
            comparison,
            reference,
            test,
            new_body.unwrap_or_else(|| body.clone()),
        ))
    }

    fn visit_bind(&mut self, expressions: &[Expression]) -> Option<Expression> {
        let visited: Vec<Option<Expression>> =
            expressions.iter().map(|expression| self.visit(expression)).collect();
        if visited.iter().all(Option::is_none) {
            return None;
        }
        let rebuilt: Vec<Expression> = visited
            .into_iter()
            .zip(expressions)
            .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
            .collect();
        Some(Expression::bind(rebuilt))
    }

    fn visit_track(
        &mut self,
        tracked: &Expression,
        address: Address,
        position: u8,
    ) -> Option<Expression> {
        self.visit(tracked)
            .map(|tracked| Expression::track(tracked, address, position))
    }

    fn visit_symbolic(
        &mut self,
        kind: SymbolicKind,
        label: &str,
        address: Address,
        expression: Option<&Expression>,
    ) -> Option<Expression> {
        let new_expression = expression.map(|expression| (self.visit(expression), expression));
        let changed = new_expression.as_ref().is_some_and(|(new, _)| new.is_some());
        if !changed {
            return None;
        }
        Some(Expression::symbolic(
            kind,
            label,
            address,
            new_expression.map(|(new, old)| new.unwrap_or_else(|| old.clone())),
        ))
    }

    /// Visits the two children of a condition, returning the comparison and
    /// the rebuilt `(reference, test)` pair when either child was replaced.
    fn visit_condition(
        &mut self,
        condition: &Condition,
    ) -> (Comparison, Option<(Expression, Expression)>) {
        let new_reference = self.visit(&condition.reference);
        let new_test = self.visit(&condition.test);
        if new_reference.is_none() && new_test.is_none() {
            return (condition.comparison, None);
        }
        let rebuilt = (
            new_reference.unwrap_or_else(|| condition.reference.as_ref().clone()),
            new_test.unwrap_or_else(|| condition.test.as_ref().clone()),
        );
        (condition.comparison, Some(rebuilt))
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use crate::{
        arch::{CpuInformation, RegisterId},
        expression::{
            visitor::ExpressionVisitor, BinaryOperator, Comparison, Equivalence, Expression,
        },
    };

    fn cpu_information() -> Rc<CpuInformation> {
        CpuInformation::builder()
            .with_register(0, "eax", 32)
            .with_register(1, "ebx", 32)
            .build()
            .in_rc()
    }

    /// A pass that renames one register to another everywhere it appears.
    struct RenameRegister {
        from: RegisterId,
        to: RegisterId,
        replaced: usize,
    }

    impl ExpressionVisitor for RenameRegister {
        fn visit_identifier(
            &mut self,
            id: RegisterId,
            cpu_information: &Rc<CpuInformation>,
        ) -> Option<Expression> {
            (id == self.from).then(|| {
                self.replaced += 1;
                Expression::identifier(self.to, cpu_information)
            })
        }
    }

    #[test]
    fn rewrites_leaves_throughout_the_tree() {
        let info = cpu_information();
        let tree = Expression::if_else(
            Comparison::NotEqual,
            Expression::identifier(0, &info),
            Expression::bit_vector(32, 0u64),
            Expression::assignment(
                Expression::identifier(0, &info),
                Expression::binary(
                    BinaryOperator::Add,
                    Expression::identifier(0, &info),
                    Expression::bit_vector(32, 1u64),
                ),
            ),
            None,
        );

        let mut pass = RenameRegister {
            from: 0,
            to: 1,
            replaced: 0,
        };
        let rewritten = tree.rewritten(&mut pass);

        assert_eq!(pass.replaced, 3);
        assert_eq!(
            rewritten.to_string(),
            "if (Id32(ebx) != int32(0x0)) { (Id32(ebx) = (Id32(ebx) + int32(0x1))) }"
        );
        assert_eq!(rewritten.node_count(), tree.node_count());
    }

    /// The identity visitor, which replaces nothing.
    struct Identity;
    impl ExpressionVisitor for Identity {}

    #[test]
    fn the_default_visitor_keeps_the_tree() {
        let info = cpu_information();
        let tree = Expression::assignment(
            Expression::identifier(0, &info),
            Expression::binary(
                BinaryOperator::Xor,
                Expression::identifier(0, &info),
                Expression::identifier(1, &info),
            ),
        );

        assert!(tree.visit(&mut Identity).is_none());
        assert_eq!(tree.rewritten(&mut Identity).compare(&tree), Equivalence::Identical);
    }
}
