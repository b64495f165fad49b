//! Constant folding.
//!
//! The subset of the optimizer the resolver depends on: expressions
//! over literals are reduced in place so constant variables can be
//! propagated to their use sites and attribute expressions can be
//! evaluated down to `true`/`false`. Nodes are rewritten in place (the
//! kind and payload change, the handle stays valid) because the
//! resolver keeps references to the expressions it folds.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{NodeKind, NodeRef};

/// Fold `node` and everything below it, in place.
pub fn optimize(node: &NodeRef) {
    for idx in 0..node.children_count() {
        optimize(&node.child(idx));
    }
    fold_one(node);
}

/// Evaluate an expression expected to reduce to a boolean. Returns
/// `None` when the expression does not fold to `true` or `false`.
pub fn evaluate_to_bool(node: &NodeRef) -> Option<bool> {
    optimize(node);
    match node.kind() {
        NodeKind::True => Some(true),
        NodeKind::False => Some(false),
        _ => None,
    }
}

/// Numeric value of a literal, when the node is one.
fn literal_number(node: &NodeRef) -> Option<f64> {
    match node.kind() {
        NodeKind::Integer => Some(node.integer() as f64),
        NodeKind::FloatingPoint => Some(node.floating()),
        _ => None,
    }
}

fn literal_bool(node: &NodeRef) -> Option<bool> {
    match node.kind() {
        NodeKind::True => Some(true),
        NodeKind::False => Some(false),
        _ => None,
    }
}

fn both_integers(left: &NodeRef, right: &NodeRef) -> bool {
    left.kind() == NodeKind::Integer && right.kind() == NodeKind::Integer
}

fn to_integer(node: &NodeRef, value: i64) {
    node.to_literal(NodeKind::Integer);
    node.set_integer(value);
}

fn to_floating(node: &NodeRef, value: f64) {
    node.to_literal(NodeKind::FloatingPoint);
    node.set_floating(value);
}

fn to_bool(node: &NodeRef, value: bool) {
    node.to_literal(if value { NodeKind::True } else { NodeKind::False });
}

fn to_string(node: &NodeRef, value: String) {
    node.to_literal(NodeKind::String);
    node.set_string(value);
}

fn fold_one(node: &NodeRef) {
    match node.children_count() {
        1 => fold_unary(node),
        2 => fold_binary(node),
        3 => fold_conditional(node),
        _ => {}
    }
}

fn fold_unary(node: &NodeRef) {
    let operand = node.child(0);
    match node.kind() {
        NodeKind::Add => match operand.kind() {
            NodeKind::Integer => to_integer(node, operand.integer()),
            NodeKind::FloatingPoint => to_floating(node, operand.floating()),
            _ => {}
        },
        NodeKind::Subtract => match operand.kind() {
            NodeKind::Integer => to_integer(node, -operand.integer()),
            NodeKind::FloatingPoint => to_floating(node, -operand.floating()),
            _ => {}
        },
        NodeKind::BitwiseNot => {
            if operand.kind() == NodeKind::Integer {
                // JavaScript semantics: a 32 bit conversion applies
                to_integer(node, !(operand.integer() as i32) as i64);
            }
        }
        NodeKind::LogicalNot => {
            if let Some(value) = literal_bool(&operand) {
                to_bool(node, !value);
            }
        }
        _ => {}
    }
}

fn fold_binary(node: &NodeRef) {
    let left = node.child(0);
    let right = node.child(1);

    // string concatenation
    if node.kind() == NodeKind::Add
        && left.kind() == NodeKind::String
        && right.kind() == NodeKind::String
    {
        to_string(node, format!("{}{}", left.string(), right.string()));
        return;
    }

    // boolean algebra
    if let (Some(l), Some(r)) = (literal_bool(&left), literal_bool(&right)) {
        match node.kind() {
            NodeKind::LogicalAnd => to_bool(node, l && r),
            NodeKind::LogicalOr => to_bool(node, l || r),
            NodeKind::LogicalXor => to_bool(node, l != r),
            NodeKind::Equal | NodeKind::StrictlyEqual => to_bool(node, l == r),
            NodeKind::NotEqual | NodeKind::StrictlyNotEqual => to_bool(node, l != r),
            _ => {}
        }
        return;
    }

    // integer arithmetic stays integer
    if both_integers(&left, &right) {
        let l = left.integer();
        let r = right.integer();
        match node.kind() {
            NodeKind::Add => to_integer(node, l.wrapping_add(r)),
            NodeKind::Subtract => to_integer(node, l.wrapping_sub(r)),
            NodeKind::Multiply => to_integer(node, l.wrapping_mul(r)),
            NodeKind::Divide => {
                if r == 0 {
                    message::error(
                        ErrCode::DivideByZero,
                        &node.position(),
                        "dividing by zero is illegal.",
                    );
                } else {
                    to_integer(node, l / r);
                }
            }
            NodeKind::Modulo => {
                if r == 0 {
                    message::error(
                        ErrCode::DivideByZero,
                        &node.position(),
                        "modulo by zero is illegal.",
                    );
                } else {
                    to_integer(node, l % r);
                }
            }
            NodeKind::Power => {
                if (0..=u32::MAX as i64).contains(&r) {
                    to_integer(node, l.wrapping_pow(r as u32));
                } else {
                    to_floating(node, (l as f64).powf(r as f64));
                }
            }
            NodeKind::Minimum => to_integer(node, l.min(r)),
            NodeKind::Maximum => to_integer(node, l.max(r)),
            NodeKind::BitwiseAnd => to_integer(node, l & r),
            NodeKind::BitwiseOr => to_integer(node, l | r),
            NodeKind::BitwiseXor => to_integer(node, l ^ r),
            NodeKind::ShiftLeft => to_integer(node, ((l as i32) << (r & 31)) as i64),
            NodeKind::ShiftRight => to_integer(node, ((l as i32) >> (r & 31)) as i64),
            NodeKind::ShiftRightUnsigned => {
                to_integer(node, ((l as u32) >> (r & 31)) as i64)
            }
            NodeKind::RotateLeft => {
                to_integer(node, (l as u32).rotate_left((r & 31) as u32) as i64)
            }
            NodeKind::RotateRight => {
                to_integer(node, (l as u32).rotate_right((r & 31) as u32) as i64)
            }
            NodeKind::Less => to_bool(node, l < r),
            NodeKind::LessEqual => to_bool(node, l <= r),
            NodeKind::Greater => to_bool(node, l > r),
            NodeKind::GreaterEqual => to_bool(node, l >= r),
            NodeKind::Equal | NodeKind::StrictlyEqual => to_bool(node, l == r),
            NodeKind::NotEqual | NodeKind::StrictlyNotEqual => to_bool(node, l != r),
            NodeKind::Compare => to_integer(node, l.cmp(&r) as i64),
            _ => {}
        }
        return;
    }

    // mixed numeric expressions fold as floating point
    if let (Some(l), Some(r)) = (literal_number(&left), literal_number(&right)) {
        match node.kind() {
            NodeKind::Add => to_floating(node, l + r),
            NodeKind::Subtract => to_floating(node, l - r),
            NodeKind::Multiply => to_floating(node, l * r),
            NodeKind::Divide => to_floating(node, l / r),
            NodeKind::Modulo => to_floating(node, l % r),
            NodeKind::Power => to_floating(node, l.powf(r)),
            NodeKind::Minimum => to_floating(node, l.min(r)),
            NodeKind::Maximum => to_floating(node, l.max(r)),
            NodeKind::Less => to_bool(node, l < r),
            NodeKind::LessEqual => to_bool(node, l <= r),
            NodeKind::Greater => to_bool(node, l > r),
            NodeKind::GreaterEqual => to_bool(node, l >= r),
            NodeKind::Equal => to_bool(node, l == r),
            NodeKind::NotEqual => to_bool(node, l != r),
            _ => {}
        }
    }
}

fn fold_conditional(node: &NodeRef) {
    if node.kind() != NodeKind::Conditional {
        return;
    }
    if let Some(selector) = literal_bool(&node.child(0)) {
        let branch = if selector { node.child(1) } else { node.child(2) };
        // only literal branches fold; anything else may carry
        // references which must stay in place
        match branch.kind() {
            NodeKind::Integer => to_integer(node, branch.integer()),
            NodeKind::FloatingPoint => to_floating(node, branch.floating()),
            NodeKind::String => to_string(node, branch.string()),
            NodeKind::True | NodeKind::False => {
                node.to_literal(branch.kind());
            }
            NodeKind::Null | NodeKind::Undefined => {
                node.to_literal(branch.kind());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ajs_common::position::Position;

    fn integer(value: i64) -> NodeRef {
        let node = NodeRef::new(NodeKind::Integer, Position::new());
        node.set_integer(value);
        node
    }

    fn binary(kind: NodeKind, left: NodeRef, right: NodeRef) -> NodeRef {
        let operator = NodeRef::new(kind, Position::new());
        operator.append_child(&left);
        operator.append_child(&right);
        operator
    }

    #[test]
    fn integer_addition_folds_in_place() {
        let op = binary(NodeKind::Add, integer(3), integer(4));
        optimize(&op);
        assert_eq!(op.kind(), NodeKind::Integer);
        assert_eq!(op.integer(), 7);
        assert_eq!(op.children_count(), 0);
    }

    #[test]
    fn nested_expressions_fold_bottom_up() {
        // (1 + 2) * 5
        let add = binary(NodeKind::Add, integer(1), integer(2));
        let mul = binary(NodeKind::Multiply, add, integer(5));
        optimize(&mul);
        assert_eq!(mul.integer(), 15);
    }

    #[test]
    fn division_by_zero_is_reported_not_folded() {
        let op = binary(NodeKind::Divide, integer(1), integer(0));
        optimize(&op);
        assert_eq!(op.kind(), NodeKind::Divide);
    }

    #[test]
    fn comparisons_fold_to_booleans() {
        let op = binary(NodeKind::Less, integer(1), integer(2));
        optimize(&op);
        assert_eq!(op.kind(), NodeKind::True);
        assert_eq!(evaluate_to_bool(&op), Some(true));
    }

    #[test]
    fn string_concatenation() {
        let left = NodeRef::new(NodeKind::String, Position::new());
        left.set_string("ab");
        let right = NodeRef::new(NodeKind::String, Position::new());
        right.set_string("cd");
        let op = binary(NodeKind::Add, left, right);
        optimize(&op);
        assert_eq!(op.kind(), NodeKind::String);
        assert_eq!(op.string(), "abcd");
    }

    #[test]
    fn mixed_arithmetic_folds_to_floating_point() {
        let float = NodeRef::new(NodeKind::FloatingPoint, Position::new());
        float.set_floating(0.5);
        let op = binary(NodeKind::Add, integer(1), float);
        optimize(&op);
        assert_eq!(op.kind(), NodeKind::FloatingPoint);
        assert_eq!(op.floating(), 1.5);
    }

    #[test]
    fn unary_minus_folds() {
        let negate = NodeRef::new(NodeKind::Subtract, Position::new());
        negate.append_child(&integer(9));
        optimize(&negate);
        assert_eq!(negate.integer(), -9);
    }

    #[test]
    fn conditional_with_literal_selector() {
        let conditional = NodeRef::new(NodeKind::Conditional, Position::new());
        conditional.append_child(&NodeRef::new(NodeKind::True, Position::new()));
        conditional.append_child(&integer(10));
        conditional.append_child(&integer(20));
        optimize(&conditional);
        assert_eq!(conditional.integer(), 10);
    }

    #[test]
    fn dynamic_expressions_stay_untouched() {
        let id = NodeRef::new(NodeKind::Identifier, Position::new());
        id.set_string("x");
        let op = binary(NodeKind::Add, id, integer(1));
        optimize(&op);
        assert_eq!(op.kind(), NodeKind::Add);
    }
}
