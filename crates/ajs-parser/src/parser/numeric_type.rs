//! Numeric subrange types:
//!
//! ```text
//! use percent as 0 .. 100;
//! use angle as mod 360;
//! ```
//!
//! Both endpoints must share a kind (integer or floating point); an
//! inverted range yields a type accepting only `null` and a warning.

use ajs_common::message::ErrCode;

use crate::node::{NodeFlag, NodeKind, NodeRef};
use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse the part after `use <name> as`. The current token is the
    /// AS keyword when called.
    pub(crate) fn numeric_type(&mut self, name: NodeRef) -> NodeRef {
        let node = self.new_node(NodeKind::Type);
        node.append_child(&name);

        self.get_token();
        if self.kind() == NodeKind::Identifier && self.node.string() == "mod" {
            node.set_flag(NodeFlag::TypeModulo, true);
            self.get_token();

            if self.kind() == NodeKind::Semicolon {
                self.error(
                    ErrCode::BadNumericType,
                    "missing literal number for a numeric type declaration.",
                );
                return node;
            }
            if !matches!(self.kind(), NodeKind::Integer | NodeKind::FloatingPoint) {
                self.error(
                    ErrCode::BadNumericType,
                    "invalid numeric type declaration, the modulo must be a literal number.",
                );
                self.get_token();
                return node;
            }

            // use name as mod 123;
            let modulo = self.node.clone();
            node.append_child(&modulo);
            self.get_token();
            return node;
        }

        let left = match self.signed_number() {
            Some(left) => left,
            None => {
                self.error(
                    ErrCode::BadNumericType,
                    "invalid numeric type declaration, the range must start with a literal number.",
                );
                return node;
            }
        };
        node.append_child(&left);

        // now we expect '..'
        self.get_token();
        if self.kind() != NodeKind::Range {
            self.error(
                ErrCode::BadNumericType,
                format!(
                    "invalid numeric type declaration, the range must use \"..\" to separate the minimum and maximum boundaries (unexpected \"{}\").",
                    self.kind().name()
                ),
            );
            // in case the user put '...' instead of '..'
            if self.kind() == NodeKind::Rest {
                self.get_token();
            }
        } else {
            self.get_token();
        }

        let right = match self.signed_number() {
            Some(right) => right,
            None => {
                self.error(
                    ErrCode::BadNumericType,
                    "invalid numeric type declaration, the range must end with a literal number.",
                );
                if self.kind() != NodeKind::Semicolon {
                    self.get_token();
                }
                return node;
            }
        };
        node.append_child(&right);

        self.get_token();

        // checked after skipping the second number so one error is
        // enough
        if left.kind() != right.kind() {
            self.error(
                ErrCode::BadNumericType,
                "invalid numeric type declaration, the range must use numbers of the same type on both sides.",
            );
        } else if left.kind() == NodeKind::Integer {
            if left.integer() > right.integer() {
                self.warning(
                    ErrCode::BadNumericType,
                    "numeric type declaration is empty (only accepts \"null\") because left value of range is larger than right value.",
                );
            }
        } else if left.floating() > right.floating() {
            self.warning(
                ErrCode::BadNumericType,
                "numeric type declaration is empty (only accepts \"null\") because left value of range is larger than right value.",
            );
        }
        node
    }

    /// Read an optionally signed literal number; the current token is
    /// left on the number.
    fn signed_number(&mut self) -> Option<NodeRef> {
        let mut sign = 1;
        if self.kind() == NodeKind::Add {
            self.get_token();
        } else if self.kind() == NodeKind::Subtract {
            sign = -1;
            self.get_token();
        }
        match self.kind() {
            NodeKind::Integer => {
                let number = self.node.clone();
                number.set_integer(number.integer() * sign);
                Some(number)
            }
            NodeKind::FloatingPoint => {
                let number = self.node.clone();
                number.set_floating(number.floating() * sign as f64);
                Some(number)
            }
            _ => None,
        }
    }
}
