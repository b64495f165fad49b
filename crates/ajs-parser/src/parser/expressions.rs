//! Expression parsing: a precedence climb from comma lists down to
//! primary expressions. `power` is right associative, everything else
//! associates left.

use ajs_common::message::ErrCode;
use ajs_common::options::CompilerOption;

use crate::node::{NodeKind, NodeRef};
use crate::parser::Parser;

impl<'src> Parser<'src> {
    pub(crate) fn expression(&mut self) -> NodeRef {
        self.list_expression(false, false)
    }

    /// Comma expression. With `rest` set, `...` and `name: value`
    /// entries are accepted (function call arguments); with `empty`
    /// set, holes are accepted (array literals).
    pub(crate) fn list_expression(&mut self, rest: bool, empty: bool) -> NodeRef {
        let mut has_rest = 0;
        let first = if empty && self.kind() == NodeKind::Comma {
            self.new_node(NodeKind::Empty)
        } else if rest && self.kind() == NodeKind::Rest {
            // `...` forwards the caller's own rest arguments
            let node = self.new_node(NodeKind::Rest);
            self.get_token();
            has_rest = 1;
            node
        } else if rest && self.kind() == NodeKind::Identifier {
            // `identifier :` introduces a named argument
            let save = self.node.clone();
            self.get_token();
            if self.kind() == NodeKind::Colon {
                self.get_token();
                let name = self.new_node(NodeKind::Name);
                name.set_string(save.string());
                if self.kind() == NodeKind::Rest {
                    let rest_of_args = self.new_node(NodeKind::Rest);
                    name.append_child(&rest_of_args);
                    self.get_token();
                    has_rest = 1;
                } else {
                    let value = self.assignment_expression();
                    name.append_child(&value);
                }
                name
            } else {
                let current = self.node.clone();
                self.unget_token(current);
                self.node = save;
                self.assignment_expression()
            }
        } else {
            self.assignment_expression()
        };

        if self.kind() != NodeKind::Comma {
            return first;
        }

        let list = self.new_node(NodeKind::List);
        list.append_child(&first);

        while self.kind() == NodeKind::Comma {
            self.get_token();
            if has_rest == 1 {
                self.error(
                    ErrCode::InvalidRest,
                    "'...' was expected to be the last expression in this function call.",
                );
                has_rest = 2;
            }
            if empty && self.kind() == NodeKind::Comma {
                let hole = self.new_node(NodeKind::Empty);
                list.append_child(&hole);
            } else if empty && self.kind() == NodeKind::CloseSquareBracket {
                let hole = self.new_node(NodeKind::Empty);
                list.append_child(&hole);
            } else if rest && self.kind() == NodeKind::Rest {
                let rest_node = self.new_node(NodeKind::Rest);
                list.append_child(&rest_node);
                self.get_token();
                if has_rest == 0 {
                    has_rest = 1;
                }
            } else if rest && self.kind() == NodeKind::Identifier {
                let save = self.node.clone();
                self.get_token();
                if self.kind() == NodeKind::Colon {
                    self.get_token();
                    let item = self.new_node(NodeKind::Name);
                    item.set_string(save.string());
                    if self.kind() == NodeKind::Rest {
                        let rest_of_args = self.new_node(NodeKind::Rest);
                        item.append_child(&rest_of_args);
                        self.get_token();
                        if has_rest == 0 {
                            has_rest = 1;
                        }
                    } else {
                        let value = self.assignment_expression();
                        item.append_child(&value);
                    }
                    list.append_child(&item);
                } else {
                    let current = self.node.clone();
                    self.unget_token(current);
                    self.node = save;
                    let item = self.assignment_expression();
                    list.append_child(&item);
                }
            } else {
                let item = self.assignment_expression();
                list.append_child(&item);
            }
        }

        list
    }

    pub(crate) fn assignment_expression(&mut self) -> NodeRef {
        let left = self.conditional_expression(true);

        match self.kind() {
            NodeKind::Assignment
            | NodeKind::AssignmentAdd
            | NodeKind::AssignmentBitwiseAnd
            | NodeKind::AssignmentBitwiseOr
            | NodeKind::AssignmentBitwiseXor
            | NodeKind::AssignmentDivide
            | NodeKind::AssignmentLogicalAnd
            | NodeKind::AssignmentLogicalOr
            | NodeKind::AssignmentModulo
            | NodeKind::AssignmentMultiply
            | NodeKind::AssignmentShiftLeft
            | NodeKind::AssignmentShiftRight
            | NodeKind::AssignmentShiftRightUnsigned
            | NodeKind::AssignmentSubtract => {}

            NodeKind::AssignmentLogicalXor
            | NodeKind::AssignmentMaximum
            | NodeKind::AssignmentMinimum
            | NodeKind::AssignmentPower
            | NodeKind::AssignmentRotateLeft
            | NodeKind::AssignmentRotateRight => {
                if !self.has_option_set(CompilerOption::ExtendedOperators) {
                    self.error(
                        ErrCode::NotAllowed,
                        format!(
                            "the '{}' operator is only available when extended operators are authorized (use extended_operators;).",
                            self.kind().name()
                        ),
                    );
                }
            }

            _ => return left,
        }

        let operator = self.node.clone();
        self.get_token();
        let right = self.assignment_expression();
        operator.append_child(&left);
        operator.append_child(&right);
        operator
    }

    pub(crate) fn conditional_expression(&mut self, assignment: bool) -> NodeRef {
        let condition = self.min_max_expression();

        if self.kind() != NodeKind::Conditional {
            return condition;
        }
        let conditional = self.node.clone();
        conditional.append_child(&condition);

        self.get_token();
        // not like C/C++: no list expression inside the '?'
        let left = if assignment {
            self.assignment_expression()
        } else {
            self.conditional_expression(false)
        };
        conditional.append_child(&left);

        if self.kind() == NodeKind::Colon {
            self.get_token();
            let right = if assignment {
                self.assignment_expression()
            } else {
                self.conditional_expression(false)
            };
            conditional.append_child(&right);
        } else {
            self.error(
                ErrCode::InvalidConditional,
                "invalid use of the conditional operator, ':' was expected.",
            );
        }
        conditional
    }

    fn min_max_expression(&mut self) -> NodeRef {
        let left = self.logical_or_expression();

        if self.kind() == NodeKind::Minimum || self.kind() == NodeKind::Maximum {
            if !self.has_option_set(CompilerOption::ExtendedOperators) {
                self.error(
                    ErrCode::NotAllowed,
                    format!(
                        "the '{}' operator is only available when extended operators are authorized (use extended_operators;).",
                        self.kind().name()
                    ),
                );
            }
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.logical_or_expression();
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn logical_or_expression(&mut self) -> NodeRef {
        let left = self.logical_xor_expression();
        if self.kind() == NodeKind::LogicalOr {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.logical_xor_expression();
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn logical_xor_expression(&mut self) -> NodeRef {
        let left = self.logical_and_expression();
        if self.kind() == NodeKind::LogicalXor {
            if !self.has_option_set(CompilerOption::ExtendedOperators) {
                self.error(
                    ErrCode::NotAllowed,
                    "the '^^' operator is only available when extended operators are authorized (use extended_operators;).",
                );
            }
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.logical_and_expression();
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn logical_and_expression(&mut self) -> NodeRef {
        let left = self.bitwise_or_expression();
        if self.kind() == NodeKind::LogicalAnd {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.bitwise_or_expression();
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn bitwise_or_expression(&mut self) -> NodeRef {
        let left = self.bitwise_xor_expression();
        if self.kind() == NodeKind::BitwiseOr {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.bitwise_xor_expression();
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn bitwise_xor_expression(&mut self) -> NodeRef {
        let left = self.bitwise_and_expression();
        if self.kind() == NodeKind::BitwiseXor {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.bitwise_and_expression();
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn bitwise_and_expression(&mut self) -> NodeRef {
        let left = self.equality_expression();
        if self.kind() == NodeKind::BitwiseAnd {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.equality_expression();
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn equality_expression(&mut self) -> NodeRef {
        let mut left = self.relational_expression();

        loop {
            let kind = self.kind();
            if !matches!(
                kind,
                NodeKind::Equal
                    | NodeKind::NotEqual
                    | NodeKind::StrictlyEqual
                    | NodeKind::StrictlyNotEqual
                    | NodeKind::Compare
                    | NodeKind::SmartMatch
            ) {
                return left;
            }
            if matches!(kind, NodeKind::Compare | NodeKind::SmartMatch)
                && !self.has_option_set(CompilerOption::ExtendedOperators)
            {
                self.error(
                    ErrCode::NotAllowed,
                    format!(
                        "the '{}' operator is only available when extended operators are authorized (use extended_operators;).",
                        kind.name()
                    ),
                );
            }
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.relational_expression();
            operator.append_child(&right);
            left = operator;
        }
    }

    fn relational_expression(&mut self) -> NodeRef {
        let mut left = self.shift_expression();

        while matches!(
            self.kind(),
            NodeKind::Less
                | NodeKind::Greater
                | NodeKind::LessEqual
                | NodeKind::GreaterEqual
                | NodeKind::Is
                | NodeKind::As
                | NodeKind::In
                | NodeKind::Instanceof
        ) {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.shift_expression();
            operator.append_child(&right);

            // `x in min .. max` accepts an optional range
            if operator.kind() == NodeKind::In
                && matches!(self.kind(), NodeKind::Range | NodeKind::Rest)
            {
                if !self.has_option_set(CompilerOption::ExtendedOperators) {
                    self.error(
                        ErrCode::NotAllowed,
                        "the 'x in min .. max' operator is only available when extended operators are authorized (use extended_operators;).",
                    );
                }
                self.get_token();
                let end = self.shift_expression();
                operator.append_child(&end);
            }
            left = operator;
        }
        left
    }

    fn shift_expression(&mut self) -> NodeRef {
        let mut left = self.additive_expression();

        loop {
            let kind = self.kind();
            if !matches!(
                kind,
                NodeKind::ShiftLeft
                    | NodeKind::ShiftRight
                    | NodeKind::ShiftRightUnsigned
                    | NodeKind::RotateLeft
                    | NodeKind::RotateRight
            ) {
                return left;
            }
            if matches!(kind, NodeKind::RotateLeft | NodeKind::RotateRight)
                && !self.has_option_set(CompilerOption::ExtendedOperators)
            {
                self.error(
                    ErrCode::NotAllowed,
                    format!(
                        "the '{}' operator is only available when extended operators are authorized (use extended_operators;).",
                        kind.name()
                    ),
                );
            }
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.additive_expression();
            operator.append_child(&right);
            left = operator;
        }
    }

    fn additive_expression(&mut self) -> NodeRef {
        let mut left = self.multiplicative_expression();
        while matches!(self.kind(), NodeKind::Add | NodeKind::Subtract) {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.multiplicative_expression();
            operator.append_child(&right);
            left = operator;
        }
        left
    }

    fn multiplicative_expression(&mut self) -> NodeRef {
        let mut left = self.match_expression();
        while matches!(
            self.kind(),
            NodeKind::Multiply | NodeKind::Divide | NodeKind::Modulo
        ) {
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.match_expression();
            operator.append_child(&right);
            left = operator;
        }
        left
    }

    fn match_expression(&mut self) -> NodeRef {
        let mut left = self.power_expression();
        while matches!(self.kind(), NodeKind::Match | NodeKind::NotMatch) {
            if !self.has_option_set(CompilerOption::ExtendedOperators) {
                self.error(
                    ErrCode::NotAllowed,
                    format!(
                        "the '{}' operator is only available when extended operators are authorized (use extended_operators;).",
                        self.kind().name()
                    ),
                );
            }
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.power_expression();
            operator.append_child(&right);
            left = operator;
        }
        left
    }

    fn power_expression(&mut self) -> NodeRef {
        let left = self.unary_expression();
        if self.kind() == NodeKind::Power {
            if !self.has_option_set(CompilerOption::ExtendedOperators) {
                self.error(
                    ErrCode::NotAllowed,
                    "the '**' operator is only available when extended operators are authorized (use extended_operators;).",
                );
            }
            let operator = self.node.clone();
            operator.append_child(&left);
            self.get_token();
            let right = self.power_expression(); // right to left
            operator.append_child(&right);
            return operator;
        }
        left
    }

    fn unary_expression(&mut self) -> NodeRef {
        match self.kind() {
            NodeKind::Delete | NodeKind::Increment | NodeKind::Decrement => {
                let operator = self.node.clone();
                self.get_token();
                let postfix = self.postfix_expression();
                operator.append_child(&postfix);
                operator
            }

            NodeKind::Void
            | NodeKind::Typeof
            | NodeKind::Add
            | NodeKind::Subtract
            | NodeKind::BitwiseNot
            | NodeKind::LogicalNot => {
                let operator = self.node.clone();
                self.get_token();
                let unary = self.unary_expression();
                operator.append_child(&unary);
                operator
            }

            NodeKind::SmartMatch => {
                // a unary `~~` can only mean two bitwise not in a row;
                // do not collapse them, the double conversion to a
                // 32 bit integer is visible at run time
                let outer = self.new_node(NodeKind::BitwiseNot);
                let inner = self.new_node(NodeKind::BitwiseNot);
                outer.append_child(&inner);
                self.get_token();
                let unary = self.unary_expression();
                inner.append_child(&unary);
                outer
            }

            NodeKind::NotMatch => {
                // same for a unary `!~`: a logical not of a bitwise not
                let outer = self.new_node(NodeKind::LogicalNot);
                let inner = self.new_node(NodeKind::BitwiseNot);
                outer.append_child(&inner);
                self.get_token();
                let unary = self.unary_expression();
                inner.append_child(&unary);
                outer
            }

            _ => self.postfix_expression(),
        }
    }

    pub(crate) fn postfix_expression(&mut self) -> NodeRef {
        let mut expr = self.primary_expression();

        loop {
            match self.kind() {
                NodeKind::Member => {
                    let member = self.node.clone();
                    member.append_child(&expr);
                    self.get_token();
                    let right = self.primary_expression();
                    member.append_child(&right);
                    expr = member;
                }

                NodeKind::Scope => {
                    if !self.has_option_set(CompilerOption::ExtendedOperators) {
                        self.error(
                            ErrCode::NotAllowed,
                            "the '::' operator is only available when extended operators are authorized (use extended_operators;).",
                        );
                    }
                    let scope = self.node.clone();
                    scope.append_child(&expr);
                    self.get_token();
                    if self.kind() == NodeKind::Identifier {
                        let name = self.node.clone();
                        scope.append_child(&name);
                        self.get_token();
                    } else {
                        self.error(
                            ErrCode::InvalidScope,
                            "scope operator '::' is expected to be followed by an identifier.",
                        );
                    }
                    // the scope operator does not chain
                    return scope;
                }

                NodeKind::Increment => {
                    let post = self.new_node(NodeKind::PostIncrement);
                    post.append_child(&expr);
                    expr = post;
                    self.get_token();
                }

                NodeKind::Decrement => {
                    let post = self.new_node(NodeKind::PostDecrement);
                    post.append_child(&expr);
                    expr = post;
                    self.get_token();
                }

                NodeKind::OpenParenthesis => {
                    // function call
                    let call = self.new_node(NodeKind::Call);
                    call.append_child(&expr);
                    self.get_token();

                    let args = if self.kind() != NodeKind::CloseParenthesis {
                        let list = self.list_expression(true, false);
                        if list.kind() == NodeKind::List {
                            list
                        } else {
                            let wrapper = self.new_node(NodeKind::List);
                            wrapper.append_child(&list);
                            wrapper
                        }
                    } else {
                        self.new_node(NodeKind::List)
                    };
                    call.append_child(&args);

                    if self.kind() == NodeKind::CloseParenthesis {
                        self.get_token();
                    } else {
                        self.error(
                            ErrCode::ParenthesisExpected,
                            "')' expected to end the list of arguments.",
                        );
                    }
                    expr = call;
                }

                NodeKind::OpenSquareBracket => {
                    // array/property access
                    let array = self.new_node(NodeKind::Array);
                    array.append_child(&expr);
                    self.get_token();

                    if self.kind() != NodeKind::CloseSquareBracket {
                        let index = self.list_expression(false, false);
                        array.append_child(&index);
                    }
                    if self.kind() == NodeKind::CloseSquareBracket {
                        self.get_token();
                    } else {
                        self.error(
                            ErrCode::SquareBracketsExpected,
                            "']' expected to end the list of element references or declarations.",
                        );
                    }
                    expr = array;
                }

                _ => return expr,
            }
        }
    }

    fn primary_expression(&mut self) -> NodeRef {
        match self.kind() {
            NodeKind::False
            | NodeKind::FloatingPoint
            | NodeKind::Identifier
            | NodeKind::Integer
            | NodeKind::Null
            | NodeKind::RegularExpression
            | NodeKind::String
            | NodeKind::This
            | NodeKind::True
            | NodeKind::Undefined
            | NodeKind::Super => {
                let node = self.node.clone();
                self.get_token();
                node
            }

            NodeKind::Private | NodeKind::Protected | NodeKind::Public => {
                // access keywords used as literals in scope expressions
                if !self.has_option_set(CompilerOption::ExtendedOperators) {
                    self.error(
                        ErrCode::NotAllowed,
                        format!(
                            "the '{}' operator is only available when extended operators are authorized (use extended_operators;).",
                            self.kind().name()
                        ),
                    );
                }
                let node = self.node.clone();
                self.get_token();
                node
            }

            NodeKind::New => {
                let new_node = self.node.clone();
                self.get_token();
                let object_name = self.postfix_expression();
                new_node.append_child(&object_name);
                new_node
            }

            NodeKind::OpenParenthesis => {
                // grouped expression
                self.get_token();
                let expr = self.list_expression(false, false);

                // `(a).field` is dynamic, not equivalent to `a.field`
                if expr.kind() == NodeKind::Identifier {
                    expr.to_videntifier();
                }
                if self.kind() == NodeKind::CloseParenthesis {
                    self.get_token();
                } else {
                    self.error(
                        ErrCode::ParenthesisExpected,
                        "')' expected to match the '('.",
                    );
                }
                expr
            }

            NodeKind::OpenSquareBracket => {
                // array literal
                let array = self.new_node(NodeKind::ArrayLiteral);
                self.get_token();
                let elements = self.list_expression(false, true);
                array.append_child(&elements);
                if self.kind() == NodeKind::CloseSquareBracket {
                    self.get_token();
                } else {
                    self.error(
                        ErrCode::SquareBracketsExpected,
                        "']' expected to match the '[' of this array.",
                    );
                }
                array
            }

            NodeKind::OpenCurvlyBracket => {
                // object literal
                self.get_token();
                let object = self.object_literal_expression();
                if self.kind() == NodeKind::CloseCurvlyBracket {
                    self.get_token();
                } else {
                    self.error(
                        ErrCode::CurvlyBracketsExpected,
                        "'}' expected to match the '{' of this object literal.",
                    );
                }
                object
            }

            NodeKind::Function => {
                self.get_token();
                self.function(true)
            }

            _ => {
                self.error(
                    ErrCode::InvalidExpression,
                    format!(
                        "unexpected token '{}' found in an expression.",
                        self.kind().name()
                    ),
                );
                // callers expect a node, give them something
                self.new_node(NodeKind::False)
            }
        }
    }

    fn object_literal_expression(&mut self) -> NodeRef {
        let object = self.new_node(NodeKind::ObjectLiteral);
        loop {
            let mut name = self.new_node(NodeKind::Name);
            let kind = self.kind();
            match kind {
                NodeKind::OpenParenthesis => {
                    // (<expr>)::<name> dynamically named field
                    self.get_token();
                    let expr = self.expression();
                    if expr.kind() == NodeKind::Identifier {
                        expr.to_videntifier();
                    }
                    name.append_child(&expr);
                    if self.kind() != NodeKind::CloseParenthesis {
                        self.error(
                            ErrCode::InvalidFieldName,
                            "')' is expected to close a dynamically named object field.",
                        );
                    } else {
                        self.get_token();
                    }
                    self.object_field_scope(&name, kind);
                }

                NodeKind::Identifier
                | NodeKind::Private
                | NodeKind::Protected
                | NodeKind::Public => {
                    if kind == NodeKind::Identifier {
                        name.set_string(self.node.string());
                    }
                    self.get_token();
                    self.object_field_scope(&name, kind);
                }

                NodeKind::FloatingPoint | NodeKind::Integer | NodeKind::String => {
                    name = self.node.clone();
                    self.get_token();
                }

                _ => {
                    self.error(ErrCode::InvalidField, "the name of a field was expected.");
                }
            }

            if self.kind() == NodeKind::Colon {
                self.get_token();
            } else {
                self.error(
                    ErrCode::ColonExpected,
                    "':' expected after the name of a field.",
                );
                // a closing brace or semicolon ends the list improperly
                if matches!(
                    self.kind(),
                    NodeKind::CloseCurvlyBracket | NodeKind::Semicolon
                ) {
                    return object;
                }
                if self.kind() == NodeKind::Comma {
                    self.get_token();
                    if matches!(
                        self.kind(),
                        NodeKind::CloseCurvlyBracket | NodeKind::Semicolon
                    ) {
                        return object;
                    }
                    continue;
                }
            }

            object.append_child(&name);

            let set = self.new_node(NodeKind::Set);
            let value = self.assignment_expression();
            set.append_child(&value);
            object.append_child(&set);

            if self.kind() == NodeKind::CloseCurvlyBracket {
                return object;
            }
            if self.kind() != NodeKind::Comma {
                if self.kind() == NodeKind::Semicolon {
                    self.error(
                        ErrCode::CommaExpected,
                        "'}' expected before the ';' to end an object literal.",
                    );
                    return object;
                }
                self.error(
                    ErrCode::CommaExpected,
                    "',' or '}' expected after the value of a field.",
                );
            } else {
                self.get_token();
            }
        }
    }

    /// Handle the optional `::<name>` part of an object literal field.
    fn object_field_scope(&mut self, name: &NodeRef, kind: NodeKind) {
        if self.kind() == NodeKind::Scope {
            if !self.has_option_set(CompilerOption::ExtendedOperators) {
                self.error(
                    ErrCode::NotAllowed,
                    "the '::' operator is only available when extended operators are authorized (use extended_operators;).",
                );
            }
            self.get_token();
            if self.kind() == NodeKind::Identifier {
                let field = self.node.clone();
                name.append_child(&field);
                self.get_token();
            } else {
                self.error(
                    ErrCode::InvalidScope,
                    "'::' is expected to always be followed by an identifier.",
                );
            }
        } else if kind != NodeKind::Identifier {
            self.error(
                ErrCode::InvalidFieldName,
                "'public', 'protected', or 'private' or a dynamic scope cannot be used as a field name, '::' was expected.",
            );
        }
    }
}
