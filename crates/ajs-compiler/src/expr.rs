//! Expression compilation.
//!
//! Each expression is folded, resolved and typed. The rewrites happen
//! here: assignments to undeclared identifiers synthesize a variable,
//! getter/setter accesses become calls, `new` expressions normalize to
//! `TYPE, LIST`, class calls become `AS` casts and constant variables
//! propagate their literal value.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{NodeAttr, NodeFlag, NodeKind, NodeRef};

use crate::fold;
use crate::{Compiler, SEARCH_FLAG_GETTER, SEARCH_FLAG_SETTER};

impl Compiler {
    pub(crate) fn expression(&mut self, expr: &NodeRef) {
        self.expression_with_params(expr, None)
    }

    pub(crate) fn expression_with_params(&mut self, expr: &NodeRef, params: Option<&NodeRef>) {
        // already typed? then we came here already
        if expr.type_node().is_some() {
            return;
        }

        // reduce the expression before resolving it
        fold::optimize(expr);

        match expr.kind() {
            NodeKind::String
            | NodeKind::Integer
            | NodeKind::FloatingPoint
            | NodeKind::True
            | NodeKind::False
            | NodeKind::RegularExpression => {
                self.type_expr(expr);
                return;
            }

            NodeKind::ObjectLiteral => {
                self.object_literal(expr);
                self.type_expr(expr);
                return;
            }

            NodeKind::Null | NodeKind::Public | NodeKind::Private | NodeKind::Undefined => {
                return;
            }

            NodeKind::Super => {
                self.check_super_validity(expr);
                return;
            }

            NodeKind::This => {
                self.check_this_validity(expr);
                return;
            }

            NodeKind::New => {
                if self.expression_new(expr) {
                    fold::optimize(expr);
                    self.type_expr(expr);
                    return;
                }
            }

            NodeKind::Void => {
                // a side-effect free void reduces to undefined
                if !expr.has_side_effects() {
                    expr.to_literal(NodeKind::Undefined);
                    return;
                }
            }

            NodeKind::Assignment => {
                self.assignment_operator(expr);
                fold::optimize(expr);
                self.type_expr(expr);
                return;
            }

            NodeKind::Function => {
                self.function(expr);
                self.type_expr(expr);
                return;
            }

            NodeKind::Member => {
                self.resolve_member(expr, params, SEARCH_FLAG_GETTER);
                self.type_expr(expr);
                return;
            }

            NodeKind::Identifier | NodeKind::Videntifier => {
                self.resolve_identifier(expr, params);
                self.type_expr(expr);
                return;
            }

            NodeKind::Call => {
                if self.resolve_call(expr) {
                    fold::optimize(expr);
                    self.type_expr(expr);
                }
                return;
            }

            NodeKind::ArrayLiteral
            | NodeKind::Add
            | NodeKind::Array
            | NodeKind::As
            | NodeKind::AssignmentAdd
            | NodeKind::AssignmentBitwiseAnd
            | NodeKind::AssignmentBitwiseOr
            | NodeKind::AssignmentBitwiseXor
            | NodeKind::AssignmentDivide
            | NodeKind::AssignmentLogicalAnd
            | NodeKind::AssignmentLogicalOr
            | NodeKind::AssignmentLogicalXor
            | NodeKind::AssignmentMaximum
            | NodeKind::AssignmentMinimum
            | NodeKind::AssignmentModulo
            | NodeKind::AssignmentMultiply
            | NodeKind::AssignmentPower
            | NodeKind::AssignmentRotateLeft
            | NodeKind::AssignmentRotateRight
            | NodeKind::AssignmentShiftLeft
            | NodeKind::AssignmentShiftRight
            | NodeKind::AssignmentShiftRightUnsigned
            | NodeKind::AssignmentSubtract
            | NodeKind::BitwiseAnd
            | NodeKind::BitwiseNot
            | NodeKind::BitwiseOr
            | NodeKind::BitwiseXor
            | NodeKind::Conditional
            | NodeKind::Decrement
            | NodeKind::Delete
            | NodeKind::Divide
            | NodeKind::Equal
            | NodeKind::Greater
            | NodeKind::GreaterEqual
            | NodeKind::In
            | NodeKind::Increment
            | NodeKind::Instanceof
            | NodeKind::Is
            | NodeKind::Less
            | NodeKind::LessEqual
            | NodeKind::List
            | NodeKind::LogicalAnd
            | NodeKind::LogicalNot
            | NodeKind::LogicalOr
            | NodeKind::LogicalXor
            | NodeKind::Match
            | NodeKind::NotMatch
            | NodeKind::Maximum
            | NodeKind::Minimum
            | NodeKind::Modulo
            | NodeKind::Multiply
            | NodeKind::Name
            | NodeKind::NotEqual
            | NodeKind::PostDecrement
            | NodeKind::PostIncrement
            | NodeKind::Power
            | NodeKind::Range
            | NodeKind::RotateLeft
            | NodeKind::RotateRight
            | NodeKind::Scope
            | NodeKind::ShiftLeft
            | NodeKind::ShiftRight
            | NodeKind::ShiftRightUnsigned
            | NodeKind::StrictlyEqual
            | NodeKind::StrictlyNotEqual
            | NodeKind::Subtract
            | NodeKind::Typeof
            | NodeKind::Rest
            | NodeKind::Empty
            | NodeKind::Auto => {}

            _ => {
                message::error(
                    ErrCode::InternalError,
                    &expr.position(),
                    format!("unhandled expression node \"{}\".", expr.kind().name()),
                );
                return;
            }
        }

        // compile the children as expressions
        for idx in 0..expr.children_count() {
            let child = expr.child(idx);
            if child.kind() != NodeKind::Name {
                self.expression(&child);
            } else if child.children_count() > 0 {
                // named argument: compile the value
                let value = child.child(0);
                self.expression(&value);
            }
        }

        // and give the operators a type
        match expr.kind() {
            NodeKind::Add | NodeKind::Subtract if expr.children_count() == 1 => {
                self.unary_operator(expr);
            }

            NodeKind::BitwiseNot
            | NodeKind::Decrement
            | NodeKind::Increment
            | NodeKind::LogicalNot
            | NodeKind::PostDecrement
            | NodeKind::PostIncrement => {
                self.unary_operator(expr);
            }

            NodeKind::Add
            | NodeKind::BitwiseAnd
            | NodeKind::BitwiseOr
            | NodeKind::BitwiseXor
            | NodeKind::Compare
            | NodeKind::Divide
            | NodeKind::Equal
            | NodeKind::Greater
            | NodeKind::GreaterEqual
            | NodeKind::Less
            | NodeKind::LessEqual
            | NodeKind::Match
            | NodeKind::Maximum
            | NodeKind::Minimum
            | NodeKind::Modulo
            | NodeKind::Multiply
            | NodeKind::NotEqual
            | NodeKind::NotMatch
            | NodeKind::Power
            | NodeKind::RotateLeft
            | NodeKind::RotateRight
            | NodeKind::ShiftLeft
            | NodeKind::ShiftRight
            | NodeKind::ShiftRightUnsigned
            | NodeKind::StrictlyEqual
            | NodeKind::StrictlyNotEqual
            | NodeKind::Subtract => {
                self.binary_operator(expr);
            }

            _ => {}
        }
    }

    /// Resolve an identifier use-site: special identifiers first, then
    /// the scopes, then constant propagation.
    fn resolve_identifier(&mut self, expr: &NodeRef, params: Option<&NodeRef>) {
        if self.special_identifier(expr) {
            return;
        }

        let resolution =
            match self.resolve_name(expr, expr, params, None, SEARCH_FLAG_GETTER) {
                None => {
                    if !expr.get_flag(NodeFlag::IdentifierWith) {
                        message::error(
                            ErrCode::NotFound,
                            &expr.position(),
                            format!(
                                "cannot find any variable or class declaration for: \"{}\".",
                                expr.string()
                            ),
                        );
                    }
                    return;
                }
                Some(resolution) => resolution,
            };

        if self.replace_constant_variable(expr, &resolution) {
            return;
        }

        match expr.instance() {
            Some(current) => {
                assert!(
                    current == resolution,
                    "the instance of this identifier was already defined differently"
                );
            }
            None => {
                expr.set_instance(&resolution);
                if let Some(type_node) = resolution.type_node() {
                    if expr.type_node().is_none() {
                        expr.set_type_node(&type_node);
                    }
                }
            }
        }
    }

    /// `__FUNCTION__`, `__CLASS__`, `__INTERFACE__`, `__PACKAGE__` and
    /// `__NAME__` resolve to strings at compile time.
    pub(crate) fn special_identifier(&mut self, expr: &NodeRef) -> bool {
        let id = expr.string();
        if !id.starts_with("__") || id.len() < 5 {
            return false;
        }

        let mut result = String::new();
        let what;
        let mut found: Option<NodeRef> = None;
        match id.as_str() {
            "__FUNCTION__" => {
                what = "a function";
                let mut parent = expr.parent();
                while let Some(p) = parent {
                    match p.kind() {
                        NodeKind::Package
                        | NodeKind::Program
                        | NodeKind::Root
                        | NodeKind::Interface
                        | NodeKind::Class => break,
                        NodeKind::Function => {
                            found = Some(p);
                            break;
                        }
                        _ => parent = p.parent(),
                    }
                }
            }
            "__CLASS__" => {
                what = "a class";
                let mut parent = expr.parent();
                while let Some(p) = parent {
                    match p.kind() {
                        NodeKind::Package | NodeKind::Program | NodeKind::Root => break,
                        NodeKind::Class => {
                            found = Some(p);
                            break;
                        }
                        _ => parent = p.parent(),
                    }
                }
            }
            "__INTERFACE__" => {
                what = "an interface";
                let mut parent = expr.parent();
                while let Some(p) = parent {
                    match p.kind() {
                        NodeKind::Package | NodeKind::Program | NodeKind::Root => break,
                        NodeKind::Interface => {
                            found = Some(p);
                            break;
                        }
                        _ => parent = p.parent(),
                    }
                }
            }
            "__PACKAGE__" => {
                what = "a package";
                let mut parent = expr.parent();
                while let Some(p) = parent {
                    match p.kind() {
                        NodeKind::Program | NodeKind::Root => break,
                        NodeKind::Package => {
                            found = Some(p);
                            break;
                        }
                        _ => parent = p.parent(),
                    }
                }
            }
            "__NAME__" => {
                what = "any function, class, interface or package";
                let mut parent = expr.parent();
                while let Some(p) = parent {
                    match p.kind() {
                        NodeKind::Program | NodeKind::Root => break,
                        NodeKind::Function
                        | NodeKind::Class
                        | NodeKind::Interface
                        | NodeKind::Package => {
                            if result.is_empty() {
                                result = p.string();
                            } else {
                                result = format!("{}.{}", p.string(), result);
                            }
                            found = Some(p.clone());
                            if p.kind() == NodeKind::Package {
                                break;
                            }
                            parent = p.parent();
                        }
                        _ => parent = p.parent(),
                    }
                }
            }
            _ => return false,
        }

        expr.to_string_literal();
        if !result.is_empty() {
            expr.set_string(result);
        } else if let Some(found) = found {
            expr.set_string(found.string());
        } else {
            message::error(
                ErrCode::InvalidExpression,
                &expr.position(),
                format!("\"{id}\" was used outside {what}."),
            );
            expr.set_string(id);
        }
        true
    }

    /// `this` cannot appear in static functions nor constructors.
    pub(crate) fn check_this_validity(&mut self, expr: &NodeRef) {
        let mut parent = expr.parent();
        while let Some(p) = parent {
            match p.kind() {
                NodeKind::Function => {
                    if self.get_attribute(&p, NodeAttr::Static)
                        || self.get_attribute(&p, NodeAttr::Constructor)
                        || self.is_constructor(&p).is_some()
                    {
                        message::error(
                            ErrCode::Static,
                            &expr.position(),
                            "\"this\" cannot be used in a static function nor a constructor.",
                        );
                    }
                    return;
                }
                NodeKind::Class
                | NodeKind::Interface
                | NodeKind::Program
                | NodeKind::Root => return,
                _ => parent = p.parent(),
            }
        }
    }

    /// Give a literal expression its type.
    pub(crate) fn type_expr(&mut self, expr: &NodeRef) {
        if expr.type_node().is_some() {
            return;
        }

        let type_name = match expr.kind() {
            NodeKind::String => "String",
            NodeKind::Integer => "Integer",
            NodeKind::FloatingPoint => "Double",
            NodeKind::True | NodeKind::False => "Boolean",
            NodeKind::ObjectLiteral => "Object",
            NodeKind::ArrayLiteral => "Array",
            NodeKind::RegularExpression => "RegularExpression",
            _ => return,
        };
        if let Some(resolution) = self.resolve_internal_type(expr, type_name) {
            expr.set_type_node(&resolution);
        }
    }

    /// Compile the fields of an object literal.
    pub(crate) fn object_literal(&mut self, expr: &NodeRef) {
        let mut idx = 0;
        while idx + 1 < expr.children_count() {
            let name = expr.child(idx);
            if name.kind() == NodeKind::Name && name.children_count() == 1 {
                // dynamically named field
                let dynamic_name = name.child(0);
                self.expression(&dynamic_name);
            }
            let set = expr.child(idx + 1);
            if set.kind() == NodeKind::Set && set.children_count() == 1 {
                let value = set.child(0);
                self.expression(&value);
            }
            idx += 2;
        }
    }

    /// Normalize `new T(args)` when `T` resolves to a class: the CALL
    /// child becomes `TYPE, LIST`, and abstract classes are rejected.
    pub(crate) fn expression_new(&mut self, new_node: &NodeRef) -> bool {
        if new_node.children_count() == 0 {
            return false;
        }

        let call = new_node.child(0);
        if call.kind() != NodeKind::Call || call.children_count() != 2 {
            return false;
        }

        let id = call.child(0);
        if id.kind() != NodeKind::Identifier {
            return false;
        }

        // resolve the argument types first
        let params = call.child(1);
        for idx in 0..params.children_count() {
            let child = params.child(idx);
            self.expression(&child);
        }

        let resolution =
            match self.resolve_name(&id, &id, Some(&params), None, SEARCH_FLAG_GETTER) {
                // an error is generated later when this is a call and
                // no function can be found
                None => return false,
                Some(resolution) => resolution,
            };

        if !matches!(resolution.kind(), NodeKind::Class | NodeKind::Interface) {
            return false;
        }

        id.set_instance(&resolution);
        new_node.set_type_node(&resolution);

        // flatten: NEW(CALL(TYPE, LIST)) becomes NEW(TYPE, LIST)
        let type_id = call.child(0);
        let args = call.child(1);
        new_node.delete_child(0);
        new_node.append_child(&type_id);
        new_node.append_child(&args);

        self.can_instantiate_type(&type_id);

        true
    }

    /// Unary operator resolution on a typed operand: search the
    /// operand's class for an operator function of that name.
    pub(crate) fn unary_operator(&mut self, expr: &NodeRef) {
        if expr.children_count() != 1 {
            return;
        }
        let op = match expr.kind().operator_name() {
            None => return,
            Some(op) => op,
        };

        let left = expr.child(0);
        let ltype = match left.type_node() {
            // the operand is not typed, nothing to resolve against
            None => return,
            Some(ltype) => ltype,
        };
        if ltype.kind() != NodeKind::Class {
            return;
        }

        // incrementing a constant is invalid whatever the operator
        // implementation
        if matches!(
            expr.kind(),
            NodeKind::Increment
                | NodeKind::Decrement
                | NodeKind::PostIncrement
                | NodeKind::PostDecrement
        ) {
            if let Some(var_node) = left.instance() {
                if matches!(var_node.kind(), NodeKind::Param | NodeKind::Variable)
                    && (var_node.get_flag(NodeFlag::VariableConst)
                        || var_node.get_flag(NodeFlag::ParamConst))
                {
                    message::error(
                        ErrCode::CannotOverwriteConst,
                        &expr.position(),
                        "cannot increment or decrement a constant variable or function parameters.",
                    );
                }
            }
        }

        let id = expr.create_replacement(NodeKind::Identifier);
        id.set_string(op);
        let params = expr.create_replacement(NodeKind::List);
        let l = expr.create_replacement(NodeKind::Identifier);
        l.set_string("left");
        l.set_type_node(&ltype);
        params.append_child(&l);

        let resolution = match self.resolve_operator(&ltype, &id, &params) {
            None => {
                message::error(
                    ErrCode::InvalidOperator,
                    &expr.position(),
                    format!("cannot apply operator \"{op}\" to this object."),
                );
                return;
            }
            Some(resolution) => resolution,
        };

        self.define_function_type(&resolution);
        let op_type = resolution.type_node();
        if self.get_attribute(&resolution, NodeAttr::Native) {
            // native operators stay as they are
            expr.set_instance(&resolution);
            if let Some(op_type) = op_type {
                expr.set_type_node(&op_type);
            }
            return;
        }

        // rewrite as a call: left.<op>()
        id.set_instance(&resolution);
        if let Some(op_type) = &op_type {
            id.set_type_node(op_type);
        }

        expr.delete_child(0);
        let member = expr.create_replacement(NodeKind::Member);
        member.append_child(&left);
        member.append_child(&id);
        expr.append_child(&member);
        let list = expr.create_replacement(NodeKind::List);
        expr.append_child(&list);
        if let Some(op_type) = &op_type {
            expr.set_type_node(op_type);
        }
        expr.set_instance(&resolution);
        expr.to_call();
    }

    /// Binary operator resolution on typed operands.
    pub(crate) fn binary_operator(&mut self, expr: &NodeRef) {
        if expr.children_count() != 2 {
            return;
        }
        let op = match expr.kind().operator_name() {
            None => return,
            Some(op) => op,
        };

        let left = expr.child(0);
        let ltype = match left.type_node() {
            None => return,
            Some(ltype) => ltype,
        };
        if ltype.kind() != NodeKind::Class {
            return;
        }
        let right = expr.child(1);
        let rtype = match right.type_node() {
            None => return,
            Some(rtype) => rtype,
        };

        let id = expr.create_replacement(NodeKind::Identifier);
        id.set_string(op);

        let params = expr.create_replacement(NodeKind::List);
        let l = expr.create_replacement(NodeKind::Identifier);
        l.set_string("left");
        l.set_type_node(&ltype);
        let r = expr.create_replacement(NodeKind::Identifier);
        r.set_string("right");
        r.set_type_node(&rtype);
        params.append_child(&l);
        params.append_child(&r);

        let resolution = match self.resolve_operator(&ltype, &id, &params) {
            None => {
                message::error(
                    ErrCode::InvalidOperator,
                    &expr.position(),
                    format!("cannot apply operator \"{op}\" to these objects."),
                );
                return;
            }
            Some(resolution) => resolution,
        };

        self.define_function_type(&resolution);
        let op_type = resolution.type_node();
        if self.get_attribute(&resolution, NodeAttr::Native) {
            // native operators stay as they are
            expr.set_instance(&resolution);
            if let Some(op_type) = op_type {
                expr.set_type_node(&op_type);
            }
            return;
        }

        // rewrite as a call: left.<op>(right)
        id.set_instance(&resolution);
        if let Some(op_type) = &op_type {
            id.set_type_node(op_type);
        }

        expr.delete_child(1);
        expr.delete_child(0);
        let member = expr.create_replacement(NodeKind::Member);
        member.append_child(&left);
        member.append_child(&id);
        expr.append_child(&member);
        let list = expr.create_replacement(NodeKind::List);
        list.append_child(&right);
        expr.append_child(&list);
        if let Some(op_type) = &op_type {
            expr.set_type_node(op_type);
        }
        expr.set_instance(&resolution);
        expr.to_call();
    }

    /// Compile an assignment. An assignment to an undeclared
    /// identifier synthesizes the missing variable declaration.
    pub(crate) fn assignment_operator(&mut self, expr: &NodeRef) {
        let mut is_var = false;
        let mut var_node: Option<NodeRef> = None;

        let left = expr.child(0);
        if left.kind() == NodeKind::Identifier {
            match self.resolve_name(&left, &left, None, None, 0) {
                Some(resolution) => {
                    let mut valid = false;
                    if resolution.kind() == NodeKind::Variable {
                        if resolution.get_flag(NodeFlag::VariableConst) {
                            message::error(
                                ErrCode::CannotOverwriteConst,
                                &left.position(),
                                format!(
                                    "you cannot assign a value to the constant variable \"{}\".",
                                    resolution.string()
                                ),
                            );
                        } else {
                            valid = true;
                        }
                    } else if resolution.kind() == NodeKind::Param {
                        if resolution.get_flag(NodeFlag::ParamConst) {
                            message::error(
                                ErrCode::CannotOverwriteConst,
                                &left.position(),
                                format!(
                                    "you cannot assign a value to the constant function parameter \"{}\".",
                                    resolution.string()
                                ),
                            );
                        } else {
                            valid = true;
                        }
                    } else {
                        message::error(
                            ErrCode::CannotOverload,
                            &left.position(),
                            "you cannot assign but a variable or a function parameter.",
                        );
                    }
                    if valid {
                        left.set_instance(&resolution);
                        if let Some(type_node) = resolution.type_node() {
                            left.set_type_node(&type_node);
                        }
                    }
                }

                None => {
                    // a missing VAR: synthesize the declaration and
                    // register it where it belongs
                    is_var = true;

                    let new_var = expr.create_replacement(NodeKind::Var);
                    new_var.set_flag(NodeFlag::VariableToadd, true);
                    new_var.set_flag(NodeFlag::VariableDefining, true);
                    let variable_node = expr.create_replacement(NodeKind::Variable);
                    new_var.append_child(&variable_node);
                    variable_node.set_string(left.string());

                    let mut last_directive: Option<NodeRef> = None;
                    let mut parent = left.parent();
                    while let Some(p) = parent {
                        match p.kind() {
                            NodeKind::DirectiveList => {
                                last_directive = Some(p.clone());
                                parent = p.parent();
                            }
                            NodeKind::Function => {
                                variable_node.set_flag(NodeFlag::VariableLocal, true);
                                p.add_variable(&variable_node);
                                break;
                            }
                            NodeKind::Program
                            | NodeKind::Class
                            | NodeKind::Interface
                            | NodeKind::Package => break,
                            _ => parent = p.parent(),
                        }
                    }
                    left.set_instance(&variable_node);

                    // the variable is added at the top of the list when
                    // the directive-list visit completes
                    if let Some(last_directive) = last_directive {
                        last_directive.add_variable(&variable_node);
                        last_directive.set_flag(NodeFlag::DirectiveListNewVariables, true);
                    }
                    var_node = Some(new_var);
                }
            }
        } else if left.kind() == NodeKind::Member {
            if left.type_node().is_none() {
                fold::optimize(&left);
                self.resolve_member(&left, None, SEARCH_FLAG_SETTER);

                // a setter write becomes a call: a.b = v => a.<-b(v)
                if let Some(resolution) = left.instance() {
                    if resolution.kind() == NodeKind::Function
                        && resolution.get_flag(NodeFlag::FunctionSetter)
                    {
                        let right = expr.child(1);

                        let field = left.child(1);
                        field.set_string(format!("<-{}", field.string()));

                        let params = expr.create_replacement(NodeKind::List);
                        expr.set_child(1, &params);
                        params.append_child(&right);

                        expr.to_call();
                    }
                }
            }
        } else {
            self.expression(&left);
        }

        let right_idx = expr.children_count() - 1;
        let right = expr.child(right_idx);
        self.expression(&right);

        if let Some(var_node) = var_node {
            var_node.set_flag(NodeFlag::VariableDefining, false);
        }

        if let Some(type_node) = left.type_node() {
            expr.set_type_node(&type_node);
            return;
        }
        if !is_var {
            // left not typed: take the right type (assignments are the
            // special case where this is fine)
            if let Some(type_node) = right.type_node() {
                expr.set_type_node(&type_node);
            }
        }
    }
}
