//! Name resolution.
//!
//! `resolve_name` searches lexical scopes outward from a use-site to
//! the enclosing PROGRAM, then across the three implicit module roots
//! (global, system, native). Inside a directive list the scan runs
//! backward first, then forward (mutual recursion needs the forward
//! pass). Function candidates accumulate in an `all_matches` list which
//! `select_best_func` settles once the search is over.

use ajs_common::message::{self, ErrCode, FatalError};
use ajs_parser::node::{NodeAttr, NodeFlag, NodeKind, NodeRef};

use crate::{
    Compiler, SEARCH_ERROR_PRIVATE, SEARCH_ERROR_PRIVATE_PACKAGE, SEARCH_ERROR_PROTECTED,
    SEARCH_ERROR_WRONG_PRIVATE, SEARCH_ERROR_WRONG_PROTECTED, SEARCH_FLAG_GETTER,
    SEARCH_FLAG_NO_PARSING, SEARCH_FLAG_RESOLVING_CALL,
};

impl Compiler {
    /// Verify that accessing `field` through `object_name` is valid:
    /// going through a class (not an instance) only reaches static
    /// members, constants, sub-classes and operators; and an unknown
    /// member requires a dynamic class.
    pub(crate) fn check_member(
        &mut self,
        object_name: &NodeRef,
        field: Option<&NodeRef>,
        field_name: &NodeRef,
    ) {
        let field = match field {
            None => {
                let type_node = self.class_of_member(object_name);
                if !self.is_dynamic_class(type_node.as_ref()) {
                    let type_name = type_node.map(|t| t.string()).unwrap_or_default();
                    message::error(
                        ErrCode::Static,
                        &object_name.position(),
                        format!(
                            "\"{}.{}\" is not dynamic and thus it cannot be used with unknown member \"{}\".",
                            type_name,
                            object_name.string(),
                            field_name.string()
                        ),
                    );
                }
                return;
            }
            Some(field) => field,
        };

        let obj = match object_name.instance() {
            None => return,
            Some(obj) => obj,
        };
        if !matches!(obj.kind(), NodeKind::Class | NodeKind::Interface) {
            return;
        }

        let err = match field.kind() {
            NodeKind::Class | NodeKind::Interface => false,
            NodeKind::Function => {
                !self.get_attribute(field, NodeAttr::Static)
                    && !field.get_flag(NodeFlag::FunctionOperator)
            }
            NodeKind::Variable => {
                !self.get_attribute(field, NodeAttr::Static)
                    && !field.get_flag(NodeFlag::VariableConst)
            }
            _ => true,
        };

        if err {
            message::error(
                ErrCode::InstanceExpected,
                &object_name.position(),
                format!(
                    "you cannot directly access non-static functions and non-static/constant variables in a class (\"{}\" here); you need to use an instance instead.",
                    field.string()
                ),
            );
        }
    }

    /// Search the `extends`/`implements` ancestry of a class for a
    /// field.
    pub(crate) fn find_in_extends(
        &mut self,
        link: &NodeRef,
        field: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        let mut count = 0;
        let mut resolution: Option<NodeRef> = None;

        for idx in 0..link.children_count() {
            let extends = link.child(idx);
            match extends.kind() {
                NodeKind::Extends => {
                    if extends.children_count() == 1 {
                        let type_node = extends.child(0);
                        self.link_type(&type_node);
                        match type_node.instance() {
                            None => {
                                message::warning(
                                    ErrCode::TypeNotLinked,
                                    &link.position(),
                                    "type not linked, cannot lookup member.",
                                );
                            }
                            Some(sub_link) => {
                                if let Some(r) = self.find_any_field(
                                    &sub_link,
                                    field,
                                    params,
                                    all_matches,
                                    search_flags,
                                ) {
                                    resolution = Some(r);
                                    count += 1;
                                }
                            }
                        }
                    }
                }

                NodeKind::Implements => {
                    if extends.children_count() == 1 {
                        let type_node = extends.child(0);
                        let types: Vec<NodeRef> = if type_node.kind() == NodeKind::List {
                            (0..type_node.children_count())
                                .map(|j| type_node.child(j))
                                .collect()
                        } else {
                            vec![type_node]
                        };
                        for t in types {
                            self.link_type(&t);
                            match t.instance() {
                                None => {
                                    message::warning(
                                        ErrCode::TypeNotLinked,
                                        &link.position(),
                                        "type not linked, cannot lookup member.",
                                    );
                                }
                                Some(sub_link) => {
                                    if let Some(r) = self.find_any_field(
                                        &sub_link,
                                        field,
                                        params,
                                        all_matches,
                                        search_flags,
                                    ) {
                                        resolution = Some(r);
                                        count += 1;
                                    }
                                }
                            }
                        }
                    }
                }

                _ => {}
            }
        }

        let matches_count = all_matches.map_or(0, |m| m.children_count());
        if count == 1 || matches_count != 0 {
            return resolution.or_else(|| field.instance());
        }
        if count > 1 {
            message::error(
                ErrCode::Duplicates,
                &field.position(),
                format!("found more than one match for \"{}\".", field.string()),
            );
        }
        None
    }

    /// Search the directive lists of a class/interface/package for a
    /// field.
    pub(crate) fn check_field(
        &mut self,
        link: &NodeRef,
        field: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        for idx in 0..link.children_count() {
            let list = link.child(idx);
            if list.kind() != NodeKind::DirectiveList {
                // extends, implements, empty...
                continue;
            }

            for j in 0..list.children_count() {
                let child = list.child(j);
                if child.kind() == NodeKind::DirectiveList {
                    // recurse into sub-lists
                    if let Some(resolution) =
                        self.check_field(&list, field, params, all_matches, search_flags)
                    {
                        if self.funcs_name(Some(&resolution), all_matches) {
                            return Some(resolution);
                        }
                    }
                } else if child.kind() != NodeKind::Empty {
                    if let Some(resolution) =
                        self.check_name(&list, j, field, params, all_matches, search_flags)
                    {
                        if self.funcs_name(Some(&resolution), all_matches) {
                            match field.instance() {
                                None => field.set_instance(&resolution),
                                Some(inst) => {
                                    assert!(
                                        inst == resolution,
                                        "found an instance twice, but it was different each time"
                                    );
                                }
                            }
                            return Some(resolution);
                        }
                    }
                }
            }
        }
        None
    }

    pub(crate) fn find_any_field(
        &mut self,
        link: &NodeRef,
        field: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        if let Some(resolution) =
            self.check_field(link, field, params, all_matches, search_flags)
        {
            return Some(resolution);
        }
        if all_matches.map_or(0, |m| m.children_count()) != 0 {
            // one or more functions matched; the caller selects the
            // best one
            return field.instance().or_else(|| Some(field.clone()));
        }
        self.find_in_extends(link, field, params, all_matches, search_flags)
    }

    pub(crate) fn find_field(
        &mut self,
        link: &NodeRef,
        field: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        // protect the error flags of the search in progress
        let save_flags = self.err_flags;
        self.err_flags = 0;

        let result = self.find_any_field(link, field, params, all_matches, search_flags);
        if result.is_none() && all_matches.map_or(0, |m| m.children_count()) == 0 {
            self.print_search_errors(field);
        }

        self.err_flags = save_flags;
        result
    }

    /// Resolve `field` as a member of `object` (a variable, parameter,
    /// class, interface or package).
    pub(crate) fn resolve_field(
        &mut self,
        object: &NodeRef,
        field: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: &NodeRef,
        search_flags: u32,
    ) -> Option<NodeRef> {
        let link = match object.kind() {
            NodeKind::Variable | NodeKind::Param => {
                // find the type of the variable
                let mut type_child = None;
                for idx in 0..object.children_count() {
                    let child = object.child(idx);
                    if !matches!(child.kind(), NodeKind::Set | NodeKind::VarAttributes) {
                        type_child = Some(child);
                        break;
                    }
                }
                let type_child = match type_child {
                    None => {
                        // no declared type; the inferred type of the
                        // initializer may still tell us the class
                        match object.type_node() {
                            Some(link) => {
                                return self.resolve_field_in(
                                    &link,
                                    field,
                                    params,
                                    all_matches,
                                    search_flags,
                                );
                            }
                            None => {
                                message::warning(
                                    ErrCode::Incompatible,
                                    &object.position(),
                                    "variables and parameters without a type should not be used with members.",
                                );
                                return None;
                            }
                        }
                    }
                    Some(type_child) => type_child,
                };
                // the TYPE node sometimes wraps the type identifier and
                // sometimes is the identifier; accept both shapes
                let type_expr = if type_child.kind() == NodeKind::Type
                    && type_child.children_count() == 1
                {
                    type_child.child(0)
                } else {
                    type_child
                };
                self.link_type(&type_expr);
                match type_expr.instance() {
                    // cannot search a field in nothing
                    None => return None,
                    Some(link) => link,
                }
            }

            NodeKind::Class | NodeKind::Interface | NodeKind::Package => object.clone(),

            _ => {
                message::error(
                    ErrCode::InvalidType,
                    &object.position(),
                    format!(
                        "object of type \"{}\" is not known to have members.",
                        object.kind().name()
                    ),
                );
                return None;
            }
        };

        self.resolve_field_in(&link, field, params, all_matches, search_flags)
    }

    fn resolve_field_in(
        &mut self,
        link: &NodeRef,
        field: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: &NodeRef,
        search_flags: u32,
    ) -> Option<NodeRef> {
        if !matches!(
            field.kind(),
            NodeKind::Identifier | NodeKind::Videntifier | NodeKind::String
        ) {
            // a dynamic field cannot be checked at compile time
            return None;
        }

        let resolution =
            self.find_field(link, field, params, Some(all_matches), search_flags)?;

        if all_matches.children_count() != 0 {
            return self.select_best_func(all_matches);
        }
        Some(resolution)
    }

    /// Resolve a MEMBER expression (`a.b`, `a.b.c`, `super.x`, ...).
    pub(crate) fn find_member(
        &mut self,
        member: &NodeRef,
        params: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        if member.children_count() != 2 {
            return None;
        }

        let mut must_find = false;
        let mut object: Option<NodeRef> = None;

        let name = member.child(0);
        match name.kind() {
            NodeKind::Member => {
                // a.b.c: resolve the left member first
                object = self.find_member(&name, params, search_flags);
                object.as_ref()?;
            }

            NodeKind::Super => {
                self.check_super_validity(&name);
                let class_node = self.class_of_member(member);
                if let Some(class_node) = class_node {
                    if class_node.kind() == NodeKind::Class {
                        if class_node.string() == "Object" {
                            message::error(
                                ErrCode::InvalidExpression,
                                &member.position(),
                                "you cannot use \"super\" within the \"Object\" class.",
                            );
                        } else {
                            for idx in 0..class_node.children_count() {
                                let child = class_node.child(idx);
                                if child.kind() == NodeKind::Extends {
                                    if child.children_count() == 1 {
                                        object = child.child(0).instance();
                                    }
                                    if object.is_none() {
                                        return None;
                                    }
                                    break;
                                }
                            }
                            if object.is_none() {
                                // no extends: default to Object
                                object = self.resolve_internal_type(&class_node, "Object");
                            }
                            must_find = true;
                        }
                    }
                }
            }

            _ => {
                self.expression(&name);
            }
        }

        // resolve the field expression too so more errors surface now
        let field = member.child(1);
        if field.kind() != NodeKind::Identifier {
            self.expression(&field);
        }

        if object.is_none() {
            if !matches!(name.kind(), NodeKind::Identifier | NodeKind::String) {
                // a dynamic name resolves at run time; not an error
                return None;
            }
            let all_matches = member.create_replacement(NodeKind::List);
            object = self.resolve_name(&name, &name, params, Some(&all_matches), search_flags);
            object.as_ref()?;
        }

        let object = object.unwrap();
        let all_matches = member.create_replacement(NodeKind::List);
        let result = self.resolve_field(&object, &field, params, &all_matches, search_flags);
        match &result {
            None => {
                if must_find {
                    message::error(
                        ErrCode::InvalidExpression,
                        &member.position(),
                        "\"super\" must name a valid field of the super class.",
                    );
                } else {
                    self.check_member(&name, None, &field);
                }
            }
            Some(resolution) => {
                self.check_member(&name, Some(resolution), &field);
            }
        }
        result
    }

    /// Resolve a MEMBER use-site and rewrite getter reads as calls.
    pub(crate) fn resolve_member(
        &mut self,
        expr: &NodeRef,
        params: Option<&NodeRef>,
        search_flags: u32,
    ) {
        let resolution = match self.find_member(expr, params, search_flags) {
            None => return,
            Some(resolution) => resolution,
        };

        if self.replace_constant_variable(expr, &resolution) {
            return;
        }

        expr.set_instance(&resolution);
        let type_node = resolution.type_node();
        if let Some(type_node) = &type_node {
            expr.set_type_node(type_node);
        }

        // a getter read becomes a call: a.b => a.->b()
        if resolution.kind() == NodeKind::Function
            && resolution.get_flag(NodeFlag::FunctionGetter)
        {
            let left = expr.child(0);
            let right = expr.child(1);
            expr.delete_child(0);
            expr.delete_child(0);

            let member = expr.create_replacement(NodeKind::Member);
            member.set_instance(&resolution);
            if let Some(type_node) = &type_node {
                member.set_type_node(type_node);
            }
            member.append_child(&left);
            member.append_child(&right);
            expr.append_child(&member);

            // right is an identifier or a string, rename it to the
            // getter
            right.set_string(format!("->{}", right.string()));

            let empty_params = expr.create_replacement(NodeKind::List);
            expr.append_child(&empty_params);

            expr.to_call();
        }
    }

    /// Resolve a CALL: the callee may be an overloaded function name, a
    /// class (a cast), a variable with a `()` operator or a member.
    pub(crate) fn resolve_call(&mut self, call: &NodeRef) -> bool {
        if call.children_count() != 2 {
            return false;
        }

        // resolve the parameter expressions first
        let params = call.child(1);
        for idx in 0..params.children_count() {
            let child = params.child(idx);
            self.expression(&child);
        }

        let id = call.child(0);

        // an operator call propagates the OPERATOR flag from the
        // member it goes through
        if id.kind() == NodeKind::Member && id.children_count() == 2 {
            let sub_id = id.child(1);
            if sub_id.kind() == NodeKind::Identifier
                && sub_id.get_flag(NodeFlag::IdentifierOperator)
            {
                call.set_flag(NodeFlag::FunctionOperator, true);
            }
        }

        let count = params.children_count();
        let type_of_lhs = if count > 0 && count <= 2 && call.get_flag(NodeFlag::FunctionOperator)
        {
            // operators resolve against the class of their left
            // operand
            params.child(0).type_node()
        } else {
            None
        };

        if id.kind() != NodeKind::Identifier {
            // dynamic callees cannot always be resolved at compile time
            self.expression_with_params(&id, Some(&params));

            // remove a trailing PARAM_MATCH if one was left over
            let params_count = params.children_count();
            if params_count > 0 {
                let last = params.child(params_count - 1);
                if last.kind() == NodeKind::ParamMatch {
                    params.delete_child(params_count - 1);
                }
            }

            // a member callee resolves through resolve_member; carry
            // its resolution onto the call
            if let Some(instance) = id.instance() {
                call.set_instance(&instance);
            }
            if let Some(type_node) = id.type_node() {
                call.set_type_node(&type_node);
            }
            return false;
        }

        let save_errcnt = message::error_count();

        // operator on a typed left hand side: search that class only
        if let Some(lhs_type) = type_of_lhs {
            if lhs_type.kind() == NodeKind::Class {
                if let Some(resolution) = self.resolve_operator(&lhs_type, &id, &params) {
                    self.define_function_type(&resolution);
                    if self.class_of_member(&resolution).is_none() {
                        message::error(
                            ErrCode::UnknownOperator,
                            &call.position(),
                            format!(
                                "could not determine the class of the \"{}\" operator.",
                                id.string()
                            ),
                        );
                        return false;
                    }

                    if self.get_attribute(&resolution, NodeAttr::Native) {
                        // native operators are left as is
                        call.set_instance(&resolution);
                        if let Some(type_node) = resolution.type_node() {
                            call.set_type_node(&type_node);
                        }
                        return true;
                    }

                    // rewrite as lhs.<op>(rhs)
                    let member = call.create_replacement(NodeKind::Member);
                    let this_arg = params.child(0);
                    params.delete_child(0);
                    member.append_child(&this_arg);
                    call.set_child(0, &member);
                    member.append_child(&id);

                    call.set_instance(&resolution);
                    if let Some(type_node) = resolution.type_node() {
                        call.set_type_node(&type_node);
                    }
                    return true;
                }
            }
        }

        let all_matches = call.create_replacement(NodeKind::List);
        let resolution = self.resolve_name(
            &id,
            &id,
            Some(&params),
            Some(&all_matches),
            SEARCH_FLAG_GETTER | SEARCH_FLAG_RESOLVING_CALL,
        );

        if let Some(resolution) = resolution {
            if matches!(resolution.kind(), NodeKind::Class | NodeKind::Interface) {
                // Type(expr) is a cast: convert to `expr AS Type`
                let type_id = call.child(0);
                let mut expr = call.child(1);
                call.delete_child(0);
                call.delete_child(0);
                // the arguments come as a LIST; a single expression is
                // the cast subject itself
                if expr.kind() == NodeKind::List && expr.children_count() == 1 {
                    let single = expr.child(0);
                    expr.delete_child(0);
                    expr = single;
                }
                call.append_child(&expr);
                call.append_child(&type_id);
                type_id.set_instance(&resolution);
                call.set_type_node(&resolution);
                call.to_as();
                return true;
            }

            if resolution.kind() == NodeKind::Variable {
                // calling a variable calls the `()` operator of its
                // class
                let var_class = match resolution.type_node() {
                    None => {
                        message::error(
                            ErrCode::UnsupportedCallOperator,
                            &resolution.position(),
                            "calling an untyped variable is not supported, the \"()\" operator cannot be searched.",
                        );
                        return false;
                    }
                    Some(var_class) => var_class,
                };
                id.set_instance(&var_class);
                let op = call.create_replacement(NodeKind::Identifier);
                op.set_string("()");
                let op_matches = call.create_replacement(NodeKind::List);
                let func =
                    self.find_field(&var_class, &op, Some(&params), Some(&op_matches), 0);
                let func = if op_matches.children_count() != 0 {
                    match self.select_best_func(&op_matches) {
                        None => {
                            message::error(
                                ErrCode::UnknownOperator,
                                &call.position(),
                                "two or more functions have a similar signature.",
                            );
                            return false;
                        }
                        Some(func) => Some(func),
                    }
                } else {
                    func
                };
                match func {
                    None => {
                        message::error(
                            ErrCode::UnknownOperator,
                            &call.position(),
                            format!(
                                "no \"()\" operators found in \"{}\".",
                                var_class.string()
                            ),
                        );
                        return false;
                    }
                    Some(func) => {
                        call.set_instance(&func);
                        if let Some(type_node) = func.type_node() {
                            call.set_type_node(&type_node);
                        }
                        if !self.get_attribute(call, NodeAttr::Native) {
                            let member = call.create_replacement(NodeKind::Member);
                            call.insert_child(0, &member);
                            let lhs = call.child(1);
                            call.delete_child(1);
                            lhs.set_type_node(&var_class);
                            member.append_child(&lhs);
                            op.set_instance(&func);
                            member.append_child(&op);
                        }
                        return true;
                    }
                }
            }

            if resolution.kind() != NodeKind::Function {
                message::error(
                    ErrCode::InvalidType,
                    &id.position(),
                    format!(
                        "\"{}\" was expected to be a type, a variable or a function.",
                        id.string()
                    ),
                );
                return false;
            }

            // a member function is called through `this`
            if self.class_of_member(&resolution).is_some() {
                let member = call.create_replacement(NodeKind::Member);
                let this_expr = call.create_replacement(NodeKind::This);
                member.append_child(&this_expr);
                member.append_child(&id.clone());
                call.set_child(0, &member);
            }

            call.set_instance(&resolution);
            if let Some(type_node) = resolution.type_node() {
                call.set_type_node(&type_node);
            }

            // move the winning match to the end of the arguments so
            // the missing parameters can be appended in order
            for m_idx in 0..all_matches.children_count() {
                let m = all_matches.child(m_idx);
                if m.kind() == NodeKind::ParamMatch && m.instance() == Some(resolution.clone())
                {
                    params.append_child(&m);
                    break;
                }
            }
            self.call_add_missing_params(call, &params);
            return true;
        }

        if save_errcnt == message::error_count() {
            message::error(
                ErrCode::NotFound,
                &id.position(),
                format!("function named \"{}\" not found.", id.string()),
            );
        }
        false
    }

    /// Search a class (and its `extends` chain) for an operator
    /// function applicable to the given operands.
    pub(crate) fn resolve_operator(
        &mut self,
        type_node: &NodeRef,
        id: &NodeRef,
        params: &NodeRef,
    ) -> Option<NodeRef> {
        let mut extends: Option<NodeRef> = None;
        let mut list: Option<NodeRef> = None;
        for idx in 0..type_node.children_count() {
            let child = type_node.child(idx);
            match child.kind() {
                NodeKind::Extends => extends = Some(child),
                NodeKind::DirectiveList => list = Some(child),
                _ => {}
            }
        }

        let list = match list {
            None => {
                // a forward-declared class has no members to search
                return None;
            }
            Some(list) => list,
        };

        // operands are `this` plus at most one right hand side
        let expected_parameters = params.children_count().saturating_sub(1);
        let expected_type = if expected_parameters == 1 {
            params.child(1).type_node()
        } else {
            None
        };

        let function_name = id.string();
        for idx in 0..list.children_count() {
            let function = list.child(idx);
            if function.kind() != NodeKind::Function {
                continue;
            }
            if function.string() != function_name {
                continue;
            }
            let function_params = function.find_first_child(NodeKind::Parameters);
            let function_params = match function_params {
                None => {
                    if expected_parameters == 0 {
                        return Some(function);
                    }
                    continue;
                }
                Some(p) if p.children_count() == 0 => {
                    if expected_parameters == 0 {
                        return Some(function);
                    }
                    continue;
                }
                Some(p) => p,
            };
            if function_params.children_count() != 1 || expected_parameters != 1 {
                continue;
            }

            let rhs_param = function_params.child(0);
            let rhs_type = match rhs_param.find_first_child(NodeKind::Type) {
                None => continue,
                Some(rhs_type) => rhs_type,
            };
            let param_type = match rhs_type.find_first_child(NodeKind::Identifier) {
                None => continue,
                Some(param_type) => param_type,
            };
            if param_type.type_node().is_none() {
                self.link_type(&param_type);
                match param_type.instance() {
                    None => continue,
                    Some(instance) => param_type.set_type_node(&instance),
                }
            }
            if let (Some(expected), Some(param)) = (&expected_type, param_type.type_node()) {
                if self.is_derived_from(expected, &param) {
                    return Some(function);
                }
            }
        }

        // not here: try the super class
        if let Some(extends) = extends {
            if extends.children_count() == 1 {
                let extends_name = extends.child(0);
                self.link_type(&extends_name);
                if let Some(super_type) = extends_name.instance() {
                    return self.resolve_operator(&super_type, id, params);
                }
            }
        }
        None
    }

    /// Resolve an internal type name (Object, String, Integer, ...).
    /// Missing internal types make the whole run fatal: the native
    /// module is damaged or absent.
    pub(crate) fn resolve_internal_type(
        &mut self,
        parent: &NodeRef,
        type_name: &str,
    ) -> Option<NodeRef> {
        let id = parent.create_replacement(NodeKind::Identifier);
        id.set_string(type_name);

        match self.resolve_name(parent, &id, None, None, 0) {
            Some(resolution) => Some(resolution),
            None => {
                let fatal = FatalError::new(
                    ErrCode::InternalError,
                    format!("cannot find internal type \"{type_name}\"."),
                );
                message::message(
                    ajs_common::message::MessageLevel::Fatal,
                    ErrCode::InternalError,
                    &parent.position(),
                    &fatal.text,
                );
                self.set_fatal(fatal);
                None
            }
        }
    }

    /// Check one directive-list entry against the searched name.
    pub(crate) fn check_name(
        &mut self,
        list: &NodeRef,
        idx: usize,
        id: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        assert!(
            idx < list.children_count(),
            "check_name() index too large for this list"
        );
        let child = list.child(idx);
        let name = id.string();

        let mut resolution: Option<NodeRef> = None;
        match child.kind() {
            NodeKind::Var | NodeKind::VarAttributes => {
                // a VAR is composed of VARIABLEs
                for j in 0..child.children_count() {
                    let variable_node = child.child(j);
                    if variable_node.string() == name {
                        if search_flags & SEARCH_FLAG_NO_PARSING == 0 {
                            self.variable(&variable_node, false);
                        }
                        // calling a variable goes through the class's
                        // `()` operator; only `resolve_call` handles
                        // that path
                        if params.is_some() && search_flags & SEARCH_FLAG_RESOLVING_CALL == 0 {
                            message::error(
                                ErrCode::UnsupportedCallOperator,
                                &id.position(),
                                "handling of the \"()\" operator within this expression is not supported.",
                            );
                        }
                        resolution = Some(variable_node);
                        break;
                    }
                }
            }

            NodeKind::Param => {
                if child.string() == name {
                    child.set_flag(NodeFlag::ParamReferenced, true);
                    return Some(child);
                }
            }

            NodeKind::Function => {
                if let Some(the_class) = self.is_constructor(&child) {
                    // the function bears the class name; resolving that
                    // name resolves to the class itself
                    if the_class.string() == name {
                        resolution = Some(the_class);
                    }
                } else {
                    resolution = self.check_function(&child, &name, params, search_flags);
                }
            }

            NodeKind::Class | NodeKind::Interface => {
                if child.string() == name {
                    // a class represents its own type
                    if child.type_node().is_none() {
                        child.set_type_node(&child);
                    }
                    child.set_flag(NodeFlag::IdentifierTyped, true);
                    resolution = Some(child.clone());
                }
            }

            NodeKind::Enum => {
                if child.string() == name {
                    child.set_flag(NodeFlag::EnumInUse, true);
                    return Some(child);
                }
                // references to the enum variants
                for j in 0..child.children_count() {
                    let entry = child.child(j);
                    if entry.kind() == NodeKind::Variable && entry.string() == name {
                        entry.set_flag(NodeFlag::VariableInUse, true);
                        return Some(entry);
                    }
                }
            }

            NodeKind::Package => {
                if child.string() == name {
                    // packages resolve like classes; the search
                    // continues inside the package
                    return Some(child);
                }
            }

            NodeKind::Import => {
                let resolution = self.check_import(&child, &name, params, search_flags)?;
                // the import already selected the best overload; keep a
                // match entry so the caller's selection finds it again
                if resolution.kind() == NodeKind::Function
                    && !resolution.get_flag(NodeFlag::FunctionGetter)
                    && !resolution.get_flag(NodeFlag::FunctionSetter)
                {
                    if let Some(all_matches) = all_matches {
                        let match_node = child.create_replacement(NodeKind::ParamMatch);
                        match_node.set_instance(&resolution);
                        all_matches.append_child(&match_node);
                    }
                }
                return Some(resolution);
            }

            _ => {}
        }

        let resolution = resolution?;

        // visibility checks
        if self.get_attribute(&resolution, NodeAttr::Private) {
            // private means the item is only accessible from the
            // class, interface or package declaring it
            let the_resolution_class = self.class_of_member(&resolution);
            let the_resolution_class = match the_resolution_class {
                None => {
                    self.err_flags |= SEARCH_ERROR_PRIVATE;
                    return None;
                }
                Some(class) => class,
            };
            if the_resolution_class.kind() == NodeKind::Package {
                self.err_flags |= SEARCH_ERROR_PRIVATE_PACKAGE;
                return None;
            }
            if !matches!(
                the_resolution_class.kind(),
                NodeKind::Class | NodeKind::Interface
            ) {
                self.err_flags |= SEARCH_ERROR_WRONG_PRIVATE;
                return None;
            }
            match self.class_of_member(id) {
                None => {
                    self.err_flags |= SEARCH_ERROR_PRIVATE;
                    return None;
                }
                Some(the_id_class) => {
                    if the_id_class != the_resolution_class {
                        self.err_flags |= SEARCH_ERROR_PRIVATE;
                        return None;
                    }
                }
            }
        }

        if self.get_attribute(&resolution, NodeAttr::Protected) {
            // only accessible from the declaring class or a derived one
            let (derived, the_super_class) =
                self.are_objects_derived_from_one_another(id, &resolution);
            if !derived {
                match the_super_class {
                    Some(class)
                        if !matches!(
                            class.kind(),
                            NodeKind::Class | NodeKind::Interface
                        ) =>
                    {
                        self.err_flags |= SEARCH_ERROR_WRONG_PROTECTED;
                    }
                    _ => {
                        self.err_flags |= SEARCH_ERROR_PROTECTED;
                    }
                }
                return None;
            }
        }

        if self.get_attribute(&resolution, NodeAttr::Internal) {
            // only accessible from within the same package
            let resolution_package = self.package_of(&resolution);
            let id_package = self.package_of(id);
            if resolution_package.is_none() || resolution_package != id_package {
                self.err_flags |= SEARCH_ERROR_PRIVATE_PACKAGE;
                return None;
            }
        }

        // score plain function candidates against the caller's
        // arguments (a constructor resolved as its class is not one)
        if child.kind() == NodeKind::Function
            && resolution.kind() == NodeKind::Function
            && params.is_some()
        {
            if let Some(all_matches) = all_matches {
                if !self.check_function_with_params(&child, params, all_matches) {
                    return None;
                }
            }
        }

        Some(resolution)
    }

    /// The package enclosing a node, if any.
    pub(crate) fn package_of(&mut self, node: &NodeRef) -> Option<NodeRef> {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            match n.kind() {
                NodeKind::Package => return Some(n),
                NodeKind::Program | NodeKind::Root => return None,
                _ => current = n.parent(),
            }
        }
        None
    }

    /// Resolve a name from a use-site, searching the lexical scopes
    /// outward then the implicit module roots.
    pub(crate) fn resolve_name(
        &mut self,
        list: &NodeRef,
        id: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        let save_flags = self.err_flags;
        self.err_flags = 0;
        let result = self.resolve_name_impl(list, id, params, all_matches, search_flags);
        if result.is_none() {
            self.print_search_errors(id);
        }
        self.err_flags = save_flags;
        result
    }

    fn resolve_name_impl(
        &mut self,
        list: &NodeRef,
        id: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        let mut list = list.clone();
        let mut id = id.clone();

        // a member (a.b) resolves its object first, then the field
        // inside it
        if id.kind() == NodeKind::Member {
            assert!(
                id.children_count() == 2,
                "resolve_name() called with a MEMBER which does not have exactly two children"
            );
            let object_name = id.child(0);
            let object =
                self.resolve_name_impl(&list, &object_name, params, all_matches, search_flags)?;
            list = object;
            id = id.child(1);
        }

        assert!(
            matches!(
                id.kind(),
                NodeKind::Identifier | NodeKind::Videntifier | NodeKind::String
            ),
            "resolve_name() requires an [V]IDENTIFIER or STRING to search"
        );

        // already typed?
        if let Some(type_node) = id.type_node() {
            return Some(type_node);
        }

        // when we start inside the WITH object definition, skip the
        // WITH itself
        if let Some(parent) = list.parent() {
            if parent.kind() == NodeKind::With {
                list = parent;
            }
        }

        let mut module = 0; // 0 = user module being compiled
        loop {
            let mut offset = 0usize;

            if module == 0 {
                // inside a parameter list, only a backward search is
                // allowed, never the enclosing function
                if list.kind() == NodeKind::Parameters {
                    list = list.parent()?;
                }

                loop {
                    offset = list.offset();
                    list = match list.parent() {
                        // walked out of the tree: not resolved here
                        None => return self.final_matches(all_matches),
                        Some(parent) => parent,
                    };
                    match list.kind() {
                        NodeKind::Extends | NodeKind::Implements => {
                            list = match list.parent() {
                                None => return self.final_matches(all_matches),
                                Some(parent) => parent,
                            };
                        }
                        NodeKind::DirectiveList
                        | NodeKind::For
                        | NodeKind::With
                        | NodeKind::Program
                        | NodeKind::Function
                        | NodeKind::Parameters
                        | NodeKind::Enum
                        | NodeKind::Catch
                        | NodeKind::Class
                        | NodeKind::Interface
                        | NodeKind::Package => break,
                        _ => {}
                    }
                }
            }

            if list.kind() == NodeKind::Program || module != 0 {
                // not resolved in the user program: switch to the
                // implicit module roots
                loop {
                    module += 1;
                    let root = match module {
                        1 => self.global_import.clone(),
                        2 => self.system_import.clone(),
                        3 => self.native_import.clone(),
                        _ => None,
                    };
                    if module >= 4 {
                        break;
                    }
                    if let Some(root) = root {
                        if root.children_count() > 0 {
                            list = root.child(0);
                            break;
                        }
                    }
                }
                offset = 0;
                if module >= 4 {
                    // no more default lists of directives; we may still
                    // have collected functions
                    return self.final_matches(all_matches);
                }
            }

            let max_children = list.children_count();
            match list.kind() {
                NodeKind::DirectiveList => {
                    // backward first (99% of cases), then forward for
                    // mutual recursion
                    let offset = offset.min(max_children);
                    for idx in (0..offset).rev() {
                        if let Some(resolution) =
                            self.check_name(&list, idx, &id, params, all_matches, search_flags)
                        {
                            if self.funcs_name(Some(&resolution), all_matches) {
                                return Some(resolution);
                            }
                        }
                    }
                    for idx in offset..max_children {
                        if let Some(resolution) =
                            self.check_name(&list, idx, &id, params, all_matches, search_flags)
                        {
                            if self.funcs_name(Some(&resolution), all_matches) {
                                return Some(resolution);
                            }
                        }
                    }
                }

                NodeKind::For => {
                    // the initializer of a for may declare variables
                    if max_children > 0 {
                        if let Some(resolution) =
                            self.check_name(&list, 0, &id, params, all_matches, search_flags)
                        {
                            if self.funcs_name(Some(&resolution), all_matches) {
                                return Some(resolution);
                            }
                        }
                    }
                }

                NodeKind::With => {
                    // resolve as a field of the with'd object's type
                    if max_children == 2 {
                        let type_expr = list.child(0);
                        if let Some(link) = type_expr.instance().or_else(|| type_expr.type_node())
                        {
                            let matches = list.create_replacement(NodeKind::List);
                            if let Some(resolution) = self.resolve_field(
                                &link,
                                &id,
                                params,
                                &matches,
                                search_flags,
                            ) {
                                // identifiers bound through `with` stay
                                // dynamic
                                id.set_flag(NodeFlag::IdentifierWith, true);
                                if resolution.kind() == NodeKind::Function
                                    && !resolution.get_flag(NodeFlag::FunctionGetter)
                                    && !resolution.get_flag(NodeFlag::FunctionSetter)
                                {
                                    message::error(
                                        ErrCode::NotSupported,
                                        &id.position(),
                                        "functions are not accessible through a \"with\" binding.",
                                    );
                                    return None;
                                }
                                return Some(resolution);
                            }
                        }
                    }
                }

                NodeKind::Function => {
                    // search the parameters, unless the identifier is a
                    // type (a type cannot name a parameter)
                    if !self.get_attribute(&id, NodeAttr::Type) {
                        if let Some(parameters_node) =
                            list.find_first_child(NodeKind::Parameters)
                        {
                            for j in 0..parameters_node.children_count() {
                                if let Some(resolution) = self.check_name(
                                    &parameters_node,
                                    j,
                                    &id,
                                    params,
                                    all_matches,
                                    search_flags,
                                ) {
                                    if self.funcs_name(Some(&resolution), all_matches) {
                                        return Some(resolution);
                                    }
                                }
                            }
                        }
                    }
                }

                NodeKind::Parameters => {
                    // parameters may reference the previous parameters
                    // in their default values (backward only)
                    let offset = offset.min(max_children);
                    for idx in (0..offset).rev() {
                        if let Some(resolution) =
                            self.check_name(&list, idx, &id, params, all_matches, search_flags)
                        {
                            if self.funcs_name(Some(&resolution), all_matches) {
                                return Some(resolution);
                            }
                        }
                    }
                }

                NodeKind::Catch => {
                    // a catch has one parameter of its own
                    if max_children > 0 {
                        let parameters_node = list.child(0);
                        if parameters_node.kind() == NodeKind::Parameters
                            && parameters_node.children_count() > 0
                        {
                            if let Some(resolution) = self.check_name(
                                &parameters_node,
                                0,
                                &id,
                                params,
                                all_matches,
                                search_flags,
                            ) {
                                if self.funcs_name(Some(&resolution), all_matches) {
                                    return Some(resolution);
                                }
                            }
                        }
                    }
                }

                NodeKind::Enum => {
                    if id.string() == list.string() {
                        list.set_flag(NodeFlag::EnumInUse, true);
                        return Some(list);
                    }
                    for idx in 0..max_children {
                        let entry = list.child(idx);
                        if entry.kind() == NodeKind::Variable && id.string() == entry.string()
                        {
                            entry.set_flag(NodeFlag::VariableInUse, true);
                            return Some(entry);
                        }
                    }
                }

                NodeKind::Class | NodeKind::Interface => {
                    // the members, plus the extends/implements ancestry
                    if let Some(resolution) =
                        self.find_in_extends(&list, &id, params, all_matches, search_flags)
                    {
                        if self.funcs_name(Some(&resolution), all_matches) {
                            return Some(resolution);
                        }
                    }
                }

                NodeKind::Package => {
                    // the first child is a directive list handled on
                    // the next iteration; nothing specific here
                }

                _ => {
                    panic!(
                        "resolve_name(): unhandled scope node type {}",
                        list.kind().name()
                    );
                }
            }
        }
    }

    /// End of a search: settle on the collected function matches.
    fn final_matches(&mut self, all_matches: Option<&NodeRef>) -> Option<NodeRef> {
        let all_matches = all_matches?;
        if all_matches.children_count() == 0 {
            return None;
        }
        self.select_best_func(all_matches)
    }
}
