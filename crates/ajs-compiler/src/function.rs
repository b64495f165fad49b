//! Function compilation and overload selection.
//!
//! Overload resolution scores every candidate with a PARAM_MATCH node
//! recording, per formal parameter, the depth at which the actual
//! argument type matched (1 is exact, higher means a base class, a huge
//! depth means "matched because the parameter is untyped").
//! `select_best_func` then compares the collected matches pairwise.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{
    NodeAttr, NodeFlag, NodeKind, NodeRef, MATCH_HIGHEST_DEPTH, MATCH_LOWEST_DEPTH,
    MATCH_NOT_FOUND,
};

use crate::{Compiler, SEARCH_FLAG_GETTER, SEARCH_FLAG_SETTER};

impl Compiler {
    /// Compile a PARAMETERS node: uniqueness, types and default
    /// values.
    pub(crate) fn parameters(&mut self, parameters_node: &NodeRef) {
        let count = parameters_node.children_count();

        for idx in 0..count {
            let param = parameters_node.child(idx);
            param.set_flag(NodeFlag::ParamReferenced, false);
            param.set_flag(NodeFlag::ParamParamref, false);
        }

        for idx in 0..count {
            let param = parameters_node.child(idx);

            // defined twice or more?
            for k in 0..idx {
                let prev = parameters_node.child(k);
                if !param.string().is_empty() && prev.string() == param.string() {
                    message::error(
                        ErrCode::Duplicates,
                        &parameters_node.position(),
                        format!(
                            "parameter \"{}\" is defined two or more times in the same list of parameters.",
                            param.string()
                        ),
                    );
                    break;
                }
            }

            for j in 0..param.children_count() {
                let child = param.child(j);
                match child.kind() {
                    NodeKind::Set => {
                        let expr = child.child(0);
                        self.expression(&expr);
                    }
                    NodeKind::Type => {
                        let expr = child.child(0);
                        self.expression(&expr);
                        if param.type_node().is_none() {
                            if let Some(type_node) = expr.type_node() {
                                param.set_type_node(&type_node);
                            }
                        }
                    }
                    _ => {
                        message::error(
                            ErrCode::InternalError,
                            &param.position(),
                            "found an incompatible node in the list of parameters.",
                        );
                    }
                }
            }
        }

        // parameters referenced by other parameters must be kept
        for idx in 0..count {
            let param = parameters_node.child(idx);
            if param.get_flag(NodeFlag::ParamReferenced) {
                param.set_flag(NodeFlag::ParamParamref, true);
            }
        }
    }

    /// Compile a function declaration.
    pub(crate) fn function(&mut self, function_node: &NodeRef) {
        // skip "deleted" functions
        if self.get_attribute(function_node, NodeAttr::Unused)
            || self.get_attribute(function_node, NodeAttr::False)
        {
            return;
        }

        // find the container: class/interface member, package function
        // or local/global definition
        let mut member = false;
        let mut package = false;
        let mut list: Option<NodeRef> = None;
        let mut search = function_node.parent();
        while let Some(parent) = search {
            match parent.kind() {
                NodeKind::Class | NodeKind::Interface => {
                    member = true;
                    list = Some(parent);
                    break;
                }
                NodeKind::Package => {
                    package = true;
                    list = Some(parent);
                    break;
                }
                NodeKind::Catch
                | NodeKind::Do
                | NodeKind::Else
                | NodeKind::Finally
                | NodeKind::For
                | NodeKind::Function
                | NodeKind::If
                | NodeKind::Program
                | NodeKind::Root
                | NodeKind::Switch
                | NodeKind::Try
                | NodeKind::While
                | NodeKind::With => {
                    break;
                }
                NodeKind::DirectiveList => {
                    if list.is_none() {
                        list = Some(parent.clone());
                    }
                    search = parent.parent();
                }
                _ => search = parent.parent(),
            }
        }
        let container = list;

        // attributes only meaningful on members
        if !member {
            let member_attributes = [
                NodeAttr::Abstract,
                NodeAttr::Static,
                NodeAttr::Protected,
                NodeAttr::Virtual,
                NodeAttr::Constructor,
                NodeAttr::Final,
            ];
            let used: Vec<&str> = member_attributes
                .iter()
                .filter(|a| self.get_attribute(function_node, **a))
                .map(|a| match a {
                    NodeAttr::Abstract => "abstract",
                    NodeAttr::Static => "static",
                    NodeAttr::Protected => "protected",
                    NodeAttr::Virtual => "virtual",
                    NodeAttr::Constructor => "constructor",
                    _ => "final",
                })
                .collect();
            if !used.is_empty() {
                message::error(
                    ErrCode::InvalidAttributes,
                    &function_node.position(),
                    format!(
                        "function \"{}\" was defined with attribute{} \"{}\" which can only be used with a function member inside a class definition.",
                        function_node.string(),
                        if used.len() == 1 { "" } else { "s" },
                        used.join("\", \"")
                    ),
                );
            }

            if function_node.get_flag(NodeFlag::FunctionOperator) {
                message::error(
                    ErrCode::InvalidOperator,
                    &function_node.position(),
                    format!(
                        "operator \"{}\" can only be defined inside a class definition.",
                        function_node.string()
                    ),
                );
            }
        }

        if self.get_attribute(function_node, NodeAttr::Private) && !package && !member {
            message::error(
                ErrCode::InvalidAttributes,
                &function_node.position(),
                format!(
                    "function \"{}\" was defined with the \"private\" attribute which can only be used inside a class or package definition.",
                    function_node.string()
                ),
            );
        }

        if !self.define_function_type(function_node) {
            return;
        }

        for idx in 0..function_node.children_count() {
            let child = function_node.child(idx);
            match child.kind() {
                NodeKind::Parameters => self.parameters(&child),

                NodeKind::DirectiveList => {
                    if self.get_attribute(function_node, NodeAttr::Abstract) {
                        message::error(
                            ErrCode::ImproperStatement,
                            &function_node.position(),
                            format!(
                                "the function \"{}\" is marked \"abstract\" and cannot have a body.",
                                function_node.string()
                            ),
                        );
                    }
                    self.find_labels(function_node, &child);
                    self.directive_list(&child);
                }

                NodeKind::Type => {
                    if child.children_count() == 1 {
                        let expr = child.child(0);
                        self.expression(&expr);
                        if self.is_constructor(function_node).is_some() {
                            message::error(
                                ErrCode::InvalidReturnType,
                                &function_node.position(),
                                format!(
                                    "a constructor must return \"Void\" and nothing else, \"{}\" is invalid.",
                                    function_node.string()
                                ),
                            );
                        }
                    }
                }

                NodeKind::Require | NodeKind::Ensure => {
                    // contracts are labelled boolean expressions
                    for j in 0..child.children_count() {
                        let label = child.child(j);
                        if label.kind() == NodeKind::Label && label.children_count() == 1 {
                            let expr = label.child(0);
                            self.expression(&expr);
                        }
                    }
                }

                NodeKind::Throws => {
                    for j in 0..child.children_count() {
                        let exception = child.child(j);
                        self.expression(&exception);
                    }
                }

                _ => {}
            }
        }

        // overriding a final function is forbidden; duplicate
        // prototypes in one scope as well
        if member {
            if let Some(class_node) = container.clone() {
                if self.check_final_functions(function_node, &class_node) {
                    message::error(
                        ErrCode::CannotOverload,
                        &function_node.position(),
                        format!(
                            "function \"{}\" was marked as final in a super class and thus it cannot be defined in class \"{}\".",
                            function_node.string(),
                            class_node.string()
                        ),
                    );
                }
                self.check_unique_functions(function_node, &class_node);
            }
        } else if let Some(list) = container {
            self.check_unique_functions(function_node, &list);
        }

        if function_node.get_flag(NodeFlag::FunctionNever)
            && self.is_constructor(function_node).is_some()
        {
            message::error(
                ErrCode::InvalidReturnType,
                &function_node.position(),
                "a constructor must return (it cannot be marked Never).",
            );
        }
    }

    /// Resolve the return type of a function when not known yet.
    /// Constructors default to Void, everything else to Object.
    pub(crate) fn define_function_type(&mut self, function_node: &NodeRef) -> bool {
        if function_node.type_node().is_some() {
            return true;
        }

        let mut found = false;
        for idx in 0..function_node.children_count() {
            let type_child = function_node.child(idx);
            if type_child.kind() == NodeKind::Type && type_child.children_count() == 1 {
                let expr = type_child.child(0);
                expr.set_attr_tree(NodeAttr::Type, true);
                self.expression(&expr);
                if matches!(
                    expr.kind(),
                    NodeKind::Identifier | NodeKind::Videntifier | NodeKind::String | NodeKind::Member
                ) {
                    if let Some(resolution) = self.resolve_name(&expr, &expr, None, None, 0) {
                        function_node.set_type_node(&resolution);
                    }
                }
                found = true;
                break;
            }
        }

        if !found {
            if function_node.get_flag(NodeFlag::FunctionVoid)
                || function_node.get_flag(NodeFlag::FunctionNever)
                || self.is_constructor(function_node).is_some()
            {
                // procedures have no return type to link
                return true;
            }
            // a literal return tells us the type without a declaration
            if let Some(body) = function_node.find_first_child(NodeKind::DirectiveList) {
                if let Some(inferred) = self.infer_return_type(&body) {
                    function_node.set_type_node(&inferred);
                    return true;
                }
            }
            // default to Object
            if let Some(object) = self.resolve_internal_type(function_node, "Object") {
                function_node.set_type_node(&object);
            }
        }

        true
    }

    /// Scan a function body for a `return <literal>;` and resolve the
    /// literal's type. Nested functions are opaque to the scan.
    fn infer_return_type(&mut self, list: &NodeRef) -> Option<NodeRef> {
        for idx in 0..list.children_count() {
            let child = list.child(idx);
            match child.kind() {
                NodeKind::Return => {
                    if child.children_count() == 1 {
                        let expr = child.child(0);
                        self.type_expr(&expr);
                        if let Some(type_node) = expr.type_node() {
                            return Some(type_node);
                        }
                    }
                }
                NodeKind::Function | NodeKind::Class | NodeKind::Interface => {}
                _ => {
                    if let Some(type_node) = self.infer_return_type(&child) {
                        return Some(type_node);
                    }
                }
            }
        }
        None
    }

    /// Depth at which the type of actual argument `t1` matches formal
    /// parameter `t2` (a PARAM node).
    pub(crate) fn match_type(&mut self, t1: &NodeRef, t2: &NodeRef) -> i32 {
        let formal = t2;
        if formal.kind() == NodeKind::Param {
            if formal.get_flag(NodeFlag::ParamOut) {
                // an out parameter needs a variable to write to
                if t1.kind() != NodeKind::Identifier {
                    message::warning(
                        ErrCode::MissingVariableName,
                        &t1.position(),
                        "a variable name is expected for a function parameter flagged as an OUT parameter.",
                    );
                    return MATCH_NOT_FOUND;
                }
            }
            let type_child = match formal.find_first_child(NodeKind::Type) {
                None => return MATCH_LOWEST_DEPTH,
                Some(type_child) => type_child,
            };
            if type_child.children_count() == 0 {
                return MATCH_LOWEST_DEPTH;
            }
            let id = type_child.child(0);
            if !matches!(
                id.kind(),
                NodeKind::Identifier | NodeKind::Videntifier | NodeKind::String | NodeKind::Member
            ) {
                return MATCH_LOWEST_DEPTH;
            }
            if id.type_node().is_none() {
                match self.resolve_name(&type_child, &id, None, None, 0) {
                    None => return MATCH_NOT_FOUND,
                    Some(resolution) => id.set_type_node(&resolution),
                }
            }
            return self.match_resolved_types(t1, &id);
        }

        self.match_resolved_types(t1, formal)
    }

    fn match_resolved_types(&mut self, t1: &NodeRef, t2: &NodeRef) -> i32 {
        let tp2 = t2.type_node();

        let tp1 = match t1.type_node() {
            Some(tp1) => tp1,
            None => {
                self.type_expr(t1);
                match t1.type_node() {
                    // untyped actuals match anything perfectly
                    None => return MATCH_HIGHEST_DEPTH,
                    Some(tp1) => tp1,
                }
            }
        };

        let tp2 = match tp2 {
            None => return MATCH_LOWEST_DEPTH,
            Some(tp2) => tp2,
        };

        if tp1 == tp2 {
            return MATCH_HIGHEST_DEPTH;
        }

        // Object matches everything, at the lowest priority
        if let Some(object) = self.resolve_internal_type(t1, "Object") {
            if tp1 == object {
                return MATCH_HIGHEST_DEPTH;
            }
            if tp2 == object {
                return MATCH_LOWEST_DEPTH;
            }
        }

        if tp1.kind() != NodeKind::Class {
            return MATCH_NOT_FOUND;
        }

        self.find_class(&tp1, &tp2, 2)
    }

    /// Whether `function_node` matches a search for `name` (taking the
    /// getter/setter renames into account). The resolution is the
    /// function itself.
    pub(crate) fn check_function(
        &mut self,
        function_node: &NodeRef,
        name: &str,
        params: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        if self.get_attribute(function_node, NodeAttr::Unused) {
            return None;
        }

        if function_node.get_flag(NodeFlag::FunctionGetter)
            && search_flags & SEARCH_FLAG_GETTER != 0
        {
            if function_node.string() != format!("->{name}") {
                return None;
            }
        } else if function_node.get_flag(NodeFlag::FunctionSetter)
            && search_flags & SEARCH_FLAG_SETTER != 0
        {
            if function_node.string() != format!("<-{name}") {
                return None;
            }
        } else if function_node.string() != name {
            return None;
        }

        if params.is_none() {
            // getters and setters are accessed like variables; a plain
            // function without a call does not match one
            if function_node.get_flag(NodeFlag::FunctionGetter)
                || function_node.get_flag(NodeFlag::FunctionSetter)
            {
                if self.is_constructor(function_node).is_none()
                    && function_node.string() == name
                {
                    message::error(
                        ErrCode::MismatchFuncVar,
                        &function_node.position(),
                        format!(
                            "a variable name was expected, we found the function \"{}\" instead.",
                            function_node.string()
                        ),
                    );
                }
                if function_node.string() != format!("->{name}")
                    && function_node.string() != format!("<-{name}")
                    && function_node.string() != name
                {
                    return None;
                }
            }
            self.define_function_type(function_node);
        }

        Some(function_node.clone())
    }

    /// Score `function_node` against the caller's parameters, adding a
    /// PARAM_MATCH entry to `all_matches` on success. Returns false on
    /// a hard error.
    pub(crate) fn check_function_with_params(
        &mut self,
        function_node: &NodeRef,
        params: Option<&NodeRef>,
        all_matches: &NodeRef,
    ) -> bool {
        let params = match params {
            // nothing to check against
            None => return true,
            Some(params) => params,
        };

        if !self.define_function_type(function_node) {
            return false;
        }

        let match_node = function_node.create_replacement(NodeKind::ParamMatch);
        match_node.set_instance(function_node);

        let count = params.children_count();
        let parameters_node = function_node.find_first_child(NodeKind::Parameters);

        let parameters_node = match parameters_node {
            None => {
                // no parameter list: NOPARAMS means (void), otherwise
                // the function is unprototyped and takes anything at
                // the lowest priority
                if !function_node.get_flag(NodeFlag::FunctionNoparams) {
                    match_node.set_flag(NodeFlag::ParamMatchUnprototyped, true);
                    all_matches.append_child(&match_node);
                    return true;
                }
                if count == 0 {
                    all_matches.append_child(&match_node);
                }
                return true;
            }
            Some(parameters_node) => parameters_node,
        };

        let max_parameters = parameters_node.children_count();
        if max_parameters == 0 {
            if count > 0 {
                return true;
            }
            all_matches.append_child(&match_node);
            return true;
        }

        // explicitly unprototyped?
        if parameters_node.child(0).get_flag(NodeFlag::ParamUnprototyped) {
            match_node.set_flag(NodeFlag::ParamMatchUnprototyped, true);
            all_matches.append_child(&match_node);
            return true;
        }

        let size = max_parameters.max(count);
        match_node.set_param_size(size);

        let mut min = 0;
        let mut rest = max_parameters;
        let mut idx = 0;
        for p_idx in 0..count {
            let p = params.child(p_idx);
            if p.kind() == NodeKind::ParamMatch {
                continue;
            }

            // named argument?
            let mut name = String::new();
            for c in 0..p.children_count() {
                let child = p.child(c);
                if child.kind() == NodeKind::Name {
                    name = child.string();
                    break;
                }
            }

            let j;
            let fp;
            if !name.is_empty() {
                let mut found = None;
                for k in 0..max_parameters {
                    if parameters_node.child(k).string() == name {
                        found = Some(k);
                        break;
                    }
                }
                j = match found {
                    None => {
                        message::error(
                            ErrCode::InvalidFieldName,
                            &function_node.position(),
                            format!(
                                "no parameter named \"{name}\" was found in this function declaration."
                            ),
                        );
                        return false;
                    }
                    Some(k) => k,
                };
                fp = parameters_node.child(j);
                if match_node.param_depth(j) != MATCH_NOT_FOUND
                    && !fp.get_flag(NodeFlag::ParamRest)
                {
                    message::error(
                        ErrCode::InvalidFieldName,
                        &function_node.position(),
                        format!(
                            "function parameter name \"{name}\" already used & not a \"rest\" (...) parameter."
                        ),
                    );
                    return false;
                }
            } else {
                // first unfilled positional slot
                let mut k = min;
                while k < max_parameters && match_node.param_depth(k) != MATCH_NOT_FOUND {
                    k += 1;
                }
                min = k;
                if k == max_parameters {
                    // everything taken; a trailing rest absorbs extras
                    let last = parameters_node.child(max_parameters - 1);
                    if !last.get_flag(NodeFlag::ParamRest) {
                        // candidate rejected, not a hard error
                        self.err_flags |= crate::SEARCH_ERROR_PROTOTYPE;
                        return true;
                    }
                    fp = last;
                    j = rest.min(size - 1);
                    rest += 1;
                } else {
                    fp = parameters_node.child(k);
                    j = k;
                }
            }

            let depth = self.match_type(&p, &fp);
            if depth == MATCH_NOT_FOUND {
                // type mismatch: candidate rejected
                self.err_flags |= crate::SEARCH_ERROR_PROTOTYPE;
                return true;
            }
            match_node.set_param_depth(j, depth);
            match_node.set_param_index(idx, j);
            idx += 1;
        }

        // unfilled formals need a default, UNCHECKED or REST
        for j in min..max_parameters {
            if match_node.param_depth(j) == MATCH_NOT_FOUND {
                if idx < size {
                    match_node.set_param_index(idx, j);
                }
                idx += 1;
                let param = parameters_node.child(j);
                if !param.get_flag(NodeFlag::ParamUnchecked)
                    && !param.get_flag(NodeFlag::ParamRest)
                    && param.find_first_child(NodeKind::Set).is_none()
                {
                    // missing argument: candidate rejected
                    self.err_flags |= crate::SEARCH_ERROR_PROTOTYPE;
                    return true;
                }
            }
        }

        all_matches.append_child(&match_node);
        true
    }

    fn best_param_match_derived_from(
        &mut self,
        best: &mut NodeRef,
        match_node: NodeRef,
    ) -> bool {
        let best_func = best.instance();
        let match_func = match_node.instance();
        if let (Some(best_func), Some(match_func)) = (best_func, match_func) {
            let (best_wins, _) =
                self.are_objects_derived_from_one_another(&best_func, &match_func);
            if best_wins {
                // best is declared in the more derived class, keep it
                return true;
            }
            let (match_wins, _) =
                self.are_objects_derived_from_one_another(&match_func, &best_func);
            if match_wins {
                *best = match_node;
                return true;
            }
        }

        let name = best
            .instance()
            .map(|f| f.string())
            .unwrap_or_default();
        message::error(
            ErrCode::Duplicates,
            &best.position(),
            format!(
                "found two functions named \"{name}\" and both have the same prototype. Cannot determine which one to use."
            ),
        );
        false
    }

    fn best_param_match(&mut self, best: &mut NodeRef, match_node: NodeRef) -> bool {
        let b_sz = best.param_size();
        let m_sz = match_node.param_size();

        // unprototyped candidates are the last resort
        if b_sz == 0 {
            if m_sz == 0 {
                return self.best_param_match_derived_from(best, match_node);
            }
            *best = match_node;
            return true;
        }
        if m_sz == 0 {
            return true;
        }

        let mut b_more = 0;
        let mut m_more = 0;
        for idx in 0..b_sz.min(m_sz) {
            let r = best.param_depth(idx) - match_node.param_depth(idx);
            if r < 0 {
                b_more += 1;
            } else if r > 0 {
                m_more += 1;
            }
        }

        // both better somewhere (or neither anywhere): tie, settled by
        // the derivation order of the declaring classes
        if (b_more != 0) == (m_more != 0) {
            return self.best_param_match_derived_from(best, match_node);
        }

        if m_more != 0 {
            *best = match_node;
        }
        true
    }

    /// Pick the best function from the collected PARAM_MATCH nodes.
    pub(crate) fn select_best_func(&mut self, all_matches: &NodeRef) -> Option<NodeRef> {
        let mut found = true;
        let mut best: Option<NodeRef> = None;

        for idx in 0..all_matches.children_count() {
            let match_node = all_matches.child(idx);
            if match_node.kind() != NodeKind::ParamMatch {
                continue;
            }
            match best.as_mut() {
                None => best = Some(match_node),
                Some(best) => {
                    let previous_best = best.clone();
                    if !self.best_param_match(best, match_node) {
                        found = false;
                    } else if !found && previous_best != *best {
                        // something better than a tie appeared
                        found = true;
                    }
                }
            }
        }

        let best = best.expect("select_best_func() called with an empty list of choices");
        if found {
            best.instance()
        } else {
            None
        }
    }

    /// Whether the resolution settles a name search immediately (it is
    /// not an overloadable function).
    pub(crate) fn funcs_name(
        &mut self,
        resolution: Option<&NodeRef>,
        all_matches: Option<&NodeRef>,
    ) -> bool {
        let count = all_matches.map_or(0, |m| m.children_count());
        let resolution = match resolution {
            None => return count == 0,
            Some(resolution) => resolution,
        };
        if resolution.kind() != NodeKind::Function {
            return count == 0;
        }
        if resolution.get_flag(NodeFlag::FunctionGetter)
            || resolution.get_flag(NodeFlag::FunctionSetter)
        {
            // getters are viewed as variables, no overloading possible
            return count == 0;
        }
        false
    }

    /// After the overload is selected, append the missing arguments:
    /// the explicit defaults, or `undefined`.
    pub(crate) fn call_add_missing_params(&mut self, call: &NodeRef, params: &NodeRef) {
        let mut idx = params.children_count();
        if idx == 0 {
            return;
        }

        // the parameter match is always last when present
        idx -= 1;
        let match_node = params.child(idx);
        if match_node.kind() != NodeKind::ParamMatch {
            return;
        }
        params.delete_child(idx);

        let size = match_node.param_size();
        if idx >= size {
            return;
        }

        let function_node = match call.instance() {
            None => return,
            Some(function_node) => function_node,
        };
        let parameters_node = match function_node.find_first_child(NodeKind::Parameters) {
            None => return,
            Some(parameters_node) => parameters_node,
        };
        let max_children = parameters_node.children_count();

        while idx < size {
            let j = match_node.param_index(idx);
            if j >= max_children {
                break;
            }
            let param = parameters_node.child(j);
            let mut has_set = false;
            for k in 0..param.children_count() {
                let set = param.child(k);
                if set.kind() == NodeKind::Set && set.children_count() > 0 {
                    has_set = true;
                    let auto_param = call.create_replacement(NodeKind::Auto);
                    let default_value = set.child(0);
                    auto_param.set_instance(&default_value);
                    params.append_child(&auto_param);
                    break;
                }
            }
            if !has_set {
                let undefined = call.create_replacement(NodeKind::Undefined);
                params.append_child(&undefined);
            }
            idx += 1;
        }
    }

    // ── Final functions and duplicates ─────────────────────────────────

    fn find_final_functions(&mut self, function_node: &NodeRef, super_class: &NodeRef) -> bool {
        for idx in 0..super_class.children_count() {
            let child = super_class.child(idx);
            match child.kind() {
                NodeKind::Extends => {
                    if child.children_count() > 0 {
                        if let Some(next_super) = child.child(0).instance() {
                            if self.find_final_functions(function_node, &next_super) {
                                return true;
                            }
                        }
                    }
                }
                NodeKind::DirectiveList => {
                    if self.find_final_functions(function_node, &child) {
                        return true;
                    }
                }
                NodeKind::Function => {
                    if function_node.string() == child.string()
                        && self.get_attribute(&child, NodeAttr::Final)
                    {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Whether a super class marks a function of this name final.
    pub(crate) fn check_final_functions(
        &mut self,
        function_node: &NodeRef,
        class_node: &NodeRef,
    ) -> bool {
        for idx in 0..class_node.children_count() {
            let child = class_node.child(idx);
            if child.kind() == NodeKind::Extends && child.children_count() > 0 {
                let name = child.child(0);
                if let Some(super_class) = name.instance() {
                    if self.find_final_functions(function_node, &super_class) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Whether two functions have the same prototype (same names and
    /// parameter types, position by position).
    pub(crate) fn compare_parameters(
        &mut self,
        lfunction: &NodeRef,
        rfunction: &NodeRef,
    ) -> bool {
        let lparams = lfunction.find_first_child(NodeKind::Parameters);
        let rparams = rfunction.find_first_child(NodeKind::Parameters);

        let lmax = lparams.as_ref().map_or(0, NodeRef::children_count);
        let rmax = rparams.as_ref().map_or(0, NodeRef::children_count);
        if lmax != rmax {
            return false;
        }

        for idx in 0..lmax {
            let lp = lparams.as_ref().unwrap().child(idx);
            let rp = rparams.as_ref().unwrap().child(idx);
            let ltype = lp.find_first_child(NodeKind::Type);
            let rtype = rp.find_first_child(NodeKind::Type);
            let same = match (&ltype, &rtype) {
                (None, None) => true,
                (Some(l), Some(r)) => {
                    if l.children_count() == 1 && r.children_count() == 1 {
                        let le = l.child(0);
                        let re = r.child(0);
                        match (le.instance(), re.instance()) {
                            (Some(li), Some(ri)) => li == ri,
                            _ => le.string() == re.string(),
                        }
                    } else {
                        true
                    }
                }
                _ => false,
            };
            if !same {
                return false;
            }
        }
        true
    }

    /// Reject a second function of the same name and prototype in one
    /// scope.
    pub(crate) fn check_unique_functions(
        &mut self,
        function_node: &NodeRef,
        scope: &NodeRef,
    ) {
        self.check_unique_functions_in(function_node, scope);
    }

    fn check_unique_functions_in(&mut self, function_node: &NodeRef, list: &NodeRef) {
        for idx in 0..list.children_count() {
            let child = list.child(idx);
            match child.kind() {
                NodeKind::DirectiveList => {
                    self.check_unique_functions_in(function_node, &child);
                }
                NodeKind::Function => {
                    if child != *function_node
                        && child.string() == function_node.string()
                        && !child.string().is_empty()
                        && self.compare_parameters(function_node, &child)
                    {
                        message::error(
                            ErrCode::Duplicates,
                            &function_node.position(),
                            format!(
                                "the function \"{}\" was already defined with the same prototype in this scope.",
                                function_node.string()
                            ),
                        );
                    }
                }
                _ => {}
            }
        }
    }
}
