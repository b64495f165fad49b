//! Statement compilation: control flow checks and the resolution of
//! break/continue/goto targets.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{NodeFlag, NodeKind, NodeRef};

use crate::Compiler;

impl Compiler {
    pub(crate) fn with(&mut self, with_node: &NodeRef) {
        if with_node.children_count() != 2 {
            return;
        }

        let object = with_node.child(0);
        if object.kind() == NodeKind::This {
            message::error(
                ErrCode::InvalidExpression,
                &object.position(),
                "'with' cannot use 'this' as an object.",
            );
        }
        self.expression(&object);

        let sub_directives = with_node.child(1);
        self.directive_list(&sub_directives);
    }

    /// Resolve a goto: find the label in the enclosing unit and record
    /// the label and the common parent frame in the goto node.
    pub(crate) fn goto_directive(&mut self, goto_node: &NodeRef) {
        let mut parents: Vec<NodeRef> = Vec::new();
        let mut label: Option<NodeRef> = None;
        let mut parent = goto_node.clone();
        while label.is_none() {
            parent = match parent.parent() {
                None => {
                    // walked out without a function/program/package
                    return;
                }
                Some(parent) => parent,
            };

            match parent.kind() {
                NodeKind::Class | NodeKind::Interface => {
                    message::error(
                        ErrCode::ImproperStatement,
                        &goto_node.position(),
                        "cannot have a GOTO instruction in a 'class' or 'interface'.",
                    );
                    return;
                }

                NodeKind::Function | NodeKind::Package | NodeKind::Program => {
                    label = parent.find_label(&goto_node.string());
                    if label.is_none() {
                        message::error(
                            ErrCode::LabelNotFound,
                            &goto_node.position(),
                            format!(
                                "label '{}' for goto instruction not found.",
                                goto_node.string()
                            ),
                        );
                        return;
                    }
                }

                _ => {}
            }
            parents.push(parent.clone());
        }
        let label = label.unwrap();
        goto_node.set_goto_enter(&label);

        // find the first common parent frame of the goto and the label
        let mut parent = label;
        loop {
            parent = match parent.parent() {
                None => return,
                Some(parent) => parent,
            };
            if parents.iter().any(|p| *p == parent) {
                goto_node.set_goto_exit(&parent);
                return;
            }
        }
    }

    pub(crate) fn for_directive(&mut self, for_node: &NodeRef) {
        // two forms: for(foo in blah) with 3 children and for(a;b;c)
        // with 4
        if for_node.children_count() < 3 {
            return;
        }

        for idx in 0..for_node.children_count() {
            let child = for_node.child(idx);
            match child.kind() {
                NodeKind::Empty => {}
                NodeKind::DirectiveList => {
                    self.directive_list(&child);
                }
                NodeKind::Var => self.var(&child),
                _ => self.expression(&child),
            }
        }
    }

    pub(crate) fn switch_directive(&mut self, switch_node: &NodeRef) {
        if switch_node.children_count() != 2 {
            return;
        }

        let expr = switch_node.child(0);
        self.expression(&expr);

        // the list of directives must start with a case or default
        // label (the parser does not enforce it)
        let directive_list_node = switch_node.child(1);
        if directive_list_node.children_count() > 0 {
            let child = directive_list_node.child(0);
            if !matches!(child.kind(), NodeKind::Case | NodeKind::Default) {
                message::error(
                    ErrCode::InaccessibleStatement,
                    &switch_node.position(),
                    "the list of instructions of a 'switch()' statement must start with a 'case' or 'default' label.",
                );
            }
        }

        self.directive_list(&directive_list_node);

        // reset for a potential second compilation pass
        switch_node.set_flag(NodeFlag::SwitchDefault, false);
    }

    pub(crate) fn case_directive(&mut self, case_node: &NodeRef) {
        // only valid directly inside a switch block
        let switch_node = case_node.parent().and_then(|list| list.parent());
        let switch_node = match switch_node {
            None => return,
            Some(switch_node) => switch_node,
        };
        if switch_node.kind() != NodeKind::Switch {
            message::error(
                ErrCode::ImproperStatement,
                &case_node.position(),
                "a 'case' statement can only be used within a 'switch()' block.",
            );
            return;
        }

        if case_node.children_count() > 0 {
            let expr = case_node.child(0);
            self.expression(&expr);
            if case_node.children_count() > 1 {
                // ranges only work with the 'in' and default operators
                match switch_node.switch_operator() {
                    NodeKind::Unknown | NodeKind::In => {}
                    _ => {
                        message::error(
                            ErrCode::InvalidExpression,
                            &case_node.position(),
                            "a range on a 'case' statement can only be used with the 'in' and 'default' switch() operators.",
                        );
                    }
                }
                let to = case_node.child(1);
                self.expression(&to);
            }
        }
    }

    pub(crate) fn default_directive(&mut self, default_node: &NodeRef) {
        let switch_node = default_node.parent().and_then(|list| list.parent());
        let switch_node = match switch_node {
            None => return,
            Some(switch_node) => switch_node,
        };
        if switch_node.kind() != NodeKind::Switch {
            message::error(
                ErrCode::InaccessibleStatement,
                &default_node.position(),
                "a 'default' statement can only be used within a 'switch()' block.",
            );
            return;
        }

        if switch_node.get_flag(NodeFlag::SwitchDefault) {
            message::error(
                ErrCode::ImproperStatement,
                &default_node.position(),
                "only one 'default' statement can be used within one 'switch()'.",
            );
        } else {
            switch_node.set_flag(NodeFlag::SwitchDefault, true);
        }
    }

    pub(crate) fn if_directive(&mut self, if_node: &NodeRef) {
        if if_node.children_count() < 2 {
            return;
        }
        let expr = if_node.child(0);
        self.expression(&expr);
        let then_list = if_node.child(1);
        self.directive_list(&then_list);
        if if_node.children_count() == 3 {
            let else_list = if_node.child(2);
            self.directive_list(&else_list);
        }
    }

    pub(crate) fn while_directive(&mut self, while_node: &NodeRef) {
        if while_node.children_count() != 2 {
            return;
        }
        let expr = while_node.child(0);
        self.expression(&expr);
        let body = while_node.child(1);
        self.directive_list(&body);
    }

    pub(crate) fn do_directive(&mut self, do_node: &NodeRef) {
        if do_node.children_count() != 2 {
            return;
        }
        let body = do_node.child(0);
        self.directive_list(&body);
        let expr = do_node.child(1);
        self.expression(&expr);
    }

    /// Find the statement a break/continue exits and record it in
    /// `goto_exit`.
    pub(crate) fn break_continue(&mut self, break_node: &NodeRef) {
        let no_label = break_node.string().is_empty();
        let accept_switch = !no_label || break_node.kind() == NodeKind::Break;
        let mut found_switch = false;

        let mut parent = break_node.clone();
        loop {
            parent = match parent.parent() {
                None => return,
                Some(parent) => parent,
            };
            if parent.kind() == NodeKind::Switch {
                found_switch = true;
            }
            if (parent.kind() == NodeKind::Switch && accept_switch)
                || matches!(
                    parent.kind(),
                    NodeKind::For | NodeKind::Do | NodeKind::While
                )
            {
                if no_label {
                    // break/continue the closest loop or switch
                    break;
                }
                // a labelled break: the statement must be preceded by
                // the matching label
                let offset = parent.offset();
                if offset > 0 {
                    if let Some(p) = parent.parent() {
                        let previous = p.child(offset - 1);
                        if previous.kind() == NodeKind::Label
                            && previous.string() == break_node.string()
                        {
                            break;
                        }
                    }
                }
            }
            if matches!(
                parent.kind(),
                NodeKind::Function
                    | NodeKind::Program
                    | NodeKind::Class
                    | NodeKind::Interface
                    | NodeKind::Package
            ) {
                if no_label {
                    if found_switch {
                        message::error(
                            ErrCode::ImproperStatement,
                            &break_node.position(),
                            "you cannot use a 'continue' statement outside a loop (and you need a label to make it work with a 'switch' statement).",
                        );
                    } else {
                        message::error(
                            ErrCode::ImproperStatement,
                            &break_node.position(),
                            "you cannot use a 'break' or 'continue' instruction outside a loop or 'switch' statement.",
                        );
                    }
                } else {
                    message::error(
                        ErrCode::LabelNotFound,
                        &break_node.position(),
                        format!(
                            "could not find a loop or 'switch' statement labelled '{}' for this 'break' or 'continue'.",
                            break_node.string()
                        ),
                    );
                }
                return;
            }
        }

        // record the target; the code generator decides how to unwind
        break_node.set_goto_exit(&parent);
    }

    pub(crate) fn throw_directive(&mut self, throw_node: &NodeRef) {
        if throw_node.children_count() != 1 {
            return;
        }
        let expr = throw_node.child(0);
        self.expression(&expr);
    }

    /// A try must be followed by a catch or a finally.
    pub(crate) fn try_directive(&mut self, try_node: &NodeRef) {
        if try_node.children_count() != 1 {
            return;
        }

        let mut correct = false;
        if let Some(parent) = try_node.parent() {
            let offset = try_node.offset() + 1;
            if offset < parent.children_count() {
                let next = parent.child(offset);
                correct = matches!(next.kind(), NodeKind::Catch | NodeKind::Finally);
            }
        }
        if !correct {
            message::error(
                ErrCode::InvalidTry,
                &try_node.position(),
                "a 'try' statement needs to be followed by at least one of 'catch' or 'finally'.",
            );
        }

        let body = try_node.child(0);
        self.directive_list(&body);
    }

    /// A catch must follow a try or a typed catch; only the last catch
    /// of a chain may be untyped.
    pub(crate) fn catch_directive(&mut self, catch_node: &NodeRef) {
        if catch_node.children_count() < 2 {
            return;
        }

        let mut correct = false;
        if let Some(parent) = catch_node.parent() {
            let offset = catch_node.offset();
            if offset > 0 {
                let prev = parent.child(offset - 1);
                if prev.kind() == NodeKind::Try {
                    correct = true;
                } else if prev.kind() == NodeKind::Catch {
                    correct = true;
                    if !prev.get_flag(NodeFlag::CatchTyped) {
                        message::error(
                            ErrCode::InvalidType,
                            &catch_node.position(),
                            "only the last 'catch' statement can have a parameter without a valid type.",
                        );
                    }
                }
            }
        }
        if !correct {
            message::error(
                ErrCode::ImproperStatement,
                &catch_node.position(),
                "a 'catch' statement needs to be preceded by a 'try' or another typed 'catch' statement.",
            );
        }

        let parameters_node = catch_node.child(0);
        if parameters_node.kind() == NodeKind::Parameters {
            self.parameters(&parameters_node);
            if parameters_node.children_count() > 0 {
                let param = parameters_node.child(0);
                param.set_flag(NodeFlag::ParamCatch, true);
            }
        }

        // Netscape-style conditional catch guard
        if let Some(guard) = catch_node.find_first_child(NodeKind::If) {
            if guard.children_count() == 1 {
                let expr = guard.child(0);
                self.expression(&expr);
            }
        }

        let body_idx = catch_node.children_count() - 1;
        let body = catch_node.child(body_idx);
        if body.kind() == NodeKind::DirectiveList {
            self.directive_list(&body);
        }
    }

    pub(crate) fn finally_directive(&mut self, finally_node: &NodeRef) {
        if finally_node.children_count() != 1 {
            return;
        }

        let mut correct = false;
        if let Some(parent) = finally_node.parent() {
            let offset = finally_node.offset();
            if offset > 0 {
                let prev = parent.child(offset - 1);
                correct = matches!(prev.kind(), NodeKind::Try | NodeKind::Catch);
            }
        }
        if !correct {
            message::error(
                ErrCode::ImproperStatement,
                &finally_node.position(),
                "a 'finally' statement needs to be preceded by a 'try' or 'catch' statement.",
            );
        }

        let body = finally_node.child(0);
        self.directive_list(&body);
    }

    /// Validate a return against the enclosing function: procedures and
    /// constructors return nothing, functions return a value, `Never`
    /// functions do not return at all.
    pub(crate) fn return_directive(&mut self, return_node: &NodeRef) -> Option<NodeRef> {
        let mut function_node: Option<NodeRef> = None;
        let mut bad = false;
        let mut parent = return_node.clone();
        loop {
            parent = match parent.parent() {
                None => {
                    bad = true;
                    break;
                }
                Some(parent) => parent,
            };
            match parent.kind() {
                NodeKind::Function => {
                    function_node = Some(parent.clone());
                    break;
                }
                NodeKind::Class
                | NodeKind::Interface
                | NodeKind::Package
                | NodeKind::Program
                | NodeKind::Root => {
                    bad = true;
                    break;
                }
                _ => {}
            }
        }

        if bad {
            message::error(
                ErrCode::ImproperStatement,
                &return_node.position(),
                "'return' can only be used inside a function.",
            );
            return Some(parent);
        }
        let function_node = function_node.unwrap();

        if function_node.get_flag(NodeFlag::FunctionNever) {
            message::error(
                ErrCode::ImproperStatement,
                &return_node.position(),
                format!(
                    "'return' was used inside '{}', a function Never returning.",
                    function_node.string()
                ),
            );
        }

        if return_node.children_count() == 1 {
            if function_node.get_flag(NodeFlag::FunctionVoid)
                || self.is_constructor(&function_node).is_some()
            {
                message::error(
                    ErrCode::ImproperStatement,
                    &return_node.position(),
                    format!(
                        "'return' was used with an expression inside '{}', a function returning Void or a constructor.",
                        function_node.string()
                    ),
                );
            }
            let expr = return_node.child(0);
            self.expression(&expr);
        } else if !function_node.get_flag(NodeFlag::FunctionVoid)
            && self.is_constructor(&function_node).is_none()
        {
            message::error(
                ErrCode::ImproperStatement,
                &return_node.position(),
                format!(
                    "'return' was used without an expression inside '{}', a function which expected a value to be returned.",
                    function_node.string()
                ),
            );
        }

        Some(parent)
    }

    /// `use namespace <expr>;` pushes a namespace binding onto the
    /// scope until the enclosing directive list ends.
    pub(crate) fn use_namespace_directive(&mut self, use_node: &NodeRef) {
        if use_node.children_count() != 1 {
            return;
        }
        let qualifier = use_node.child(0);
        self.expression(&qualifier);

        let entry = use_node.create_replacement(NodeKind::Namespace);
        entry.set_string(qualifier.string());
        self.scope.append_child(&entry);
    }
}
