//! Directive-list visitation.
//!
//! The visit is strictly sequential. An `end_list` sentinel tracks
//! terminators (break, continue, return, throw, goto): once one was
//! seen, the following statements are not accessible, unless a `case`
//! or `default` label resets the flow.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{NodeAttr, NodeFlag, NodeKind, NodeRef};

use crate::Compiler;

impl Compiler {
    /// Compile one directive list. Returns the terminator node when the
    /// list ends in one (the "end list" sentinel).
    pub(crate) fn directive_list(&mut self, directive_list_node: &NodeRef) -> Option<NodeRef> {
        let scope_depth = self.scope.children_count();

        // drop the declarations marked false before visiting
        for idx in 0..directive_list_node.children_count() {
            let child = directive_list_node.child(idx);
            if self.get_attribute(&child, NodeAttr::False) {
                child.to_unknown();
            }
        }

        let mut no_access_reported = false;
        let mut end_list: Option<NodeRef> = None;

        let max_children = directive_list_node.children_count();
        for idx in 0..max_children {
            if self.fatal.is_some() {
                break;
            }
            let child = directive_list_node.child(idx);

            if end_list.is_some() && !no_access_reported {
                no_access_reported = true;
                message::error(
                    ErrCode::InaccessibleStatement,
                    &child.position(),
                    "code is not accessible after a break, continue, goto, throw or return statement.",
                );
            }

            match child.kind() {
                NodeKind::Package => {
                    // nothing happens until the package is referenced
                }

                NodeKind::DirectiveList => {
                    end_list = self.directive_list(&child);
                }

                NodeKind::Label => {
                    // labels need no compilation
                }

                NodeKind::Var => self.var(&child),
                NodeKind::With => self.with(&child),
                NodeKind::Use => self.use_namespace_directive(&child),
                NodeKind::Type => {
                    // numeric type declarations; the endpoints were
                    // checked by the parser
                }

                NodeKind::Goto => {
                    self.goto_directive(&child);
                    end_list = Some(child);
                }

                NodeKind::For => self.for_directive(&child),
                NodeKind::Switch => self.switch_directive(&child),
                NodeKind::Case => self.case_directive(&child),
                NodeKind::Default => self.default_directive(&child),
                NodeKind::If => self.if_directive(&child),
                NodeKind::While => self.while_directive(&child),
                NodeKind::Do => self.do_directive(&child),

                NodeKind::Throw => {
                    self.throw_directive(&child);
                    end_list = Some(child);
                }

                NodeKind::Try => self.try_directive(&child),
                NodeKind::Catch => self.catch_directive(&child),
                NodeKind::Finally => self.finally_directive(&child),

                NodeKind::Break | NodeKind::Continue => {
                    self.break_continue(&child);
                    end_list = Some(child);
                }

                NodeKind::Enum => self.enum_directive(&child),
                NodeKind::Function => self.function(&child),

                NodeKind::Return => {
                    self.return_directive(&child);
                    end_list = Some(child);
                }

                NodeKind::Class | NodeKind::Interface => self.class_directive(&child),
                NodeKind::Import => self.import(&child),

                NodeKind::Synchronized => {
                    // the guard expression and the block
                    if child.children_count() == 2 {
                        let expr = child.child(0);
                        self.expression(&expr);
                        let block = child.child(1);
                        self.directive_list(&block);
                    }
                }

                NodeKind::Debugger => {
                    // carried through for the code generator
                }

                NodeKind::Invariant => {
                    // a list of labelled boolean expressions
                    for j in 0..child.children_count() {
                        let label = child.child(j);
                        if label.kind() == NodeKind::Label && label.children_count() == 1 {
                            let expr = label.child(0);
                            self.expression(&expr);
                        }
                    }
                }

                // standalone expressions
                NodeKind::Assignment
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
                | NodeKind::Call
                | NodeKind::Decrement
                | NodeKind::Delete
                | NodeKind::Increment
                | NodeKind::List
                | NodeKind::Member
                | NodeKind::New
                | NodeKind::PostDecrement
                | NodeKind::PostIncrement => {
                    self.expression(&child);
                }

                NodeKind::Yield => {
                    if child.children_count() == 1 {
                        let expr = child.child(0);
                        self.expression(&expr);
                    }
                }

                NodeKind::Unknown => {
                    // neutralized nodes are ignored
                }

                _ => {
                    message::error(
                        ErrCode::InternalError,
                        &child.position(),
                        format!(
                            "directive node \"{}\" not yet handled in directive_list().",
                            child.kind().name()
                        ),
                    );
                }
            }

            // a case/default label makes the flow accessible again
            if end_list.is_some() && idx + 1 < max_children {
                let next = directive_list_node.child(idx + 1);
                if matches!(next.kind(), NodeKind::Case | NodeKind::Default) {
                    end_list = None;
                    no_access_reported = false;
                }
            }
        }

        // variables declared by assignment rewrites are inserted at the
        // top of their directive list
        if directive_list_node.kind() == NodeKind::DirectiveList
            && directive_list_node.get_flag(NodeFlag::DirectiveListNewVariables)
        {
            for idx in 0..directive_list_node.variables_count() {
                if let Some(variable_node) = directive_list_node.variable(idx) {
                    if let Some(var_parent) = variable_node.parent() {
                        if var_parent.kind() == NodeKind::Var
                            && var_parent.get_flag(NodeFlag::VariableToadd)
                        {
                            var_parent.set_flag(NodeFlag::VariableToadd, false);
                            directive_list_node.insert_child(0, &var_parent);
                        }
                    }
                }
            }
            directive_list_node.set_flag(NodeFlag::DirectiveListNewVariables, false);
        }

        // the `use namespace` bindings pushed by this list end with it
        while self.scope.children_count() > scope_depth {
            let last = self.scope.children_count() - 1;
            self.scope.delete_child(last);
        }

        end_list
    }
}
