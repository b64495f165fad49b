//! Variable processing and constant propagation.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{NodeFlag, NodeKind, NodeRef};

use crate::fold;
use crate::Compiler;

impl Compiler {
    /// Replace a use-site with the value of a `const` variable when
    /// that value is a literal. Returns whether the replacement
    /// happened.
    pub(crate) fn replace_constant_variable(
        &mut self,
        replace: &NodeRef,
        resolution: &NodeRef,
    ) -> bool {
        if resolution.kind() != NodeKind::Variable {
            return false;
        }
        if !resolution.get_flag(NodeFlag::VariableConst) {
            return false;
        }

        for idx in 0..resolution.children_count() {
            let set = resolution.child(idx);
            if set.kind() != NodeKind::Set {
                continue;
            }

            fold::optimize(&set);

            if set.children_count() != 1 {
                return false;
            }
            let value = set.child(0);
            self.type_expr(&value);

            return match value.kind() {
                NodeKind::String
                | NodeKind::Integer
                | NodeKind::FloatingPoint
                | NodeKind::True
                | NodeKind::False
                | NodeKind::Null
                | NodeKind::Undefined
                | NodeKind::RegularExpression => {
                    let clone = value.clone_basic();
                    if let Some(type_node) = value.type_node() {
                        clone.set_type_node(&type_node);
                    }
                    replace.replace_with(&clone);
                    true
                }
                // a dynamic expression cannot be resolved at compile
                // time
                _ => false,
            };
        }

        false
    }

    /// Visit a VAR node: initialize its variables, but only those with
    /// side effects (a variable may really be an attribute list and
    /// resolving it eagerly would err).
    pub(crate) fn var(&mut self, var_node: &NodeRef) {
        for idx in 0..var_node.children_count() {
            let variable_node = var_node.child(idx);
            self.variable(&variable_node, true);
        }
    }

    /// Process one VARIABLE node. Idempotent through the
    /// `VariableDefined`/`VariableCompiled` flags.
    pub(crate) fn variable(&mut self, variable_node: &NodeRef, side_effects_only: bool) {
        // already parsed?
        if variable_node.get_flag(NodeFlag::VariableDefined)
            || variable_node.get_flag(NodeFlag::VariableAttributes)
        {
            if !side_effects_only {
                if !variable_node.get_flag(NodeFlag::VariableCompiled) {
                    // mark first: constants may reference one another
                    variable_node.set_flag(NodeFlag::VariableCompiled, true);
                    for idx in 0..variable_node.children_count() {
                        let child = variable_node.child(idx);
                        if child.kind() == NodeKind::Set {
                            let expr = child.child(0);
                            self.expression(&expr);
                            break;
                        }
                    }
                }
                variable_node.set_flag(NodeFlag::VariableInUse, true);
            }
            return;
        }

        variable_node.set_flag(NodeFlag::VariableDefined, true);
        variable_node.set_flag(NodeFlag::VariableInUse, !side_effects_only);

        let constant = variable_node.get_flag(NodeFlag::VariableConst);

        // resolve the attributes before walking the children
        self.prepare_attributes(variable_node);

        let mut set = 0;
        for idx in 0..variable_node.children_count() {
            let child = variable_node.child(idx);
            match child.kind() {
                NodeKind::Unknown => {}

                NodeKind::Set => {
                    let expr = child.child(0);
                    if matches!(expr.kind(), NodeKind::Private | NodeKind::Public) {
                        // a list of attributes
                        set += 1;
                    } else if set == 0 {
                        // initializers compile at the declaration, so
                        // constants reduce to their literal and the
                        // variable takes the initializer's type
                        variable_node.set_flag(NodeFlag::VariableCompiled, true);
                        if !side_effects_only || expr.has_side_effects() {
                            variable_node.set_flag(NodeFlag::VariableInUse, true);
                        }
                        self.expression(&expr);
                        // a variable without a declared type takes the
                        // type of its initializer
                        if variable_node.type_node().is_none() {
                            if let Some(type_node) = expr.type_node() {
                                variable_node.set_type_node(&type_node);
                            }
                        }
                    }
                    set += 1;
                }

                NodeKind::Type => {
                    // the variable type
                    variable_node.set_flag(NodeFlag::VariableCompiled, true);
                    let expr = child.child(0);
                    self.expression(&expr);
                    if variable_node.type_node().is_none() {
                        if let Some(instance) = expr.instance() {
                            variable_node.set_instance(&instance);
                        }
                        if let Some(type_node) = expr.type_node() {
                            variable_node.set_type_node(&type_node);
                        }
                    }
                }

                _ => {
                    message::error(
                        ErrCode::InternalError,
                        &variable_node.position(),
                        "variable has a child node of an unknown type.",
                    );
                }
            }
        }

        if set > 1 {
            // several initializers: this is a list of attributes
            variable_node.to_var_attributes();
            if !constant {
                message::error(
                    ErrCode::NeedConst,
                    &variable_node.position(),
                    format!(
                        "a variable cannot be a list of attributes unless it is made constant and \"{}\" is not constant.",
                        variable_node.string()
                    ),
                );
            }
        } else {
            self.add_variable(variable_node);
        }
    }

    /// Register a variable with the scope which owns it (directive
    /// list, function, class, package or program) and flag it local or
    /// member accordingly.
    pub(crate) fn add_variable(&mut self, variable_node: &NodeRef) {
        let mut first = true;
        let mut parent = variable_node.parent();
        while let Some(p) = parent {
            match p.kind() {
                NodeKind::DirectiveList => {
                    if first {
                        first = false;
                        p.add_variable(variable_node);
                    }
                }

                NodeKind::Function => {
                    variable_node.set_flag(NodeFlag::VariableLocal, true);
                    if first {
                        p.add_variable(variable_node);
                    }
                    return;
                }

                NodeKind::Class | NodeKind::Interface => {
                    variable_node.set_flag(NodeFlag::VariableMember, true);
                    if first {
                        p.add_variable(variable_node);
                    }
                    return;
                }

                NodeKind::Program | NodeKind::Package => {
                    // the variable is global
                    if first {
                        p.add_variable(variable_node);
                    }
                    return;
                }

                _ => {}
            }
            parent = p.parent();
        }
    }
}
