//! Attribute resolution and inheritance.
//!
//! The parser keeps attributes as a detached ATTRIBUTES node; on first
//! use the compiler translates them into boolean attribute flags on the
//! declaration, evaluating expression attributes through the folder and
//! following dynamic attribute names to `const` variables. Attributes
//! then inherit from the nearest ancestor which is not a program,
//! package, class, interface or function.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{NodeAttr, NodeFlag, NodeKind, NodeRef};

use crate::fold;
use crate::{Compiler, SEARCH_FLAG_NO_PARSING};

impl Compiler {
    /// Resolve the attributes of `node` (once) and return one of them.
    pub(crate) fn get_attribute(&mut self, node: &NodeRef, attr: NodeAttr) -> bool {
        self.prepare_attributes(node);
        node.get_attr(attr)
    }

    /// Translate the ATTRIBUTES node and apply the inheritance rules.
    /// Idempotent: marked `Defined` on the first visit.
    pub(crate) fn prepare_attributes(&mut self, node: &NodeRef) {
        if node.get_attr(NodeAttr::Defined) {
            return;
        }
        // mark as done even when errors occur below
        node.set_attr(NodeAttr::Defined, true);

        if node.kind() == NodeKind::Program {
            // programs do not get attributes
            return;
        }

        if let Some(attrs) = node.attribute_node() {
            for idx in 0..attrs.children_count() {
                let a = attrs.child(idx);
                self.node_to_attrs(node, &a);
            }
        }

        // remember whether native was given directly; an inherited
        // native on a function with a body is silently dropped, a
        // direct one is an error
        let has_direct_native = node.get_attr(NodeAttr::Native);

        if node.kind() != NodeKind::Package {
            if let Some(parent) = node.parent() {
                if !matches!(
                    parent.kind(),
                    NodeKind::Package
                        | NodeKind::Program
                        | NodeKind::Class
                        | NodeKind::Interface
                        | NodeKind::Function
                ) {
                    self.prepare_attributes(&parent);

                    // access: the child's own declaration wins
                    if !node.get_attr(NodeAttr::Public)
                        && !node.get_attr(NodeAttr::Private)
                        && !node.get_attr(NodeAttr::Protected)
                    {
                        node.set_attr(NodeAttr::Public, parent.get_attr(NodeAttr::Public));
                        node.set_attr(NodeAttr::Private, parent.get_attr(NodeAttr::Private));
                        node.set_attr(
                            NodeAttr::Protected,
                            parent.get_attr(NodeAttr::Protected),
                        );
                    }

                    // dispatch: same rule
                    if !node.get_attr(NodeAttr::Static)
                        && !node.get_attr(NodeAttr::Abstract)
                        && !node.get_attr(NodeAttr::Virtual)
                    {
                        node.set_attr(NodeAttr::Static, parent.get_attr(NodeAttr::Static));
                        node.set_attr(NodeAttr::Abstract, parent.get_attr(NodeAttr::Abstract));
                        node.set_attr(NodeAttr::Virtual, parent.get_attr(NodeAttr::Virtual));
                    }

                    if !node.get_attr(NodeAttr::Final) {
                        node.set_attr(NodeAttr::Final, parent.get_attr(NodeAttr::Final));
                    }

                    // always inherited
                    if parent.get_attr(NodeAttr::Native) {
                        node.set_attr(NodeAttr::Native, true);
                    }
                    if parent.get_attr(NodeAttr::Enumerable) {
                        node.set_attr(NodeAttr::Enumerable, true);
                    }

                    // false has priority over true
                    if parent.get_attr(NodeAttr::False) {
                        node.set_attr(NodeAttr::True, false);
                        node.set_attr(NodeAttr::False, true);
                    }

                    if !node.get_attr(NodeAttr::Dynamic) {
                        node.set_attr(NodeAttr::Dynamic, parent.get_attr(NodeAttr::Dynamic));
                    }
                }
            }
        }

        // native flows through enclosing classes and interfaces: every
        // member of a native class is native
        if !node.get_attr(NodeAttr::Native) {
            let mut ancestor = node.parent();
            while let Some(a) = ancestor {
                match a.kind() {
                    NodeKind::Class | NodeKind::Interface => {
                        self.prepare_attributes(&a);
                        if a.get_attr(NodeAttr::Native) {
                            node.set_attr(NodeAttr::Native, true);
                        }
                        break;
                    }
                    NodeKind::Package | NodeKind::Program | NodeKind::Root => break,
                    _ => ancestor = a.parent(),
                }
            }
        }

        // a function with a body cannot be native
        if node.get_attr(NodeAttr::Native) && node.kind() == NodeKind::Function {
            for idx in 0..node.children_count() {
                if node.child(idx).kind() == NodeKind::DirectiveList {
                    if has_direct_native {
                        message::error(
                            ErrCode::Native,
                            &node.position(),
                            "'native' is not permitted on a function with a body.",
                        );
                    }
                    node.set_attr(NodeAttr::Native, false);
                    break;
                }
            }
        }
    }

    /// Apply one attribute node to a declaration.
    pub(crate) fn node_to_attrs(&mut self, node: &NodeRef, a: &NodeRef) {
        match a.kind() {
            NodeKind::Abstract => node.set_attr(NodeAttr::Abstract, true),
            NodeKind::False => node.set_attr(NodeAttr::False, true),
            NodeKind::Final => node.set_attr(NodeAttr::Final, true),
            NodeKind::Identifier => self.identifier_to_attrs(node, a),
            NodeKind::Inline => node.set_attr(NodeAttr::Inline, true),
            NodeKind::Native => node.set_attr(NodeAttr::Native, true),
            NodeKind::Private => node.set_attr(NodeAttr::Private, true),
            NodeKind::Protected => node.set_attr(NodeAttr::Protected, true),
            NodeKind::Public => node.set_attr(NodeAttr::Public, true),
            NodeKind::Static => node.set_attr(NodeAttr::Static, true),
            NodeKind::Transient => node.set_attr(NodeAttr::Transient, true),
            NodeKind::True => node.set_attr(NodeAttr::True, true),
            NodeKind::Volatile => node.set_attr(NodeAttr::Volatile, true),
            _ => {
                // an expression attribute which did not resolve to a
                // constant boolean
                message::error(
                    ErrCode::NotSupported,
                    &a.position(),
                    "unsupported attribute data type, dynamic expressions for attributes need to be resolved as constants.",
                );
            }
        }
    }

    /// An identifier attribute is either a well-known modifier name or
    /// the name of a `const` variable holding a list of attributes.
    pub(crate) fn identifier_to_attrs(&mut self, node: &NodeRef, a: &NodeRef) {
        match a.string().as_str() {
            "array" => return node.set_attr(NodeAttr::Array, true),
            "autobreak" => return node.set_attr(NodeAttr::Autobreak, true),
            "constructor" => return node.set_attr(NodeAttr::Constructor, true),
            "deprecated" => return node.set_attr(NodeAttr::Deprecated, true),
            "dynamic" => return node.set_attr(NodeAttr::Dynamic, true),
            "enumerable" => return node.set_attr(NodeAttr::Enumerable, true),
            "foreach" => return node.set_attr(NodeAttr::Foreach, true),
            "internal" => return node.set_attr(NodeAttr::Internal, true),
            "nobreak" => return node.set_attr(NodeAttr::Nobreak, true),
            "unsafe" => return node.set_attr(NodeAttr::Unsafe, true),
            "unused" => return node.set_attr(NodeAttr::Unused, true),
            "virtual" => return node.set_attr(NodeAttr::Virtual, true),
            _ => {}
        }

        // maybe a user defined variable holding attributes
        let resolution =
            match self.resolve_name(node, a, None, None, SEARCH_FLAG_NO_PARSING) {
                None => {
                    message::error(
                        ErrCode::NotFound,
                        &a.position(),
                        format!("cannot find a variable named '{}'.", a.string()),
                    );
                    return;
                }
                Some(resolution) => resolution,
            };
        if !matches!(
            resolution.kind(),
            NodeKind::Variable | NodeKind::VarAttributes
        ) {
            message::error(
                ErrCode::Dynamic,
                &a.position(),
                format!(
                    "a dynamic attribute name can only reference a variable and '{}' is not one.",
                    a.string()
                ),
            );
            return;
        }

        // follow the variable's attribute sets; the transient flag
        // detects circular references
        if resolution.get_flag(NodeFlag::VariableAttrs) {
            message::error(
                ErrCode::LoopingReference,
                &a.position(),
                format!(
                    "the dynamic attribute variable '{}' is used circularly (it loops).",
                    a.string()
                ),
            );
            return;
        }

        resolution.set_flag(NodeFlag::VariableAttrs, true);
        resolution.set_flag(NodeFlag::VariableAttributes, true);
        for idx in 0..resolution.children_count() {
            let child = resolution.child(idx);
            self.variable_to_attrs(node, &child);
        }
        resolution.set_flag(NodeFlag::VariableAttrs, false);
    }

    /// Apply a variable initializer (a SET child) as attributes.
    pub(crate) fn variable_to_attrs(&mut self, node: &NodeRef, set: &NodeRef) {
        if set.kind() != NodeKind::Set {
            message::error(
                ErrCode::InvalidVariable,
                &set.position(),
                "an attribute variable has to be given a value.",
            );
            return;
        }

        let a = set.child(0);
        match a.kind() {
            NodeKind::False
            | NodeKind::Identifier
            | NodeKind::Inline
            | NodeKind::Private
            | NodeKind::Protected
            | NodeKind::Public
            | NodeKind::True => {
                self.node_to_attrs(node, &a);
                return;
            }
            _ => {}
        }

        // a full boolean expression, then
        self.expression(&a);
        fold::optimize(&a);
        match a.kind() {
            NodeKind::True | NodeKind::False => self.node_to_attrs(node, &a),
            _ => {
                message::error(
                    ErrCode::InvalidExpression,
                    &set.position(),
                    "an attribute which is an expression needs to result in a boolean value (true or false).",
                );
            }
        }
    }
}
