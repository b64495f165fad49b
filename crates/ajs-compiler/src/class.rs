//! Class and interface handling: derivation checks, type linking,
//! constructor detection, abstractness accounting and the class/enum
//! directives.

use ajs_common::message::{self, ErrCode};
use ajs_parser::node::{
    NodeAttr, NodeFlag, NodeKind, NodeRef, MATCH_NOT_FOUND,
};

use crate::Compiler;

impl Compiler {
    /// Whether instances of this class accept members unknown at
    /// compile time.
    pub(crate) fn is_dynamic_class(&mut self, class_node: Option<&NodeRef>) -> bool {
        let class_node = match class_node {
            None => return true,
            Some(class_node) => class_node.clone(),
        };

        if self.get_attribute(&class_node, NodeAttr::Dynamic) {
            return true;
        }

        for idx in 0..class_node.children_count() {
            let child = class_node.child(idx);
            if child.kind() == NodeKind::Extends && child.children_count() > 0 {
                let name = child.child(0);
                if let Some(extends) = name.instance() {
                    if extends.string() == "Object" {
                        // the dynamic flag of Object is a language
                        // reference hack, ignore it
                        return false;
                    }
                    return self.is_dynamic_class(Some(&extends));
                }
                break;
            }
        }
        false
    }

    /// Whether `function_node` is a constructor; returns the class it
    /// constructs.
    ///
    /// A function is a constructor when it carries the `constructor`
    /// attribute or bears the name of its enclosing class. Functions
    /// nested inside another function never are.
    pub(crate) fn is_constructor(&mut self, function_node: &NodeRef) -> Option<NodeRef> {
        assert_eq!(
            function_node.kind(),
            NodeKind::Function,
            "is_constructor() called on a non-FUNCTION node"
        );

        let mut parent = function_node.parent();
        while let Some(p) = parent {
            match p.kind() {
                NodeKind::Package
                | NodeKind::Program
                | NodeKind::Function
                | NodeKind::Interface => return None,

                NodeKind::Class => {
                    if self.get_attribute(function_node, NodeAttr::Constructor)
                        || p.string() == function_node.string()
                    {
                        return Some(p);
                    }
                    return None;
                }

                _ => {}
            }
            parent = p.parent();
        }

        if self.get_attribute(function_node, NodeAttr::Constructor) {
            message::error(
                ErrCode::InvalidAttributes,
                &function_node.position(),
                format!(
                    "\"constructor {}()\" cannot be used outside of a class declaration.",
                    function_node.string()
                ),
            );
        }
        None
    }

    /// Validate a use of `super`: `super(...)` only in constructors,
    /// `super.member` not in statics nor constructors, and only within
    /// a class.
    pub(crate) fn check_super_validity(&mut self, expr: &NodeRef) {
        let needs_constructor = expr
            .parent()
            .map(|p| p.kind() == NodeKind::Call)
            .unwrap_or(false);

        let mut first_function = true;
        let mut parent = expr.parent();
        while let Some(p) = parent.clone() {
            match p.kind() {
                NodeKind::Function => {
                    if first_function {
                        if needs_constructor {
                            if self.is_constructor(&p).is_none() {
                                message::error(
                                    ErrCode::InvalidExpression,
                                    &expr.position(),
                                    "\"super()\" cannot be used outside of a constructor function.",
                                );
                                return;
                            }
                        } else if p.get_flag(NodeFlag::FunctionOperator)
                            || self.get_attribute(&p, NodeAttr::Static)
                            || self.get_attribute(&p, NodeAttr::Constructor)
                            || self.is_constructor(&p).is_some()
                        {
                            message::error(
                                ErrCode::InvalidExpression,
                                &expr.position(),
                                "\"super.member()\" cannot be used in a static function nor a constructor.",
                            );
                            return;
                        }
                        first_function = false;
                    }
                }

                NodeKind::Class | NodeKind::Interface => return,

                NodeKind::Program | NodeKind::Root => break,

                _ => {}
            }
            parent = p.parent();
        }

        if needs_constructor {
            message::error(
                ErrCode::InvalidExpression,
                &expr.position(),
                "\"super()\" cannot be used outside a class definition.",
            );
        }
    }

    /// Resolve a type expression to its class or interface and save the
    /// link in `instance`. Fails only once per node.
    pub(crate) fn link_type(&mut self, type_node: &NodeRef) {
        if type_node.instance().is_some() {
            return;
        }

        if !matches!(type_node.kind(), NodeKind::Identifier | NodeKind::String) {
            // a dynamic type expression cannot be linked at compile
            // time
            return;
        }

        if type_node.get_flag(NodeFlag::IdentifierTyped) {
            return;
        }
        type_node.set_flag(NodeFlag::IdentifierTyped, true);

        let object = match self.resolve_name(type_node, type_node, None, None, 0) {
            None => {
                message::error(
                    ErrCode::InvalidExpression,
                    &type_node.position(),
                    format!(
                        "cannot find a class definition for type \"{}\".",
                        type_node.string()
                    ),
                );
                return;
            }
            Some(object) => object,
        };

        if !matches!(object.kind(), NodeKind::Class | NodeKind::Interface) {
            message::error(
                ErrCode::InvalidExpression,
                &type_node.position(),
                format!(
                    "the name \"{}\" is not referencing a class nor an interface.",
                    type_node.string()
                ),
            );
            return;
        }

        type_node.set_instance(&object);
    }

    /// Depth of `type_node` in the ancestry of `class_type`: the given
    /// `depth` when directly extended/implemented, one more per extra
    /// hop, [`MATCH_NOT_FOUND`] when unrelated.
    pub(crate) fn find_class(
        &mut self,
        class_type: &NodeRef,
        type_node: &NodeRef,
        depth: i32,
    ) -> i32 {
        for idx in 0..class_type.children_count() {
            let child = class_type.child(idx);
            if matches!(child.kind(), NodeKind::Implements | NodeKind::Extends)
                && child.children_count() > 0
            {
                let super_name = child.child(0);
                if super_name.instance().is_none() {
                    self.expression(&super_name);
                }
                let super_class = match super_name.instance() {
                    None => {
                        message::error(
                            ErrCode::InvalidExpression,
                            &class_type.position(),
                            "cannot find the type named in an \"extends\" or \"implements\" list.",
                        );
                        continue;
                    }
                    Some(super_class) => super_class,
                };
                if super_class == *type_node {
                    return depth;
                }
            }
        }

        let mut result = MATCH_NOT_FOUND;
        for idx in 0..class_type.children_count() {
            let child = class_type.child(idx);
            if matches!(child.kind(), NodeKind::Implements | NodeKind::Extends)
                && child.children_count() > 0
            {
                if let Some(super_class) = child.child(0).instance() {
                    let r = self.find_class(&super_class, type_node, depth + 1);
                    if r > result {
                        result = r;
                    }
                }
            }
        }
        result
    }

    /// Whether `derived_class` is `super_class` or reaches it through
    /// any `extends`/`implements` (lists included).
    pub(crate) fn is_derived_from(
        &mut self,
        derived_class: &NodeRef,
        super_class: &NodeRef,
    ) -> bool {
        if derived_class == super_class {
            return true;
        }

        for idx in 0..derived_class.children_count() {
            let extends = derived_class.child(idx);
            if !matches!(extends.kind(), NodeKind::Extends | NodeKind::Implements) {
                continue;
            }
            if extends.children_count() == 0 {
                continue;
            }
            let type_node = extends.child(0);
            if type_node.kind() == NodeKind::List && extends.kind() == NodeKind::Implements {
                for j in 0..type_node.children_count() {
                    let sub_type = type_node.child(j);
                    self.link_type(&sub_type);
                    if let Some(instance) = sub_type.instance() {
                        if self.is_derived_from(&instance, super_class) {
                            return true;
                        }
                    }
                }
            } else {
                self.link_type(&type_node);
                if let Some(instance) = type_node.instance() {
                    if self.is_derived_from(&instance, super_class) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// The class or interface `node` is a member of, if any. The walk
    /// stops at packages, programs and roots.
    pub(crate) fn class_of_member(&mut self, node: &NodeRef) -> Option<NodeRef> {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            match n.kind() {
                NodeKind::Class | NodeKind::Interface => return Some(n),
                NodeKind::Package | NodeKind::Program | NodeKind::Root => return None,
                _ => current = n.parent(),
            }
        }
        None
    }

    /// Whether the classes containing the two nodes derive from one
    /// another. Returns the super class's class when it has one.
    pub(crate) fn are_objects_derived_from_one_another(
        &mut self,
        derived: &NodeRef,
        super_node: &NodeRef,
    ) -> (bool, Option<NodeRef>) {
        let the_super_class = match self.class_of_member(super_node) {
            None => return (false, None),
            Some(class) => class,
        };
        let the_derived_class = match self.class_of_member(derived) {
            None => return (false, Some(the_super_class)),
            Some(class) => class,
        };
        (
            self.is_derived_from(&the_derived_class, &the_super_class),
            Some(the_super_class),
        )
    }

    /// Compile the members of a class body.
    pub(crate) fn declare_class(&mut self, list: &NodeRef) {
        for idx in 0..list.children_count() {
            let child = list.child(idx);
            match child.kind() {
                NodeKind::DirectiveList => self.declare_class(&child),
                NodeKind::Class | NodeKind::Interface => self.class_directive(&child),
                NodeKind::Enum => self.enum_directive(&child),
                NodeKind::Function => self.function(&child),
                NodeKind::Var => self.var(&child),
                NodeKind::Empty | NodeKind::Unknown => {}
                _ => {
                    message::error(
                        ErrCode::InvalidNode,
                        &child.position(),
                        format!(
                            "the \"{}\" token cannot be a class member.",
                            child.kind().name()
                        ),
                    );
                }
            }
        }
    }

    /// Check an `extends`/`implements` entry against the class it
    /// appears in.
    pub(crate) fn extend_class(
        &mut self,
        class_node: &NodeRef,
        extend: bool,
        extend_name: &NodeRef,
    ) {
        self.expression(extend_name);

        let supers: Vec<NodeRef> = if extend_name.kind() == NodeKind::List {
            (0..extend_name.children_count())
                .filter_map(|idx| extend_name.child(idx).instance())
                .collect()
        } else {
            extend_name.instance().into_iter().collect()
        };

        for super_class in supers {
            match super_class.kind() {
                NodeKind::Class => {
                    if class_node.kind() == NodeKind::Interface {
                        message::error(
                            ErrCode::InvalidClass,
                            &class_node.position(),
                            format!(
                                "class \"{}\" cannot extend interface \"{}\".",
                                super_class.string(),
                                class_node.string()
                            ),
                        );
                    } else if !extend {
                        message::error(
                            ErrCode::InvalidClass,
                            &class_node.position(),
                            format!(
                                "class \"{}\" cannot implement class \"{}\". Use \"extends\" instead.",
                                super_class.string(),
                                class_node.string()
                            ),
                        );
                    } else if self.get_attribute(&super_class, NodeAttr::Final) {
                        message::error(
                            ErrCode::Final,
                            &class_node.position(),
                            format!(
                                "class \"{}\" is marked final and it cannot be extended by \"{}\".",
                                super_class.string(),
                                class_node.string()
                            ),
                        );
                    }
                }

                NodeKind::Interface => {
                    if class_node.kind() == NodeKind::Interface && !extend {
                        message::error(
                            ErrCode::InvalidClass,
                            &class_node.position(),
                            format!(
                                "interface \"{}\" cannot implement interface \"{}\". Use \"extends\" instead.",
                                super_class.string(),
                                class_node.string()
                            ),
                        );
                    } else if self.get_attribute(&super_class, NodeAttr::Final) {
                        message::error(
                            ErrCode::Final,
                            &class_node.position(),
                            format!(
                                "interface \"{}\" is marked final, which is not legal.",
                                super_class.string()
                            ),
                        );
                    }
                }

                _ => {
                    // the resolution error was reported already
                }
            }
        }
    }

    pub(crate) fn class_directive(&mut self, class_node: &NodeRef) {
        for idx in 0..class_node.children_count() {
            let child = class_node.child(idx);
            match child.kind() {
                NodeKind::DirectiveList => self.declare_class(&child),
                NodeKind::Extends => {
                    if child.children_count() > 0 {
                        let name = child.child(0);
                        self.extend_class(class_node, true, &name);
                    }
                }
                NodeKind::Implements => {
                    if child.children_count() > 0 {
                        let name = child.child(0);
                        self.extend_class(class_node, false, &name);
                    }
                }
                NodeKind::Empty => {}
                _ => {
                    message::error(
                        ErrCode::InternalError,
                        &class_node.position(),
                        format!(
                            "invalid token \"{}\" in a class definition.",
                            child.kind().name()
                        ),
                    );
                }
            }
        }
    }

    /// Compile the value of each enumeration entry.
    pub(crate) fn enum_directive(&mut self, enum_node: &NodeRef) {
        for idx in 0..enum_node.children_count() {
            let entry = enum_node.child(idx);
            if entry.children_count() != 1 {
                // empty enumeration (the entry is EMPTY)
                continue;
            }
            let set = entry.child(0);
            if set.kind() != NodeKind::Set || set.children_count() != 1 {
                continue;
            }
            let expr = set.child(0);
            self.expression(&expr);
            // with the constants propagated the value reduces to its
            // literal (auto-numbered entries are `previous + 1`)
            crate::fold::optimize(&expr);
        }
    }

    // ── Abstract function accounting ───────────────────────────────────

    /// A function without a directive list is abstract.
    pub(crate) fn is_function_abstract(&mut self, function_node: &NodeRef) -> bool {
        function_node.find_first_child(NodeKind::DirectiveList).is_none()
    }

    fn find_overloaded_function(
        &mut self,
        class_node: &NodeRef,
        function_node: &NodeRef,
    ) -> bool {
        for idx in 0..class_node.children_count() {
            let child = class_node.child(idx);
            match child.kind() {
                NodeKind::Extends | NodeKind::Implements => {
                    if child.children_count() == 0 {
                        continue;
                    }
                    let names = child.child(0);
                    let names = if names.kind() == NodeKind::List { names } else { child };
                    for j in 0..names.children_count() {
                        if let Some(super_class) = names.child(j).instance() {
                            if self.is_function_overloaded(&super_class, function_node) {
                                return true;
                            }
                        }
                    }
                }

                NodeKind::DirectiveList => {
                    if self.find_overloaded_function(&child, function_node) {
                        return true;
                    }
                }

                NodeKind::Function => {
                    if function_node.string() == child.string()
                        && self.compare_parameters(function_node, &child)
                    {
                        return true;
                    }
                }

                _ => {}
            }
        }
        false
    }

    /// Whether a function of `class_node` overrides `function_node`
    /// declared in a base class.
    pub(crate) fn is_function_overloaded(
        &mut self,
        class_node: &NodeRef,
        function_node: &NodeRef,
    ) -> bool {
        let parent = self
            .class_of_member(function_node)
            .expect("function checked for overload must be a class member");
        if parent == *class_node {
            return false;
        }
        self.find_overloaded_function(class_node, function_node)
    }

    /// Find an abstract function of `class_node` (or its ancestry) with
    /// no override, making the class impossible to instantiate.
    pub(crate) fn has_abstract_functions(
        &mut self,
        class_node: &NodeRef,
        list: &NodeRef,
    ) -> Option<NodeRef> {
        for idx in 0..list.children_count() {
            let child = list.child(idx);
            match child.kind() {
                NodeKind::Extends | NodeKind::Implements => {
                    if child.children_count() == 0 {
                        continue;
                    }
                    let names = child.child(0);
                    let names = if names.kind() == NodeKind::List {
                        names
                    } else {
                        child.clone()
                    };
                    for j in 0..names.children_count() {
                        if let Some(super_class) = names.child(j).instance() {
                            if let Some(func) =
                                self.has_abstract_functions(class_node, &super_class)
                            {
                                return Some(func);
                            }
                        }
                    }
                }

                NodeKind::DirectiveList => {
                    if let Some(func) = self.has_abstract_functions(class_node, &child) {
                        return Some(func);
                    }
                }

                NodeKind::Function => {
                    if self.is_function_abstract(&child)
                        && !self.is_function_overloaded(class_node, &child)
                    {
                        return Some(child);
                    }
                }

                _ => {}
            }
        }
        None
    }

    /// Verify that `new <expr>` can be instantiated.
    pub(crate) fn can_instantiate_type(&mut self, expr: &NodeRef) {
        if expr.kind() != NodeKind::Identifier {
            // dynamic, cannot test at compile time
            return;
        }

        let inst = match expr.instance() {
            None => return,
            Some(inst) => inst,
        };
        if inst.kind() == NodeKind::Interface {
            message::error(
                ErrCode::InvalidExpression,
                &expr.position(),
                format!(
                    "you can only instantiate an object from a class. \"{}\" is an interface.",
                    expr.string()
                ),
            );
            return;
        }
        if inst.kind() != NodeKind::Class {
            message::error(
                ErrCode::InvalidExpression,
                &expr.position(),
                format!(
                    "you can only instantiate an object from a class. \"{}\" does not seem to be a class.",
                    expr.string()
                ),
            );
            return;
        }

        if let Some(func) = self.has_abstract_functions(&inst, &inst) {
            message::error(
                ErrCode::Abstract,
                &expr.position(),
                format!(
                    "the class \"{}\" has an abstract function \"{}\" in file \"{}\" at line #{} and cannot be instantiated. (If you have an overloaded version of that function it may have the wrong prototype.)",
                    expr.string(),
                    func.string(),
                    func.position().filename(),
                    func.position().line()
                ),
            );
        }
    }
}
