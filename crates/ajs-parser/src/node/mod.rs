//! The uniform AST/IR node.
//!
//! A single polymorphic record serves every stage: the lexer's tokens
//! become nodes, the parser strings them into a tree, and the resolver
//! annotates them with cross references. Children are owned by their
//! parent (the tree is the ownership graph); the parent link and the
//! `instance`/`type_node`/`goto` cross references are weak handles so
//! references across the forest of loaded programs never create cycles.
//!
//! All mutation goes through short-lived internal borrows of a
//! `RefCell`, so the deeply recursive visitation of the resolver can
//! freely re-enter any node it is not actively mutating.

mod attribute;
mod flag;
mod kind;

pub use attribute::{AttrSet, NodeAttr};
pub use flag::{FlagSet, NodeFlag};
pub use kind::{kind_from_token, NodeKind};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ajs_common::position::Position;
use ajs_common::token::{Token, Value};
use rustc_hash::FxHashMap;

/// Overload scoring depth meaning "no match".
pub const MATCH_NOT_FOUND: i32 = 0;
/// Overload scoring depth of an exact type match (best).
pub const MATCH_HIGHEST_DEPTH: i32 = 1;
/// Overload scoring depth of a match through an untyped parameter
/// (worst; only used when nothing better matched).
pub const MATCH_LOWEST_DEPTH: i32 = i32::MAX / 2;

struct NodeData {
    kind: NodeKind,
    position: Position,
    value: Value,
    flags: FlagSet,
    attributes: AttrSet,
    parent: Option<Weak<RefCell<NodeData>>>,
    children: Vec<NodeRef>,
    /// Declaration this use-site resolves to.
    instance: Option<NodeWeak>,
    /// Declaring class/interface/primitive type of this expression.
    type_node: Option<NodeWeak>,
    /// ATTRIBUTES node attached to a declaration (not a child).
    attribute_node: Option<NodeRef>,
    goto_enter: Option<NodeWeak>,
    goto_exit: Option<NodeWeak>,
    /// Variables declared in this scope, gathered during analysis.
    variables: Vec<NodeWeak>,
    /// Labels declared in this unit (function/program/package).
    labels: FxHashMap<String, NodeWeak>,
    /// Comparison operator of a `switch() with (op)`.
    switch_operator: NodeKind,
    /// PARAM_MATCH scoring: depth per formal parameter position.
    param_depths: Vec<i32>,
    /// PARAM_MATCH scoring: actual argument to formal index mapping.
    param_indexes: Vec<usize>,
}

/// Owning handle to a node.
#[derive(Clone)]
pub struct NodeRef(Rc<RefCell<NodeData>>);

/// Non-owning handle to a node.
#[derive(Clone)]
pub struct NodeWeak(Weak<RefCell<NodeData>>);

impl NodeWeak {
    pub fn upgrade(&self) -> Option<NodeRef> {
        self.0.upgrade().map(NodeRef)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        write!(f, "{}", data.kind)?;
        match &data.value {
            Value::None => Ok(()),
            Value::Integer(i) => write!(f, "({i})"),
            Value::Floating(v) => write!(f, "({v})"),
            Value::String(s) => write!(f, "({s:?})"),
        }
    }
}

impl NodeRef {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            position,
            value: Value::None,
            flags: FlagSet::new(),
            attributes: AttrSet::new(),
            parent: None,
            children: Vec::new(),
            instance: None,
            type_node: None,
            attribute_node: None,
            goto_enter: None,
            goto_exit: None,
            variables: Vec::new(),
            labels: FxHashMap::default(),
            switch_operator: NodeKind::Unknown,
            param_depths: Vec::new(),
            param_indexes: Vec::new(),
        })))
    }

    /// Materialize a token as a node of the matching kind.
    pub fn from_token(token: Token) -> Self {
        let node = Self::new(kind_from_token(token.kind), token.position);
        node.0.borrow_mut().value = token.value;
        node
    }

    /// Create a new node at the same position as this one. Used when
    /// the parser or resolver synthesizes nodes.
    pub fn create_replacement(&self, kind: NodeKind) -> NodeRef {
        NodeRef::new(kind, self.position())
    }

    /// Shallow clone of kind, payload, position and flags; no children
    /// and no cross references. Used to propagate constants.
    pub fn clone_basic(&self) -> NodeRef {
        let data = self.0.borrow();
        let clone = NodeRef::new(data.kind, data.position.clone());
        {
            let mut cd = clone.0.borrow_mut();
            cd.value = data.value.clone();
            cd.flags = data.flags;
        }
        clone
    }

    pub fn downgrade(&self) -> NodeWeak {
        NodeWeak(Rc::downgrade(&self.0))
    }

    // ── Kind and payload ───────────────────────────────────────────────

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind
    }

    pub fn position(&self) -> Position {
        self.0.borrow().position.clone()
    }

    pub fn value(&self) -> Value {
        self.0.borrow().value.clone()
    }

    /// The string payload; empty for nodes which carry none.
    pub fn string(&self) -> String {
        match &self.0.borrow().value {
            Value::String(s) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn set_string(&self, s: impl Into<String>) {
        self.0.borrow_mut().value = Value::String(s.into());
    }

    pub fn integer(&self) -> i64 {
        match self.0.borrow().value {
            Value::Integer(i) => i,
            _ => 0,
        }
    }

    pub fn set_integer(&self, i: i64) {
        self.0.borrow_mut().value = Value::Integer(i);
    }

    pub fn floating(&self) -> f64 {
        match self.0.borrow().value {
            Value::Floating(v) => v,
            _ => 0.0,
        }
    }

    pub fn set_floating(&self, v: f64) {
        self.0.borrow_mut().value = Value::Floating(v);
    }

    // ── Flags and attributes ───────────────────────────────────────────

    pub fn get_flag(&self, flag: NodeFlag) -> bool {
        self.0.borrow().flags.get(flag)
    }

    pub fn set_flag(&self, flag: NodeFlag, value: bool) {
        self.0.borrow_mut().flags.set(flag, value);
    }

    pub fn get_attr(&self, attr: NodeAttr) -> bool {
        self.0.borrow().attributes.get(attr)
    }

    pub fn set_attr(&self, attr: NodeAttr, value: bool) {
        self.0.borrow_mut().attributes.set(attr, value);
    }

    /// Set an attribute on this node and every node below it.
    pub fn set_attr_tree(&self, attr: NodeAttr, value: bool) {
        self.set_attr(attr, value);
        for idx in 0..self.children_count() {
            self.child(idx).set_attr_tree(attr, value);
        }
    }

    // ── Tree management ────────────────────────────────────────────────

    pub fn children_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    /// Child at `idx`; panics when out of range (internal error).
    pub fn child(&self, idx: usize) -> NodeRef {
        self.0.borrow().children[idx].clone()
    }

    pub fn append_child(&self, child: &NodeRef) {
        child.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().children.push(child.clone());
    }

    pub fn insert_child(&self, idx: usize, child: &NodeRef) {
        child.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().children.insert(idx, child.clone());
    }

    pub fn delete_child(&self, idx: usize) {
        let child = self.0.borrow_mut().children.remove(idx);
        child.0.borrow_mut().parent = None;
    }

    pub fn set_child(&self, idx: usize, child: &NodeRef) {
        let old = self.0.borrow().children[idx].clone();
        old.0.borrow_mut().parent = None;
        child.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().children[idx] = child.clone();
    }

    /// Replace this node with another in its parent. No-op for roots.
    pub fn replace_with(&self, replacement: &NodeRef) {
        if let Some(parent) = self.parent() {
            if let Some(idx) = parent.index_of(self) {
                parent.set_child(idx, replacement);
            }
        }
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.0
            .borrow()
            .parent
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .map(NodeRef)
    }

    fn index_of(&self, child: &NodeRef) -> Option<usize> {
        self.0
            .borrow()
            .children
            .iter()
            .position(|c| Rc::ptr_eq(&c.0, &child.0))
    }

    /// Position of this node in its parent's child list.
    pub fn offset(&self) -> usize {
        match self.parent() {
            Some(parent) => parent.index_of(self).unwrap_or(0),
            None => 0,
        }
    }

    pub fn find_first_child(&self, kind: NodeKind) -> Option<NodeRef> {
        self.0
            .borrow()
            .children
            .iter()
            .find(|c| c.kind() == kind)
            .cloned()
    }

    /// Drop children neutralized with [`NodeRef::to_unknown`],
    /// recursively.
    pub fn clean_tree(&self) {
        let mut idx = 0;
        while idx < self.children_count() {
            let child = self.child(idx);
            if child.kind() == NodeKind::Unknown {
                self.delete_child(idx);
            } else {
                child.clean_tree();
                idx += 1;
            }
        }
    }

    // ── Cross references ───────────────────────────────────────────────

    pub fn instance(&self) -> Option<NodeRef> {
        self.0.borrow().instance.as_ref().and_then(NodeWeak::upgrade)
    }

    pub fn set_instance(&self, instance: &NodeRef) {
        self.0.borrow_mut().instance = Some(instance.downgrade());
    }

    pub fn type_node(&self) -> Option<NodeRef> {
        self.0.borrow().type_node.as_ref().and_then(NodeWeak::upgrade)
    }

    pub fn set_type_node(&self, type_node: &NodeRef) {
        self.0.borrow_mut().type_node = Some(type_node.downgrade());
    }

    pub fn attribute_node(&self) -> Option<NodeRef> {
        self.0.borrow().attribute_node.clone()
    }

    pub fn set_attribute_node(&self, attributes: &NodeRef) {
        self.0.borrow_mut().attribute_node = Some(attributes.clone());
    }

    pub fn goto_enter(&self) -> Option<NodeRef> {
        self.0.borrow().goto_enter.as_ref().and_then(NodeWeak::upgrade)
    }

    pub fn set_goto_enter(&self, target: &NodeRef) {
        self.0.borrow_mut().goto_enter = Some(target.downgrade());
    }

    pub fn goto_exit(&self) -> Option<NodeRef> {
        self.0.borrow().goto_exit.as_ref().and_then(NodeWeak::upgrade)
    }

    pub fn set_goto_exit(&self, target: &NodeRef) {
        self.0.borrow_mut().goto_exit = Some(target.downgrade());
    }

    // ── Per-scope variable and label tables ────────────────────────────

    pub fn add_variable(&self, variable: &NodeRef) {
        self.0.borrow_mut().variables.push(variable.downgrade());
    }

    pub fn variables_count(&self) -> usize {
        self.0.borrow().variables.len()
    }

    pub fn variable(&self, idx: usize) -> Option<NodeRef> {
        self.0.borrow().variables.get(idx).and_then(NodeWeak::upgrade)
    }

    pub fn add_label(&self, label: &NodeRef) {
        self.0
            .borrow_mut()
            .labels
            .insert(label.string(), label.downgrade());
    }

    pub fn find_label(&self, name: &str) -> Option<NodeRef> {
        self.0.borrow().labels.get(name).and_then(NodeWeak::upgrade)
    }

    // ── SWITCH and PARAM_MATCH extras ──────────────────────────────────

    pub fn switch_operator(&self) -> NodeKind {
        self.0.borrow().switch_operator
    }

    pub fn set_switch_operator(&self, op: NodeKind) {
        self.0.borrow_mut().switch_operator = op;
    }

    pub fn set_param_size(&self, size: usize) {
        let mut data = self.0.borrow_mut();
        data.param_depths = vec![MATCH_NOT_FOUND; size];
        data.param_indexes = vec![usize::MAX; size];
    }

    pub fn param_size(&self) -> usize {
        self.0.borrow().param_depths.len()
    }

    pub fn param_depth(&self, idx: usize) -> i32 {
        self.0.borrow().param_depths.get(idx).copied().unwrap_or(MATCH_NOT_FOUND)
    }

    pub fn set_param_depth(&self, idx: usize, depth: i32) {
        self.0.borrow_mut().param_depths[idx] = depth;
    }

    pub fn param_index(&self, idx: usize) -> usize {
        self.0.borrow().param_indexes.get(idx).copied().unwrap_or(usize::MAX)
    }

    pub fn set_param_index(&self, idx: usize, to: usize) {
        self.0.borrow_mut().param_indexes[idx] = to;
    }

    // ── Kind conversions used by the rewrites ──────────────────────────

    fn set_kind(&self, kind: NodeKind) {
        self.0.borrow_mut().kind = kind;
    }

    pub fn to_unknown(&self) {
        self.set_kind(NodeKind::Unknown);
    }

    pub fn to_call(&self) {
        self.set_kind(NodeKind::Call);
    }

    pub fn to_as(&self) {
        self.set_kind(NodeKind::As);
    }

    pub fn to_identifier(&self) {
        // keyword tokens carry no payload, give them their spelling
        if matches!(self.value(), Value::None) {
            let name = self.kind().name().to_ascii_lowercase();
            self.set_string(name);
        }
        self.set_kind(NodeKind::Identifier);
    }

    pub fn to_videntifier(&self) {
        self.set_kind(NodeKind::Videntifier);
    }

    pub fn to_label(&self) {
        self.set_kind(NodeKind::Label);
    }

    pub fn to_var_attributes(&self) {
        self.set_kind(NodeKind::VarAttributes);
    }

    pub fn to_string_literal(&self) {
        if matches!(self.value(), Value::None) {
            self.set_string("");
        }
        self.set_kind(NodeKind::String);
    }

    /// Drop all children (their parent links are cleared).
    pub fn clear_children(&self) {
        while self.children_count() > 0 {
            self.delete_child(0);
        }
    }

    /// Rewrite this node in place as a literal: children are dropped
    /// and the kind replaced. The caller sets the payload. Constant
    /// folding uses this so handles held by the resolver stay valid.
    pub fn to_literal(&self, kind: NodeKind) {
        self.clear_children();
        {
            let mut data = self.0.borrow_mut();
            data.kind = kind;
            data.instance = None;
            data.type_node = None;
        }
        if !matches!(kind, NodeKind::String | NodeKind::Integer | NodeKind::FloatingPoint) {
            self.0.borrow_mut().value = Value::None;
        }
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Whether evaluating this expression could change state.
    pub fn has_side_effects(&self) -> bool {
        match self.kind() {
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
            | NodeKind::New
            | NodeKind::Delete
            | NodeKind::Increment
            | NodeKind::Decrement
            | NodeKind::PostIncrement
            | NodeKind::PostDecrement => true,
            _ => (0..self.children_count()).any(|idx| self.child(idx).has_side_effects()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ajs_common::token::TokenKind;

    fn node(kind: NodeKind) -> NodeRef {
        NodeRef::new(kind, Position::new())
    }

    #[test]
    fn children_and_parent_links() {
        let list = node(NodeKind::DirectiveList);
        let a = node(NodeKind::Identifier);
        let b = node(NodeKind::Integer);
        list.append_child(&a);
        list.append_child(&b);
        assert_eq!(list.children_count(), 2);
        assert_eq!(a.parent().unwrap(), list);
        assert_eq!(b.offset(), 1);

        list.delete_child(0);
        assert!(a.parent().is_none());
        assert_eq!(list.child(0), b);
    }

    #[test]
    fn insert_and_set_child() {
        let list = node(NodeKind::DirectiveList);
        let a = node(NodeKind::True);
        let b = node(NodeKind::False);
        let c = node(NodeKind::Null);
        list.append_child(&a);
        list.insert_child(0, &b);
        assert_eq!(list.child(0), b);
        list.set_child(0, &c);
        assert_eq!(list.child(0), c);
        assert!(b.parent().is_none());
        assert_eq!(c.parent().unwrap(), list);
    }

    #[test]
    fn replace_with_swaps_in_parent() {
        let list = node(NodeKind::List);
        let id = node(NodeKind::Identifier);
        list.append_child(&id);
        let literal = node(NodeKind::Integer);
        literal.set_integer(7);
        id.replace_with(&literal);
        assert_eq!(list.child(0), literal);
        assert_eq!(list.child(0).integer(), 7);
    }

    #[test]
    fn instance_and_type_are_weak() {
        let user = node(NodeKind::Identifier);
        {
            let decl = node(NodeKind::Variable);
            user.set_instance(&decl);
            assert_eq!(user.instance().unwrap(), decl);
        }
        // declaration dropped, the weak handle no longer upgrades
        assert!(user.instance().is_none());
    }

    #[test]
    fn labels_are_found_by_name() {
        let function = node(NodeKind::Function);
        let label = node(NodeKind::Label);
        label.set_string("again");
        function.add_label(&label);
        assert_eq!(function.find_label("again").unwrap(), label);
        assert!(function.find_label("missing").is_none());
    }

    #[test]
    fn clean_tree_removes_unknown_nodes() {
        let program = node(NodeKind::Program);
        let list = node(NodeKind::DirectiveList);
        let keep = node(NodeKind::Variable);
        let drop = node(NodeKind::Class);
        program.append_child(&list);
        list.append_child(&keep);
        list.append_child(&drop);
        drop.to_unknown();
        program.clean_tree();
        assert_eq!(list.children_count(), 1);
        assert_eq!(list.child(0), keep);
    }

    #[test]
    fn from_token_carries_payload() {
        let token = Token::new(
            TokenKind::Identifier,
            Value::String("foo".to_string()),
            Position::new(),
        );
        let n = NodeRef::from_token(token);
        assert_eq!(n.kind(), NodeKind::Identifier);
        assert_eq!(n.string(), "foo");
    }

    #[test]
    fn to_identifier_gives_keywords_a_spelling() {
        let n = node(NodeKind::Private);
        n.to_identifier();
        assert_eq!(n.kind(), NodeKind::Identifier);
        assert_eq!(n.string(), "private");
    }

    #[test]
    fn param_match_scoring_storage() {
        let m = node(NodeKind::ParamMatch);
        m.set_param_size(3);
        assert_eq!(m.param_depth(1), MATCH_NOT_FOUND);
        m.set_param_depth(1, MATCH_HIGHEST_DEPTH);
        m.set_param_index(0, 1);
        assert_eq!(m.param_depth(1), MATCH_HIGHEST_DEPTH);
        assert_eq!(m.param_index(0), 1);
        assert_eq!(m.param_size(), 3);
    }

    #[test]
    fn side_effects_detection() {
        let add = node(NodeKind::Add);
        add.append_child(&node(NodeKind::Integer));
        let call = node(NodeKind::Call);
        add.append_child(&call);
        assert!(add.has_side_effects());

        let pure = node(NodeKind::Add);
        pure.append_child(&node(NodeKind::Integer));
        pure.append_child(&node(NodeKind::Integer));
        assert!(!pure.has_side_effects());
    }
}
