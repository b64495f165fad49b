//! Hand-written recursive-descent parser.
//!
//! One function per non-terminal, organized as a precedence climb for
//! expressions. The parser never fails hard on syntax errors: it emits
//! a diagnostic and resynchronizes on `;`, `{`, `}`, `)`, `]` or end of
//! file, so a single pass reports as many problems as possible.
//!
//! The current token is held as a node (tokens and AST nodes share one
//! kind space); a small unget stack lets the parser speculate across
//! short phrases like `(Void)`, the `()` operator name, or an attribute
//! list which turns out to start an expression.

mod declarations;
mod expressions;
mod numeric_type;
mod package;
mod pragma;
mod statements;

use std::cell::RefCell;
use std::rc::Rc;

use ajs_common::message::{self, ErrCode};
use ajs_common::options::{CompilerOption, Options};
use ajs_common::position::Position;
use ajs_lexer::Lexer;

use crate::node::{NodeKind, NodeRef};

/// The AJS parser. Feed it a source text and shared options, call
/// [`Parser::parse`], get a PROGRAM node back.
pub struct Parser<'src> {
    pub(crate) lexer: Lexer<'src>,
    pub(crate) options: Rc<RefCell<Options>>,
    /// The current token, materialized as a node.
    pub(crate) node: NodeRef,
    /// Unget stack; deep enough for the longest speculation (4).
    pub(crate) unget: Vec<NodeRef>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, filename: &str, options: Rc<RefCell<Options>>) -> Self {
        let lexer = Lexer::new(source, filename, options.clone());
        let position = lexer.position();
        Self {
            lexer,
            options,
            node: NodeRef::new(NodeKind::Unknown, position),
            unget: Vec::new(),
        }
    }

    /// Parse the whole input and return the PROGRAM node.
    pub fn parse(&mut self) -> NodeRef {
        self.get_token();
        self.program()
    }

    // ── Token plumbing ─────────────────────────────────────────────────

    pub(crate) fn get_token(&mut self) {
        match self.unget.pop() {
            Some(node) => self.node = node,
            None => {
                let token = self.lexer.next_token();
                self.node = NodeRef::from_token(token);
            }
        }
    }

    pub(crate) fn unget_token(&mut self, node: NodeRef) {
        self.unget.push(node);
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// Position of the input, for diagnostics.
    pub(crate) fn position(&self) -> Position {
        self.node.position()
    }

    pub(crate) fn new_node(&self, kind: NodeKind) -> NodeRef {
        NodeRef::new(kind, self.position())
    }

    pub(crate) fn has_option_set(&self, option: CompilerOption) -> bool {
        self.options.borrow().is_set(option)
    }

    pub(crate) fn error(&self, code: ErrCode, text: impl AsRef<str>) {
        message::error(code, &self.position(), text);
    }

    pub(crate) fn warning(&self, code: ErrCode, text: impl AsRef<str>) {
        message::warning(code, &self.position(), text);
    }

    // ── Program ────────────────────────────────────────────────────────

    pub(crate) fn program(&mut self) -> NodeRef {
        let program = self.new_node(NodeKind::Program);
        while self.kind() != NodeKind::Eof {
            let directives = self.directive_list();
            program.append_child(&directives);

            if self.kind() == NodeKind::Else {
                self.error(
                    ErrCode::InvalidKeyword,
                    "\"else\" not expected without an \"if\" keyword.",
                );
                self.get_token();
            } else if self.kind() == NodeKind::CloseCurvlyBracket {
                self.error(
                    ErrCode::CurvlyBracketsExpected,
                    "\"}\" not expected without a \"{\".",
                );
                self.get_token();
            }
        }
        program
    }

    // ── Attributes ─────────────────────────────────────────────────────

    /// Accumulate leading attribute tokens into an ATTRIBUTES node.
    /// The last "attribute" may really be the start of an expression or
    /// a label; `directive()` sorts that out afterwards.
    pub(crate) fn attributes(&mut self, attr_list: &mut Option<NodeRef>) {
        loop {
            match self.kind() {
                NodeKind::Abstract
                | NodeKind::Extern
                | NodeKind::False
                | NodeKind::Final
                | NodeKind::Identifier
                | NodeKind::Native
                | NodeKind::Private
                | NodeKind::Protected
                | NodeKind::Public
                | NodeKind::Static
                | NodeKind::Transient
                | NodeKind::True
                | NodeKind::Volatile => {}
                _ => return,
            }

            if attr_list.is_none() {
                *attr_list = Some(self.new_node(NodeKind::Attributes));
            }
            attr_list.as_ref().unwrap().append_child(&self.node.clone());
            self.get_token();
        }
    }

    // ── Directive lists ────────────────────────────────────────────────

    pub(crate) fn directive_list(&mut self) -> NodeRef {
        let list = self.new_node(NodeKind::DirectiveList);
        loop {
            // empty statements are skipped silently
            while self.kind() == NodeKind::Semicolon {
                self.get_token();
            }

            match self.kind() {
                NodeKind::Eof | NodeKind::Else | NodeKind::CloseCurvlyBracket => {
                    return list;
                }
                _ => self.directive(&list),
            }
        }
    }

    /// Whether an operator-like token may follow a spurious attribute
    /// list, meaning the last attribute was really the start of an
    /// expression.
    fn is_expression_operator(kind: NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::Add
                | NodeKind::As
                | NodeKind::Assignment
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
                | NodeKind::BitwiseOr
                | NodeKind::BitwiseXor
                | NodeKind::Comma
                | NodeKind::Conditional
                | NodeKind::Decrement
                | NodeKind::Divide
                | NodeKind::Equal
                | NodeKind::Greater
                | NodeKind::GreaterEqual
                | NodeKind::Implements
                | NodeKind::Instanceof
                | NodeKind::In
                | NodeKind::Increment
                | NodeKind::Is
                | NodeKind::Less
                | NodeKind::LessEqual
                | NodeKind::LogicalAnd
                | NodeKind::LogicalOr
                | NodeKind::LogicalXor
                | NodeKind::Match
                | NodeKind::Maximum
                | NodeKind::Member
                | NodeKind::Minimum
                | NodeKind::Modulo
                | NodeKind::Multiply
                | NodeKind::NotEqual
                | NodeKind::OpenParenthesis
                | NodeKind::OpenSquareBracket
                | NodeKind::Power
                | NodeKind::Private
                | NodeKind::Public
                | NodeKind::Range
                | NodeKind::Rest
                | NodeKind::RotateLeft
                | NodeKind::RotateRight
                | NodeKind::Scope
                | NodeKind::Semicolon
                | NodeKind::ShiftLeft
                | NodeKind::ShiftRight
                | NodeKind::ShiftRightUnsigned
                | NodeKind::StrictlyEqual
                | NodeKind::StrictlyNotEqual
                | NodeKind::Subtract
        )
    }

    /// Whether a directive kind never accepts attribute annotations.
    fn rejects_attributes(kind: NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::Add
                | NodeKind::ArrayLiteral
                | NodeKind::BitwiseNot
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Case
                | NodeKind::Catch
                | NodeKind::Colon
                | NodeKind::Decrement
                | NodeKind::Default
                | NodeKind::Delete
                | NodeKind::Do
                | NodeKind::False
                | NodeKind::FloatingPoint
                | NodeKind::For
                | NodeKind::Finally
                | NodeKind::Goto
                | NodeKind::If
                | NodeKind::Increment
                | NodeKind::Integer
                | NodeKind::LogicalNot
                | NodeKind::New
                | NodeKind::Null
                | NodeKind::ObjectLiteral
                | NodeKind::OpenParenthesis
                | NodeKind::OpenSquareBracket
                | NodeKind::RegularExpression
                | NodeKind::Return
                | NodeKind::Semicolon
                | NodeKind::SmartMatch
                | NodeKind::String
                | NodeKind::Subtract
                | NodeKind::Super
                | NodeKind::Switch
                | NodeKind::This
                | NodeKind::Throw
                | NodeKind::True
                | NodeKind::Try
                | NodeKind::Typeof
                | NodeKind::Undefined
                | NodeKind::Videntifier
                | NodeKind::Void
                | NodeKind::With
                | NodeKind::While
        )
    }

    fn is_expression_start(kind: NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::ArrayLiteral
                | NodeKind::Decrement
                | NodeKind::Delete
                | NodeKind::False
                | NodeKind::FloatingPoint
                | NodeKind::Identifier
                | NodeKind::Increment
                | NodeKind::Integer
                | NodeKind::New
                | NodeKind::Null
                | NodeKind::ObjectLiteral
                | NodeKind::Private
                | NodeKind::Protected
                | NodeKind::Public
                | NodeKind::Undefined
                | NodeKind::RegularExpression
                | NodeKind::String
                | NodeKind::Super
                | NodeKind::This
                | NodeKind::True
                | NodeKind::Typeof
                | NodeKind::Videntifier
                | NodeKind::Void
                | NodeKind::LogicalNot
                | NodeKind::Add
                | NodeKind::Subtract
                | NodeKind::OpenParenthesis
                | NodeKind::OpenSquareBracket
                | NodeKind::OpenCurvlyBracket
                | NodeKind::BitwiseNot
                | NodeKind::SmartMatch
                | NodeKind::NotMatch
        )
    }

    /// Directive kinds which require a terminating semicolon.
    fn wants_semicolon(kind: NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::ArrayLiteral
                | NodeKind::Break
                | NodeKind::Const
                | NodeKind::Continue
                | NodeKind::Debugger
                | NodeKind::Decrement
                | NodeKind::Delete
                | NodeKind::Do
                | NodeKind::FloatingPoint
                | NodeKind::Goto
                | NodeKind::Identifier
                | NodeKind::Import
                | NodeKind::Increment
                | NodeKind::Integer
                | NodeKind::New
                | NodeKind::Null
                | NodeKind::ObjectLiteral
                | NodeKind::Return
                | NodeKind::RegularExpression
                | NodeKind::String
                | NodeKind::Super
                | NodeKind::This
                | NodeKind::Throw
                | NodeKind::Typeof
                | NodeKind::Undefined
                | NodeKind::Use
                | NodeKind::Var
                | NodeKind::Videntifier
                | NodeKind::Void
                | NodeKind::Yield
                | NodeKind::LogicalNot
                | NodeKind::Add
                | NodeKind::Subtract
                | NodeKind::OpenParenthesis
                | NodeKind::OpenSquareBracket
                | NodeKind::BitwiseNot
        )
    }

    pub(crate) fn directive(&mut self, d: &NodeRef) {
        // read the leading attributes; depending on what follows, the
        // last one may have to be restored as the start of an
        // expression or a label
        let mut attr_list: Option<NodeRef> = None;
        self.attributes(&mut attr_list);
        let mut attr_count = attr_list.as_ref().map_or(0, NodeRef::children_count);
        let instruction_node = self.node.clone();
        let mut kind = self.kind();

        if kind == NodeKind::Colon {
            if attr_count == 0 {
                self.error(
                    ErrCode::InvalidOperator,
                    "unexpected \":\" without an identifier.",
                );
                self.get_token();
                return;
            }
            let last_attr = attr_list.as_ref().unwrap().child(attr_count - 1);
            if last_attr.kind() != NodeKind::Identifier {
                if !matches!(
                    last_attr.kind(),
                    NodeKind::Private | NodeKind::Protected | NodeKind::Public
                ) {
                    self.error(
                        ErrCode::InvalidOperator,
                        "unexpected \":\" without a valid label.",
                    );
                    self.get_token();
                    return;
                }
                last_attr.to_identifier();
            }
        }
        if kind == NodeKind::Colon || Self::is_expression_operator(kind) {
            if attr_count > 0 {
                attr_count -= 1;
                let attrs = attr_list.as_ref().unwrap();
                let last_attr = attrs.child(attr_count);
                attrs.delete_child(attr_count);
                let current = self.node.clone();
                self.unget_token(current);
                self.node = last_attr;
                if kind != NodeKind::Colon {
                    kind = self.kind();
                }
            }
        }

        // `use` is either a pragma, a numeric type or `use namespace`
        if kind == NodeKind::Use {
            self.get_token();
            // note: `kind` is intentionally left as USE here
        }

        // some directives cannot be annotated at all
        if attr_count > 0 {
            match kind {
                NodeKind::Identifier => {
                    // "final identifier [= expression]" is legal and is
                    // really a variable declaration
                    let attrs = attr_list.as_ref().unwrap();
                    if attr_count == 1 && attrs.child(0).kind() == NodeKind::Final {
                        attr_list = None;
                        kind = NodeKind::Final;
                    } else {
                        attr_count = 0;
                    }
                }
                NodeKind::Use => {
                    // pragmas cannot be annotated
                    if self.kind() != NodeKind::Namespace {
                        attr_count = 0;
                    }
                }
                k if Self::rejects_attributes(k) => {
                    attr_count = 0;
                }
                _ => {}
            }
            if attr_count == 0 {
                if attr_list.is_some() {
                    self.error(
                        ErrCode::InvalidAttributes,
                        "no attributes were expected here (statements, expressions and pragmas cannot be annotated).",
                    );
                }
                attr_list = None;
            }

            // reject duplicated attributes
            if let Some(attrs) = attr_list.as_ref() {
                let count = attrs.children_count();
                for i in 0..count {
                    for j in i + 1..count {
                        let a = attrs.child(i);
                        let b = attrs.child(j);
                        if a.kind() == b.kind()
                            && (a.kind() != NodeKind::Identifier || a.string() == b.string())
                        {
                            let name = if a.kind() == NodeKind::Identifier {
                                a.string()
                            } else {
                                a.kind().name().to_ascii_lowercase()
                            };
                            self.error(
                                ErrCode::Duplicates,
                                format!("attribute \"{name}\" found twice."),
                            );
                        }
                    }
                }
            }
        }

        let directive_node: Option<NodeRef> = match kind {
            // *** pragma / numeric type / use namespace ***
            NodeKind::Use => {
                if self.kind() == NodeKind::Namespace {
                    self.get_token();
                    Some(self.use_namespace())
                } else {
                    let mut done = false;
                    let mut result = None;
                    if self.kind() == NodeKind::Identifier {
                        let name = self.node.clone();
                        self.get_token();
                        if self.kind() == NodeKind::As {
                            result = Some(self.numeric_type(name));
                            done = true;
                        } else {
                            let current = self.node.clone();
                            self.unget_token(current);
                            self.node = name;
                        }
                    }
                    if !done {
                        // pragmas modify the options, they do not
                        // appear in the tree
                        self.pragma();
                    }
                    result
                }
            }

            // *** packages ***
            NodeKind::Package => {
                self.get_token();
                Some(self.package())
            }
            NodeKind::Import => {
                self.get_token();
                Some(self.import())
            }

            // *** class definitions ***
            NodeKind::Class | NodeKind::Interface => {
                self.get_token();
                Some(self.class_declaration(kind))
            }
            NodeKind::Enum => {
                self.get_token();
                Some(self.enum_declaration())
            }
            NodeKind::Invariant => {
                self.get_token();
                Some(self.contract_declaration(kind))
            }

            // *** function definitions ***
            NodeKind::Function => {
                self.get_token();
                Some(self.function(false))
            }

            // *** variable definitions ***
            NodeKind::Const => {
                self.get_token();
                if self.kind() == NodeKind::Var {
                    self.get_token();
                }
                Some(self.variable(NodeKind::Const))
            }
            NodeKind::Final => {
                // happens when `final` is used without `var`; when the
                // current token is still FINAL, skip it
                if self.kind() == NodeKind::Final {
                    self.get_token();
                }
                Some(self.variable(NodeKind::Final))
            }
            NodeKind::Var => {
                self.get_token();
                // `final var x` keeps FINAL in the attribute list, turn
                // it back into the variable type
                let mut found = false;
                if let Some(attrs) = attr_list.as_ref() {
                    for idx in 0..attrs.children_count() {
                        if attrs.child(idx).kind() == NodeKind::Final {
                            attrs.delete_child(idx);
                            found = true;
                            break;
                        }
                    }
                }
                Some(self.variable(if found { NodeKind::Final } else { NodeKind::Var }))
            }

            // *** statements ***
            NodeKind::OpenCurvlyBracket => {
                self.get_token();
                Some(self.block())
            }
            NodeKind::Semicolon => {
                // only reached with spurious attributes, already reported
                self.get_token();
                None
            }
            NodeKind::Break | NodeKind::Continue => {
                self.get_token();
                Some(self.break_continue(kind))
            }
            NodeKind::Case => {
                self.get_token();
                Some(self.case_directive())
            }
            NodeKind::Catch => {
                self.get_token();
                self.catch_directive()
            }
            NodeKind::Debugger => {
                self.get_token();
                Some(self.debugger())
            }
            NodeKind::Default => {
                self.get_token();
                Some(self.default_directive())
            }
            NodeKind::Do => {
                self.get_token();
                Some(self.do_directive())
            }
            NodeKind::For => {
                self.get_token();
                self.for_directive()
            }
            NodeKind::Finally | NodeKind::Try => {
                self.get_token();
                self.try_finally(kind)
            }
            NodeKind::Goto => {
                self.get_token();
                self.goto_directive()
            }
            NodeKind::If => {
                self.get_token();
                self.if_directive()
            }
            NodeKind::Namespace => {
                self.get_token();
                Some(self.namespace_block(&mut attr_list))
            }
            NodeKind::Return => {
                self.get_token();
                Some(self.return_directive())
            }
            NodeKind::Switch => {
                self.get_token();
                self.switch_directive()
            }
            NodeKind::Synchronized => {
                self.get_token();
                self.synchronized()
            }
            NodeKind::Throw => {
                self.get_token();
                Some(self.throw_directive())
            }
            NodeKind::With | NodeKind::While => {
                self.get_token();
                self.with_while(kind)
            }
            NodeKind::Yield => {
                self.get_token();
                self.yield_directive()
            }

            NodeKind::Colon => {
                // the label is the last attribute, restored in `node`
                self.node.to_label();
                let label = self.node.clone();
                // skip the identifier, then the ':'
                self.get_token();
                self.get_token();
                Some(label)
            }

            // *** expressions ***
            k if Self::is_expression_start(k) => Some(self.expression()),

            // *** terminators ***
            NodeKind::Eof => {
                self.error(ErrCode::UnexpectedEof, "unexpected end of file reached.");
                return;
            }
            NodeKind::CloseCurvlyBracket => {
                // the caller reports the mismatch
                return;
            }

            NodeKind::Else | NodeKind::Ensure | NodeKind::Extends | NodeKind::Require
            | NodeKind::Then => {
                self.error(
                    ErrCode::InvalidKeyword,
                    format!("unexpected keyword \"{}\".", instruction_node.kind().name()),
                );
                self.get_token();
                None
            }

            NodeKind::Abstract
            | NodeKind::Extern
            | NodeKind::Inline
            | NodeKind::Native
            | NodeKind::Static
            | NodeKind::Transient
            | NodeKind::Volatile => {
                self.error(
                    ErrCode::InvalidAttributes,
                    format!(
                        "a statement with only attributes ({}) is not allowed.",
                        kind.name()
                    ),
                );
                self.get_token();
                None
            }

            _ => {
                self.error(
                    ErrCode::InvalidOperator,
                    format!("unexpected operator \"{}\".", instruction_node.kind().name()),
                );
                self.get_token();
                None
            }
        };

        if let Some(directive_node) = directive_node {
            if let Some(attrs) = attr_list {
                if attrs.children_count() > 0 {
                    directive_node.set_attribute_node(&attrs);
                }
            }
            d.append_child(&directive_node);
        }

        // enforce the semicolon where required
        if Self::wants_semicolon(kind) {
            if self.kind() != NodeKind::Semicolon
                && self.kind() != NodeKind::CloseCurvlyBracket
            {
                self.error(
                    ErrCode::SemicolonExpected,
                    format!(
                        "\";\" was expected after \"{}\" (current token: \"{}\").",
                        instruction_node.kind().name(),
                        self.kind().name()
                    ),
                );
            }
            // resynchronize
            while !matches!(
                self.kind(),
                NodeKind::Semicolon
                    | NodeKind::OpenCurvlyBracket
                    | NodeKind::CloseCurvlyBracket
                    | NodeKind::Else
                    | NodeKind::Eof
            ) {
                self.get_token();
            }
            if self.kind() == NodeKind::Semicolon {
                self.get_token();
            }
        }
    }

    // ── Blocks ─────────────────────────────────────────────────────────

    /// Parse the inside of a `{ ... }` block; the `{` was consumed.
    /// An empty block yields an empty DIRECTIVE_LIST.
    pub(crate) fn block(&mut self) -> NodeRef {
        let list = if self.kind() != NodeKind::CloseCurvlyBracket {
            self.directive_list()
        } else {
            self.new_node(NodeKind::DirectiveList)
        };

        if self.kind() != NodeKind::CloseCurvlyBracket {
            self.error(ErrCode::CurvlyBracketsExpected, "'}' expected to close a block.");
        } else {
            self.get_token();
        }
        list
    }

    /// One directive, or a `{}` block when the forced-block flag (bit 1
    /// of `extended_statements`) is set.
    pub(crate) fn forced_block(&mut self, statement: &NodeRef) -> NodeRef {
        let forced = self
            .options
            .borrow()
            .get_option(CompilerOption::ExtendedStatements)
            & 2
            != 0;
        if forced {
            if self.kind() == NodeKind::OpenCurvlyBracket {
                self.get_token();
                let list = self.new_node(NodeKind::DirectiveList);
                let block = self.block();
                list.append_child(&block);
                return list;
            }
            self.error(
                ErrCode::CurvlyBracketsExpected,
                format!(
                    "'{{' expected to open the '{}' block.",
                    statement.kind().name()
                ),
            );
        }
        let list = self.new_node(NodeKind::DirectiveList);
        self.directive(&list);
        list
    }
}
