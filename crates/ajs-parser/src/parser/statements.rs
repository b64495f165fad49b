//! Statement parsing: loops, conditionals, switch with selectable
//! comparison operator, typed catch chains, labelled break/continue.

use ajs_common::message::ErrCode;
use ajs_common::options::CompilerOption;

use crate::node::{NodeFlag, NodeKind, NodeRef};
use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `break [label|default];` / `continue [label|default];`
    pub(crate) fn break_continue(&mut self, kind: NodeKind) -> NodeRef {
        let node = self.new_node(kind);

        if self.kind() == NodeKind::Identifier {
            node.set_string(self.node.string());
            self.get_token();
        } else if self.kind() == NodeKind::Default {
            // `default` is the same as no label
            self.get_token();
        }

        if self.kind() != NodeKind::Semicolon {
            self.error(
                ErrCode::InvalidLabel,
                "'break' and 'continue' can be followed by one label only.",
            );
        }
        node
    }

    /// `case <expr>[ .. <expr>]:`
    pub(crate) fn case_directive(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Case);
        let expr = self.expression();
        node.append_child(&expr);

        // `case <expr> .. <expr>:` range labels
        if matches!(self.kind(), NodeKind::Rest | NodeKind::Range) {
            if !self.has_option_set(CompilerOption::ExtendedStatements) {
                self.error(
                    ErrCode::NotAllowed,
                    "ranges in a 'case' statement are only accepted when extended statements are allowed (use extended_statements;).",
                );
            }
            self.get_token();
            let to = self.expression();
            node.append_child(&to);
        }

        if self.kind() == NodeKind::Colon {
            self.get_token();
        } else {
            self.error(
                ErrCode::CaseLabel,
                "case expression expected to be followed by ':'.",
            );
        }
        node
    }

    /// `catch(<param>[ if <expr>]) { ... }`
    pub(crate) fn catch_directive(&mut self) -> Option<NodeRef> {
        if self.kind() != NodeKind::OpenParenthesis {
            self.error(
                ErrCode::ParenthesisExpected,
                "'(' expected after the 'catch' keyword.",
            );
            return None;
        }
        let node = self.new_node(NodeKind::Catch);
        self.get_token();
        let mut has_out = false;
        let parameters = self.parameter_list(&mut has_out);
        let parameters = match parameters {
            None => {
                self.error(
                    ErrCode::InvalidCatch,
                    "the 'catch' statement cannot be used with void as its list of parameters.",
                );
                if self.kind() == NodeKind::CloseParenthesis {
                    self.get_token();
                }
                return None;
            }
            Some(parameters) => parameters,
        };
        node.append_child(&parameters);

        // exactly one parameter, without initializer
        if parameters.children_count() != 1 {
            self.error(
                ErrCode::InvalidCatch,
                "the 'catch' keyword expects exactly one parameter.",
            );
        } else {
            let param = parameters.child(0);
            let mut has_type = false;
            for idx in 0..param.children_count() {
                if param.child(idx).kind() == NodeKind::Set {
                    self.error(
                        ErrCode::InvalidCatch,
                        "'catch' parameters do not support initializers.",
                    );
                    has_type = false;
                    break;
                }
                has_type = true;
            }
            if has_type {
                node.set_flag(NodeFlag::CatchTyped, true);
            }
        }

        // Netscape-style conditional catch
        if self.kind() == NodeKind::If {
            let if_node = self.node.clone();
            self.get_token();
            let expr = self.expression();
            if_node.append_child(&expr);
            node.append_child(&if_node);
        }

        if self.kind() == NodeKind::CloseParenthesis {
            self.get_token();
            if self.kind() == NodeKind::OpenCurvlyBracket {
                self.get_token();
                let block = self.block();
                node.append_child(&block);
            } else {
                self.error(
                    ErrCode::CurvlyBracketsExpected,
                    "'{' expected after the 'catch' parameter list.",
                );
            }
        } else {
            self.error(
                ErrCode::ParenthesisExpected,
                "')' expected to end the 'catch' parameter list.",
            );
        }
        Some(node)
    }

    pub(crate) fn debugger(&mut self) -> NodeRef {
        self.new_node(NodeKind::Debugger)
    }

    /// `default:` case label.
    pub(crate) fn default_directive(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Default);
        if self.kind() == NodeKind::Colon {
            self.get_token();
        } else {
            self.error(
                ErrCode::DefaultLabel,
                "default label expected to be followed by ':'.",
            );
        }
        node
    }

    /// `do <block> while(<expr>);`
    pub(crate) fn do_directive(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Do);
        let body = self.forced_block(&node);
        node.append_child(&body);

        if self.kind() == NodeKind::While {
            self.get_token();
            if self.kind() == NodeKind::OpenParenthesis {
                self.get_token();
                let expr = self.expression();
                node.append_child(&expr);
                if self.kind() != NodeKind::CloseParenthesis {
                    self.error(
                        ErrCode::ParenthesisExpected,
                        "')' expected to end the 'while' expression.",
                    );
                } else {
                    self.get_token();
                }
            } else {
                self.error(
                    ErrCode::ParenthesisExpected,
                    "'(' expected after the 'while' keyword.",
                );
            }
        } else {
            self.error(
                ErrCode::InvalidDo,
                "'while' expected after the block of a 'do' keyword.",
            );
        }
        node
    }

    /// `for([each](init; test; step | var in expr)) <block>`
    pub(crate) fn for_directive(&mut self) -> Option<NodeRef> {
        let for_each =
            self.kind() == NodeKind::Identifier && self.node.string() == "each";
        if for_each {
            self.get_token();
        }
        if self.kind() != NodeKind::OpenParenthesis {
            self.error(
                ErrCode::ParenthesisExpected,
                "'(' expected following the 'for' keyword.",
            );
            return None;
        }
        let node = self.new_node(NodeKind::For);
        self.get_token();

        if self.kind() == NodeKind::Semicolon {
            // empty initializer
            let empty = self.new_node(NodeKind::Empty);
            node.append_child(&empty);
        } else if matches!(self.kind(), NodeKind::Const | NodeKind::Var) {
            let constant = self.kind() == NodeKind::Const;
            if constant {
                node.set_flag(NodeFlag::ForConst, true);
                self.get_token();
                if self.kind() == NodeKind::Var {
                    self.get_token();
                }
            } else {
                self.get_token();
            }
            let variables =
                self.variable(if constant { NodeKind::Const } else { NodeKind::Var });
            node.append_child(&variables);

            if self.kind() == NodeKind::In {
                self.get_token();
                let expr = self.expression();
                node.append_child(&expr);
                node.set_flag(NodeFlag::ForIn, true);
            }
        } else {
            let expr = self.expression();
            if expr.kind() == NodeKind::In {
                // split `a in b` in two children
                let left = expr.child(0);
                let right = expr.child(1);
                expr.delete_child(0);
                expr.delete_child(0);
                node.append_child(&left);
                node.append_child(&right);
                node.set_flag(NodeFlag::ForIn, true);
            } else {
                node.append_child(&expr);
            }
        }

        if !node.get_flag(NodeFlag::ForIn) {
            if self.kind() == NodeKind::Semicolon {
                self.get_token();
                let second = if self.kind() == NodeKind::Semicolon {
                    self.new_node(NodeKind::Empty)
                } else {
                    self.expression()
                };
                node.append_child(&second);
                if self.kind() == NodeKind::Semicolon {
                    self.get_token();
                    let third = if self.kind() == NodeKind::CloseParenthesis {
                        self.new_node(NodeKind::Empty)
                    } else {
                        self.expression()
                    };
                    node.append_child(&third);
                } else {
                    self.error(
                        ErrCode::SemicolonExpected,
                        "';' expected between the last two 'for' expressions.",
                    );
                }
            } else {
                self.error(
                    ErrCode::SemicolonExpected,
                    "';' or 'in' expected between the 'for' expressions.",
                );
            }
        }

        if self.kind() != NodeKind::CloseParenthesis {
            self.error(
                ErrCode::ParenthesisExpected,
                "')' expected to close the 'for' expressions.",
            );
        } else {
            self.get_token();
        }

        if for_each {
            if node.children_count() == 2 {
                node.set_flag(NodeFlag::ForForeach, true);
            } else {
                self.error(
                    ErrCode::ParenthesisExpected,
                    "'for each()' only available with an enumeration for.",
                );
            }
        }

        let body = self.forced_block(&node);
        node.append_child(&body);
        Some(node)
    }

    /// `goto <label>;`
    pub(crate) fn goto_directive(&mut self) -> Option<NodeRef> {
        if self.kind() == NodeKind::Identifier {
            let node = self.new_node(NodeKind::Goto);
            node.set_string(self.node.string());
            self.get_token();
            Some(node)
        } else {
            self.error(ErrCode::InvalidGoto, "'goto' expects a label as parameter.");
            None
        }
    }

    /// `if(<expr>) <block> [else <block>]`
    pub(crate) fn if_directive(&mut self) -> Option<NodeRef> {
        if self.kind() != NodeKind::OpenParenthesis {
            self.error(
                ErrCode::ParenthesisExpected,
                "'(' expected after the 'if' keyword.",
            );
            return None;
        }
        let node = self.new_node(NodeKind::If);
        self.get_token();
        let expr = self.expression();
        node.append_child(&expr);
        if self.kind() == NodeKind::CloseParenthesis {
            self.get_token();
        } else {
            self.error(
                ErrCode::ParenthesisExpected,
                "')' expected to end the 'if' expression.",
            );
        }

        if self.kind() == NodeKind::Else {
            self.error(
                ErrCode::ImproperStatement,
                "statements expected following the 'if' expression, 'else' found instead.",
            );
        } else {
            let then_block = self.forced_block(&node);
            node.append_child(&then_block);
        }

        // the only place where 'else' is permitted
        if self.kind() == NodeKind::Else {
            self.get_token();
            let else_block = self.forced_block(&node);
            node.append_child(&else_block);
        }
        Some(node)
    }

    /// `return [<expr>];`
    pub(crate) fn return_directive(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Return);
        if self.kind() != NodeKind::Semicolon {
            let expr = self.expression();
            node.append_child(&expr);
        }
        node
    }

    /// `try { ... }` / `finally { ... }`
    pub(crate) fn try_finally(&mut self, kind: NodeKind) -> Option<NodeRef> {
        if self.kind() == NodeKind::OpenCurvlyBracket {
            self.get_token();
            let node = self.new_node(kind);
            let block = self.block();
            node.append_child(&block);
            Some(node)
        } else {
            self.error(
                ErrCode::CurvlyBracketsExpected,
                format!(
                    "'{{' expected after the '{}' keyword.",
                    if kind == NodeKind::Try { "try" } else { "finally" }
                ),
            );
            None
        }
    }

    /// `switch(<expr>) [with (<op>)] { ... }`
    pub(crate) fn switch_directive(&mut self) -> Option<NodeRef> {
        if self.kind() != NodeKind::OpenParenthesis {
            self.error(
                ErrCode::ParenthesisExpected,
                "'(' expected after the 'switch' keyword.",
            );
            return None;
        }
        let node = self.new_node(NodeKind::Switch);
        // the default comparison operator is "unknown" which supports
        // ranges and plain equality
        self.get_token();
        let expr = self.expression();
        node.append_child(&expr);
        if self.kind() == NodeKind::CloseParenthesis {
            self.get_token();
        } else {
            self.error(
                ErrCode::ParenthesisExpected,
                "')' expected to end the 'switch' expression.",
            );
        }

        if self.kind() == NodeKind::With {
            if !self.has_option_set(CompilerOption::ExtendedStatements) {
                self.error(
                    ErrCode::NotAllowed,
                    "a switch() statement can be followed by a 'with' only if extended statements were turned on (use extended_statements;).",
                );
            }
            self.get_token();
            let has_open = self.kind() == NodeKind::OpenParenthesis;
            if has_open {
                self.get_token();
            }
            match self.kind() {
                NodeKind::StrictlyEqual
                | NodeKind::Equal
                | NodeKind::NotEqual
                | NodeKind::StrictlyNotEqual
                | NodeKind::Match
                | NodeKind::SmartMatch
                | NodeKind::In
                | NodeKind::Is
                | NodeKind::As
                | NodeKind::Instanceof
                | NodeKind::Less
                | NodeKind::LessEqual
                | NodeKind::Greater
                | NodeKind::GreaterEqual
                | NodeKind::Default => {
                    node.set_switch_operator(self.kind());
                    self.get_token();
                }
                _ => {
                    self.error(
                        ErrCode::ParenthesisExpected,
                        format!(
                            "'{}' is not a supported operator for a 'switch() with()' expression.",
                            self.kind().name()
                        ),
                    );
                    if self.kind() != NodeKind::OpenCurvlyBracket {
                        self.get_token();
                    }
                }
            }
            if self.kind() == NodeKind::CloseParenthesis {
                self.get_token();
                if !has_open {
                    self.error(
                        ErrCode::ParenthesisExpected,
                        "'(' was expected to start the 'switch() with()' expression.",
                    );
                }
            } else if has_open {
                self.error(
                    ErrCode::ParenthesisExpected,
                    "')' expected to end the 'switch() with()' expression.",
                );
            }
        }

        // attributes between the ')' and the '{' apply to the switch
        let mut attr_list: Option<NodeRef> = None;
        self.attributes(&mut attr_list);
        if let Some(attrs) = attr_list {
            if attrs.children_count() > 0 {
                node.set_attribute_node(&attrs);
            }
        }

        if self.kind() == NodeKind::OpenCurvlyBracket {
            self.get_token();
            let block = self.block();
            node.append_child(&block);
        } else {
            self.error(
                ErrCode::CurvlyBracketsExpected,
                "'{' expected after the 'switch' expression.",
            );
        }
        Some(node)
    }

    /// `synchronized(<expr>) { ... }`
    pub(crate) fn synchronized(&mut self) -> Option<NodeRef> {
        if self.kind() != NodeKind::OpenParenthesis {
            self.error(
                ErrCode::ParenthesisExpected,
                "'(' expected after the 'synchronized' keyword.",
            );
            return None;
        }
        let node = self.new_node(NodeKind::Synchronized);
        self.get_token();
        let expr = self.expression();
        node.append_child(&expr);
        if self.kind() == NodeKind::CloseParenthesis {
            self.get_token();
        } else {
            self.error(
                ErrCode::ParenthesisExpected,
                "')' expected to end the 'synchronized' expression.",
            );
        }
        if self.kind() == NodeKind::OpenCurvlyBracket {
            self.get_token();
            let block = self.block();
            node.append_child(&block);
        } else {
            self.error(
                ErrCode::CurvlyBracketsExpected,
                "'{' expected after the 'synchronized' expression.",
            );
        }
        Some(node)
    }

    /// `throw [<expr>];` (no expression means rethrow)
    pub(crate) fn throw_directive(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Throw);
        if self.kind() != NodeKind::Semicolon {
            let expr = self.expression();
            node.append_child(&expr);
        }
        node
    }

    /// `with(<expr>) <block>` / `while(<expr>) <block>`
    pub(crate) fn with_while(&mut self, kind: NodeKind) -> Option<NodeRef> {
        let name = if kind == NodeKind::With { "with" } else { "while" };

        if kind == NodeKind::With {
            if !self.has_option_set(CompilerOption::AllowWith) {
                self.error(
                    ErrCode::NotAllowed,
                    "'with' is not allowed; you may authorize it with a pragma (use allow_with;) but it is not recommended.",
                );
            } else if self.has_option_set(CompilerOption::Strict) {
                self.error(
                    ErrCode::NotAllowedInStrictMode,
                    "'with' is not allowed in strict mode.",
                );
            }
        }

        if self.kind() != NodeKind::OpenParenthesis {
            self.error(
                ErrCode::ParenthesisExpected,
                format!("'(' expected after the '{name}' keyword."),
            );
            return None;
        }
        let node = self.new_node(kind);
        self.get_token();
        let expr = self.expression();
        node.append_child(&expr);
        if self.kind() == NodeKind::CloseParenthesis {
            self.get_token();
        } else {
            self.error(
                ErrCode::ParenthesisExpected,
                format!("')' expected to end the '{name}' expression."),
            );
        }
        let body = self.forced_block(&node);
        node.append_child(&body);
        Some(node)
    }

    /// `yield <expr>;`
    pub(crate) fn yield_directive(&mut self) -> Option<NodeRef> {
        if self.kind() == NodeKind::Semicolon {
            self.error(
                ErrCode::ExpressionExpected,
                "yield is expected to be followed by an expression.",
            );
            return None;
        }
        let node = self.new_node(NodeKind::Yield);
        let expr = self.expression();
        node.append_child(&expr);
        Some(node)
    }
}
