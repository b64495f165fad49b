//! Declarations: classes and interfaces, enumerations, contracts,
//! functions (including operator overloads, getters and setters) and
//! variables.

use ajs_common::message::ErrCode;
use ajs_common::options::CompilerOption;

use crate::node::{NodeAttr, NodeFlag, NodeKind, NodeRef};
use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `class <name> [extends <expr>] [implements <list>] { ... }`
    /// Also parses interfaces; a trailing `;` instead of a body is a
    /// forward declaration.
    pub(crate) fn class_declaration(&mut self, kind: NodeKind) -> NodeRef {
        let node = self.new_node(kind);

        // *** name ***
        if self.kind() != NodeKind::Identifier {
            self.error(
                ErrCode::InvalidClass,
                "the name of the class is expected after the keyword 'class'.",
            );
            match self.kind() {
                NodeKind::Extends | NodeKind::Implements | NodeKind::OpenCurvlyBracket => {}
                _ => return node,
            }
        } else {
            node.set_string(self.node.string());
            self.get_token();
        }

        // *** inheritance ***
        if self.kind() == NodeKind::Colon {
            // a C++ style declaration, diagnose and carry on
            self.get_token();
            if matches!(self.kind(), NodeKind::Extends | NodeKind::Implements) {
                self.error(
                    ErrCode::Incompatible,
                    "the 'extends' and 'implements' instructions cannot be preceded by a colon.",
                );
            } else if matches!(
                self.kind(),
                NodeKind::OpenCurvlyBracket | NodeKind::Semicolon
            ) {
                self.error(
                    ErrCode::CurvlyBracketsExpected,
                    "the 'class' keyword cannot be followed by a colon.",
                );
            }
        }

        #[derive(PartialEq)]
        enum Status {
            Extends,
            Implements,
            Done,
        }
        let mut status = Status::Extends;
        while matches!(
            self.kind(),
            NodeKind::Extends
                | NodeKind::Implements
                | NodeKind::Private
                | NodeKind::Protected
                | NodeKind::Public
        ) {
            let mut inherits = self.node.clone();
            let extend_kind = self.kind();

            if matches!(
                extend_kind,
                NodeKind::Private | NodeKind::Protected | NodeKind::Public
            ) {
                self.error(
                    ErrCode::Incompatible,
                    "please use 'extends' or 'implements' to define a list of base classes. 'public', 'private', and 'protected' are used in C++ only.",
                );
                inherits = self.node.create_replacement(NodeKind::Extends);
            } else if status != Status::Extends && extend_kind != NodeKind::Implements {
                self.error(
                    ErrCode::Incompatible,
                    "a class definition expects 'extends' first and then 'implements'.",
                );
            } else if status == Status::Done {
                self.error(
                    ErrCode::Incompatible,
                    "a class definition expects zero or one 'extends' and then zero or one 'implements'. Use commas to separate multiple inheritance names.",
                );
            }

            node.append_child(&inherits);
            self.get_token();

            let expr = self.expression();
            inherits.append_child(&expr);

            if status == Status::Extends && extend_kind == NodeKind::Extends {
                status = Status::Implements;
            } else {
                status = Status::Done;
            }
        }

        if self.kind() == NodeKind::OpenCurvlyBracket {
            self.get_token();

            // *** body ***
            if self.kind() != NodeKind::CloseCurvlyBracket {
                let directives = self.directive_list();
                node.append_child(&directives);
            } else {
                // an empty class is not a forward declaration
                let empty = self.new_node(NodeKind::Empty);
                node.append_child(&empty);
            }

            if self.kind() == NodeKind::CloseCurvlyBracket {
                self.get_token();
            } else {
                self.error(
                    ErrCode::CurvlyBracketsExpected,
                    "'}' expected to close the 'class' definition.",
                );
            }
        } else if self.kind() != NodeKind::Semicolon {
            self.error(
                ErrCode::CurvlyBracketsExpected,
                "'{' expected to start the 'class' definition.",
            );
        }
        // a ';' means a forward declaration, accepted as is
        node
    }

    /// `require`/`ensure`/`invariant`: a list of labelled boolean
    /// expressions.
    pub(crate) fn contract_declaration(&mut self, kind: NodeKind) -> NodeRef {
        let node = self.new_node(kind);
        loop {
            let label = self.new_node(NodeKind::Label);
            node.append_child(&label);
            if self.kind() != NodeKind::Identifier {
                self.error(
                    ErrCode::InvalidLabel,
                    format!(
                        "'{}' must be followed by a list of labeled expressions.",
                        node.kind().name()
                    ),
                );
            } else {
                label.set_string(self.node.string());
                self.get_token();
            }
            if self.kind() != NodeKind::Colon {
                self.error(
                    ErrCode::ColonExpected,
                    format!(
                        "the '{}' label must be followed by a colon (:).",
                        node.kind().name()
                    ),
                );
            } else {
                self.get_token();
            }
            let expr = self.conditional_expression(false);
            label.append_child(&expr);
            if self.kind() != NodeKind::Comma {
                return node;
            }
            self.get_token();
        }
    }

    /// `enum [class] [<name>] [: <type>] { a, b = 5, c }`
    pub(crate) fn enum_declaration(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Enum);

        if self.kind() == NodeKind::Class {
            self.get_token();
            node.set_flag(NodeFlag::EnumClass, true);
        }

        // enumerations can be unnamed
        if self.kind() == NodeKind::Identifier {
            node.set_string(self.node.string());
            self.get_token();
        }

        if self.kind() == NodeKind::Colon {
            self.get_token();
            let expr = self.expression();
            let type_node = self.new_node(NodeKind::Type);
            type_node.append_child(&expr);
            node.append_child(&type_node);
        }

        if self.kind() != NodeKind::OpenCurvlyBracket {
            if self.kind() == NodeKind::Semicolon {
                // forward declaration
                if node.string().is_empty() {
                    self.error(ErrCode::InvalidEnum, "a forward enumeration must be named.");
                }
                return node;
            }
            self.error(
                ErrCode::CurvlyBracketsExpected,
                "'{' expected to start the 'enum' definition.",
            );
            return node;
        }

        self.get_token();
        if self.kind() == NodeKind::CloseCurvlyBracket {
            // distinguish an empty enumeration from a forward
            // declaration
            let empty = self.new_node(NodeKind::Empty);
            node.append_child(&empty);
        } else {
            let mut previous: Option<NodeRef> = None;
            while !matches!(
                self.kind(),
                NodeKind::CloseCurvlyBracket | NodeKind::Semicolon | NodeKind::Eof
            ) {
                if self.kind() == NodeKind::Comma {
                    self.get_token();
                    self.warning(
                        ErrCode::UnexpectedPunctuation,
                        "',' unexpected without a name.",
                    );
                    continue;
                }
                let mut current_name = String::from("null");
                let entry = self.new_node(NodeKind::Variable);
                node.append_child(&entry);
                if self.kind() == NodeKind::Identifier {
                    entry.set_flag(NodeFlag::VariableConst, true);
                    entry.set_flag(NodeFlag::VariableEnum, true);
                    current_name = self.node.string();
                    entry.set_string(current_name.clone());
                    self.get_token();
                } else {
                    self.error(
                        ErrCode::InvalidEnum,
                        "each 'enum' entry needs to include an identifier.",
                    );
                    if !matches!(
                        self.kind(),
                        NodeKind::Assignment
                            | NodeKind::Comma
                            | NodeKind::CloseCurvlyBracket
                    ) {
                        self.get_token();
                    }
                }

                let expr = if self.kind() == NodeKind::Assignment {
                    self.get_token();
                    self.conditional_expression(false)
                } else if let Some(previous) = previous.take() {
                    // unnumbered entries follow the previous one
                    let add = self.new_node(NodeKind::Add);
                    add.append_child(&previous);
                    let one = self.new_node(NodeKind::Integer);
                    one.set_integer(1);
                    add.append_child(&one);
                    add
                } else {
                    // very first entry defaults to zero
                    let zero = self.new_node(NodeKind::Integer);
                    zero.set_integer(0);
                    zero
                };

                let set = self.new_node(NodeKind::Set);
                set.append_child(&expr);
                entry.append_child(&set);

                let reference = self.new_node(NodeKind::Identifier);
                reference.set_string(current_name);
                previous = Some(reference);

                if self.kind() == NodeKind::Comma {
                    self.get_token();
                } else if !matches!(
                    self.kind(),
                    NodeKind::CloseCurvlyBracket | NodeKind::Semicolon
                ) {
                    self.error(
                        ErrCode::CommaExpected,
                        "',' expected between enumeration elements.",
                    );
                }
            }
        }

        if self.kind() == NodeKind::CloseCurvlyBracket {
            self.get_token();
        } else {
            self.error(
                ErrCode::CurvlyBracketsExpected,
                "'}' expected to close the 'enum' definition.",
            );
        }
        node
    }

    /// Parse a function parameter list. Returns `None` when the list is
    /// `(Void)`/`(void)`, which means "no parameters accepted".
    pub(crate) fn parameter_list(&mut self, has_out: &mut bool) -> Option<NodeRef> {
        // accept function stuff(void) as in C/C++; `Void` is the type,
        // `void` the keyword, both work
        if self.kind() == NodeKind::Void
            || (self.kind() == NodeKind::Identifier && self.node.string() == "Void")
        {
            self.get_token();
            return None;
        }

        let parameters = self.new_node(NodeKind::Parameters);

        // an explicitly unprototyped function accepts any arguments,
        // their type and number are not defined
        if self.kind() == NodeKind::Identifier && self.node.string() == "unprototyped" {
            let param = self.new_node(NodeKind::Param);
            param.set_flag(NodeFlag::ParamUnprototyped, true);
            parameters.append_child(&param);
            self.get_token();
            return Some(parameters);
        }

        let mut invalid = false;
        loop {
            let param = self.new_node(NodeKind::Param);

            // parameter attributes (var, const, in, out, named,
            // unchecked, ...)
            let mut param_has_out = false;
            loop {
                match self.kind() {
                    NodeKind::Rest => {
                        param.set_flag(NodeFlag::ParamRest, true);
                        invalid = false;
                        self.get_token();
                    }
                    NodeKind::Const => {
                        param.set_flag(NodeFlag::ParamConst, true);
                        invalid = false;
                        self.get_token();
                    }
                    NodeKind::In => {
                        param.set_flag(NodeFlag::ParamIn, true);
                        invalid = false;
                        self.get_token();
                    }
                    NodeKind::Var => {
                        invalid = false;
                        self.get_token();
                    }
                    NodeKind::Identifier => match self.node.string().as_str() {
                        "out" => {
                            param.set_flag(NodeFlag::ParamOut, true);
                            invalid = false;
                            self.get_token();
                            *has_out = true;
                            param_has_out = true;
                        }
                        "named" => {
                            param.set_flag(NodeFlag::ParamNamed, true);
                            invalid = false;
                            self.get_token();
                        }
                        "unchecked" => {
                            param.set_flag(NodeFlag::ParamUnchecked, true);
                            invalid = false;
                            self.get_token();
                        }
                        _ => break,
                    },
                    _ => break,
                }
            }

            if param_has_out {
                if param.get_flag(NodeFlag::ParamRest) {
                    self.error(
                        ErrCode::InvalidParameters,
                        "you cannot use the function parameter attribute \"out\" with \"...\".",
                    );
                }
                if param.get_flag(NodeFlag::ParamConst) {
                    self.error(
                        ErrCode::InvalidParameters,
                        "you cannot use the function attributes \"out\" and \"const\" together.",
                    );
                }
            }

            if self.kind() == NodeKind::Identifier {
                param.set_string(self.node.string());
                parameters.append_child(&param);
                invalid = false;
                self.get_token();
                if self.kind() == NodeKind::Colon {
                    self.get_token();
                    let expr = self.conditional_expression(false);
                    let type_node = self.new_node(NodeKind::Type);
                    type_node.append_child(&expr);
                    param.append_child(&type_node);
                }
                if self.kind() == NodeKind::Assignment {
                    if param.get_flag(NodeFlag::ParamRest) {
                        self.error(
                            ErrCode::InvalidParameters,
                            "you cannot assign a default value to \"...\".",
                        );
                        // keep parsing the initializer to resynchronize
                    }
                    self.get_token();
                    let initializer = self.new_node(NodeKind::Set);
                    let expr = self.conditional_expression(false);
                    initializer.append_child(&expr);
                    param.append_child(&initializer);
                }
            } else if param.get_flag(NodeFlag::ParamRest) {
                parameters.append_child(&param);
            }

            // end of list? (catch(e if ...) stops on IF)
            if matches!(self.kind(), NodeKind::CloseParenthesis | NodeKind::If) {
                return Some(parameters);
            }

            if self.kind() != NodeKind::Comma {
                if !invalid {
                    self.error(
                        ErrCode::InvalidParameters,
                        format!(
                            "expected \")\" or \",\" after a parameter declaration (not token {}).",
                            self.kind().name()
                        ),
                    );
                }
                match self.kind() {
                    NodeKind::Eof
                    | NodeKind::Semicolon
                    | NodeKind::OpenCurvlyBracket
                    | NodeKind::CloseCurvlyBracket => return Some(parameters),
                    _ => {}
                }
                if invalid {
                    self.get_token();
                }
                invalid = true;
            } else {
                if param.get_flag(NodeFlag::ParamRest) {
                    self.error(
                        ErrCode::InvalidParameters,
                        "no other parameters expected after \"...\".",
                    );
                }
                self.get_token();
            }
        }
    }

    /// Parse a function declaration or expression. Handles getters and
    /// setters, operator overload names, parameter lists, return types,
    /// `throws` clauses, contracts and the body.
    pub(crate) fn function(&mut self, expression_function: bool) -> NodeRef {
        let node = self.new_node(NodeKind::Function);

        let data_kind = self.kind();
        match data_kind {
            NodeKind::Identifier => {
                let etter = match self.node.string().as_str() {
                    "get" => {
                        node.set_flag(NodeFlag::FunctionGetter, true);
                        "->"
                    }
                    "set" => {
                        node.set_flag(NodeFlag::FunctionSetter, true);
                        "<-"
                    }
                    _ => "",
                };
                if !etter.is_empty() {
                    // *** getter or setter ***
                    self.get_token();
                    if self.kind() == NodeKind::Identifier {
                        node.set_string(format!("{etter}{}", self.node.string()));
                        self.get_token();
                    } else if self.kind() == NodeKind::String {
                        node.set_string(format!("{etter}{}", self.node.string()));
                        if NodeKind::from_operator_name(&self.node.string()).is_some() {
                            self.error(
                                ErrCode::InvalidFunction,
                                "operator override cannot be marked as a getter nor a setter function.",
                            );
                        }
                        self.get_token();
                    } else if self.kind() == NodeKind::OpenParenthesis {
                        // only get() or set(): a normal function
                        if node.get_flag(NodeFlag::FunctionGetter) {
                            node.set_string("get");
                        } else {
                            node.set_string("set");
                        }
                        node.set_flag(NodeFlag::FunctionGetter, false);
                        node.set_flag(NodeFlag::FunctionSetter, false);
                    } else if !expression_function {
                        self.error(
                            ErrCode::InvalidFunction,
                            "getter and setter functions require a name.",
                        );
                    }
                    if expression_function
                        && (node.get_flag(NodeFlag::FunctionGetter)
                            || node.get_flag(NodeFlag::FunctionSetter))
                    {
                        self.error(
                            ErrCode::InvalidFunction,
                            "expression functions cannot be getter nor setter functions.",
                        );
                    }
                } else {
                    // *** standard name ***
                    node.set_string(self.node.string());
                    self.get_token();
                    if self.kind() == NodeKind::Identifier {
                        self.error(
                            ErrCode::InvalidFunction,
                            "only one name is expected for a function (misspelled get or set? missing \"(\" before a parameter?)",
                        );
                        self.get_token();
                    }
                }
            }

            NodeKind::Delete => {
                // a few keywords are legal function names
                node.set_string("delete");
                self.get_token();
            }

            NodeKind::String => {
                // *** operator overload; any string is accepted ***
                node.set_string(self.node.string());
                if NodeKind::from_operator_name(&node.string()).is_some() {
                    node.set_flag(NodeFlag::FunctionOperator, true);
                }
                self.get_token();
            }

            kind if kind.operator_name().is_some()
                && !matches!(kind, NodeKind::Call | NodeKind::Array) =>
            {
                // extended operators require the pragma even as names
                if matches!(
                    kind,
                    NodeKind::AssignmentMaximum
                        | NodeKind::AssignmentMinimum
                        | NodeKind::AssignmentPower
                        | NodeKind::AssignmentRotateLeft
                        | NodeKind::AssignmentRotateRight
                        | NodeKind::Compare
                        | NodeKind::LogicalXor
                        | NodeKind::Match
                        | NodeKind::Maximum
                        | NodeKind::Minimum
                        | NodeKind::NotMatch
                        | NodeKind::Power
                        | NodeKind::RotateLeft
                        | NodeKind::RotateRight
                        | NodeKind::SmartMatch
                ) && !self.has_option_set(CompilerOption::ExtendedOperators)
                {
                    self.error(
                        ErrCode::NotAllowed,
                        format!(
                            "the \"{}\" operator is only available when extended operators are authorized (use extended_operators;).",
                            kind.name()
                        ),
                    );
                }
                node.set_string(kind.operator_name().unwrap());
                node.set_flag(NodeFlag::FunctionOperator, true);
                self.get_token();
            }

            NodeKind::OpenSquareBracket => {
                node.set_string("[]");
                node.set_flag(NodeFlag::FunctionOperator, true);
                self.get_token();
                if self.kind() != NodeKind::CloseSquareBracket {
                    self.error(
                        ErrCode::InvalidFunction,
                        "the \"[]\" operator as a function name must include the \"]\" bracket immediately after the \"[\".",
                    );
                } else {
                    self.get_token();
                }
            }

            NodeKind::OpenParenthesis => {
                // `function ()(...)` declares the call operator; this
                // takes three tokens of lookahead
                let restore = self.node.clone();
                self.get_token();
                if self.kind() == NodeKind::CloseParenthesis {
                    let save = self.node.clone();
                    self.get_token();
                    if self.kind() == NodeKind::OpenParenthesis {
                        node.set_string("()");
                        node.set_flag(NodeFlag::FunctionOperator, true);
                    } else {
                        let current = self.node.clone();
                        self.unget_token(current);
                        self.unget_token(save);
                        self.node = restore;
                        if !expression_function {
                            self.error(
                                ErrCode::InvalidFunction,
                                "function declarations are required to be named.",
                            );
                        }
                    }
                } else {
                    let current = self.node.clone();
                    self.unget_token(current);
                    self.node = restore;
                    if !expression_function {
                        self.error(
                            ErrCode::InvalidFunction,
                            "function declarations are required to be named.",
                        );
                    }
                }
            }

            _ => {
                if !expression_function {
                    self.error(
                        ErrCode::InvalidFunction,
                        "function declarations are required to be named.",
                    );
                }
            }
        }

        // *** parameters ***
        let mut param_count = 0;
        if self.kind() == NodeKind::OpenParenthesis {
            self.get_token();
            if self.kind() != NodeKind::CloseParenthesis {
                let mut has_out = false;
                let params = self.parameter_list(&mut has_out);
                if has_out {
                    node.set_flag(NodeFlag::FunctionOut, true);
                }
                match params {
                    Some(params) => {
                        node.append_child(&params);

                        // fix the pre/post increment and decrement names
                        param_count = params.children_count();
                        if param_count == 1 {
                            if data_kind == NodeKind::Increment {
                                node.set_string("x++");
                            } else if data_kind == NodeKind::Decrement {
                                node.set_string("x--");
                            }
                        }
                    }
                    None => {
                        // the list was (Void) or (void)
                        node.set_flag(NodeFlag::FunctionNoparams, true);
                    }
                }
                if self.kind() != NodeKind::CloseParenthesis {
                    let fname = node.string();
                    self.error(
                        ErrCode::ParenthesisExpected,
                        format!(
                            "\")\" expected to close the list of parameters of function \"{}\".",
                            if fname.is_empty() { "<unnamed>" } else { &fname }
                        ),
                    );
                } else {
                    self.get_token();
                }
            } else {
                self.get_token();
            }
        }

        if node.get_flag(NodeFlag::FunctionGetter) {
            if param_count != 0 {
                self.error(
                    ErrCode::InvalidFunction,
                    "a getter function does not support any parameter.",
                );
            } else {
                // mark getters as (void) so the compiler does not view
                // them as unprototyped
                node.set_flag(NodeFlag::FunctionNoparams, true);
            }
        }
        if node.get_flag(NodeFlag::FunctionSetter) && param_count != 1 {
            self.error(
                ErrCode::InvalidFunction,
                "a setter function must have exactly one parameter.",
            );
        }

        // *** return type ***
        if self.kind() == NodeKind::Colon {
            self.get_token();
            if self.kind() == NodeKind::Void
                || (self.kind() == NodeKind::Identifier && self.node.string() == "Void")
            {
                // a procedure rather than a function
                node.set_flag(NodeFlag::FunctionVoid, true);
                self.get_token();
            } else if self.kind() == NodeKind::Identifier && self.node.string() == "Never" {
                // the function is not expected to return
                node.set_flag(NodeFlag::FunctionNever, true);
                self.get_token();
            } else {
                let expr = self.conditional_expression(false);
                let type_node = self.new_node(NodeKind::Type);
                type_node.append_child(&expr);
                node.append_child(&type_node);
            }
        }

        // *** throws ***
        if self.kind() == NodeKind::Throws {
            self.get_token();
            let throws = self.new_node(NodeKind::Throws);
            node.append_child(&throws);
            loop {
                let expr = self.conditional_expression(false);
                throws.append_child(&expr);
                if self.kind() != NodeKind::Comma {
                    break;
                }
                self.get_token();
            }
        }

        // *** contracts ***
        if self.kind() == NodeKind::Require {
            self.get_token();
            let has_else = self.kind() == NodeKind::Else;
            if has_else {
                // `require else` is an OR with the inherited contract
                self.get_token();
            }
            let require = self.contract_declaration(NodeKind::Require);
            if has_else {
                require.set_attr(NodeAttr::RequireElse, true);
            }
            node.append_child(&require);
        }
        if self.kind() == NodeKind::Ensure {
            self.get_token();
            let has_then = self.kind() == NodeKind::Then;
            if has_then {
                // `ensure then` is an AND with the inherited contract
                self.get_token();
            }
            let ensure = self.contract_declaration(NodeKind::Ensure);
            if has_then {
                ensure.set_attr(NodeAttr::EnsureThen, true);
            }
            node.append_child(&ensure);
        }

        // *** body ***
        if self.kind() == NodeKind::OpenCurvlyBracket {
            self.get_token();
            if self.kind() != NodeKind::CloseCurvlyBracket {
                let statements = self.directive_list();
                node.append_child(&statements);
            }
            if self.kind() != NodeKind::CloseCurvlyBracket {
                self.error(
                    ErrCode::CurvlyBracketsExpected,
                    "\"}\" expected to close the \"function\" block.",
                );
            } else {
                self.get_token();
            }
        }
        // a function without a body is abstract or a prototype, both
        // are permitted in interfaces and native classes
        node
    }

    /// One `var`/`const`/`final` declaration (a VAR node holding one or
    /// more VARIABLE children).
    pub(crate) fn variable(&mut self, variable_kind: NodeKind) -> NodeRef {
        let node = self.new_node(NodeKind::Var);
        loop {
            let variable_node = self.new_node(NodeKind::Variable);
            if variable_kind == NodeKind::Const {
                variable_node.set_flag(NodeFlag::VariableConst, true);
            } else if variable_kind == NodeKind::Final {
                variable_node.set_flag(NodeFlag::VariableFinal, true);
            }
            node.append_child(&variable_node);

            if self.kind() == NodeKind::Identifier {
                variable_node.set_string(self.node.string());
                self.get_token();
            } else {
                let type_name = match variable_kind {
                    NodeKind::Const => "const",
                    NodeKind::Final => "final",
                    _ => "var",
                };
                self.error(
                    ErrCode::InvalidVariable,
                    format!("expected an identifier after the \"{type_name}\" keyword."),
                );
            }

            if self.kind() == NodeKind::Colon {
                self.get_token();
                let type_node = self.new_node(NodeKind::Type);
                let expr = self.conditional_expression(false);
                type_node.append_child(&expr);
                variable_node.append_child(&type_node);
            }

            if self.kind() == NodeKind::Assignment {
                self.get_token();
                loop {
                    // a constant may be a list of attributes, hence the
                    // loop; a plain var only takes one initializer
                    let initializer = self.new_node(NodeKind::Set);
                    let expr = self.conditional_expression(false);
                    initializer.append_child(&expr);
                    variable_node.append_child(&initializer);

                    if variable_kind == NodeKind::Var
                        || matches!(
                            self.kind(),
                            NodeKind::Comma
                                | NodeKind::Semicolon
                                | NodeKind::OpenCurvlyBracket
                                | NodeKind::CloseCurvlyBracket
                                | NodeKind::CloseParenthesis
                        )
                    {
                        break;
                    }
                }
            }

            if self.kind() != NodeKind::Comma {
                return node;
            }
            self.get_token();
        }
    }
}
