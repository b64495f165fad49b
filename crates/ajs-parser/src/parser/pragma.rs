//! `use <pragma>[(<argument>)][?];` handling.
//!
//! Pragmas mutate the shared options and leave no trace in the tree.
//! The prima form (`use strict?;`) is a pure query: it asserts that the
//! option currently holds the given value and errs otherwise.

use ajs_common::message::ErrCode;
use ajs_common::options::{CompilerOption, OptionValue};

use crate::node::{NodeKind, NodeRef};
use crate::parser::Parser;

impl<'src> Parser<'src> {
    pub(crate) fn pragma(&mut self) {
        while self.kind() == NodeKind::Identifier {
            let name = self.node.string();
            let mut argument: Option<NodeRef> = None;
            self.get_token();
            if self.kind() == NodeKind::OpenParenthesis {
                // zero or one argument
                self.get_token();
                if self.kind() != NodeKind::CloseParenthesis {
                    let negative = self.kind() == NodeKind::Subtract;
                    if negative {
                        self.get_token();
                    }
                    match self.kind() {
                        NodeKind::False | NodeKind::String | NodeKind::True => {
                            if negative {
                                self.error(
                                    ErrCode::BadPragma,
                                    "invalid negative argument for a pragma.",
                                );
                            }
                            argument = Some(self.node.clone());
                            self.get_token();
                        }
                        NodeKind::FloatingPoint => {
                            let arg = self.node.clone();
                            if negative {
                                arg.set_floating(-arg.floating());
                            }
                            argument = Some(arg);
                            self.get_token();
                        }
                        NodeKind::Integer => {
                            let arg = self.node.clone();
                            if negative {
                                arg.set_integer(-arg.integer());
                            }
                            argument = Some(arg);
                            self.get_token();
                        }
                        NodeKind::CloseParenthesis => {
                            if negative {
                                // cannot negate nothingness
                                self.error(
                                    ErrCode::BadPragma,
                                    "a pragma argument cannot just be \"-\".",
                                );
                            }
                        }
                        _ => {
                            self.error(ErrCode::BadPragma, "invalid argument type for a pragma.");
                        }
                    }
                }
                if self.kind() != NodeKind::CloseParenthesis {
                    self.error(ErrCode::BadPragma, "invalid argument for a pragma.");
                } else {
                    self.get_token();
                }
            }
            let prima = self.kind() == NodeKind::Conditional;
            if prima {
                self.get_token();
            }

            // unknown pragmas are quietly ignored (debug level)
            let mut value: OptionValue = 1;
            let option = match name.as_str() {
                "allow_with" => Some(CompilerOption::AllowWith),
                "no_allow_with" => {
                    value = 0;
                    Some(CompilerOption::AllowWith)
                }
                "coverage" => Some(CompilerOption::Coverage),
                "no_coverage" => {
                    value = 0;
                    Some(CompilerOption::Coverage)
                }
                "debug" => Some(CompilerOption::Debug),
                "no_debug" => {
                    value = 0;
                    Some(CompilerOption::Debug)
                }
                "extended_escape_sequences" => Some(CompilerOption::ExtendedEscapeSequences),
                "no_extended_escape_sequences" => {
                    value = 0;
                    Some(CompilerOption::ExtendedEscapeSequences)
                }
                "extended_operators" => Some(CompilerOption::ExtendedOperators),
                "no_extended_operators" => {
                    value = 0;
                    Some(CompilerOption::ExtendedOperators)
                }
                "extended_statements" => Some(CompilerOption::ExtendedStatements),
                "no_extended_statements" => {
                    value = 0;
                    Some(CompilerOption::ExtendedStatements)
                }
                "octal" => Some(CompilerOption::Octal),
                "no_octal" => {
                    value = 0;
                    Some(CompilerOption::Octal)
                }
                "strict" => Some(CompilerOption::Strict),
                "no_strict" => {
                    value = 0;
                    Some(CompilerOption::Strict)
                }
                "trace" => Some(CompilerOption::Trace),
                "no_trace" => {
                    value = 0;
                    Some(CompilerOption::Trace)
                }
                "unsafe_math" => Some(CompilerOption::UnsafeMath),
                "no_unsafe_math" => {
                    value = 0;
                    Some(CompilerOption::UnsafeMath)
                }
                _ => None,
            };
            match option {
                Some(option) => self.pragma_option(option, prima, argument, value),
                None => {
                    self.error(
                        ErrCode::UnknownPragma,
                        format!("unknown pragma \"{name}\"."),
                    );
                }
            }

            if self.kind() == NodeKind::Comma {
                self.get_token();
            } else if self.kind() == NodeKind::Identifier {
                self.error(ErrCode::BadPragma, "pragmas must be separated by commas.");
            } else if self.kind() != NodeKind::Semicolon {
                self.error(
                    ErrCode::BadPragma,
                    "pragmas must be separated by commas and ended by a semicolon.",
                );
                // the caller's loop ends here anyway
            }
        }
    }

    fn pragma_option(
        &mut self,
        option: CompilerOption,
        prima: bool,
        argument: Option<NodeRef>,
        mut value: OptionValue,
    ) {
        // the argument overloads the default value
        if let Some(argument) = argument {
            match argument.kind() {
                NodeKind::True => value = 1,
                NodeKind::Integer => value = argument.integer(),
                NodeKind::FloatingPoint => value = argument.floating() as OptionValue,
                NodeKind::String => {
                    self.error(
                        ErrCode::IncompatiblePragmaArgument,
                        "incompatible pragma argument.",
                    );
                }
                _ => value = 0, // FALSE
            }
        }

        if prima {
            if self.options.borrow().get_option(option) != value {
                self.error(ErrCode::PragmaFailed, "prima pragma failed.");
            }
            return;
        }

        self.options.borrow_mut().set_option(option, value);
    }
}
