//! Packages, imports and namespaces.

use ajs_common::message::ErrCode;

use crate::node::{NodeFlag, NodeKind, NodeRef};
use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// `package <dotted-name-or-string> { ... }`
    pub(crate) fn package(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Package);
        let mut name = String::new();

        if self.kind() == NodeKind::Identifier {
            name = self.node.string();
            self.get_token();
            while self.kind() == NodeKind::Member {
                self.get_token();
                if self.kind() != NodeKind::Identifier {
                    self.error(
                        ErrCode::InvalidPackageName,
                        "invalid package name (expected an identifier after the last '.').",
                    );
                    if matches!(
                        self.kind(),
                        NodeKind::OpenCurvlyBracket
                            | NodeKind::CloseCurvlyBracket
                            | NodeKind::Semicolon
                    ) {
                        break;
                    }
                } else {
                    name.push('.');
                    name.push_str(&self.node.string());
                }
                self.get_token();
            }
        } else if self.kind() == NodeKind::String {
            name = self.node.string();
            self.get_token();
        }

        node.set_string(name);

        if self.kind() == NodeKind::OpenCurvlyBracket {
            self.get_token();
        } else {
            self.error(
                ErrCode::CurvlyBracketsExpected,
                "'{' expected after the package name.",
            );
        }

        let directives = self.directive_list();
        node.append_child(&directives);

        if self.kind() == NodeKind::CloseCurvlyBracket {
            self.get_token();
        } else {
            self.error(
                ErrCode::CurvlyBracketsExpected,
                "'}' expected after the package declaration.",
            );
        }
        node
    }

    /// `import [implements] <name>[.*] [= <pkg>] [, namespace <expr>]
    /// [, include|exclude <expr>]*;`
    pub(crate) fn import(&mut self) -> NodeRef {
        let node = self.new_node(NodeKind::Import);

        if self.kind() == NodeKind::Implements {
            node.set_flag(NodeFlag::ImportImplements, true);
            self.get_token();
        }

        if self.kind() == NodeKind::Identifier {
            let mut name;
            let first = self.node.clone();
            self.get_token();
            let is_renaming = self.kind() == NodeKind::Assignment;
            if is_renaming {
                // the first identifier is the package alias
                node.append_child(&first);
                self.get_token();
                if self.kind() == NodeKind::String {
                    name = self.node.string();
                    self.get_token();
                    if matches!(
                        self.kind(),
                        NodeKind::Member | NodeKind::Range | NodeKind::Rest
                    ) {
                        self.error(
                            ErrCode::InvalidPackageName,
                            "a package name is either a string or a list of identifiers separated by periods (.); you cannot mix both.",
                        );
                    }
                } else if self.kind() == NodeKind::Identifier {
                    name = self.node.string();
                    self.get_token();
                } else {
                    name = String::new();
                    self.error(
                        ErrCode::InvalidPackageName,
                        "the name of a package was expected.",
                    );
                }
            } else {
                name = first.string();
            }

            let mut everything = 0;
            while matches!(
                self.kind(),
                NodeKind::Member | NodeKind::Range | NodeKind::Rest
            ) {
                if matches!(self.kind(), NodeKind::Range | NodeKind::Rest) {
                    self.error(
                        ErrCode::InvalidPackageName,
                        "the name of a package is expected to be separated by single periods (.).",
                    );
                }
                if everything == 1 {
                    everything = 2;
                    self.error(
                        ErrCode::InvalidPackageName,
                        "the * notation can only be used once at the end of a name.",
                    );
                }
                name.push('.');
                self.get_token();
                if self.kind() == NodeKind::Multiply {
                    if is_renaming && everything == 0 {
                        self.error(
                            ErrCode::InvalidPackageName,
                            "the * notation cannot be used when renaming an import.",
                        );
                        everything = 2;
                    }
                    name.push('*');
                    if everything == 0 {
                        everything = 1;
                    }
                } else if self.kind() != NodeKind::Identifier {
                    if self.kind() == NodeKind::String {
                        self.error(
                            ErrCode::InvalidPackageName,
                            "a package name is either a string or a list of identifiers separated by periods (.); you cannot mix both.",
                        );
                        self.get_token();
                    } else {
                        self.error(
                            ErrCode::InvalidPackageName,
                            "the name of a package was expected.",
                        );
                    }
                    if matches!(
                        self.kind(),
                        NodeKind::Member | NodeKind::Range | NodeKind::Rest
                    ) {
                        continue;
                    }
                    break;
                } else {
                    name.push_str(&self.node.string());
                }
                self.get_token();
            }

            node.set_string(name);

            // `import a.b.c as Alias;` names the import after the fact
            if self.kind() == NodeKind::As {
                self.get_token();
                if everything != 0 {
                    self.error(
                        ErrCode::InvalidPackageName,
                        "the * notation cannot be used when renaming an import.",
                    );
                }
                if self.kind() == NodeKind::Identifier {
                    let alias = self.node.clone();
                    node.append_child(&alias);
                    self.get_token();
                } else {
                    self.error(
                        ErrCode::InvalidPackageName,
                        "an identifier was expected after the 'as' keyword.",
                    );
                }
            }
        } else if self.kind() == NodeKind::String {
            node.set_string(self.node.string());
            self.get_token();
        } else {
            self.error(
                ErrCode::InvalidPackageName,
                "a composed name or a string was expected after 'import'.",
            );
            if !matches!(self.kind(), NodeKind::Semicolon | NodeKind::Comma) {
                self.get_token();
            }
        }

        // `namespace`, `include` and `exclude` qualifiers; include and
        // exclude are mutually exclusive
        let mut include_exclude = 0;
        while self.kind() == NodeKind::Comma {
            self.get_token();
            if self.kind() == NodeKind::Namespace {
                self.get_token();
                let expr = self.conditional_expression(false);
                let use_node = self.new_node(NodeKind::Use);
                use_node.append_child(&expr);
                node.append_child(&use_node);
            } else if self.kind() == NodeKind::Identifier {
                match self.node.string().as_str() {
                    "include" => {
                        if include_exclude == 2 {
                            self.error(
                                ErrCode::InvalidImport,
                                "include and exclude are mutually exclusive.",
                            );
                            include_exclude = 3;
                        } else if include_exclude == 0 {
                            include_exclude = 1;
                        }
                        self.get_token();
                        let expr = self.conditional_expression(false);
                        let include = self.new_node(NodeKind::Include);
                        include.append_child(&expr);
                        node.append_child(&include);
                    }
                    "exclude" => {
                        if include_exclude == 1 {
                            self.error(
                                ErrCode::InvalidImport,
                                "include and exclude are mutually exclusive.",
                            );
                            include_exclude = 3;
                        } else if include_exclude == 0 {
                            include_exclude = 2;
                        }
                        self.get_token();
                        let expr = self.conditional_expression(false);
                        let exclude = self.new_node(NodeKind::Exclude);
                        exclude.append_child(&expr);
                        node.append_child(&exclude);
                    }
                    _ => {
                        self.error(
                            ErrCode::InvalidImport,
                            "namespace, include or exclude was expected after the comma.",
                        );
                    }
                }
            } else if self.kind() == NodeKind::Comma {
                self.error(
                    ErrCode::InvalidImport,
                    "two commas in a row is not allowed while describing an import.",
                );
            }
        }
        node
    }

    /// `use namespace <expr>;` (the keywords were consumed).
    pub(crate) fn use_namespace(&mut self) -> NodeRef {
        let expr = self.expression();
        let node = self.new_node(NodeKind::Use);
        node.append_child(&expr);
        node
    }

    /// `namespace [<name>] { ... }`; anonymous namespaces become
    /// private.
    pub(crate) fn namespace_block(&mut self, attr_list: &mut Option<NodeRef>) -> NodeRef {
        let node = self.new_node(NodeKind::Namespace);

        if self.kind() == NodeKind::Identifier {
            node.set_string(self.node.string());
            self.get_token();
        } else {
            // no name: the namespace is private
            let attrs = attr_list
                .get_or_insert_with(|| self.new_node(NodeKind::Attributes))
                .clone();
            let mut has_private = false;
            for idx in 0..attrs.children_count() {
                if attrs.child(idx).kind() == NodeKind::Private {
                    has_private = true;
                    break;
                }
            }
            if !has_private {
                let private_node = self.new_node(NodeKind::Private);
                attrs.append_child(&private_node);
            }
        }

        if self.kind() != NodeKind::OpenCurvlyBracket {
            self.error(
                ErrCode::InvalidNamespace,
                "'{' missing after the name of this namespace.",
            );
        } else {
            self.get_token();
            let directives = self.directive_list();
            node.append_child(&directives);
            if self.kind() == NodeKind::CloseCurvlyBracket {
                self.get_token();
            } else {
                self.error(
                    ErrCode::CurvlyBracketsExpected,
                    "'}' expected to close the 'namespace' block.",
                );
            }
        }
        node
    }
}
