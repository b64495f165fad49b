//! Module loading and the package database.
//!
//! Modules are parsed once and cached by the name they were loaded
//! under. The implicit module roots (`global/`, `system/`, `native/`
//! under each script path) provide the intrinsic declarations; the
//! package database maps `package.element` names to the file declaring
//! them so imports and unresolved names can be satisfied lazily.

use std::cell::RefCell;
use std::rc::Rc;

use ajs_common::message::{self, ErrCode, FatalError};
use ajs_parser::node::{NodeAttr, NodeFlag, NodeKind, NodeRef};
use ajs_parser::Parser;

use crate::{Compiler, SEARCH_FLAG_PACKAGE_MUST_EXIST};

/// The bootstrap file of a module root; loaded explicitly, never
/// indexed.
const INIT_MODULE: &str = "ajs_init.ajs";

impl Compiler {
    /// Load the resource file, the native module root and the package
    /// database. Runs once per compiler instance (until `clean()`).
    pub(crate) fn internal_imports(&mut self) -> Result<(), FatalError> {
        if self.imports_loaded {
            return Ok(());
        }
        self.imports_loaded = true;

        // with an input retriever the resource file is optional
        let mut rc = std::mem::take(&mut self.rc);
        let result = rc.init(self.input_retriever.is_some());
        self.rc = rc;
        result?;

        self.native_import = Some(self.load_module("native", INIT_MODULE)?);

        if !self.db_injected {
            let db_path = self.rc.db().to_string();
            self.db.load(db_path)?;
        }

        if !self.db_scanned {
            self.db_scanned = true;
            // index the native packages for fast lookups on the next
            // invocations
            if self.load_internal_packages("native")? {
                self.db.save()?;
            }
        }
        Ok(())
    }

    /// Find a module by name, loading and caching it if needed.
    pub(crate) fn find_module(&mut self, filename: &str) -> Option<NodeRef> {
        if let Some(existing) = self.modules.get(filename) {
            return Some(existing.clone());
        }

        let source = match self.input_retriever.as_mut().and_then(|r| r.retrieve(filename)) {
            Some(source) => source,
            None => std::fs::read_to_string(filename).ok()?,
        };

        let root = self.parse_module(&source, filename);
        self.modules.insert(filename.to_string(), root.clone());
        Some(root)
    }

    fn parse_module(&mut self, source: &str, filename: &str) -> NodeRef {
        let options: Rc<RefCell<_>> = self.options.clone();
        let mut parser = Parser::new(source, filename, options);
        parser.parse()
    }

    /// Load `<script-path>/<module>/<file>`, trying every script path
    /// in order (then the bare `<module>/<file>` name, which is how a
    /// retriever addresses modules). Failing to find a module root is
    /// fatal.
    pub(crate) fn load_module(
        &mut self,
        module: &str,
        file: &str,
    ) -> Result<NodeRef, FatalError> {
        let mut candidates: Vec<String> = self
            .rc
            .scripts()
            .iter()
            .map(|path| path.join(module).join(file).to_string_lossy().into_owned())
            .collect();
        if self.input_retriever.is_some() {
            candidates.push(format!("{module}/{file}"));
        }

        for candidate in candidates {
            if let Some(root) = self.find_module(&candidate) {
                return Ok(root);
            }
        }

        let fatal = FatalError::new(
            ErrCode::NotFound,
            format!("module file \"{file}\" not found in any of the script paths."),
        );
        message::message(
            ajs_common::message::MessageLevel::Fatal,
            fatal.code,
            &Default::default(),
            &fatal.text,
        );
        Err(fatal)
    }

    /// Scan `<script-path>/<module>/*.ajs`, load every file and index
    /// the packages it declares in the database. Returns whether a
    /// directory was scanned; with a retriever installed and no
    /// directory on disk the scan is quietly skipped (the retriever
    /// already provided the natives).
    pub(crate) fn load_internal_packages(&mut self, module: &str) -> Result<bool, FatalError> {
        let directories: Vec<std::path::PathBuf> = self
            .rc
            .scripts()
            .iter()
            .map(|path| path.join(module))
            .collect();
        for directory in directories {
            let entries = match std::fs::read_dir(&directory) {
                Err(_) => continue,
                Ok(entries) => entries,
            };
            let mut filenames: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().map_or(false, |ext| ext == "ajs"))
                .filter(|path| {
                    path.file_name()
                        .map_or(false, |name| name != INIT_MODULE)
                })
                .map(|path| path.to_string_lossy().into_owned())
                .collect();
            filenames.sort();

            for filename in filenames {
                if let Some(program) = self.find_module(&filename) {
                    self.find_packages(&program);
                }
            }
            return Ok(true);
        }

        if self.input_retriever.is_some() {
            return Ok(false);
        }

        let fatal = FatalError::new(
            ErrCode::Installation,
            format!("cannot find module \"{module}\" in any of the script folders."),
        );
        message::message(
            ajs_common::message::MessageLevel::Fatal,
            fatal.code,
            &Default::default(),
            &fatal.text,
        );
        Err(fatal)
    }

    // ── Package indexing ───────────────────────────────────────────────

    /// Index the packages a program declares.
    pub(crate) fn find_packages(&mut self, program_node: &NodeRef) {
        if program_node.kind() != NodeKind::Program {
            return;
        }
        self.find_packages_directive_list(program_node);
    }

    fn find_packages_directive_list(&mut self, list: &NodeRef) {
        for idx in 0..list.children_count() {
            let child = list.child(idx);
            if child.kind() == NodeKind::DirectiveList {
                self.find_packages_directive_list(&child);
            } else if child.kind() == NodeKind::Package {
                if child.children_count() > 0 {
                    let directives = child.child(0);
                    let name = child.string();
                    self.find_packages_save_package_elements(&directives, &name);
                }
            }
        }
    }

    fn find_packages_save_package_elements(&mut self, package: &NodeRef, package_name: &str) {
        for idx in 0..package.children_count() {
            let child = package.child(idx);
            match child.kind() {
                NodeKind::DirectiveList => {
                    self.find_packages_save_package_elements(&child, package_name);
                }

                NodeKind::Class => {
                    self.add_database_entry(package_name, &child, "class");
                }

                NodeKind::Function => {
                    let kind = if child.get_flag(NodeFlag::FunctionGetter) {
                        "getter"
                    } else if child.get_flag(NodeFlag::FunctionSetter) {
                        "setter"
                    } else {
                        "function"
                    };
                    self.add_database_entry(package_name, &child, kind);
                }

                NodeKind::Var => {
                    for v in 0..child.children_count() {
                        let variable_node = child.child(v);
                        self.add_database_entry(package_name, &variable_node, "variable");
                    }
                }

                NodeKind::Enum => {
                    self.add_database_entry(package_name, &child, "enumeration");
                }

                NodeKind::Package => {
                    // sub-package
                    if child.children_count() > 0 {
                        let list = child.child(0);
                        let name = format!("{package_name}.{}", child.string());
                        self.find_packages_save_package_elements(&list, &name);
                    }
                }

                NodeKind::Import | NodeKind::Use | NodeKind::Empty => {}

                _ => {
                    message::error(
                        ErrCode::NotSupported,
                        &child.position(),
                        format!(
                            "packages do not yet support \"{}\" declarations.",
                            child.kind().name()
                        ),
                    );
                }
            }
        }
    }

    /// Record one element in the database. Private, internal and false
    /// entries are not published.
    fn add_database_entry(&mut self, package_name: &str, element: &NodeRef, kind: &str) {
        if self.get_attribute(element, NodeAttr::Private)
            || self.get_attribute(element, NodeAttr::False)
            || self.get_attribute(element, NodeAttr::Internal)
        {
            return;
        }

        let position = element.position();
        let entry = self.db.add_element(package_name, &element.string());
        entry.kind = kind.to_string();
        entry.filename = position.filename().to_string();
        entry.line = position.line();
    }

    // ── Package search ─────────────────────────────────────────────────

    /// Search a tree for a package of the given name.
    pub(crate) fn find_package(&mut self, list: &NodeRef, name: &str) -> Option<NodeRef> {
        for idx in 0..list.children_count() {
            let child = list.child(idx);
            if child.kind() == NodeKind::DirectiveList {
                if let Some(package) = self.find_package(&child, name) {
                    return Some(package);
                }
            } else if child.kind() == NodeKind::Package && child.string() == name {
                return Some(child);
            }
        }
        None
    }

    /// Query the database for a package declaring `name` and load the
    /// owning file.
    pub(crate) fn find_external_package(
        &mut self,
        import_node: &NodeRef,
        name: &str,
    ) -> Option<NodeRef> {
        let element = self.db.find_element(&import_node.string(), name, None)?;
        self.find_module(&element.filename)
    }

    /// Resolve `name` through an import directive: first as a package
    /// of this program, then through the database.
    pub(crate) fn check_import(
        &mut self,
        import_node: &NodeRef,
        name: &str,
        params: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        // a package may live within the program being compiled
        let program = self.program.clone()?;
        if let Some(resolution) =
            self.find_package_item(&program, import_node, name, params, search_flags)
        {
            return Some(resolution);
        }

        let program_node = self.find_external_package(import_node, name)?;
        self.find_package_item(
            &program_node,
            import_node,
            name,
            params,
            search_flags | SEARCH_FLAG_PACKAGE_MUST_EXIST,
        )
    }

    /// Search one program for the imported package, then the searched
    /// name inside it. Referencing a package compiles it, once.
    pub(crate) fn find_package_item(
        &mut self,
        program_node: &NodeRef,
        import_node: &NodeRef,
        name: &str,
        params: Option<&NodeRef>,
        search_flags: u32,
    ) -> Option<NodeRef> {
        let package_node = self.find_package(program_node, &import_node.string());
        let package_node = match package_node {
            None => {
                if search_flags & SEARCH_FLAG_PACKAGE_MUST_EXIST != 0 {
                    // the database said the package exists in this file
                    message::error(
                        ErrCode::InternalError,
                        &import_node.position(),
                        format!(
                            "cannot find package \"{}\" in any of the previously registered packages.",
                            import_node.string()
                        ),
                    );
                }
                return None;
            }
            Some(package_node) => package_node,
        };

        if package_node.children_count() == 0 {
            return None;
        }

        // labels are gathered the first time around
        if !package_node.get_flag(NodeFlag::PackageFoundLabels) {
            package_node.set_flag(NodeFlag::PackageFoundLabels, true);
            let child = package_node.child(0);
            self.find_labels(&package_node, &child);
        }

        let id = package_node.create_replacement(NodeKind::Identifier);
        id.set_string(name);

        let all_matches = package_node.create_replacement(NodeKind::List);
        let found =
            self.find_field(&package_node, &id, params, Some(&all_matches), search_flags);
        let resolution = if all_matches.children_count() != 0 {
            self.select_best_func(&all_matches)?
        } else {
            found?
        };

        // private elements are never importable; internal ones only
        // from within a package
        if self.get_attribute(&resolution, NodeAttr::Private) {
            return None;
        }
        if self.get_attribute(&resolution, NodeAttr::Internal)
            && self.package_of(import_node).is_none()
        {
            return None;
        }

        // make sure the package is compiled, once
        let was_referenced = package_node.get_flag(NodeFlag::PackageReferenced);
        package_node.set_flag(NodeFlag::PackageReferenced, true);
        if !was_referenced {
            self.directive_list(&package_node.child(0));
        }

        Some(resolution)
    }

    /// Compile an `import` directive. Only `import implements` forces
    /// the package to be compiled right away; everything else loads
    /// lazily when a name is referenced.
    pub(crate) fn import(&mut self, import_node: &NodeRef) {
        if !import_node.get_flag(NodeFlag::ImportImplements) {
            return;
        }

        let program = match self.program.clone() {
            None => return,
            Some(program) => program,
        };

        let mut package = self.find_package(&program, &import_node.string());
        if package.is_none() {
            if let Some(program_node) = self.find_external_package(import_node, "*") {
                package = self.find_package(&program_node, &import_node.string());
            }
        }

        let package = match package {
            None => {
                message::error(
                    ErrCode::NotFound,
                    &import_node.position(),
                    format!("cannot find package \"{}\".", import_node.string()),
                );
                return;
            }
            Some(package) => package,
        };

        // make sure it is compiled, once
        let was_referenced = package.get_flag(NodeFlag::PackageReferenced);
        package.set_flag(NodeFlag::PackageReferenced, true);
        if !was_referenced && package.children_count() > 0 {
            self.directive_list(&package.child(0));
        }
    }
}
