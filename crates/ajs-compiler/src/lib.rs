// AJS compiler -- the semantic resolver.
//
// Once a program was parsed it needs to be compiled: references
// (identifiers, members, operators) are resolved to their
// declarations, which may trigger the loading of modules named in
// import directives or found through the package database. The tree is
// enriched (instance/type cross references, attribute flags) and a few
// constructs are rewritten in place (getter/setter access, `new`
// expressions, class casts, constant propagation).
//
// The compiler owns all the state the resolution needs: the module
// cache, the three implicit module roots (global/system/native), the
// resource configuration and the package database. `clean()` drops the
// lot so a fresh compilation starts from scratch. Two compile runs must
// not share one instance concurrently.

mod attributes;
mod class;
mod directive;
mod expr;
pub mod fold;
mod function;
mod module;
mod resolver;
mod statement;
mod variable;

use std::cell::RefCell;
use std::rc::Rc;

use ajs_common::message::{self, ErrCode, FatalError};
use ajs_common::options::Options;
use ajs_parser::node::{NodeKind, NodeRef};
use ajs_pkg::{Database, Resources};
use rustc_hash::FxHashMap;

// search error accumulation, reported when nothing else matched
pub(crate) const SEARCH_ERROR_PRIVATE: u32 = 0x0001;
pub(crate) const SEARCH_ERROR_PROTECTED: u32 = 0x0002;
pub(crate) const SEARCH_ERROR_PROTOTYPE: u32 = 0x0004;
pub(crate) const SEARCH_ERROR_WRONG_PRIVATE: u32 = 0x0008;
pub(crate) const SEARCH_ERROR_WRONG_PROTECTED: u32 = 0x0010;
pub(crate) const SEARCH_ERROR_PRIVATE_PACKAGE: u32 = 0x0020;

// search behavior flags
pub(crate) const SEARCH_FLAG_NO_PARSING: u32 = 0x0001;
pub(crate) const SEARCH_FLAG_GETTER: u32 = 0x0002;
pub(crate) const SEARCH_FLAG_SETTER: u32 = 0x0004;
pub(crate) const SEARCH_FLAG_PACKAGE_MUST_EXIST: u32 = 0x0008;
pub(crate) const SEARCH_FLAG_RESOLVING_CALL: u32 = 0x0010;

/// Provides module sources to the compiler, bypassing the file system.
/// Embedders and tests install one through
/// [`Compiler::set_input_retriever`].
pub trait InputRetriever {
    /// Return the source text of `filename`, or `None` when the
    /// retriever does not know that module.
    fn retrieve(&mut self, filename: &str) -> Option<String>;
}

/// The AJS compiler. See the module documentation for the life cycle.
pub struct Compiler {
    pub(crate) options: Rc<RefCell<Options>>,
    /// The program being compiled; name resolution never escapes it.
    pub(crate) program: Option<NodeRef>,
    /// Accumulated search errors of the resolution in progress.
    pub(crate) err_flags: u32,
    /// Live `use namespace` / `with` bindings.
    pub(crate) scope: NodeRef,
    /// Already loaded files, keyed by the name they were loaded under.
    pub(crate) modules: FxHashMap<String, NodeRef>,
    pub(crate) input_retriever: Option<Box<dyn InputRetriever>>,
    pub(crate) rc: Resources,
    pub(crate) db: Database,
    pub(crate) db_injected: bool,
    pub(crate) db_scanned: bool,
    pub(crate) imports_loaded: bool,
    pub(crate) global_import: Option<NodeRef>,
    pub(crate) system_import: Option<NodeRef>,
    pub(crate) native_import: Option<NodeRef>,
    /// First fatal problem encountered while resolving; unwound at the
    /// top of `compile()`.
    pub(crate) fatal: Option<FatalError>,
}

impl Compiler {
    pub fn new(options: Rc<RefCell<Options>>) -> Self {
        Self {
            options,
            program: None,
            err_flags: 0,
            scope: NodeRef::new(NodeKind::ScopeList, Default::default()),
            modules: FxHashMap::default(),
            input_retriever: None,
            rc: Resources::new(),
            db: Database::new(),
            db_injected: false,
            db_scanned: false,
            imports_loaded: false,
            global_import: None,
            system_import: None,
            native_import: None,
            fatal: None,
        }
    }

    /// Install a module source retriever. Returns the previous one.
    pub fn set_input_retriever(
        &mut self,
        retriever: Box<dyn InputRetriever>,
    ) -> Option<Box<dyn InputRetriever>> {
        self.input_retriever.replace(retriever)
    }

    /// Replace the package database (embedders which maintain their
    /// own index). The database from the resource file is then left
    /// untouched.
    pub fn set_database(&mut self, db: Database) {
        self.db = db;
        self.db_injected = true;
    }

    /// Release the cached modules, the implicit module roots and the
    /// package database. The next compile reloads everything.
    pub fn clean(&mut self) {
        self.modules.clear();
        self.global_import = None;
        self.system_import = None;
        self.native_import = None;
        if !self.db_injected {
            self.db = Database::new();
        }
        self.db_scanned = false;
        self.imports_loaded = false;
    }

    /// Compile a parsed tree in place. Returns the number of errors
    /// emitted while compiling; zero means the tree is ready for the
    /// code generator. Installation and IO problems abort with a
    /// [`FatalError`].
    pub fn compile(&mut self, root: &NodeRef) -> Result<usize, FatalError> {
        let save_errcnt = message::error_count();

        self.internal_imports()?;

        self.scope = root.create_replacement(NodeKind::ScopeList);

        match root.kind() {
            NodeKind::Program => self.program(root),
            NodeKind::Root => {
                // a ROOT is a container of zero or more PROGRAMs
                for idx in 0..root.children_count() {
                    let child = root.child(idx);
                    if child.kind() == NodeKind::Program {
                        self.program(&child);
                    }
                }
            }
            _ => {
                message::error(
                    ErrCode::InternalError,
                    &root.position(),
                    "compile() expected a root or a program node to start with.",
                );
            }
        }

        if let Some(fatal) = self.fatal.take() {
            return Err(fatal);
        }
        Ok(message::error_count() - save_errcnt)
    }

    /// Record a fatal problem; the walk unwinds lazily and `compile()`
    /// reports it.
    pub(crate) fn set_fatal(&mut self, fatal: FatalError) {
        if self.fatal.is_none() {
            self.fatal = Some(fatal);
        }
    }

    // ── Program ────────────────────────────────────────────────────────

    pub(crate) fn program(&mut self, program_node: &NodeRef) {
        // this is the root of the resolution: searching a reference
        // never walks above this node
        self.program = Some(program_node.clone());

        // drop declarations marked false
        let count = program_node.children_count();
        for idx in 0..count {
            let child = program_node.child(idx);
            if self.get_attribute(&child, ajs_parser::node::NodeAttr::False) {
                child.to_unknown();
            }
        }
        program_node.clean_tree();

        // collect the labels of this program (used by goto)
        for idx in 0..program_node.children_count() {
            let child = program_node.child(idx);
            if child.kind() == NodeKind::DirectiveList {
                self.find_labels(program_node, &child);
            }
        }

        // a program is composed of directive lists which we compile
        for idx in 0..program_node.children_count() {
            let child = program_node.child(idx);
            if child.kind() == NodeKind::DirectiveList {
                self.directive_list(&child);
            }
            if self.fatal.is_some() {
                return;
            }
        }
    }

    /// Collect the labels of one unit. Labels never cross a function,
    /// class, package or program boundary, and declarations as well as
    /// expressions are opaque to the search.
    pub(crate) fn find_labels(&mut self, unit: &NodeRef, node: &NodeRef) {
        match node.kind() {
            NodeKind::Label => {
                if unit.find_label(&node.string()).is_some() {
                    message::error(
                        ErrCode::Duplicates,
                        &unit.position(),
                        format!(
                            "label \"{}\" defined twice in the same program, package or function.",
                            node.string()
                        ),
                    );
                } else {
                    unit.add_label(node);
                }
                return;
            }

            // declarations and expressions are not searched
            NodeKind::Function
            | NodeKind::Class
            | NodeKind::Interface
            | NodeKind::Var
            | NodeKind::Package
            | NodeKind::Program
            | NodeKind::Call
            | NodeKind::Member
            | NodeKind::New
            | NodeKind::Delete
            | NodeKind::Increment
            | NodeKind::Decrement
            | NodeKind::PostIncrement
            | NodeKind::PostDecrement
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
            | NodeKind::AssignmentSubtract => return,

            _ => {}
        }

        for idx in 0..node.children_count() {
            let child = node.child(idx);
            self.find_labels(unit, &child);
        }
    }

    /// Report the reasons a name could not be resolved, if any were
    /// gathered.
    pub(crate) fn print_search_errors(&mut self, name: &NodeRef) {
        if self.err_flags == 0 {
            return;
        }

        let mut text = format!(
            "the name \"{}\" could not be resolved because:\n",
            name.string()
        );
        if self.err_flags & SEARCH_ERROR_PRIVATE != 0 {
            text.push_str("   You cannot access a private class member from outside that very class.\n");
        }
        if self.err_flags & SEARCH_ERROR_PROTECTED != 0 {
            text.push_str("   You cannot access a protected class member from outside a class or its derived classes.\n");
        }
        if self.err_flags & SEARCH_ERROR_PROTOTYPE != 0 {
            text.push_str("   One or more functions were found, but none matched the input parameters.\n");
        }
        if self.err_flags & SEARCH_ERROR_WRONG_PRIVATE != 0 {
            text.push_str("   You cannot use the private attribute outside of a package or a class.\n");
        }
        if self.err_flags & SEARCH_ERROR_WRONG_PROTECTED != 0 {
            text.push_str("   You cannot use the protected attribute outside of a class.\n");
        }
        if self.err_flags & SEARCH_ERROR_PRIVATE_PACKAGE != 0 {
            text.push_str("   You cannot access a package private declaration from outside of that package.\n");
        }
        message::error(ErrCode::CannotMatch, &name.position(), text);
    }
}
