//! End-to-end tests of the semantic resolver.
//!
//! The native types (Object, Integer, String, ...) are provided through
//! the input retriever, exactly the way an embedder supplies its own
//! runtime declarations. Compiles are serialized behind a mutex because
//! the diagnostics counters are process wide.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Mutex;

use ajs_common::message::{self, MessageLevel};
use ajs_common::options::{CompilerOption, Options};
use ajs_compiler::{Compiler, InputRetriever};
use ajs_parser::node::{NodeFlag, NodeKind, NodeRef};
use ajs_parser::Parser;
use ajs_pkg::Database;

static COMPILE_LOCK: Mutex<()> = Mutex::new(());

/// The intrinsic declarations every test compiles against.
const NATIVE_MODULE: &str = r#"
native class Object
{
    function Object(Void);
};
native class Boolean extends Object { };
native class Integer extends Object
{
    function "+" (value: Integer) : Integer;
    function "-" (value: Integer) : Integer;
    function "*" (value: Integer) : Integer;
    function "/" (value: Integer) : Integer;
    function "<" (value: Integer) : Boolean;
    function "<=" (value: Integer) : Boolean;
    function ">" (value: Integer) : Boolean;
    function ">=" (value: Integer) : Boolean;
    function "==" (value: Integer) : Boolean;
    function "!=" (value: Integer) : Boolean;
};
native class Double extends Object { };
native class String extends Object
{
    function "+" (value: String) : String;
    function "==" (value: String) : Boolean;
    function "!=" (value: String) : Boolean;
};
native class Array extends Object { };
native class RegularExpression extends Object { };
native class Function extends Object { };
"#;

struct MapRetriever {
    sources: HashMap<String, String>,
    log: Rc<RefCell<Vec<String>>>,
}

impl InputRetriever for MapRetriever {
    fn retrieve(&mut self, filename: &str) -> Option<String> {
        let source = self.sources.get(filename)?;
        self.log.borrow_mut().push(filename.to_string());
        Some(source.clone())
    }
}

struct Compiled {
    root: NodeRef,
    errors: usize,
}

fn compile_with(
    source: &str,
    modules: &[(&str, &str)],
    db: Database,
) -> (Compiled, Rc<RefCell<Vec<String>>>) {
    let _guard = COMPILE_LOCK.lock().unwrap();
    message::set_message_level(MessageLevel::Off);

    let options = Rc::new(RefCell::new(Options::new()));
    {
        let mut options = options.borrow_mut();
        options.set_option(CompilerOption::ExtendedOperators, 1);
        options.set_option(CompilerOption::ExtendedStatements, 1);
        options.set_option(CompilerOption::AllowWith, 1);
    }

    let mut parser = Parser::new(source, "test.ajs", options.clone());
    let root = parser.parse();

    let mut sources = HashMap::new();
    sources.insert("native/ajs_init.ajs".to_string(), NATIVE_MODULE.to_string());
    for (name, text) in modules {
        sources.insert((*name).to_string(), (*text).to_string());
    }
    let log = Rc::new(RefCell::new(Vec::new()));
    let retriever = MapRetriever {
        sources,
        log: log.clone(),
    };

    let mut compiler = Compiler::new(options);
    compiler.set_input_retriever(Box::new(retriever));
    compiler.set_database(db);

    message::reset_counters();
    let errors = compiler.compile(&root).expect("compile must not be fatal");

    (Compiled { root, errors }, log)
}

fn compile(source: &str) -> Compiled {
    compile_with(source, &[], Database::new()).0
}

/// The children of the program's first directive list.
fn directives(root: &NodeRef) -> NodeRef {
    assert_eq!(root.kind(), NodeKind::Program);
    root.child(0)
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn s1_member_call_resolves_instance_and_type() {
    let compiled = compile(
        "class A { function A(Void) { return; } function f() { return 1; } };\n\
         var a = new A();\n\
         a.f();",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let call = list.child(2);
    assert_eq!(call.kind(), NodeKind::Call);

    let instance = call.instance().expect("the call must be resolved");
    assert_eq!(instance.kind(), NodeKind::Function);
    assert_eq!(instance.string(), "f");

    let type_node = call.type_node().expect("the call must be typed");
    assert_eq!(type_node.string(), "Integer");
}

#[test]
fn s2_const_variables_propagate_their_literal() {
    let compiled = compile("const N = 3 + 4;\nvar x = N * 2;");
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let var_x = list.child(1);
    let variable = var_x.child(0);
    let set = variable.find_first_child(NodeKind::Set).unwrap();
    let multiply = set.child(0);
    assert_eq!(multiply.kind(), NodeKind::Multiply);

    // the use-site was replaced by the literal, not left an identifier
    let left = multiply.child(0);
    assert_eq!(left.kind(), NodeKind::Integer);
    assert_eq!(left.integer(), 7);
}

#[test]
fn s3_overload_selection_by_argument_type() {
    let compiled = compile(
        "function f(a: Integer) : Void { return; }\n\
         function f(a: String) : Void { return; }\n\
         f(\"hi\");\n\
         f(1);",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);

    let param_type_of = |call: &NodeRef| -> String {
        let function = call.instance().expect("call must resolve");
        let parameters = function.find_first_child(NodeKind::Parameters).unwrap();
        let param = parameters.child(0);
        let type_node = param.find_first_child(NodeKind::Type).unwrap();
        type_node.child(0).string()
    };

    let call_str = list.child(2);
    assert_eq!(param_type_of(&call_str), "String");
    let call_int = list.child(3);
    assert_eq!(param_type_of(&call_int), "Integer");
}

#[test]
fn s3_unmatchable_call_is_an_error() {
    let compiled = compile(
        "function f(a: Integer) : Void { return; }\n\
         function f(a: String) : Void { return; }\n\
         f(true);",
    );
    assert!(compiled.errors > 0, "f(true) cannot match any overload");
}

#[test]
fn s4_enum_values() {
    let compiled = compile("enum E { A, B = 5, C };");
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let enum_node = list.child(0);
    assert_eq!(enum_node.kind(), NodeKind::Enum);

    let value = |idx: usize| -> i64 {
        let entry = enum_node.child(idx);
        let set = entry.find_first_child(NodeKind::Set).unwrap();
        set.child(0).integer()
    };
    assert_eq!(value(0), 0);
    assert_eq!(value(1), 5);
    assert_eq!(value(2), 6);
}

#[test]
fn s5_external_package_loads_exactly_once() {
    let mut db = Database::new();
    let element = db.add_element("foo", "bar");
    element.kind = "function".to_string();
    element.filename = "X.ajs".to_string();
    element.line = 1;

    let (compiled, log) = compile_with(
        "import foo;\nbar();\nbar();",
        &[(
            "X.ajs",
            "package foo { function bar(Void) : Void { return; } }",
        )],
        db,
    );
    assert_eq!(compiled.errors, 0);

    let loads: Vec<String> = log
        .borrow()
        .iter()
        .filter(|name| name.as_str() == "X.ajs")
        .cloned()
        .collect();
    assert_eq!(loads.len(), 1, "X.ajs must be parsed exactly once");

    // both calls resolved to the same function
    let list = directives(&compiled.root);
    let first = list.child(1).instance().unwrap();
    let second = list.child(2).instance().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.string(), "bar");
}

#[test]
fn s5_modules_also_load_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let module_path = dir.path().join("disk.ajs");
    std::fs::write(
        &module_path,
        "package disk { function stored(Void) : Void { return; } }",
    )
    .unwrap();

    let mut db = Database::new();
    let element = db.add_element("disk", "stored");
    element.kind = "function".to_string();
    element.filename = module_path.to_string_lossy().into_owned();
    element.line = 1;

    let (compiled, _log) = compile_with("import disk;\nstored();", &[], db);
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let call = list.child(1);
    assert_eq!(call.instance().unwrap().string(), "stored");
}

#[test]
fn s6_switch_with_operator_and_range() {
    let compiled = compile(
        "var x: Integer = 5;\n\
         switch (x) with (in) { case 1 .. 10: x = 1; default: x = 2; }",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let switch_node = list.child(1);
    assert_eq!(switch_node.kind(), NodeKind::Switch);
    assert_eq!(switch_node.switch_operator(), NodeKind::In);

    let case = switch_node.child(1).child(0);
    assert_eq!(case.kind(), NodeKind::Case);
    assert_eq!(case.children_count(), 2);
}

// ── Universal properties ───────────────────────────────────────────────

#[test]
fn attribute_inheritance_from_var_to_variable() {
    let compiled = compile(
        "class A { private var x; function A(Void) { return; } };\n\
         var a = new A();",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let class_node = list.child(0);
    let body = class_node.find_first_child(NodeKind::DirectiveList).unwrap();
    let var_node = body.child(0);
    assert_eq!(var_node.kind(), NodeKind::Var);
    let variable = var_node.child(0);
    assert!(variable.get_attr(ajs_parser::node::NodeAttr::Private));
    assert!(!variable.get_attr(ajs_parser::node::NodeAttr::Public));
}

#[test]
fn native_function_with_body_is_rejected() {
    let compiled = compile("native function h(Void) : Void { return; }");
    assert!(compiled.errors > 0);
}

#[test]
fn private_member_is_not_accessible_from_outside() {
    let compiled = compile(
        "class P { private var secret: Integer; function P(Void) { return; } };\n\
         var p = new P();\n\
         p.secret;",
    );
    assert!(compiled.errors > 0);
}

#[test]
fn with_binding_marks_identifiers_dynamic() {
    let compiled = compile(
        "class W { var m: Integer; function W(Void) { return; } };\n\
         var w = new W();\n\
         with (w) { m = 1; }",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let with_node = list.child(2);
    assert_eq!(with_node.kind(), NodeKind::With);
    let body = with_node.child(1);
    let assignment = body.child(0);
    let m = assignment.child(0);
    assert_eq!(m.string(), "m");
    assert!(m.get_flag(NodeFlag::IdentifierWith));
}

#[test]
fn circular_attribute_variables_are_rejected() {
    let compiled = compile(
        "const attrs = attrs2;\n\
         const attrs2 = attrs;\n\
         attrs var q;",
    );
    assert!(compiled.errors > 0);
}

#[test]
fn constructor_cannot_return_a_value() {
    let compiled = compile("class C { function C(Void) { return 5; } };");
    assert!(compiled.errors > 0);

    let compiled = compile("class C { function C(Void) { return; } };");
    assert_eq!(compiled.errors, 0);
}

#[test]
fn statements_after_a_return_are_inaccessible() {
    let compiled = compile("function u(Void) : Void { return; var k = 1; }");
    assert!(compiled.errors > 0);
}

#[test]
fn overload_selection_is_independent_of_declaration_order() {
    let pick = |source: &str| -> String {
        let compiled = compile(source);
        assert_eq!(compiled.errors, 0);
        let list = directives(&compiled.root);
        let call = list.child(2);
        let function = call.instance().unwrap();
        let parameters = function.find_first_child(NodeKind::Parameters).unwrap();
        let type_node = parameters.child(0).find_first_child(NodeKind::Type).unwrap();
        type_node.child(0).string()
    };

    let a = pick(
        "function g(a: Integer) : Void { return; }\n\
         function g(a: String) : Void { return; }\n\
         g(\"x\");",
    );
    let b = pick(
        "function g(a: String) : Void { return; }\n\
         function g(a: Integer) : Void { return; }\n\
         g(\"x\");",
    );
    assert_eq!(a, "String");
    assert_eq!(b, "String");
}

#[test]
fn assignment_to_undeclared_identifier_synthesizes_a_variable() {
    let compiled = compile("function k(Void) : Void { q = 5; return; }");
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let function = list.child(0);
    let body = function.find_first_child(NodeKind::DirectiveList).unwrap();
    // the synthesized VAR is inserted at the top of the list, the
    // assignment itself follows
    let assignment = (0..body.children_count())
        .map(|idx| body.child(idx))
        .find(|child| child.kind() == NodeKind::Assignment)
        .expect("the assignment must still be in the body");
    let q = assignment.child(0);
    let variable = q.instance().expect("q must resolve to the synthesized variable");
    assert_eq!(variable.kind(), NodeKind::Variable);
    assert!(variable.get_flag(NodeFlag::VariableLocal));
}

#[test]
fn new_expression_is_flattened() {
    let compiled = compile(
        "class A { function A(Void) { return; } };\n\
         var a = new A();",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let variable = list.child(1).child(0);
    let set = variable.find_first_child(NodeKind::Set).unwrap();
    let new_node = set.child(0);
    assert_eq!(new_node.kind(), NodeKind::New);
    // the CALL was flattened into TYPE + argument LIST
    assert_eq!(new_node.children_count(), 2);
    assert_eq!(new_node.child(0).kind(), NodeKind::Identifier);
    assert_eq!(new_node.child(0).string(), "A");
    assert_eq!(new_node.child(1).kind(), NodeKind::List);
    assert_eq!(
        new_node.type_node().expect("new must be typed").string(),
        "A"
    );
}

#[test]
fn abstract_class_cannot_be_instantiated() {
    let compiled = compile(
        "class B { function B(Void) { return; } abstract function m(Void) : Void; };\n\
         var b = new B();",
    );
    assert!(compiled.errors > 0);
}

#[test]
fn getter_access_is_rewritten_to_a_call() {
    let compiled = compile(
        "class G {\n\
           function G(Void) { return; }\n\
           function get size() : Integer { return 3; }\n\
         };\n\
         var g = new G();\n\
         g.size;",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let access = list.child(2);
    // `g.size` became `g.->size()`
    assert_eq!(access.kind(), NodeKind::Call);
    let member = access.child(0);
    assert_eq!(member.kind(), NodeKind::Member);
    assert_eq!(member.child(1).string(), "->size");
}

#[test]
fn setter_assignment_is_rewritten_to_a_call() {
    let compiled = compile(
        "class G {\n\
           function G(Void) { return; }\n\
           function set size(v: Integer) : Void { return; }\n\
         };\n\
         var g = new G();\n\
         g.size = 9;",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let statement = list.child(2);
    // `g.size = 9` became `g.<-size(9)`
    assert_eq!(statement.kind(), NodeKind::Call);
    let member = statement.child(0);
    assert_eq!(member.child(1).string(), "<-size");
    let args = statement.child(1);
    assert_eq!(args.kind(), NodeKind::List);
    assert_eq!(args.child(0).integer(), 9);
}

#[test]
fn class_call_becomes_a_cast() {
    let compiled = compile(
        "class A { function A(Void) { return; } };\n\
         var a = new A();\n\
         var b = A(a);",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let variable = list.child(2).child(0);
    let set = variable.find_first_child(NodeKind::Set).unwrap();
    let cast = set.child(0);
    assert_eq!(cast.kind(), NodeKind::As);
    assert_eq!(cast.child(0).string(), "a");
    assert_eq!(cast.child(1).string(), "A");
}

#[test]
fn assigning_a_constant_is_rejected() {
    let compiled = compile("const N = 3;\nN = 4;");
    assert!(compiled.errors > 0);
}

#[test]
fn goto_targets_are_recorded() {
    let compiled = compile(
        "function l(Void) : Void { again: var i = 1; goto again; }",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let function = list.child(0);
    let body = function.find_first_child(NodeKind::DirectiveList).unwrap();
    let goto = body.child(2);
    assert_eq!(goto.kind(), NodeKind::Goto);
    let target = goto.goto_enter().expect("goto must be resolved");
    assert_eq!(target.kind(), NodeKind::Label);
    assert_eq!(target.string(), "again");
}

#[test]
fn break_records_the_exited_loop() {
    let compiled = compile(
        "function b(Void) : Void { var i = 0; while (i < 3) { break; } return; }",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let function = list.child(0);
    let body = function.find_first_child(NodeKind::DirectiveList).unwrap();
    let while_node = body.child(1);
    assert_eq!(while_node.kind(), NodeKind::While);
    let break_node = while_node.child(1).child(0).child(0);
    assert_eq!(break_node.kind(), NodeKind::Break);
    assert_eq!(break_node.goto_exit().unwrap(), while_node);
}

#[test]
fn operator_overload_on_user_class() {
    let compiled = compile(
        "class V {\n\
           function V(Void) { return; }\n\
           function \"+\" (rhs: V) : V { return rhs; }\n\
         };\n\
         var a = new V();\n\
         var b = new V();\n\
         var c = new V();\n\
         c = a + b;",
    );
    assert_eq!(compiled.errors, 0);

    let list = directives(&compiled.root);
    let assignment = list.child(4);
    assert_eq!(assignment.kind(), NodeKind::Assignment);
    let call = assignment.child(1);
    // the `+` was rewritten as a call of the user operator
    assert_eq!(call.kind(), NodeKind::Call);
    let resolution = call.instance().unwrap();
    assert_eq!(resolution.kind(), NodeKind::Function);
    assert_eq!(resolution.string(), "+");
    assert!(resolution.get_flag(NodeFlag::FunctionOperator));
}

#[test]
fn duplicate_prototypes_in_one_scope_are_rejected() {
    let compiled = compile(
        "function d(a: Integer) : Void { return; }\n\
         function d(a: Integer) : Void { return; }\n\
         d(1);",
    );
    assert!(compiled.errors > 0);
}
