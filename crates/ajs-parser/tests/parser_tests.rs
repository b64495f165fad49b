//! Tree-shape tests for the AJS parser.
//!
//! Each test parses a snippet and checks the relevant part of the tree
//! (kinds, names, flags). Error tests count emitted diagnostics through
//! the message counters, serialized behind a mutex since the counters
//! are process wide.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Mutex;

use ajs_common::message::{self, MessageLevel};
use ajs_common::options::{CompilerOption, Options};
use ajs_parser::node::{NodeFlag, NodeKind, NodeRef};
use ajs_parser::Parser;

static COUNTER_LOCK: Mutex<()> = Mutex::new(());

fn parse_with(source: &str, configure: impl FnOnce(&mut Options)) -> NodeRef {
    message::set_message_level(MessageLevel::Off);
    let options = Rc::new(RefCell::new(Options::new()));
    configure(&mut options.borrow_mut());
    let mut parser = Parser::new(source, "test.ajs", options);
    parser.parse()
}

fn parse(source: &str) -> NodeRef {
    parse_with(source, |_| {})
}

/// Parse a source made of extended syntax.
fn parse_extended(source: &str) -> NodeRef {
    parse_with(source, |options| {
        options.set_option(CompilerOption::ExtendedOperators, 1);
        options.set_option(CompilerOption::ExtendedStatements, 1);
    })
}

/// The first directive of the first directive list of the program.
fn first_directive(program: &NodeRef) -> NodeRef {
    assert_eq!(program.kind(), NodeKind::Program);
    let list = program.child(0);
    assert_eq!(list.kind(), NodeKind::DirectiveList);
    list.child(0)
}

fn count_errors(parse: impl FnOnce()) -> usize {
    let _guard = COUNTER_LOCK.lock().unwrap();
    message::reset_counters();
    parse();
    message::error_count()
}

// ── Variables ──────────────────────────────────────────────────────────

#[test]
fn var_with_type_and_initializer() {
    let program = parse("var x: Integer = 3;");
    let var = first_directive(&program);
    assert_eq!(var.kind(), NodeKind::Var);
    let variable = var.child(0);
    assert_eq!(variable.kind(), NodeKind::Variable);
    assert_eq!(variable.string(), "x");
    assert!(!variable.get_flag(NodeFlag::VariableConst));

    let type_node = variable.child(0);
    assert_eq!(type_node.kind(), NodeKind::Type);
    assert_eq!(type_node.child(0).kind(), NodeKind::Identifier);
    assert_eq!(type_node.child(0).string(), "Integer");

    let set = variable.child(1);
    assert_eq!(set.kind(), NodeKind::Set);
    assert_eq!(set.child(0).integer(), 3);
}

#[test]
fn const_marks_variables() {
    let program = parse("const N = 7;");
    let var = first_directive(&program);
    let variable = var.child(0);
    assert!(variable.get_flag(NodeFlag::VariableConst));
}

#[test]
fn multiple_variables_in_one_var() {
    let program = parse("var a, b = 2, c;");
    let var = first_directive(&program);
    assert_eq!(var.children_count(), 3);
    assert_eq!(var.child(0).string(), "a");
    assert_eq!(var.child(1).string(), "b");
    assert_eq!(var.child(2).string(), "c");
}

// ── Expressions ────────────────────────────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    let program = parse("a = 1 + 2 * 3;");
    let assignment = first_directive(&program);
    assert_eq!(assignment.kind(), NodeKind::Assignment);
    let add = assignment.child(1);
    assert_eq!(add.kind(), NodeKind::Add);
    assert_eq!(add.child(0).integer(), 1);
    let multiply = add.child(1);
    assert_eq!(multiply.kind(), NodeKind::Multiply);
    assert_eq!(multiply.child(0).integer(), 2);
    assert_eq!(multiply.child(1).integer(), 3);
}

#[test]
fn power_is_right_associative() {
    let program = parse_extended("a = 2 ** 3 ** 4;");
    let assignment = first_directive(&program);
    let outer = assignment.child(1);
    assert_eq!(outer.kind(), NodeKind::Power);
    assert_eq!(outer.child(0).integer(), 2);
    let inner = outer.child(1);
    assert_eq!(inner.kind(), NodeKind::Power);
    assert_eq!(inner.child(0).integer(), 3);
    assert_eq!(inner.child(1).integer(), 4);
}

#[test]
fn extended_operators_rejected_without_pragma() {
    let errors = count_errors(|| {
        parse("a = 2 ** 3;");
    });
    assert!(errors > 0, "'**' must require extended_operators");

    let errors = count_errors(|| {
        parse_extended("a = 2 ** 3;");
    });
    assert_eq!(errors, 0, "'**' must be accepted with extended_operators");
}

#[test]
fn pragma_enables_and_disables_options() {
    let errors = count_errors(|| {
        parse("use extended_operators; a = 1 <? 2; use no_extended_operators; b = 3 <? 4;");
    });
    // only the second use of `<?` errs
    assert_eq!(errors, 1);
}

#[test]
fn prima_pragma_is_a_pure_query() {
    // asserting the current value succeeds and changes nothing
    let errors = count_errors(|| {
        parse("use no_strict?;");
    });
    assert_eq!(errors, 0);

    // asserting a wrong value fails
    let errors = count_errors(|| {
        parse("use strict?;");
    });
    assert_eq!(errors, 1);
}

#[test]
fn member_call_builds_call_of_member() {
    let program = parse("a.f(1, 2);");
    let call = first_directive(&program);
    assert_eq!(call.kind(), NodeKind::Call);
    let member = call.child(0);
    assert_eq!(member.kind(), NodeKind::Member);
    assert_eq!(member.child(0).string(), "a");
    assert_eq!(member.child(1).string(), "f");
    let args = call.child(1);
    assert_eq!(args.kind(), NodeKind::List);
    assert_eq!(args.children_count(), 2);
}

#[test]
fn parenthesized_identifier_becomes_dynamic() {
    let program = parse("(a).b;");
    let member = first_directive(&program);
    assert_eq!(member.kind(), NodeKind::Member);
    assert_eq!(member.child(0).kind(), NodeKind::Videntifier);
}

#[test]
fn new_wraps_postfix_expression() {
    let program = parse("new A(1);");
    let new_node = first_directive(&program);
    assert_eq!(new_node.kind(), NodeKind::New);
    let call = new_node.child(0);
    assert_eq!(call.kind(), NodeKind::Call);
    assert_eq!(call.child(0).string(), "A");
}

#[test]
fn named_call_arguments() {
    let program = parse("f(size: 3, 7);");
    let call = first_directive(&program);
    let args = call.child(1);
    assert_eq!(args.children_count(), 2);
    let named = args.child(0);
    assert_eq!(named.kind(), NodeKind::Name);
    assert_eq!(named.string(), "size");
    assert_eq!(named.child(0).integer(), 3);
    assert_eq!(args.child(1).integer(), 7);
}

// ── Functions ──────────────────────────────────────────────────────────

#[test]
fn function_with_typed_parameters() {
    let program = parse("function f(a: Integer, b: String = \"x\") : Double { return 1.5; }");
    let function = first_directive(&program);
    assert_eq!(function.kind(), NodeKind::Function);
    assert_eq!(function.string(), "f");

    let parameters = function.child(0);
    assert_eq!(parameters.kind(), NodeKind::Parameters);
    assert_eq!(parameters.children_count(), 2);
    let b = parameters.child(1);
    assert_eq!(b.string(), "b");
    assert_eq!(b.child(0).kind(), NodeKind::Type);
    assert_eq!(b.child(1).kind(), NodeKind::Set);

    let return_type = function.child(1);
    assert_eq!(return_type.kind(), NodeKind::Type);
    assert_eq!(function.child(2).kind(), NodeKind::DirectiveList);
}

#[test]
fn void_parameter_list_sets_noparams() {
    let program = parse("function f(Void) { }");
    let function = first_directive(&program);
    assert!(function.get_flag(NodeFlag::FunctionNoparams));
    assert!(function.find_first_child(NodeKind::Parameters).is_none());
}

#[test]
fn unprototyped_parameter_list() {
    let program = parse("function f(unprototyped) { }");
    let function = first_directive(&program);
    let parameters = function.child(0);
    assert_eq!(parameters.children_count(), 1);
    assert!(parameters.child(0).get_flag(NodeFlag::ParamUnprototyped));
}

#[test]
fn getter_and_setter_names() {
    let program = parse("class A { function get size() : Integer { return 1; } function set size(v: Integer) { } }");
    let class = first_directive(&program);
    let list = class.child(0);
    let getter = list.child(0);
    assert!(getter.get_flag(NodeFlag::FunctionGetter));
    assert_eq!(getter.string(), "->size");
    assert!(getter.get_flag(NodeFlag::FunctionNoparams));
    let setter = list.child(1);
    assert!(setter.get_flag(NodeFlag::FunctionSetter));
    assert_eq!(setter.string(), "<-size");
}

#[test]
fn get_followed_by_parenthesis_is_a_plain_function() {
    let program = parse("function get() { }");
    let function = first_directive(&program);
    assert!(!function.get_flag(NodeFlag::FunctionGetter));
    assert_eq!(function.string(), "get");
}

#[test]
fn operator_overload_names() {
    let program = parse_extended("class A { function + (rhs: A) : A { } function [] (i) { } }");
    let class = first_directive(&program);
    let list = class.child(0);
    let plus = list.child(0);
    assert!(plus.get_flag(NodeFlag::FunctionOperator));
    assert_eq!(plus.string(), "+");
    let subscript = list.child(1);
    assert!(subscript.get_flag(NodeFlag::FunctionOperator));
    assert_eq!(subscript.string(), "[]");
}

#[test]
fn call_operator_declaration() {
    let program = parse_extended("class A { function ()(a) { } }");
    let class = first_directive(&program);
    let function = class.child(0).child(0);
    assert!(function.get_flag(NodeFlag::FunctionOperator));
    assert_eq!(function.string(), "()");
    // and it still has its parameter list
    let parameters = function.child(0);
    assert_eq!(parameters.kind(), NodeKind::Parameters);
    assert_eq!(parameters.children_count(), 1);
}

#[test]
fn increment_operator_post_form_naming() {
    let program = parse_extended("class A { function ++ () { } function ++ (right) { } }");
    let class = first_directive(&program);
    let list = class.child(0);
    assert_eq!(list.child(0).string(), "++");
    assert_eq!(list.child(1).string(), "x++");
}

#[test]
fn contracts_attach_to_the_function() {
    let program = parse(
        "function f(a) require not_null: a != null ensure positive: result > 0 { return a; }",
    );
    let function = first_directive(&program);
    let require = function.find_first_child(NodeKind::Require).unwrap();
    let label = require.child(0);
    assert_eq!(label.kind(), NodeKind::Label);
    assert_eq!(label.string(), "not_null");
    assert_eq!(label.child(0).kind(), NodeKind::NotEqual);
    let ensure = function.find_first_child(NodeKind::Ensure).unwrap();
    assert_eq!(ensure.child(0).string(), "positive");
}

// ── Classes and enumerations ───────────────────────────────────────────

#[test]
fn class_extends_and_implements() {
    let program = parse("class A extends B implements I1, I2 { var m; };");
    let class = first_directive(&program);
    assert_eq!(class.kind(), NodeKind::Class);
    assert_eq!(class.string(), "A");

    let extends = class.child(0);
    assert_eq!(extends.kind(), NodeKind::Extends);
    assert_eq!(extends.child(0).string(), "B");

    let implements = class.child(1);
    assert_eq!(implements.kind(), NodeKind::Implements);
    let list = implements.child(0);
    assert_eq!(list.kind(), NodeKind::List);
    assert_eq!(list.children_count(), 2);

    assert_eq!(class.child(2).kind(), NodeKind::DirectiveList);
}

#[test]
fn cpp_style_inheritance_is_rejected() {
    let errors = count_errors(|| {
        parse("class A : public B { };");
    });
    assert!(errors > 0);
}

#[test]
fn forward_class_declaration() {
    let program = parse("class A;");
    let class = first_directive(&program);
    assert_eq!(class.kind(), NodeKind::Class);
    assert_eq!(class.children_count(), 0);
}

#[test]
fn enum_values_auto_increment() {
    let program = parse("enum E { A, B = 5, C };");
    let enum_node = first_directive(&program);
    assert_eq!(enum_node.kind(), NodeKind::Enum);
    assert_eq!(enum_node.string(), "E");
    assert_eq!(enum_node.children_count(), 3);

    let a = enum_node.child(0);
    assert!(a.get_flag(NodeFlag::VariableConst));
    assert_eq!(a.child(0).kind(), NodeKind::Set);
    assert_eq!(a.child(0).child(0).integer(), 0);

    let b = enum_node.child(1);
    assert_eq!(b.child(0).child(0).integer(), 5);

    // C is the previous entry plus one
    let c = enum_node.child(2);
    let add = c.child(0).child(0);
    assert_eq!(add.kind(), NodeKind::Add);
    assert_eq!(add.child(0).string(), "B");
    assert_eq!(add.child(1).integer(), 1);
}

// ── Statements ─────────────────────────────────────────────────────────

#[test]
fn switch_with_operator_and_case_range() {
    let program = parse_extended(
        "switch (x) with (in) { case 1 .. 10: y = 1; default: y = 2; }",
    );
    let switch_node = first_directive(&program);
    assert_eq!(switch_node.kind(), NodeKind::Switch);
    assert_eq!(switch_node.switch_operator(), NodeKind::In);

    let body = switch_node.child(1);
    let case = body.child(0);
    assert_eq!(case.kind(), NodeKind::Case);
    assert_eq!(case.children_count(), 2);
    assert_eq!(case.child(0).integer(), 1);
    assert_eq!(case.child(1).integer(), 10);

    assert_eq!(body.child(2).kind(), NodeKind::Default);
}

#[test]
fn case_range_requires_extended_statements() {
    let errors = count_errors(|| {
        parse("switch (x) { case 1 .. 10: y = 1; }");
    });
    assert!(errors > 0);
}

#[test]
fn try_catch_finally_chain() {
    let program = parse(
        "try { f(); } catch(e: RangeError) { g(); } catch(e) { h(); } finally { i(); }",
    );
    let list = program.child(0);
    assert_eq!(list.children_count(), 4);
    assert_eq!(list.child(0).kind(), NodeKind::Try);

    let typed_catch = list.child(1);
    assert_eq!(typed_catch.kind(), NodeKind::Catch);
    assert!(typed_catch.get_flag(NodeFlag::CatchTyped));

    let untyped_catch = list.child(2);
    assert!(!untyped_catch.get_flag(NodeFlag::CatchTyped));

    assert_eq!(list.child(3).kind(), NodeKind::Finally);
}

#[test]
fn catch_with_guard_expression() {
    let program = parse("try { f(); } catch(e if e instanceof RangeError) { g(); }");
    let list = program.child(0);
    let catch = list.child(1);
    let guard = catch.find_first_child(NodeKind::If).unwrap();
    assert_eq!(guard.child(0).kind(), NodeKind::Instanceof);
}

#[test]
fn labelled_statement_and_goto() {
    let program = parse("again: x = x + 1; goto again;");
    let list = program.child(0);
    let label = list.child(0);
    assert_eq!(label.kind(), NodeKind::Label);
    assert_eq!(label.string(), "again");
    let goto = list.child(2);
    assert_eq!(goto.kind(), NodeKind::Goto);
    assert_eq!(goto.string(), "again");
}

#[test]
fn break_with_label_and_default() {
    let program = parse("while (x) { break top; } while (y) { continue default; }");
    let list = program.child(0);
    let break_node = list.child(0).child(1).child(0).child(0);
    assert_eq!(break_node.kind(), NodeKind::Break);
    assert_eq!(break_node.string(), "top");
    let continue_node = list.child(1).child(1).child(0).child(0);
    assert_eq!(continue_node.kind(), NodeKind::Continue);
    assert_eq!(continue_node.string(), "");
}

#[test]
fn for_in_splits_the_expression() {
    let program = parse("for(k in obj) f(k);");
    let for_node = first_directive(&program);
    assert_eq!(for_node.kind(), NodeKind::For);
    assert!(for_node.get_flag(NodeFlag::ForIn));
    assert_eq!(for_node.child(0).string(), "k");
    assert_eq!(for_node.child(1).string(), "obj");
}

#[test]
fn classic_for_keeps_three_expressions() {
    let program = parse("for(i = 0; i < 10; i = i + 1) f(i);");
    let for_node = first_directive(&program);
    assert_eq!(for_node.children_count(), 4);
    assert_eq!(for_node.child(0).kind(), NodeKind::Assignment);
    assert_eq!(for_node.child(1).kind(), NodeKind::Less);
    assert_eq!(for_node.child(2).kind(), NodeKind::Assignment);
    assert_eq!(for_node.child(3).kind(), NodeKind::DirectiveList);
}

#[test]
fn with_requires_the_pragma() {
    let errors = count_errors(|| {
        parse("with (a) { b = 1; }");
    });
    assert!(errors > 0);

    let errors = count_errors(|| {
        parse_with("with (a) { b = 1; }", |options| {
            options.set_option(CompilerOption::AllowWith, 1);
        });
    });
    assert_eq!(errors, 0);
}

// ── Packages and imports ───────────────────────────────────────────────

#[test]
fn package_with_dotted_name() {
    let program = parse("package a.b.c { function f() { } }");
    let package = first_directive(&program);
    assert_eq!(package.kind(), NodeKind::Package);
    assert_eq!(package.string(), "a.b.c");
    assert_eq!(package.child(0).kind(), NodeKind::DirectiveList);
}

#[test]
fn import_with_wildcard_and_qualifiers() {
    let program = parse_extended("import implements foo.bar.*, namespace n, exclude e;");
    let import = first_directive(&program);
    assert_eq!(import.kind(), NodeKind::Import);
    assert!(import.get_flag(NodeFlag::ImportImplements));
    assert_eq!(import.string(), "foo.bar.*");

    assert!(import.find_first_child(NodeKind::Use).is_some());
    assert!(import.find_first_child(NodeKind::Exclude).is_some());
    assert!(import.find_first_child(NodeKind::Include).is_none());
}

#[test]
fn include_and_exclude_are_mutually_exclusive() {
    let errors = count_errors(|| {
        parse_extended("import foo, include a, exclude b;");
    });
    assert!(errors > 0);
}

#[test]
fn use_namespace_directive() {
    let program = parse("use namespace n;");
    let use_node = first_directive(&program);
    assert_eq!(use_node.kind(), NodeKind::Use);
    assert_eq!(use_node.child(0).string(), "n");
}

// ── Numeric types ──────────────────────────────────────────────────────

#[test]
fn numeric_range_type() {
    let program = parse("use percent as 0 .. 100;");
    let type_node = first_directive(&program);
    assert_eq!(type_node.kind(), NodeKind::Type);
    assert_eq!(type_node.child(0).string(), "percent");
    assert_eq!(type_node.child(1).integer(), 0);
    assert_eq!(type_node.child(2).integer(), 100);
}

#[test]
fn numeric_modulo_type() {
    let program = parse("use angle as mod 360;");
    let type_node = first_directive(&program);
    assert!(type_node.get_flag(NodeFlag::TypeModulo));
    assert_eq!(type_node.child(1).integer(), 360);
}

#[test]
fn inverted_range_warns() {
    let _guard = COUNTER_LOCK.lock().unwrap();
    message::set_message_level(MessageLevel::Off);
    message::reset_counters();
    parse_with("use odd as 10 .. 0;", |_| {});
    assert_eq!(message::error_count(), 0);
    assert_eq!(message::warning_count(), 1);
}

#[test]
fn mixed_range_kinds_err() {
    let errors = count_errors(|| {
        parse("use odd as 0 .. 1.5;");
    });
    assert!(errors > 0);
}

// ── Attributes ─────────────────────────────────────────────────────────

#[test]
fn attributes_attach_to_declarations() {
    let program = parse("public static function f() { }");
    let function = first_directive(&program);
    assert_eq!(function.kind(), NodeKind::Function);
    let attrs = function.attribute_node().unwrap();
    assert_eq!(attrs.children_count(), 2);
    assert_eq!(attrs.child(0).kind(), NodeKind::Public);
    assert_eq!(attrs.child(1).kind(), NodeKind::Static);
}

#[test]
fn duplicate_attributes_are_rejected() {
    let errors = count_errors(|| {
        parse("final final class A { };");
    });
    assert!(errors > 0);
}

#[test]
fn attributes_on_expressions_are_rejected() {
    let errors = count_errors(|| {
        parse("static 3;");
    });
    assert!(errors > 0);
}

#[test]
fn object_and_array_literals() {
    let program = parse("a = { name: 1, \"str\": 2 };");
    let assignment = first_directive(&program);
    let object = assignment.child(1);
    assert_eq!(object.kind(), NodeKind::ObjectLiteral);
    assert_eq!(object.children_count(), 4); // name/set pairs
    assert_eq!(object.child(0).kind(), NodeKind::Name);
    assert_eq!(object.child(1).kind(), NodeKind::Set);

    let program = parse("b = [1, , 3];");
    let assignment = first_directive(&program);
    let array = assignment.child(1);
    assert_eq!(array.kind(), NodeKind::ArrayLiteral);
    let list = array.child(0);
    assert_eq!(list.children_count(), 3);
    assert_eq!(list.child(1).kind(), NodeKind::Empty);
}
