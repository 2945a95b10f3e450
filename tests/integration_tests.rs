//! Integration tests for end-to-end compilation.
//!
//! These tests run the complete pipeline, from the AST through declaration
//! analysis, type checking and RISC-V code generation, through the public
//! library API.

use chocopy::compile;
use chocopy::frontend::ast::*;
use chocopy::frontend::loader::from_json;
use pretty_assertions::assert_eq;
use serde_json::json;

fn int() -> TypeAnnotation {
    TypeAnnotation::class("int")
}

fn messages(program: &mut Program) -> (Vec<String>, String) {
    let compilation = compile(program).unwrap();
    (compilation.diagnostics.messages(), compilation.assembly)
}

/// Body of the function whose code starts at `label`, up to the next
/// global label
fn function_body<'s>(asm: &'s str, label: &str) -> &'s str {
    let start = asm.find(&format!("\n{}:", label)).expect("function label");
    let rest = &asm[start + 1..];
    let end = rest[1..].find(".globl").map(|i| i + 1).unwrap_or(rest.len());
    &rest[..end]
}

#[test]
fn test_assignment_type_mismatch_still_compiles() {
    let mut program = Program::new(
        vec![Declaration::var("x", int(), Expr::int(1))],
        vec![Stmt::assign(vec![Expr::id("x")], Expr::str("hi"))],
    );
    let (errors, asm) = messages(&mut program);
    assert_eq!(errors, vec!["Expected type `int`; got type `str`".to_string()]);
    assert_eq!(program.errors.errors.len(), 1);
    assert!(asm.contains("main:"));
    assert!(asm.contains("jal heap.init"));
    assert!(asm.contains("li a0, 10"));
    assert!(asm.contains("ecall"));
}

#[test]
fn test_override_with_different_signature() {
    let method = |class: &str, ret: &str, value: Expr| -> Declaration {
        FuncDef::new(
            "f",
            vec![TypedVar::new("self", TypeAnnotation::class(class))],
            TypeAnnotation::class(ret),
            vec![],
            vec![Stmt::ret(Some(value))],
        )
        .into()
    };
    let a = ClassDef::new("A", "object", vec![method("A", "int", Expr::int(1))]);
    let b = ClassDef::new("B", "A", vec![method("B", "bool", Expr::bool(true))]);
    let mut program = Program::new(vec![a.into(), b.into()], vec![]);
    let (errors, _) = messages(&mut program);
    assert_eq!(errors, vec!["Method overridden with different type signature: f".to_string()]);
}

#[test]
fn test_missing_return() {
    let foo = FuncDef::new("foo", vec![], int(), vec![], vec![]);
    let mut program = Program::new(vec![foo.into()], vec![]);
    let (errors, _) = messages(&mut program);
    assert_eq!(errors, vec!["All paths in this function/method must have a return statement: foo".to_string()]);
}

#[test]
fn test_indexing_none_list_checks_at_runtime() {
    let mut program = Program::new(
        vec![Declaration::var("a", TypeAnnotation::list(int()), Expr::none())],
        vec![Stmt::expr(Expr::call("print", vec![Expr::index(Expr::id("a"), Expr::int(0))]))],
    );
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);
    let main = function_body(&asm, "main");
    let none_check = main.find("j error.None").expect("None check");
    let bounds_check = main.find("j error.OOB").expect("bounds check");
    assert!(none_check < bounds_check);
    assert!(main.contains("bltu"));
}

#[test]
fn test_division_by_zero_checks_at_runtime() {
    let mut program = Program::new(
        vec![],
        vec![Stmt::expr(Expr::call("print", vec![Expr::binary(Expr::int(1), BinOp::FloorDiv, Expr::int(0))]))],
    );
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);
    assert!(function_body(&asm, "main").contains("j error.Div"));
}

#[test]
fn test_tail_call_only_for_direct_self_return() {
    let n = || Expr::id("n");
    let fact = FuncDef::new(
        "fact",
        vec![TypedVar::new("n", int())],
        int(),
        vec![],
        vec![
            Stmt::if_else(Expr::binary(n(), BinOp::Le, Expr::int(1)), vec![Stmt::ret(Some(Expr::int(1)))], vec![]),
            Stmt::ret(Some(Expr::binary(
                Expr::call("fact", vec![Expr::binary(n(), BinOp::Sub, Expr::int(1))]),
                BinOp::Mul,
                n(),
            ))),
        ],
    );
    let g = FuncDef::new(
        "g",
        vec![TypedVar::new("n", int())],
        int(),
        vec![],
        vec![
            Stmt::if_else(Expr::binary(n(), BinOp::Eq, Expr::int(0)), vec![Stmt::ret(Some(Expr::int(0)))], vec![]),
            Stmt::ret(Some(Expr::call("g", vec![Expr::binary(n(), BinOp::Sub, Expr::int(1))]))),
        ],
    );
    let mut program = Program::new(vec![fact.into(), g.into()], vec![]);
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);

    let fact_body = function_body(&asm, "$fact");
    assert!(fact_body.contains("jal $fact"));
    assert!(!fact_body.contains("j $fact$start"));

    let g_body = function_body(&asm, "$g");
    assert!(g_body.contains("$g$start:"));
    assert!(g_body.contains("j $g$start"));
    assert!(g_body.contains("sw t0, 0(fp)"));
    assert!(!g_body.contains("jal $g"));
}

#[test]
fn test_nonlocal_access_through_static_link() {
    let inner = FuncDef::new(
        "inner",
        vec![],
        int(),
        vec![Declaration::nonlocal("x")],
        vec![
            Stmt::assign(vec![Expr::id("x")], Expr::binary(Expr::id("x"), BinOp::Add, Expr::int(1))),
            Stmt::ret(Some(Expr::id("x"))),
        ],
    );
    let outer = FuncDef::new(
        "outer",
        vec![],
        int(),
        vec![Declaration::var("x", int(), Expr::int(1)), inner.into()],
        vec![Stmt::ret(Some(Expr::call("inner", vec![])))],
    );
    let mut program =
        Program::new(vec![outer.into()], vec![Stmt::expr(Expr::call("print", vec![Expr::call("outer", vec![])]))]);
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);
    assert!(function_body(&asm, "$outer").contains("# static link"));
    let inner_body = function_body(&asm, "$outer.inner");
    assert!(inner_body.contains("static link to outer"));
    assert!(inner_body.contains("-12("));
}

#[test]
fn test_methods_and_comprehensions() {
    let counter = ClassDef::new(
        "Counter",
        "object",
        vec![
            Declaration::var("n", int(), Expr::int(0)),
            FuncDef::new(
                "bump",
                vec![TypedVar::new("self", TypeAnnotation::class("Counter")), TypedVar::new("by", int())],
                int(),
                vec![],
                vec![
                    Stmt::assign(
                        vec![Expr::member(Expr::id("self"), "n")],
                        Expr::binary(Expr::member(Expr::id("self"), "n"), BinOp::Add, Expr::id("by")),
                    ),
                    Stmt::ret(Some(Expr::member(Expr::id("self"), "n"))),
                ],
            )
            .into(),
        ],
    );
    let doubled = Expr::comprehension(
        Expr::binary(Expr::id("i"), BinOp::Mul, Expr::int(2)),
        "i",
        Expr::list(vec![Expr::int(1), Expr::int(2), Expr::int(3)]),
    );
    let mut program = Program::new(
        vec![counter.into(), Declaration::var("c", TypeAnnotation::class("Counter"), Expr::none())],
        vec![
            Stmt::assign(vec![Expr::id("c")], Expr::call("Counter", vec![])),
            Stmt::expr(Expr::call("print", vec![Expr::method_call(Expr::id("c"), "bump", vec![Expr::int(5)])])),
            Stmt::expr(Expr::call("print", vec![Expr::call("len", vec![doubled])])),
        ],
    );
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);

    assert!(asm.contains("$Counter$dispatchTable:"));
    assert!(asm.contains(".word $Counter.bump"));
    // `self` is never reassigned, so member accesses skip the None check
    assert!(!function_body(&asm, "$Counter.bump").contains("j error.None"));
    let main = function_body(&asm, "main");
    assert!(main.contains("jalr a1"));
    assert!(main.contains("jal conslist"));
    assert!(asm.contains("$comprehension.0:"));
}

#[test]
fn test_compile_from_reference_json() {
    let text = json!({
        "kind": "Program",
        "declarations": [],
        "statements": [{
            "kind": "ExprStmt",
            "location": [1, 1, 1, 20],
            "expr": {
                "kind": "CallExpr",
                "function": {"kind": "Identifier", "name": "print"},
                "args": [{
                    "kind": "BinaryExpr",
                    "left": {"kind": "StringLiteral", "value": "choco"},
                    "operator": "+",
                    "right": {"kind": "StringLiteral", "value": "py"}
                }]
            }
        }],
        "errors": {"kind": "Errors", "errors": []}
    })
    .to_string();
    let mut program = from_json(&text).unwrap();
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);
    assert!(asm.contains("jal strcat"));
    assert!(asm.contains(".string \"choco\""));
    assert!(asm.contains(".string \"py\""));
}

#[test]
fn test_tail_call_inside_nested_loops() {
    let str_ty = || TypeAnnotation::class("str");
    let n = || Expr::id("n");
    let s = || Expr::id("s");
    let recur = Stmt::ret(Some(Expr::call("g", vec![Expr::binary(n(), BinOp::Sub, Expr::int(1)), s()])));
    let innermost = Stmt::for_loop("c", s(), vec![recur]);
    let middle = Stmt::for_loop("b", s(), vec![innermost]);
    let outer = Stmt::for_loop("a", s(), vec![middle]);
    let g = FuncDef::new(
        "g",
        vec![TypedVar::new("n", int()), TypedVar::new("s", str_ty())],
        int(),
        vec![
            Declaration::var("a", str_ty(), Expr::str("")),
            Declaration::var("b", str_ty(), Expr::str("")),
            Declaration::var("c", str_ty(), Expr::str("")),
        ],
        vec![
            Stmt::if_else(Expr::binary(n(), BinOp::Eq, Expr::int(0)), vec![Stmt::ret(Some(Expr::int(0)))], vec![]),
            outer,
            Stmt::ret(Some(n())),
        ],
    );
    let mut program = Program::new(vec![g.into()], vec![]);
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);

    // Nine loop registers are live at the return, so the ring has wrapped
    let body = function_body(&asm, "$g");
    assert!(body.contains("# spill"));
    let save = body.find("save busy registers").expect("live registers saved");
    let restore = body.find("restore busy registers").expect("registers restored");
    let jump = body.find("tail call to g").expect("tail call");
    let staging = &body[save..restore];
    assert!(!staging.contains("# spill"), "{}", staging);
    let stores: Vec<&str> = staging
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with("# new n") || line.ends_with("# new s"))
        .collect();
    assert_eq!(stores.len(), 2);
    assert!(stores[0].starts_with("sw t0, 0(sp)"));
    assert!(stores[1].starts_with("sw t0, 4(sp)"));
    assert!(staging.contains("local a"));
    assert!(body[restore..jump].contains("drop spills"));
}

fn counter_method(class: &str, body: Vec<Stmt>) -> Declaration {
    FuncDef::new(
        "m",
        vec![TypedVar::new("self", TypeAnnotation::class(class)), TypedVar::new("k", int())],
        int(),
        vec![],
        body,
    )
    .into()
}

fn recursive_method(class: &str) -> Declaration {
    let k = || Expr::id("k");
    counter_method(
        class,
        vec![
            Stmt::if_else(Expr::binary(k(), BinOp::Eq, Expr::int(0)), vec![Stmt::ret(Some(Expr::int(0)))], vec![]),
            Stmt::ret(Some(Expr::method_call(
                Expr::id("self"),
                "m",
                vec![Expr::binary(k(), BinOp::Sub, Expr::int(1))],
            ))),
        ],
    )
}

#[test]
fn test_method_tail_call_without_override() {
    let a = ClassDef::new("A", "object", vec![recursive_method("A")]);
    let mut program = Program::new(vec![a.into()], vec![]);
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);

    let body = function_body(&asm, "$A.m");
    assert!(body.contains("$A.m$start:"));
    assert!(body.contains("j $A.m$start"));
    assert!(!body.contains("jalr"));
    assert!(!body.contains("j error.None"));
}

#[test]
fn test_overridden_method_is_dispatched() {
    let a = ClassDef::new("A", "object", vec![recursive_method("A")]);
    let b = ClassDef::new("B", "A", vec![counter_method("B", vec![Stmt::ret(Some(Expr::int(1)))])]);
    let mut program = Program::new(vec![a.into(), b.into()], vec![]);
    let (errors, asm) = messages(&mut program);
    assert!(errors.is_empty(), "{:?}", errors);

    let body = function_body(&asm, "$A.m");
    assert!(body.contains("jalr a1"));
    assert!(!body.contains("j $A.m$start"));
    assert!(asm.contains(".word $B.m"));
}
