//! JSON AST input
//!
//! The lexer and parser live upstream; this compiler starts from the JSON
//! AST they produce.

use std::fs;
use std::path::Path;

use log::debug;

use crate::frontend::ast::Program;
use crate::utils::Result;

/// Parse a program from its JSON AST text.
pub fn from_json(text: &str) -> Result<Program> {
    let program: Program = serde_json::from_str(text)?;
    debug!(
        "loaded AST: {} declarations, {} statements",
        program.declarations.len(),
        program.statements.len()
    );
    Ok(program)
}

/// Read and parse a JSON AST file.
pub fn load_program(path: &Path) -> Result<Program> {
    let text = fs::read_to_string(path)?;
    from_json(&text)
}

/// Render a (typed) program back to JSON.
pub fn to_json(program: &Program) -> Result<String> {
    Ok(serde_json::to_string_pretty(program)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{BinOp, Declaration, ExprKind, StmtKind, TypeAnnotationKind};
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "kind": "Program",
            "location": [1, 1, 3, 9],
            "declarations": [{
                "kind": "VarDef",
                "location": [1, 1, 1, 10],
                "var": {
                    "kind": "TypedVar",
                    "location": [1, 1, 1, 5],
                    "identifier": {"kind": "Identifier", "location": [1, 1, 1, 1], "name": "x"},
                    "type": {"kind": "ClassType", "location": [1, 3, 1, 5], "className": "int"}
                },
                "value": {"kind": "IntegerLiteral", "location": [1, 9, 1, 9], "value": 1}
            }, {
                "kind": "FuncDef",
                "name": {"kind": "Identifier", "name": "f"},
                "params": [],
                "returnType": {"kind": "ListType", "elementType": {"kind": "ClassType", "className": "int"}},
                "declarations": [],
                "statements": [{"kind": "ReturnStmt", "value": null}]
            }],
            "statements": [{
                "kind": "ExprStmt",
                "location": [2, 1, 2, 12],
                "expr": {
                    "kind": "CallExpr",
                    "function": {"kind": "Identifier", "name": "print"},
                    "args": [{
                        "kind": "BinaryExpr",
                        "location": [2, 7, 2, 11],
                        "left": {"kind": "Identifier", "name": "x"},
                        "operator": "//",
                        "right": {"kind": "IntegerLiteral", "value": 2}
                    }]
                }
            }],
            "errors": {"kind": "Errors", "errors": []}
        })
    }

    #[test]
    fn test_load_reference_json() {
        let program = from_json(&sample().to_string()).unwrap();
        assert_eq!(program.declarations.len(), 2);
        let Declaration::VarDef(var) = &program.declarations[0] else {
            panic!("expected VarDef");
        };
        assert_eq!(var.var.identifier.name, "x");
        assert_eq!(var.span.end_col, 10);
        assert!(matches!(var.value.kind, ExprKind::IntegerLiteral { value: 1 }));

        let Declaration::FuncDef(func) = &program.declarations[1] else {
            panic!("expected FuncDef");
        };
        assert!(matches!(func.return_type.kind, TypeAnnotationKind::ListType { .. }));
        assert!(matches!(func.statements[0].kind, StmtKind::ReturnStmt { value: None }));

        let StmtKind::ExprStmt { expr } = &program.statements[0].kind else {
            panic!("expected ExprStmt");
        };
        let ExprKind::CallExpr { function, args } = &expr.kind else {
            panic!("expected CallExpr");
        };
        assert_eq!(function.name, "print");
        assert!(matches!(args[0].kind, ExprKind::BinaryExpr { operator: BinOp::FloorDiv, .. }));
        assert_eq!(args[0].span.col, 7);
    }

    #[test]
    fn test_round_trip_keeps_shape() {
        let program = from_json(&sample().to_string()).unwrap();
        let text = to_json(&program).unwrap();
        let again = from_json(&text).unwrap();
        assert_eq!(again.declarations.len(), 2);
        assert_eq!(again.statements.len(), 1);
    }

    #[test]
    fn test_rejects_unknown_node_kind() {
        let text = json!({"kind": "Program", "statements": [{"kind": "Teleport"}]}).to_string();
        assert!(from_json(&text).is_err());
    }
}
