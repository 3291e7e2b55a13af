//! Numeric soundness boundaries through the full pipeline.

use tsonic::ast::{Expr, ExprKind, SourceFile, Stmt, StmtKind, TypeSyntax, VarDecl, VarDeclKind};
use tsonic::bindings::BindingRegistry;
use tsonic::common::WorkspaceConfig;
use tsonic::compile_program;

fn config() -> WorkspaceConfig {
    serde_json::from_str(r#"{ "rootNamespace": "App" }"#).unwrap()
}

fn const_var(name: &str, annotation: Option<TypeSyntax>, init: Expr) -> Stmt {
    Stmt::new(StmtKind::Var(VarDecl {
        kind: VarDeclKind::Const,
        name: name.into(),
        type_annotation: annotation,
        init: Some(init),
        exported: false,
    }))
}

fn narrowed(raw: &str, target: &str) -> Expr {
    Expr::new(ExprKind::As {
        expr: Box::new(Expr::number(raw)),
        ty: TypeSyntax::named(target),
    })
}

fn compile_narrowing(raw: &str, target: &str) -> tsonic::CompileResult {
    let file = SourceFile::new(
        "src/main.ts",
        vec![const_var(
            "value",
            Some(TypeSyntax::named(target)),
            narrowed(raw, target),
        )],
    );
    let registry = BindingRegistry::new();
    compile_program(&[file], &registry, &config())
}

fn assert_rejected(raw: &str, target: &str, code: u32) {
    let result = compile_narrowing(raw, target);
    assert!(!result.succeeded(), "{raw} as {target} should be rejected");
    assert!(
        result.diagnostics.iter().any(|d| d.code == code),
        "expected TSN{code} for {raw} as {target}, got {:?}",
        result.diagnostics
    );
}

fn assert_accepted(raw: &str, target: &str) {
    let result = compile_narrowing(raw, target);
    assert!(
        result.succeeded(),
        "{raw} as {target} should pass: {:?}",
        result.diagnostics
    );
}

#[test]
fn int64_safe_integer_boundary() {
    // MAX_SAFE_INTEGER passes, one past it fails.
    assert_accepted("9007199254740991", "long");
    assert_rejected("9007199254740992", "long", 5003);
}

#[test]
fn int32_range_boundary() {
    assert_accepted("2147483647", "int");
    assert_rejected("2147483648", "int", 5002);
}

#[test]
fn byte_range_boundary() {
    assert_accepted("255", "byte");
    assert_rejected("256", "byte", 5002);
}

#[test]
fn float_literal_to_integer_is_rejected() {
    assert_rejected("1.5", "int", 5005);
    assert_accepted("1.5", "double");
    assert_accepted("1.5", "float");
}

#[test]
fn double_typed_index_is_rejected() {
    // const arr = [1, 2, 3]; const d = 1.5; const x = arr[d];
    let file = SourceFile::new(
        "src/main.ts",
        vec![
            const_var(
                "arr",
                None,
                Expr::new(ExprKind::Array(vec![
                    Expr::number("1"),
                    Expr::number("2"),
                    Expr::number("3"),
                ])),
            ),
            const_var("d", None, Expr::number("1.5")),
            const_var(
                "x",
                Some(TypeSyntax::named("int")),
                Expr::new(ExprKind::Index {
                    object: Box::new(Expr::ident("arr")),
                    index: Box::new(Expr::ident("d")),
                    optional: false,
                }),
            ),
        ],
    );
    let registry = BindingRegistry::new();
    let result = compile_program(&[file], &registry, &config());
    assert!(!result.succeeded());
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.code == 5004)
        .expect("integer-index diagnostic");
    assert!(diag.message.contains("Double"));
}

#[test]
fn proven_variable_index_is_accepted() {
    let file = SourceFile::new(
        "src/main.ts",
        vec![
            const_var(
                "arr",
                None,
                Expr::new(ExprKind::Array(vec![Expr::number("1"), Expr::number("2")])),
            ),
            const_var("i", None, Expr::number("0")),
            const_var(
                "x",
                None,
                Expr::new(ExprKind::Index {
                    object: Box::new(Expr::ident("arr")),
                    index: Box::new(Expr::ident("i")),
                    optional: false,
                }),
            ),
        ],
    );
    let registry = BindingRegistry::new();
    let result = compile_program(&[file], &registry, &config());
    assert!(result.succeeded(), "diagnostics: {:?}", result.diagnostics);
}
