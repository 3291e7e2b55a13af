//! End-to-end pipeline scenarios: source AST in, backend AST out.

use tsonic::ast::{
    ArrowBody, Expr, ExprKind, Param, SourceFile, Stmt, StmtKind, TypeSyntax, TypeSyntaxKind,
    VarDecl, VarDeclKind,
};
use tsonic::bindings::{BindingRegistry, BindingsFile};
use tsonic::common::{DiagnosticSink, WorkspaceConfig};
use tsonic::emitter::{CsExpr, CsMember, CsStmt, CsType, CsTypeKind};
use tsonic::compile_program;

// =============================================================================
// Fixture helpers
// =============================================================================

/// Config with type roots so emitted member names keep their JS casing.
fn js_config() -> WorkspaceConfig {
    serde_json::from_str(
        r#"{
            "dotnet": { "typeRoots": [".tsonic/bindings/nuget"] },
            "rootNamespace": "App"
        }"#,
    )
    .unwrap()
}

fn empty_registry() -> BindingRegistry {
    BindingRegistry::new()
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind)
}

fn const_var(name: &str, annotation: Option<TypeSyntax>, init: Expr) -> Stmt {
    stmt(StmtKind::Var(VarDecl {
        kind: VarDeclKind::Const,
        name: name.into(),
        type_annotation: annotation,
        init: Some(init),
        exported: false,
    }))
}

fn func(
    name: &str,
    params: Vec<Param>,
    return_type: Option<TypeSyntax>,
    body: Vec<Stmt>,
) -> Stmt {
    stmt(StmtKind::Func(tsonic::ast::FuncDecl {
        name: name.into(),
        type_params: Vec::new(),
        params,
        return_type,
        body,
        is_async: false,
        is_generator: false,
        exported: false,
    }))
}

fn param(name: &str, ty: &str) -> Param {
    Param::new(name, Some(TypeSyntax::named(ty)))
}

fn index(object: Expr, idx: Expr) -> Expr {
    Expr::new(ExprKind::Index {
        object: Box::new(object),
        index: Box::new(idx),
        optional: false,
    })
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        callee: Box::new(callee),
        type_args: Vec::new(),
        args,
    })
}

fn binary(op: tsonic::ast::BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn logical(op: tsonic::ast::LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::new(ExprKind::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Field initializer of a static module-class field.
fn field_init<'c>(members: &'c [CsMember], name: &str) -> &'c CsExpr {
    members
        .iter()
        .find_map(|m| match m {
            CsMember::Field {
                name: n,
                init: Some(init),
                ..
            } if n == name => Some(init),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no initialized field named {name}"))
}

fn method_body<'c>(members: &'c [CsMember], name: &str) -> &'c [CsStmt] {
    members
        .iter()
        .find_map(|m| match m {
            CsMember::Method {
                name: n,
                body: Some(body),
                ..
            } if n == name => Some(body.as_slice()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no method named {name}"))
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn array_index_propagation_emits_plain_indexing() {
    // const arr = [1, 2, 3]; const i = 0; const x = arr[i]; const y = arr[1];
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
            const_var("i", None, Expr::number("0")),
            const_var("x", None, index(Expr::ident("arr"), Expr::ident("i"))),
            const_var("y", None, index(Expr::ident("arr"), Expr::number("1"))),
        ],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(result.succeeded(), "diagnostics: {:?}", result.diagnostics);

    let compilation = result.compilation.unwrap();
    let unit = compilation.units.get("src/main.ts").unwrap();
    assert_eq!(unit.namespace, "App");
    let module_class = &unit.types[0];
    assert_eq!(module_class.kind, CsTypeKind::StaticClass);
    assert_eq!(module_class.name, "MainModule");

    // The proven index emits plain indexing, no helper call.
    assert_eq!(
        field_init(&module_class.members, "x"),
        &CsExpr::Index {
            target: Box::new(CsExpr::Ident("arr".into())),
            index: Box::new(CsExpr::Ident("i".into())),
        }
    );
    assert_eq!(
        field_init(&module_class.members, "y"),
        &CsExpr::Index {
            target: Box::new(CsExpr::Ident("arr".into())),
            index: Box::new(CsExpr::number("1")),
        }
    );
}

#[test]
fn nullable_value_type_unwraps_with_cast() {
    // function g(x: int): void {}
    // function f(n: number | null | undefined): void { g(n); }
    let nullable_number = TypeSyntax::new(TypeSyntaxKind::Union(vec![
        TypeSyntax::named("number"),
        TypeSyntax::named("null"),
        TypeSyntax::named("undefined"),
    ]));
    let file = SourceFile::new(
        "src/main.ts",
        vec![
            func(
                "g",
                vec![param("x", "int")],
                Some(TypeSyntax::named("void")),
                vec![],
            ),
            func(
                "f",
                vec![Param::new("n", Some(nullable_number))],
                Some(TypeSyntax::named("void")),
                vec![stmt(StmtKind::Expr(call(
                    Expr::ident("g"),
                    vec![Expr::ident("n")],
                )))],
            ),
        ],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(result.succeeded(), "diagnostics: {:?}", result.diagnostics);

    let compilation = result.compilation.unwrap();
    let unit = compilation.units.get("src/main.ts").unwrap();
    let body = method_body(&unit.types[0].members, "f");

    let CsStmt::Expr(CsExpr::Invoke { args, .. }) = &body[0] else {
        panic!("expected a call statement, got {:?}", body[0]);
    };
    // ((int)n.Value)
    assert_eq!(
        args[0].value,
        CsExpr::Paren(Box::new(CsExpr::Cast {
            ty: CsType::named("int"),
            expr: Box::new(CsExpr::Member {
                target: Box::new(CsExpr::Ident("n".into())),
                name: "Value".into(),
            }),
        }))
    );
}

#[test]
fn two_pass_lambda_inference_instantiates_generics() {
    // function select<T, R>(src: T[], f: (x: T) => R): R[] { return []; }
    // const xs: int[] = [1, 2];
    // const ys: int[] = select(xs, (x) => x * 2);
    let select_decl = stmt(StmtKind::Func(tsonic::ast::FuncDecl {
        name: "select".into(),
        type_params: vec!["T".into(), "R".into()],
        params: vec![
            Param::new(
                "src",
                Some(TypeSyntax::new(TypeSyntaxKind::Array(Box::new(
                    TypeSyntax::named("T"),
                )))),
            ),
            Param::new(
                "f",
                Some(TypeSyntax::new(TypeSyntaxKind::Function {
                    params: vec![tsonic::ast::FunctionTypeParam {
                        name: "x".into(),
                        ty: TypeSyntax::named("T"),
                        mode: tsonic::common::ParamMode::Value,
                    }],
                    return_type: Box::new(TypeSyntax::named("R")),
                })),
            ),
        ],
        return_type: Some(TypeSyntax::new(TypeSyntaxKind::Array(Box::new(
            TypeSyntax::named("R"),
        )))),
        body: vec![stmt(StmtKind::Return(Some(Expr::new(ExprKind::Array(
            vec![],
        )))))],
        is_async: false,
        is_generator: false,
        exported: false,
    }));

    let int_array = TypeSyntax::new(TypeSyntaxKind::Array(Box::new(TypeSyntax::named("int"))));
    let lambda = Expr::new(ExprKind::Arrow {
        params: vec![Param::new("x", None)],
        return_type: None,
        body: ArrowBody::Expr(Box::new(binary(
            tsonic::ast::BinaryOp::Mul,
            Expr::ident("x"),
            Expr::number("2"),
        ))),
        is_async: false,
    });
    let file = SourceFile::new(
        "src/main.ts",
        vec![
            select_decl,
            const_var(
                "xs",
                Some(int_array.clone()),
                Expr::new(ExprKind::Array(vec![Expr::number("1"), Expr::number("2")])),
            ),
            const_var(
                "ys",
                Some(int_array),
                call(Expr::ident("select"), vec![Expr::ident("xs"), lambda]),
            ),
        ],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(result.succeeded(), "diagnostics: {:?}", result.diagnostics);

    // The lambda converted against the instantiated (int) => R parameter;
    // no inference diagnostics were reported.
    assert!(result.diagnostics.iter().all(|d| d.code != 7005));
    let compilation = result.compilation.unwrap();
    let unit = compilation.units.get("src/main.ts").unwrap();
    let ys = field_init(&unit.types[0].members, "ys");
    let CsExpr::Invoke { args, .. } = ys else {
        panic!("expected a call initializer");
    };
    assert!(matches!(args[1].value, CsExpr::Lambda { .. }));
}

#[test]
fn boolean_coercion_under_logical_operators() {
    // if (a && b) {}   →  a != 0 && b != 0
    // if ((a || b) && c) {}  →  (a != 0 || b != 0) && c != 0
    use tsonic::ast::LogicalOp;
    let file = SourceFile::new(
        "src/main.ts",
        vec![func(
            "f",
            vec![param("a", "int"), param("b", "int"), param("c", "int")],
            Some(TypeSyntax::named("void")),
            vec![
                stmt(StmtKind::If {
                    condition: logical(LogicalOp::And, Expr::ident("a"), Expr::ident("b")),
                    then_branch: Box::new(stmt(StmtKind::Block(vec![]))),
                    else_branch: None,
                }),
                stmt(StmtKind::If {
                    condition: logical(
                        LogicalOp::And,
                        logical(LogicalOp::Or, Expr::ident("a"), Expr::ident("b")),
                        Expr::ident("c"),
                    ),
                    then_branch: Box::new(stmt(StmtKind::Block(vec![]))),
                    else_branch: None,
                }),
            ],
        )],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(result.succeeded(), "diagnostics: {:?}", result.diagnostics);

    let compilation = result.compilation.unwrap();
    let unit = compilation.units.get("src/main.ts").unwrap();
    let body = method_body(&unit.types[0].members, "f");

    let nonzero = |name: &str| CsExpr::binary("!=", CsExpr::ident(name), CsExpr::number("0"));

    let CsStmt::If { condition, .. } = &body[0] else {
        panic!("expected if");
    };
    assert_eq!(condition, &CsExpr::binary("&&", nonzero("a"), nonzero("b")));

    let CsStmt::If { condition, .. } = &body[1] else {
        panic!("expected if");
    };
    assert_eq!(
        condition,
        &CsExpr::binary(
            "&&",
            CsExpr::paren(CsExpr::binary("||", nonzero("a"), nonzero("b"))),
            nonzero("c"),
        )
    );
}

#[test]
fn void_expression_lowers_to_discard_or_iife() {
    // function f(): int { return 1; }
    // function g(): void { void f(); }
    // const v: int = void f();
    let void_call = Expr::new(ExprKind::Unary {
        op: tsonic::ast::UnaryOp::Void,
        operand: Box::new(call(Expr::ident("f"), vec![])),
    });
    let file = SourceFile::new(
        "src/main.ts",
        vec![
            func(
                "f",
                vec![],
                Some(TypeSyntax::named("int")),
                vec![stmt(StmtKind::Return(Some(Expr::number("1"))))],
            ),
            func(
                "g",
                vec![],
                Some(TypeSyntax::named("void")),
                vec![stmt(StmtKind::Expr(void_call.clone()))],
            ),
            const_var("v", Some(TypeSyntax::named("int")), void_call),
        ],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(result.succeeded(), "diagnostics: {:?}", result.diagnostics);

    let compilation = result.compilation.unwrap();
    let unit = compilation.units.get("src/main.ts").unwrap();
    let members = &unit.types[0].members;

    // Statement position: `f();` is already a valid statement-expression.
    let g_body = method_body(members, "g");
    assert!(matches!(&g_body[0], CsStmt::Expr(CsExpr::Invoke { .. })));

    // Expression position: an invoked Func<int> lambda returning default.
    let v = field_init(members, "v");
    let CsExpr::Invoke { target, .. } = v else {
        panic!("expected IIFE invocation, got {v:?}");
    };
    let CsExpr::Paren(inner) = target.as_ref() else {
        panic!("expected parenthesized cast");
    };
    assert!(matches!(inner.as_ref(), CsExpr::Cast { .. }));
}

#[test]
fn hierarchical_binding_emits_external_names_and_using() {
    let manifest = r#"{
        "assembly": "System.Linq",
        "namespaces": [{
            "name": "systemLinq",
            "alias": "System.Linq",
            "types": [{
                "name": "enumerable",
                "alias": "Enumerable",
                "kind": "class",
                "members": [{
                    "kind": "method",
                    "name": "selectMany",
                    "alias": "SelectMany",
                    "binding": {
                        "assembly": "System.Linq",
                        "type": "System.Linq.Enumerable",
                        "member": "SelectMany"
                    },
                    "parameterCount": 2
                }]
            }]
        }]
    }"#;
    let mut sink = DiagnosticSink::new();
    let file = BindingsFile::from_json_str(manifest, &mut sink).unwrap();
    let mut registry = BindingRegistry::new();
    registry.ingest(&file);

    let int_array = TypeSyntax::new(TypeSyntaxKind::Array(Box::new(TypeSyntax::named("int"))));
    let lambda = Expr::new(ExprKind::Arrow {
        params: vec![param("x", "int")],
        return_type: None,
        body: ArrowBody::Expr(Box::new(Expr::new(ExprKind::Array(vec![
            Expr::ident("x"),
            binary(tsonic::ast::BinaryOp::Mul, Expr::ident("x"), Expr::number("2")),
        ])))),
        is_async: false,
    });
    let callee = Expr::new(ExprKind::Member {
        object: Box::new(Expr::new(ExprKind::Member {
            object: Box::new(Expr::ident("systemLinq")),
            property: "enumerable".into(),
            optional: false,
        })),
        property: "selectMany".into(),
        optional: false,
    });
    let source = SourceFile::new(
        "src/main.ts",
        vec![
            const_var(
                "xs",
                Some(int_array.clone()),
                Expr::new(ExprKind::Array(vec![Expr::number("1"), Expr::number("2")])),
            ),
            const_var(
                "r",
                Some(int_array),
                call(callee, vec![Expr::ident("xs"), lambda]),
            ),
        ],
    );
    let result = compile_program(&[source], &registry, &js_config());
    assert!(result.succeeded(), "diagnostics: {:?}", result.diagnostics);

    let compilation = result.compilation.unwrap();
    let unit = compilation.units.get("src/main.ts").unwrap();
    assert!(unit.usings.iter().any(|u| u == "System.Linq"));

    let r = field_init(&unit.types[0].members, "r");
    let CsExpr::Invoke { target, args, .. } = r else {
        panic!("expected an invocation, got {r:?}");
    };
    assert_eq!(
        target.as_ref(),
        &CsExpr::Member {
            target: Box::new(CsExpr::Ident("System.Linq.Enumerable".into())),
            name: "SelectMany".into(),
        }
    );
    assert_eq!(args[0].value, CsExpr::Ident("xs".into()));
    let CsExpr::Lambda { body, .. } = &args[1].value else {
        panic!("expected lambda argument");
    };
    let tsonic::emitter::cs::CsLambdaBody::Expr(body) = body else {
        panic!("expected expression body");
    };
    assert!(matches!(body.as_ref(), CsExpr::NewArray { ty: None, .. }));
}

#[test]
fn emission_is_deterministic() {
    let build = || {
        SourceFile::new(
            "src/main.ts",
            vec![
                const_var("i", None, Expr::number("0")),
                func(
                    "f",
                    vec![param("a", "int")],
                    Some(TypeSyntax::named("int")),
                    vec![stmt(StmtKind::Return(Some(Expr::ident("a"))))],
                ),
            ],
        )
    };
    let registry = empty_registry();
    let first = compile_program(&[build()], &registry, &js_config());
    let second = compile_program(&[build()], &registry, &js_config());
    assert_eq!(first.compilation, second.compilation);
    assert!(first.succeeded());
}

#[test]
fn any_type_refuses_emission() {
    let file = SourceFile::new(
        "src/main.ts",
        vec![const_var(
            "a",
            Some(TypeSyntax::named("any")),
            Expr::number("1"),
        )],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(!result.succeeded());
    assert!(result.diagnostics.iter().any(|d| d.code == 7001));
}

#[test]
fn modifier_spelled_as_type_refuses_emission() {
    let file = SourceFile::new(
        "src/main.ts",
        vec![func(
            "f",
            vec![param("x", "ref")],
            Some(TypeSyntax::named("void")),
            vec![],
        )],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(!result.succeeded());
    assert!(result.diagnostics.iter().any(|d| d.code == 7003));
}

#[test]
fn unresolved_reference_refuses_emission() {
    let file = SourceFile::new(
        "src/main.ts",
        vec![const_var(
            "w",
            Some(TypeSyntax::named("Widget")),
            Expr::new(ExprKind::NullLit),
        )],
    );
    let registry = empty_registry();
    let result = compile_program(&[file], &registry, &js_config());
    assert!(!result.succeeded());
    assert!(result.diagnostics.iter().any(|d| d.code == 7002));
}
