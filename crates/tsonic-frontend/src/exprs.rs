//! Expression lowering.
//!
//! Each conversion receives the expected type threaded from its context
//! (declaration annotation, formal parameter, assignment target). The
//! expected type never overrides what an expression provably is; it only
//! resolves choices the expression leaves open (numeric literal kinds,
//! lambda parameter types, array element types).

use tsonic_ast::{ArrowBody, Expr, ExprKind, ObjectEntry, TemplatePart, UnaryOp};
use tsonic_common::diagnostics::codes;
use tsonic_common::numeric::{is_integer_lexeme, parse_integer_lexeme, parse_numeric_literal_value};
use tsonic_common::NumericKind;
use tsonic_ir::{
    DeclKind, DeclRecord, IrExpr, IrExprKind, IrFunctionBody, IrIdent, IrLambda, IrLiteral,
    IrObjectEntry, IrParameter, IrTemplatePart, IrType, Primitive, StructuralMember, TypeRef,
};

use crate::context::LocalBinding;
use crate::lower::Lowering;

impl<'a, 'b> Lowering<'a, 'b> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr, expected: Option<&TypeRef>) -> IrExpr {
        let mut lowered = self.lower_expr_kind(expr, expected);
        if lowered.span.is_dummy() {
            lowered.span = expr.span;
        }
        lowered
    }

    fn lower_expr_kind(&mut self, expr: &Expr, expected: Option<&TypeRef>) -> IrExpr {
        match &expr.kind {
            ExprKind::NumberLit { raw } => self.lower_number_literal(raw, expected),
            ExprKind::StringLit(value) => IrExpr::typed(
                IrExprKind::Literal(IrLiteral::String(value.clone())),
                IrType::string(),
            ),
            ExprKind::BoolLit(value) => IrExpr::typed(
                IrExprKind::Literal(IrLiteral::Boolean(*value)),
                IrType::boolean(),
            ),
            ExprKind::NullLit => {
                IrExpr::typed(IrExprKind::Literal(IrLiteral::Null), IrType::null())
            }
            ExprKind::UndefinedLit => IrExpr::typed(
                IrExprKind::Literal(IrLiteral::Undefined),
                IrType::undefined(),
            ),
            ExprKind::TemplateLit(parts) => {
                let lowered = parts
                    .iter()
                    .map(|p| match p {
                        TemplatePart::Text(text) => IrTemplatePart::Text(text.clone()),
                        TemplatePart::Expr(e) => IrTemplatePart::Expr(self.lower_expr(e, None)),
                    })
                    .collect();
                IrExpr::typed(IrExprKind::TemplateLiteral(lowered), IrType::string())
            }
            ExprKind::Ident(name) => self.lower_identifier(name),
            ExprKind::Array(elements) => self.lower_array(elements, expected),
            ExprKind::Object(entries) => self.lower_object(entries),
            ExprKind::Member {
                object,
                property,
                optional,
            } => self.lower_member_access(object, property, *optional),
            ExprKind::Index {
                object,
                index,
                optional,
            } => self.lower_computed_access(object, index, *optional),
            ExprKind::Call { callee, type_args, args } => {
                self.lower_call(callee, type_args, args, expected)
            }
            ExprKind::New { callee, type_args, args } => {
                self.lower_new(callee, type_args, args)
            }
            ExprKind::This => {
                let ty = self.current_class.and_then(|decl| {
                    self.ctx
                        .handles
                        .decl(decl)
                        .map(|record| IrType::reference(record.name.clone()))
                });
                let mut e = IrExpr::new(IrExprKind::This);
                e.inferred_type = ty;
                e
            }
            ExprKind::Update { op, prefix, target } => {
                let target = self.lower_expr(target, None);
                let ty = target.inferred_type.clone();
                let mut e = IrExpr::new(IrExprKind::Update {
                    op: *op,
                    prefix: *prefix,
                    target: Box::new(target),
                });
                e.inferred_type = ty;
                e
            }
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand, expected),
            ExprKind::Binary { op, left, right } => {
                let left = self.lower_expr(left, None);
                let right = self.lower_expr(right, None);
                let ty = binary_result_type(*op, &left, &right);
                let mut e = IrExpr::new(IrExprKind::Binary {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                });
                e.inferred_type = ty;
                e
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.lower_expr(left, None);
                let right = self.lower_expr(right, None);
                let ty = logical_result_type(*op, &left, &right);
                let mut e = IrExpr::new(IrExprKind::Logical {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                });
                e.inferred_type = ty;
                e
            }
            ExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                let condition = self.lower_expr(condition, None);
                let when_true = self.lower_expr(when_true, expected);
                let when_false = self.lower_expr(when_false, expected);
                let ty = same_or_union(&when_true, &when_false);
                let mut e = IrExpr::new(IrExprKind::Conditional {
                    condition: Box::new(condition),
                    when_true: Box::new(when_true),
                    when_false: Box::new(when_false),
                });
                e.inferred_type = ty;
                e
            }
            ExprKind::Assign { op, target, value } => {
                let target = self.lower_expr(target, None);
                let target_ty = target.inferred_type.clone();
                let value = self.lower_expr(value, target_ty.as_ref());
                let mut e = IrExpr::new(IrExprKind::Assignment {
                    op: *op,
                    target: Box::new(target),
                    value: Box::new(value),
                });
                e.inferred_type = target_ty;
                e
            }
            ExprKind::Arrow { .. } => self.lower_arrow(expr, expected),
            ExprKind::As { expr: inner, ty } => self.lower_as(inner, ty),
            ExprKind::Spread(inner) => {
                let inner = self.lower_expr(inner, None);
                let ty = inner.inferred_type.clone();
                let mut e = IrExpr::new(IrExprKind::Spread(Box::new(inner)));
                e.inferred_type = ty;
                e
            }
            ExprKind::Await(inner) => {
                let inner = self.lower_expr(inner, None);
                let ty = inner.inferred_type.as_ref().map(awaited_type);
                let mut e = IrExpr::new(IrExprKind::Await(Box::new(inner)));
                e.inferred_type = ty;
                e
            }
            ExprKind::Yield { value, delegate } => {
                let value = value
                    .as_ref()
                    .map(|v| Box::new(self.lower_expr(v, None)));
                IrExpr::new(IrExprKind::Yield {
                    value,
                    delegate: *delegate,
                })
            }
        }
    }

    // =========================================================================
    // Literals
    // =========================================================================

    /// Number literal typing: an expected CLR numeric type wins; otherwise
    /// the raw lexeme decides (integer in `Int32` range, `long`-range
    /// integer, or the default floating `number`).
    fn lower_number_literal(&mut self, raw: &str, expected: Option<&TypeRef>) -> IrExpr {
        let value = parse_numeric_literal_value(raw).unwrap_or(f64::NAN);
        let ty = expected
            .filter(|e| e.numeric_kind().is_some())
            .cloned()
            .unwrap_or_else(|| literal_number_type(raw));
        IrExpr::typed(
            IrExprKind::Literal(IrLiteral::Number {
                value,
                raw: raw.to_string(),
            }),
            ty,
        )
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    fn lower_identifier(&mut self, name: &str) -> IrExpr {
        // Lexical scope first.
        if let Some(binding) = self.scopes.lookup(name) {
            return IrExpr::typed(
                IrExprKind::Identifier(IrIdent {
                    name: name.to_string(),
                    decl: Some(binding.decl),
                }),
                binding.ty.clone(),
            );
        }
        // Module-level declarations of the current namespace.
        let namespace = self.current_namespace.clone();
        if let Some(decl) = self.module_decl(&namespace, name) {
            let scope = self.type_scope();
            let ty = self.ctx.types.type_of_decl(
                &self.ctx.handles,
                self.ctx.bindings,
                decl,
                &scope,
                &mut self.ctx.sink,
            );
            return IrExpr::typed(
                IrExprKind::Identifier(IrIdent {
                    name: name.to_string(),
                    decl: Some(decl),
                }),
                ty,
            );
        }
        // Imported module-level values from other modules.
        if self.current_imports.contains(name) {
            if let Some(&decl) = self.module_values.get(name) {
                let scope = self.type_scope();
                let ty = self.ctx.types.type_of_decl(
                    &self.ctx.handles,
                    self.ctx.bindings,
                    decl,
                    &scope,
                    &mut self.ctx.sink,
                );
                return IrExpr::typed(
                    IrExprKind::Identifier(IrIdent {
                        name: name.to_string(),
                        decl: Some(decl),
                    }),
                    ty,
                );
            }
        }
        // A locally-declared type used as a value (static member access).
        if let Some(decl) = self.ctx.types.nominal.resolve_name(name) {
            return IrExpr::typed(
                IrExprKind::Identifier(IrIdent {
                    name: name.to_string(),
                    decl: Some(decl),
                }),
                IrType::reference(name),
            );
        }
        // Bound namespaces and types resolve syntactically at their access
        // site; the bare identifier carries its reference type when bound.
        if self.ctx.bindings.get_namespace(name).is_some() {
            return IrExpr::new(IrExprKind::Identifier(IrIdent {
                name: name.to_string(),
                decl: None,
            }));
        }
        if let Some(type_binding) = self.ctx.bindings.get_type(name) {
            return IrExpr::typed(
                IrExprKind::Identifier(IrIdent {
                    name: name.to_string(),
                    decl: None,
                }),
                IrType::bound_reference(name, type_binding.external_name.clone()),
            );
        }
        let diag = tsonic_common::Diagnostic::new(&codes::UNRESOLVED_REFERENCE, &[name]);
        self.ctx.sink.push(diag);
        IrExpr::new(IrExprKind::Identifier(IrIdent {
            name: name.to_string(),
            decl: None,
        }))
    }

    // =========================================================================
    // Composites
    // =========================================================================

    fn lower_array(&mut self, elements: &[Expr], expected: Option<&TypeRef>) -> IrExpr {
        let element_expected = expected.and_then(|e| match e.as_ref() {
            IrType::Array(elem) => Some(elem.clone()),
            _ => None,
        });
        let lowered: Vec<IrExpr> = elements
            .iter()
            .map(|e| self.lower_expr(e, element_expected.as_ref()))
            .collect();

        let ty = if let Some(elem) = element_expected {
            Some(IrType::array(elem))
        } else {
            // Deterministic inference: all elements must agree exactly.
            let mut tys = lowered.iter().map(|e| e.inferred_type.as_ref());
            match tys.next().flatten() {
                Some(first) if lowered.iter().all(|e| e.inferred_type.as_deref() == Some(&**first)) => {
                    Some(IrType::array(first.clone()))
                }
                _ => None,
            }
        };
        let mut e = IrExpr::new(IrExprKind::Array(lowered));
        e.inferred_type = ty;
        e
    }

    fn lower_object(&mut self, entries: &[ObjectEntry]) -> IrExpr {
        let mut members = Vec::new();
        let mut has_spread = false;
        let lowered: Vec<IrObjectEntry> = entries
            .iter()
            .map(|entry| match entry {
                ObjectEntry::Property { key, value } => {
                    let value = self.lower_expr(value, None);
                    if let Some(ty) = &value.inferred_type {
                        members.push(StructuralMember::Property {
                            name: key.clone(),
                            ty: ty.clone(),
                            optional: false,
                        });
                    }
                    IrObjectEntry::Property {
                        key: key.clone(),
                        value,
                    }
                }
                ObjectEntry::Spread(inner) => {
                    has_spread = true;
                    IrObjectEntry::Spread(self.lower_expr(inner, None))
                }
            })
            .collect();
        let ty = (!has_spread && members.len() == lowered.len())
            .then(|| IrType::object_type(members));
        let mut e = IrExpr::new(IrExprKind::Object(lowered));
        e.inferred_type = ty;
        e
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr, expected: Option<&TypeRef>) -> IrExpr {
        let operand = self.lower_expr(operand, None);
        let ty = match op {
            UnaryOp::Not | UnaryOp::Delete => Some(IrType::boolean()),
            UnaryOp::TypeOf => Some(IrType::string()),
            UnaryOp::Minus | UnaryOp::Plus | UnaryOp::BitNot => operand.inferred_type.clone(),
            // `void e` in expression position takes the context's type.
            UnaryOp::Void => expected.cloned().or_else(|| Some(IrType::void())),
        };
        let mut e = IrExpr::new(IrExprKind::Unary {
            op,
            operand: Box::new(operand),
        });
        e.inferred_type = ty;
        e
    }

    // =========================================================================
    // Lambdas
    // =========================================================================

    /// Whether an arrow must defer conversion until the call's generics are
    /// inferred. Arrows with fully annotated parameters (and no inference
    /// need) are treated as non-lambdas.
    pub(crate) fn arrow_is_deferred(expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Arrow { params, .. } => {
                params.iter().any(|p| p.type_annotation.is_none())
            }
            _ => false,
        }
    }

    pub(crate) fn lower_arrow(&mut self, expr: &Expr, expected: Option<&TypeRef>) -> IrExpr {
        let ExprKind::Arrow {
            params,
            return_type,
            body,
            is_async,
        } = &expr.kind
        else {
            unreachable!("lower_arrow on non-arrow");
        };

        // Delegate-typed expectations convert to their function shape.
        let expected_fn = expected.and_then(|e| match e.as_ref() {
            IrType::Function(f) => Some(f.clone()),
            _ => None,
        });

        self.scopes.push();
        let mut ir_params = Vec::new();
        for (index, param) in params.iter().enumerate() {
            let ty = match &param.type_annotation {
                Some(annotation) => self.convert_type(annotation),
                None => expected_fn
                    .as_ref()
                    .and_then(|f| f.params.get(index))
                    .map(|p| p.ty.clone())
                    .unwrap_or_else(IrType::unknown),
            };
            let decl = self.ctx.handles.alloc_decl(DeclRecord {
                kind: DeclKind::Parameter,
                name: param.name.clone(),
                qualified_name: param.name.clone(),
                type_syntax: None,
                span: param.span,
            });
            self.scopes.declare(
                param.name.clone(),
                LocalBinding {
                    decl,
                    ty: ty.clone(),
                },
            );
            ir_params.push(IrParameter {
                name: param.name.clone(),
                decl,
                ty,
                passing: param.mode,
                optional: param.optional,
            });
        }

        let declared_return = return_type.as_ref().map(|t| self.convert_type(t));
        let expected_return = expected_fn.as_ref().map(|f| f.return_type.clone());

        let (ir_body, body_type) = match body {
            ArrowBody::Expr(value) => {
                let expected = declared_return.as_ref().or(expected_return.as_ref());
                let value = self.lower_expr(value, expected);
                let ty = value.inferred_type.clone();
                (IrFunctionBody::Expr(Box::new(value)), ty)
            }
            ArrowBody::Block(stmts) => {
                let saved_return = self.current_return_type.take();
                let saved_inferred = self.inferred_return.take();
                self.current_return_type =
                    declared_return.clone().or_else(|| expected_return.clone());
                let lowered = stmts.iter().map(|s| self.lower_stmt(s)).collect();
                let ty = self.inferred_return.take();
                self.current_return_type = saved_return;
                self.inferred_return = saved_inferred;
                (IrFunctionBody::Block(lowered), ty)
            }
        };
        self.scopes.pop();

        // A concrete body type beats an expected return that is still an
        // uninstantiated type parameter.
        let return_ty = declared_return
            .or(body_type)
            .or(expected_return)
            .unwrap_or_else(IrType::void);

        let fn_type = IrType::function(
            ir_params
                .iter()
                .map(|p| tsonic_ir::FunctionParam {
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                    mode: p.passing,
                    optional: p.optional,
                })
                .collect(),
            return_ty.clone(),
        );

        IrExpr::typed(
            IrExprKind::Lambda(Box::new(IrLambda {
                params: ir_params,
                return_type: return_ty,
                body: ir_body,
                is_async: *is_async,
            })),
            fn_type,
        )
    }

    // =========================================================================
    // Assertions and narrowings
    // =========================================================================

    fn lower_as(&mut self, inner: &Expr, ty_syntax: &tsonic_ast::TypeSyntax) -> IrExpr {
        let target = self.convert_type(ty_syntax);
        let inner = self.lower_expr(inner, Some(&target));

        // `as unknown` and extension-method helper shapes erase entirely.
        if erasable_assertion_target(&target) {
            return IrExpr::typed(
                IrExprKind::TypeAssertion {
                    operand: Box::new(inner),
                    erasable: true,
                },
                target,
            );
        }

        // Numeric narrowing to a CLR kind (the default floating `number`
        // stays an assertion).
        if let Some(kind) = narrowing_kind(&target) {
            return IrExpr::typed(
                IrExprKind::NumericNarrowing {
                    operand: Box::new(inner),
                    target: kind,
                },
                target,
            );
        }

        IrExpr::typed(
            IrExprKind::TypeAssertion {
                operand: Box::new(inner),
                erasable: false,
            },
            target,
        )
    }
}

// =============================================================================
// Type helpers
// =============================================================================

/// Raw lexeme to default IR type for an unconstrained number literal.
pub(crate) fn literal_number_type(raw: &str) -> TypeRef {
    if is_integer_lexeme(raw) {
        if let Some(value) = parse_integer_lexeme(raw) {
            if NumericKind::Int32.contains(value) {
                return IrType::primitive(Primitive::Int);
            }
            if NumericKind::Int64.contains(value) {
                return IrType::primitive(Primitive::Long);
            }
        }
    }
    IrType::number()
}

fn binary_result_type(
    op: tsonic_ast::BinaryOp,
    left: &IrExpr,
    right: &IrExpr,
) -> Option<TypeRef> {
    use tsonic_ast::BinaryOp::*;
    match op {
        Eq | NotEq | StrictEq | StrictNotEq | Lt | LtEq | Gt | GtEq | InstanceOf | In => {
            Some(IrType::boolean())
        }
        Add => {
            let is_string = |e: &IrExpr| {
                matches!(
                    e.inferred_type.as_deref(),
                    Some(IrType::Primitive(Primitive::String))
                )
            };
            if is_string(left) || is_string(right) {
                return Some(IrType::string());
            }
            numeric_join_type(left, right)
        }
        _ => numeric_join_type(left, right),
    }
}

fn numeric_join_type(left: &IrExpr, right: &IrExpr) -> Option<TypeRef> {
    let lt = left.inferred_type.as_ref()?;
    let rt = right.inferred_type.as_ref()?;
    if lt == rt {
        return Some(lt.clone());
    }
    lt.numeric_kind()?;
    rt.numeric_kind()?;
    // Precise kinds are the proof pass's business; the type settles on the
    // default floating type when operand types disagree.
    Some(IrType::number())
}

fn logical_result_type(
    op: tsonic_ast::LogicalOp,
    left: &IrExpr,
    right: &IrExpr,
) -> Option<TypeRef> {
    use tsonic_ast::LogicalOp::*;
    match op {
        And | Or => same_or_union(left, right),
        Coalesce => {
            let lt = left.inferred_type.as_ref()?;
            let (stripped, _) = IrType::strip_nullish(lt);
            match right.inferred_type.as_ref() {
                Some(rt) if **rt == *stripped => Some(stripped),
                Some(rt) => Some(IrType::union(vec![stripped, rt.clone()])),
                None => Some(stripped),
            }
        }
    }
}

fn same_or_union(left: &IrExpr, right: &IrExpr) -> Option<TypeRef> {
    let lt = left.inferred_type.as_ref()?;
    let rt = right.inferred_type.as_ref()?;
    if lt == rt {
        Some(lt.clone())
    } else {
        Some(IrType::union(vec![lt.clone(), rt.clone()]))
    }
}

/// `Promise<T>` / `Task<T>` unwrap for `await`.
fn awaited_type(ty: &TypeRef) -> TypeRef {
    if let IrType::Reference(r) = ty.as_ref() {
        if (r.name == "Promise" || r.name == "Task") && r.type_args.len() == 1 {
            return r.type_args[0].clone();
        }
    }
    ty.clone()
}

/// Targets whose assertions must produce no cast in output.
pub(crate) fn erasable_assertion_target(target: &TypeRef) -> bool {
    match target.as_ref() {
        IrType::Unknown => true,
        IrType::Reference(r) => r.name == "ExtensionMethods",
        IrType::Intersection(members) => members.iter().any(|m| {
            matches!(m.as_ref(), IrType::Reference(r) if tsonic_bindings::is_extension_bucket_name(&r.name))
        }),
        _ => false,
    }
}

/// The narrowing target kind of an `as T`, when `T` is a CLR numeric alias
/// rather than the surface `number` type.
pub(crate) fn narrowing_kind(target: &TypeRef) -> Option<NumericKind> {
    if matches!(target.as_ref(), IrType::Primitive(Primitive::Number)) {
        return None;
    }
    target.numeric_kind()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_number_types_follow_lexeme() {
        assert_eq!(
            *literal_number_type("42"),
            IrType::Primitive(Primitive::Int)
        );
        assert_eq!(
            *literal_number_type("2147483648"),
            IrType::Primitive(Primitive::Long)
        );
        assert_eq!(*literal_number_type("1.5"), *IrType::number());
        assert_eq!(*literal_number_type("1e3"), *IrType::number());
    }

    #[test]
    fn erasable_targets() {
        assert!(erasable_assertion_target(&IrType::unknown()));
        assert!(erasable_assertion_target(&IrType::reference(
            "ExtensionMethods"
        )));
        assert!(erasable_assertion_target(&IrType::intersection(vec![
            IrType::reference("List"),
            IrType::reference("__Ext_List"),
        ])));
        assert!(!erasable_assertion_target(&IrType::reference("List")));
    }

    #[test]
    fn narrowing_kind_excludes_plain_number() {
        assert_eq!(narrowing_kind(&IrType::number()), None);
        assert_eq!(
            narrowing_kind(&IrType::primitive(Primitive::Int)),
            Some(NumericKind::Int32)
        );
        assert_eq!(
            narrowing_kind(&IrType::reference("long")),
            Some(NumericKind::Int64)
        );
    }
}
