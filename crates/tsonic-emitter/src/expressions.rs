//! Expression emission.
//!
//! The interesting rules live here: boolean-context coercion, nullable
//! value-type unwrapping, the type-parameter cast (applied before the
//! unwrap), erasable assertions, and proof-carrying narrowing lowering.

use tsonic_common::{NumericKind, ParamMode};
use tsonic_ir::{
    AssignOp, BinaryOp, IrExpr, IrExprKind, IrFunctionBody, IrLiteral, IrMemberKey, IrType,
    LogicalOp, Primitive, ProofSource, TypeRef, UnaryOp, UpdateOp,
};
use tsonic_passes::{csharp_identifier, member_target_name};

use crate::cs::{
    CsArg, CsExpr, CsInterpPart, CsLambdaBody, CsLambdaParam, CsLiteral, CsSwitchArm, CsType,
};
use crate::emitter::Emitter;

impl<'a> Emitter<'a> {
    /// Emit an expression against an expected type.
    ///
    /// Conversion order is fixed: the type-parameter cast applies first,
    /// then the nullable value-type unwrap on its result, then a numeric
    /// cast when the kinds still disagree.
    pub(crate) fn emit_expr(&mut self, expr: &IrExpr, expected: Option<&TypeRef>) -> CsExpr {
        let mut emitted = self.emit_expr_base(expr);

        let Some(expected) = expected else {
            return emitted;
        };
        let Some(actual) = &expr.inferred_type else {
            return emitted;
        };

        // Nullish type-parameter cast: `T | null | undefined` to bare `T`.
        if let IrType::TypeParameter(param) = expected.as_ref() {
            let (stripped, was_nullish) = IrType::strip_nullish(actual);
            if was_nullish {
                if let IrType::TypeParameter(inner) = stripped.as_ref() {
                    if inner == param {
                        return CsExpr::Cast {
                            ty: CsType::named(param.clone()),
                            expr: Box::new(CsExpr::paren(emitted)),
                        };
                    }
                }
            }
        }

        // Nullable value-type unwrap.
        let (stripped, was_nullish) = IrType::strip_nullish(actual);
        let mut effective = actual.clone();
        if was_nullish && expected.is_clr_value_type() && !self.nullish_handled(expr) {
            emitted = CsExpr::member(emitted, "Value");
            effective = stripped;
        }

        // Numeric cast when the effective kind still differs.
        if let (Some(expected_kind), Some(actual_kind)) =
            (expected.numeric_kind(), effective.numeric_kind())
        {
            if expected_kind != actual_kind && !matches!(expr.kind, IrExprKind::Literal(_)) {
                return CsExpr::paren(CsExpr::Cast {
                    ty: CsType::named(expected_kind.cs_keyword()),
                    expr: Box::new(emitted),
                });
            }
        }
        emitted
    }

    /// Whether an expression needs no `.Value`: it is in the narrowed set,
    /// or it is a composite whose `??` already produced non-null.
    fn nullish_handled(&self, expr: &IrExpr) -> bool {
        if let IrExprKind::Logical {
            op: LogicalOp::Coalesce,
            ..
        } = &expr.kind
        {
            return true;
        }
        if !expr.is_simple_reference() {
            return true;
        }
        expr.root_identifier()
            .is_some_and(|name| self.narrowed.contains(name))
    }

    pub(crate) fn emit_expr_base(&mut self, expr: &IrExpr) -> CsExpr {
        match &expr.kind {
            IrExprKind::Literal(literal) => self.emit_literal(literal, expr),
            IrExprKind::Identifier(ident) => CsExpr::Ident(self.identifier_name(ident)),
            IrExprKind::This => CsExpr::This,
            IrExprKind::Array(elements) => self.emit_array(elements, expr),
            IrExprKind::Object(entries) => self.emit_object(entries, expr),
            IrExprKind::Member(access) => {
                if access.is_type_reference {
                    let name = match expr.inferred_type.as_deref() {
                        Some(IrType::Reference(r)) => match &r.external {
                            Some(external) => {
                                if let Some((namespace, _)) = external.rsplit_once('.') {
                                    self.add_using(namespace);
                                }
                                external.clone()
                            }
                            None => csharp_identifier(&r.name),
                        },
                        _ => panic!("ICE: type reference without a bound reference type"),
                    };
                    CsExpr::Ident(name)
                } else {
                    self.emit_member(access)
                }
            }
            IrExprKind::Call(call) => self.emit_call(call),
            IrExprKind::New(new) => {
                let ty = self.cs_type(&new.callee);
                let args = self.emit_args(&new.args, None, new.argument_passing.as_deref());
                CsExpr::New { ty, args }
            }
            IrExprKind::Lambda(lambda) => self.emit_lambda(lambda),
            IrExprKind::Update { op, prefix, target } => {
                let operand = Box::new(self.emit_expr_base(target));
                let op_text = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                if *prefix {
                    CsExpr::Unary {
                        op: op_text,
                        operand,
                    }
                } else {
                    CsExpr::Postfix {
                        op: op_text,
                        operand,
                    }
                }
            }
            IrExprKind::Unary { op, operand } => self.emit_unary(*op, operand, expr),
            IrExprKind::Binary { op, left, right } => self.emit_binary(*op, left, right),
            IrExprKind::Logical { op, left, right } => match op {
                LogicalOp::Coalesce => CsExpr::binary(
                    "??",
                    self.emit_expr_base(left),
                    self.emit_expr_base(right),
                ),
                LogicalOp::And | LogicalOp::Or => self.coerce_condition(expr),
            },
            IrExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => CsExpr::Conditional {
                condition: Box::new(self.coerce_condition(condition)),
                when_true: Box::new(self.emit_expr_base(when_true)),
                when_false: Box::new(self.emit_expr_base(when_false)),
            },
            IrExprKind::Assignment { op, target, value } => {
                let expected = target.inferred_type.clone();
                CsExpr::Assign {
                    op: assign_op_text(*op),
                    target: Box::new(self.emit_expr_base(target)),
                    value: Box::new(self.emit_expr(value, expected.as_ref())),
                }
            }
            IrExprKind::TemplateLiteral(parts) => CsExpr::Interpolated(
                parts
                    .iter()
                    .map(|part| match part {
                        tsonic_ir::IrTemplatePart::Text(text) => CsInterpPart::Text(text.clone()),
                        tsonic_ir::IrTemplatePart::Expr(e) => {
                            CsInterpPart::Expr(self.emit_expr_base(e))
                        }
                    })
                    .collect(),
            ),
            IrExprKind::Spread(inner) => {
                // Array spreads surface through the runtime concat helper.
                self.add_using("Tsonic.Runtime");
                CsExpr::invoke(
                    CsExpr::ident("Tsonic.Runtime.Operators.Spread"),
                    vec![CsArg::plain(self.emit_expr_base(inner))],
                )
            }
            IrExprKind::Await(inner) => CsExpr::Await(Box::new(self.emit_expr_base(inner))),
            IrExprKind::Yield { .. } => {
                // Yields are statement-lowered in generator bodies; one in
                // expression position escaped lowering.
                panic!("ICE: yield expression reached the emitter outside generator lowering");
            }
            IrExprKind::NumericNarrowing { operand, target } => {
                self.emit_narrowing(expr, operand, *target)
            }
            IrExprKind::TypeAssertion { operand, erasable } => {
                if *erasable {
                    return self.emit_expr_base(operand);
                }
                let Some(target) = &expr.inferred_type else {
                    panic!("ICE: type assertion without a target type");
                };
                let target = target.clone();
                let ty = self.cs_type(&target);
                CsExpr::Cast {
                    ty,
                    expr: Box::new(CsExpr::paren(self.emit_expr_base(operand))),
                }
            }
            IrExprKind::TryCast { operand } => {
                let target = expr
                    .inferred_type
                    .as_ref()
                    .map(|t| IrType::strip_nullish(t).0)
                    .unwrap_or_else(IrType::unknown);
                let ty = self.cs_type(&target);
                CsExpr::AsCast {
                    ty,
                    expr: Box::new(self.emit_expr_base(operand)),
                }
            }
            IrExprKind::AsInterface { operand } => {
                let target = expr.inferred_type.clone().unwrap_or_else(IrType::unknown);
                let ty = self.cs_type(&target);
                CsExpr::Cast {
                    ty,
                    expr: Box::new(CsExpr::paren(self.emit_expr_base(operand))),
                }
            }
            IrExprKind::StackAlloc { element, length } => {
                let element = element.clone();
                CsExpr::StackAlloc {
                    ty: self.cs_type(&element),
                    length: Box::new(self.emit_expr_base(length)),
                }
            }
            IrExprKind::DefaultOf => {
                let ty = expr.inferred_type.clone().map(|t| self.cs_type(&t));
                CsExpr::Default(ty)
            }
        }
    }

    // =========================================================================
    // Leaves
    // =========================================================================

    fn emit_literal(&mut self, literal: &IrLiteral, expr: &IrExpr) -> CsExpr {
        match literal {
            IrLiteral::String(value) => CsExpr::Literal(CsLiteral::String(value.clone())),
            IrLiteral::Boolean(value) => CsExpr::Literal(CsLiteral::Bool(*value)),
            IrLiteral::Null | IrLiteral::Undefined => CsExpr::Literal(CsLiteral::Null),
            IrLiteral::Number { raw, .. } => {
                let kind = expr
                    .proof
                    .map(|p| p.kind)
                    .or_else(|| expr.inferred_type.as_ref().and_then(|t| t.numeric_kind()));
                CsExpr::Literal(CsLiteral::Number(number_literal_text(raw, kind)))
            }
        }
    }

    fn identifier_name(&self, ident: &tsonic_ir::IrIdent) -> String {
        if let Some(decl) = ident.decl {
            if let Some(record) = self.handles.decl(decl) {
                // Module-level values carry a dotted qualified name and
                // follow the member naming convention.
                if record.qualified_name.contains('.') {
                    return member_target_name(&ident.name, self.options.naming_convention);
                }
            }
        }
        csharp_identifier(&ident.name)
    }

    fn emit_array(&mut self, elements: &[IrExpr], expr: &IrExpr) -> CsExpr {
        let element_ty = expr.inferred_type.as_ref().and_then(|t| match t.as_ref() {
            IrType::Array(elem) => Some(elem.clone()),
            _ => None,
        });
        let items: Vec<CsExpr> = elements
            .iter()
            .map(|e| self.emit_expr(e, element_ty.as_ref()))
            .collect();
        if items.is_empty() {
            let ty = element_ty.map(|t| self.cs_type(&t));
            CsExpr::NewArray { ty, items }
        } else {
            CsExpr::NewArray { ty: None, items }
        }
    }

    fn emit_object(&mut self, entries: &[tsonic_ir::IrObjectEntry], expr: &IrExpr) -> CsExpr {
        // Nominal expected shapes become object initializers; structural
        // literals stay anonymous.
        let ty = expr.inferred_type.as_ref().and_then(|t| match t.as_ref() {
            IrType::Reference(_) => Some(self.cs_type(t)),
            _ => None,
        });
        let entries = entries
            .iter()
            .filter_map(|entry| match entry {
                tsonic_ir::IrObjectEntry::Property { key, value } => Some((
                    member_target_name(key, self.options.naming_convention),
                    self.emit_expr_base(value),
                )),
                tsonic_ir::IrObjectEntry::Spread(_) => None,
            })
            .collect();
        CsExpr::ObjectInit { ty, entries }
    }

    // =========================================================================
    // Member access and calls
    // =========================================================================

    pub(crate) fn emit_member(&mut self, access: &tsonic_ir::IrMemberAccess) -> CsExpr {
        match &access.member {
            IrMemberKey::Computed(index) => {
                let target = self.emit_expr_base(&access.object);
                let index = self.emit_expr_base(index);
                CsExpr::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                }
            }
            IrMemberKey::Name(name) => {
                let target = self.emit_expr_base(&access.object);
                match &access.binding {
                    Some(binding) => {
                        if let Some((namespace, _)) = binding.external_type.rsplit_once('.') {
                            self.add_using(namespace);
                        }
                        if binding.is_extension {
                            // Instance-style extension call surface.
                            CsExpr::member(target, binding.external_member.clone())
                        } else if matches!(
                            access.object.kind,
                            IrExprKind::Identifier(_) | IrExprKind::Member(_)
                        ) && self.object_is_type_surface(&access.object)
                        {
                            // Static access through the external type.
                            CsExpr::member(
                                CsExpr::Ident(binding.external_type.clone()),
                                binding.external_member.clone(),
                            )
                        } else {
                            CsExpr::member(target, binding.external_member.clone())
                        }
                    }
                    None => CsExpr::member(
                        target,
                        member_target_name(name, self.options.naming_convention),
                    ),
                }
            }
        }
    }

    /// Whether a member-access object denotes a type, not a value.
    fn object_is_type_surface(&self, object: &IrExpr) -> bool {
        match &object.kind {
            IrExprKind::Member(inner) => inner.is_type_reference,
            IrExprKind::Identifier(ident) => {
                // A bound-type identifier has a bound reference type and no
                // local declaration.
                ident.decl.is_none()
                    && matches!(
                        object.inferred_type.as_deref(),
                        Some(IrType::Reference(r)) if r.external.is_some()
                    )
            }
            _ => false,
        }
    }

    fn emit_call(&mut self, call: &tsonic_ir::IrCall) -> CsExpr {
        let target = self.emit_expr_base(&call.callee);
        let type_args: Vec<CsType> = call
            .type_args
            .iter()
            .map(|t| {
                let t = t.clone();
                self.cs_type(&t)
            })
            .collect();
        let args = self.emit_args(
            &call.args,
            call.parameter_types.as_deref(),
            call.argument_passing.as_deref(),
        );
        CsExpr::Invoke {
            target: Box::new(target),
            type_args,
            args,
        }
    }

    fn emit_args(
        &mut self,
        args: &[IrExpr],
        parameter_types: Option<&[TypeRef]>,
        modes: Option<&[ParamMode]>,
    ) -> Vec<CsArg> {
        args.iter()
            .enumerate()
            .map(|(i, arg)| {
                let expected = parameter_types.and_then(|p| p.get(i));
                let modifier = modes
                    .and_then(|m| m.get(i).copied())
                    .filter(|m| *m != ParamMode::Value);
                CsArg {
                    modifier,
                    value: self.emit_expr(arg, expected),
                }
            })
            .collect()
    }

    fn emit_lambda(&mut self, lambda: &tsonic_ir::IrLambda) -> CsExpr {
        let params = lambda
            .params
            .iter()
            .map(|p| CsLambdaParam {
                ty: None,
                name: csharp_identifier(&p.name),
            })
            .collect();
        let body = match &lambda.body {
            IrFunctionBody::Expr(value) => {
                let expected = lambda.return_type.clone();
                CsLambdaBody::Expr(Box::new(self.emit_expr(value, Some(&expected))))
            }
            IrFunctionBody::Block(stmts) => {
                let saved = self.return_is_void;
                self.return_is_void =
                    matches!(lambda.return_type.as_ref(), IrType::Void | IrType::Never);
                let body = stmts.iter().flat_map(|s| self.emit_stmt(s)).collect();
                self.return_is_void = saved;
                CsLambdaBody::Block(body)
            }
        };
        CsExpr::Lambda {
            params,
            body,
            is_async: lambda.is_async,
        }
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn emit_unary(&mut self, op: UnaryOp, operand: &IrExpr, whole: &IrExpr) -> CsExpr {
        match op {
            UnaryOp::Not => CsExpr::Unary {
                op: "!",
                operand: Box::new(CsExpr::paren(self.coerce_condition(operand))),
            },
            UnaryOp::Minus => CsExpr::Unary {
                op: "-",
                operand: Box::new(self.emit_expr_base(operand)),
            },
            UnaryOp::Plus => self.emit_expr_base(operand),
            UnaryOp::BitNot => CsExpr::Unary {
                op: "~",
                operand: Box::new(self.emit_expr_base(operand)),
            },
            UnaryOp::TypeOf => {
                self.add_using("Tsonic.Runtime");
                CsExpr::invoke(
                    CsExpr::ident("Tsonic.Runtime.Operators.TypeOf"),
                    vec![CsArg::plain(self.emit_expr_base(operand))],
                )
            }
            UnaryOp::Delete => {
                self.add_using("Tsonic.Runtime");
                CsExpr::invoke(
                    CsExpr::ident("Tsonic.Runtime.Operators.Delete"),
                    vec![CsArg::plain(self.emit_expr_base(operand))],
                )
            }
            // Expression-position `void e`: an IIFE that evaluates `e` and
            // returns the expected default.
            UnaryOp::Void => {
                let inner = self.emit_expr_base(operand);
                let body_stmt = if inner.is_statement_expression() {
                    crate::cs::CsStmt::Expr(inner)
                } else {
                    crate::cs::CsStmt::Discard(inner)
                };
                let result_ty = whole
                    .inferred_type
                    .clone()
                    .unwrap_or_else(IrType::unknown);
                let cs_result = self.cs_type(&result_ty);
                let lambda = CsExpr::Lambda {
                    params: Vec::new(),
                    body: CsLambdaBody::Block(vec![
                        body_stmt,
                        crate::cs::CsStmt::Return(Some(CsExpr::Default(None))),
                    ]),
                    is_async: false,
                };
                let delegate = CsType::generic("System.Func", vec![cs_result]);
                CsExpr::invoke(
                    CsExpr::paren(CsExpr::Cast {
                        ty: delegate,
                        expr: Box::new(CsExpr::paren(lambda)),
                    }),
                    Vec::new(),
                )
            }
        }
    }

    fn emit_binary(&mut self, op: BinaryOp, left: &IrExpr, right: &IrExpr) -> CsExpr {
        if op == BinaryOp::Pow {
            return CsExpr::invoke(
                CsExpr::ident("System.Math.Pow"),
                vec![
                    CsArg::plain(self.emit_expr_base(left)),
                    CsArg::plain(self.emit_expr_base(right)),
                ],
            );
        }
        if op == BinaryOp::InstanceOf {
            let pattern = match right.inferred_type.as_deref() {
                Some(IrType::Reference(r)) => r
                    .external
                    .clone()
                    .unwrap_or_else(|| csharp_identifier(&r.name)),
                _ => "object".to_string(),
            };
            return CsExpr::IsPattern {
                expr: Box::new(self.emit_expr_base(left)),
                pattern,
            };
        }
        if op == BinaryOp::In {
            let target = self.emit_expr_base(right);
            return CsExpr::invoke(
                CsExpr::member(target, "ContainsKey"),
                vec![CsArg::plain(self.emit_expr_base(left))],
            );
        }
        CsExpr::Binary {
            op: binary_op_text(op),
            left: Box::new(self.emit_expr_base(left)),
            right: Box::new(self.emit_expr_base(right)),
        }
    }

    // =========================================================================
    // Narrowing lowering
    // =========================================================================

    fn emit_narrowing(
        &mut self,
        whole: &IrExpr,
        operand: &IrExpr,
        target: NumericKind,
    ) -> CsExpr {
        let Some(proof) = whole.proof else {
            // The proof pass failed first or never ran; either way this IR
            // must not be emitted.
            panic!("ICE: numeric narrowing without proof reached the emitter");
        };
        // When the operand itself is the proof source (a literal of the
        // target kind), the cast erases.
        if proof.source == ProofSource::Literal {
            if let IrExprKind::Literal(IrLiteral::Number { raw, .. }) = &operand.kind {
                return CsExpr::Literal(CsLiteral::Number(number_literal_text(
                    raw,
                    Some(target),
                )));
            }
        }
        CsExpr::paren(CsExpr::Cast {
            ty: CsType::named(target.cs_keyword()),
            expr: Box::new(CsExpr::paren(self.emit_expr_base(operand))),
        })
    }

    // =========================================================================
    // Boolean-context coercion
    // =========================================================================

    /// Coerce an expression into a C# boolean per source-language
    /// truthiness.
    pub(crate) fn coerce_condition(&mut self, expr: &IrExpr) -> CsExpr {
        // Short-circuit operators coerce each operand, preserving operator
        // precedence with explicit parentheses.
        if let IrExprKind::Logical { op, left, right } = &expr.kind {
            match op {
                LogicalOp::And | LogicalOp::Or => {
                    let op_text = if *op == LogicalOp::And { "&&" } else { "||" };
                    let left = self.coerce_operand(left, *op);
                    let right = self.coerce_operand(right, *op);
                    return CsExpr::Binary {
                        op: op_text,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                LogicalOp::Coalesce => {}
            }
        }
        if let IrExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } = &expr.kind
        {
            return CsExpr::Unary {
                op: "!",
                operand: Box::new(CsExpr::paren(self.coerce_condition(operand))),
            };
        }

        let emitted = self.emit_expr_base(expr);
        let kind = expr
            .proof
            .map(|p| p.kind)
            .or_else(|| expr.inferred_type.as_ref().and_then(|t| t.numeric_kind()));
        match expr.inferred_type.as_deref() {
            Some(IrType::Primitive(Primitive::Boolean)) => emitted,
            Some(IrType::Primitive(Primitive::String)) => CsExpr::Unary {
                op: "!",
                operand: Box::new(CsExpr::invoke(
                    CsExpr::ident("string.IsNullOrEmpty"),
                    vec![CsArg::plain(emitted)],
                )),
            },
            _ if kind.is_some() => numeric_truthiness(emitted, kind.unwrap()),
            // `unknown`, untyped, and non-nullish unions: single-evaluation
            // pattern match on the runtime type.
            _ => truthiness_switch(emitted),
        }
    }

    /// Coerce one operand of a logical operator, parenthesizing nested
    /// logical operators of the other flavor.
    fn coerce_operand(&mut self, operand: &IrExpr, parent: LogicalOp) -> CsExpr {
        let coerced = self.coerce_condition(operand);
        if let IrExprKind::Logical { op, .. } = &operand.kind {
            if *op != parent && matches!(op, LogicalOp::And | LogicalOp::Or) {
                return CsExpr::paren(coerced);
            }
        }
        coerced
    }
}

fn numeric_truthiness(emitted: CsExpr, kind: NumericKind) -> CsExpr {
    let nonzero = CsExpr::binary("!=", emitted.clone(), CsExpr::number("0"));
    if kind.is_integer() {
        return nonzero;
    }
    // Floating kinds also exclude NaN.
    let not_nan = CsExpr::Unary {
        op: "!",
        operand: Box::new(CsExpr::invoke(
            CsExpr::ident("double.IsNaN"),
            vec![CsArg::plain(emitted)],
        )),
    };
    CsExpr::binary("&&", nonzero, not_nan)
}

/// The single-evaluation truthiness pattern for untyped operands.
fn truthiness_switch(subject: CsExpr) -> CsExpr {
    CsExpr::Switch {
        subject: Box::new(subject),
        arms: vec![
            CsSwitchArm {
                pattern: "null".into(),
                value: CsExpr::Literal(CsLiteral::Bool(false)),
            },
            CsSwitchArm {
                pattern: "bool __b".into(),
                value: CsExpr::ident("__b"),
            },
            CsSwitchArm {
                pattern: "string __s".into(),
                value: CsExpr::binary(
                    ">",
                    CsExpr::member(CsExpr::ident("__s"), "Length"),
                    CsExpr::number("0"),
                ),
            },
            CsSwitchArm {
                pattern: "double __d".into(),
                value: CsExpr::binary(
                    "&&",
                    CsExpr::binary("!=", CsExpr::ident("__d"), CsExpr::number("0")),
                    CsExpr::Unary {
                        op: "!",
                        operand: Box::new(CsExpr::invoke(
                            CsExpr::ident("double.IsNaN"),
                            vec![CsArg::plain(CsExpr::ident("__d"))],
                        )),
                    },
                ),
            },
            CsSwitchArm {
                pattern: "int __i".into(),
                value: CsExpr::binary("!=", CsExpr::ident("__i"), CsExpr::number("0")),
            },
            CsSwitchArm {
                pattern: "_".into(),
                value: CsExpr::Literal(CsLiteral::Bool(true)),
            },
        ],
    }
}

/// Render a numeric literal with the suffix its proven kind requires.
fn number_literal_text(raw: &str, kind: Option<NumericKind>) -> String {
    let cleaned: String = raw.chars().filter(|&c| c != '_').collect();
    match kind {
        Some(NumericKind::Int64) => format!("{cleaned}L"),
        Some(NumericKind::UInt64) => format!("{cleaned}UL"),
        Some(NumericKind::UInt32) => format!("{cleaned}U"),
        Some(NumericKind::Single) => format!("{cleaned}f"),
        Some(NumericKind::Decimal) => format!("{cleaned}m"),
        Some(NumericKind::Double) if !cleaned.contains('.') && !cleaned.contains('e') => {
            // An integral lexeme proven Double still reads as a double.
            if cleaned.starts_with("0x") || cleaned.starts_with("0b") || cleaned.starts_with("0o") {
                cleaned
            } else {
                format!("{cleaned}d")
            }
        }
        _ => cleaned,
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Pow => unreachable!("Pow lowers to System.Math.Pow"),
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::UShr => ">>>",
        BinaryOp::Eq | BinaryOp::StrictEq => "==",
        BinaryOp::NotEq | BinaryOp::StrictNotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::InstanceOf | BinaryOp::In => unreachable!("lowered before operator mapping"),
    }
}

fn assign_op_text(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::AddAssign => "+=",
        AssignOp::SubAssign => "-=",
        AssignOp::MulAssign => "*=",
        AssignOp::DivAssign => "/=",
        AssignOp::RemAssign => "%=",
        AssignOp::AndAssign => "&&=",
        AssignOp::OrAssign => "||=",
        AssignOp::CoalesceAssign => "??=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsonic_common::CompilerOptions;
    use tsonic_ir::{HandleRegistry, IrIdent, NumericProof};

    fn with_emitter<R>(f: impl FnOnce(&mut Emitter<'_>) -> R) -> R {
        let handles = HandleRegistry::new();
        let options = CompilerOptions::default();
        let mut emitter = Emitter::new(&handles, &options);
        f(&mut emitter)
    }

    fn ident(name: &str, ty: tsonic_ir::TypeRef) -> IrExpr {
        IrExpr::typed(
            IrExprKind::Identifier(IrIdent {
                name: name.into(),
                decl: None,
            }),
            ty,
        )
    }

    #[test]
    fn integer_truthiness_is_nonzero_check() {
        let cond = with_emitter(|e| {
            e.coerce_condition(&ident("a", IrType::primitive(Primitive::Int)))
        });
        assert_eq!(
            cond,
            CsExpr::binary("!=", CsExpr::ident("a"), CsExpr::number("0"))
        );
    }

    #[test]
    fn floating_truthiness_excludes_nan() {
        let cond = with_emitter(|e| e.coerce_condition(&ident("x", IrType::number())));
        let CsExpr::Binary { op: "&&", right, .. } = cond else {
            panic!("expected && with NaN check, got something else");
        };
        assert!(matches!(*right, CsExpr::Unary { op: "!", .. }));
    }

    #[test]
    fn string_truthiness_is_null_or_empty_check() {
        let cond = with_emitter(|e| e.coerce_condition(&ident("s", IrType::string())));
        let CsExpr::Unary { op: "!", operand } = cond else {
            panic!("expected negated IsNullOrEmpty");
        };
        assert!(matches!(*operand, CsExpr::Invoke { .. }));
    }

    #[test]
    fn untyped_truthiness_uses_pattern_switch() {
        let cond = with_emitter(|e| e.coerce_condition(&ident("u", IrType::unknown())));
        let CsExpr::Switch { arms, .. } = cond else {
            panic!("expected switch expression");
        };
        assert_eq!(arms[0].pattern, "null");
        assert_eq!(arms.last().unwrap().pattern, "_");
    }

    #[test]
    fn boolean_operand_passes_through() {
        let cond = with_emitter(|e| e.coerce_condition(&ident("b", IrType::boolean())));
        assert_eq!(cond, CsExpr::Ident("b".into()));
    }

    #[test]
    fn erasable_assertion_emits_no_cast() {
        let inner = ident("x", IrType::number());
        let assertion = IrExpr::typed(
            IrExprKind::TypeAssertion {
                operand: Box::new(inner),
                erasable: true,
            },
            IrType::unknown(),
        );
        let emitted = with_emitter(|e| e.emit_expr_base(&assertion));
        assert_eq!(emitted, CsExpr::Ident("x".into()));
    }

    #[test]
    fn proven_literal_narrowing_erases_the_cast() {
        let literal = IrExpr::typed(
            IrExprKind::Literal(IrLiteral::Number {
                value: 5.0,
                raw: "5".into(),
            }),
            IrType::primitive(Primitive::Long),
        );
        let mut narrowing = IrExpr::typed(
            IrExprKind::NumericNarrowing {
                operand: Box::new(literal),
                target: NumericKind::Int64,
            },
            IrType::primitive(Primitive::Long),
        );
        narrowing.proof = Some(NumericProof::literal(NumericKind::Int64));
        let emitted = with_emitter(|e| e.emit_expr_base(&narrowing));
        assert_eq!(emitted, CsExpr::Literal(CsLiteral::Number("5L".into())));
    }

    #[test]
    fn proven_expression_narrowing_emits_a_cast() {
        let mut operand = ident("n", IrType::primitive(Primitive::Int));
        operand.proof = Some(NumericProof::new(
            NumericKind::Int32,
            tsonic_ir::ProofSource::Expression,
        ));
        let mut narrowing = IrExpr::typed(
            IrExprKind::NumericNarrowing {
                operand: Box::new(operand),
                target: NumericKind::Int64,
            },
            IrType::primitive(Primitive::Long),
        );
        narrowing.proof = Some(NumericProof::new(
            NumericKind::Int64,
            tsonic_ir::ProofSource::Narrowing,
        ));
        let emitted = with_emitter(|e| e.emit_expr_base(&narrowing));
        let CsExpr::Paren(inner) = emitted else {
            panic!("expected parenthesized cast");
        };
        assert!(matches!(*inner, CsExpr::Cast { .. }));
    }

    #[test]
    #[should_panic(expected = "ICE")]
    fn proofless_narrowing_is_an_internal_error() {
        let narrowing = IrExpr::typed(
            IrExprKind::NumericNarrowing {
                operand: Box::new(ident("n", IrType::number())),
                target: NumericKind::Int32,
            },
            IrType::primitive(Primitive::Int),
        );
        with_emitter(|e| e.emit_expr_base(&narrowing));
    }

    #[test]
    fn literal_suffixes_follow_kind() {
        assert_eq!(number_literal_text("5", Some(NumericKind::Int64)), "5L");
        assert_eq!(number_literal_text("5", Some(NumericKind::Int32)), "5");
        assert_eq!(number_literal_text("1.5", Some(NumericKind::Single)), "1.5f");
        assert_eq!(number_literal_text("1_000", Some(NumericKind::Int32)), "1000");
    }
}
