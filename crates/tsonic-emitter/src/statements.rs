//! Statement emission.
//!
//! Single IR statements may lower to several C# statements: returns in
//! void functions split into evaluate-then-return, statement-position
//! `void e` becomes a discard, and generator yields become exchange-object
//! stores followed by `yield return`.

use tsonic_ir::{IrExpr, IrExprKind, IrStmt, IrStmtKind, TypePredicate, UnaryOp};
use tsonic_passes::csharp_identifier;

use crate::cs::{CsCatch, CsExpr, CsStmt, CsSwitchSection, CsType};
use crate::emitter::Emitter;

/// Name of the generator exchange local.
pub(crate) const EXCHANGE_LOCAL: &str = "__exchange";

impl<'a> Emitter<'a> {
    pub(crate) fn emit_stmts(&mut self, stmts: &[IrStmt]) -> Vec<CsStmt> {
        stmts.iter().flat_map(|s| self.emit_stmt(s)).collect()
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &IrStmt) -> Vec<CsStmt> {
        match &stmt.kind {
            IrStmtKind::Expr(expr) => self.emit_expr_stmt(expr),
            IrStmtKind::Var(decl) => {
                // Bidirectional generators: `const x = yield v` reads the
                // exchange input after resumption.
                if let Some(init) = &decl.init {
                    if let IrExprKind::Yield { value, delegate } = &init.kind {
                        let mut out = self.emit_yield(value.as_deref(), *delegate);
                        out.push(CsStmt::Local {
                            ty: None,
                            name: csharp_identifier(&decl.name),
                            init: Some(CsExpr::member(CsExpr::ident(EXCHANGE_LOCAL), "Input")),
                        });
                        return out;
                    }
                }
                let ty = self.cs_type(&decl.declared_type);
                let init = decl
                    .init
                    .as_ref()
                    .map(|e| self.emit_expr(e, Some(&decl.declared_type)));
                vec![CsStmt::Local {
                    ty: Some(ty),
                    name: csharp_identifier(&decl.name),
                    init,
                }]
            }
            // Local function declarations do not survive lowering to C#
            // statement position; module-level ones are emitted as members.
            IrStmtKind::Func(_)
            | IrStmtKind::Class(_)
            | IrStmtKind::Interface(_)
            | IrStmtKind::Enum(_)
            | IrStmtKind::TypeAlias(_) => Vec::new(),
            IrStmtKind::Block(stmts) => vec![CsStmt::Block(self.emit_stmts(stmts))],
            IrStmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.coerce_condition(condition);
                // Type-predicate calls narrow their argument inside the
                // then-branch.
                let narrowed = narrowed_binding(condition);
                if let Some(name) = &narrowed {
                    self.narrowed.insert(name.clone());
                }
                let then_branch = self.emit_stmt(then_branch);
                if let Some(name) = &narrowed {
                    self.narrowed.remove(name);
                }
                let else_branch = else_branch.as_ref().map(|s| self.emit_stmt(s));
                vec![CsStmt::If {
                    condition: cond,
                    then_branch,
                    else_branch,
                }]
            }
            IrStmtKind::While { condition, body } => {
                let condition = self.coerce_condition(condition);
                let body = self.emit_stmt(body);
                vec![CsStmt::While { condition, body }]
            }
            IrStmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let init = init.as_ref().and_then(|s| {
                    let mut lowered = self.emit_stmt(s);
                    (lowered.len() == 1).then(|| Box::new(lowered.remove(0)))
                });
                let condition = condition.as_ref().map(|c| self.coerce_condition(c));
                let update = update.as_ref().map(|u| self.emit_expr_base(u));
                let body = self.emit_stmt(body);
                vec![CsStmt::For {
                    init,
                    condition,
                    update,
                    body,
                }]
            }
            IrStmtKind::ForOf {
                binding,
                element_type,
                iterable,
                body,
                ..
            } => {
                let ty = self.cs_type(element_type);
                let iterable = self.emit_expr_base(iterable);
                let body = self.emit_stmt(body);
                vec![CsStmt::Foreach {
                    ty: Some(ty),
                    name: csharp_identifier(binding),
                    iterable,
                    body,
                }]
            }
            IrStmtKind::Switch {
                discriminant,
                cases,
            } => {
                let subject = self.emit_expr_base(discriminant);
                let sections = cases
                    .iter()
                    .map(|case| CsSwitchSection {
                        label: case.test.as_ref().map(|t| self.emit_expr_base(t)),
                        body: self.emit_stmts(&case.body),
                    })
                    .collect();
                vec![CsStmt::Switch { subject, sections }]
            }
            IrStmtKind::Try {
                block,
                catch,
                finally,
            } => {
                let block = self.emit_stmts(block);
                let catch = catch.as_ref().map(|c| CsCatch {
                    ty: Some(CsType::named("System.Exception")),
                    binding: c.binding.as_ref().map(|b| csharp_identifier(b)),
                    body: self.emit_stmts(&c.body),
                });
                let finally = finally.as_ref().map(|f| self.emit_stmts(f));
                vec![CsStmt::Try {
                    block,
                    catch,
                    finally,
                }]
            }
            IrStmtKind::Return(value) => self.emit_return(value.as_ref()),
            IrStmtKind::Throw(expr) => vec![CsStmt::Throw(self.emit_expr_base(expr))],
            IrStmtKind::Break => vec![CsStmt::Break],
            IrStmtKind::Continue => vec![CsStmt::Continue],
        }
    }

    // =========================================================================
    // Expression statements
    // =========================================================================

    fn emit_expr_stmt(&mut self, expr: &IrExpr) -> Vec<CsStmt> {
        match &expr.kind {
            IrExprKind::Yield { value, delegate } => {
                self.emit_yield(value.as_deref(), *delegate)
            }
            // Statement-position `void e`: evaluate for effect, discarding
            // unless `e` already stands as a statement.
            IrExprKind::Unary {
                op: UnaryOp::Void,
                operand,
            } => {
                let inner = self.emit_expr_base(operand);
                if inner.is_statement_expression() {
                    vec![CsStmt::Expr(inner)]
                } else {
                    vec![CsStmt::Discard(inner)]
                }
            }
            _ => {
                let emitted = self.emit_expr_base(expr);
                if emitted.is_statement_expression() {
                    vec![CsStmt::Expr(emitted)]
                } else {
                    vec![CsStmt::Discard(emitted)]
                }
            }
        }
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// `return e;` in a void/never function evaluates `e` first and then
    /// returns bare.
    fn emit_return(&mut self, value: Option<&IrExpr>) -> Vec<CsStmt> {
        match value {
            Some(value) if self.return_is_void => {
                let mut out = self.emit_expr_stmt(value);
                out.push(CsStmt::Return(None));
                out
            }
            Some(value) => {
                let expected = self.return_type.clone();
                vec![CsStmt::Return(Some(self.emit_expr(value, expected.as_ref())))]
            }
            None => vec![CsStmt::Return(None)],
        }
    }

    // =========================================================================
    // Generators
    // =========================================================================

    /// `yield v` stores into the exchange object and yields it; `yield* e`
    /// drains the delegated iterator through the same exchange.
    fn emit_yield(&mut self, value: Option<&IrExpr>, delegate: bool) -> Vec<CsStmt> {
        if !self.in_generator {
            panic!("ICE: yield outside a generator body");
        }
        if delegate {
            let iterable = value
                .map(|v| self.emit_expr_base(v))
                .unwrap_or(CsExpr::Literal(crate::cs::CsLiteral::Null));
            return vec![CsStmt::Foreach {
                ty: None,
                name: "__item".into(),
                iterable,
                body: vec![
                    CsStmt::Expr(CsExpr::Assign {
                        op: "=",
                        target: Box::new(CsExpr::member(
                            CsExpr::ident(EXCHANGE_LOCAL),
                            "Value",
                        )),
                        value: Box::new(CsExpr::ident("__item")),
                    }),
                    CsStmt::YieldReturn(CsExpr::ident(EXCHANGE_LOCAL)),
                ],
            }];
        }
        let stored = value
            .map(|v| self.emit_expr_base(v))
            .unwrap_or(CsExpr::Default(None));
        vec![
            CsStmt::Expr(CsExpr::Assign {
                op: "=",
                target: Box::new(CsExpr::member(CsExpr::ident(EXCHANGE_LOCAL), "Value")),
                value: Box::new(stored),
            }),
            CsStmt::YieldReturn(CsExpr::ident(EXCHANGE_LOCAL)),
        ]
    }
}

/// The narrowed identifier of a type-predicate guard condition, if any.
fn narrowed_binding(condition: &IrExpr) -> Option<String> {
    if let IrExprKind::Call(call) = &condition.kind {
        let TypePredicate {
            parameter_index, ..
        } = call.narrowing.as_ref()?;
        let arg = call.args.get(*parameter_index)?;
        return arg.root_identifier().map(|s| s.to_string());
    }
    // `x != null` and `x !== undefined` guards narrow `x` too.
    if let IrExprKind::Binary { op, left, right } = &condition.kind {
        use tsonic_ir::BinaryOp;
        if matches!(op, BinaryOp::NotEq | BinaryOp::StrictNotEq) {
            let is_nullish = |e: &IrExpr| {
                matches!(
                    e.kind,
                    IrExprKind::Literal(tsonic_ir::IrLiteral::Null)
                        | IrExprKind::Literal(tsonic_ir::IrLiteral::Undefined)
                )
            };
            if is_nullish(right) {
                return left.root_identifier().map(|s| s.to_string());
            }
            if is_nullish(left) {
                return right.root_identifier().map(|s| s.to_string());
            }
        }
    }
    None
}
