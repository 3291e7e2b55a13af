//! The numeric proof pass.
//!
//! Walks the IR after lowering and attaches a `NumericProof` to every
//! expression whose CLR numeric kind it can establish. Narrowings must be
//! proven or the pass diagnoses; computed accesses classified as CLR
//! indexers require an `Int32`-proven index. Proven kinds propagate through
//! variable declarations, so `let i = 0;` makes a later `arr[i]` sound.

use rustc_hash::FxHashMap;
use tracing::trace;
use tsonic_common::diagnostics::codes;
use tsonic_common::numeric::{is_integer_lexeme, is_js_safe_integer, parse_integer_lexeme};
use tsonic_common::{DiagnosticSink, NumericKind};
use tsonic_ir::{
    AccessKind, BinaryOp, DeclId, IrClassMember, IrExpr, IrExprKind, IrFunctionBody, IrLiteral,
    IrMemberKey, IrProgram, IrStmt, IrStmtKind, NumericProof, ProofSource, UnaryOp,
};

/// Run the proof pass over a whole program.
pub fn run_numeric_proof_pass(program: &mut IrProgram, sink: &mut DiagnosticSink) {
    let mut pass = ProofPass {
        env: FxHashMap::default(),
        sink,
    };
    for module in program.modules.values_mut() {
        for stmt in &mut module.body {
            pass.prove_stmt(stmt);
        }
    }
}

struct ProofPass<'s> {
    /// Declarations whose values carry a proven kind.
    env: FxHashMap<DeclId, NumericKind>,
    sink: &'s mut DiagnosticSink,
}

impl<'s> ProofPass<'s> {
    // =========================================================================
    // Statements
    // =========================================================================

    fn prove_stmt(&mut self, stmt: &mut IrStmt) {
        match &mut stmt.kind {
            IrStmtKind::Expr(expr) => self.prove_expr(expr),
            IrStmtKind::Var(decl) => {
                if let Some(init) = &mut decl.init {
                    self.prove_expr(init);
                    if let Some(proof) = init.proof {
                        trace!(name = %decl.name, kind = %proof.kind, "variable proven");
                        self.env.insert(decl.decl, proof.kind);
                    }
                } else if let Some(kind) = decl.declared_type.numeric_kind() {
                    self.env.insert(decl.decl, kind);
                }
            }
            IrStmtKind::Func(func) => {
                self.seed_params(&func.params);
                for stmt in &mut func.body {
                    self.prove_stmt(stmt);
                }
            }
            IrStmtKind::Class(class) => {
                for member in &mut class.members {
                    match member {
                        IrClassMember::Property { init: Some(init), .. } => self.prove_expr(init),
                        IrClassMember::Property { .. } => {}
                        IrClassMember::Method { params, body, .. } => {
                            self.seed_params(params);
                            for stmt in body {
                                self.prove_stmt(stmt);
                            }
                        }
                        IrClassMember::Constructor { params, body } => {
                            self.seed_params(params);
                            for stmt in body {
                                self.prove_stmt(stmt);
                            }
                        }
                    }
                }
            }
            IrStmtKind::Enum(decl) => {
                for member in &mut decl.members {
                    if let Some(value) = &mut member.value {
                        self.prove_expr(value);
                    }
                }
            }
            IrStmtKind::Interface(_) | IrStmtKind::TypeAlias(_) => {}
            IrStmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.prove_stmt(stmt);
                }
            }
            IrStmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.prove_expr(condition);
                self.prove_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.prove_stmt(else_branch);
                }
            }
            IrStmtKind::While { condition, body } => {
                self.prove_expr(condition);
                self.prove_stmt(body);
            }
            IrStmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.prove_stmt(init);
                }
                if let Some(condition) = condition {
                    self.prove_expr(condition);
                }
                if let Some(update) = update {
                    self.prove_expr(update);
                }
                self.prove_stmt(body);
            }
            IrStmtKind::ForOf {
                binding_decl,
                element_type,
                iterable,
                body,
                ..
            } => {
                self.prove_expr(iterable);
                if let Some(kind) = element_type.numeric_kind() {
                    self.env.insert(*binding_decl, kind);
                }
                self.prove_stmt(body);
            }
            IrStmtKind::Switch {
                discriminant,
                cases,
            } => {
                self.prove_expr(discriminant);
                for case in cases {
                    if let Some(test) = &mut case.test {
                        self.prove_expr(test);
                    }
                    for stmt in &mut case.body {
                        self.prove_stmt(stmt);
                    }
                }
            }
            IrStmtKind::Try {
                block,
                catch,
                finally,
            } => {
                for stmt in block {
                    self.prove_stmt(stmt);
                }
                if let Some(catch) = catch {
                    for stmt in &mut catch.body {
                        self.prove_stmt(stmt);
                    }
                }
                if let Some(finally) = finally {
                    for stmt in finally {
                        self.prove_stmt(stmt);
                    }
                }
            }
            IrStmtKind::Return(Some(expr)) => self.prove_expr(expr),
            IrStmtKind::Throw(expr) => self.prove_expr(expr),
            IrStmtKind::Return(None) | IrStmtKind::Break | IrStmtKind::Continue => {}
        }
    }

    fn seed_params(&mut self, params: &[tsonic_ir::IrParameter]) {
        for param in params {
            if let Some(kind) = param.ty.numeric_kind() {
                self.env.insert(param.decl, kind);
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn prove_expr(&mut self, expr: &mut IrExpr) {
        // Children first; joins and narrowings need operand proofs.
        match &mut expr.kind {
            IrExprKind::Array(elements) => {
                for e in elements {
                    self.prove_expr(e);
                }
            }
            IrExprKind::Object(entries) => {
                for entry in entries {
                    match entry {
                        tsonic_ir::IrObjectEntry::Property { value, .. } => self.prove_expr(value),
                        tsonic_ir::IrObjectEntry::Spread(inner) => self.prove_expr(inner),
                    }
                }
            }
            IrExprKind::Member(access) => {
                self.prove_expr(&mut access.object);
                if let IrMemberKey::Computed(index) = &mut access.member {
                    self.prove_expr(index);
                }
            }
            IrExprKind::Call(call) => {
                self.prove_expr(&mut call.callee);
                for arg in &mut call.args {
                    self.prove_expr(arg);
                }
            }
            IrExprKind::New(new) => {
                for arg in &mut new.args {
                    self.prove_expr(arg);
                }
            }
            IrExprKind::Lambda(lambda) => {
                self.seed_params(&lambda.params);
                match &mut lambda.body {
                    IrFunctionBody::Expr(body) => self.prove_expr(body),
                    IrFunctionBody::Block(stmts) => {
                        for stmt in stmts {
                            self.prove_stmt(stmt);
                        }
                    }
                }
            }
            IrExprKind::Update { target, .. } => self.prove_expr(target),
            IrExprKind::Unary { operand, .. } => self.prove_expr(operand),
            IrExprKind::Binary { left, right, .. } => {
                self.prove_expr(left);
                self.prove_expr(right);
            }
            IrExprKind::Logical { left, right, .. } => {
                self.prove_expr(left);
                self.prove_expr(right);
            }
            IrExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                self.prove_expr(condition);
                self.prove_expr(when_true);
                self.prove_expr(when_false);
            }
            IrExprKind::Assignment { target, value, .. } => {
                self.prove_expr(target);
                self.prove_expr(value);
            }
            IrExprKind::TemplateLiteral(parts) => {
                for part in parts {
                    if let tsonic_ir::IrTemplatePart::Expr(e) = part {
                        self.prove_expr(e);
                    }
                }
            }
            IrExprKind::Spread(inner)
            | IrExprKind::Await(inner)
            | IrExprKind::TryCast { operand: inner }
            | IrExprKind::AsInterface { operand: inner } => self.prove_expr(inner),
            IrExprKind::TypeAssertion { operand, .. } => self.prove_expr(operand),
            IrExprKind::NumericNarrowing { operand, .. } => self.prove_expr(operand),
            IrExprKind::StackAlloc { length, .. } => self.prove_expr(length),
            IrExprKind::Yield { value, .. } => {
                if let Some(value) = value {
                    self.prove_expr(value);
                }
            }
            IrExprKind::Literal(_)
            | IrExprKind::Identifier(_)
            | IrExprKind::This
            | IrExprKind::DefaultOf => {}
        }

        expr.proof = self.proof_of(expr);
        self.check_expr(expr);
    }

    /// Derive the proof for an expression whose children are already
    /// proven.
    fn proof_of(&self, expr: &IrExpr) -> Option<NumericProof> {
        match &expr.kind {
            IrExprKind::Literal(IrLiteral::Number { raw, .. }) => {
                let lexeme_kind = literal_kind(raw)?;
                // A literal typed by its context keeps the wider kind when
                // the lexeme fits it.
                let typed_kind = expr
                    .inferred_type
                    .as_ref()
                    .and_then(|t| t.numeric_kind())
                    .filter(|k| literal_fits(raw, *k));
                Some(NumericProof::literal(typed_kind.unwrap_or(lexeme_kind)))
            }
            IrExprKind::Identifier(ident) => {
                if let Some(decl) = ident.decl {
                    if let Some(kind) = self.env.get(&decl) {
                        return Some(NumericProof::new(*kind, ProofSource::Variable(decl)));
                    }
                }
                expr.inferred_type
                    .as_ref()
                    .and_then(|t| t.numeric_kind())
                    .map(|k| NumericProof::new(k, ProofSource::Expression))
            }
            IrExprKind::NumericNarrowing { operand, target } => {
                self.narrowing_proof(expr, operand, *target)
            }
            IrExprKind::Binary { op, left, right } => {
                if !is_arithmetic(*op) {
                    return None;
                }
                let lk = left.proof?.kind;
                let rk = right.proof?.kind;
                let joined = NumericKind::join(lk, rk)?;
                Some(NumericProof::new(joined, ProofSource::Expression))
            }
            IrExprKind::Unary { op, operand } => match op {
                UnaryOp::Minus | UnaryOp::Plus | UnaryOp::BitNot => operand
                    .proof
                    .map(|p| NumericProof::new(p.kind, ProofSource::Expression)),
                _ => None,
            },
            IrExprKind::Update { target, .. } => target
                .proof
                .map(|p| NumericProof::new(p.kind, ProofSource::Expression)),
            IrExprKind::Conditional {
                when_true,
                when_false,
                ..
            } => {
                let tk = when_true.proof?.kind;
                let fk = when_false.proof?.kind;
                (tk == fk).then(|| NumericProof::new(tk, ProofSource::Expression))
            }
            // Member access, calls, and everything else derive a proof from
            // their inferred type alone.
            _ => expr
                .inferred_type
                .as_ref()
                .and_then(|t| t.numeric_kind())
                .map(|k| NumericProof::new(k, ProofSource::Expression)),
        }
    }

    /// Prove `expr as <kind>`; diagnoses on failure.
    fn narrowing_proof(
        &self,
        _whole: &IrExpr,
        operand: &IrExpr,
        target: NumericKind,
    ) -> Option<NumericProof> {
        // Constant literals get exact range/precision checks.
        if let IrExprKind::Literal(IrLiteral::Number { raw, .. }) = &operand.kind {
            return self.prove_literal_narrowing(raw, target);
        }
        match operand.proof {
            Some(proof) if proof.kind == target || proof.kind.widens_to(target) => {
                Some(NumericProof::new(target, ProofSource::Narrowing))
            }
            _ => None,
        }
    }

    fn prove_literal_narrowing(&self, raw: &str, target: NumericKind) -> Option<NumericProof> {
        if !is_integer_lexeme(raw) {
            if target.is_integer() {
                return None;
            }
            return Some(NumericProof::literal(target));
        }
        let value = parse_integer_lexeme(raw)?;
        if !target.contains(value) {
            return None;
        }
        // 64-bit targets additionally require the value to survive the
        // JavaScript double round-trip.
        if matches!(target, NumericKind::Int64 | NumericKind::UInt64) && !is_js_safe_integer(value)
        {
            return None;
        }
        Some(NumericProof::literal(target))
    }

    /// Post-proof validation: narrowing failures and indexer soundness.
    fn check_expr(&mut self, expr: &IrExpr) {
        match &expr.kind {
            IrExprKind::NumericNarrowing { operand, target } => {
                if expr.proof.is_some() {
                    return;
                }
                // Pick the sharpest diagnostic available.
                if let IrExprKind::Literal(IrLiteral::Number { raw, .. }) = &operand.kind {
                    let target_name = target.to_string();
                    if !is_integer_lexeme(raw) && target.is_integer() {
                        self.sink.report(
                            &codes::FLOAT_TO_INTEGER_NARROWING,
                            &[raw.as_str(), target_name.as_str()],
                            None,
                        );
                        return;
                    }
                    if let Some(value) = parse_integer_lexeme(raw) {
                        if !target.contains(value) {
                            self.sink.report(
                                &codes::NUMERIC_OVERFLOW,
                                &[raw.as_str(), target_name.as_str()],
                                None,
                            );
                            return;
                        }
                        if matches!(target, NumericKind::Int64 | NumericKind::UInt64)
                            && !is_js_safe_integer(value)
                        {
                            self.sink.report(
                                &codes::UNSAFE_INT64_LITERAL,
                                &[raw.as_str(), target_name.as_str()],
                                None,
                            );
                            return;
                        }
                    }
                }
                let target_name = target.to_string();
                self.sink
                    .report(&codes::UNPROVABLE_NARROWING, &[target_name.as_str()], None);
            }
            IrExprKind::Member(access) => {
                let Some(kind) = access.access_kind else {
                    return;
                };
                let IrMemberKey::Computed(index) = &access.member else {
                    return;
                };
                match kind {
                    AccessKind::ClrIndexer | AccessKind::StringChar => {
                        let proven_int32 =
                            index.proof.is_some_and(|p| p.kind == NumericKind::Int32);
                        if !proven_int32 {
                            let found = index
                                .proof
                                .map(|p| p.kind.to_string())
                                .or_else(|| {
                                    index.inferred_type.as_ref().map(|t| t.to_string())
                                })
                                .unwrap_or_else(|| "unknown".to_string());
                            self.sink.report(&codes::INDEX_NOT_INT32, &[found.as_str()], None);
                        }
                    }
                    AccessKind::Dictionary => {}
                    AccessKind::Unknown => {
                        self.sink
                            .report(&codes::INDEX_NOT_INT32, &["unknown"], None);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Kind of a bare literal lexeme: `Int32`-range integers, `Int64`-range
/// integers, doubles otherwise.
fn literal_kind(raw: &str) -> Option<NumericKind> {
    if is_integer_lexeme(raw) {
        let value = parse_integer_lexeme(raw)?;
        if NumericKind::Int32.contains(value) {
            return Some(NumericKind::Int32);
        }
        if NumericKind::Int64.contains(value) {
            return Some(NumericKind::Int64);
        }
        return Some(NumericKind::Double);
    }
    Some(NumericKind::Double)
}

fn literal_fits(raw: &str, kind: NumericKind) -> bool {
    if !is_integer_lexeme(raw) {
        return !kind.is_integer();
    }
    match parse_integer_lexeme(raw) {
        Some(value) => kind.contains(value),
        None => false,
    }
}

fn is_arithmetic(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Pow
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::UShr
    )
}
