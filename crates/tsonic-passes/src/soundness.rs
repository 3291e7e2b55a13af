//! The IR soundness gate.
//!
//! Final validation before emission. The gate refuses IR containing:
//! - the `any` type, anywhere,
//! - reference types that resolve to nothing (not a builtin, not a local
//!   declaration, not a type parameter in scope, not externally bound),
//! - parameter modifiers expressed as reference types instead of the
//!   `IrParameter.passing` field.
//!
//! Any error here means the emitter must not run.

use rustc_hash::FxHashSet;
use tsonic_common::diagnostics::codes;
use tsonic_common::DiagnosticSink;
use tsonic_ir::{
    IrClassMember, IrExpr, IrExprKind, IrFunctionBody, IrInterfaceMember, IrMemberKey, IrModule,
    IrProgram, IrStmt, IrStmtKind, IrType, TypeRef,
};
use tsonic_types::NominalEnv;

/// Type names usable without declaration or binding.
const BUILTIN_TYPE_NAMES: &[&str] = &[
    "Array",
    "ReadonlyArray",
    "Record",
    "Map",
    "Promise",
    "Task",
    "Iterable",
    "Iterator",
    "Error",
    "Exception",
    "ExtensionMethods",
];

/// Run the gate. Returns `true` when the IR is sound and emission may
/// proceed.
pub fn run_soundness_gate(
    program: &IrProgram,
    nominal: &NominalEnv,
    sink: &mut DiagnosticSink,
) -> bool {
    let before = sink.error_count();
    let mut gate = Gate {
        nominal,
        sink,
        type_params: Vec::new(),
    };
    for module in program.iter() {
        gate.check_module(module);
    }
    sink.error_count() == before
}

struct Gate<'e> {
    nominal: &'e NominalEnv,
    sink: &'e mut DiagnosticSink,
    type_params: Vec<Vec<String>>,
}

impl<'e> Gate<'e> {
    fn check_module(&mut self, module: &IrModule) {
        for stmt in &module.body {
            self.check_stmt(stmt);
        }
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn check_type(&mut self, ty: &TypeRef, context: &str) {
        if ty.contains_any() {
            self.sink.report(&codes::ANY_AT_EMIT, &[context], None);
        }
        self.check_references(ty, context);
    }

    fn check_references(&mut self, ty: &TypeRef, context: &str) {
        let mut visited = FxHashSet::default();
        self.check_references_inner(ty, context, &mut visited);
    }

    fn check_references_inner(
        &mut self,
        ty: &TypeRef,
        context: &str,
        visited: &mut FxHashSet<*const IrType>,
    ) {
        if !visited.insert(std::sync::Arc::as_ptr(ty)) {
            return;
        }
        match ty.as_ref() {
            IrType::Reference(r) => {
                if tsonic_common::ParamMode::from_keyword(&r.name)
                    .is_some_and(|m| m != tsonic_common::ParamMode::Value)
                {
                    self.sink.report(&codes::MODIFIER_AS_TYPE, &[r.name.as_str()], None);
                    return;
                }
                let resolved = r.external.is_some()
                    || BUILTIN_TYPE_NAMES.contains(&r.name.as_str())
                    || tsonic_common::NumericKind::from_alias(&r.name).is_some()
                    || self.nominal.resolve_name(&r.name).is_some()
                    || self.in_scope_type_param(&r.name)
                    || tsonic_bindings_bucket(&r.name);
                if !resolved {
                    self.sink
                        .report(&codes::UNRESOLVED_REFERENCE, &[r.name.as_str()], None);
                }
                for arg in &r.type_args {
                    self.check_references_inner(arg, context, visited);
                }
            }
            IrType::Array(elem) => self.check_references_inner(elem, context, visited),
            IrType::Tuple(elems) => {
                for e in elems {
                    self.check_references_inner(e, context, visited);
                }
            }
            IrType::Union(members) | IrType::Intersection(members) => {
                for m in members {
                    self.check_references_inner(m, context, visited);
                }
            }
            IrType::Dictionary { key, value } => {
                self.check_references_inner(key, context, visited);
                self.check_references_inner(value, context, visited);
            }
            IrType::Function(f) => {
                for p in &f.params {
                    self.check_references_inner(&p.ty, context, visited);
                }
                self.check_references_inner(&f.return_type, context, visited);
            }
            IrType::Object(members) => {
                for m in members {
                    match m {
                        tsonic_ir::StructuralMember::Property { ty, .. } => {
                            self.check_references_inner(ty, context, visited)
                        }
                        tsonic_ir::StructuralMember::Method { function, .. } => {
                            for p in &function.params {
                                self.check_references_inner(&p.ty, context, visited);
                            }
                            self.check_references_inner(&function.return_type, context, visited);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn in_scope_type_param(&self, name: &str) -> bool {
        self.type_params.iter().flatten().any(|p| p == name)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn check_stmt(&mut self, stmt: &IrStmt) {
        match &stmt.kind {
            IrStmtKind::Expr(expr) => self.check_expr(expr),
            IrStmtKind::Var(decl) => {
                self.check_type(&decl.declared_type, &decl.name);
                if let Some(init) = &decl.init {
                    self.check_expr(init);
                }
            }
            IrStmtKind::Func(func) => {
                self.type_params.push(func.type_params.clone());
                for param in &func.params {
                    self.check_type(&param.ty, &param.name);
                }
                self.check_type(&func.return_type, &func.name);
                for stmt in &func.body {
                    self.check_stmt(stmt);
                }
                self.type_params.pop();
            }
            IrStmtKind::Class(class) => {
                self.type_params.push(class.type_params.clone());
                if let Some(extends) = &class.extends {
                    self.check_type(extends, &class.name);
                }
                for implemented in &class.implements {
                    self.check_type(implemented, &class.name);
                }
                for member in &class.members {
                    match member {
                        IrClassMember::Property { name, ty, init, .. } => {
                            self.check_type(ty, name);
                            if let Some(init) = init {
                                self.check_expr(init);
                            }
                        }
                        IrClassMember::Method {
                            name,
                            type_params,
                            params,
                            return_type,
                            body,
                            ..
                        } => {
                            self.type_params.push(type_params.clone());
                            for param in params {
                                self.check_type(&param.ty, name);
                            }
                            self.check_type(return_type, name);
                            for stmt in body {
                                self.check_stmt(stmt);
                            }
                            self.type_params.pop();
                        }
                        IrClassMember::Constructor { params, body } => {
                            for param in params {
                                self.check_type(&param.ty, &param.name);
                            }
                            for stmt in body {
                                self.check_stmt(stmt);
                            }
                        }
                    }
                }
                self.type_params.pop();
            }
            IrStmtKind::Interface(interface) => {
                self.type_params.push(interface.type_params.clone());
                for extended in &interface.extends {
                    self.check_type(extended, &interface.name);
                }
                for member in &interface.members {
                    match member {
                        IrInterfaceMember::Property { name, ty, .. } => self.check_type(ty, name),
                        IrInterfaceMember::Method {
                            name,
                            type_params,
                            params,
                            return_type,
                        } => {
                            self.type_params.push(type_params.clone());
                            for param in params {
                                self.check_type(&param.ty, name);
                            }
                            self.check_type(return_type, name);
                            self.type_params.pop();
                        }
                        IrInterfaceMember::Indexer { key, value } => {
                            self.check_type(key, &interface.name);
                            self.check_type(value, &interface.name);
                        }
                    }
                }
                self.type_params.pop();
            }
            IrStmtKind::Enum(decl) => {
                for member in &decl.members {
                    if let Some(value) = &member.value {
                        self.check_expr(value);
                    }
                }
            }
            IrStmtKind::TypeAlias(alias) => self.check_type(&alias.ty, &alias.name),
            IrStmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.check_stmt(stmt);
                }
            }
            IrStmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_expr(condition);
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }
            IrStmtKind::While { condition, body } => {
                self.check_expr(condition);
                self.check_stmt(body);
            }
            IrStmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(condition) = condition {
                    self.check_expr(condition);
                }
                if let Some(update) = update {
                    self.check_expr(update);
                }
                self.check_stmt(body);
            }
            IrStmtKind::ForOf {
                element_type,
                iterable,
                body,
                binding,
                ..
            } => {
                self.check_type(element_type, binding);
                self.check_expr(iterable);
                self.check_stmt(body);
            }
            IrStmtKind::Switch {
                discriminant,
                cases,
            } => {
                self.check_expr(discriminant);
                for case in cases {
                    if let Some(test) = &case.test {
                        self.check_expr(test);
                    }
                    for stmt in &case.body {
                        self.check_stmt(stmt);
                    }
                }
            }
            IrStmtKind::Try {
                block,
                catch,
                finally,
            } => {
                for stmt in block {
                    self.check_stmt(stmt);
                }
                if let Some(catch) = catch {
                    for stmt in &catch.body {
                        self.check_stmt(stmt);
                    }
                }
                if let Some(finally) = finally {
                    for stmt in finally {
                        self.check_stmt(stmt);
                    }
                }
            }
            IrStmtKind::Return(Some(expr)) => self.check_expr(expr),
            IrStmtKind::Throw(expr) => self.check_expr(expr),
            IrStmtKind::Return(None) | IrStmtKind::Break | IrStmtKind::Continue => {}
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn check_expr(&mut self, expr: &IrExpr) {
        if let Some(ty) = &expr.inferred_type {
            self.check_type(ty, "expression");
        }
        match &expr.kind {
            IrExprKind::Array(elements) => {
                for e in elements {
                    self.check_expr(e);
                }
            }
            IrExprKind::Object(entries) => {
                for entry in entries {
                    match entry {
                        tsonic_ir::IrObjectEntry::Property { value, .. } => self.check_expr(value),
                        tsonic_ir::IrObjectEntry::Spread(inner) => self.check_expr(inner),
                    }
                }
            }
            IrExprKind::Member(access) => {
                self.check_expr(&access.object);
                if let IrMemberKey::Computed(index) = &access.member {
                    self.check_expr(index);
                }
            }
            IrExprKind::Call(call) => {
                self.check_expr(&call.callee);
                for arg in &call.args {
                    self.check_expr(arg);
                }
            }
            IrExprKind::New(new) => {
                self.check_type(&new.callee, "new expression");
                for arg in &new.args {
                    self.check_expr(arg);
                }
            }
            IrExprKind::Lambda(lambda) => {
                for param in &lambda.params {
                    self.check_type(&param.ty, &param.name);
                }
                self.check_type(&lambda.return_type, "lambda");
                match &lambda.body {
                    IrFunctionBody::Expr(body) => self.check_expr(body),
                    IrFunctionBody::Block(stmts) => {
                        for stmt in stmts {
                            self.check_stmt(stmt);
                        }
                    }
                }
            }
            IrExprKind::Update { target, .. } => self.check_expr(target),
            IrExprKind::Unary { operand, .. } => self.check_expr(operand),
            IrExprKind::Binary { left, right, .. } | IrExprKind::Logical { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
            IrExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                self.check_expr(condition);
                self.check_expr(when_true);
                self.check_expr(when_false);
            }
            IrExprKind::Assignment { target, value, .. } => {
                self.check_expr(target);
                self.check_expr(value);
            }
            IrExprKind::TemplateLiteral(parts) => {
                for part in parts {
                    if let tsonic_ir::IrTemplatePart::Expr(e) = part {
                        self.check_expr(e);
                    }
                }
            }
            IrExprKind::Spread(inner)
            | IrExprKind::Await(inner)
            | IrExprKind::TryCast { operand: inner }
            | IrExprKind::AsInterface { operand: inner } => self.check_expr(inner),
            IrExprKind::TypeAssertion { operand, .. } => self.check_expr(operand),
            IrExprKind::NumericNarrowing { operand, .. } => self.check_expr(operand),
            IrExprKind::StackAlloc { element, length } => {
                self.check_type(element, "stackalloc");
                self.check_expr(length);
            }
            IrExprKind::Yield { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }
            IrExprKind::Literal(_)
            | IrExprKind::Identifier(_)
            | IrExprKind::This
            | IrExprKind::DefaultOf => {}
        }
    }
}

/// tsbindgen bucket shapes resolve through the extension index, not the
/// nominal environment.
fn tsonic_bindings_bucket(name: &str) -> bool {
    name.starts_with("__Ext_")
        || name.starts_with("__TsonicExtMethods_")
        || name.ends_with("$instance")
        || name.ends_with("$views")
}
