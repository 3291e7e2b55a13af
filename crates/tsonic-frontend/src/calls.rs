//! Call lowering: the two-pass conversion/resolution protocol.
//!
//! Order of operations for every call site:
//! 1. resolve once without argument types to obtain formal parameter types,
//! 2. convert non-lambda arguments with those expected types,
//! 3. re-resolve with the collected argument types to infer generics,
//! 4. convert lambda arguments against the instantiated parameter types,
//! 5. resolve a final time for the return type and parameter modes.
//!
//! Untyped lambdas need the call's generics inferred before their parameter
//! types exist, hence the deferral; lambdas with explicit annotations are
//! ordinary arguments.

use smallvec::SmallVec;
use tracing::debug;
use tsonic_ast::{Expr, ExprKind, TypeSyntax, TypeSyntaxKind};
use tsonic_common::diagnostics::codes;
use tsonic_common::ParamMode;
use tsonic_ir::{
    DeclId, ExternalMemberRef, IrCall, IrExpr, IrExprKind, IrMemberKey, IrNew, IrType,
    SignatureId, TypeRef,
};
use tsonic_types::{CallRequest, CallResolution};

use crate::lower::Lowering;

/// A call argument after wrapper stripping.
struct CallArg<'e> {
    expr: &'e Expr,
    mode_override: Option<ParamMode>,
    deferred: bool,
}

/// Flattens a chain of `Ident`/`Member` expressions into a dotted path
/// string, e.g. `a.b.c`. Returns `None` if the expression contains anything
/// other than identifiers and member accesses.
fn dotted_path(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.clone()),
        ExprKind::Member {
            object, property, ..
        } => {
            let mut base = dotted_path(object)?;
            base.push('.');
            base.push_str(property);
            Some(base)
        }
        _ => None,
    }
}

impl<'a, 'b> Lowering<'a, 'b> {
    pub(crate) fn lower_call(
        &mut self,
        callee: &Expr,
        type_args: &[TypeSyntax],
        args: &[Expr],
        expected: Option<&TypeRef>,
    ) -> IrExpr {
        // Compiler intrinsics take the intrinsic path before anything else.
        if let ExprKind::Ident(name) = &callee.kind {
            let intrinsic_name = name.clone();
            if let Some(intrinsic) = self.lower_intrinsic(&intrinsic_name, type_args, args) {
                return intrinsic;
            }
        }

        // Call-site `ref(x)`/`out(x)`/`in(x)` wrappers override modes.
        let call_args: Vec<CallArg<'_>> = args.iter().map(classify_arg).collect();
        let argc = call_args.len();

        let mut lowered_callee = self.lower_expr(callee, None);
        let explicit_type_args: Vec<TypeRef> =
            type_args.iter().map(|t| self.convert_type(t)).collect();

        let (signature, receiver_type) = self.callee_signature(callee, &lowered_callee, argc);
        self.attach_extension_binding(&mut lowered_callee, argc);

        // Fallback expected types when no signature handle resolves.
        let fallback_fn = match signature {
            None => lowered_callee.inferred_type.as_ref().and_then(|t| {
                if let IrType::Function(f) = t.as_ref() {
                    Some(f.clone())
                } else {
                    None
                }
            }),
            Some(_) => None,
        };

        // Pass 1: formals without argument types.
        let first = self.resolve_step(
            signature,
            argc,
            receiver_type.as_ref(),
            &explicit_type_args,
            None,
            expected,
        );

        // Pass 2: convert non-lambda arguments first.
        let mut lowered_args: Vec<Option<IrExpr>> = (0..argc).map(|_| None).collect();
        let mut arg_types: SmallVec<[Option<TypeRef>; 4]> = SmallVec::new();
        arg_types.resize(argc, None);
        for (i, arg) in call_args.iter().enumerate() {
            if arg.deferred {
                continue;
            }
            let expected_ty = expected_param(&first, &fallback_fn, i);
            let lowered = self.lower_expr(arg.expr, expected_ty.as_ref());
            arg_types[i] = lowered.inferred_type.clone();
            lowered_args[i] = Some(lowered);
        }

        // Pass 3: re-resolve to instantiate generics from concrete args.
        let second = self.resolve_step(
            signature,
            argc,
            receiver_type.as_ref(),
            &explicit_type_args,
            Some(&arg_types),
            expected,
        );

        // Pass 4: convert lambdas against instantiated parameter types.
        let mid = second.as_ref().or(first.as_ref()).cloned();
        for (i, arg) in call_args.iter().enumerate() {
            if !arg.deferred {
                continue;
            }
            let expected_ty = expected_param(&mid, &fallback_fn, i);
            let lowered = self.lower_arrow(arg.expr, expected_ty.as_ref());
            arg_types[i] = lowered.inferred_type.clone();
            lowered_args[i] = Some(lowered);
        }

        // Pass 5: final resolve with every argument type present.
        let fin = self.resolve_step(
            signature,
            argc,
            receiver_type.as_ref(),
            &explicit_type_args,
            Some(&arg_types),
            expected,
        );

        let resolution = fin.or(second).or(first);
        debug!(argc, resolved = resolution.is_some(), "call lowered");

        let return_type = resolution
            .as_ref()
            .map(|r| r.return_type.clone())
            .or_else(|| fallback_fn.as_ref().map(|f| f.return_type.clone()));
        let parameter_types = resolution.as_ref().map(|r| r.parameter_types.clone());
        let narrowing = resolution.as_ref().and_then(|r| r.type_predicate.clone());

        // Passing modes: signature first, binding modifier list on top,
        // call-site wrappers last.
        let mut modes: Vec<ParamMode> = (0..argc)
            .map(|i| {
                resolution
                    .as_ref()
                    .and_then(|r| r.parameter_modes.get(i).copied())
                    .unwrap_or(ParamMode::Value)
            })
            .collect();
        if let IrExprKind::Member(access) = &lowered_callee.kind {
            if let Some(binding) = &access.binding {
                for (index, mode) in &binding.param_modes {
                    if let Some(slot) = modes.get_mut(*index) {
                        *slot = *mode;
                    }
                }
            }
        }
        for (i, arg) in call_args.iter().enumerate() {
            if let Some(mode) = arg.mode_override {
                modes[i] = mode;
            }
        }

        let args: Vec<IrExpr> = lowered_args.into_iter().flatten().collect();
        let mut e = IrExpr::new(IrExprKind::Call(Box::new(IrCall {
            callee: lowered_callee,
            type_args: explicit_type_args,
            args,
            signature,
            parameter_types,
            argument_passing: Some(modes),
            narrowing,
        })));
        e.inferred_type = return_type;
        e
    }

    fn resolve_step(
        &mut self,
        signature: Option<SignatureId>,
        argc: usize,
        receiver_type: Option<&TypeRef>,
        explicit_type_args: &[TypeRef],
        arg_types: Option<&[Option<TypeRef>]>,
        expected: Option<&TypeRef>,
    ) -> Option<CallResolution> {
        let sig = signature?;
        let mut sink = std::mem::take(&mut self.ctx.sink);
        let resolution = self.ctx.types.resolve_call(
            &CallRequest {
                signature: sig,
                argument_count: argc,
                receiver_type,
                explicit_type_args,
                arg_types,
                expected_return_type: expected,
            },
            &mut sink,
        );
        self.ctx.sink = sink;
        resolution
    }

    /// Locate the candidate signature for a call site, preferring the
    /// overload whose declared arity matches. Declaration order breaks
    /// ties deterministically.
    fn callee_signature(
        &mut self,
        callee: &Expr,
        lowered_callee: &IrExpr,
        argc: usize,
    ) -> (Option<SignatureId>, Option<TypeRef>) {
        match &callee.kind {
            ExprKind::Ident(name) => {
                let namespace = self.current_namespace.clone();
                let Some(decl) = self.module_decl(&namespace, name) else {
                    return (None, None);
                };
                let candidates = self.ctx.types.catalog.function_signatures(decl).to_vec();
                (self.pick_signature(&candidates, argc), None)
            }
            ExprKind::Member { property, .. } => {
                let IrExprKind::Member(access) = &lowered_callee.kind else {
                    return (None, None);
                };
                let Some(receiver) = access.object.inferred_type.clone() else {
                    return (None, None);
                };
                let (stripped, _) = IrType::strip_nullish(&receiver);
                let Some((decl, _)) = self.ctx.types.nominal.normalize(&stripped) else {
                    return (None, None);
                };
                let candidates = self.ctx.types.method_signatures(decl, property);
                (self.pick_signature(&candidates, argc), Some(stripped))
            }
            _ => (None, None),
        }
    }

    fn pick_signature(&self, candidates: &[SignatureId], argc: usize) -> Option<SignatureId> {
        if candidates.len() > 1 {
            for &sig in candidates {
                if let Some(entry) = self.ctx.types.catalog.signature(sig) {
                    let required = entry.params.iter().filter(|p| !p.optional).count();
                    if argc >= required && argc <= entry.params.len() {
                        return Some(sig);
                    }
                }
            }
        }
        candidates.first().copied()
    }

    /// A member whose receiver surfaces extension buckets must resolve its
    /// binding from the extension index; a bucket member with no binding
    /// is a hard error, not a fallback.
    fn attach_extension_binding(&mut self, lowered_callee: &mut IrExpr, argc: usize) {
        let IrExprKind::Member(access) = &mut lowered_callee.kind else {
            return;
        };
        if access.binding.is_some() {
            return;
        }
        let IrMemberKey::Name(property) = &access.member else {
            return;
        };
        let Some(receiver) = &access.object.inferred_type else {
            return;
        };
        let buckets = extension_buckets_of(receiver);
        if buckets.is_empty() {
            return;
        }
        for bucket in &buckets {
            if let Some(found) =
                self.ctx
                    .bindings
                    .resolve_extension_method(bucket, property, Some(argc))
            {
                // Instance-style call: drop the receiver slot from the
                // modifier list.
                let param_modes = found
                    .param_modifiers
                    .iter()
                    .filter(|(index, _)| *index > 0)
                    .map(|(index, mode)| (index - 1, *mode))
                    .collect();
                access.binding = Some(ExternalMemberRef {
                    assembly: found.assembly.clone(),
                    external_type: found.external_type.clone(),
                    external_member: found.external_member.clone(),
                    param_modes,
                    is_extension: true,
                });
                return;
            }
        }
        let receiver_name = buckets.join(" & ");
        let property = property.clone();
        self.ctx.sink.report(
            &codes::MISSING_EXTENSION_BINDING,
            &[receiver_name.as_str(), property.as_str()],
            None,
        );
    }

    // =========================================================================
    // `new`
    // =========================================================================

    pub(crate) fn lower_new(
        &mut self,
        callee: &Expr,
        type_args: &[TypeSyntax],
        args: &[Expr],
    ) -> IrExpr {
        let Some(name) = dotted_path(callee) else {
            let lowered: Vec<IrExpr> = args.iter().map(|a| self.lower_expr(a, None)).collect();
            let mut e = IrExpr::new(IrExprKind::New(Box::new(IrNew {
                callee: IrType::unknown(),
                args: lowered,
                signature: None,
                argument_passing: None,
            })));
            e.inferred_type = Some(IrType::unknown());
            return e;
        };

        let syntax = TypeSyntax::new(TypeSyntaxKind::Named {
            name,
            type_args: type_args.to_vec(),
        });
        let constructed = self.convert_type(&syntax);

        // Constructor signature from the class entry, resolved like any
        // call but with the constructed type as receiver.
        let ctor = self
            .ctx
            .types
            .nominal
            .normalize(&constructed)
            .and_then(|(decl, _)| self.constructor_signature(decl, args.len()));

        let first = self.resolve_step(ctor, args.len(), Some(&constructed), &[], None, None);

        let lowered_args: Vec<IrExpr> = args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let expected = first
                    .as_ref()
                    .and_then(|r| r.parameter_types.get(i).cloned());
                self.lower_expr(a, expected.as_ref())
            })
            .collect();
        let modes = first.as_ref().map(|r| r.parameter_modes.clone());

        let mut e = IrExpr::new(IrExprKind::New(Box::new(IrNew {
            callee: constructed.clone(),
            args: lowered_args,
            signature: ctor,
            argument_passing: modes,
        })));
        e.inferred_type = Some(constructed);
        e
    }

    fn constructor_signature(&self, decl: DeclId, argc: usize) -> Option<SignatureId> {
        let entry = self.ctx.types.catalog.member(decl, "constructor")?;
        self.pick_signature(&entry.signatures, argc)
    }

    // =========================================================================
    // Intrinsics
    // =========================================================================

    /// `tryCast<T>(x)`, `asInterface<T>(x)`, `stackAlloc<T>(n)`,
    /// `defaultOf<T>()` lower to dedicated IR nodes.
    fn lower_intrinsic(
        &mut self,
        name: &str,
        type_args: &[TypeSyntax],
        args: &[Expr],
    ) -> Option<IrExpr> {
        match (name, args.len()) {
            ("tryCast", 1) => {
                let ty = type_args.first().map(|t| self.convert_type(t))?;
                let operand = self.lower_expr(&args[0], None);
                Some(IrExpr::typed(
                    IrExprKind::TryCast {
                        operand: Box::new(operand),
                    },
                    IrType::union(vec![ty, IrType::null()]),
                ))
            }
            ("asInterface", 1) => {
                let ty = type_args.first().map(|t| self.convert_type(t))?;
                let operand = self.lower_expr(&args[0], None);
                Some(IrExpr::typed(
                    IrExprKind::AsInterface {
                        operand: Box::new(operand),
                    },
                    ty,
                ))
            }
            ("stackAlloc", 1) => {
                let element = type_args.first().map(|t| self.convert_type(t))?;
                let length = self.lower_expr(
                    &args[0],
                    Some(&IrType::primitive(tsonic_ir::Primitive::Int)),
                );
                let ty = IrType::array(element.clone());
                Some(IrExpr::typed(
                    IrExprKind::StackAlloc {
                        element,
                        length: Box::new(length),
                    },
                    ty,
                ))
            }
            ("defaultOf", 0) => {
                let ty = type_args.first().map(|t| self.convert_type(t))?;
                Some(IrExpr::typed(IrExprKind::DefaultOf, ty))
            }
            _ => None,
        }
    }
}

fn expected_param(
    resolution: &Option<CallResolution>,
    fallback_fn: &Option<tsonic_ir::FunctionType>,
    index: usize,
) -> Option<TypeRef> {
    if let Some(r) = resolution {
        return r.parameter_types.get(index).cloned();
    }
    fallback_fn
        .as_ref()
        .and_then(|f| f.params.get(index))
        .map(|p| p.ty.clone())
}

fn classify_arg(arg: &Expr) -> CallArg<'_> {
    if let ExprKind::Call {
        callee: inner_callee,
        args: inner_args,
        ..
    } = &arg.kind
    {
        if inner_args.len() == 1 {
            if let ExprKind::Ident(wrapper) = &inner_callee.kind {
                if let Some(mode) = ParamMode::from_keyword(wrapper) {
                    if mode != ParamMode::Value {
                        return CallArg {
                            expr: &inner_args[0],
                            mode_override: Some(mode),
                            deferred: Lowering::arrow_is_deferred(&inner_args[0]),
                        };
                    }
                }
            }
        }
    }
    CallArg {
        expr: arg,
        mode_override: None,
        deferred: Lowering::arrow_is_deferred(arg),
    }
}

/// Bucket type names surfaced by a receiver's intersection views.
fn extension_buckets_of(ty: &TypeRef) -> Vec<String> {
    match ty.as_ref() {
        IrType::Reference(r) if tsonic_bindings::is_extension_bucket_name(&r.name) => {
            vec![r.name.clone()]
        }
        IrType::Intersection(members) => members
            .iter()
            .flat_map(|m| extension_buckets_of(m))
            .collect(),
        _ => Vec::new(),
    }
}
