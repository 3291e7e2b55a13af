//! Deterministic call resolution: overload-free signature instantiation
//! with type-parameter inference.
//!
//! The frontend drives the two-pass protocol: resolve once without
//! argument types to obtain expected types, convert non-lambda arguments,
//! re-resolve to infer generics, convert lambdas against the instantiated
//! parameter types, then resolve a final time. This module implements the
//! single deterministic resolution step; the ordering discipline lives in
//! the frontend's call lowering.
//!
//! Inference precedence: explicit call-site type arguments, then
//! argument-driven unification. Conflicts and union-formals are
//! diagnostics, never silent widening.

use rustc_hash::FxHashSet;
use tracing::debug;
use tsonic_common::diagnostics::codes;
use tsonic_common::{DiagnosticSink, ParamMode};
use tsonic_ir::{SignatureId, TypePredicate, TypeRef};

use crate::queries::TypeSystem;
use crate::substitute::{substitute, Substitution};
use crate::unify::{unify_into, UnifyError};

/// One call-resolution request.
#[derive(Clone, Debug)]
pub struct CallRequest<'a> {
    pub signature: SignatureId,
    pub argument_count: usize,
    /// Receiver type for instance calls; carries the receiver's type
    /// arguments.
    pub receiver_type: Option<&'a TypeRef>,
    /// Explicit call-site type arguments.
    pub explicit_type_args: &'a [TypeRef],
    /// Converted argument types; `None` entries are not yet converted
    /// (deferred lambdas).
    pub arg_types: Option<&'a [Option<TypeRef>]>,
    pub expected_return_type: Option<&'a TypeRef>,
}

/// Result of a resolution step.
#[derive(Clone, Debug, PartialEq)]
pub struct CallResolution {
    pub return_type: TypeRef,
    /// Instantiated formal parameter types.
    pub parameter_types: Vec<TypeRef>,
    /// Parameter passing modes from the signature; call-site wrappers
    /// override per argument in the frontend.
    pub parameter_modes: Vec<ParamMode>,
    pub type_predicate: Option<TypePredicate>,
}

impl TypeSystem {
    /// Resolve one call request against its signature.
    ///
    /// Returns `None` when the signature handle is unknown; the caller
    /// falls back to the callee's function IR type if it has one.
    pub fn resolve_call(
        &self,
        request: &CallRequest<'_>,
        sink: &mut DiagnosticSink,
    ) -> Option<CallResolution> {
        let entry = self.catalog.signature(request.signature)?.clone();

        // Receiver-type parameters are substituted first and kept apart
        // from method-type parameters.
        let receiver_subst = match request.receiver_type {
            Some(receiver) => self
                .nominal
                .normalize(receiver)
                .and_then(|(decl, args)| {
                    self.nominal
                        .instantiation(&self.catalog, decl, &args, entry.owner)
                })
                .unwrap_or_default(),
            None => Substitution::default(),
        };

        let inferable: FxHashSet<String> = entry.type_params.iter().cloned().collect();
        let mut bindings = Substitution::from_pairs(
            entry.type_params.iter(),
            request.explicit_type_args.iter().cloned(),
        );

        // Argument-driven unification against formals with the receiver
        // substitution already applied.
        if let Some(arg_types) = request.arg_types {
            for (index, actual) in arg_types.iter().enumerate() {
                let Some(actual) = actual else { continue };
                let Some(param) = entry.params.get(index) else {
                    break;
                };
                let formal = substitute(&param.ty, &receiver_subst);
                match unify_into(&formal, actual, &inferable, &mut bindings) {
                    Ok(()) => {}
                    Err(UnifyError::Conflict {
                        param,
                        first,
                        second,
                    }) => {
                        let first_text = first.to_string();
                        let second_text = second.to_string();
                        sink.report(
                            &codes::INFERENCE_CONFLICT,
                            &[param.as_str(), first_text.as_str(), second_text.as_str()],
                            None,
                        );
                    }
                    Err(UnifyError::UnionMentionsParam { param }) => {
                        let diag = tsonic_common::Diagnostic::new(
                            &codes::UNION_INFERENCE_REFUSED,
                            &[param.as_str()],
                        )
                        .with_hint("specify the type argument explicitly at the call site");
                        sink.push(diag);
                    }
                    // A shape mismatch here is an argument error surfaced
                    // elsewhere; it contributes no binding.
                    Err(UnifyError::Mismatch) => {}
                }
            }
        }

        // The expected return type may bind parameters nothing else
        // mentions; it never overrides established bindings.
        if let Some(expected) = request.expected_return_type {
            let formal_return = substitute(&entry.return_type, &receiver_subst);
            let mut speculative = bindings.clone();
            if unify_into(&formal_return, expected, &inferable, &mut speculative).is_ok() {
                bindings = speculative;
            }
        }

        debug!(
            signature = ?request.signature,
            inferred = bindings.len(),
            "call resolution bindings"
        );

        let full = receiver_subst.compose(&bindings);
        let parameter_types: Vec<TypeRef> = entry
            .params
            .iter()
            .map(|p| substitute(&p.ty, &full))
            .collect();
        let return_type = substitute(&entry.return_type, &full);
        let type_predicate = entry.type_predicate.as_ref().map(|pred| TypePredicate {
            parameter_index: pred.parameter_index,
            narrowed: substitute(&pred.narrowed, &full),
        });

        Some(CallResolution {
            return_type,
            parameter_types,
            parameter_modes: entry.parameter_modes(),
            type_predicate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ParamEntry, SignatureEntry, TypeEntry};
    use indexmap::IndexMap;
    use tsonic_ir::{DeclId, IrType, Primitive};

    /// `select<T, R>(src: T[], f: (x: T) => R): R[]` as a free function.
    fn select_fixture() -> (TypeSystem, SignatureId) {
        let mut ts = TypeSystem::new();
        let func = DeclId(0);
        let sig = SignatureId(0);
        ts.catalog.define_signature(
            sig,
            SignatureEntry {
                owner: func,
                type_params: vec!["T".into(), "R".into()],
                params: vec![
                    ParamEntry {
                        name: "src".into(),
                        ty: IrType::array(IrType::type_parameter("T")),
                        mode: ParamMode::Value,
                        optional: false,
                    },
                    ParamEntry {
                        name: "f".into(),
                        ty: IrType::function(
                            vec![tsonic_ir::FunctionParam {
                                name: "x".into(),
                                ty: IrType::type_parameter("T"),
                                mode: ParamMode::Value,
                                optional: false,
                            }],
                            IrType::type_parameter("R"),
                        ),
                        mode: ParamMode::Value,
                        optional: false,
                    },
                ],
                return_type: IrType::array(IrType::type_parameter("R")),
                type_predicate: None,
            },
        );
        ts.catalog.add_function_signature(func, sig);
        (ts, sig)
    }

    #[test]
    fn first_pass_returns_uninstantiated_formals() {
        let (ts, sig) = select_fixture();
        let mut sink = DiagnosticSink::new();
        let resolution = ts
            .resolve_call(
                &CallRequest {
                    signature: sig,
                    argument_count: 2,
                    receiver_type: None,
                    explicit_type_args: &[],
                    arg_types: None,
                    expected_return_type: None,
                },
                &mut sink,
            )
            .unwrap();
        assert_eq!(
            *resolution.parameter_types[0],
            *IrType::array(IrType::type_parameter("T"))
        );
        assert!(!sink.has_errors());
    }

    #[test]
    fn two_pass_lambda_inference() {
        let (ts, sig) = select_fixture();
        let mut sink = DiagnosticSink::new();
        let int = IrType::primitive(Primitive::Int);

        // Second resolve: non-lambda argument converted, lambda deferred.
        let arg_types = [Some(IrType::array(int.clone())), None];
        let mid = ts
            .resolve_call(
                &CallRequest {
                    signature: sig,
                    argument_count: 2,
                    receiver_type: None,
                    explicit_type_args: &[],
                    arg_types: Some(&arg_types),
                    expected_return_type: None,
                },
                &mut sink,
            )
            .unwrap();
        // T is inferred; the lambda's expected type is (int) => R.
        let IrType::Function(lambda_expected) = mid.parameter_types[1].as_ref() else {
            panic!("expected function formal");
        };
        assert_eq!(*lambda_expected.params[0].ty, *int);

        // Final resolve with the lambda converted as (int) => int.
        let lambda_type = IrType::function(
            vec![tsonic_ir::FunctionParam {
                name: "x".into(),
                ty: int.clone(),
                mode: ParamMode::Value,
                optional: false,
            }],
            int.clone(),
        );
        let arg_types = [Some(IrType::array(int.clone())), Some(lambda_type)];
        let fin = ts
            .resolve_call(
                &CallRequest {
                    signature: sig,
                    argument_count: 2,
                    receiver_type: None,
                    explicit_type_args: &[],
                    arg_types: Some(&arg_types),
                    expected_return_type: None,
                },
                &mut sink,
            )
            .unwrap();
        assert_eq!(*fin.return_type, *IrType::array(int));
        assert!(!sink.has_errors());
    }

    #[test]
    fn explicit_type_args_beat_inference() {
        let (ts, sig) = select_fixture();
        let mut sink = DiagnosticSink::new();
        let explicit = [IrType::string(), IrType::string()];
        let arg_types = [Some(IrType::array(IrType::string())), None];
        let resolution = ts
            .resolve_call(
                &CallRequest {
                    signature: sig,
                    argument_count: 2,
                    receiver_type: None,
                    explicit_type_args: &explicit,
                    arg_types: Some(&arg_types),
                    expected_return_type: None,
                },
                &mut sink,
            )
            .unwrap();
        assert_eq!(*resolution.return_type, *IrType::array(IrType::string()));
    }

    #[test]
    fn conflicting_inference_reports_diagnostic() {
        let mut ts = TypeSystem::new();
        let func = DeclId(0);
        let sig = SignatureId(0);
        // pair<T>(a: T, b: T): T
        ts.catalog.define_signature(
            sig,
            SignatureEntry {
                owner: func,
                type_params: vec!["T".into()],
                params: vec![
                    ParamEntry {
                        name: "a".into(),
                        ty: IrType::type_parameter("T"),
                        mode: ParamMode::Value,
                        optional: false,
                    },
                    ParamEntry {
                        name: "b".into(),
                        ty: IrType::type_parameter("T"),
                        mode: ParamMode::Value,
                        optional: false,
                    },
                ],
                return_type: IrType::type_parameter("T"),
                type_predicate: None,
            },
        );
        let mut sink = DiagnosticSink::new();
        let arg_types = [Some(IrType::number()), Some(IrType::string())];
        ts.resolve_call(
            &CallRequest {
                signature: sig,
                argument_count: 2,
                receiver_type: None,
                explicit_type_args: &[],
                arg_types: Some(&arg_types),
                expected_return_type: None,
            },
            &mut sink,
        )
        .unwrap();
        assert!(sink.iter().any(|d| d.code == 7005));
    }

    #[test]
    fn union_formal_mentioning_param_is_refused() {
        let mut ts = TypeSystem::new();
        let func = DeclId(0);
        let sig = SignatureId(0);
        // orNull<T>(x: T | null): T
        ts.catalog.define_signature(
            sig,
            SignatureEntry {
                owner: func,
                type_params: vec!["T".into()],
                params: vec![ParamEntry {
                    name: "x".into(),
                    ty: IrType::union(vec![IrType::type_parameter("T"), IrType::null()]),
                    mode: ParamMode::Value,
                    optional: false,
                }],
                return_type: IrType::type_parameter("T"),
                type_predicate: None,
            },
        );
        let mut sink = DiagnosticSink::new();
        let arg_types = [Some(IrType::number())];
        ts.resolve_call(
            &CallRequest {
                signature: sig,
                argument_count: 1,
                receiver_type: None,
                explicit_type_args: &[],
                arg_types: Some(&arg_types),
                expected_return_type: None,
            },
            &mut sink,
        )
        .unwrap();
        let diag = sink.iter().find(|d| d.code == 7006).unwrap();
        assert!(diag.hint.is_some());
    }

    #[test]
    fn receiver_type_args_substitute_separately_from_method_params() {
        // List<T> { map<R>(f: (x: T) => R): List<R> }
        let mut ts = TypeSystem::new();
        let list = DeclId(0);
        let sig = SignatureId(0);
        ts.catalog.define_signature(
            sig,
            SignatureEntry {
                owner: list,
                type_params: vec!["R".into()],
                params: vec![ParamEntry {
                    name: "f".into(),
                    ty: IrType::function(
                        vec![tsonic_ir::FunctionParam {
                            name: "x".into(),
                            ty: IrType::type_parameter("T"),
                            mode: ParamMode::Value,
                            optional: false,
                        }],
                        IrType::type_parameter("R"),
                    ),
                    mode: ParamMode::Value,
                    optional: false,
                }],
                return_type: IrType::applied_reference("List", vec![IrType::type_parameter("R")]),
                type_predicate: None,
            },
        );
        ts.catalog.define_type(TypeEntry {
            decl: list,
            name: "List".into(),
            qualified_name: "List".into(),
            type_params: vec!["T".into()],
            members: IndexMap::new(),
            indexers: Vec::new(),
        });
        ts.nominal.register_name("List", list);

        let receiver = IrType::applied_reference("List", vec![IrType::primitive(Primitive::Int)]);
        let mut sink = DiagnosticSink::new();
        let resolution = ts
            .resolve_call(
                &CallRequest {
                    signature: sig,
                    argument_count: 1,
                    receiver_type: Some(&receiver),
                    explicit_type_args: &[IrType::string()],
                    arg_types: None,
                    expected_return_type: None,
                },
                &mut sink,
            )
            .unwrap();
        // Formal lambda parameter is int (receiver's T), return is List<string>.
        let IrType::Function(f) = resolution.parameter_types[0].as_ref() else {
            panic!("expected function formal");
        };
        assert_eq!(*f.params[0].ty, IrType::Primitive(Primitive::Int));
        assert_eq!(
            *resolution.return_type,
            *IrType::applied_reference("List", vec![IrType::string()])
        );
    }
}
