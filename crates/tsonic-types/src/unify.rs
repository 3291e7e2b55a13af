//! Unification of formal parameter types against argument types.
//!
//! Used by call resolution to infer method type parameters. Unification is
//! deterministic and refuses to guess: kinds must match exactly, a formal
//! union or intersection that mentions an inferable type parameter fails
//! with a dedicated error, and binding the same parameter to two different
//! types is a conflict, never a silent widening.

use rustc_hash::FxHashSet;
use tsonic_ir::{IrType, TypeRef};

use crate::substitute::Substitution;

/// Why unification failed.
#[derive(Clone, Debug, PartialEq)]
pub enum UnifyError {
    /// Same parameter bound to two different concrete types.
    Conflict {
        param: String,
        first: TypeRef,
        second: TypeRef,
    },
    /// Formal is a union/intersection mentioning an inferable parameter;
    /// the user must supply an explicit type argument.
    UnionMentionsParam { param: String },
    /// Shapes are structurally incompatible; no binding was derived.
    Mismatch,
}

/// Unify `formal` against `actual`, binding names from `inferable`.
///
/// On success the returned substitution satisfies
/// `substitute(formal, s) == actual`.
pub fn unify(
    formal: &TypeRef,
    actual: &TypeRef,
    inferable: &FxHashSet<String>,
) -> Result<Substitution, UnifyError> {
    let mut bindings = Substitution::new();
    unify_into(formal, actual, inferable, &mut bindings)?;
    Ok(bindings)
}

/// Unification accumulating into an existing binding set.
///
/// Pre-seeded bindings (explicit call-site type arguments) take precedence:
/// unifying a parameter that is already bound requires the actual type to
/// match the existing binding exactly.
pub fn unify_into(
    formal: &TypeRef,
    actual: &TypeRef,
    inferable: &FxHashSet<String>,
    bindings: &mut Substitution,
) -> Result<(), UnifyError> {
    // Resolve the formal's parameter name, if it is one.
    let param_name = match formal.as_ref() {
        IrType::TypeParameter(name) => Some(name.as_str()),
        IrType::Reference(r)
            if r.type_args.is_empty() && r.external.is_none() && r.structural.is_none() =>
        {
            inferable.contains(&r.name).then_some(r.name.as_str())
        }
        _ => None,
    };

    if let Some(name) = param_name {
        if inferable.contains(name) {
            return bind(name, actual, bindings);
        }
        // A non-inferable parameter (e.g. the receiver's) must match
        // syntactically.
        return if formal == actual {
            Ok(())
        } else {
            Err(UnifyError::Mismatch)
        };
    }

    match (formal.as_ref(), actual.as_ref()) {
        (IrType::Union(members), _) | (IrType::Intersection(members), _) => {
            // Refuse to guess a branch when a parameter is involved.
            if let Some(param) = members.iter().find_map(|m| mentioned_param(m, inferable)) {
                return Err(UnifyError::UnionMentionsParam { param });
            }
            if formal == actual {
                Ok(())
            } else {
                Err(UnifyError::Mismatch)
            }
        }
        (IrType::Array(formal_elem), IrType::Array(actual_elem)) => {
            unify_into(formal_elem, actual_elem, inferable, bindings)
        }
        (IrType::Tuple(formal_elems), IrType::Tuple(actual_elems)) => {
            if formal_elems.len() != actual_elems.len() {
                return Err(UnifyError::Mismatch);
            }
            for (f, a) in formal_elems.iter().zip(actual_elems) {
                unify_into(f, a, inferable, bindings)?;
            }
            Ok(())
        }
        (IrType::Dictionary { key: fk, value: fv }, IrType::Dictionary { key: ak, value: av }) => {
            unify_into(fk, ak, inferable, bindings)?;
            unify_into(fv, av, inferable, bindings)
        }
        (IrType::Function(formal_fn), IrType::Function(actual_fn)) => {
            if formal_fn.params.len() != actual_fn.params.len() {
                return Err(UnifyError::Mismatch);
            }
            for (f, a) in formal_fn.params.iter().zip(&actual_fn.params) {
                unify_into(&f.ty, &a.ty, inferable, bindings)?;
            }
            unify_into(&formal_fn.return_type, &actual_fn.return_type, inferable, bindings)
        }
        (IrType::Reference(formal_ref), IrType::Reference(actual_ref)) => {
            if formal_ref.name != actual_ref.name
                || formal_ref.type_args.len() != actual_ref.type_args.len()
            {
                return Err(UnifyError::Mismatch);
            }
            for (f, a) in formal_ref.type_args.iter().zip(&actual_ref.type_args) {
                unify_into(f, a, inferable, bindings)?;
            }
            Ok(())
        }
        // Remaining kinds carry no nested parameters; exact match only.
        _ => {
            if formal == actual {
                Ok(())
            } else {
                Err(UnifyError::Mismatch)
            }
        }
    }
}

fn bind(name: &str, actual: &TypeRef, bindings: &mut Substitution) -> Result<(), UnifyError> {
    if let Some(existing) = bindings.get(name) {
        if existing != actual {
            return Err(UnifyError::Conflict {
                param: name.to_string(),
                first: existing.clone(),
                second: actual.clone(),
            });
        }
        return Ok(());
    }
    bindings.insert(name, actual.clone());
    Ok(())
}

/// First inferable parameter mentioned anywhere inside a type.
fn mentioned_param(ty: &TypeRef, inferable: &FxHashSet<String>) -> Option<String> {
    match ty.as_ref() {
        IrType::TypeParameter(name) => inferable.contains(name).then(|| name.clone()),
        IrType::Reference(r) => {
            if r.type_args.is_empty() && r.external.is_none() && inferable.contains(&r.name) {
                return Some(r.name.clone());
            }
            r.type_args
                .iter()
                .find_map(|t| mentioned_param(t, inferable))
        }
        IrType::Array(elem) => mentioned_param(elem, inferable),
        IrType::Tuple(elems) => elems.iter().find_map(|t| mentioned_param(t, inferable)),
        IrType::Union(members) | IrType::Intersection(members) => {
            members.iter().find_map(|t| mentioned_param(t, inferable))
        }
        IrType::Dictionary { key, value } => {
            mentioned_param(key, inferable).or_else(|| mentioned_param(value, inferable))
        }
        IrType::Function(f) => f
            .params
            .iter()
            .find_map(|p| mentioned_param(&p.ty, inferable))
            .or_else(|| mentioned_param(&f.return_type, inferable)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substitute::substitute;

    fn inferable(names: &[&str]) -> FxHashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn binds_parameter_to_argument_type() {
        let formal = IrType::array(IrType::type_parameter("T"));
        let actual = IrType::array(IrType::primitive(tsonic_ir::Primitive::Int));
        let s = unify(&formal, &actual, &inferable(&["T"])).unwrap();
        assert_eq!(
            *s.get("T").unwrap().as_ref(),
            IrType::Primitive(tsonic_ir::Primitive::Int)
        );
        // Soundness: substitute(formal, s) == actual.
        assert_eq!(substitute(&formal, &s), actual);
    }

    #[test]
    fn conflicting_bindings_fail() {
        let formal = IrType::tuple(vec![
            IrType::type_parameter("T"),
            IrType::type_parameter("T"),
        ]);
        let actual = IrType::tuple(vec![IrType::number(), IrType::string()]);
        let err = unify(&formal, &actual, &inferable(&["T"])).unwrap_err();
        assert!(matches!(err, UnifyError::Conflict { param, .. } if param == "T"));
    }

    #[test]
    fn union_mentioning_parameter_is_refused() {
        let formal = IrType::union(vec![IrType::type_parameter("T"), IrType::null()]);
        let actual = IrType::number();
        let err = unify(&formal, &actual, &inferable(&["T"])).unwrap_err();
        assert_eq!(
            err,
            UnifyError::UnionMentionsParam {
                param: "T".to_string()
            }
        );
    }

    #[test]
    fn union_without_parameters_requires_exact_match() {
        let formal = IrType::union(vec![IrType::number(), IrType::string()]);
        let same = IrType::union(vec![IrType::number(), IrType::string()]);
        assert!(unify(&formal, &same, &inferable(&["T"])).is_ok());
        let different = IrType::union(vec![IrType::string(), IrType::number()]);
        assert_eq!(
            unify(&formal, &different, &inferable(&["T"])).unwrap_err(),
            UnifyError::Mismatch
        );
    }

    #[test]
    fn function_types_unify_structurally() {
        use tsonic_common::ParamMode;
        use tsonic_ir::FunctionParam;
        let formal = IrType::function(
            vec![FunctionParam {
                name: "x".into(),
                ty: IrType::type_parameter("T"),
                mode: ParamMode::Value,
                optional: false,
            }],
            IrType::type_parameter("R"),
        );
        let actual = IrType::function(
            vec![FunctionParam {
                name: "y".into(),
                ty: IrType::primitive(tsonic_ir::Primitive::Int),
                mode: ParamMode::Value,
                optional: false,
            }],
            IrType::string(),
        );
        let s = unify(&formal, &actual, &inferable(&["T", "R"])).unwrap();
        assert_eq!(
            *s.get("T").unwrap().as_ref(),
            IrType::Primitive(tsonic_ir::Primitive::Int)
        );
        assert_eq!(*s.get("R").unwrap().as_ref(), *IrType::string());
    }

    #[test]
    fn bare_reference_parameters_bind() {
        let formal = IrType::reference("T");
        let actual = IrType::number();
        let s = unify(&formal, &actual, &inferable(&["T"])).unwrap();
        assert_eq!(*s.get("T").unwrap().as_ref(), *IrType::number());
    }

    #[test]
    fn preseeded_bindings_take_precedence() {
        let formal = IrType::type_parameter("T");
        let actual = IrType::string();
        let mut bindings = Substitution::new();
        bindings.insert("T", IrType::number());
        let err = unify_into(&formal, &actual, &inferable(&["T"]), &mut bindings).unwrap_err();
        assert!(matches!(err, UnifyError::Conflict { .. }));
    }
}
