//! Type-parameter substitution.
//!
//! A substitution maps type-parameter names to types. Bare references whose
//! name appears as a key substitute too: captured annotation syntax often
//! spells a formal parameter as a plain named type. Substitution preserves
//! structural sharing; when nothing inside a subtree changes, the original
//! `Arc` is returned untouched.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tsonic_ir::{FunctionParam, FunctionType, IrType, ReferenceType, StructuralMember, TypeRef};

/// An immutable mapping from type-parameter names to types.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Substitution {
    map: FxHashMap<String, TypeRef>,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution::default()
    }

    /// Build from formal parameter names zipped with arguments. Extra
    /// names or arguments are ignored.
    pub fn from_pairs<'a>(
        params: impl IntoIterator<Item = &'a String>,
        args: impl IntoIterator<Item = TypeRef>,
    ) -> Self {
        let mut map = FxHashMap::default();
        for (name, arg) in params.into_iter().zip(args) {
            map.insert(name.clone(), arg);
        }
        Substitution { map }
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: TypeRef) {
        self.map.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypeRef)> {
        self.map.iter()
    }

    /// Compose two substitutions: applying the result is equivalent to
    /// applying `self` and then `other` (for non-overlapping domains).
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut map = FxHashMap::default();
        for (name, ty) in &self.map {
            map.insert(name.clone(), substitute(ty, other));
        }
        for (name, ty) in &other.map {
            map.entry(name.clone()).or_insert_with(|| ty.clone());
        }
        Substitution { map }
    }
}

/// Apply a substitution to a type.
///
/// Returns the input `Arc` unchanged (pointer-equal) when no substitution
/// applies anywhere in the tree.
pub fn substitute(ty: &TypeRef, subst: &Substitution) -> TypeRef {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty.as_ref() {
        IrType::TypeParameter(name) => match subst.get(name) {
            Some(replacement) => replacement.clone(),
            None => ty.clone(),
        },
        IrType::Reference(r) => {
            // A bare reference naming a formal parameter substitutes whole.
            if r.type_args.is_empty() && r.external.is_none() && r.structural.is_none() {
                if let Some(replacement) = subst.get(&r.name) {
                    return replacement.clone();
                }
            }
            let args = substitute_slice(&r.type_args, subst);
            let structural = r.structural.as_ref().map(|members| {
                members
                    .iter()
                    .map(|m| substitute_structural(m, subst))
                    .collect::<Vec<_>>()
            });
            let args_changed = args.is_some();
            let structural_changed = match (&r.structural, &structural) {
                (Some(old), Some(new)) => old != new,
                _ => false,
            };
            if !args_changed && !structural_changed {
                return ty.clone();
            }
            Arc::new(IrType::Reference(ReferenceType {
                name: r.name.clone(),
                type_args: args.unwrap_or_else(|| r.type_args.clone()),
                external: r.external.clone(),
                structural,
            }))
        }
        IrType::Array(elem) => {
            let new_elem = substitute(elem, subst);
            if Arc::ptr_eq(elem, &new_elem) {
                ty.clone()
            } else {
                Arc::new(IrType::Array(new_elem))
            }
        }
        IrType::Tuple(elems) => match substitute_slice(elems, subst) {
            Some(new_elems) => Arc::new(IrType::Tuple(new_elems)),
            None => ty.clone(),
        },
        IrType::Union(members) => match substitute_slice(members, subst) {
            Some(new_members) => Arc::new(IrType::Union(new_members)),
            None => ty.clone(),
        },
        IrType::Intersection(members) => match substitute_slice(members, subst) {
            Some(new_members) => Arc::new(IrType::Intersection(new_members)),
            None => ty.clone(),
        },
        IrType::Dictionary { key, value } => {
            let new_key = substitute(key, subst);
            let new_value = substitute(value, subst);
            if Arc::ptr_eq(key, &new_key) && Arc::ptr_eq(value, &new_value) {
                ty.clone()
            } else {
                Arc::new(IrType::Dictionary {
                    key: new_key,
                    value: new_value,
                })
            }
        }
        IrType::Function(f) => {
            let new_return = substitute(&f.return_type, subst);
            let mut changed = !Arc::ptr_eq(&f.return_type, &new_return);
            let params: Vec<FunctionParam> = f
                .params
                .iter()
                .map(|p| {
                    let new_ty = substitute(&p.ty, subst);
                    if !Arc::ptr_eq(&p.ty, &new_ty) {
                        changed = true;
                    }
                    FunctionParam {
                        name: p.name.clone(),
                        ty: new_ty,
                        mode: p.mode,
                        optional: p.optional,
                    }
                })
                .collect();
            if !changed {
                return ty.clone();
            }
            Arc::new(IrType::Function(FunctionType {
                params,
                return_type: new_return,
            }))
        }
        IrType::Object(members) => {
            let new_members: Vec<StructuralMember> = members
                .iter()
                .map(|m| substitute_structural(m, subst))
                .collect();
            if new_members == *members {
                ty.clone()
            } else {
                Arc::new(IrType::Object(new_members))
            }
        }
        // Leaves: primitives, literals, any/unknown/void/never.
        _ => ty.clone(),
    }
}

/// Substitute across a slice, returning `None` when nothing changed.
fn substitute_slice(types: &[TypeRef], subst: &Substitution) -> Option<Vec<TypeRef>> {
    let mut changed = false;
    let result: Vec<TypeRef> = types
        .iter()
        .map(|t| {
            let new_t = substitute(t, subst);
            if !Arc::ptr_eq(t, &new_t) {
                changed = true;
            }
            new_t
        })
        .collect();
    changed.then_some(result)
}

fn substitute_structural(member: &StructuralMember, subst: &Substitution) -> StructuralMember {
    match member {
        StructuralMember::Property { name, ty, optional } => StructuralMember::Property {
            name: name.clone(),
            ty: substitute(ty, subst),
            optional: *optional,
        },
        StructuralMember::Method { name, function } => StructuralMember::Method {
            name: name.clone(),
            function: FunctionType {
                params: function
                    .params
                    .iter()
                    .map(|p| FunctionParam {
                        name: p.name.clone(),
                        ty: substitute(&p.ty, subst),
                        mode: p.mode,
                        optional: p.optional,
                    })
                    .collect(),
                return_type: substitute(&function.return_type, subst),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_substitution_is_pointer_identity() {
        let t = IrType::array(IrType::applied_reference(
            "List",
            vec![IrType::type_parameter("T")],
        ));
        let result = substitute(&t, &Substitution::new());
        assert!(Arc::ptr_eq(&t, &result));
    }

    #[test]
    fn irrelevant_substitution_is_pointer_identity() {
        let t = IrType::array(IrType::number());
        let mut subst = Substitution::new();
        subst.insert("T", IrType::string());
        let result = substitute(&t, &subst);
        assert!(Arc::ptr_eq(&t, &result));
    }

    #[test]
    fn substitutes_type_parameters_deeply() {
        let t = IrType::function(
            vec![FunctionParam {
                name: "x".into(),
                ty: IrType::type_parameter("T"),
                mode: tsonic_common::ParamMode::Value,
                optional: false,
            }],
            IrType::array(IrType::type_parameter("R")),
        );
        let mut subst = Substitution::new();
        subst.insert("T", IrType::primitive(tsonic_ir::Primitive::Int));
        subst.insert("R", IrType::string());
        let result = substitute(&t, &subst);
        let IrType::Function(f) = result.as_ref() else {
            panic!("expected function type");
        };
        assert_eq!(*f.params[0].ty, IrType::Primitive(tsonic_ir::Primitive::Int));
        assert_eq!(*f.return_type, *IrType::array(IrType::string()));
    }

    #[test]
    fn bare_reference_names_substitute() {
        let t = IrType::reference("T");
        let mut subst = Substitution::new();
        subst.insert("T", IrType::number());
        assert_eq!(*substitute(&t, &subst), *IrType::number());

        // Bound references never substitute even when the name matches.
        let bound = IrType::bound_reference("T", "System.T");
        assert!(Arc::ptr_eq(&bound, &substitute(&bound, &subst)));
    }

    #[test]
    fn composition_law_for_disjoint_domains() {
        let t = IrType::tuple(vec![
            IrType::type_parameter("A"),
            IrType::type_parameter("B"),
        ]);
        let mut s1 = Substitution::new();
        s1.insert("A", IrType::number());
        let mut s2 = Substitution::new();
        s2.insert("B", IrType::string());

        let sequential = substitute(&substitute(&t, &s1), &s2);
        let composed = substitute(&t, &s1.compose(&s2));
        assert_eq!(sequential, composed);
    }

    #[test]
    fn compose_applies_second_to_first_values() {
        // s1: A -> B[], s2: B -> int. compose must yield A -> int[].
        let mut s1 = Substitution::new();
        s1.insert("A", IrType::array(IrType::type_parameter("B")));
        let mut s2 = Substitution::new();
        s2.insert("B", IrType::primitive(tsonic_ir::Primitive::Int));
        let composed = s1.compose(&s2);
        assert_eq!(
            *composed.get("A").unwrap().as_ref(),
            *IrType::array(IrType::primitive(tsonic_ir::Primitive::Int))
        );
    }
}
