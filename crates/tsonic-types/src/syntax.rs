//! Conversion from captured annotation syntax to IR types.

use rustc_hash::FxHashSet;
use tsonic_ast::{FunctionTypeParam, ObjectTypeMember, TypeSyntax, TypeSyntaxKind};
use tsonic_bindings::BindingRegistry;
use tsonic_common::numeric::parse_numeric_literal_value;
use tsonic_ir::{FunctionParam, IrType, Primitive, StructuralMember, TypeRef};

use crate::nominal::NominalEnv;

/// Names in scope while converting a type annotation.
#[derive(Clone, Debug, Default)]
pub struct TypeScope {
    /// Formal type parameters visible at the annotation site.
    pub type_params: FxHashSet<String>,
}

impl TypeScope {
    pub fn new() -> Self {
        TypeScope::default()
    }

    pub fn with_params<'a>(params: impl IntoIterator<Item = &'a String>) -> Self {
        TypeScope {
            type_params: params.into_iter().cloned().collect(),
        }
    }
}

/// Convert a type annotation to an IR type.
///
/// Unresolvable names become unbound references; the soundness gate rejects
/// them later if nothing resolves them.
pub fn type_from_syntax(
    syntax: &TypeSyntax,
    scope: &TypeScope,
    nominal: &NominalEnv,
    bindings: &BindingRegistry,
) -> TypeRef {
    match &syntax.kind {
        TypeSyntaxKind::Named { name, type_args } => {
            named_type(name, type_args, scope, nominal, bindings)
        }
        TypeSyntaxKind::Array(elem) => {
            IrType::array(type_from_syntax(elem, scope, nominal, bindings))
        }
        TypeSyntaxKind::Tuple(elems) => IrType::tuple(
            elems
                .iter()
                .map(|e| type_from_syntax(e, scope, nominal, bindings))
                .collect(),
        ),
        TypeSyntaxKind::Union(members) => IrType::union(
            members
                .iter()
                .map(|m| type_from_syntax(m, scope, nominal, bindings))
                .collect(),
        ),
        TypeSyntaxKind::Intersection(members) => IrType::intersection(
            members
                .iter()
                .map(|m| type_from_syntax(m, scope, nominal, bindings))
                .collect(),
        ),
        TypeSyntaxKind::Function {
            params,
            return_type,
        } => IrType::function(
            params
                .iter()
                .map(|p| function_param(p, scope, nominal, bindings))
                .collect(),
            type_from_syntax(return_type, scope, nominal, bindings),
        ),
        TypeSyntaxKind::Object(members) => IrType::object_type(
            members
                .iter()
                .map(|m| object_member(m, scope, nominal, bindings))
                .collect(),
        ),
        TypeSyntaxKind::StringLiteral(value) => IrType::string_literal(value.clone()),
        TypeSyntaxKind::NumberLiteral(raw) => {
            IrType::number_literal(parse_numeric_literal_value(raw).unwrap_or(f64::NAN))
        }
        TypeSyntaxKind::BooleanLiteral(value) => IrType::boolean_literal(*value),
    }
}

fn named_type(
    name: &str,
    type_args: &[TypeSyntax],
    scope: &TypeScope,
    nominal: &NominalEnv,
    bindings: &BindingRegistry,
) -> TypeRef {
    let args: Vec<TypeRef> = type_args
        .iter()
        .map(|a| type_from_syntax(a, scope, nominal, bindings))
        .collect();

    // Terminals and surface primitives first.
    if args.is_empty() {
        match name {
            "any" => return IrType::any(),
            "unknown" => return IrType::unknown(),
            "void" => return IrType::void(),
            "never" => return IrType::never(),
            _ => {}
        }
        if let Some(p) = Primitive::from_name(name) {
            return IrType::primitive(p);
        }
        if scope.type_params.contains(name) {
            return IrType::type_parameter(name);
        }
    }

    // Builtin generic containers.
    match (name, args.len()) {
        ("Array", 1) => return IrType::array(args.into_iter().next().unwrap()),
        ("Record", 2) | ("Map", 2) => {
            let mut it = args.into_iter();
            let key = it.next().unwrap();
            let value = it.next().unwrap();
            return IrType::dictionary(key, value);
        }
        _ => {}
    }

    // `namespace.type` paths resolve through the binding registry.
    if let Some((ns, ty)) = name.split_once('.') {
        if let Some(namespace) = bindings.get_namespace(ns) {
            if namespace.type_aliases.iter().any(|a| a == ty) {
                if let Some(type_binding) = bindings.get_type(ty) {
                    return std::sync::Arc::new(IrType::Reference(tsonic_ir::ReferenceType {
                        name: name.to_string(),
                        type_args: args,
                        external: Some(type_binding.external_name.clone()),
                        structural: None,
                    }));
                }
            }
        }
        return IrType::applied_reference(name, args);
    }

    // Local declarations.
    if nominal.resolve_name(name).is_some() {
        return IrType::applied_reference(name, args);
    }

    // Direct-imported bound types.
    if let Some(type_binding) = bindings.get_type(name) {
        return std::sync::Arc::new(IrType::Reference(tsonic_ir::ReferenceType {
            name: name.to_string(),
            type_args: args,
            external: Some(type_binding.external_name.clone()),
            structural: None,
        }));
    }

    IrType::applied_reference(name, args)
}

fn function_param(
    param: &FunctionTypeParam,
    scope: &TypeScope,
    nominal: &NominalEnv,
    bindings: &BindingRegistry,
) -> FunctionParam {
    FunctionParam {
        name: param.name.clone(),
        ty: type_from_syntax(&param.ty, scope, nominal, bindings),
        mode: param.mode,
        optional: false,
    }
}

fn object_member(
    member: &ObjectTypeMember,
    scope: &TypeScope,
    nominal: &NominalEnv,
    bindings: &BindingRegistry,
) -> StructuralMember {
    match member {
        ObjectTypeMember::Property { name, ty, optional } => StructuralMember::Property {
            name: name.clone(),
            ty: type_from_syntax(ty, scope, nominal, bindings),
            optional: *optional,
        },
        ObjectTypeMember::Method {
            name,
            params,
            return_type,
        } => StructuralMember::Method {
            name: name.clone(),
            function: tsonic_ir::FunctionType {
                params: params
                    .iter()
                    .map(|p| function_param(p, scope, nominal, bindings))
                    .collect(),
                return_type: type_from_syntax(return_type, scope, nominal, bindings),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsonic_ast::types::TypeSyntaxKind;

    fn convert(syntax: &TypeSyntax) -> TypeRef {
        type_from_syntax(
            syntax,
            &TypeScope::new(),
            &NominalEnv::new(),
            &BindingRegistry::new(),
        )
    }

    #[test]
    fn primitives_and_terminals() {
        assert_eq!(*convert(&TypeSyntax::named("number")), IrType::Primitive(Primitive::Number));
        assert_eq!(*convert(&TypeSyntax::named("int")), IrType::Primitive(Primitive::Int));
        assert_eq!(*convert(&TypeSyntax::named("any")), IrType::Any);
        assert_eq!(*convert(&TypeSyntax::named("never")), IrType::Never);
    }

    #[test]
    fn type_parameters_resolve_from_scope() {
        let scope = TypeScope::with_params(["T".to_string()].iter());
        let t = type_from_syntax(
            &TypeSyntax::named("T"),
            &scope,
            &NominalEnv::new(),
            &BindingRegistry::new(),
        );
        assert_eq!(*t, IrType::TypeParameter("T".into()));
    }

    #[test]
    fn builtin_containers() {
        let arr = TypeSyntax::new(TypeSyntaxKind::Named {
            name: "Array".into(),
            type_args: vec![TypeSyntax::named("int")],
        });
        assert_eq!(
            *convert(&arr),
            *IrType::array(IrType::primitive(Primitive::Int))
        );

        let map = TypeSyntax::new(TypeSyntaxKind::Named {
            name: "Map".into(),
            type_args: vec![TypeSyntax::named("string"), TypeSyntax::named("int")],
        });
        assert!(matches!(*convert(&map), IrType::Dictionary { .. }));
    }

    #[test]
    fn unknown_names_stay_unbound() {
        let t = convert(&TypeSyntax::named("Widget"));
        let IrType::Reference(r) = t.as_ref() else {
            panic!("expected reference");
        };
        assert_eq!(r.name, "Widget");
        assert!(r.external.is_none());
    }
}
