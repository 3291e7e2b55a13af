//! The type system facade and its deterministic queries.
//!
//! Owns the unified catalog, the nominal environment, and the two
//! append-only caches (declaration type by `DeclId`; member declared type
//! by receiver stable id, member name, and instantiated type args).
//! Bidirectional TypeScript-style inference is explicitly not modeled:
//! every query either produces a type deterministically or reports a
//! diagnostic and returns `unknown`.

use rustc_hash::FxHashMap;
use tracing::debug;
use tsonic_bindings::BindingRegistry;
use tsonic_common::diagnostics::codes;
use tsonic_common::DiagnosticSink;
use tsonic_ir::{
    DeclId, DeclKind, FunctionParam, HandleRegistry, IrType, MemberId, SignatureId, TypeRef,
};

use crate::catalog::{MemberEntry, SignatureEntry, TypeCatalog};
use crate::nominal::NominalEnv;
use crate::substitute::{substitute, Substitution};
use crate::syntax::{type_from_syntax, TypeScope};

/// Indexer lookup result.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexerInfo {
    /// Key type as declared externally (e.g. `int` for CLR indexers).
    pub key_type: TypeRef,
    /// Value type substituted for the receiver's instantiation.
    pub value_type: TypeRef,
}

/// Per-compile type system state. Caches are append-only and keyed by
/// stable ids, so repeated queries are collision-free and deterministic.
#[derive(Debug, Default)]
pub struct TypeSystem {
    pub catalog: TypeCatalog,
    pub nominal: NominalEnv,
    decl_type_cache: FxHashMap<DeclId, TypeRef>,
    member_type_cache: FxHashMap<(DeclId, String, Vec<TypeRef>), TypeRef>,
    /// Deterministic initializer types recorded by the frontend for
    /// unannotated variables.
    initializer_types: FxHashMap<DeclId, TypeRef>,
}

impl TypeSystem {
    pub fn new() -> Self {
        TypeSystem::default()
    }

    /// Record the deterministically-inferred initializer type of an
    /// unannotated variable declaration.
    pub fn record_initializer_type(&mut self, decl: DeclId, ty: TypeRef) {
        self.initializer_types.insert(decl, ty);
    }

    // =========================================================================
    // Declaration types
    // =========================================================================

    /// The declared type of a declaration.
    ///
    /// Annotation first; type declarations are references to themselves;
    /// unannotated variables use the recorded deterministic initializer
    /// type; anything else is a diagnostic and `unknown`.
    pub fn type_of_decl(
        &mut self,
        handles: &HandleRegistry,
        bindings: &BindingRegistry,
        decl: DeclId,
        type_params_in_scope: &TypeScope,
        sink: &mut DiagnosticSink,
    ) -> TypeRef {
        if let Some(cached) = self.decl_type_cache.get(&decl) {
            return cached.clone();
        }
        let Some(record) = handles.decl(decl) else {
            return IrType::unknown();
        };
        let ty = if let Some(syntax_id) = record.type_syntax {
            match handles.type_syntax(syntax_id) {
                Some(captured) => type_from_syntax(
                    &captured.syntax,
                    type_params_in_scope,
                    &self.nominal,
                    bindings,
                ),
                None => IrType::unknown(),
            }
        } else if record.kind.is_type() {
            IrType::reference(record.qualified_name.clone())
        } else if record.kind == DeclKind::Function {
            match self
                .catalog
                .function_signatures(decl)
                .first()
                .and_then(|sig| self.catalog.signature(*sig))
            {
                Some(sig) => function_type_of_signature(sig),
                None => IrType::unknown(),
            }
        } else if let Some(inferred) = self.initializer_types.get(&decl) {
            inferred.clone()
        } else {
            sink.report(&codes::ANNOTATION_REQUIRED, &[record.name.as_str()], None);
            return IrType::unknown();
        };
        self.decl_type_cache.insert(decl, ty.clone());
        ty
    }

    // =========================================================================
    // Member types
    // =========================================================================

    /// The declared type of `receiver.name`, or `None` when the member is
    /// not found (callers fall back to handle-based lookup, then diagnose).
    pub fn member_type(&mut self, receiver: &TypeRef, name: &str) -> Option<TypeRef> {
        // Nullish wrappers never affect member lookup.
        let (receiver, _) = IrType::strip_nullish(receiver);

        if let Some((decl, args)) = self.nominal.normalize(&receiver) {
            let key = (decl, name.to_string(), args.clone());
            if let Some(cached) = self.member_type_cache.get(&key) {
                return Some(cached.clone());
            }
            let (declaring, subst) =
                self.nominal
                    .find_member_declaring_type(&self.catalog, decl, &args, name)?;
            let entry = self.catalog.member(declaring, name)?;
            let declared = self.materialize_member_type(entry)?;
            let instantiated = substitute(&declared, &subst);
            debug!(member = name, ty = %instantiated, "member type resolved");
            self.member_type_cache.insert(key, instantiated.clone());
            return Some(instantiated);
        }

        // Structural fallback for object types and inline shapes.
        structural_member_type(&receiver, name)
    }

    /// Member lookup through a handle, for inherited members the unified
    /// catalog does not surface on the receiver.
    pub fn type_of_member_id(
        &mut self,
        handles: &HandleRegistry,
        member_id: MemberId,
    ) -> Option<TypeRef> {
        let record = handles.member(member_id)?;
        let entry = self.catalog.member(record.owner, &record.name)?;
        self.materialize_member_type(entry)
    }

    /// Property declared type, or a function type materialized from the
    /// first signature for methods.
    fn materialize_member_type(&self, entry: &MemberEntry) -> Option<TypeRef> {
        if let Some(ty) = &entry.declared_type {
            return Some(ty.clone());
        }
        let first = entry.signatures.first()?;
        let sig = self.catalog.signature(*first)?;
        Some(function_type_of_signature(sig))
    }

    // =========================================================================
    // Indexers
    // =========================================================================

    /// Walk the inheritance chain; the first type with a unique indexer
    /// wins. Multiple indexers at the same level mean the receiver has no
    /// unambiguous indexer.
    pub fn indexer_info(&self, receiver: &TypeRef) -> Option<IndexerInfo> {
        let (receiver, _) = IrType::strip_nullish(receiver);
        let (decl, args) = self.nominal.normalize(&receiver)?;
        for candidate in self.nominal.inheritance_chain(decl) {
            let entry = self.catalog.type_entry(candidate)?;
            match entry.indexers.len() {
                0 => continue,
                1 => {
                    let indexer = &entry.indexers[0];
                    let subst = self
                        .nominal
                        .instantiation(&self.catalog, decl, &args, candidate)?;
                    return Some(IndexerInfo {
                        key_type: indexer.key.clone(),
                        value_type: substitute(&indexer.value, &subst),
                    });
                }
                _ => return None,
            }
        }
        None
    }

    // =========================================================================
    // Signatures
    // =========================================================================

    /// Candidate signatures for calling a declaration (free function) or a
    /// method member of a receiver.
    pub fn method_signatures(&self, receiver_decl: DeclId, member_name: &str) -> Vec<SignatureId> {
        for decl in self.nominal.inheritance_chain(receiver_decl) {
            if let Some(entry) = self.catalog.member(decl, member_name) {
                return entry.signatures.clone();
            }
        }
        Vec::new()
    }
}

/// Materialize a plain function type from a signature entry.
pub fn function_type_of_signature(sig: &SignatureEntry) -> TypeRef {
    IrType::function(
        sig.params
            .iter()
            .map(|p| FunctionParam {
                name: p.name.clone(),
                ty: p.ty.clone(),
                mode: p.mode,
                optional: p.optional,
            })
            .collect(),
        sig.return_type.clone(),
    )
}

/// Look a member up on a structural type.
fn structural_member_type(receiver: &TypeRef, name: &str) -> Option<TypeRef> {
    let members = match receiver.as_ref() {
        IrType::Object(members) => members,
        IrType::Reference(r) => r.structural.as_ref()?,
        _ => return None,
    };
    members.iter().find(|m| m.name() == name).map(|m| match m {
        tsonic_ir::StructuralMember::Property { ty, .. } => ty.clone(),
        tsonic_ir::StructuralMember::Method { function, .. } => {
            std::sync::Arc::new(IrType::Function(function.clone()))
        }
    })
}

/// Report the unknown-member diagnostic; used by the frontend after all
/// lookups fail.
pub fn report_unknown_member(receiver: &TypeRef, name: &str, sink: &mut DiagnosticSink) {
    let receiver_text = receiver.to_string();
    sink.report(&codes::UNKNOWN_MEMBER, &[receiver_text.as_str(), name], None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IndexerEntry, ParamEntry, TypeEntry};
    use indexmap::IndexMap;
    use tsonic_common::ParamMode;
    use tsonic_ir::{MemberId, Primitive, SignatureId};

    /// `List<T>` with `count: int`, `get(index: int): T`, indexer `[int]: T`.
    fn list_fixture() -> (TypeSystem, DeclId) {
        let mut ts = TypeSystem::new();
        let list = DeclId(0);
        let get_sig = SignatureId(0);
        ts.catalog.define_signature(
            get_sig,
            SignatureEntry {
                owner: list,
                type_params: vec![],
                params: vec![ParamEntry {
                    name: "index".into(),
                    ty: IrType::primitive(Primitive::Int),
                    mode: ParamMode::Value,
                    optional: false,
                }],
                return_type: IrType::type_parameter("T"),
                type_predicate: None,
            },
        );
        let mut members = IndexMap::new();
        members.insert(
            "count".to_string(),
            MemberEntry {
                name: "count".into(),
                member_id: MemberId(0),
                declared_type: Some(IrType::primitive(Primitive::Int)),
                signatures: vec![],
                is_static: false,
            },
        );
        members.insert(
            "get".to_string(),
            MemberEntry {
                name: "get".into(),
                member_id: MemberId(1),
                declared_type: None,
                signatures: vec![get_sig],
                is_static: false,
            },
        );
        ts.catalog.define_type(TypeEntry {
            decl: list,
            name: "List".into(),
            qualified_name: "List".into(),
            type_params: vec!["T".into()],
            members,
            indexers: vec![IndexerEntry {
                key: IrType::primitive(Primitive::Int),
                value: IrType::type_parameter("T"),
            }],
        });
        ts.nominal.register_name("List", list);
        (ts, list)
    }

    #[test]
    fn member_type_substitutes_receiver_args() {
        let (mut ts, _) = list_fixture();
        let receiver = IrType::applied_reference("List", vec![IrType::string()]);
        let count = ts.member_type(&receiver, "count").unwrap();
        assert_eq!(*count, IrType::Primitive(Primitive::Int));

        let get = ts.member_type(&receiver, "get").unwrap();
        let IrType::Function(f) = get.as_ref() else {
            panic!("expected function type");
        };
        assert_eq!(*f.return_type, *IrType::string());
    }

    #[test]
    fn member_type_strips_nullish_wrappers() {
        let (mut ts, _) = list_fixture();
        let receiver = IrType::union(vec![
            IrType::applied_reference("List", vec![IrType::number()]),
            IrType::null(),
            IrType::undefined(),
        ]);
        assert!(ts.member_type(&receiver, "count").is_some());
    }

    #[test]
    fn member_type_caches_by_instantiation() {
        let (mut ts, _) = list_fixture();
        let int_list = IrType::applied_reference("List", vec![IrType::primitive(Primitive::Int)]);
        let str_list = IrType::applied_reference("List", vec![IrType::string()]);
        let a = ts.member_type(&int_list, "get").unwrap();
        let b = ts.member_type(&str_list, "get").unwrap();
        assert_ne!(a, b);
        // Second query hits the cache and returns the same instantiation.
        assert_eq!(ts.member_type(&int_list, "get").unwrap(), a);
    }

    #[test]
    fn missing_member_is_none() {
        let (mut ts, _) = list_fixture();
        let receiver = IrType::applied_reference("List", vec![IrType::number()]);
        assert!(ts.member_type(&receiver, "missing").is_none());
    }

    #[test]
    fn structural_lookup_without_nominal_identity() {
        let mut ts = TypeSystem::new();
        let shape = IrType::object_type(vec![tsonic_ir::StructuralMember::Property {
            name: "x".into(),
            ty: IrType::number(),
            optional: false,
        }]);
        assert_eq!(*ts.member_type(&shape, "x").unwrap(), *IrType::number());
        assert!(ts.member_type(&shape, "y").is_none());
    }

    #[test]
    fn indexer_resolves_with_substitution() {
        let (ts, _) = list_fixture();
        let receiver = IrType::applied_reference("List", vec![IrType::string()]);
        let info = ts.indexer_info(&receiver).unwrap();
        assert_eq!(*info.key_type, IrType::Primitive(Primitive::Int));
        assert_eq!(*info.value_type, *IrType::string());
    }

    #[test]
    fn ambiguous_indexers_return_none() {
        let (mut ts, list) = list_fixture();
        // Add a second indexer at the same level.
        let mut entry = ts.catalog.type_entry(list).unwrap().clone();
        entry.indexers.push(IndexerEntry {
            key: IrType::string(),
            value: IrType::type_parameter("T"),
        });
        ts.catalog.define_type(entry);
        let receiver = IrType::applied_reference("List", vec![IrType::string()]);
        assert!(ts.indexer_info(&receiver).is_none());
    }
}
