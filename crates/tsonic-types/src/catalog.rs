//! The unified type catalog.
//!
//! For each declared type the catalog records its members and their
//! signatures, with declared types still spelled in terms of the owner's
//! formal type parameters; substitution happens at query time. Populated by
//! the frontend's declaration pass, read-only afterwards.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tsonic_common::ParamMode;
use tsonic_ir::{DeclId, MemberId, SignatureId, TypePredicate, TypeRef};

#[derive(Clone, Debug, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    pub ty: TypeRef,
    pub mode: ParamMode,
    pub optional: bool,
}

/// One call/constructor signature.
#[derive(Clone, Debug, PartialEq)]
pub struct SignatureEntry {
    pub owner: DeclId,
    /// Method-level type parameters, carried separately from the owner
    /// type's parameters to avoid name collision.
    pub type_params: Vec<String>,
    pub params: Vec<ParamEntry>,
    pub return_type: TypeRef,
    pub type_predicate: Option<TypePredicate>,
}

impl SignatureEntry {
    pub fn parameter_modes(&self) -> Vec<ParamMode> {
        self.params.iter().map(|p| p.mode).collect()
    }
}

/// One member of a declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberEntry {
    pub name: String,
    pub member_id: MemberId,
    /// Declared type for properties/fields.
    pub declared_type: Option<TypeRef>,
    /// Signatures for methods, in declaration order.
    pub signatures: Vec<SignatureId>,
    pub is_static: bool,
}

/// An index signature (`[key: K]: V`).
#[derive(Clone, Debug, PartialEq)]
pub struct IndexerEntry {
    pub key: TypeRef,
    pub value: TypeRef,
}

/// Everything the catalog knows about one declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeEntry {
    pub decl: DeclId,
    pub name: String,
    pub qualified_name: String,
    pub type_params: Vec<String>,
    pub members: IndexMap<String, MemberEntry>,
    pub indexers: Vec<IndexerEntry>,
}

/// Per-program catalog of types, members, and signatures.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: FxHashMap<DeclId, TypeEntry>,
    signatures: FxHashMap<SignatureId, SignatureEntry>,
    /// Signatures of free functions, by declaration.
    function_signatures: FxHashMap<DeclId, Vec<SignatureId>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        TypeCatalog::default()
    }

    pub fn define_type(&mut self, entry: TypeEntry) {
        self.types.insert(entry.decl, entry);
    }

    pub fn define_signature(&mut self, id: SignatureId, entry: SignatureEntry) {
        self.signatures.insert(id, entry);
    }

    pub fn add_function_signature(&mut self, decl: DeclId, id: SignatureId) {
        self.function_signatures.entry(decl).or_default().push(id);
    }

    pub fn type_entry(&self, decl: DeclId) -> Option<&TypeEntry> {
        self.types.get(&decl)
    }

    pub fn signature(&self, id: SignatureId) -> Option<&SignatureEntry> {
        self.signatures.get(&id)
    }

    pub fn member(&self, decl: DeclId, name: &str) -> Option<&MemberEntry> {
        self.types.get(&decl)?.members.get(name)
    }

    pub fn function_signatures(&self, decl: DeclId) -> &[SignatureId] {
        self.function_signatures
            .get(&decl)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn type_params(&self, decl: DeclId) -> &[String] {
        self.types
            .get(&decl)
            .map(|e| e.type_params.as_slice())
            .unwrap_or(&[])
    }
}
