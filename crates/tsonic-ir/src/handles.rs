//! Opaque handles and the handle registry.
//!
//! External subsystems (binding and type systems) never touch raw source
//! AST nodes; they operate on stable IDs minted here during frontend
//! lowering. Each ID maps to an immutable record carrying kind, qualified
//! name, captured type syntax, and source span. The registry is built once
//! and read-only for the rest of the pipeline.

use rustc_hash::FxHashMap;
use tsonic_ast::TypeSyntax;
use tsonic_common::Span;

macro_rules! handle_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const INVALID: $name = $name(u32::MAX);

            #[inline]
            pub const fn is_valid(&self) -> bool {
                self.0 != u32::MAX
            }

            #[inline]
            pub const fn index(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle_id!(
    /// A named declaration: class, interface, function, variable,
    /// parameter, enum, or type alias.
    DeclId
);
handle_id!(
    /// A specific call or constructor signature of a declaration or member.
    SignatureId
);
handle_id!(
    /// A single member of a type.
    MemberId
);
handle_id!(
    /// A captured type-annotation syntax node.
    TypeSyntaxId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Class,
    Interface,
    Function,
    Variable,
    Parameter,
    Enum,
    TypeAlias,
}

impl DeclKind {
    /// Whether declarations of this kind introduce a type name.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            DeclKind::Class | DeclKind::Interface | DeclKind::Enum | DeclKind::TypeAlias
        )
    }
}

/// Record behind a `DeclId`.
#[derive(Clone, Debug)]
pub struct DeclRecord {
    pub kind: DeclKind,
    /// Local name as written in source.
    pub name: String,
    /// Fully-qualified name: `<module namespace>.<name>` for module-level
    /// declarations, local name for locals/parameters.
    pub qualified_name: String,
    /// Explicit annotation, if the declaration carried one.
    pub type_syntax: Option<TypeSyntaxId>,
    pub span: Span,
}

/// Record behind a `SignatureId`.
#[derive(Clone, Debug)]
pub struct SignatureRecord {
    /// Declaration the signature belongs to.
    pub decl: DeclId,
    /// Member the signature belongs to, for method signatures.
    pub member: Option<MemberId>,
    /// Position among the owner's overloads, in declaration order.
    pub overload_index: u32,
    pub span: Span,
}

/// Record behind a `MemberId`.
#[derive(Clone, Debug)]
pub struct MemberRecord {
    pub owner: DeclId,
    pub name: String,
    pub qualified_name: String,
    pub span: Span,
}

/// Record behind a `TypeSyntaxId`.
#[derive(Clone, Debug)]
pub struct TypeSyntaxRecord {
    pub syntax: TypeSyntax,
    pub span: Span,
}

/// Arena of all handles minted during lowering.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    decls: Vec<DeclRecord>,
    signatures: Vec<SignatureRecord>,
    members: Vec<MemberRecord>,
    type_syntaxes: Vec<TypeSyntaxRecord>,
    decls_by_qualified_name: FxHashMap<String, DeclId>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        HandleRegistry::default()
    }

    pub fn alloc_decl(&mut self, record: DeclRecord) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls_by_qualified_name
            .insert(record.qualified_name.clone(), id);
        self.decls.push(record);
        id
    }

    pub fn alloc_signature(&mut self, record: SignatureRecord) -> SignatureId {
        let id = SignatureId(self.signatures.len() as u32);
        self.signatures.push(record);
        id
    }

    pub fn alloc_member(&mut self, record: MemberRecord) -> MemberId {
        let id = MemberId(self.members.len() as u32);
        self.members.push(record);
        id
    }

    pub fn capture_type_syntax(&mut self, syntax: TypeSyntax) -> TypeSyntaxId {
        let id = TypeSyntaxId(self.type_syntaxes.len() as u32);
        let span = syntax.span;
        self.type_syntaxes.push(TypeSyntaxRecord { syntax, span });
        id
    }

    pub fn decl(&self, id: DeclId) -> Option<&DeclRecord> {
        self.decls.get(id.index())
    }

    pub fn signature(&self, id: SignatureId) -> Option<&SignatureRecord> {
        self.signatures.get(id.index())
    }

    pub fn member(&self, id: MemberId) -> Option<&MemberRecord> {
        self.members.get(id.index())
    }

    pub fn type_syntax(&self, id: TypeSyntaxId) -> Option<&TypeSyntaxRecord> {
        self.type_syntaxes.get(id.index())
    }

    pub fn decl_by_qualified_name(&self, qualified_name: &str) -> Option<DeclId> {
        self.decls_by_qualified_name.get(qualified_name).copied()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_ids_are_invalid() {
        assert!(!DeclId::INVALID.is_valid());
        assert!(DeclId(0).is_valid());
        assert!(!SignatureId::INVALID.is_valid());
    }

    #[test]
    fn alloc_and_lookup() {
        let mut registry = HandleRegistry::new();
        let id = registry.alloc_decl(DeclRecord {
            kind: DeclKind::Class,
            name: "Geo".into(),
            qualified_name: "App.Services.Geo".into(),
            type_syntax: None,
            span: Span::dummy(),
        });
        assert_eq!(registry.decl(id).unwrap().name, "Geo");
        assert_eq!(
            registry.decl_by_qualified_name("App.Services.Geo"),
            Some(id)
        );
        assert_eq!(registry.decl_by_qualified_name("App.Missing"), None);
    }

    #[test]
    fn captured_syntax_keeps_span() {
        let mut registry = HandleRegistry::new();
        let mut syntax = TypeSyntax::named("int");
        syntax.span = Span::new(3, 6);
        let id = registry.capture_type_syntax(syntax);
        assert_eq!(registry.type_syntax(id).unwrap().span, Span::new(3, 6));
    }
}
