//! Type annotation syntax.
//!
//! Captured verbatim by the handle registry (`TypeSyntaxId`) during
//! lowering; the type system converts these to IR types on demand.

use tsonic_common::{ParamMode, Span};

#[derive(Clone, Debug, PartialEq)]
pub struct TypeSyntax {
    pub kind: TypeSyntaxKind,
    pub span: Span,
}

impl TypeSyntax {
    pub fn new(kind: TypeSyntaxKind) -> Self {
        TypeSyntax {
            kind,
            span: Span::dummy(),
        }
    }

    /// Shorthand for a bare named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeSyntax::new(TypeSyntaxKind::Named {
            name: name.into(),
            type_args: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeSyntaxKind {
    /// `Foo`, `systemLinq.enumerable`, `List<T>`: possibly dotted,
    /// possibly applied.
    Named {
        name: String,
        type_args: Vec<TypeSyntax>,
    },
    /// `T[]`
    Array(Box<TypeSyntax>),
    /// `[A, B]`
    Tuple(Vec<TypeSyntax>),
    /// `A | B`
    Union(Vec<TypeSyntax>),
    /// `A & B`
    Intersection(Vec<TypeSyntax>),
    /// `(a: A, b: B) => R`
    Function {
        params: Vec<FunctionTypeParam>,
        return_type: Box<TypeSyntax>,
    },
    /// `{ a: A; b(): B }`
    Object(Vec<ObjectTypeMember>),
    /// `"lit"`, `42`, `true`
    StringLiteral(String),
    NumberLiteral(String),
    BooleanLiteral(bool),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionTypeParam {
    pub name: String,
    pub ty: TypeSyntax,
    pub mode: ParamMode,
}

/// A property or method signature inside an object type literal.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectTypeMember {
    Property {
        name: String,
        ty: TypeSyntax,
        optional: bool,
    },
    Method {
        name: String,
        params: Vec<FunctionTypeParam>,
        return_type: TypeSyntax,
    },
}
