//! IR expressions.
//!
//! Lowered from the source AST with semantic facts attached: every node may
//! carry an inferred type and a numeric proof; member accesses additionally
//! carry their external binding (used by the emitter) separately from the
//! inferred type (used by validation).

use tsonic_common::{NumericKind, ParamMode, Span};

use crate::handles::{DeclId, MemberId, SignatureId};
use crate::proof::NumericProof;
use crate::stmt::IrStmt;
use crate::types::TypeRef;

// Operator enums survive lowering unchanged; they are re-exported so
// downstream crates name them through the IR.
pub use tsonic_ast::expr::{AssignOp, BinaryOp, LogicalOp, UnaryOp, UpdateOp};

#[derive(Clone, Debug, PartialEq)]
pub struct IrExpr {
    pub kind: IrExprKind,
    pub inferred_type: Option<TypeRef>,
    pub proof: Option<NumericProof>,
    pub span: Span,
}

impl IrExpr {
    pub fn new(kind: IrExprKind) -> Self {
        IrExpr {
            kind,
            inferred_type: None,
            proof: None,
            span: Span::dummy(),
        }
    }

    pub fn typed(kind: IrExprKind, ty: TypeRef) -> Self {
        IrExpr {
            kind,
            inferred_type: Some(ty),
            proof: None,
            span: Span::dummy(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Whether this expression is a simple identifier or dot-member chain
    /// (relevant for `.Value` unwrap and narrowed-binding tracking).
    pub fn is_simple_reference(&self) -> bool {
        match &self.kind {
            IrExprKind::Identifier(_) => true,
            IrExprKind::Member(access) => {
                matches!(access.member, IrMemberKey::Name(_)) && access.object.is_simple_reference()
            }
            _ => false,
        }
    }

    /// The root identifier name of an identifier/member chain, if any.
    pub fn root_identifier(&self) -> Option<&str> {
        match &self.kind {
            IrExprKind::Identifier(ident) => Some(&ident.name),
            IrExprKind::Member(access) => access.object.root_identifier(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrLiteral {
    String(String),
    Number {
        value: f64,
        /// Raw lexeme, kept for numeric-kind classification.
        raw: String,
    },
    Boolean(bool),
    Null,
    Undefined,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrIdent {
    pub name: String,
    /// Resolved local declaration, when the identifier names one.
    pub decl: Option<DeclId>,
}

/// Classification of a computed member access, decided during lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// CLR indexer (arrays, `List<T>`, integer-keyed indexers); the index
    /// must prove `Int32`.
    ClrIndexer,
    /// Dictionary-style access with a non-integer key.
    Dictionary,
    /// Character access on a string.
    StringChar,
    /// Could not classify; must fail the numeric proof pass.
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrMemberKey {
    Name(String),
    Computed(IrExpr),
}

/// External CLR member target attached to a member access by the binding
/// layer. Separate from `inferred_type`: the emitter consumes the binding,
/// validation consumes the type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalMemberRef {
    pub assembly: String,
    /// External declaring type, fully qualified.
    pub external_type: String,
    /// External member name (CLR casing).
    pub external_member: String,
    /// Parameter modes by index, already shifted for instance-style
    /// extension calls.
    pub param_modes: Vec<(usize, ParamMode)>,
    pub is_extension: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrMemberAccess {
    pub object: IrExpr,
    pub member: IrMemberKey,
    pub optional: bool,
    /// Set on computed accesses only.
    pub access_kind: Option<AccessKind>,
    pub binding: Option<ExternalMemberRef>,
    pub member_id: Option<MemberId>,
    /// The access names a type (`namespace.type`), not a value; the
    /// emitter renders the external type name.
    pub is_type_reference: bool,
}

/// Type-predicate metadata from a resolved signature (`x is T`).
#[derive(Clone, Debug, PartialEq)]
pub struct TypePredicate {
    pub parameter_index: usize,
    pub narrowed: TypeRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrCall {
    pub callee: IrExpr,
    pub type_args: Vec<TypeRef>,
    pub args: Vec<IrExpr>,
    pub signature: Option<SignatureId>,
    /// Instantiated formal parameter types from call resolution.
    pub parameter_types: Option<Vec<TypeRef>>,
    /// Per-argument passing modes from the resolved signature plus
    /// call-site `ref(x)`/`out(x)`/`in(x)` overrides.
    pub argument_passing: Option<Vec<ParamMode>>,
    pub narrowing: Option<TypePredicate>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrNew {
    pub callee: TypeRef,
    pub args: Vec<IrExpr>,
    pub signature: Option<SignatureId>,
    pub argument_passing: Option<Vec<ParamMode>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrObjectEntry {
    Property { key: String, value: IrExpr },
    Spread(IrExpr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrTemplatePart {
    Text(String),
    Expr(IrExpr),
}

/// Parameters of a lowered function value (arrow lowered inside a call).
#[derive(Clone, Debug, PartialEq)]
pub struct IrParameter {
    pub name: String,
    pub decl: DeclId,
    pub ty: TypeRef,
    pub passing: ParamMode,
    pub optional: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrFunctionBody {
    Expr(Box<IrExpr>),
    Block(Vec<IrStmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrLambda {
    pub params: Vec<IrParameter>,
    pub return_type: TypeRef,
    pub body: IrFunctionBody,
    pub is_async: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrExprKind {
    Literal(IrLiteral),
    Identifier(IrIdent),
    Array(Vec<IrExpr>),
    Object(Vec<IrObjectEntry>),
    Member(Box<IrMemberAccess>),
    Call(Box<IrCall>),
    New(Box<IrNew>),
    This,
    Lambda(Box<IrLambda>),
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<IrExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<IrExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    Conditional {
        condition: Box<IrExpr>,
        when_true: Box<IrExpr>,
        when_false: Box<IrExpr>,
    },
    Assignment {
        op: AssignOp,
        target: Box<IrExpr>,
        value: Box<IrExpr>,
    },
    TemplateLiteral(Vec<IrTemplatePart>),
    Spread(Box<IrExpr>),
    Await(Box<IrExpr>),
    Yield {
        value: Option<Box<IrExpr>>,
        delegate: bool,
    },
    /// `expr as int`: numeric narrowing; `inferred_type` is mandatory and
    /// is the narrowing target.
    NumericNarrowing {
        operand: Box<IrExpr>,
        target: NumericKind,
    },
    /// `expr as T`: compile-time type assertion; `inferred_type` is
    /// mandatory and is the asserted type.
    TypeAssertion {
        operand: Box<IrExpr>,
        /// Erasable assertions (`as unknown`, extension-method helpers)
        /// emit no cast.
        erasable: bool,
    },
    /// Runtime-checked cast producing `null` on failure (C# `as`).
    TryCast {
        operand: Box<IrExpr>,
    },
    /// Interface view over a CLR object.
    AsInterface {
        operand: Box<IrExpr>,
    },
    /// `stackAlloc<T>(n)`
    StackAlloc {
        element: TypeRef,
        length: Box<IrExpr>,
    },
    /// `defaultOf<T>()`; the type is `inferred_type`.
    DefaultOf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IrType;

    fn ident(name: &str) -> IrExpr {
        IrExpr::new(IrExprKind::Identifier(IrIdent {
            name: name.into(),
            decl: None,
        }))
    }

    #[test]
    fn simple_reference_detection() {
        let n = ident("n");
        assert!(n.is_simple_reference());

        let access = IrExpr::new(IrExprKind::Member(Box::new(IrMemberAccess {
            object: ident("obj"),
            member: IrMemberKey::Name("x".into()),
            optional: false,
            access_kind: None,
            binding: None,
            member_id: None,
            is_type_reference: false,
        })));
        assert!(access.is_simple_reference());
        assert_eq!(access.root_identifier(), Some("obj"));

        let computed = IrExpr::new(IrExprKind::Member(Box::new(IrMemberAccess {
            object: ident("obj"),
            member: IrMemberKey::Computed(IrExpr::typed(
                IrExprKind::Literal(IrLiteral::Number {
                    value: 0.0,
                    raw: "0".into(),
                }),
                IrType::number(),
            )),
            optional: false,
            access_kind: Some(AccessKind::ClrIndexer),
            binding: None,
            member_id: None,
            is_type_reference: false,
        })));
        assert!(!computed.is_simple_reference());
    }
}
