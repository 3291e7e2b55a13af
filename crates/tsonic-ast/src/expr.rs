//! Expression nodes.

use crate::stmt::{Param, Stmt};
use crate::types::TypeSyntax;
use tsonic_common::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            span: Span::dummy(),
        }
    }

    pub fn with_span(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    /// Shorthand for an identifier expression.
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Ident(name.into()))
    }

    /// Shorthand for a number literal, keeping the raw lexeme.
    pub fn number(raw: impl Into<String>) -> Self {
        Expr::new(ExprKind::NumberLit { raw: raw.into() })
    }

    /// Shorthand for a string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Expr::new(ExprKind::StringLit(value.into()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Numeric literal; the raw lexeme drives numeric-kind classification.
    NumberLit { raw: String },
    StringLit(String),
    BoolLit(bool),
    NullLit,
    UndefinedLit,
    TemplateLit(Vec<TemplatePart>),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<ObjectEntry>),
    /// `obj.prop` / `obj?.prop`
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// `obj[index]` / `obj?.[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeSyntax>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        type_args: Vec<TypeSyntax>,
        args: Vec<Expr>,
    },
    This,
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Arrow function. `body` is either a single-expression body or a block.
    Arrow {
        params: Vec<Param>,
        return_type: Option<TypeSyntax>,
        body: ArrowBody,
        is_async: bool,
    },
    /// `expr as T`: lowering decides between a numeric narrowing, a type
    /// assertion, or an erasable assertion based on `T`.
    As {
        expr: Box<Expr>,
        ty: TypeSyntax,
    },
    Spread(Box<Expr>),
    Await(Box<Expr>),
    Yield {
        value: Option<Box<Expr>>,
        delegate: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectEntry {
    Property { key: String, value: Expr },
    Spread(Expr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    InstanceOf,
    In,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    CoalesceAssign,
}
