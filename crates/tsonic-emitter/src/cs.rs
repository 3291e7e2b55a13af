//! The C# backend AST.
//!
//! A second, target-specific sum type: the emitter produces these trees and
//! an external printer turns them into text. Equality is structural, which
//! is what the determinism property is stated over (byte-equal backend
//! AST).

use indexmap::IndexMap;
use tsonic_common::ParamMode;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CsType {
    /// Possibly-qualified, possibly-generic name: `int`,
    /// `System.Collections.Generic.List` with args.
    Named { name: String, args: Vec<CsType> },
    Array(Box<CsType>),
    Nullable(Box<CsType>),
    Void,
}

impl CsType {
    pub fn named(name: impl Into<String>) -> CsType {
        CsType::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<CsType>) -> CsType {
        CsType::Named {
            name: name.into(),
            args,
        }
    }

    pub fn object() -> CsType {
        CsType::named("object")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CsLiteral {
    /// Numeric literal kept as written (plus any kind suffix).
    Number(String),
    String(String),
    Char(char),
    Bool(bool),
    Null,
}

/// One call argument with its optional passing modifier.
#[derive(Clone, Debug, PartialEq)]
pub struct CsArg {
    pub modifier: Option<ParamMode>,
    pub value: CsExpr,
}

impl CsArg {
    pub fn plain(value: CsExpr) -> CsArg {
        CsArg {
            modifier: None,
            value,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CsLambdaBody {
    Expr(Box<CsExpr>),
    Block(Vec<CsStmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CsInterpPart {
    Text(String),
    Expr(CsExpr),
}

/// One arm of a pattern-switch expression: `pattern => value`.
#[derive(Clone, Debug, PartialEq)]
pub struct CsSwitchArm {
    pub pattern: String,
    pub value: CsExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CsExpr {
    Literal(CsLiteral),
    Ident(String),
    This,
    Base,
    Default(Option<CsType>),
    Member {
        target: Box<CsExpr>,
        name: String,
    },
    Index {
        target: Box<CsExpr>,
        index: Box<CsExpr>,
    },
    Invoke {
        target: Box<CsExpr>,
        type_args: Vec<CsType>,
        args: Vec<CsArg>,
    },
    New {
        ty: CsType,
        args: Vec<CsArg>,
    },
    /// `new[] { ... }` or `new T[] { ... }`.
    NewArray {
        ty: Option<CsType>,
        items: Vec<CsExpr>,
    },
    /// `new T { A = ..., B = ... }` / anonymous `new { ... }`.
    ObjectInit {
        ty: Option<CsType>,
        entries: Vec<(String, CsExpr)>,
    },
    /// `stackalloc T[n]`.
    StackAlloc {
        ty: CsType,
        length: Box<CsExpr>,
    },
    Lambda {
        params: Vec<CsLambdaParam>,
        body: CsLambdaBody,
        is_async: bool,
    },
    Unary {
        op: &'static str,
        operand: Box<CsExpr>,
    },
    /// `x++` / `x--`.
    Postfix {
        op: &'static str,
        operand: Box<CsExpr>,
    },
    Binary {
        op: &'static str,
        left: Box<CsExpr>,
        right: Box<CsExpr>,
    },
    Assign {
        op: &'static str,
        target: Box<CsExpr>,
        value: Box<CsExpr>,
    },
    Conditional {
        condition: Box<CsExpr>,
        when_true: Box<CsExpr>,
        when_false: Box<CsExpr>,
    },
    Cast {
        ty: CsType,
        expr: Box<CsExpr>,
    },
    /// `x as T`.
    AsCast {
        ty: CsType,
        expr: Box<CsExpr>,
    },
    /// `x is T` (optionally with a binding pattern).
    IsPattern {
        expr: Box<CsExpr>,
        pattern: String,
    },
    Paren(Box<CsExpr>),
    Interpolated(Vec<CsInterpPart>),
    Await(Box<CsExpr>),
    /// `subject switch { pattern => value, ... }`: the single-evaluation
    /// truthiness helper for untyped operands.
    Switch {
        subject: Box<CsExpr>,
        arms: Vec<CsSwitchArm>,
    },
}

impl CsExpr {
    pub fn ident(name: impl Into<String>) -> CsExpr {
        CsExpr::Ident(name.into())
    }

    pub fn member(target: CsExpr, name: impl Into<String>) -> CsExpr {
        CsExpr::Member {
            target: Box::new(target),
            name: name.into(),
        }
    }

    pub fn invoke(target: CsExpr, args: Vec<CsArg>) -> CsExpr {
        CsExpr::Invoke {
            target: Box::new(target),
            type_args: Vec::new(),
            args,
        }
    }

    pub fn binary(op: &'static str, left: CsExpr, right: CsExpr) -> CsExpr {
        CsExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn paren(expr: CsExpr) -> CsExpr {
        CsExpr::Paren(Box::new(expr))
    }

    pub fn number(text: impl Into<String>) -> CsExpr {
        CsExpr::Literal(CsLiteral::Number(text.into()))
    }

    /// Whether C# accepts this expression as a statement on its own.
    pub fn is_statement_expression(&self) -> bool {
        matches!(
            self,
            CsExpr::Invoke { .. }
                | CsExpr::New { .. }
                | CsExpr::Assign { .. }
                | CsExpr::Postfix { .. }
                | CsExpr::Await(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsLambdaParam {
    pub ty: Option<CsType>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsCatch {
    pub ty: Option<CsType>,
    pub binding: Option<String>,
    pub body: Vec<CsStmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsSwitchSection {
    /// `None` is the `default:` label.
    pub label: Option<CsExpr>,
    pub body: Vec<CsStmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CsStmt {
    Expr(CsExpr),
    /// `_ = e;`
    Discard(CsExpr),
    Local {
        /// `None` emits `var`.
        ty: Option<CsType>,
        name: String,
        init: Option<CsExpr>,
    },
    If {
        condition: CsExpr,
        then_branch: Vec<CsStmt>,
        else_branch: Option<Vec<CsStmt>>,
    },
    While {
        condition: CsExpr,
        body: Vec<CsStmt>,
    },
    For {
        init: Option<Box<CsStmt>>,
        condition: Option<CsExpr>,
        update: Option<CsExpr>,
        body: Vec<CsStmt>,
    },
    Foreach {
        ty: Option<CsType>,
        name: String,
        iterable: CsExpr,
        body: Vec<CsStmt>,
    },
    Switch {
        subject: CsExpr,
        sections: Vec<CsSwitchSection>,
    },
    Try {
        block: Vec<CsStmt>,
        catch: Option<CsCatch>,
        finally: Option<Vec<CsStmt>>,
    },
    Return(Option<CsExpr>),
    YieldReturn(CsExpr),
    Throw(CsExpr),
    Break,
    Continue,
    Block(Vec<CsStmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsParam {
    pub ty: CsType,
    pub name: String,
    pub modifier: Option<ParamMode>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CsMember {
    Field {
        ty: CsType,
        name: String,
        is_static: bool,
        readonly: bool,
        init: Option<CsExpr>,
    },
    Property {
        ty: CsType,
        name: String,
        is_static: bool,
        has_setter: bool,
    },
    Method {
        name: String,
        type_params: Vec<String>,
        params: Vec<CsParam>,
        return_type: CsType,
        body: Option<Vec<CsStmt>>,
        is_static: bool,
        is_async: bool,
    },
    Constructor {
        params: Vec<CsParam>,
        body: Vec<CsStmt>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsTypeKind {
    Class,
    StaticClass,
    Interface,
    Enum,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsTypeDecl {
    pub kind: CsTypeKind,
    pub name: String,
    pub type_params: Vec<String>,
    pub bases: Vec<CsType>,
    pub members: Vec<CsMember>,
    /// Enum members (name, explicit value) when `kind` is `Enum`.
    pub enum_members: Vec<(String, Option<CsExpr>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsCompilationUnit {
    /// Sorted, deduplicated using directives.
    pub usings: Vec<String>,
    pub namespace: String,
    pub types: Vec<CsTypeDecl>,
}

/// A whole compiled program: source path → compilation unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsCompilation {
    pub units: IndexMap<String, CsCompilationUnit>,
}
