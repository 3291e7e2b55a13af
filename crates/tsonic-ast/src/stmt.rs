//! Statement and declaration nodes.

use crate::expr::Expr;
use crate::types::TypeSyntax;
use tsonic_common::{ParamMode, Span};

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            span: Span::dummy(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Var(VarDecl),
    Func(FuncDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Import(ImportDecl),
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Break,
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarDeclKind {
    Let,
    Const,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub kind: VarDeclKind,
    pub name: String,
    pub type_annotation: Option<TypeSyntax>,
    pub init: Option<Expr>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_annotation: Option<TypeSyntax>,
    pub mode: ParamMode,
    pub optional: bool,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, type_annotation: Option<TypeSyntax>) -> Self {
        Param {
            name: name.into(),
            type_annotation,
            mode: ParamMode::Value,
            optional: false,
            span: Span::dummy(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeSyntax>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub is_generator: bool,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub extends: Option<TypeSyntax>,
    pub implements: Vec<TypeSyntax>,
    pub members: Vec<ClassMember>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassMember {
    Property {
        name: String,
        type_annotation: Option<TypeSyntax>,
        init: Option<Expr>,
        is_static: bool,
        readonly: bool,
    },
    Method {
        name: String,
        type_params: Vec<String>,
        params: Vec<Param>,
        return_type: Option<TypeSyntax>,
        body: Vec<Stmt>,
        is_static: bool,
        is_async: bool,
        is_generator: bool,
    },
    Constructor {
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub extends: Vec<TypeSyntax>,
    pub members: Vec<InterfaceMember>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterfaceMember {
    Property {
        name: String,
        ty: TypeSyntax,
        optional: bool,
    },
    Method {
        name: String,
        type_params: Vec<String>,
        params: Vec<Param>,
        return_type: TypeSyntax,
    },
    /// `[key: K]: V`
    Indexer { key: TypeSyntax, value: TypeSyntax },
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<EnumMember>,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAliasDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub ty: TypeSyntax,
    pub exported: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportDecl {
    /// Imported local names (named imports).
    pub names: Vec<String>,
    /// Module specifier, e.g. `./geo` or a bound package name.
    pub from: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// `None` for the `default` case.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub binding: Option<String>,
    pub body: Vec<Stmt>,
}
