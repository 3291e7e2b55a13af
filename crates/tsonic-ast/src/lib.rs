//! Source AST for the Tsonic middle end.
//!
//! Parsing happens outside this workspace; the parser hands the middle end
//! fully-formed trees of these types. Every node carries a `Span` into its
//! source file. The middle end never mutates the AST; the frontend walks it
//! once to build handles and a second time to lower bodies into IR.

pub mod expr;
pub mod stmt;
pub mod types;

pub use expr::{
    ArrowBody, AssignOp, BinaryOp, Expr, ExprKind, LogicalOp, ObjectEntry, TemplatePart, UnaryOp,
    UpdateOp,
};
pub use stmt::{
    CatchClause, ClassDecl, ClassMember, EnumDecl, EnumMember, FuncDecl, ImportDecl,
    InterfaceDecl, InterfaceMember, Param, Stmt, StmtKind, SwitchCase, TypeAliasDecl, VarDecl,
    VarDeclKind,
};
pub use types::{FunctionTypeParam, ObjectTypeMember, TypeSyntax, TypeSyntaxKind};

use tsonic_common::Span;

/// One parsed source file.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    /// Workspace-relative path, e.g. `src/services/geo.ts`.
    pub path: String,
    pub statements: Vec<Stmt>,
    pub span: Span,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, statements: Vec<Stmt>) -> Self {
        SourceFile {
            path: path.into(),
            statements,
            span: Span::dummy(),
        }
    }
}
