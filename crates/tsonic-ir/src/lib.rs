//! Intermediate representation for the Tsonic compiler.
//!
//! The IR sits between the source AST and the C# backend AST. It is a
//! tagged-sum tree annotated with semantic facts: inferred types, numeric
//! proofs, external member bindings, and resolved signature handles.
//!
//! Everything downstream of the frontend consumes only this crate plus the
//! handle registry; raw source AST nodes never cross that boundary.

pub mod expr;
pub mod handles;
pub mod module;
pub mod proof;
pub mod stmt;
pub mod types;

pub use expr::{
    AccessKind, AssignOp, BinaryOp, ExternalMemberRef, IrCall, IrExpr, IrExprKind, IrFunctionBody,
    IrIdent, IrLambda, IrLiteral, IrMemberAccess, IrMemberKey, IrNew, IrObjectEntry, IrParameter,
    IrTemplatePart, LogicalOp, TypePredicate, UnaryOp, UpdateOp,
};
pub use handles::{
    DeclId, DeclKind, DeclRecord, HandleRegistry, MemberId, MemberRecord, SignatureId,
    SignatureRecord, TypeSyntaxId, TypeSyntaxRecord,
};
pub use module::{module_class_name, namespace_for_path, pascal_case, IrImport, IrModule, IrProgram};
pub use proof::{NumericProof, ProofSource};
pub use stmt::{
    IrCatch, IrClass, IrClassMember, IrEnum, IrEnumMember, IrFunction, IrInterface,
    IrInterfaceMember, IrStmt, IrStmtKind, IrSwitchCase, IrTypeAlias, IrVarDecl,
};
pub use types::{
    FunctionParam, FunctionType, IrType, LiteralNumber, LiteralValue, Primitive, ReferenceType,
    StructuralMember, TypeRef,
};
