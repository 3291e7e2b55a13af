//! IR to C# backend-AST emitter for the Tsonic compiler.
//!
//! The emitter is structural: a match over IR kinds producing the `cs`
//! backend sum type, printed to text by an external printer. The rules
//! that are more than structure:
//! - boolean-context coercion per source-language truthiness,
//! - nullable value-type `.Value` unwrapping gated by narrowed bindings,
//! - nullish type-parameter casts (cast first, then unwrap),
//! - erasable assertions producing no cast at all,
//! - proof-carrying numeric narrowing lowering (missing proof is an ICE),
//! - void-expression IIFE/discard lowering and return-in-void splitting,
//! - generator lowering through an exchange object.

pub mod cs;
pub mod emitter;
pub mod expressions;
pub mod statements;
pub mod types;

pub use cs::{
    CsArg, CsCompilation, CsCompilationUnit, CsExpr, CsLiteral, CsMember, CsParam, CsStmt,
    CsType, CsTypeDecl, CsTypeKind,
};
pub use emitter::{emit_program, Emitter};
