//! AST to IR lowering for the Tsonic compiler.
//!
//! The frontend walks each source module twice: a declaration pass that
//! mints handles and populates the type catalog and nominal environment,
//! and a body pass that lowers statements and expressions with expected
//! types threaded throughout. Downstream passes consume only the produced
//! IR plus the handle registry.

pub mod calls;
pub mod context;
pub mod exprs;
pub mod lower;
pub mod member;
pub mod stmts;

pub use context::{LocalBinding, ProgramContext, ScopeStack};
pub use lower::lower_program;
