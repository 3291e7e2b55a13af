//! Deterministic type system for the Tsonic compiler.
//!
//! This crate implements the deterministic type queries the middle end is
//! allowed to answer:
//! - `substitute`/`unify` - pure recursive operations over `IrType`
//! - `TypeCatalog` - members and signatures of declared types
//! - `NominalEnv` - the inheritance graph with per-edge substitutions
//! - `TypeSystem` - declaration/member/indexer queries with append-only
//!   caches, and two-pass call resolution
//!
//! TypeScript-style bidirectional inference is deliberately absent: when a
//! query cannot be answered deterministically it produces a diagnostic and
//! `unknown`, never a guess.

pub mod catalog;
pub use catalog::{
    IndexerEntry, MemberEntry, ParamEntry, SignatureEntry, TypeCatalog, TypeEntry,
};

pub mod nominal;
pub use nominal::NominalEnv;

pub mod substitute;
pub use substitute::{substitute, Substitution};

pub mod unify;
pub use unify::{unify, unify_into, UnifyError};

pub mod syntax;
pub use syntax::{type_from_syntax, TypeScope};

pub mod queries;
pub use queries::{
    function_type_of_signature, report_unknown_member, IndexerInfo, TypeSystem,
};

pub mod calls;
pub use calls::{CallRequest, CallResolution};
