//! Common types and utilities for the Tsonic compiler.
//!
//! This crate provides foundational types used across all tsonic crates:
//! - Source spans (`Span`, `Spanned`)
//! - Line/column positions and locations (`LineMap`, `SourceLocation`)
//! - Diagnostics (`Diagnostic`, `DiagnosticSink`, stable `TSN` codes)
//! - Numeric literal parsing and the CLR numeric kind lattice
//! - Compiler options and the workspace configuration record

pub mod span;
pub use span::{Span, Spanned};

pub mod position;
pub use position::{LineMap, Position, SourceLocation};

pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticSink, RelatedLocation, Severity};

pub mod modes;
pub use modes::ParamMode;

pub mod numeric;
pub use numeric::NumericKind;

pub mod options;
pub use options::{CompilerOptions, NamingConvention, WorkspaceConfig};
