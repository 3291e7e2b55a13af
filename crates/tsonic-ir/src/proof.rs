//! Numeric proofs.
//!
//! The proof pass attaches a `NumericProof` to expressions whose CLR
//! numeric kind it can establish. The emitter refuses to lower a numeric
//! narrowing without one; a missing proof there is an internal compiler
//! error, not a user diagnostic.

use tsonic_common::NumericKind;

use crate::handles::DeclId;

/// Where a proof came from. The emitter elides casts when the proven
/// expression is itself the source (a literal already of the target kind).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProofSource {
    /// The expression is a literal whose lexeme has the proven kind.
    Literal,
    /// The kind flows from a variable whose initializer was proven.
    Variable(DeclId),
    /// The kind was joined from operand kinds of a compound expression.
    Expression,
    /// The kind was established by an explicit numeric narrowing.
    Narrowing,
}

/// Proof that an expression produces a specific CLR numeric kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumericProof {
    pub kind: NumericKind,
    pub source: ProofSource,
}

impl NumericProof {
    pub fn new(kind: NumericKind, source: ProofSource) -> Self {
        NumericProof { kind, source }
    }

    pub fn literal(kind: NumericKind) -> Self {
        NumericProof {
            kind,
            source: ProofSource::Literal,
        }
    }
}
