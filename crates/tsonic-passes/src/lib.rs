//! Validation passes for the Tsonic compiler.
//!
//! Three passes run between lowering and emission:
//! - the numeric proof pass (`run_numeric_proof_pass`) attaches CLR
//!   numeric-kind proofs and rejects unprovable narrowings,
//! - the naming pass (`run_naming_pass`) flags identifier collisions under
//!   the C# naming policy,
//! - the soundness gate (`run_soundness_gate`) refuses IR that must never
//!   reach the emitter.

pub mod naming;
pub use naming::{csharp_identifier, member_target_name, run_naming_pass};

pub mod numeric_proof;
pub use numeric_proof::run_numeric_proof_pass;

pub mod soundness;
pub use soundness::run_soundness_gate;
