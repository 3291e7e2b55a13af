//! Semantic middle end of the Tsonic TypeScript-to-C# compiler.
//!
//! This crate wires the pipeline together:
//!
//! ```text
//! source AST → lowering (frontend + bindings + type system) → IR
//!           → numeric proof pass → naming pass → soundness gate
//!           → emitter → C# backend AST
//! ```
//!
//! Every pass reports user errors as `TSN` diagnostics into one sink; any
//! error diagnostic refuses emission. The core is single-threaded and
//! owns all of its state per compile, so hosts may run compiles in
//! parallel without shared mutable state.

use tracing::debug;

pub use tsonic_ast as ast;
pub use tsonic_bindings as bindings;
pub use tsonic_common as common;
pub use tsonic_emitter as emitter;
pub use tsonic_frontend as frontend;
pub use tsonic_ir as ir;
pub use tsonic_passes as passes;
pub use tsonic_types as types;

use tsonic_ast::SourceFile;
use tsonic_bindings::BindingRegistry;
use tsonic_common::{Diagnostic, WorkspaceConfig};
use tsonic_emitter::CsCompilation;
use tsonic_frontend::{lower_program, ProgramContext};
use tsonic_ir::IrProgram;
use tsonic_passes::{run_naming_pass, run_numeric_proof_pass, run_soundness_gate};

/// Outcome of one compile.
#[derive(Debug)]
pub struct CompileResult {
    /// The backend AST; `None` when any error diagnostic was reported.
    pub compilation: Option<CsCompilation>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn succeeded(&self) -> bool {
        self.compilation.is_some()
    }
}

/// Compile a parsed program to the C# backend AST.
pub fn compile_program(
    files: &[SourceFile],
    bindings: &BindingRegistry,
    config: &WorkspaceConfig,
) -> CompileResult {
    let options = config.compiler_options();
    let mut ctx = ProgramContext::new(options, bindings);

    let mut program = lower_program(files, &mut ctx);
    debug!(modules = program.modules.len(), "lowering complete");

    run_numeric_proof_pass(&mut program, &mut ctx.sink);
    run_naming_pass(&program, &ctx.options, &mut ctx.sink);
    let sound = run_soundness_gate(&program, &ctx.types.nominal, &mut ctx.sink);

    // Any error refuses emission; the gate result is folded into the same
    // rule since gate failures are error diagnostics.
    if ctx.sink.has_errors() || !sound {
        debug!(errors = ctx.sink.error_count(), "emission refused");
        return CompileResult {
            compilation: None,
            diagnostics: ctx.sink.into_vec(),
        };
    }

    let compilation = tsonic_emitter::emit_program(&program, &ctx.handles, &ctx.options);
    CompileResult {
        compilation: Some(compilation),
        diagnostics: ctx.sink.into_vec(),
    }
}

/// Lower only, without validation or emission. Exposed for hosts and tests
/// that inspect the IR directly.
pub fn lower_to_ir<'a>(
    files: &[SourceFile],
    bindings: &'a BindingRegistry,
    config: &WorkspaceConfig,
) -> (IrProgram, ProgramContext<'a>) {
    let options = config.compiler_options();
    let mut ctx = ProgramContext::new(options, bindings);
    let program = lower_program(files, &mut ctx);
    (program, ctx)
}
