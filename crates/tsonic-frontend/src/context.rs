//! Program context: the explicit state record threaded through every pass.
//!
//! There is no module-level registry singleton anywhere in the pipeline;
//! each compile owns its context and passes it along explicitly, so
//! parallel compiles in one host never share mutable state.

use rustc_hash::FxHashMap;
use tsonic_bindings::BindingRegistry;
use tsonic_common::{CompilerOptions, DiagnosticSink};
use tsonic_ir::{DeclId, HandleRegistry, TypeRef};
use tsonic_types::TypeSystem;

/// A name bound in a lexical scope during body lowering.
#[derive(Clone, Debug)]
pub struct LocalBinding {
    pub decl: DeclId,
    pub ty: TypeRef,
}

/// Everything one compile owns.
pub struct ProgramContext<'a> {
    pub options: CompilerOptions,
    pub bindings: &'a BindingRegistry,
    pub handles: HandleRegistry,
    pub types: TypeSystem,
    pub sink: DiagnosticSink,
}

impl<'a> ProgramContext<'a> {
    pub fn new(options: CompilerOptions, bindings: &'a BindingRegistry) -> Self {
        ProgramContext {
            options,
            bindings,
            handles: HandleRegistry::new(),
            types: TypeSystem::new(),
            sink: DiagnosticSink::new(),
        }
    }
}

/// Lexical scope stack used while lowering bodies.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<FxHashMap<String, LocalBinding>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn declare(&mut self, name: impl Into<String>, binding: LocalBinding) {
        if let Some(top) = self.scopes.last_mut() {
            top.insert(name.into(), binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalBinding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsonic_ir::IrType;

    #[test]
    fn scope_shadowing_and_popping() {
        let mut scopes = ScopeStack::new();
        scopes.declare(
            "x",
            LocalBinding {
                decl: DeclId(0),
                ty: IrType::number(),
            },
        );
        scopes.push();
        scopes.declare(
            "x",
            LocalBinding {
                decl: DeclId(1),
                ty: IrType::string(),
            },
        );
        assert_eq!(scopes.lookup("x").unwrap().decl, DeclId(1));
        scopes.pop();
        assert_eq!(scopes.lookup("x").unwrap().decl, DeclId(0));
        assert!(scopes.lookup("y").is_none());
    }
}
