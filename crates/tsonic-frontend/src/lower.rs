//! Program lowering driver.
//!
//! Lowering runs in three passes:
//! 1. name pass: mint `DeclId`s for every module-level declaration and
//!    register type names in the nominal environment,
//! 2. catalog pass: convert member/signature annotations and record
//!    extends edges (possible only once all names exist),
//! 3. body pass: lower statement bodies to IR, threading expected types.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use tsonic_ast::{
    ClassDecl, ClassMember, FuncDecl, InterfaceDecl, InterfaceMember, Param, SourceFile, Stmt,
    StmtKind, TypeSyntax, TypeSyntaxKind,
};
use tsonic_common::diagnostics::codes;
use tsonic_ir::{
    namespace_for_path, DeclId, DeclKind, DeclRecord, IrImport, IrModule, IrProgram, IrType,
    MemberId, MemberRecord, SignatureId, SignatureRecord, TypeRef,
};
use tsonic_types::{
    type_from_syntax, IndexerEntry, MemberEntry, ParamEntry, SignatureEntry, TypeEntry, TypeScope,
};

use crate::context::{ProgramContext, ScopeStack};

/// Lower a parsed program to IR.
///
/// Diagnostics accumulate in the context's sink; the caller decides
/// whether emission may proceed.
pub fn lower_program(files: &[SourceFile], ctx: &mut ProgramContext<'_>) -> IrProgram {
    let mut lowering = Lowering::new(ctx);
    lowering.declare_names(files);
    lowering.build_catalog(files);

    let mut program = IrProgram::new();
    let mut seen_paths = FxHashSet::default();
    for file in files {
        if !seen_paths.insert(file.path.as_str()) {
            lowering
                .ctx
                .sink
                .report(&codes::DUPLICATE_MODULE, &[file.path.as_str()], None);
            continue;
        }
        program.insert(lowering.lower_module(file));
    }
    program
}

pub(crate) struct Lowering<'a, 'b> {
    pub(crate) ctx: &'b mut ProgramContext<'a>,
    pub(crate) scopes: ScopeStack,
    /// Stack of type-parameter scopes (class params, then method params).
    pub(crate) type_params: Vec<Vec<String>>,
    pub(crate) current_namespace: String,
    pub(crate) current_class: Option<DeclId>,
    pub(crate) current_return_type: Option<TypeRef>,
    /// First deterministic return-expression type seen while lowering an
    /// unannotated function body.
    pub(crate) inferred_return: Option<TypeRef>,
    /// Module-level value declarations by bare name, across all modules.
    pub(crate) module_values: FxHashMap<String, DeclId>,
    /// Names imported by the module currently being lowered.
    pub(crate) current_imports: FxHashSet<String>,
}

impl<'a, 'b> Lowering<'a, 'b> {
    fn new(ctx: &'b mut ProgramContext<'a>) -> Self {
        Lowering {
            ctx,
            scopes: ScopeStack::new(),
            type_params: Vec::new(),
            current_namespace: String::new(),
            current_class: None,
            current_return_type: None,
            inferred_return: None,
            module_values: FxHashMap::default(),
            current_imports: FxHashSet::default(),
        }
    }

    pub(crate) fn type_scope(&self) -> TypeScope {
        TypeScope::with_params(self.type_params.iter().flatten())
    }

    /// Convert a type annotation in the current scope.
    pub(crate) fn convert_type(&self, syntax: &TypeSyntax) -> TypeRef {
        type_from_syntax(
            syntax,
            &self.type_scope(),
            &self.ctx.types.nominal,
            self.ctx.bindings,
        )
    }

    fn qualified_name(&self, namespace: &str, name: &str) -> String {
        if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}.{name}")
        }
    }

    // =========================================================================
    // Pass 1: names
    // =========================================================================

    fn declare_names(&mut self, files: &[SourceFile]) {
        for file in files {
            let namespace = namespace_for_path(&self.ctx.options.root_namespace, &file.path);
            for stmt in &file.statements {
                self.declare_stmt_name(&namespace, stmt);
            }
        }
    }

    fn declare_stmt_name(&mut self, namespace: &str, stmt: &Stmt) {
        let (kind, name, annotation) = match &stmt.kind {
            StmtKind::Class(decl) => (DeclKind::Class, decl.name.as_str(), None),
            StmtKind::Interface(decl) => (DeclKind::Interface, decl.name.as_str(), None),
            StmtKind::Enum(decl) => (DeclKind::Enum, decl.name.as_str(), None),
            StmtKind::TypeAlias(decl) => (DeclKind::TypeAlias, decl.name.as_str(), Some(&decl.ty)),
            StmtKind::Func(decl) => (DeclKind::Function, decl.name.as_str(), None),
            StmtKind::Var(decl) => (
                DeclKind::Variable,
                decl.name.as_str(),
                decl.type_annotation.as_ref(),
            ),
            _ => return,
        };
        let type_syntax = annotation.map(|s| self.ctx.handles.capture_type_syntax(s.clone()));
        let qualified = self.qualified_name(namespace, name);
        let decl = self.ctx.handles.alloc_decl(DeclRecord {
            kind,
            name: name.to_string(),
            qualified_name: qualified.clone(),
            type_syntax,
            span: stmt.span,
        });
        if kind.is_type() {
            self.ctx.types.nominal.register_name(name, decl);
            self.ctx.types.nominal.register_name(qualified, decl);
        } else {
            self.module_values.entry(name.to_string()).or_insert(decl);
        }
        debug!(name, ?kind, ?decl, "declared");
    }

    pub(crate) fn module_decl(&self, namespace: &str, name: &str) -> Option<DeclId> {
        self.ctx
            .handles
            .decl_by_qualified_name(&self.qualified_name(namespace, name))
    }

    // =========================================================================
    // Pass 2: catalog
    // =========================================================================

    fn build_catalog(&mut self, files: &[SourceFile]) {
        for file in files {
            let namespace = namespace_for_path(&self.ctx.options.root_namespace, &file.path);
            self.current_namespace = namespace.clone();
            for stmt in &file.statements {
                match &stmt.kind {
                    StmtKind::Class(decl) => self.catalog_class(&namespace, decl),
                    StmtKind::Interface(decl) => self.catalog_interface(&namespace, decl),
                    StmtKind::Func(decl) => self.catalog_function(&namespace, decl),
                    _ => {}
                }
            }
        }
        self.current_namespace.clear();
    }

    fn catalog_class(&mut self, namespace: &str, decl: &ClassDecl) {
        let Some(decl_id) = self.module_decl(namespace, &decl.name) else {
            return;
        };
        self.type_params.push(decl.type_params.clone());

        let mut members = indexmap::IndexMap::new();
        for member in &decl.members {
            match member {
                ClassMember::Property {
                    name,
                    type_annotation,
                    is_static,
                    ..
                } => {
                    let ty = type_annotation
                        .as_ref()
                        .map(|t| self.convert_type(t))
                        .unwrap_or_else(IrType::unknown);
                    let member_id = self.alloc_member(decl_id, name);
                    members.insert(
                        name.clone(),
                        MemberEntry {
                            name: name.clone(),
                            member_id,
                            declared_type: Some(ty),
                            signatures: vec![],
                            is_static: *is_static,
                        },
                    );
                }
                ClassMember::Method {
                    name,
                    type_params,
                    params,
                    return_type,
                    is_static,
                    ..
                } => {
                    let member_id = self.alloc_member(decl_id, name);
                    let overload_index = members
                        .get(name)
                        .map(|e: &MemberEntry| e.signatures.len())
                        .unwrap_or(0) as u32;
                    let sig = self.alloc_method_signature(
                        decl_id,
                        Some(member_id),
                        overload_index,
                        type_params,
                        params,
                        return_type.as_ref(),
                    );
                    let entry: &mut MemberEntry =
                        members.entry(name.clone()).or_insert_with(|| MemberEntry {
                            name: name.clone(),
                            member_id,
                            declared_type: None,
                            signatures: vec![],
                            is_static: *is_static,
                        });
                    entry.signatures.push(sig);
                }
                ClassMember::Constructor { params, .. } => {
                    let overload_index = members
                        .get("constructor")
                        .map(|e: &MemberEntry| e.signatures.len())
                        .unwrap_or(0) as u32;
                    let sig =
                        self.alloc_method_signature(decl_id, None, overload_index, &[], params, None);
                    let entry: &mut MemberEntry = members
                        .entry("constructor".to_string())
                        .or_insert_with(|| MemberEntry {
                            name: "constructor".into(),
                            member_id: self.ctx.handles.alloc_member(MemberRecord {
                                owner: decl_id,
                                name: "constructor".into(),
                                qualified_name: format!("{}.constructor", decl.name),
                                span: tsonic_common::Span::dummy(),
                            }),
                            declared_type: None,
                            signatures: vec![],
                            is_static: false,
                        });
                    entry.signatures.push(sig);
                }
            }
        }

        if let Some(extends) = &decl.extends {
            self.record_extends(decl_id, extends);
        }
        for implemented in &decl.implements {
            self.record_extends(decl_id, implemented);
        }

        self.ctx.types.catalog.define_type(TypeEntry {
            decl: decl_id,
            name: decl.name.clone(),
            qualified_name: self.qualified_name(namespace, &decl.name),
            type_params: decl.type_params.clone(),
            members,
            indexers: Vec::new(),
        });
        self.type_params.pop();
    }

    fn catalog_interface(&mut self, namespace: &str, decl: &InterfaceDecl) {
        let Some(decl_id) = self.module_decl(namespace, &decl.name) else {
            return;
        };
        self.type_params.push(decl.type_params.clone());

        let mut members = indexmap::IndexMap::new();
        let mut indexers = Vec::new();
        for member in &decl.members {
            match member {
                InterfaceMember::Property { name, ty, .. } => {
                    let converted = self.convert_type(ty);
                    let member_id = self.alloc_member(decl_id, name);
                    members.insert(
                        name.clone(),
                        MemberEntry {
                            name: name.clone(),
                            member_id,
                            declared_type: Some(converted),
                            signatures: vec![],
                            is_static: false,
                        },
                    );
                }
                InterfaceMember::Method {
                    name,
                    type_params,
                    params,
                    return_type,
                } => {
                    let member_id = self.alloc_member(decl_id, name);
                    let overload_index = members
                        .get(name)
                        .map(|e: &MemberEntry| e.signatures.len())
                        .unwrap_or(0) as u32;
                    let sig = self.alloc_method_signature(
                        decl_id,
                        Some(member_id),
                        overload_index,
                        type_params,
                        params,
                        Some(return_type),
                    );
                    let entry: &mut MemberEntry =
                        members.entry(name.clone()).or_insert_with(|| MemberEntry {
                            name: name.clone(),
                            member_id,
                            declared_type: None,
                            signatures: vec![],
                            is_static: false,
                        });
                    entry.signatures.push(sig);
                }
                InterfaceMember::Indexer { key, value } => {
                    indexers.push(IndexerEntry {
                        key: self.convert_type(key),
                        value: self.convert_type(value),
                    });
                }
            }
        }

        for extended in &decl.extends {
            self.record_extends(decl_id, extended);
        }

        self.ctx.types.catalog.define_type(TypeEntry {
            decl: decl_id,
            name: decl.name.clone(),
            qualified_name: self.qualified_name(namespace, &decl.name),
            type_params: decl.type_params.clone(),
            members,
            indexers,
        });
        self.type_params.pop();
    }

    fn catalog_function(&mut self, namespace: &str, decl: &FuncDecl) {
        let Some(decl_id) = self.module_decl(namespace, &decl.name) else {
            return;
        };
        let overload_index = self.ctx.types.catalog.function_signatures(decl_id).len() as u32;
        let sig = self.alloc_method_signature(
            decl_id,
            None,
            overload_index,
            &decl.type_params,
            &decl.params,
            decl.return_type.as_ref(),
        );
        self.ctx.types.catalog.add_function_signature(decl_id, sig);
    }

    fn alloc_member(&mut self, owner: DeclId, name: &str) -> MemberId {
        let owner_name = self
            .ctx
            .handles
            .decl(owner)
            .map(|d| d.qualified_name.clone())
            .unwrap_or_default();
        self.ctx.handles.alloc_member(MemberRecord {
            owner,
            name: name.to_string(),
            qualified_name: format!("{owner_name}.{name}"),
            span: tsonic_common::Span::dummy(),
        })
    }

    fn alloc_method_signature(
        &mut self,
        owner: DeclId,
        member: Option<MemberId>,
        overload_index: u32,
        type_params: &[String],
        params: &[Param],
        return_type: Option<&TypeSyntax>,
    ) -> SignatureId {
        self.type_params.push(type_params.to_vec());
        let param_entries: Vec<ParamEntry> = params
            .iter()
            .map(|p| ParamEntry {
                name: p.name.clone(),
                ty: p
                    .type_annotation
                    .as_ref()
                    .map(|t| self.convert_type(t))
                    .unwrap_or_else(IrType::unknown),
                mode: p.mode,
                optional: p.optional,
            })
            .collect();
        let ret = return_type
            .map(|t| self.convert_type(t))
            .unwrap_or_else(IrType::void);
        self.type_params.pop();

        let sig = self.ctx.handles.alloc_signature(SignatureRecord {
            decl: owner,
            member,
            overload_index,
            span: tsonic_common::Span::dummy(),
        });
        self.ctx.types.catalog.define_signature(
            sig,
            SignatureEntry {
                owner,
                type_params: type_params.to_vec(),
                params: param_entries,
                return_type: ret,
                type_predicate: None,
            },
        );
        sig
    }

    fn record_extends(&mut self, derived: DeclId, base_syntax: &TypeSyntax) {
        if let TypeSyntaxKind::Named { name, type_args } = &base_syntax.kind {
            if let Some(base) = self.ctx.types.nominal.resolve_name(name) {
                let args: Vec<TypeRef> =
                    type_args.iter().map(|a| self.convert_type(a)).collect();
                self.ctx.types.nominal.add_extends(derived, base, args);
            }
        }
    }

    // =========================================================================
    // Pass 3: bodies
    // =========================================================================

    fn lower_module(&mut self, file: &SourceFile) -> IrModule {
        let namespace = namespace_for_path(&self.ctx.options.root_namespace, &file.path);
        self.current_namespace = namespace.clone();
        debug!(path = %file.path, %namespace, "lowering module");

        let mut imports = Vec::new();
        let mut exports = Vec::new();
        let mut body = Vec::new();
        self.current_imports.clear();
        for stmt in &file.statements {
            if let StmtKind::Import(import) = &stmt.kind {
                for name in &import.names {
                    let resolves = self.ctx.types.nominal.resolve_name(name).is_some()
                        || self.module_values.contains_key(name)
                        || self.ctx.bindings.get_namespace(name).is_some()
                        || self.ctx.bindings.get_type(name).is_some();
                    if !resolves {
                        self.ctx.sink.report(&codes::UNRESOLVED_IMPORT, &[name.as_str()], None);
                        continue;
                    }
                    self.current_imports.insert(name.clone());
                }
                imports.push(IrImport {
                    names: import.names.clone(),
                    from: import.from.clone(),
                });
                continue;
            }
            if let Some(name) = exported_name(stmt) {
                exports.push(name.to_string());
            }
            body.push(self.lower_stmt(stmt));
        }

        IrModule {
            path: file.path.clone(),
            namespace,
            imports,
            body,
            exports,
        }
    }

}

fn exported_name(stmt: &Stmt) -> Option<&str> {
    match &stmt.kind {
        StmtKind::Var(d) if d.exported => Some(&d.name),
        StmtKind::Func(d) if d.exported => Some(&d.name),
        StmtKind::Class(d) if d.exported => Some(&d.name),
        StmtKind::Interface(d) if d.exported => Some(&d.name),
        StmtKind::Enum(d) if d.exported => Some(&d.name),
        StmtKind::TypeAlias(d) if d.exported => Some(&d.name),
        _ => None,
    }
}
