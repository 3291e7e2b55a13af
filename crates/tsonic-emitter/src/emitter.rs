//! Program-level emission: modules to compilation units.
//!
//! Each module becomes one compilation unit: a namespace holding the
//! module's declared types plus a synthesized static module class that
//! carries module-level functions and variables. Loose module statements
//! land in a static `Initialize` method in source order.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use tracing::debug;
use tsonic_common::CompilerOptions;
use tsonic_ir::{
    module_class_name, HandleRegistry, IrClass, IrClassMember, IrEnum, IrFunction, IrInterface,
    IrInterfaceMember, IrModule, IrProgram, IrStmtKind, IrType, IrTypeAlias, StructuralMember,
    TypeRef,
};
use tsonic_passes::{csharp_identifier, member_target_name};

use crate::cs::{
    CsCompilation, CsCompilationUnit, CsExpr, CsMember, CsParam, CsStmt, CsType, CsTypeDecl,
    CsTypeKind,
};
use crate::statements::EXCHANGE_LOCAL;

/// Emit a whole program into backend compilation units.
///
/// The caller must have run the soundness gate first; IR that violates the
/// gate's invariants is an internal error here, not a diagnostic.
pub fn emit_program(
    program: &IrProgram,
    handles: &HandleRegistry,
    options: &CompilerOptions,
) -> CsCompilation {
    let mut compilation = CsCompilation::default();
    for module in program.iter() {
        let mut emitter = Emitter::new(handles, options);
        let unit = emitter.emit_module(module);
        compilation.units.insert(module.path.clone(), unit);
    }
    compilation
}

pub struct Emitter<'a> {
    pub(crate) options: &'a CompilerOptions,
    pub(crate) handles: &'a HandleRegistry,
    pub(crate) usings: BTreeSet<String>,
    /// Bindings currently narrowed non-null (type-predicate guards).
    pub(crate) narrowed: FxHashSet<String>,
    pub(crate) return_is_void: bool,
    pub(crate) return_type: Option<TypeRef>,
    pub(crate) in_generator: bool,
}

impl<'a> Emitter<'a> {
    pub fn new(handles: &'a HandleRegistry, options: &'a CompilerOptions) -> Self {
        Emitter {
            options,
            handles,
            usings: BTreeSet::new(),
            narrowed: FxHashSet::default(),
            return_is_void: false,
            return_type: None,
            in_generator: false,
        }
    }

    pub(crate) fn add_using(&mut self, namespace: &str) {
        if !namespace.is_empty() {
            self.usings.insert(namespace.to_string());
        }
    }

    // =========================================================================
    // Modules
    // =========================================================================

    pub fn emit_module(&mut self, module: &IrModule) -> CsCompilationUnit {
        debug!(path = %module.path, "emitting module");
        let mut types: Vec<CsTypeDecl> = Vec::new();
        let mut module_members: Vec<CsMember> = Vec::new();
        let mut loose: Vec<CsStmt> = Vec::new();

        for stmt in &module.body {
            match &stmt.kind {
                IrStmtKind::Func(func) => {
                    module_members.push(self.emit_function_member(func, true));
                }
                IrStmtKind::Var(decl) => {
                    let ty = self.cs_type(&decl.declared_type);
                    let init = decl
                        .init
                        .as_ref()
                        .map(|e| self.emit_expr(e, Some(&decl.declared_type)));
                    module_members.push(CsMember::Field {
                        ty,
                        name: member_target_name(&decl.name, self.options.naming_convention),
                        is_static: true,
                        readonly: decl.is_const,
                        init,
                    });
                }
                IrStmtKind::Class(class) => types.push(self.emit_class(class)),
                IrStmtKind::Interface(interface) => types.push(self.emit_interface(interface)),
                IrStmtKind::Enum(decl) => types.push(self.emit_enum(decl)),
                IrStmtKind::TypeAlias(alias) => {
                    if let Some(decl) = self.emit_object_alias(alias) {
                        types.push(decl);
                    }
                }
                _ => loose.extend(self.emit_stmt(stmt)),
            }
        }

        if !loose.is_empty() {
            module_members.push(CsMember::Method {
                name: "Initialize".into(),
                type_params: Vec::new(),
                params: Vec::new(),
                return_type: CsType::Void,
                body: Some(loose),
                is_static: true,
                is_async: false,
            });
        }

        // The module class leads, matching declaration order of the
        // surrounding types after it.
        let mut all_types = Vec::with_capacity(types.len() + 1);
        all_types.push(CsTypeDecl {
            kind: CsTypeKind::StaticClass,
            name: module_class_name(&module.path),
            type_params: Vec::new(),
            bases: Vec::new(),
            members: module_members,
            enum_members: Vec::new(),
        });
        all_types.extend(types);

        CsCompilationUnit {
            usings: self.usings.iter().cloned().collect(),
            namespace: module.namespace.clone(),
            types: all_types,
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn emit_params(&mut self, params: &[tsonic_ir::IrParameter]) -> Vec<CsParam> {
        params
            .iter()
            .map(|p| CsParam {
                ty: self.cs_type(&p.ty),
                name: csharp_identifier(&p.name),
                modifier: (p.passing != tsonic_common::ParamMode::Value).then_some(p.passing),
            })
            .collect()
    }

    fn emit_function_member(&mut self, func: &IrFunction, is_static: bool) -> CsMember {
        let params = self.emit_params(&func.params);
        self.emit_method_like(
            member_target_name(&func.name, self.options.naming_convention),
            func.type_params.clone(),
            params,
            &func.return_type,
            &func.body,
            is_static,
            func.is_async,
            func.is_generator,
        )
    }

    fn emit_method_like(
        &mut self,
        name: String,
        type_params: Vec<String>,
        params: Vec<CsParam>,
        return_type: &TypeRef,
        body: &[tsonic_ir::IrStmt],
        is_static: bool,
        is_async: bool,
        is_generator: bool,
    ) -> CsMember {
        let saved_void = self.return_is_void;
        let saved_return = self.return_type.take();
        let saved_generator = self.in_generator;
        self.return_is_void = matches!(return_type.as_ref(), IrType::Void | IrType::Never);
        self.return_type = Some(return_type.clone());
        self.in_generator = is_generator;

        let (cs_return, mut cs_body) = if is_generator {
            let element = generator_element_type(return_type)
                .map(|t| self.cs_type(&t))
                .unwrap_or_else(CsType::object);
            self.add_using("Tsonic.Runtime");
            self.add_using("System.Collections.Generic");
            let exchange_ty =
                CsType::generic("Tsonic.Runtime.YieldExchange", vec![element.clone()]);
            let ret =
                CsType::generic("System.Collections.Generic.IEnumerable", vec![exchange_ty.clone()]);
            let prologue = CsStmt::Local {
                ty: None,
                name: EXCHANGE_LOCAL.into(),
                init: Some(CsExpr::New {
                    ty: exchange_ty,
                    args: Vec::new(),
                }),
            };
            (ret, vec![prologue])
        } else {
            (self.cs_type(return_type), Vec::new())
        };

        cs_body.extend(self.emit_stmts(body));

        self.return_is_void = saved_void;
        self.return_type = saved_return;
        self.in_generator = saved_generator;

        CsMember::Method {
            name,
            type_params,
            params,
            return_type: cs_return,
            body: Some(cs_body),
            is_static,
            is_async,
        }
    }

    fn emit_class(&mut self, class: &IrClass) -> CsTypeDecl {
        let mut bases = Vec::new();
        if let Some(extends) = &class.extends {
            bases.push(self.cs_type(extends));
        }
        for implemented in &class.implements {
            bases.push(self.cs_type(implemented));
        }

        let members = class
            .members
            .iter()
            .map(|member| match member {
                IrClassMember::Property {
                    name,
                    ty,
                    init,
                    is_static,
                    readonly,
                } => {
                    let cs_ty = self.cs_type(ty);
                    let init = init.as_ref().map(|e| self.emit_expr(e, Some(ty)));
                    CsMember::Field {
                        ty: cs_ty,
                        name: member_target_name(name, self.options.naming_convention),
                        is_static: *is_static,
                        readonly: *readonly,
                        init,
                    }
                }
                IrClassMember::Method {
                    name,
                    type_params,
                    params,
                    return_type,
                    body,
                    is_static,
                    is_async,
                    is_generator,
                } => {
                    let params = self.emit_params(params);
                    self.emit_method_like(
                        member_target_name(name, self.options.naming_convention),
                        type_params.clone(),
                        params,
                        return_type,
                        body,
                        *is_static,
                        *is_async,
                        *is_generator,
                    )
                }
                IrClassMember::Constructor { params, body } => {
                    let params = self.emit_params(params);
                    let saved_void = self.return_is_void;
                    self.return_is_void = true;
                    let body = self.emit_stmts(body);
                    self.return_is_void = saved_void;
                    CsMember::Constructor { params, body }
                }
            })
            .collect();

        CsTypeDecl {
            kind: CsTypeKind::Class,
            name: csharp_identifier(&class.name),
            type_params: class.type_params.clone(),
            bases,
            members,
            enum_members: Vec::new(),
        }
    }

    fn emit_interface(&mut self, interface: &IrInterface) -> CsTypeDecl {
        let bases = interface
            .extends
            .iter()
            .map(|t| self.cs_type(t))
            .collect();
        let members = interface
            .members
            .iter()
            .filter_map(|member| match member {
                IrInterfaceMember::Property { name, ty, optional } => {
                    let base = self.cs_type(ty);
                    let cs_ty = if *optional {
                        nullable_if_value(base, ty)
                    } else {
                        base
                    };
                    Some(CsMember::Property {
                        ty: cs_ty,
                        name: member_target_name(name, self.options.naming_convention),
                        is_static: false,
                        has_setter: true,
                    })
                }
                IrInterfaceMember::Method {
                    name,
                    type_params,
                    params,
                    return_type,
                } => {
                    let params = self.emit_params(params);
                    let return_type = self.cs_type(return_type);
                    Some(CsMember::Method {
                        name: member_target_name(name, self.options.naming_convention),
                        type_params: type_params.clone(),
                        params,
                        return_type,
                        body: None,
                        is_static: false,
                        is_async: false,
                    })
                }
                // Indexers surface through the type system; the interface
                // declaration itself does not re-emit them.
                IrInterfaceMember::Indexer { .. } => None,
            })
            .collect();

        CsTypeDecl {
            kind: CsTypeKind::Interface,
            name: csharp_identifier(&interface.name),
            type_params: interface.type_params.clone(),
            bases,
            members,
            enum_members: Vec::new(),
        }
    }

    fn emit_enum(&mut self, decl: &IrEnum) -> CsTypeDecl {
        let enum_members = decl
            .members
            .iter()
            .map(|m| {
                (
                    member_target_name(&m.name, self.options.naming_convention),
                    m.value.as_ref().map(|e| self.emit_expr_base(e)),
                )
            })
            .collect();
        CsTypeDecl {
            kind: CsTypeKind::Enum,
            name: csharp_identifier(&decl.name),
            type_params: Vec::new(),
            bases: Vec::new(),
            members: Vec::new(),
            enum_members,
        }
    }

    /// Object-type aliases materialize as plain property-bag classes; other
    /// alias shapes have no C# declaration and erase.
    fn emit_object_alias(&mut self, alias: &IrTypeAlias) -> Option<CsTypeDecl> {
        let IrType::Object(members) = alias.ty.as_ref() else {
            return None;
        };
        let members = members
            .iter()
            .map(|member| match member {
                StructuralMember::Property { name, ty, optional } => {
                    let base = self.cs_type(ty);
                    let cs_ty = if *optional {
                        nullable_if_value(base, ty)
                    } else {
                        base
                    };
                    CsMember::Property {
                        ty: cs_ty,
                        name: member_target_name(name, self.options.naming_convention),
                        is_static: false,
                        has_setter: true,
                    }
                }
                StructuralMember::Method { name, function } => {
                    let params = function
                        .params
                        .iter()
                        .map(|p| CsParam {
                            ty: self.cs_type(&p.ty),
                            name: csharp_identifier(&p.name),
                            modifier: None,
                        })
                        .collect();
                    let return_type = self.cs_type(&function.return_type);
                    CsMember::Method {
                        name: member_target_name(name, self.options.naming_convention),
                        type_params: Vec::new(),
                        params,
                        return_type,
                        body: None,
                        is_static: false,
                        is_async: false,
                    }
                }
            })
            .collect();
        Some(CsTypeDecl {
            kind: CsTypeKind::Class,
            name: csharp_identifier(&alias.name),
            type_params: Vec::new(),
            bases: Vec::new(),
            members,
            enum_members: Vec::new(),
        })
    }
}

/// Element type of a generator's declared `Iterable<T>`/`Generator<T>`.
fn generator_element_type(return_type: &TypeRef) -> Option<TypeRef> {
    if let IrType::Reference(r) = return_type.as_ref() {
        if matches!(r.name.as_str(), "Iterable" | "Generator" | "IterableIterator")
            && !r.type_args.is_empty()
        {
            return Some(r.type_args[0].clone());
        }
    }
    None
}

fn nullable_if_value(base: CsType, ty: &TypeRef) -> CsType {
    if ty.is_clr_value_type() {
        CsType::Nullable(Box::new(base))
    } else {
        base
    }
}
