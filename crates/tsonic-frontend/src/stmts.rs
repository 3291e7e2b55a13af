//! Statement and declaration-body lowering.

use tsonic_ast::{
    ClassDecl, ClassMember, EnumDecl, FuncDecl, InterfaceDecl, InterfaceMember, Param, Stmt,
    StmtKind, TypeAliasDecl, VarDecl,
};
use tsonic_common::diagnostics::codes;
use tsonic_ir::{
    DeclKind, DeclRecord, IrCatch, IrClass, IrClassMember, IrEnum, IrEnumMember, IrExpr,
    IrFunction, IrInterface, IrInterfaceMember, IrParameter, IrStmt, IrStmtKind, IrSwitchCase,
    IrType, IrTypeAlias, IrVarDecl, Primitive, TypeRef,
};

use crate::context::LocalBinding;
use crate::lower::Lowering;

impl<'a, 'b> Lowering<'a, 'b> {
    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) -> IrStmt {
        let kind = match &stmt.kind {
            StmtKind::Expr(expr) => IrStmtKind::Expr(self.lower_expr(expr, None)),
            StmtKind::Var(decl) => IrStmtKind::Var(self.lower_var(decl)),
            StmtKind::Func(decl) => IrStmtKind::Func(self.lower_function(decl)),
            StmtKind::Class(decl) => IrStmtKind::Class(self.lower_class(decl)),
            StmtKind::Interface(decl) => IrStmtKind::Interface(self.lower_interface(decl)),
            StmtKind::Enum(decl) => IrStmtKind::Enum(self.lower_enum(decl)),
            StmtKind::TypeAlias(decl) => IrStmtKind::TypeAlias(self.lower_type_alias(decl)),
            // Imports are collected at the module level.
            StmtKind::Import(_) => IrStmtKind::Block(Vec::new()),
            StmtKind::Block(stmts) => {
                self.scopes.push();
                let lowered = stmts.iter().map(|s| self.lower_stmt(s)).collect();
                self.scopes.pop();
                IrStmtKind::Block(lowered)
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => IrStmtKind::If {
                condition: self.lower_expr(condition, None),
                then_branch: Box::new(self.lower_stmt(then_branch)),
                else_branch: else_branch
                    .as_ref()
                    .map(|s| Box::new(self.lower_stmt(s))),
            },
            StmtKind::While { condition, body } => IrStmtKind::While {
                condition: self.lower_expr(condition, None),
                body: Box::new(self.lower_stmt(body)),
            },
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scopes.push();
                let lowered = IrStmtKind::For {
                    init: init.as_ref().map(|s| Box::new(self.lower_stmt(s))),
                    condition: condition.as_ref().map(|e| self.lower_expr(e, None)),
                    update: update.as_ref().map(|e| self.lower_expr(e, None)),
                    body: Box::new(self.lower_stmt(body)),
                };
                self.scopes.pop();
                lowered
            }
            StmtKind::ForOf {
                binding,
                iterable,
                body,
            } => {
                let iterable = self.lower_expr(iterable, None);
                let element_type = element_type_of(&iterable);
                let decl = self.ctx.handles.alloc_decl(DeclRecord {
                    kind: DeclKind::Variable,
                    name: binding.clone(),
                    qualified_name: binding.clone(),
                    type_syntax: None,
                    span: stmt.span,
                });
                self.scopes.push();
                self.scopes.declare(
                    binding.clone(),
                    LocalBinding {
                        decl,
                        ty: element_type.clone(),
                    },
                );
                let body = Box::new(self.lower_stmt(body));
                self.scopes.pop();
                IrStmtKind::ForOf {
                    binding: binding.clone(),
                    binding_decl: decl,
                    element_type,
                    iterable,
                    body,
                }
            }
            StmtKind::Switch {
                discriminant,
                cases,
            } => IrStmtKind::Switch {
                discriminant: self.lower_expr(discriminant, None),
                cases: cases
                    .iter()
                    .map(|case| IrSwitchCase {
                        test: case.test.as_ref().map(|e| self.lower_expr(e, None)),
                        body: case.body.iter().map(|s| self.lower_stmt(s)).collect(),
                    })
                    .collect(),
            },
            StmtKind::Try {
                block,
                catch,
                finally,
            } => IrStmtKind::Try {
                block: block.iter().map(|s| self.lower_stmt(s)).collect(),
                catch: catch.as_ref().map(|c| {
                    self.scopes.push();
                    if let Some(binding) = &c.binding {
                        let decl = self.ctx.handles.alloc_decl(DeclRecord {
                            kind: DeclKind::Variable,
                            name: binding.clone(),
                            qualified_name: binding.clone(),
                            type_syntax: None,
                            span: stmt.span,
                        });
                        self.scopes.declare(
                            binding.clone(),
                            LocalBinding {
                                decl,
                                ty: IrType::bound_reference("Exception", "System.Exception"),
                            },
                        );
                    }
                    let body = c.body.iter().map(|s| self.lower_stmt(s)).collect();
                    self.scopes.pop();
                    IrCatch {
                        binding: c.binding.clone(),
                        body,
                    }
                }),
                finally: finally
                    .as_ref()
                    .map(|stmts| stmts.iter().map(|s| self.lower_stmt(s)).collect()),
            },
            StmtKind::Return(value) => {
                let expected = self.current_return_type.clone();
                let value = value.as_ref().map(|e| self.lower_expr(e, expected.as_ref()));
                if expected.is_none() && self.inferred_return.is_none() {
                    if let Some(value) = &value {
                        self.inferred_return = value.inferred_type.clone();
                    }
                }
                IrStmtKind::Return(value)
            }
            StmtKind::Throw(value) => IrStmtKind::Throw(self.lower_expr(value, None)),
            StmtKind::Break => IrStmtKind::Break,
            StmtKind::Continue => IrStmtKind::Continue,
        };
        IrStmt {
            kind,
            span: stmt.span,
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn lower_var(&mut self, decl: &VarDecl) -> IrVarDecl {
        // Module-level declarations already own a handle from the name
        // pass; locals mint one here.
        let namespace = self.current_namespace.clone();
        let existing = self.module_decl(&namespace, &decl.name);
        let decl_id = existing.unwrap_or_else(|| {
            let type_syntax = decl
                .type_annotation
                .as_ref()
                .map(|s| self.ctx.handles.capture_type_syntax(s.clone()));
            self.ctx.handles.alloc_decl(DeclRecord {
                kind: DeclKind::Variable,
                name: decl.name.clone(),
                qualified_name: decl.name.clone(),
                type_syntax,
                span: tsonic_common::Span::dummy(),
            })
        });

        let (declared_type, init) = match &decl.type_annotation {
            Some(annotation) => {
                let ty = self.convert_type(annotation);
                let init = decl.init.as_ref().map(|e| self.lower_expr(e, Some(&ty)));
                (ty, init)
            }
            None => {
                let init = decl.init.as_ref().map(|e| self.lower_expr(e, None));
                let inferred = init.as_ref().and_then(|e| e.inferred_type.clone());
                match inferred {
                    Some(ty) if !ty.is_unknown() => (ty, init),
                    _ => {
                        self.ctx
                            .sink
                            .report(&codes::ANNOTATION_REQUIRED, &[decl.name.as_str()], None);
                        (IrType::unknown(), init)
                    }
                }
            }
        };

        self.ctx
            .types
            .record_initializer_type(decl_id, declared_type.clone());
        self.scopes.declare(
            decl.name.clone(),
            LocalBinding {
                decl: decl_id,
                ty: declared_type.clone(),
            },
        );

        IrVarDecl {
            name: decl.name.clone(),
            decl: decl_id,
            is_const: decl.kind == tsonic_ast::VarDeclKind::Const,
            declared_type,
            init,
            exported: decl.exported,
        }
    }

    fn lower_params(&mut self, params: &[Param]) -> Vec<IrParameter> {
        params
            .iter()
            .map(|p| {
                let ty = p
                    .type_annotation
                    .as_ref()
                    .map(|t| self.convert_type(t))
                    .unwrap_or_else(IrType::unknown);
                let decl = self.ctx.handles.alloc_decl(DeclRecord {
                    kind: DeclKind::Parameter,
                    name: p.name.clone(),
                    qualified_name: p.name.clone(),
                    type_syntax: None,
                    span: p.span,
                });
                self.scopes.declare(
                    p.name.clone(),
                    LocalBinding {
                        decl,
                        ty: ty.clone(),
                    },
                );
                IrParameter {
                    name: p.name.clone(),
                    decl,
                    ty,
                    passing: p.mode,
                    optional: p.optional,
                }
            })
            .collect()
    }

    fn lower_function(&mut self, decl: &FuncDecl) -> IrFunction {
        let namespace = self.current_namespace.clone();
        let decl_id = self.module_decl(&namespace, &decl.name).unwrap_or_else(|| {
            self.ctx.handles.alloc_decl(DeclRecord {
                kind: DeclKind::Function,
                name: decl.name.clone(),
                qualified_name: decl.name.clone(),
                type_syntax: None,
                span: tsonic_common::Span::dummy(),
            })
        });

        self.type_params.push(decl.type_params.clone());
        self.scopes.push();
        let params = self.lower_params(&decl.params);
        let return_type = decl
            .return_type
            .as_ref()
            .map(|t| self.convert_type(t))
            .unwrap_or_else(IrType::void);

        let saved_return = self.current_return_type.replace(return_type.clone());
        let body = decl.body.iter().map(|s| self.lower_stmt(s)).collect();
        self.current_return_type = saved_return;

        self.scopes.pop();
        self.type_params.pop();

        IrFunction {
            name: decl.name.clone(),
            decl: decl_id,
            type_params: decl.type_params.clone(),
            params,
            return_type,
            body,
            is_async: decl.is_async,
            is_generator: decl.is_generator,
            exported: decl.exported,
        }
    }

    fn lower_class(&mut self, decl: &ClassDecl) -> IrClass {
        let namespace = self.current_namespace.clone();
        let decl_id = self
            .module_decl(&namespace, &decl.name)
            .unwrap_or(tsonic_ir::DeclId::INVALID);

        self.type_params.push(decl.type_params.clone());
        let saved_class = self.current_class.replace(decl_id);

        let extends = decl.extends.as_ref().map(|t| self.convert_type(t));
        let implements = decl.implements.iter().map(|t| self.convert_type(t)).collect();

        let members = decl
            .members
            .iter()
            .map(|member| self.lower_class_member(member))
            .collect();

        self.current_class = saved_class;
        self.type_params.pop();

        IrClass {
            name: decl.name.clone(),
            decl: decl_id,
            type_params: decl.type_params.clone(),
            extends,
            implements,
            members,
            exported: decl.exported,
        }
    }

    fn lower_class_member(&mut self, member: &ClassMember) -> IrClassMember {
        match member {
            ClassMember::Property {
                name,
                type_annotation,
                init,
                is_static,
                readonly,
            } => {
                let ty = type_annotation
                    .as_ref()
                    .map(|t| self.convert_type(t))
                    .unwrap_or_else(IrType::unknown);
                let init = init.as_ref().map(|e| self.lower_expr(e, Some(&ty)));
                IrClassMember::Property {
                    name: name.clone(),
                    ty,
                    init,
                    is_static: *is_static,
                    readonly: *readonly,
                }
            }
            ClassMember::Method {
                name,
                type_params,
                params,
                return_type,
                body,
                is_static,
                is_async,
                is_generator,
            } => {
                self.type_params.push(type_params.clone());
                self.scopes.push();
                let params = self.lower_params(params);
                let return_type = return_type
                    .as_ref()
                    .map(|t| self.convert_type(t))
                    .unwrap_or_else(IrType::void);
                let saved_return = self.current_return_type.replace(return_type.clone());
                let body = body.iter().map(|s| self.lower_stmt(s)).collect();
                self.current_return_type = saved_return;
                self.scopes.pop();
                self.type_params.pop();
                IrClassMember::Method {
                    name: name.clone(),
                    type_params: type_params.clone(),
                    params,
                    return_type,
                    body,
                    is_static: *is_static,
                    is_async: *is_async,
                    is_generator: *is_generator,
                }
            }
            ClassMember::Constructor { params, body } => {
                self.scopes.push();
                let params = self.lower_params(params);
                let saved_return = self.current_return_type.replace(IrType::void());
                let body = body.iter().map(|s| self.lower_stmt(s)).collect();
                self.current_return_type = saved_return;
                self.scopes.pop();
                IrClassMember::Constructor { params, body }
            }
        }
    }

    fn lower_interface(&mut self, decl: &InterfaceDecl) -> IrInterface {
        let namespace = self.current_namespace.clone();
        let decl_id = self
            .module_decl(&namespace, &decl.name)
            .unwrap_or(tsonic_ir::DeclId::INVALID);

        self.type_params.push(decl.type_params.clone());
        let extends = decl.extends.iter().map(|t| self.convert_type(t)).collect();
        let members = decl
            .members
            .iter()
            .map(|member| match member {
                InterfaceMember::Property { name, ty, optional } => IrInterfaceMember::Property {
                    name: name.clone(),
                    ty: self.convert_type(ty),
                    optional: *optional,
                },
                InterfaceMember::Method {
                    name,
                    type_params,
                    params,
                    return_type,
                } => {
                    self.type_params.push(type_params.clone());
                    let lowered_params = params
                        .iter()
                        .map(|p| IrParameter {
                            name: p.name.clone(),
                            decl: tsonic_ir::DeclId::INVALID,
                            ty: p
                                .type_annotation
                                .as_ref()
                                .map(|t| self.convert_type(t))
                                .unwrap_or_else(IrType::unknown),
                            passing: p.mode,
                            optional: p.optional,
                        })
                        .collect();
                    let return_type = self.convert_type(return_type);
                    self.type_params.pop();
                    IrInterfaceMember::Method {
                        name: name.clone(),
                        type_params: type_params.clone(),
                        params: lowered_params,
                        return_type,
                    }
                }
                InterfaceMember::Indexer { key, value } => IrInterfaceMember::Indexer {
                    key: self.convert_type(key),
                    value: self.convert_type(value),
                },
            })
            .collect();
        self.type_params.pop();

        IrInterface {
            name: decl.name.clone(),
            decl: decl_id,
            type_params: decl.type_params.clone(),
            extends,
            members,
            exported: decl.exported,
        }
    }

    fn lower_enum(&mut self, decl: &EnumDecl) -> IrEnum {
        let namespace = self.current_namespace.clone();
        let decl_id = self
            .module_decl(&namespace, &decl.name)
            .unwrap_or(tsonic_ir::DeclId::INVALID);
        IrEnum {
            name: decl.name.clone(),
            decl: decl_id,
            members: decl
                .members
                .iter()
                .map(|m| IrEnumMember {
                    name: m.name.clone(),
                    value: m
                        .value
                        .as_ref()
                        .map(|e| self.lower_expr(e, Some(&IrType::primitive(Primitive::Int)))),
                })
                .collect(),
            exported: decl.exported,
        }
    }

    fn lower_type_alias(&mut self, decl: &TypeAliasDecl) -> IrTypeAlias {
        let namespace = self.current_namespace.clone();
        let decl_id = self
            .module_decl(&namespace, &decl.name)
            .unwrap_or(tsonic_ir::DeclId::INVALID);
        self.type_params.push(decl.type_params.clone());
        let ty = self.convert_type(&decl.ty);
        self.type_params.pop();
        IrTypeAlias {
            name: decl.name.clone(),
            decl: decl_id,
            ty,
            exported: decl.exported,
        }
    }
}

/// Element type for `for..of` iteration.
fn element_type_of(iterable: &IrExpr) -> TypeRef {
    match iterable.inferred_type.as_deref() {
        Some(IrType::Array(elem)) => elem.clone(),
        Some(IrType::Primitive(Primitive::String)) => IrType::primitive(Primitive::Char),
        Some(IrType::Reference(r)) if r.type_args.len() == 1 => r.type_args[0].clone(),
        _ => IrType::unknown(),
    }
}
