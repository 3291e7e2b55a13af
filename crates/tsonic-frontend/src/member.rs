//! Member-access lowering.
//!
//! The receiver's IR type is computed first; the property type comes from
//! the type system with a handle-based fallback for inherited members. The
//! external member binding is resolved independently through the binding
//! registry and attached to the IR node: the emitter consumes the binding,
//! validation consumes the inferred type.

use tsonic_ast::{Expr, ExprKind};
use tsonic_bindings::{resolve_member_access, MemberResolution, ReceiverShape};
use tsonic_common::diagnostics::codes;
use tsonic_ir::{
    AccessKind, IrExpr, IrExprKind, IrMemberAccess, IrMemberKey, IrType, Primitive, TypeRef,
};
use tsonic_types::report_unknown_member;

use crate::lower::Lowering;

/// Syntactic classification of a member-access receiver.
enum SyntacticReceiver<'e> {
    /// Bare identifier naming a bound namespace.
    Namespace(&'e str),
    /// Bare identifier naming a direct-imported bound type.
    BoundType(&'e str),
    /// `namespace.type` path.
    NamespacePath { namespace: &'e str, type_name: &'e str },
    /// Anything else: an ordinary value expression.
    Value,
}

impl<'a, 'b> Lowering<'a, 'b> {
    fn classify_receiver<'e>(&self, object: &'e Expr) -> SyntacticReceiver<'e> {
        match &object.kind {
            ExprKind::Ident(name) => {
                if self.ctx.bindings.get_namespace(name).is_some() {
                    SyntacticReceiver::Namespace(name.as_str())
                } else if self.ctx.bindings.get_type(name).is_some()
                    && self.scopes.lookup(name).is_none()
                {
                    SyntacticReceiver::BoundType(name.as_str())
                } else {
                    SyntacticReceiver::Value
                }
            }
            ExprKind::Member {
                object: inner,
                property,
                ..
            } => {
                if let ExprKind::Ident(ns) = &inner.kind {
                    if let Some(namespace) = self.ctx.bindings.get_namespace(ns) {
                        if namespace.type_aliases.iter().any(|a| a == property) {
                            return SyntacticReceiver::NamespacePath {
                                namespace: ns.as_str(),
                                type_name: property.as_str(),
                            };
                        }
                    }
                }
                SyntacticReceiver::Value
            }
            _ => SyntacticReceiver::Value,
        }
    }

    pub(crate) fn lower_member_access(
        &mut self,
        object: &Expr,
        property: &str,
        optional: bool,
    ) -> IrExpr {
        match self.classify_receiver(object) {
            SyntacticReceiver::Namespace(ns) => {
                let resolution =
                    resolve_member_access(self.ctx.bindings, ReceiverShape::Identifier(ns), property);
                if let MemberResolution::TypeReference { type_alias, .. } = resolution {
                    return self.type_reference_expr(object, property, &type_alias);
                }
                // A namespace property that is not one of its types.
                self.ctx
                    .sink
                    .report(&codes::UNKNOWN_MEMBER, &[ns, property], None);
                self.plain_member(object, property, optional, IrType::unknown())
            }
            SyntacticReceiver::BoundType(type_name) => {
                let resolution = resolve_member_access(
                    self.ctx.bindings,
                    ReceiverShape::Identifier(type_name),
                    property,
                );
                self.bound_member(object, property, optional, resolution)
            }
            SyntacticReceiver::NamespacePath {
                namespace,
                type_name,
            } => {
                let resolution = resolve_member_access(
                    self.ctx.bindings,
                    ReceiverShape::NamespacePath {
                        namespace,
                        type_name,
                    },
                    property,
                );
                self.bound_member(object, property, optional, resolution)
            }
            SyntacticReceiver::Value => self.value_member(object, property, optional),
        }
    }

    /// `namespace.type`: a type reference, not a member access.
    fn type_reference_expr(&mut self, object: &Expr, property: &str, type_alias: &str) -> IrExpr {
        let external = self
            .ctx
            .bindings
            .get_type(type_alias)
            .map(|t| t.external_name.clone());
        let object = self.lower_expr(object, None);
        let ty = match external {
            Some(external) => IrType::bound_reference(type_alias, external),
            None => IrType::reference(type_alias),
        };
        IrExpr::typed(
            IrExprKind::Member(Box::new(IrMemberAccess {
                object,
                member: IrMemberKey::Name(property.to_string()),
                optional: false,
                access_kind: None,
                binding: None,
                member_id: None,
                is_type_reference: true,
            })),
            ty,
        )
    }

    /// Member of a bound (external) type; the binding carries everything
    /// the emitter needs, the member type is usually opaque.
    fn bound_member(
        &mut self,
        object: &Expr,
        property: &str,
        optional: bool,
        resolution: MemberResolution,
    ) -> IrExpr {
        let object = self.lower_expr(object, None);
        let binding = match resolution {
            MemberResolution::Member(resolved) => Some(resolved.to_external_ref(false)),
            MemberResolution::Ambiguous { member_alias } => {
                self.ctx
                    .sink
                    .report(&codes::AMBIGUOUS_BINDING_TARGET, &[member_alias.as_str()], None);
                None
            }
            MemberResolution::NotFound => {
                let receiver = object
                    .inferred_type
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "<type>".to_string());
                self.ctx
                    .sink
                    .report(&codes::UNKNOWN_MEMBER_BINDING, &[receiver.as_str(), property], None);
                None
            }
            MemberResolution::TypeReference { .. } => None,
        };
        IrExpr::new(IrExprKind::Member(Box::new(IrMemberAccess {
            object,
            member: IrMemberKey::Name(property.to_string()),
            optional,
            access_kind: None,
            binding,
            member_id: None,
            is_type_reference: false,
        })))
    }

    /// Instance-style access: type from the type system, binding from the
    /// registry, each attached independently.
    fn value_member(&mut self, object: &Expr, property: &str, optional: bool) -> IrExpr {
        let object = self.lower_expr(object, None);
        let receiver_ty = object.inferred_type.clone();

        // Property type: unified catalog first, handle fallback second.
        let mut member_id = None;
        let member_ty = receiver_ty.as_ref().and_then(|ty| {
            let direct = self.ctx.types.member_type(ty, property);
            if direct.is_some() {
                member_id = self.member_id_for(ty, property);
                return direct;
            }
            let id = self.member_id_for(ty, property)?;
            member_id = Some(id);
            self.ctx.types.type_of_member_id(&self.ctx.handles, id)
        });

        // External binding, resolved independently of the type.
        let binding = receiver_ty.as_ref().and_then(|ty| {
            let (stripped, _) = IrType::strip_nullish(ty);
            match resolve_member_access(
                self.ctx.bindings,
                ReceiverShape::Instance(&stripped),
                property,
            ) {
                MemberResolution::Member(resolved) => {
                    let instance_extension = resolved.is_extension_method;
                    Some(resolved.to_external_ref(instance_extension))
                }
                MemberResolution::Ambiguous { member_alias } => {
                    self.ctx
                        .sink
                        .report(&codes::AMBIGUOUS_BINDING_TARGET, &[member_alias.as_str()], None);
                    None
                }
                _ => None,
            }
        });

        let inferred = match (&member_ty, &binding) {
            (Some(ty), _) => Some(ty.clone()),
            // Bound members without local type info stay untyped.
            (None, Some(_)) => None,
            (None, None) => {
                if let Some(ty) = &receiver_ty {
                    if !ty.is_unknown() && !matches!(ty.as_ref(), IrType::Any) {
                        report_unknown_member(ty, property, &mut self.ctx.sink);
                    }
                }
                Some(IrType::unknown())
            }
        };

        let mut e = IrExpr::new(IrExprKind::Member(Box::new(IrMemberAccess {
            object,
            member: IrMemberKey::Name(property.to_string()),
            optional,
            access_kind: None,
            binding,
            member_id,
            is_type_reference: false,
        })));
        e.inferred_type = inferred;
        e
    }

    fn member_id_for(&self, receiver: &TypeRef, property: &str) -> Option<tsonic_ir::MemberId> {
        let (stripped, _) = IrType::strip_nullish(receiver);
        let (decl, _args) = self.ctx.types.nominal.normalize(&stripped)?;
        for candidate in self.ctx.types.nominal.inheritance_chain(decl) {
            if let Some(entry) = self.ctx.types.catalog.member(candidate, property) {
                return Some(entry.member_id);
            }
        }
        None
    }

    fn plain_member(
        &mut self,
        object: &Expr,
        property: &str,
        optional: bool,
        ty: TypeRef,
    ) -> IrExpr {
        let object = self.lower_expr(object, None);
        IrExpr::typed(
            IrExprKind::Member(Box::new(IrMemberAccess {
                object,
                member: IrMemberKey::Name(property.to_string()),
                optional,
                access_kind: None,
                binding: None,
                member_id: None,
                is_type_reference: false,
            })),
            ty,
        )
    }

    // =========================================================================
    // Computed access
    // =========================================================================

    pub(crate) fn lower_computed_access(
        &mut self,
        object: &Expr,
        index: &Expr,
        optional: bool,
    ) -> IrExpr {
        let object = self.lower_expr(object, None);
        let receiver_ty = object
            .inferred_type
            .as_ref()
            .map(|t| IrType::strip_nullish(t).0);

        let (access_kind, value_ty, index_expected) = match receiver_ty.as_deref() {
            Some(IrType::Array(elem)) => (
                AccessKind::ClrIndexer,
                Some(elem.clone()),
                Some(IrType::primitive(Primitive::Int)),
            ),
            Some(IrType::Dictionary { key, value }) => {
                (AccessKind::Dictionary, Some(value.clone()), Some(key.clone()))
            }
            Some(IrType::Primitive(Primitive::String)) => (
                AccessKind::StringChar,
                Some(IrType::primitive(Primitive::Char)),
                Some(IrType::primitive(Primitive::Int)),
            ),
            Some(IrType::Reference(_)) => {
                let receiver = receiver_ty.as_ref().unwrap();
                match self.ctx.types.indexer_info(receiver) {
                    Some(info) => {
                        let integer_keyed = info
                            .key_type
                            .numeric_kind()
                            .is_some_and(|k| k.is_integer());
                        let kind = if integer_keyed {
                            AccessKind::ClrIndexer
                        } else {
                            AccessKind::Dictionary
                        };
                        (kind, Some(info.value_type), Some(info.key_type))
                    }
                    None => (AccessKind::Unknown, None, None),
                }
            }
            Some(IrType::Tuple(_)) => (AccessKind::ClrIndexer, None, Some(IrType::primitive(Primitive::Int))),
            _ => (AccessKind::Unknown, None, None),
        };

        let index = self.lower_expr(index, index_expected.as_ref());

        let mut e = IrExpr::new(IrExprKind::Member(Box::new(IrMemberAccess {
            object,
            member: IrMemberKey::Computed(index),
            optional,
            access_kind: Some(access_kind),
            binding: None,
            member_id: None,
            is_type_reference: false,
        })));
        e.inferred_type = value_ty;
        e
    }
}
