//! Member-access resolution protocol.
//!
//! Used by the frontend for every `obj.prop` lowering. The protocol walks
//! four receiver shapes in order: namespace-qualified type references,
//! direct-imported types, `namespace.type` paths, and instance-style
//! receivers whose nominal type name is extracted from the receiver's IR
//! type. Overloads that disagree on their external target collapse to an
//! ambiguity the caller must diagnose.

use tracing::trace;
use tsonic_common::ParamMode;
use tsonic_ir::{ExternalMemberRef, IrType};

use crate::manifest::MemberKind;
use crate::registry::{is_extension_bucket_name, BindingRegistry, MemberBinding};

/// Shape of the receiver expression at a member-access site.
#[derive(Clone, Copy, Debug)]
pub enum ReceiverShape<'a> {
    /// A bare identifier; may name a namespace or a direct-imported type.
    Identifier(&'a str),
    /// A `namespace.type` path.
    NamespacePath {
        namespace: &'a str,
        type_name: &'a str,
    },
    /// Instance-style access; the receiver's IR type drives extraction.
    Instance(&'a IrType),
}

/// A member binding with overloads collapsed to one external target.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMember {
    pub assembly: String,
    pub external_type: String,
    pub external_member: String,
    pub kind: MemberKind,
    /// Only present when every overload agrees; otherwise left to
    /// call-time selection.
    pub param_modifiers: Option<Vec<(usize, ParamMode)>>,
    pub is_extension_method: bool,
}

/// Outcome of the member-access protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum MemberResolution {
    /// The access names a type inside a namespace, not a member.
    TypeReference {
        namespace: String,
        type_alias: String,
    },
    Member(ResolvedMember),
    /// Overloads bind to different CLR targets; caller must diagnose.
    Ambiguous { member_alias: String },
    NotFound,
}

/// Run the member-access resolution protocol for `receiver.property`.
pub fn resolve_member_access(
    registry: &BindingRegistry,
    receiver: ReceiverShape<'_>,
    property: &str,
) -> MemberResolution {
    match receiver {
        ReceiverShape::Identifier(name) => {
            // Step 1: namespace whose property is one of its types.
            if let Some(ns) = registry.get_namespace(name) {
                if ns.type_aliases.iter().any(|alias| alias == property) {
                    trace!(namespace = name, ty = property, "access is a type reference");
                    return MemberResolution::TypeReference {
                        namespace: name.to_string(),
                        type_alias: property.to_string(),
                    };
                }
            }
            // Step 2: direct-imported type.
            if registry.get_type(name).is_some() {
                return collapse(registry.get_member_overloads(name, property), property);
            }
            MemberResolution::NotFound
        }
        // Step 3: `namespace.type` receiver.
        ReceiverShape::NamespacePath {
            namespace,
            type_name,
        } => {
            if registry.get_namespace(namespace).is_none() {
                return MemberResolution::NotFound;
            }
            collapse(registry.get_member_overloads(type_name, property), property)
        }
        // Step 4: instance-style receiver.
        ReceiverShape::Instance(ty) => match extract_instance_type_name(ty) {
            Some(type_name) => {
                collapse(registry.get_member_overloads(&type_name, property), property)
            }
            None => MemberResolution::NotFound,
        },
    }
}

/// Extract the nominal type name from an instance receiver's IR type.
///
/// Strips tsbindgen `$instance` suffixes and walks intersections of the
/// `T$instance & __T$views` shape, ignoring view members.
pub fn extract_instance_type_name(ty: &IrType) -> Option<String> {
    match ty {
        IrType::Reference(r) => Some(strip_instance_suffix(&r.name)),
        IrType::Union(members) => {
            // Nullish wrappers are stripped by the caller; a lone
            // non-nullish member still resolves.
            let non_nullish: Vec<_> = members.iter().filter(|m| !m.is_nullish()).collect();
            if non_nullish.len() == 1 {
                extract_instance_type_name(non_nullish[0])
            } else {
                None
            }
        }
        IrType::Intersection(members) => members.iter().find_map(|m| {
            if let IrType::Reference(r) = m.as_ref() {
                if r.name.ends_with("$instance") {
                    return Some(strip_instance_suffix(&r.name));
                }
                if !r.name.ends_with("$views") {
                    return Some(strip_instance_suffix(&r.name));
                }
            }
            None
        }),
        _ => None,
    }
}

fn strip_instance_suffix(name: &str) -> String {
    let base = name.strip_suffix("$instance").unwrap_or(name);
    // View wrappers are named `__T$views`; strip both decorations.
    let base = base.strip_prefix("__").unwrap_or(base);
    base.to_string()
}

/// Collapse an overload list per the binding-resolution rule.
fn collapse(overloads: &[MemberBinding], member_alias: &str) -> MemberResolution {
    let Some(first) = overloads.first() else {
        return MemberResolution::NotFound;
    };
    if overloads.iter().any(|b| b.target() != first.target()) {
        return MemberResolution::Ambiguous {
            member_alias: member_alias.to_string(),
        };
    }
    // Modifier lists attach only when all overloads agree.
    let all_modifiers_agree = overloads
        .iter()
        .all(|b| b.param_modifiers == first.param_modifiers);
    MemberResolution::Member(ResolvedMember {
        assembly: first.assembly.clone(),
        external_type: first.external_type.clone(),
        external_member: first.external_member.clone(),
        kind: first.kind,
        param_modifiers: all_modifiers_agree.then(|| first.param_modifiers.clone()),
        is_extension_method: first.is_extension_method,
    })
}

impl ResolvedMember {
    /// Convert to the IR attachment. For instance-style extension calls the
    /// receiver occupies parameter slot 0; modifier indices shift down by
    /// one and the receiver slot drops out.
    pub fn to_external_ref(&self, instance_style_extension: bool) -> ExternalMemberRef {
        let param_modes = match &self.param_modifiers {
            Some(modifiers) if instance_style_extension => modifiers
                .iter()
                .filter(|(index, _)| *index > 0)
                .map(|(index, mode)| (index - 1, *mode))
                .collect(),
            Some(modifiers) => modifiers.clone(),
            None => Vec::new(),
        };
        ExternalMemberRef {
            assembly: self.assembly.clone(),
            external_type: self.external_type.clone(),
            external_member: self.external_member.clone(),
            param_modes,
            is_extension: self.is_extension_method,
        }
    }

    /// Whether the member's declaring type is an extension bucket, in
    /// which case the binding must come from the extension index.
    pub fn declared_in_extension_bucket(&self) -> bool {
        is_extension_bucket_name(&self.external_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BindingsFile;
    use tsonic_common::DiagnosticSink;

    fn registry() -> BindingRegistry {
        let json = r#"{
            "assembly": "System.Runtime",
            "namespaces": [{
                "name": "system",
                "alias": "System",
                "types": [
                    {
                        "name": "console",
                        "alias": "Console",
                        "kind": "class",
                        "members": [
                            {
                                "kind": "method",
                                "name": "log",
                                "alias": "WriteLine",
                                "binding": {"assembly": "System.Console", "type": "System.Console", "member": "WriteLine"},
                                "parameterCount": 1
                            }
                        ]
                    },
                    {
                        "name": "list",
                        "alias": "List`1",
                        "kind": "class",
                        "members": [
                            {
                                "kind": "property",
                                "name": "count",
                                "alias": "Count",
                                "binding": {"assembly": "System.Runtime", "type": "System.Collections.Generic.List`1", "member": "Count"}
                            },
                            {
                                "kind": "method",
                                "name": "clashing",
                                "alias": "A",
                                "binding": {"assembly": "System.Runtime", "type": "System.Collections.Generic.List`1", "member": "A"}
                            },
                            {
                                "kind": "method",
                                "name": "clashing",
                                "alias": "B",
                                "binding": {"assembly": "System.Runtime", "type": "System.Collections.Generic.List`1", "member": "B"}
                            }
                        ]
                    }
                ]
            }]
        }"#;
        let mut sink = DiagnosticSink::new();
        let file = BindingsFile::from_json_str(json, &mut sink).unwrap();
        let mut registry = BindingRegistry::new();
        registry.ingest(&file);
        registry
    }

    #[test]
    fn namespace_property_is_type_reference() {
        let r = registry();
        let resolution = resolve_member_access(&r, ReceiverShape::Identifier("system"), "console");
        assert_eq!(
            resolution,
            MemberResolution::TypeReference {
                namespace: "system".into(),
                type_alias: "console".into(),
            }
        );
    }

    #[test]
    fn direct_imported_type_member() {
        let r = registry();
        let resolution = resolve_member_access(&r, ReceiverShape::Identifier("console"), "log");
        let MemberResolution::Member(member) = resolution else {
            panic!("expected member resolution");
        };
        assert_eq!(member.external_member, "WriteLine");
        assert_eq!(member.external_type, "System.Console");
    }

    #[test]
    fn namespace_path_member() {
        let r = registry();
        let resolution = resolve_member_access(
            &r,
            ReceiverShape::NamespacePath {
                namespace: "system",
                type_name: "console",
            },
            "log",
        );
        assert!(matches!(resolution, MemberResolution::Member(_)));
    }

    #[test]
    fn instance_receiver_strips_instance_suffix() {
        let r = registry();
        let ty = IrType::reference("list$instance");
        let resolution = resolve_member_access(&r, ReceiverShape::Instance(&ty), "count");
        let MemberResolution::Member(member) = resolution else {
            panic!("expected member resolution");
        };
        assert_eq!(member.external_member, "Count");
    }

    #[test]
    fn instance_receiver_walks_views_intersection() {
        let ty = IrType::intersection(vec![
            IrType::reference("list$instance"),
            IrType::reference("__list$views"),
        ]);
        assert_eq!(extract_instance_type_name(&ty), Some("list".to_string()));
    }

    #[test]
    fn conflicting_targets_are_ambiguous() {
        let r = registry();
        let ty = IrType::reference("list");
        let resolution = resolve_member_access(&r, ReceiverShape::Instance(&ty), "clashing");
        assert_eq!(
            resolution,
            MemberResolution::Ambiguous {
                member_alias: "clashing".into(),
            }
        );
    }

    #[test]
    fn extension_modifier_shift_drops_receiver_slot() {
        let member = ResolvedMember {
            assembly: "A".into(),
            external_type: "N.T".into(),
            external_member: "M".into(),
            kind: MemberKind::Method,
            param_modifiers: Some(vec![(0, ParamMode::Ref), (2, ParamMode::Out)]),
            is_extension_method: true,
        };
        let shifted = member.to_external_ref(true);
        assert_eq!(shifted.param_modes, vec![(1, ParamMode::Out)]);
        let unshifted = member.to_external_ref(false);
        assert_eq!(
            unshifted.param_modes,
            vec![(0, ParamMode::Ref), (2, ParamMode::Out)]
        );
    }
}
