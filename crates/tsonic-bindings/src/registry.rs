//! The binding registry.
//!
//! Built once from sidecar manifests during program setup; read-only for
//! the rest of compilation. Lookups preserve manifest declaration order so
//! overload selection is stable across runs.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::debug;
use tsonic_common::ParamMode;

use crate::manifest::{BindingsFile, MemberKind, TypeKind};

/// Local-name prefixes of tsbindgen extension-method container types.
pub const EXTENSION_BUCKET_PREFIXES: [&str; 2] = ["__Ext_", "__TsonicExtMethods_"];

/// Whether a declaring type name is an extension-method bucket.
pub fn is_extension_bucket_name(name: &str) -> bool {
    EXTENSION_BUCKET_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// One member binding: a surface alias mapped to an external CLR member.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberBinding {
    pub local_alias: String,
    pub kind: MemberKind,
    pub assembly: String,
    /// External declaring type, fully qualified.
    pub external_type: String,
    /// External member name.
    pub external_member: String,
    pub parameter_count: Option<usize>,
    pub param_modifiers: Vec<(usize, ParamMode)>,
    pub is_extension_method: bool,
}

impl MemberBinding {
    /// The `(assembly, type, member)` triple identifying the external
    /// target; overloads that disagree on it make a call site ambiguous.
    pub fn target(&self) -> (&str, &str, &str) {
        (&self.assembly, &self.external_type, &self.external_member)
    }

    /// Whether this overload accepts `argc` arguments, when known.
    fn matches_arity(&self, argc: Option<usize>) -> bool {
        match (argc, self.parameter_count) {
            (Some(actual), Some(declared)) => actual == declared,
            _ => true,
        }
    }
}

/// One bound type with its member overload lists.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeBinding {
    pub local_alias: String,
    /// External fully-qualified name.
    pub external_name: String,
    pub kind: TypeKind,
    /// Member alias → overloads, both in declaration order.
    pub members: IndexMap<String, Vec<MemberBinding>>,
}

/// One bound namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct NamespaceBinding {
    pub local_name: String,
    pub external_name: String,
    /// Local aliases of the namespace's types, in declaration order.
    pub type_aliases: Vec<String>,
}

/// The read-only binding registry.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    namespaces: IndexMap<String, NamespaceBinding>,
    /// Types by local alias. Bucket types are indexed here too, so step 2
    /// of the access protocol can see them, but calls through them must
    /// resolve via the extension index.
    types: IndexMap<String, TypeBinding>,
    /// Bucket name → member alias → overloads.
    extension_buckets: FxHashMap<String, IndexMap<String, Vec<MemberBinding>>>,
    /// (external namespace tag, receiver type name) → member alias → overloads.
    extensions_by_key: FxHashMap<(String, String), IndexMap<String, Vec<MemberBinding>>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        BindingRegistry::default()
    }

    /// Ingest one validated manifest.
    pub fn ingest(&mut self, file: &BindingsFile) {
        for ns in &file.namespaces {
            let entry = self
                .namespaces
                .entry(ns.name.clone())
                .or_insert_with(|| NamespaceBinding {
                    local_name: ns.name.clone(),
                    external_name: ns.alias.clone(),
                    type_aliases: Vec::new(),
                });
            for ty in &ns.types {
                entry.type_aliases.push(ty.name.clone());
            }
            // Borrow of `entry` ends before type ingestion mutates `types`.
            let ns_external = ns.alias.clone();
            for ty in &ns.types {
                self.ingest_type(&ns_external, ty);
            }
        }
    }

    fn ingest_type(&mut self, ns_external: &str, ty: &crate::manifest::TypeManifest) {
        let mut members: IndexMap<String, Vec<MemberBinding>> = IndexMap::new();
        for m in &ty.members {
            let binding = MemberBinding {
                local_alias: m.name.clone(),
                kind: m.kind,
                assembly: m.binding.assembly.clone(),
                external_type: m.binding.type_name.clone(),
                external_member: m.binding.member.clone(),
                parameter_count: m.parameter_count,
                param_modifiers: m
                    .parameter_modifiers
                    .iter()
                    .map(|pm| (pm.index, pm.modifier))
                    .collect(),
                is_extension_method: m.is_extension_method,
            };
            if m.is_extension_method {
                self.extension_buckets
                    .entry(ty.name.clone())
                    .or_default()
                    .entry(m.name.clone())
                    .or_default()
                    .push(binding.clone());
                if let Some(receiver) = &m.receiver_type {
                    self.extensions_by_key
                        .entry((ns_external.to_string(), receiver.clone()))
                        .or_default()
                        .entry(m.name.clone())
                        .or_default()
                        .push(binding.clone());
                }
            }
            members.entry(m.name.clone()).or_default().push(binding);
        }
        let external_name = format!("{}.{}", ns_external, ty.alias);
        debug!(alias = %ty.name, external = %external_name, "bound type");
        self.types.insert(
            ty.name.clone(),
            TypeBinding {
                local_alias: ty.name.clone(),
                external_name,
                kind: ty.kind,
                members,
            },
        );
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get_namespace(&self, local_name: &str) -> Option<&NamespaceBinding> {
        self.namespaces.get(local_name)
    }

    pub fn get_type(&self, local_alias: &str) -> Option<&TypeBinding> {
        self.types.get(local_alias)
    }

    /// Ordered overload list for a member of a bound type. Empty when the
    /// type or member is unknown.
    pub fn get_member_overloads(&self, type_alias: &str, member_alias: &str) -> &[MemberBinding] {
        self.types
            .get(type_alias)
            .and_then(|ty| ty.members.get(member_alias))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve an extension method from its bucket, optionally selecting by
    /// argument count. Declaration order breaks ties deterministically.
    pub fn resolve_extension_method(
        &self,
        bucket_name: &str,
        member_alias: &str,
        argument_count: Option<usize>,
    ) -> Option<&MemberBinding> {
        let overloads = self.extension_buckets.get(bucket_name)?.get(member_alias)?;
        overloads.iter().find(|b| b.matches_arity(argument_count))
    }

    /// Resolve an extension method through the by-receiver index.
    pub fn resolve_extension_method_by_key(
        &self,
        namespace_key: &str,
        receiver_type_name: &str,
        member_alias: &str,
        argument_count: Option<usize>,
    ) -> Option<&MemberBinding> {
        let overloads = self
            .extensions_by_key
            .get(&(namespace_key.to_string(), receiver_type_name.to_string()))?
            .get(member_alias)?;
        overloads.iter().find(|b| b.matches_arity(argument_count))
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BindingsFile;
    use tsonic_common::DiagnosticSink;

    fn linq_registry() -> BindingRegistry {
        let json = r#"{
            "assembly": "System.Linq",
            "namespaces": [{
                "name": "systemLinq",
                "alias": "System.Linq",
                "types": [
                    {
                        "name": "enumerable",
                        "alias": "Enumerable",
                        "kind": "class",
                        "members": [
                            {
                                "kind": "method",
                                "name": "selectMany",
                                "alias": "SelectMany",
                                "binding": {"assembly": "System.Linq", "type": "System.Linq.Enumerable", "member": "SelectMany"},
                                "parameterCount": 2
                            },
                            {
                                "kind": "method",
                                "name": "selectMany",
                                "alias": "SelectMany",
                                "binding": {"assembly": "System.Linq", "type": "System.Linq.Enumerable", "member": "SelectMany"},
                                "parameterCount": 3
                            }
                        ]
                    },
                    {
                        "name": "__TsonicExtMethods_SystemLinq",
                        "alias": "Enumerable",
                        "kind": "class",
                        "members": [
                            {
                                "kind": "method",
                                "name": "where",
                                "alias": "Where",
                                "binding": {"assembly": "System.Linq", "type": "System.Linq.Enumerable", "member": "Where"},
                                "parameterCount": 2,
                                "isExtensionMethod": true,
                                "receiverType": "IEnumerable"
                            }
                        ]
                    }
                ]
            }]
        }"#;
        let mut sink = DiagnosticSink::new();
        let file = BindingsFile::from_json_str(json, &mut sink).unwrap();
        assert!(!sink.has_errors());
        let mut registry = BindingRegistry::new();
        registry.ingest(&file);
        registry
    }

    #[test]
    fn namespace_and_type_lookup() {
        let registry = linq_registry();
        let ns = registry.get_namespace("systemLinq").unwrap();
        assert_eq!(ns.external_name, "System.Linq");
        assert!(ns.type_aliases.contains(&"enumerable".to_string()));

        let ty = registry.get_type("enumerable").unwrap();
        assert_eq!(ty.external_name, "System.Linq.Enumerable");
    }

    #[test]
    fn overloads_are_preserved_in_order() {
        let registry = linq_registry();
        let overloads = registry.get_member_overloads("enumerable", "selectMany");
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[0].parameter_count, Some(2));
        assert_eq!(overloads[1].parameter_count, Some(3));
    }

    #[test]
    fn extension_lookup_by_bucket_and_key() {
        let registry = linq_registry();
        let by_bucket = registry
            .resolve_extension_method("__TsonicExtMethods_SystemLinq", "where", Some(2))
            .unwrap();
        assert_eq!(by_bucket.external_member, "Where");

        let by_key = registry
            .resolve_extension_method_by_key("System.Linq", "IEnumerable", "where", None)
            .unwrap();
        assert_eq!(by_key.external_member, "Where");

        assert!(registry
            .resolve_extension_method("__TsonicExtMethods_SystemLinq", "where", Some(5))
            .is_none());
    }

    #[test]
    fn bucket_name_detection() {
        assert!(is_extension_bucket_name("__Ext_List"));
        assert!(is_extension_bucket_name("__TsonicExtMethods_SystemLinq"));
        assert!(!is_extension_bucket_name("List"));
    }
}
