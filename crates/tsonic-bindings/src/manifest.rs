//! Binding manifest records.
//!
//! Sidecar `.bindings.json` files declare how source-language surface names
//! map to external CLR types and members. File loading and JSON-schema
//! validation live outside the core; this module defines the validated
//! record shapes and a thin ingestion helper that reports `TSN9xxx`
//! diagnostics instead of failing open.
//!
//! Determinism requirement: namespaces, types, and members keep their
//! declaration order; overload order drives stable selection.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tsonic_common::diagnostics::codes;
use tsonic_common::{DiagnosticSink, ParamMode};

/// Top-level record of one binding manifest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingsFile {
    /// External assembly name, e.g. `System.Linq`.
    pub assembly: String,
    #[serde(default)]
    pub namespaces: Vec<NamespaceManifest>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceManifest {
    /// Local alias (surface name), e.g. `systemLinq`.
    pub name: String,
    /// External namespace name, e.g. `System.Linq`.
    pub alias: String,
    #[serde(default)]
    pub types: Vec<TypeManifest>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Delegate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeManifest {
    /// Local alias, e.g. `enumerable`.
    pub name: String,
    /// External name within the namespace, e.g. `Enumerable`.
    pub alias: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub members: Vec<MemberManifest>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Property,
    Field,
    Event,
    Constructor,
}

/// External target of one member binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingTarget {
    pub assembly: String,
    /// External declaring type, fully qualified.
    #[serde(rename = "type")]
    pub type_name: String,
    /// External member name.
    pub member: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterModifier {
    pub index: usize,
    pub modifier: ParamMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberManifest {
    pub kind: MemberKind,
    /// Local alias.
    pub name: String,
    /// External member name.
    pub alias: String,
    pub binding: BindingTarget,
    /// Declared parameter count, used for overload selection by arity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_modifiers: Vec<ParameterModifier>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_extension_method: bool,
    /// Declared receiver type name for extension methods; feeds the
    /// by-receiver extension index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_type: Option<String>,
}

impl BindingsFile {
    /// Parse a manifest from JSON, reporting `TSN9001` on malformed input
    /// and structural problems (`TSN9002`/`TSN9003`) found by validation.
    ///
    /// Returns `None` when the manifest must not enter the registry.
    pub fn from_json_str(json: &str, sink: &mut DiagnosticSink) -> Option<BindingsFile> {
        let file: BindingsFile = match serde_json::from_str(json) {
            Ok(file) => file,
            Err(err) => {
                let detail = err.to_string();
                sink.report(&codes::MALFORMED_MANIFEST, &[detail.as_str()], None);
                return None;
            }
        };
        let before = sink.error_count();
        file.validate(sink);
        if sink.error_count() > before {
            return None;
        }
        Some(file)
    }

    /// Structural validation beyond serde success.
    pub fn validate(&self, sink: &mut DiagnosticSink) {
        let mut namespace_aliases = FxHashSet::default();
        for ns in &self.namespaces {
            if !namespace_aliases.insert(ns.name.as_str()) {
                sink.report(&codes::DUPLICATE_BINDING_ALIAS, &[ns.name.as_str()], None);
            }
            let mut type_aliases = FxHashSet::default();
            for ty in &ns.types {
                if !type_aliases.insert(ty.name.as_str()) {
                    sink.report(&codes::DUPLICATE_BINDING_ALIAS, &[ty.name.as_str()], None);
                }
                for member in &ty.members {
                    let mut seen_indices = FxHashSet::default();
                    for modifier in &member.parameter_modifiers {
                        let in_range = member
                            .parameter_count
                            .is_none_or(|count| modifier.index < count);
                        if !seen_indices.insert(modifier.index) || !in_range {
                            let index_text = modifier.index.to_string();
                            sink.report(
                                &codes::BAD_MODIFIER_INDEX,
                                &[index_text.as_str(), member.name.as_str()],
                                None,
                            );
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINQ_MANIFEST: &str = r#"{
        "assembly": "System.Linq",
        "namespaces": [
            {
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
                                "binding": {
                                    "assembly": "System.Linq",
                                    "type": "System.Linq.Enumerable",
                                    "member": "SelectMany"
                                },
                                "parameterCount": 2
                            }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parse_preserves_declaration_order() {
        let mut sink = DiagnosticSink::new();
        let file = BindingsFile::from_json_str(LINQ_MANIFEST, &mut sink).unwrap();
        assert!(!sink.has_errors());
        assert_eq!(file.assembly, "System.Linq");
        assert_eq!(file.namespaces[0].name, "systemLinq");
        assert_eq!(file.namespaces[0].types[0].alias, "Enumerable");
        assert_eq!(
            file.namespaces[0].types[0].members[0].binding.member,
            "SelectMany"
        );
    }

    #[test]
    fn malformed_json_reports_tsn9001() {
        let mut sink = DiagnosticSink::new();
        assert!(BindingsFile::from_json_str("{not json", &mut sink).is_none());
        assert_eq!(sink.iter().next().unwrap().code, 9001);
    }

    #[test]
    fn duplicate_alias_reports_tsn9002() {
        let mut sink = DiagnosticSink::new();
        let json = r#"{
            "assembly": "A",
            "namespaces": [
                {"name": "ns", "alias": "N", "types": []},
                {"name": "ns", "alias": "M", "types": []}
            ]
        }"#;
        assert!(BindingsFile::from_json_str(json, &mut sink).is_none());
        assert!(sink.iter().any(|d| d.code == 9002));
    }

    #[test]
    fn out_of_range_modifier_reports_tsn9003() {
        let mut sink = DiagnosticSink::new();
        let json = r#"{
            "assembly": "A",
            "namespaces": [{
                "name": "ns", "alias": "N",
                "types": [{
                    "name": "t", "alias": "T", "kind": "class",
                    "members": [{
                        "kind": "method", "name": "m", "alias": "M",
                        "binding": {"assembly": "A", "type": "N.T", "member": "M"},
                        "parameterCount": 1,
                        "parameterModifiers": [{"index": 3, "modifier": "out"}]
                    }]
                }]
            }]
        }"#;
        assert!(BindingsFile::from_json_str(json, &mut sink).is_none());
        assert!(sink.iter().any(|d| d.code == 9003));
    }
}
