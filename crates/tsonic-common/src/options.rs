//! Compiler options and the workspace configuration record.
//!
//! The CLI (external to this workspace) reads `tsonic.json`; the core only
//! depends on the record shape and the handful of keys listed here.

use serde::{Deserialize, Serialize};

/// Identifier naming convention for emitted C#.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamingConvention {
    /// Keep JS-style casing (`camelCase` members).
    #[default]
    JsStyle,
    /// CLR-style casing (`PascalCase` members).
    ClrStyle,
}

/// A NuGet package reference from the workspace configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReference {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
}

/// The `dotnet` section of the workspace configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DotnetConfig {
    #[serde(default)]
    pub package_references: Vec<PackageReference>,
    #[serde(default)]
    pub type_roots: Vec<String>,
}

/// The workspace configuration record (`tsonic.json`).
///
/// Loading and validation happen outside the core; these are only the keys
/// the core reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub dotnet: DotnetConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dotnet_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_namespace: Option<String>,
}

impl WorkspaceConfig {
    /// The pinned default target framework.
    pub const DEFAULT_DOTNET_VERSION: &'static str = "net9.0";

    /// Derive the effective compiler options from the configuration.
    pub fn compiler_options(&self) -> CompilerOptions {
        // Presence of any typeRoots means tsbindgen-generated JS-style
        // declaration packages are in use.
        let naming = if self.dotnet.type_roots.is_empty() {
            NamingConvention::ClrStyle
        } else {
            NamingConvention::JsStyle
        };
        CompilerOptions {
            root_namespace: self
                .root_namespace
                .clone()
                .unwrap_or_else(|| "TsonicApp".to_string()),
            dotnet_version: self
                .dotnet_version
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_DOTNET_VERSION.to_string()),
            naming_convention: naming,
        }
    }
}

/// Resolved options threaded through every pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerOptions {
    pub root_namespace: String,
    pub dotnet_version: String,
    pub naming_convention: NamingConvention,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        WorkspaceConfig::default().compiler_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_pinned() {
        let opts = CompilerOptions::default();
        assert_eq!(opts.dotnet_version, "net9.0");
        assert_eq!(opts.naming_convention, NamingConvention::ClrStyle);
    }

    #[test]
    fn type_roots_switch_naming_convention() {
        let config: WorkspaceConfig = serde_json::from_str(
            r#"{
                "dotnet": {
                    "packageReferences": [{"id": "Newtonsoft.Json", "version": "13.0.3"}],
                    "typeRoots": [".tsonic/bindings/nuget"]
                },
                "rootNamespace": "Acme.App"
            }"#,
        )
        .unwrap();
        let opts = config.compiler_options();
        assert_eq!(opts.naming_convention, NamingConvention::JsStyle);
        assert_eq!(opts.root_namespace, "Acme.App");
        assert_eq!(config.dotnet.package_references[0].id, "Newtonsoft.Json");
    }
}
