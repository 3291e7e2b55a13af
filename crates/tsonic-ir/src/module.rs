//! Modules and programs.

use indexmap::IndexMap;

use crate::stmt::IrStmt;

/// One import recorded on a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrImport {
    pub names: Vec<String>,
    pub from: String,
}

/// A lowered source module.
#[derive(Clone, Debug, PartialEq)]
pub struct IrModule {
    /// Workspace-relative source path.
    pub path: String,
    /// Emitted C# namespace, derived from the path and the root namespace.
    pub namespace: String,
    pub imports: Vec<IrImport>,
    pub body: Vec<IrStmt>,
    pub exports: Vec<String>,
}

/// A whole program: file path → module, in insertion order.
///
/// The core accepts any module iteration order; cross-module references
/// are resolved at binding-load time, never at emit time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IrProgram {
    pub modules: IndexMap<String, IrModule>,
}

impl IrProgram {
    pub fn new() -> Self {
        IrProgram::default()
    }

    pub fn insert(&mut self, module: IrModule) {
        self.modules.insert(module.path.clone(), module);
    }

    pub fn get(&self, path: &str) -> Option<&IrModule> {
        self.modules.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IrModule> {
        self.modules.values()
    }
}

/// Derive the C# namespace of a module from its file path.
///
/// `src/services/geo.ts` with root `App` becomes `App.Services.Geo` minus
/// the file segment: directories map to namespace segments, the file name
/// itself does not contribute.
pub fn namespace_for_path(root_namespace: &str, path: &str) -> String {
    let trimmed = path
        .trim_start_matches("./")
        .trim_start_matches("src/")
        .trim_end_matches(".ts");
    let mut namespace = root_namespace.to_string();
    if let Some((dirs, _file)) = trimmed.rsplit_once('/') {
        for segment in dirs.split('/') {
            if segment.is_empty() {
                continue;
            }
            namespace.push('.');
            namespace.push_str(&pascal_case(segment));
        }
    }
    namespace
}

/// Name of the static class that holds a module's functions and variables.
///
/// `src/services/geo.ts` → `GeoModule`.
pub fn module_class_name(path: &str) -> String {
    let stem = path
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .trim_end_matches(".ts");
    format!("{}Module", pascal_case(stem))
}

pub fn pascal_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper_next = true;
    for c in segment.chars() {
        if c == '-' || c == '_' || c == '.' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_from_nested_path() {
        assert_eq!(
            namespace_for_path("App", "src/services/geo.ts"),
            "App.Services"
        );
        assert_eq!(
            namespace_for_path("App", "src/geo-utils/v2/point.ts"),
            "App.GeoUtils.V2"
        );
    }

    #[test]
    fn namespace_from_root_file() {
        assert_eq!(namespace_for_path("App", "src/main.ts"), "App");
        assert_eq!(namespace_for_path("App", "main.ts"), "App");
    }

    #[test]
    fn module_class_names() {
        assert_eq!(module_class_name("src/main.ts"), "MainModule");
        assert_eq!(module_class_name("src/geo-utils/point.ts"), "PointModule");
    }
}
