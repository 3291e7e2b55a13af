//! C# naming policy and the collision pass.
//!
//! `csharp_identifier` maps a source identifier to a valid C# identifier.
//! The mapping is idempotent (applying it twice changes nothing) and keeps
//! distinct inputs distinct except where casing conventions fold them
//! together; the collision pass flags exactly those folds, per scope,
//! before emission.

use rustc_hash::FxHashMap;
use tsonic_common::diagnostics::codes;
use tsonic_common::options::NamingConvention;
use tsonic_common::{CompilerOptions, DiagnosticSink};
use tsonic_ir::{
    module_class_name, pascal_case, IrClassMember, IrInterfaceMember, IrModule, IrProgram,
    IrStmtKind, IrType, StructuralMember,
};

/// C# reserved words that need `@` escaping.
const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

fn is_csharp_keyword(name: &str) -> bool {
    CSHARP_KEYWORDS.contains(&name)
}

/// Map a source identifier to a valid C# identifier. Idempotent.
pub fn csharp_identifier(name: &str) -> String {
    // Already-escaped keywords pass through unchanged.
    if let Some(rest) = name.strip_prefix('@') {
        if is_csharp_keyword(rest) {
            return name.to_string();
        }
    }
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            // Deterministic escape for non-identifier characters.
            out.push_str(&format!("_u{:04X}", c as u32));
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if is_csharp_keyword(&out) {
        format!("@{out}")
    } else {
        out
    }
}

/// Target name of a member under the configured convention.
pub fn member_target_name(name: &str, convention: NamingConvention) -> String {
    match convention {
        NamingConvention::JsStyle => csharp_identifier(name),
        NamingConvention::ClrStyle => csharp_identifier(&pascal_case(name)),
    }
}

/// Run the collision pass over every module.
pub fn run_naming_pass(program: &IrProgram, options: &CompilerOptions, sink: &mut DiagnosticSink) {
    for module in program.iter() {
        check_module(module, options, sink);
    }
}

fn check_module(module: &IrModule, options: &CompilerOptions, sink: &mut DiagnosticSink) {
    let convention = options.naming_convention;

    // Module values: functions and variables share the module class scope.
    let mut values = ScopeNames::new();
    // Namespace types: declared types plus the synthesized module class.
    let mut types = ScopeNames::new();
    types.seed(module_class_name(&module.path));

    for stmt in &module.body {
        match &stmt.kind {
            IrStmtKind::Func(func) => {
                values.check(&func.name, member_target_name(&func.name, convention), sink);
            }
            IrStmtKind::Var(decl) => {
                values.check(&decl.name, member_target_name(&decl.name, convention), sink);
            }
            IrStmtKind::Class(class) => {
                types.check(&class.name, csharp_identifier(&class.name), sink);
                let mut members = ScopeNames::new();
                for member in &class.members {
                    match member {
                        IrClassMember::Property { name, .. }
                        | IrClassMember::Method { name, .. } => {
                            members.check(name, member_target_name(name, convention), sink);
                        }
                        IrClassMember::Constructor { .. } => {}
                    }
                }
            }
            IrStmtKind::Interface(interface) => {
                types.check(&interface.name, csharp_identifier(&interface.name), sink);
                let mut members = ScopeNames::new();
                for member in &interface.members {
                    match member {
                        IrInterfaceMember::Property { name, .. }
                        | IrInterfaceMember::Method { name, .. } => {
                            members.check(name, member_target_name(name, convention), sink);
                        }
                        IrInterfaceMember::Indexer { .. } => {}
                    }
                }
            }
            IrStmtKind::Enum(decl) => {
                types.check(&decl.name, csharp_identifier(&decl.name), sink);
                let mut members = ScopeNames::new();
                for member in &decl.members {
                    members.check(&member.name, member_target_name(&member.name, convention), sink);
                }
            }
            IrStmtKind::TypeAlias(alias) => {
                types.check(&alias.name, csharp_identifier(&alias.name), sink);
                // Object-type aliases surface their members as a scope too.
                if let IrType::Object(members) = alias.ty.as_ref() {
                    let mut alias_members = ScopeNames::new();
                    for member in members {
                        match member {
                            StructuralMember::Property { name, .. }
                            | StructuralMember::Method { name, .. } => {
                                alias_members
                                    .check(name, member_target_name(name, convention), sink);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Collision detector for one scope: target name → first original.
struct ScopeNames {
    seen: FxHashMap<String, String>,
}

impl ScopeNames {
    fn new() -> Self {
        ScopeNames {
            seen: FxHashMap::default(),
        }
    }

    /// Reserve a synthesized name (no original to blame).
    fn seed(&mut self, target: String) {
        self.seen.entry(target.clone()).or_insert(target);
    }

    fn check(&mut self, original: &str, target: String, sink: &mut DiagnosticSink) {
        if let Some(first) = self.seen.get(&target) {
            if first != original {
                let first = first.clone();
                sink.report(
                    &codes::NAMING_COLLISION,
                    &[first.as_str(), original, target.as_str()],
                    None,
                );
            }
            return;
        }
        self.seen.insert(target, original.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(csharp_identifier("class"), "@class");
        assert_eq!(csharp_identifier("value"), "value");
    }

    #[test]
    fn invalid_characters_are_encoded() {
        assert_eq!(csharp_identifier("a$b"), "a_u0024b");
        assert_eq!(csharp_identifier("3d"), "_3d");
    }

    #[test]
    fn mangling_is_idempotent() {
        for name in ["class", "a$b", "3d", "plain", "fooBar", "@class"] {
            let once = csharp_identifier(name);
            let twice = csharp_identifier(&once);
            assert_eq!(once, twice, "not idempotent for {name}");
        }
    }

    #[test]
    fn clr_convention_pascal_cases_members() {
        assert_eq!(
            member_target_name("fooBar", NamingConvention::ClrStyle),
            "FooBar"
        );
        assert_eq!(
            member_target_name("fooBar", NamingConvention::JsStyle),
            "fooBar"
        );
    }
}
