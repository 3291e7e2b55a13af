//! Diagnostics with stable `TSN` codes.
//!
//! Every user-facing failure in the compiler is a `Diagnostic` pushed into a
//! `DiagnosticSink`; core operations never raise exceptions for user errors.
//! Code bands: `TSN1xxx` import/module, `TSN3xxx` C# identifier/naming,
//! `TSN4xxx` interop/binding, `TSN5xxx` numeric soundness, `TSN7xxx`
//! AOT/language restrictions, `TSN9xxx` metadata loading.

use crate::position::SourceLocation;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message template with its stable code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub severity: Severity,
    pub template: &'static str,
}

/// Stable diagnostic codes and message templates.
///
/// Placeholders `{0}`, `{1}`, ... are substituted by [`format_message`].
pub mod codes {
    use super::{DiagnosticMessage, Severity};

    macro_rules! message {
        ($name:ident, $code:expr, $severity:ident, $template:expr) => {
            pub const $name: DiagnosticMessage = DiagnosticMessage {
                code: $code,
                severity: Severity::$severity,
                template: $template,
            };
        };
    }

    // TSN1xxx: import/module
    message!(UNRESOLVED_IMPORT, 1001, Error, "Cannot resolve import '{0}'.");
    message!(
        DUPLICATE_MODULE,
        1002,
        Error,
        "Duplicate module path '{0}' in program."
    );

    // TSN3xxx: C# identifier/naming
    message!(
        NAMING_COLLISION,
        3001,
        Error,
        "'{0}' and '{1}' both map to the C# identifier '{2}' in this scope."
    );

    // TSN4xxx: interop/binding
    message!(
        AMBIGUOUS_BINDING_TARGET,
        4001,
        Error,
        "Member '{0}' has overloads bound to different CLR targets; the call site is ambiguous."
    );
    message!(
        MISSING_EXTENSION_BINDING,
        4002,
        Error,
        "No extension-method binding found for '{0}.{1}'."
    );
    message!(
        UNKNOWN_MEMBER_BINDING,
        4003,
        Error,
        "Type '{0}' has no bound member named '{1}'."
    );

    // TSN5xxx: numeric soundness
    message!(
        UNPROVABLE_NARROWING,
        5001,
        Error,
        "Cannot prove that this expression produces a value of type '{0}'."
    );
    message!(
        NUMERIC_OVERFLOW,
        5002,
        Error,
        "Literal '{0}' is out of range for type '{1}'."
    );
    message!(
        UNSAFE_INT64_LITERAL,
        5003,
        Error,
        "Literal '{0}' exceeds the JavaScript safe-integer range and would lose precision as '{1}'."
    );
    message!(
        INDEX_NOT_INT32,
        5004,
        Error,
        "Index expression must have a provable 'Int32' type; found '{0}'."
    );
    message!(
        FLOAT_TO_INTEGER_NARROWING,
        5005,
        Error,
        "Literal '{0}' has a fractional part and cannot be narrowed to '{1}'."
    );

    // TSN7xxx: AOT/language restrictions
    message!(
        ANY_AT_EMIT,
        7001,
        Error,
        "The 'any' type cannot reach emission; annotate '{0}' with a concrete type."
    );
    message!(
        UNRESOLVED_REFERENCE,
        7002,
        Error,
        "Type reference '{0}' is neither a builtin, a local declaration, an import, a type parameter, nor an external binding."
    );
    message!(
        MODIFIER_AS_TYPE,
        7003,
        Error,
        "Parameter modifier '{0}' must be written as a parameter annotation, not a type."
    );
    message!(
        ANNOTATION_REQUIRED,
        7004,
        Error,
        "Declaration '{0}' requires an explicit type annotation."
    );
    message!(
        INFERENCE_CONFLICT,
        7005,
        Error,
        "Type parameter '{0}' was inferred as both '{1}' and '{2}'."
    );
    message!(
        UNION_INFERENCE_REFUSED,
        7006,
        Error,
        "Cannot infer type parameter '{0}' through a union or intersection parameter."
    );
    message!(
        UNKNOWN_MEMBER,
        7007,
        Error,
        "Type '{0}' has no member named '{1}'."
    );
    message!(
        UNKNOWN_INDEXER,
        7008,
        Error,
        "Type '{0}' has no unambiguous indexer."
    );

    // TSN9xxx: metadata loading
    message!(
        MALFORMED_MANIFEST,
        9001,
        Error,
        "Binding manifest is malformed: {0}"
    );
    message!(
        DUPLICATE_BINDING_ALIAS,
        9002,
        Error,
        "Binding manifest declares alias '{0}' more than once."
    );
    message!(
        BAD_MODIFIER_INDEX,
        9003,
        Error,
        "Parameter modifier index {0} is out of range for member '{1}'."
    );
}

/// Substitute `{0}`, `{1}`, ... placeholders in a message template.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedLocation {
    pub location: SourceLocation,
    pub message: String,
}

/// A single reported problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: u32,
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub hint: Option<String>,
    pub related: Vec<RelatedLocation>,
}

impl Diagnostic {
    /// Build a diagnostic from a message template and its arguments.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Diagnostic {
            code: message.code,
            severity: message.severity,
            message: format_message(message.template, args),
            location: None,
            hint: None,
            related: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_related(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.related.push(RelatedLocation {
            location,
            message: message.into(),
        });
        self
    }

    /// The stable short identifier, e.g. `TSN5004`.
    pub fn code_string(&self) -> String {
        format!("TSN{:04}", self.code)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{loc}: ")?;
        }
        write!(f, "{} {}: {}", self.severity, self.code_string(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}

/// Collects diagnostics across a compilation.
///
/// Append-only; passes keep collecting where safe so one run surfaces as
/// many problems as possible, but any error refuses emission.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Report a templated diagnostic at a location.
    pub fn report(
        &mut self,
        message: &DiagnosticMessage,
        args: &[&str],
        location: Option<SourceLocation>,
    ) {
        let mut diag = Diagnostic::new(message, args);
        diag.location = location;
        self.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_substitutes_in_order() {
        assert_eq!(
            format_message("'{0}' vs '{1}'", &["a", "b"]),
            "'a' vs 'b'"
        );
    }

    #[test]
    fn code_string_is_zero_padded() {
        let d = Diagnostic::new(&codes::NAMING_COLLISION, &["a", "b", "c"]);
        assert_eq!(d.code_string(), "TSN3001");
    }

    #[test]
    fn sink_counts_errors() {
        let mut sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        sink.report(&codes::ANY_AT_EMIT, &["x"], None);
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn display_includes_location_and_code() {
        let d = Diagnostic::new(&codes::INDEX_NOT_INT32, &["Double"]).with_location(
            crate::position::SourceLocation::new("main.ts", 3, 7, 1),
        );
        let rendered = d.to_string();
        assert!(rendered.starts_with("main.ts:3:7: error TSN5004:"));
        assert!(rendered.contains("Double"));
    }
}
