//! The semantic type model (`IrType`).
//!
//! Types are immutable trees shared through `Arc`; substitution returns its
//! input pointer unchanged when nothing applies, so deep trees are shared
//! rather than copied. Equality and hashing are structural.

use std::sync::Arc;
use tsonic_common::{NumericKind, ParamMode};

/// Shared reference to an immutable type tree.
pub type TypeRef = Arc<IrType>;

/// Source-language surface primitives.
///
/// `Number` is the source's default floating type and stays distinct from
/// the CLR value-type aliases (`Int`, `Long`, ...) even where both map to a
/// CLR numeric kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Number,
    String,
    Boolean,
    Char,
    Null,
    Undefined,
    Int,
    Long,
    Short,
    Byte,
    SByte,
    UShort,
    UInt,
    ULong,
    Float,
    Double,
    Decimal,
}

impl Primitive {
    /// The CLR numeric kind of this primitive, if it is numeric.
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        Some(match self {
            Primitive::Number => NumericKind::Double,
            Primitive::Int => NumericKind::Int32,
            Primitive::Long => NumericKind::Int64,
            Primitive::Short => NumericKind::Int16,
            Primitive::Byte => NumericKind::Byte,
            Primitive::SByte => NumericKind::SByte,
            Primitive::UShort => NumericKind::UInt16,
            Primitive::UInt => NumericKind::UInt32,
            Primitive::ULong => NumericKind::UInt64,
            Primitive::Float => NumericKind::Single,
            Primitive::Double => NumericKind::Double,
            Primitive::Decimal => NumericKind::Decimal,
            _ => return None,
        })
    }

    /// Parse a surface primitive name.
    pub fn from_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "number" => Primitive::Number,
            "string" => Primitive::String,
            "boolean" => Primitive::Boolean,
            "char" => Primitive::Char,
            "null" => Primitive::Null,
            "undefined" => Primitive::Undefined,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "short" => Primitive::Short,
            "byte" => Primitive::Byte,
            "sbyte" => Primitive::SByte,
            "ushort" => Primitive::UShort,
            "uint" => Primitive::UInt,
            "ulong" => Primitive::ULong,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            "decimal" => Primitive::Decimal,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Char => "char",
            Primitive::Null => "null",
            Primitive::Undefined => "undefined",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Short => "short",
            Primitive::Byte => "byte",
            Primitive::SByte => "sbyte",
            Primitive::UShort => "ushort",
            Primitive::UInt => "uint",
            Primitive::ULong => "ulong",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Decimal => "decimal",
        }
    }
}

/// A number literal with structural equality over its bit pattern.
#[derive(Clone, Copy, Debug)]
pub struct LiteralNumber(pub f64);

impl LiteralNumber {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for LiteralNumber {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for LiteralNumber {}

impl std::hash::Hash for LiteralNumber {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Value of a literal type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    String(String),
    Number(LiteralNumber),
    Boolean(bool),
}

/// A nominal type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceType {
    pub name: String,
    pub type_args: Vec<TypeRef>,
    /// External CLR qualified name (e.g. `System.Int32`). Present iff the
    /// reference is bound.
    pub external: Option<String>,
    /// Structural member block for synthesized inline shapes.
    pub structural: Option<Vec<StructuralMember>>,
}

/// A function parameter inside a function type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionParam {
    pub name: String,
    pub ty: TypeRef,
    pub mode: ParamMode,
    pub optional: bool,
}

/// A function type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<FunctionParam>,
    pub return_type: TypeRef,
}

/// A property or method signature declared inline on an object type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StructuralMember {
    Property {
        name: String,
        ty: TypeRef,
        optional: bool,
    },
    Method {
        name: String,
        function: FunctionType,
    },
}

impl StructuralMember {
    pub fn name(&self) -> &str {
        match self {
            StructuralMember::Property { name, .. } => name,
            StructuralMember::Method { name, .. } => name,
        }
    }
}

/// The semantic type of an IR node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrType {
    Primitive(Primitive),
    Literal(LiteralValue),
    Reference(ReferenceType),
    TypeParameter(String),
    Array(TypeRef),
    Tuple(Vec<TypeRef>),
    Union(Vec<TypeRef>),
    Intersection(Vec<TypeRef>),
    Dictionary { key: TypeRef, value: TypeRef },
    Function(FunctionType),
    Object(Vec<StructuralMember>),
    Any,
    Unknown,
    Void,
    Never,
}

impl IrType {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn number() -> TypeRef {
        Arc::new(IrType::Primitive(Primitive::Number))
    }

    pub fn string() -> TypeRef {
        Arc::new(IrType::Primitive(Primitive::String))
    }

    pub fn boolean() -> TypeRef {
        Arc::new(IrType::Primitive(Primitive::Boolean))
    }

    pub fn null() -> TypeRef {
        Arc::new(IrType::Primitive(Primitive::Null))
    }

    pub fn undefined() -> TypeRef {
        Arc::new(IrType::Primitive(Primitive::Undefined))
    }

    pub fn primitive(p: Primitive) -> TypeRef {
        Arc::new(IrType::Primitive(p))
    }

    pub fn any() -> TypeRef {
        Arc::new(IrType::Any)
    }

    pub fn unknown() -> TypeRef {
        Arc::new(IrType::Unknown)
    }

    pub fn void() -> TypeRef {
        Arc::new(IrType::Void)
    }

    pub fn never() -> TypeRef {
        Arc::new(IrType::Never)
    }

    pub fn reference(name: impl Into<String>) -> TypeRef {
        Arc::new(IrType::Reference(ReferenceType {
            name: name.into(),
            type_args: Vec::new(),
            external: None,
            structural: None,
        }))
    }

    pub fn bound_reference(name: impl Into<String>, external: impl Into<String>) -> TypeRef {
        Arc::new(IrType::Reference(ReferenceType {
            name: name.into(),
            type_args: Vec::new(),
            external: Some(external.into()),
            structural: None,
        }))
    }

    pub fn applied_reference(name: impl Into<String>, type_args: Vec<TypeRef>) -> TypeRef {
        Arc::new(IrType::Reference(ReferenceType {
            name: name.into(),
            type_args,
            external: None,
            structural: None,
        }))
    }

    pub fn type_parameter(name: impl Into<String>) -> TypeRef {
        Arc::new(IrType::TypeParameter(name.into()))
    }

    pub fn array(element: TypeRef) -> TypeRef {
        Arc::new(IrType::Array(element))
    }

    pub fn tuple(elements: Vec<TypeRef>) -> TypeRef {
        Arc::new(IrType::Tuple(elements))
    }

    pub fn union(members: Vec<TypeRef>) -> TypeRef {
        Arc::new(IrType::Union(members))
    }

    pub fn intersection(members: Vec<TypeRef>) -> TypeRef {
        Arc::new(IrType::Intersection(members))
    }

    pub fn dictionary(key: TypeRef, value: TypeRef) -> TypeRef {
        Arc::new(IrType::Dictionary { key, value })
    }

    pub fn function(params: Vec<FunctionParam>, return_type: TypeRef) -> TypeRef {
        Arc::new(IrType::Function(FunctionType {
            params,
            return_type,
        }))
    }

    pub fn object_type(members: Vec<StructuralMember>) -> TypeRef {
        Arc::new(IrType::Object(members))
    }

    pub fn string_literal(value: impl Into<String>) -> TypeRef {
        Arc::new(IrType::Literal(LiteralValue::String(value.into())))
    }

    pub fn number_literal(value: f64) -> TypeRef {
        Arc::new(IrType::Literal(LiteralValue::Number(LiteralNumber(value))))
    }

    pub fn boolean_literal(value: bool) -> TypeRef {
        Arc::new(IrType::Literal(LiteralValue::Boolean(value)))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_any(&self) -> bool {
        matches!(self, IrType::Any)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, IrType::Unknown)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(
            self,
            IrType::Primitive(Primitive::Null) | IrType::Primitive(Primitive::Undefined)
        )
    }

    /// The CLR numeric kind of this type, for primitives and bound/aliased
    /// numeric references.
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self {
            IrType::Primitive(p) => p.numeric_kind(),
            IrType::Reference(r) => {
                if let Some(kind) = NumericKind::from_alias(&r.name) {
                    return Some(kind);
                }
                let external = r.external.as_deref()?;
                [
                    NumericKind::SByte,
                    NumericKind::Byte,
                    NumericKind::Int16,
                    NumericKind::UInt16,
                    NumericKind::Int32,
                    NumericKind::UInt32,
                    NumericKind::Int64,
                    NumericKind::UInt64,
                    NumericKind::Single,
                    NumericKind::Double,
                    NumericKind::Decimal,
                ]
                .into_iter()
                .find(|k| k.external_name() == external)
            }
            _ => None,
        }
    }

    /// Whether the type is a non-nullable CLR value type for which a
    /// `T | null | undefined` expression needs a `.Value` unwrap.
    pub fn is_clr_value_type(&self) -> bool {
        match self {
            IrType::Primitive(Primitive::Boolean) | IrType::Primitive(Primitive::Char) => true,
            // `number` maps to double, a value type as well.
            _ => self.numeric_kind().is_some(),
        }
    }

    /// Strip `null`/`undefined` members from a union.
    ///
    /// Returns the stripped type and whether anything was removed. Types
    /// that are not nullish unions come back unchanged (pointer-equal).
    pub fn strip_nullish(this: &TypeRef) -> (TypeRef, bool) {
        if let IrType::Union(members) = this.as_ref() {
            let retained: Vec<TypeRef> = members
                .iter()
                .filter(|m| !m.is_nullish())
                .cloned()
                .collect();
            if retained.len() == members.len() {
                return (this.clone(), false);
            }
            let stripped = match retained.len() {
                0 => IrType::never(),
                1 => retained.into_iter().next().unwrap(),
                _ => IrType::union(retained),
            };
            return (stripped, true);
        }
        (this.clone(), false)
    }

    /// Recursively check whether `any` occurs anywhere in the type.
    pub fn contains_any(&self) -> bool {
        match self {
            IrType::Any => true,
            IrType::Primitive(_)
            | IrType::Literal(_)
            | IrType::TypeParameter(_)
            | IrType::Unknown
            | IrType::Void
            | IrType::Never => false,
            IrType::Reference(r) => {
                r.type_args.iter().any(|t| t.contains_any())
                    || r.structural
                        .as_ref()
                        .is_some_and(|members| members.iter().any(structural_member_contains_any))
            }
            IrType::Array(elem) => elem.contains_any(),
            IrType::Tuple(elems) => elems.iter().any(|t| t.contains_any()),
            IrType::Union(members) | IrType::Intersection(members) => {
                members.iter().any(|t| t.contains_any())
            }
            IrType::Dictionary { key, value } => key.contains_any() || value.contains_any(),
            IrType::Function(f) => {
                f.params.iter().any(|p| p.ty.contains_any()) || f.return_type.contains_any()
            }
            IrType::Object(members) => members.iter().any(structural_member_contains_any),
        }
    }
}

fn structural_member_contains_any(member: &StructuralMember) -> bool {
    match member {
        StructuralMember::Property { ty, .. } => ty.contains_any(),
        StructuralMember::Method { function, .. } => {
            function.params.iter().any(|p| p.ty.contains_any())
                || function.return_type.contains_any()
        }
    }
}

impl std::fmt::Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrType::Primitive(p) => write!(f, "{}", p.name()),
            IrType::Literal(LiteralValue::String(s)) => write!(f, "\"{s}\""),
            IrType::Literal(LiteralValue::Number(n)) => write!(f, "{}", n.value()),
            IrType::Literal(LiteralValue::Boolean(b)) => write!(f, "{b}"),
            IrType::Reference(r) => {
                write!(f, "{}", r.name)?;
                if !r.type_args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in r.type_args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            IrType::TypeParameter(name) => write!(f, "{name}"),
            IrType::Array(elem) => write!(f, "{elem}[]"),
            IrType::Tuple(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            IrType::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            IrType::Intersection(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{m}")?;
                }
                Ok(())
            }
            IrType::Dictionary { key, value } => write!(f, "Record<{key}, {value}>"),
            IrType::Function(func) => {
                write!(f, "(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", p.name, p.ty)?;
                }
                write!(f, ") => {}", func.return_type)
            }
            IrType::Object(_) => write!(f, "{{...}}"),
            IrType::Any => write!(f, "any"),
            IrType::Unknown => write!(f, "unknown"),
            IrType::Void => write!(f, "void"),
            IrType::Never => write!(f, "never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_nullish_unwraps_single_member() {
        let nullable = IrType::union(vec![IrType::number(), IrType::null(), IrType::undefined()]);
        let (stripped, was_nullish) = IrType::strip_nullish(&nullable);
        assert!(was_nullish);
        assert_eq!(*stripped, IrType::Primitive(Primitive::Number));
    }

    #[test]
    fn strip_nullish_keeps_wider_unions() {
        let u = IrType::union(vec![IrType::number(), IrType::string(), IrType::null()]);
        let (stripped, was_nullish) = IrType::strip_nullish(&u);
        assert!(was_nullish);
        assert_eq!(
            *stripped,
            IrType::Union(vec![IrType::number(), IrType::string()])
        );
    }

    #[test]
    fn strip_nullish_is_identity_for_plain_types() {
        let t = IrType::number();
        let (stripped, was_nullish) = IrType::strip_nullish(&t);
        assert!(!was_nullish);
        assert!(Arc::ptr_eq(&t, &stripped));
    }

    #[test]
    fn contains_any_is_deep() {
        let t = IrType::array(IrType::function(
            vec![FunctionParam {
                name: "x".into(),
                ty: IrType::any(),
                mode: ParamMode::Value,
                optional: false,
            }],
            IrType::void(),
        ));
        assert!(t.contains_any());
        assert!(!IrType::array(IrType::number()).contains_any());
    }

    #[test]
    fn numeric_kind_covers_aliases_and_bound_references() {
        use tsonic_common::NumericKind;
        assert_eq!(
            IrType::primitive(Primitive::Int).numeric_kind(),
            Some(NumericKind::Int32)
        );
        assert_eq!(IrType::number().numeric_kind(), Some(NumericKind::Double));
        assert_eq!(
            IrType::reference("int").numeric_kind(),
            Some(NumericKind::Int32)
        );
        assert_eq!(
            IrType::bound_reference("Int32", "System.Int32").numeric_kind(),
            Some(NumericKind::Int32)
        );
        assert_eq!(IrType::string().numeric_kind(), None);
    }

    #[test]
    fn literal_number_equality_by_bits() {
        assert_eq!(IrType::number_literal(1.0), IrType::number_literal(1.0));
        assert_ne!(IrType::number_literal(1.0), IrType::number_literal(2.0));
    }
}
