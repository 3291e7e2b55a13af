//! Numeric literal parsing and the CLR numeric kind lattice.
//!
//! The proof pass (tsonic-passes) and the emitter both reason about CLR
//! numeric kinds; the lattice operations live here so neither crate depends
//! on the other.

use serde::{Deserialize, Serialize};

/// Largest integer a JavaScript `number` can represent without precision
/// loss: 2^53 - 1.
pub const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

/// A CLR numeric kind, ordered roughly by width for display purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericKind {
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
}

impl NumericKind {
    /// Map a source-language CLR alias (`int`, `long`, ...) to its kind.
    pub fn from_alias(name: &str) -> Option<NumericKind> {
        Some(match name {
            "sbyte" => NumericKind::SByte,
            "byte" => NumericKind::Byte,
            "short" => NumericKind::Int16,
            "ushort" => NumericKind::UInt16,
            "int" => NumericKind::Int32,
            "uint" => NumericKind::UInt32,
            "long" => NumericKind::Int64,
            "ulong" => NumericKind::UInt64,
            "float" => NumericKind::Single,
            "double" => NumericKind::Double,
            "decimal" => NumericKind::Decimal,
            _ => return None,
        })
    }

    /// The fully-qualified CLR type name.
    pub fn external_name(&self) -> &'static str {
        match self {
            NumericKind::SByte => "System.SByte",
            NumericKind::Byte => "System.Byte",
            NumericKind::Int16 => "System.Int16",
            NumericKind::UInt16 => "System.UInt16",
            NumericKind::Int32 => "System.Int32",
            NumericKind::UInt32 => "System.UInt32",
            NumericKind::Int64 => "System.Int64",
            NumericKind::UInt64 => "System.UInt64",
            NumericKind::Single => "System.Single",
            NumericKind::Double => "System.Double",
            NumericKind::Decimal => "System.Decimal",
        }
    }

    /// The C# keyword for this kind.
    pub fn cs_keyword(&self) -> &'static str {
        match self {
            NumericKind::SByte => "sbyte",
            NumericKind::Byte => "byte",
            NumericKind::Int16 => "short",
            NumericKind::UInt16 => "ushort",
            NumericKind::Int32 => "int",
            NumericKind::UInt32 => "uint",
            NumericKind::Int64 => "long",
            NumericKind::UInt64 => "ulong",
            NumericKind::Single => "float",
            NumericKind::Double => "double",
            NumericKind::Decimal => "decimal",
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(
            self,
            NumericKind::Single | NumericKind::Double | NumericKind::Decimal
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            NumericKind::SByte
                | NumericKind::Int16
                | NumericKind::Int32
                | NumericKind::Int64
                | NumericKind::Single
                | NumericKind::Double
                | NumericKind::Decimal
        )
    }

    /// Inclusive value range for integer kinds; `None` for floating kinds.
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            NumericKind::SByte => (i8::MIN as i128, i8::MAX as i128),
            NumericKind::Byte => (0, u8::MAX as i128),
            NumericKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            NumericKind::UInt16 => (0, u16::MAX as i128),
            NumericKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            NumericKind::UInt32 => (0, u32::MAX as i128),
            NumericKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            NumericKind::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }

    /// Whether an integer constant fits this kind's range.
    pub fn contains(&self, value: i128) -> bool {
        match self.integer_range() {
            Some((lo, hi)) => value >= lo && value <= hi,
            // Floating kinds accept any integer constant (precision is
            // checked separately via the safe-integer rule).
            None => true,
        }
    }

    /// C# implicit numeric conversion: does `self` widen to `target`
    /// without loss?
    pub fn widens_to(&self, target: NumericKind) -> bool {
        use NumericKind::*;
        if *self == target {
            return true;
        }
        match self {
            SByte => matches!(target, Int16 | Int32 | Int64 | Single | Double | Decimal),
            Byte => matches!(
                target,
                Int16 | UInt16 | Int32 | UInt32 | Int64 | UInt64 | Single | Double | Decimal
            ),
            Int16 => matches!(target, Int32 | Int64 | Single | Double | Decimal),
            UInt16 => matches!(
                target,
                Int32 | UInt32 | Int64 | UInt64 | Single | Double | Decimal
            ),
            Int32 => matches!(target, Int64 | Single | Double | Decimal),
            UInt32 => matches!(target, Int64 | UInt64 | Single | Double | Decimal),
            Int64 => matches!(target, Single | Double | Decimal),
            UInt64 => matches!(target, Single | Double | Decimal),
            Single => matches!(target, Double),
            Double => false,
            Decimal => false,
        }
    }

    /// Binary numeric promotion per the C# rules.
    ///
    /// Returns `None` for mixes C# rejects outright (`decimal` with a
    /// floating kind, `ulong` with a signed integer kind).
    pub fn join(a: NumericKind, b: NumericKind) -> Option<NumericKind> {
        use NumericKind::*;
        if a == Decimal || b == Decimal {
            let other = if a == Decimal { b } else { a };
            return if other.is_integer() || other == Decimal {
                Some(Decimal)
            } else {
                None
            };
        }
        if a == Double || b == Double {
            return Some(Double);
        }
        if a == Single || b == Single {
            return Some(Single);
        }
        if a == UInt64 || b == UInt64 {
            let other = if a == UInt64 { b } else { a };
            return if other.is_signed() && other != UInt64 {
                None
            } else {
                Some(UInt64)
            };
        }
        if a == Int64 || b == Int64 {
            return Some(Int64);
        }
        if a == UInt32 || b == UInt32 {
            let other = if a == UInt32 { b } else { a };
            return if other.is_signed() { Some(Int64) } else { Some(UInt32) };
        }
        Some(Int32)
    }
}

impl std::fmt::Display for NumericKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

// =============================================================================
// Literal lexeme parsing
// =============================================================================

/// Parse a numeric literal lexeme into an f64 value.
/// Supports `0x`/`0b`/`0o` prefixes and numeric separators (`_`).
pub fn parse_numeric_literal_value(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }

    if text.len() > 2 {
        let prefix = &text[0..2];
        if prefix.eq_ignore_ascii_case("0x") {
            return parse_radix_digits(&text[2..], 16);
        } else if prefix.eq_ignore_ascii_case("0b") {
            return parse_radix_digits(&text[2..], 2);
        } else if prefix.eq_ignore_ascii_case("0o") {
            return parse_radix_digits(&text[2..], 8);
        }
    }

    let cleaned: String;
    let body = if text.contains('_') {
        cleaned = text.chars().filter(|&c| c != '_').collect();
        cleaned.as_str()
    } else {
        text
    };
    body.parse::<f64>().ok()
}

fn parse_radix_digits(text: &str, base: u32) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let mut value = 0.0;
    let base_float = base as f64;
    for byte in text.bytes() {
        if byte == b'_' {
            continue;
        }
        let digit = match byte {
            b'0'..=b'9' => (byte - b'0') as u32,
            b'a'..=b'f' => (byte - b'a' + 10) as u32,
            b'A'..=b'F' => (byte - b'A' + 10) as u32,
            _ => return None,
        };
        if digit >= base {
            return None;
        }
        value = value * base_float + (digit as f64);
    }
    Some(value)
}

/// Whether a lexeme denotes an integer (no decimal point, no exponent).
pub fn is_integer_lexeme(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    if body.len() > 2 {
        let prefix = &body[0..2];
        if prefix.eq_ignore_ascii_case("0x")
            || prefix.eq_ignore_ascii_case("0b")
            || prefix.eq_ignore_ascii_case("0o")
        {
            return true;
        }
    }
    !body.contains('.') && !body.contains('e') && !body.contains('E')
}

/// Parse an integer lexeme into its exact value.
/// Returns `None` for non-integer lexemes or values outside i128.
pub fn parse_integer_lexeme(text: &str) -> Option<i128> {
    if !is_integer_lexeme(text) {
        return None;
    }
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let cleaned: String;
    let body = if body.contains('_') {
        cleaned = body.chars().filter(|&c| c != '_').collect();
        cleaned.as_str()
    } else {
        body
    };
    let magnitude = if body.len() > 2 {
        let prefix = &body[0..2];
        if prefix.eq_ignore_ascii_case("0x") {
            i128::from_str_radix(&body[2..], 16).ok()?
        } else if prefix.eq_ignore_ascii_case("0b") {
            i128::from_str_radix(&body[2..], 2).ok()?
        } else if prefix.eq_ignore_ascii_case("0o") {
            i128::from_str_radix(&body[2..], 8).ok()?
        } else {
            body.parse::<i128>().ok()?
        }
    } else {
        body.parse::<i128>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Whether an integer value survives a round trip through a JavaScript
/// `number` without precision loss.
pub fn is_js_safe_integer(value: i128) -> bool {
    value.abs() <= MAX_SAFE_INTEGER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_literal_values() {
        assert_eq!(parse_numeric_literal_value("123"), Some(123.0));
        assert_eq!(parse_numeric_literal_value("123.456"), Some(123.456));
        assert_eq!(parse_numeric_literal_value("1_000"), Some(1000.0));
        assert_eq!(parse_numeric_literal_value("0xFF"), Some(255.0));
        assert_eq!(parse_numeric_literal_value("0b11"), Some(3.0));
        assert_eq!(parse_numeric_literal_value("0o10"), Some(8.0));
        assert_eq!(parse_numeric_literal_value("0xg"), None);
        assert_eq!(parse_numeric_literal_value("0b2"), None);
    }

    #[test]
    fn integer_lexeme_detection() {
        assert!(is_integer_lexeme("42"));
        assert!(is_integer_lexeme("-42"));
        assert!(is_integer_lexeme("0xFF"));
        assert!(!is_integer_lexeme("4.2"));
        assert!(!is_integer_lexeme("1e3"));
    }

    #[test]
    fn integer_lexeme_parsing() {
        assert_eq!(parse_integer_lexeme("2147483648"), Some(2_147_483_648));
        assert_eq!(parse_integer_lexeme("-1"), Some(-1));
        assert_eq!(parse_integer_lexeme("0x10"), Some(16));
        assert_eq!(parse_integer_lexeme("1_000_000"), Some(1_000_000));
        assert_eq!(parse_integer_lexeme("1.5"), None);
    }

    #[test]
    fn safe_integer_boundary() {
        assert!(is_js_safe_integer(MAX_SAFE_INTEGER));
        assert!(is_js_safe_integer(-MAX_SAFE_INTEGER));
        assert!(!is_js_safe_integer(MAX_SAFE_INTEGER + 1));
    }

    #[test]
    fn join_follows_promotion_rules() {
        use NumericKind::*;
        assert_eq!(NumericKind::join(Int32, Int32), Some(Int32));
        assert_eq!(NumericKind::join(Byte, Int16), Some(Int32));
        assert_eq!(NumericKind::join(Int32, Int64), Some(Int64));
        assert_eq!(NumericKind::join(UInt32, Int32), Some(Int64));
        assert_eq!(NumericKind::join(Int32, Double), Some(Double));
        assert_eq!(NumericKind::join(Single, Double), Some(Double));
        assert_eq!(NumericKind::join(UInt64, Int32), None);
        assert_eq!(NumericKind::join(Decimal, Double), None);
        assert_eq!(NumericKind::join(Decimal, Int32), Some(Decimal));
    }

    #[test]
    fn widening_table() {
        use NumericKind::*;
        assert!(Int32.widens_to(Int64));
        assert!(Byte.widens_to(UInt64));
        assert!(!Int64.widens_to(Int32));
        assert!(!Double.widens_to(Single));
        assert!(!SByte.widens_to(Byte));
    }

    #[test]
    fn range_boundaries() {
        use NumericKind::*;
        assert!(Int32.contains(2_147_483_647));
        assert!(!Int32.contains(2_147_483_648));
        assert!(Byte.contains(255));
        assert!(!Byte.contains(256));
    }
}
