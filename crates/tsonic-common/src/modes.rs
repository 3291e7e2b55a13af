//! Shared enums used across the pipeline crates.

use serde::{Deserialize, Serialize};

/// How an argument is passed to a CLR parameter.
///
/// Carried on `IrParameter.passing` and on call-site argument lists; the
/// soundness gate rejects IR that encodes a mode as a reference *type*.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamMode {
    #[default]
    Value,
    Ref,
    Out,
    In,
}

impl ParamMode {
    /// The surface keyword, e.g. for diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            ParamMode::Value => "value",
            ParamMode::Ref => "ref",
            ParamMode::Out => "out",
            ParamMode::In => "in",
        }
    }

    /// Parse a surface keyword (`ref`/`out`/`in`).
    pub fn from_keyword(text: &str) -> Option<ParamMode> {
        Some(match text {
            "value" => ParamMode::Value,
            "ref" => ParamMode::Ref,
            "out" => ParamMode::Out,
            "in" => ParamMode::In,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_round_trip() {
        for mode in [ParamMode::Value, ParamMode::Ref, ParamMode::Out, ParamMode::In] {
            assert_eq!(ParamMode::from_keyword(mode.keyword()), Some(mode));
        }
        assert_eq!(ParamMode::from_keyword("inout"), None);
    }
}
