//! Line/column positions for rendering diagnostics.
//!
//! Byte spans are the internal currency; `LineMap` converts them to 1-based
//! line/column pairs when a diagnostic is rendered for the user.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// A 1-based line/column position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// A resolved source location attached to a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32, length: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
            length,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Maps byte offsets to line/column positions for one source file.
///
/// Line starts are computed once; lookups are a binary search.
#[derive(Clone, Debug)]
pub struct LineMap {
    line_starts: Vec<u32>,
}

impl LineMap {
    /// Build a line map from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        LineMap { line_starts }
    }

    /// Convert a byte offset into a 1-based position.
    pub fn position(&self, offset: u32) -> Position {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position {
            line: line_idx as u32 + 1,
            column: offset - self.line_starts[line_idx] + 1,
        }
    }

    /// Resolve a span in the given file to a `SourceLocation`.
    pub fn locate(&self, file: &str, span: Span) -> SourceLocation {
        let pos = self.position(span.start);
        SourceLocation::new(file, pos.line, pos.column, span.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_lookup() {
        let map = LineMap::new("ab\ncd\n\nef");
        assert_eq!(map.position(0), Position { line: 1, column: 1 });
        assert_eq!(map.position(1), Position { line: 1, column: 2 });
        assert_eq!(map.position(3), Position { line: 2, column: 1 });
        assert_eq!(map.position(6), Position { line: 3, column: 1 });
        assert_eq!(map.position(7), Position { line: 4, column: 1 });
    }

    #[test]
    fn locate_span() {
        let map = LineMap::new("let x = 1;\nlet y = 2;");
        let loc = map.locate("main.ts", Span::new(15, 16));
        assert_eq!(loc.file, "main.ts");
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 5);
        assert_eq!(loc.length, 1);
    }
}
