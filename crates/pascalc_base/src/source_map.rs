//! Byte offset to line/column resolution for diagnostics.
//!
//! The lexer and parser only ever carry byte-offset [`Span`]s — cheap to copy,
//! cheap to merge. A [`SourceMap`] is built once per compilation unit and is
//! consulted only at the point a diagnostic is actually displayed, so the
//! line-scan cost is paid once per error rather than once per token.
//!
//! # Example
//!
//! ```
//! use pascalc_base::{SourceMap, Span};
//!
//! let map = SourceMap::new("program p;\nbegin\n  x := 1\nend.", "p.pas");
//! let pos = map.resolve(Span::new(11, 16).start);
//! assert_eq!(pos.line, 2);
//! assert_eq!(pos.column, 1);
//! ```

use crate::span::Span;

/// A 1-based line/column pair, together with the file it was resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position<'a> {
    pub file: &'a str,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Resolves byte offsets into a source file to 1-based line/column positions.
///
/// Built once from the source text: line-start offsets are recorded up front,
/// and [`SourceMap::resolve`] binary-searches them.
#[derive(Debug, Clone)]
pub struct SourceMap {
    file_name: String,
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Scans `source` for line starts once, ahead of any resolution.
    pub fn new(source: &str, file_name: impl Into<String>) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            file_name: file_name.into(),
            line_starts,
        }
    }

    /// Resolves a byte offset to a 1-based line and column.
    ///
    /// An offset past the end of the source resolves to the last known line.
    pub fn resolve(&self, offset: usize) -> Position<'_> {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_at) => insert_at - 1,
        };
        let line_start = self.line_starts[line_index];
        Position {
            file: &self.file_name,
            line: (line_index + 1) as u32,
            column: (offset - line_start + 1) as u32,
        }
    }

    /// Resolves the start of a span. Convenience for the common case where
    /// only the beginning of an error's source range is reported.
    pub fn resolve_span(&self, span: Span) -> Position<'_> {
        self.resolve(span.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_first_column() {
        let map = SourceMap::new("abc", "t.pas");
        let pos = map.resolve(0);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 1);
    }

    #[test]
    fn second_line_after_newline() {
        let map = SourceMap::new("abc\ndef", "t.pas");
        let pos = map.resolve(4);
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);
    }

    #[test]
    fn mid_line_column_counts_from_line_start() {
        let map = SourceMap::new("program p;\nbegin\nend.", "t.pas");
        let pos = map.resolve(13);
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 3);
    }

    #[test]
    fn offset_past_end_resolves_last_line() {
        let map = SourceMap::new("a\nb", "t.pas");
        let pos = map.resolve(100);
        assert_eq!(pos.line, 2);
    }

    #[test]
    fn display_formats_file_colon_line_colon_column() {
        let map = SourceMap::new("x", "unit.pas");
        let pos = map.resolve(0);
        assert_eq!(format!("{}", pos), "unit.pas:1:1");
    }
}
