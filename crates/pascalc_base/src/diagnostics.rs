//! The compilation-wide error/warning collector.
//!
//! Pascal compilers in this lineage never abort on the first error: a
//! malformed declaration is recovered from by inserting a sentinel symbol, a
//! syntax error resyncs to the next semicolon, and compilation runs to the
//! end of the file so a single invocation reports as many problems as
//! possible. [`Diagnostics`] is the single sink every parser stage reports
//! into, and the thing a caller inspects afterward to decide whether to emit
//! an object file at all.
//!
//! # Categories
//!
//! Errors are grouped by what kind of contract was violated, not by which
//! Rust type implements them — see [`ErrorCategory`]. [`ErrorCategory::Internal`]
//! is reserved for violations of the compiler's own invariants (an unbound
//! back-reference escaping its scope, a block exiting without its high-water
//! marks restored) rather than malformed input.

use crate::source_map::SourceMap;
use crate::span::Span;
use std::fmt;

/// What kind of static-semantics contract a diagnostic violates.
///
/// Mirrors the taxonomy a Pascal front end actually needs to distinguish:
/// lexical problems are found before a token even exists, syntactic ones
/// before a symbol is looked up, declaration/type/dereference ones only once
/// the symbol table and type system are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unterminated string, malformed numeric literal.
    Lexical,
    /// Missing semicolon, unbalanced bracket, unexpected token.
    Syntactic,
    /// Duplicate name, undeclared identifier, invalid subrange, set element
    /// out of range.
    Declaration,
    /// Operand type mismatch, wrong factor type for an operator, invalid
    /// cast, mismatched set base.
    Type,
    /// `^` applied to a non-pointer, field access on a non-record.
    Dereference,
    /// A contract violated by the compiler itself rather than by the source
    /// program. Reported as `"HUH"` in the lineage this front end descends
    /// from; usually not locally recoverable.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Lexical => "lexical",
            ErrorCategory::Syntactic => "syntax",
            ErrorCategory::Declaration => "declaration",
            ErrorCategory::Type => "type",
            ErrorCategory::Dereference => "dereference",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Whether a diagnostic merely informs, or counts against the error total
/// that gates object-file emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single reported problem, tied to a source span and a category.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(category: ErrorCategory, message: impl Into<String>, span: Span) -> Self {
        Self {
            category,
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    pub fn warning(category: ErrorCategory, message: impl Into<String>, span: Span) -> Self {
        Self {
            category,
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    /// Renders this diagnostic against a source map, producing a
    /// `file:line:column: category error: message` line.
    pub fn render(&self, map: &SourceMap) -> String {
        let pos = map.resolve_span(self.span);
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        format!("{}: {} {}: {}", pos, self.category, level, self.message)
    }
}

/// Accumulates diagnostics for one compilation unit.
///
/// A block that accumulates at least one error suppresses its own code
/// emission (see the block parser) but parsing continues regardless so the
/// rest of the file is still checked. `Diagnostics` itself never aborts
/// anything — it is purely a counter and a log; the decision to skip
/// emission is made by whoever asks [`Diagnostics::has_errors`].
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    error_count: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, category: ErrorCategory, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::error(category, message, span));
    }

    pub fn warning(&mut self, category: ErrorCategory, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::warning(category, message, span));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_errors_not_warnings() {
        let mut diags = Diagnostics::new();
        diags.warning(ErrorCategory::Syntactic, "unreachable code", Span::new(0, 1));
        diags.error(ErrorCategory::Declaration, "duplicate name", Span::new(2, 3));
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn empty_collector_has_no_errors() {
        let diags = Diagnostics::new();
        assert!(!diags.has_errors());
        assert!(diags.is_empty());
    }

    #[test]
    fn render_includes_position_and_category() {
        let map = SourceMap::new("var x: integer;\n", "t.pas");
        let diag = Diagnostic::error(ErrorCategory::Declaration, "duplicate name 'x'", Span::new(4, 5));
        let rendered = diag.render(&map);
        assert!(rendered.contains("t.pas:1:5"));
        assert!(rendered.contains("declaration error"));
        assert!(rendered.contains("duplicate name 'x'"));
    }
}
