#![cfg_attr(docsrs, feature(doc_cfg))]

//! # pascalc-base
//!
//! Pure structural atoms for the pascalc front end.
//!
//! This crate provides the foundational types shared by the lexer, symbol
//! table, type system, and emitter:
//!
//! - [`Interner`]/[`Symbol`] — string interning for O(1) identifier equality
//! - [`Span`] — source byte-range tracking
//! - [`SourceMap`] — byte offset to line/column resolution for diagnostics
//! - [`SpannedError`]/[`Result`] — a single fallible error with a source position
//! - [`Diagnostics`] — the error/warning collector the whole pipeline reports into
//!
//! # Design Principles
//!
//! This crate has **no knowledge of Pascal grammar or semantics**. It provides
//! only generic, reusable infrastructure that the frontend and codegen crates
//! build upon.
//!
//! # Example
//!
//! ```
//! use pascalc_base::{Interner, Span};
//!
//! let mut interner = Interner::new();
//!
//! let name = interner.intern("i");
//! let span = Span::new(0, 1);
//!
//! assert_eq!(interner.resolve(name), "i");
//! assert_eq!(span.len(), 1);
//! ```

pub mod diagnostics;
pub mod error;
pub mod intern;
pub mod source_map;
pub mod span;

pub use diagnostics::{Diagnostic, Diagnostics, ErrorCategory, Severity};
pub use error::{Result, SpannedError};
pub use intern::{Interner, Symbol, SymbolEq};
pub use source_map::{Position, SourceMap};
pub use span::Span;
