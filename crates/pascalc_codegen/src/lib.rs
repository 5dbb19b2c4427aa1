#![cfg_attr(docsrs, feature(doc_cfg))]

//! # pascalc-codegen
//!
//! The recursive-descent parser, fused with type checking and p-code
//! emission, that forms the semantic core of this Pascal front end.
//!
//! ## Architecture
//!
//! ```text
//! Source text
//!      │
//!      ▼ (pascalc-frontend)
//! ┌─────────┐
//! │  Lexer  │
//! └─────────┘
//!      │ Vec<Token>
//!      ▼
//! ┌───────────────────────────────────────────────────────┐
//! │              CompilationContext                        │
//! │  SymbolTable · TypeTable · Diagnostics · Emitter        │
//! │                                                         │
//! │   program/unit ──▶ block ──▶ declarations ──▶ statements│
//! │                                    │                    │
//! │                        expr/constfold (type + code)     │
//! └───────────────────────────────────────────────────────┘
//!      │
//!      ▼
//! p-code instruction stream + read-only-data section
//! ```
//!
//! There is no intermediate AST: [`block::parse_block`] and everything it
//! calls both check and emit in the same pass, which is why
//! [`context::CompilationContext`] exists — it is the explicit stand-in for
//! the mutable compiler globals a single-pass design would otherwise need.
//!
//! ## Modules
//!
//! - [`context`] — [`context::CompilationContext`], the threaded state.
//! - [`tokenstream`] — one-token-lookahead cursor over the lexer's output.
//! - [`exprtype`] — the expression type algebra and factor-flags bitset.
//! - [`emitter`] — the p-code instruction set and object-file accumulator.
//! - [`constfold`] — compile-time constant expression evaluation.
//! - [`expr`] — the expression evaluator.
//! - [`decl`] — `label`/`const`/`type`/`var`/routine-heading parsers.
//! - [`block`] — block parsing, nested routines, scope entry/exit.
//! - [`stmt`] — the statement parser.
//! - [`program`] — `program`/`unit` entry points and the public [`program::compile`].

pub mod block;
pub mod constfold;
pub mod context;
pub mod decl;
pub mod emitter;
pub mod expr;
pub mod exprtype;
pub mod program;
pub mod stmt;
pub mod tokenstream;

pub use context::CompilationContext;
pub use emitter::{Emitter, Instr, Label};
pub use exprtype::{ExprKind, ExprType, FactorFlags};
pub use program::{compile, render_diagnostics, render_tokens, CompileResult};
pub use tokenstream::TokenStream;
