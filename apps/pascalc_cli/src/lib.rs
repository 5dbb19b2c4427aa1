#![cfg_attr(docsrs, feature(doc_cfg))]

//! # pascalc-cli
//!
//! Command-line driver for the pascalc front end. Reads a Pascal source
//! file, compiles it through `pascalc-codegen`, and prints diagnostics and
//! (optionally) the lexed tokens or emitted p-code.
//!
//! All of the actual compiler logic lives in `pascalc-codegen`; this crate
//! is the external collaborator the front end's specification treats as
//! out of scope for its own semantics.

pub mod cli;

pub use cli::run_cli;
