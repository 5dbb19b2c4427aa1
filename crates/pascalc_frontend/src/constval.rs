//! The literal value carried by a `const` declaration's symbol.
//!
//! Stored on [`crate::symtab::SymbolKind::Constant`] so that referencing an
//! earlier constant — either from a later `const` declaration's
//! initializer or from an ordinary expression — doesn't need a second pass
//! over the declaration's source text: the folded value is already sitting
//! on the symbol.

/// A fully-evaluated constant value, as recorded on a `const` symbol.
///
/// Mirrors `pascalc_codegen::constfold::ConstValue` one-for-one; the two
/// are kept as separate types because this crate doesn't depend on
/// `pascalc-codegen` (the constant folder lives downstream, alongside the
/// expression evaluator it shares its grammar with), but a symbol still
/// needs somewhere to park the value once folded.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Integer(i64),
    Real(f64),
    Char(u8),
    Bool(bool),
    Str(String),
    /// A set constant, stored as the sorted list of member ordinals.
    Set(Vec<i64>),
}
