//! The expression type algebra.
//!
//! Every factor, term, and (sub-)expression the parser folds while walking
//! the grammar carries one [`ExprType`] rather than a full type-checked AST
//! node — there is no AST here, so the "type of this expression so far" is
//! the only state the evaluator threads alongside the generated instructions.
//!
//! [`ExprKind`] intentionally keeps a handful of "any-of" members
//! (`AnyOrdinal`, `AnyString`, `AnyPointer`, `EmptySet`) distinct from the
//! concrete primitive kinds: they describe compile-time constants whose
//! final type isn't pinned down until they're used in context (`nil` is
//! `AnyPointer` until assigned to a typed pointer variable; `[]` is
//! `EmptySet` until unioned with a typed set).

use pascalc_frontend::TypeRef;

/// The tag half of an expression's type. Mirrors [`pascalc_frontend::types::TypeDesc`]
/// but adds the "any"/placeholder members a type-checked AST wouldn't need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// A malformed expression already diagnosed; prevents cascading errors.
    Unknown,
    /// `nil`, before it has been unified with a concrete pointer type.
    AnyPointer,
    /// The result of reading from an empty ordinal context (e.g. a `case`
    /// with no matching label reachable at compile time); rarely surfaces.
    AnyOrdinal,
    /// A string literal, before `string` vs `shortstring[n]` is pinned down.
    AnyString,
    /// `[]`, before unioning with a typed set fixes its base type.
    EmptySet,
    Integer,
    Word,
    ShortInt,
    ShortWord,
    LongInt,
    LongWord,
    Char,
    Boolean,
    Real,
    /// A member of a user enumeration; `type_ref` on the owning [`ExprType`]
    /// names which one.
    Scalar,
    String,
    ShortString,
    /// A `^char`-terminated literal passed where a C-style string is
    /// expected, e.g. an `external` routine parameter.
    CString,
    Set,
    File,
    Record,
}

/// The full static type of an expression: a [`ExprKind`] tag, the
/// [`TypeRef`] it was computed against (for `Scalar`/`Set`/`Record`/array
/// element types, where the tag alone is not enough to check compatibility),
/// and whether the value is additionally wrapped in a pointer.
///
/// The pointer bit is tracked separately from the tag rather than folded
/// into a `Pointer(Box<ExprKind>)` variant because Pascal only ever allows
/// one level of implicit pointer-ness to participate in expression
/// evaluation (further indirection requires an explicit `^`), so a flat bit
/// is simpler to test than a recursive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprType {
    pub kind: ExprKind,
    pub type_ref: Option<TypeRef>,
    pub is_pointer: bool,
}

impl ExprType {
    pub const fn new(kind: ExprKind) -> Self {
        Self { kind, type_ref: None, is_pointer: false }
    }

    pub const fn with_type(kind: ExprKind, type_ref: TypeRef) -> Self {
        Self { kind, type_ref: Some(type_ref), is_pointer: false }
    }

    pub const fn pointer_to(kind: ExprKind, type_ref: Option<TypeRef>) -> Self {
        Self { kind, type_ref, is_pointer: true }
    }

    pub const UNKNOWN: ExprType = ExprType::new(ExprKind::Unknown);
    pub const INTEGER: ExprType = ExprType::new(ExprKind::Integer);
    pub const BOOLEAN: ExprType = ExprType::new(ExprKind::Boolean);
    pub const REAL: ExprType = ExprType::new(ExprKind::Real);
    pub const CHAR: ExprType = ExprType::new(ExprKind::Char);
    pub const STRING: ExprType = ExprType::new(ExprKind::String);

    pub fn is_numeric(self) -> bool {
        matches!(
            self.kind,
            ExprKind::Integer
                | ExprKind::Word
                | ExprKind::ShortInt
                | ExprKind::ShortWord
                | ExprKind::LongInt
                | ExprKind::LongWord
                | ExprKind::Real
        )
    }

    pub fn is_integer_like(self) -> bool {
        matches!(
            self.kind,
            ExprKind::Integer
                | ExprKind::Word
                | ExprKind::ShortInt
                | ExprKind::ShortWord
                | ExprKind::LongInt
                | ExprKind::LongWord
        )
    }

    pub fn is_string_like(self) -> bool {
        matches!(self.kind, ExprKind::String | ExprKind::ShortString | ExprKind::AnyString | ExprKind::CString)
    }

    pub fn is_ordinal_like(self) -> bool {
        self.is_integer_like()
            || matches!(
                self.kind,
                ExprKind::Char | ExprKind::Boolean | ExprKind::Scalar | ExprKind::AnyOrdinal
            )
    }

    /// Unifies two operand types into the single type an operator result
    /// should carry, or `None` when the pair is outright incompatible
    /// (the caller is responsible for reporting a type-category diagnostic
    /// in that case).
    ///
    /// `real` dominates any other numeric kind; two identical kinds are
    /// left unchanged; the `Any*`/`Empty*` placeholders adopt whichever
    /// concrete kind they're paired against.
    pub fn unify(self, other: ExprType) -> Option<ExprType> {
        use ExprKind::*;
        if self.kind == Unknown || other.kind == Unknown {
            return Some(ExprType::UNKNOWN);
        }
        if self.kind == other.kind {
            return Some(self);
        }
        match (self.kind, other.kind) {
            (Real, k) | (k, Real) if matches!(k, Integer | Word | ShortInt | ShortWord | LongInt | LongWord) => {
                Some(ExprType::REAL)
            }
            (AnyPointer, _) => Some(other),
            (_, AnyPointer) => Some(self),
            (AnyString, k) | (k, AnyString) if matches!(k, String | ShortString | CString) => {
                Some(ExprType::new(k))
            }
            (EmptySet, Set) => Some(other),
            (Set, EmptySet) => Some(self),
            (AnyOrdinal, k) if ExprType::new(k).is_ordinal_like() => Some(ExprType::new(k)),
            (k, AnyOrdinal) if ExprType::new(k).is_ordinal_like() => Some(ExprType::new(k)),
            _ if self.is_integer_like() && other.is_integer_like() => {
                // Mixed integer-family operands widen to `integer`.
                Some(ExprType::INTEGER)
            }
            _ => None,
        }
    }
}

/// Bits accumulated while reducing a variable-access chain
/// (`a.b[i]^.c`) into a single factor.
///
/// Kept as a manual bitset (rather than a `bitflags!`-generated type)
/// because the set of bits is small, fixed, and never serialized —
/// pulling in a dependency for six flags would be overkill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactorFlags(u8);

impl FactorFlags {
    pub const NONE: FactorFlags = FactorFlags(0);
    /// The access chain passed through at least one array index `[...]`.
    pub const INDEXED: FactorFlags = FactorFlags(1 << 0);
    /// The access chain passed through at least one `^` dereference.
    pub const DEREFERENCE: FactorFlags = FactorFlags(1 << 1);
    /// The factor denotes a `var` parameter (an address already, not a value).
    pub const VAR_PARM: FactorFlags = FactorFlags(1 << 2);
    /// The emitted code should load the factor's address, not its value
    /// (e.g. the left-hand side of an assignment, or `@x`).
    pub const LOAD_ADDRESS: FactorFlags = FactorFlags(1 << 3);
    /// The access chain passed through at least one record field selector.
    pub const FIELD_OFFSET: FactorFlags = FactorFlags(1 << 4);
    /// The base of the access chain is itself a pointer expression rather
    /// than a plain variable (affects whether a leading dereference is
    /// implicit).
    pub const POINTER_EXPRESSION: FactorFlags = FactorFlags(1 << 5);

    pub const fn empty() -> Self {
        Self::NONE
    }

    pub fn insert(&mut self, other: FactorFlags) {
        self.0 |= other.0;
    }

    pub fn contains(self, other: FactorFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: FactorFlags) -> FactorFlags {
        FactorFlags(self.0 | other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_kinds_unify_to_themselves() {
        assert_eq!(ExprType::INTEGER.unify(ExprType::INTEGER), Some(ExprType::INTEGER));
    }

    #[test]
    fn real_dominates_mixed_numeric_operands() {
        let result = ExprType::REAL.unify(ExprType::INTEGER).unwrap();
        assert_eq!(result.kind, ExprKind::Real);
    }

    #[test]
    fn nil_unifies_with_any_pointer_type() {
        let nil = ExprType::new(ExprKind::AnyPointer);
        let typed_ptr = ExprType::pointer_to(ExprKind::Record, None);
        assert_eq!(nil.unify(typed_ptr), Some(typed_ptr));
    }

    #[test]
    fn incompatible_kinds_fail_to_unify() {
        assert_eq!(ExprType::BOOLEAN.unify(ExprType::new(ExprKind::Record)), None);
    }

    #[test]
    fn factor_flags_accumulate_through_an_access_chain() {
        let mut flags = FactorFlags::empty();
        flags.insert(FactorFlags::INDEXED);
        flags.insert(FactorFlags::DEREFERENCE);
        assert!(flags.contains(FactorFlags::INDEXED));
        assert!(flags.contains(FactorFlags::DEREFERENCE));
        assert!(!flags.contains(FactorFlags::VAR_PARM));
    }
}
