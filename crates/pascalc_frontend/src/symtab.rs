//! The append-only symbol table.
//!
//! Unlike a scope built from `HashMap`s, this table never removes an entry:
//! a scope exit truncates the table back to a saved length ("high-water
//! mark") rather than popping individual bindings out of a map. That
//! discipline exists because several invariants in this front end depend on
//! *contiguous* storage — a routine's parameters occupy the indices
//! immediately after the routine's own symbol, a record's fields immediately
//! follow the record type symbol, an enumeration's members immediately
//! follow the scalar type symbol. None of that survives if symbols live in a
//! hash map keyed by name.
//!
//! Name lookup therefore walks the vector from the end backwards (so inner
//! declarations shadow outer ones) rather than indexing a map.

use pascalc_base::{Span, Symbol};

/// A stable reference to an entry in a [`SymbolTable`]. Indices are never
/// reused: even after a scope is truncated away, a `SymbolRef` obtained
/// before the truncation must not be dereferenced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolRef(pub usize);

/// A reference to an entry in the [`crate::types::TypeTable`], threaded
/// through symbol payloads so a variable/field/parameter can name its type
/// without the symbol table depending on the type table's internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeRef(pub usize);

/// The discriminated kind of a symbol-table entry, carrying whatever
/// kind-specific payload the declaration needs.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Procedure {
        entry_label: Option<u32>,
        param_count: usize,
        forward: bool,
    },
    Function {
        entry_label: Option<u32>,
        param_count: usize,
        result_type: TypeRef,
        forward: bool,
    },
    Label {
        /// The p-code emitter label this symbol names, reserved at
        /// `label-declaration-part` time and placed once the matching
        /// `label: statement` is reached.
        label_number: u32,
        defined: bool,
    },
    /// A `type` declaration's name, pointing at the type it denotes.
    TypeName {
        denotes: TypeRef,
    },
    Variable {
        var_type: TypeRef,
        /// Stack offset relative to the enclosing block's frame base.
        data_offset: i32,
        level: u32,
    },
    /// A `var` parameter: passed by reference rather than by value.
    VarParameter {
        var_type: TypeRef,
        data_offset: i32,
        level: u32,
    },
    Constant {
        const_type: TypeRef,
        value: crate::constval::ConstantValue,
    },
    /// A named member of an enumerated (scalar) type; `ordinal` is its
    /// position and `owner` is the scalar type's own symbol/type.
    ScalarObject {
        owner: TypeRef,
        ordinal: i64,
    },
    /// A field of a record type; declared immediately after the record's
    /// own type symbol, per the contiguity invariant this table exists for.
    Field {
        field_type: TypeRef,
        byte_offset: u32,
    },
    /// A `file`/`text`-typed variable: a small fixed slot holding the
    /// runtime file descriptor, tagged separately from `Variable` so block
    /// parsing can register the descriptor's startup initializer instead of
    /// routing it through the generic variable path.
    File {
        component_type: TypeRef,
        data_offset: i32,
        level: u32,
    },
    UnitName,
}

/// One entry in the append-only table.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: Symbol,
    pub kind: SymbolKind,
    pub level: u32,
    pub span: Span,
}

/// Dense, append-only, scope-truncated symbol storage.
///
/// Scopes are entered with [`SymbolTable::mark`] and left with
/// [`SymbolTable::truncate`]: no entry declared after the mark survives a
/// truncation back to it. Lookups search from the newest entry backwards so
/// a later declaration shadows an earlier one with the same spelling.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current length, to be restored later via [`Self::truncate`].
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    /// Restores the table to a previously taken [`Self::mark`], discarding
    /// every symbol declared since. `SymbolRef`s into the discarded range
    /// must not be used again.
    pub fn truncate(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    /// Appends a new entry, returning a stable reference to it.
    pub fn declare(&mut self, name: Symbol, kind: SymbolKind, level: u32, span: Span) -> SymbolRef {
        let idx = self.entries.len();
        self.entries.push(SymbolEntry { name, kind, level, span });
        SymbolRef(idx)
    }

    pub fn get(&self, reference: SymbolRef) -> &SymbolEntry {
        &self.entries[reference.0]
    }

    pub fn get_mut(&mut self, reference: SymbolRef) -> &mut SymbolEntry {
        &mut self.entries[reference.0]
    }

    /// Finds the innermost visible binding for `name`, i.e. the last entry
    /// (searching backwards from the end) whose spelling matches.
    pub fn lookup(&self, name: Symbol) -> Option<SymbolRef> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| e.name == name)
            .map(|(i, _)| SymbolRef(i))
    }

    /// Finds a binding for `name` declared no earlier than `from`, used to
    /// detect duplicate declarations within the scope currently being built
    /// (as opposed to shadowing an outer one, which is legal).
    pub fn lookup_in_scope(&self, name: Symbol, from: usize) -> Option<SymbolRef> {
        self.entries[from..]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| e.name == name)
            .map(|(i, _)| SymbolRef(from + i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pascalc_base::Interner;

    fn sym(interner: &mut Interner, s: &str) -> Symbol {
        interner.intern(s)
    }

    #[test]
    fn declare_and_lookup_roundtrips() {
        let mut interner = Interner::new();
        let mut table = SymbolTable::new();
        let x = sym(&mut interner, "x");
        let r = table.declare(
            x,
            SymbolKind::Variable { var_type: TypeRef(0), data_offset: 0, level: 1 },
            1,
            Span::new(0, 1),
        );
        assert_eq!(table.lookup(x), Some(r));
    }

    #[test]
    fn inner_declaration_shadows_outer() {
        let mut interner = Interner::new();
        let mut table = SymbolTable::new();
        let x = sym(&mut interner, "x");
        let outer = table.declare(
            x,
            SymbolKind::Variable { var_type: TypeRef(0), data_offset: 0, level: 1 },
            1,
            Span::new(0, 1),
        );
        let inner = table.declare(
            x,
            SymbolKind::Variable { var_type: TypeRef(0), data_offset: 4, level: 2 },
            2,
            Span::new(2, 3),
        );
        assert_ne!(outer, inner);
        assert_eq!(table.lookup(x), Some(inner));
    }

    #[test]
    fn truncate_restores_outer_scope_visibility() {
        let mut interner = Interner::new();
        let mut table = SymbolTable::new();
        let x = sym(&mut interner, "x");
        let outer = table.declare(
            x,
            SymbolKind::Variable { var_type: TypeRef(0), data_offset: 0, level: 1 },
            1,
            Span::new(0, 1),
        );
        let mark = table.mark();
        table.declare(
            x,
            SymbolKind::Variable { var_type: TypeRef(0), data_offset: 4, level: 2 },
            2,
            Span::new(2, 3),
        );
        table.truncate(mark);
        assert_eq!(table.lookup(x), Some(outer));
        assert_eq!(table.len(), mark);
    }

    #[test]
    fn lookup_in_scope_ignores_outer_duplicate() {
        let mut interner = Interner::new();
        let mut table = SymbolTable::new();
        let x = sym(&mut interner, "x");
        table.declare(
            x,
            SymbolKind::Variable { var_type: TypeRef(0), data_offset: 0, level: 1 },
            1,
            Span::new(0, 1),
        );
        let mark = table.mark();
        assert_eq!(table.lookup_in_scope(x, mark), None);
        let inner = table.declare(
            x,
            SymbolKind::Variable { var_type: TypeRef(0), data_offset: 4, level: 2 },
            2,
            Span::new(2, 3),
        );
        assert_eq!(table.lookup_in_scope(x, mark), Some(inner));
    }

    #[test]
    fn record_fields_are_contiguous_after_the_record_type() {
        let mut interner = Interner::new();
        let mut table = SymbolTable::new();
        let rec_name = sym(&mut interner, "point");
        let rec_sym = table.declare(rec_name, SymbolKind::TypeName { denotes: TypeRef(1) }, 0, Span::new(0, 1));
        let fx = sym(&mut interner, "x");
        let fy = sym(&mut interner, "y");
        let field_x = table.declare(fx, SymbolKind::Field { field_type: TypeRef(2), byte_offset: 0 }, 0, Span::new(1, 2));
        let field_y = table.declare(fy, SymbolKind::Field { field_type: TypeRef(2), byte_offset: 4 }, 0, Span::new(2, 3));
        assert_eq!(field_x.0, rec_sym.0 + 1);
        assert_eq!(field_y.0, field_x.0 + 1);
    }
}
