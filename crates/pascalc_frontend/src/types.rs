//! The type system: ordinal primitives, new ordinal types, and the
//! complex/structured types built from them.
//!
//! Like the symbol table, types live in a dense, append-only
//! [`TypeTable`] indexed by [`crate::symtab::TypeRef`] rather than behind a
//! name map — a type's identity is its slot, which lets an enum's member
//! symbols and a record's field symbols point back at their owning type
//! without any interior mutability.
//!
//! Every primitive ordinal type is pre-registered at fixed, well-known
//! indices (see [`TypeTable::new`]) so callers can refer to e.g. "the
//! integer type" without a lookup.

use crate::symtab::TypeRef;
use pascalc_base::Symbol;

/// Byte size and alignment shared by every type description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub size: u32,
    pub align: u32,
}

impl Layout {
    pub const fn new(size: u32, align: u32) -> Self {
        Self { size, align }
    }

    /// Rounds `offset` up to satisfy this layout's alignment.
    ///
    /// The alignment policy this front end follows is simple: every type
    /// aligns to a full machine word (4 bytes) except `char` and packed
    /// char-arrays/strings, which align to 1. There is no user-facing
    /// `packed record` distinction beyond that.
    pub fn align_offset(self, offset: u32) -> u32 {
        if self.align <= 1 {
            offset
        } else {
            (offset + self.align - 1) / self.align * self.align
        }
    }
}

/// One member of an enumerated (scalar) type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: Symbol,
    pub ordinal: i64,
}

/// One field of a record's fixed (non-variant) part, or of a single variant
/// branch.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: Symbol,
    pub field_type: TypeRef,
    pub byte_offset: u32,
}

/// One branch of a record's variant (`case`) part. All branches of the same
/// variant part share the same starting byte offset; the record's total
/// size is large enough for the widest branch.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantBranch {
    /// Constant tag values selecting this branch (e.g. `1, 2:` in
    /// `case kind of 1, 2: (...)`).
    pub tags: Vec<i64>,
    pub fields: Vec<RecordField>,
}

/// The variant (`case ... of`) part of a record, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPart {
    pub tag_field: Option<Symbol>,
    pub tag_type: TypeRef,
    pub branches: Vec<VariantBranch>,
}

/// The full description of one entry in the [`TypeTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    // --- Ordinal primitives -------------------------------------------
    Integer,
    Word,
    ShortInt,
    ShortWord,
    LongInt,
    LongWord,
    Boolean,
    Char,
    Real,
    String,
    /// A fixed-capacity short string, `string[n]`.
    ShortString { capacity: u32 },

    // --- New ordinal types ----------------------------------------------
    /// A user-declared enumeration, e.g. `(red, green, blue)`. Its members
    /// are also appended to the symbol table immediately after this type's
    /// own symbol (the contiguity invariant the symbol table documents).
    Enum { members: Vec<EnumMember> },
    /// A subrange of another ordinal type, e.g. `1..100` or `red..blue`.
    Subrange { base: TypeRef, low: i64, high: i64 },

    // --- Complex / structured types -------------------------------------
    Pointer { target: TypeRef },
    Array {
        index: TypeRef,
        element: TypeRef,
        low: i64,
        high: i64,
    },
    Record {
        fields: Vec<RecordField>,
        variant: Option<VariantPart>,
    },
    /// A bitset over an ordinal base type, represented as a packed bitmap.
    Set { base: TypeRef },
    File { component: TypeRef },
    Text,

    /// A `type NewName = ExistingType` alias. Distinct from `Subrange`
    /// and from the primitives: an alias carries no layout of its own and
    /// defers entirely to `target` (see [`TypeTable::resolve`]).
    Alias { target: TypeRef },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    pub desc: TypeDesc,
    pub name: Option<Symbol>,
}

macro_rules! well_known {
    ($($const_name:ident),+ $(,)?) => {
        well_known!(@idx 0; $($const_name),+);
    };
    (@idx $i:expr; $head:ident $(, $tail:ident)*) => {
        pub const $head: TypeRef = TypeRef($i);
        well_known!(@idx $i + 1; $($tail),*);
    };
    (@idx $i:expr;) => {};
}

well_known!(
    INTEGER, WORD, SHORT_INT, SHORT_WORD, LONG_INT, LONG_WORD, BOOLEAN, CHAR, REAL, STRING, TEXT
);

/// Dense, append-only storage for every type known to a compilation unit.
///
/// The first 11 slots are the ordinal primitives and `text`, at the fixed
/// indices named above — every `TypeTable` starts with them already
/// present so the block parser never has to special-case "is this a
/// built-in name" versus "is this a user type".
#[derive(Debug)]
pub struct TypeTable {
    entries: Vec<TypeEntry>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut entries = Vec::new();
        for desc in [
            TypeDesc::Integer,
            TypeDesc::Word,
            TypeDesc::ShortInt,
            TypeDesc::ShortWord,
            TypeDesc::LongInt,
            TypeDesc::LongWord,
            TypeDesc::Boolean,
            TypeDesc::Char,
            TypeDesc::Real,
            TypeDesc::String,
            TypeDesc::Text,
        ] {
            entries.push(TypeEntry { desc, name: None });
        }
        Self { entries }
    }

    pub fn declare(&mut self, desc: TypeDesc, name: Option<Symbol>) -> TypeRef {
        let idx = self.entries.len();
        self.entries.push(TypeEntry { desc, name });
        TypeRef(idx)
    }

    pub fn get(&self, r: TypeRef) -> &TypeEntry {
        &self.entries[r.0]
    }

    /// Overwrites an already-declared entry's description in place.
    ///
    /// Every other type is build-once; this exists solely to backpatch a
    /// pointer's forward-referenced target (`type list = ^node; node =
    /// record ... end;`) once the target's own declaration is seen, since
    /// the pointer itself must be interned before that point to give the
    /// rest of the type section something to refer to.
    pub fn patch(&mut self, r: TypeRef, desc: TypeDesc) {
        self.entries[r.0].desc = desc;
    }

    /// Follows `Alias` chains down to the first non-alias entry, the type
    /// whose layout and operator applicability actually govern `r`.
    pub fn resolve(&self, r: TypeRef) -> TypeRef {
        let mut current = r;
        loop {
            match &self.entries[current.0].desc {
                TypeDesc::Alias { target } => current = *target,
                _ => return current,
            }
        }
    }

    /// Computes the layout of a type, following aliases and recursing into
    /// structured types. Panics only on a malformed table (e.g. a dangling
    /// `TypeRef`), never on valid Pascal types.
    pub fn layout(&self, r: TypeRef) -> Layout {
        let resolved = self.resolve(r);
        match &self.entries[resolved.0].desc {
            TypeDesc::Integer | TypeDesc::Word | TypeDesc::LongInt | TypeDesc::LongWord => {
                Layout::new(4, 4)
            }
            TypeDesc::ShortInt | TypeDesc::ShortWord | TypeDesc::Boolean => Layout::new(1, 4),
            TypeDesc::Char => Layout::new(1, 1),
            TypeDesc::Real => Layout::new(8, 4),
            TypeDesc::String => Layout::new(256, 1),
            TypeDesc::ShortString { capacity } => Layout::new(capacity + 1, 1),
            TypeDesc::Enum { .. } => Layout::new(4, 4),
            TypeDesc::Subrange { base, .. } => self.layout(*base),
            TypeDesc::Pointer { .. } => Layout::new(4, 4),
            TypeDesc::Array { element, low, high, .. } => {
                let elem = self.layout(*element);
                let count = (high - low + 1).max(0) as u32;
                Layout::new(elem.size * count, elem.align)
            }
            TypeDesc::Record { fields, variant } => self.record_layout(fields, variant.as_ref()),
            TypeDesc::Set { .. } => Layout::new(32, 4),
            TypeDesc::File { .. } | TypeDesc::Text => Layout::new(4, 4),
            TypeDesc::Alias { .. } => unreachable!("resolve() strips aliases"),
        }
    }

    fn record_layout(&self, fields: &[RecordField], variant: Option<&VariantPart>) -> Layout {
        let mut offset = 0u32;
        let mut align = 4u32;
        for field in fields {
            let l = self.layout(field.field_type);
            align = align.max(l.align);
            offset = l.align_offset(offset) + l.size;
        }
        if let Some(v) = variant {
            let mut widest = 0u32;
            for branch in &v.branches {
                let mut branch_offset = offset;
                for field in &branch.fields {
                    let l = self.layout(field.field_type);
                    align = align.max(l.align);
                    branch_offset = l.align_offset(branch_offset) + l.size;
                }
                widest = widest.max(branch_offset);
            }
            offset = widest;
        }
        Layout::new(offset, align)
    }

    /// Assigns byte offsets to a fixed record part in declaration order,
    /// applying each field's own alignment. Returns the fields with offsets
    /// filled in and the offset the variant part (if any) should start at.
    pub fn layout_record_fields(&self, field_types: &[(Symbol, TypeRef)]) -> (Vec<RecordField>, u32) {
        let mut offset = 0u32;
        let mut fields = Vec::with_capacity(field_types.len());
        for (name, ty) in field_types {
            let l = self.layout(*ty);
            offset = l.align_offset(offset);
            fields.push(RecordField { name: *name, field_type: *ty, byte_offset: offset });
            offset += l.size;
        }
        (fields, offset)
    }

    /// True when `r` resolves to one of the ordinal primitives, an enum, or
    /// a subrange — the family that may index an array, be a `for` control
    /// variable, or appear as a `case` selector.
    pub fn is_ordinal(&self, r: TypeRef) -> bool {
        matches!(
            self.get(self.resolve(r)).desc,
            TypeDesc::Integer
                | TypeDesc::Word
                | TypeDesc::ShortInt
                | TypeDesc::ShortWord
                | TypeDesc::LongInt
                | TypeDesc::LongWord
                | TypeDesc::Boolean
                | TypeDesc::Char
                | TypeDesc::Enum { .. }
                | TypeDesc::Subrange { .. }
        )
    }

    pub fn is_real(&self, r: TypeRef) -> bool {
        matches!(self.get(self.resolve(r)).desc, TypeDesc::Real)
    }

    pub fn is_string_like(&self, r: TypeRef) -> bool {
        matches!(
            self.get(self.resolve(r)).desc,
            TypeDesc::String | TypeDesc::ShortString { .. }
        )
    }

    /// The inclusive ordinal range of an ordinal type: `(low, high)`.
    pub fn ordinal_range(&self, r: TypeRef) -> Option<(i64, i64)> {
        match &self.get(self.resolve(r)).desc {
            TypeDesc::Integer | TypeDesc::LongInt => Some((i32::MIN as i64, i32::MAX as i64)),
            TypeDesc::Word | TypeDesc::LongWord => Some((0, u32::MAX as i64)),
            TypeDesc::ShortInt => Some((i8::MIN as i64, i8::MAX as i64)),
            TypeDesc::ShortWord => Some((0, u8::MAX as i64)),
            TypeDesc::Boolean => Some((0, 1)),
            TypeDesc::Char => Some((0, 255)),
            TypeDesc::Enum { members } => {
                let low = members.iter().map(|m| m.ordinal).min().unwrap_or(0);
                let high = members.iter().map(|m| m.ordinal).max().unwrap_or(0);
                Some((low, high))
            }
            TypeDesc::Subrange { low, high, .. } => Some((*low, *high)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pascalc_base::Interner;

    #[test]
    fn primitive_slots_are_at_fixed_indices() {
        let table = TypeTable::new();
        assert_eq!(table.get(INTEGER).desc, TypeDesc::Integer);
        assert_eq!(table.get(CHAR).desc, TypeDesc::Char);
        assert_eq!(table.get(TEXT).desc, TypeDesc::Text);
    }

    #[test]
    fn alias_resolves_through_to_target() {
        let mut table = TypeTable::new();
        let mut interner = Interner::new();
        let name = interner.intern("MyInt");
        let alias = table.declare(TypeDesc::Alias { target: INTEGER }, Some(name));
        assert_eq!(table.resolve(alias), INTEGER);
        assert_eq!(table.layout(alias), table.layout(INTEGER));
    }

    #[test]
    fn char_aligns_to_one_others_to_word() {
        let table = TypeTable::new();
        assert_eq!(table.layout(CHAR), Layout::new(1, 1));
        assert_eq!(table.layout(INTEGER), Layout::new(4, 4));
        assert_eq!(table.layout(BOOLEAN).align, 4);
    }

    #[test]
    fn record_field_offsets_respect_alignment() {
        let mut table = TypeTable::new();
        let mut interner = Interner::new();
        let c = interner.intern("c");
        let n = interner.intern("n");
        let (fields, size) = table.layout_record_fields(&[(c, CHAR), (n, INTEGER)]);
        assert_eq!(fields[0].byte_offset, 0);
        // n is integer-aligned, so it must round up past the single char byte.
        assert_eq!(fields[1].byte_offset, 4);
        assert_eq!(size, 8);
    }

    #[test]
    fn array_layout_multiplies_element_size_by_span() {
        let mut table = TypeTable::new();
        let arr = table.declare(
            TypeDesc::Array { index: INTEGER, element: INTEGER, low: 1, high: 10 },
            None,
        );
        assert_eq!(table.layout(arr), Layout::new(40, 4));
    }

    #[test]
    fn variant_part_uses_the_widest_branch() {
        let mut table = TypeTable::new();
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let small = RecordField { name: a, field_type: CHAR, byte_offset: 0 };
        let big = RecordField { name: b, field_type: INTEGER, byte_offset: 0 };
        let variant = VariantPart {
            tag_field: None,
            tag_type: INTEGER,
            branches: vec![
                VariantBranch { tags: vec![0], fields: vec![small] },
                VariantBranch { tags: vec![1], fields: vec![big] },
            ],
        };
        let rec = table.declare(TypeDesc::Record { fields: vec![], variant: Some(variant) }, None);
        assert_eq!(table.layout(rec).size, 4);
    }

    #[test]
    fn enum_ordinal_range_spans_its_members() {
        let mut table = TypeTable::new();
        let mut interner = Interner::new();
        let members = vec![
            EnumMember { name: interner.intern("red"), ordinal: 0 },
            EnumMember { name: interner.intern("green"), ordinal: 1 },
            EnumMember { name: interner.intern("blue"), ordinal: 2 },
        ];
        let e = table.declare(TypeDesc::Enum { members }, None);
        assert_eq!(table.ordinal_range(e), Some((0, 2)));
        assert!(table.is_ordinal(e));
    }

    #[test]
    fn subrange_is_ordinal_and_reports_its_bounds() {
        let mut table = TypeTable::new();
        let sub = table.declare(TypeDesc::Subrange { base: INTEGER, low: 1, high: 100 }, None);
        assert!(table.is_ordinal(sub));
        assert_eq!(table.ordinal_range(sub), Some((1, 100)));
    }
}
