//! Declaration parsers: `label`, `const`, `type`, `var`, and routine
//! headings.
//!
//! Each parser here both builds a symbol/type-table entry *and* reserves
//! whatever storage the declaration needs, in the same pass — there is no
//! separate "collect declarations" phase before the body is checked.
//! Routine bodies are not parsed here; [`crate::block::parse_block`] calls
//! back into [`parse_procedure_or_function`] for the heading only, then
//! recurses into itself for the nested block.

use pascalc_base::{ErrorCategory, Span, Symbol};
use pascalc_frontend::{Keyword, Punct, SymbolKind, TokenKind, TypeDesc, TypeRef};

use crate::constfold::ConstValue;
use crate::context::CompilationContext;
use crate::expr::parse_and_fold_const;
use crate::tokenstream::TokenStream;

/// `label-declaration-part ::= 'label' label { ',' label } ';'`
pub fn parse_label_decl(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    if !stream.at_keyword(Keyword::Label) {
        return;
    }
    stream.advance();
    loop {
        let span = stream.span();
        if let TokenKind::IntLiteral(n) = stream.peek_kind().clone() {
            stream.advance();
            let name = ctx.interner.intern(&n.to_string());
            let label_number = ctx.emitter.new_label().0;
            declare_checked(ctx, name, SymbolKind::Label { label_number, defined: false }, span);
        } else {
            ctx.diagnostics.error(ErrorCategory::Syntactic, "expected a label (an unsigned integer)", span);
        }
        if stream.at_punct(Punct::Comma) {
            stream.advance();
            continue;
        }
        break;
    }
    stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
}

/// `const-declaration-part ::= 'const' (ident '=' constant ';')+`
pub fn parse_const_decl(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    if !stream.at_keyword(Keyword::Const) {
        return;
    }
    stream.advance();
    while let Some(name) = peek_ident(stream) {
        let span = stream.span();
        stream.advance();
        stream.expect_punct(Punct::Eq, &mut ctx.diagnostics);
        let Some(value) = parse_and_fold_const(ctx, stream) else {
            stream.resync_to_semicolon();
            stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
            continue;
        };
        let const_type = type_ref_for_const(ctx, &value);
        let frontend_value = value.to_frontend();
        declare_checked(ctx, name, SymbolKind::Constant { const_type, value: frontend_value }, span);
        stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
    }
}

/// Determines the type a folded constant's value should be declared with.
/// For a set constant this only needs the element base type to build a
/// `TypeDesc::Set`; the actual bitset is re-emitted at each point of use
/// from the value stored on the symbol (see [`crate::expr::parse_designator`]),
/// not interned here.
fn type_ref_for_const(ctx: &mut CompilationContext, value: &ConstValue) -> TypeRef {
    use pascalc_frontend::types as wk;
    match value {
        ConstValue::Integer(_) => wk::INTEGER,
        ConstValue::Real(_) => wk::REAL,
        ConstValue::Char(_) => wk::CHAR,
        ConstValue::Bool(_) => wk::BOOLEAN,
        ConstValue::Str(_) => wk::STRING,
        ConstValue::Set(_) => ctx.types.declare(TypeDesc::Set { base: wk::INTEGER }, None),
    }
}

/// `type-declaration-part ::= 'type' (ident '=' type-denoter ';')+`
pub fn parse_type_decl(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    if !stream.at_keyword(Keyword::Type) {
        return;
    }
    stream.advance();
    while let Some(name) = peek_ident(stream) {
        let span = stream.span();
        stream.advance();
        stream.expect_punct(Punct::Eq, &mut ctx.diagnostics);
        let type_ref = parse_type_denoter(ctx, stream);
        ctx.types.get(type_ref); // the ref must resolve; panics here would be an internal-invariant bug
        let alias = ctx.types.declare(TypeDesc::Alias { target: type_ref }, Some(name));
        declare_checked(ctx, name, SymbolKind::TypeName { denotes: type_ref }, span);
        ctx.resolve_forward_pointers(name, type_ref);
        let _ = alias;
        stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
    }

    for (_, target_name, span) in ctx.take_unresolved_forward_pointers() {
        let message = format!("pointer target type `{}` is never declared", ctx.interner.resolve(target_name));
        ctx.diagnostics.error(ErrorCategory::Declaration, message, span);
    }
}

/// `type-denoter ::= type-identifier | new-type`
///
/// Handles the built-in names, enumerations, subranges, and the structured
/// types (`array`, `record`, `set`, `file`, `^T`). A bare identifier that
/// names an earlier type declaration resolves through
/// [`pascalc_frontend::SymbolKind::TypeName`].
pub fn parse_type_denoter(ctx: &mut CompilationContext, stream: &mut TokenStream) -> TypeRef {
    let span = stream.span();
    match stream.peek_kind().clone() {
        TokenKind::Ident(name) => match ctx.symbols.lookup(name) {
            Some(r) => match ctx.symbols.get(r).kind.clone() {
                SymbolKind::TypeName { denotes } => {
                    stream.advance();
                    denotes
                }
                // A bare name at this position that isn't itself a type can
                // still start a subrange, e.g. `type t = red..blue;` — the
                // name is the low bound, not a type-identifier.
                SymbolKind::ScalarObject { .. } | SymbolKind::Constant { .. } => parse_subrange_type(ctx, stream),
                _ => {
                    stream.advance();
                    ctx.diagnostics.error(ErrorCategory::Declaration, "not a type name", span);
                    pascalc_frontend::types::INTEGER
                }
            },
            None => {
                stream.advance();
                ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared type name", span);
                pascalc_frontend::types::INTEGER
            }
        },
        TokenKind::Punct(Punct::Caret) => {
            stream.advance();
            let target_span = stream.span();
            let Some(target_name) = stream.expect_ident(&mut ctx.diagnostics) else {
                return pascalc_frontend::types::INTEGER;
            };
            match ctx.symbols.lookup(target_name) {
                Some(r) => match &ctx.symbols.get(r).kind {
                    SymbolKind::TypeName { denotes } => {
                        let target = *denotes;
                        ctx.types.declare(TypeDesc::Pointer { target }, None)
                    }
                    _ => {
                        ctx.diagnostics.error(ErrorCategory::Declaration, "not a type name", target_span);
                        ctx.types.declare(TypeDesc::Pointer { target: pascalc_frontend::types::INTEGER }, None)
                    }
                },
                None => {
                    // Forward pointer reference to a type not yet declared —
                    // a self-referential record (`node = record next: ^node
                    // end`) or a type later in the same `type` section. The
                    // pointer is interned now with a placeholder target and
                    // patched once `target_name`'s own declaration is seen
                    // (see `parse_type_decl`).
                    let placeholder = ctx.types.declare(TypeDesc::Pointer { target: pascalc_frontend::types::INTEGER }, None);
                    ctx.defer_forward_pointer(placeholder, target_name, target_span);
                    placeholder
                }
            }
        }
        TokenKind::Punct(Punct::LParen) => parse_enum_type(ctx, stream),
        TokenKind::Keyword(Keyword::Array) => parse_array_type(ctx, stream),
        TokenKind::Keyword(Keyword::Record) => parse_record_type(ctx, stream),
        TokenKind::Keyword(Keyword::Set) => {
            stream.advance();
            stream.expect_keyword(Keyword::Of, &mut ctx.diagnostics);
            let base = parse_type_denoter(ctx, stream);
            ctx.types.declare(TypeDesc::Set { base }, None)
        }
        TokenKind::Keyword(Keyword::File) => {
            stream.advance();
            if stream.at_keyword(Keyword::Of) {
                stream.advance();
                let component = parse_type_denoter(ctx, stream);
                ctx.types.declare(TypeDesc::File { component }, None)
            } else {
                pascalc_frontend::types::TEXT
            }
        }
        TokenKind::IntLiteral(_) | TokenKind::CharLiteral(_) | TokenKind::Punct(Punct::Minus) => {
            parse_subrange_type(ctx, stream)
        }
        _ => {
            ctx.diagnostics.error(ErrorCategory::Syntactic, "expected a type denoter", span);
            pascalc_frontend::types::INTEGER
        }
    }
}

fn parse_enum_type(ctx: &mut CompilationContext, stream: &mut TokenStream) -> TypeRef {
    stream.expect_punct(Punct::LParen, &mut ctx.diagnostics);
    let mut names = Vec::new();
    loop {
        let span = stream.span();
        if let Some(name) = stream.expect_ident(&mut ctx.diagnostics) {
            names.push((name, span));
        }
        if stream.at_punct(Punct::Comma) {
            stream.advance();
            continue;
        }
        break;
    }
    stream.expect_punct(Punct::RParen, &mut ctx.diagnostics);

    // The enum's own `TypeRef` is needed before its members can be declared
    // (each member's symbol records it as its `owner`), so the type is
    // interned first and the symbols are declared in a second pass.
    let members = names
        .iter()
        .enumerate()
        .map(|(ordinal, (name, _))| pascalc_frontend::types::EnumMember { name: *name, ordinal: ordinal as i64 })
        .collect();
    let enum_ref = ctx.types.declare(TypeDesc::Enum { members }, None);
    for (ordinal, (name, span)) in names.into_iter().enumerate() {
        declare_checked(ctx, name, SymbolKind::ScalarObject { owner: enum_ref, ordinal: ordinal as i64 }, span);
    }
    enum_ref
}

/// Peeks (without consuming) the ordinal type a subrange's low bound names,
/// so [`parse_subrange_type`] can set `Subrange::base` to that type instead
/// of always assuming `integer`. `None` means "plain integer" — the common
/// case, and also the safe fallback when the bound turns out not to be a
/// constant at all (`parse_and_fold_const` reports that on its own).
fn leading_ordinal_base(ctx: &CompilationContext, stream: &TokenStream) -> Option<TypeRef> {
    match stream.peek_kind() {
        TokenKind::CharLiteral(_) => Some(pascalc_frontend::types::CHAR),
        TokenKind::Ident(name) => match ctx.symbols.lookup(*name) {
            Some(r) => match &ctx.symbols.get(r).kind {
                SymbolKind::ScalarObject { owner, .. } => Some(*owner),
                SymbolKind::Constant { const_type, .. } => Some(*const_type),
                _ => None,
            },
            None => None,
        },
        _ => None,
    }
}

fn ordinal_value(value: ConstValue) -> Option<i64> {
    match value {
        ConstValue::Integer(i) => Some(i),
        ConstValue::Char(c) => Some(c as i64),
        _ => None,
    }
}

fn parse_subrange_type(ctx: &mut CompilationContext, stream: &mut TokenStream) -> TypeRef {
    let span = stream.span();
    let base = leading_ordinal_base(ctx, stream);
    let Some(low) = parse_and_fold_const(ctx, stream).and_then(ordinal_value) else {
        ctx.diagnostics.error(ErrorCategory::Declaration, "subrange bound must be an ordinal constant", span);
        return pascalc_frontend::types::INTEGER;
    };
    stream.expect_punct(Punct::DotDot, &mut ctx.diagnostics);
    let high_span = stream.span();
    let Some(high) = parse_and_fold_const(ctx, stream).and_then(ordinal_value) else {
        ctx.diagnostics.error(ErrorCategory::Declaration, "subrange bound must be an ordinal constant", high_span);
        return pascalc_frontend::types::INTEGER;
    };
    if low > high {
        ctx.diagnostics.error(ErrorCategory::Declaration, "subrange low bound exceeds high bound", span);
    }
    let base = base.unwrap_or(pascalc_frontend::types::INTEGER);
    ctx.types.declare(TypeDesc::Subrange { base, low, high }, None)
}

fn parse_array_type(ctx: &mut CompilationContext, stream: &mut TokenStream) -> TypeRef {
    stream.expect_keyword(Keyword::Array, &mut ctx.diagnostics);
    stream.expect_punct(Punct::LBracket, &mut ctx.diagnostics);
    let mut index_types = Vec::new();
    loop {
        index_types.push(parse_type_denoter(ctx, stream));
        if stream.at_punct(Punct::Comma) {
            stream.advance();
            continue;
        }
        break;
    }
    stream.expect_punct(Punct::RBracket, &mut ctx.diagnostics);
    stream.expect_keyword(Keyword::Of, &mut ctx.diagnostics);
    let mut element = parse_type_denoter(ctx, stream);

    // A multi-dimensional array is built inside-out: the innermost index
    // governs the innermost (element-adjacent) array.
    for index in index_types.into_iter().rev() {
        let (low, high) = ctx.types.ordinal_range(index).unwrap_or((0, 0));
        element = ctx.types.declare(TypeDesc::Array { index, element, low, high }, None);
    }
    element
}

fn parse_record_type(ctx: &mut CompilationContext, stream: &mut TokenStream) -> TypeRef {
    stream.expect_keyword(Keyword::Record, &mut ctx.diagnostics);
    let mut field_types = Vec::new();
    while !stream.at_keyword(Keyword::End) && !stream.at_keyword(Keyword::Case) {
        let mut names = Vec::new();
        loop {
            if let Some(n) = stream.expect_ident(&mut ctx.diagnostics) {
                names.push(n);
            }
            if stream.at_punct(Punct::Comma) {
                stream.advance();
                continue;
            }
            break;
        }
        stream.expect_punct(Punct::Colon, &mut ctx.diagnostics);
        let field_type = parse_type_denoter(ctx, stream);
        for n in names {
            field_types.push((n, field_type));
        }
        if stream.at_punct(Punct::Semicolon) {
            stream.advance();
        } else {
            break;
        }
    }

    let variant = if stream.at_keyword(Keyword::Case) {
        Some(parse_variant_part(ctx, stream))
    } else {
        None
    };

    stream.expect_keyword(Keyword::End, &mut ctx.diagnostics);
    let (fields, _) = ctx.types.layout_record_fields(&field_types);
    ctx.types.declare(TypeDesc::Record { fields, variant }, None)
}

fn parse_variant_part(ctx: &mut CompilationContext, stream: &mut TokenStream) -> pascalc_frontend::types::VariantPart {
    stream.expect_keyword(Keyword::Case, &mut ctx.diagnostics);
    let tag_field = {
        let save = stream.span();
        match stream.expect_ident(&mut ctx.diagnostics) {
            Some(name) if stream.at_punct(Punct::Colon) => {
                stream.advance();
                Some(name)
            }
            _ => {
                let _ = save;
                None
            }
        }
    };
    let tag_type = parse_type_denoter(ctx, stream);
    stream.expect_keyword(Keyword::Of, &mut ctx.diagnostics);

    let mut branches = Vec::new();
    loop {
        let mut tags = Vec::new();
        loop {
            if let Some(ConstValue::Integer(v)) = parse_and_fold_const(ctx, stream) {
                tags.push(v);
            }
            if stream.at_punct(Punct::Comma) {
                stream.advance();
                continue;
            }
            break;
        }
        stream.expect_punct(Punct::Colon, &mut ctx.diagnostics);
        stream.expect_punct(Punct::LParen, &mut ctx.diagnostics);
        let mut field_types = Vec::new();
        if !stream.at_punct(Punct::RParen) {
            loop {
                let mut names = Vec::new();
                loop {
                    if let Some(n) = stream.expect_ident(&mut ctx.diagnostics) {
                        names.push(n);
                    }
                    if stream.at_punct(Punct::Comma) {
                        stream.advance();
                        continue;
                    }
                    break;
                }
                stream.expect_punct(Punct::Colon, &mut ctx.diagnostics);
                let field_type = parse_type_denoter(ctx, stream);
                for n in names {
                    field_types.push((n, field_type));
                }
                if stream.at_punct(Punct::Semicolon) {
                    stream.advance();
                    continue;
                }
                break;
            }
        }
        stream.expect_punct(Punct::RParen, &mut ctx.diagnostics);
        let (fields, _) = ctx.types.layout_record_fields(&field_types);
        branches.push(pascalc_frontend::types::VariantBranch { tags, fields });

        if stream.at_punct(Punct::Semicolon) && !peek_is_end(stream) {
            stream.advance();
            continue;
        }
        break;
    }

    pascalc_frontend::types::VariantPart { tag_field, tag_type, branches }
}

fn peek_is_end(stream: &TokenStream) -> bool {
    stream.at_keyword(Keyword::End)
}

/// `var-declaration-part ::= 'var' (ident {',' ident} ':' type-denoter ';')+`
pub fn parse_var_decl(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    if !stream.at_keyword(Keyword::Var) {
        return;
    }
    stream.advance();
    while let Some(first_name) = peek_ident(stream) {
        let first_span = stream.span();
        let mut names = vec![(first_name, first_span)];
        stream.advance();
        while stream.at_punct(Punct::Comma) {
            stream.advance();
            let span = stream.span();
            if let Some(n) = stream.expect_ident(&mut ctx.diagnostics) {
                names.push((n, span));
            }
        }
        stream.expect_punct(Punct::Colon, &mut ctx.diagnostics);
        let var_type = parse_type_denoter(ctx, stream);
        let layout = ctx.types.layout(var_type);
        for (name, span) in names {
            let offset = ctx.reserve(layout.size, layout.align);
            let level = ctx.level();
            register_initializers(ctx, var_type, offset);
            let kind = match &ctx.types.get(ctx.types.resolve(var_type)).desc {
                TypeDesc::File { component } => SymbolKind::File { component_type: *component, data_offset: offset, level },
                TypeDesc::Text => SymbolKind::File { component_type: pascalc_frontend::types::CHAR, data_offset: offset, level },
                _ => SymbolKind::Variable { var_type, data_offset: offset, level },
            };
            declare_checked(ctx, name, kind, span);
        }
        stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
    }
}

/// Queues whatever startup initializers `var_type` needs at `offset` in the
/// enclosing frame: a string's length byte cleared to zero, a file's
/// descriptor slot cleared, or (recursively) the same for any field of a
/// record that itself needs one. Flushed into the instruction stream by
/// [`crate::block::parse_block`] right after the block's declarations.
fn register_initializers(ctx: &mut CompilationContext, var_type: TypeRef, offset: i32) {
    let resolved = ctx.types.resolve(var_type);
    match ctx.types.get(resolved).desc.clone() {
        TypeDesc::String | TypeDesc::ShortString { .. } => {
            ctx.emitter.add_initializer(offset, crate::emitter::NO_RODATA);
        }
        TypeDesc::File { .. } | TypeDesc::Text => {
            ctx.emitter.add_initializer(offset, crate::emitter::NO_RODATA);
        }
        TypeDesc::Record { fields, .. } => {
            for field in &fields {
                register_initializers(ctx, field.field_type, offset + field.byte_offset as i32);
            }
            // Variant-part fields are skipped: which branch is live isn't
            // known until runtime, so no single offset is safe to seed here.
        }
        _ => {}
    }
}

fn peek_ident(stream: &TokenStream) -> Option<Symbol> {
    stream.peek().ident()
}

/// Declares `name`, reporting a duplicate-declaration diagnostic instead of
/// shadowing if `name` was already declared within the scope currently
/// being built (as opposed to an outer scope, which legally shadows).
fn declare_checked(ctx: &mut CompilationContext, name: Symbol, kind: SymbolKind, span: Span) {
    let scope_start = ctx.current_scope_start();
    if ctx.symbols.lookup_in_scope(name, scope_start).is_some() {
        ctx.diagnostics.error(ErrorCategory::Declaration, "duplicate declaration in this scope", span);
    }
    let level = ctx.level();
    ctx.symbols.declare(name, kind, level, span);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str, f: impl FnOnce(&mut CompilationContext, &mut TokenStream)) -> CompilationContext {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex(source, &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        f(&mut ctx, &mut stream);
        ctx
    }

    #[test]
    fn const_decl_registers_integer_constant() {
        let ctx = parse("const n = 10;", |ctx, s| parse_const_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
        let name = {
            let mut i = pascalc_base::Interner::new();
            i.intern("n")
        };
        let _ = name;
    }

    #[test]
    fn var_decl_reserves_distinct_offsets() {
        let ctx = parse("var a, b: integer;", |ctx, s| parse_var_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ctx.symbols.len(), 2);
        let first = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        let second = ctx.symbols.get(pascalc_frontend::SymbolRef(1));
        if let (SymbolKind::Variable { data_offset: o1, .. }, SymbolKind::Variable { data_offset: o2, .. }) =
            (&first.kind, &second.kind)
        {
            assert_ne!(o1, o2);
        } else {
            panic!("expected variable symbols");
        }
    }

    #[test]
    fn duplicate_var_in_same_scope_is_an_error() {
        let ctx = parse("var a: integer; a: integer;", |ctx, s| {
            parse_var_decl(ctx, s);
        });
        assert!(ctx.diagnostics.has_errors());
    }

    #[test]
    fn enum_type_declares_scalar_members_in_order() {
        let ctx = parse("type color = (red, green, blue);", |ctx, s| parse_type_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ctx.symbols.len(), 4); // type name + 3 members
    }

    #[test]
    fn record_fields_get_increasing_offsets() {
        let ctx = parse("type point = record x, y: integer end;", |ctx, s| parse_type_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn array_type_records_bounds_from_subrange() {
        let ctx = parse("type vec = array[1..10] of integer;", |ctx, s| parse_type_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn char_subrange_bases_itself_on_char_not_integer() {
        let ctx = parse("type letters = 'A'..'E';", |ctx, s| parse_type_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
        let sym = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        let SymbolKind::TypeName { denotes } = sym.kind else { panic!("expected a type name") };
        match &ctx.types.get(denotes).desc {
            TypeDesc::Subrange { base, low, high } => {
                assert_eq!(*base, pascalc_frontend::types::CHAR);
                assert_eq!(*low, b'A' as i64);
                assert_eq!(*high, b'E' as i64);
            }
            other => panic!("expected a subrange, got {other:?}"),
        }
    }

    #[test]
    fn set_of_char_subrange_parses_end_to_end() {
        let ctx = parse("var s: set of 'A'..'E';", |ctx, s| parse_var_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn enum_member_subrange_bases_itself_on_the_enum_type() {
        let ctx = parse(
            "type color = (red, green, blue); type warm = green..blue;",
            |ctx, s| {
                parse_type_decl(ctx, s);
            },
        );
        assert!(!ctx.diagnostics.has_errors());
        // symbols: color, red, green, blue, warm — the subrange's type name
        let warm_sym = ctx.symbols.get(pascalc_frontend::SymbolRef(4));
        let SymbolKind::TypeName { denotes } = warm_sym.kind else { panic!("expected a type name") };
        let color_sym = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        let SymbolKind::TypeName { denotes: color_type } = color_sym.kind else { panic!("expected a type name") };
        match &ctx.types.get(denotes).desc {
            TypeDesc::Subrange { base, low, high } => {
                assert_eq!(*base, color_type);
                assert_eq!(*low, 1);
                assert_eq!(*high, 2);
            }
            other => panic!("expected a subrange, got {other:?}"),
        }
    }

    #[test]
    fn self_referential_record_pointer_resolves_to_the_record_itself() {
        let ctx = parse("type node = record v: integer; next: ^node end;", |ctx, s| parse_type_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
        let node_sym = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        let SymbolKind::TypeName { denotes: node_type } = node_sym.kind else { panic!("expected a type name") };
        let TypeDesc::Record { fields, .. } = &ctx.types.get(node_type).desc else { panic!("expected a record") };
        assert_eq!(fields.len(), 2);
        let next = &fields[1];
        match &ctx.types.get(next.field_type).desc {
            TypeDesc::Pointer { target } => assert_eq!(*target, node_type, "next must point back at node, not at a placeholder"),
            other => panic!("expected a pointer, got {other:?}"),
        }
    }

    #[test]
    fn pointer_to_a_later_type_in_the_same_section_resolves_once_declared() {
        let ctx = parse(
            "type list = ^node; node = record v: integer; next: list end;",
            |ctx, s| parse_type_decl(ctx, s),
        );
        assert!(!ctx.diagnostics.has_errors());
        let list_sym = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        let SymbolKind::TypeName { denotes: list_type } = list_sym.kind else { panic!("expected a type name") };
        let node_sym = ctx.symbols.get(pascalc_frontend::SymbolRef(1));
        let SymbolKind::TypeName { denotes: node_type } = node_sym.kind else { panic!("expected a type name") };
        match &ctx.types.get(list_type).desc {
            TypeDesc::Pointer { target } => assert_eq!(*target, node_type, "list must patch through to node, not stay on the placeholder"),
            other => panic!("expected a pointer, got {other:?}"),
        }
    }

    #[test]
    fn pointer_to_an_undeclared_type_is_a_declaration_error() {
        let ctx = parse("type p = ^nowhere;", |ctx, s| parse_type_decl(ctx, s));
        assert!(ctx.diagnostics.has_errors());
    }

    #[test]
    fn file_variable_declares_as_file_kind_not_generic_variable() {
        let ctx = parse("var f: file of integer;", |ctx, s| parse_var_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
        let sym = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        assert!(matches!(sym.kind, SymbolKind::File { .. }), "expected SymbolKind::File, got {:?}", sym.kind);
    }

    #[test]
    fn text_variable_declares_as_file_kind_of_char() {
        let ctx = parse("var t: text;", |ctx, s| parse_var_decl(ctx, s));
        assert!(!ctx.diagnostics.has_errors());
        let sym = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        match &sym.kind {
            SymbolKind::File { component_type, .. } => assert_eq!(*component_type, pascalc_frontend::types::CHAR),
            other => panic!("expected SymbolKind::File, got {other:?}"),
        }
    }

    #[test]
    fn string_variable_registers_a_startup_initializer() {
        let mark = {
            let ctx = parse("var s: string;", |ctx, s| parse_var_decl(ctx, s));
            assert!(!ctx.diagnostics.has_errors());
            ctx.emitter.initializers_mark()
        };
        assert_eq!(mark, 1);
    }

    #[test]
    fn plain_integer_variable_registers_no_initializer() {
        let ctx = parse("var n: integer;", |ctx, s| parse_var_decl(ctx, s));
        assert_eq!(ctx.emitter.initializers_mark(), 0);
    }

    #[test]
    fn record_with_string_field_registers_that_fields_initializer() {
        let ctx = parse(
            "type rec = record n: integer; s: string end; var r: rec;",
            |ctx, s| {
                parse_type_decl(ctx, s);
                parse_var_decl(ctx, s);
            },
        );
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ctx.emitter.initializers_mark(), 1);
        let entries = ctx.emitter.initializers_from(0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rodata_index, crate::emitter::NO_RODATA);
    }
}
