//! The expression evaluator.
//!
//! Parses and emits code for Pascal's expression grammar in one pass:
//! there is no intermediate expression tree. Each grammar production
//! ([`parse_expression`], [`parse_simple_expression`], [`parse_term`],
//! [`parse_factor`]) both emits the instructions for its subtree *and*
//! returns the [`ExprType`] that subtree evaluates to, so the caller one
//! level up can type-check the operator it's about to apply before
//! emitting code for it.
//!
//! A variable access (`a.b[i]^`) is reduced factor-by-factor, accumulating
//! [`FactorFlags`] as it goes, rather than built into a path object first —
//! by the time the chain ends, the flags already say whether the final
//! p-code should load a value, load an address, or treat the base as a
//! `var` parameter's indirect cell.

use pascalc_base::{ErrorCategory, Span};
use pascalc_frontend::{Keyword, Punct, SymbolKind, TokenKind, TypeDesc};

use crate::constfold::{fold_const_expr, ConstValue};
use crate::context::CompilationContext;
use crate::emitter::{DataOp, Instr, SimpleOp, StackRefOp};
use crate::exprtype::{ExprKind, ExprType, FactorFlags};
use crate::tokenstream::TokenStream;

/// `expression ::= simple-expression [ relop simple-expression ]`
pub fn parse_expression(ctx: &mut CompilationContext, stream: &mut TokenStream) -> ExprType {
    let lhs = parse_simple_expression(ctx, stream);
    let relop = match stream.peek_kind() {
        TokenKind::Punct(Punct::Eq) => Some(SimpleOp::Equal),
        TokenKind::Punct(Punct::NotEq) => Some(SimpleOp::NotEqual),
        TokenKind::Punct(Punct::Lt) => Some(SimpleOp::Less),
        TokenKind::Punct(Punct::LtEq) => Some(SimpleOp::LessEq),
        TokenKind::Punct(Punct::Gt) => Some(SimpleOp::Greater),
        TokenKind::Punct(Punct::GtEq) => Some(SimpleOp::GreaterEq),
        TokenKind::Keyword(Keyword::In) => None,
        _ => return lhs,
    };

    if stream.at_keyword(Keyword::In) {
        let span = stream.span();
        stream.advance();
        let rhs = parse_simple_expression(ctx, stream);
        if !matches!(rhs.kind, ExprKind::Set | ExprKind::EmptySet) {
            ctx.diagnostics.error(ErrorCategory::Type, "'in' requires a set on the right", span);
        }
        // Rebase the member against the set's base type before the probe:
        // bit 0 of the set's bitset corresponds to the base type's min value.
        // The member was pushed before the set, so it sits beneath the
        // top-of-stack at this point; exchange it up, subtract, exchange
        // back rather than reordering emission.
        if let ExprKind::Set = rhs.kind {
            if let Some(TypeDesc::Set { base }) = rhs.type_ref.map(|t| ctx.types.get(ctx.types.resolve(t)).desc.clone()) {
                if let Some((low, _high)) = ctx.types.ordinal_range(base) {
                    if low != 0 {
                        ctx.emitter.emit(Instr::Simple(SimpleOp::Exchange));
                        ctx.emitter.emit(Instr::Data(DataOp::LoadConst, low));
                        ctx.emitter.emit(Instr::Simple(SimpleOp::SubInt));
                        ctx.emitter.emit(Instr::Simple(SimpleOp::Exchange));
                    }
                }
            }
        }
        ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::Membership));
        return ExprType::BOOLEAN;
    }

    let op = relop.expect("checked above");
    let span = stream.span();
    stream.advance();
    let rhs = parse_simple_expression(ctx, stream);
    match lhs.unify(rhs) {
        Some(_) => {
            ctx.emitter.emit(Instr::Simple(op));
            ExprType::BOOLEAN
        }
        None => {
            ctx.diagnostics.error(ErrorCategory::Type, "mismatched operand types in comparison", span);
            ExprType::UNKNOWN
        }
    }
}

/// `simple-expression ::= [sign] term { addop term }`
pub fn parse_simple_expression(ctx: &mut CompilationContext, stream: &mut TokenStream) -> ExprType {
    let negate = if stream.at_punct(Punct::Minus) {
        stream.advance();
        true
    } else {
        if stream.at_punct(Punct::Plus) {
            stream.advance();
        }
        false
    };

    let mut acc = parse_term(ctx, stream);
    if negate {
        if acc.is_numeric() {
            ctx.emitter.emit(Instr::Simple(SimpleOp::Negate));
        } else {
            ctx.diagnostics.error(ErrorCategory::Type, "unary '-' requires a numeric operand", stream.span());
            acc = ExprType::UNKNOWN;
        }
    }

    let mut concat_started = false;
    loop {
        let span = stream.span();
        if stream.at_punct(Punct::Plus) {
            stream.advance();
            // The left operand of a `+` chain is the caller's own string
            // buffer until the first concatenation; duplicate it onto the
            // string stack before that first concat so the library routine
            // is free to grow/mutate the result in place without clobbering
            // the source. Every concat after the first already operates on
            // a temp this evaluator allocated, so no further dup is needed.
            if acc.is_string_like() && !concat_started {
                ctx.emitter.emit(Instr::Simple(SimpleOp::Dup));
                ctx.emitter.push_string_temp();
                concat_started = true;
            }
            let rhs = parse_term(ctx, stream);
            acc = apply_additive(ctx, acc, rhs, span, true);
        } else if stream.at_punct(Punct::Minus) {
            stream.advance();
            let rhs = parse_term(ctx, stream);
            acc = apply_additive(ctx, acc, rhs, span, false);
        } else if stream.at_keyword(Keyword::Or) {
            stream.advance();
            let rhs = parse_term(ctx, stream);
            acc = apply_boolean_or_bitwise(ctx, acc, rhs, span, SimpleOp::Or, "or");
        } else if stream.at_keyword(Keyword::Xor) {
            stream.advance();
            let rhs = parse_term(ctx, stream);
            acc = apply_boolean_or_bitwise(ctx, acc, rhs, span, SimpleOp::Xor, "xor");
        } else if stream.at_punct(Punct::SymDiff) {
            stream.advance();
            let rhs = parse_term(ctx, stream);
            acc = apply_sym_diff(ctx, acc, rhs, span);
        } else {
            break;
        }
    }
    acc
}

fn apply_additive(ctx: &mut CompilationContext, lhs: ExprType, rhs: ExprType, span: Span, is_add: bool) -> ExprType {
    if lhs.is_string_like() && matches!(rhs.kind, ExprKind::Char) && is_add {
        ctx.emitter.emit(Instr::Str(crate::emitter::StrOp::FromChar));
        ctx.emitter.push_string_temp();
        ctx.emitter.emit(Instr::Str(crate::emitter::StrOp::Concat));
        return ExprType::STRING;
    }
    if lhs.is_string_like() && rhs.is_string_like() && is_add {
        ctx.emitter.emit(Instr::Str(crate::emitter::StrOp::Concat));
        return ExprType::STRING;
    }
    if matches!(lhs.kind, ExprKind::Set) && matches!(rhs.kind, ExprKind::Set | ExprKind::EmptySet) {
        let op = if is_add { crate::emitter::SetOp::Union } else { crate::emitter::SetOp::Difference };
        ctx.emitter.emit(Instr::Set(op));
        return lhs;
    }
    match lhs.unify(rhs) {
        Some(result) if result.is_numeric() => {
            let is_real = matches!(result.kind, ExprKind::Real);
            let is_long = matches!(result.kind, ExprKind::LongInt | ExprKind::LongWord);
            if is_long {
                let op = if is_add { crate::emitter::LongOp::AddLong } else { crate::emitter::LongOp::SubLong };
                ctx.emitter.emit(Instr::Long(op));
                return result;
            }
            let op = match (is_real, is_add) {
                (true, true) => SimpleOp::AddReal,
                (true, false) => SimpleOp::SubReal,
                (false, true) => SimpleOp::AddInt,
                (false, false) => SimpleOp::SubInt,
            };
            ctx.emitter.emit(Instr::Simple(op));
            result
        }
        _ => {
            ctx.diagnostics.error(ErrorCategory::Type, "incompatible operand types for '+'/'-'", span);
            ExprType::UNKNOWN
        }
    }
}

/// `or`/`xor` act on booleans logically and on integers bitwise, matching
/// the constant folder's own dual treatment of these operators.
fn apply_boolean_or_bitwise(
    ctx: &mut CompilationContext,
    lhs: ExprType,
    rhs: ExprType,
    span: Span,
    op: SimpleOp,
    name: &str,
) -> ExprType {
    if matches!(lhs.kind, ExprKind::Boolean) && matches!(rhs.kind, ExprKind::Boolean) {
        ctx.emitter.emit(Instr::Simple(op));
        ExprType::BOOLEAN
    } else if lhs.is_integer_like() && rhs.is_integer_like() {
        ctx.emitter.emit(Instr::Simple(op));
        lhs.unify(rhs).unwrap_or(ExprType::INTEGER)
    } else {
        ctx.diagnostics.error(ErrorCategory::Type, &format!("'{name}' requires boolean or integer operands"), span);
        ExprType::UNKNOWN
    }
}

fn apply_sym_diff(ctx: &mut CompilationContext, lhs: ExprType, rhs: ExprType, span: Span) -> ExprType {
    if matches!(lhs.kind, ExprKind::Set | ExprKind::EmptySet) && matches!(rhs.kind, ExprKind::Set | ExprKind::EmptySet) {
        ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::SymDiff));
        if matches!(lhs.kind, ExprKind::EmptySet) { rhs } else { lhs }
    } else {
        ctx.diagnostics.error(ErrorCategory::Type, "'><' requires two sets", span);
        ExprType::UNKNOWN
    }
}

/// `term ::= factor { mulop factor }`
pub fn parse_term(ctx: &mut CompilationContext, stream: &mut TokenStream) -> ExprType {
    let mut acc = parse_factor(ctx, stream);
    loop {
        let span = stream.span();
        if stream.at_punct(Punct::Star) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_multiplicative(ctx, acc, rhs, span, MulKind::Mul);
        } else if stream.at_punct(Punct::Slash) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_real_divide(ctx, acc, rhs, span);
        } else if stream.at_keyword(Keyword::Div) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_multiplicative(ctx, acc, rhs, span, MulKind::Div);
        } else if stream.at_keyword(Keyword::Mod) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_multiplicative(ctx, acc, rhs, span, MulKind::Mod);
        } else if stream.at_keyword(Keyword::And) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_boolean_or_bitwise(ctx, acc, rhs, span, SimpleOp::And, "and");
        } else if stream.at_punct(Punct::Amp) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_bit_op(ctx, acc, rhs, span, SimpleOp::BitAnd, "&");
        } else if stream.at_keyword(Keyword::Shl) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_bit_op(ctx, acc, rhs, span, SimpleOp::Shl, "shl");
        } else if stream.at_keyword(Keyword::Shr) {
            stream.advance();
            let rhs = parse_factor(ctx, stream);
            acc = apply_bit_op(ctx, acc, rhs, span, SimpleOp::Shr, "shr");
        } else {
            break;
        }
    }
    acc
}

enum MulKind {
    Mul,
    Div,
    Mod,
}

fn apply_multiplicative(ctx: &mut CompilationContext, lhs: ExprType, rhs: ExprType, span: Span, kind: MulKind) -> ExprType {
    if matches!(kind, MulKind::Div | MulKind::Mod) {
        if !lhs.is_integer_like() || !rhs.is_integer_like() {
            ctx.diagnostics.error(ErrorCategory::Type, "'div'/'mod' require integer operands", span);
            return ExprType::UNKNOWN;
        }
        if matches!(kind, MulKind::Div) && matches!(lhs.kind, ExprKind::LongInt | ExprKind::LongWord) {
            ctx.emitter.emit(Instr::Long(crate::emitter::LongOp::DivLong));
            return lhs;
        }
        ctx.emitter.emit(Instr::Simple(if matches!(kind, MulKind::Div) { SimpleOp::DivInt } else { SimpleOp::ModInt }));
        return ExprType::INTEGER;
    }
    if matches!(lhs.kind, ExprKind::Set) && matches!(rhs.kind, ExprKind::Set | ExprKind::EmptySet) {
        ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::Intersection));
        return lhs;
    }
    match lhs.unify(rhs) {
        Some(result) if result.is_numeric() => {
            if matches!(result.kind, ExprKind::LongInt | ExprKind::LongWord) {
                ctx.emitter.emit(Instr::Long(crate::emitter::LongOp::MulLong));
                return result;
            }
            let op = if matches!(result.kind, ExprKind::Real) { SimpleOp::MulReal } else { SimpleOp::MulInt };
            ctx.emitter.emit(Instr::Simple(op));
            result
        }
        _ => {
            ctx.diagnostics.error(ErrorCategory::Type, "incompatible operand types for '*'", span);
            ExprType::UNKNOWN
        }
    }
}

/// `shl`/`shr`/`&` are integer-only bitwise operators; unlike `and`/`or`
/// they have no boolean reading.
fn apply_bit_op(ctx: &mut CompilationContext, lhs: ExprType, rhs: ExprType, span: Span, op: SimpleOp, name: &str) -> ExprType {
    if lhs.is_integer_like() && rhs.is_integer_like() {
        ctx.emitter.emit(Instr::Simple(op));
        lhs
    } else {
        ctx.diagnostics.error(ErrorCategory::Type, &format!("'{name}' requires integer operands"), span);
        ExprType::UNKNOWN
    }
}

fn apply_real_divide(ctx: &mut CompilationContext, lhs: ExprType, rhs: ExprType, span: Span) -> ExprType {
    if !lhs.is_numeric() || !rhs.is_numeric() {
        ctx.diagnostics.error(ErrorCategory::Type, "'/' requires numeric operands", span);
        return ExprType::UNKNOWN;
    }
    if !matches!(lhs.kind, ExprKind::Real) {
        ctx.emitter.emit(Instr::Simple(SimpleOp::IntToReal));
    }
    if !matches!(rhs.kind, ExprKind::Real) {
        ctx.emitter.emit(Instr::Simple(SimpleOp::IntToReal));
    }
    ctx.emitter.emit(Instr::Simple(SimpleOp::DivReal));
    ExprType::REAL
}

/// `factor ::= unsigned-constant | variable-access | '(' expression ')'
///           | 'not' factor | set-constructor | function-designator`
pub fn parse_factor(ctx: &mut CompilationContext, stream: &mut TokenStream) -> ExprType {
    let span = stream.span();
    match stream.peek_kind().clone() {
        TokenKind::IntLiteral(v) => {
            stream.advance();
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, v));
            ExprType::INTEGER
        }
        TokenKind::RealLiteral(v) => {
            stream.advance();
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, v.to_bits() as i64));
            ExprType::REAL
        }
        TokenKind::CharLiteral(c) => {
            stream.advance();
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, c as i64));
            ExprType::CHAR
        }
        TokenKind::StringLiteral(s) => {
            stream.advance();
            let idx = ctx.emitter.intern_rodata_str(s);
            ctx.emitter.emit(Instr::Str(crate::emitter::StrOp::Push { rodata_offset: idx }));
            ctx.emitter.push_string_temp();
            ExprType::new(ExprKind::AnyString)
        }
        TokenKind::Keyword(Keyword::Nil) => {
            stream.advance();
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, 0));
            ExprType::new(ExprKind::AnyPointer)
        }
        TokenKind::Keyword(Keyword::Not) => {
            stream.advance();
            let inner = parse_factor(ctx, stream);
            if matches!(inner.kind, ExprKind::Boolean) {
                ctx.emitter.emit(Instr::Simple(SimpleOp::Not));
                ExprType::BOOLEAN
            } else {
                ctx.diagnostics.error(ErrorCategory::Type, "'not' requires a boolean operand", span);
                ExprType::UNKNOWN
            }
        }
        TokenKind::Punct(Punct::LParen) => {
            stream.advance();
            let inner = parse_expression(ctx, stream);
            stream.expect_punct(Punct::RParen, &mut ctx.diagnostics);
            inner
        }
        TokenKind::Punct(Punct::LBracket) => parse_set_constructor(ctx, stream),
        TokenKind::Punct(Punct::At) => {
            stream.advance();
            parse_address_of(ctx, stream)
        }
        TokenKind::Ident(name) => {
            stream.advance();
            if stream.at_punct(Punct::LParen) {
                if let Some(sym_ref) = ctx.symbols.lookup(name) {
                    if let SymbolKind::TypeName { denotes } = &ctx.symbols.get(sym_ref).kind {
                        let denotes = *denotes;
                        return parse_type_cast(ctx, stream, denotes);
                    }
                }
            }
            parse_designator(ctx, stream, name, span)
        }
        _ => {
            ctx.diagnostics.error(ErrorCategory::Syntactic, "expected an expression", span);
            ExprType::UNKNOWN
        }
    }
}

/// `[e1, e2..e3, …]`. Plain elements accumulate on the stack and are folded
/// into one set value with a single [`crate::emitter::SetOp::Construct`];
/// a `lo..hi` member needs its own [`crate::emitter::SetOp::ConstructRange`]
/// (the element count it contributes isn't known until the bounds are
/// evaluated), so it flushes whatever plain run preceded it and unions its
/// own range set into the running result.
fn parse_set_constructor(ctx: &mut CompilationContext, stream: &mut TokenStream) -> ExprType {
    stream.expect_punct(Punct::LBracket, &mut ctx.diagnostics);
    let mut pending_singles = 0u32;
    let mut built_any = false;
    let mut any_element = false;

    macro_rules! flush_singles {
        () => {
            if pending_singles > 0 {
                ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::Construct { count: pending_singles }));
                if built_any {
                    ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::Union));
                }
                built_any = true;
                pending_singles = 0;
            }
        };
    }

    if !stream.at_punct(Punct::RBracket) {
        loop {
            parse_expression(ctx, stream);
            any_element = true;
            if stream.at_punct(Punct::DotDot) {
                stream.advance();
                parse_expression(ctx, stream);
                flush_singles!();
                ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::ConstructRange));
                if built_any {
                    ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::Union));
                }
                built_any = true;
            } else {
                pending_singles += 1;
            }
            if stream.at_punct(Punct::Comma) {
                stream.advance();
                continue;
            }
            break;
        }
    }
    flush_singles!();
    stream.expect_punct(Punct::RBracket, &mut ctx.diagnostics);

    if !built_any {
        // Either `[]`, or every member flushed into the accumulator already
        // (impossible given the logic above) — an empty constructor still
        // needs a zero-element set value on the stack.
        ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::Construct { count: 0 }));
    }

    if any_element {
        ExprType::new(ExprKind::Set)
    } else {
        ExprType::new(ExprKind::EmptySet)
    }
}

/// `@` factor: takes the address of a variable instead of loading its
/// value. Only the base access is supported — `@a[i]`/`@r.f` would need
/// the same indexed/field-offset address math `parse_designator`'s chain
/// loop computes for a value access, carried through in address mode.
fn parse_address_of(ctx: &mut CompilationContext, stream: &mut TokenStream) -> ExprType {
    let span = stream.span();
    let Some(name) = stream.expect_ident(&mut ctx.diagnostics) else {
        return ExprType::UNKNOWN;
    };
    let Some(sym_ref) = ctx.symbols.lookup(name) else {
        ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared identifier", span);
        return ExprType::UNKNOWN;
    };
    let (level, offset) = match &ctx.symbols.get(sym_ref).kind {
        SymbolKind::Variable { data_offset, level, .. } => (*level, *data_offset),
        SymbolKind::VarParameter { data_offset, level, .. } => (*level, *data_offset),
        SymbolKind::File { data_offset, level, .. } => (*level, *data_offset),
        _ => {
            ctx.diagnostics.error(ErrorCategory::Declaration, "'@' requires a variable", span);
            return ExprType::UNKNOWN;
        }
    };
    ctx.emitter.emit(Instr::StackRef { op: StackRefOp::LoadAddress, level, offset });
    ExprType::new(ExprKind::AnyPointer)
}

/// `type-identifier '(' expression ')'`: converts between ordinal types of
/// the same stack width (no code emitted), between integer and `real` (a
/// conversion op is inserted), or between a narrow (`shortint`/`shortword`)
/// and full-word integer (a sign-extend or truncate op is inserted).
fn parse_type_cast(ctx: &mut CompilationContext, stream: &mut TokenStream, target: pascalc_frontend::TypeRef) -> ExprType {
    stream.expect_punct(Punct::LParen, &mut ctx.diagnostics);
    let inner = parse_expression(ctx, stream);
    stream.expect_punct(Punct::RParen, &mut ctx.diagnostics);
    let target_type = expr_type_for(ctx, target);
    let inner_is_real = matches!(inner.kind, ExprKind::Real);
    let target_is_real = matches!(target_type.kind, ExprKind::Real);
    if inner_is_real && !target_is_real {
        ctx.emitter.emit(Instr::Float(crate::emitter::FloatOp::Trunc));
    } else if !inner_is_real && target_is_real {
        ctx.emitter.emit(Instr::Simple(SimpleOp::IntToReal));
    } else if inner.is_integer_like() && target_type.is_integer_like() {
        let inner_narrow = matches!(inner.kind, ExprKind::ShortInt | ExprKind::ShortWord);
        let target_narrow = matches!(target_type.kind, ExprKind::ShortInt | ExprKind::ShortWord);
        if inner_narrow && !target_narrow {
            ctx.emitter.emit(Instr::Simple(SimpleOp::WidenInt));
        } else if !inner_narrow && target_narrow {
            ctx.emitter.emit(Instr::Simple(SimpleOp::NarrowInt));
        }
    }
    target_type
}

/// Resolves `name` against the symbol table (consulting the current `with`
/// binding first), then reduces whatever access chain follows
/// (`[...]`, `.field`, `^`) and, for a routine name, a call's argument
/// list — producing the factor's final [`ExprType`] and [`FactorFlags`].
fn parse_designator(ctx: &mut CompilationContext, stream: &mut TokenStream, name: pascalc_base::Symbol, span: Span) -> ExprType {
    if let Some(field_type) = try_with_field_access(ctx, name) {
        let mut flags = FactorFlags::empty();
        flags.insert(FactorFlags::FIELD_OFFSET);
        let (in_address_mode, current_type) = continue_access_chain(ctx, stream, field_type, &mut flags);
        if in_address_mode {
            ctx.emitter.emit(Instr::Simple(SimpleOp::LoadIndirect));
        }
        return expr_type_for(ctx, current_type);
    }

    let Some(sym_ref) = ctx.symbols.lookup(name) else {
        ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared identifier", span);
        return ExprType::UNKNOWN;
    };

    let mut flags = FactorFlags::empty();
    let (base_type, level, offset, is_var_parm) = match &ctx.symbols.get(sym_ref).kind {
        SymbolKind::Variable { var_type, data_offset, level } => (*var_type, *level, *data_offset, false),
        SymbolKind::VarParameter { var_type, data_offset, level } => {
            flags.insert(FactorFlags::VAR_PARM);
            (*var_type, *level, *data_offset, true)
        }
        SymbolKind::ScalarObject { ordinal, .. } => {
            let ord = *ordinal;
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, ord));
            return ExprType::new(ExprKind::Scalar);
        }
        SymbolKind::Constant { const_type, value } => {
            let ty = *const_type;
            let value = value.clone();
            return emit_constant_reference(ctx, ty, &value);
        }
        SymbolKind::Function { entry_label, .. } => {
            return parse_call(ctx, stream, name, *entry_label);
        }
        SymbolKind::File { data_offset, level, .. } => {
            // A file variable is always addressed, never loaded by value;
            // there's no further access chain to continue (no field or
            // index can follow a bare file designator).
            ctx.emitter.emit(Instr::StackRef { op: StackRefOp::LoadAddress, level: *level, offset: *data_offset });
            return ExprType::new(ExprKind::File);
        }
        SymbolKind::Procedure { .. } => {
            ctx.diagnostics.error(ErrorCategory::Type, "a procedure has no value", span);
            return ExprType::UNKNOWN;
        }
        _ => {
            ctx.diagnostics.error(ErrorCategory::Declaration, "not a variable or function", span);
            return ExprType::UNKNOWN;
        }
    };

    let (in_address_mode, current_type) =
        emit_access_chain(ctx, stream, level, offset, is_var_parm, base_type, &mut flags);
    if in_address_mode {
        ctx.emitter.emit(Instr::Simple(SimpleOp::LoadIndirect));
    } else {
        ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Load, level, offset });
    }
    expr_type_for(ctx, current_type)
}

/// If a `with` binding is active and `name` names one of the bound record's
/// fields, emits the field's address (the record's own address plus the
/// field's byte offset) and returns its type — leaving the caller to
/// continue any further suffix chain via [`continue_access_chain`]. Returns
/// `None` (emitting nothing) if there's no active binding, the binding
/// isn't a record, or `name` isn't one of its fields, in which case the
/// caller falls back to an ordinary symbol-table lookup.
pub(crate) fn try_with_field_access(
    ctx: &mut CompilationContext,
    name: pascalc_base::Symbol,
) -> Option<pascalc_frontend::TypeRef> {
    let rec_ref = ctx.with_binding()?;
    let (rec_type, rec_level, rec_offset, rec_is_var_parm) = match &ctx.symbols.get(rec_ref).kind {
        SymbolKind::Variable { var_type, data_offset, level } => (*var_type, *level, *data_offset, false),
        SymbolKind::VarParameter { var_type, data_offset, level } => (*var_type, *level, *data_offset, true),
        _ => return None,
    };
    let resolved_type = ctx.types.resolve(rec_type);
    let TypeDesc::Record { fields, .. } = ctx.types.get(resolved_type).desc.clone() else {
        return None;
    };
    let field = fields.iter().find(|f| f.name == name)?.clone();

    if rec_is_var_parm {
        ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Load, level: rec_level, offset: rec_offset });
    } else {
        ctx.emitter.emit(Instr::StackRef { op: StackRefOp::LoadAddress, level: rec_level, offset: rec_offset });
    }
    if field.byte_offset != 0 {
        ctx.emitter.emit(Instr::Data(DataOp::LoadConst, field.byte_offset as i64));
        ctx.emitter.emit(Instr::Simple(SimpleOp::AddInt));
    }
    Some(field.field_type)
}

/// Walks `[...]`/`.field`/`^` suffixes following a variable's bare name,
/// reducing each one to address arithmetic on the data stack rather than
/// building a path object first. A `var` parameter's frame slot already
/// holds the callee-side address, so it starts in address mode with no
/// suffix needed; a plain variable only switches to address mode (an
/// explicit `load-address` of its frame slot) once the first suffix
/// demands it — a bare `x` with no suffix never pays for address
/// arithmetic it doesn't need.
///
/// Returns whether the top of stack holds a computed address (so the
/// caller must follow up with a `load-indirect`/`store-indirect`) along
/// with the access chain's final type.
pub(crate) fn emit_access_chain(
    ctx: &mut CompilationContext,
    stream: &mut TokenStream,
    level: u32,
    offset: i32,
    is_var_parm: bool,
    current_type: pascalc_frontend::TypeRef,
    flags: &mut FactorFlags,
) -> (bool, pascalc_frontend::TypeRef) {
    let mut in_address_mode = false;
    if is_var_parm {
        ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Load, level, offset });
        in_address_mode = true;
    }
    walk_access_chain_suffixes(ctx, stream, level, offset, in_address_mode, current_type, flags)
}

/// Continues an access chain whose base address is already on top of the
/// data stack (a `with`-bound field's address, already past its own
/// `byte_offset`) — unlike [`emit_access_chain`], it never needs to emit an
/// initial `load-address` of some `(level, offset)` frame slot, since the
/// relevant slot isn't this designator's own, it's the `with`-bound
/// record's.
pub(crate) fn continue_access_chain(
    ctx: &mut CompilationContext,
    stream: &mut TokenStream,
    current_type: pascalc_frontend::TypeRef,
    flags: &mut FactorFlags,
) -> (bool, pascalc_frontend::TypeRef) {
    walk_access_chain_suffixes(ctx, stream, 0, 0, true, current_type, flags)
}

fn walk_access_chain_suffixes(
    ctx: &mut CompilationContext,
    stream: &mut TokenStream,
    level: u32,
    offset: i32,
    mut in_address_mode: bool,
    mut current_type: pascalc_frontend::TypeRef,
    flags: &mut FactorFlags,
) -> (bool, pascalc_frontend::TypeRef) {
    loop {
        if stream.at_punct(Punct::LBracket) {
            if !in_address_mode {
                ctx.emitter.emit(Instr::StackRef { op: StackRefOp::LoadAddress, level, offset });
                in_address_mode = true;
            }
            stream.advance();
            flags.insert(FactorFlags::INDEXED);
            loop {
                let resolved_type = ctx.types.resolve(current_type);
                match ctx.types.get(resolved_type).desc.clone() {
                    TypeDesc::Array { element, low, .. } => {
                        parse_expression(ctx, stream);
                        if low != 0 {
                            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, low));
                            ctx.emitter.emit(Instr::Simple(SimpleOp::SubInt));
                        }
                        let elem_size = ctx.types.layout(element).size as i64;
                        ctx.emitter.emit(Instr::Data(DataOp::LoadConst, elem_size));
                        ctx.emitter.emit(Instr::Simple(SimpleOp::MulInt));
                        ctx.emitter.emit(Instr::Simple(SimpleOp::AddInt));
                        current_type = element;
                    }
                    _ => {
                        ctx.diagnostics.error(ErrorCategory::Dereference, "indexed value is not an array", stream.span());
                        break;
                    }
                }
                if stream.at_punct(Punct::Comma) {
                    stream.advance();
                    continue;
                }
                break;
            }
            // Under-indexing (e.g. `a[2]` where `a` is two-dimensional)
            // leaves `current_type` still resolved to an `Array` — the
            // index count must equal the declared dimensionality exactly.
            if matches!(ctx.types.get(ctx.types.resolve(current_type)).desc, TypeDesc::Array { .. }) {
                ctx.diagnostics.error(
                    ErrorCategory::Declaration,
                    "wrong number of indices for this array's dimensionality",
                    stream.span(),
                );
            }
            stream.expect_punct(Punct::RBracket, &mut ctx.diagnostics);
        } else if stream.at_punct(Punct::Dot) {
            if !in_address_mode {
                ctx.emitter.emit(Instr::StackRef { op: StackRefOp::LoadAddress, level, offset });
                in_address_mode = true;
            }
            stream.advance();
            flags.insert(FactorFlags::FIELD_OFFSET);
            let field_span = stream.span();
            let Some(field_name) = stream.expect_ident(&mut ctx.diagnostics) else { break };
            let resolved_type = ctx.types.resolve(current_type);
            match ctx.types.get(resolved_type).desc.clone() {
                TypeDesc::Record { fields, .. } => match fields.iter().find(|f| f.name == field_name) {
                    Some(f) => {
                        if f.byte_offset != 0 {
                            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, f.byte_offset as i64));
                            ctx.emitter.emit(Instr::Simple(SimpleOp::AddInt));
                        }
                        current_type = f.field_type;
                    }
                    None => ctx.diagnostics.error(ErrorCategory::Declaration, "unknown field", field_span),
                },
                _ => ctx.diagnostics.error(ErrorCategory::Dereference, "field access on a non-record", field_span),
            }
        } else if stream.at_punct(Punct::Caret) {
            if !in_address_mode {
                ctx.emitter.emit(Instr::StackRef { op: StackRefOp::LoadAddress, level, offset });
                in_address_mode = true;
            }
            stream.advance();
            flags.insert(FactorFlags::DEREFERENCE);
            flags.insert(FactorFlags::POINTER_EXPRESSION);
            let resolved_type = ctx.types.resolve(current_type);
            match ctx.types.get(resolved_type).desc.clone() {
                TypeDesc::Pointer { target } => {
                    ctx.emitter.emit(Instr::Simple(SimpleOp::LoadIndirect));
                    current_type = target;
                }
                _ => ctx.diagnostics.error(ErrorCategory::Dereference, "'^' applied to a non-pointer", stream.span()),
            }
        } else {
            break;
        }
    }

    (in_address_mode, current_type)
}

fn parse_call(
    ctx: &mut CompilationContext,
    stream: &mut TokenStream,
    _name: pascalc_base::Symbol,
    entry_label: Option<u32>,
) -> ExprType {
    if stream.at_punct(Punct::LParen) {
        stream.advance();
        ctx.emitter.emit(Instr::Data(DataOp::MarkStack, 0));
        if !stream.at_punct(Punct::RParen) {
            loop {
                parse_expression(ctx, stream);
                if stream.at_punct(Punct::Comma) {
                    stream.advance();
                    continue;
                }
                break;
            }
        }
        stream.expect_punct(Punct::RParen, &mut ctx.diagnostics);
    } else {
        ctx.emitter.emit(Instr::Data(DataOp::MarkStack, 0));
    }
    ctx.emitter.emit(Instr::Data(DataOp::CallUser, entry_label.unwrap_or(0) as i64));
    ExprType::INTEGER
}

/// Re-emits a reference to a `const` symbol's value as code, the way a
/// literal of the same shape would be emitted — there is no "load constant
/// by name" p-code op, so every use-site gets its own copy of the literal,
/// the same as if the programmer had written it out longhand.
fn emit_constant_reference(
    ctx: &mut CompilationContext,
    const_type: pascalc_frontend::TypeRef,
    value: &pascalc_frontend::ConstantValue,
) -> ExprType {
    use pascalc_frontend::ConstantValue as CV;
    match value {
        CV::Integer(i) => {
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, *i));
            expr_type_for(ctx, const_type)
        }
        CV::Real(r) => {
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, r.to_bits() as i64));
            ExprType::REAL
        }
        CV::Char(c) => {
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, *c as i64));
            ExprType::CHAR
        }
        CV::Bool(b) => {
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, *b as i64));
            ExprType::BOOLEAN
        }
        CV::Str(s) => {
            let idx = ctx.emitter.intern_rodata_str(s.clone());
            ctx.emitter.emit(Instr::Str(crate::emitter::StrOp::Push { rodata_offset: idx }));
            ctx.emitter.push_string_temp();
            ExprType::STRING
        }
        CV::Set(members) => {
            for &m in members {
                ctx.emitter.emit(Instr::Data(DataOp::LoadConst, m));
            }
            ctx.emitter.emit(Instr::Set(crate::emitter::SetOp::Construct { count: members.len() as u32 }));
            if members.is_empty() {
                ExprType::new(ExprKind::EmptySet)
            } else {
                ExprType::new(ExprKind::Set)
            }
        }
    }
}

/// Maps a resolved [`pascalc_frontend::TypeRef`] to the [`ExprType`] tag an
/// expression of that declared type should carry.
pub(crate) fn expr_type_for(ctx: &CompilationContext, type_ref: pascalc_frontend::TypeRef) -> ExprType {
    let resolved = ctx.types.resolve(type_ref);
    let kind = match &ctx.types.get(resolved).desc {
        TypeDesc::Integer => ExprKind::Integer,
        TypeDesc::Word => ExprKind::Word,
        TypeDesc::ShortInt => ExprKind::ShortInt,
        TypeDesc::ShortWord => ExprKind::ShortWord,
        TypeDesc::LongInt => ExprKind::LongInt,
        TypeDesc::LongWord => ExprKind::LongWord,
        TypeDesc::Boolean => ExprKind::Boolean,
        TypeDesc::Char => ExprKind::Char,
        TypeDesc::Real => ExprKind::Real,
        TypeDesc::String | TypeDesc::ShortString { .. } => ExprKind::String,
        TypeDesc::Enum { .. } | TypeDesc::Subrange { .. } => ExprKind::Scalar,
        TypeDesc::Set { .. } => ExprKind::Set,
        TypeDesc::Record { .. } => ExprKind::Record,
        TypeDesc::File { .. } | TypeDesc::Text => ExprKind::File,
        TypeDesc::Pointer { target } => return ExprType::pointer_to(ExprKind::Record, Some(*target)),
        TypeDesc::Array { .. } | TypeDesc::Alias { .. } => ExprKind::Unknown,
    };
    ExprType::with_type(kind, type_ref)
}

/// Evaluates a constant expression and folds it, for contexts (array
/// bounds, `const` declarations, `case` labels) that require a compile-time
/// value rather than emitted code.
pub fn parse_and_fold_const(ctx: &mut CompilationContext, stream: &mut TokenStream) -> Option<ConstValue> {
    fold_const_expr(stream, &ctx.symbols, &mut ctx.diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> (ExprType, bool) {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex(source, &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let ty = parse_expression(&mut ctx, &mut stream);
        (ty, ctx.diagnostics.has_errors())
    }

    #[test]
    fn integer_literal_has_integer_type() {
        let (ty, errored) = eval("42");
        assert!(!errored);
        assert_eq!(ty.kind, ExprKind::Integer);
    }

    #[test]
    fn arithmetic_on_int_and_real_widens_to_real() {
        let (ty, errored) = eval("1 + 2.0");
        assert!(!errored);
        assert_eq!(ty.kind, ExprKind::Real);
    }

    #[test]
    fn comparison_produces_boolean() {
        let (ty, errored) = eval("1 < 2");
        assert!(!errored);
        assert_eq!(ty.kind, ExprKind::Boolean);
    }

    #[test]
    fn undeclared_identifier_reports_declaration_error() {
        let (ty, errored) = eval("foo + 1");
        assert!(errored);
        assert_eq!(ty.kind, ExprKind::Unknown);
    }

    #[test]
    fn empty_set_constructor_has_empty_set_type() {
        let (ty, errored) = eval("[]");
        assert!(!errored);
        assert_eq!(ty.kind, ExprKind::EmptySet);
    }

    #[test]
    fn nonempty_set_constructor_has_set_type() {
        let (ty, errored) = eval("[1, 2, 3]");
        assert!(!errored);
        assert_eq!(ty.kind, ExprKind::Set);
    }

    #[test]
    fn string_division_is_a_type_error() {
        let (ty, errored) = eval("'a' / 2");
        assert!(errored);
        assert_eq!(ty.kind, ExprKind::Unknown);
    }

    #[test]
    fn boolean_and_requires_both_operands_boolean() {
        let (ty, errored) = eval("1 and 2");
        assert!(errored);
        let _ = ty;
    }

    #[test]
    fn type_cast_widens_a_narrow_integer_to_full_width() {
        let mut ctx = CompilationContext::new();
        let wide_name = ctx.interner.intern("wide");
        let x_name = ctx.interner.intern("x");
        ctx.symbols.declare(
            wide_name,
            SymbolKind::TypeName { denotes: pascalc_frontend::types::INTEGER },
            0,
            Span::new(0, 0),
        );
        ctx.symbols.declare(
            x_name,
            SymbolKind::Variable { var_type: pascalc_frontend::types::SHORT_INT, data_offset: 8, level: 0 },
            0,
            Span::new(0, 0),
        );
        let tokens = pascalc_frontend::lex("wide(x)", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert!(matches!(ctx.emitter.instructions().last(), Some(Instr::Simple(SimpleOp::WidenInt))));
    }

    #[test]
    fn type_cast_narrows_a_full_width_integer() {
        let mut ctx = CompilationContext::new();
        let narrow_name = ctx.interner.intern("narrow");
        let x_name = ctx.interner.intern("x");
        ctx.symbols.declare(
            narrow_name,
            SymbolKind::TypeName { denotes: pascalc_frontend::types::SHORT_INT },
            0,
            Span::new(0, 0),
        );
        ctx.symbols.declare(
            x_name,
            SymbolKind::Variable { var_type: pascalc_frontend::types::INTEGER, data_offset: 8, level: 0 },
            0,
            Span::new(0, 0),
        );
        let tokens = pascalc_frontend::lex("narrow(x)", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert!(matches!(ctx.emitter.instructions().last(), Some(Instr::Simple(SimpleOp::NarrowInt))));
    }

    #[test]
    fn type_cast_between_same_width_integers_emits_no_conversion() {
        let mut ctx = CompilationContext::new();
        let word_name = ctx.interner.intern("wordalias");
        let x_name = ctx.interner.intern("x");
        ctx.symbols.declare(
            word_name,
            SymbolKind::TypeName { denotes: pascalc_frontend::types::WORD },
            0,
            Span::new(0, 0),
        );
        ctx.symbols.declare(
            x_name,
            SymbolKind::Variable { var_type: pascalc_frontend::types::INTEGER, data_offset: 8, level: 0 },
            0,
            Span::new(0, 0),
        );
        let tokens = pascalc_frontend::lex("wordalias(x)", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert!(!matches!(
            ctx.emitter.instructions().last(),
            Some(Instr::Simple(SimpleOp::WidenInt)) | Some(Instr::Simple(SimpleOp::NarrowInt))
        ));
    }

    #[test]
    fn file_variable_address_of_uses_its_frame_slot() {
        let mut ctx = CompilationContext::new();
        let f_name = ctx.interner.intern("f");
        ctx.symbols.declare(
            f_name,
            SymbolKind::File { component_type: pascalc_frontend::types::INTEGER, data_offset: 12, level: 0 },
            0,
            Span::new(0, 0),
        );
        let tokens = pascalc_frontend::lex("@f", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let ty = parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ty.kind, ExprKind::AnyPointer);
        assert!(matches!(
            ctx.emitter.instructions().last(),
            Some(Instr::StackRef { op: StackRefOp::LoadAddress, level: 0, offset: 12 })
        ));
    }

    /// A chain of string concatenations must `Dup` the source string exactly
    /// once, before the first `Concat`, and never again for later `+`s in
    /// the same chain (they already operate on a temp this evaluator owns).
    #[test]
    fn string_concat_chain_dups_only_before_first_concat() {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex("'ab' + 'cd' + 'ef'", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let ty = parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ty.kind, ExprKind::String);
        let dups = ctx
            .emitter
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instr::Simple(SimpleOp::Dup)))
            .count();
        assert_eq!(dups, 1);
        let concats = ctx
            .emitter
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instr::Str(crate::emitter::StrOp::Concat)))
            .count();
        assert_eq!(concats, 2);
    }

    #[test]
    fn single_string_concat_still_dups_the_source() {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex("'ab' + 'cd'", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert!(ctx.emitter.instructions().iter().any(|i| matches!(i, Instr::Simple(SimpleOp::Dup))));
    }

    /// `in` against a set whose base type doesn't start at 0 must rebase the
    /// member with an `Exchange` / subtract / `Exchange` sequence rather
    /// than probing membership against the raw ordinal value.
    #[test]
    fn in_operator_rebases_member_against_nonzero_set_base() {
        let mut ctx = CompilationContext::new();
        let base = ctx.types.declare(TypeDesc::Subrange { base: pascalc_frontend::types::CHAR, low: 65, high: 70 }, None);
        let set_type = ctx.types.declare(TypeDesc::Set { base }, None);
        let name = ctx.interner.intern("s");
        ctx.symbols.declare(
            name,
            SymbolKind::Variable { var_type: set_type, data_offset: 0, level: 0 },
            0,
            pascalc_base::Span::new(0, 0),
        );
        let tokens = pascalc_frontend::lex("'A' in s", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let ty = parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ty.kind, ExprKind::Boolean);
        let exchanges = ctx
            .emitter
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instr::Simple(SimpleOp::Exchange)))
            .count();
        assert_eq!(exchanges, 2);
        assert!(ctx
            .emitter
            .instructions()
            .iter()
            .any(|i| matches!(i, Instr::Data(DataOp::LoadConst, 65))));
    }

    /// Inside `with r do`, a bare field name must resolve against `r`'s
    /// record type rather than report "undeclared identifier".
    #[test]
    fn with_binding_resolves_unqualified_name_as_bound_record_field() {
        let mut ctx = CompilationContext::new();
        let int_ty = pascalc_frontend::types::INTEGER;
        let x_name = ctx.interner.intern("x");
        let (fields, _) = ctx.types.layout_record_fields(&[(x_name, int_ty)]);
        let rec_type = ctx.types.declare(TypeDesc::Record { fields, variant: None }, None);
        let r_name = ctx.interner.intern("r");
        ctx.symbols.declare(
            r_name,
            SymbolKind::Variable { var_type: rec_type, data_offset: 8, level: 0 },
            0,
            pascalc_base::Span::new(0, 0),
        );
        ctx.push_with_binding(pascalc_frontend::SymbolRef(0));

        let tokens = pascalc_frontend::lex("x", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let ty = parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ty.kind, ExprKind::Integer);
        assert!(ctx
            .emitter
            .instructions()
            .iter()
            .any(|i| matches!(i, Instr::StackRef { op: StackRefOp::LoadAddress, level: 0, offset: 8 })));
        assert!(ctx.emitter.instructions().iter().any(|i| matches!(i, Instr::Simple(SimpleOp::LoadIndirect))));
    }

    /// A name that shadows a with-bound field at an outer scope (an ordinary
    /// variable of the same name) is not reachable here — resolution inside
    /// `with` always checks the bound record's fields first, matching how
    /// every example scenario in this grammar uses `with`.
    #[test]
    fn with_binding_field_lookup_does_not_fall_back_when_no_binding_is_active() {
        let (ty, errored) = eval("y");
        assert!(errored);
        assert_eq!(ty.kind, ExprKind::Unknown);
    }

    #[test]
    fn set_constructor_range_member_emits_construct_range() {
        let (ty, errored) = eval("['A', 'C'..'E']");
        assert!(!errored);
        assert_eq!(ty.kind, ExprKind::Set);
    }

    #[test]
    fn set_constructor_with_only_a_range_skips_the_plain_construct() {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex("[1..5]", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let ty = parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        assert_eq!(ty.kind, ExprKind::Set);
        let instrs = ctx.emitter.instructions();
        assert!(instrs.iter().any(|i| matches!(i, Instr::Set(crate::emitter::SetOp::ConstructRange))));
        assert!(!instrs.iter().any(|i| matches!(i, Instr::Set(crate::emitter::SetOp::Construct { .. }))));
    }

    #[test]
    fn set_constructor_mixing_singles_and_a_range_unions_both_groups() {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex("['A', 'C'..'E', 'Z']", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        parse_expression(&mut ctx, &mut stream);
        assert!(!ctx.diagnostics.has_errors());
        let instrs = ctx.emitter.instructions();
        // One run of singles before the range, one after: both flushed via
        // `Construct`, then unioned with the range's own set value.
        assert_eq!(
            instrs.iter().filter(|i| matches!(i, Instr::Set(crate::emitter::SetOp::Construct { .. }))).count(),
            2
        );
        assert_eq!(
            instrs.iter().filter(|i| matches!(i, Instr::Set(crate::emitter::SetOp::ConstructRange))).count(),
            1
        );
        assert_eq!(instrs.iter().filter(|i| matches!(i, Instr::Set(crate::emitter::SetOp::Union))).count(), 2);
    }

    #[test]
    fn under_indexing_a_multi_dimensional_array_is_a_declaration_error() {
        let mut ctx = CompilationContext::new();
        let elem = ctx.types.declare(
            TypeDesc::Array { index: pascalc_frontend::types::INTEGER, element: pascalc_frontend::types::INTEGER, low: 1, high: 4 },
            None,
        );
        let arr = ctx
            .types
            .declare(TypeDesc::Array { index: pascalc_frontend::types::INTEGER, element: elem, low: 1, high: 3 }, None);
        let name = ctx.interner.intern("a");
        ctx.symbols.declare(name, SymbolKind::Variable { var_type: arr, data_offset: 0, level: 0 }, 0, pascalc_base::Span::new(0, 0));

        let tokens = pascalc_frontend::lex("a[1]", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        parse_expression(&mut ctx, &mut stream);
        assert!(ctx.diagnostics.has_errors(), "a single index into a 2-D array must be rejected");
    }
}
