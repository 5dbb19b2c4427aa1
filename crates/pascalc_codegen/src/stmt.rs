//! The statement parser.
//!
//! Each statement kind is parsed and its code emitted directly; there is no
//! statement AST node to build first. Structured statements (`if`,
//! `while`, `repeat`, `for`, `case`, `with`) recurse back into
//! [`parse_statement`] for their bodies, and patch their own jump targets
//! with [`crate::emitter::Emitter::place_label`] once the bodies they
//! enclose have actually been emitted.

use pascalc_base::ErrorCategory;
use pascalc_frontend::{Keyword, Punct, SymbolKind, TokenKind, TypeRef};

use crate::constfold::ConstValue;
use crate::context::CompilationContext;
use crate::emitter::{DataOp, Instr, SimpleOp, StackRefOp};
use crate::expr::{parse_and_fold_const, parse_expression};
use crate::tokenstream::TokenStream;

/// `compound-statement ::= 'begin' statement {';' statement} 'end'`
///
/// `result_type` is threaded through so an assignment to the enclosing
/// function's own name (the idiom Pascal uses to set a return value) is
/// recognized rather than treated as an undeclared-identifier error.
pub fn parse_compound_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    stream.expect_keyword(Keyword::Begin, &mut ctx.diagnostics);
    parse_statement(ctx, stream, result_type);
    while stream.at_punct(Punct::Semicolon) {
        stream.advance();
        parse_statement(ctx, stream, result_type);
    }
    stream.expect_keyword(Keyword::End, &mut ctx.diagnostics);
}

/// `statement ::= label ':' unlabelled-statement | unlabelled-statement`
pub fn parse_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    if let TokenKind::IntLiteral(n) = stream.peek_kind().clone() {
        if peek_is_label_colon(stream) {
            let span = stream.span();
            stream.advance();
            stream.advance();
            place_label_here(ctx, n, span);
        }
    }

    match stream.peek_kind().clone() {
        TokenKind::Keyword(Keyword::Begin) => parse_compound_statement(ctx, stream, result_type),
        TokenKind::Keyword(Keyword::If) => parse_if_statement(ctx, stream, result_type),
        TokenKind::Keyword(Keyword::While) => parse_while_statement(ctx, stream, result_type),
        TokenKind::Keyword(Keyword::Repeat) => parse_repeat_statement(ctx, stream, result_type),
        TokenKind::Keyword(Keyword::For) => parse_for_statement(ctx, stream, result_type),
        TokenKind::Keyword(Keyword::Case) => parse_case_statement(ctx, stream, result_type),
        TokenKind::Keyword(Keyword::With) => parse_with_statement(ctx, stream, result_type),
        TokenKind::Keyword(Keyword::Goto) => parse_goto_statement(ctx, stream),
        TokenKind::Ident(name) => parse_assignment_or_call(ctx, stream, name),
        // An empty statement (two adjacent semicolons, or nothing before `end`).
        _ => {}
    }
    ctx.emitter.flush_string_temps();
}

fn peek_is_label_colon(stream: &TokenStream) -> bool {
    matches!(stream.peek_at(1).kind, TokenKind::Punct(Punct::Colon))
}

/// Resolves `digits` (the integer literal a statement label prefix was
/// written as) against the enclosing `label` declaration, plants the
/// emitter label at the current instruction position, and flags the
/// symbol as defined so `verify_labels_defined` doesn't reject it at block
/// exit. A label used as a prefix but never declared, or declared twice, is
/// reported rather than silently accepted.
fn place_label_here(ctx: &mut CompilationContext, digits: i64, span: pascalc_base::Span) {
    let name = ctx.interner.intern(&digits.to_string());
    match ctx.symbols.lookup(name) {
        Some(r) => match &ctx.symbols.get(r).kind {
            SymbolKind::Label { label_number, defined } => {
                let label_number = *label_number;
                if *defined {
                    ctx.diagnostics.error(ErrorCategory::Declaration, "label already defined", span);
                } else {
                    ctx.emitter.place_label(crate::emitter::Label(label_number));
                    ctx.symbols.get_mut(r).kind = SymbolKind::Label { label_number, defined: true };
                }
            }
            _ => ctx.diagnostics.error(ErrorCategory::Declaration, "not a label", span),
        },
        None => ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared label", span),
    }
}

fn parse_assignment_or_call(ctx: &mut CompilationContext, stream: &mut TokenStream, name: pascalc_base::Symbol) {
    let span = stream.span();
    stream.advance();

    if let Some(field_type) = crate::expr::try_with_field_access(ctx, name) {
        parse_with_field_assignment(ctx, stream, field_type, span);
        return;
    }

    let resolved = ctx.symbols.lookup(name);
    let Some(sym_ref) = resolved else {
        ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared identifier", span);
        return;
    };

    match ctx.symbols.get(sym_ref).kind.clone() {
        SymbolKind::Procedure { entry_label, .. } => parse_procedure_call(ctx, stream, entry_label),
        SymbolKind::Variable { var_type, data_offset, level } => {
            parse_assignment(ctx, stream, var_type, level, data_offset, span, false);
        }
        SymbolKind::VarParameter { var_type, data_offset, level } => {
            parse_assignment(ctx, stream, var_type, level, data_offset, span, true);
        }
        SymbolKind::Function { .. } => {
            // Inside its own body, a function's name resolves to its hidden
            // result-value local (a `Variable` symbol declared at heading
            // parse time, see `block::declare_parameters`), so a real
            // self-assignment is handled by the `Variable` arm above and
            // never reaches here. Reaching a `Function` symbol means `name`
            // refers to some other routine, which has no assignable result
            // outside its own body.
            if stream.at_punct(Punct::Assign) {
                stream.advance();
                parse_expression(ctx, stream);
                ctx.diagnostics.error(
                    ErrorCategory::Declaration,
                    "cannot assign to a function's result outside its own body",
                    span,
                );
            } else {
                ctx.diagnostics.error(ErrorCategory::Syntactic, "function call as a statement needs no value here", span);
            }
        }
        _ => {
            ctx.diagnostics.error(ErrorCategory::Declaration, "not a procedure or a variable", span);
        }
    }
}

fn parse_procedure_call(ctx: &mut CompilationContext, stream: &mut TokenStream, entry_label: Option<u32>) {
    ctx.emitter.emit(Instr::Data(DataOp::MarkStack, 0));
    if stream.at_punct(Punct::LParen) {
        stream.advance();
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
    }
    ctx.emitter.emit(Instr::Data(DataOp::CallUser, entry_label.unwrap_or(0) as i64));
}

/// Parses the remainder of a variable access chain beyond the bare name
/// (`[...]`, `.field`, `^`) for the left-hand side of an assignment, then
/// the `:=` and the right-hand expression, finally emitting the store.
fn parse_assignment(
    ctx: &mut CompilationContext,
    stream: &mut TokenStream,
    var_type: TypeRef,
    level: u32,
    offset: i32,
    span: pascalc_base::Span,
    is_var_parm: bool,
) {
    let mut flags = crate::exprtype::FactorFlags::empty();
    let (in_address_mode, var_type) =
        crate::expr::emit_access_chain(ctx, stream, level, offset, is_var_parm, var_type, &mut flags);

    stream.expect_punct(Punct::Assign, &mut ctx.diagnostics);
    let rhs = parse_expression(ctx, stream);
    let lhs_type = crate::expr::expr_type_for(ctx, var_type);
    if lhs_type.unify(rhs).is_none() {
        ctx.diagnostics.error(ErrorCategory::Type, "assignment operand types differ", span);
    }

    if in_address_mode {
        ctx.emitter.emit(Instr::Simple(SimpleOp::StoreIndirect));
    } else {
        ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Store, level, offset });
    }
}

/// Like [`parse_assignment`], but the left-hand side is an unqualified name
/// that resolved to a field of the current `with` binding rather than a
/// plain symbol — [`crate::expr::try_with_field_access`] has already
/// emitted the field's address, so the access chain always continues in
/// address mode and the store is always indirect.
fn parse_with_field_assignment(
    ctx: &mut CompilationContext,
    stream: &mut TokenStream,
    field_type: TypeRef,
    span: pascalc_base::Span,
) {
    let mut flags = crate::exprtype::FactorFlags::empty();
    let (in_address_mode, field_type) = crate::expr::continue_access_chain(ctx, stream, field_type, &mut flags);

    stream.expect_punct(Punct::Assign, &mut ctx.diagnostics);
    let rhs = parse_expression(ctx, stream);
    let lhs_type = crate::expr::expr_type_for(ctx, field_type);
    if lhs_type.unify(rhs).is_none() {
        ctx.diagnostics.error(ErrorCategory::Type, "assignment operand types differ", span);
    }

    if in_address_mode {
        ctx.emitter.emit(Instr::Simple(SimpleOp::StoreIndirect));
    }
}

fn parse_if_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    stream.expect_keyword(Keyword::If, &mut ctx.diagnostics);
    let cond_span = stream.span();
    let cond = parse_expression(ctx, stream);
    if !matches!(cond.kind, crate::exprtype::ExprKind::Boolean) {
        ctx.diagnostics.error(ErrorCategory::Type, "'if' condition must be boolean", cond_span);
    }
    stream.expect_keyword(Keyword::Then, &mut ctx.diagnostics);

    let else_label = ctx.emitter.new_label();
    ctx.emitter.emit(Instr::Data(DataOp::JumpFalse, else_label.0 as i64));
    parse_statement(ctx, stream, result_type);

    if stream.at_keyword(Keyword::Else) {
        let end_label = ctx.emitter.new_label();
        ctx.emitter.emit(Instr::Data(DataOp::Jump, end_label.0 as i64));
        ctx.emitter.place_label(else_label);
        stream.advance();
        parse_statement(ctx, stream, result_type);
        ctx.emitter.place_label(end_label);
    } else {
        ctx.emitter.place_label(else_label);
    }
}

fn parse_while_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    stream.expect_keyword(Keyword::While, &mut ctx.diagnostics);
    let top_label = ctx.emitter.new_label();
    ctx.emitter.place_label(top_label);
    let cond_span = stream.span();
    let cond = parse_expression(ctx, stream);
    if !matches!(cond.kind, crate::exprtype::ExprKind::Boolean) {
        ctx.diagnostics.error(ErrorCategory::Type, "'while' condition must be boolean", cond_span);
    }
    let exit_label = ctx.emitter.new_label();
    ctx.emitter.emit(Instr::Data(DataOp::JumpFalse, exit_label.0 as i64));
    stream.expect_keyword(Keyword::Do, &mut ctx.diagnostics);
    parse_statement(ctx, stream, result_type);
    ctx.emitter.emit(Instr::Data(DataOp::Jump, top_label.0 as i64));
    ctx.emitter.place_label(exit_label);
}

fn parse_repeat_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    stream.expect_keyword(Keyword::Repeat, &mut ctx.diagnostics);
    let top_label = ctx.emitter.new_label();
    ctx.emitter.place_label(top_label);
    parse_statement(ctx, stream, result_type);
    while stream.at_punct(Punct::Semicolon) {
        stream.advance();
        parse_statement(ctx, stream, result_type);
    }
    stream.expect_keyword(Keyword::Until, &mut ctx.diagnostics);
    let cond_span = stream.span();
    let cond = parse_expression(ctx, stream);
    if !matches!(cond.kind, crate::exprtype::ExprKind::Boolean) {
        ctx.diagnostics.error(ErrorCategory::Type, "'until' condition must be boolean", cond_span);
    }
    ctx.emitter.emit(Instr::Data(DataOp::JumpFalse, top_label.0 as i64));
}

fn parse_for_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    stream.expect_keyword(Keyword::For, &mut ctx.diagnostics);
    let span = stream.span();
    let Some(var_name) = stream.expect_ident(&mut ctx.diagnostics) else {
        stream.resync_to_semicolon();
        return;
    };
    let Some(sym_ref) = ctx.symbols.lookup(var_name) else {
        ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared identifier", span);
        return;
    };
    let (level, offset) = match ctx.symbols.get(sym_ref).kind {
        SymbolKind::Variable { level, data_offset, .. } => (level, data_offset),
        _ => {
            ctx.diagnostics.error(ErrorCategory::Declaration, "'for' control variable must be a plain variable", span);
            (0, 0)
        }
    };

    stream.expect_punct(Punct::Assign, &mut ctx.diagnostics);
    parse_expression(ctx, stream);
    ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Store, level, offset });

    let downto = if stream.at_keyword(Keyword::Downto) {
        stream.advance();
        true
    } else {
        stream.expect_keyword(Keyword::To, &mut ctx.diagnostics);
        false
    };

    // The bound is evaluated once; spill it to a hidden temp slot so the
    // per-iteration comparison can reload it instead of consuming a value
    // that was only ever pushed a single time.
    let bound_level = ctx.level();
    let bound_offset = ctx.reserve(4, 4);
    parse_expression(ctx, stream);
    ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Store, level: bound_level, offset: bound_offset });
    stream.expect_keyword(Keyword::Do, &mut ctx.diagnostics);

    let top_label = ctx.emitter.new_label();
    ctx.emitter.place_label(top_label);
    ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Load, level, offset });
    ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Load, level: bound_level, offset: bound_offset });
    ctx.emitter.emit(Instr::Simple(if downto { SimpleOp::GreaterEq } else { SimpleOp::LessEq }));
    let exit_label = ctx.emitter.new_label();
    ctx.emitter.emit(Instr::Data(DataOp::JumpFalse, exit_label.0 as i64));

    parse_statement(ctx, stream, result_type);

    ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Load, level, offset });
    ctx.emitter.emit(Instr::Data(DataOp::LoadConst, 1));
    ctx.emitter.emit(Instr::Simple(if downto { SimpleOp::SubInt } else { SimpleOp::AddInt }));
    ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Store, level, offset });
    ctx.emitter.emit(Instr::Data(DataOp::Jump, top_label.0 as i64));
    ctx.emitter.place_label(exit_label);
}

fn parse_case_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    stream.expect_keyword(Keyword::Case, &mut ctx.diagnostics);
    let selector_span = stream.span();
    let selector = parse_expression(ctx, stream);
    if !selector.is_ordinal_like() {
        ctx.diagnostics.error(ErrorCategory::Type, "'case' selector must be ordinal", selector_span);
    }
    stream.expect_keyword(Keyword::Of, &mut ctx.diagnostics);

    let end_label = ctx.emitter.new_label();
    let mut seen_tags: Vec<i64> = Vec::new();

    loop {
        if stream.at_keyword(Keyword::End) {
            break;
        }
        let mut tags = Vec::new();
        loop {
            let tag_span = stream.span();
            match parse_and_fold_const(ctx, stream) {
                Some(ConstValue::Integer(v)) => {
                    if seen_tags.contains(&v) {
                        ctx.diagnostics.error(ErrorCategory::Declaration, "duplicate case label", tag_span);
                    }
                    seen_tags.push(v);
                    tags.push(v);
                }
                Some(ConstValue::Char(c)) => tags.push(c as i64),
                _ => ctx.diagnostics.error(ErrorCategory::Type, "case label must be an ordinal constant", tag_span),
            }
            if stream.at_punct(Punct::Comma) {
                stream.advance();
                continue;
            }
            break;
        }
        stream.expect_punct(Punct::Colon, &mut ctx.diagnostics);

        let next_branch = ctx.emitter.new_label();
        // The selector stays live on the stack across every branch's test
        // (popped only once, after the whole statement, below), so each tag
        // comparison works off its own `Dup`; a branch's own tags (`1, 2:
        // ...`) are ORed together so any one of them selects the branch.
        for (i, tag) in tags.iter().enumerate() {
            ctx.emitter.emit(Instr::Simple(SimpleOp::Dup));
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, *tag));
            ctx.emitter.emit(Instr::Simple(SimpleOp::Equal));
            if i > 0 {
                ctx.emitter.emit(Instr::Simple(SimpleOp::Or));
            }
        }
        ctx.emitter.emit(Instr::Data(DataOp::JumpFalse, next_branch.0 as i64));
        parse_statement(ctx, stream, result_type);
        ctx.emitter.emit(Instr::Data(DataOp::Jump, end_label.0 as i64));
        ctx.emitter.place_label(next_branch);

        if stream.at_punct(Punct::Semicolon) {
            stream.advance();
        } else {
            break;
        }
    }
    stream.expect_keyword(Keyword::End, &mut ctx.diagnostics);
    ctx.emitter.place_label(end_label);
    // No branch matched (or one did and jumped past here); either way the
    // selector itself is still sitting on the stack since every branch test
    // only ever duplicated it.
    ctx.emitter.emit(Instr::Simple(SimpleOp::Pop));
}

fn parse_with_statement(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    stream.expect_keyword(Keyword::With, &mut ctx.diagnostics);
    let span = stream.span();
    let Some(var_name) = stream.expect_ident(&mut ctx.diagnostics) else {
        stream.resync_to_semicolon();
        return;
    };
    let Some(sym_ref) = ctx.symbols.lookup(var_name) else {
        ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared identifier", span);
        return;
    };
    let resolved_type = match ctx.symbols.get(sym_ref).kind {
        SymbolKind::Variable { var_type, .. } => var_type,
        _ => {
            ctx.diagnostics.error(ErrorCategory::Declaration, "'with' requires a record variable", span);
            pascalc_frontend::types::INTEGER
        }
    };
    if !matches!(ctx.types.get(ctx.types.resolve(resolved_type)).desc, pascalc_frontend::TypeDesc::Record { .. }) {
        ctx.diagnostics.error(ErrorCategory::Type, "'with' requires a record variable", span);
    }
    stream.expect_keyword(Keyword::Do, &mut ctx.diagnostics);

    let previous = ctx.push_with_binding(sym_ref);
    parse_statement(ctx, stream, result_type);
    ctx.pop_with_binding(previous);
}

fn parse_goto_statement(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    stream.expect_keyword(Keyword::Goto, &mut ctx.diagnostics);
    let span = stream.span();
    if let TokenKind::IntLiteral(n) = stream.peek_kind().clone() {
        stream.advance();
        let name = ctx.interner.intern(&n.to_string());
        match ctx.symbols.lookup(name) {
            Some(r) => {
                if let SymbolKind::Label { label_number, .. } = &ctx.symbols.get(r).kind {
                    ctx.emitter.emit(Instr::Data(DataOp::Jump, *label_number as i64));
                } else {
                    ctx.diagnostics.error(ErrorCategory::Declaration, "not a label", span);
                }
            }
            None => ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared label", span),
        }
    } else {
        ctx.diagnostics.error(ErrorCategory::Syntactic, "expected a label after 'goto'", span);
    }
}
