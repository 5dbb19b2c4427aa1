//! The block parser: declaration parts, nested routine declarations, and
//! the `begin ... end` statement body that together make up a Pascal
//! block.
//!
//! A block is where [`CompilationContext::enter_block`] /
//! [`CompilationContext::exit_block`] actually get called — nothing else
//! in the crate changes scope. A nested procedure or function is declared
//! and its own block parsed recursively *before* the enclosing block's own
//! statement part, which mirrors the standard grammar
//! (`block ::= declarations compound-statement`) and is also why the
//! entry label for a nested routine must be emitted as a jump-over: the
//! surrounding block's linear instruction stream would otherwise fall
//! through into the nested routine's body.

use pascalc_base::ErrorCategory;
use pascalc_frontend::{Keyword, Punct, SymbolKind, TypeRef};

use crate::context::{CompilationContext, FRAME_HEADER_SIZE};
use crate::decl::{parse_const_decl, parse_label_decl, parse_type_decl, parse_var_decl};
use crate::emitter::{DataOp, Instr, StackRefOp, StrOp, NO_RODATA};
use crate::stmt::parse_compound_statement;
use crate::tokenstream::TokenStream;

/// Parses and emits one full block: declaration parts, any nested routine
/// declarations, and the compound statement body. `result_type` is `Some`
/// inside a function body (where assigning to the function's own name sets
/// the return value) and `None` for a procedure or the top-level program.
pub fn parse_block(ctx: &mut CompilationContext, stream: &mut TokenStream, result_type: Option<TypeRef>) {
    parse_label_decl(ctx, stream);
    parse_const_decl(ctx, stream);
    parse_type_decl(ctx, stream);
    let initializer_mark = ctx.emitter.initializers_mark();
    parse_var_decl(ctx, stream);

    while stream.at_keyword(Keyword::Procedure) || stream.at_keyword(Keyword::Function) {
        parse_procedure_or_function(ctx, stream);
    }

    let frame_size = (ctx.data_offset() - FRAME_HEADER_SIZE).max(0) as i64;
    ctx.emitter.emit(Instr::Data(DataOp::AllocData, frame_size));
    emit_initializers(ctx, initializer_mark);

    parse_compound_statement(ctx, stream, result_type);
    verify_labels_defined(ctx);
}

/// Emits the store sequence for every initializer registered since `mark` —
/// a literal's rodata entry for a constant payload, or a bare zero for a
/// slot that just needs clearing (`NO_RODATA`) — then drops the list back
/// to `mark`. Runs once per block entry, right after that block's own
/// declarations and before its nested routines' bodies run, so a nested
/// routine's own recursive call flushes only the slice it registered
/// itself.
fn emit_initializers(ctx: &mut CompilationContext, mark: usize) {
    let level = ctx.level();
    let entries = ctx.emitter.initializers_from(mark).to_vec();
    for init in &entries {
        if init.rodata_index == NO_RODATA {
            ctx.emitter.emit(Instr::Data(DataOp::LoadConst, 0));
        } else {
            ctx.emitter.emit(Instr::Str(StrOp::Push { rodata_offset: init.rodata_index }));
        }
        ctx.emitter.emit(Instr::StackRef { op: StackRefOp::Store, level, offset: init.target_offset });
    }
    ctx.emitter.truncate_initializers(mark);
}

/// Reports every label declared in the block just finished (from the
/// current scope's start to the end of the table) whose matching `label:
/// statement` was never seen — declaring a label and never planting it
/// would otherwise leave a dangling `goto` target that resolves to nothing.
fn verify_labels_defined(ctx: &mut CompilationContext) {
    let start = ctx.current_scope_start();
    let end = ctx.symbols.len();
    for i in start..end {
        let r = pascalc_frontend::SymbolRef(i);
        let entry = ctx.symbols.get(r);
        if let SymbolKind::Label { defined: false, .. } = entry.kind {
            ctx.diagnostics.error(ErrorCategory::Declaration, "label declared but never defined", entry.span);
        }
    }
}

/// `procedure-declaration ::= procedure-heading ';' (block | 'forward')`
/// `function-declaration  ::= function-heading  ';' (block | 'forward')`
fn parse_procedure_or_function(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    let is_function = stream.at_keyword(Keyword::Function);
    stream.advance();

    let span = stream.span();
    let Some(name) = stream.expect_ident(&mut ctx.diagnostics) else {
        stream.resync_to_semicolon();
        return;
    };

    // If an earlier `forward` declaration of this same name reserved a
    // label, this declaration (forward or real) must reuse it rather than
    // allocate a fresh one — a call emitted against the forward symbol
    // already references that label number, and the label only gets
    // placed once the real body is reached below.
    let reused_label = ctx.take_forward_routine(name);

    let mark = ctx.enter_block();
    let params = parse_formal_parameter_list(ctx, stream);
    let param_count = params.len();

    let result_type = if is_function {
        stream.expect_punct(Punct::Colon, &mut ctx.diagnostics);
        let type_span = stream.span();
        match stream.expect_ident(&mut ctx.diagnostics) {
            Some(type_name) => match ctx.symbols.lookup(type_name) {
                Some(r) => match &ctx.symbols.get(r).kind {
                    SymbolKind::TypeName { denotes } => Some(*denotes),
                    _ => {
                        ctx.diagnostics.error(ErrorCategory::Declaration, "not a type name", type_span);
                        Some(pascalc_frontend::types::INTEGER)
                    }
                },
                None => {
                    ctx.diagnostics.error(ErrorCategory::Declaration, "undeclared type name", type_span);
                    Some(pascalc_frontend::types::INTEGER)
                }
            },
            None => Some(pascalc_frontend::types::INTEGER),
        }
    } else {
        None
    };

    // Parameter offsets descend from `-returnSize`, the first-declared
    // parameter ending up least negative (highest in the frame); only now
    // that the result type has been parsed can `returnSize` be known, so
    // parameters are declared here rather than as they're read.
    let return_size = result_type.map(|rt| ctx.types.layout(rt).size.max(4) as i32).unwrap_or(0);
    let final_param_offset = declare_parameters(ctx, &params, return_size);

    // The function's result lives in a hidden local shadowing its own
    // name, so `f := ...` inside the body resolves through the ordinary
    // variable-assignment path instead of a special case.
    if let Some(rt) = result_type {
        let hidden_offset = final_param_offset - return_size;
        let level = ctx.level();
        ctx.symbols.declare(name, SymbolKind::Variable { var_type: rt, data_offset: hidden_offset, level }, level, span);
    }

    stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);

    let forward = stream.at_keyword(Keyword::Forward);
    let entry_label = if forward {
        stream.advance();
        stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
        // No body follows, so nothing to jump over yet: reserve (or keep
        // carrying) the label, unplaced, for calls made before the real
        // declaration appears, and for that declaration to place later.
        let label = reused_label.unwrap_or_else(|| ctx.emitter.new_label());
        ctx.declare_forward_routine(name, label);
        label
    } else {
        let entry_label = reused_label.unwrap_or_else(|| ctx.emitter.new_label());
        // A nested routine's body would otherwise run inline in the
        // enclosing block's instruction stream; jump around it so control
        // only reaches the body through a `call`.
        let skip_label = ctx.emitter.new_label();
        ctx.emitter.emit(Instr::Data(DataOp::Jump, skip_label.0 as i64));
        ctx.emitter.place_label(entry_label);
        parse_block(ctx, stream, result_type);
        ctx.emitter.emit(Instr::Data(DataOp::Return, param_count as i64));
        stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
        ctx.emitter.place_label(skip_label);
        entry_label
    };

    ctx.exit_block(mark);

    let kind = if is_function {
        SymbolKind::Function {
            entry_label: Some(entry_label.0),
            param_count,
            result_type: result_type.unwrap_or(pascalc_frontend::types::INTEGER),
            forward,
        }
    } else {
        SymbolKind::Procedure { entry_label: Some(entry_label.0), param_count, forward }
    };
    let level = ctx.level();
    ctx.symbols.declare(name, kind, level, span);
}

/// One formal parameter collected before its frame offset is known.
struct ParamInfo {
    name: pascalc_base::Symbol,
    span: pascalc_base::Span,
    is_var: bool,
    param_type: TypeRef,
}

/// `formal-parameter-list ::= '(' formal-parameter-section {';' formal-parameter-section} ')'`
///
/// Only collects each parameter's name, `var`-ness, and type — offsets
/// aren't assigned here. A parameter's offset depends on the routine's
/// return size (decremented from `-returnSize`), and the return type isn't
/// parsed until after the parameter list closes, so [`declare_parameters`]
/// does the actual symbol-table work once that's known.
fn parse_formal_parameter_list(ctx: &mut CompilationContext, stream: &mut TokenStream) -> Vec<ParamInfo> {
    let mut params = Vec::new();
    if !stream.at_punct(Punct::LParen) {
        return params;
    }
    stream.advance();
    if !stream.at_punct(Punct::RParen) {
        loop {
            let is_var = if stream.at_keyword(Keyword::Var) {
                stream.advance();
                true
            } else {
                false
            };
            let mut names = Vec::new();
            loop {
                let span = stream.span();
                if let Some(n) = stream.expect_ident(&mut ctx.diagnostics) {
                    names.push((n, span));
                }
                if stream.at_punct(Punct::Comma) {
                    stream.advance();
                    continue;
                }
                break;
            }
            stream.expect_punct(Punct::Colon, &mut ctx.diagnostics);
            let param_type = crate::decl::parse_type_denoter(ctx, stream);
            for (name, span) in names {
                params.push(ParamInfo { name, span, is_var, param_type });
            }
            if stream.at_punct(Punct::Semicolon) {
                stream.advance();
                continue;
            }
            break;
        }
    }
    stream.expect_punct(Punct::RParen, &mut ctx.diagnostics);
    params
}

/// Assigns each parameter its frame offset in declaration order, starting
/// from `-returnSize` and decrementing by each (integer-aligned) parameter
/// size, then declares its symbol. A `var` parameter always consumes a
/// pointer's width (4 bytes) regardless of its pointee's own size; a value
/// parameter consumes its type's own aligned size. Returns the final
/// (most negative) offset assigned, which a function heading also needs to
/// place its hidden result local.
fn declare_parameters(ctx: &mut CompilationContext, params: &[ParamInfo], return_size: i32) -> i32 {
    let level = ctx.level();
    let mut cursor = -return_size;
    for p in params {
        let size: i32 = if p.is_var { 4 } else { ctx.types.layout(p.param_type).size.max(4) as i32 };
        cursor -= size;
        let kind = if p.is_var {
            SymbolKind::VarParameter { var_type: p.param_type, data_offset: cursor, level }
        } else {
            SymbolKind::Variable { var_type: p.param_type, data_offset: cursor, level }
        };
        ctx.symbols.declare(p.name, kind, level, p.span);
    }
    cursor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_block_src(source: &str) -> CompilationContext {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex(source, &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        parse_block(&mut ctx, &mut stream, None);
        ctx
    }

    #[test]
    fn empty_block_parses_clean() {
        let ctx = parse_block_src("begin end");
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn nested_procedure_declares_a_symbol_and_restores_outer_scope() {
        let ctx = parse_block_src(
            "var x: integer; \
             procedure inc_x; begin x := x + 1 end; \
             begin x := 0 end",
        );
        assert!(!ctx.diagnostics.has_errors());
        // Only `x` and `inc_x` remain visible at the outer scope.
        assert_eq!(ctx.symbols.len(), 2);
    }

    #[test]
    fn forward_declared_procedure_is_marked_forward() {
        let ctx = parse_block_src(
            "procedure p; forward; \
             procedure p; begin end; \
             begin end",
        );
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn forward_declared_procedure_called_before_its_body_resolves_to_the_real_body() {
        // `b` calls `a` while only `a`'s forward declaration is visible;
        // the call must end up targeting the label `a`'s real body below
        // places, not a throwaway stub with nothing behind it.
        let ctx = parse_block_src(
            "procedure a; forward; \
             procedure b; begin a end; \
             procedure a; begin end; \
             begin end",
        );
        assert!(!ctx.diagnostics.has_errors());
        let instrs = ctx.emitter.instructions();
        let call_label = instrs
            .iter()
            .find_map(|i| match i {
                Instr::Data(DataOp::CallUser, label) => Some(*label as u32),
                _ => None,
            })
            .expect("b's body should call a");
        let placements = instrs
            .iter()
            .filter(|i| matches!(i, Instr::PlaceLabel(l) if l.0 == call_label))
            .count();
        assert_eq!(placements, 1, "a's entry label must be placed exactly once, at its real body");
    }

    #[test]
    fn function_heading_records_its_result_type() {
        let ctx = parse_block_src(
            "function double(n: integer): integer; begin double := n * 2 end; \
             begin end",
        );
        assert!(!ctx.diagnostics.has_errors());
        let entry = ctx.symbols.get(pascalc_frontend::SymbolRef(0));
        assert!(matches!(entry.kind, SymbolKind::Function { .. }));
    }

    #[test]
    fn var_parameter_is_flagged_in_the_symbol_table() {
        let ctx = parse_block_src("procedure bump(var n: integer); begin n := n + 1 end; begin end");
        assert!(!ctx.diagnostics.has_errors());
    }

    #[test]
    fn parameter_offsets_descend_from_negative_return_size() {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex("(a: integer; b: integer)", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let mark = ctx.enter_block();
        let params = parse_formal_parameter_list(&mut ctx, &mut stream);
        assert_eq!(params.len(), 2);
        let final_offset = declare_parameters(&mut ctx, &params, 4);

        let a_off = match ctx.symbols.get(pascalc_frontend::SymbolRef(0)).kind {
            SymbolKind::Variable { data_offset, .. } => data_offset,
            _ => panic!("expected a plain variable parameter"),
        };
        let b_off = match ctx.symbols.get(pascalc_frontend::SymbolRef(1)).kind {
            SymbolKind::Variable { data_offset, .. } => data_offset,
            _ => panic!("expected a plain variable parameter"),
        };
        // return_size=4, each param integer-aligned to 4: a sits at -8
        // (highest/least negative), b at -12, strictly decreasing toward
        // more negative as the invariant requires.
        assert_eq!(a_off, -8);
        assert_eq!(b_off, -12);
        assert!(b_off < a_off);
        assert_eq!(final_offset, -12);
        ctx.exit_block(mark);
    }

    #[test]
    fn var_parameter_consumes_pointer_width_regardless_of_its_type() {
        let mut ctx = CompilationContext::new();
        let tokens = pascalc_frontend::lex("(var r: integer)", &mut ctx.interner, &mut ctx.diagnostics);
        let mut stream = TokenStream::new(tokens);
        let mark = ctx.enter_block();
        let params = parse_formal_parameter_list(&mut ctx, &mut stream);
        let final_offset = declare_parameters(&mut ctx, &params, 0);
        assert_eq!(final_offset, -4);
        ctx.exit_block(mark);
    }

    #[test]
    fn function_self_assignment_stores_into_the_hidden_result_local() {
        let ctx = parse_block_src(
            "function double(n: integer): integer; \
             begin double := n * 2 end; \
             begin end",
        );
        assert!(!ctx.diagnostics.has_errors());
        // return_size=4, n's offset is -8 (the sole parameter), so the
        // hidden result local sits at -8 - 4 = -12, at level 1 (the
        // function body runs one level deeper than the enclosing block).
        let stores_result = ctx.emitter.instructions().iter().any(|i| {
            matches!(
                i,
                Instr::StackRef { op: crate::emitter::StackRefOp::Store, level: 1, offset: -12 }
            )
        });
        assert!(stores_result, "expected a store into the hidden result local at (level 1, offset -12)");
    }

    #[test]
    fn block_emits_alloc_data_before_its_compound_statement() {
        let ctx = parse_block_src("var a: integer; begin a := 1 end");
        let alloc_pos = ctx
            .emitter
            .instructions()
            .iter()
            .position(|i| matches!(i, Instr::Data(DataOp::AllocData, _)))
            .expect("expected an AllocData instruction");
        let store_pos = ctx
            .emitter
            .instructions()
            .iter()
            .position(|i| matches!(i, Instr::StackRef { op: crate::emitter::StackRefOp::Store, .. }))
            .expect("expected a store for the assignment");
        assert!(alloc_pos < store_pos, "AllocData must precede the block's own body");
    }

    #[test]
    fn string_variable_initializer_is_flushed_before_the_body() {
        let ctx = parse_block_src("var s: string; begin end");
        assert_eq!(ctx.emitter.initializers().len(), 0, "the block must flush its own initializer list");
        let stores = ctx
            .emitter
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instr::StackRef { op: crate::emitter::StackRefOp::Store, .. }))
            .count();
        assert_eq!(stores, 1, "expected one store clearing the string's slot");
    }
}
