//! Top-level entry points: `program` and `unit` source files.
//!
//! Both productions bottom out in [`crate::block::parse_block`]; what
//! differs is the heading (`program name(files);` vs. `unit name;` with
//! separate `interface`/`implementation` sections) and what happens at the
//! very end (a program's entry point is marked with `EntryPoint`; a unit's
//! interface declarations are marked with one `ExportSymbol` directive each).
//! Linking those directives against another file's `uses` clause is left to
//! a later stage: this front end emits `ImportSymbol`/`ExportSymbol` as plain
//! directives in the instruction stream and compiles one file at a time, with
//! no cross-file symbol resolution of its own.

use pascalc_base::{Diagnostics, Interner};
use pascalc_frontend::{Keyword, Punct, TokenKind};

use crate::block::parse_block;
use crate::context::CompilationContext;
use crate::emitter::{DataOp, Instr};
use crate::tokenstream::TokenStream;

/// The outcome of compiling one source file: the context holding every
/// table and the emitted instruction stream, plus whether compilation
/// should be considered successful (no accumulated errors).
pub struct CompileResult {
    pub context: CompilationContext,
}

impl CompileResult {
    pub fn succeeded(&self) -> bool {
        !self.context.diagnostics.has_errors()
    }
}

/// Lexes and compiles one Pascal source file (a `program` or a `unit`),
/// returning the fully populated [`CompilationContext`] regardless of
/// whether errors were encountered — callers inspect
/// [`CompileResult::succeeded`] to decide whether to trust the emitted
/// instructions.
pub fn compile(source: &str) -> CompileResult {
    let mut ctx = CompilationContext::new();
    let tokens = pascalc_frontend::lex(source, &mut ctx.interner, &mut ctx.diagnostics);
    let mut stream = TokenStream::new(tokens);

    if stream.at_keyword(Keyword::Unit) {
        parse_unit(&mut ctx, &mut stream);
    } else {
        parse_program(&mut ctx, &mut stream);
    }

    CompileResult { context: ctx }
}

/// `program ::= program-heading ';' (uses-clause)? block '.'`
fn parse_program(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    stream.expect_keyword(Keyword::Program, &mut ctx.diagnostics);
    let span = stream.span();
    let Some(name) = stream.expect_ident(&mut ctx.diagnostics) else {
        stream.resync_to_semicolon();
        return;
    };

    if stream.at_punct(Punct::LParen) {
        stream.advance();
        loop {
            stream.expect_ident(&mut ctx.diagnostics);
            if stream.at_punct(Punct::Comma) {
                stream.advance();
                continue;
            }
            break;
        }
        stream.expect_punct(Punct::RParen, &mut ctx.diagnostics);
    }
    stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);

    ctx.symbols.declare(name, pascalc_frontend::SymbolKind::UnitName, 0, span);
    parse_uses_clause(ctx, stream);
    ctx.emitter.emit(Instr::Data(DataOp::EntryPoint, 0));
    parse_block(ctx, stream, None);
    stream.expect_punct(Punct::Dot, &mut ctx.diagnostics);
}

/// `unit ::= 'unit' ident ';' 'interface' (uses-clause)? interface-part
///           'implementation' (uses-clause)? implementation-part
///           ('begin' statement-sequence)? 'end' '.'`
///
/// Both sections share one [`CompilationContext`], since this front end
/// compiles a single file at a time; the interface/implementation split is
/// still meaningful, though, since only symbols declared in the interface
/// part get an `ExportSymbol` directive (see [`export_interface_symbols`]).
fn parse_unit(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    stream.expect_keyword(Keyword::Unit, &mut ctx.diagnostics);
    let span = stream.span();
    let Some(name) = stream.expect_ident(&mut ctx.diagnostics) else {
        stream.resync_to_semicolon();
        return;
    };
    stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
    ctx.symbols.declare(name, pascalc_frontend::SymbolKind::UnitName, 0, span);

    stream.expect_keyword(Keyword::Interface, &mut ctx.diagnostics);
    parse_uses_clause(ctx, stream);
    let interface_start = ctx.symbols.mark();
    crate::decl::parse_const_decl(ctx, stream);
    crate::decl::parse_type_decl(ctx, stream);
    crate::decl::parse_var_decl(ctx, stream);
    export_interface_symbols(ctx, interface_start);

    stream.expect_keyword(Keyword::Implementation, &mut ctx.diagnostics);
    parse_uses_clause(ctx, stream);
    parse_block(ctx, stream, None);
    stream.expect_punct(Punct::Dot, &mut ctx.diagnostics);
}

/// Emits one `ExportSymbol` directive per symbol declared in the unit's
/// interface part (`start` to the table's current end), so a later `uses`
/// clause elsewhere knows which names this unit makes available.
fn export_interface_symbols(ctx: &mut CompilationContext, start: usize) {
    let end = ctx.symbols.len();
    for i in start..end {
        ctx.emitter.emit(Instr::Data(DataOp::ExportSymbol, i as i64));
    }
}

fn parse_uses_clause(ctx: &mut CompilationContext, stream: &mut TokenStream) {
    if !stream.at_keyword(Keyword::Uses) {
        return;
    }
    stream.advance();
    loop {
        let span = stream.span();
        if let Some(name) = stream.expect_ident(&mut ctx.diagnostics) {
            let unit_ref = ctx.symbols.declare(name, pascalc_frontend::SymbolKind::UnitName, 0, span);
            ctx.emitter.emit(Instr::Data(DataOp::ImportSymbol, unit_ref.0 as i64));
        }
        if stream.at_punct(Punct::Comma) {
            stream.advance();
            continue;
        }
        break;
    }
    stream.expect_punct(Punct::Semicolon, &mut ctx.diagnostics);
}

/// Renders every accumulated diagnostic against `source`'s line map, one
/// line per entry, in the order they were reported.
pub fn render_diagnostics(diagnostics: &Diagnostics, source: &str, file_name: &str) -> Vec<String> {
    let map = pascalc_base::SourceMap::new(source, file_name);
    diagnostics.iter().map(|d| d.render(&map)).collect()
}

/// Used by the CLI's `--dump-tokens` mode: renders a token stream as plain
/// text for inspection, independent of parsing.
pub fn render_tokens(source: &str) -> Vec<String> {
    let mut interner = Interner::new();
    let mut diagnostics = Diagnostics::new();
    let tokens = pascalc_frontend::lex(source, &mut interner, &mut diagnostics);
    tokens
        .iter()
        .map(|t| match &t.kind {
            TokenKind::Ident(sym) => format!("Ident({})", interner.resolve(*sym)),
            other => format!("{other:?}"),
        })
        .collect()
}
