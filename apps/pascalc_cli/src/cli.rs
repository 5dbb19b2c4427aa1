//! Command-line argument parsing and dispatch for the `pascalc` driver.
//!
//! This is deliberately thin: the semantic core lives in
//! `pascalc-codegen`, and this crate's only job is to read a source file,
//! hand it to [`pascalc_codegen::compile`], and render whatever the caller
//! asked for (diagnostics, a token dump, a p-code dump) to stdout/stderr
//! with an appropriate process exit code.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

/// Compiles a Pascal source file to p-code.
#[derive(Parser)]
#[command(name = "pascalc")]
#[command(about = "Compiles a Pascal program or unit to p-code", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a `.pas`/`.pp` source file.
    pub file: PathBuf,

    /// Print the lexed token stream instead of compiling.
    #[arg(long)]
    pub dump_tokens: bool,

    /// Print the emitted p-code instruction stream after compiling.
    #[arg(long)]
    pub dump_pcode: bool,
}

/// Parses `std::env::args`, runs the requested mode, and returns an error
/// message (never panics) on failure. The caller is responsible for
/// printing it to stderr and choosing an exit code — see `main.rs`.
pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let source = fs::read_to_string(&cli.file)
        .map_err(|e| format!("couldn't read '{}': {e}", cli.file.display()))?;
    let file_name = cli.file.display().to_string();
    log::debug!("compiling '{file_name}' ({} bytes)", source.len());

    if cli.dump_tokens {
        for line in pascalc_codegen::render_tokens(&source) {
            println!("{line}");
        }
        return Ok(());
    }

    let result = pascalc_codegen::compile(&source);
    for line in pascalc_codegen::render_diagnostics(&result.context.diagnostics, &source, &file_name) {
        eprintln!("{line}");
    }

    if cli.dump_pcode {
        for instr in result.context.emitter.instructions() {
            println!("{instr:?}");
        }
    }

    if result.succeeded() {
        log::info!("'{file_name}' compiled cleanly");
        Ok(())
    } else {
        log::warn!("{} error(s) compiling '{file_name}'", result.context.diagnostics.error_count());
        Err(format!(
            "{} error(s) compiling '{}'",
            result.context.diagnostics.error_count(),
            file_name
        ))
    }
}
