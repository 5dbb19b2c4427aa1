//! pascalc CLI - standalone binary.
//!
//! Thin wrapper around [`pascalc_cli::run_cli`], handling error display and
//! exit codes. All command logic lives in the library crate for
//! testability.
//!
//! # Exit Codes
//!
//! - `0` - success
//! - `1` - compilation or I/O error (message printed to stderr)

fn main() {
    env_logger::init();
    if let Err(e) = pascalc_cli::run_cli() {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
