use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use galah_core::{Builtins, CoreError, DEFAULT_MAX_CODE_LINES, Diagnostic, Interpreter};

/// Checks and runs a Galah script.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Script to run. Reads standard input when omitted.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_CODE_LINES,
        help = "Maximum number of source lines shown per diagnostic"
    )]
    max_code_lines: usize,

    #[arg(long, help = "Only lex, parse and type check; do not run anything")]
    check: bool,

    #[arg(
        long,
        value_name = "NAME",
        default_value = "main",
        help = "Zero-argument Void function to run"
    )]
    entry: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let (name, source) = match &cli.input {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            (path.display().to_string(), source)
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read standard input")?;
            ("<stdin>".to_string(), buffer)
        }
    };
    let max_code_lines = cli.max_code_lines.max(1);
    let print = |diagnostic: &Diagnostic| print_diagnostic(diagnostic, &source, max_code_lines);

    let interpreter =
        Interpreter::with_builtins(&source, Builtins::default(), print).map_err(|err| {
            report(&err, &source, max_code_lines, format!("could not compile '{name}'"))
        })?;
    if cli.check {
        return Ok(());
    }

    interpreter
        .evaluate_entry(&cli.entry)
        .map_err(|err| report(&err, &source, max_code_lines, format!("failed to run '{name}'")))
}

fn print_diagnostic(diagnostic: &Diagnostic, source: &str, max_code_lines: usize) {
    eprintln!("{}", diagnostic.formatted(source, max_code_lines));
}

/// Summarizes `err` for the exit status. Compile errors were already
/// printed by the diagnostic handler; anything later is printed here.
fn report(err: &CoreError, source: &str, max_code_lines: usize, context: String) -> anyhow::Error {
    let diagnostics = err.diagnostics();
    match err {
        CoreError::Lex(_) | CoreError::Parse(_) | CoreError::Check(_) => {
            let count = diagnostics.len();
            let plural = if count == 1 { "" } else { "s" };
            anyhow!("{context} due to {count} error{plural}")
        }
        _ => {
            for diagnostic in &diagnostics {
                print_diagnostic(diagnostic, source, max_code_lines);
            }
            anyhow!("{context}")
        }
    }
}
