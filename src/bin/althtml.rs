//! Althtml command-line compiler.
//!
//! A thin wrapper around [`althtml::compile`]: reads the input file,
//! calls the pure API, and either writes the resulting HTML (stdout or
//! `-o`) or prints one diagnostic per line to stderr and exits
//! non-zero. All file I/O, argument parsing, and diagnostic formatting
//! live here; the core crate never touches a filesystem or an exit
//! code.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use althtml::CompileError;

#[derive(Parser, Debug)]
#[command(name = "althtml", version, about = "Compile Althtml templates to HTML")]
struct Args {
    /// Path to the Althtml source file to compile
    input: PathBuf,

    /// Write output to this path instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Distinct from a compilation failure: the CLI itself couldn't even
/// start (bad path, unreadable file, unwritable output).
const EXIT_USAGE_ERROR: u8 = 2;
/// The input compiled but reported one or more [`CompileError`]s.
const EXIT_COMPILE_ERROR: u8 = 1;

fn main() -> ExitCode {
    let args = Args::parse();

    if !args.input.exists() {
        eprintln!("althtml: input file `{}` does not exist", args.input.display());
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    let source = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("althtml: could not read `{}`: {}", args.input.display(), e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let filename = args.input.display().to_string();

    match althtml::compile(&source, &filename) {
        Ok(html) => {
            if let Err(e) = write_output(args.output.as_deref(), &html) {
                eprintln!("althtml: could not write output: {}", e);
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
            ExitCode::SUCCESS
        }
        Err(errors) => {
            print_errors(&filename, &errors);
            ExitCode::from(EXIT_COMPILE_ERROR)
        }
    }
}

fn write_output(output: Option<&Path>, html: &str) -> io::Result<()> {
    match output {
        Some(path) => fs::write(path, html),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(html.as_bytes())?;
            handle.flush()
        }
    }
}

/// Print `file:line:col: kind: message` once per error, colored when
/// stderr is attached to a terminal.
fn print_errors(filename: &str, errors: &[CompileError]) {
    let choice = if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);

    for error in errors {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        let _ = write!(stderr, "{}:{}:{}: {}", filename, error.line, error.column, error.kind);
        let _ = stderr.reset();
        let _ = writeln!(stderr, ": {}", error.message);
    }
}
