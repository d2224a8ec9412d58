use std::{fs::File, io::BufReader, path::PathBuf, process::ExitCode};

use clap::Parser as ClapParser;
use tarn::{
    host::school::School, lexer::Lexer, parser::Parser, source::Source, Error, Interpreter,
    Limits, Value,
};

#[derive(ClapParser)]
#[command(
    name = "tarn",
    about = "Runs a tarn script and prints the value returned by its main function",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Path to the script
    file: PathBuf,

    /// Most nested user-function calls before the script is stopped
    #[arg(long)]
    max_recursion_depth: Option<usize>,

    /// Longest identifier the lexer accepts
    #[arg(long)]
    max_identifier_length: Option<usize>,

    /// Most digits allowed after the decimal point of a float literal
    #[arg(long)]
    max_fraction_digits: Option<usize>,

    /// Deepest nesting of blocks, parentheses and prefix operators
    #[arg(long)]
    max_nesting_depth: Option<usize>,
}

impl Cli {
    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        if let Some(depth) = self.max_recursion_depth {
            limits.max_recursion_depth = depth;
        }
        if let Some(length) = self.max_identifier_length {
            limits.lexer.max_identifier_length = length;
        }
        if let Some(digits) = self.max_fraction_digits {
            limits.lexer.max_fraction_digits = digits;
        }
        if let Some(depth) = self.max_nesting_depth {
            limits.lexer.max_nesting_depth = depth;
        }
        limits
    }
}

/// Logs to stderr when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn execute(cli: &Cli) -> Result<Value, Error> {
    let limits = cli.limits();

    let file = File::open(&cli.file)?;
    let source = Source::from_reader(BufReader::new(file))?;
    let program = Parser::new(Lexer::new(source, limits.lexer))?.parse_program()?;

    let mut interpreter = Interpreter::new(limits).with_module(School::new());
    Ok(interpreter.run(&program)?)
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match execute(&cli) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}: {}", cli.file.display(), err);
            ExitCode::FAILURE
        }
    }
}
