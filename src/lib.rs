//! `tarn`, a small dynamically typed scripting language.
//!
//! Source text flows through [`source::Source`], [`lexer::Lexer`] and
//! [`parser::Parser`] into an [`ast::Program`], which an
//! [`interpreter::Interpreter`] executes starting at `main`.
//!
//! ```text
//! from school import Student;
//!
//! def main() {
//!     s = Student("Ada", 36);
//!     print(s.greet());
//! }
//! ```

pub mod ast;
pub mod common;
pub mod config;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod stack;
pub mod token;

pub use common::{Error, Position};
pub use config::{LexerLimits, Limits};
pub use interpreter::{Interpreter, RuntimeError, Value};
pub use parser::ParseError;

use ast::Program;
use host::school::School;
use lexer::Lexer;
use parser::Parser;
use source::Source;

/// Parses a whole program with the default lexer limits.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    parse_with(source, &LexerLimits::default())
}

pub fn parse_with(source: &str, limits: &LexerLimits) -> Result<Program, ParseError> {
    let lexer = Lexer::new(Source::from_str(source), *limits);
    Parser::new(lexer)?.parse_program()
}

/// Runs `program` in a fresh interpreter with the default limits and the
/// `school` host module.
pub fn run(program: &Program) -> Result<Value, RuntimeError> {
    Interpreter::new(Limits::default())
        .with_module(School::new())
        .run(program)
}

pub fn run_source(source: &str) -> Result<Value, Error> {
    let program = parse(source)?;
    Ok(run(&program)?)
}
