use derive_more::Display;

use crate::common::Position;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum RuntimeError {
    #[display(fmt = "{}: function '{}' does not exist", position, name)]
    FunctionDoesNotExist { name: String, position: Position },
    #[display(fmt = "program must define a function 'main' taking no arguments")]
    MainFunctionRequired,
    #[display(
        fmt = "{}: '{}' expects {} argument(s) but got {}",
        position,
        name,
        expected,
        found
    )]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        position: Position,
    },
    #[display(fmt = "{}: recursion limit of {} calls exceeded", position, limit)]
    RecursionLimitExceeded { limit: usize, position: Position },
    #[display(fmt = "{}: division by zero", position)]
    DivisionByZero { position: Position },
    #[display(
        fmt = "{}: unsupported operand types for '{}': {} and {}",
        position,
        op,
        left,
        right
    )]
    UnsupportedOperandTypes {
        op: &'static str,
        left: &'static str,
        right: &'static str,
        position: Position,
    },
    #[display(fmt = "{}: cannot negate a value of type {}", position, kind)]
    InvalidNegation { kind: &'static str, position: Position },
    #[display(fmt = "{}: '{}' expects booleans or numbers but got {}", position, op, kind)]
    InvalidLogicalOperand {
        op: &'static str,
        kind: &'static str,
        position: Position,
    },
    #[display(
        fmt = "{}: '{}' combines masks of different lengths ({} and {})",
        position,
        op,
        left,
        right
    )]
    MaskLengthMismatch {
        op: &'static str,
        left: usize,
        right: usize,
        position: Position,
    },
    #[display(fmt = "{}: variable '{}' is not defined", position, name)]
    UndefinedVariable { name: String, position: Position },
    #[display(fmt = "{}: 'break' outside of a loop", position)]
    BreakOutsideLoop { position: Position },
    #[display(fmt = "{}: {} has no member '{}'", position, owner, name)]
    MissingHostMember {
        owner: String,
        name: String,
        position: Position,
    },
    #[display(fmt = "{}: index {} is out of range for a list of length {}", position, index, len)]
    IndexOutOfRange {
        index: i64,
        len: usize,
        position: Position,
    },
    #[display(fmt = "{}: invalid argument to '{}': {}", position, function, reason)]
    InvalidArgument {
        function: &'static str,
        reason: String,
        position: Position,
    },
    #[display(fmt = "{}: string would be longer than {} bytes", position, max)]
    StringTooLong { max: usize, position: Position },
    #[display(fmt = "{}: integer overflow", position)]
    IntegerOverflow { position: Position },
    #[display(fmt = "{}: cannot read '{}' from a value of type {}", position, name, kind)]
    NotAnObject {
        name: String,
        kind: &'static str,
        position: Position,
    },
    #[display(fmt = "{}: '{}' does not take a lambda", position, name)]
    UnexpectedLambda { name: String, position: Position },
    #[display(fmt = "{}: '{}' expects a lambda argument", position, name)]
    ExpectedLambda { name: String, position: Position },
    #[display(fmt = "{}: no host module named '{}'", position, module)]
    UnknownModule { module: String, position: Position },
    #[display(fmt = "{}: {}", position, message)]
    HostFailure { message: String, position: Position },
    #[display(fmt = "{}: console i/o failed: {}", position, message)]
    Io { message: String, position: Position },
}

impl std::error::Error for RuntimeError {}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
