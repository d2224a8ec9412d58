//! Tunable limits for the lexer and the evaluator.

/// Default ceiling on nested user-function activations.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Default ceiling on the length of a string literal or a computed string.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerLimits {
    /// Largest integer literal accepted.
    pub max_integer: i64,
    /// Most digits allowed after the decimal point of a float literal.
    pub max_fraction_digits: usize,
    pub max_identifier_length: usize,
    pub max_string_length: usize,
    /// Deepest nesting of blocks, parenthesized expressions and prefix
    /// operators the parser accepts.
    pub max_nesting_depth: usize,
}

impl Default for LexerLimits {
    fn default() -> Self {
        LexerLimits {
            max_integer: i64::MAX,
            max_fraction_digits: 15,
            max_identifier_length: 40,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_nesting_depth: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub lexer: LexerLimits,
    pub max_recursion_depth: usize,
    /// Longest string `*` and `+` may build at run time.
    pub max_string_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            lexer: LexerLimits::default(),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
        }
    }
}
