use std::fmt;

use derive_more::Display;

use crate::common::Position;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    #[display(fmt = "integer")]
    Int,
    #[display(fmt = "float")]
    Float,
    #[display(fmt = "string")]
    String,
    #[display(fmt = "identifier")]
    Ident,
    #[display(fmt = "comment")]
    Comment,
    #[display(fmt = "end of input")]
    Eof,

    // keywords
    #[display(fmt = "'def'")]
    Def,
    #[display(fmt = "'if'")]
    If,
    #[display(fmt = "'else'")]
    Else,
    #[display(fmt = "'while'")]
    While,
    #[display(fmt = "'break'")]
    Break,
    #[display(fmt = "'return'")]
    Return,
    #[display(fmt = "'from'")]
    From,
    #[display(fmt = "'import'")]
    Import,
    #[display(fmt = "'true'")]
    True,
    #[display(fmt = "'false'")]
    False,
    #[display(fmt = "'and'")]
    And,
    #[display(fmt = "'or'")]
    Or,

    // symbols
    #[display(fmt = "'('")]
    LeftParen,
    #[display(fmt = "')'")]
    RightParen,
    #[display(fmt = "'{{'")]
    LeftBrace,
    #[display(fmt = "'}}'")]
    RightBrace,
    #[display(fmt = "'['")]
    LeftBracket,
    #[display(fmt = "']'")]
    RightBracket,
    #[display(fmt = "';'")]
    Semicolon,
    #[display(fmt = "','")]
    Comma,
    #[display(fmt = "'.'")]
    Dot,
    #[display(fmt = "'$'")]
    Dollar,
    #[display(fmt = "'=>'")]
    FatArrow,
    #[display(fmt = "'!'")]
    Bang,
    #[display(fmt = "'='")]
    Equal,

    // binary operators
    #[display(fmt = "'+'")]
    Plus,
    #[display(fmt = "'-'")]
    Minus,
    #[display(fmt = "'*'")]
    Star,
    #[display(fmt = "'/'")]
    Slash,

    #[display(fmt = "'<'")]
    Lesser,
    #[display(fmt = "'>'")]
    Greater,
    #[display(fmt = "'<='")]
    LesserEqual,
    #[display(fmt = "'>='")]
    GreaterEqual,
    #[display(fmt = "'=='")]
    EqualEqual,
    #[display(fmt = "'!='")]
    BangEqual,
}

impl TokenKind {
    pub fn from_keyword_str(name: &str) -> Option<TokenKind> {
        match name {
            "def" => Some(TokenKind::Def),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            "break" => Some(TokenKind::Break),
            "return" => Some(TokenKind::Return),
            "from" => Some(TokenKind::From),
            "import" => Some(TokenKind::Import),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "and" => Some(TokenKind::And),
            "or" => Some(TokenKind::Or),
            _ => None,
        }
    }

    pub fn from_single_char(c: char) -> Option<TokenKind> {
        match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            '[' => Some(TokenKind::LeftBracket),
            ']' => Some(TokenKind::RightBracket),
            ';' => Some(TokenKind::Semicolon),
            ',' => Some(TokenKind::Comma),
            '.' => Some(TokenKind::Dot),
            '$' => Some(TokenKind::Dollar),
            _ => None,
        }
    }

    pub fn is_prefix_op(&self) -> bool {
        matches!(*self, Self::Minus | Self::Bang)
    }

    pub fn is_comparitive_op(&self) -> bool {
        matches!(
            *self,
            Self::Lesser
                | Self::Greater
                | Self::LesserEqual
                | Self::GreaterEqual
                | Self::EqualEqual
                | Self::BangEqual
        )
    }
}

/// The literal payload some tokens carry.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Int(i64),
    Float(f64),
    /// String literal contents, identifier name, or comment text.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Token {
            kind,
            value: TokenValue::None,
            position,
        }
    }

    pub fn with_value(kind: TokenKind, value: TokenValue, position: Position) -> Self {
        Token {
            kind,
            value,
            position,
        }
    }

    /// The identifier name or string contents, empty for other tokens.
    pub fn text(&self) -> &str {
        match &self.value {
            TokenValue::Text(text) => text,
            _ => "",
        }
    }

    pub fn into_text(self) -> String {
        match self.value {
            TokenValue::Text(text) => text,
            _ => String::new(),
        }
    }
}

/// A list of token kinds rendered as `'(' or identifier`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expected(pub Vec<TokenKind>);

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " or ")?;
            }
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}
