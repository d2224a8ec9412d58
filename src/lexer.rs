use derive_more::Display;
use unicode_xid::UnicodeXID;

use crate::{
    common::Position,
    config::LexerLimits,
    source::Source,
    token::{Token, TokenKind, TokenValue},
};

#[derive(Debug, Display, Clone, PartialEq)]
pub enum LexError {
    #[display(fmt = "{}: no token starts with {:?}", position, found)]
    NoViableToken { found: char, position: Position },
    #[display(fmt = "{}: identifier is longer than {} characters", position, max)]
    IdentifierTooLong { max: usize, position: Position },
    #[display(fmt = "{}: integer literal exceeds {}", position, max)]
    IntegerTooLarge { max: i64, position: Position },
    #[display(fmt = "{}: float literal has more than {} fractional digits", position, max)]
    FloatTooLong { max: usize, position: Position },
    #[display(fmt = "{}: expected a digit after the decimal point", position)]
    FloatMalformed { position: Position },
    #[display(fmt = "{}: unterminated string literal", position)]
    UnterminatedString { position: Position },
    #[display(fmt = "{}: string literal is longer than {} characters", position, max)]
    StringTooLong { max: usize, position: Position },
}

impl std::error::Error for LexError {}

// Second characters that turn a one-character operator into a two-character one.
const BANG_PAIRS: &[(char, TokenKind)] = &[('=', TokenKind::BangEqual)];
const EQUAL_PAIRS: &[(char, TokenKind)] =
    &[('=', TokenKind::EqualEqual), ('>', TokenKind::FatArrow)];
const LESSER_PAIRS: &[(char, TokenKind)] = &[('=', TokenKind::LesserEqual)];
const GREATER_PAIRS: &[(char, TokenKind)] = &[('=', TokenKind::GreaterEqual)];

fn escaped(c: char) -> Option<char> {
    match c {
        '\\' => Some('\\'),
        '"' => Some('"'),
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{08}'),
        'f' => Some('\u{0c}'),
        'v' => Some('\u{0b}'),
        'a' => Some('\u{07}'),
        _ => None,
    }
}

/// Pulls positioned tokens out of a [`Source`] one at a time.
#[derive(Debug, Clone)]
pub struct Lexer {
    source: Source,
    limits: LexerLimits,
}

impl Lexer {
    pub fn new(source: Source, limits: LexerLimits) -> Self {
        Lexer { source, limits }
    }

    pub fn from_str(source: &str) -> Self {
        Lexer::new(Source::from_str(source), LexerLimits::default())
    }

    pub fn limits(&self) -> &LexerLimits {
        &self.limits
    }

    fn skip_whitespace(&mut self) {
        while !self.source.at_end() && self.source.current().is_whitespace() {
            self.source.advance();
        }
    }

    /// Produces the next token. Once the input is exhausted every call
    /// returns an `Eof` token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let position = self.source.position();
        if self.source.at_end() {
            return Ok(Token::new(TokenKind::Eof, position));
        }

        let c = self.source.current();
        if c.is_ascii_digit() {
            return self.lex_number(position);
        }
        if c == '"' {
            return self.lex_string(position);
        }
        if c.is_xid_start() {
            return self.lex_ident(position);
        }
        if let Some(kind) = TokenKind::from_single_char(c) {
            self.source.advance();
            return Ok(Token::new(kind, position));
        }
        if let Some(token) = self.lex_operator(position) {
            return Ok(token);
        }
        if c == '#' {
            return Ok(self.lex_comment(position));
        }

        Err(LexError::NoViableToken { found: c, position })
    }

    /// Lexes the whole input, the final token being `Eof`.
    pub fn lex(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn lex_number(&mut self, position: Position) -> Result<Token, LexError> {
        let max = self.limits.max_integer;
        let mut value: i64 = 0;

        while let Some(digit) = self.source.current().to_digit(10) {
            value = value
                .checked_mul(10)
                .and_then(|value| value.checked_add(i64::from(digit)))
                .filter(|value| *value <= max)
                .ok_or(LexError::IntegerTooLarge { max, position })?;
            self.source.advance();
        }

        if self.source.current() != '.' {
            return Ok(Token::with_value(TokenKind::Int, TokenValue::Int(value), position));
        }
        self.source.advance();

        let mut fraction = String::new();
        while self.source.current().is_ascii_digit() {
            if fraction.len() == self.limits.max_fraction_digits {
                return Err(LexError::FloatTooLong {
                    max: self.limits.max_fraction_digits,
                    position,
                });
            }
            fraction.push(self.source.current());
            self.source.advance();
        }

        if fraction.is_empty() {
            // `1.;` is accepted as `1.0`
            if self.source.current() == ';' {
                return Ok(Token::with_value(
                    TokenKind::Float,
                    TokenValue::Float(value as f64),
                    position,
                ));
            }
            return Err(LexError::FloatMalformed {
                position: self.source.position(),
            });
        }

        let float = format!("{}.{}", value, fraction)
            .parse::<f64>()
            .map_err(|_| LexError::FloatMalformed { position })?;
        Ok(Token::with_value(TokenKind::Float, TokenValue::Float(float), position))
    }

    fn lex_string(&mut self, position: Position) -> Result<Token, LexError> {
        self.source.advance(); // skip the opening: "

        let max = self.limits.max_string_length;
        let mut text = String::new();
        let mut length = 0;

        loop {
            if self.source.at_end() || self.source.current() == '\n' {
                return Err(LexError::UnterminatedString { position });
            }

            let c = self.source.current();
            if c == '"' {
                self.source.advance();
                break;
            }

            if length == max {
                return Err(LexError::StringTooLong { max, position });
            }

            if c == '\\' {
                self.source.advance();
                if self.source.at_end() || self.source.current() == '\n' {
                    return Err(LexError::UnterminatedString { position });
                }
                let escape = self.source.current();
                match escaped(escape) {
                    Some(replacement) => text.push(replacement),
                    None => {
                        text.push('\\');
                        text.push(escape);
                    }
                }
            } else {
                text.push(c);
            }

            length += 1;
            self.source.advance();
        }

        Ok(Token::with_value(TokenKind::String, TokenValue::Text(text), position))
    }

    fn lex_ident(&mut self, position: Position) -> Result<Token, LexError> {
        let max = self.limits.max_identifier_length;
        let mut name = String::new();
        let mut length = 0;

        while !self.source.at_end() && self.source.current().is_xid_continue() {
            if length == max {
                return Err(LexError::IdentifierTooLong { max, position });
            }
            name.push(self.source.current());
            length += 1;
            self.source.advance();
        }

        Ok(match TokenKind::from_keyword_str(&name) {
            Some(keyword_kind) => Token::new(keyword_kind, position),
            None => Token::with_value(TokenKind::Ident, TokenValue::Text(name), position),
        })
    }

    fn lex_operator(&mut self, position: Position) -> Option<Token> {
        let (single, pairs) = match self.source.current() {
            '!' => (TokenKind::Bang, BANG_PAIRS),
            '=' => (TokenKind::Equal, EQUAL_PAIRS),
            '<' => (TokenKind::Lesser, LESSER_PAIRS),
            '>' => (TokenKind::Greater, GREATER_PAIRS),
            _ => return None,
        };
        self.source.advance();

        let second = self.source.current();
        let kind = match pairs.iter().find(|(c, _)| *c == second) {
            Some((_, kind)) => {
                self.source.advance();
                *kind
            }
            None => single,
        };

        Some(Token::new(kind, position))
    }

    fn lex_comment(&mut self, position: Position) -> Token {
        self.source.advance(); // skip the: #

        let mut text = String::new();
        while !self.source.at_end() && self.source.current() != '\n' {
            text.push(self.source.current());
            self.source.advance();
        }

        Token::with_value(TokenKind::Comment, TokenValue::Text(text), position)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::from_str(source)
            .lex()
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn single(source: &str) -> Result<Token, LexError> {
        Lexer::from_str(source).next_token()
    }

    fn limited(source: &str, limits: LexerLimits) -> Result<Token, LexError> {
        Lexer::new(Source::from_str(source), limits).next_token()
    }

    #[test]
    fn function_definition_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("def main() { return 1; }"),
            vec![
                Def, Ident, LeftParen, RightParen, LeftBrace, Return, Int, Semicolon, RightBrace,
                Eof
            ]
        );
    }

    #[test]
    fn two_character_operators_fall_back_to_one() {
        use TokenKind::*;
        assert_eq!(
            kinds("! != = == => < <= > >="),
            vec![
                Bang,
                BangEqual,
                Equal,
                EqualEqual,
                FatArrow,
                Lesser,
                LesserEqual,
                Greater,
                GreaterEqual,
                Eof
            ]
        );
        assert_eq!(kinds("=<"), vec![Equal, Lesser, Eof]);
    }

    #[test]
    fn lambda_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("xs.where($x => { return x; })"),
            vec![
                Ident, Dot, Ident, LeftParen, Dollar, Ident, FatArrow, LeftBrace, Return, Ident,
                Semicolon, RightBrace, RightParen, Eof
            ]
        );
    }

    #[test]
    fn keywords_are_not_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("if else while break return from import true false and or define"),
            vec![If, Else, While, Break, Return, From, Import, True, False, And, Or, Ident, Eof]
        );
    }

    #[test]
    fn comments_are_returned_as_tokens() {
        let tokens = Lexer::from_str("x # trailing note\ny").lex().unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text(), " trailing note");
        assert_eq!(tokens[2].text(), "y");
        assert_eq!(tokens[2].position, Position::new(2, 1));
    }

    #[test]
    fn tokens_carry_their_start_position() {
        let tokens = Lexer::from_str("a  <=\n  42").lex().unwrap();
        let positions = tokens.iter().map(|t| t.position).collect::<Vec<_>>();
        assert_eq!(
            positions,
            vec![
                Position::new(1, 1),
                Position::new(1, 4),
                Position::new(2, 3),
                Position::new(2, 5)
            ]
        );
    }

    #[test]
    fn integer_literal() {
        assert_eq!(single("1234").unwrap().value, TokenValue::Int(1234));
        assert_eq!(single("007").unwrap().value, TokenValue::Int(7));
    }

    #[test]
    fn integer_literal_beyond_limit() {
        let limits = LexerLimits {
            max_integer: 1000,
            ..LexerLimits::default()
        };
        assert!(limited("1000", limits).is_ok());
        assert!(matches!(
            limited("1001", limits),
            Err(LexError::IntegerTooLarge { max: 1000, .. })
        ));
        assert!(matches!(
            single("9223372036854775808"),
            Err(LexError::IntegerTooLarge { .. })
        ));
    }

    #[test]
    fn float_literal() {
        assert_eq!(single("3.25").unwrap().value, TokenValue::Float(3.25));
        assert_eq!(single("0.5").unwrap().kind, TokenKind::Float);
    }

    #[test]
    fn float_literal_before_terminator() {
        use TokenKind::*;
        assert_eq!(kinds("1.;"), vec![Float, Semicolon, Eof]);
        assert_eq!(single("2.;").unwrap().value, TokenValue::Float(2.0));
    }

    #[test]
    fn float_literal_without_fraction() {
        assert_eq!(
            single("1.x"),
            Err(LexError::FloatMalformed {
                position: Position::new(1, 3)
            })
        );
    }

    #[test]
    fn float_literal_with_too_many_digits() {
        let limits = LexerLimits {
            max_fraction_digits: 3,
            ..LexerLimits::default()
        };
        assert!(limited("1.123", limits).is_ok());
        assert!(matches!(
            limited("1.1234", limits),
            Err(LexError::FloatTooLong { max: 3, .. })
        ));
    }

    #[test]
    fn string_escapes() {
        let token = single(r#""a\"b\\c\nd\te\q""#).unwrap();
        assert_eq!(token.text(), "a\"b\\c\nd\te\\q");

        let token = single(r#""\r\b\f\v\a""#).unwrap();
        assert_eq!(token.text(), "\r\u{08}\u{0c}\u{0b}\u{07}");
    }

    #[test]
    fn unterminated_strings() {
        let start = Position::new(1, 1);
        assert_eq!(
            single("\"abc"),
            Err(LexError::UnterminatedString { position: start })
        );
        assert_eq!(
            single("\"ab\ncd\""),
            Err(LexError::UnterminatedString { position: start })
        );
        assert_eq!(
            single("\"ab\\"),
            Err(LexError::UnterminatedString { position: start })
        );
    }

    #[test]
    fn string_longer_than_limit() {
        let limits = LexerLimits {
            max_string_length: 3,
            ..LexerLimits::default()
        };
        assert!(limited("\"abc\"", limits).is_ok());
        assert!(matches!(
            limited("\"abcd\"", limits),
            Err(LexError::StringTooLong { max: 3, .. })
        ));
    }

    #[test]
    fn identifier_longer_than_limit() {
        let limits = LexerLimits {
            max_identifier_length: 4,
            ..LexerLimits::default()
        };
        assert_eq!(limited("abcd", limits).unwrap().text(), "abcd");
        assert!(matches!(
            limited("abcde", limits),
            Err(LexError::IdentifierTooLong { max: 4, .. })
        ));
    }

    #[test]
    fn identifiers_mix_letters_and_digits() {
        assert_eq!(single("student2 ").unwrap().text(), "student2");
        assert_eq!(single("zażółć").unwrap().text(), "zażółć");
    }

    #[test]
    fn unknown_character() {
        assert_eq!(
            Lexer::from_str("x @").lex(),
            Err(LexError::NoViableToken {
                found: '@',
                position: Position::new(1, 3)
            })
        );
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::from_str("  ");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }

    proptest! {
        #[test]
        fn integers_within_limit_survive_lexing(n in 0..=i64::MAX) {
            let token = single(&n.to_string()).unwrap();
            prop_assert_eq!(token.value, TokenValue::Int(n));
        }

        #[test]
        fn integers_beyond_limit_always_fail(max in 0..1_000_000i64, excess in 1..1_000_000i64) {
            let limits = LexerLimits { max_integer: max, ..LexerLimits::default() };
            let result = limited(&(max + excess).to_string(), limits);
            let is_too_large = matches!(result, Err(LexError::IntegerTooLarge { .. }));
            prop_assert!(is_too_large);
        }
    }
}
