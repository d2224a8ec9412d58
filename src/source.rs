use std::io::Read;

use crate::common::Position;

/// Returned by [`Source::current`] once the input is exhausted.
pub const EOF: char = '\0';

/// A character cursor over script text.
///
/// `\r` and `\r\n` are both reported as a single `\n`. The position is that of
/// the character under the cursor.
#[derive(Debug, Clone)]
pub struct Source {
    chars: Vec<char>,
    current: usize,
    position: Position,
}

impl Source {
    pub fn from_str(source: &str) -> Self {
        Source::from_chars(source.chars().collect())
    }

    pub fn from_chars(chars: Vec<char>) -> Self {
        Source {
            chars,
            current: 0,
            position: Position::default(),
        }
    }

    /// Reads the whole of `reader`. This is the only fallible step of the cursor.
    pub fn from_reader(mut reader: impl Read) -> std::io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Source::from_str(&text))
    }

    pub fn at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    pub fn current(&self) -> char {
        match self.chars.get(self.current) {
            Some('\r') => '\n',
            Some(c) => *c,
            None => EOF,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn advance(&mut self) {
        if self.at_end() {
            return;
        }

        let leaving = self.current();
        let width = match (self.chars.get(self.current), self.chars.get(self.current + 1)) {
            (Some('\r'), Some('\n')) => 2,
            _ => 1,
        };
        self.current += width;

        if leaving == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut Source) -> Vec<(char, Position)> {
        let mut seen = Vec::new();
        while !source.at_end() {
            seen.push((source.current(), source.position()));
            source.advance();
        }
        seen
    }

    #[test]
    fn first_character_is_loaded_on_construction() {
        let source = Source::from_str("ab");
        assert_eq!(source.current(), 'a');
        assert_eq!(source.position(), Position::new(1, 1));
    }

    #[test]
    fn empty_input_is_immediately_at_end() {
        let mut source = Source::from_str("");
        assert!(source.at_end());
        assert_eq!(source.current(), EOF);
        source.advance();
        assert_eq!(source.current(), EOF);
    }

    #[test]
    fn newline_moves_to_next_line() {
        let mut source = Source::from_str("a\nbc");
        assert_eq!(
            drain(&mut source),
            vec![
                ('a', Position::new(1, 1)),
                ('\n', Position::new(1, 2)),
                ('b', Position::new(2, 1)),
                ('c', Position::new(2, 2)),
            ]
        );
    }

    #[test]
    fn carriage_returns_are_normalized() {
        let mut source = Source::from_str("a\r\nb\rc");
        let chars = drain(&mut source)
            .into_iter()
            .map(|(c, _)| c)
            .collect::<String>();
        assert_eq!(chars, "a\nb\nc");
        assert_eq!(source.position(), Position::new(3, 2));
    }

    #[test]
    fn reads_from_any_reader() {
        let source = Source::from_reader("xyz".as_bytes()).unwrap();
        assert_eq!(source.current(), 'x');
    }
}
