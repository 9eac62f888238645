//! Lexer producing token streams for a [`TerminalPack`].
//!
//! Terminals come out as their spelling, identifiers as
//! `<identifier code>.<table index>` and literals as
//! `<literal code>.<source text>`.

use crate::ident::IdentifierTable;
use crate::terminal::{TerminalPack, TerminalStyle};
use log::trace;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("line {line}, column {column}: unterminated string literal")]
    UnterminatedString { line: usize, column: usize },
    #[error("line {line}, column {column}: unexpected character '{found}'")]
    Unexpected {
        line: usize,
        column: usize,
        found: char,
    },
}

const BOOLEAN_LITERALS: [&str; 2] = ["true", "false"];

pub struct Lexer<'p> {
    pack: &'p TerminalPack,
}

impl<'p> Lexer<'p> {
    pub fn new(pack: &'p TerminalPack) -> Self {
        Lexer { pack }
    }

    /// Tokenize `src`, interning identifiers into `identifiers`.
    pub fn tokenize(&self, src: &str, identifiers: &mut IdentifierTable) -> Result<Vec<String>, LexError> {
        let mut tokens = Vec::new();
        for (line_index, line) in src.lines().enumerate() {
            self.tokenize_line(line, line_index + 1, identifiers, &mut tokens)?;
        }
        trace!(target: "lexis", "{} tokens", tokens.len());
        Ok(tokens)
    }

    fn tokenize_line(
        &self,
        line: &str,
        line_no: usize,
        identifiers: &mut IdentifierTable,
        tokens: &mut Vec<String>,
    ) -> Result<(), LexError> {
        let chars: Vec<char> = line.chars().collect();
        let mut pos = 0usize;

        while pos < chars.len() {
            let c = chars[pos];

            if c.is_whitespace() {
                pos += 1;
                continue;
            }

            // Quoted string, kept with its quotes
            if c == '\'' || c == '"' {
                let start = pos;
                pos += 1;
                while pos < chars.len() && chars[pos] != c {
                    pos += 1;
                }
                if pos >= chars.len() {
                    return Err(LexError::UnterminatedString {
                        line: line_no,
                        column: start + 1,
                    });
                }
                pos += 1;
                let text: String = chars[start..pos].iter().collect();
                tokens.push(self.pack.literal_token(&text));
                continue;
            }

            // Number with optional fraction
            if c.is_ascii_digit() {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                if pos + 1 < chars.len() && chars[pos] == '.' && chars[pos + 1].is_ascii_digit() {
                    pos += 1;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text: String = chars[start..pos].iter().collect();
                tokens.push(self.pack.literal_token(&text));
                continue;
            }

            // Word: keyword, boolean literal or identifier
            if c.is_alphabetic() || c == '_' {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                let keyword = self
                    .pack
                    .find_code(&word)
                    .filter(|&code| self.pack.style(code) == Some(TerminalStyle::Word));
                if keyword.is_some() {
                    tokens.push(word);
                } else if BOOLEAN_LITERALS.contains(&word.as_str()) {
                    tokens.push(self.pack.literal_token(&word));
                } else {
                    let index = identifiers.intern(&word);
                    tokens.push(self.pack.identifier_token(index));
                }
                continue;
            }

            // Punctuation, longest spelling first
            let rest: String = chars[pos..].iter().collect();
            match self
                .pack
                .spaced_terminals()
                .into_iter()
                .find(|t| rest.starts_with(t.text.as_str()))
            {
                Some(terminal) => {
                    pos += terminal.text.chars().count();
                    tokens.push(terminal.text.clone());
                }
                None => {
                    return Err(LexError::Unexpected {
                        line: line_no,
                        column: pos + 1,
                        found: c,
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> TerminalPack {
        TerminalPack::builder()
            .words(&["begin", "end"])
            .spaced_all(&[":", ":=", ";", "."])
            .build()
    }

    #[test]
    fn classifies_words_numbers_and_punctuation() {
        let pack = pack();
        let mut ids = IdentifierTable::new();
        let tokens = Lexer::new(&pack)
            .tokenize("begin x:=3.5; y := x ; end.", &mut ids)
            .unwrap();
        // identifier code 6, literal code 7
        assert_eq!(
            tokens,
            vec!["begin", "6.0", ":=", "7.3.5", ";", "6.1", ":=", "6.0", ";", "end", "."]
        );
        assert_eq!(ids.name(0), Some("x"));
        assert_eq!(ids.name(1), Some("y"));
    }

    #[test]
    fn strings_and_booleans_are_literals() {
        let pack = pack();
        let mut ids = IdentifierTable::new();
        let tokens = Lexer::new(&pack)
            .tokenize("'a b' true", &mut ids)
            .unwrap();
        assert_eq!(tokens, vec!["7.'a b'", "7.true"]);
        assert!(ids.is_empty());
    }

    #[test]
    fn reports_position_of_bad_input() {
        let pack = pack();
        let mut ids = IdentifierTable::new();
        let lexer = Lexer::new(&pack);
        assert_eq!(
            lexer.tokenize("begin\n  x ? y", &mut ids),
            Err(LexError::Unexpected {
                line: 2,
                column: 5,
                found: '?'
            })
        );
        assert_eq!(
            lexer.tokenize("'open", &mut ids),
            Err(LexError::UnterminatedString { line: 1, column: 1 })
        );
    }
}
