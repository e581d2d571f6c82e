use crate::error::{DjmakeError, Result};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(Word),
    RedirectOut, // >
    Eof,
}

/// One whitespace-delimited word with its quotes removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub quoted: bool,
}

impl Word {
    pub fn bare(text: &str) -> Self {
        Self { text: text.to_string(), quoted: false }
    }
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    current_char: Option<char>,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input: input.chars().peekable(),
            current_char: None,
            column: 0,
        };
        lexer.advance();
        lexer
    }

    fn advance(&mut self) {
        self.current_char = self.input.next();
        self.column += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, quote_char: char, word: &mut String) -> Result<()> {
        let start = self.column;
        self.advance(); // Skip opening quote

        while let Some(ch) = self.current_char {
            if ch == quote_char {
                self.advance(); // Skip closing quote
                return Ok(());
            } else if ch == '\\' && quote_char == '"' {
                self.advance();
                match self.current_char {
                    Some(escaped @ ('"' | '\\')) => {
                        word.push(escaped);
                        self.advance();
                    }
                    _ => word.push('\\'),
                }
            } else {
                word.push(ch);
                self.advance();
            }
        }

        Err(DjmakeError::Template(format!(
            "unterminated {} quote starting at column {}",
            quote_char, start
        )))
    }

    fn read_word(&mut self) -> Result<Word> {
        let mut text = String::new();
        let mut quoted = false;

        while let Some(ch) = self.current_char {
            match ch {
                '\'' | '"' => {
                    quoted = true;
                    self.read_string(ch, &mut text)?;
                }
                '>' => break,
                ch if ch.is_whitespace() => break,
                _ => {
                    text.push(ch);
                    self.advance();
                }
            }
        }

        Ok(Word { text, quoted })
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        match self.current_char {
            None => Ok(Token::Eof),
            Some('>') => {
                self.advance();
                Ok(Token::RedirectOut)
            }
            Some(_) => Ok(Token::Word(self.read_word()?)),
        }
    }

    /// Lexes the whole input, excluding the trailing `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            match self.next_token()? {
                Token::Eof => return Ok(tokens),
                token => tokens.push(token),
            }
        }
    }
}
