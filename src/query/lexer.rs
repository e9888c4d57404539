//! Lexer for match expressions
//!
//! Tokenizes expressions such as `first\ name < "last name"` into a flat
//! stream of tokens. Escapes are resolved here, so the parser only ever sees
//! literal values.
//!
//! Escape rules:
//! - `\x` outside quotes makes `x` part of the current word, whatever it is
//!   (`\&`, `\ `, `\\`, `\"`, ...)
//! - `\x` inside quotes makes `x` part of the string, so `\"` does not close it
//! - a `'` or `"` that starts a token opens a quoted string; elsewhere in a
//!   word a `'` is ordinary content

use serde::Serialize;
use std::fmt;

use crate::error::LexError;
use crate::Result;

/// Characters that form operator tokens when unescaped and unquoted
const OPERATOR_CHARS: [char; 6] = ['~', '<', '&', '|', '(', ')'];

/// Token types for match expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    /// A bare term, possibly containing escaped characters
    Word,
    /// A phrase between quotes
    QuotedString,

    /// `&`
    And,
    /// `|`
    Or,
    /// `~`
    Not,
    /// `<`
    Before,

    /// `(`
    LParen,
    /// `)`
    RParen,

    /// End of input
    End,
}

impl TokenKind {
    /// Check if this token carries a search term
    pub fn is_literal(self) -> bool {
        matches!(self, TokenKind::Word | TokenKind::QuotedString)
    }

    fn from_operator(ch: char) -> Option<Self> {
        match ch {
            '&' => Some(TokenKind::And),
            '|' => Some(TokenKind::Or),
            '~' => Some(TokenKind::Not),
            '<' => Some(TokenKind::Before),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Word => "word",
            TokenKind::QuotedString => "quoted string",
            TokenKind::And => "'&'",
            TokenKind::Or => "'|'",
            TokenKind::Not => "'~'",
            TokenKind::Before => "'<'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::End => "end of input",
        };
        f.write_str(name)
    }
}

/// A token with its position in the expression
///
/// `start` and `len` count characters, not bytes. For words and quoted
/// strings `lexeme` holds the unescaped value; for operators it holds the
/// operator character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub start: usize,
    pub len: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, start: usize, len: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            start,
            len,
        }
    }

    /// Offset one past the last character of this token
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Lexer for tokenizing match expressions
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token from the input
    ///
    /// Once the input is exhausted this keeps returning `End`.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        if self.is_eof() {
            return Ok(Token::new(TokenKind::End, "", self.position, 0));
        }

        let start = self.position;
        let ch = self.current_char();

        if let Some(kind) = TokenKind::from_operator(ch) {
            self.advance();
            return Ok(Token::new(kind, ch, start, 1));
        }

        match ch {
            '"' | '\'' => self.read_quoted_string(ch),
            _ if Self::is_forbidden(ch) => Err(LexError::UnexpectedCharacter {
                offset: start,
                found: ch,
            }),
            _ => self.read_word(),
        }
    }

    /// Tokenize the whole input, including the trailing `End` token
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::End;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Check if the lexer has reached the end of input
    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn read_word(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut word = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch == '\\' {
                word.push(self.read_escape()?);
            } else if Self::ends_word(ch) {
                break;
            } else {
                word.push(ch);
                self.advance();
            }
        }

        Ok(Token::new(TokenKind::Word, word, start, self.position - start))
    }

    fn read_quoted_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.position;
        self.advance(); // opening quote
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch == quote {
                self.advance();
                return Ok(Token::new(
                    TokenKind::QuotedString,
                    s,
                    start,
                    self.position - start,
                ));
            }
            if ch == '\\' {
                s.push(self.read_escape()?);
            } else {
                s.push(ch);
                self.advance();
            }
        }

        Err(LexError::UnterminatedString {
            offset: start,
            quote,
        })
    }

    /// Consume a backslash and the character it escapes
    fn read_escape(&mut self) -> Result<char, LexError> {
        let backslash = self.position;
        self.advance();
        if self.is_eof() {
            return Err(LexError::TrailingEscape { offset: backslash });
        }
        let escaped = self.current_char();
        self.advance();
        Ok(escaped)
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Check if an unescaped character terminates a word
    fn ends_word(ch: char) -> bool {
        ch.is_whitespace() || ch == '"' || OPERATOR_CHARS.contains(&ch) || Self::is_forbidden(ch)
    }

    /// Control characters are only allowed escaped or inside quotes
    fn is_forbidden(ch: char) -> bool {
        ch.is_control() && !ch.is_whitespace()
    }
}

/// Tokenize `input` into a vector ending with an `End` token
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}
