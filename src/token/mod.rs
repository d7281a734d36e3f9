//! Tokenizer: byte stream to a lazy, restartable sequence of positioned tokens.

mod list;
mod projection;
mod scanner;

pub use list::TokenList;
pub use projection::Projection;
pub use scanner::{Scanner, ScannerOptions};

use std::fmt;

/// A location within a named source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub source: String,
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn new(source: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            source: source.into(),
            line,
            col,
        }
    }

    /// The sentinel position used for tokens synthesized past end-of-input.
    pub fn eof(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            line: 0,
            col: 0,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.line == 0 && self.col == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            write!(f, "{}:EOF", self.source)
        } else {
            write!(f, "{}:{}:{}", self.source, self.line, self.col)
        }
    }
}

/// The lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    Comment,
    Ident,
    Number,
    String,
    Symbol,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, position: Position) -> Self {
        Self {
            text: text.into(),
            kind,
            position,
        }
    }

    pub fn eof(position: Position) -> Self {
        Self {
            text: String::new(),
            kind: TokenKind::Eof,
            position,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// True if this token's text matches `s` exactly, case-sensitively.
    pub fn is(&self, s: &str) -> bool {
        self.text == s
    }

    /// Case-insensitive match, used for ASN.1 reserved words that some
    /// MIB authors write inconsistently (`BEGIN`/`begin`).
    pub fn is_ci(&self, s: &str) -> bool {
        self.text.eq_ignore_ascii_case(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{position}: unterminated string")]
    UnterminatedString { position: Position },
    #[error("{position}: unterminated block starting with {open:?}")]
    UnterminatedBlock { position: Position, open: String },
    #[error("{position}: unexpected byte {byte:#04x}")]
    UnexpectedByte { position: Position, byte: u8 },
    #[error("{position}: expected {expected:?}, found {found:?}")]
    Expected {
        position: Position,
        expected: String,
        found: String,
    },
    #[error("{position}: unexpected end of input, expected {expected:?}")]
    UnexpectedEof { position: Position, expected: String },
}

impl Error {
    pub fn position(&self) -> &Position {
        match self {
            Error::UnterminatedString { position }
            | Error::UnterminatedBlock { position, .. }
            | Error::UnexpectedByte { position, .. }
            | Error::Expected { position, .. }
            | Error::UnexpectedEof { position, .. } => position,
        }
    }
}

/// Shared behavior of anything that can hand out tokens: the live [`Scanner`],
/// a materialized [`TokenList`], and a backtracking [`Projection`] over either.
pub trait Reader {
    fn pop(&mut self) -> Token;
    fn lookahead(&mut self, n: usize) -> Token;
    fn is_eof(&mut self) -> bool {
        self.lookahead(0).is_eof()
    }
    fn source_name(&self) -> &str;
}

/// Consume tokens up to (not including) one whose text equals `text`.
/// The terminator itself is left unconsumed.
pub fn read_until<R: Reader + ?Sized>(reader: &mut R, text: &str) -> TokenList {
    let mut out = Vec::new();
    loop {
        let next = reader.lookahead(0);
        if next.is_eof() || next.is(text) {
            break;
        }
        out.push(reader.pop());
    }
    TokenList::new(reader.source_name().to_string(), out)
}

/// Pop tokens whose text equals each of `expected` in order, failing fast.
pub fn read_expected<R: Reader + ?Sized>(reader: &mut R, expected: &[&str]) -> Result<(), Error> {
    for want in expected {
        let tok = reader.pop();
        if tok.is_eof() {
            return Err(Error::UnexpectedEof {
                position: tok.position,
                expected: (*want).to_string(),
            });
        }
        if !tok.is(want) {
            return Err(Error::Expected {
                position: tok.position,
                expected: (*want).to_string(),
                found: tok.text,
            });
        }
    }
    Ok(())
}

/// Consume a bracketed block starting with `open`, returning its contents
/// (not including the brackets) with correct handling of nested `open`/`close`.
pub fn read_block<R: Reader + ?Sized>(
    reader: &mut R,
    open: &str,
    close: &str,
) -> Result<TokenList, Error> {
    let first = reader.pop();
    if !first.is(open) {
        return Err(Error::Expected {
            position: first.position,
            expected: open.to_string(),
            found: first.text,
        });
    }
    let mut depth = 1usize;
    let mut out = Vec::new();
    loop {
        let tok = reader.pop();
        if tok.is_eof() {
            return Err(Error::UnterminatedBlock {
                position: first.position,
                open: open.to_string(),
            });
        }
        if tok.is(open) && open != close {
            depth += 1;
        } else if tok.is(close) {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
        out.push(tok);
    }
    Ok(TokenList::new(reader.source_name().to_string(), out))
}
