use super::{Position, Reader, Token, TokenKind};

/// A materialized, already-scanned run of tokens. Produced by
/// [`super::read_until`]/[`super::read_block`] when a definition's metadata
/// must be captured verbatim and re-read later (once its governing macro has
/// been compiled).
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    source: String,
    tokens: Vec<Token>,
    offset: usize,
}

impl TokenList {
    pub fn new(source: String, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len() - self.offset.min(self.tokens.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clone_reader(&self) -> Self {
        self.clone()
    }

    fn eof_position(&self) -> Position {
        self.tokens
            .last()
            .map(|t| t.position.clone())
            .unwrap_or_else(|| Position::eof(self.source.clone()))
    }
}

impl Reader for TokenList {
    fn pop(&mut self) -> Token {
        if let Some(t) = self.tokens.get(self.offset) {
            self.offset += 1;
            t.clone()
        } else {
            Token::eof(self.eof_position())
        }
    }

    fn lookahead(&mut self, n: usize) -> Token {
        self.tokens
            .get(self.offset + n)
            .cloned()
            .unwrap_or_else(|| Token::eof(self.eof_position()))
    }

    fn source_name(&self) -> &str {
        &self.source
    }
}

impl TokenList {
    /// Iterate the remaining tokens without consuming them, skipping any
    /// further filtering — used by pattern construction to inspect a macro
    /// field body structurally.
    pub fn remaining(&self) -> &[Token] {
        &self.tokens[self.offset.min(self.tokens.len())..]
    }

    pub fn kind_at(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.offset + n).map(|t| t.kind)
    }
}
