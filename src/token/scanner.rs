use super::{Error, Position, Reader, Token, TokenKind};

/// Reserved multi-word compounds fused into a single [`TokenKind::Ident`]
/// token when two adjacent identifiers match one of these pairs.
const COMPOUNDS: &[&str] = &[
    "OBJECT IDENTIFIER",
    "OCTET STRING",
    "SEQUENCE OF",
    "SET OF",
    "TYPE NOTATION",
    "VALUE NOTATION",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerOptions {
    pub skip_whitespace: bool,
    pub skip_comments: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            skip_whitespace: true,
            skip_comments: true,
        }
    }
}

/// Byte-at-a-time lexer with a small lookahead queue used for reserved-word
/// fusion (see [`COMPOUNDS`]).
pub struct Scanner {
    source: String,
    bytes: Vec<u8>,
    offset: usize,
    line: u32,
    col: u32,
    options: ScannerOptions,
    queue: std::collections::VecDeque<Token>,
}

impl Scanner {
    pub fn new(source: impl Into<String>, input: impl Into<String>, options: ScannerOptions) -> Self {
        let input = input.into();
        Self {
            source: source.into(),
            bytes: input.into_bytes(),
            offset: 0,
            line: 1,
            col: 1,
            options,
            queue: std::collections::VecDeque::new(),
        }
    }

    fn position(&self) -> Position {
        Position::new(self.source.clone(), self.line, self.col)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn raw_next(&mut self) -> Result<Token, Error> {
        let Some(b) = self.peek_byte() else {
            return Ok(Token::eof(self.position()));
        };
        match b {
            b' ' | b'\t' | b'\r' => self.scan_whitespace(),
            b'\n' => self.scan_whitespace(),
            b'0'..=b'9' | b'-' if self.is_number_start() => self.scan_number(),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.scan_ident(),
            b'\'' | b'"' => self.scan_string(),
            b'-' => self.scan_dash(),
            _ => self.scan_punct(),
        }
    }

    fn is_number_start(&self) -> bool {
        match self.peek_byte() {
            Some(b'-') => matches!(self.bytes.get(self.offset + 1), Some(b'0'..=b'9')),
            Some(b'0'..=b'9') => true,
            _ => false,
        }
    }

    fn scan_whitespace(&mut self) -> Result<Token, Error> {
        let start = self.position();
        let mut text = String::new();
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            text.push(self.advance().unwrap() as char);
        }
        Ok(Token::new(text, TokenKind::Whitespace, start))
    }

    fn scan_number(&mut self) -> Result<Token, Error> {
        let start = self.position();
        let mut text = String::new();
        if self.peek_byte() == Some(b'-') {
            text.push(self.advance().unwrap() as char);
        }
        while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
            text.push(self.advance().unwrap() as char);
        }
        Ok(Token::new(text, TokenKind::Number, start))
    }

    fn scan_ident(&mut self) -> Result<Token, Error> {
        let start = self.position();
        let mut text = String::new();
        while matches!(self.peek_byte(), Some(b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-')) {
            text.push(self.advance().unwrap() as char);
        }
        Ok(Token::new(text, TokenKind::Ident, start))
    }

    fn scan_string(&mut self) -> Result<Token, Error> {
        let start = self.position();
        let quote = self.advance().unwrap();
        let mut text = String::new();
        loop {
            match self.peek_byte() {
                None => {
                    return Err(Error::UnterminatedString { position: start });
                }
                Some(b) if b == quote => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.advance() {
                        Some(b'n') => text.push('\n'),
                        Some(b'r') => text.push('\r'),
                        Some(b't') => text.push('\t'),
                        Some(b'\\') => text.push('\\'),
                        Some(b'\'') => text.push('\''),
                        Some(b'"') => text.push('"'),
                        Some(other) => text.push(other as char),
                        None => return Err(Error::UnterminatedString { position: start }),
                    }
                }
                Some(b'\n') => {
                    // Multi-line strings collapse internal whitespace runs to one space.
                    while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                        self.advance();
                    }
                    if !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
                Some(_) => {
                    text.push(self.advance().unwrap() as char);
                }
            }
        }
        Ok(Token::new(text, TokenKind::String, start))
    }

    fn scan_dash(&mut self) -> Result<Token, Error> {
        let start = self.position();
        if self.bytes.get(self.offset + 1) == Some(&b'-') {
            self.advance();
            self.advance();
            let mut text = String::from("--");
            while !matches!(self.peek_byte(), None | Some(b'\n')) {
                text.push(self.advance().unwrap() as char);
            }
            return Ok(Token::new(text, TokenKind::Comment, start));
        }
        let b = self.advance().unwrap();
        Ok(Token::new((b as char).to_string(), TokenKind::Symbol, start))
    }

    fn scan_punct(&mut self) -> Result<Token, Error> {
        let start = self.position();
        if self.peek_byte() == Some(b':')
            && self.bytes.get(self.offset + 1) == Some(&b':')
            && self.bytes.get(self.offset + 2) == Some(&b'=')
        {
            self.advance();
            self.advance();
            self.advance();
            return Ok(Token::new("::=", TokenKind::Symbol, start));
        }
        let b = self.advance().unwrap();
        Ok(Token::new((b as char).to_string(), TokenKind::Symbol, start))
    }

    fn fill(&mut self) -> Result<(), Error> {
        loop {
            let tok = self.raw_next()?;
            let skip = matches!(
                tok.kind,
                TokenKind::Whitespace if self.options.skip_whitespace
            ) || matches!(
                tok.kind,
                TokenKind::Comment if self.options.skip_comments
            );
            let is_eof = tok.is_eof();
            if !skip {
                if let Some(prev) = self.queue.back() {
                    if prev.kind == TokenKind::Ident && tok.kind == TokenKind::Ident {
                        let fused = format!("{} {}", prev.text, tok.text);
                        if COMPOUNDS.iter().any(|c| c.eq_ignore_ascii_case(&fused)) {
                            let prev = self.queue.pop_back().unwrap();
                            self.queue
                                .push_back(Token::new(fused, TokenKind::Ident, prev.position));
                            if is_eof {
                                break;
                            }
                            continue;
                        }
                    }
                }
                self.queue.push_back(tok);
            }
            if is_eof {
                break;
            }
            // Keep at most two real tokens buffered: enough to detect a
            // fusion candidate without scanning unboundedly ahead.
            if self.queue.len() >= 2 {
                break;
            }
        }
        Ok(())
    }

    fn ensure(&mut self, n: usize) {
        while self.queue.len() <= n && self.queue.back().map(|t| !t.is_eof()).unwrap_or(true) {
            if self.fill().is_err() {
                break;
            }
        }
    }
}

impl Reader for Scanner {
    fn pop(&mut self) -> Token {
        self.ensure(1);
        self.queue
            .pop_front()
            .unwrap_or_else(|| Token::eof(self.position()))
    }

    fn lookahead(&mut self, n: usize) -> Token {
        self.ensure(n);
        self.queue
            .get(n)
            .cloned()
            .unwrap_or_else(|| Token::eof(self.position()))
    }

    fn source_name(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<String> {
        let mut s = Scanner::new("t", input, ScannerOptions::default());
        let mut out = Vec::new();
        loop {
            let t = s.pop();
            if t.is_eof() {
                break;
            }
            out.push(t.text);
        }
        out
    }

    #[test]
    fn fuses_reserved_compounds() {
        assert_eq!(tokens("OBJECT IDENTIFIER ::= { iso 3 }"), vec![
            "OBJECT IDENTIFIER", "::=", "{", "iso", "3", "}"
        ]);
    }

    #[test]
    fn skips_comments_and_whitespace() {
        assert_eq!(tokens("foo -- a comment\n  bar"), vec!["foo", "bar"]);
    }

    #[test]
    fn reads_negative_numbers_and_strings() {
        assert_eq!(tokens("-128 \"hi\\nthere\""), vec!["-128", "hi\nthere"]);
    }

    #[test]
    fn position_tracks_lines_and_columns() {
        let mut s = Scanner::new("t", "a\nb", ScannerOptions::default());
        let a = s.pop();
        assert_eq!((a.position.line, a.position.col), (1, 1));
        let b = s.pop();
        assert_eq!((b.position.line, b.position.col), (2, 1));
    }
}
