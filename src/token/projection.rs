use super::{Reader, Token};

/// A backtracking view over another [`Reader`]. Pops are buffered locally
/// rather than applied to the parent; [`Projection::commit`] replays them
/// against the parent so it advances by exactly what this projection
/// consumed. Dropping a projection without committing leaves the parent
/// untouched, which is how [`crate::mib::pattern::Pattern::Choice`] tries
/// alternatives without corrupting the reader on failure.
pub struct Projection<'r, R: Reader + ?Sized> {
    parent: &'r mut R,
    buffered: Vec<Token>,
    offset: usize,
}

impl<'r, R: Reader + ?Sized> Projection<'r, R> {
    pub fn new(parent: &'r mut R) -> Self {
        Self {
            parent,
            buffered: Vec::new(),
            offset: 0,
        }
    }

    /// Tokens popped from this projection so far, in order.
    pub fn consumed(&self) -> &[Token] {
        &self.buffered[..self.offset.min(self.buffered.len())]
    }

    /// Replay every token this projection consumed against the parent
    /// reader, advancing it to match.
    pub fn commit(self) {
        let mut parent = self.parent;
        for _ in 0..self.offset {
            parent.pop();
        }
    }

    fn fetch(&mut self, n: usize) -> Token {
        while self.buffered.len() <= n {
            let next = if self.buffered.len() < self.offset {
                // Already consumed from parent's perspective within this
                // projection's own pop history — shouldn't happen since we
                // only ever append, kept for clarity.
                self.parent.pop()
            } else {
                self.parent.lookahead(self.buffered.len())
            };
            self.buffered.push(next);
        }
        self.buffered[n].clone()
    }
}

impl<'r, R: Reader + ?Sized> Reader for Projection<'r, R> {
    fn pop(&mut self) -> Token {
        let tok = self.fetch(self.offset);
        self.offset += 1;
        tok
    }

    fn lookahead(&mut self, n: usize) -> Token {
        self.fetch(self.offset + n)
    }

    fn source_name(&self) -> &str {
        self.parent.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Scanner, ScannerOptions};

    #[test]
    fn rollback_leaves_parent_untouched() {
        let mut scanner = Scanner::new("t", "a b c", ScannerOptions::default());
        {
            let mut proj = Projection::new(&mut scanner);
            assert_eq!(proj.pop().text, "a");
            assert_eq!(proj.pop().text, "b");
            // dropped without commit
        }
        assert_eq!(scanner.pop().text, "a");
    }

    #[test]
    fn commit_advances_parent() {
        let mut scanner = Scanner::new("t", "a b c", ScannerOptions::default());
        {
            let mut proj = Projection::new(&mut scanner);
            proj.pop();
            proj.pop();
            proj.commit();
        }
        assert_eq!(scanner.pop().text, "c");
    }
}
