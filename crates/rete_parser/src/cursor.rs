//! One-token-lookahead wrapper over a [`Scanner`].
//!
//! Every parser in this crate reads a token speculatively and, if it turns
//! out to belong to the next construct rather than the current one, pushes
//! it back. `Scanner::get_token` itself has no pushback, so this small
//! stack sits in front of it the way `GetToken`/`UngetToken` sit in front of
//! the scanner in the original sources.

use rete_base::{AtomInterner, Result};
use rete_scanner::{Scanner, Token};

/// Wraps a [`Scanner`] with an unbounded pushback stack.
pub struct TokenCursor<'a, 's> {
    scanner: &'a mut Scanner<'s>,
    pending: Vec<Token>,
}

impl<'a, 's> TokenCursor<'a, 's> {
    pub fn new(scanner: &'a mut Scanner<'s>) -> Self {
        TokenCursor {
            scanner,
            pending: Vec::new(),
        }
    }

    /// Reads the next token, consuming a pushed-back one first if present.
    pub fn next(&mut self, atoms: &mut AtomInterner) -> Result<Token> {
        if let Some(tok) = self.pending.pop() {
            return Ok(tok);
        }
        self.scanner.get_token(atoms)
    }

    /// Pushes a token back so the next call to [`Self::next`] returns it.
    /// Multiple tokens may be ungotten; they come back out in LIFO order.
    pub fn unget(&mut self, token: Token) {
        self.pending.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rete_scanner::TokenKind;

    #[test]
    fn unget_replays_the_same_token() {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new("(foo)");
        let mut cursor = TokenCursor::new(&mut scanner);
        let first = cursor.next(&mut atoms).unwrap();
        assert_eq!(first.kind, TokenKind::LParen);
        cursor.unget(first.clone());
        let replayed = cursor.next(&mut atoms).unwrap();
        assert_eq!(replayed.kind, first.kind);
        let second = cursor.next(&mut atoms).unwrap();
        assert!(matches!(second.kind, TokenKind::Symbol(_)));
    }

    #[test]
    fn multiple_ungets_replay_in_lifo_order() {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new("a b c");
        let mut cursor = TokenCursor::new(&mut scanner);
        let a = cursor.next(&mut atoms).unwrap();
        let b = cursor.next(&mut atoms).unwrap();
        cursor.unget(b.clone());
        cursor.unget(a.clone());
        assert_eq!(cursor.next(&mut atoms).unwrap().kind, a.kind);
        assert_eq!(cursor.next(&mut atoms).unwrap().kind, b.kind);
    }
}
