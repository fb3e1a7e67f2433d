//! Token vocabulary for the rule surface syntax.

use rete_base::{AtomRef, Span};

/// The recognized shape of one token. Literal and variable tokens carry an
/// [`AtomRef`] into whichever [`rete_base::AtomInterner`] table produced
/// them; delimiter and connective tokens carry no payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Symbol(AtomRef),
    String(AtomRef),
    InstanceName(AtomRef),
    Integer(AtomRef),
    Float(AtomRef),
    /// `?name` — single-field variable. The ref names the variable, not the
    /// leading `?`.
    SfVariable(AtomRef),
    /// `$?name` — multifield variable.
    MfVariable(AtomRef),
    /// `?` alone.
    SfWildcard,
    /// `$?` alone.
    MfWildcard,
    /// `?*name*` — a global variable reference; the asterisks are stripped
    /// before interning.
    GlobalVariable(AtomRef),
    /// `~` — constraint negation connective.
    Not,
    /// `|` — constraint disjunction connective.
    Or,
    /// `&` — constraint conjunction connective.
    And,
    /// End of input (also produced on NUL or an interrupt signal).
    Stop,
    /// A byte that could not begin any other token.
    Unknown(u8),
}

impl TokenKind {
    /// `true` for any of the four variable/wildcard forms.
    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            TokenKind::SfVariable(_)
                | TokenKind::MfVariable(_)
                | TokenKind::SfWildcard
                | TokenKind::MfWildcard
                | TokenKind::GlobalVariable(_)
        )
    }

    /// `true` for a scalar literal (symbol, string, instance name, integer,
    /// or float).
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Symbol(_)
                | TokenKind::String(_)
                | TokenKind::InstanceName(_)
                | TokenKind::Integer(_)
                | TokenKind::Float(_)
        )
    }
}

/// One scanned token: its kind, its source span, and its canonical spelling
/// for pretty-printing.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub print_form: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, print_form: impl Into<String>) -> Self {
        Token {
            kind,
            span,
            print_form: print_form.into(),
        }
    }
}
