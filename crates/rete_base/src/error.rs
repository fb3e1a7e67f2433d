//! Error types with source location tracking.
//!
//! Every error in this workspace carries a [`Span`] indicating where in the
//! source text the error occurred, plus an [`ErrorKind`] distinguishing a
//! recoverable parse-time conflict from a fatal resource failure.
//!
//! # Example
//!
//! ```
//! use rete_base::{SpannedError, ErrorKind, Span, Result};
//!
//! fn parse_number(s: &str) -> Result<i32> {
//!     s.parse().map_err(|_| SpannedError::new(
//!         ErrorKind::Lexical,
//!         format!("invalid number: '{}'", s),
//!         Span::new(0, s.len()),
//!     ))
//! }
//!
//! let err = parse_number("abc").unwrap_err();
//! assert!(err.to_string().contains("invalid number"));
//! ```

use crate::span::Span;
use std::fmt;

/// Which layer of the error taxonomy an error belongs to.
///
/// Mirrors the six kinds distinguished by error-handling design: the first
/// four recover at varying granularity, `Arithmetic` sets an evaluation flag
/// and proceeds with a defined default, and `Resource`/`Invariant` are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unterminated string, malformed number, illegal character.
    Lexical,
    /// Unexpected token, missing parenthesis, name required where absent.
    Syntactic,
    /// Facet conflict, duplicate facet, port violation, redefinition error.
    Semantic,
    /// Allocation failure. Fatal.
    Resource,
    /// Division by zero, numeric overflow. Non-fatal; a defined default is used.
    Arithmetic,
    /// Internal invariant violated (refcount underflow, missing table entry).
    /// Fatal.
    Invariant,
}

impl ErrorKind {
    /// Whether this kind of error is expected to abort the enclosing process
    /// rather than be recovered by the caller.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Resource | ErrorKind::Invariant)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntactic => "syntactic",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Resource => "resource",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Invariant => "invariant",
        };
        f.write_str(s)
    }
}

/// An error annotated with its source location and taxonomy kind.
///
/// Implements [`std::error::Error`] and [`fmt::Display`]. The display format
/// is: `{kind}: {message} at {start}..{end}`.
#[derive(Debug, Clone)]
pub struct SpannedError {
    /// Which layer of the taxonomy this error belongs to.
    pub kind: ErrorKind,
    /// Human-readable error description.
    pub message: String,
    /// Location in source where the error occurred.
    pub span: Span,
}

impl SpannedError {
    /// Creates an error with the given kind, message, and source location.
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Shorthand for a [`ErrorKind::Lexical`] error.
    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Lexical, message, span)
    }

    /// Shorthand for a [`ErrorKind::Syntactic`] error.
    pub fn syntactic(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntactic, message, span)
    }

    /// Shorthand for a [`ErrorKind::Semantic`] error.
    pub fn semantic(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Semantic, message, span)
    }

    /// Shorthand for a [`ErrorKind::Arithmetic`] error.
    pub fn arithmetic(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Arithmetic, message, span)
    }

    /// Shorthand for a [`ErrorKind::Invariant`] error. Logs before returning,
    /// since invariant violations are fatal and the log line is the only
    /// record of what state was observed.
    pub fn invariant(message: impl Into<String>, span: Span) -> Self {
        let message = message.into();
        log::error!("invariant violated: {message}");
        Self::new(ErrorKind::Invariant, message, span)
    }
}

impl fmt::Display for SpannedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}..{}",
            self.kind, self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for SpannedError {}

/// Alias for `std::result::Result<T, SpannedError>`.
///
/// Use this as the return type for fallible operations throughout the
/// compilation pipeline.
pub type Result<T> = std::result::Result<T, SpannedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanned_error_display() {
        let err = SpannedError::lexical("test error", Span::new(5, 10));
        let display = format!("{}", err);
        assert!(display.contains("test error"));
        assert!(display.contains("5..10"));
        assert!(display.contains("lexical"));
    }

    #[test]
    fn resource_and_invariant_are_fatal() {
        assert!(ErrorKind::Resource.is_fatal());
        assert!(ErrorKind::Invariant.is_fatal());
        assert!(!ErrorKind::Arithmetic.is_fatal());
        assert!(!ErrorKind::Lexical.is_fatal());
        assert!(!ErrorKind::Syntactic.is_fatal());
        assert!(!ErrorKind::Semantic.is_fatal());
    }
}
