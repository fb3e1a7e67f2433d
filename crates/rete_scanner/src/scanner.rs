//! Character-stream scanner.
//!
//! [`Scanner::get_token`] is the sole consumer operation: it skips
//! whitespace and `;`-to-end-of-line comments, reads exactly one token,
//! appends its canonical spelling to the pretty-print buffer, and leaves the
//! next character waiting. Token recognition order matters and follows a
//! fixed priority: letters/high-bit bytes start a symbol, digit/sign/dot
//! characters attempt a number and fall back to a symbol on failure,
//! quotes start a string, `?`/`$?` start a variable or wildcard, and the
//! single-character tokens are tried last.

use crate::token::{Token, TokenKind};
use rete_base::{AtomInterner, ErrorKind, Result, Span, SpannedError};

/// Scans one logical character stream into a token sequence.
///
/// A `Scanner` does not own an [`AtomInterner`]; one is threaded through
/// each call to [`Scanner::get_token`] so that callers can share a single
/// interner across many scanners (e.g. one per `(batch)`-loaded file).
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    pp_buffer: String,
    /// Numeric overflow is a warning unless the environment is configured
    /// strict, in which case it is promoted to an error.
    pub strict_numeric_overflow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberPhase {
    Sign,
    Integral,
    FractionIntro,
    Fraction,
    ExpIntro,
    ExpSign,
    ExpValue,
}

fn is_symbol_start(b: u8) -> bool {
    !matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b'"' | b';')
}

fn is_symbol_continue(b: u8) -> bool {
    is_symbol_start(b)
}

fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            pp_buffer: String::new(),
            strict_numeric_overflow: false,
        }
    }

    /// Everything scanned so far, verbatim (instance names re-wrapped in
    /// `[` `]`), for echoing source back to a router.
    pub fn pp_buffer(&self) -> &str {
        &self.pp_buffer
    }

    pub fn reset_pp_buffer(&mut self) {
        self.pp_buffer.clear();
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.pos += 1;
                }
                Some(b';') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn record(&mut self, print_form: &str) {
        self.pp_buffer.push_str(print_form);
    }

    /// Reads exactly one token, advancing the stream past it.
    pub fn get_token(&mut self, atoms: &mut AtomInterner) -> Result<Token> {
        self.skip_whitespace_and_comments();
        let start = self.pos;

        let Some(b) = self.peek() else {
            return Ok(Token::new(TokenKind::Stop, Span::new(start, start), ""));
        };

        match b {
            b'(' => {
                self.pos += 1;
                self.record("(");
                Ok(Token::new(TokenKind::LParen, Span::new(start, self.pos), "("))
            }
            b')' => {
                self.pos += 1;
                self.record(")");
                Ok(Token::new(TokenKind::RParen, Span::new(start, self.pos), ")"))
            }
            b'~' => {
                self.pos += 1;
                self.record("~");
                Ok(Token::new(TokenKind::Not, Span::new(start, self.pos), "~"))
            }
            b'|' => {
                self.pos += 1;
                self.record("|");
                Ok(Token::new(TokenKind::Or, Span::new(start, self.pos), "|"))
            }
            b'&' => {
                self.pos += 1;
                self.record("&");
                Ok(Token::new(TokenKind::And, Span::new(start, self.pos), "&"))
            }
            b'"' => self.scan_string(atoms, start),
            b'?' => self.scan_variable(atoms, start, false),
            b'$' if self.peek_at(1) == Some(b'?') => self.scan_variable(atoms, start, true),
            b'0'..=b'9' => self.scan_number_or_symbol(atoms, start),
            b'+' | b'-' | b'.' => self.scan_number_or_symbol(atoms, start),
            b'[' => self.scan_instance_name(atoms, start),
            _ if is_symbol_start(b) => self.scan_symbol(atoms, start),
            _ => {
                self.pos += 1;
                let ch = b as char;
                self.record(&ch.to_string());
                Ok(Token::new(
                    TokenKind::Unknown(b),
                    Span::new(start, self.pos),
                    ch.to_string(),
                ))
            }
        }
    }

    fn scan_instance_name(&mut self, atoms: &mut AtomInterner, start: usize) -> Result<Token> {
        self.pos += 1; // consume '['
        let name_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b']' {
                break;
            }
            self.pos += 1;
        }
        if self.peek() != Some(b']') {
            return Err(SpannedError::lexical(
                "unterminated instance name: missing ']'",
                Span::new(start, self.pos),
            ));
        }
        let name = &self.source[name_start..self.pos];
        self.pos += 1; // consume ']'
        let r = atoms.add_instance_name(name);
        let print_form = format!("[{name}]");
        self.record(&print_form);
        Ok(Token::new(
            TokenKind::InstanceName(r),
            Span::new(start, self.pos),
            print_form,
        ))
    }

    fn scan_string(&mut self, atoms: &mut AtomInterner, start: usize) -> Result<Token> {
        self.pos += 1; // consume opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(SpannedError::lexical(
                        "unterminated string literal",
                        Span::new(start, self.pos),
                    ));
                }
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(escaped) => value.push(escaped as char),
                    None => {
                        return Err(SpannedError::lexical(
                            "unterminated string literal after escape",
                            Span::new(start, self.pos),
                        ));
                    }
                },
                Some(b) => value.push(b as char),
            }
        }
        let r = atoms.add_string(&value);
        let print_form = self.source[start..self.pos].to_string();
        self.record(&print_form);
        Ok(Token::new(
            TokenKind::String(r),
            Span::new(start, self.pos),
            print_form,
        ))
    }

    fn scan_variable(
        &mut self,
        atoms: &mut AtomInterner,
        start: usize,
        multifield: bool,
    ) -> Result<Token> {
        if multifield {
            self.pos += 2; // consume "$?"
        } else {
            self.pos += 1; // consume "?"
        }
        let name_start = self.pos;
        while let Some(b) = self.peek() {
            if !is_symbol_continue(b) {
                break;
            }
            self.pos += 1;
        }
        let name = &self.source[name_start..self.pos];
        if name.is_empty() {
            let print_form = if multifield { "$?" } else { "?" };
            self.record(print_form);
            let kind = if multifield {
                TokenKind::MfWildcard
            } else {
                TokenKind::SfWildcard
            };
            return Ok(Token::new(kind, Span::new(start, self.pos), print_form));
        }
        if !multifield && name.len() >= 2 && name.starts_with('*') && name.ends_with('*') {
            let stripped = &name[1..name.len() - 1];
            let r = atoms.add_symbol(stripped);
            let print_form = self.source[start..self.pos].to_string();
            self.record(&print_form);
            return Ok(Token::new(
                TokenKind::GlobalVariable(r),
                Span::new(start, self.pos),
                print_form,
            ));
        }
        let r = atoms.add_symbol(name);
        let print_form = self.source[start..self.pos].to_string();
        self.record(&print_form);
        let kind = if multifield {
            TokenKind::MfVariable(r)
        } else {
            TokenKind::SfVariable(r)
        };
        Ok(Token::new(kind, Span::new(start, self.pos), print_form))
    }

    /// Attempts the five-phase number state machine (sign, integral,
    /// fractional, exponent-introducer, exponent-value); reverts to a plain
    /// symbol scan if no digit is ever produced.
    fn scan_number_or_symbol(&mut self, atoms: &mut AtomInterner, start: usize) -> Result<Token> {
        let mut phase = NumberPhase::Sign;
        let mut saw_digit = false;
        let mut saw_dot = false;
        let mut saw_exp = false;
        let mut pos = self.pos;

        if matches!(self.bytes.get(pos), Some(b'+') | Some(b'-')) {
            pos += 1;
            phase = NumberPhase::Integral;
        }
        loop {
            match self.bytes.get(pos).copied() {
                Some(b) if is_digit(b) => {
                    saw_digit = true;
                    pos += 1;
                    phase = match phase {
                        NumberPhase::Sign | NumberPhase::Integral => NumberPhase::Integral,
                        NumberPhase::FractionIntro | NumberPhase::Fraction => NumberPhase::Fraction,
                        NumberPhase::ExpIntro | NumberPhase::ExpSign | NumberPhase::ExpValue => {
                            NumberPhase::ExpValue
                        }
                    };
                }
                Some(b'.')
                    if !saw_dot
                        && !saw_exp
                        && matches!(phase, NumberPhase::Integral | NumberPhase::Sign) =>
                {
                    saw_dot = true;
                    pos += 1;
                    phase = NumberPhase::FractionIntro;
                }
                Some(b'e') | Some(b'E')
                    if !saw_exp
                        && saw_digit
                        && matches!(
                            phase,
                            NumberPhase::Integral | NumberPhase::Fraction | NumberPhase::FractionIntro
                        ) =>
                {
                    saw_exp = true;
                    pos += 1;
                    phase = NumberPhase::ExpIntro;
                }
                Some(b'+') | Some(b'-') if matches!(phase, NumberPhase::ExpIntro) => {
                    pos += 1;
                    phase = NumberPhase::ExpSign;
                }
                Some(b) if is_symbol_continue(b) => {
                    // Any other symbol-continuing byte invalidates the
                    // number attempt; fall through to symbol scanning below.
                    saw_digit = false;
                    break;
                }
                _ => break,
            }
        }

        // An exponent introducer or sign with no exponent digits behind it
        // never reached a digit-producing phase; abandon the number and
        // fall back to a plain symbol, the same as any other invalidated
        // number attempt above.
        if matches!(phase, NumberPhase::ExpIntro | NumberPhase::ExpSign) {
            saw_digit = false;
        }

        if !saw_digit {
            return self.scan_symbol(atoms, start);
        }

        self.pos = pos;
        let text = &self.source[start..self.pos];
        self.record(text);
        if saw_dot || saw_exp {
            match text.parse::<f64>() {
                Ok(value) => {
                    let r = atoms.add_float(value);
                    Ok(Token::new(
                        TokenKind::Float(r),
                        Span::new(start, self.pos),
                        text.to_string(),
                    ))
                }
                Err(_) => Err(SpannedError::lexical(
                    format!("malformed float literal '{text}'"),
                    Span::new(start, self.pos),
                )),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => {
                    let r = atoms.add_integer(value);
                    Ok(Token::new(
                        TokenKind::Integer(r),
                        Span::new(start, self.pos),
                        text.to_string(),
                    ))
                }
                Err(_) => {
                    if self.strict_numeric_overflow {
                        Err(SpannedError::arithmetic(
                            format!("integer literal '{text}' overflows"),
                            Span::new(start, self.pos),
                        ))
                    } else {
                        log::warn!("integer literal '{text}' overflows; saturating");
                        let saturated = if text.starts_with('-') {
                            i64::MIN
                        } else {
                            i64::MAX
                        };
                        let r = atoms.add_integer(saturated);
                        Ok(Token::new(
                            TokenKind::Integer(r),
                            Span::new(start, self.pos),
                            text.to_string(),
                        ))
                    }
                }
            }
        }
    }

    fn scan_symbol(&mut self, atoms: &mut AtomInterner, start: usize) -> Result<Token> {
        self.pos += 1; // first byte already known to be a valid start
        while let Some(b) = self.peek() {
            if !is_symbol_continue(b) {
                break;
            }
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        let r = atoms.add_symbol(text);
        self.record(text);
        Ok(Token::new(
            TokenKind::Symbol(r),
            Span::new(start, self.pos),
            text.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rete_base::AtomValue;

    fn tokens(src: &str) -> (Vec<TokenKind>, AtomInterner) {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new(src);
        let mut out = Vec::new();
        loop {
            let tok = scanner.get_token(&mut atoms).unwrap();
            if tok.kind == TokenKind::Stop {
                break;
            }
            out.push(tok.kind);
        }
        (out, atoms)
    }

    #[test]
    fn trivial_assertion_token_stream() {
        let (kinds, atoms) = tokens("(foo 1 2.5 \"hi\" ?x)");
        assert_eq!(kinds.len(), 7);
        assert!(matches!(kinds[0], TokenKind::LParen));
        assert!(matches!(kinds[1], TokenKind::Symbol(r) if matches!(atoms.value(r), AtomValue::Symbol("foo"))));
        assert!(matches!(kinds[2], TokenKind::Integer(r) if matches!(atoms.value(r), AtomValue::Integer(1))));
        assert!(matches!(kinds[3], TokenKind::Float(r) if matches!(atoms.value(r), AtomValue::Float(f) if f == 2.5)));
        assert!(matches!(kinds[4], TokenKind::String(r) if matches!(atoms.value(r), AtomValue::String("hi"))));
        assert!(matches!(kinds[5], TokenKind::SfVariable(r) if matches!(atoms.value(r), AtomValue::Symbol("x"))));
        assert!(matches!(kinds[6], TokenKind::RParen));
    }

    #[test]
    fn instance_name_bracketing() {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new("[oven-1]");
        let tok = scanner.get_token(&mut atoms).unwrap();
        match tok.kind {
            TokenKind::InstanceName(r) => {
                assert!(matches!(atoms.value(r), AtomValue::InstanceName("oven-1")));
            }
            other => panic!("expected instance name, got {other:?}"),
        }
        assert_eq!(scanner.pp_buffer(), "[oven-1]");
    }

    #[test]
    fn negative_float_is_scanned_as_one_token() {
        let (kinds, atoms) = tokens("-3.25");
        assert_eq!(kinds.len(), 1);
        assert!(matches!(kinds[0], TokenKind::Float(r) if matches!(atoms.value(r), AtomValue::Float(f) if f == -3.25)));
    }

    #[test]
    fn bare_sign_without_digits_is_a_symbol() {
        let (kinds, atoms) = tokens("- ");
        assert_eq!(kinds.len(), 1);
        assert!(matches!(kinds[0], TokenKind::Symbol(r) if matches!(atoms.value(r), AtomValue::Symbol("-"))));
    }

    #[test]
    fn incomplete_exponent_falls_back_to_symbol() {
        let (kinds, atoms) = tokens("1e ");
        assert_eq!(kinds.len(), 1);
        assert!(matches!(kinds[0], TokenKind::Symbol(r) if matches!(atoms.value(r), AtomValue::Symbol("1e"))));

        let (kinds, atoms) = tokens("1e+ ");
        assert_eq!(kinds.len(), 1);
        assert!(matches!(kinds[0], TokenKind::Symbol(r) if matches!(atoms.value(r), AtomValue::Symbol("1e+"))));

        let (kinds, atoms) = tokens("1e- ");
        assert_eq!(kinds.len(), 1);
        assert!(matches!(kinds[0], TokenKind::Symbol(r) if matches!(atoms.value(r), AtomValue::Symbol("1e-"))));
    }

    #[test]
    fn multifield_variable_and_wildcard() {
        let (kinds, _) = tokens("$?xs $?");
        assert!(matches!(kinds[0], TokenKind::MfVariable(_)));
        assert!(matches!(kinds[1], TokenKind::MfWildcard));
    }

    #[test]
    fn single_field_wildcard() {
        let (kinds, _) = tokens("?");
        assert!(matches!(kinds[0], TokenKind::SfWildcard));
    }

    #[test]
    fn global_variable_strips_asterisks() {
        let (kinds, atoms) = tokens("?*limit*");
        match kinds[0] {
            TokenKind::GlobalVariable(r) => {
                assert!(matches!(atoms.value(r), AtomValue::Symbol("limit")));
            }
            other => panic!("expected global variable, got {other:?}"),
        }
    }

    #[test]
    fn connectives_and_comment_skipping() {
        let (kinds, _) = tokens("a ~b | c & d ; trailing comment\n");
        assert!(matches!(kinds[0], TokenKind::Symbol(_)));
        assert!(matches!(kinds[1], TokenKind::Not));
        assert!(matches!(kinds[2], TokenKind::Symbol(_)));
        assert!(matches!(kinds[3], TokenKind::Or));
        assert!(matches!(kinds[4], TokenKind::Symbol(_)));
        assert!(matches!(kinds[5], TokenKind::And));
        assert!(matches!(kinds[6], TokenKind::Symbol(_)));
        assert_eq!(kinds.len(), 7);
    }

    #[test]
    fn unterminated_string_is_a_lexical_error() {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new("\"never closed");
        let err = scanner.get_token(&mut atoms).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lexical);
    }

    #[test]
    fn pretty_print_buffer_echoes_source() {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new("(foo)");
        loop {
            let tok = scanner.get_token(&mut atoms).unwrap();
            if tok.kind == TokenKind::Stop {
                break;
            }
        }
        assert_eq!(scanner.pp_buffer(), "(foo)");
    }

    #[test]
    fn stop_token_on_empty_input() {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new("");
        let tok = scanner.get_token(&mut atoms).unwrap();
        assert_eq!(tok.kind, TokenKind::Stop);
    }

    #[test]
    fn scanning_past_stop_keeps_returning_stop() {
        let mut atoms = AtomInterner::new();
        let mut scanner = Scanner::new("  ");
        assert_eq!(scanner.get_token(&mut atoms).unwrap().kind, TokenKind::Stop);
        assert_eq!(scanner.get_token(&mut atoms).unwrap().kind, TokenKind::Stop);
    }
}
