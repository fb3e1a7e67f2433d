//! Slot constraint facet parser: `(facet-name arg*)` clauses to
//! [`FacetArg`] lists consumed by [`parse_standard_constraint`].
//!
//! Grounded on `cstrnpsr.c`'s per-facet parse functions
//! (`ParseTypeAttribute`, `ParseRangeCardinalityAttribute`,
//! `ParseAllowedValuesAttribute`). A slot body may carry clauses this crate
//! doesn't recognize (`default`, `visibility`, and the rest belong to other
//! constructs entirely out of this front end's scope); an unrecognized
//! leading symbol is pushed back so the caller can hand it elsewhere.
//!
//! Every diagnostic this module constructs directly is both returned as an
//! `Err(SpannedError)` and emitted to the caller's [`Router`] on
//! [`Channel::Error`] before it's returned. Errors that bubble up unchanged
//! from [`rete_constraint`] via `?` are left alone — that crate has no
//! router of its own to report through, and double-emitting would log the
//! same failure twice.
//!
//! The facet-clause loop checked by [`parse_slot_facets`] is also a yield
//! point for cooperative cancellation: a requested halt is honored at the
//! top of each clause, the same granularity the original gives one
//! attribute per loop iteration.

use crate::cursor::TokenCursor;
use rete_base::{AtomInterner, AtomRef, AtomValue, Channel, Environment, ErrorKind, Result, Router, SpannedError};
use rete_constraint::{admit_type_name, parse_standard_constraint, ConstraintRecord, Facet, FacetArg, ParseRecord};
use rete_scanner::{Token, TokenKind};

fn symbol_text<'a>(atoms: &'a AtomInterner, r: AtomRef) -> &'a str {
    match atoms.value(r) {
        AtomValue::Symbol(s) => s,
        _ => "",
    }
}

fn is_variable_marker(atoms: &AtomInterner, r: AtomRef) -> bool {
    symbol_text(atoms, r) == "VARIABLE"
}

fn facet_of(name: &str) -> Option<Facet> {
    Some(match name {
        "type" => Facet::Type,
        "range" => Facet::Range,
        "cardinality" => Facet::Cardinality,
        "allowed-values" => Facet::AllowedValues,
        "allowed-symbols" => Facet::AllowedSymbols,
        "allowed-strings" => Facet::AllowedStrings,
        "allowed-lexemes" => Facet::AllowedLexemes,
        "allowed-integers" => Facet::AllowedIntegers,
        "allowed-floats" => Facet::AllowedFloats,
        "allowed-numbers" => Facet::AllowedNumbers,
        "allowed-instance-names" => Facet::AllowedInstanceNames,
        "allowed-classes" => Facet::AllowedClasses,
        _ => return None,
    })
}

fn integer_value(atoms: &AtomInterner, r: AtomRef) -> i64 {
    match atoms.value(r) {
        AtomValue::Integer(i) => i,
        _ => 0,
    }
}

fn float_value(atoms: &AtomInterner, r: AtomRef) -> f64 {
    match atoms.value(r) {
        AtomValue::Float(f) => f,
        _ => 0.0,
    }
}

fn fail(router: &mut dyn Router, source_name: &str, err: SpannedError) -> SpannedError {
    router.emit(Channel::Error, source_name, &err.to_string());
    err
}

/// Parses every `(facet-name arg*)` clause recognized by the standard
/// constraint facet set, stopping at the first clause whose leading symbol
/// isn't one of them (or the slot body's closing `)`, which is left for the
/// caller to consume).
pub fn parse_slot_facets(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    record: &mut ConstraintRecord,
    parsed: &mut ParseRecord,
    multifield_ok: bool,
    env: &Environment,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<()> {
    loop {
        let lparen = cursor.next(atoms)?;
        if env.halt_requested() {
            return Err(fail(
                router,
                source_name,
                SpannedError::new(ErrorKind::Resource, "compilation halted while parsing slot facets", lparen.span),
            ));
        }
        if lparen.kind != TokenKind::LParen {
            cursor.unget(lparen);
            return Ok(());
        }
        let name_tok = cursor.next(atoms)?;
        let name_ref = match name_tok.kind {
            TokenKind::Symbol(r) => r,
            _ => {
                cursor.unget(name_tok);
                cursor.unget(lparen);
                return Ok(());
            }
        };
        let Some(facet) = facet_of(symbol_text(atoms, name_ref)) else {
            cursor.unget(name_tok);
            cursor.unget(lparen);
            return Ok(());
        };

        let args = parse_facet_args(cursor, atoms, facet, router, source_name)?;
        parse_standard_constraint(facet, &args, record, parsed, multifield_ok)?;

        if facet == Facet::Type {
            for arg in &args {
                if let FacetArg::Symbol(r) = arg {
                    admit_type_name(record, symbol_text(atoms, *r))?;
                }
            }
        }
    }
}

fn parse_facet_args(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    facet: Facet,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<Vec<FacetArg>> {
    match facet {
        Facet::Type => parse_value_list(cursor, atoms, facet, router, source_name),
        Facet::Range => parse_range(cursor, atoms, router, source_name),
        Facet::Cardinality => parse_cardinality(cursor, atoms, router, source_name),
        _ => parse_value_list(cursor, atoms, facet, router, source_name),
    }
}

fn expect_rparen(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    facet_name: &str,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<()> {
    let tok = cursor.next(atoms)?;
    if tok.kind != TokenKind::RParen {
        return Err(fail(
            router,
            source_name,
            SpannedError::syntactic(format!("expected ')' closing the {facet_name} attribute"), tok.span),
        ));
    }
    Ok(())
}

fn token_to_facet_arg(
    tok: &Token,
    atoms: &AtomInterner,
    facet: Facet,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<FacetArg> {
    match tok.kind {
        TokenKind::Symbol(r) if facet == Facet::AllowedClasses => Ok(FacetArg::Class(r)),
        TokenKind::Symbol(r) if is_variable_marker(atoms, r) => Ok(FacetArg::Variable),
        TokenKind::Symbol(r) => Ok(FacetArg::Symbol(r)),
        TokenKind::String(r) => Ok(FacetArg::String(r)),
        TokenKind::Integer(r) => Ok(FacetArg::Integer(integer_value(atoms, r))),
        TokenKind::Float(r) => Ok(FacetArg::Float(float_value(atoms, r))),
        TokenKind::InstanceName(r) => Ok(FacetArg::InstanceName(r)),
        TokenKind::SfVariable(r) if is_variable_marker(atoms, r) => Ok(FacetArg::Variable),
        _ => Err(fail(
            router,
            source_name,
            SpannedError::syntactic(format!("unexpected value in a {facet:?} attribute"), tok.span),
        )),
    }
}

/// `(type SYMBOL STRING ...)` and the nine `allowed-*` facets: a
/// space-separated list of constants (or the lone `?VARIABLE` marker)
/// terminated by `)`.
fn parse_value_list(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    facet: Facet,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<Vec<FacetArg>> {
    let mut args = Vec::new();
    loop {
        let tok = cursor.next(atoms)?;
        if tok.kind == TokenKind::RParen {
            return Ok(args);
        }
        if tok.kind == TokenKind::Stop {
            return Err(fail(
                router,
                source_name,
                SpannedError::syntactic(format!("unexpected end of input in a {facet:?} attribute"), tok.span),
            ));
        }
        args.push(token_to_facet_arg(&tok, atoms, facet, router, source_name)?);
    }
}

fn parse_range_bound(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    is_min: bool,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<FacetArg> {
    let tok = cursor.next(atoms)?;
    match tok.kind {
        TokenKind::Integer(r) => Ok(FacetArg::Integer(integer_value(atoms, r))),
        TokenKind::Float(r) => Ok(FacetArg::Float(float_value(atoms, r))),
        TokenKind::SfVariable(r) if is_variable_marker(atoms, r) => {
            Ok(if is_min { FacetArg::NegInfinity } else { FacetArg::PosInfinity })
        }
        _ => Err(fail(
            router,
            source_name,
            SpannedError::syntactic("range bound must be a number or '?VARIABLE'", tok.span),
        )),
    }
}

fn parse_range(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<Vec<FacetArg>> {
    let min = parse_range_bound(cursor, atoms, true, router, source_name)?;
    let max = parse_range_bound(cursor, atoms, false, router, source_name)?;
    expect_rparen(cursor, atoms, "range", router, source_name)?;
    Ok(vec![min, max])
}

fn parse_cardinality_bound(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    is_min: bool,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<FacetArg> {
    let tok = cursor.next(atoms)?;
    match tok.kind {
        TokenKind::Integer(r) => {
            let value = integer_value(atoms, r);
            if value < 0 {
                return Err(fail(
                    router,
                    source_name,
                    SpannedError::semantic("cardinality bound must be non-negative", tok.span),
                ));
            }
            Ok(FacetArg::Integer(value))
        }
        TokenKind::SfVariable(r) if is_variable_marker(atoms, r) => {
            Ok(if is_min { FacetArg::Integer(0) } else { FacetArg::PosInfinity })
        }
        _ => Err(fail(
            router,
            source_name,
            SpannedError::syntactic("cardinality bound must be a non-negative integer or '?VARIABLE'", tok.span),
        )),
    }
}

fn parse_cardinality(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<Vec<FacetArg>> {
    let min = parse_cardinality_bound(cursor, atoms, true, router, source_name)?;
    let max = parse_cardinality_bound(cursor, atoms, false, router, source_name)?;
    expect_rparen(cursor, atoms, "cardinality", router, source_name)?;
    Ok(vec![min, max])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rete_base::RecordingRouter;
    use rete_constraint::{FieldCountBound, NumericBound};
    use rete_scanner::Scanner;

    fn parse(src: &str, multifield_ok: bool) -> (ConstraintRecord, ParseRecord, RecordingRouter) {
        let mut atoms = AtomInterner::new();
        let mut record = ConstraintRecord::unconstrained(multifield_ok);
        let mut parsed = ParseRecord::new();
        let mut scanner = Scanner::new(src);
        let mut cursor = TokenCursor::new(&mut scanner);
        let env = Environment::default();
        let mut router = RecordingRouter::new();
        parse_slot_facets(&mut cursor, &mut atoms, &mut record, &mut parsed, multifield_ok, &env, &mut router, "test")
            .unwrap();
        (record, parsed, router)
    }

    #[test]
    fn type_facet_admits_named_types_only() {
        let (record, parsed, _router) = parse("(type INTEGER FLOAT)", false);
        assert!(parsed.has(Facet::Type));
        assert!(record.integers_allowed);
        assert!(record.floats_allowed);
        assert!(!record.symbols_allowed);
    }

    #[test]
    fn range_with_variable_minimum_leaves_default_bound() {
        let (record, _, _router) = parse("(range ?VARIABLE 10)", false);
        assert_eq!(record.min_value, NumericBound::NegInfinity);
        assert_eq!(record.max_value, NumericBound::Integer(10));
    }

    #[test]
    fn cardinality_variable_maximum_is_unbounded() {
        let (record, _, _router) = parse("(cardinality 1 ?VARIABLE)", true);
        assert_eq!(record.min_fields, FieldCountBound::Finite(1));
        assert_eq!(record.max_fields, FieldCountBound::Unbounded);
    }

    #[test]
    fn allowed_symbols_collects_restriction_list() {
        let (record, _, _router) = parse("(allowed-symbols red green blue)", false);
        assert!(record.symbol_restriction);
        assert_eq!(record.symbol_list.len(), 3);
    }

    #[test]
    fn unrecognized_clause_is_pushed_back() {
        let mut atoms = AtomInterner::new();
        let mut record = ConstraintRecord::unconstrained(false);
        let mut parsed = ParseRecord::new();
        let mut scanner = Scanner::new("(type INTEGER) (default 0)");
        let mut cursor = TokenCursor::new(&mut scanner);
        let env = Environment::default();
        let mut router = RecordingRouter::new();
        parse_slot_facets(&mut cursor, &mut atoms, &mut record, &mut parsed, false, &env, &mut router, "test")
            .unwrap();
        let next = cursor.next(&mut atoms).unwrap();
        assert_eq!(next.kind, TokenKind::LParen);
        let name = cursor.next(&mut atoms).unwrap();
        assert!(matches!(name.kind, TokenKind::Symbol(r) if matches!(atoms.value(r), AtomValue::Symbol("default"))));
    }

    #[test]
    fn conflicting_facets_surface_as_semantic_errors() {
        let mut atoms = AtomInterner::new();
        let mut record = ConstraintRecord::unconstrained(false);
        let mut parsed = ParseRecord::new();
        let mut scanner = Scanner::new("(type SYMBOL) (allowed-integers 1 2 3)");
        let mut cursor = TokenCursor::new(&mut scanner);
        let env = Environment::default();
        let mut router = RecordingRouter::new();
        let err = parse_slot_facets(&mut cursor, &mut atoms, &mut record, &mut parsed, false, &env, &mut router, "test")
            .unwrap_err();
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn halt_requested_aborts_facet_loop() {
        let mut atoms = AtomInterner::new();
        let mut record = ConstraintRecord::unconstrained(false);
        let mut parsed = ParseRecord::new();
        let mut scanner = Scanner::new("(type INTEGER)");
        let mut cursor = TokenCursor::new(&mut scanner);
        let mut env = Environment::default();
        env.request_halt();
        let mut router = RecordingRouter::new();
        let err = parse_slot_facets(&mut cursor, &mut atoms, &mut record, &mut parsed, false, &env, &mut router, "test")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resource);
        assert_eq!(router.on(Channel::Error).len(), 1);
    }
}
