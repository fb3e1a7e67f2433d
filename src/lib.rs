//! Front-end compilation core for a CLIPS-family forward-chaining rule
//! interpreter: atom interner, scanner, expression tree, constraint record,
//! module system, and pattern/join-network generator (§2).
//!
//! This crate is a thin facade over the six `crates/rete_*` workspace
//! members — it re-exports the surface a caller assembling a compiler
//! front end actually touches, and adds the handful of pipeline-glue
//! functions that don't belong to any single layer.

pub use rete_base::{
    AtomCategory, AtomInterner, AtomRef, AtomValue, Channel, Environment, EnvironmentConfig, ErrorKind,
    LogRouter, RecordingRouter, Result, Router, Span, SpannedError,
};
pub use rete_constraint::{
    admit_type_name, derive_default, overlay, parse_standard_constraint, ConstraintRecord,
    DefaultValue, Facet, FacetArg, FieldCountBound, NumericBound, ParseRecord,
};
pub use rete_expr::{ExprArena, ExprId, ExprNode, ExprTag, TestScope};
pub use rete_module::{ConstructType, ModuleTable, NameScope, PortItem, MAIN_MODULE};
pub use rete_network::{
    conjoin, disjoin, replace_sequence_expansion_ops, FieldSpec, FieldTestKind, FunctionRegistry,
    GenericFallback, Generator, LhsNode, LhsNodeId, LhsTree, NandFrame, NandFrameStack, Pattern,
    PatternTypeVTable, Side,
};
pub use rete_parser::{parse_defmodule, parse_expression, parse_slot_facets, BuiltinOnly, CallKind, CallResolver, TokenCursor};
pub use rete_scanner::{Scanner, Token, TokenKind};

#[cfg(feature = "cli")]
pub mod cli;

/// Tokenizes `source` in full, returning every token the scanner produces
/// before it reaches end of input. A thin convenience over repeatedly
/// calling [`Scanner::get_token`] — most real callers drive the scanner one
/// token at a time instead, interleaving it with parsing.
pub fn scan_all(source: &str, atoms: &mut AtomInterner) -> Result<Vec<Token>> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.get_token(atoms)?;
        let done = matches!(token.kind, TokenKind::Stop);
        tokens.push(token);
        if done {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_all_stops_at_end_of_input() {
        let mut env = Environment::default();
        let tokens = scan_all("(foo ?x 1)", &mut env.atoms).unwrap();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Stop);
        assert!(tokens.len() > 1);
    }
}
