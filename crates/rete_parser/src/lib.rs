//! Surface-syntax parsers that sit directly on top of [`rete_scanner`],
//! turning token streams into the constructs the rest of the front end
//! operates on: expression-tree nodes, slot constraint facets, and
//! `defmodule` port specifications.
//!
//! Grounded on the CLIPS parser trio `exprnpsr.c`/`cstrnpsr.c`/`modulpsr.c`.
//! Full construct parsers (`defrule`, `deftemplate`, the LHS pattern
//! grammar) are out of scope here; this crate supplies the pieces those
//! higher-level parsers would call into.

pub mod constraint;
pub mod cursor;
pub mod expr;
pub mod module;

pub use constraint::parse_slot_facets;
pub use cursor::TokenCursor;
pub use expr::{parse_expression, BuiltinOnly, CallKind, CallResolver};
pub use module::parse_defmodule;
