//! # rete-constraint
//!
//! Slot constraint records: facet aggregation, conflict detection between
//! facets, overlay of inherited facets, and default-value derivation. This
//! crate deliberately has **no dependency on `rete-expr`** — constraint
//! facets operate on already-classified literal constants
//! ([`record::FacetArg`]), not arbitrary expression trees. Translating
//! surface syntax (tokens, parenthesized facet forms) into `FacetArg`
//! values is the scanner/parser layer's job, not this one's.

pub mod bound;
pub mod facet;
pub mod record;

pub use bound::{FieldCountBound, NumericBound};
pub use facet::{Facet, ParseRecord};
pub use record::{
    admit_type_name, derive_default, overlay, parse_standard_constraint, ConstraintRecord,
    DefaultValue, FacetArg,
};
