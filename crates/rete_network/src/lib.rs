//! LHS-to-network compilation (§4.6): turns a parsed rule's left-hand side
//! into the pattern-network and join-network tests the RETE builder wires
//! into actual nodes.
//!
//! The pieces are deliberately small and composable rather than one monolithic
//! pass: [`lhs`] is the parsed-field tree the rule parser builds, [`vtable`]
//! is the seam pattern kinds (fact templates, instances, ...) hook into,
//! [`nand`] and [`pattern`] are the two kinds of per-scope accumulation the
//! decision procedure in [`generator`] needs, and [`sequence`] is the
//! independent `$?var`/`expand$` rewrite that runs over any call expression,
//! LHS or RHS.

pub mod generator;
pub mod lhs;
pub mod nand;
pub mod pattern;
pub mod sequence;
pub mod vtable;

pub use generator::{FieldSpec, Generator};
pub use lhs::{FieldTestKind, LhsNode, LhsNodeId, LhsTree};
pub use nand::{NandFrame, NandFrameStack};
pub use pattern::{conjoin, disjoin, Pattern};
pub use sequence::{replace_sequence_expansion_ops, FunctionRegistry};
pub use vtable::{GenericFallback, PatternTypeVTable, Side};
