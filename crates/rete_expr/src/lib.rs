//! # rete-expr
//!
//! The expression tree shared by parsed user code, constraint predicate
//! bodies, RHS actions, and generated pattern/join-network tests. A single
//! node shape — tag, first child, next sibling — spans every phase; nodes
//! live in an [`arena::ExprArena`] and are referenced by integer
//! [`arena::ExprId`] rather than by owning pointer, so that back-references
//! (a join test's target variable, a nand frame's referent) don't require
//! cyclic ownership.

pub mod arena;
pub mod tag;

pub use arena::{ExprArena, ExprId, ExprNode};
pub use tag::{ExprTag, TestScope};
