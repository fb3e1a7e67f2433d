//! The per-pattern-kind code generator hooks. The core generator knows only
//! these signatures; a fact-template pattern and an object pattern each
//! supply their own implementation.

use rete_expr::{ExprArena, ExprId};

/// Which side of a join a getter/comparator runs against. Inside a nand,
/// `NestedRhs` distinguishes a reference that resolves inside the
/// immediately enclosing nand group from one that must reach further left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lhs,
    Rhs,
    NestedRhs,
}

/// Up to eight generators a pattern kind may supply. Every hook is
/// optional: an absent hook disables the corresponding optimisation and
/// the core generator falls back to generic `eq`/`neq` composition over
/// whatever getter the pattern kind *does* provide.
pub trait PatternTypeVTable {
    /// Pattern-network equality/inequality test against a literal.
    fn gen_pn_constant(
        &self,
        _arena: &mut ExprArena,
        _field: ExprId,
        _literal: ExprId,
        _negated: bool,
    ) -> Option<ExprId> {
        None
    }

    /// Join-network equality/inequality test against a literal, for a
    /// given side.
    fn gen_jn_constant(
        &self,
        _arena: &mut ExprArena,
        _field: ExprId,
        _literal: ExprId,
        _side: Side,
        _negated: bool,
    ) -> Option<ExprId> {
        None
    }

    /// An expression yielding the field's value in pattern-network context.
    fn gen_get_pn_value(&self, _arena: &mut ExprArena, _field: ExprId) -> Option<ExprId> {
        None
    }

    /// Same, in join-network context for a given side.
    fn gen_get_jn_value(&self, _arena: &mut ExprArena, _field: ExprId, _side: Side) -> Option<ExprId> {
        None
    }

    /// Rewrites a variable leaf node into a pattern-network getter in
    /// place, returning the replacement expression.
    fn replace_get_pn_value(&self, arena: &mut ExprArena, node: ExprId, referring: ExprId) -> Option<ExprId> {
        self.gen_get_pn_value(arena, referring).map(|_| node)
    }

    /// Same for the join network.
    fn replace_get_jn_value(
        &self,
        arena: &mut ExprArena,
        node: ExprId,
        referring: ExprId,
        side: Side,
    ) -> Option<ExprId> {
        self.gen_get_jn_value(arena, referring, side).map(|_| node)
    }

    /// Same-pattern variable-vs-variable equality.
    fn gen_compare_pn_values(&self, _arena: &mut ExprArena, _a: ExprId, _b: ExprId) -> Option<ExprId> {
        None
    }

    /// Cross-pattern variable-vs-variable equality; `nand` marks whether
    /// this comparison crosses into a nand group (affecting which side
    /// resolves to `NestedRhs`).
    fn gen_compare_jn_values(&self, _arena: &mut ExprArena, _a: ExprId, _b: ExprId, _nand: bool) -> Option<ExprId> {
        None
    }
}

/// The fallback used when a hook is absent: generic `eq`/`neq` composition
/// has no per-pattern-kind optimisation available, so callers compose the
/// already-generated getter expressions with [`rete_expr::ExprTag::Eq`] /
/// [`rete_expr::ExprTag::Neq`] directly instead of calling into the
/// v-table.
pub struct GenericFallback;

impl PatternTypeVTable for GenericFallback {}
