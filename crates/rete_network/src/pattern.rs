//! Per-pattern accumulation (§4.6.6, §4.6.7).
//!
//! A [`Pattern`] is what the generator hands to the RETE builder once every
//! field of that pattern has been compiled: the join-network test the
//! pattern contributes, plus the left/right hash-key expressions gathered
//! from every cross-pattern variable comparison that referenced (or was
//! referenced from) this pattern.

use rete_expr::{ExprArena, ExprId, ExprTag};

/// One compiled pattern: its index in the rule and everything the
/// generator accumulated while walking its fields.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub index: u32,
    /// And-combined join-network test across every field demoted to the
    /// join network.
    pub network_test: Option<ExprId>,
    /// Alpha/beta memory hash keys, in the textual order they were
    /// appended (§4.6.6).
    pub left_hash: Vec<ExprId>,
    pub right_hash: Vec<ExprId>,
}

impl Pattern {
    pub fn new(index: u32) -> Self {
        Pattern {
            index,
            network_test: None,
            left_hash: Vec::new(),
            right_hash: Vec::new(),
        }
    }

    /// And-combines `test` onto this pattern's join-network test.
    pub fn and_jn_test(&mut self, arena: &mut ExprArena, test: ExprId) {
        self.network_test = Some(conjoin(arena, self.network_test, test));
    }
}

/// `a AND b`, or just `b` if `a` is absent — the running accumulation used
/// both for a pattern's join-network test and for a field's and-chain of
/// predicate/literal tests.
pub fn conjoin(arena: &mut ExprArena, a: Option<ExprId>, b: ExprId) -> ExprId {
    match a {
        None => b,
        Some(a) => {
            let args = arena.append(Some(a), Some(b)).unwrap();
            arena.call(ExprTag::And, Some(args))
        }
    }
}

/// `a OR b`, or just `b` if `a` is absent — used when an or-chain of more
/// than one alternative collapses its per-alternative tests into a single
/// disjunction (§4.6.3, last paragraph).
pub fn disjoin(arena: &mut ExprArena, a: Option<ExprId>, b: ExprId) -> ExprId {
    match a {
        None => b,
        Some(a) => {
            let args = arena.append(Some(a), Some(b)).unwrap();
            arena.call(ExprTag::Or, Some(args))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rete_base::AtomInterner;

    #[test]
    fn and_jn_test_accumulates_across_calls() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let t1 = arena.gen_constant(ExprTag::Integer(atoms.add_integer(1)));
        let t2 = arena.gen_constant(ExprTag::Integer(atoms.add_integer(2)));
        let mut pattern = Pattern::new(0);
        pattern.and_jn_test(&mut arena, t1);
        pattern.and_jn_test(&mut arena, t2);
        let test = pattern.network_test.unwrap();
        assert_eq!(arena.children(test).len(), 2);
    }

    #[test]
    fn disjoin_without_prior_value_is_identity() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let t1 = arena.gen_constant(ExprTag::Integer(atoms.add_integer(1)));
        assert_eq!(disjoin(&mut arena, None, t1), t1);
    }
}
