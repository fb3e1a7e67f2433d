//! The pattern/join-network generator (§4.6): walks one field's or-/and-chain,
//! decides per §4.6.3 whether each test belongs in the pattern network or
//! the join network, and produces the decorated output §4.6.7 describes —
//! a field's `network_test`/`constant_selector`/`constant_value` and a
//! pattern's accumulated JN test and hash-key lists.

use std::collections::HashMap;

use rete_base::{AtomInterner, AtomRef};
use rete_expr::{ExprArena, ExprId, ExprTag, TestScope};

use crate::lhs::{FieldTestKind, LhsNodeId, LhsTree};
use crate::nand::{NandFrame, NandFrameStack};
use crate::pattern::{conjoin, disjoin, Pattern};
use crate::vtable::{PatternTypeVTable, Side};

/// One field of one pattern: the and-chain heads of its or-alternatives, in
/// source order. Built by the caller as it walks the raw `right`/`bottom`
/// linked structure of [`LhsTree`] — the generator itself only needs the
/// already-separated per-field or-chain, not the dual-purpose `bottom`
/// link's "next or-alternative vs. next field" ambiguity.
pub struct FieldSpec {
    pub pattern_index: u32,
    pub or_alternatives: Vec<LhsNodeId>,
}

impl FieldSpec {
    pub fn new(pattern_index: u32, or_alternatives: Vec<LhsNodeId>) -> Self {
        FieldSpec {
            pattern_index,
            or_alternatives,
        }
    }
}

/// Drives LHS-to-network compilation for one rule. Borrows every table it
/// needs for the duration of compiling that rule; `bindings` maps each
/// variable's interned name to the [`LhsNodeId`] where it was first bound
/// (the `referring_node` target), since expression-tree leaves only carry
/// the variable's name, not a back-reference.
pub struct Generator<'a> {
    pub tree: &'a mut LhsTree,
    pub arena: &'a mut ExprArena,
    pub atoms: &'a mut AtomInterner,
    pub bindings: &'a HashMap<AtomRef, LhsNodeId>,
    pub vtable: &'a dyn PatternTypeVTable,
    pub nand_frames: NandFrameStack,
}

impl<'a> Generator<'a> {
    pub fn new(
        tree: &'a mut LhsTree,
        arena: &'a mut ExprArena,
        atoms: &'a mut AtomInterner,
        bindings: &'a HashMap<AtomRef, LhsNodeId>,
        vtable: &'a dyn PatternTypeVTable,
    ) -> Self {
        Generator {
            tree,
            arena,
            atoms,
            bindings,
            vtable,
            nand_frames: NandFrameStack::new(),
        }
    }

    /// Opens a nand/and group at the given depth. Call this when the LHS
    /// walk (fields → patterns → rule, §2) descends into a `(not (and ...))`
    /// condition element.
    pub fn enter_nand(&mut self, depth: u32) {
        self.nand_frames.push(depth);
    }

    /// Closes the innermost open nand group, returning its accumulated
    /// external test and hash keys for the caller to attach to the
    /// nand-entering join node.
    pub fn exit_nand(&mut self) -> Option<NandFrame> {
        self.nand_frames.pop()
    }

    /// Compiles every field of one pattern, returning its accumulated join-
    /// network test and hash-key lists.
    pub fn compile_pattern(&mut self, pattern_index: u32, fields: &[FieldSpec]) -> Pattern {
        let mut pattern = Pattern::new(pattern_index);
        for field in fields {
            self.compile_field(field, &mut pattern);
        }
        pattern
    }

    /// Compiles one field (§4.6.3): decides, per or-alternative, whether its
    /// constant tests run in the PN or are demoted to the JN, dispatches
    /// each and-sibling by `test_kind` (§4.6.3's four strategies), and
    /// writes the field's `network_test`/`constant_selector`/
    /// `constant_value` back onto its head [`LhsNodeId`].
    pub fn compile_field(&mut self, field: &FieldSpec, pattern: &mut Pattern) {
        let or_len = field.or_alternatives.len();
        let mut pn_alts: Vec<ExprId> = Vec::new();
        let mut jn_alts: Vec<ExprId> = Vec::new();
        let mut single_literal: Option<(ExprId, ExprId)> = None;

        for &head in &field.or_alternatives {
            let and_ids = self.tree.and_chain(head);
            let can_pn = and_ids
                .iter()
                .all(|&id| !self.references_other_pattern(id, field.pattern_index));

            let mut alt_pn: Option<ExprId> = None;
            let mut alt_jn: Option<ExprId> = None;

            for &id in &and_ids {
                let node = self.tree.node(id).clone();
                match node.test_kind {
                    FieldTestKind::Wildcard => {}
                    FieldTestKind::Literal => {
                        let literal = node
                            .expression
                            .expect("a literal field test carries its constant as `expression`");
                        if can_pn {
                            if let Some(t) =
                                self.vtable.gen_pn_constant(self.arena, node.field_ref, literal, node.negated)
                            {
                                alt_pn = Some(conjoin_opt(self.arena, alt_pn, t));
                            }
                        } else if let Some(t) = self.vtable.gen_jn_constant(
                            self.arena,
                            node.field_ref,
                            literal,
                            Side::Rhs,
                            node.negated,
                        ) {
                            alt_jn = Some(conjoin_opt(self.arena, alt_jn, t));
                        }
                        if or_len == 1 && and_ids.len() == 1 && !node.negated {
                            let selector = self
                                .vtable
                                .gen_get_pn_value(self.arena, node.field_ref)
                                .unwrap_or(node.field_ref);
                            single_literal = Some((selector, literal));
                        }
                    }
                    FieldTestKind::Predicate => {
                        let expr = node
                            .expression
                            .expect("a predicate field test carries its body as `expression`");
                        if self.expression_resolvable_at_pn(expr, field.pattern_index) {
                            let rewritten = self.getfield_replace(expr);
                            let test = self.wrap_not(rewritten, node.negated);
                            alt_pn = Some(conjoin_opt(self.arena, alt_pn, test));
                        } else {
                            let in_nand = node.nand_depth > 0;
                            let rewritten = self.getvar_replace(expr, in_nand, node.nand_depth, node.join_depth);
                            let test = self.wrap_not(rewritten, node.negated);
                            alt_jn = Some(conjoin_opt(self.arena, alt_jn, test));
                        }
                    }
                    FieldTestKind::ReturnValue => {
                        let expr = node
                            .expression
                            .expect("a return-value field test carries its body as `expression`");
                        if self.expression_resolvable_at_pn(expr, field.pattern_index) {
                            let field_value = self
                                .vtable
                                .gen_get_pn_value(self.arena, node.field_ref)
                                .unwrap_or(node.field_ref);
                            let rewritten = self.getfield_replace(expr);
                            let test = self.eq_or_neq(field_value, rewritten, node.negated, TestScope::Pattern);
                            alt_pn = Some(conjoin_opt(self.arena, alt_pn, test));
                        } else {
                            let in_nand = node.nand_depth > 0;
                            let field_value = self
                                .vtable
                                .gen_get_jn_value(self.arena, node.field_ref, Side::Rhs)
                                .unwrap_or(node.field_ref);
                            let rewritten = self.getvar_replace(expr, in_nand, node.nand_depth, node.join_depth);
                            let test = self.eq_or_neq(field_value, rewritten, node.negated, TestScope::Join);
                            alt_jn = Some(conjoin_opt(self.arena, alt_jn, test));
                        }
                    }
                    FieldTestKind::Variable => {
                        let referring = node
                            .referring_node
                            .expect("a variable field test has a binding site via `referring_node`");
                        let referent = self.tree.node(referring).clone();
                        if referent.pattern_index == field.pattern_index {
                            let t = match self
                                .vtable
                                .gen_compare_pn_values(self.arena, node.field_ref, referent.field_ref)
                            {
                                Some(t) => t,
                                None => self.generic_pn_compare(node.field_ref, referent.field_ref),
                            };
                            alt_pn = Some(conjoin_opt(self.arena, alt_pn, t));
                        } else {
                            let in_nand = node.nand_depth > 0;
                            let t = match self.vtable.gen_compare_jn_values(
                                self.arena,
                                node.field_ref,
                                referent.field_ref,
                                in_nand,
                            ) {
                                Some(t) => t,
                                None => self.generic_jn_compare(node.field_ref, referent.field_ref),
                            };
                            alt_jn = Some(conjoin_opt(self.arena, alt_jn, t));
                            let pn_getter = self
                                .vtable
                                .gen_get_pn_value(self.arena, node.field_ref)
                                .unwrap_or(node.field_ref);
                            let lhs_getter = self
                                .vtable
                                .gen_get_jn_value(self.arena, referent.field_ref, Side::Lhs)
                                .unwrap_or(referent.field_ref);
                            pattern.right_hash.push(pn_getter);
                            pattern.left_hash.push(lhs_getter);
                            self.register_nand_unification(referring, lhs_getter);
                        }
                    }
                }
            }

            if let Some(t) = alt_pn {
                pn_alts.push(t);
            }
            if let Some(t) = alt_jn {
                jn_alts.push(t);
            }
        }

        let final_pn = disjoin_all(self.arena, pn_alts);
        let final_jn = disjoin_all(self.arena, jn_alts);

        if let Some(head) = field.or_alternatives.first().copied() {
            let node = self.tree.node_mut(head);
            node.network_test = final_pn;
            if let Some((selector, value)) = single_literal {
                node.constant_selector = Some(selector);
                node.constant_value = Some(value);
            }
        }
        if let Some(jn) = final_jn {
            pattern.and_jn_test(self.arena, jn);
        }
    }

    /// §4.6.3's `all_variables_in_pattern` question, inverted: does this
    /// and-sibling reference a variable bound in a *different* pattern (a
    /// predicate/return-value body counts as referencing one if any of its
    /// free variables is bound elsewhere)?
    fn references_other_pattern(&self, id: LhsNodeId, pattern_index: u32) -> bool {
        let node = self.tree.node(id);
        match node.test_kind {
            FieldTestKind::Variable => node
                .referring_node
                .map(|r| self.tree.node(r).pattern_index != pattern_index)
                .unwrap_or(false),
            FieldTestKind::Predicate | FieldTestKind::ReturnValue => {
                let expr = node.expression.expect("predicate/return-value carries a body");
                !self.expression_resolvable_at_pn(expr, pattern_index)
            }
            FieldTestKind::Literal | FieldTestKind::Wildcard => false,
        }
    }

    /// `true` iff every variable leaf reachable from `expr` is bound in
    /// `pattern_index` (globals are always resolvable; they are looked up
    /// independently of any pattern binding).
    fn expression_resolvable_at_pn(&self, expr: ExprId, pattern_index: u32) -> bool {
        let mut leaves = Vec::new();
        self.arena.collect(expr, &|tag| tag.is_variable(), &mut leaves);
        leaves.iter().all(|&leaf| match self.arena.node(leaf).tag {
            ExprTag::GlobalVariable(_) => true,
            ExprTag::SfVariable(name) | ExprTag::MfVariable(name) => self
                .bindings
                .get(&name)
                .map(|&r| self.tree.node(r).pattern_index == pattern_index)
                .unwrap_or(true),
            _ => true,
        })
    }

    /// §4.6.4's `getfield_replace`: deep-copies `expr`, rewriting every
    /// bound variable leaf into its pattern-network getter and every global
    /// into a lookup call.
    pub fn getfield_replace(&mut self, id: ExprId) -> ExprId {
        let node = self.arena.node(id).clone();
        match node.tag {
            ExprTag::SfVariable(name) | ExprTag::MfVariable(name) => {
                if let Some(&referring) = self.bindings.get(&name) {
                    let field_ref = self.tree.node(referring).field_ref;
                    if let Some(replacement) = self.vtable.replace_get_pn_value(self.arena, id, field_ref) {
                        return replacement;
                    }
                }
                id
            }
            ExprTag::GlobalVariable(name) => self.global_lookup_call(name),
            _ => {
                let new_args = self.rewrite_chain_pn(node.arg_list);
                self.arena.call(node.tag, new_args)
            }
        }
    }

    fn rewrite_chain_pn(&mut self, head: Option<ExprId>) -> Option<ExprId> {
        let head = head?;
        let next = self.arena.node(head).next_arg;
        let new_head = self.getfield_replace(head);
        let new_next = self.rewrite_chain_pn(next);
        self.arena.append(Some(new_head), new_next)
    }

    /// §4.6.4's `getvar_replace`: deep-copies `expr`, rewriting every bound
    /// variable leaf into its join-network getter. `current_nand_depth` and
    /// `current_join_depth` are the enclosing field's own depths, used to
    /// pick `Lhs`/`Rhs`/`NestedRhs` per the same-depth / cross-depth /
    /// nand-boundary rules.
    pub fn getvar_replace(
        &mut self,
        id: ExprId,
        in_nand: bool,
        current_nand_depth: u32,
        current_join_depth: u32,
    ) -> ExprId {
        let node = self.arena.node(id).clone();
        match node.tag {
            ExprTag::SfVariable(name) | ExprTag::MfVariable(name) => {
                if let Some(&referring) = self.bindings.get(&name) {
                    let referent = self.tree.node(referring).clone();
                    let side = if in_nand {
                        if referent.nand_depth < current_nand_depth {
                            Side::Lhs
                        } else {
                            Side::NestedRhs
                        }
                    } else if referent.join_depth == current_join_depth {
                        Side::Rhs
                    } else {
                        Side::Lhs
                    };
                    if let Some(replacement) =
                        self.vtable.replace_get_jn_value(self.arena, id, referent.field_ref, side)
                    {
                        return replacement;
                    }
                }
                id
            }
            ExprTag::GlobalVariable(name) => self.global_lookup_call(name),
            _ => {
                let new_args = self.rewrite_chain_jn(node.arg_list, in_nand, current_nand_depth, current_join_depth);
                self.arena.call(node.tag, new_args)
            }
        }
    }

    fn rewrite_chain_jn(
        &mut self,
        head: Option<ExprId>,
        in_nand: bool,
        nand_depth: u32,
        join_depth: u32,
    ) -> Option<ExprId> {
        let head = head?;
        let next = self.arena.node(head).next_arg;
        let new_head = self.getvar_replace(head, in_nand, nand_depth, join_depth);
        let new_next = self.rewrite_chain_jn(next, in_nand, nand_depth, join_depth);
        self.arena.append(Some(new_head), new_next)
    }

    fn global_lookup_call(&mut self, name: AtomRef) -> ExprId {
        let name_leaf = self.arena.gen_constant(ExprTag::Symbol(name));
        let lookup = self.atoms.add_symbol("get-global-var");
        self.arena.call(ExprTag::Fcall(lookup), Some(name_leaf))
    }

    fn wrap_not(&mut self, expr: ExprId, negated: bool) -> ExprId {
        if negated {
            self.arena.call(ExprTag::Not, Some(expr))
        } else {
            expr
        }
    }

    /// Generic same-pattern fallback (vtable doc, §4.6.2): when a pattern
    /// kind supplies no `gen_compare_pn_values` hook, compose its own
    /// PN-getters with a plain equality test instead of leaving the
    /// comparison ungenerated.
    fn generic_pn_compare(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let ga = self.vtable.gen_get_pn_value(self.arena, a).unwrap_or(a);
        let gb = self.vtable.gen_get_pn_value(self.arena, b).unwrap_or(b);
        self.eq_or_neq(ga, gb, false, TestScope::Pattern)
    }

    /// Generic cross-pattern fallback: `a` is the right (current-pattern)
    /// field, `b` the left (earlier-bound) referent.
    fn generic_jn_compare(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let ga = self.vtable.gen_get_jn_value(self.arena, a, Side::Rhs).unwrap_or(a);
        let gb = self.vtable.gen_get_jn_value(self.arena, b, Side::Lhs).unwrap_or(b);
        self.eq_or_neq(ga, gb, false, TestScope::Join)
    }

    fn eq_or_neq(&mut self, a: ExprId, b: ExprId, negated: bool, scope: TestScope) -> ExprId {
        let args = self.arena.append(Some(a), Some(b)).unwrap();
        let tag = if negated { ExprTag::Neq(scope) } else { ExprTag::Eq(scope) };
        self.arena.call(tag, Some(args))
    }

    /// §4.6.5: for every currently-open nand frame whose depth is at least
    /// as deep as `referring`'s binding depth, append an external unification
    /// test and hash keys. Not deduplicated across frames — a referent
    /// crossed by two enclosing nand groups gets a test registered in both.
    fn register_nand_unification(&mut self, referring: LhsNodeId, lhs_getter: ExprId) {
        let referent_nand_depth = self.tree.node(referring).nand_depth;
        let field_ref = self.tree.node(referring).field_ref;
        for frame in self.nand_frames.frames_at_or_deeper_mut(referent_nand_depth) {
            if let Some(test) = self.vtable.gen_compare_jn_values(self.arena, field_ref, field_ref, true) {
                frame.external_network_test = Some(conjoin(self.arena, frame.external_network_test, test));
            }
            frame.external_left_hash.push(lhs_getter);
            frame.external_right_hash.push(lhs_getter);
        }
    }
}

fn conjoin_opt(arena: &mut ExprArena, acc: Option<ExprId>, next: ExprId) -> ExprId {
    conjoin(arena, acc, next)
}

fn disjoin_all(arena: &mut ExprArena, terms: Vec<ExprId>) -> Option<ExprId> {
    let mut iter = terms.into_iter();
    let first = iter.next()?;
    let mut acc = first;
    for t in iter {
        acc = disjoin(arena, Some(acc), t);
    }
    Some(acc)
}
