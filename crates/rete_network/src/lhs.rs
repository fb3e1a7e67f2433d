//! The LHS parse tree: `right` links and-siblings within one field,
//! `bottom` links or-alternatives of a field and chains fields downward
//! through a pattern.

use rete_expr::ExprId;

/// An index into an [`LhsTree`]. Back-references (`referring_node`) are
/// stored as these rather than owning pointers, the same discipline
/// `rete-expr` uses for its own node references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LhsNodeId(u32);

impl LhsNodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of test a field's and-sibling chain performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTestKind {
    Literal,
    Predicate,
    ReturnValue,
    Variable,
    Wildcard,
}

#[derive(Debug, Clone)]
pub struct LhsNode {
    pub test_kind: FieldTestKind,
    pub negated: bool,
    pub pattern_index: u32,
    pub join_depth: u32,
    pub nand_depth: u32,
    /// Earliest binding occurrence of this field's variable elsewhere in
    /// the rule, if this field is itself a variable reference.
    pub referring_node: Option<LhsNodeId>,
    /// The and-/or-chain's predicate or return-value subtree, or the
    /// literal/variable payload for the simpler test kinds.
    pub expression: Option<ExprId>,
    /// Next and-sibling within the same field.
    pub right: Option<LhsNodeId>,
    /// Next or-alternative of this field, or (on the last field of an
    /// or-chain) the next field down the pattern.
    pub bottom: Option<LhsNodeId>,
    /// The compiled pattern-network test for this field, once generated.
    pub network_test: Option<ExprId>,
    /// Set when this field has a single un-negated literal or-alternative:
    /// the getter and the literal become an alpha-hash key.
    pub constant_selector: Option<ExprId>,
    pub constant_value: Option<ExprId>,
    /// The pattern-kind-supplied placeholder expression identifying which
    /// slot/field this node tests. Passed opaquely to every
    /// [`crate::vtable::PatternTypeVTable`] hook; the generator never
    /// inspects its shape.
    pub field_ref: ExprId,
}

impl LhsNode {
    pub fn new(
        test_kind: FieldTestKind,
        pattern_index: u32,
        join_depth: u32,
        nand_depth: u32,
        field_ref: ExprId,
    ) -> Self {
        LhsNode {
            test_kind,
            negated: false,
            pattern_index,
            join_depth,
            nand_depth,
            referring_node: None,
            expression: None,
            right: None,
            bottom: None,
            network_test: None,
            constant_selector: None,
            constant_value: None,
            field_ref,
        }
    }
}

/// Owns every field node allocated while parsing one rule's LHS.
#[derive(Default)]
pub struct LhsTree {
    nodes: Vec<LhsNode>,
}

impl LhsTree {
    pub fn new() -> Self {
        LhsTree { nodes: Vec::new() }
    }

    pub fn push(&mut self, node: LhsNode) -> LhsNodeId {
        let id = LhsNodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: LhsNodeId) -> &LhsNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: LhsNodeId) -> &mut LhsNode {
        &mut self.nodes[id.index()]
    }

    /// Every and-sibling of `head`, in order.
    pub fn and_chain(&self, head: LhsNodeId) -> Vec<LhsNodeId> {
        let mut out = vec![head];
        let mut cursor = self.node(head).right;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.node(id).right;
        }
        out
    }

    /// Whether every and-sibling of the or-alternative rooted at `head`
    /// references only variables bound in `pattern_index` (the question
    /// the §4.6.3 decision procedure asks per or-alternative).
    pub fn all_variables_in_pattern(
        &self,
        head: LhsNodeId,
        pattern_index: u32,
        is_cross_pattern: impl Fn(LhsNodeId) -> bool,
    ) -> bool {
        self.and_chain(head).iter().all(|&id| {
            let node = self.node(id);
            node.pattern_index == pattern_index && !is_cross_pattern(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rete_expr::{ExprArena, ExprTag};

    fn dummy_field_ref(arena: &mut ExprArena) -> ExprId {
        arena.gen_constant(ExprTag::Void)
    }

    #[test]
    fn and_chain_collects_right_links() {
        let mut arena = ExprArena::new();
        let f = dummy_field_ref(&mut arena);
        let mut tree = LhsTree::new();
        let a = tree.push(LhsNode::new(FieldTestKind::Literal, 0, 0, 0, f));
        let b = tree.push(LhsNode::new(FieldTestKind::Literal, 0, 0, 0, f));
        tree.node_mut(a).right = Some(b);
        assert_eq!(tree.and_chain(a), vec![a, b]);
    }

    #[test]
    fn all_variables_in_pattern_detects_cross_pattern_reference() {
        let mut arena = ExprArena::new();
        let f = dummy_field_ref(&mut arena);
        let mut tree = LhsTree::new();
        let a = tree.push(LhsNode::new(FieldTestKind::Variable, 0, 0, 0, f));
        assert!(tree.all_variables_in_pattern(a, 0, |_| false));
        assert!(!tree.all_variables_in_pattern(a, 0, |_| true));
    }
}
