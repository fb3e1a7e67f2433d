//! The expression arena: a generic tree node, `{ tag, arg_list, next_arg }`,
//! allocated by integer index rather than by owning pointer.
//!
//! Allocating nodes by index and storing indices for every reference —
//! including back-references like a join-network comparison's target
//! variable — avoids cyclic owning references while preserving O(1) access.
//! The whole arena is dropped in one step when the enclosing construct is
//! torn down or committed, the same lifetime discipline a bump allocator
//! gives the rest of this workspace, just indexed instead of pointer-based
//! because nodes need to reference each other before either is known to be
//! final.

use crate::tag::ExprTag;
use rete_base::{AtomInterner, AtomRef, ErrorKind, Result, Span, SpannedError};

/// An index into an [`ExprArena`]. Cheap to copy and to store as a
/// back-reference; meaningless outside the arena that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

impl ExprId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub tag: ExprTag,
    /// First child, if any.
    pub arg_list: Option<ExprId>,
    /// Next sibling, if any.
    pub next_arg: Option<ExprId>,
}

/// Owns every expression node allocated during one construct's parse.
#[derive(Default)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena { nodes: Vec::new() }
    }

    pub fn node(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    fn push(&mut self, node: ExprNode) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocates a single leaf node carrying no children.
    pub fn gen_constant(&mut self, tag: ExprTag) -> ExprId {
        self.push(ExprNode {
            tag,
            arg_list: None,
            next_arg: None,
        })
    }

    /// Allocates a call/connective node whose children are the given
    /// argument chain (already linked via `next_arg`, as produced by
    /// [`Self::append`] or a prior [`Self::call`]).
    pub fn call(&mut self, tag: ExprTag, arg_list: Option<ExprId>) -> ExprId {
        self.push(ExprNode {
            tag,
            arg_list,
            next_arg: None,
        })
    }

    /// Concatenates two sibling chains: every node reachable from `a` via
    /// `next_arg`, followed by the chain rooted at `b`. Mutates `a`'s last
    /// node in place rather than copying, matching the teacher's in-place
    /// arena-append idiom for bump-allocated slices.
    pub fn append(&mut self, a: Option<ExprId>, b: Option<ExprId>) -> Option<ExprId> {
        match (a, b) {
            (None, b) => b,
            (Some(a0), None) => Some(a0),
            (Some(a0), Some(b0)) => {
                let mut cursor = a0;
                loop {
                    match self.nodes[cursor.index()].next_arg {
                        Some(next) => cursor = next,
                        None => break,
                    }
                }
                self.nodes[cursor.index()].next_arg = Some(b0);
                Some(a0)
            }
        }
    }

    /// Deep-copies a single node and its children, discarding the source
    /// node's own `next_arg` link (the copy stands alone; re-chain it with
    /// [`Self::append`] if it needs siblings).
    pub fn copy(&mut self, id: ExprId) -> ExprId {
        let node = self.nodes[id.index()].clone();
        let new_children = self.copy_chain(node.arg_list);
        self.push(ExprNode {
            tag: node.tag,
            arg_list: new_children,
            next_arg: None,
        })
    }

    /// Deep-copies an entire sibling chain starting at `head`, following
    /// both `arg_list` and `next_arg` recursively. Used to duplicate a full
    /// argument list, e.g. before substituting variables in place during
    /// network-test generation.
    pub fn copy_chain(&mut self, head: Option<ExprId>) -> Option<ExprId> {
        let head = head?;
        let node = self.nodes[head.index()].clone();
        let new_children = self.copy_chain(node.arg_list);
        let new_id = self.push(ExprNode {
            tag: node.tag,
            arg_list: new_children,
            next_arg: None,
        });
        let new_next = self.copy_chain(node.next_arg);
        self.nodes[new_id.index()].next_arg = new_next;
        Some(new_id)
    }

    fn walk_refs(&self, id: Option<ExprId>, f: &mut impl FnMut(AtomRef)) {
        let Some(id) = id else { return };
        let node = &self.nodes[id.index()];
        if let Some(r) = node.tag.atom_ref() {
            f(r);
        }
        self.walk_refs(node.arg_list, f);
        self.walk_refs(node.next_arg, f);
    }

    /// Recursively increments the refcount of every atom referenced by `id`
    /// and everything reachable from it (children and remaining siblings).
    pub fn install(&self, id: ExprId, atoms: &mut AtomInterner) {
        self.walk_refs(Some(id), &mut |r| atoms.increment(r));
    }

    /// The inverse of [`Self::install`]. Returns an invariant error if any
    /// referenced atom's count was already zero (a pairing bug: something
    /// was deinstalled that was never installed).
    pub fn deinstall(&self, id: ExprId, atoms: &mut AtomInterner) -> Result<()> {
        let mut first_error: Option<String> = None;
        self.walk_refs(Some(id), &mut |r| {
            if let Err(e) = atoms.decrement(r) {
                first_error.get_or_insert(e);
            }
        });
        match first_error {
            Some(message) => Err(SpannedError::new(ErrorKind::Invariant, message, Span::default())),
            None => Ok(()),
        }
    }

    /// `true` if any node reachable from `id` (children and remaining
    /// siblings) is a variable or wildcard. Global variables are counted
    /// only when `include_globals` is set, since a global reference does
    /// not create a pattern-local binding.
    pub fn contains_variables(&self, id: ExprId, include_globals: bool) -> bool {
        self.any(Some(id), &|tag| {
            tag.is_variable() && (include_globals || !tag.is_global_variable())
        })
    }

    fn any(&self, id: Option<ExprId>, pred: &impl Fn(&ExprTag) -> bool) -> bool {
        let Some(id) = id else { return false };
        let node = &self.nodes[id.index()];
        if pred(&node.tag) {
            return true;
        }
        self.any(node.arg_list, pred) || self.any(node.next_arg, pred)
    }

    /// Every node reachable from `id` (children and remaining siblings)
    /// whose tag satisfies `pred`, in tree order.
    pub fn collect<'a>(&'a self, id: ExprId, pred: &impl Fn(&ExprTag) -> bool, out: &mut Vec<ExprId>) {
        self.collect_opt(Some(id), pred, out);
    }

    fn collect_opt(&self, id: Option<ExprId>, pred: &impl Fn(&ExprTag) -> bool, out: &mut Vec<ExprId>) {
        let Some(id) = id else { return };
        let node = &self.nodes[id.index()];
        if pred(&node.tag) {
            out.push(id);
        }
        self.collect_opt(node.arg_list, pred, out);
        self.collect_opt(node.next_arg, pred, out);
    }

    /// Iterates the direct children of `id` (the `arg_list` sibling chain),
    /// left to right.
    pub fn children(&self, id: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes[id.index()].arg_list;
        while let Some(c) = cursor {
            out.push(c);
            cursor = self.nodes[c.index()].next_arg;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rete_base::AtomInterner;

    #[test]
    fn gen_constant_is_childless() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let r = atoms.add_integer(5);
        let id = arena.gen_constant(ExprTag::Integer(r));
        assert!(arena.node(id).arg_list.is_none());
        assert!(arena.node(id).next_arg.is_none());
    }

    #[test]
    fn append_chains_two_lists() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let a = arena.gen_constant(ExprTag::Integer(atoms.add_integer(1)));
        let b = arena.gen_constant(ExprTag::Integer(atoms.add_integer(2)));
        let c = arena.gen_constant(ExprTag::Integer(atoms.add_integer(3)));
        let ab = arena.append(Some(a), Some(b));
        let abc = arena.append(ab, Some(c));
        assert_eq!(arena.children(arena.call(ExprTag::And, abc)).len(), 3);
    }

    #[test]
    fn copy_produces_independent_children() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let leaf = arena.gen_constant(ExprTag::Integer(atoms.add_integer(9)));
        let call = arena.call(ExprTag::Fcall(atoms.add_symbol("+")), Some(leaf));
        let copied = arena.copy(call);
        assert_ne!(copied, call);
        assert_eq!(arena.children(copied).len(), 1);
    }

    #[test]
    fn copy_chain_duplicates_every_sibling() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let a = arena.gen_constant(ExprTag::Integer(atoms.add_integer(1)));
        let b = arena.gen_constant(ExprTag::Integer(atoms.add_integer(2)));
        let chain = arena.append(Some(a), Some(b)).unwrap();
        let copied = arena.copy_chain(Some(chain)).unwrap();
        assert_ne!(copied, chain);
        let wrapper = arena.call(ExprTag::And, Some(copied));
        assert_eq!(arena.children(wrapper).len(), 2);
    }

    #[test]
    fn install_and_deinstall_are_refcount_neutral() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let r = atoms.add_symbol("foo");
        let leaf = arena.gen_constant(ExprTag::Symbol(r));
        atoms.sweep();
        assert!(atoms.find_symbol("foo").is_none());

        let r2 = atoms.add_symbol("foo");
        let leaf2 = arena.gen_constant(ExprTag::Symbol(r2));
        arena.install(leaf2, &mut atoms);
        atoms.sweep();
        assert!(atoms.find_symbol("foo").is_some());
        arena.deinstall(leaf2, &mut atoms).unwrap();
        atoms.sweep();
        assert!(atoms.find_symbol("foo").is_none());
        let _ = leaf;
    }

    #[test]
    fn contains_variables_detects_sf_variable() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let var = arena.gen_constant(ExprTag::SfVariable(atoms.add_symbol("x")));
        let lit = arena.gen_constant(ExprTag::Integer(atoms.add_integer(1)));
        let args = arena.append(Some(lit), Some(var)).unwrap();
        let call = arena.call(ExprTag::Fcall(atoms.add_symbol("+")), Some(args));
        assert!(arena.contains_variables(call, false));
    }

    #[test]
    fn contains_variables_excludes_globals_unless_asked() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let global = arena.gen_constant(ExprTag::GlobalVariable(atoms.add_symbol("limit")));
        assert!(!arena.contains_variables(global, false));
        assert!(arena.contains_variables(global, true));
    }
}
