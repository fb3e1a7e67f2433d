//! The node-tag space shared by parsed user code, constraint bodies, RHS
//! actions, and generated network tests.

use rete_base::AtomRef;

/// One node's discriminant and payload. A single enum spans every phase
/// that shares this tree shape; callers that need phase-specific safety
/// (e.g. "this is a network test, not raw user syntax") wrap [`ExprArena`]
/// behind a newtype rather than duplicating the tag space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExprTag {
    Symbol(AtomRef),
    String(AtomRef),
    InstanceName(AtomRef),
    Integer(AtomRef),
    Float(AtomRef),
    Bitmap(AtomRef),
    ExternalAddress(AtomRef),
    FactAddress,
    InstanceAddress,
    Void,

    /// `?name`
    SfVariable(AtomRef),
    /// `$?name`
    MfVariable(AtomRef),
    /// `?*name*`
    GlobalVariable(AtomRef),
    SfWildcard,
    MfWildcard,

    /// Built-in function call.
    Fcall(AtomRef),
    /// Generic (overloaded user) function call.
    Gcall(AtomRef),
    /// Deffunction (user-procedural) call.
    Pcall(AtomRef),
    /// `(bind ?var <expr>)` on an RHS.
    Bind(AtomRef),

    /// Constraint connectives, used inside LHS field and-/or-chains.
    Not,
    And,
    Or,

    /// Generated network test comparators (§4.6). `Eq`/`Neq` pair with a
    /// `scope` to distinguish pattern-network (intra-pattern) from
    /// join-network (inter-pattern) evaluation, since both share this tag
    /// space once emitted by the generator.
    Eq(TestScope),
    Neq(TestScope),
}

/// Where a generated comparator test runs: against a single candidate fact
/// in the discrimination network, or against a partial match crossing a
/// join node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestScope {
    Pattern,
    Join,
}

impl ExprTag {
    /// The interned atom this tag directly references, if any.
    pub fn atom_ref(&self) -> Option<AtomRef> {
        match *self {
            ExprTag::Symbol(r)
            | ExprTag::String(r)
            | ExprTag::InstanceName(r)
            | ExprTag::Integer(r)
            | ExprTag::Float(r)
            | ExprTag::Bitmap(r)
            | ExprTag::ExternalAddress(r)
            | ExprTag::SfVariable(r)
            | ExprTag::MfVariable(r)
            | ExprTag::GlobalVariable(r)
            | ExprTag::Fcall(r)
            | ExprTag::Gcall(r)
            | ExprTag::Pcall(r)
            | ExprTag::Bind(r) => Some(r),
            _ => None,
        }
    }

    /// `true` for any of the four variable/wildcard forms.
    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            ExprTag::SfVariable(_)
                | ExprTag::MfVariable(_)
                | ExprTag::GlobalVariable(_)
                | ExprTag::SfWildcard
                | ExprTag::MfWildcard
        )
    }

    pub fn is_global_variable(&self) -> bool {
        matches!(self, ExprTag::GlobalVariable(_))
    }

    pub fn is_call(&self) -> bool {
        matches!(self, ExprTag::Fcall(_) | ExprTag::Gcall(_) | ExprTag::Pcall(_))
    }
}
