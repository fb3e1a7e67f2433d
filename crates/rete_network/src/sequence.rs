//! Sequence-expansion rewrite (§4.6.8).
//!
//! `$?multifield` and `(expand$ ...)` splice a multifield value into an
//! argument list at call time. Most functions never see the spliced-in
//! arguments directly — the generic `expansion-call` shim evaluates the
//! original call's fixed arguments once, evaluates each `expand$` operand
//! to a multifield, and splices the result in at runtime. A function
//! declares itself incompatible with this scheme via `sequence_use_ok =
//! false`, in which case any `$`-operator argument is a compile-time error
//! instead of a silent rewrite.

use rete_base::{AtomInterner, ErrorKind, Result, Span, SpannedError};
use rete_expr::{ExprArena, ExprId, ExprTag};

/// The subset of the function-registry contract (§6) this rewrite needs.
pub trait FunctionRegistry {
    /// `true` if calls to `name` may have their `$`-operator arguments
    /// rewritten through the generic `expansion-call` shim. `false` means
    /// the function rejects sequence-expansion arguments outright.
    fn sequence_use_ok(&self, name: &str) -> bool;
}

fn is_sequence_operand(arena: &ExprArena, atoms: &AtomInterner, id: ExprId) -> bool {
    match arena.node(id).tag {
        ExprTag::MfVariable(_) | ExprTag::MfWildcard => true,
        ExprTag::Fcall(r) => matches!(atoms.value(r), rete_base::AtomValue::Symbol("expand$")),
        _ => false,
    }
}

fn call_name<'a>(arena: &ExprArena, atoms: &'a AtomInterner, call: ExprId) -> Option<&'a str> {
    let r = match arena.node(call).tag {
        ExprTag::Fcall(r) | ExprTag::Gcall(r) | ExprTag::Pcall(r) => r,
        _ => return None,
    };
    match atoms.value(r) {
        rete_base::AtomValue::Symbol(s) => Some(s),
        _ => None,
    }
}

/// Rewrites `call`'s argument list in place if any argument is a
/// sequence-expansion operand and the called function's `sequence_use_ok`
/// flag permits it. Returns the (possibly rewritten) call node, or a
/// semantic error if the function rejects sequence-expansion arguments.
pub fn replace_sequence_expansion_ops(
    arena: &mut ExprArena,
    atoms: &mut AtomInterner,
    registry: &dyn FunctionRegistry,
    call: ExprId,
) -> Result<ExprId> {
    let Some(name) = call_name(arena, atoms, call).map(str::to_string) else {
        return Ok(call);
    };
    let args = arena.children(call);
    let sequence_args: Vec<ExprId> = args
        .iter()
        .copied()
        .filter(|&a| is_sequence_operand(arena, atoms, a))
        .collect();
    if sequence_args.is_empty() {
        return Ok(call);
    }
    if !registry.sequence_use_ok(&name) {
        return Err(SpannedError::new(
            ErrorKind::Semantic,
            format!("function '{name}' does not accept a sequence-expansion argument"),
            Span::default(),
        ));
    }

    let expand_symbol = atoms.add_symbol("expand$");
    let expansion_call_symbol = atoms.add_symbol("expansion-call");

    let mut shims: Option<ExprId> = None;
    for &seq_arg in &sequence_args {
        let shim = if matches!(arena.node(seq_arg).tag, ExprTag::Fcall(r) if matches!(atoms.value(r), rete_base::AtomValue::Symbol("expand$")))
        {
            seq_arg
        } else {
            arena.call(ExprTag::Fcall(expand_symbol), Some(seq_arg))
        };
        shims = Some(arena.append(shims, Some(shim)).unwrap());
    }

    let new_args = arena.append(Some(call), shims);
    Ok(arena.call(ExprTag::Fcall(expansion_call_symbol), new_args))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysOk;
    impl FunctionRegistry for AlwaysOk {
        fn sequence_use_ok(&self, _name: &str) -> bool {
            true
        }
    }

    struct NeverOk;
    impl FunctionRegistry for NeverOk {
        fn sequence_use_ok(&self, _name: &str) -> bool {
            false
        }
    }

    #[test]
    fn call_with_no_sequence_args_is_untouched() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let lit = arena.gen_constant(ExprTag::Integer(atoms.add_integer(1)));
        let call = arena.call(ExprTag::Fcall(atoms.add_symbol("+")), Some(lit));
        let result = replace_sequence_expansion_ops(&mut arena, &mut atoms, &AlwaysOk, call).unwrap();
        assert_eq!(result, call);
    }

    #[test]
    fn multifield_variable_argument_triggers_expansion_call_rewrite() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let mf = arena.gen_constant(ExprTag::MfVariable(atoms.add_symbol("args")));
        let call = arena.call(ExprTag::Fcall(atoms.add_symbol("+")), Some(mf));
        let result = replace_sequence_expansion_ops(&mut arena, &mut atoms, &AlwaysOk, call).unwrap();
        assert_ne!(result, call);
        let children = arena.children(result);
        assert_eq!(children[0], call);
        assert!(matches!(arena.node(children[1]).tag, ExprTag::Fcall(_)));
    }

    #[test]
    fn sequence_use_not_ok_rejects_at_compile_time() {
        let mut arena = ExprArena::new();
        let mut atoms = AtomInterner::new();
        let mf = arena.gen_constant(ExprTag::MfVariable(atoms.add_symbol("args")));
        let call = arena.call(ExprTag::Fcall(atoms.add_symbol("str-cat")), Some(mf));
        let err = replace_sequence_expansion_ops(&mut arena, &mut atoms, &NeverOk, call).unwrap_err();
        assert!(err.to_string().contains("does not accept"));
    }
}
