//! Expression parser: token stream to [`ExprArena`] nodes.
//!
//! Grounded on `exprnpsr.c`'s `Function0Parse`/`ArgumentParse` pair: a call
//! is `(name arg*)`, a bare token other than `(` is a literal, a variable, or
//! a wildcard, and the function name's own classification (built-in,
//! generic, deffunction) decides which [`ExprTag`] call variant the node
//! gets. This crate does not itself know the full set of built-in function
//! names — that list belongs to whatever embeds this compilation core — so
//! callers supply a [`CallResolver`].
//!
//! Every diagnostic is both returned as an `Err(SpannedError)` and emitted
//! to the caller's [`Router`] on [`Channel::Error`] before it's returned,
//! keyed by `source_name` — the compiler never prints directly, it hands
//! text to a router the same way the original hands text to its output
//! router.
//!
//! The argument-list loop is also a yield point for cooperative
//! cancellation: before reading each argument it checks
//! [`Environment::halt_requested`], so a halt requested mid-parse of a long
//! call unwinds instead of running to the closing paren.

use crate::cursor::TokenCursor;
use rete_base::{
    AtomInterner, AtomRef, AtomValue, Channel, Environment, ErrorKind, Result, Router, SpannedError,
};
use rete_expr::{ExprArena, ExprId, ExprTag};
use rete_scanner::{Token, TokenKind};

/// How a call's function name should be tagged in the expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// A function built into the evaluator itself.
    Builtin,
    /// An overloaded user-defined generic function.
    Generic,
    /// A user-defined deffunction (procedural call).
    Procedural,
}

/// Classifies a call's function name. The expression parser has no built-in
/// notion of which names exist; a caller that has already loaded a function
/// registry (deffunctions, defgenerics) supplies this.
pub trait CallResolver {
    fn classify(&self, name: &str) -> CallKind;
}

/// A resolver that treats every call as a built-in, for callers that have
/// not yet wired in deffunction/defgeneric tracking (or are parsing
/// constraint/LHS test expressions, where only built-ins appear).
pub struct BuiltinOnly;

impl CallResolver for BuiltinOnly {
    fn classify(&self, _name: &str) -> CallKind {
        CallKind::Builtin
    }
}

fn atom_text<'a>(atoms: &'a AtomInterner, r: AtomRef) -> &'a str {
    match atoms.value(r) {
        AtomValue::Symbol(s) => s,
        _ => unreachable!("function names are always interned as symbols"),
    }
}

fn fail(router: &mut dyn Router, source_name: &str, err: SpannedError) -> SpannedError {
    router.emit(Channel::Error, source_name, &err.to_string());
    err
}

/// Reads exactly one expression (a literal, variable, wildcard, or a fully
/// parenthesized call) from `cursor`.
pub fn parse_expression(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    arena: &mut ExprArena,
    resolver: &dyn CallResolver,
    env: &Environment,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<ExprId> {
    let tok = cursor.next(atoms)?;
    parse_expression_from(tok, cursor, atoms, arena, resolver, env, router, source_name)
}

fn parse_expression_from(
    tok: Token,
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    arena: &mut ExprArena,
    resolver: &dyn CallResolver,
    env: &Environment,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<ExprId> {
    match tok.kind {
        TokenKind::LParen => parse_call(cursor, atoms, arena, resolver, env, router, source_name),
        TokenKind::Symbol(r) => Ok(arena.gen_constant(ExprTag::Symbol(r))),
        TokenKind::String(r) => Ok(arena.gen_constant(ExprTag::String(r))),
        TokenKind::InstanceName(r) => Ok(arena.gen_constant(ExprTag::InstanceName(r))),
        TokenKind::Integer(r) => Ok(arena.gen_constant(ExprTag::Integer(r))),
        TokenKind::Float(r) => Ok(arena.gen_constant(ExprTag::Float(r))),
        TokenKind::SfVariable(r) => Ok(arena.gen_constant(ExprTag::SfVariable(r))),
        TokenKind::MfVariable(r) => Ok(arena.gen_constant(ExprTag::MfVariable(r))),
        TokenKind::GlobalVariable(r) => Ok(arena.gen_constant(ExprTag::GlobalVariable(r))),
        TokenKind::SfWildcard => Ok(arena.gen_constant(ExprTag::SfWildcard)),
        TokenKind::MfWildcard => Ok(arena.gen_constant(ExprTag::MfWildcard)),
        TokenKind::RParen => Err(fail(
            router,
            source_name,
            SpannedError::syntactic("unexpected ')'; expected an expression", tok.span),
        )),
        TokenKind::Not | TokenKind::Or | TokenKind::And => Err(fail(
            router,
            source_name,
            SpannedError::syntactic(
                format!("'{}' is only valid inside a pattern field's constraint chain", tok.print_form),
                tok.span,
            ),
        )),
        TokenKind::Stop => Err(fail(
            router,
            source_name,
            SpannedError::syntactic("unexpected end of input; expected an expression", tok.span),
        )),
        TokenKind::Unknown(b) => Err(fail(
            router,
            source_name,
            SpannedError::lexical(format!("unexpected byte 0x{b:02x}"), tok.span),
        )),
    }
}

/// Parses `(name arg*)` once the opening `(` has already been consumed.
/// `(bind ?var expr*)` is recognized directly, since the bound variable is a
/// bare `?name`, not a parsed expression, and would otherwise be
/// indistinguishable from an ordinary single-field-variable argument.
fn parse_call(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    arena: &mut ExprArena,
    resolver: &dyn CallResolver,
    env: &Environment,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<ExprId> {
    let name_tok = cursor.next(atoms)?;
    let name_ref = match name_tok.kind {
        TokenKind::Symbol(r) => r,
        _ => {
            return Err(fail(
                router,
                source_name,
                SpannedError::syntactic("a function call must begin with a function name", name_tok.span),
            ))
        }
    };

    if atom_text(atoms, name_ref) == "bind" {
        return parse_bind(cursor, atoms, arena, resolver, env, router, source_name);
    }

    let kind = resolver.classify(atom_text(atoms, name_ref));
    let args = parse_arg_list(cursor, atoms, arena, resolver, env, router, source_name)?;
    let tag = match kind {
        CallKind::Builtin => ExprTag::Fcall(name_ref),
        CallKind::Generic => ExprTag::Gcall(name_ref),
        CallKind::Procedural => ExprTag::Pcall(name_ref),
    };
    Ok(arena.call(tag, args))
}

fn parse_bind(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    arena: &mut ExprArena,
    resolver: &dyn CallResolver,
    env: &Environment,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<ExprId> {
    let var_tok = cursor.next(atoms)?;
    let var_ref = match var_tok.kind {
        TokenKind::SfVariable(r) => r,
        _ => {
            return Err(fail(
                router,
                source_name,
                SpannedError::syntactic("bind's first argument must be a single-field variable", var_tok.span),
            ))
        }
    };
    let args = parse_arg_list(cursor, atoms, arena, resolver, env, router, source_name)?;
    Ok(arena.call(ExprTag::Bind(var_ref), args))
}

/// Reads expressions until the matching `)`, chaining them via
/// [`ExprArena::append`]. Checked for a requested halt at the top of every
/// iteration, the same yield point the original gives `ArgumentParse`'s
/// argument-reading loop.
fn parse_arg_list(
    cursor: &mut TokenCursor,
    atoms: &mut AtomInterner,
    arena: &mut ExprArena,
    resolver: &dyn CallResolver,
    env: &Environment,
    router: &mut dyn Router,
    source_name: &str,
) -> Result<Option<ExprId>> {
    let mut args: Option<ExprId> = None;
    loop {
        let tok = cursor.next(atoms)?;
        if env.halt_requested() {
            return Err(fail(
                router,
                source_name,
                SpannedError::new(ErrorKind::Resource, "compilation halted while parsing a function call", tok.span),
            ));
        }
        if tok.kind == TokenKind::RParen {
            return Ok(args);
        }
        if tok.kind == TokenKind::Stop {
            return Err(fail(
                router,
                source_name,
                SpannedError::new(ErrorKind::Syntactic, "unexpected end of input inside a function call", tok.span),
            ));
        }
        let arg = parse_expression_from(tok, cursor, atoms, arena, resolver, env, router, source_name)?;
        args = arena.append(args, Some(arg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rete_base::RecordingRouter;
    use rete_scanner::Scanner;

    fn parse(src: &str) -> (ExprArena, AtomInterner, ExprId, RecordingRouter) {
        let mut atoms = AtomInterner::new();
        let mut arena = ExprArena::new();
        let mut scanner = Scanner::new(src);
        let mut cursor = TokenCursor::new(&mut scanner);
        let env = Environment::default();
        let mut router = RecordingRouter::new();
        let id =
            parse_expression(&mut cursor, &mut atoms, &mut arena, &BuiltinOnly, &env, &mut router, "test").unwrap();
        (arena, atoms, id, router)
    }

    #[test]
    fn bare_literal_is_a_leaf() {
        let (arena, atoms, id, _router) = parse("42");
        assert!(matches!(arena.node(id).tag, ExprTag::Integer(r) if matches!(atoms.value(r), AtomValue::Integer(42))));
        assert!(arena.node(id).arg_list.is_none());
    }

    #[test]
    fn nested_call_produces_fcall_with_children() {
        let (arena, atoms, id, _router) = parse("(+ 1 (* 2 3))");
        assert!(matches!(arena.node(id).tag, ExprTag::Fcall(r) if matches!(atoms.value(r), AtomValue::Symbol("+"))));
        let children = arena.children(id);
        assert_eq!(children.len(), 2);
        assert!(matches!(arena.node(children[1]).tag, ExprTag::Fcall(_)));
        assert_eq!(arena.children(children[1]).len(), 2);
    }

    #[test]
    fn bind_call_tags_the_variable_on_the_node_itself() {
        let (arena, atoms, id, _router) = parse("(bind ?x (+ 1 2))");
        match arena.node(id).tag {
            ExprTag::Bind(r) => assert!(matches!(atoms.value(r), AtomValue::Symbol("x"))),
            other => panic!("expected Bind, got {other:?}"),
        }
        assert_eq!(arena.children(id).len(), 1);
    }

    #[test]
    fn generic_resolver_tags_gcall() {
        struct AllGeneric;
        impl CallResolver for AllGeneric {
            fn classify(&self, _name: &str) -> CallKind {
                CallKind::Generic
            }
        }
        let mut atoms = AtomInterner::new();
        let mut arena = ExprArena::new();
        let mut scanner = Scanner::new("(area-of ?shape)");
        let mut cursor = TokenCursor::new(&mut scanner);
        let env = Environment::default();
        let mut router = RecordingRouter::new();
        let id =
            parse_expression(&mut cursor, &mut atoms, &mut arena, &AllGeneric, &env, &mut router, "test").unwrap();
        assert!(matches!(arena.node(id).tag, ExprTag::Gcall(_)));
    }

    #[test]
    fn unmatched_close_paren_is_syntactic() {
        let mut atoms = AtomInterner::new();
        let mut arena = ExprArena::new();
        let mut scanner = Scanner::new(")");
        let mut cursor = TokenCursor::new(&mut scanner);
        let env = Environment::default();
        let mut router = RecordingRouter::new();
        let err = parse_expression(&mut cursor, &mut atoms, &mut arena, &BuiltinOnly, &env, &mut router, "test")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntactic);
        assert_eq!(router.on(Channel::Error).len(), 1);
    }

    #[test]
    fn unterminated_call_is_syntactic() {
        let mut atoms = AtomInterner::new();
        let mut arena = ExprArena::new();
        let mut scanner = Scanner::new("(+ 1 2");
        let mut cursor = TokenCursor::new(&mut scanner);
        let env = Environment::default();
        let mut router = RecordingRouter::new();
        let err = parse_expression(&mut cursor, &mut atoms, &mut arena, &BuiltinOnly, &env, &mut router, "test")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntactic);
        assert_eq!(router.on(Channel::Error).len(), 1);
    }

    #[test]
    fn halt_requested_aborts_argument_list() {
        let mut atoms = AtomInterner::new();
        let mut arena = ExprArena::new();
        let mut scanner = Scanner::new("(+ 1 2)");
        let mut cursor = TokenCursor::new(&mut scanner);
        let mut env = Environment::default();
        env.request_halt();
        let mut router = RecordingRouter::new();
        let err = parse_expression(&mut cursor, &mut atoms, &mut arena, &BuiltinOnly, &env, &mut router, "test")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resource);
        assert_eq!(router.on(Channel::Error).len(), 1);
    }
}
