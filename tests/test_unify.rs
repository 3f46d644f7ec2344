// tests/test_unify.rs

mod common;

use std::cmp::Ordering;

use common::{parse_pair, parse_term};
use curlog::{BindMode, Context};

struct UnifyRow {
    term1: &'static str,
    term2: &'static str,
    mode: BindMode,
    /// Expected canonical text of both terms after success, None for
    /// expected failure.
    result: Option<&'static str>,
    /// Skip the after-backtrack round-trip (inputs whose text is not
    /// canonical).
    no_reverse: bool,
}

const D: BindMode = BindMode::Default;
const E: BindMode = BindMode::Equality;
const O: BindMode = BindMode::OneWay;

fn row(
    term1: &'static str,
    term2: &'static str,
    mode: BindMode,
    result: Option<&'static str>,
) -> UnifyRow {
    UnifyRow { term1, term2, mode, result, no_reverse: false }
}

#[test]
fn test_unify_table() {
    let rows = vec![
        row("X", "atom", D, Some("atom")),
        row("atom", "X", D, Some("atom")),
        row("X", "X", D, Some("X")),
        row("X", "Y", D, Some("Y")),
        row("X", "Y", E, None),
        row("X", "X", E, Some("X")),
        row("atom", "mota", D, None),
        row("atom", "atom", D, Some("atom")),
        row("atom", "foo(a)", D, None),
        row("foo(a)", "atom", D, None),
        UnifyRow { term1: "atom", term2: "atom()", mode: D, result: Some("atom"), no_reverse: true },
        row("foo(a)", "foo(a)", D, Some("foo(a)")),
        row("foo(a, b)", "foo(a)", D, None),
        row("foo(a)", "foo(X)", D, Some("foo(a)")),
        row("foo(X)", "foo(a)", D, Some("foo(a)")),
        row("foo(X, Y)", "foo(Y, Z)", D, Some("foo(Z, Z)")),
        row("foo(a)", "foo(b)", D, None),
        row("[a]", "a", D, None),
        row("[a]", "[]", D, None),
        row("[]", "[]", D, Some("[]")),
        row("[a]", "[a]", D, Some("[a]")),
        row("[a]", "[b]", D, None),
        row("[a|T]", "[a|U]", D, Some("[a|U]")),
        row("[a|T]", "[a, b, c]", D, Some("[a, b, c]")),
        row("[a, b|T]", "[a, b, c]", D, Some("[a, b, c]")),
        UnifyRow { term1: "[a, b|[]]", term2: "[a, b|T]", mode: D, result: Some("[a, b]"), no_reverse: true },
        row("\"foo\"", "foo", D, None),
        row("\"foo\"", "Foo", D, Some("\"foo\"")),
        row("Foo", "\"foo\"", D, Some("\"foo\"")),
        row("\"foo\"", "\"foo\"", D, Some("\"foo\"")),
        row("\"foo\"", "\"bar\"", D, None),
        row("\"foo\"", "\"foobar\"", D, None),
        row("42", "foo", D, None),
        row("42", "X", D, Some("42")),
        row("X", "42", D, Some("42")),
        row("42", "42", D, Some("42")),
        row("42", "41", D, None),
        row("42.5", "X", D, Some("42.5")),
        row("X", "42.5", D, Some("42.5")),
        row("42.5", "42.5", D, Some("42.5")),
        row("42.5", "41.5", D, None),
        row("X", "foo(Y, Z)", O, Some("foo(Y, Z)")),
        row("foo(Y, Z)", "X", O, None),
        row("Y", "X", O, Some("X")),
    ];

    for r in rows {
        let mut ctx = Context::new();
        let (t1, t2) = parse_pair(&mut ctx, r.term1, r.term2);
        let mark = ctx.mark_trail();
        let ok = ctx.unify(t1, t2, r.mode);
        match r.result {
            None => assert!(!ok, "row {} ~ {} unexpectedly unified", r.term1, r.term2),
            Some(expected) => {
                assert!(ok, "row {} ~ {} failed to unify", r.term1, r.term2);
                assert_eq!(ctx.print_string(t1), expected, "left of {} ~ {}", r.term1, r.term2);
                assert_eq!(ctx.print_string(t2), expected, "right of {} ~ {}", r.term1, r.term2);
                ctx.backtrack_trail(mark);
            }
        }
        if r.result.is_none() {
            // A failed attempt may leave partial bindings; the caller's
            // rollback restores the original state.
            ctx.backtrack_trail(mark);
        }
        if !r.no_reverse {
            assert_eq!(ctx.print_string(t1), r.term1, "rollback of {}", r.term1);
            assert_eq!(ctx.print_string(t2), r.term2, "rollback of {}", r.term2);
        }
    }
}

#[test]
fn test_occurs_check() {
    let mut ctx = Context::new();
    let (x, fx) = parse_pair(&mut ctx, "X", "f(X)");
    let before = ctx.mark_trail();
    assert!(!ctx.unify(x, fx, BindMode::Default));
    // The failed bind leaves the trail untouched.
    assert_eq!(ctx.mark_trail(), before);
    assert_eq!(ctx.print_string(x), "X");
}

#[test]
fn test_unifiable_rolls_back() {
    let mut ctx = Context::new();
    let (t1, t2) = parse_pair(&mut ctx, "f(X, b)", "f(a, Y)");
    assert!(ctx.unifiable(t1, t2));
    assert_eq!(ctx.print_string(t1), "f(X, b)");
    assert_eq!(ctx.print_string(t2), "f(a, Y)");
    assert!(ctx.unify_with_occurs_check(t1, t2));
    assert_eq!(ctx.print_string(t1), "f(a, b)");
}

#[test]
fn test_precedes_table() {
    let rows: Vec<(&str, &str, Ordering)> = vec![
        ("X", "X", Ordering::Equal),
        ("X", "Y", Ordering::Less),
        ("X", "42.5", Ordering::Less),
        ("42.5", "X", Ordering::Greater),
        ("X", "42", Ordering::Less),
        ("42", "X", Ordering::Greater),
        ("X", "\"foo\"", Ordering::Less),
        ("\"foo\"", "X", Ordering::Greater),
        ("X", "foo", Ordering::Less),
        ("foo", "X", Ordering::Greater),
        ("X", "f(a)", Ordering::Less),
        ("f(a)", "X", Ordering::Greater),
        ("42.5", "42.0", Ordering::Greater),
        ("42.0", "42.5", Ordering::Less),
        ("42.5", "42.5", Ordering::Equal),
        ("42.5", "42", Ordering::Less),
        ("42", "42.5", Ordering::Greater),
        ("42.5", "\"foo\"", Ordering::Less),
        ("\"foo\"", "42.5", Ordering::Greater),
        ("42.5", "foo", Ordering::Less),
        ("foo", "42.5", Ordering::Greater),
        ("42.5", "f(a)", Ordering::Less),
        ("f(a)", "42.5", Ordering::Greater),
        ("42", "40", Ordering::Greater),
        ("40", "42", Ordering::Less),
        ("42", "42", Ordering::Equal),
        ("-42", "42", Ordering::Less),
        ("42", "-42", Ordering::Greater),
        ("42", "\"foo\"", Ordering::Less),
        ("\"foo\"", "42", Ordering::Greater),
        ("42", "foo", Ordering::Less),
        ("foo", "42", Ordering::Greater),
        ("42", "f(a)", Ordering::Less),
        ("f(a)", "42", Ordering::Greater),
        ("\"foo\"", "\"bar\"", Ordering::Greater),
        ("\"bar\"", "\"foo\"", Ordering::Less),
        ("\"foo\"", "\"foo\"", Ordering::Equal),
        ("\"foo\"", "\"foox\"", Ordering::Less),
        ("\"foo\"", "foo", Ordering::Less),
        ("foo", "\"foo\"", Ordering::Greater),
        ("\"foo\"", "f(a)", Ordering::Less),
        ("f(a)", "\"foo\"", Ordering::Greater),
        ("foo", "bar", Ordering::Greater),
        ("bar", "foo", Ordering::Less),
        ("foo", "foo", Ordering::Equal),
        ("foo", "foox", Ordering::Less),
        ("foo", "f(a)", Ordering::Less),
        ("f(a)", "foo", Ordering::Greater),
        ("f(a)", "f(a, b)", Ordering::Less),
        ("f(a, b)", "f(a)", Ordering::Greater),
        // "f" sorts after "." when arities tie.
        ("f(a, b)", "[a|b]", Ordering::Greater),
        ("[a|b]", "f(a, b)", Ordering::Less),
        ("f(a)", "[a|b]", Ordering::Less),
        ("[a|b]", "f(a)", Ordering::Greater),
        ("f(a, b, X)", "f(a, b, X)", Ordering::Equal),
        ("f(a, b, X)", "f(a, b, Y)", Ordering::Less),
        ("[a, b, X]", "[a, b, X]", Ordering::Equal),
        ("[a, b, X]", "[a, b, Y]", Ordering::Less),
        ("[a, b]", "[a, b, c]", Ordering::Less),
        ("[a, b|X]", "[a, b|Y]", Ordering::Less),
    ];
    for (a, b, expected) in rows {
        let mut ctx = Context::new();
        let (t1, t2) = parse_pair(&mut ctx, a, b);
        assert_eq!(ctx.precedes(t1, t2), expected, "precedes({}, {})", a, b);
    }
}

#[test]
fn test_unify_implies_equal_order() {
    let mut ctx = Context::new();
    let (t1, t2) = parse_pair(&mut ctx, "f(X, g(Y), [1, 2|Z])", "f(a, g(b), [1, 2, 3])");
    assert!(ctx.unify(t1, t2, BindMode::Default));
    assert_eq!(ctx.precedes(t1, t2), Ordering::Equal);
}

#[test]
fn test_witness() {
    let rows = vec![
        ("a", "[]"),
        ("[]", "[]"),
        ("f(X)", "[X]"),
        ("f(X, X)", "[X]"),
        ("f(X, Y)", "[Y, X]"),
        ("[X, Y, a, Z]", "[Z, Y, X]"),
        ("[X, Y, a, Z|W]", "[W, Z, Y, X]"),
        ("\"a\"", "[]"),
        ("1", "[]"),
        ("1.5", "[]"),
    ];
    for (source, expected) in rows {
        let mut ctx = Context::new();
        let term = parse_term(&mut ctx, source);
        let witness = ctx.witness(term);
        assert_eq!(ctx.print_string(witness), expected, "witness of {}", source);
    }
}

#[test]
fn test_trail_reversibility() {
    let mut ctx = Context::new();
    let (t1, t2) = parse_pair(&mut ctx, "f(X, Y, [P|Q])", "f(1, g(W), [a, b])");
    let before = ctx.print_string(t1);
    let mark = ctx.mark_trail();
    assert!(ctx.unify(t1, t2, BindMode::Default));
    assert_eq!(ctx.print_string(t1), "f(1, g(W), [a, b])");
    ctx.backtrack_trail(mark);
    assert_eq!(ctx.print_string(t1), before);
}
