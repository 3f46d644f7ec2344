// tests/test_builtins.rs

mod common;

use common::{run_goal, run_goal_error, run_stmt, run_stmt_error};
use curlog::{Context, GoalResult};

const TRUE: GoalResult = GoalResult::True;
const FAIL: GoalResult = GoalResult::Fail;

#[test]
fn test_logic_values() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "true"), TRUE);
    assert_eq!(run_goal(&mut ctx, "fail"), FAIL);
    assert_eq!(run_goal(&mut ctx, "false"), FAIL);
}

#[test]
fn test_logic_and() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "atom(a), atom(X)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "atom(X) && atom(a)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "atom(a) && atom(a)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(X) && atom(X)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "!, atom(X) && atom(a)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "commit, atom(a) && atom(X)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "!, atom(a) && atom(b)"), TRUE);
}

#[test]
fn test_logic_or() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "atom(a) || atom(X)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(X) || atom(a)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(X) || atom(X)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "!, atom(X) || atom(a)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "commit, atom(a) || atom(X)"), TRUE);
}

#[test]
fn test_logic_implies() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "atom(a) => atom(b)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(a) => atom(X)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "atom(X) => atom(a)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(X) => atom(X)"), TRUE);
}

#[test]
fn test_logic_equiv() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "atom(a) <=> atom(b)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(a) <=> atom(X)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "atom(X) <=> atom(a)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "atom(X) <=> atom(X)"), TRUE);
}

#[test]
fn test_logic_not() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "!atom(a)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "!atom(X)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X = a, !(X = b), X == a"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X = a, !(X = a)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "X = a, \\+(X = a)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "\\+ fail"), TRUE);
    assert_eq!(run_goal(&mut ctx, "'\\\\+'(fail)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "'\\\\+'(true)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "! true"), FAIL);
    run_goal_error(&mut ctx, "!X", "instantiation_error");
}

#[test]
fn test_logic_call() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "call(fail)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "X = atom(a), call(X)"), TRUE);
    run_goal_error(&mut ctx, "call(X)", "instantiation_error");
    run_goal_error(&mut ctx, "call(1.5)", "type_error(callable, 1.5)");
    run_goal_error(&mut ctx, "call((atom(a), 1.5))", "type_error(callable, 1.5)");
    assert_eq!(run_goal(&mut ctx, "call((!, atom(a)))"), TRUE);
    assert_eq!(run_goal(&mut ctx, "call((commit, fail))"), FAIL);
}

#[test]
fn test_logic_catch() {
    let mut ctx = Context::new();
    run_goal_error(&mut ctx, "throw(a)", "a");
    assert_eq!(run_goal(&mut ctx, "catch(throw(a), X, Y = caught), Y == caught"), TRUE);
    assert_eq!(run_goal(&mut ctx, "catch(atom(a), X, Y = caught), Y !== caught"), TRUE);
    run_goal_error(&mut ctx, "catch(throw(a), b, Y = caught)", "a");
    run_goal_error(&mut ctx, "catch(call(1.5), b, Y = caught)", "type_error(callable, 1.5)");
    assert_eq!(run_goal(&mut ctx, "catch(throw(a), X, fail)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "catch(atom(a), X, fail)"), TRUE);
    run_goal_error(&mut ctx, "catch(throw(a), X, throw(b))", "b");
    assert_eq!(
        run_goal(&mut ctx, "catch(catch(throw(a), X, throw(b)), Z, Y = caught), Y == caught"),
        TRUE
    );

    assert_eq!(run_stmt(&mut ctx, "try { throw(a); } catch(X) { Y = caught; } Y == caught;"), TRUE);
    assert_eq!(run_stmt(&mut ctx, "try { atom(a); } catch(X) { Y = caught; } Y !== caught;"), TRUE);
    run_stmt_error(&mut ctx, "try { throw(a); } catch(b) { Y = caught; }", "a");
    run_stmt_error(&mut ctx, "try { call(1.5); } catch(b) { Y = caught; }", "type_error(callable, 1.5)");
    assert_eq!(run_stmt(&mut ctx, "try { throw(a); } catch(X) { fail; }"), FAIL);
    assert_eq!(run_stmt(&mut ctx, "try { atom(a); } catch(X) { fail; }"), TRUE);
    run_stmt_error(&mut ctx, "try { throw(a); } catch(X) { throw(b); }", "b");
    run_stmt_error(
        &mut ctx,
        "try { throw(a); } catch(X) { throw(b); } catch(Z) { Y = caught; }",
        "b",
    );
    assert_eq!(
        run_stmt(
            &mut ctx,
            "try { throw(a); } catch(b) { throw(b); } catch(Z) { Y = caught; } Y == caught;"
        ),
        TRUE
    );
    assert_eq!(
        run_stmt(
            &mut ctx,
            "try { try { throw(a); } catch(X) { throw(b); } } catch(Z) { Y = caught; } Y == caught;"
        ),
        TRUE
    );

    run_stmt_error(
        &mut ctx,
        "X = f(d); throw(type_error(list, X));",
        "type_error(list, f(d))",
    );

    // The catch scope has closed by the time the throw runs.
    run_goal_error(&mut ctx, "catch(true, X, fail), throw(t)", "t");
    assert_eq!(run_goal(&mut ctx, "catch(throw(t), X, fail)"), FAIL);
    run_goal_error(&mut ctx, "catch(throw(t), X, throw(u))", "u");
}

#[test]
fn test_logic_halt() {
    let mut ctx = Context::new();
    run_goal_error(&mut ctx, "halt", "0");
    run_goal_error(&mut ctx, "halt(3)", "3");
    run_goal_error(&mut ctx, "halt(-321)", "-321");
    run_goal_error(&mut ctx, "halt(X)", "instantiation_error");
    run_goal_error(&mut ctx, "halt(1.0)", "type_error(integer, 1.0)");

    // halt is never caught.
    assert_eq!(run_goal(&mut ctx, "catch(halt, X, Y)"), GoalResult::Halt(0));
    assert_eq!(run_stmt(&mut ctx, "try { halt(3); } catch(X) {}"), GoalResult::Halt(3));
}

#[test]
fn test_logic_if_expr() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "atom(a) -> atom(b) || atom(X)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(a) -> atom(X) || atom(c)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "atom(X) -> atom(X) || atom(c)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "!, atom(X) -> atom(a) || atom(c)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "commit, atom(a) -> atom(a) || atom(X)"), TRUE);
    run_goal_error(&mut ctx, "call(X) || atom(X)", "instantiation_error");
    run_goal_error(&mut ctx, "call(X) -> atom(a) || atom(X)", "instantiation_error");

    assert_eq!(run_goal(&mut ctx, "atom(a) -> atom(b)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "atom(X) -> atom(b)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "!, atom(X) -> atom(b)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "commit, atom(a) -> atom(b)"), TRUE);
}

#[test]
fn test_logic_if_stmt() {
    let mut ctx = Context::new();
    assert_eq!(run_stmt(&mut ctx, "if (atom(a)) atom(b); else atom(X);"), TRUE);
    assert_eq!(run_stmt(&mut ctx, "if (atom(a)) atom(X); else atom(c);"), FAIL);
    assert_eq!(run_stmt(&mut ctx, "if (atom(X)) atom(X); else atom(c);"), TRUE);
    assert_eq!(run_stmt(&mut ctx, "if (!, atom(X)) atom(a); else atom(c);"), FAIL);
    assert_eq!(run_stmt(&mut ctx, "if (commit, atom(a)) atom(a); else atom(X);"), TRUE);
    run_stmt_error(&mut ctx, "if (call(X)) atom(a); else atom(X);", "instantiation_error");
    run_stmt_error(&mut ctx, "if (X) atom(a); else atom(X);", "instantiation_error");

    assert_eq!(run_stmt(&mut ctx, "if (atom(a)) atom(b);"), TRUE);
    assert_eq!(run_stmt(&mut ctx, "if (atom(X)) atom(Y);"), TRUE);
    assert_eq!(run_stmt(&mut ctx, "if (!, atom(X)) atom(b);"), FAIL);
    assert_eq!(run_stmt(&mut ctx, "if (commit, atom(a)) atom(b);"), TRUE);
}

#[test]
fn test_logic_do() {
    let mut ctx = Context::new();
    assert_eq!(run_stmt(&mut ctx, "do {} while (false);"), TRUE);
    assert_eq!(
        run_stmt(&mut ctx, "do { if (X == f(Y)) Y = a; else X = f(Y); } while (X !== f(a));"),
        TRUE
    );
    assert_eq!(run_stmt(&mut ctx, "do { fail; } while (true);"), FAIL);
    run_stmt_error(&mut ctx, "do { throw(a); } while (true);", "a");
    run_stmt_error(&mut ctx, "do {} while (throw(b));", "b");
    assert_eq!(
        run_stmt(&mut ctx, "do { if (Y == c) X = b; else X = a; Y = c; } while (X !== b);"),
        FAIL
    );
    assert_eq!(
        run_stmt(&mut ctx, "do [X] { if (Y == c) X = b; else X = a; Y = c; } while (X !== b);"),
        TRUE
    );
}

#[test]
fn test_logic_while() {
    let mut ctx = Context::new();
    assert_eq!(run_stmt(&mut ctx, "while (false) {}"), TRUE);
    assert_eq!(
        run_stmt(&mut ctx, "while (X !== f(a)) { if (X == f(Y)) Y = a; else X = f(Y); }"),
        TRUE
    );
    assert_eq!(run_stmt(&mut ctx, "while (true) { fail; }"), FAIL);
    run_stmt_error(&mut ctx, "while (true) { throw(a); }", "a");
    run_stmt_error(&mut ctx, "while (throw(b)) {}", "b");
    assert_eq!(
        run_stmt(&mut ctx, "while (X !== b) { if (Y == c) X = b; else X = a; Y = c; }"),
        FAIL
    );
    assert_eq!(
        run_stmt(
            &mut ctx,
            "while [X] (Z !== d) { if (Y == c) { X = b; Z = d; } else { X = a; } Y = c; }"
        ),
        TRUE
    );
}

#[test]
fn test_logic_for() {
    let mut ctx = Context::new();
    assert_eq!(run_stmt(&mut ctx, "for (X in []) {}"), TRUE);
    run_stmt_error(&mut ctx, "for (X in Y) {}", "instantiation_error");
    run_stmt_error(&mut ctx, "for (X in [a, b, c |Y]) {}", "instantiation_error");
    run_stmt_error(&mut ctx, "for (X in [a, b, c |f(d)]) {}", "type_error(list, f(d))");
    run_stmt_error(&mut ctx, "for (X in f(d)) {}", "type_error(list, f(d))");
    assert_eq!(run_stmt(&mut ctx, "for (X in [a, b]) { atom(X); }"), TRUE);
    assert_eq!(run_stmt(&mut ctx, "for (X in [a, b]) { X == a; }"), FAIL);
    run_stmt_error(&mut ctx, "for (X in [a, b]) { throw(c); }", "c");
    assert_eq!(run_stmt(&mut ctx, "for (X in [a, b]) { Y = X; }"), FAIL);
    assert_eq!(run_stmt(&mut ctx, "for [Y] (X in [a, b]) { Y = X; }"), TRUE);
}

#[test]
fn test_logic_in() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "X in []"), FAIL);

    assert_eq!(run_goal(&mut ctx, "X in [a], X == a"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "X in [a, b]"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    run_goal_error(&mut ctx, "X in Y", "instantiation_error");

    assert_eq!(run_goal(&mut ctx, "X in [a|Y]"), TRUE);
    assert!(matches!(ctx.reexecute_goal().unwrap(), GoalResult::Error(_)));

    assert_eq!(run_goal(&mut ctx, "f in [a]"), FAIL);

    assert_eq!(run_goal(&mut ctx, "f in [a, f]"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);
}

#[test]
fn test_logic_switch() {
    let mut ctx = Context::new();
    assert_eq!(run_stmt(&mut ctx, "switch (a) {}"), FAIL);
    assert_eq!(run_stmt(&mut ctx, "switch (a) { default: true; }"), TRUE);
    assert_eq!(run_stmt(&mut ctx, "switch (a) { case X: Y = b; } X == a; Y == b;"), TRUE);
    assert_eq!(
        run_stmt(&mut ctx, "switch (f(a)) { case g(X): case f(X): Y = b; } X == a; Y == b;"),
        TRUE
    );
    assert_eq!(
        run_stmt(&mut ctx, "switch (f(a)) { case g(X): Y = c; case f(X): Y = b; } X == a; Y == b;"),
        TRUE
    );
    assert_eq!(
        run_stmt(
            &mut ctx,
            "switch (f(a)) { case g(X): Y = c; case f(X): Y = b; case Z: Y = d; } X == a; Y == b;"
        ),
        TRUE
    );
    assert_eq!(
        run_stmt(
            &mut ctx,
            "switch (f(a)) { case g(X): Y = c; case h(X): Y = b; default: Y = d; } var(X); Y == d;"
        ),
        TRUE
    );
}

#[test]
fn test_term_unification_goals() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "f(X, b) = f(a, Y)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "f(X, b) = g(X, b)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "X = f(X)"), FAIL);

    assert_eq!(run_goal(&mut ctx, "unify_with_occurs_check(f(X, b), f(a, Y))"), TRUE);
    assert_eq!(run_goal(&mut ctx, "unify_with_occurs_check(f(X, b), g(X, b))"), FAIL);
    assert_eq!(run_goal(&mut ctx, "unify_with_occurs_check(X, f(X))"), FAIL);

    assert_eq!(run_goal(&mut ctx, "f(X, b) != f(a, Y)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "f(X, b) != g(X, b)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X != f(X)"), TRUE);

    assert_eq!(run_goal(&mut ctx, "f(X, b) \\= f(a, Y)"), FAIL);
    assert_eq!(run_goal(&mut ctx, "f(X, b) \\= g(X, b)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X \\= f(X)"), TRUE);

    assert_eq!(run_goal(&mut ctx, "unifiable(f(X, b), f(a, Y))"), TRUE);
    assert_eq!(run_goal(&mut ctx, "unifiable(f(X, b), g(X, b))"), FAIL);
    assert_eq!(run_goal(&mut ctx, "unifiable(X, f(X))"), FAIL);

    assert_eq!(run_goal(&mut ctx, "f(X, b) = f(a, Y), nonvar(X), nonvar(Y)"), TRUE);
    assert_eq!(run_goal(&mut ctx, "f(X, b) = f(a, Y), X == a, Y == b"), TRUE);
    assert_eq!(run_goal(&mut ctx, "unifiable(f(X, b), f(a, Y)), var(X), var(Y)"), TRUE);
}

#[test]
fn test_reexecute() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "atom(a)"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "atom(X)"), FAIL);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "atom(a) || atom(b)"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "(atom(a) -> X = a || atom(b), X = b), X == a"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "(X = a || X = b), X == a"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "X = a || X = b"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "(X = a || X = b), atom(X)"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    ctx.consult_string("bt(X) { X = a; }\nbt(X) { X = b; }\n").unwrap();
    assert_eq!(run_goal(&mut ctx, "bt(X), atom(X)"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    ctx.consult_string("btt(X) { X = a; }\nbtt(X) { X = b; }\nbtt(X) { X = 1; }\n")
        .unwrap();
    assert_eq!(run_goal(&mut ctx, "btt(X), integer(X)"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    ctx.consult_string(
        "ca(X, Y) { cb(X); cc(Y); }\n\
         cb(X) { X = a; }\n\
         cb(X) { X = b; }\n\
         cc(X) { X = 1; }\n\
         cc(X) { X = 2; }\n",
    )
    .unwrap();
    assert_eq!(run_goal(&mut ctx, "ca(X, Y)"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);

    assert_eq!(run_goal(&mut ctx, "(X = a || X = b), (Y = 1 || Y = 2)"), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), TRUE);
    assert_eq!(ctx.reexecute_goal().unwrap(), FAIL);
}

#[test]
fn test_solution_order() {
    let mut ctx = Context::new();
    let mut solutions = Vec::new();
    let goal = {
        ctx.take_test_goal();
        ctx.consult_string("??-- pair((X = a || X = b), (Y = 1 || Y = 2)).\n").unwrap();
        ctx.take_test_goal().unwrap()
    };
    let x = {
        let left = ctx.arg(goal, 0).unwrap();
        let left = ctx.arg(ctx.deref(left), 0).unwrap();
        ctx.arg(ctx.deref(left), 0).unwrap()
    };
    let y = {
        let right = ctx.arg(goal, 1).unwrap();
        let right = ctx.arg(ctx.deref(right), 0).unwrap();
        ctx.arg(ctx.deref(right), 0).unwrap()
    };
    let conj = {
        let left = ctx.arg(goal, 0).unwrap();
        let right = ctx.arg(goal, 1).unwrap();
        let comma = ctx.create_atom(",");
        ctx.create_functor_with_args(comma, &[left, right]).unwrap()
    };
    let mut result = ctx.execute_goal(conj).unwrap();
    while result == TRUE {
        solutions.push((ctx.print_string(x), ctx.print_string(y)));
        result = ctx.reexecute_goal().unwrap();
    }
    assert_eq!(
        solutions,
        vec![
            ("a".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]
    );
}

#[test]
fn test_arithmetic() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "X is 2 + 3, X == 5"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X is 2 * 3 + 1, X == 7"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X is 7 // 2, X == 3"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X is 7 rem 2, X == 1"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X is -7 mod 2, X == 1"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X is 1 << 4, X == 16"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X is 2.5 + 1, X == 3.5"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X is 2 ^ 10, X == 1024"), TRUE);
    assert_eq!(run_goal(&mut ctx, "1 + 1 =:= 2"), TRUE);
    assert_eq!(run_goal(&mut ctx, "1 + 1 =!= 3"), TRUE);
    assert_eq!(run_goal(&mut ctx, "2 < 3"), TRUE);
    assert_eq!(run_goal(&mut ctx, "3 =< 3"), TRUE);
    assert_eq!(run_goal(&mut ctx, "2.5 > 2"), TRUE);
    assert_eq!(run_goal(&mut ctx, "2 > 3"), FAIL);
    run_goal_error(&mut ctx, "X is Y + 1", "instantiation_error");
    run_goal_error(&mut ctx, "X is a + 1", "type_error(evaluable, a)");
    run_goal_error(&mut ctx, "X is 1 // 0", "evaluation_error(zero_divisor)");
}

#[test]
fn test_standard_order_goals() {
    let mut ctx = Context::new();
    assert_eq!(run_goal(&mut ctx, "a @< b"), TRUE);
    assert_eq!(run_goal(&mut ctx, "b @> a"), TRUE);
    assert_eq!(run_goal(&mut ctx, "a @=< a"), TRUE);
    assert_eq!(run_goal(&mut ctx, "a @>= b"), FAIL);
    assert_eq!(run_goal(&mut ctx, "1.5 @< 1"), TRUE);
    assert_eq!(run_goal(&mut ctx, "X @< 1.5"), TRUE);
    assert_eq!(run_goal(&mut ctx, "f(a) @> \"zzz\""), TRUE);
}
