// tests/test_database.rs

mod common;

use common::{run_goal, run_goal_error};
use curlog::database::OpSpecifier;
use curlog::{Context, GoalResult};

#[test]
fn test_operator_table() {
    use OpSpecifier::*;
    let ops: Vec<(u32, OpSpecifier, usize, &str)> = vec![
        (1200, Xfx, 2, ":-"),
        (1200, Xfx, 2, "-->"),
        (1200, Fx, 1, ":-"),
        (1200, Fx, 1, "?-"),
        (1100, Xfy, 2, ";"),
        (1100, Xfy, 2, "||"),
        (1050, Xfy, 2, "->"),
        (1000, Xfy, 2, ","),
        (1000, Xfy, 2, "&&"),
        (900, Fy, 1, "\\+"),
        (900, Fy, 1, "!"),
        (700, Xfx, 2, "="),
        (700, Xfx, 2, "\\="),
        (700, Xfx, 2, "!="),
        (700, Xfx, 2, "=="),
        (700, Xfx, 2, "\\=="),
        (700, Xfx, 2, "!=="),
        (700, Xfx, 2, "@<"),
        (700, Xfx, 2, "@=<"),
        (700, Xfx, 2, "@<="),
        (700, Xfx, 2, "@>"),
        (700, Xfx, 2, "@>="),
        (700, Xfx, 2, "=.."),
        (700, Xfx, 2, "is"),
        (700, Xfx, 2, "in"),
        (700, Xfx, 2, "=:="),
        (700, Xfx, 2, "=\\="),
        (700, Xfx, 2, "=!="),
        (700, Xfx, 2, "<"),
        (700, Xfx, 2, "=<"),
        (700, Xfx, 2, "<="),
        (700, Xfx, 2, ">"),
        (700, Xfx, 2, ">="),
        (700, Xfx, 2, ":="),
        (700, Xfx, 2, "::="),
        (500, Yfx, 2, "+"),
        (500, Yfx, 2, "-"),
        (500, Yfx, 2, "/\\"),
        (500, Yfx, 2, "\\/"),
        (400, Yfx, 2, "*"),
        (400, Yfx, 2, "/"),
        (400, Yfx, 2, "//"),
        (400, Yfx, 2, "rem"),
        (400, Yfx, 2, "mod"),
        (400, Yfx, 2, "<<"),
        (400, Yfx, 2, ">>"),
        (400, Yfx, 2, ">>>"),
        (200, Xfx, 2, "**"),
        (200, Xfy, 2, "^"),
        (200, Fy, 1, "-"),
        (200, Fy, 1, "\\"),
        (200, Fy, 1, "~"),
        (100, Xfx, 2, ":"),
    ];
    let mut ctx = Context::new();
    for (priority, specifier, arity, name) in ops {
        let atom = ctx.create_atom(name);
        let info = ctx.operator_info(atom, arity);
        assert_eq!(info, Some((priority, specifier)), "operator {}/{}", name, arity);
    }
    let unknown = ctx.create_atom("frobnicate");
    assert_eq!(ctx.operator_info(unknown, 2), None);
}

#[test]
fn test_user_predicates() {
    let user_source = "a(b).\n\
                       a(c) :- true.\n\
                       a(X) :- b(X).\n\
                       b(e).\n\
                       b(f) :- c(f).\n\
                       b(g) { throw(foo); }\n";
    let mut ctx = Context::new();
    ctx.consult_string(user_source).unwrap();
    assert_eq!(run_goal(&mut ctx, "a(b)"), GoalResult::True);
    assert_eq!(run_goal(&mut ctx, "a(c)"), GoalResult::True);
    assert_eq!(run_goal(&mut ctx, "a(d)"), GoalResult::Fail);
    assert_eq!(run_goal(&mut ctx, "a(e)"), GoalResult::True);
    run_goal_error(&mut ctx, "a(f)", "existence_error(procedure, c/1)");
    run_goal_error(&mut ctx, "a(g)", "foo");
}
