// tests/common/mod.rs
//! Shared helpers: parse terms and run goals the way the harness does,
//! going through `consult_string` and the saved test-goal hook.

#![allow(dead_code)]

use curlog::term::TermRef;
use curlog::{BindMode, Context, GoalResult};

/// Parses one term by consulting it as a `??--` test goal.
pub fn parse_term(ctx: &mut Context, source: &str) -> TermRef {
    ctx.take_test_goal();
    ctx.consult_string(&format!("??-- {}.\n", source))
        .unwrap_or_else(|e| panic!("parse of {:?} failed: {}", source, e));
    ctx.take_test_goal().expect("test goal was saved")
}

/// Parses two terms in one scope so variables with the same name are
/// shared between them.
pub fn parse_pair(ctx: &mut Context, a: &str, b: &str) -> (TermRef, TermRef) {
    let pair = parse_term(ctx, &format!("pair({}, {})", a, b));
    (
        ctx.arg(pair, 0).expect("left of pair"),
        ctx.arg(pair, 1).expect("right of pair"),
    )
}

pub fn run_goal(ctx: &mut Context, goal: &str) -> GoalResult {
    let goal = parse_term(ctx, goal);
    ctx.execute_goal(goal).expect("engine runs")
}

pub fn run_stmt(ctx: &mut Context, stmts: &str) -> GoalResult {
    ctx.take_test_goal();
    ctx.consult_string(&format!("??-- {{ {} }}\n", stmts))
        .unwrap_or_else(|e| panic!("parse of {:?} failed: {}", stmts, e));
    let goal = ctx.take_test_goal().expect("test goal was saved");
    ctx.execute_goal(goal).expect("engine runs")
}

pub fn run_goal_error(ctx: &mut Context, goal: &str, expected: &str) -> GoalResult {
    let result = run_goal(ctx, goal);
    assert_error_outcome(ctx, &result, expected, goal);
    result
}

pub fn run_stmt_error(ctx: &mut Context, stmts: &str, expected: &str) -> GoalResult {
    let result = run_stmt(ctx, stmts);
    assert_error_outcome(ctx, &result, expected, stmts);
    result
}

fn assert_error_outcome(ctx: &mut Context, result: &GoalResult, expected: &str, goal: &str) {
    match result {
        GoalResult::Error(error) => check_error_term(ctx, *error, expected, goal),
        GoalResult::Halt(code) => {
            assert_eq!(
                expected.parse::<i64>().ok(),
                Some(*code),
                "goal {:?}: expected halt({}), got halt({})",
                goal,
                expected,
                code
            );
        }
        other => panic!("goal {:?}: expected an error outcome, got {:?}", goal, other),
    }
}

/// The raised term must unify with the expectation, either directly or
/// wrapped as `error(Expected, _)`.
fn check_error_term(ctx: &mut Context, actual: TermRef, expected: &str, goal: &str) {
    let expected_term = parse_term(ctx, expected);
    let mark = ctx.mark_trail();
    let direct = ctx.unify(actual, expected_term, BindMode::Default);
    ctx.backtrack_trail(mark);
    if direct {
        return;
    }
    let error_atom = ctx.create_atom("error");
    let slot = ctx.create_variable();
    let wrapped = ctx
        .create_functor_with_args(error_atom, &[expected_term, slot])
        .expect("error wrapper");
    let mark = ctx.mark_trail();
    let wrapped_ok = ctx.unify(actual, wrapped, BindMode::Default);
    ctx.backtrack_trail(mark);
    assert!(
        wrapped_ok,
        "goal {:?}: expected error {}, got {}",
        goal,
        expected,
        ctx.print_string(actual)
    );
}
