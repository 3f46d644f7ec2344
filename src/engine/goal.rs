// src/engine/goal.rs
//! The goal interpreter.
//!
//! Goals are evaluated on an explicit machine: a stack of frames (the
//! continuation), a stack of choice points, and a stack of catch frames.
//! A choice point snapshots the trail mark, the continuation, the catch
//! stack, and the remaining alternative; backtracking pops one, rolls the
//! trail back, and resumes the alternative. Cut truncates the choice
//! stack down to the barrier recorded when the current clause or called
//! goal was entered.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::engine::arith;
use crate::engine::code::{keys_compatible, term_arg_key, ArgKey};
use crate::engine::context::Context;
use crate::engine::database::{is_static_builtin, Clause};
use crate::engine::error::EngineError;
use crate::engine::term::{TermKind, TermRef};
use crate::engine::trail::TrailMark;
use crate::engine::unify::BindMode;
use crate::engine::vm::{self, RunOutcome};

/// Outcome of one goal evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalResult {
    True,
    Fail,
    /// A term was raised and no catch recovered it.
    Error(TermRef),
    /// `halt` unwound everything; the payload is the exit code.
    Halt(i64),
}

#[derive(Debug, Clone)]
enum Frame {
    /// Evaluate a goal; `barrier` is the choice-stack depth cut prunes to.
    Goal { goal: TermRef, barrier: usize },
    /// Reached when an if-then-else condition has succeeded: commit by
    /// discarding the condition's choice points (and the else branch),
    /// then run the then branch.
    Commit { then: TermRef, barrier: usize, choice_len: usize },
    /// Leave the innermost catch scope.
    PopCatch,
}

#[derive(Debug, Clone)]
struct CatchFrame {
    mark: TrailMark,
    frames_len: usize,
    choices_len: usize,
    cases: Vec<(TermRef, TermRef)>,
    barrier: usize,
}

#[derive(Debug, Clone)]
enum Alternative {
    /// Resume with another goal (right side of a disjunction, else branch).
    Goal(TermRef),
    /// Resume clause selection at `next`.
    Clauses {
        name: TermRef,
        arity: usize,
        args: Vec<TermRef>,
        clauses: Vec<Rc<Clause>>,
        next: usize,
    },
    /// Resume `in/2` membership at the rest of the list.
    Member { item: TermRef, rest: TermRef },
    /// Resume `retract/1` scanning at `next`.
    Retract {
        head: TermRef,
        body: TermRef,
        name: TermRef,
        arity: usize,
        clauses: Vec<Rc<Clause>>,
        next: usize,
    },
}

#[derive(Debug, Clone)]
struct ChoicePoint {
    mark: TrailMark,
    frames: Vec<Frame>,
    catches: Vec<CatchFrame>,
    barrier: usize,
    alt: Alternative,
}

enum Step {
    Continue,
    Fail,
    Error(TermRef),
    Halt(i64),
}

/// A resumable goal evaluation. Kept by the context between
/// `execute_goal` and `reexecute_goal` calls.
#[derive(Debug, Default)]
pub struct GoalMachine {
    frames: Vec<Frame>,
    choices: Vec<ChoicePoint>,
    catches: Vec<CatchFrame>,
}

impl GoalMachine {
    pub fn new(goal: TermRef) -> Self {
        Self {
            frames: vec![Frame::Goal { goal, barrier: 0 }],
            choices: Vec::new(),
            catches: Vec::new(),
        }
    }

    /// Runs the goal to its first outcome.
    pub fn run(&mut self, ctx: &mut Context) -> Result<GoalResult, EngineError> {
        self.resume(ctx, Step::Continue)
    }

    /// Forces a failure of the current solution and resumes at the most
    /// recent choice point.
    pub fn reexecute(&mut self, ctx: &mut Context) -> Result<GoalResult, EngineError> {
        let step = self.backtrack(ctx)?;
        if matches!(step, Step::Fail) {
            return Ok(GoalResult::Fail);
        }
        self.resume(ctx, step)
    }

    fn resume(&mut self, ctx: &mut Context, first: Step) -> Result<GoalResult, EngineError> {
        let mut pending = first;
        loop {
            match pending {
                Step::Continue => {
                    let frame = match self.frames.pop() {
                        None => return Ok(GoalResult::True),
                        Some(frame) => frame,
                    };
                    pending = match frame {
                        Frame::PopCatch => {
                            self.catches.pop();
                            Step::Continue
                        }
                        Frame::Commit { then, barrier, choice_len } => {
                            if self.choices.len() > choice_len {
                                self.choices.truncate(choice_len);
                            }
                            self.frames.push(Frame::Goal { goal: then, barrier });
                            Step::Continue
                        }
                        Frame::Goal { goal, barrier } => self.dispatch(ctx, goal, barrier)?,
                    };
                }
                Step::Fail => {
                    pending = self.backtrack(ctx)?;
                    if matches!(pending, Step::Fail) {
                        return Ok(GoalResult::Fail);
                    }
                }
                Step::Error(error) => match self.raise(ctx, error)? {
                    None => pending = Step::Continue,
                    Some(uncaught) => return Ok(GoalResult::Error(uncaught)),
                },
                Step::Halt(code) => return Ok(GoalResult::Halt(code)),
            }
        }
    }

    fn push_choice(&mut self, mark: TrailMark, barrier: usize, alt: Alternative) {
        self.choices.push(ChoicePoint {
            mark,
            frames: self.frames.clone(),
            catches: self.catches.clone(),
            barrier,
            alt,
        });
    }

    /// Pops choice points until one yields a runnable continuation.
    /// Returns `Step::Fail` when the stack is exhausted.
    fn backtrack(&mut self, ctx: &mut Context) -> Result<Step, EngineError> {
        loop {
            let cp = match self.choices.pop() {
                None => return Ok(Step::Fail),
                Some(cp) => cp,
            };
            ctx.backtrack_trail(cp.mark);
            self.frames = cp.frames;
            self.catches = cp.catches;
            let step = match cp.alt {
                Alternative::Goal(goal) => {
                    self.frames.push(Frame::Goal { goal, barrier: cp.barrier });
                    Step::Continue
                }
                Alternative::Clauses { name, arity, args, clauses, next } => {
                    self.try_clauses(ctx, name, arity, args, clauses, next, cp.barrier)?
                }
                Alternative::Member { item, rest } => self.solve_in(ctx, item, rest, cp.barrier),
                Alternative::Retract { head, body, name, arity, clauses, next } => {
                    self.try_retract(ctx, head, body, name, arity, clauses, next, cp.barrier)
                }
            };
            match step {
                Step::Fail => continue,
                other => return Ok(other),
            }
        }
    }

    /// Unwinds toward the nearest catch whose pattern matches. Returns
    /// the error term when nothing catches it.
    fn raise(&mut self, ctx: &mut Context, error: TermRef) -> Result<Option<TermRef>, EngineError> {
        let error = ctx.clone_resolved(error);
        debug!("raised {}", ctx.print_string(error));
        while let Some(frame) = self.catches.pop() {
            ctx.backtrack_trail(frame.mark);
            self.frames.truncate(frame.frames_len);
            self.choices.truncate(frame.choices_len);
            for (pattern, recovery) in frame.cases {
                let mark = ctx.mark_trail();
                if ctx.unify(pattern, error, BindMode::Default) {
                    self.frames.push(Frame::Goal { goal: recovery, barrier: frame.barrier });
                    return Ok(None);
                }
                ctx.backtrack_trail(mark);
            }
        }
        Ok(Some(error))
    }

    fn dispatch(
        &mut self,
        ctx: &mut Context,
        goal: TermRef,
        barrier: usize,
    ) -> Result<Step, EngineError> {
        let d = ctx.deref(goal);
        match ctx.kind(d) {
            TermKind::Variable | TermKind::MemberVariable => {
                Ok(Step::Error(ctx.instantiation_error()))
            }
            TermKind::Integer | TermKind::Real | TermKind::String | TermKind::List
            | TermKind::Predicate | TermKind::Object => {
                Ok(Step::Error(ctx.type_error("callable", d)))
            }
            TermKind::Atom => self.dispatch_atom(ctx, d, barrier),
            TermKind::Functor => self.dispatch_functor(ctx, d, barrier),
        }
    }

    fn dispatch_atom(
        &mut self,
        ctx: &mut Context,
        atom: TermRef,
        barrier: usize,
    ) -> Result<Step, EngineError> {
        let name = ctx.name(atom).unwrap_or("").to_string();
        match name.as_str() {
            "true" => Ok(Step::Continue),
            "fail" | "false" => Ok(Step::Fail),
            "!" | "commit" => {
                self.choices.truncate(barrier);
                Ok(Step::Continue)
            }
            "halt" => Ok(Step::Halt(0)),
            _ => self.call_predicate(ctx, atom, Vec::new(), barrier),
        }
    }

    fn dispatch_functor(
        &mut self,
        ctx: &mut Context,
        d: TermRef,
        barrier: usize,
    ) -> Result<Step, EngineError> {
        let name_atom = match ctx.functor_name(d) {
            Some(name) => name,
            None => return Ok(Step::Error(ctx.type_error("callable", d))),
        };
        let name = ctx.name(name_atom).unwrap_or("").to_string();
        let arity = ctx.arg_count(d);
        let arg = |ctx: &mut Context, i: usize| -> TermRef {
            match ctx.arg(d, i) {
                Some(a) => a,
                None => ctx.create_variable(),
            }
        };
        match (name.as_str(), arity) {
            ("," , 2) | ("&&", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                for part in [a, b] {
                    if let Some(error) = non_callable(ctx, part) {
                        return Ok(Step::Error(error));
                    }
                }
                self.frames.push(Frame::Goal { goal: b, barrier });
                self.frames.push(Frame::Goal { goal: a, barrier });
                Ok(Step::Continue)
            }
            (";", 2) | ("||", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                let ad = ctx.deref(a);
                if ctx.kind(ad) == TermKind::Functor
                    && ctx.arg_count(ad) == 2
                    && ctx.functor_name(ad).and_then(|n| ctx.name(n)) == Some("->")
                {
                    let cond = ctx.arg(ad, 0).unwrap_or(ad);
                    let then = ctx.arg(ad, 1).unwrap_or(ad);
                    self.if_then_else(ctx, cond, then, b, barrier);
                } else {
                    let mark = ctx.mark_trail();
                    self.push_choice(mark, barrier, Alternative::Goal(b));
                    self.frames.push(Frame::Goal { goal: a, barrier });
                }
                Ok(Step::Continue)
            }
            ("->", 2) => {
                let cond = arg(ctx, 0);
                let then = arg(ctx, 1);
                let fail = ctx.create_atom("fail");
                self.if_then_else(ctx, cond, then, fail, barrier);
                Ok(Step::Continue)
            }
            ("=>", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                match solve_sub(ctx, a)? {
                    GoalResult::Fail => Ok(Step::Continue),
                    GoalResult::True => Ok(goal_step(solve_sub(ctx, b)?)),
                    other => Ok(goal_step(other)),
                }
            }
            ("<=>", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                let ra = match solve_sub(ctx, a)? {
                    GoalResult::True => true,
                    GoalResult::Fail => false,
                    other => return Ok(goal_step(other)),
                };
                let rb = match solve_sub(ctx, b)? {
                    GoalResult::True => true,
                    GoalResult::Fail => false,
                    other => return Ok(goal_step(other)),
                };
                Ok(if ra == rb { Step::Continue } else { Step::Fail })
            }
            ("!", 1) | ("\\+", 1) => {
                let g = arg(ctx, 0);
                let mark = ctx.mark_trail();
                let result = solve_sub(ctx, g)?;
                ctx.backtrack_trail(mark);
                match result {
                    GoalResult::True => Ok(Step::Fail),
                    GoalResult::Fail => Ok(Step::Continue),
                    other => Ok(goal_step(other)),
                }
            }
            ("call", 1) => {
                let g = arg(ctx, 0);
                let g = ctx.deref(g);
                match ctx.kind(g) {
                    TermKind::Variable | TermKind::MemberVariable => {
                        Ok(Step::Error(ctx.instantiation_error()))
                    }
                    TermKind::Atom | TermKind::Functor => {
                        let barrier = self.choices.len();
                        self.frames.push(Frame::Goal { goal: g, barrier });
                        Ok(Step::Continue)
                    }
                    _ => Ok(Step::Error(ctx.type_error("callable", g))),
                }
            }
            ("throw", 1) => {
                let t = arg(ctx, 0);
                let t = ctx.deref(t);
                match ctx.kind(t) {
                    TermKind::Variable | TermKind::MemberVariable => {
                        Ok(Step::Error(ctx.instantiation_error()))
                    }
                    _ => Ok(Step::Error(t)),
                }
            }
            ("halt", 1) => {
                let v = arg(ctx, 0);
                let v = ctx.deref(v);
                match ctx.kind(v) {
                    TermKind::Variable | TermKind::MemberVariable => {
                        Ok(Step::Error(ctx.instantiation_error()))
                    }
                    TermKind::Integer => Ok(Step::Halt(ctx.integer_value(v))),
                    _ => Ok(Step::Error(ctx.type_error("integer", v))),
                }
            }
            ("catch", 3) => {
                let g = arg(ctx, 0);
                let cases = vec![(arg(ctx, 1), arg(ctx, 2))];
                self.enter_catch(ctx, g, cases);
                Ok(Step::Continue)
            }
            ("$try", 2) => {
                let g = arg(ctx, 0);
                let list = arg(ctx, 1);
                let mut cases = Vec::new();
                for case in ctx.list_items(list).unwrap_or_default() {
                    let cd = ctx.deref(case);
                    let pattern = ctx.arg(cd, 0);
                    let recovery = ctx.arg(cd, 1);
                    if let (Some(pattern), Some(recovery)) = (pattern, recovery) {
                        cases.push((pattern, recovery));
                    }
                }
                self.enter_catch(ctx, g, cases);
                Ok(Step::Continue)
            }
            ("in", 2) => {
                let item = arg(ctx, 0);
                let list = arg(ctx, 1);
                Ok(self.solve_in(ctx, item, list, barrier))
            }
            ("=", 2) | ("unify_with_occurs_check", 2) => {
                let mark = ctx.mark_trail();
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                if ctx.unify(a, b, BindMode::Default) {
                    Ok(Step::Continue)
                } else {
                    ctx.backtrack_trail(mark);
                    Ok(Step::Fail)
                }
            }
            ("\\=", 2) | ("!=", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                Ok(if ctx.unifiable(a, b) { Step::Fail } else { Step::Continue })
            }
            ("==", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                Ok(bool_step(ctx.unify(a, b, BindMode::Equality)))
            }
            ("\\==", 2) | ("!==", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                Ok(bool_step(!ctx.unify(a, b, BindMode::Equality)))
            }
            ("unifiable", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                Ok(bool_step(ctx.unifiable(a, b)))
            }
            ("@<", 2) | ("@>", 2) | ("@=<", 2) | ("@<=", 2) | ("@>=", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                let ord = ctx.precedes(a, b);
                Ok(bool_step(match name.as_str() {
                    "@<" => ord == Ordering::Less,
                    "@>" => ord == Ordering::Greater,
                    "@>=" => ord != Ordering::Less,
                    _ => ord != Ordering::Greater,
                }))
            }
            ("is", 2) => {
                let lhs = arg(ctx, 0);
                let rhs = arg(ctx, 1);
                match arith::eval(ctx, rhs) {
                    Err(error) => Ok(Step::Error(error)),
                    Ok(num) => {
                        let value = arith::num_term(ctx, num);
                        let mark = ctx.mark_trail();
                        if ctx.unify(lhs, value, BindMode::Default) {
                            Ok(Step::Continue)
                        } else {
                            ctx.backtrack_trail(mark);
                            Ok(Step::Fail)
                        }
                    }
                }
            }
            ("=:=", 2) | ("=!=", 2) | ("=\\=", 2) | ("<", 2) | (">", 2) | ("=<", 2)
            | ("<=", 2) | (">=", 2) => {
                let a = arg(ctx, 0);
                let b = arg(ctx, 1);
                let left = match arith::eval(ctx, a) {
                    Ok(num) => num,
                    Err(error) => return Ok(Step::Error(error)),
                };
                let right = match arith::eval(ctx, b) {
                    Ok(num) => num,
                    Err(error) => return Ok(Step::Error(error)),
                };
                let ord = arith::compare(left, right);
                Ok(bool_step(match name.as_str() {
                    "=:=" => ord == Ordering::Equal,
                    "=!=" | "=\\=" => ord != Ordering::Equal,
                    "<" => ord == Ordering::Less,
                    ">" => ord == Ordering::Greater,
                    "=<" | "<=" => ord != Ordering::Greater,
                    _ => ord != Ordering::Less,
                }))
            }
            ("var", 1) | ("nonvar", 1) | ("atom", 1) | ("atomic", 1) | ("integer", 1)
            | ("float", 1) | ("number", 1) | ("compound", 1) | ("callable", 1) => {
                let raw = arg(ctx, 0);
                let t = ctx.deref_member(raw);
                let kind = ctx.kind(t);
                Ok(bool_step(match name.as_str() {
                    "var" => matches!(kind, TermKind::Variable | TermKind::MemberVariable),
                    "nonvar" => !matches!(kind, TermKind::Variable | TermKind::MemberVariable),
                    "atom" => kind == TermKind::Atom,
                    "atomic" => matches!(
                        kind,
                        TermKind::Atom | TermKind::Integer | TermKind::Real | TermKind::String
                    ),
                    "integer" => kind == TermKind::Integer,
                    "float" => kind == TermKind::Real,
                    "number" => matches!(kind, TermKind::Integer | TermKind::Real),
                    "compound" => matches!(kind, TermKind::Functor | TermKind::List),
                    _ => matches!(kind, TermKind::Atom | TermKind::Functor | TermKind::List),
                }))
            }
            ("asserta", 1) => {
                let clause = arg(ctx, 0);
                Ok(self.builtin_assert(ctx, clause, true))
            }
            ("assertz", 1) => {
                let clause = arg(ctx, 0);
                Ok(self.builtin_assert(ctx, clause, false))
            }
            ("retract", 1) => {
                let clause = arg(ctx, 0);
                Ok(self.builtin_retract(ctx, clause, barrier))
            }
            ("abolish", 1) => {
                let indicator = arg(ctx, 0);
                Ok(self.builtin_abolish(ctx, indicator))
            }
            ("dynamic", 1) => {
                let indicator = arg(ctx, 0);
                Ok(self.builtin_dynamic(ctx, indicator))
            }
            ("$while", 3) => {
                let cond = arg(ctx, 0);
                let body = arg(ctx, 1);
                let vars = arg(ctx, 2);
                self.run_while(ctx, cond, body, vars)
            }
            ("$do", 3) => {
                let body = arg(ctx, 0);
                let cond = arg(ctx, 1);
                let vars = arg(ctx, 2);
                self.run_do(ctx, body, cond, vars)
            }
            ("$for", 4) => {
                let var = arg(ctx, 0);
                let list = arg(ctx, 1);
                let body = arg(ctx, 2);
                let vars = arg(ctx, 3);
                self.run_for(ctx, var, list, body, vars)
            }
            ("$switch", 2) => {
                let scrutinee = arg(ctx, 0);
                let cases = arg(ctx, 1);
                Ok(self.run_switch(ctx, scrutinee, cases, barrier))
            }
            _ => {
                let args: Vec<TermRef> = (0..arity).map(|i| arg(ctx, i)).collect();
                self.call_predicate(ctx, name_atom, args, barrier)
            }
        }
    }

    fn if_then_else(
        &mut self,
        ctx: &mut Context,
        cond: TermRef,
        then: TermRef,
        else_goal: TermRef,
        barrier: usize,
    ) {
        let mark = ctx.mark_trail();
        self.push_choice(mark, barrier, Alternative::Goal(else_goal));
        let choice_len = self.choices.len() - 1;
        self.frames.push(Frame::Commit { then, barrier, choice_len });
        self.frames.push(Frame::Goal { goal: cond, barrier });
    }

    fn enter_catch(&mut self, ctx: &mut Context, goal: TermRef, cases: Vec<(TermRef, TermRef)>) {
        self.catches.push(CatchFrame {
            mark: ctx.mark_trail(),
            frames_len: self.frames.len(),
            choices_len: self.choices.len(),
            cases,
            barrier: self.choices.len(),
        });
        let barrier = self.choices.len();
        self.frames.push(Frame::PopCatch);
        self.frames.push(Frame::Goal { goal, barrier });
    }

    fn solve_in(&mut self, ctx: &mut Context, item: TermRef, list: TermRef, barrier: usize) -> Step {
        let d = ctx.deref(list);
        match ctx.kind(d) {
            TermKind::Variable | TermKind::MemberVariable => {
                Step::Error(ctx.instantiation_error())
            }
            TermKind::Atom if d == ctx.nil_atom() => Step::Fail,
            TermKind::List => {
                let head = match ctx.head(d) {
                    Some(head) => head,
                    None => return Step::Error(ctx.type_error("list", d)),
                };
                let rest = match ctx.tail(d) {
                    Some(rest) => rest,
                    None => return Step::Error(ctx.type_error("list", d)),
                };
                let mark = ctx.mark_trail();
                self.push_choice(mark, barrier, Alternative::Member { item, rest });
                if ctx.unify(item, head, BindMode::Default) {
                    Step::Continue
                } else {
                    Step::Fail
                }
            }
            _ => Step::Error(ctx.type_error("list", d)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn try_clauses(
        &mut self,
        ctx: &mut Context,
        name: TermRef,
        arity: usize,
        args: Vec<TermRef>,
        clauses: Vec<Rc<Clause>>,
        start: usize,
        barrier: usize,
    ) -> Result<Step, EngineError> {
        let caller_key = if arity > 0 { term_arg_key(ctx, args[0]) } else { None };
        let mut index = start;
        while index < clauses.len() {
            let clause = Rc::clone(&clauses[index]);
            if !keys_compatible(caller_key, clause_key(ctx, &clause)) {
                index += 1;
                continue;
            }
            let mark = ctx.mark_trail();
            let code = clause.code(ctx);
            match vm::run(ctx, &code, &args)? {
                RunOutcome::Body(body) => {
                    let cut_barrier = self.choices.len();
                    let has_more = clauses[index + 1..]
                        .iter()
                        .any(|c| keys_compatible(caller_key, clause_key(ctx, c)));
                    if has_more {
                        self.push_choice(
                            mark,
                            barrier,
                            Alternative::Clauses {
                                name,
                                arity,
                                args: args.clone(),
                                clauses: clauses.clone(),
                                next: index + 1,
                            },
                        );
                    }
                    let goal = match body {
                        Some(goal) => goal,
                        None => ctx.create_atom("true"),
                    };
                    self.frames.push(Frame::Goal { goal, barrier: cut_barrier });
                    return Ok(Step::Continue);
                }
                RunOutcome::Fail => {
                    ctx.backtrack_trail(mark);
                    index += 1;
                }
                RunOutcome::Error(error) => return Ok(Step::Error(error)),
                RunOutcome::Halt(code) => return Ok(Step::Halt(code)),
            }
        }
        Ok(Step::Fail)
    }

    fn call_predicate(
        &mut self,
        ctx: &mut Context,
        name: TermRef,
        args: Vec<TermRef>,
        barrier: usize,
    ) -> Result<Step, EngineError> {
        let arity = args.len();
        let clauses = ctx.database.lookup(name, arity).map(|p| p.clauses.clone());
        match clauses {
            None => {
                let error = ctx.existence_error(name, arity);
                Ok(Step::Error(error))
            }
            Some(clauses) => {
                debug!(
                    "call {}/{} ({} clauses)",
                    ctx.name(name).unwrap_or("?"),
                    arity,
                    clauses.len()
                );
                self.try_clauses(ctx, name, arity, args, clauses, 0, barrier)
            }
        }
    }

    fn builtin_assert(&mut self, ctx: &mut Context, clause: TermRef, front: bool) -> Step {
        let (head, body) = match split_clause(ctx, clause) {
            Ok(parts) => parts,
            Err(error) => return Step::Error(error),
        };
        let (name, arity) = match clause_head_key(ctx, head) {
            Ok(key) => key,
            Err(error) => return Step::Error(error),
        };
        if let Some(error) = static_modify_error(ctx, name, arity) {
            return Step::Error(error);
        }
        if consulted_static(ctx, name, arity) {
            let pi = ctx.predicate_indicator(name, arity);
            return Step::Error(ctx.permission_error("modify", "static_procedure", pi));
        }
        let mut map = HashMap::new();
        let head = ctx.rename_term(head, &mut map);
        let body = ctx.rename_term(body, &mut map);
        let stored = Clause::new(head, body);
        let pred = ctx.database.ensure(name, arity);
        pred.dynamic = true;
        if front {
            pred.clauses.insert(0, stored);
        } else {
            pred.clauses.push(stored);
        }
        Step::Continue
    }

    fn builtin_retract(&mut self, ctx: &mut Context, clause: TermRef, barrier: usize) -> Step {
        let (head, body) = match split_clause(ctx, clause) {
            Ok(parts) => parts,
            Err(error) => return Step::Error(error),
        };
        let (name, arity) = match clause_head_key(ctx, head) {
            Ok(key) => key,
            Err(error) => return Step::Error(error),
        };
        if let Some(error) = static_modify_error(ctx, name, arity) {
            return Step::Error(error);
        }
        let clauses = match ctx.database.lookup(name, arity) {
            None => return Step::Fail,
            Some(pred) => pred.clauses.clone(),
        };
        if consulted_static(ctx, name, arity) {
            let pi = ctx.predicate_indicator(name, arity);
            return Step::Error(ctx.permission_error("modify", "static_procedure", pi));
        }
        self.try_retract(ctx, head, body, name, arity, clauses, 0, barrier)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_retract(
        &mut self,
        ctx: &mut Context,
        head: TermRef,
        body: TermRef,
        name: TermRef,
        arity: usize,
        clauses: Vec<Rc<Clause>>,
        start: usize,
        barrier: usize,
    ) -> Step {
        let mut index = start;
        while index < clauses.len() {
            let candidate = Rc::clone(&clauses[index]);
            let mark = ctx.mark_trail();
            let mut map = HashMap::new();
            let fresh_head = ctx.rename_term(candidate.head, &mut map);
            let fresh_body = ctx.rename_term(candidate.body, &mut map);
            if ctx.unify(head, fresh_head, BindMode::Default)
                && ctx.unify(body, fresh_body, BindMode::Default)
            {
                if let Some(pred) = ctx.database.lookup_mut(name, arity) {
                    pred.clauses.retain(|c| !Rc::ptr_eq(c, &candidate));
                }
                if index + 1 < clauses.len() {
                    self.push_choice(
                        mark,
                        barrier,
                        Alternative::Retract {
                            head,
                            body,
                            name,
                            arity,
                            clauses: clauses.clone(),
                            next: index + 1,
                        },
                    );
                }
                return Step::Continue;
            }
            ctx.backtrack_trail(mark);
            index += 1;
        }
        Step::Fail
    }

    fn builtin_abolish(&mut self, ctx: &mut Context, indicator: TermRef) -> Step {
        let (name, arity) = match validate_indicator(ctx, indicator) {
            Ok(key) => key,
            Err(error) => return Step::Error(error),
        };
        if let Some(error) = static_modify_error(ctx, name, arity) {
            return Step::Error(error);
        }
        if consulted_static(ctx, name, arity) {
            let pi = ctx.predicate_indicator(name, arity);
            return Step::Error(ctx.permission_error("modify", "static_procedure", pi));
        }
        ctx.database.remove(name, arity);
        Step::Continue
    }

    fn builtin_dynamic(&mut self, ctx: &mut Context, indicator: TermRef) -> Step {
        let (name, arity) = match validate_indicator(ctx, indicator) {
            Ok(key) => key,
            Err(error) => return Step::Error(error),
        };
        if let Some(error) = static_modify_error(ctx, name, arity) {
            return Step::Error(error);
        }
        if consulted_static(ctx, name, arity) {
            let pi = ctx.predicate_indicator(name, arity);
            return Step::Error(ctx.permission_error("modify", "static_procedure", pi));
        }
        ctx.database.declare_dynamic(name, arity);
        Step::Continue
    }

    fn run_while(
        &mut self,
        ctx: &mut Context,
        cond: TermRef,
        body: TermRef,
        vars: TermRef,
    ) -> Result<Step, EngineError> {
        let renewed = ctx.list_items(vars).unwrap_or_default();
        loop {
            let (cond_i, body_i) = renew_pair(ctx, cond, body, &renewed);
            match solve_sub(ctx, cond_i)? {
                GoalResult::Fail => return Ok(Step::Continue),
                GoalResult::True => {}
                other => return Ok(goal_step(other)),
            }
            match solve_sub(ctx, body_i)? {
                GoalResult::True => {}
                GoalResult::Fail => return Ok(Step::Fail),
                other => return Ok(goal_step(other)),
            }
        }
    }

    fn run_do(
        &mut self,
        ctx: &mut Context,
        body: TermRef,
        cond: TermRef,
        vars: TermRef,
    ) -> Result<Step, EngineError> {
        let renewed = ctx.list_items(vars).unwrap_or_default();
        loop {
            let (cond_i, body_i) = renew_pair(ctx, cond, body, &renewed);
            match solve_sub(ctx, body_i)? {
                GoalResult::True => {}
                GoalResult::Fail => return Ok(Step::Fail),
                other => return Ok(goal_step(other)),
            }
            match solve_sub(ctx, cond_i)? {
                GoalResult::True => {}
                GoalResult::Fail => return Ok(Step::Continue),
                other => return Ok(goal_step(other)),
            }
        }
    }

    fn run_for(
        &mut self,
        ctx: &mut Context,
        var: TermRef,
        list: TermRef,
        body: TermRef,
        vars: TermRef,
    ) -> Result<Step, EngineError> {
        let mut renewed = ctx.list_items(vars).unwrap_or_default();
        renewed.push(var);
        let mut rest = list;
        loop {
            let d = ctx.deref(rest);
            match ctx.kind(d) {
                TermKind::Variable | TermKind::MemberVariable => {
                    return Ok(Step::Error(ctx.instantiation_error()))
                }
                TermKind::Atom if d == ctx.nil_atom() => return Ok(Step::Continue),
                TermKind::List => {
                    let head = match ctx.head(d) {
                        Some(head) => head,
                        None => return Ok(Step::Error(ctx.type_error("list", d))),
                    };
                    let tail = match ctx.tail(d) {
                        Some(tail) => tail,
                        None => return Ok(Step::Error(ctx.type_error("list", d))),
                    };
                    let map = renewal_map(ctx, &renewed);
                    let var_i = ctx.substitute(var, &map);
                    let body_i = ctx.substitute(body, &map);
                    if !ctx.unify(var_i, head, BindMode::Default) {
                        return Ok(Step::Fail);
                    }
                    match solve_sub(ctx, body_i)? {
                        GoalResult::True => rest = tail,
                        GoalResult::Fail => return Ok(Step::Fail),
                        other => return Ok(goal_step(other)),
                    }
                }
                _ => return Ok(Step::Error(ctx.type_error("list", d))),
            }
        }
    }

    fn run_switch(
        &mut self,
        ctx: &mut Context,
        scrutinee: TermRef,
        cases: TermRef,
        barrier: usize,
    ) -> Step {
        let mut default_body = None;
        for case in ctx.list_items(cases).unwrap_or_default() {
            let cd = ctx.deref(case);
            let case_name = ctx
                .functor_name(cd)
                .and_then(|n| ctx.name(n))
                .unwrap_or("")
                .to_string();
            match case_name.as_str() {
                "$default" => {
                    if default_body.is_none() {
                        default_body = ctx.arg(cd, 0);
                    }
                }
                "$case" => {
                    let patterns = ctx.arg(cd, 0).and_then(|p| ctx.list_items(p)).unwrap_or_default();
                    let body = match ctx.arg(cd, 1) {
                        Some(body) => body,
                        None => continue,
                    };
                    for pattern in patterns {
                        let mark = ctx.mark_trail();
                        if ctx.unify(scrutinee, pattern, BindMode::Default) {
                            self.frames.push(Frame::Goal { goal: body, barrier });
                            return Step::Continue;
                        }
                        ctx.backtrack_trail(mark);
                    }
                }
                _ => {}
            }
        }
        match default_body {
            Some(body) => {
                self.frames.push(Frame::Goal { goal: body, barrier });
                Step::Continue
            }
            None => Step::Fail,
        }
    }
}

/// Evaluates a goal on a private machine sharing the context's trail:
/// the first solution commits, inner choice points are discarded.
pub(crate) fn solve_sub(ctx: &mut Context, goal: TermRef) -> Result<GoalResult, EngineError> {
    let mut machine = GoalMachine::new(goal);
    machine.run(ctx)
}

fn goal_step(result: GoalResult) -> Step {
    match result {
        GoalResult::True => Step::Continue,
        GoalResult::Fail => Step::Fail,
        GoalResult::Error(error) => Step::Error(error),
        GoalResult::Halt(code) => Step::Halt(code),
    }
}

fn bool_step(ok: bool) -> Step {
    if ok {
        Step::Continue
    } else {
        Step::Fail
    }
}

/// Flags conjunction members that can never be called.
fn non_callable(ctx: &mut Context, goal: TermRef) -> Option<TermRef> {
    let d = ctx.deref(goal);
    match ctx.kind(d) {
        TermKind::Integer | TermKind::Real | TermKind::String => {
            Some(ctx.type_error("callable", d))
        }
        _ => None,
    }
}

fn clause_key(ctx: &Context, clause: &Clause) -> Option<ArgKey> {
    let head = ctx.deref(clause.head);
    if ctx.arg_count(head) == 0 {
        return None;
    }
    ctx.arg(head, 0).and_then(|arg| term_arg_key(ctx, arg))
}

/// Splits `(Head :- Body)` into its parts; a bare head gets body `true`.
fn split_clause(ctx: &mut Context, clause: TermRef) -> Result<(TermRef, TermRef), TermRef> {
    let d = ctx.deref(clause);
    match ctx.kind(d) {
        TermKind::Variable | TermKind::MemberVariable => Err(ctx.instantiation_error()),
        TermKind::Functor
            if ctx.arg_count(d) == 2
                && ctx.functor_name(d).and_then(|n| ctx.name(n)) == Some(":-") =>
        {
            let head = ctx.arg(d, 0).ok_or_else(|| ctx.instantiation_error())?;
            let body = ctx.arg(d, 1).ok_or_else(|| ctx.instantiation_error())?;
            Ok((head, body))
        }
        _ => {
            let body = ctx.create_atom("true");
            Ok((d, body))
        }
    }
}

/// Name and arity of a clause head, with the callability checks.
fn clause_head_key(ctx: &mut Context, head: TermRef) -> Result<(TermRef, usize), TermRef> {
    let d = ctx.deref(head);
    match ctx.kind(d) {
        TermKind::Variable | TermKind::MemberVariable => Err(ctx.instantiation_error()),
        TermKind::Atom => Ok((d, 0)),
        TermKind::Functor => {
            let name = ctx.functor_name(d).ok_or_else(|| ctx.instantiation_error())?;
            Ok((name, ctx.arg_count(d)))
        }
        _ => Err(ctx.type_error("callable", d)),
    }
}

/// True for a predicate installed by `consult` and never declared dynamic.
fn consulted_static(ctx: &Context, name: TermRef, arity: usize) -> bool {
    ctx.database
        .lookup(name, arity)
        .map(|p| !p.dynamic && !p.clauses.is_empty())
        .unwrap_or(false)
}

fn static_modify_error(ctx: &mut Context, name: TermRef, arity: usize) -> Option<TermRef> {
    let is_static = ctx
        .name(name)
        .map(|n| is_static_builtin(n, arity))
        .unwrap_or(false);
    if is_static {
        let pi = ctx.predicate_indicator(name, arity);
        Some(ctx.permission_error("modify", "static_procedure", pi))
    } else {
        None
    }
}

/// Validates a `Name/Arity` predicate indicator, producing the error
/// term for each malformed shape.
fn validate_indicator(ctx: &mut Context, indicator: TermRef) -> Result<(TermRef, usize), TermRef> {
    let d = ctx.deref(indicator);
    match ctx.kind(d) {
        TermKind::Variable | TermKind::MemberVariable => return Err(ctx.instantiation_error()),
        TermKind::Functor
            if ctx.arg_count(d) == 2
                && ctx.functor_name(d).and_then(|n| ctx.name(n)) == Some("/") => {}
        _ => return Err(ctx.type_error("predicate_indicator", d)),
    }
    let name = ctx.arg(d, 0).map(|n| ctx.deref(n));
    let arity = ctx.arg(d, 1).map(|a| ctx.deref(a));
    let (name, arity) = match (name, arity) {
        (Some(name), Some(arity)) => (name, arity),
        _ => return Err(ctx.instantiation_error()),
    };
    let name_kind = ctx.kind(name);
    let arity_kind = ctx.kind(arity);
    if matches!(name_kind, TermKind::Variable | TermKind::MemberVariable)
        || matches!(arity_kind, TermKind::Variable | TermKind::MemberVariable)
    {
        return Err(ctx.instantiation_error());
    }
    if arity_kind != TermKind::Integer {
        return Err(ctx.type_error("integer", arity));
    }
    if name_kind != TermKind::Atom {
        return Err(ctx.type_error("atom", name));
    }
    let value = ctx.integer_value(arity);
    if value < 0 {
        return Err(ctx.domain_error("not_less_than_zero", arity));
    }
    Ok((name, value as usize))
}

/// Fresh cells for the renewed loop variables of one iteration.
fn renewal_map(ctx: &mut Context, renewed: &[TermRef]) -> HashMap<TermRef, TermRef> {
    let mut map = HashMap::new();
    for &var in renewed {
        let d = ctx.deref(var);
        if matches!(ctx.kind(d), TermKind::Variable | TermKind::MemberVariable) {
            let fresh = ctx.create_variable();
            map.insert(d, fresh);
        }
    }
    map
}

fn renew_pair(
    ctx: &mut Context,
    cond: TermRef,
    body: TermRef,
    renewed: &[TermRef],
) -> (TermRef, TermRef) {
    if renewed.is_empty() {
        return (cond, body);
    }
    let map = renewal_map(ctx, renewed);
    (ctx.substitute(cond, &map), ctx.substitute(body, &map))
}
