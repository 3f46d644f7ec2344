// src/engine/context.rs
//! The execution context.
//!
//! A context owns every process-relevant structure: the term arena and
//! atom table, the trail, the predicate database, and the goal machine of
//! the most recent `execute_goal`. Contexts are fully independent of one
//! another; dropping one releases all of its terms.

use std::collections::HashMap;

use log::debug;

use crate::engine::database::{Clause, Database};
use crate::engine::error::EngineError;
use crate::engine::goal::{GoalMachine, GoalResult};
use crate::engine::term::{TermCell, TermRef};
use crate::engine::trail::Trail;
use crate::parser::{self, Item};

pub struct Context {
    pub(crate) terms: Vec<TermCell>,
    pub(crate) atoms: HashMap<String, TermRef>,
    pub(crate) trail: Trail,
    pub(crate) database: Database,
    pub(crate) nil: TermRef,
    pub(crate) prototype: TermRef,
    pub(crate) class_name: TermRef,
    pub(crate) dot: TermRef,
    machine: Option<GoalMachine>,
    pending_test_goal: Option<TermRef>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a fresh context with the standard atoms interned.
    pub fn new() -> Self {
        let mut ctx = Self {
            terms: Vec::new(),
            atoms: HashMap::new(),
            trail: Trail::default(),
            database: Database::default(),
            nil: TermRef(0),
            prototype: TermRef(0),
            class_name: TermRef(0),
            dot: TermRef(0),
            machine: None,
            pending_test_goal: None,
        };
        ctx.nil = ctx.create_atom("[]");
        ctx.prototype = ctx.create_atom("prototype");
        ctx.class_name = ctx.create_atom("className");
        ctx.dot = ctx.create_atom(".");
        ctx
    }

    /// Parses `source` and installs its clauses; directives run as they
    /// are read, and `??--` goals are stashed for [`Context::take_test_goal`].
    pub fn consult_string(&mut self, source: &str) -> Result<(), EngineError> {
        let items = parser::parse_program(self, source)?;
        for item in items {
            match item {
                Item::Clause { head, body } => self.install_clause(head, body)?,
                Item::TestGoal(goal) => self.pending_test_goal = Some(goal),
                Item::Directive(goal) => {
                    let mut machine = GoalMachine::new(goal);
                    match machine.run(self)? {
                        GoalResult::True => {}
                        GoalResult::Fail => {
                            return Err(EngineError::DirectiveFailed(self.print_string(goal)));
                        }
                        GoalResult::Error(error) => {
                            return Err(EngineError::DirectiveFailed(self.print_string(error)));
                        }
                        GoalResult::Halt(code) => {
                            return Err(EngineError::DirectiveFailed(format!("halt({})", code)));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Adds one parsed clause to the database, as `consult_string` does.
    pub fn install_clause(&mut self, head: TermRef, body: TermRef) -> Result<(), EngineError> {
        let d = self.deref(head);
        let (name, arity) = match self.cell(d) {
            TermCell::Atom { .. } => (d, 0),
            TermCell::Functor { name, args } => (*name, args.len()),
            _ => {
                return Err(EngineError::DirectiveFailed(format!(
                    "clause head is not callable: {}",
                    self.print_string(d)
                )))
            }
        };
        debug!("consult {}/{}", self.name(name).unwrap_or("?"), arity);
        let clause = Clause::new(head, body);
        let pred = self.database.ensure(name, arity);
        pred.clauses.push(clause);
        Ok(())
    }

    /// Returns (and clears) the most recently consulted `??--` goal.
    pub fn take_test_goal(&mut self) -> Option<TermRef> {
        self.pending_test_goal.take()
    }

    /// Evaluates a goal to its first outcome. The machine is retained so
    /// that [`Context::reexecute_goal`] can resume it.
    pub fn execute_goal(&mut self, goal: TermRef) -> Result<GoalResult, EngineError> {
        let mut machine = GoalMachine::new(goal);
        let result = machine.run(self)?;
        self.machine = match result {
            GoalResult::Fail => None,
            _ => Some(machine),
        };
        Ok(result)
    }

    /// Resumes the most recent goal at its latest choice point, yielding
    /// the next solution or `Fail` when the search space is exhausted.
    pub fn reexecute_goal(&mut self) -> Result<GoalResult, EngineError> {
        let mut machine = match self.machine.take() {
            None => return Ok(GoalResult::Fail),
            Some(machine) => machine,
        };
        let result = machine.reexecute(self)?;
        self.machine = match result {
            GoalResult::Fail => None,
            _ => Some(machine),
        };
        Ok(result)
    }

    fn funct(&mut self, name: &str, args: &[TermRef]) -> TermRef {
        let atom = self.create_atom(name);
        self.create_functor_with_args(atom, args)
            .expect("functor name is an interned atom")
    }

    /// Wraps an error kind in the standard `error(Kind, _)` shape.
    pub(crate) fn make_error(&mut self, kind: TermRef) -> TermRef {
        let slot = self.create_variable();
        self.funct("error", &[kind, slot])
    }

    pub(crate) fn instantiation_error(&mut self) -> TermRef {
        let kind = self.create_atom("instantiation_error");
        self.make_error(kind)
    }

    pub(crate) fn type_error(&mut self, expected: &str, culprit: TermRef) -> TermRef {
        let expected = self.create_atom(expected);
        let kind = self.funct("type_error", &[expected, culprit]);
        self.make_error(kind)
    }

    pub(crate) fn domain_error(&mut self, domain: &str, culprit: TermRef) -> TermRef {
        let domain = self.create_atom(domain);
        let kind = self.funct("domain_error", &[domain, culprit]);
        self.make_error(kind)
    }

    pub(crate) fn existence_error(&mut self, name: TermRef, arity: usize) -> TermRef {
        let procedure = self.create_atom("procedure");
        let pi = self.predicate_indicator(name, arity);
        let kind = self.funct("existence_error", &[procedure, pi]);
        self.make_error(kind)
    }

    pub(crate) fn permission_error(
        &mut self,
        operation: &str,
        kind_name: &str,
        culprit: TermRef,
    ) -> TermRef {
        let operation = self.create_atom(operation);
        let kind_name = self.create_atom(kind_name);
        let kind = self.funct("permission_error", &[operation, kind_name, culprit]);
        self.make_error(kind)
    }

    pub(crate) fn evaluation_error(&mut self, what: &str) -> TermRef {
        let what = self.create_atom(what);
        let kind = self.funct("evaluation_error", &[what]);
        self.make_error(kind)
    }

    /// Builds the `Name/Arity` term.
    pub fn predicate_indicator(&mut self, name: TermRef, arity: usize) -> TermRef {
        let arity = self.create_integer(arity as i64);
        self.funct("/", &[name, arity])
    }
}
