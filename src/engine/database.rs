// src/engine/database.rs
//! The predicate database and the operator table.
//!
//! Predicates are keyed by (name atom, arity). Clauses keep their head and
//! body terms and compile lazily on first selection; the compiled form is
//! cached per clause. Statically consulted predicates refuse runtime
//! modification; predicates created by `assert` or declared `dynamic`
//! accept it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::code::CodeClause;
use crate::engine::compile::compile_clause;
use crate::engine::context::Context;
use crate::engine::term::TermRef;

/// One stored clause. The compiled program is produced on first use.
#[derive(Debug)]
pub struct Clause {
    pub head: TermRef,
    pub body: TermRef,
    code: RefCell<Option<Rc<CodeClause>>>,
}

impl Clause {
    pub fn new(head: TermRef, body: TermRef) -> Rc<Self> {
        Rc::new(Self { head, body, code: RefCell::new(None) })
    }

    /// The compiled matcher+builder for this clause.
    pub fn code(&self, ctx: &Context) -> Rc<CodeClause> {
        let mut slot = self.code.borrow_mut();
        if let Some(code) = &*slot {
            return Rc::clone(code);
        }
        let code = Rc::new(compile_clause(ctx, self.head, self.body));
        *slot = Some(Rc::clone(&code));
        code
    }
}

#[derive(Debug, Default)]
pub struct Predicate {
    pub clauses: Vec<Rc<Clause>>,
    pub dynamic: bool,
}

#[derive(Debug, Default)]
pub struct Database {
    preds: HashMap<(TermRef, usize), Predicate>,
}

impl Database {
    pub fn lookup(&self, name: TermRef, arity: usize) -> Option<&Predicate> {
        self.preds.get(&(name, arity))
    }

    pub fn lookup_mut(&mut self, name: TermRef, arity: usize) -> Option<&mut Predicate> {
        self.preds.get_mut(&(name, arity))
    }

    pub fn ensure(&mut self, name: TermRef, arity: usize) -> &mut Predicate {
        self.preds.entry((name, arity)).or_default()
    }

    /// Declares a predicate dynamic, creating it empty when missing.
    pub fn declare_dynamic(&mut self, name: TermRef, arity: usize) {
        self.ensure(name, arity).dynamic = true;
    }

    /// Removes a predicate entirely. Succeeds silently when missing.
    pub fn remove(&mut self, name: TermRef, arity: usize) {
        self.preds.remove(&(name, arity));
    }
}

/// Operator fixity specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpSpecifier {
    Xfx,
    Xfy,
    Yfx,
    Fx,
    Fy,
}

/// Priority and specifier of an operator, by name and arity. This is the
/// canonical table the reader is driven by.
pub fn operator_info(name: &str, arity: usize) -> Option<(u32, OpSpecifier)> {
    use OpSpecifier::*;
    Some(match (name, arity) {
        (":-", 2) | ("-->", 2) => (1200, Xfx),
        (":-", 1) | ("?-", 1) => (1200, Fx),
        (";", 2) | ("||", 2) => (1100, Xfy),
        ("->", 2) | ("=>", 2) | ("<=>", 2) => (1050, Xfy),
        (",", 2) | ("&&", 2) => (1000, Xfy),
        ("\\+", 1) | ("!", 1) => (900, Fy),
        ("=", 2) | ("\\=", 2) | ("!=", 2) | ("==", 2) | ("\\==", 2) | ("!==", 2) => (700, Xfx),
        ("@<", 2) | ("@=<", 2) | ("@<=", 2) | ("@>", 2) | ("@>=", 2) => (700, Xfx),
        ("=..", 2) | ("is", 2) | ("in", 2) => (700, Xfx),
        ("=:=", 2) | ("=\\=", 2) | ("=!=", 2) => (700, Xfx),
        ("<", 2) | ("=<", 2) | ("<=", 2) | (">", 2) | (">=", 2) => (700, Xfx),
        (":=", 2) | ("::=", 2) => (700, Xfx),
        ("+", 2) | ("-", 2) | ("/\\", 2) | ("\\/", 2) => (500, Yfx),
        ("*", 2) | ("/", 2) | ("//", 2) | ("rem", 2) | ("mod", 2) => (400, Yfx),
        ("<<", 2) | (">>", 2) | (">>>", 2) => (400, Yfx),
        ("**", 2) => (200, Xfx),
        ("^", 2) => (200, Xfy),
        ("-", 1) | ("\\", 1) | ("~", 1) => (200, Fy),
        (":", 2) => (100, Xfx),
        _ => return None,
    })
}

/// Built-in procedures that refuse `assert`/`retract`/`abolish`.
pub fn is_static_builtin(name: &str, arity: usize) -> bool {
    matches!(
        (name, arity),
        ("true", 0)
            | ("fail", 0)
            | ("false", 0)
            | ("!", 0)
            | ("commit", 0)
            | ("halt", 0)
            | ("halt", 1)
            | (",", 2)
            | ("&&", 2)
            | (";", 2)
            | ("||", 2)
            | ("->", 2)
            | ("=>", 2)
            | ("<=>", 2)
            | ("!", 1)
            | ("\\+", 1)
            | ("call", 1)
            | ("catch", 3)
            | ("throw", 1)
            | ("in", 2)
            | ("=", 2)
            | ("\\=", 2)
            | ("!=", 2)
            | ("==", 2)
            | ("\\==", 2)
            | ("!==", 2)
            | ("@<", 2)
            | ("@>", 2)
            | ("@=<", 2)
            | ("@<=", 2)
            | ("@>=", 2)
            | ("unify_with_occurs_check", 2)
            | ("unifiable", 2)
            | ("var", 1)
            | ("nonvar", 1)
            | ("atom", 1)
            | ("atomic", 1)
            | ("integer", 1)
            | ("float", 1)
            | ("number", 1)
            | ("compound", 1)
            | ("callable", 1)
            | ("asserta", 1)
            | ("assertz", 1)
            | ("retract", 1)
            | ("abolish", 1)
            | ("dynamic", 1)
            | ("is", 2)
            | ("=:=", 2)
            | ("=!=", 2)
            | ("=\\=", 2)
            | ("<", 2)
            | (">", 2)
            | ("=<", 2)
            | ("<=", 2)
            | (">=", 2)
    )
}

impl Context {
    /// Looks up the priority and specifier of an operator atom.
    pub fn operator_info(&self, name: TermRef, arity: usize) -> Option<(u32, OpSpecifier)> {
        operator_info(self.name(name)?, arity)
    }
}
