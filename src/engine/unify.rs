// src/engine/unify.rs
//! Unification, the standard order of terms, and term copying.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::trace;

use crate::engine::context::Context;
use crate::engine::term::{TermCell, TermRef};
use crate::engine::trail::TrailEntry;

/// Binding discipline for [`Context::unify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Symmetric unification with occurs check.
    Default,
    /// Structural identity; no new bindings are created.
    Equality,
    /// Bindings may only be written into variables of the first term.
    OneWay,
}

impl Context {
    /// Dereferences `term` and, for an unbound member variable whose
    /// object is known, resolves it against the object's property table
    /// (recording the binding on the trail).
    pub(crate) fn deref_member(&mut self, term: TermRef) -> TermRef {
        let d = self.deref(term);
        let (object, name) = match self.cell(d) {
            TermCell::MemberVar { object, name, value: None } => (*object, *name),
            _ => return d,
        };
        let object = self.deref(object);
        if !matches!(self.cell(object), TermCell::Object { .. }) {
            return d;
        }
        match self.property(object, name) {
            Some(value) => {
                self.trail.push(TrailEntry::Binding(d));
                if let TermCell::MemberVar { value: slot, .. } = self.cell_mut(d) {
                    *slot = Some(value);
                }
                self.deref(value)
            }
            None => d,
        }
    }

    fn is_unbound(&self, term: TermRef) -> bool {
        matches!(
            self.cell(term),
            TermCell::Var { value: None, .. } | TermCell::MemberVar { value: None, .. }
        )
    }

    /// True when `term` contains `var` anywhere in its structure.
    pub(crate) fn occurs(&self, var: TermRef, term: TermRef) -> bool {
        let d = self.deref(term);
        if d == var {
            return true;
        }
        match self.cell(d) {
            TermCell::List { head, tail } => {
                self.occurs(var, *head) || tail.map_or(false, |t| self.occurs(var, t))
            }
            TermCell::Functor { args, .. } => {
                args.iter().flatten().any(|&a| self.occurs(var, a))
            }
            TermCell::MemberVar { object, .. } => self.occurs(var, *object),
            _ => false,
        }
    }

    /// Binds the variable at the end of `var`'s chain to `value`,
    /// recording the write on the trail. In default mode a binding that
    /// would create a cycle fails and leaves no trace.
    pub fn bind_variable(&mut self, var: TermRef, value: TermRef, mode: BindMode) -> bool {
        let slot = self.deref(var);
        if !self.is_unbound(slot) {
            return false;
        }
        let target = self.deref(value);
        if slot == target {
            return true;
        }
        if mode != BindMode::Equality && self.occurs(slot, target) {
            return false;
        }
        self.trail.push(TrailEntry::Binding(slot));
        match self.cell_mut(slot) {
            TermCell::Var { value, .. } | TermCell::MemberVar { value, .. } => {
                *value = Some(target);
            }
            _ => unreachable!(),
        }
        true
    }

    /// Unifies two terms under the given mode. A failed attempt may leave
    /// bindings behind; callers roll back through the trail.
    pub fn unify(&mut self, t1: TermRef, t2: TermRef, mode: BindMode) -> bool {
        let (d1, d2) = if mode == BindMode::Equality {
            (self.deref(t1), self.deref(t2))
        } else {
            (self.deref_member(t1), self.deref_member(t2))
        };
        if d1 == d2 {
            return true;
        }
        trace!("unify {:?} ~ {:?} ({:?})", d1, d2, mode);
        let unbound1 = self.is_unbound(d1);
        let unbound2 = self.is_unbound(d2);
        if unbound1 || unbound2 {
            return match mode {
                BindMode::Equality => false,
                BindMode::Default => {
                    if unbound1 {
                        self.bind_variable(d1, d2, mode)
                    } else {
                        self.bind_variable(d2, d1, mode)
                    }
                }
                BindMode::OneWay => {
                    // Only first-side variables may be written.
                    if unbound1 {
                        self.bind_variable(d1, d2, mode)
                    } else {
                        false
                    }
                }
            };
        }
        match (self.cell(d1).clone(), self.cell(d2).clone()) {
            (TermCell::Str { bytes: a }, TermCell::Str { bytes: b }) => a == b,
            (TermCell::Integer(a), TermCell::Integer(b)) => a == b,
            (TermCell::Real(a), TermCell::Real(b)) => a == b,
            (TermCell::List { head: h1, tail: t1 }, TermCell::List { head: h2, tail: t2 }) => {
                if !self.unify(h1, h2, mode) {
                    return false;
                }
                match (t1, t2) {
                    (Some(t1), Some(t2)) => self.unify(t1, t2, mode),
                    _ => false,
                }
            }
            (
                TermCell::Functor { name: n1, args: a1 },
                TermCell::Functor { name: n2, args: a2 },
            ) => {
                if n1 != n2 || a1.len() != a2.len() {
                    return false;
                }
                a1.iter().zip(a2.iter()).all(|(x, y)| match (x, y) {
                    (Some(x), Some(y)) => self.unify(*x, *y, mode),
                    _ => false,
                })
            }
            (
                TermCell::Predicate { name: n1, arity: r1 },
                TermCell::Predicate { name: n2, arity: r2 },
            ) => n1 == n2 && r1 == r2,
            _ => false,
        }
    }

    /// `unify` in default mode; the occurs check is always on.
    pub fn unify_with_occurs_check(&mut self, t1: TermRef, t2: TermRef) -> bool {
        self.unify(t1, t2, BindMode::Default)
    }

    /// Tests whether two terms would unify, rolling every binding back.
    pub fn unifiable(&mut self, t1: TermRef, t2: TermRef) -> bool {
        let mark = self.mark_trail();
        let result = self.unify(t1, t2, BindMode::Default);
        self.backtrack_trail(mark);
        result
    }

    fn order_rank(&self, term: TermRef) -> u8 {
        match self.cell(term) {
            TermCell::Var { .. } | TermCell::MemberVar { .. } => 0,
            TermCell::Real(_) => 1,
            TermCell::Integer(_) => 2,
            TermCell::Str { .. } => 3,
            TermCell::Atom { .. } => 4,
            TermCell::List { .. } | TermCell::Functor { .. } => 5,
            TermCell::Predicate { .. } => 6,
            TermCell::Object { .. } => 7,
        }
    }

    fn atom_name(&self, atom: TermRef) -> &str {
        match self.cell(atom) {
            TermCell::Atom { name } => name,
            _ => "",
        }
    }

    /// The standard order of terms: variable < real < integer < string <
    /// atom < compound, with lists ordered as `./2` pairs, compounds by
    /// arity then name then arguments, and variables by identity.
    pub fn precedes(&self, t1: TermRef, t2: TermRef) -> Ordering {
        let d1 = self.deref(t1);
        let d2 = self.deref(t2);
        if d1 == d2 {
            return Ordering::Equal;
        }
        let r1 = self.order_rank(d1);
        let r2 = self.order_rank(d2);
        if r1 != r2 {
            return r1.cmp(&r2);
        }
        match (self.cell(d1), self.cell(d2)) {
            (TermCell::Var { .. }, _) | (TermCell::MemberVar { .. }, _) => d1.cmp(&d2),
            (TermCell::Real(a), TermCell::Real(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (TermCell::Integer(a), TermCell::Integer(b)) => a.cmp(b),
            (TermCell::Str { bytes: a }, TermCell::Str { bytes: b }) => a.cmp(b),
            (TermCell::Atom { name: a }, TermCell::Atom { name: b }) => a.cmp(b),
            (TermCell::Predicate { name: n1, arity: a1 }, TermCell::Predicate { name: n2, arity: a2 }) => {
                a1.cmp(a2)
                    .then_with(|| self.atom_name(*n1).cmp(self.atom_name(*n2)))
            }
            (TermCell::Object { .. }, TermCell::Object { .. }) => d1.cmp(&d2),
            _ => self.precedes_compound(d1, d2),
        }
    }

    fn compound_shape(&self, term: TermRef) -> (TermRef, usize) {
        match self.cell(term) {
            TermCell::List { .. } => (self.dot_atom(), 2),
            TermCell::Functor { name, args } => (*name, args.len()),
            _ => (term, 0),
        }
    }

    fn compound_arg(&self, term: TermRef, index: usize) -> Option<TermRef> {
        match self.cell(term) {
            TermCell::List { head, tail } => match index {
                0 => Some(*head),
                1 => *tail,
                _ => None,
            },
            TermCell::Functor { args, .. } => args.get(index).copied().flatten(),
            _ => None,
        }
    }

    fn precedes_compound(&self, d1: TermRef, d2: TermRef) -> Ordering {
        let (n1, a1) = self.compound_shape(d1);
        let (n2, a2) = self.compound_shape(d2);
        let by_shape = a1
            .cmp(&a2)
            .then_with(|| self.atom_name(n1).cmp(self.atom_name(n2)));
        if by_shape != Ordering::Equal {
            return by_shape;
        }
        for index in 0..a1 {
            match (self.compound_arg(d1, index), self.compound_arg(d2, index)) {
                (Some(x), Some(y)) => {
                    let ord = self.precedes(x, y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                _ => continue,
            }
        }
        Ordering::Equal
    }

    /// The free variables of a term, most recently discovered first,
    /// as a list term.
    pub fn witness(&mut self, term: TermRef) -> TermRef {
        let mut vars = Vec::new();
        self.collect_free_vars(term, &mut vars);
        vars.reverse();
        self.make_list(&vars)
    }

    fn collect_free_vars(&self, term: TermRef, vars: &mut Vec<TermRef>) {
        let d = self.deref(term);
        match self.cell(d) {
            TermCell::Var { value: None, .. } | TermCell::MemberVar { value: None, .. } => {
                if !vars.contains(&d) {
                    vars.push(d);
                }
            }
            TermCell::List { head, tail } => {
                self.collect_free_vars(*head, vars);
                if let Some(tail) = tail {
                    self.collect_free_vars(*tail, vars);
                }
            }
            TermCell::Functor { args, .. } => {
                for arg in args.iter().flatten() {
                    self.collect_free_vars(*arg, vars);
                }
            }
            _ => {}
        }
    }

    /// Deep copy with bindings resolved; unbound variables and identity
    /// terms are shared. Used when a term must survive trail unwinding.
    pub fn clone_resolved(&mut self, term: TermRef) -> TermRef {
        let d = self.deref(term);
        match self.cell(d).clone() {
            TermCell::List { head, tail } => {
                let head = self.clone_resolved(head);
                let tail = tail.map(|t| self.clone_resolved(t));
                match tail {
                    Some(tail) => self.create_list(head, tail),
                    None => self.create_unfinished_list(head),
                }
            }
            TermCell::Functor { name, args } => {
                let args: Vec<Option<TermRef>> = args
                    .into_iter()
                    .map(|a| a.map(|a| self.clone_resolved(a)))
                    .collect();
                self.alloc(TermCell::Functor { name, args })
            }
            _ => d,
        }
    }

    /// Copy of `term` with the variables in `map` replaced and everything
    /// else shared. Loop bodies use this to renew their listed variables.
    pub fn substitute(&mut self, term: TermRef, map: &HashMap<TermRef, TermRef>) -> TermRef {
        let d = self.deref(term);
        if let Some(&replacement) = map.get(&d) {
            return replacement;
        }
        match self.cell(d).clone() {
            TermCell::List { head, tail } => {
                let new_head = self.substitute(head, map);
                let new_tail = tail.map(|t| self.substitute(t, map));
                if new_head == head && new_tail == tail {
                    return d;
                }
                match new_tail {
                    Some(tail) => self.create_list(new_head, tail),
                    None => self.create_unfinished_list(new_head),
                }
            }
            TermCell::Functor { name, args } => {
                let new_args: Vec<Option<TermRef>> = args
                    .iter()
                    .map(|a| a.map(|a| self.substitute(a, map)))
                    .collect();
                if new_args == args {
                    return d;
                }
                self.alloc(TermCell::Functor { name, args: new_args })
            }
            TermCell::MemberVar { object, name, value: None } => {
                let new_object = self.substitute(object, map);
                if new_object == object {
                    return d;
                }
                self.alloc(TermCell::MemberVar { object: new_object, name, value: None })
            }
            _ => d,
        }
    }

    /// Deep copy with fresh variables; the map keeps shared variables
    /// shared within one renaming.
    pub fn rename_term(&mut self, term: TermRef, map: &mut HashMap<TermRef, TermRef>) -> TermRef {
        let d = self.deref(term);
        match self.cell(d).clone() {
            TermCell::Var { value: None, name } => *map.entry(d).or_insert_with(|| {
                let index = self.terms.len() as u32;
                self.terms.push(TermCell::Var { name, value: None });
                TermRef(index)
            }),
            TermCell::MemberVar { object, name, value: None } => {
                if let Some(&fresh) = map.get(&d) {
                    return fresh;
                }
                let object = self.rename_term(object, map);
                let fresh = self.alloc(TermCell::MemberVar { object, name, value: None });
                map.insert(d, fresh);
                fresh
            }
            TermCell::List { head, tail } => {
                let head = self.rename_term(head, map);
                let tail = tail.map(|t| self.rename_term(t, map));
                match tail {
                    Some(tail) => self.create_list(head, tail),
                    None => self.create_unfinished_list(head),
                }
            }
            TermCell::Functor { name, args } => {
                let args: Vec<Option<TermRef>> = args
                    .into_iter()
                    .map(|a| a.map(|a| self.rename_term(a, map)))
                    .collect();
                self.alloc(TermCell::Functor { name, args })
            }
            _ => d,
        }
    }
}
