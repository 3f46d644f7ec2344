// src/engine/term.rs
//! Term representation and the per-context term store.
//!
//! Terms live in an arena owned by the [`Context`]; a [`TermRef`] is an
//! index into it and doubles as the term's identity. Atoms are interned,
//! strings are not. The only mutations after construction are variable
//! bindings, list-tail writes, and object property additions, all of which
//! go through the trail.

use crate::engine::context::Context;
use crate::engine::trail::TrailEntry;
use crate::engine::utf8;

/// Index of a term in a context's arena. Identity is index identity;
/// two distinct variables are distinct even if they print alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermRef(pub(crate) u32);

/// The kinds of terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Atom,
    String,
    Integer,
    Real,
    Variable,
    MemberVariable,
    List,
    Functor,
    Predicate,
    Object,
}

/// Storage cell for one term.
#[derive(Debug, Clone)]
pub(crate) enum TermCell {
    Atom { name: String },
    Str { bytes: Vec<u8> },
    Integer(i64),
    Real(f64),
    Var { name: Option<String>, value: Option<TermRef> },
    MemberVar { object: TermRef, name: TermRef, value: Option<TermRef> },
    List { head: TermRef, tail: Option<TermRef> },
    Functor { name: TermRef, args: Vec<Option<TermRef>> },
    Predicate { name: TermRef, arity: usize },
    Object { props: Vec<(TermRef, TermRef)> },
}

impl Context {
    pub(crate) fn cell(&self, term: TermRef) -> &TermCell {
        &self.terms[term.0 as usize]
    }

    pub(crate) fn cell_mut(&mut self, term: TermRef) -> &mut TermCell {
        &mut self.terms[term.0 as usize]
    }

    pub(crate) fn alloc(&mut self, cell: TermCell) -> TermRef {
        let index = self.terms.len() as u32;
        self.terms.push(cell);
        TermRef(index)
    }

    /// Creates (or finds) the interned atom with the given name.
    /// The empty name yields the canonical empty atom.
    pub fn create_atom(&mut self, name: &str) -> TermRef {
        if let Some(&atom) = self.atoms.get(name) {
            return atom;
        }
        let atom = self.alloc(TermCell::Atom { name: name.to_string() });
        self.atoms.insert(name.to_string(), atom);
        atom
    }

    /// The standard `[]` atom.
    pub fn nil_atom(&self) -> TermRef {
        self.nil
    }

    /// The standard `prototype` atom.
    pub fn prototype_atom(&self) -> TermRef {
        self.prototype
    }

    /// The standard `className` atom.
    pub fn class_name_atom(&self) -> TermRef {
        self.class_name
    }

    /// The standard `.` atom, used when lists are viewed as `./2` pairs.
    pub fn dot_atom(&self) -> TermRef {
        self.dot
    }

    /// Creates a fresh string term. Strings are not interned: two calls
    /// with the same bytes yield distinct terms that compare equal.
    pub fn create_string(&mut self, value: &str) -> TermRef {
        self.create_string_n(value.as_bytes())
    }

    /// Creates a fresh string term from raw bytes; NUL bytes are fine.
    pub fn create_string_n(&mut self, bytes: &[u8]) -> TermRef {
        self.alloc(TermCell::Str { bytes: bytes.to_vec() })
    }

    pub fn create_integer(&mut self, value: i64) -> TermRef {
        self.alloc(TermCell::Integer(value))
    }

    pub fn create_real(&mut self, value: f64) -> TermRef {
        self.alloc(TermCell::Real(value))
    }

    /// Creates a fresh anonymous variable.
    pub fn create_variable(&mut self) -> TermRef {
        self.alloc(TermCell::Var { name: None, value: None })
    }

    /// Creates a fresh variable carrying a name for printing. An empty
    /// name makes the variable anonymous.
    pub fn create_named_variable(&mut self, name: &str) -> TermRef {
        let name = if name.is_empty() { None } else { Some(name.to_string()) };
        self.alloc(TermCell::Var { name, value: None })
    }

    /// Creates a member variable tied to an object-slot pair. `name` must
    /// be an atom.
    pub fn create_member_variable(&mut self, object: TermRef, name: TermRef) -> Option<TermRef> {
        if !matches!(self.cell(name), TermCell::Atom { .. }) {
            return None;
        }
        Some(self.alloc(TermCell::MemberVar { object, name, value: None }))
    }

    /// Creates a functor with `arity` empty argument slots. Arity 0
    /// collapses to the name atom itself.
    pub fn create_functor(&mut self, name: TermRef, arity: usize) -> Option<TermRef> {
        if !matches!(self.cell(name), TermCell::Atom { .. }) {
            return None;
        }
        if arity == 0 {
            return Some(name);
        }
        Some(self.alloc(TermCell::Functor { name, args: vec![None; arity] }))
    }

    /// Writes argument slot `index` of `functor`. Fails when the slot is
    /// out of range or already holds a different term; rewriting the same
    /// term is a no-op.
    pub fn bind_functor_arg(&mut self, functor: TermRef, index: usize, value: TermRef) -> bool {
        match self.cell_mut(functor) {
            TermCell::Functor { args, .. } => match args.get_mut(index) {
                Some(slot) => match slot {
                    Some(existing) => *existing == value,
                    None => {
                        *slot = Some(value);
                        true
                    }
                },
                None => false,
            },
            _ => false,
        }
    }

    /// Creates a functor with all arguments bound at once. Zero arguments
    /// yields the name atom.
    pub fn create_functor_with_args(&mut self, name: TermRef, args: &[TermRef]) -> Option<TermRef> {
        if !matches!(self.cell(name), TermCell::Atom { .. }) {
            return None;
        }
        if args.is_empty() {
            return Some(name);
        }
        let args = args.iter().map(|&a| Some(a)).collect();
        Some(self.alloc(TermCell::Functor { name, args }))
    }

    /// Creates a list pair with both fields set.
    pub fn create_list(&mut self, head: TermRef, tail: TermRef) -> TermRef {
        self.alloc(TermCell::List { head, tail: Some(tail) })
    }

    /// Creates a list pair whose tail is still unset; see [`Context::set_tail`].
    pub fn create_unfinished_list(&mut self, head: TermRef) -> TermRef {
        self.alloc(TermCell::List { head, tail: None })
    }

    /// Writes the tail of a list pair, recording the old value on the
    /// trail. Returns false when `list` is not a list pair.
    pub fn set_tail(&mut self, list: TermRef, new_tail: TermRef) -> bool {
        let old = match self.cell(list) {
            TermCell::List { tail, .. } => *tail,
            _ => return false,
        };
        self.trail.push(TrailEntry::Tail(list, old));
        if let TermCell::List { tail, .. } = self.cell_mut(list) {
            *tail = Some(new_tail);
        }
        true
    }

    /// Head of a list pair, after dereferencing.
    pub fn head(&self, term: TermRef) -> Option<TermRef> {
        match self.cell(self.deref(term)) {
            TermCell::List { head, .. } => Some(*head),
            _ => None,
        }
    }

    /// Tail of a list pair, after dereferencing.
    pub fn tail(&self, term: TermRef) -> Option<TermRef> {
        match self.cell(self.deref(term)) {
            TermCell::List { tail, .. } => *tail,
            _ => None,
        }
    }

    /// Creates a predicate indicator, distinct from any functor.
    pub fn create_predicate(&mut self, name: TermRef, arity: usize) -> Option<TermRef> {
        if !matches!(self.cell(name), TermCell::Atom { .. }) {
            return None;
        }
        Some(self.alloc(TermCell::Predicate { name, arity }))
    }

    /// Creates a class object with `className` set and, when a parent is
    /// given, `prototype` chained to it.
    pub fn create_class_object(&mut self, class_name: TermRef, parent: Option<TermRef>) -> Option<TermRef> {
        if !matches!(self.cell(class_name), TermCell::Atom { .. }) {
            return None;
        }
        if let Some(parent) = parent {
            if !self.is_class_object(parent) {
                return None;
            }
        }
        let mut props = vec![(self.class_name, class_name)];
        if let Some(parent) = parent {
            props.push((self.prototype, parent));
        }
        Some(self.alloc(TermCell::Object { props }))
    }

    /// Creates an instance object of `class`.
    pub fn create_object(&mut self, class: TermRef) -> Option<TermRef> {
        if !self.is_class_object(class) {
            return None;
        }
        let props = vec![(self.prototype, class)];
        Some(self.alloc(TermCell::Object { props }))
    }

    /// Appends a property to an object, recording the addition on the
    /// trail. The reserved `prototype` and `className` slots cannot be
    /// rewritten, the key must be an atom, and the target must be an
    /// object.
    pub fn add_property(&mut self, object: TermRef, name: TermRef, value: TermRef) -> bool {
        if !matches!(self.cell(name), TermCell::Atom { .. }) {
            return false;
        }
        if name == self.prototype || name == self.class_name {
            return false;
        }
        if !matches!(self.cell(object), TermCell::Object { .. }) {
            return false;
        }
        self.trail.push(TrailEntry::Property(object));
        if let TermCell::Object { props } = self.cell_mut(object) {
            props.push((name, value));
        }
        true
    }

    /// Looks up a property on the object itself, without walking the
    /// prototype chain.
    pub fn own_property(&self, object: TermRef, name: TermRef) -> Option<TermRef> {
        if !matches!(self.cell(name), TermCell::Atom { .. }) {
            return None;
        }
        match self.cell(object) {
            TermCell::Object { props } => {
                props.iter().rev().find(|(n, _)| *n == name).map(|(_, v)| *v)
            }
            _ => None,
        }
    }

    /// Looks up a property, walking the prototype chain.
    pub fn property(&self, object: TermRef, name: TermRef) -> Option<TermRef> {
        let mut current = object;
        loop {
            if let Some(value) = self.own_property(current, name) {
                return Some(value);
            }
            match self.own_property(current, self.prototype) {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// True for objects carrying their own `className`.
    pub fn is_class_object(&self, term: TermRef) -> bool {
        matches!(self.cell(term), TermCell::Object { .. })
            && self.own_property(term, self.class_name).is_some()
    }

    /// True for objects created from a class (no own `className`).
    pub fn is_instance_object(&self, term: TermRef) -> bool {
        matches!(self.cell(term), TermCell::Object { .. })
            && self.own_property(term, self.class_name).is_none()
    }

    /// True when `object`'s prototype chain (starting at `object` itself)
    /// reaches `ancestor`.
    pub fn inherits(&self, object: TermRef, ancestor: TermRef) -> bool {
        let mut current = object;
        loop {
            if current == ancestor {
                return true;
            }
            match self.own_property(current, self.prototype) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// True when `object` is an instance whose class chain reaches `class`.
    pub fn is_instance_of(&self, object: TermRef, class: TermRef) -> bool {
        self.is_instance_object(object) && self.is_class_object(class) && self.inherits(object, class)
    }

    /// Follows variable bindings to the last term of the chain.
    pub fn deref(&self, term: TermRef) -> TermRef {
        let mut current = term;
        loop {
            match self.cell(current) {
                TermCell::Var { value: Some(next), .. }
                | TermCell::MemberVar { value: Some(next), .. } => current = *next,
                _ => return current,
            }
        }
    }

    /// The kind of a term, after dereferencing.
    pub fn kind(&self, term: TermRef) -> TermKind {
        match self.cell(self.deref(term)) {
            TermCell::Atom { .. } => TermKind::Atom,
            TermCell::Str { .. } => TermKind::String,
            TermCell::Integer(_) => TermKind::Integer,
            TermCell::Real(_) => TermKind::Real,
            TermCell::Var { .. } => TermKind::Variable,
            TermCell::MemberVar { .. } => TermKind::MemberVariable,
            TermCell::List { .. } => TermKind::List,
            TermCell::Functor { .. } => TermKind::Functor,
            TermCell::Predicate { .. } => TermKind::Predicate,
            TermCell::Object { .. } => TermKind::Object,
        }
    }

    /// Name of an atom, variable, string, functor, predicate, or member
    /// variable, after dereferencing. Anonymous variables and non-UTF-8
    /// strings have no name.
    pub fn name(&self, term: TermRef) -> Option<&str> {
        match self.cell(self.deref(term)) {
            TermCell::Atom { name } => Some(name),
            TermCell::Str { bytes } => std::str::from_utf8(bytes).ok(),
            TermCell::Var { name, .. } => name.as_deref(),
            TermCell::MemberVar { name, .. } | TermCell::Functor { name, .. } | TermCell::Predicate { name, .. } => {
                self.name(*name)
            }
            _ => None,
        }
    }

    /// Raw bytes of a string term.
    pub fn string_bytes(&self, term: TermRef) -> Option<&[u8]> {
        match self.cell(self.deref(term)) {
            TermCell::Str { bytes } => Some(bytes),
            _ => None,
        }
    }

    /// Byte length of a string term's contents, 0 otherwise.
    pub fn name_length(&self, term: TermRef) -> usize {
        self.string_bytes(term).map_or(0, <[u8]>::len)
    }

    /// Length of a string term in code points, counting malformed runs
    /// as single characters.
    pub fn name_length_utf8(&self, term: TermRef) -> usize {
        self.string_bytes(term).map_or(0, utf8::code_point_length)
    }

    /// Integer value, or 0 for anything that is not a bound integer.
    pub fn integer_value(&self, term: TermRef) -> i64 {
        match self.cell(self.deref(term)) {
            TermCell::Integer(value) => *value,
            _ => 0,
        }
    }

    /// Real value, or 0.0 for anything that is not a bound real.
    pub fn real_value(&self, term: TermRef) -> f64 {
        match self.cell(self.deref(term)) {
            TermCell::Real(value) => *value,
            _ => 0.0,
        }
    }

    /// The name atom of a functor or predicate indicator.
    pub fn functor_name(&self, term: TermRef) -> Option<TermRef> {
        match self.cell(self.deref(term)) {
            TermCell::Functor { name, .. } | TermCell::Predicate { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Argument count of a functor or predicate, 0 otherwise.
    pub fn arg_count(&self, term: TermRef) -> usize {
        match self.cell(self.deref(term)) {
            TermCell::Functor { args, .. } => args.len(),
            TermCell::Predicate { arity, .. } => *arity,
            _ => 0,
        }
    }

    /// Argument `index` of a functor, if set.
    pub fn arg(&self, term: TermRef, index: usize) -> Option<TermRef> {
        match self.cell(self.deref(term)) {
            TermCell::Functor { args, .. } => args.get(index).copied().flatten(),
            _ => None,
        }
    }

    /// The object a member variable refers to.
    pub fn object_of(&self, term: TermRef) -> Option<TermRef> {
        match self.cell(self.deref(term)) {
            TermCell::MemberVar { object, .. } => Some(*object),
            _ => None,
        }
    }

    /// Builds a list term from a slice, nil-terminated.
    pub fn make_list(&mut self, items: &[TermRef]) -> TermRef {
        let mut list = self.nil;
        for &item in items.iter().rev() {
            list = self.create_list(item, list);
        }
        list
    }

    /// Collects a proper list into a vector. Returns `None` when the
    /// spine does not end in `[]`.
    pub fn list_items(&self, term: TermRef) -> Option<Vec<TermRef>> {
        let mut items = Vec::new();
        let mut current = self.deref(term);
        loop {
            match self.cell(current) {
                TermCell::Atom { .. } if current == self.nil => return Some(items),
                TermCell::List { head, tail } => {
                    items.push(*head);
                    current = self.deref((*tail)?);
                }
                _ => return None,
            }
        }
    }
}
