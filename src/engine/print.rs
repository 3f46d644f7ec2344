// src/engine/print.rs
//! Canonical term printing through a caller-supplied emitter.
//!
//! The engine never chooses an output destination; callers hand in a
//! closure that receives text fragments.

use crate::engine::context::Context;
use crate::engine::term::{TermCell, TermRef};

impl Context {
    /// Writes the canonical text of `term` through `emit`.
    pub fn print<F: FnMut(&str)>(&self, term: TermRef, emit: &mut F) {
        let d = self.deref(term);
        match self.cell(d) {
            TermCell::Atom { name } => emit(name),
            TermCell::Str { bytes } => {
                emit("\"");
                emit(&String::from_utf8_lossy(bytes));
                emit("\"");
            }
            TermCell::Integer(value) => emit(&value.to_string()),
            TermCell::Real(value) => emit(&format!("{:?}", value)),
            TermCell::Var { name, .. } => match name {
                Some(name) => emit(name),
                None => emit(&format!("_{}", d.0)),
            },
            TermCell::MemberVar { object, name, .. } => {
                self.print(*object, emit);
                emit(".");
                self.print(*name, emit);
            }
            TermCell::List { .. } => self.print_list(d, emit),
            TermCell::Functor { name, args } => {
                self.print(*name, emit);
                emit("(");
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        emit(", ");
                    }
                    match arg {
                        Some(arg) => self.print(*arg, emit),
                        None => emit("_"),
                    }
                }
                emit(")");
            }
            TermCell::Predicate { name, arity } => {
                self.print(*name, emit);
                emit(&format!("/{}", arity));
            }
            TermCell::Object { .. } => {
                let class_name = self.property(d, self.class_name_atom());
                match class_name {
                    Some(name) => {
                        self.print(name, emit);
                        if self.is_instance_object(d) {
                            emit("#");
                        }
                    }
                    None => emit("object"),
                }
            }
        }
    }

    fn print_list<F: FnMut(&str)>(&self, list: TermRef, emit: &mut F) {
        emit("[");
        let mut current = list;
        let mut first = true;
        loop {
            let d = self.deref(current);
            match self.cell(d) {
                TermCell::List { head, tail } => {
                    if !first {
                        emit(", ");
                    }
                    first = false;
                    self.print(*head, emit);
                    match tail {
                        Some(tail) => current = *tail,
                        None => break,
                    }
                }
                TermCell::Atom { .. } if d == self.nil_atom() => break,
                _ => {
                    emit("|");
                    self.print(d, emit);
                    break;
                }
            }
        }
        emit("]");
    }

    /// Convenience wrapper that collects the canonical text into a string.
    pub fn print_string(&self, term: TermRef) -> String {
        let mut out = String::new();
        self.print(term, &mut |s| out.push_str(s));
        out
    }
}
