// src/engine/code.rs
//! Compiled matcher/builder programs.
//!
//! A clause compiles to a linear instruction stream over x-registers.
//! "Put" instructions construct a term, "get" instructions match an
//! incoming register value against a template. Functor and list argument
//! registers are carried in blocks: an instruction holds a bounded number
//! inline and spills the rest into `Args` overflow blocks that extend the
//! put/get they follow.

use crate::engine::context::Context;
use crate::engine::term::{TermKind, TermRef};

/// Register index threshold for the compact encoding.
pub const COMPACT_REG_LIMIT: usize = 256;
/// Argument registers carried per block in compact mode.
pub const COMPACT_BLOCK_ARGS: usize = 8;
/// Argument registers carried per block in large mode.
pub const LARGE_BLOCK_ARGS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Materialize a constant (atom, number, string) into a register.
    PutConst { reg: usize, value: TermRef },
    /// Materialize a fresh variable, named after the template variable.
    PutVar { reg: usize, template: TermRef },
    /// Materialize a member variable over the object in `object`.
    PutMemberVar { reg: usize, object: usize, name: TermRef },
    /// Materialize a list pair from two registers.
    PutList { reg: usize, head: usize, tail: usize },
    /// Materialize a functor; `args` is the first block of argument
    /// registers, the rest follow in `Args` blocks.
    PutFunctor { reg: usize, name: TermRef, arity: usize, args: Vec<usize> },
    /// Overflow block extending the preceding put/get functor.
    Args { regs: Vec<usize> },
    /// Match the incoming value in `arg` against a constant.
    GetConst { arg: usize, value: TermRef },
    /// Unify the incoming value in `arg` with the template value in `var`.
    GetValue { arg: usize, var: usize },
    /// Descend into a functor, loading its arguments into registers.
    GetFunctor { arg: usize, name: TermRef, arity: usize, args: Vec<usize> },
    /// Descend into a list pair.
    GetList { arg: usize, head: usize, tail: usize },
    /// Terminal: yield the register's term (builder) or plain success.
    Return { reg: Option<usize> },
}

/// A code buffer being filled by the compiler.
#[derive(Debug, Default)]
pub struct Code {
    pub instrs: Vec<Instr>,
    pub num_regs: usize,
    /// Test knob: use the large encoding regardless of register count.
    pub force_large_regs: bool,
    pub(crate) input_only: bool,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the first `n` registers for caller arguments.
    pub fn allocate_args(&mut self, n: usize) {
        self.num_regs = self.num_regs.max(n);
    }

    /// Allocates a fresh intermediate register.
    pub fn alloc_reg(&mut self) -> usize {
        let reg = self.num_regs;
        self.num_regs += 1;
        reg
    }

    /// True once the register file has outgrown the compact encoding,
    /// or when the test knob forces it. Sampled at emission time.
    pub fn large(&self) -> bool {
        self.force_large_regs || self.num_regs > COMPACT_REG_LIMIT
    }

    fn block_args(&self) -> usize {
        if self.large() {
            LARGE_BLOCK_ARGS
        } else {
            COMPACT_BLOCK_ARGS
        }
    }

    pub(crate) fn push(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    /// Emits a functor put/get followed by as many overflow blocks as
    /// the argument list needs.
    pub(crate) fn push_with_blocks(
        &mut self,
        regs: Vec<usize>,
        first: impl FnOnce(Vec<usize>) -> Instr,
    ) {
        let cap = self.block_args();
        let mut chunks = regs.chunks(cap);
        let head: Vec<usize> = chunks.next().unwrap_or(&[]).to_vec();
        self.push(first(head));
        for chunk in chunks {
            self.push(Instr::Args { regs: chunk.to_vec() });
        }
    }

    /// Seals the buffer into an executable clause.
    pub fn finish(self) -> CodeClause {
        CodeClause {
            instrs: self.instrs,
            num_regs: self.num_regs,
            input_only: self.input_only,
        }
    }
}

/// A finished, executable program.
#[derive(Debug, Clone)]
pub struct CodeClause {
    pub instrs: Vec<Instr>,
    pub num_regs: usize,
    pub input_only: bool,
}

/// The dispatch key of one argument position: the kind of the template's
/// top, its arity (or value bits for numbers), and the atom identity for
/// atom-keyed kinds. Strings, variables and member variables carry no key
/// and are treated as the variable sentinel by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgKey {
    pub kind: TermKind,
    pub size: u64,
    pub name: Option<TermRef>,
}

/// Computes the dispatch key of a term's top level.
pub fn term_arg_key(ctx: &Context, term: TermRef) -> Option<ArgKey> {
    let d = ctx.deref(term);
    match ctx.kind(d) {
        TermKind::Atom => Some(ArgKey { kind: TermKind::Atom, size: 0, name: Some(d) }),
        TermKind::Integer => Some(ArgKey {
            kind: TermKind::Integer,
            size: ctx.integer_value(d) as u64,
            name: None,
        }),
        TermKind::Real => Some(ArgKey {
            kind: TermKind::Real,
            size: ctx.real_value(d).to_bits(),
            name: None,
        }),
        TermKind::Functor => Some(ArgKey {
            kind: TermKind::Functor,
            size: ctx.arg_count(d) as u64,
            name: ctx.functor_name(d),
        }),
        TermKind::List => Some(ArgKey { kind: TermKind::List, size: 2, name: Some(ctx.dot_atom()) }),
        TermKind::Predicate => Some(ArgKey {
            kind: TermKind::Predicate,
            size: ctx.arg_count(d) as u64,
            name: ctx.functor_name(d),
        }),
        _ => None,
    }
}

/// True when a clause whose argument key is `clause` can possibly match a
/// caller argument whose key is `caller`. A missing key on either side
/// means "anything".
pub fn keys_compatible(caller: Option<ArgKey>, clause: Option<ArgKey>) -> bool {
    match (caller, clause) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

impl CodeClause {
    /// Recovers the dispatch key of argument `index` from the compiled
    /// code: the first instruction matching on that register decides.
    pub fn argument_key(&self, ctx: &Context, index: usize) -> Option<ArgKey> {
        for instr in &self.instrs {
            match instr {
                Instr::GetConst { arg, value } if *arg == index => {
                    return term_arg_key(ctx, *value);
                }
                Instr::GetFunctor { arg, name, arity, .. } if *arg == index => {
                    return Some(ArgKey {
                        kind: TermKind::Functor,
                        size: *arity as u64,
                        name: Some(*name),
                    });
                }
                Instr::GetList { arg, .. } if *arg == index => {
                    return Some(ArgKey { kind: TermKind::List, size: 2, name: Some(ctx.dot_atom()) });
                }
                Instr::GetValue { arg, .. } if *arg == index => return None,
                _ => {}
            }
        }
        None
    }
}
