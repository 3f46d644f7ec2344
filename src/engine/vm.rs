// src/engine/vm.rs
//! The register VM that runs compiled matcher/builder programs.
//!
//! One run covers a single clause activation: caller arguments are loaded
//! into the low registers, the fetch/execute loop runs until a terminal,
//! and every speculative binding goes through the trail so the caller can
//! roll a failed match back.

use log::trace;

use crate::engine::code::{CodeClause, Instr};
use crate::engine::context::Context;
use crate::engine::error::EngineError;
use crate::engine::term::{TermCell, TermKind, TermRef};
use crate::engine::unify::BindMode;

/// Terminal outcome of one clause's matcher+builder program.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The match succeeded; the payload is the built body term, if any.
    Body(Option<TermRef>),
    /// The match failed; the caller backtracks the trail and moves on.
    Fail,
    /// A term was raised while running.
    Error(TermRef),
    /// Execution was halted with an exit code.
    Halt(i64),
}

struct Regs {
    slots: Vec<Option<TermRef>>,
}

impl Regs {
    fn get(&self, reg: usize) -> Result<TermRef, EngineError> {
        match self.slots.get(reg) {
            None => Err(EngineError::RegisterOutOfBounds(reg)),
            Some(None) => Err(EngineError::UninitializedRegister(reg)),
            Some(Some(term)) => Ok(*term),
        }
    }

    fn set(&mut self, reg: usize, value: TermRef) -> Result<(), EngineError> {
        match self.slots.get_mut(reg) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(EngineError::RegisterOutOfBounds(reg)),
        }
    }
}

/// Runs `clause` with the given caller arguments.
pub fn run(
    ctx: &mut Context,
    clause: &CodeClause,
    args: &[TermRef],
) -> Result<RunOutcome, EngineError> {
    let mut regs = Regs {
        slots: vec![None; clause.num_regs.max(args.len())],
    };
    for (index, &arg) in args.iter().enumerate() {
        regs.slots[index] = Some(arg);
    }
    let mode = if clause.input_only {
        BindMode::OneWay
    } else {
        BindMode::Default
    };
    let mut pc = 0;
    loop {
        let instr = clause
            .instrs
            .get(pc)
            .ok_or(EngineError::MalformedCode("ran off the end of a clause"))?;
        trace!("vm pc {}: {:?}", pc, instr);
        match instr {
            Instr::PutConst { reg, value } => regs.set(*reg, *value)?,
            Instr::PutVar { reg, template } => {
                let fresh = match ctx.name(*template) {
                    Some(name) => {
                        let name = name.to_string();
                        ctx.create_named_variable(&name)
                    }
                    None => ctx.create_variable(),
                };
                regs.set(*reg, fresh)?;
            }
            Instr::PutMemberVar { reg, object, name } => {
                let object = regs.get(*object)?;
                let member = ctx
                    .create_member_variable(object, *name)
                    .ok_or(EngineError::MalformedCode("member variable name is not an atom"))?;
                regs.set(*reg, member)?;
            }
            Instr::PutList { reg, head, tail } => {
                let head = regs.get(*head)?;
                let tail = regs.get(*tail)?;
                let list = ctx.create_list(head, tail);
                regs.set(*reg, list)?;
            }
            Instr::PutFunctor { reg, name, arity, args } => {
                let arg_regs = collect_blocks(clause, &mut pc, args, *arity)?;
                let mut terms = Vec::with_capacity(*arity);
                for r in arg_regs {
                    terms.push(regs.get(r)?);
                }
                let functor = ctx
                    .create_functor_with_args(*name, &terms)
                    .ok_or(EngineError::MalformedCode("functor name is not an atom"))?;
                regs.set(*reg, functor)?;
            }
            Instr::Args { .. } => {
                return Err(EngineError::MalformedCode("stray argument block"));
            }
            Instr::GetConst { arg, value } => {
                let incoming = regs.get(*arg)?;
                if !ctx.unify(*value, incoming, mode) {
                    return Ok(RunOutcome::Fail);
                }
            }
            Instr::GetValue { arg, var } => {
                let template = regs.get(*var)?;
                let incoming = regs.get(*arg)?;
                if !ctx.unify(template, incoming, mode) {
                    return Ok(RunOutcome::Fail);
                }
            }
            Instr::GetFunctor { arg, name, arity, args } => {
                let child_regs = collect_blocks(clause, &mut pc, args, *arity)?;
                let incoming = regs.get(*arg)?;
                let incoming = ctx.deref_member(incoming);
                match ctx.kind(incoming) {
                    TermKind::Functor
                        if ctx.functor_name(incoming) == Some(*name)
                            && ctx.arg_count(incoming) == *arity =>
                    {
                        for (index, r) in child_regs.into_iter().enumerate() {
                            let value = match ctx.arg(incoming, index) {
                                Some(value) => value,
                                None => ctx.create_variable(),
                            };
                            regs.set(r, value)?;
                        }
                    }
                    TermKind::Variable | TermKind::MemberVariable => {
                        if clause.input_only {
                            return Ok(RunOutcome::Fail);
                        }
                        let mut fresh = Vec::with_capacity(*arity);
                        for &r in &child_regs {
                            let var = ctx.create_variable();
                            fresh.push(var);
                            regs.set(r, var)?;
                        }
                        let built = ctx
                            .create_functor_with_args(*name, &fresh)
                            .ok_or(EngineError::MalformedCode("functor name is not an atom"))?;
                        if !ctx.bind_variable(incoming, built, BindMode::Default) {
                            return Ok(RunOutcome::Fail);
                        }
                    }
                    _ => return Ok(RunOutcome::Fail),
                }
            }
            Instr::GetList { arg, head, tail } => {
                let incoming = regs.get(*arg)?;
                let incoming = ctx.deref_member(incoming);
                match ctx.cell(incoming).clone() {
                    TermCell::List { head: h, tail: Some(t) } => {
                        regs.set(*head, h)?;
                        regs.set(*tail, t)?;
                    }
                    TermCell::Var { value: None, .. } | TermCell::MemberVar { value: None, .. } => {
                        if clause.input_only {
                            return Ok(RunOutcome::Fail);
                        }
                        let h = ctx.create_variable();
                        let t = ctx.create_variable();
                        let pair = ctx.create_list(h, t);
                        regs.set(*head, h)?;
                        regs.set(*tail, t)?;
                        if !ctx.bind_variable(incoming, pair, BindMode::Default) {
                            return Ok(RunOutcome::Fail);
                        }
                    }
                    _ => return Ok(RunOutcome::Fail),
                }
            }
            Instr::Return { reg } => {
                return Ok(RunOutcome::Body(match reg {
                    Some(reg) => Some(regs.get(*reg)?),
                    None => None,
                }));
            }
        }
        pc += 1;
    }
}

/// Gathers the full argument-register list of a functor/list instruction,
/// consuming the overflow blocks that follow it.
fn collect_blocks(
    clause: &CodeClause,
    pc: &mut usize,
    first: &[usize],
    arity: usize,
) -> Result<Vec<usize>, EngineError> {
    let mut regs = first.to_vec();
    while regs.len() < arity {
        *pc += 1;
        match clause.instrs.get(*pc) {
            Some(Instr::Args { regs: more }) => regs.extend_from_slice(more),
            _ => return Err(EngineError::MalformedCode("missing argument block")),
        }
    }
    if regs.len() != arity {
        return Err(EngineError::MalformedCode("argument block overrun"));
    }
    Ok(regs)
}
