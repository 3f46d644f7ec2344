// src/engine/compile.rs
//! Builder and matcher code generation.
//!
//! The builder path lays out "put" instructions that construct a template
//! term into a register, allocating fresh intermediates for nested
//! structure. The matcher path lays out "get" instructions that verify an
//! incoming register value against the template, binding template
//! variables as it goes. Variables shared between the head and the body of
//! a clause share registers, which is what gives each clause activation
//! fresh variables.

use std::collections::HashMap;

use log::trace;

use crate::engine::code::{Code, CodeClause, Instr};
use crate::engine::context::Context;
use crate::engine::term::{TermCell, TermKind, TermRef};

/// Register map from template variables to the registers holding them.
pub type VarMap = HashMap<TermRef, usize>;

fn target_reg(code: &mut Code, preferred: Option<usize>) -> usize {
    match preferred {
        Some(reg) => reg,
        None => code.alloc_reg(),
    }
}

/// Emits instructions that construct `term` and returns the register the
/// result lands in. `preferred` pins the result register when given.
pub fn generate_builder(
    ctx: &Context,
    term: TermRef,
    code: &mut Code,
    preferred: Option<usize>,
    vars: &mut VarMap,
) -> usize {
    let d = ctx.deref(term);
    match ctx.kind(d) {
        TermKind::Variable => {
            if let Some(&reg) = vars.get(&d) {
                return reg;
            }
            let reg = target_reg(code, preferred);
            code.push(Instr::PutVar { reg, template: d });
            vars.insert(d, reg);
            reg
        }
        TermKind::MemberVariable => {
            if let Some(&reg) = vars.get(&d) {
                return reg;
            }
            let object = ctx.object_of(d).expect("member variable has an object");
            let object_reg = generate_builder(ctx, object, code, None, vars);
            let name = match ctx.cell(d) {
                TermCell::MemberVar { name, .. } => *name,
                _ => unreachable!(),
            };
            let reg = target_reg(code, preferred);
            code.push(Instr::PutMemberVar { reg, object: object_reg, name });
            vars.insert(d, reg);
            reg
        }
        TermKind::List => {
            let head = ctx.head(d).expect("list has a head");
            let tail = ctx.tail(d).unwrap_or_else(|| ctx.nil_atom());
            let head_reg = generate_builder(ctx, head, code, None, vars);
            let tail_reg = generate_builder(ctx, tail, code, None, vars);
            let reg = target_reg(code, preferred);
            code.push(Instr::PutList { reg, head: head_reg, tail: tail_reg });
            reg
        }
        TermKind::Functor => {
            let arity = ctx.arg_count(d);
            let name = ctx.functor_name(d).expect("functor has a name");
            let mut arg_regs = Vec::with_capacity(arity);
            for index in 0..arity {
                let arg = ctx.arg(d, index).expect("functor argument is bound");
                arg_regs.push(generate_builder(ctx, arg, code, None, vars));
            }
            let reg = target_reg(code, preferred);
            code.push_with_blocks(arg_regs, |args| Instr::PutFunctor { reg, name, arity, args });
            reg
        }
        _ => {
            // Atoms, numbers, strings and identity terms are carried as
            // constants; strings compare by value, so sharing is sound.
            let reg = target_reg(code, preferred);
            code.push(Instr::PutConst { reg, value: d });
            reg
        }
    }
}

/// Emits instructions that match the incoming value in `arg_reg` against
/// the template `term`. With `input_only` set, the template is a pure
/// input pattern: any binding that would flow a value out into the
/// caller's term fails the match instead.
pub fn generate_matcher(
    ctx: &Context,
    term: TermRef,
    code: &mut Code,
    arg_reg: usize,
    input_only: bool,
    vars: &mut VarMap,
) {
    code.input_only = input_only;
    let d = ctx.deref(term);
    trace!("matcher for {:?} at x{}", d, arg_reg);
    match ctx.kind(d) {
        TermKind::Variable => match vars.get(&d) {
            Some(&reg) => code.push(Instr::GetValue { arg: arg_reg, var: reg }),
            None => {
                // First occurrence: the incoming value becomes the
                // variable's value, no instruction needed.
                vars.insert(d, arg_reg);
            }
        },
        TermKind::MemberVariable => {
            let reg = build_member_var(ctx, d, code, vars);
            code.push(Instr::GetValue { arg: arg_reg, var: reg });
        }
        TermKind::List => {
            let head_tpl = ctx.head(d).expect("list has a head");
            let tail_tpl = ctx.tail(d).unwrap_or_else(|| ctx.nil_atom());
            let head = code.alloc_reg();
            let tail = code.alloc_reg();
            code.push(Instr::GetList { arg: arg_reg, head, tail });
            generate_matcher(ctx, head_tpl, code, head, input_only, vars);
            generate_matcher(ctx, tail_tpl, code, tail, input_only, vars);
        }
        TermKind::Functor => {
            let arity = ctx.arg_count(d);
            let name = ctx.functor_name(d).expect("functor has a name");
            let child_regs: Vec<usize> = (0..arity).map(|_| code.alloc_reg()).collect();
            code.push_with_blocks(child_regs.clone(), |args| Instr::GetFunctor {
                arg: arg_reg,
                name,
                arity,
                args,
            });
            for (index, &child) in child_regs.iter().enumerate() {
                if let Some(arg) = ctx.arg(d, index) {
                    generate_matcher(ctx, arg, code, child, input_only, vars);
                }
            }
        }
        _ => code.push(Instr::GetConst { arg: arg_reg, value: d }),
    }
}

fn build_member_var(ctx: &Context, d: TermRef, code: &mut Code, vars: &mut VarMap) -> usize {
    if let Some(&reg) = vars.get(&d) {
        return reg;
    }
    let object = ctx.object_of(d).expect("member variable has an object");
    let object_reg = generate_builder(ctx, object, code, None, vars);
    let name = match ctx.cell(d) {
        crate::engine::term::TermCell::MemberVar { name, .. } => *name,
        _ => unreachable!(),
    };
    let reg = code.alloc_reg();
    code.push(Instr::PutMemberVar { reg, object: object_reg, name });
    vars.insert(d, reg);
    reg
}

/// Emits the terminal return. `None` ends a pure matcher; `Some` carries
/// the register holding the built term.
pub fn generate_return(code: &mut Code, reg: Option<usize>) {
    code.push(Instr::Return { reg });
}

/// Compiles one clause: matchers over the head arguments, a builder for
/// the body, and a return carrying the body register. Head and body share
/// the register map, so head bindings flow into the freshly built body.
pub fn compile_clause(ctx: &Context, head: TermRef, body: TermRef) -> CodeClause {
    let mut code = Code::new();
    let mut vars = VarMap::new();
    let head = ctx.deref(head);
    let arity = ctx.arg_count(head);
    code.allocate_args(arity);
    for index in 0..arity {
        if let Some(arg) = ctx.arg(head, index) {
            generate_matcher(ctx, arg, &mut code, index, false, &mut vars);
        }
    }
    let body_reg = generate_builder(ctx, body, &mut code, None, &mut vars);
    generate_return(&mut code, Some(body_reg));
    code.finish()
}
