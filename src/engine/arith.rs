// src/engine/arith.rs
//! Arithmetic evaluation for `is/2` and the numeric comparisons.
//!
//! The numeric tower is machine integers and doubles; integer operations
//! wrap on overflow. Mixed operands promote to doubles.

use std::cmp::Ordering;

use crate::engine::context::Context;
use crate::engine::term::{TermKind, TermRef};

/// An evaluated number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Real(f64),
}

impl Num {
    fn as_real(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Real(v) => v,
        }
    }
}

/// Evaluates an arithmetic expression term. Errors are returned as
/// language-level error terms.
pub fn eval(ctx: &mut Context, term: TermRef) -> Result<Num, TermRef> {
    let d = ctx.deref(term);
    match ctx.kind(d) {
        TermKind::Integer => Ok(Num::Int(ctx.integer_value(d))),
        TermKind::Real => Ok(Num::Real(ctx.real_value(d))),
        TermKind::Variable | TermKind::MemberVariable => Err(ctx.instantiation_error()),
        TermKind::Atom => match ctx.name(d) {
            Some("pi") => Ok(Num::Real(std::f64::consts::PI)),
            Some("e") => Ok(Num::Real(std::f64::consts::E)),
            _ => Err(ctx.type_error("evaluable", d)),
        },
        TermKind::Functor => {
            let name = ctx
                .functor_name(d)
                .and_then(|n| ctx.name(n))
                .unwrap_or("")
                .to_string();
            let arity = ctx.arg_count(d);
            match (name.as_str(), arity) {
                ("-", 1) => {
                    let a = eval_arg(ctx, d, 0)?;
                    Ok(match a {
                        Num::Int(v) => Num::Int(v.wrapping_neg()),
                        Num::Real(v) => Num::Real(-v),
                    })
                }
                ("\\", 1) | ("~", 1) => match eval_arg(ctx, d, 0)? {
                    Num::Int(v) => Ok(Num::Int(!v)),
                    Num::Real(_) => Err(int_culprit(ctx, d, 0)),
                },
                ("+", 2) => binary(ctx, d, i64::wrapping_add, |a, b| a + b),
                ("-", 2) => binary(ctx, d, i64::wrapping_sub, |a, b| a - b),
                ("*", 2) => binary(ctx, d, i64::wrapping_mul, |a, b| a * b),
                ("/", 2) => {
                    let a = eval_arg(ctx, d, 0)?;
                    let b = eval_arg(ctx, d, 1)?;
                    match (a, b) {
                        (Num::Int(x), Num::Int(y)) => {
                            if y == 0 {
                                Err(ctx.evaluation_error("zero_divisor"))
                            } else {
                                Ok(Num::Int(x.wrapping_div(y)))
                            }
                        }
                        _ => Ok(Num::Real(a.as_real() / b.as_real())),
                    }
                }
                ("//", 2) => int_binary(ctx, d, |ctx, x, y| {
                    if y == 0 {
                        Err(ctx.evaluation_error("zero_divisor"))
                    } else {
                        Ok(x.wrapping_div(y))
                    }
                }),
                ("rem", 2) => int_binary(ctx, d, |ctx, x, y| {
                    if y == 0 {
                        Err(ctx.evaluation_error("zero_divisor"))
                    } else {
                        Ok(x.wrapping_rem(y))
                    }
                }),
                ("mod", 2) => int_binary(ctx, d, |ctx, x, y| {
                    if y == 0 {
                        Err(ctx.evaluation_error("zero_divisor"))
                    } else {
                        Ok(x.rem_euclid(y))
                    }
                }),
                ("<<", 2) => int_binary(ctx, d, |_, x, y| Ok(x.wrapping_shl(y as u32))),
                (">>", 2) => int_binary(ctx, d, |_, x, y| Ok(x.wrapping_shr(y as u32))),
                (">>>", 2) => {
                    int_binary(ctx, d, |_, x, y| Ok(((x as u64).wrapping_shr(y as u32)) as i64))
                }
                ("/\\", 2) => int_binary(ctx, d, |_, x, y| Ok(x & y)),
                ("\\/", 2) => int_binary(ctx, d, |_, x, y| Ok(x | y)),
                ("**", 2) => {
                    let a = eval_arg(ctx, d, 0)?;
                    let b = eval_arg(ctx, d, 1)?;
                    Ok(Num::Real(a.as_real().powf(b.as_real())))
                }
                ("^", 2) => {
                    let a = eval_arg(ctx, d, 0)?;
                    let b = eval_arg(ctx, d, 1)?;
                    match (a, b) {
                        (Num::Int(x), Num::Int(y)) if y >= 0 => {
                            Ok(Num::Int(x.wrapping_pow(y as u32)))
                        }
                        _ => Ok(Num::Real(a.as_real().powf(b.as_real()))),
                    }
                }
                _ => Err(ctx.type_error("evaluable", d)),
            }
        }
        _ => Err(ctx.type_error("evaluable", d)),
    }
}

fn eval_arg(ctx: &mut Context, functor: TermRef, index: usize) -> Result<Num, TermRef> {
    match ctx.arg(functor, index) {
        Some(arg) => eval(ctx, arg),
        None => Err(ctx.instantiation_error()),
    }
}

fn int_culprit(ctx: &mut Context, functor: TermRef, index: usize) -> TermRef {
    let culprit = ctx
        .arg(functor, index)
        .unwrap_or_else(|| ctx.create_variable());
    ctx.type_error("integer", culprit)
}

fn binary(
    ctx: &mut Context,
    functor: TermRef,
    int_op: fn(i64, i64) -> i64,
    real_op: fn(f64, f64) -> f64,
) -> Result<Num, TermRef> {
    let a = eval_arg(ctx, functor, 0)?;
    let b = eval_arg(ctx, functor, 1)?;
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Ok(Num::Int(int_op(x, y))),
        _ => Ok(Num::Real(real_op(a.as_real(), b.as_real()))),
    }
}

fn int_binary(
    ctx: &mut Context,
    functor: TermRef,
    op: impl Fn(&mut Context, i64, i64) -> Result<i64, TermRef>,
) -> Result<Num, TermRef> {
    let a = eval_arg(ctx, functor, 0)?;
    let b = eval_arg(ctx, functor, 1)?;
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Ok(Num::Int(op(ctx, x, y)?)),
        (Num::Real(_), _) => Err(int_culprit(ctx, functor, 0)),
        _ => Err(int_culprit(ctx, functor, 1)),
    }
}

/// Numeric comparison, promoting mixed operands.
pub fn compare(a: Num, b: Num) -> Ordering {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => x.cmp(&y),
        _ => a
            .as_real()
            .partial_cmp(&b.as_real())
            .unwrap_or(Ordering::Equal),
    }
}

/// Materializes an evaluated number as a term.
pub fn num_term(ctx: &mut Context, num: Num) -> TermRef {
    match num {
        Num::Int(v) => ctx.create_integer(v),
        Num::Real(v) => ctx.create_real(v),
    }
}
