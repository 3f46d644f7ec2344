// src/parser/mod.rs
//! Reader for the source language: clauses, directives, `??--` test
//! goals, and the C-style statement forms.
//!
//! Expressions are read by precedence climbing driven by the operator
//! table, so the reader and `operator_info` can never disagree. Statement
//! sequences fold into conjunctions; the statement keywords desugar into
//! the internal control functors the interpreter evaluates.

mod lexer;

use std::collections::HashMap;

use crate::engine::context::Context;
use crate::engine::database::{operator_info, OpSpecifier};
use crate::engine::error::EngineError;
use crate::engine::term::TermRef;

use lexer::{tokenize, Tok, Token};

/// One parsed program item.
#[derive(Debug, Clone)]
pub enum Item {
    Clause { head: TermRef, body: TermRef },
    Directive(TermRef),
    TestGoal(TermRef),
}

/// Parses a whole source text into items, creating terms in `ctx`.
pub fn parse_program(ctx: &mut Context, source: &str) -> Result<Vec<Item>, EngineError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { ctx, tokens, pos: 0, vars: HashMap::new() };
    parser.program()
}

struct Parser<'a> {
    ctx: &'a mut Context,
    tokens: Vec<Token>,
    pos: usize,
    /// Named variables of the item being read; each item gets fresh ones.
    vars: HashMap<String, TermRef>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|t| t.line)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn fail<T>(&self, message: impl Into<String>) -> Result<T, EngineError> {
        Err(EngineError::Parse { line: self.line(), message: message.into() })
    }

    fn expect_punct(&mut self, c: char) -> Result<(), EngineError> {
        match self.advance() {
            Some(Tok::Punct(p)) if p == c => Ok(()),
            other => self.fail(format!("expected {:?}, found {:?}", c, other)),
        }
    }

    fn expect_name(&mut self, name: &str) -> Result<(), EngineError> {
        match self.advance() {
            Some(Tok::Name(n)) if n == name => Ok(()),
            other => self.fail(format!("expected {:?}, found {:?}", name, other)),
        }
    }

    fn expect_end(&mut self) -> Result<(), EngineError> {
        match self.advance() {
            Some(Tok::End) => Ok(()),
            other => self.fail(format!("expected '.', found {:?}", other)),
        }
    }

    fn at_name(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Tok::Name(n)) if n == name)
    }

    fn funct(&mut self, name: &str, args: &[TermRef]) -> Result<TermRef, EngineError> {
        let atom = self.ctx.create_atom(name);
        match self.ctx.create_functor_with_args(atom, args) {
            Some(term) => Ok(term),
            None => self.fail("internal functor construction failed"),
        }
    }

    fn program(&mut self) -> Result<Vec<Item>, EngineError> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            self.vars.clear();
            if self.at_name("??--") {
                self.advance();
                let goal = if matches!(self.peek(), Some(Tok::Punct('{'))) {
                    self.advance();
                    let goal = self.stmts_until('}')?;
                    self.expect_punct('}')?;
                    goal
                } else {
                    let goal = self.expr(1200, true)?.0;
                    self.expect_end()?;
                    goal
                };
                items.push(Item::TestGoal(goal));
            } else if self.at_name(":-") {
                self.advance();
                let goal = self.expr(1200, true)?.0;
                self.expect_end()?;
                items.push(Item::Directive(goal));
            } else {
                let head = self.expr(999, false)?.0;
                match self.peek() {
                    Some(Tok::End) => {
                        self.advance();
                        let body = self.ctx.create_atom("true");
                        items.push(Item::Clause { head, body });
                    }
                    Some(Tok::Name(n)) if n == ":-" => {
                        self.advance();
                        let body = self.expr(1200, true)?.0;
                        self.expect_end()?;
                        items.push(Item::Clause { head, body });
                    }
                    Some(Tok::Punct('{')) => {
                        self.advance();
                        let body = self.stmts_until('}')?;
                        self.expect_punct('}')?;
                        items.push(Item::Clause { head, body });
                    }
                    other => return self.fail(format!("expected clause body, found {:?}", other)),
                }
            }
        }
        Ok(items)
    }

    /// Precedence-climbing expression reader. `semi` allows `;` as the
    /// disjunction operator (goal contexts); statement contexts keep it
    /// as the terminator.
    fn expr(&mut self, max: u32, semi: bool) -> Result<(TermRef, u32), EngineError> {
        let (mut left, mut left_prec) = self.primary(max, semi)?;
        loop {
            let op = match self.peek() {
                Some(Tok::Name(n)) => n.clone(),
                Some(Tok::Punct(',')) => ",".to_string(),
                Some(Tok::Punct(';')) if semi => ";".to_string(),
                _ => break,
            };
            let Some((prec, spec)) = operator_info(&op, 2) else { break };
            if prec > max {
                break;
            }
            let left_max = match spec {
                OpSpecifier::Yfx => prec,
                OpSpecifier::Xfx | OpSpecifier::Xfy => prec - 1,
                _ => break,
            };
            if left_prec > left_max {
                break;
            }
            self.advance();
            let right_max = match spec {
                OpSpecifier::Xfy => prec,
                _ => prec - 1,
            };
            let right = self.expr(right_max, semi)?.0;
            left = self.funct(&op, &[left, right])?;
            left_prec = prec;
        }
        Ok((left, left_prec))
    }

    fn primary(&mut self, max: u32, semi: bool) -> Result<(TermRef, u32), EngineError> {
        match self.peek().cloned() {
            Some(Tok::Int(v)) => {
                self.advance();
                Ok((self.ctx.create_integer(v), 0))
            }
            Some(Tok::Real(v)) => {
                self.advance();
                Ok((self.ctx.create_real(v), 0))
            }
            Some(Tok::Str(bytes)) => {
                self.advance();
                Ok((self.ctx.create_string_n(&bytes), 0))
            }
            Some(Tok::Var(name)) => {
                self.advance();
                let mut term = self.var_term(&name);
                while matches!(self.peek(), Some(Tok::MemberDot)) {
                    self.advance();
                    let member = match self.advance() {
                        Some(Tok::Name(n)) => n,
                        other => return self.fail(format!("expected member name, found {:?}", other)),
                    };
                    let name_atom = self.ctx.create_atom(&member);
                    term = match self.ctx.create_member_variable(term, name_atom) {
                        Some(term) => term,
                        None => return self.fail("bad member variable"),
                    };
                }
                Ok((term, 0))
            }
            Some(Tok::Punct('(')) => {
                self.advance();
                let inner = self.expr(1200, true)?.0;
                self.expect_punct(')')?;
                Ok((inner, 0))
            }
            Some(Tok::Punct('[')) => {
                self.advance();
                self.list_term()
            }
            Some(Tok::Name(name)) => {
                self.advance();
                // Functor application binds tighter than any operator.
                if matches!(self.peek(), Some(Tok::Punct('('))) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Tok::Punct(')'))) {
                        loop {
                            args.push(self.expr(999, true)?.0);
                            match self.peek() {
                                Some(Tok::Punct(',')) => {
                                    self.advance();
                                }
                                _ => break,
                            }
                        }
                    }
                    self.expect_punct(')')?;
                    let atom = self.ctx.create_atom(&name);
                    return match self.ctx.create_functor_with_args(atom, &args) {
                        Some(term) => Ok((term, 0)),
                        None => self.fail("bad functor"),
                    };
                }
                // A minus sign glued to a number literal is the literal.
                if name == "-" {
                    match self.peek().cloned() {
                        Some(Tok::Int(v)) => {
                            self.advance();
                            return Ok((self.ctx.create_integer(-v), 0));
                        }
                        Some(Tok::Real(v)) => {
                            self.advance();
                            return Ok((self.ctx.create_real(-v), 0));
                        }
                        _ => {}
                    }
                }
                if let Some((prec, spec)) = operator_info(&name, 1) {
                    let prefix = matches!(spec, OpSpecifier::Fx | OpSpecifier::Fy);
                    if prefix && prec <= max && self.next_starts_term_here() {
                        let sub_max = match spec {
                            OpSpecifier::Fy => prec,
                            _ => prec - 1,
                        };
                        let arg = self.expr(sub_max, semi)?.0;
                        let term = self.funct(&name, &[arg])?;
                        return Ok((term, prec));
                    }
                }
                Ok((self.ctx.create_atom(&name), 0))
            }
            other => self.fail(format!("expected a term, found {:?}", other)),
        }
    }

    /// True when the token at the cursor can open an operand, which is
    /// what distinguishes a prefix operator from a bare atom.
    fn next_starts_term_here(&self) -> bool {
        matches!(
            self.peek(),
            Some(Tok::Int(_))
                | Some(Tok::Real(_))
                | Some(Tok::Str(_))
                | Some(Tok::Var(_))
                | Some(Tok::Name(_))
                | Some(Tok::Punct('('))
                | Some(Tok::Punct('['))
        )
    }

    fn list_term(&mut self) -> Result<(TermRef, u32), EngineError> {
        if matches!(self.peek(), Some(Tok::Punct(']'))) {
            self.advance();
            return Ok((self.ctx.nil_atom(), 0));
        }
        let mut items = vec![self.expr(999, true)?.0];
        while matches!(self.peek(), Some(Tok::Punct(','))) {
            self.advance();
            items.push(self.expr(999, true)?.0);
        }
        let tail = if matches!(self.peek(), Some(Tok::Punct('|'))) {
            self.advance();
            self.expr(999, true)?.0
        } else {
            self.ctx.nil_atom()
        };
        self.expect_punct(']')?;
        let mut list = tail;
        for &item in items.iter().rev() {
            list = self.ctx.create_list(item, list);
        }
        Ok((list, 0))
    }

    fn var_term(&mut self, name: &str) -> TermRef {
        if name == "_" {
            return self.ctx.create_variable();
        }
        if let Some(&term) = self.vars.get(name) {
            return term;
        }
        let term = self.ctx.create_named_variable(name);
        self.vars.insert(name.to_string(), term);
        term
    }

    fn stmts_until(&mut self, close: char) -> Result<TermRef, EngineError> {
        let mut goals = Vec::new();
        while !matches!(self.peek(), Some(Tok::Punct(c)) if *c == close) {
            if self.peek().is_none() {
                return self.fail(format!("expected {:?}", close));
            }
            goals.push(self.stmt()?);
        }
        self.conj(goals)
    }

    fn conj(&mut self, goals: Vec<TermRef>) -> Result<TermRef, EngineError> {
        let mut iter = goals.into_iter().rev();
        let mut acc = match iter.next() {
            None => return Ok(self.ctx.create_atom("true")),
            Some(last) => last,
        };
        for goal in iter {
            acc = self.funct(",", &[goal, acc])?;
        }
        Ok(acc)
    }

    fn stmt(&mut self) -> Result<TermRef, EngineError> {
        match self.peek() {
            Some(Tok::Name(n)) if n == "if" && matches!(self.peek_at(1), Some(Tok::Punct('('))) => {
                self.if_stmt()
            }
            Some(Tok::Name(n))
                if n == "while"
                    && matches!(self.peek_at(1), Some(Tok::Punct('(')) | Some(Tok::Punct('['))) =>
            {
                self.while_stmt()
            }
            Some(Tok::Name(n))
                if n == "do"
                    && matches!(self.peek_at(1), Some(Tok::Punct('{')) | Some(Tok::Punct('['))) =>
            {
                self.do_stmt()
            }
            Some(Tok::Name(n))
                if n == "for"
                    && matches!(self.peek_at(1), Some(Tok::Punct('(')) | Some(Tok::Punct('['))) =>
            {
                self.for_stmt()
            }
            Some(Tok::Name(n)) if n == "switch" && matches!(self.peek_at(1), Some(Tok::Punct('('))) => {
                self.switch_stmt()
            }
            Some(Tok::Name(n)) if n == "try" && matches!(self.peek_at(1), Some(Tok::Punct('{'))) => {
                self.try_stmt()
            }
            Some(Tok::Punct('{')) => {
                self.advance();
                let body = self.stmts_until('}')?;
                self.expect_punct('}')?;
                Ok(body)
            }
            _ => {
                let goal = self.expr(1200, false)?.0;
                self.expect_punct(';')?;
                Ok(goal)
            }
        }
    }

    fn if_stmt(&mut self) -> Result<TermRef, EngineError> {
        self.advance();
        self.expect_punct('(')?;
        let cond = self.expr(1200, true)?.0;
        self.expect_punct(')')?;
        let then = self.stmt()?;
        let else_goal = if self.at_name("else") {
            self.advance();
            self.stmt()?
        } else {
            self.ctx.create_atom("true")
        };
        let arrow = self.funct("->", &[cond, then])?;
        self.funct("||", &[arrow, else_goal])
    }

    fn while_stmt(&mut self) -> Result<TermRef, EngineError> {
        self.advance();
        let leaks = self.leak_list()?;
        self.expect_punct('(')?;
        let cond = self.expr(1200, true)?.0;
        self.expect_punct(')')?;
        let body = self.stmt()?;
        self.funct("$while", &[cond, body, leaks])
    }

    fn do_stmt(&mut self) -> Result<TermRef, EngineError> {
        self.advance();
        let leaks = self.leak_list()?;
        self.expect_punct('{')?;
        let body = self.stmts_until('}')?;
        self.expect_punct('}')?;
        self.expect_name("while")?;
        self.expect_punct('(')?;
        let cond = self.expr(1200, true)?.0;
        self.expect_punct(')')?;
        self.expect_punct(';')?;
        self.funct("$do", &[body, cond, leaks])
    }

    fn for_stmt(&mut self) -> Result<TermRef, EngineError> {
        self.advance();
        let leaks = self.leak_list()?;
        self.expect_punct('(')?;
        let var = match self.advance() {
            Some(Tok::Var(name)) => self.var_term(&name),
            other => return self.fail(format!("expected loop variable, found {:?}", other)),
        };
        self.expect_name("in")?;
        let list = self.expr(999, true)?.0;
        self.expect_punct(')')?;
        let body = self.stmt()?;
        self.funct("$for", &[var, list, body, leaks])
    }

    fn switch_stmt(&mut self) -> Result<TermRef, EngineError> {
        self.advance();
        self.expect_punct('(')?;
        let scrutinee = self.expr(1200, true)?.0;
        self.expect_punct(')')?;
        self.expect_punct('{')?;
        let mut cases = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Punct('}')) => {
                    self.advance();
                    break;
                }
                Some(Tok::Name(n)) if n == "case" => {
                    let mut labels = Vec::new();
                    while self.at_name("case") {
                        self.advance();
                        labels.push(self.expr(99, false)?.0);
                        self.expect_name(":")?;
                    }
                    let body = self.case_body()?;
                    let labels = self.ctx.make_list(&labels);
                    cases.push(self.funct("$case", &[labels, body])?);
                }
                Some(Tok::Name(n)) if n == "default" => {
                    self.advance();
                    self.expect_name(":")?;
                    let body = self.case_body()?;
                    cases.push(self.funct("$default", &[body])?);
                }
                other => return self.fail(format!("expected case or default, found {:?}", other)),
            }
        }
        let cases = self.ctx.make_list(&cases);
        self.funct("$switch", &[scrutinee, cases])
    }

    fn case_body(&mut self) -> Result<TermRef, EngineError> {
        let mut goals = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Punct('}')) => break,
                Some(Tok::Name(n)) if n == "case" || n == "default" => break,
                None => return self.fail("unterminated switch"),
                _ => goals.push(self.stmt()?),
            }
        }
        self.conj(goals)
    }

    fn try_stmt(&mut self) -> Result<TermRef, EngineError> {
        self.advance();
        self.expect_punct('{')?;
        let body = self.stmts_until('}')?;
        self.expect_punct('}')?;
        let mut cases = Vec::new();
        while self.at_name("catch") {
            self.advance();
            self.expect_punct('(')?;
            let pattern = self.expr(999, true)?.0;
            self.expect_punct(')')?;
            self.expect_punct('{')?;
            let recovery = self.stmts_until('}')?;
            self.expect_punct('}')?;
            cases.push(self.funct("$catch", &[pattern, recovery])?);
        }
        let cases = self.ctx.make_list(&cases);
        self.funct("$try", &[body, cases])
    }

    fn leak_list(&mut self) -> Result<TermRef, EngineError> {
        if !matches!(self.peek(), Some(Tok::Punct('['))) {
            return Ok(self.ctx.nil_atom());
        }
        self.advance();
        let mut vars = Vec::new();
        loop {
            match self.advance() {
                Some(Tok::Var(name)) => vars.push(self.var_term(&name)),
                other => return self.fail(format!("expected variable, found {:?}", other)),
            }
            match self.advance() {
                Some(Tok::Punct(',')) => continue,
                Some(Tok::Punct(']')) => break,
                other => return self.fail(format!("expected ',' or ']', found {:?}", other)),
            }
        }
        Ok(self.ctx.make_list(&vars))
    }
}
