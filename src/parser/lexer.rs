// src/parser/lexer.rs
//! Tokenizer for the source language.
//!
//! Produces a flat token list; the reader decides contextually whether a
//! name is an atom, an operator, or a statement keyword. A `.` becomes a
//! member-access dot when an identifier follows it immediately, and a
//! clause terminator otherwise.

use crate::engine::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// Identifier, quoted atom, or symbolic operator cluster.
    Name(String),
    /// Variable (leading uppercase or underscore).
    Var(String),
    Int(i64),
    Real(f64),
    Str(Vec<u8>),
    /// Structural punctuation: `( ) [ ] { } , ; |`
    Punct(char),
    /// Tightly-bound `.` for member access.
    MemberDot,
    /// Clause-terminating `.`.
    End,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

/// Symbolic operator clusters, longest first so that maximal munch wins.
const SYMBOL_OPS: &[&str] = &[
    "??--", "<=>", "=..", "=:=", "=\\=", "=!=", "\\==", "!==", "@=<", "@<=", "@>=", "::=", ">>>",
    "-->", "\\=", "!=", "==", "=<", "=>", "@<", "@>", ":-", "?-", "->", "&&", "\\+", "//", "/\\",
    "\\/", "<<", ">>", "<=", ">=", ":=", "**", "||", "=", "<", ">", "+", "-", "*", "/", "\\", "^",
    "~", ":", "!",
];

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, EngineError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    while pos < chars.len() {
        let c = chars[pos];
        if c == '\n' {
            line += 1;
            pos += 1;
            continue;
        }
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        if c == '%' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }
        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            pos += 2;
            while pos < chars.len() && !(chars[pos] == '*' && chars.get(pos + 1) == Some(&'/')) {
                if chars[pos] == '\n' {
                    line += 1;
                }
                pos += 1;
            }
            pos = (pos + 2).min(chars.len());
            continue;
        }
        if c.is_ascii_lowercase() {
            let start = pos;
            while pos < chars.len() && is_ident_char(chars[pos]) {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            tokens.push(Token { tok: Tok::Name(name), line });
            continue;
        }
        if c.is_ascii_uppercase() || c == '_' {
            let start = pos;
            while pos < chars.len() && is_ident_char(chars[pos]) {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            tokens.push(Token { tok: Tok::Var(name), line });
            continue;
        }
        if c.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let mut is_real = false;
            if chars.get(pos) == Some(&'.')
                && chars.get(pos + 1).map(|c| c.is_ascii_digit()).unwrap_or(false)
            {
                is_real = true;
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            if matches!(chars.get(pos), Some('e') | Some('E')) {
                let mut look = pos + 1;
                if matches!(chars.get(look), Some('+') | Some('-')) {
                    look += 1;
                }
                if chars.get(look).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    is_real = true;
                    pos = look;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            let text: String = chars[start..pos].iter().collect();
            let tok = if is_real {
                Tok::Real(text.parse().map_err(|_| EngineError::Parse {
                    line,
                    message: format!("bad number: {}", text),
                })?)
            } else {
                Tok::Int(text.parse().map_err(|_| EngineError::Parse {
                    line,
                    message: format!("bad number: {}", text),
                })?)
            };
            tokens.push(Token { tok, line });
            continue;
        }
        if c == '"' {
            pos += 1;
            let mut bytes = Vec::new();
            loop {
                match chars.get(pos) {
                    None => {
                        return Err(EngineError::Parse { line, message: "unterminated string".into() })
                    }
                    Some('"') => {
                        pos += 1;
                        break;
                    }
                    Some('\\') => {
                        pos += 1;
                        let escaped = match chars.get(pos) {
                            Some('n') => b'\n',
                            Some('t') => b'\t',
                            Some('r') => b'\r',
                            Some('0') => 0,
                            Some('\\') => b'\\',
                            Some('"') => b'"',
                            other => {
                                return Err(EngineError::Parse {
                                    line,
                                    message: format!("bad string escape: {:?}", other),
                                })
                            }
                        };
                        bytes.push(escaped);
                        pos += 1;
                    }
                    Some(&ch) => {
                        let mut buffer = [0; 4];
                        bytes.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
                        pos += 1;
                    }
                }
            }
            tokens.push(Token { tok: Tok::Str(bytes), line });
            continue;
        }
        if c == '\'' {
            pos += 1;
            let mut name = String::new();
            loop {
                match chars.get(pos) {
                    None => {
                        return Err(EngineError::Parse { line, message: "unterminated atom".into() })
                    }
                    Some('\'') => {
                        pos += 1;
                        break;
                    }
                    Some('\\') => {
                        pos += 1;
                        let escaped = match chars.get(pos) {
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some('\\') => '\\',
                            Some('\'') => '\'',
                            other => {
                                return Err(EngineError::Parse {
                                    line,
                                    message: format!("bad atom escape: {:?}", other),
                                })
                            }
                        };
                        name.push(escaped);
                        pos += 1;
                    }
                    Some(&ch) => {
                        name.push(ch);
                        pos += 1;
                    }
                }
            }
            tokens.push(Token { tok: Tok::Name(name), line });
            continue;
        }
        if matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';') {
            tokens.push(Token { tok: Tok::Punct(c), line });
            pos += 1;
            continue;
        }
        if c == '|' {
            if chars.get(pos + 1) == Some(&'|') {
                tokens.push(Token { tok: Tok::Name("||".into()), line });
                pos += 2;
            } else {
                tokens.push(Token { tok: Tok::Punct('|'), line });
                pos += 1;
            }
            continue;
        }
        if c == '.' {
            if chars
                .get(pos + 1)
                .map(|c| c.is_ascii_lowercase() || *c == '_')
                .unwrap_or(false)
            {
                tokens.push(Token { tok: Tok::MemberDot, line });
            } else {
                tokens.push(Token { tok: Tok::End, line });
            }
            pos += 1;
            continue;
        }
        let mut matched = None;
        for op in SYMBOL_OPS {
            if chars[pos..].starts_with(&op.chars().collect::<Vec<_>>()[..]) {
                matched = Some(*op);
                break;
            }
        }
        match matched {
            Some(op) => {
                tokens.push(Token { tok: Tok::Name(op.to_string()), line });
                pos += op.chars().count();
            }
            None => {
                return Err(EngineError::Parse {
                    line,
                    message: format!("unexpected character: {:?}", c),
                })
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_munch_longest() {
        let toks = tokenize("X !== Y.").unwrap();
        assert_eq!(toks[1].tok, Tok::Name("!==".into()));
        assert_eq!(toks[3].tok, Tok::End);
    }

    #[test]
    fn member_dot_binds_tight() {
        let toks = tokenize("Y.foo = a.").unwrap();
        assert_eq!(toks[0].tok, Tok::Var("Y".into()));
        assert_eq!(toks[1].tok, Tok::MemberDot);
        assert_eq!(toks[2].tok, Tok::Name("foo".into()));
        assert_eq!(toks.last().unwrap().tok, Tok::End);
    }

    #[test]
    fn numbers_and_reals() {
        let toks = tokenize("42 4.5 1e12 3.").unwrap();
        assert_eq!(toks[0].tok, Tok::Int(42));
        assert_eq!(toks[1].tok, Tok::Real(4.5));
        assert_eq!(toks[2].tok, Tok::Real(1e12));
        assert_eq!(toks[3].tok, Tok::Int(3));
        assert_eq!(toks[4].tok, Tok::End);
    }
}
