//! Recursive-descent parser for CNF clause bodies.
//!
//! Covers the fragment Vampire prints: disjunctions of literals over
//! first-order terms, with `~` negation, infix `=` and `!=`, quoted
//! symbols, `$`-words and numeric constants. Bodies come from the
//! prover, so anything outside that fragment is a hard error rather
//! than something to recover from.

use std::fmt;

/// A first-order term. Constants are functions with no arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Variable(String),
    Function(String, Vec<Term>),
}

impl Term {
    /// Constant shorthand used by tests.
    pub fn constant(name: &str) -> Term {
        Term::Function(name.to_string(), Vec::new())
    }
}

/// One literal of a clause body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Predicate application, possibly negated. Propositional atoms
    /// have an empty argument list.
    Atom {
        negated: bool,
        predicate: String,
        args: Vec<Term>,
    },
    /// `left = right` when `negated` is false, `left != right` otherwise.
    Equation {
        negated: bool,
        left: Term,
        right: Term,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad clause body at byte {at}: {what}")]
pub struct ParseError {
    at: usize,
    what: String,
}

/// Parses a clause body (the third field of a `cnf(...)` statement)
/// into its literals.
pub fn parse_clause_body(body: &str) -> Result<Vec<Literal>, ParseError> {
    let mut cursor = Cursor { src: body, pos: 0 };
    let mut literals = Vec::new();
    cursor.disjunction(&mut literals)?;
    cursor.skip_ws();
    if cursor.pos != cursor.src.len() {
        return Err(cursor.error("trailing input after clause"));
    }
    Ok(literals)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn error(&self, what: impl fmt::Display) -> ParseError {
        ParseError {
            at: self.pos,
            what: what.to_string(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn eat(&mut self, token: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: char) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format_args!("expected `{token}`")))
        }
    }

    fn disjunction(&mut self, out: &mut Vec<Literal>) -> Result<(), ParseError> {
        loop {
            self.literal(out)?;
            if !self.eat('|') {
                return Ok(());
            }
        }
    }

    fn literal(&mut self, out: &mut Vec<Literal>) -> Result<(), ParseError> {
        self.skip_ws();
        if self.peek() == Some('(') {
            // Parenthesized group of literals; flattens into the clause.
            self.bump();
            self.disjunction(out)?;
            self.expect(')')?;
            return Ok(());
        }
        let negated = self.eat('~');
        let left = self.term()?;
        self.skip_ws();
        let unequal = if self.rest().starts_with("!=") {
            self.pos += 2;
            true
        } else if self.peek() == Some('=') {
            self.bump();
            false
        } else {
            return match left {
                Term::Function(predicate, args) => {
                    out.push(Literal::Atom {
                        negated,
                        predicate,
                        args,
                    });
                    Ok(())
                }
                Term::Variable(name) => {
                    Err(self.error(format_args!("variable `{name}` cannot stand as a literal")))
                }
            };
        };
        let right = self.term()?;
        out.push(Literal::Equation {
            negated: negated ^ unequal,
            left,
            right,
        });
        Ok(())
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c.is_ascii_uppercase() || c == '_' => {
                let name = self.word();
                Ok(Term::Variable(name))
            }
            Some(c) if c.is_ascii_lowercase() => {
                let name = self.word();
                self.maybe_args(name)
            }
            Some('$') => {
                self.bump();
                let name = format!("${}", self.word());
                self.maybe_args(name)
            }
            Some('\'') => {
                let name = self.quoted()?;
                self.maybe_args(name)
            }
            Some(c) if c.is_ascii_digit() || c == '-' => Ok(Term::Function(self.number(), Vec::new())),
            _ => Err(self.error("expected a term")),
        }
    }

    /// Parses an optional argument list after a functor name.
    fn maybe_args(&mut self, name: String) -> Result<Term, ParseError> {
        if !self.eat('(') {
            return Ok(Term::Function(name, Vec::new()));
        }
        let mut args = vec![self.term()?];
        while self.eat(',') {
            args.push(self.term()?);
        }
        self.expect(')')?;
        Ok(Term::Function(name, args))
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    /// Single-quoted symbol; the quotes stay part of the name so that
    /// `'f'` and `f` remain distinct functors.
    fn quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('\'') => return Ok(self.src[start..self.pos].to_string()),
                Some(_) => {}
                None => return Err(self.error("unterminated quoted symbol")),
            }
        }
    }

    /// Integer, rational (`1/2`) or real (`1.5`) literal, kept verbatim.
    fn number(&mut self) -> String {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if matches!(self.peek(), Some('/' | '.')) {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        self.src[start..self.pos].to_string()
    }
}
