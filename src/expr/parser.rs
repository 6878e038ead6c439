// src/expr/parser.rs

//! Recursive-descent parser.
//!
//! Precedence, lowest first:
//! `OR` < `AND` < `NOT` < comparison / `IS NULL` / `LIKE` / `IN`
//! < `+ -` < `* / %` < unary `-`.

use crate::errors::{PipelineError, Result};
use crate::expr::lexer::{tokenize, Token};
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::frame::value::{DataType, Value};

/// Deepest nesting of parentheses, `NOT` and unary `-` a parser accepts.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parse a complete expression; trailing tokens are an error.
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(PipelineError::expression(source, "empty expression"));
    }

    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(tok) = parser.peek() {
        return Err(parser.error(format!("unexpected trailing token {tok:?}")));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::expression(self.source, message)
    }

    /// Run `f` one nesting level deeper, failing once the limit is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(format!(
                "expression nested too deeply (limit {MAX_NESTING_DEPTH})"
            )));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn at_keyword(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected {kw}, found {:?}", self.peek())))
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            other => Err(self.error(format!("expected {expected:?}, found {other:?}"))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.nested(|p| {
            let mut left = p.parse_and()?;
            while p.eat_keyword("OR") {
                let right = p.parse_and()?;
                left = binary(BinaryOp::Or, left, right);
            }
            Ok(left)
        })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_keyword("NOT") {
            let expr = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        let op = match self.peek() {
            Some(Token::Eq) => Some(BinaryOp::Eq),
            Some(Token::NotEq) => Some(BinaryOp::NotEq),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::LtEq) => Some(BinaryOp::LtEq),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::GtEq) => Some(BinaryOp::GtEq),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let right = self.parse_additive()?;
            return Ok(binary(op, left, right));
        }

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        // `NOT` here only introduces NOT LIKE / NOT RLIKE / NOT IN.
        let negated = if self.at_keyword("NOT")
            && self
                .peek_at(1)
                .is_some_and(|t| t.is_keyword("LIKE") || t.is_keyword("RLIKE") || t.is_keyword("IN"))
        {
            self.pos += 1;
            true
        } else {
            false
        };

        if self.at_keyword("LIKE") || self.at_keyword("RLIKE") {
            let regex = self.at_keyword("RLIKE");
            self.pos += 1;
            let pattern = self.parse_additive()?;
            return Ok(Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(pattern),
                negated,
                regex,
            });
        }

        if self.eat_keyword("IN") {
            self.expect(Token::LParen)?;
            let mut list = vec![self.parse_or()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                list.push(self.parse_or()?);
            }
            self.expect(Token::RParen)?;
            return Ok(Expr::InList {
                expr: Box::new(left),
                list,
                negated,
            });
        }

        if negated {
            return Err(self.error("expected LIKE, RLIKE or IN after NOT"));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Plus,
                Some(Token::Minus) => BinaryOp::Minus,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            let expr = self.nested(Self::parse_unary)?;
            // Fold negative numeric literals so `-1` stays a literal.
            return Ok(match expr {
                Expr::Literal(Value::Int(i)) => Expr::Literal(Value::Int(-i)),
                Expr::Literal(Value::Double(d)) => Expr::Literal(Value::Double(-d)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(other),
                },
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let tok = match self.advance() {
            Some(tok) => tok,
            None => return Err(self.error("unexpected end of expression")),
        };

        match tok {
            Token::Integer(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Decimal(d) => Ok(Expr::Literal(Value::Double(d))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::QuotedIdent(name) => Ok(Expr::Column(name)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(word) => self.parse_word(word),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_word(&mut self, word: String) -> Result<Expr> {
        match word.to_ascii_uppercase().as_str() {
            "NULL" => Ok(Expr::Literal(Value::Null)),
            "TRUE" => Ok(Expr::Literal(Value::Boolean(true))),
            "FALSE" => Ok(Expr::Literal(Value::Boolean(false))),
            "CAST" if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                self.expect_keyword("AS")?;
                let to = match self.advance() {
                    Some(Token::Ident(name)) => DataType::from_sql_name(&name)
                        .ok_or_else(|| self.error(format!("unsupported CAST target type '{name}'")))?,
                    other => {
                        return Err(self.error(format!("expected type name, found {other:?}")));
                    }
                };
                self.expect(Token::RParen)?;
                Ok(Expr::Cast {
                    expr: Box::new(expr),
                    to,
                })
            }
            "AND" | "OR" | "NOT" | "IS" | "IN" | "LIKE" | "RLIKE" | "AS" => {
                Err(self.error(format!("unexpected keyword {word}")))
            }
            _ => Ok(Expr::Column(word)),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
