// src/expr/lexer.rs

//! Tokenizer for the expression language.

use crate::errors::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier or keyword; keywords are matched case-insensitively by
    /// the parser.
    Ident(String),
    /// `` `back quoted` `` identifier; never treated as a keyword.
    QuotedIdent(String),
    Integer(i64),
    Decimal(f64),
    Str(String),
    LParen,
    RParen,
    Comma,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

impl Token {
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(kw))
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '=' => {
                // `=` and `==` are the same operator.
                i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
                tokens.push(Token::Eq);
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(PipelineError::expression(
                        source,
                        format!("unexpected '!' at position {i} (did you mean '!=' or NOT?)"),
                    ));
                }
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::LtEq);
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::NotEq);
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::GtEq);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '\'' => {
                let (s, next) = read_quoted(source, &chars, i, '\'')?;
                tokens.push(Token::Str(s));
                i = next;
            }
            '`' => {
                let (s, next) = read_quoted(source, &chars, i, '`')?;
                tokens.push(Token::QuotedIdent(s));
                i = next;
            }
            c if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i)) => {
                let (tok, next) = read_number(source, &chars, i)?;
                tokens.push(tok);
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(PipelineError::expression(
                    source,
                    format!("unexpected character '{other}' at position {i}"),
                ));
            }
        }
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

/// Read a quoted run starting at `start` (which holds the quote). A doubled
/// quote inside the run is an escaped quote.
fn read_quoted(source: &str, chars: &[char], start: usize, quote: char) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => {
                return Err(PipelineError::expression(
                    source,
                    format!("unterminated {quote} quote starting at position {start}"),
                ));
            }
            Some(&c) if c == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    out.push(quote);
                    i += 2;
                } else {
                    return Ok((out, i + 1));
                }
            }
            Some(&c) => {
                out.push(c);
                i += 1;
            }
        }
    }
}

fn read_number(source: &str, chars: &[char], start: usize) -> Result<(Token, usize)> {
    let mut i = start;
    let mut is_decimal = false;

    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        is_decimal = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            is_decimal = true;
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text: String = chars[start..i].iter().collect();
    let token = if is_decimal {
        text.parse::<f64>().map(Token::Decimal).map_err(|e| {
            PipelineError::expression(source, format!("invalid number '{text}': {e}"))
        })?
    } else {
        text.parse::<i64>().map(Token::Integer).map_err(|e| {
            PipelineError::expression(source, format!("invalid integer '{text}': {e}"))
        })?
    };
    Ok((token, i))
}
