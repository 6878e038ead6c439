// src/expr/eval.rs

//! Binding and row evaluation.

use std::cmp::Ordering;

use regex::Regex;

use crate::errors::{PipelineError, Result};
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::frame::value::{DataType, Value};
use crate::frame::Schema;

/// Expression with column references resolved to row positions.
#[derive(Debug, Clone)]
pub enum BoundExpr {
    Literal(Value),
    Column {
        index: usize,
        data_type: DataType,
    },
    Cast {
        expr: Box<BoundExpr>,
        to: DataType,
    },
    Unary {
        op: UnaryOp,
        expr: Box<BoundExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
    IsNull {
        expr: Box<BoundExpr>,
        negated: bool,
    },
    Like {
        expr: Box<BoundExpr>,
        pattern: LikePattern,
        negated: bool,
    },
    InList {
        expr: Box<BoundExpr>,
        list: Vec<BoundExpr>,
        negated: bool,
    },
}

/// Pattern of a `LIKE` / `RLIKE`: compiled once when it is a literal.
#[derive(Debug, Clone)]
pub enum LikePattern {
    Compiled(Regex),
    Dynamic { expr: Box<BoundExpr>, regex: bool },
}

pub(crate) fn bind(source: &str, expr: &Expr, schema: &Schema) -> Result<BoundExpr> {
    Ok(match expr {
        Expr::Literal(v) => BoundExpr::Literal(v.clone()),
        Expr::Column(name) => {
            let index = schema.require(name)?;
            BoundExpr::Column {
                index,
                data_type: schema.fields()[index].data_type,
            }
        }
        Expr::Cast { expr, to } => BoundExpr::Cast {
            expr: Box::new(bind(source, expr, schema)?),
            to: *to,
        },
        Expr::Unary { op, expr } => BoundExpr::Unary {
            op: *op,
            expr: Box::new(bind(source, expr, schema)?),
        },
        Expr::Binary { op, left, right } => BoundExpr::Binary {
            op: *op,
            left: Box::new(bind(source, left, schema)?),
            right: Box::new(bind(source, right, schema)?),
        },
        Expr::IsNull { expr, negated } => BoundExpr::IsNull {
            expr: Box::new(bind(source, expr, schema)?),
            negated: *negated,
        },
        Expr::Like {
            expr,
            pattern,
            negated,
            regex,
        } => {
            let bound_pattern = match pattern.as_ref() {
                Expr::Literal(Value::String(p)) => {
                    LikePattern::Compiled(compile_pattern(p, *regex).map_err(|e| {
                        PipelineError::expression(source, format!("invalid pattern '{p}': {e}"))
                    })?)
                }
                other => LikePattern::Dynamic {
                    expr: Box::new(bind(source, other, schema)?),
                    regex: *regex,
                },
            };
            BoundExpr::Like {
                expr: Box::new(bind(source, expr, schema)?),
                pattern: bound_pattern,
                negated: *negated,
            }
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => BoundExpr::InList {
            expr: Box::new(bind(source, expr, schema)?),
            list: list
                .iter()
                .map(|item| bind(source, item, schema))
                .collect::<Result<Vec<_>>>()?,
            negated: *negated,
        },
    })
}

/// Translate a SQL `LIKE` pattern (`%`, `_`, `\` escape) into an anchored
/// regex; `RLIKE` patterns are used as-is.
fn compile_pattern(pattern: &str, is_regex: bool) -> std::result::Result<Regex, regex::Error> {
    if is_regex {
        return Regex::new(pattern);
    }

    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                None => re.push_str(&regex::escape("\\")),
            },
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
}

impl BoundExpr {
    /// Static result type, used for the schema of computed columns.
    pub fn data_type(&self) -> DataType {
        match self {
            BoundExpr::Literal(v) => literal_type(v),
            BoundExpr::Column { data_type, .. } => *data_type,
            BoundExpr::Cast { to, .. } => *to,
            BoundExpr::Unary {
                op: UnaryOp::Not, ..
            } => DataType::Boolean,
            BoundExpr::Unary {
                op: UnaryOp::Neg,
                expr,
            } => expr.data_type(),
            BoundExpr::Binary { op, left, right } => match op {
                BinaryOp::Divide => DataType::Double,
                BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Modulo => {
                    let t = left.data_type().widen(right.data_type());
                    if t.is_numeric() { t } else { DataType::Double }
                }
                _ => DataType::Boolean,
            },
            BoundExpr::IsNull { .. } | BoundExpr::Like { .. } | BoundExpr::InList { .. } => {
                DataType::Boolean
            }
        }
    }

    pub fn eval(&self, row: &[Value]) -> Value {
        match self {
            BoundExpr::Literal(v) => v.clone(),
            BoundExpr::Column { index, .. } => row.get(*index).cloned().unwrap_or(Value::Null),
            BoundExpr::Cast { expr, to } => expr.eval(row).cast(*to),
            BoundExpr::Unary { op, expr } => {
                let v = expr.eval(row);
                match (op, v) {
                    (UnaryOp::Not, Value::Boolean(b)) => Value::Boolean(!b),
                    (UnaryOp::Neg, Value::Int(i)) => match i.checked_neg() {
                        Some(v) if expr.data_type() == DataType::Int && i32::try_from(v).is_err() => {
                            Value::Null
                        }
                        Some(v) => Value::Int(v),
                        None => Value::Null,
                    },
                    (UnaryOp::Neg, Value::Double(d)) => Value::Double(-d),
                    _ => Value::Null,
                }
            }
            BoundExpr::Binary { op, left, right } => match op {
                BinaryOp::And => eval_and(left.eval(row), || right.eval(row)),
                BinaryOp::Or => eval_or(left.eval(row), || right.eval(row)),
                op if op.is_comparison() => eval_comparison(*op, &left.eval(row), &right.eval(row)),
                op => self.eval_arithmetic(*op, left.eval(row), right.eval(row)),
            },
            BoundExpr::IsNull { expr, negated } => {
                Value::Boolean(expr.eval(row).is_null() != *negated)
            }
            BoundExpr::Like {
                expr,
                pattern,
                negated,
            } => {
                let subject = match like_subject(expr.eval(row)) {
                    Some(s) => s,
                    None => return Value::Null,
                };
                let matched = match pattern {
                    LikePattern::Compiled(re) => re.is_match(&subject),
                    LikePattern::Dynamic { expr, regex } => {
                        let p = match like_subject(expr.eval(row)) {
                            Some(p) => p,
                            None => return Value::Null,
                        };
                        match compile_pattern(&p, *regex) {
                            Ok(re) => re.is_match(&subject),
                            Err(_) => return Value::Null,
                        }
                    }
                };
                Value::Boolean(matched != *negated)
            }
            BoundExpr::InList {
                expr,
                list,
                negated,
            } => {
                let needle = expr.eval(row);
                if needle.is_null() {
                    return Value::Null;
                }
                let mut saw_null = false;
                for item in list {
                    let candidate = item.eval(row);
                    match needle.sql_cmp(&candidate) {
                        Some(Ordering::Equal) => return Value::Boolean(!*negated),
                        Some(_) => {}
                        None => saw_null |= candidate.is_null(),
                    }
                }
                if saw_null {
                    Value::Null
                } else {
                    Value::Boolean(*negated)
                }
            }
        }
    }

    /// `eval` followed by the SQL "is TRUE" test used by filters and
    /// expectations.
    pub fn matches(&self, row: &[Value]) -> bool {
        self.eval(row).is_true()
    }

    fn eval_arithmetic(&self, op: BinaryOp, l: Value, r: Value) -> Value {
        if l.is_null() || r.is_null() {
            return Value::Null;
        }

        let result_type = self.data_type();
        if op == BinaryOp::Divide {
            return match (l.as_f64(), r.as_f64()) {
                (Some(_), Some(y)) if y == 0.0 => Value::Null,
                (Some(x), Some(y)) => Value::Double(x / y),
                _ => Value::Null,
            };
        }

        if let (Value::Int(a), Value::Int(b)) = (&l, &r) {
            let out = match op {
                BinaryOp::Plus => a.checked_add(*b),
                BinaryOp::Minus => a.checked_sub(*b),
                BinaryOp::Multiply => a.checked_mul(*b),
                BinaryOp::Modulo if *b == 0 => None,
                BinaryOp::Modulo => a.checked_rem(*b),
                _ => None,
            };
            return match out {
                Some(v) if result_type == DataType::Int && i32::try_from(v).is_err() => Value::Null,
                Some(v) => Value::Int(v),
                None => Value::Null,
            };
        }

        let (x, y) = match (l.as_f64(), r.as_f64()) {
            (Some(x), Some(y)) => (x, y),
            _ => match (l.cast(DataType::Double).as_f64(), r.cast(DataType::Double).as_f64()) {
                (Some(x), Some(y)) => (x, y),
                _ => return Value::Null,
            },
        };
        match op {
            BinaryOp::Plus => Value::Double(x + y),
            BinaryOp::Minus => Value::Double(x - y),
            BinaryOp::Multiply => Value::Double(x * y),
            BinaryOp::Modulo if y == 0.0 => Value::Null,
            BinaryOp::Modulo => Value::Double(x % y),
            _ => Value::Null,
        }
    }
}

fn literal_type(v: &Value) -> DataType {
    match v {
        Value::Null => DataType::Null,
        Value::Boolean(_) => DataType::Boolean,
        Value::Int(i) if i32::try_from(*i).is_ok() => DataType::Int,
        Value::Int(_) => DataType::Long,
        Value::Double(_) => DataType::Double,
        Value::String(_) => DataType::String,
    }
}

fn like_subject(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn truth(v: &Value) -> Option<bool> {
    match v {
        Value::Boolean(b) => Some(*b),
        _ => None,
    }
}

fn eval_and(left: Value, right: impl FnOnce() -> Value) -> Value {
    match truth(&left) {
        Some(false) => Value::Boolean(false),
        l => match (l, truth(&right())) {
            (_, Some(false)) => Value::Boolean(false),
            (Some(true), Some(true)) => Value::Boolean(true),
            _ => Value::Null,
        },
    }
}

fn eval_or(left: Value, right: impl FnOnce() -> Value) -> Value {
    match truth(&left) {
        Some(true) => Value::Boolean(true),
        l => match (l, truth(&right())) {
            (_, Some(true)) => Value::Boolean(true),
            (Some(false), Some(false)) => Value::Boolean(false),
            _ => Value::Null,
        },
    }
}

fn eval_comparison(op: BinaryOp, l: &Value, r: &Value) -> Value {
    let ord = match l.sql_cmp(r) {
        Some(ord) => ord,
        None => return Value::Null,
    };
    let result = match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::NotEq => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::LtEq => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::GtEq => ord != Ordering::Less,
        _ => return Value::Null,
    };
    Value::Boolean(result)
}
