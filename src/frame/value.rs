// src/frame/value.rs

//! Scalar values and their logical types.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical column type.
///
/// `Int` and `Long` share the `Value::Int` representation; `Int` values are
/// guaranteed to fit in 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Int,
    #[serde(rename = "bigint")]
    Long,
    Double,
    String,
    /// Type of the `NULL` literal and of columns that only ever held nulls.
    #[serde(rename = "void")]
    Null,
}

impl DataType {
    pub fn is_integral(self) -> bool {
        matches!(self, DataType::Int | DataType::Long)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Long | DataType::Double)
    }

    /// Smallest type both `self` and `other` can be represented as.
    ///
    /// Used by JSON schema inference and by arithmetic result typing.
    pub fn widen(self, other: DataType) -> DataType {
        use DataType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Null, t) | (t, Null) => t,
            (Int, Long) | (Long, Int) => Long,
            (a, b) if a.is_numeric() && b.is_numeric() => Double,
            _ => String,
        }
    }

    /// Parse a SQL type name as accepted by `CAST(... AS <type>)`.
    pub fn from_sql_name(name: &str) -> Option<DataType> {
        match name.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" => Some(DataType::Int),
            "BIGINT" | "LONG" => Some(DataType::Long),
            "DOUBLE" | "FLOAT" | "REAL" => Some(DataType::Double),
            "STRING" | "VARCHAR" | "TEXT" => Some(DataType::String),
            "BOOLEAN" | "BOOL" => Some(DataType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Boolean => "boolean",
            DataType::Int => "int",
            DataType::Long => "bigint",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Null => "void",
        };
        f.write_str(s)
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` only for `Boolean(true)`; NULL and FALSE are both "not true".
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// SQL comparison. `None` when either side is NULL or the types are not
    /// comparable.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Total order over non-null values of the same column, used by sorting.
    pub(crate) fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (a, b) => a
                .sql_cmp(b)
                .unwrap_or_else(|| a.to_string().cmp(&b.to_string())),
        }
    }

    /// Non-ANSI cast: values that cannot be represented become NULL.
    pub fn cast(&self, to: DataType) -> Value {
        match to {
            DataType::Null => Value::Null,
            DataType::Int => match self.to_i64() {
                Some(i) if i32::try_from(i).is_ok() => Value::Int(i),
                _ => Value::Null,
            },
            DataType::Long => self.to_i64().map(Value::Int).unwrap_or(Value::Null),
            DataType::Double => match self {
                Value::Int(i) => Value::Double(*i as f64),
                Value::Double(d) => Value::Double(*d),
                Value::Boolean(b) => Value::Double(if *b { 1.0 } else { 0.0 }),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .unwrap_or(Value::Null),
                Value::Null => Value::Null,
            },
            DataType::String => match self {
                Value::Null => Value::Null,
                other => Value::String(other.to_string()),
            },
            DataType::Boolean => match self {
                Value::Boolean(b) => Value::Boolean(*b),
                Value::Int(i) => Value::Boolean(*i != 0),
                Value::Double(d) => Value::Boolean(*d != 0.0),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "yes" | "y" | "1" => Value::Boolean(true),
                    "false" | "f" | "no" | "n" | "0" => Value::Boolean(false),
                    _ => Value::Null,
                },
                Value::Null => Value::Null,
            },
        }
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::Double(d) => truncate_f64(*d),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate_f64))
            }
            Value::Null => None,
        }
    }

    /// Convert a JSON value into a column of type `target`.
    ///
    /// Nested arrays and objects become compact JSON text in string columns;
    /// combinations the type cannot hold become NULL.
    pub fn from_json(value: &serde_json::Value, target: DataType) -> Value {
        use serde_json::Value as Json;
        match (value, target) {
            (Json::Null, _) => Value::Null,
            (Json::Bool(b), DataType::Boolean) => Value::Boolean(*b),
            (Json::Number(n), DataType::Int | DataType::Long) => {
                n.as_i64().map(Value::Int).unwrap_or(Value::Null)
            }
            (Json::Number(n), DataType::Double) => {
                n.as_f64().map(Value::Double).unwrap_or(Value::Null)
            }
            (Json::String(s), DataType::String) => Value::String(s.clone()),
            (other, DataType::String) => Value::String(other.to_string()),
            _ => Value::Null,
        }
    }

    /// JSON representation used by persisted tables and violation samples.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

fn truncate_f64(d: f64) -> Option<i64> {
    if !d.is_finite() {
        return None;
    }
    let t = d.trunc();
    if t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return None;
    }
    Some(t as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e16 => {
                write!(f, "{d:.1}")
            }
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
