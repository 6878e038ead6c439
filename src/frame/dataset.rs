// src/frame/dataset.rs

//! Immutable in-memory tables.
//!
//! Every operation returns a new [`Dataset`]; inputs are never mutated, so
//! upstream tables can be shared between downstream consumers behind an
//! `Arc`.

use std::cmp::Ordering;

use crate::errors::{PipelineError, Result};
use crate::expr::Expression;
use crate::frame::schema::{Field, Schema};
use crate::frame::value::Value;

pub type Row = Vec<Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset, checking that every row matches the schema width.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != schema.len())
        {
            return Err(PipelineError::Source(format!(
                "row {i} has {} values but the schema has {} fields",
                row.len(),
                schema.len()
            )));
        }
        Ok(Self { schema, rows })
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Values of a single column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Add (or replace) a column computed from `expr`.
    pub fn with_column(&self, name: &str, expr: &Expression) -> Result<Dataset> {
        let bound = expr.bind(&self.schema)?;
        let field = Field::new(name, bound.data_type());

        let mut schema = self.schema.clone();
        let existing = schema.index_of(name);
        match existing {
            Some(idx) => schema.fields_mut()[idx] = field,
            None => schema.fields_mut().push(field),
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let value = bound.eval(row);
                let mut out = row.clone();
                match existing {
                    Some(idx) => out[idx] = value,
                    None => out.push(value),
                }
                out
            })
            .collect();

        Ok(Dataset { schema, rows })
    }

    /// Rename a column. Renaming an absent column is a no-op.
    pub fn rename(&self, from: &str, to: &str) -> Result<Dataset> {
        let idx = match self.schema.index_of(from) {
            Some(idx) => idx,
            None => return Ok(self.clone()),
        };
        if from != to && self.schema.index_of(to).is_some() {
            return Err(PipelineError::ConfigError(format!(
                "cannot rename '{from}' to '{to}': column '{to}' already exists"
            )));
        }

        let mut schema = self.schema.clone();
        schema.fields_mut()[idx].name = to.to_string();
        Ok(Dataset {
            schema,
            rows: self.rows.clone(),
        })
    }

    /// Project the given columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Dataset> {
        let indices = columns
            .iter()
            .map(|c| self.schema.require(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let fields = indices
            .iter()
            .map(|&i| self.schema.fields()[i].clone())
            .collect();
        let schema = Schema::new(fields)?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Dataset { schema, rows })
    }

    /// Keep rows for which `predicate` is TRUE.
    pub fn filter(&self, predicate: &Expression) -> Result<Dataset> {
        let bound = predicate.bind(&self.schema)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| bound.matches(row))
            .cloned()
            .collect();
        Ok(Dataset {
            schema: self.schema.clone(),
            rows,
        })
    }

    /// Stable sort by one column. Ascending puts NULLs first; descending puts
    /// NULLs last.
    pub fn sort(&self, column: &str, descending: bool) -> Result<Dataset> {
        let idx = self.schema.require(column)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| compare_for_sort(&a[idx], &b[idx], descending));
        Ok(Dataset {
            schema: self.schema.clone(),
            rows,
        })
    }

    pub fn limit(&self, n: usize) -> Dataset {
        Dataset {
            schema: self.schema.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Keep rows whose index is marked `true` in `keep`.
    pub(crate) fn retain_mask(&self, keep: &[bool]) -> Dataset {
        let rows = self
            .rows
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(row, _)| row.clone())
            .collect();
        Dataset {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Render one row as a JSON object in schema order.
    pub fn row_to_json(&self, row: &[Value]) -> serde_json::Value {
        let map = self
            .schema
            .names()
            .zip(row)
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Fixed-width text rendering of the first `max_rows` rows.
    pub fn preview(&self, max_rows: usize) -> String {
        let headers: Vec<String> = self.schema.names().map(str::to_string).collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(max_rows)
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &body {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let render = |cells: &[String]| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect();
            format!("| {} |", padded.join(" | "))
        };
        let separator = format!(
            "+{}+",
            widths
                .iter()
                .map(|w| "-".repeat(w + 2))
                .collect::<Vec<_>>()
                .join("+")
        );

        let mut out = vec![separator.clone(), render(&headers), separator.clone()];
        out.extend(body.iter().map(|r| render(r)));
        out.push(separator);
        if self.rows.len() > max_rows {
            out.push(format!("only showing top {max_rows} row(s)"));
        }
        out.join("\n")
    }
}

fn compare_for_sort(a: &Value, b: &Value, descending: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if descending {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, true) => {
            if descending {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, false) => {
            let ord = a.total_cmp(b);
            if descending { ord.reverse() } else { ord }
        }
    }
}
