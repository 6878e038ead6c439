// src/plan.rs

//! Compiled table definitions.
//!
//! A [`TablePlan`] is the executable form of a `[table.<name>]` section:
//! paths are resolved, expressions parsed and expectations built. Plans are
//! shared (`Arc`) between the scheduler and the executor.

use std::fmt;
use std::path::PathBuf;

use tracing::trace;

use crate::config::model::{ConfigFile, StepConfig, TableConfig};
use crate::errors::Result;
use crate::expr::Expression;
use crate::frame::{Dataset, JsonReadOptions};
use crate::quality::Expectation;

/// Where a table's input rows come from.
#[derive(Debug, Clone)]
pub enum TableInput {
    /// A JSON file on disk.
    Source {
        path: PathBuf,
        options: JsonReadOptions,
    },
    /// Another table of the same pipeline.
    Upstream(String),
}

impl fmt::Display for TableInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableInput::Source { path, .. } => write!(f, "json {}", path.display()),
            TableInput::Upstream(name) => write!(f, "table {name}"),
        }
    }
}

/// A transformation with its expressions already parsed.
#[derive(Debug, Clone)]
pub enum Step {
    WithColumn { name: String, expr: Expression },
    Rename { from: String, to: String },
    Select { columns: Vec<String> },
    Filter { condition: Expression },
    Sort { column: String, descending: bool },
    Limit { n: usize },
}

impl Step {
    fn compile(cfg: &StepConfig) -> Result<Self> {
        Ok(match cfg {
            StepConfig::WithColumn { name, expr } => Step::WithColumn {
                name: name.clone(),
                expr: Expression::parse(expr)?,
            },
            StepConfig::Rename { from, to } => Step::Rename {
                from: from.clone(),
                to: to.clone(),
            },
            StepConfig::Select { columns } => Step::Select {
                columns: columns.clone(),
            },
            StepConfig::Filter { condition } => Step::Filter {
                condition: Expression::parse(condition)?,
            },
            StepConfig::Sort { column, descending } => Step::Sort {
                column: column.clone(),
                descending: *descending,
            },
            StepConfig::Limit { n } => Step::Limit { n: *n },
        })
    }

    pub fn apply(&self, input: &Dataset) -> Result<Dataset> {
        match self {
            Step::WithColumn { name, expr } => input.with_column(name, expr),
            Step::Rename { from, to } => input.rename(from, to),
            Step::Select { columns } => input.select(columns),
            Step::Filter { condition } => input.filter(condition),
            Step::Sort { column, descending } => input.sort(column, *descending),
            Step::Limit { n } => Ok(input.limit(*n)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::WithColumn { name, expr } => write!(f, "with_column {name} = {}", expr.source()),
            Step::Rename { from, to } => write!(f, "rename {from} -> {to}"),
            Step::Select { columns } => write!(f, "select {}", columns.join(", ")),
            Step::Filter { condition } => write!(f, "filter {}", condition.source()),
            Step::Sort { column, descending } => {
                let dir = if *descending { "desc" } else { "asc" };
                write!(f, "sort {column} {dir}")
            }
            Step::Limit { n } => write!(f, "limit {n}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TablePlan {
    pub name: String,
    pub comment: Option<String>,
    pub input: TableInput,
    pub steps: Vec<Step>,
    pub expectations: Vec<Expectation>,
}

impl TablePlan {
    /// Compile a table section of a validated definition.
    pub fn compile(name: &str, table: &TableConfig, cfg: &ConfigFile) -> Result<Self> {
        let input = match (&table.read, &table.from) {
            (Some(read), _) => TableInput::Source {
                path: cfg.resolve_path(&read.path),
                options: JsonReadOptions {
                    multi_line: read.multi_line,
                    mode: read.mode,
                },
            },
            (None, Some(upstream)) => TableInput::Upstream(upstream.clone()),
            // Ruled out by validation.
            (None, None) => {
                return Err(crate::errors::PipelineError::ConfigError(format!(
                    "table '{name}' has no input"
                )));
            }
        };

        let steps = table
            .steps
            .iter()
            .map(Step::compile)
            .collect::<Result<Vec<_>>>()?;
        let expectations = table
            .expect
            .iter()
            .map(Expectation::from_config)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            comment: table.comment.clone(),
            input,
            steps,
            expectations,
        })
    }

    /// Run every step in order over `input`.
    pub fn transform(&self, input: &Dataset) -> Result<Dataset> {
        let mut current = input.clone();
        for step in &self.steps {
            current = step.apply(&current)?;
            trace!(table = %self.name, %step, rows = current.num_rows(), "applied step");
        }
        Ok(current)
    }
}
