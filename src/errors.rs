// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("Expression error in `{expr}`: {message}")]
    Expression { expr: String, message: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error(
        "Expectation '{expectation}' on table '{table}' failed for {failed_records} record(s); first violation: {sample}"
    )]
    ExpectationFailed {
        table: String,
        expectation: String,
        failed_records: u64,
        sample: String,
    },

    #[error("Pipeline update failed: {0}")]
    UpdateFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub(crate) fn expression(expr: &str, message: impl Into<String>) -> Self {
        PipelineError::Expression {
            expr: expr.to_string(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
