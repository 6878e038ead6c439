// src/quality/mod.rs

//! Data-quality expectations.
//!
//! An expectation is a named predicate over a row plus a [`ViolationPolicy`].
//! A row violates the expectation when the predicate is not TRUE (FALSE or
//! NULL). All expectations of a table are evaluated against the same
//! transformed dataset, so metrics do not depend on declaration order.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::model::ExpectationConfig;
use crate::errors::{PipelineError, Result};
use crate::expr::Expression;
use crate::frame::Dataset;
use crate::types::ViolationPolicy;

#[derive(Debug, Clone)]
pub struct Expectation {
    pub name: String,
    pub condition: Expression,
    pub policy: ViolationPolicy,
}

impl Expectation {
    pub fn new(name: impl Into<String>, condition: &str, policy: ViolationPolicy) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            condition: Expression::parse(condition)?,
            policy,
        })
    }

    pub fn from_config(cfg: &ExpectationConfig) -> Result<Self> {
        Self::new(cfg.name.clone(), &cfg.condition, cfg.on_violation)
    }
}

/// Per-expectation counters for one materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationMetrics {
    pub name: String,
    pub condition: String,
    pub policy: ViolationPolicy,
    pub passed_records: u64,
    pub failed_records: u64,
}

/// Result of applying a table's expectations.
#[derive(Debug, Clone)]
pub struct QualityOutcome {
    /// Dataset after `drop` expectations removed their violators.
    pub dataset: Dataset,
    pub metrics: Vec<ExpectationMetrics>,
    pub dropped_records: u64,
}

/// Evaluate `expectations` against `dataset`.
///
/// - `warn` violations are counted; rows stay.
/// - `drop` violations are counted; rows are removed.
/// - any `fail` violation returns [`PipelineError::ExpectationFailed`] naming
///   the first failing expectation (in declaration order) and its first
///   violating row.
pub fn apply_expectations(
    table: &str,
    dataset: &Dataset,
    expectations: &[Expectation],
) -> Result<QualityOutcome> {
    let mut keep = vec![true; dataset.num_rows()];
    let mut metrics = Vec::with_capacity(expectations.len());
    let mut first_failure: Option<PipelineError> = None;

    for expectation in expectations {
        let bound = expectation.condition.bind(dataset.schema())?;
        let mut failed = 0u64;
        let mut sample = None;

        for (i, row) in dataset.rows().iter().enumerate() {
            if bound.matches(row) {
                continue;
            }
            failed += 1;
            if sample.is_none() {
                sample = Some(dataset.row_to_json(row).to_string());
            }
            if expectation.policy == ViolationPolicy::Drop {
                keep[i] = false;
            }
        }

        let passed = dataset.num_rows() as u64 - failed;
        debug!(
            table,
            expectation = %expectation.name,
            policy = %expectation.policy,
            passed,
            failed,
            "evaluated expectation"
        );

        if failed > 0 {
            match expectation.policy {
                ViolationPolicy::Warn => warn!(
                    table,
                    expectation = %expectation.name,
                    failed_records = failed,
                    "expectation violated; records kept"
                ),
                ViolationPolicy::Drop => warn!(
                    table,
                    expectation = %expectation.name,
                    failed_records = failed,
                    "expectation violated; records dropped"
                ),
                ViolationPolicy::Fail => {
                    if first_failure.is_none() {
                        first_failure = Some(PipelineError::ExpectationFailed {
                            table: table.to_string(),
                            expectation: expectation.name.clone(),
                            failed_records: failed,
                            sample: sample.clone().unwrap_or_default(),
                        });
                    }
                }
            }
        }

        metrics.push(ExpectationMetrics {
            name: expectation.name.clone(),
            condition: expectation.condition.source().to_string(),
            policy: expectation.policy,
            passed_records: passed,
            failed_records: failed,
        });
    }

    if let Some(err) = first_failure {
        return Err(err);
    }

    let filtered = if keep.iter().all(|k| *k) {
        dataset.clone()
    } else {
        dataset.retain_mask(&keep)
    };
    let dropped_records = (dataset.num_rows() - filtered.num_rows()) as u64;

    Ok(QualityOutcome {
        dataset: filtered,
        metrics,
        dropped_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{DataType, Field, Schema, Value};

    fn dataset() -> Dataset {
        let schema = Schema::new(vec![
            Field::new("title", DataType::String),
            Field::new("count", DataType::Int),
        ])
        .unwrap();
        Dataset::new(
            schema,
            vec![
                vec![Value::from("a"), Value::Int(5)],
                vec![Value::Null, Value::Int(2)],
                vec![Value::from("b"), Value::Null],
                vec![Value::Null, Value::Int(0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn warn_keeps_rows_and_counts_nulls() {
        let exps = vec![Expectation::new("title_present", "title IS NOT NULL", ViolationPolicy::Warn).unwrap()];
        let out = apply_expectations("t", &dataset(), &exps).unwrap();
        assert_eq!(out.dataset.num_rows(), 4);
        assert_eq!(out.metrics[0].failed_records, 2);
        assert_eq!(out.metrics[0].passed_records, 2);
        assert_eq!(out.dropped_records, 0);
    }

    #[test]
    fn drop_removes_false_and_null_results() {
        let exps = vec![Expectation::new("positive", "count > 0", ViolationPolicy::Drop).unwrap()];
        let out = apply_expectations("t", &dataset(), &exps).unwrap();
        assert_eq!(out.dataset.num_rows(), 2);
        assert_eq!(out.metrics[0].failed_records, 2);
        assert_eq!(out.dropped_records, 2);
    }

    #[test]
    fn metrics_are_independent_of_drop_order() {
        let exps = vec![
            Expectation::new("positive", "count > 0", ViolationPolicy::Drop).unwrap(),
            Expectation::new("title_present", "title IS NOT NULL", ViolationPolicy::Warn).unwrap(),
        ];
        let out = apply_expectations("t", &dataset(), &exps).unwrap();
        assert_eq!(out.metrics[1].failed_records, 2);
        assert_eq!(out.dataset.num_rows(), 2);
    }

    #[test]
    fn fail_reports_first_violation() {
        let exps = vec![
            Expectation::new("title_present", "title IS NOT NULL", ViolationPolicy::Warn).unwrap(),
            Expectation::new("valid_count", "count > 0", ViolationPolicy::Fail).unwrap(),
        ];
        let err = apply_expectations("prepared", &dataset(), &exps).unwrap_err();
        match err {
            PipelineError::ExpectationFailed {
                table,
                expectation,
                failed_records,
                sample,
            } => {
                assert_eq!(table, "prepared");
                assert_eq!(expectation, "valid_count");
                assert_eq!(failed_records, 2);
                assert_eq!(sample, r#"{"title":"b","count":null}"#);
            }
            other => panic!("expected ExpectationFailed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_column_is_an_error() {
        let exps = vec![Expectation::new("x", "missing > 0", ViolationPolicy::Warn).unwrap()];
        assert!(matches!(
            apply_expectations("t", &dataset(), &exps),
            Err(PipelineError::ColumnNotFound(_))
        ));
    }
}
