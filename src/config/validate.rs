// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, StepConfig, TableConfig};
use crate::errors::{PipelineError, Result};
use crate::expr::Expression;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.pipeline, raw.table))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tables(cfg)?;
    validate_pipeline_section(cfg)?;
    for (name, table) in cfg.table.iter() {
        validate_table_name(name)?;
        validate_input(name, table)?;
        validate_expressions(name, table)?;
        validate_expectation_names(name, table)?;
    }
    validate_table_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tables(cfg: &RawConfigFile) -> Result<()> {
    if cfg.table.is_empty() {
        return Err(PipelineError::ConfigError(
            "pipeline must contain at least one [table.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_pipeline_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.name.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[pipeline].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_table_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PipelineError::ConfigError(format!(
            "invalid table name '{name}' (use letters, digits and '_')"
        )));
    }
    Ok(())
}

fn validate_input(name: &str, table: &TableConfig) -> Result<()> {
    match (&table.read, &table.from) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        (Some(_), Some(_)) => Err(PipelineError::ConfigError(format!(
            "table '{name}' sets both `read` and `from`"
        ))),
        (None, None) => Err(PipelineError::ConfigError(format!(
            "table '{name}' needs either `read` or `from`"
        ))),
    }
}

fn validate_expressions(name: &str, table: &TableConfig) -> Result<()> {
    for step in table.steps.iter() {
        match step {
            StepConfig::WithColumn { expr, .. } => {
                Expression::parse(expr).map_err(|e| in_table(name, e))?;
            }
            StepConfig::Filter { condition } => {
                Expression::parse(condition).map_err(|e| in_table(name, e))?;
            }
            StepConfig::Rename { from, to } if from.is_empty() || to.is_empty() => {
                return Err(PipelineError::ConfigError(format!(
                    "table '{name}' has a rename step with an empty column name"
                )));
            }
            _ => {}
        }
    }
    for expectation in table.expect.iter() {
        Expression::parse(&expectation.condition).map_err(|e| in_table(name, e))?;
    }
    Ok(())
}

fn in_table(table: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::Expression { expr, message } => PipelineError::Expression {
            expr,
            message: format!("{message} (in table '{table}')"),
        },
        other => other,
    }
}

fn validate_expectation_names(name: &str, table: &TableConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for expectation in table.expect.iter() {
        if expectation.name.trim().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "table '{name}' has an expectation without a name"
            )));
        }
        if !seen.insert(expectation.name.as_str()) {
            return Err(PipelineError::ConfigError(format!(
                "table '{}' declares expectation '{}' more than once",
                name, expectation.name
            )));
        }
    }
    Ok(())
}

fn validate_table_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, table) in cfg.table.iter() {
        for dep in table.dependencies() {
            if dep == name {
                return Err(PipelineError::ConfigError(format!(
                    "table '{}' cannot read from itself",
                    name
                )));
            }
            if !cfg.table.contains_key(dep) {
                return Err(PipelineError::ConfigError(format!(
                    "table '{}' reads from unknown table '{}'",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: upstream -> table.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.table.keys() {
        graph.add_node(name.as_str());
    }

    for (name, table) in cfg.table.iter() {
        for dep in table.dependencies() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(PipelineError::DagCycle(format!(
                "cycle detected in table DAG involving table '{}'",
                node
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::TableConfig;

    fn base() -> RawConfigFile {
        RawConfigFile::new("test").with_table("raw", TableConfig::read_json("in.json"))
    }

    #[test]
    fn accepts_a_linear_pipeline() {
        let raw = base().with_table(
            "clean",
            TableConfig::from_table("raw").expect_or_fail("positive", "n > 0"),
        );
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.table.len(), 2);
    }

    #[test]
    fn rejects_empty_pipeline() {
        let err = ConfigFile::try_from(RawConfigFile::new("empty")).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }

    #[test]
    fn rejects_both_read_and_from() {
        let mut table = TableConfig::read_json("a.json");
        table.from = Some("raw".into());
        let err = ConfigFile::try_from(base().with_table("both", table)).unwrap_err();
        assert!(err.to_string().contains("both `read` and `from`"));
    }

    #[test]
    fn rejects_unknown_and_self_references() {
        let err = ConfigFile::try_from(base().with_table("x", TableConfig::from_table("nope")))
            .unwrap_err();
        assert!(err.to_string().contains("unknown table 'nope'"));

        let err = ConfigFile::try_from(base().with_table("x", TableConfig::from_table("x")))
            .unwrap_err();
        assert!(err.to_string().contains("cannot read from itself"));
    }

    #[test]
    fn rejects_cycles() {
        let raw = base()
            .with_table("a", TableConfig::from_table("b"))
            .with_table("b", TableConfig::from_table("a"));
        match ConfigFile::try_from(raw) {
            Err(PipelineError::DagCycle(msg)) => assert!(msg.contains("cycle detected")),
            Err(e) => panic!("expected DagCycle, got {e:?}"),
            Ok(_) => panic!("expected cycle to be rejected"),
        }
    }

    #[test]
    fn rejects_bad_expressions_and_duplicate_expectations() {
        let raw = base().with_table("c", TableConfig::from_table("raw").filter("n >"));
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(PipelineError::Expression { .. })
        ));

        let raw = base().with_table(
            "c",
            TableConfig::from_table("raw")
                .expect("dup", "n > 0")
                .expect_or_drop("dup", "n < 10"),
        );
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_invalid_table_names() {
        let raw = base().with_table("bad-name", TableConfig::from_table("raw"));
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(PipelineError::ConfigError(_))
        ));
    }
}
