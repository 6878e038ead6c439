// tests/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;

use medallion::config::load_and_validate;
use medallion::errors::PipelineError;

fn definition(toml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{toml}").unwrap();
    file
}

#[test]
fn test_dag_cycle_returns_structured_error() {
    let file = definition(
        r#"
[table.seed]
read = { path = "seed.json" }

[table.a]
from = "b"

[table.b]
from = "a"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("'a'") || msg.contains("'b'"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_upstream_returns_config_error() {
    let file = definition(
        r#"
[table.silver]
from = "bronze"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::ConfigError(msg)) => {
            assert!(msg.contains("unknown table"));
            assert!(msg.contains("bronze"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_table_with_read_and_from_is_rejected() {
    let file = definition(
        r#"
[table.raw]
read = { path = "raw.json" }

[table.both]
read = { path = "other.json" }
from = "raw"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::ConfigError(msg)) => assert!(msg.contains("both")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_bad_expectation_names_table_and_expression() {
    let file = definition(
        r#"
[table.raw]
read = { path = "raw.json" }

[[table.raw.expect]]
name = "broken"
condition = "n >"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::Expression { expr, message }) => {
            assert_eq!(expr, "n >");
            assert!(message.contains("(in table 'raw')"), "message: {message}");
        }
        Err(e) => panic!("Expected Expression error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_policy_is_a_toml_error() {
    let file = definition(
        r#"
[table.raw]
read = { path = "raw.json" }

[[table.raw.expect]]
name = "positive"
condition = "n > 0"
on_violation = "explode"
"#,
    );

    match load_and_validate(file.path()) {
        Err(PipelineError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_missing_definition_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Pipeline.toml"));
    assert!(matches!(result, Err(PipelineError::IoError(_))));
}
