// tests/file_pipeline.rs

mod common;
use crate::common::{init_tracing, string};

use std::error::Error;
use std::fs;

use serde_json::json;

use medallion::config::load_and_validate;
use medallion::engine::FlowStatus;
use medallion::errors::PipelineError;
use medallion::frame::{DataType, Value};
use medallion::storage::TableStore;
use medallion::{run_update, UpdateOptions};
use medallion_test_utils::write_json_lines;

type TestResult = Result<(), Box<dyn Error>>;

const DEFINITION: &str = r#"
[pipeline]
name = "orders"
storage = "out"

[table.orders_raw]
comment = "Raw orders."
read = { path = "orders.json", mode = "drop_malformed" }

[table.orders_clean]
from = "orders_raw"
steps = [
  { op = "with_column", name = "amount", expr = "CAST(total AS DOUBLE)" },
  { op = "rename", from = "cust", to = "customer" },
  { op = "select", columns = ["id", "customer", "amount"] },
]

[[table.orders_clean.expect]]
name = "has_customer"
condition = "customer IS NOT NULL"
on_violation = "drop"

[[table.orders_clean.expect]]
name = "positive_amount"
condition = "amount > 0"
on_violation = "warn"

[table.big_orders]
from = "orders_clean"
steps = [
  { op = "filter", condition = "amount >= 100" },
  { op = "sort", column = "amount", descending = true },
]
"#;

fn setup() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("Pipeline.toml"), DEFINITION)?;
    write_json_lines(
        dir.path(),
        "orders.json",
        &[
            json!({"id": 1, "cust": "ada", "total": 250}),
            json!({"id": 2, "cust": null, "total": 300}),
            json!({"id": 3, "cust": "bob", "total": -5}),
            json!({"id": 4, "cust": "cy", "total": 120.5}),
            json!({"id": 5, "total": 90}),
        ],
    );
    // A malformed line that drop_malformed discards.
    let path = dir.path().join("orders.json");
    let mut text = fs::read_to_string(&path)?;
    text.push_str("{not json\n");
    fs::write(&path, text)?;
    Ok(dir)
}

#[tokio::test]
async fn toml_pipeline_drops_warns_and_persists() -> TestResult {
    init_tracing();

    let dir = setup()?;
    let cfg = load_and_validate(dir.path().join("Pipeline.toml"))?;
    let update = run_update(&cfg, UpdateOptions::default()).await?;

    assert!(update.report.succeeded(), "report: {:?}", update.report);

    let clean = update
        .report
        .flow("orders_clean")
        .and_then(|f| f.stats.clone())
        .ok_or("orders_clean has no stats")?;
    assert_eq!(clean.input_records, 5);
    assert_eq!(clean.dropped_records, 2);
    assert_eq!(clean.output_records, 3);

    let by_name = |name: &str| clean.expectations.iter().find(|m| m.name == name).cloned();
    let has_customer = by_name("has_customer").ok_or("missing has_customer")?;
    assert_eq!((has_customer.passed_records, has_customer.failed_records), (3, 2));
    // Warn metrics are computed on the same input as the drop expectation.
    let positive = by_name("positive_amount").ok_or("missing positive_amount")?;
    assert_eq!((positive.passed_records, positive.failed_records), (4, 1));

    let big = update.catalog.dataset("big_orders")?;
    let customers: Vec<Value> = big.column("customer")?.into_iter().cloned().collect();
    assert_eq!(customers, vec![string("ada"), string("cy")]);

    // Persisted tables read back identically.
    let store = TableStore::new(cfg_fs(), dir.path().join("out"));
    let stored = store.read_table("big_orders")?;
    assert_eq!(&stored, &*big);

    let metadata = store.read_metadata("orders_clean")?;
    assert_eq!(metadata.num_rows, 3);
    let amount = metadata
        .fields
        .iter()
        .find(|f| f.name == "amount")
        .ok_or("amount field missing")?;
    assert_eq!(amount.data_type, DataType::Double);

    let raw_meta = store.read_metadata("orders_raw")?;
    assert_eq!(raw_meta.comment.as_deref(), Some("Raw orders."));
    assert_eq!(raw_meta.num_rows, 5);

    let log = fs::read_to_string(store.event_log_path())?;
    let completed = log
        .lines()
        .filter(|l| l.contains("\"event_type\":\"flow_completed\""))
        .count();
    assert_eq!(completed, 3);
    assert!(log.lines().last().unwrap_or_default().contains("update_completed"));

    Ok(())
}

#[tokio::test]
async fn second_update_is_a_full_refresh() -> TestResult {
    init_tracing();

    let dir = setup()?;
    let cfg = load_and_validate(dir.path().join("Pipeline.toml"))?;
    run_update(&cfg, UpdateOptions::default()).await?;

    write_json_lines(
        dir.path(),
        "orders.json",
        &[json!({"id": 9, "cust": "zed", "total": 1000})],
    );
    let second = run_update(&cfg, UpdateOptions::default()).await?;
    assert!(second.report.succeeded());

    let store = TableStore::new(cfg_fs(), dir.path().join("out"));
    let stored = store.read_table("big_orders")?;
    assert_eq!(stored.num_rows(), 1);
    assert_eq!(stored.rows()[0][1], string("zed"));

    // The event log keeps both updates.
    let log = fs::read_to_string(store.event_log_path())?;
    let started = log.lines().filter(|l| l.contains("update_started")).count();
    assert_eq!(started, 2);

    Ok(())
}

#[tokio::test]
async fn unselected_tables_are_not_persisted() -> TestResult {
    init_tracing();

    let dir = setup()?;
    let cfg = load_and_validate(dir.path().join("Pipeline.toml"))?;
    let update = run_update(
        &cfg,
        UpdateOptions {
            tables: vec!["orders_raw".to_string()],
            ..UpdateOptions::default()
        },
    )
    .await?;

    assert_eq!(
        update.report.tables_with_status(FlowStatus::Completed),
        vec!["orders_raw"]
    );

    let store = TableStore::new(cfg_fs(), dir.path().join("out"));
    assert!(store.read_metadata("orders_raw").is_ok());
    match store.read_metadata("orders_clean") {
        Err(PipelineError::TableNotFound(name)) => assert_eq!(name, "orders_clean"),
        other => panic!("Expected TableNotFound, got: {:?}", other),
    }

    Ok(())
}

fn cfg_fs() -> std::sync::Arc<dyn medallion::fs::FileSystem> {
    std::sync::Arc::new(medallion::fs::RealFileSystem)
}
