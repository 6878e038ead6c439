// tests/clickstream_pipeline.rs

mod common;
use crate::common::{
    init_tracing, mock_fs_with, sample_records, string, with_timeout, SAMPLE_PATH,
    SPARK_REFERRERS,
};

use std::error::Error;

use serde_json::json;

use medallion::clickstream::{self, PREPARED_TABLE, RAW_TABLE, TOP_N, TOP_REFERRERS_TABLE};
use medallion::engine::FlowStatus;
use medallion::frame::Value;
use medallion::{run_update, UpdateOptions};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn top_referrers_are_the_ten_busiest_links_into_spark() -> TestResult {
    init_tracing();

    let cfg = clickstream::pipeline(SAMPLE_PATH)?;
    let fs = mock_fs_with(&sample_records());

    let update = with_timeout(run_update(
        &cfg,
        UpdateOptions {
            fs,
            ..UpdateOptions::default()
        },
    ))
    .await?;

    assert!(update.report.succeeded(), "report: {:?}", update.report);
    assert_eq!(
        update.report.tables_with_status(FlowStatus::Completed),
        vec![RAW_TABLE, PREPARED_TABLE, TOP_REFERRERS_TABLE]
    );

    let top = update.catalog.dataset(TOP_REFERRERS_TABLE)?;
    let columns: Vec<&str> = top.schema().names().collect();
    assert_eq!(columns, vec!["referrer", "click_count"]);
    assert_eq!(top.num_rows(), TOP_N);

    let mut expected: Vec<(&str, i64)> = SPARK_REFERRERS.to_vec();
    expected.sort_by(|a, b| b.1.cmp(&a.1));
    expected.truncate(TOP_N);

    let actual: Vec<(Value, Value)> = top
        .rows()
        .iter()
        .map(|row| (row[0].clone(), row[1].clone()))
        .collect();
    let expected: Vec<(Value, Value)> = expected
        .into_iter()
        .map(|(referrer, n)| (string(referrer), Value::Int(n)))
        .collect();
    assert_eq!(actual, expected);

    Ok(())
}

#[tokio::test]
async fn null_titles_are_counted_but_kept() -> TestResult {
    init_tracing();

    let records = sample_records();
    let cfg = clickstream::pipeline(SAMPLE_PATH)?;
    let update = run_update(
        &cfg,
        UpdateOptions {
            fs: mock_fs_with(&records),
            ..UpdateOptions::default()
        },
    )
    .await?;

    let prepared = update
        .report
        .flow(PREPARED_TABLE)
        .and_then(|f| f.stats.clone())
        .ok_or("prepared table has no stats")?;
    assert_eq!(prepared.input_records, records.len() as u64);
    // Warn keeps every row.
    assert_eq!(prepared.output_records, records.len() as u64);
    assert_eq!(prepared.dropped_records, 0);

    let titles = prepared
        .expectations
        .iter()
        .find(|m| m.name == "valid_current_page_title")
        .ok_or("missing title metric")?;
    assert_eq!(titles.failed_records, 1);
    assert_eq!(titles.passed_records, records.len() as u64 - 1);

    let counts = prepared
        .expectations
        .iter()
        .find(|m| m.name == "valid_count")
        .ok_or("missing count metric")?;
    assert_eq!(counts.failed_records, 0);

    let table = update.catalog.dataset(PREPARED_TABLE)?;
    let nulls = table
        .column("current_page_title")?
        .into_iter()
        .filter(|v| v.is_null())
        .count();
    assert_eq!(nulls, 1);

    Ok(())
}

#[tokio::test]
async fn non_positive_count_fails_the_update_and_skips_downstream() -> TestResult {
    init_tracing();

    let mut records = sample_records();
    records.push(json!({"curr_title": "Apache_Spark", "prev_title": "broken", "n": 0}));

    let cfg = clickstream::pipeline(SAMPLE_PATH)?;
    let update = run_update(
        &cfg,
        UpdateOptions {
            fs: mock_fs_with(&records),
            ..UpdateOptions::default()
        },
    )
    .await?;

    let report = &update.report;
    assert!(!report.succeeded());
    assert_eq!(report.tables_with_status(FlowStatus::Completed), vec![RAW_TABLE]);
    assert_eq!(report.tables_with_status(FlowStatus::Failed), vec![PREPARED_TABLE]);
    assert_eq!(
        report.tables_with_status(FlowStatus::Skipped),
        vec![TOP_REFERRERS_TABLE]
    );

    let message = report
        .flow(PREPARED_TABLE)
        .and_then(|f| f.message.clone())
        .unwrap_or_default();
    assert!(message.contains("valid_count"), "message: {message}");
    assert!(message.contains("broken"), "message: {message}");

    // Nothing from the failed table or below it is published.
    assert!(update.catalog.get(PREPARED_TABLE).is_none());
    assert!(update.catalog.get(TOP_REFERRERS_TABLE).is_none());
    assert!(update.catalog.get(RAW_TABLE).is_some());

    Ok(())
}

#[tokio::test]
async fn selecting_a_table_refreshes_only_its_upstream_closure() -> TestResult {
    init_tracing();

    let cfg = clickstream::pipeline(SAMPLE_PATH)?;
    let update = run_update(
        &cfg,
        UpdateOptions {
            fs: mock_fs_with(&sample_records()),
            tables: vec![PREPARED_TABLE.to_string()],
            ..UpdateOptions::default()
        },
    )
    .await?;

    assert!(update.report.succeeded());
    assert_eq!(
        update.report.tables_with_status(FlowStatus::Completed),
        vec![RAW_TABLE, PREPARED_TABLE]
    );
    assert!(update.report.flow(TOP_REFERRERS_TABLE).is_none());
    // Catalog names come back sorted.
    assert_eq!(update.catalog.names(), vec![PREPARED_TABLE, RAW_TABLE]);

    Ok(())
}

#[tokio::test]
async fn missing_source_fails_at_the_bronze_layer() -> TestResult {
    init_tracing();

    let cfg = clickstream::pipeline("/data/does-not-exist.json")?;
    let update = run_update(
        &cfg,
        UpdateOptions {
            fs: mock_fs_with(&sample_records()),
            ..UpdateOptions::default()
        },
    )
    .await?;

    assert!(!update.report.succeeded());
    assert_eq!(update.report.tables_with_status(FlowStatus::Failed), vec![RAW_TABLE]);
    assert_eq!(
        update.report.tables_with_status(FlowStatus::Skipped),
        vec![PREPARED_TABLE, TOP_REFERRERS_TABLE]
    );
    assert!(update.catalog.is_empty());

    Ok(())
}
