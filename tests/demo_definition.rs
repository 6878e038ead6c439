// tests/demo_definition.rs

mod common;
use crate::common::{init_tracing, string};

use std::error::Error;
use std::path::PathBuf;

use medallion::clickstream::{self, PREPARED_TABLE, TOP_N, TOP_REFERRERS_TABLE};
use medallion::config::load_and_validate;
use medallion::frame::Value;
use medallion::{run_update, UpdateOptions};

type TestResult = Result<(), Box<dyn Error>>;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/clickstream/Pipeline.toml")
}

#[test]
fn demo_toml_matches_builtin_pipeline() -> TestResult {
    let from_toml = load_and_validate(demo_path())?;
    let builtin = clickstream::raw_pipeline("clickstream.json");

    for table in [PREPARED_TABLE, TOP_REFERRERS_TABLE] {
        assert_eq!(from_toml.table[table], builtin.table[table], "table {table}");
    }
    Ok(())
}

#[tokio::test]
async fn demo_runs_end_to_end() -> TestResult {
    init_tracing();

    let storage = tempfile::tempdir()?;
    let mut cfg = load_and_validate(demo_path())?;
    cfg.set_storage(Some(storage.path().to_path_buf()));

    let update = run_update(&cfg, UpdateOptions::default()).await?;
    assert!(update.report.succeeded(), "report: {:?}", update.report);

    let top = update.catalog.dataset(TOP_REFERRERS_TABLE)?;
    assert_eq!(top.num_rows(), TOP_N);
    assert_eq!(top.rows()[0], vec![string("other-google"), Value::Int(1497)]);
    assert!(storage.path().join("event_log.jsonl").exists());

    Ok(())
}
