// tests/runtime_fake_executor.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use medallion::config::{ConfigFile, TableConfig};
use medallion::dag::Scheduler;
use medallion::engine::{CoreRuntime, FlowStatus, Runtime, RuntimeEvent};
use medallion::fs::mock::MockFileSystem;
use medallion::fs::FileSystem;
use medallion::storage::TableStore;
use medallion_test_utils::builders::PipelineBuilder;
use medallion_test_utils::fake_executor::FakeExecutor;

type TestResult = Result<(), Box<dyn Error>>;

/// Diamond: raw -> (left, right); report reads left.
fn diamond_config() -> ConfigFile {
    PipelineBuilder::new("diamond")
        .with_source("raw", "raw.json")
        .with_passthrough("left", "raw")
        .with_passthrough("right", "raw")
        .with_table("report", TableConfig::from_table("left").limit(1))
        .build()
}

fn runtime_with(
    cfg: &ConfigFile,
    executed: &Arc<Mutex<Vec<String>>>,
    failing: &[&str],
) -> Result<(Runtime<FakeExecutor>, mpsc::Sender<RuntimeEvent>), Box<dyn Error>> {
    let (tx, rx) = mpsc::channel(64);
    let mut executor = FakeExecutor::new(tx.clone(), Arc::clone(executed));
    for table in failing {
        executor = executor.failing(table);
    }
    let core = CoreRuntime::new(Scheduler::from_config(cfg)?);
    Ok((Runtime::new(core, rx, executor), tx))
}

#[tokio::test]
async fn runtime_runs_every_table_in_dependency_order() -> TestResult {
    init_tracing();

    let cfg = diamond_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let (runtime, tx) = runtime_with(&cfg, &executed, &[])?;

    tx.send(RuntimeEvent::UpdateRequested { tables: Vec::new() })
        .await?;
    let report = with_timeout(runtime.run()).await?;

    assert!(report.succeeded());
    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed.len(), 4);
    assert_eq!(executed[0], "raw");

    let pos = |name: &str| executed.iter().position(|t| t == name).unwrap();
    assert!(pos("left") < pos("report"));
    assert!(pos("right") > pos("raw"));

    Ok(())
}

#[tokio::test]
async fn failure_skips_only_tables_not_yet_started() -> TestResult {
    init_tracing();

    let cfg = diamond_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let (runtime, tx) = runtime_with(&cfg, &executed, &["left"])?;

    tx.send(RuntimeEvent::UpdateRequested { tables: Vec::new() })
        .await?;
    let report = with_timeout(runtime.run()).await?;

    assert!(!report.succeeded());
    assert_eq!(report.tables_with_status(FlowStatus::Failed), vec!["left"]);
    assert_eq!(report.tables_with_status(FlowStatus::Skipped), vec!["report"]);
    // `right` was dispatched together with `left`, so it still finishes.
    assert_eq!(
        report.flow("right").map(|f| f.status),
        Some(FlowStatus::Completed)
    );
    assert!(!executed.lock().unwrap().contains(&"report".to_string()));

    Ok(())
}

#[tokio::test]
async fn selection_limits_dispatch_to_upstream_closure() -> TestResult {
    init_tracing();

    let cfg = diamond_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let (runtime, tx) = runtime_with(&cfg, &executed, &[])?;

    tx.send(RuntimeEvent::UpdateRequested {
        tables: vec!["right".to_string()],
    })
    .await?;
    let report = with_timeout(runtime.run()).await?;

    assert!(report.succeeded());
    assert_eq!(
        executed.lock().unwrap().clone(),
        vec!["raw".to_string(), "right".to_string()]
    );

    Ok(())
}

#[tokio::test]
async fn unknown_selection_fails_without_dispatching() -> TestResult {
    init_tracing();

    let cfg = diamond_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let (runtime, tx) = runtime_with(&cfg, &executed, &[])?;

    tx.send(RuntimeEvent::UpdateRequested {
        tables: vec!["nope".to_string()],
    })
    .await?;
    let report = with_timeout(runtime.run()).await?;

    assert!(!report.succeeded());
    assert!(report.flows.is_empty());
    assert!(report.failure.unwrap_or_default().contains("nope"));
    assert!(executed.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn event_log_records_the_update_lifecycle() -> TestResult {
    init_tracing();

    let cfg = diamond_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let (runtime, tx) = runtime_with(&cfg, &executed, &["left"])?;

    let fs = MockFileSystem::new();
    let store = TableStore::new(Arc::new(fs.clone()), "/store");
    let runtime = runtime.with_event_log(store.event_log("diamond"));

    tx.send(RuntimeEvent::UpdateRequested { tables: Vec::new() })
        .await?;
    with_timeout(runtime.run()).await?;

    let log = fs
        .contents(store.event_log_path())
        .ok_or("event log was not written")?;
    let events: Vec<serde_json::Value> = log
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    let types: Vec<&str> = events
        .iter()
        .filter_map(|e| e["event_type"].as_str())
        .collect();
    assert_eq!(types.first(), Some(&"update_started"));
    assert_eq!(types.last(), Some(&"update_failed"));
    assert!(types.contains(&"flow_failed"));
    assert!(types.contains(&"flow_skipped"));
    assert!(events.iter().all(|e| e["pipeline"] == "diamond"));

    let failed = events
        .iter()
        .find(|e| e["event_type"] == "flow_failed")
        .ok_or("no flow_failed event")?;
    assert_eq!(failed["table"], "left");

    Ok(())
}

/// Filesystem whose appends always fail.
#[derive(Debug)]
struct FullDisk;

impl FileSystem for FullDisk {
    fn read_to_string(&self, path: &std::path::Path) -> anyhow::Result<String> {
        anyhow::bail!("not found: {}", path.display())
    }

    fn write(&self, _path: &std::path::Path, _contents: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("no space left on device")
    }

    fn append(&self, _path: &std::path::Path, _contents: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("no space left on device")
    }

    fn exists(&self, _path: &std::path::Path) -> bool {
        false
    }
}

#[tokio::test]
async fn event_log_write_failure_is_reported_without_failing_the_update() -> TestResult {
    init_tracing();

    let cfg = diamond_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let (runtime, tx) = runtime_with(&cfg, &executed, &[])?;

    let store = TableStore::new(Arc::new(FullDisk), "/store");
    let runtime = runtime.with_event_log(store.event_log("diamond"));

    tx.send(RuntimeEvent::UpdateRequested { tables: Vec::new() })
        .await?;
    let report = with_timeout(runtime.run()).await?;

    assert!(report.succeeded());
    assert_eq!(executed.lock().unwrap().len(), 4);
    let err = report
        .event_log_error
        .ok_or("event log failure was not reported")?;
    assert!(err.contains("no space left on device"), "{err}");

    Ok(())
}

#[tokio::test]
async fn healthy_event_log_leaves_no_error_on_the_report() -> TestResult {
    init_tracing();

    let cfg = diamond_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let (runtime, tx) = runtime_with(&cfg, &executed, &[])?;

    let store = TableStore::new(Arc::new(MockFileSystem::new()), "/store");
    let runtime = runtime.with_event_log(store.event_log("diamond"));

    tx.send(RuntimeEvent::UpdateRequested { tables: Vec::new() })
        .await?;
    let report = with_timeout(runtime.run()).await?;

    assert!(report.succeeded());
    assert!(report.event_log_error.is_none());

    Ok(())
}
