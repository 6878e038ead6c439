// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod clickstream;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod expr;
pub mod frame;
pub mod fs;
pub mod logging;
pub mod plan;
pub mod quality;
pub mod storage;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{CoreRuntime, FlowStatus, Runtime, RuntimeEvent, TableName, UpdateReport};
use crate::errors::{PipelineError, Result};
use crate::exec::{MaterializeContext, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::plan::TablePlan;
use crate::storage::TableStore;

/// How to run one update.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Tables to refresh (plus their upstreams); empty refreshes everything.
    pub tables: Vec<TableName>,
    /// Filesystem for sources and storage.
    pub fs: Arc<dyn FileSystem>,
    /// Abort the update on Ctrl-C.
    pub handle_ctrl_c: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            fs: Arc::new(RealFileSystem),
            handle_ctrl_c: false,
        }
    }
}

/// Result of [`run_update`]: the report plus the tables it produced.
#[derive(Debug, Clone)]
pub struct Update {
    pub report: UpdateReport,
    pub catalog: Catalog,
}

/// Run one update of a validated pipeline.
///
/// Returns `Ok` even when a flow fails; check [`UpdateReport::succeeded`].
/// Errors are reserved for problems outside individual flows (an unusable
/// runtime channel, for example).
pub async fn run_update(cfg: &ConfigFile, options: UpdateOptions) -> Result<Update> {
    let scheduler = Scheduler::from_config(cfg)?;
    let catalog = Catalog::new();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let mut ctx = MaterializeContext::new(Arc::clone(&options.fs), catalog.clone());
    let store = cfg
        .storage_dir()
        .map(|dir| TableStore::new(Arc::clone(&options.fs), dir));
    if let Some(store) = &store {
        info!(storage = %store.root().display(), "persisting tables");
        ctx = ctx.with_store(store.clone());
    }

    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);
    let mut runtime = Runtime::new(CoreRuntime::new(scheduler), rt_rx, executor);
    if let Some(store) = &store {
        runtime = runtime.with_event_log(store.event_log(&cfg.pipeline.name));
    }

    let ctrl_c = options.handle_ctrl_c.then(|| {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        })
    });

    rt_tx
        .send(RuntimeEvent::UpdateRequested {
            tables: options.tables.clone(),
        })
        .await
        .map_err(|e| PipelineError::UpdateFailed(format!("runtime channel closed: {e}")))?;

    let report = runtime.run().await;
    if let Some(handle) = ctrl_c {
        handle.abort();
    }

    Ok(Update {
        report: report?,
        catalog,
    })
}

/// High-level entry point used by `main.rs`.
///
/// This wires together definition loading, the runtime and the executor,
/// then prints a summary (and previews with `--show`).
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.clickstream {
        Some(path) => clickstream::pipeline(path)?,
        None => load_and_validate(&args.config)
            .with_context(|| format!("loading pipeline definition {}", args.config.display()))?,
    };
    if let Some(storage) = &args.storage {
        // Relative to the working directory, not the definition file.
        let storage = std::path::absolute(storage)
            .with_context(|| format!("resolving storage dir {}", storage.display()))?;
        cfg.set_storage(Some(storage));
    }

    if args.dry_run {
        print_dry_run(&cfg, &args.table)?;
        return Ok(());
    }

    let update = run_update(
        &cfg,
        UpdateOptions {
            tables: args.table.clone(),
            handle_ctrl_c: true,
            ..UpdateOptions::default()
        },
    )
    .await?;

    print_summary(&update.report);
    if let Some(n) = args.show {
        print_previews(&update, n);
    }

    if !update.report.succeeded() {
        let reason = update
            .report
            .failure
            .clone()
            .unwrap_or_else(|| "one or more flows did not complete".to_string());
        return Err(PipelineError::UpdateFailed(reason).into());
    }
    Ok(())
}

/// Dry-run output: tables in dependency order with inputs, steps and
/// expectations.
fn print_dry_run(cfg: &ConfigFile, selection: &[String]) -> Result<()> {
    let graph = DagGraph::from_config(cfg);
    let selected = graph.upstream_closure(selection)?;

    println!("medallion dry-run");
    println!("  pipeline.name = {}", cfg.pipeline.name);
    match cfg.storage_dir() {
        Some(dir) => println!("  pipeline.storage = {}", dir.display()),
        None => println!("  pipeline.storage = (in memory)"),
    }
    println!();

    println!("tables ({} of {}):", selected.len(), cfg.table.len());
    for name in graph.topological_order()? {
        if !selected.contains(&name) {
            continue;
        }
        let Some(table) = cfg.table.get(&name) else {
            continue;
        };
        let plan = TablePlan::compile(&name, table, cfg)?;

        println!("  - {name}");
        if let Some(comment) = &plan.comment {
            println!("      comment: {comment}");
        }
        println!("      input: {}", plan.input);
        for step in &plan.steps {
            println!("      step: {step}");
        }
        for expectation in &plan.expectations {
            println!(
                "      expect [{}] {}: {}",
                expectation.policy,
                expectation.name,
                expectation.condition.source()
            );
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(report: &UpdateReport) {
    let status = if report.succeeded() { "COMPLETED" } else { "FAILED" };
    println!("update {} {status}", report.update_id);
    if let Some(err) = &report.event_log_error {
        println!("  warning: event log incomplete: {err}");
    }

    for flow in &report.flows {
        match (&flow.stats, flow.status) {
            (Some(stats), FlowStatus::Completed) => {
                println!(
                    "  {:<28} {:<9} rows={} dropped={} ({} ms)",
                    flow.table,
                    flow.status,
                    stats.output_records,
                    stats.dropped_records,
                    stats.duration_ms
                );
                for metric in &stats.expectations {
                    println!(
                        "      expectation {} [{}]: passed={} failed={}",
                        metric.name, metric.policy, metric.passed_records, metric.failed_records
                    );
                }
            }
            _ => println!(
                "  {:<28} {:<9} {}",
                flow.table,
                flow.status,
                flow.message.as_deref().unwrap_or("")
            ),
        }
    }
}

fn print_previews(update: &Update, rows: usize) {
    for name in update.catalog.names() {
        let Some(table) = update.catalog.get(&name) else {
            continue;
        };
        println!();
        println!("{name}:");
        println!("{}", table.dataset.preview(rows));
    }
}
