// src/exec/table_runner.rs

//! Runs one scheduled table on the blocking pool and reports back.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledTable;
use crate::engine::{RuntimeEvent, TableOutcome};
use crate::exec::materialize::{materialize_table, MaterializeContext};

/// Materialize `table` and send exactly one `TableCompleted` event.
///
/// Materialization errors (and panics) become `TableOutcome::Failed`; only a
/// closed runtime channel is logged and dropped.
pub async fn run_table(
    table: ScheduledTable,
    ctx: Arc<MaterializeContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let name = table.name.clone();
    let run_id = table.run_id;
    if let Err(err) = run_table_inner(table, ctx, &runtime_tx).await {
        error!(
            table = %name,
            run_id,
            error = %err,
            "failed to report table completion"
        );
    }
}

async fn run_table_inner(
    table: ScheduledTable,
    ctx: Arc<MaterializeContext>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<()> {
    info!(
        table = %table.name,
        run_id = table.run_id,
        input = %table.plan.input,
        "starting table materialization"
    );

    let name = table.name.clone();
    let run_id = table.run_id;
    let joined = tokio::task::spawn_blocking(move || materialize_table(&ctx, &table)).await;

    let outcome = match joined {
        Ok(Ok(stats)) => TableOutcome::Success(stats),
        Ok(Err(err)) => {
            error!(table = %name, run_id, error = %err, "table materialization failed");
            TableOutcome::Failed(err.to_string())
        }
        Err(join_err) => {
            let err = anyhow!(join_err).context("materialization task panicked");
            error!(table = %name, run_id, error = %format!("{err:#}"), "table materialization aborted");
            TableOutcome::Failed(format!("{err:#}"))
        }
    };

    runtime_tx
        .send(RuntimeEvent::TableCompleted {
            table: name.clone(),
            outcome,
        })
        .await
        .with_context(|| format!("sending TableCompleted event for table '{name}' to runtime"))?;

    Ok(())
}
