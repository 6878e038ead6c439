// src/exec/materialize.rs

//! Synchronous materialization of one table.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::catalog::{Catalog, MaterializedTable};
use crate::dag::ScheduledTable;
use crate::engine::FlowStats;
use crate::errors::Result;
use crate::frame::{read_json, Dataset};
use crate::fs::FileSystem;
use crate::plan::TableInput;
use crate::quality::apply_expectations;
use crate::storage::TableStore;

/// Everything a materialization needs besides the plan.
#[derive(Debug, Clone)]
pub struct MaterializeContext {
    pub fs: Arc<dyn FileSystem>,
    pub catalog: Catalog,
    /// Set when the pipeline persists its tables.
    pub store: Option<TableStore>,
}

impl MaterializeContext {
    pub fn new(fs: Arc<dyn FileSystem>, catalog: Catalog) -> Self {
        Self {
            fs,
            catalog,
            store: None,
        }
    }

    pub fn with_store(mut self, store: TableStore) -> Self {
        self.store = Some(store);
        self
    }
}

/// Read the input, apply the steps, enforce expectations, then persist and
/// register the result.
///
/// Nothing is registered when an expectation with the `fail` policy is
/// violated or the table cannot be persisted.
pub fn materialize_table(ctx: &MaterializeContext, table: &ScheduledTable) -> Result<FlowStats> {
    let started = Instant::now();
    let plan = &table.plan;

    let input: Arc<Dataset> = match &plan.input {
        TableInput::Source { path, options } => Arc::new(read_json(ctx.fs.as_ref(), path, *options)?),
        TableInput::Upstream(name) => ctx.catalog.dataset(name)?,
    };

    let transformed = plan.transform(&input)?;
    let quality = apply_expectations(&plan.name, &transformed, &plan.expectations)?;

    let output_records = quality.dataset.num_rows() as u64;
    let materialized = MaterializedTable {
        name: plan.name.clone(),
        comment: plan.comment.clone(),
        dataset: Arc::new(quality.dataset),
        expectations: quality.metrics.clone(),
        dropped_records: quality.dropped_records,
        run_id: table.run_id,
    };

    if let Some(store) = &ctx.store {
        store.write_table(&materialized)?;
    }
    ctx.catalog.register(materialized);

    let stats = FlowStats {
        input_records: input.num_rows() as u64,
        output_records,
        dropped_records: quality.dropped_records,
        expectations: quality.metrics,
        duration_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        table = %plan.name,
        run_id = table.run_id,
        input_records = stats.input_records,
        output_records = stats.output_records,
        dropped_records = stats.dropped_records,
        duration_ms = stats.duration_ms,
        "table materialized"
    );

    Ok(stats)
}
