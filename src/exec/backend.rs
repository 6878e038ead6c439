// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of materializing tables
//! itself. This makes it easy to swap in a fake executor in tests.
//!
//! - `RealExecutorBackend` is the production implementation: each scheduled
//!   table runs on the tokio blocking pool and reports back with a
//!   `TableCompleted` event.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tables were scheduled and emits canned outcomes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTable;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::materialize::MaterializeContext;
use crate::exec::table_runner::run_table;

/// Trait abstracting how scheduled tables are materialized.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tables. Each one must eventually produce a
    /// `RuntimeEvent::TableCompleted`.
    fn spawn_ready_tables(
        &mut self,
        tables: Vec<ScheduledTable>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
///
/// Independent ready tables materialize concurrently.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: Arc<MaterializeContext>,
}

impl RealExecutorBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: MaterializeContext) -> Self {
        Self {
            runtime_tx,
            ctx: Arc::new(ctx),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tables(
        &mut self,
        tables: Vec<ScheduledTable>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let ctx = Arc::clone(&self.ctx);

        Box::pin(async move {
            for table in tables {
                debug!(table = %table.name, run_id = table.run_id, "spawning materialization");
                tokio::spawn(run_table(table, Arc::clone(&ctx), tx.clone()));
            }
            Ok(())
        })
    }
}
