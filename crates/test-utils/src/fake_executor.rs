use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use medallion::dag::ScheduledTable;
use medallion::engine::{FlowStats, RuntimeEvent, TableOutcome};
use medallion::errors::Result;
use medallion::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tables were dispatched, in order
/// - immediately reports `TableCompleted` for each one, failing the tables
///   listed in `failing` and succeeding everything else.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tables(
        &mut self,
        tables: Vec<ScheduledTable>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tables {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }

                let outcome = if failing.contains(&t.name) {
                    TableOutcome::Failed(format!("fake failure in {}", t.name))
                } else {
                    TableOutcome::Success(FlowStats::default())
                };

                tx.send(RuntimeEvent::TableCompleted {
                    table: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
