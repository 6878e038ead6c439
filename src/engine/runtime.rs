// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::ScheduledTable;
use crate::errors::{PipelineError, Result};
use crate::exec::ExecutorBackend;
use crate::storage::EventLog;

use super::core::CoreRuntime;
use super::report::UpdateReport;
use super::{CoreCommand, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates table
/// materialization to an `ExecutorBackend`.
///
/// All update semantics live in `CoreRuntime`; this shell only reads events,
/// dispatches tables and writes the event log.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    event_log: Option<EventLog>,
    event_log_error: Option<String>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("event_log", &self.event_log)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            event_log: None,
            event_log_error: None,
        }
    }

    /// Write pipeline events to `log` as they are produced.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.event_log = Some(log);
        self
    }

    /// Main event loop. Returns the report of the update once it finishes.
    ///
    /// Event log write failures do not stop the update; the first one is
    /// attached to the report.
    pub async fn run(mut self) -> Result<UpdateReport> {
        info!("medallion runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                debug!("core requested exit; stopping runtime");
                break;
            }
        }

        if !self.core.is_idle() {
            warn!("runtime stopped with tables still materializing");
        }

        let mut report = self
            .core
            .into_report()
            .ok_or_else(|| PipelineError::UpdateFailed("no update was requested".to_string()))?;
        report.event_log_error = self.event_log_error;
        Ok(report)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTables(tables) => {
                self.spawn_ready(tables).await?;
            }
            CoreCommand::Record(event) => {
                debug!(?event, "pipeline event");
                if let Some(log) = &self.event_log {
                    if let Err(err) = log.append(&event) {
                        warn!(path = %log.path().display(), error = %err, "failed to write event log entry");
                        self.event_log_error.get_or_insert_with(|| err.to_string());
                    }
                }
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tables: Vec<ScheduledTable>) -> Result<()> {
        if tables.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "dispatching ready tables");

        self.executor.spawn_ready_tables(tables).await
    }
}
