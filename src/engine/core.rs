// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) reads events from channels,
//! sends `ScheduledTable`s to the executor, writes event log entries and
//! handles Ctrl+C.
//!
//! The core has no Tokio types, channels or filesystem access, so it is unit
//! tested directly.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_shutdown, handle_table_completion, handle_update_request, CoreStep,
};
use crate::engine::report::UpdateReport;
use crate::engine::{RuntimeEvent, TableName};

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    report: Option<UpdateReport>,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            report: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Report of the current or most recent update.
    pub fn report(&self) -> Option<&UpdateReport> {
        self.report.as_ref()
    }

    pub fn into_report(self) -> Option<UpdateReport> {
        self.report
    }

    /// Start an update over `tables` (empty means every table).
    pub fn start(&mut self, tables: Vec<TableName>) -> CoreStep {
        self.step(RuntimeEvent::UpdateRequested { tables })
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::UpdateRequested { tables } => {
                handle_update_request(&mut self.scheduler, &mut self.report, tables)
            }
            RuntimeEvent::TableCompleted { table, outcome } => {
                handle_table_completion(&mut self.scheduler, &mut self.report, table, outcome)
            }
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.scheduler, &mut self.report),
        }
    }
}
