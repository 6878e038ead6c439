// src/dag/table_info.rs

//! Table metadata and per-run state.

use std::sync::Arc;

use crate::engine::TableName;
use crate::plan::TablePlan;

/// Per-run state of a table (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Selected for this run, waiting on upstream tables.
    Pending,
    /// Dispatched to the executor and currently materializing.
    Running,
    /// Materialized and registered for this run.
    DoneSuccess,
    /// Materialization failed in this run.
    DoneFailed,
    /// Never started because the run was aborted.
    Skipped,
}

/// Public, read-only view of a table's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRunState {
    /// The table is not selected in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Skipped,
}

impl From<Option<RunState>> for TableRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TableRunState::NotInRun,
            Some(RunState::Pending) => TableRunState::Pending,
            Some(RunState::Running) => TableRunState::Running,
            Some(RunState::DoneSuccess) => TableRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TableRunState::DoneFailed,
            Some(RunState::Skipped) => TableRunState::Skipped,
        }
    }
}

/// Static table information plus per-run state.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: TableName,
    pub plan: Arc<TablePlan>,
    /// Upstream tables (the table's `from`).
    pub deps: Vec<TableName>,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,

    /// Last run ID in which this table was materialized.
    pub last_successful_run: Option<u64>,

    /// Last run ID in which this table failed.
    pub last_failed_run: Option<u64>,
}

impl TableInfo {
    pub fn new(plan: TablePlan, deps: Vec<TableName>) -> Self {
        Self {
            name: plan.name.clone(),
            plan: Arc::new(plan),
            deps,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
        }
    }
}

/// A table the scheduler wants the executor to materialize now.
#[derive(Debug, Clone)]
pub struct ScheduledTable {
    pub name: TableName,
    pub plan: Arc<TablePlan>,
    /// Identifier of the update this materialization belongs to.
    pub run_id: u64,
}

impl ScheduledTable {
    pub fn from_table_info(info: &TableInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            plan: Arc::clone(&info.plan),
            run_id,
        }
    }
}
