// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::table_info::ScheduledTable;
use crate::engine::TableName;

/// Structured result of a single scheduler "step".
///
/// Tests use this to drive the DAG by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tables that became ready to materialize as a result of this step.
    pub newly_scheduled: Vec<ScheduledTable>,
    /// Tables newly marked as failed in this step.
    pub newly_failed: Vec<TableName>,
    /// Pending tables skipped because the run was aborted.
    pub newly_skipped: Vec<TableName>,
    /// Whether this step finished the current run.
    pub run_just_finished: bool,
}
