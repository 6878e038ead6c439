// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{info, warn};

use crate::dag::{ScheduledTable, Scheduler, SchedulerStep, TableRunState};
use crate::engine::report::{FlowReport, FlowStatus, UpdateReport};
use crate::engine::{TableName, TableOutcome};
use crate::storage::PipelineEvent;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tables to the executor.
    DispatchTables(Vec<ScheduledTable>),
    /// Append an entry to the event log.
    Record(PipelineEvent),
    /// The update is over; the shell should stop.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Start an update over `tables` (plus upstreams; empty means all).
///
/// Only one update runs at a time; requests during an update are ignored.
pub fn handle_update_request(
    scheduler: &mut Scheduler,
    report: &mut Option<UpdateReport>,
    tables: Vec<TableName>,
) -> CoreStep {
    if !scheduler.is_idle() {
        warn!(?tables, "update requested while another update is running; ignoring");
        return CoreStep::running(Vec::new());
    }

    let step = match scheduler.start_run(tables.as_slice()) {
        Ok(step) => step,
        Err(err) => {
            warn!(error = %err, "could not start update");
            let update_id = scheduler.current_run_id().unwrap_or_default();
            let mut failed = UpdateReport::new(update_id);
            failed.fail(err.to_string());
            *report = Some(failed);
            return CoreStep {
                commands: vec![
                    CoreCommand::Record(PipelineEvent::UpdateFailed {
                        update_id,
                        reason: err.to_string(),
                    }),
                    CoreCommand::RequestExit,
                ],
                keep_running: false,
            };
        }
    };

    let update_id = scheduler.current_run_id().unwrap_or_default();
    let selected = scheduler.tables_in_current_run();
    info!(update_id, tables = ?selected, "update started");
    *report = Some(UpdateReport::new(update_id));

    let commands = vec![CoreCommand::Record(PipelineEvent::UpdateStarted {
        update_id,
        tables: selected,
    })];
    apply_step(update_id, report, step, "update aborted", commands)
}

/// Handle a table completion event.
pub fn handle_table_completion(
    scheduler: &mut Scheduler,
    report: &mut Option<UpdateReport>,
    table: TableName,
    outcome: TableOutcome,
) -> CoreStep {
    let update_id = match scheduler.current_run_id() {
        Some(id) => id,
        None => {
            warn!(table = %table, "completion with no active update; ignoring");
            return CoreStep::running(Vec::new());
        }
    };
    if scheduler.run_state_of(&table) != Some(TableRunState::Running) {
        warn!(table = %table, "completion for a table that is not running; ignoring");
        return CoreStep::running(Vec::new());
    }

    let step = scheduler.step_completion(&table, &outcome);

    let mut commands = Vec::new();
    let (flow, event) = match outcome {
        TableOutcome::Success(stats) => {
            let event = PipelineEvent::FlowCompleted {
                update_id,
                table: table.clone(),
                output_records: stats.output_records,
                dropped_records: stats.dropped_records,
                expectations: stats.expectations.clone(),
                duration_ms: stats.duration_ms,
            };
            let flow = FlowReport {
                table: table.clone(),
                status: FlowStatus::Completed,
                stats: Some(stats),
                message: None,
            };
            (flow, event)
        }
        TableOutcome::Failed(error) => {
            if let Some(r) = report.as_mut() {
                r.fail(format!("table '{table}' failed: {error}"));
            }
            let event = PipelineEvent::FlowFailed {
                update_id,
                table: table.clone(),
                error: error.clone(),
            };
            let flow = FlowReport {
                table: table.clone(),
                status: FlowStatus::Failed,
                stats: None,
                message: Some(error),
            };
            (flow, event)
        }
    };
    if let Some(r) = report.as_mut() {
        r.push(flow);
    }
    commands.push(CoreCommand::Record(event));

    let reason = format!("update aborted after table '{table}' failed");
    apply_step(update_id, report, step, &reason, commands)
}

/// Abort the active update, if any, and stop.
///
/// Tables still materializing are abandoned; they never report back.
pub fn handle_shutdown(scheduler: &mut Scheduler, report: &mut Option<UpdateReport>) -> CoreStep {
    let mut commands = Vec::new();

    if let Some(update_id) = scheduler.current_run_id() {
        let reason = "shutdown requested";
        warn!(update_id, "shutdown requested; aborting update");
        let step = scheduler.abort();
        if let Some(r) = report.as_mut() {
            r.fail(reason);
        }
        record_skipped(update_id, report, step.newly_skipped, reason, &mut commands);
        commands.push(CoreCommand::Record(PipelineEvent::UpdateFailed {
            update_id,
            reason: reason.to_string(),
        }));
    }

    commands.push(CoreCommand::RequestExit);
    CoreStep {
        commands,
        keep_running: false,
    }
}

fn record_skipped(
    update_id: u64,
    report: &mut Option<UpdateReport>,
    skipped: Vec<TableName>,
    reason: &str,
    commands: &mut Vec<CoreCommand>,
) {
    for table in skipped {
        if let Some(r) = report.as_mut() {
            r.push(FlowReport {
                table: table.clone(),
                status: FlowStatus::Skipped,
                stats: None,
                message: Some(reason.to_string()),
            });
        }
        commands.push(CoreCommand::Record(PipelineEvent::FlowSkipped {
            update_id,
            table,
            reason: reason.to_string(),
        }));
    }
}

/// Turn a scheduler step into commands, finishing the update when the
/// scheduler went idle.
fn apply_step(
    update_id: u64,
    report: &mut Option<UpdateReport>,
    step: SchedulerStep,
    skip_reason: &str,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    record_skipped(update_id, report, step.newly_skipped, skip_reason, &mut commands);

    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTables(step.newly_scheduled));
    }

    if !step.run_just_finished {
        return CoreStep::running(commands);
    }

    let event = match report.as_ref() {
        Some(r) if !r.succeeded() => {
            let reason = r
                .failure
                .clone()
                .unwrap_or_else(|| "one or more flows did not complete".to_string());
            warn!(update_id, %reason, "update failed");
            PipelineEvent::UpdateFailed { update_id, reason }
        }
        _ => {
            info!(update_id, "update completed");
            PipelineEvent::UpdateCompleted { update_id }
        }
    };
    commands.push(CoreCommand::Record(event));
    commands.push(CoreCommand::RequestExit);

    CoreStep {
        commands,
        keep_running: false,
    }
}
