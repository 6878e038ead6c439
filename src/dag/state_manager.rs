// src/dag/state_manager.rs

//! Per-run state management for tables in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::table_info::{RunState, ScheduledTable, TableInfo};
use crate::engine::TableName;

/// Manages per-run state transitions for tables.
pub struct StateManager<'a> {
    tables: &'a mut HashMap<TableName, TableInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(tables: &'a mut HashMap<TableName, TableInfo>, current_run_id: Option<u64>) -> Self {
        Self {
            tables,
            current_run_id,
        }
    }

    /// Include the selected tables in this run.
    ///
    /// Tables already participating keep their state.
    pub fn mark_selected_pending<'n, I>(&mut self, selection: I)
    where
        I: IntoIterator<Item = &'n str>,
    {
        for name in selection {
            match self.tables.get_mut(name) {
                Some(info) => {
                    if info.run_state.is_none() {
                        info.run_state = Some(RunState::Pending);
                        debug!(table = %info.name, "marked Pending for this run");
                    }
                }
                None => warn!(table = %name, "selected table not present in tables map"),
            }
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TableInfo) -> bool {
        let ro = ReadOnlyStateManager::new(self.tables);
        ro.deps_satisfied_for_info(info)
    }

    /// Abort the run: every `Pending` table becomes `Skipped`.
    ///
    /// Running tables are left alone so they can finish. Returns the newly
    /// skipped tables, sorted.
    pub fn skip_pending(&mut self) -> Vec<TableName> {
        let mut skipped: Vec<TableName> = self
            .tables
            .values_mut()
            .filter(|info| info.run_state == Some(RunState::Pending))
            .map(|info| {
                info.run_state = Some(RunState::Skipped);
                debug!(table = %info.name, "run aborted; marking Skipped");
                info.name.clone()
            })
            .collect();
        skipped.sort();
        skipped
    }

    /// Collect `Pending` tables whose upstreams are satisfied, mark them
    /// `Running` and return them, sorted by name.
    pub fn collect_new_ready_tables(&mut self) -> Vec<ScheduledTable> {
        let mut candidates: Vec<TableName> = self
            .tables
            .values()
            .filter(|info| {
                info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let run_id = self.current_run_id.unwrap_or(0);
        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tables.get_mut(&name) {
                if info.last_successful_run.is_some() || info.last_failed_run.is_some() {
                    info!(table = %info.name, run_id, "scheduling table for refresh");
                } else {
                    info!(table = %info.name, run_id, "scheduling table for first materialization");
                }
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTable::from_table_info(info, run_id));
            }
        }

        ready
    }

    /// Check if all tables are in a terminal state.
    pub fn all_tables_terminal(&self) -> bool {
        !self.tables.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// A read-only view used when only shared access to the tables map exists.
pub struct ReadOnlyStateManager<'a> {
    tables: &'a HashMap<TableName, TableInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tables: &'a HashMap<TableName, TableInfo>) -> Self {
        Self { tables }
    }

    /// Upstreams are satisfied when each one succeeded in this run, or sits
    /// outside the run and succeeded in an earlier one.
    pub fn deps_satisfied_for_info(&self, info: &TableInfo) -> bool {
        for dep_name in &info.deps {
            let dep = match self.tables.get(dep_name) {
                Some(d) => d,
                None => {
                    warn!(
                        table = %info.name,
                        dep = %dep_name,
                        "upstream missing from tables map"
                    );
                    return false;
                }
            };

            match dep.run_state {
                Some(RunState::DoneSuccess) => {}
                Some(RunState::DoneFailed)
                | Some(RunState::Skipped)
                | Some(RunState::Pending)
                | Some(RunState::Running) => return false,
                None => {
                    if dep.last_successful_run.is_none() {
                        return false;
                    }
                }
            }
        }

        true
    }
}
