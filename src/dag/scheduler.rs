// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::table_info::{RunState, ScheduledTable, TableInfo, TableRunState};
use crate::engine::{TableName, TableOutcome};
use crate::errors::Result;
use crate::plan::TablePlan;

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tables are selected for the current run
/// - deciding when a table is ready (all upstreams materialized)
/// - recording success and failure
/// - aborting the run on the first failure
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tables: HashMap<TableName, TableInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`ConfigFile`], compiling every
    /// table plan.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let graph = DagGraph::from_config(cfg);

        let mut tables = HashMap::new();
        for (name, tc) in cfg.table.iter() {
            let deps = graph.dependencies_of(name).to_vec();
            let plan = TablePlan::compile(name, tc, cfg)?;
            tables.insert(name.clone(), TableInfo::new(plan, deps));
        }

        Ok(Self {
            graph,
            tables,
            run_counter: 0,
            current_run_id: None,
        })
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given table's run state.
    pub fn run_state_of(&self, table: &str) -> Option<TableRunState> {
        let info = self.tables.get(table)?;
        Some(info.run_state.into())
    }

    /// Tables selected for the *active* run, sorted.
    pub fn tables_in_current_run(&self) -> Vec<TableName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        let mut names: Vec<TableName> = self
            .tables
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether the upstreams of `table` are satisfied for the current run.
    ///
    /// Returns `None` if the table is unknown.
    pub fn deps_satisfied(&self, table: &str) -> Option<bool> {
        let info = self.tables.get(table)?;
        let mgr = ReadOnlyStateManager::new(&self.tables);
        Some(mgr.deps_satisfied_for_info(info))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tables()
    }

    pub fn plan_of(&self, table: &str) -> Option<&TablePlan> {
        self.tables.get(table).map(|info| info.plan.as_ref())
    }

    /// Start a new run over `selection` plus its upstream closure (all tables
    /// when `selection` is empty) and return the tables ready right away.
    pub fn start_run<S: AsRef<str>>(&mut self, selection: &[S]) -> Result<SchedulerStep> {
        let closure = self.graph.upstream_closure(selection)?;

        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        for info in self.tables.values_mut() {
            info.run_state = None;
        }
        info!(
            run_id = self.run_counter,
            tables = closure.len(),
            "scheduler: starting new update"
        );

        let mut manager = StateManager::new(&mut self.tables, self.current_run_id);
        manager.mark_selected_pending(closure.iter().map(String::as_str));
        let newly_scheduled = manager.collect_new_ready_tables();
        let run_just_finished = self.maybe_finish_run();

        Ok(SchedulerStep {
            newly_scheduled,
            run_just_finished,
            ..SchedulerStep::default()
        })
    }

    /// Record the outcome of a materialization (production API).
    pub fn handle_completion(&mut self, table: &str, outcome: &TableOutcome) -> Vec<ScheduledTable> {
        self.completion_step_internal(table, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_completion` returning a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, table: &str, outcome: &TableOutcome) -> SchedulerStep {
        self.completion_step_internal(table, outcome)
    }

    /// Abort the active run without a failing table (e.g. on shutdown).
    pub fn abort(&mut self) -> SchedulerStep {
        if self.current_run_id.is_none() {
            return SchedulerStep::default();
        }
        let mut manager = StateManager::new(&mut self.tables, self.current_run_id);
        let newly_skipped = manager.skip_pending();
        let run_just_finished = self.maybe_finish_run();
        SchedulerStep {
            newly_skipped,
            run_just_finished,
            ..SchedulerStep::default()
        }
    }

    /// Clear `current_run_id` once every table is terminal.
    ///
    /// Returns `true` if this call finished the run.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&mut self.tables, self.current_run_id);
        if manager.all_tables_terminal() {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tables terminal; update finished"
            );
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn completion_step_internal(&mut self, table: &str, outcome: &TableOutcome) -> SchedulerStep {
        let run_id = match self.current_run_id {
            Some(id) => id,
            None => {
                warn!(table = %table, "completion with no active run; ignoring");
                return SchedulerStep::default();
            }
        };

        let mut step = SchedulerStep::default();

        match self.tables.get_mut(table) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                TableOutcome::Success(_) => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(table = %info.name, run_id, "table materialized");
                    let mut manager = StateManager::new(&mut self.tables, self.current_run_id);
                    step.newly_scheduled = manager.collect_new_ready_tables();
                }
                TableOutcome::Failed(reason) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(
                        table = %info.name,
                        run_id,
                        error = %reason,
                        "table failed; aborting update"
                    );
                    step.newly_failed.push(info.name.clone());
                    let mut manager = StateManager::new(&mut self.tables, self.current_run_id);
                    step.newly_skipped = manager.skip_pending();
                }
            },
            Some(info) => {
                warn!(
                    table = %table,
                    state = ?info.run_state,
                    "completion for a table that is not running; ignoring"
                );
            }
            None => {
                warn!(table = %table, "completion for unknown table; ignoring");
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawConfigFile, TableConfig};
    use crate::engine::FlowStats;

    fn scheduler() -> Scheduler {
        let raw = RawConfigFile::new("s")
            .with_table("a", TableConfig::read_json("a.json"))
            .with_table("b", TableConfig::from_table("a"))
            .with_table("c", TableConfig::from_table("a"))
            .with_table("d", TableConfig::from_table("b"))
            .with_table("x", TableConfig::read_json("x.json"));
        Scheduler::from_config(&ConfigFile::try_from(raw).unwrap()).unwrap()
    }

    fn ok() -> TableOutcome {
        TableOutcome::Success(FlowStats::default())
    }

    fn names(tables: &[ScheduledTable]) -> Vec<&str> {
        tables.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn full_run_schedules_roots_then_dependents() {
        let mut s = scheduler();
        let step = s.start_run::<&str>(&[]).unwrap();
        assert_eq!(names(&step.newly_scheduled), vec!["a", "x"]);
        assert_eq!(s.run_state_of("b"), Some(TableRunState::Pending));

        let step = s.step_completion("a", &ok());
        assert_eq!(names(&step.newly_scheduled), vec!["b", "c"]);

        s.step_completion("x", &ok());
        s.step_completion("c", &ok());
        let step = s.step_completion("b", &ok());
        assert_eq!(names(&step.newly_scheduled), vec!["d"]);

        let step = s.step_completion("d", &ok());
        assert!(step.run_just_finished);
        assert!(s.is_idle());
    }

    #[test]
    fn selection_runs_upstream_closure_only() {
        let mut s = scheduler();
        s.start_run(&["d"]).unwrap();
        assert_eq!(s.tables_in_current_run(), vec!["a", "b", "d"]);
        assert_eq!(s.run_state_of("x"), Some(TableRunState::NotInRun));
    }

    #[test]
    fn failure_skips_pending_but_lets_running_finish() {
        let mut s = scheduler();
        s.start_run::<&str>(&[]).unwrap();

        let step = s.step_completion("a", &TableOutcome::Failed("boom".into()));
        assert_eq!(step.newly_failed, vec!["a"]);
        assert_eq!(step.newly_skipped, vec!["b", "c", "d"]);
        assert!(!step.run_just_finished);
        assert_eq!(s.run_state_of("x"), Some(TableRunState::Running));

        let step = s.step_completion("x", &ok());
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_just_finished);
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let mut s = scheduler();
        assert!(s.start_run(&["nope"]).is_err());
        assert!(s.is_idle());
    }

    #[test]
    fn stale_completions_are_ignored() {
        let mut s = scheduler();
        s.start_run(&["a"]).unwrap();
        let step = s.step_completion("b", &ok());
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(s.run_state_of("b"), Some(TableRunState::NotInRun));
    }
}
