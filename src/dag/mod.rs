// src/dag/mod.rs

//! Table DAG and scheduling.
//!
//! - [`graph`] holds table adjacency and upstream closures.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tables are ready to materialize.
//! - [`table_info`] provides table metadata and scheduled table types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod table_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use table_info::{ScheduledTable, TableRunState};
