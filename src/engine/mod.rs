// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the table scheduler
//! - the runtime event loop that reacts to:
//!   - update requests
//!   - table completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. [`report`] collects the outcome of an update.

use serde::Serialize;

use crate::quality::ExpectationMetrics;

/// Canonical table name type used throughout the engine.
pub type TableName = String;

/// Counters for one successful materialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowStats {
    pub input_records: u64,
    pub output_records: u64,
    pub dropped_records: u64,
    pub expectations: Vec<ExpectationMetrics>,
    pub duration_ms: u64,
}

/// Outcome of materializing a table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    Success(FlowStats),
    /// Rendered error of the failed materialization.
    Failed(String),
}

/// Events flowing into the runtime from the caller, executors and signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Refresh the named tables plus their upstream closure; an empty list
    /// refreshes every table.
    UpdateRequested { tables: Vec<TableName> },
    /// A table materialization finished.
    TableCompleted {
        table: TableName,
        outcome: TableOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod report;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use report::{FlowReport, FlowStatus, UpdateReport};
pub use runtime::Runtime;
