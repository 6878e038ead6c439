// src/engine/report.rs

//! Outcome of one pipeline update.

use std::fmt;

use serde::Serialize;

use crate::engine::{FlowStats, TableName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Completed,
    Failed,
    Skipped,
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowStatus::Completed => "completed",
            FlowStatus::Failed => "failed",
            FlowStatus::Skipped => "skipped",
        };
        f.pad(s)
    }
}

/// What happened to one table during an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub table: TableName,
    pub status: FlowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<FlowStats>,
    /// Error for failed flows, reason for skipped ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReport {
    pub update_id: u64,
    /// Flows in the order they finished.
    pub flows: Vec<FlowReport>,
    /// Why the update failed, if it did.
    pub failure: Option<String>,
    /// First event log write that failed. Does not fail the update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log_error: Option<String>,
}

impl UpdateReport {
    pub fn new(update_id: u64) -> Self {
        Self {
            update_id,
            flows: Vec::new(),
            failure: None,
            event_log_error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.flows.iter().all(|f| f.status == FlowStatus::Completed)
    }

    pub fn flow(&self, table: &str) -> Option<&FlowReport> {
        self.flows.iter().find(|f| f.table == table)
    }

    pub fn tables_with_status(&self, status: FlowStatus) -> Vec<&str> {
        self.flows
            .iter()
            .filter(|f| f.status == status)
            .map(|f| f.table.as_str())
            .collect()
    }

    pub(crate) fn push(&mut self, flow: FlowReport) {
        self.flows.push(flow);
    }

    /// Record the first failure reason; later ones are already covered by
    /// their flow reports.
    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        if self.failure.is_none() {
            self.failure = Some(reason.into());
        }
    }
}
