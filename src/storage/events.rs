// src/storage/events.rs

//! Pipeline event log entries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::quality::ExpectationMetrics;

/// One entry of the event log. Produced by the core runtime, written by the
/// runtime shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PipelineEvent {
    UpdateStarted {
        update_id: u64,
        tables: Vec<String>,
    },
    FlowCompleted {
        update_id: u64,
        table: String,
        output_records: u64,
        dropped_records: u64,
        expectations: Vec<ExpectationMetrics>,
        duration_ms: u64,
    },
    FlowFailed {
        update_id: u64,
        table: String,
        error: String,
    },
    FlowSkipped {
        update_id: u64,
        table: String,
        reason: String,
    },
    UpdateCompleted {
        update_id: u64,
    },
    UpdateFailed {
        update_id: u64,
        reason: String,
    },
}

#[derive(Serialize)]
struct EventRecord<'a> {
    timestamp_ms: u64,
    pipeline: &'a str,
    #[serde(flatten)]
    event: &'a PipelineEvent,
}

/// Append-only JSON-lines event log under the storage directory.
#[derive(Debug, Clone)]
pub struct EventLog {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    pipeline: String,
}

impl EventLog {
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf, pipeline: impl Into<String>) -> Self {
        Self {
            fs,
            path,
            pipeline: pipeline.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn append(&self, event: &PipelineEvent) -> Result<()> {
        let record = EventRecord {
            timestamp_ms: now_ms(),
            pipeline: &self.pipeline,
            event,
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.fs.append(&self.path, &line)?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn appends_tagged_json_lines() {
        let fs = MockFileSystem::new();
        let log = EventLog::new(Arc::new(fs.clone()), PathBuf::from("/s/event_log.jsonl"), "p");
        log.append(&PipelineEvent::UpdateStarted {
            update_id: 1,
            tables: vec!["a".into()],
        })
        .unwrap();
        log.append(&PipelineEvent::FlowSkipped {
            update_id: 1,
            table: "b".into(),
            reason: "upstream failed".into(),
        })
        .unwrap();

        let text = fs.contents("/s/event_log.jsonl").unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "update_started");
        assert_eq!(lines[0]["pipeline"], "p");
        assert_eq!(lines[1]["event_type"], "flow_skipped");
        assert_eq!(lines[1]["table"], "b");
        assert!(lines[1]["timestamp_ms"].as_u64().is_some());
    }
}
