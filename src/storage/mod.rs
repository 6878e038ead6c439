// src/storage/mod.rs

//! On-disk layout of a pipeline's storage directory.
//!
//! ```text
//! <storage>/tables/<name>.jsonl        rows as JSON objects, schema order
//! <storage>/tables/<name>.schema.json  comment, fields, row count
//! <storage>/event_log.jsonl            one JSON object per pipeline event
//! ```

pub mod events;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::MaterializedTable;
use crate::errors::{PipelineError, Result};
use crate::frame::{Dataset, Field, Schema, Value};
use crate::fs::FileSystem;

pub use events::{EventLog, PipelineEvent};

/// Contents of `<name>.schema.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub fields: Vec<Field>,
    pub num_rows: u64,
    pub run_id: u64,
}

/// Reads and writes materialized tables under a storage root.
#[derive(Debug, Clone)]
pub struct TableStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl TableStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self, table: &str) -> PathBuf {
        self.root.join("tables").join(format!("{table}.jsonl"))
    }

    pub fn schema_path(&self, table: &str) -> PathBuf {
        self.root.join("tables").join(format!("{table}.schema.json"))
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.root.join("event_log.jsonl")
    }

    pub fn event_log(&self, pipeline: &str) -> EventLog {
        EventLog::new(Arc::clone(&self.fs), self.event_log_path(), pipeline)
    }

    /// Overwrite the stored copy of `table` (full refresh).
    pub fn write_table(&self, table: &MaterializedTable) -> Result<()> {
        let dataset = &table.dataset;
        let mut data = Vec::new();
        for row in dataset.rows() {
            serde_json::to_writer(&mut data, &dataset.row_to_json(row))?;
            data.push(b'\n');
        }
        self.fs.write(&self.data_path(&table.name), &data)?;

        let metadata = TableMetadata {
            name: table.name.clone(),
            comment: table.comment.clone(),
            fields: dataset.schema().fields().to_vec(),
            num_rows: dataset.num_rows() as u64,
            run_id: table.run_id,
        };
        let json = serde_json::to_vec_pretty(&metadata)?;
        self.fs.write(&self.schema_path(&table.name), &json)?;

        debug!(
            table = %table.name,
            rows = dataset.num_rows(),
            path = %self.data_path(&table.name).display(),
            "persisted table"
        );
        Ok(())
    }

    pub fn read_metadata(&self, table: &str) -> Result<TableMetadata> {
        let path = self.schema_path(table);
        if !self.fs.exists(&path) {
            return Err(PipelineError::TableNotFound(table.to_string()));
        }
        let text = self.fs.read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load a persisted table using its stored schema.
    pub fn read_table(&self, table: &str) -> Result<Dataset> {
        let metadata = self.read_metadata(table)?;
        let schema = Schema::new(metadata.fields)?;
        let text = self.fs.read_to_string(&self.data_path(table))?;

        let mut rows = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(line)?;
            let row = schema
                .fields()
                .iter()
                .map(|f| {
                    object
                        .get(&f.name)
                        .map(|v| Value::from_json(v, f.data_type))
                        .unwrap_or(Value::Null)
                })
                .collect();
            rows.push(row);
        }
        Dataset::new(schema, rows)
    }
}
