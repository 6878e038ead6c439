// src/frame/json.rs

//! JSON source reader with schema inference.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::errors::{PipelineError, Result};
use crate::frame::dataset::{Dataset, Row};
use crate::frame::schema::{Field, Schema};
use crate::frame::value::{DataType, Value};
use crate::fs::FileSystem;
use crate::types::ParseMode;

/// Column that receives the raw text of malformed records in permissive mode.
pub const CORRUPT_RECORD_COLUMN: &str = "_corrupt_record";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonReadOptions {
    /// Read the whole file as a single JSON document (array of objects or a
    /// single object) instead of JSON Lines.
    pub multi_line: bool,
    pub mode: ParseMode,
}

enum Record {
    Object(serde_json::Map<String, Json>),
    Corrupt(String),
}

/// Read a JSON file through `fs` and infer its schema.
pub fn read_json(fs: &dyn FileSystem, path: &Path, options: JsonReadOptions) -> Result<Dataset> {
    let text = fs
        .read_to_string(path)
        .map_err(|e| PipelineError::Source(format!("failed to read {}: {e:#}", path.display())))?;
    let dataset = parse_json(&text, options)?;
    debug!(
        path = %path.display(),
        rows = dataset.num_rows(),
        columns = dataset.schema().len(),
        "read JSON source"
    );
    Ok(dataset)
}

/// Parse JSON text into a dataset; see [`read_json`].
pub fn parse_json(text: &str, options: JsonReadOptions) -> Result<Dataset> {
    let records = if options.multi_line {
        split_document(text, options.mode)?
    } else {
        split_lines(text, options.mode)?
    };
    build_dataset(records)
}

fn split_lines(text: &str, mode: ParseMode) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Json>(trimmed) {
            Ok(Json::Object(map)) => records.push(Record::Object(map)),
            Ok(_) => handle_malformed(&mut records, mode, trimmed, i + 1, "not a JSON object")?,
            Err(e) => handle_malformed(&mut records, mode, trimmed, i + 1, &e.to_string())?,
        }
    }
    Ok(records)
}

fn split_document(text: &str, mode: ParseMode) -> Result<Vec<Record>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    match serde_json::from_str::<Json>(text) {
        Ok(Json::Array(items)) => {
            for (i, item) in items.into_iter().enumerate() {
                match item {
                    Json::Object(map) => records.push(Record::Object(map)),
                    other => handle_malformed(
                        &mut records,
                        mode,
                        &other.to_string(),
                        i + 1,
                        "array element is not a JSON object",
                    )?,
                }
            }
        }
        Ok(Json::Object(map)) => records.push(Record::Object(map)),
        Ok(other) => {
            handle_malformed(&mut records, mode, &other.to_string(), 1, "not a JSON object")?
        }
        Err(e) => handle_malformed(&mut records, mode, text.trim(), 1, &e.to_string())?,
    }
    Ok(records)
}

fn handle_malformed(
    records: &mut Vec<Record>,
    mode: ParseMode,
    raw: &str,
    record_no: usize,
    reason: &str,
) -> Result<()> {
    match mode {
        ParseMode::Permissive => {
            warn!(record = record_no, reason, "malformed JSON record kept as corrupt");
            records.push(Record::Corrupt(raw.to_string()));
            Ok(())
        }
        ParseMode::DropMalformed => {
            warn!(record = record_no, reason, "dropping malformed JSON record");
            Ok(())
        }
        ParseMode::FailFast => Err(PipelineError::Source(format!(
            "malformed JSON record {record_no}: {reason}"
        ))),
    }
}

fn json_type(value: &Json) -> DataType {
    match value {
        Json::Null => DataType::Null,
        Json::Bool(_) => DataType::Boolean,
        Json::Number(n) if n.is_i64() => DataType::Long,
        Json::Number(_) => DataType::Double,
        Json::String(_) | Json::Array(_) | Json::Object(_) => DataType::String,
    }
}

fn build_dataset(records: Vec<Record>) -> Result<Dataset> {
    // Field names sorted alphabetically, types widened across records.
    let mut inferred: BTreeMap<String, DataType> = BTreeMap::new();
    let mut has_corrupt = false;
    for record in &records {
        match record {
            Record::Object(map) => {
                for (key, value) in map {
                    let t = json_type(value);
                    inferred
                        .entry(key.clone())
                        .and_modify(|existing| *existing = existing.widen(t))
                        .or_insert(t);
                }
            }
            Record::Corrupt(_) => has_corrupt = true,
        }
    }
    if has_corrupt {
        inferred
            .entry(CORRUPT_RECORD_COLUMN.to_string())
            .or_insert(DataType::String);
    }

    let fields: Vec<Field> = inferred
        .into_iter()
        .map(|(name, t)| {
            let t = if t == DataType::Null { DataType::String } else { t };
            Field::new(name, t)
        })
        .collect();
    let schema = Schema::new(fields)?;
    let corrupt_idx = schema.index_of(CORRUPT_RECORD_COLUMN);

    let rows: Vec<Row> = records
        .into_iter()
        .map(|record| match record {
            Record::Object(map) => schema
                .fields()
                .iter()
                .map(|f| {
                    map.get(&f.name)
                        .map(|v| Value::from_json(v, f.data_type))
                        .unwrap_or(Value::Null)
                })
                .collect(),
            Record::Corrupt(raw) => {
                let mut row = vec![Value::Null; schema.len()];
                if let Some(idx) = corrupt_idx {
                    row[idx] = Value::String(raw);
                }
                row
            }
        })
        .collect();

    Dataset::new(schema, rows)
}
