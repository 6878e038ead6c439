#![allow(dead_code)]

use std::sync::Arc;

use medallion::fs::mock::MockFileSystem;
use medallion::frame::Value;
use serde_json::json;

pub use medallion_test_utils::{init_tracing, with_timeout};

pub const SAMPLE_PATH: &str = "/data/clickstream.json";

/// Referrers of the Apache Spark page with their click counts, in no
/// particular order. The top ten by count are `ref_12` down to `ref_03`.
pub const SPARK_REFERRERS: &[(&str, i64)] = &[
    ("ref_05", 5),
    ("ref_11", 11),
    ("ref_01", 1),
    ("ref_08", 8),
    ("ref_12", 12),
    ("ref_03", 3),
    ("ref_10", 10),
    ("ref_02", 2),
    ("ref_07", 7),
    ("ref_04", 4),
    ("ref_09", 9),
    ("ref_06", 6),
];

/// Clickstream sample: twelve Spark referrers, a few other pages and one row
/// with no current title.
pub fn sample_records() -> Vec<serde_json::Value> {
    let mut records: Vec<serde_json::Value> = SPARK_REFERRERS
        .iter()
        .map(|(prev, n)| json!({"curr_title": "Apache_Spark", "prev_title": prev, "n": n, "type": "link"}))
        .collect();
    records.push(json!({"curr_title": "Apache_Hadoop", "prev_title": "other", "n": 500, "type": "link"}));
    records.push(json!({"curr_title": "Scala", "prev_title": "other-empty", "n": 40, "type": "other"}));
    records.push(json!({"prev_title": "Main_Page", "n": 77, "type": "external"}));
    records
}

pub fn to_json_lines(records: &[serde_json::Value]) -> String {
    records.iter().map(|r| format!("{r}\n")).collect()
}

/// Mock filesystem holding `records` at [`SAMPLE_PATH`].
pub fn mock_fs_with(records: &[serde_json::Value]) -> Arc<MockFileSystem> {
    let fs = MockFileSystem::new();
    fs.add_file(SAMPLE_PATH, to_json_lines(records));
    Arc::new(fs)
}

pub fn string(s: &str) -> Value {
    Value::String(s.to_string())
}
