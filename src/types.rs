use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What happens to a record that violates an expectation.
///
/// - `Warn`: keep the record and report the violation as a metric.
/// - `Drop`: remove the record before the table is written; the violation is
///   still reported.
/// - `Fail`: abort the update. Reprocessing needs manual intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationPolicy {
    Warn,
    Drop,
    Fail,
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        ViolationPolicy::Warn
    }
}

impl FromStr for ViolationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" => Ok(ViolationPolicy::Warn),
            "drop" => Ok(ViolationPolicy::Drop),
            "fail" => Ok(ViolationPolicy::Fail),
            other => Err(format!(
                "invalid on_violation: {other} (expected \"warn\", \"drop\" or \"fail\")"
            )),
        }
    }
}

impl fmt::Display for ViolationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationPolicy::Warn => "warn",
            ViolationPolicy::Drop => "drop",
            ViolationPolicy::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Supported source file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Json,
}

impl Default for SourceFormat {
    fn default() -> Self {
        SourceFormat::Json
    }
}

/// How malformed JSON records are handled while reading a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Keep the record with all fields null and the raw text in
    /// `_corrupt_record`.
    Permissive,
    /// Skip malformed records.
    DropMalformed,
    /// Fail the read on the first malformed record.
    FailFast,
}

impl Default for ParseMode {
    fn default() -> Self {
        ParseMode::Permissive
    }
}
