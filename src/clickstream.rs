// src/clickstream.rs

//! Built-in Wikipedia clickstream pipeline.
//!
//! - `clickstream_raw` ingests the raw JSON dump.
//! - `clickstream_prepared` casts the click count, renames the title columns
//!   and enforces `valid_current_page_title` (warn) and `valid_count` (fail).
//! - `top_spark_referrers` keeps the top referrers of [`TARGET_PAGE`].

use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile, TableConfig};
use crate::errors::Result;

pub const DEFAULT_JSON_PATH: &str = "/databricks-datasets/wikipedia-datasets/data-001/clickstream/raw-uncompressed-json/2015_2_clickstream.json";

pub const TARGET_PAGE: &str = "Apache_Spark";

pub const TOP_N: usize = 10;

pub const RAW_TABLE: &str = "clickstream_raw";
pub const PREPARED_TABLE: &str = "clickstream_prepared";
pub const TOP_REFERRERS_TABLE: &str = "top_spark_referrers";

/// Definition of the three clickstream tables reading from `json_path`.
pub fn raw_pipeline(json_path: impl AsRef<Path>) -> RawConfigFile {
    RawConfigFile::new("clickstream")
        .with_table(
            RAW_TABLE,
            TableConfig::read_json(json_path.as_ref())
                .comment("The raw wikipedia clickstream dataset, ingested from /databricks-datasets."),
        )
        .with_table(
            PREPARED_TABLE,
            TableConfig::from_table(RAW_TABLE)
                .comment("Wikipedia clickstream data cleaned and prepared for analysis.")
                .with_column("click_count", "CAST(n AS INT)")
                .rename("curr_title", "current_page_title")
                .rename("prev_title", "previous_page_title")
                .select(["current_page_title", "click_count", "previous_page_title"])
                .expect("valid_current_page_title", "current_page_title IS NOT NULL")
                .expect_or_fail("valid_count", "click_count > 0"),
        )
        .with_table(
            TOP_REFERRERS_TABLE,
            TableConfig::from_table(PREPARED_TABLE)
                .comment("A table containing the top pages linking to the Apache Spark page.")
                .filter(format!("current_page_title == '{TARGET_PAGE}'"))
                .rename("previous_page_title", "referrer")
                .sort("click_count", true)
                .select(["referrer", "click_count"])
                .limit(TOP_N),
        )
}

/// Validated clickstream pipeline.
pub fn pipeline(json_path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(raw_pipeline(json_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViolationPolicy;

    #[test]
    fn builds_three_tables_in_a_chain() {
        let cfg = pipeline(DEFAULT_JSON_PATH).unwrap();
        assert_eq!(cfg.table.len(), 3);
        assert_eq!(cfg.table[PREPARED_TABLE].dependencies(), [RAW_TABLE.to_string()]);
        assert_eq!(
            cfg.table[TOP_REFERRERS_TABLE].dependencies(),
            [PREPARED_TABLE.to_string()]
        );

        let policies: Vec<ViolationPolicy> = cfg.table[PREPARED_TABLE]
            .expect
            .iter()
            .map(|e| e.on_violation)
            .collect();
        assert_eq!(policies, vec![ViolationPolicy::Warn, ViolationPolicy::Fail]);
    }
}
