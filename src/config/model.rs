// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{ParseMode, SourceFormat, ViolationPolicy};

/// Top-level pipeline definition as read from a TOML file.
///
/// ```toml
/// [pipeline]
/// name = "clickstream"
/// storage = "target/medallion"
///
/// [table.clickstream_raw]
/// comment = "The raw wikipedia clickstream dataset."
/// read = { format = "json", path = "clickstream.json" }
///
/// [table.clickstream_prepared]
/// from = "clickstream_raw"
/// steps = [{ op = "with_column", name = "click_count", expr = "CAST(n AS INT)" }]
///
/// [[table.clickstream_prepared.expect]]
/// name = "valid_count"
/// condition = "click_count > 0"
/// on_violation = "fail"
/// ```
///
/// This is the unvalidated form; use [`ConfigFile`] (via `TryFrom`) for
/// anything that needs the dependency graph to be sound.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Global settings from `[pipeline]`.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// All tables from `[table.<name>]`, keyed by table name.
    #[serde(default)]
    pub table: BTreeMap<String, TableConfig>,
}

impl RawConfigFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pipeline: PipelineSection {
                name: name.into(),
                storage: None,
            },
            table: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, name: impl Into<String>, table: TableConfig) -> Self {
        self.table.insert(name.into(), table);
        self
    }

    pub fn with_storage(mut self, storage: impl Into<PathBuf>) -> Self {
        self.pipeline.storage = Some(storage.into());
        self
    }
}

/// Validated pipeline definition.
///
/// Only constructed through `TryFrom<RawConfigFile>`, which guarantees that
/// every `from` reference exists, there are no cycles, and all expressions
/// parse.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub table: BTreeMap<String, TableConfig>,
    /// Directory that relative source and storage paths are resolved against.
    base_dir: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        pipeline: PipelineSection,
        table: BTreeMap<String, TableConfig>,
    ) -> Self {
        Self {
            pipeline,
            table,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Resolve a path from the definition against [`ConfigFile::base_dir`].
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Storage directory, resolved, if persistence is enabled.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.pipeline.storage.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn set_storage(&mut self, storage: Option<PathBuf>) {
        self.pipeline.storage = storage;
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    #[serde(default = "default_pipeline_name")]
    pub name: String,

    /// Directory for persisted tables and the event log. `None` keeps
    /// everything in memory.
    #[serde(default)]
    pub storage: Option<PathBuf>,
}

fn default_pipeline_name() -> String {
    "pipeline".to_string()
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            name: default_pipeline_name(),
            storage: None,
        }
    }
}

/// `[table.<name>]` section.
///
/// Exactly one of `read` (a source file) or `from` (an upstream table) must be
/// set. The builder methods mirror the table decorators of notebook-style
/// pipeline frameworks, so code-defined pipelines read like their TOML
/// counterparts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub read: Option<ReadConfig>,

    /// Upstream table this table is computed from.
    #[serde(default)]
    pub from: Option<String>,

    /// Transformations applied in order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Data-quality expectations evaluated on the transformed output.
    #[serde(default)]
    pub expect: Vec<ExpectationConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadConfig {
    #[serde(default)]
    pub format: SourceFormat,
    pub path: PathBuf,
    #[serde(default)]
    pub multi_line: bool,
    #[serde(default)]
    pub mode: ParseMode,
}

/// One transformation step, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepConfig {
    WithColumn {
        name: String,
        expr: String,
    },
    Rename {
        from: String,
        to: String,
    },
    Select {
        columns: Vec<String>,
    },
    Filter {
        condition: String,
    },
    Sort {
        column: String,
        #[serde(default)]
        descending: bool,
    },
    Limit {
        n: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationConfig {
    pub name: String,
    pub condition: String,
    #[serde(default)]
    pub on_violation: ViolationPolicy,
}

impl TableConfig {
    /// A table that ingests a JSON file.
    pub fn read_json(path: impl Into<PathBuf>) -> Self {
        Self {
            read: Some(ReadConfig {
                format: SourceFormat::Json,
                path: path.into(),
                multi_line: false,
                mode: ParseMode::default(),
            }),
            ..Self::default()
        }
    }

    /// A table computed from an upstream table.
    pub fn from_table(upstream: impl Into<String>) -> Self {
        Self {
            from: Some(upstream.into()),
            ..Self::default()
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_column(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.steps.push(StepConfig::WithColumn {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.steps.push(StepConfig::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.push(StepConfig::Select {
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.steps.push(StepConfig::Filter {
            condition: condition.into(),
        });
        self
    }

    pub fn sort(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.steps.push(StepConfig::Sort {
            column: column.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.steps.push(StepConfig::Limit { n });
        self
    }

    /// Record violations as metrics; keep the rows.
    pub fn expect(self, name: impl Into<String>, condition: impl Into<String>) -> Self {
        self.expect_with(name, condition, ViolationPolicy::Warn)
    }

    /// Drop violating rows.
    pub fn expect_or_drop(self, name: impl Into<String>, condition: impl Into<String>) -> Self {
        self.expect_with(name, condition, ViolationPolicy::Drop)
    }

    /// Fail the update on any violation.
    pub fn expect_or_fail(self, name: impl Into<String>, condition: impl Into<String>) -> Self {
        self.expect_with(name, condition, ViolationPolicy::Fail)
    }

    /// Several expectations sharing one policy.
    pub fn expect_all<I, N, C>(mut self, expectations: I, policy: ViolationPolicy) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        for (name, condition) in expectations {
            self = self.expect_with(name, condition, policy);
        }
        self
    }

    pub fn expect_with(
        mut self,
        name: impl Into<String>,
        condition: impl Into<String>,
        policy: ViolationPolicy,
    ) -> Self {
        self.expect.push(ExpectationConfig {
            name: name.into(),
            condition: condition.into(),
            on_violation: policy,
        });
        self
    }

    /// Upstream tables this table reads from.
    pub fn dependencies(&self) -> &[String] {
        self.from.as_slice()
    }
}
