#![allow(dead_code)]

use std::path::PathBuf;

use medallion::config::{ConfigFile, RawConfigFile, TableConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct PipelineBuilder {
    config: RawConfigFile,
    base_dir: Option<PathBuf>,
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            config: RawConfigFile::new(name),
            base_dir: None,
        }
    }

    pub fn with_table(mut self, name: &str, table: TableConfig) -> Self {
        self.config.table.insert(name.to_string(), table);
        self
    }

    /// Source table reading `path` (relative to the base dir).
    pub fn with_source(self, name: &str, path: &str) -> Self {
        self.with_table(name, TableConfig::read_json(path))
    }

    /// Table that reads `upstream` unchanged.
    pub fn with_passthrough(self, name: &str, upstream: &str) -> Self {
        self.with_table(name, TableConfig::from_table(upstream))
    }

    pub fn with_storage(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.storage = Some(dir.into());
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        let cfg = ConfigFile::try_from(self.config)
            .expect("Failed to build valid pipeline from builder");
        match self.base_dir {
            Some(dir) => cfg.with_base_dir(dir),
            None => cfg,
        }
    }
}

/// Acyclic pipeline where table `i` reads from `deps[i]` (an index below
/// `i`) or from a source file when `None`.
pub fn pipeline_from_parents(parents: &[Option<usize>]) -> ConfigFile {
    let mut builder = PipelineBuilder::new("generated");
    for (i, parent) in parents.iter().enumerate() {
        let name = table_name(i);
        builder = match parent {
            Some(p) if *p < i => builder.with_passthrough(&name, &table_name(*p)),
            _ => builder.with_source(&name, &format!("{name}.json")),
        };
    }
    builder.build()
}

pub fn table_name(i: usize) -> String {
    format!("table_{i}")
}
