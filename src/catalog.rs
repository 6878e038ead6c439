// src/catalog.rs

//! Registry of materialized tables, discoverable by name.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::frame::Dataset;
use crate::quality::ExpectationMetrics;

/// A table produced by one update.
#[derive(Debug, Clone)]
pub struct MaterializedTable {
    pub name: String,
    pub comment: Option<String>,
    pub dataset: Arc<Dataset>,
    pub expectations: Vec<ExpectationMetrics>,
    pub dropped_records: u64,
    /// Update that produced this version.
    pub run_id: u64,
}

/// Thread-safe catalog. Clones share the same tables.
///
/// Registering a table replaces any earlier version under the same name;
/// readers holding the old `Arc` keep seeing the old data.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Arc<RwLock<HashMap<String, Arc<MaterializedTable>>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, table: MaterializedTable) -> Arc<MaterializedTable> {
        let table = Arc::new(table);
        debug!(
            table = %table.name,
            rows = table.dataset.num_rows(),
            run_id = table.run_id,
            "registered table in catalog"
        );
        let mut guard = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(table.name.clone(), Arc::clone(&table));
        table
    }

    pub fn get(&self, name: &str) -> Option<Arc<MaterializedTable>> {
        let guard = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(name).cloned()
    }

    /// Dataset of a registered table, or [`PipelineError::TableNotFound`].
    pub fn dataset(&self, name: &str) -> Result<Arc<Dataset>> {
        self.get(name)
            .map(|t| Arc::clone(&t.dataset))
            .ok_or_else(|| PipelineError::TableNotFound(name.to_string()))
    }

    /// Registered table names, sorted.
    pub fn names(&self) -> Vec<String> {
        let guard = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
