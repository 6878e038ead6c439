// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Tables this one reads from.
    deps: Vec<String>,
    /// Tables that read from this one.
    dependents: Vec<String>,
}

/// In-memory table DAG keyed by table name.
///
/// Acyclicity is checked in `config::validate`; this keeps adjacency for
/// scheduling, partial refreshes and dry-run output.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: BTreeMap<String, DagNode>,
}

impl DagGraph {
    /// Build a DAG from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut nodes: BTreeMap<String, DagNode> = BTreeMap::new();

        for (name, table) in cfg.table.iter() {
            nodes.insert(
                name.clone(),
                DagNode {
                    deps: table.dependencies().to_vec(),
                    dependents: Vec::new(),
                },
            );
        }

        let table_names: Vec<String> = nodes.keys().cloned().collect();
        for table_name in table_names {
            let deps = nodes
                .get(&table_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(table_name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// All table names, sorted.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate upstream tables of `name`.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate downstream tables of `name`.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// The given tables plus everything they transitively read from.
    ///
    /// An empty selection means every table.
    pub fn upstream_closure<S: AsRef<str>>(&self, selection: &[S]) -> Result<BTreeSet<String>> {
        if selection.is_empty() {
            return Ok(self.nodes.keys().cloned().collect());
        }

        let mut closure = BTreeSet::new();
        let mut stack: Vec<String> = Vec::new();
        for name in selection {
            let name = name.as_ref();
            if !self.contains(name) {
                return Err(PipelineError::TableNotFound(name.to_string()));
            }
            stack.push(name.to_string());
        }

        while let Some(name) = stack.pop() {
            if !closure.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&name).iter().cloned());
        }
        Ok(closure)
    }

    /// Tables in dependency order (upstreams first).
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.nodes.keys() {
            graph.add_node(name.as_str());
        }
        for (name, node) in self.nodes.iter() {
            for dep in node.deps.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(PipelineError::DagCycle(format!(
                "cycle detected in table DAG involving table '{}'",
                cycle.node_id()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawConfigFile, TableConfig};

    fn graph() -> DagGraph {
        let raw = RawConfigFile::new("g")
            .with_table("raw", TableConfig::read_json("a.json"))
            .with_table("clean", TableConfig::from_table("raw"))
            .with_table("top", TableConfig::from_table("clean"))
            .with_table("other", TableConfig::read_json("b.json"));
        DagGraph::from_config(&ConfigFile::try_from(raw).unwrap())
    }

    #[test]
    fn adjacency_is_symmetric() {
        let g = graph();
        assert_eq!(g.dependencies_of("clean"), ["raw".to_string()]);
        assert_eq!(g.dependents_of("raw"), ["clean".to_string()]);
        assert!(g.dependents_of("top").is_empty());
    }

    #[test]
    fn closure_follows_upstream_edges_only() {
        let g = graph();
        let closure = g.upstream_closure(&["clean"]).unwrap();
        assert_eq!(
            closure.into_iter().collect::<Vec<_>>(),
            vec!["clean".to_string(), "raw".to_string()]
        );
        assert_eq!(g.upstream_closure::<&str>(&[]).unwrap().len(), 4);
        assert!(matches!(
            g.upstream_closure(&["missing"]),
            Err(PipelineError::TableNotFound(_))
        ));
    }

    #[test]
    fn topological_order_puts_upstreams_first() {
        let order = graph().topological_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("raw") < pos("clean"));
        assert!(pos("clean") < pos("top"));
    }
}
