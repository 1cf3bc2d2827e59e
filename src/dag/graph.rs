// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{DagPoolError, Result};
use crate::types::{Step, StepId};

/// Internal node structure: stores immediate deps and dependents by index.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies that exist in the plan, deduplicated.
    deps: Vec<usize>,
    /// Direct dependents: steps that list this one as a dependency.
    dependents: Vec<usize>,
}

/// In-memory dependency graph over a step list.
///
/// Nodes are addressed by their position in the input list. Dependency ids
/// that name no step are dropped here, so every later stage can treat them
/// as already satisfied.
#[derive(Debug, Clone)]
pub struct DagGraph {
    ids: Vec<StepId>,
    index: HashMap<StepId, usize>,
    nodes: Vec<DagNode>,
}

impl DagGraph {
    /// Build the graph for `steps`.
    ///
    /// Fails only when two steps share an id.
    pub fn from_steps(steps: &[Step]) -> Result<Self> {
        let mut index = HashMap::with_capacity(steps.len());
        let mut ids = Vec::with_capacity(steps.len());

        // First pass: assign indices.
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.id.clone(), i).is_some() {
                return Err(DagPoolError::DuplicateStep(step.id.clone()));
            }
            ids.push(step.id.clone());
        }

        let mut nodes = vec![DagNode::default(); steps.len()];

        // Second pass: resolve dependency ids and populate dependents.
        for (i, step) in steps.iter().enumerate() {
            for dep in &step.dependencies {
                match index.get(dep) {
                    Some(&d) => {
                        if !nodes[i].deps.contains(&d) {
                            nodes[i].deps.push(d);
                            nodes[d].dependents.push(i);
                        }
                    }
                    None => {
                        debug!(
                            task = %step.id,
                            dep = %dep,
                            "dependency names no step in the plan; treating as satisfied"
                        );
                    }
                }
            }
        }

        Ok(Self { ids, index, nodes })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id_of(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// Resolved direct dependencies of the node at `index`.
    pub fn dependencies_of(&self, index: usize) -> &[usize] {
        &self.nodes[index].deps
    }

    /// Direct dependents of the node at `index`.
    pub fn dependents_of(&self, index: usize) -> &[usize] {
        &self.nodes[index].dependents
    }

    /// Ids of the steps that sit on a cycle within the `unresolved` subset.
    ///
    /// Steps that are only blocked *behind* a cycle are not reported.
    pub fn cycle_members(&self, unresolved: &[usize]) -> Vec<StepId> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for &i in unresolved {
            graph.add_node(i);
        }
        for &i in unresolved {
            for &d in self.dependencies_of(i) {
                if graph.contains_node(d) {
                    graph.add_edge(d, i, ());
                }
            }
        }

        let mut members: Vec<usize> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .collect();
        members.sort_unstable();

        members.into_iter().map(|i| self.ids[i].clone()).collect()
    }
}
