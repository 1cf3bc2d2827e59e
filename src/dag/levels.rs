// src/dag/levels.rs

//! Execution leveling: groups of mutually independent tasks whose
//! dependencies are all satisfied by earlier levels.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::graph::DagGraph;
use crate::dag::task_info::ScheduledTask;
use crate::errors::{DagPoolError, Result};
use crate::types::Step;

/// One batch of tasks sharing the same depth.
#[derive(Debug, Clone)]
pub struct ExecutionLevel {
    pub level: usize,
    pub tasks: Vec<ScheduledTask>,
}

/// Validated leveling of a step list, addressed by input index.
///
/// This is the shared intermediate form behind [`build_execution_levels`]
/// and the scheduler.
#[derive(Debug, Clone)]
pub(crate) struct LevelPlan {
    pub graph: DagGraph,
    pub steps: Vec<Arc<Step>>,
    /// Level of each step, by input index.
    pub levels: Vec<usize>,
    /// Critical-path weight of each step, by input index.
    pub weights: Vec<usize>,
    /// Input indices grouped per level, audit steps first.
    pub order: Vec<Vec<usize>>,
}

impl LevelPlan {
    pub fn build(steps: &[Step]) -> Result<Self> {
        let graph = DagGraph::from_steps(steps)?;
        let levels = assign_levels(&graph)?;
        let weights = critical_path_weights(&graph, &levels);
        let steps: Vec<Arc<Step>> = steps.iter().cloned().map(Arc::new).collect();
        let order = priority_order(&steps, &levels);

        debug!(
            steps = steps.len(),
            depth = order.len(),
            "computed execution levels"
        );

        Ok(Self {
            graph,
            steps,
            levels,
            weights,
            order,
        })
    }

    /// Fresh task for the step at input index `i`.
    pub fn task(&self, i: usize) -> ScheduledTask {
        ScheduledTask::new(Arc::clone(&self.steps[i]), self.levels[i], self.weights[i])
    }

    /// Input indices in admission priority order (level 0 first).
    pub fn flattened_order(&self) -> Vec<usize> {
        self.order.iter().flatten().copied().collect()
    }
}

/// Compute execution levels for `steps`.
///
/// - Dependencies naming unknown steps are ignored.
/// - Fails with [`DagPoolError::CycleDetected`] if the graph has a cycle and
///   with [`DagPoolError::DuplicateStep`] if two steps share an id; nothing
///   is returned in either case.
/// - Within a level, audit steps come first; input order is otherwise kept.
pub fn build_execution_levels(steps: &[Step]) -> Result<Vec<ExecutionLevel>> {
    let plan = LevelPlan::build(steps)?;

    let levels = plan
        .order
        .iter()
        .enumerate()
        .map(|(level, members)| ExecutionLevel {
            level,
            tasks: members.iter().map(|&i| plan.task(i)).collect(),
        })
        .collect();

    Ok(levels)
}

/// Concatenate all levels, level 0 first, preserving within-level order.
pub fn flatten_tasks(levels: &[ExecutionLevel]) -> Vec<ScheduledTask> {
    levels
        .iter()
        .flat_map(|level| level.tasks.iter().cloned())
        .collect()
}

/// Assign each node `1 + max(dep level)`, or 0 without deps, by repeated
/// relaxation passes.
fn assign_levels(graph: &DagGraph) -> Result<Vec<usize>> {
    let n = graph.len();
    let mut levels: Vec<Option<usize>> = vec![None; n];
    let mut assigned = 0;

    while assigned < n {
        let mut progressed = false;

        for i in 0..n {
            if levels[i].is_some() {
                continue;
            }

            let mut level = 0;
            let mut resolvable = true;
            for &d in graph.dependencies_of(i) {
                match levels[d] {
                    Some(dep_level) => level = level.max(dep_level + 1),
                    None => {
                        resolvable = false;
                        break;
                    }
                }
            }

            if resolvable {
                levels[i] = Some(level);
                assigned += 1;
                progressed = true;
            }
        }

        if !progressed {
            let unresolved: Vec<usize> = (0..n).filter(|&i| levels[i].is_none()).collect();
            let steps = graph.cycle_members(&unresolved);
            warn!(?steps, "dependency cycle detected; rejecting plan");
            return Err(DagPoolError::CycleDetected { steps });
        }
    }

    Ok(levels.into_iter().flatten().collect())
}

/// Weight 1 for nodes without dependents, else `1 + max(dependent weight)`.
///
/// Dependents always sit on a strictly deeper level, so walking nodes from
/// the deepest level back to level 0 sees every dependent first.
fn critical_path_weights(graph: &DagGraph, levels: &[usize]) -> Vec<usize> {
    let mut by_depth: Vec<usize> = (0..graph.len()).collect();
    by_depth.sort_by(|a, b| levels[*b].cmp(&levels[*a]));

    let mut weights = vec![1; graph.len()];
    for i in by_depth {
        weights[i] = 1 + graph
            .dependents_of(i)
            .iter()
            .map(|&d| weights[d])
            .max()
            .unwrap_or(0);
    }
    weights
}

fn priority_order(steps: &[Arc<Step>], levels: &[usize]) -> Vec<Vec<usize>> {
    let depth = levels.iter().max().map_or(0, |max| max + 1);
    let mut order: Vec<Vec<usize>> = vec![Vec::new(); depth];

    for (i, &level) in levels.iter().enumerate() {
        order[level].push(i);
    }

    // Stable: input order survives among equal kinds.
    for members in &mut order {
        members.sort_by_key(|&i| steps[i].tool.kind());
    }

    order
}
