#![allow(dead_code)]

use dagpool::dag::ExecutionLevel;
use dagpool::engine::ExecutionResult;
use dagpool::types::TaskStatus;

/// Ids of the tasks in a result, in the order the result lists them.
pub fn ids(result: &ExecutionResult) -> Vec<&str> {
    result.tasks.iter().map(|t| t.id()).collect()
}

pub fn status(result: &ExecutionResult, id: &str) -> TaskStatus {
    result
        .status_of(id)
        .unwrap_or_else(|| panic!("no task '{id}' in result"))
}

pub fn error(result: &ExecutionResult, id: &str) -> String {
    result
        .task(id)
        .and_then(|t| t.error.clone())
        .unwrap_or_else(|| panic!("task '{id}' has no error"))
}

/// Ids of each level, for compact assertions.
pub fn level_ids(levels: &[ExecutionLevel]) -> Vec<Vec<String>> {
    levels
        .iter()
        .map(|l| l.tasks.iter().map(|t| t.id().to_string()).collect())
        .collect()
}
