// src/config/validate.rs

use std::collections::HashSet;

use tracing::warn;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::dag::build_execution_levels;
use crate::errors::{DagPoolError, Result};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = DagPoolError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.pool, raw.steps))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_steps(plan)?;
    validate_pool_section(plan)?;
    validate_step_ids(plan)?;
    warn_dangling_dependencies(plan);
    validate_dag(plan)?;
    Ok(())
}

fn ensure_has_steps(plan: &RawPlanFile) -> Result<()> {
    if plan.steps.is_empty() {
        return Err(DagPoolError::PlanError(
            "plan must contain at least one [[step]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_pool_section(plan: &RawPlanFile) -> Result<()> {
    if plan.pool.max_concurrency == 0 {
        return Err(DagPoolError::PlanError(
            "[pool].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if plan.pool.task_timeout_ms == Some(0) {
        return Err(DagPoolError::PlanError(
            "[pool].task_timeout_ms must be >= 1 when set (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_step_ids(plan: &RawPlanFile) -> Result<()> {
    let mut seen = HashSet::new();

    for (position, step) in plan.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(DagPoolError::PlanError(format!(
                "step #{} has an empty id",
                position + 1
            )));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(DagPoolError::DuplicateStep(step.id.clone()));
        }
    }

    Ok(())
}

/// Dependencies on unknown ids are allowed (they count as satisfied), but
/// they are usually typos, so say so.
fn warn_dangling_dependencies(plan: &RawPlanFile) {
    let ids: HashSet<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();

    for step in &plan.steps {
        for dep in &step.dependencies {
            if !ids.contains(dep.as_str()) {
                warn!(
                    task = %step.id,
                    dep = %dep,
                    "step depends on an unknown id; the dependency will be ignored"
                );
            }
        }
    }
}

fn validate_dag(plan: &RawPlanFile) -> Result<()> {
    // Leveling fails on a cycle, which is all we need here.
    build_execution_levels(&plan.steps)?;
    Ok(())
}
