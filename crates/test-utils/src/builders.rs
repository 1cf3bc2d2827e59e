#![allow(dead_code)]

use dagpool::types::Step;

/// Tool used for ordinary fixture steps.
pub const STANDARD_TOOL: &str = "shell";
/// Tool used for audit fixture steps.
pub const AUDIT_TOOL: &str = "audit:check";

/// Builder for step lists, to simplify test setup.
///
/// ```ignore
/// let steps = PlanBuilder::new()
///     .standard("build", &[])
///     .audit("verify", &["build"])
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    steps: Vec<Step>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a standard step with the given dependencies.
    pub fn standard(self, id: &str, deps: &[&str]) -> Self {
        self.step(with_deps(Step::new(id, STANDARD_TOOL), deps))
    }

    /// Append an audit step with the given dependencies.
    pub fn audit(self, id: &str, deps: &[&str]) -> Self {
        self.step(with_deps(Step::new(id, AUDIT_TOOL), deps))
    }

    pub fn build(self) -> Vec<Step> {
        self.steps
    }
}

fn with_deps(step: Step, deps: &[&str]) -> Step {
    deps.iter().fold(step, |step, dep| step.depends_on(*dep))
}

/// `ids[0] -> ids[1] -> ...`: every step depends on the previous one.
pub fn chain(ids: &[&str]) -> Vec<Step> {
    ids.iter()
        .enumerate()
        .fold(PlanBuilder::new(), |builder, (i, id)| {
            let deps: &[&str] = if i == 0 { &[] } else { &ids[i - 1..i] };
            builder.standard(id, deps)
        })
        .build()
}

/// Steps with no dependencies at all.
pub fn independent(ids: &[&str]) -> Vec<Step> {
    ids.iter()
        .fold(PlanBuilder::new(), |builder, id| builder.standard(id, &[]))
        .build()
}

/// `root`; `branch1` and `branch2` depend on `root`; `merge` on both.
pub fn diamond() -> Vec<Step> {
    PlanBuilder::new()
        .standard("root", &[])
        .standard("branch1", &["root"])
        .standard("branch2", &["root"])
        .standard("merge", &["branch1", "branch2"])
        .build()
}
