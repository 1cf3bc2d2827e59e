use std::fmt;

use serde::Deserialize;

/// Canonical step identifier type used throughout the crate.
pub type StepId = String;

/// Capability category of a tool, used for admission priority.
///
/// The derived ordering is the priority order: audit steps sort before
/// standard ones when several tasks are eligible at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKind {
    /// Verification / audit step (tool identifier prefixed with `audit:`).
    Audit,
    Standard,
}

/// Tool identifier of a step.
///
/// The raw identifier is kept verbatim so executors can route on it; the
/// [`ToolKind`] is derived once, at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub struct Tool {
    name: String,
    kind: ToolKind,
}

impl Tool {
    pub const AUDIT_PREFIX: &'static str = "audit:";

    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = if name.starts_with(Self::AUDIT_PREFIX) {
            ToolKind::Audit
        } else {
            ToolKind::Standard
        };
        Self { name, kind }
    }

    /// Full identifier, including any `audit:` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn is_audit(&self) -> bool {
        self.kind == ToolKind::Audit
    }

    /// Identifier with the `audit:` prefix stripped.
    pub fn capability(&self) -> &str {
        self.name
            .strip_prefix(Self::AUDIT_PREFIX)
            .unwrap_or(&self.name)
    }
}

impl From<String> for Tool {
    fn from(name: String) -> Self {
        Tool::new(name)
    }
}

impl From<&str> for Tool {
    fn from(name: &str) -> Self {
        Tool::new(name)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One unit of planned work.
///
/// Steps are immutable inputs; the scheduler wraps each one in a
/// [`ScheduledTask`](crate::dag::ScheduledTask) for the duration of a run.
///
/// ```toml
/// [[step]]
/// id = "lint"
/// action = "Run the linter"
/// tool = "audit:lint"
/// payload = "cargo clippy"
/// dependencies = ["build"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub id: StepId,

    /// Human-readable description of what the step does.
    #[serde(default)]
    pub action: String,

    pub tool: Tool,

    /// Opaque data for the executor.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Steps that must complete before this one is eligible.
    ///
    /// Ids that name no step in the plan are ignored.
    #[serde(default)]
    pub dependencies: Vec<StepId>,
}

impl Step {
    pub fn new(id: impl Into<StepId>, tool: impl Into<Tool>) -> Self {
        Self {
            id: id.into(),
            action: String::new(),
            tool: tool.into(),
            payload: serde_json::Value::Null,
            dependencies: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_payload(mut self, payload: impl Into<serde_json::Value>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn depends_on(mut self, dep: impl Into<StepId>) -> Self {
        self.dependencies.push(dep.into());
        self
    }
}

/// Lifecycle state of a scheduled task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Waiting for dependencies or a free slot.
    Ready,
    Running,
    Completed,
    Failed,
    /// Never started: an upstream step failed or the run was aborted.
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
