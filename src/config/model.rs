// src/config/model.rs

use serde::Deserialize;

use crate::engine::DEFAULT_MAX_CONCURRENCY;
use crate::types::Step;

/// Plan file as read from TOML, before validation.
///
/// ```toml
/// [pool]
/// max_concurrency = 2
/// fail_fast = false
/// task_timeout_ms = 5000
///
/// [[step]]
/// id = "build"
/// tool = "shell"
/// payload = "cargo build"
///
/// [[step]]
/// id = "verify"
/// tool = "audit:test"
/// payload = { cmd = "cargo test" }
/// dependencies = ["build"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    /// Pool behaviour from `[pool]`.
    #[serde(default)]
    pub pool: PoolSection,

    /// Steps from `[[step]]`, in file order.
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// A plan that passed validation (see `config::validate`).
///
/// Only constructible through `TryFrom<RawPlanFile>`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub pool: PoolSection,
    pub steps: Vec<Step>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(pool: PoolSection, steps: Vec<Step>) -> Self {
        Self { pool, steps }
    }
}

/// `[pool]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    /// Maximum number of steps running at the same time. Must be >= 1.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Cancel every unstarted step on the first failure.
    #[serde(default)]
    pub fail_fast: bool,

    /// Per-step timeout in milliseconds; unset means no timeout.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            fail_fast: false,
            task_timeout_ms: None,
        }
    }
}
