// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::StepId;

#[derive(Error, Debug)]
pub enum DagPoolError {
    /// Structural failure: the dependency graph contains at least one cycle.
    ///
    /// `steps` lists the steps that sit on a cycle, in input order.
    #[error("cycle detected among steps: {}", .steps.join(", "))]
    CycleDetected { steps: Vec<StepId> },

    #[error("duplicate step id: {0}")]
    DuplicateStep(StepId),

    #[error("Plan error: {0}")]
    PlanError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, DagPoolError>;
