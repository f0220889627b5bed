use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use crate::problem::load::{Capacity, Load};

#[derive(Error, Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "kind", content = "details", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationError {
    #[error("at least 2 stops are needed to optimize a route")]
    InsufficientStops,

    #[error("total demand {demand} exceeds vehicle capacity {capacity}")]
    CapacityExceeded { demand: Load, capacity: Capacity },

    #[error("no travel data from {from} to {to}")]
    UnreachableStop { from: String, to: String },

    #[error("time budget exhausted before the search could start")]
    AlgorithmTimeout,

    #[error("batch was cancelled before this route started")]
    BatchCancelled,

    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    #[error("unknown stop {0}")]
    UnknownStop(String),

    #[error("invalid stop order: {0}")]
    InvalidOrder(String),

    #[error("internal error: {0}")]
    Internal(String),
}
