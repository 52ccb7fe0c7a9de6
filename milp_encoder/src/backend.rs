//! The seam between the encoding core and an optimization backend.

use crate::model::ConstraintModel;
use std::fmt;

/// Failures reported by an optimization backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The constraint system admits no feasible point.
    Infeasible,

    /// The objective is unbounded over the feasible region.
    Unbounded,

    /// `optimize` was called on a model with no objective set.
    MissingObjective,

    /// The model uses a feature this backend cannot enforce.
    Unsupported(&'static str),

    /// A variable was given a reversed interval.
    InvalidBounds { var: String, lb: f64, ub: f64 },

    /// The solve exceeded its iteration budget.
    IterationLimit { limit: usize },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Infeasible => write!(f, "constraint system is infeasible"),
            BackendError::Unbounded => write!(f, "objective is unbounded"),
            BackendError::MissingObjective => write!(f, "no objective set"),
            BackendError::Unsupported(what) => write!(f, "unsupported model feature: {what}"),
            BackendError::InvalidBounds { var, lb, ub } => {
                write!(f, "invalid bounds for {var}: [{lb}, {ub}]")
            }
            BackendError::IterationLimit { limit } => {
                write!(f, "iteration limit {limit} exceeded")
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// An optimization backend able to optimize the model's current objective.
///
/// The model is borrowed immutably: a backend observes the accumulated
/// constraint system but never owns or mutates it.
pub trait Backend {
    /// Returns the optimal objective value, or a failure signal for an
    /// infeasible or unbounded system.
    fn optimize(&self, model: &ConstraintModel) -> Result<f64, BackendError>;
}
