//! Solver port for mixed-integer and quadratic programs.
//!
//! Portfolio models are assembled as solver-neutral [`Model`]s and handed to
//! a [`Solver`] backend. The core never depends on a concrete solver.
//!
//! # Overview
//!
//! - [`Solver`]: backend interface (blocking solve under a time/thread budget)
//! - [`Model`]: variables, objective and named constraints
//! - [`RawSolution`]: what a backend reports back
//! - [`HighsSolver`]: HiGHS via `good_lp`, linear models only

mod highs;
mod model;
mod mps;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use highs::HighsSolver;
pub use model::{
    Constraint, ConstraintSense, Expr, Model, Objective, ObjectiveSense, VarBlock, VarKind,
    Variable, VariableBounds,
};

use crate::error::Result;

/// Mixed-integer / quadratic programming solver.
///
/// Implementations wrap specific solver backends and must be thread-safe
/// (`Send + Sync`) so independent problems can share one instance.
pub trait Solver: Send + Sync {
    /// Return the solver name for logging and configuration.
    fn name(&self) -> &'static str;

    /// Optimize `model`, blocking until the solver stops.
    ///
    /// Infeasible, unbounded and time-limited runs are reported through
    /// [`RawSolution::status`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot represent the model or fails
    /// internally.
    fn solve(&self, model: &Model, options: &SolveOptions) -> Result<RawSolution>;
}

/// Budget and verbosity for a single solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Wall-clock limit in seconds.
    pub time_limit_secs: f64,
    /// Solver thread count.
    pub threads: usize,
    /// Let the backend print its own log and report nonzero holdings.
    pub verbose: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit_secs: 1e6,
            threads: 1,
            verbose: false,
        }
    }
}

/// Termination status of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Proven optimal.
    Optimal,
    /// No feasible point, or the objective is unbounded.
    InfeasibleOrUnbounded,
    /// Stopped at the time limit, possibly with an incumbent.
    TimeLimit,
    /// Any other termination, with the backend's status code.
    Other(i32),
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::InfeasibleOrUnbounded => write!(f, "infeasible or unbounded"),
            Self::TimeLimit => write!(f, "time limit reached"),
            Self::Other(code) => write!(f, "other (backend status {code})"),
        }
    }
}

/// Backend output before extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSolution {
    pub status: SolveStatus,
    pub runtime: Duration,
    /// Objective of the incumbent, if any.
    pub objective: Option<f64>,
    /// Best proven bound, when the backend reports one.
    pub objective_bound: Option<f64>,
    /// Relative MIP gap, when the backend reports one.
    pub mip_gap: Option<f64>,
    /// One value per model column; empty without an incumbent.
    pub values: Vec<f64>,
}

impl RawSolution {
    /// A run that ended without an incumbent.
    pub fn without_incumbent(status: SolveStatus, runtime: Duration) -> Self {
        Self {
            status,
            runtime,
            objective: None,
            objective_bound: None,
            mip_gap: None,
            values: Vec::new(),
        }
    }

    pub fn has_incumbent(&self) -> bool {
        self.status != SolveStatus::InfeasibleOrUnbounded && self.objective.is_some()
    }
}
