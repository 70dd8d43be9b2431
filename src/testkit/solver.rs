//! Scripted [`Solver`] implementations for testing.
//!
//! [`ScriptedSolver`] pops pre-loaded results, one per `solve()` call, and
//! records the models it was handed. Use it to drive extraction paths
//! (infeasible, time limit, fractional values) without a real backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, SolverError};
use crate::solver::{Model, RawSolution, SolveOptions, SolveStatus, Solver};

/// A mock solver with a fixed queue of results.
///
/// Once the queue is exhausted every call fails with
/// [`SolverError::Backend`].
#[derive(Default)]
pub struct ScriptedSolver {
    results: Mutex<VecDeque<Result<RawSolution>>>,
    models: Mutex<Vec<Model>>,
    options: Mutex<Vec<SolveOptions>>,
    calls: AtomicU32,
}

impl ScriptedSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, result: Result<RawSolution>) -> Self {
        if let Ok(mut results) = self.results.lock() {
            results.push_back(result);
        }
        self
    }

    /// Queue an optimal run with the given column values and objective.
    pub fn with_optimal(self, values: Vec<f64>, objective: f64) -> Self {
        self.with_result(Ok(optimal(values, objective)))
    }

    /// Queue a run that ended with `status` and no incumbent.
    pub fn with_status(self, status: SolveStatus) -> Self {
        self.with_result(Ok(RawSolution::without_incumbent(
            status,
            Duration::from_millis(5),
        )))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Models received so far, in call order.
    pub fn models(&self) -> Vec<Model> {
        self.models.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Options received so far, in call order.
    pub fn options(&self) -> Vec<SolveOptions> {
        self.options.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl Solver for ScriptedSolver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn solve(&self, model: &Model, options: &SolveOptions) -> Result<RawSolution> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut models) = self.models.lock() {
            models.push(model.clone());
        }
        if let Ok(mut seen) = self.options.lock() {
            seen.push(*options);
        }
        self.results
            .lock()
            .ok()
            .and_then(|mut results| results.pop_front())
            .unwrap_or_else(|| Err(SolverError::Backend("script exhausted".into()).into()))
    }
}

/// An optimal [`RawSolution`] with zero gap.
pub fn optimal(values: Vec<f64>, objective: f64) -> RawSolution {
    RawSolution {
        status: SolveStatus::Optimal,
        runtime: Duration::from_millis(5),
        objective: Some(objective),
        objective_bound: Some(objective),
        mip_gap: Some(0.0),
        values,
    }
}
