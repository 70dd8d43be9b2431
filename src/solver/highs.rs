//! HiGHS solver implementation via good_lp.
//!
//! HiGHS is a high-performance open-source linear/mixed-integer programming solver.
//! good_lp assembles the column/row problem; the solve itself runs on the underlying
//! `highs::Model` so that model status, MIP gap and dual bound come straight from HiGHS.
//! good_lp exposes no quadratic terms, so quadratic models are rejected; write
//! them out with [`Model::write_mps`] and solve them offline instead.

use std::time::Instant;

use good_lp::solvers::highs::highs;
use good_lp::{constraint, variable, variables, Expression, SolverModel};
use highs::{HighsModelStatus, HighsSolutionStatus, SolvedModel};
use tracing::{debug, warn};

use super::model::{ConstraintSense, Expr, Model, ObjectiveSense, VarKind};
use super::{RawSolution, SolveOptions, SolveStatus, Solver};
use crate::error::{Result, SolverError};

/// HiGHS-based MILP solver.
#[derive(Debug, Default, Clone)]
pub struct HighsSolver;

impl HighsSolver {
    /// Create a new HiGHS solver instance.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(&self, model: &Model, options: &SolveOptions) -> Result<RawSolution> {
        if model.is_quadratic() {
            return Err(SolverError::Unsupported {
                solver: self.name(),
                reason: "quadratic objective or constraints".into(),
            }
            .into());
        }
        solve_with_good_lp(model, options)
    }
}

/// Internal solver implementation using good_lp.
fn solve_with_good_lp(model: &Model, options: &SolveOptions) -> Result<RawSolution> {
    let n = model.num_vars();

    // Handle empty problem
    if n == 0 {
        return Ok(RawSolution {
            status: SolveStatus::Optimal,
            runtime: Default::default(),
            objective: Some(0.0),
            objective_bound: None,
            mip_gap: None,
            values: vec![],
        });
    }

    // Create variables
    let mut vars = variables!();
    let mut var_list = Vec::with_capacity(n);

    for spec in model.variables() {
        let mut v = variable().name(spec.name.clone());

        match spec.kind {
            VarKind::Binary => v = v.binary(),
            VarKind::Integer => v = v.integer(),
            VarKind::Continuous => {}
        }

        // Apply bounds
        if let Some(lb) = spec.bounds.lower {
            v = v.min(lb);
        }
        if let Some(ub) = spec.bounds.upper {
            v = v.max(ub);
        }

        var_list.push(vars.add(v));
    }

    let objective = linear(&model.objective().expr, &var_list);
    let unsolved = match model.objective().sense {
        ObjectiveSense::Minimize => vars.minimise(objective),
        ObjectiveSense::Maximize => vars.maximise(objective),
    };
    let mut problem = unsolved.using(highs);

    // Add constraints
    for constr in model.constraints() {
        let lhs = linear(&constr.expr, &var_list);
        let rhs = constr.rhs;

        match constr.sense {
            ConstraintSense::GreaterEqual => {
                problem = problem.with(constraint!(lhs >= rhs));
            }
            ConstraintSense::LessEqual => {
                problem = problem.with(constraint!(lhs <= rhs));
            }
            ConstraintSense::Equal => {
                problem = problem.with(constraint!(lhs == rhs));
            }
        }
    }

    let mut highs_model = problem
        .try_into_inner()
        .map_err(|e| SolverError::Backend(e.to_string()))?;
    let threads = i32::try_from(options.threads.max(1)).unwrap_or(i32::MAX);
    set_option(&mut highs_model, "time_limit", options.time_limit_secs)?;
    set_option(&mut highs_model, "threads", threads)?;
    if options.verbose {
        set_option(&mut highs_model, "output_flag", true)?;
        set_option(&mut highs_model, "log_to_console", true)?;
    }

    debug!(
        model = model.name(),
        variables = n,
        constraints = model.constraints().len(),
        "handing model to HiGHS"
    );

    // Solve
    let started = Instant::now();
    let solved = highs_model
        .try_solve()
        .map_err(|status| SolverError::Backend(format!("HiGHS run failed: {status:?}")))?;
    let runtime = started.elapsed();

    let model_status = solved.status();
    let status = map_status(model_status);
    if let SolveStatus::Other(code) = status {
        warn!(code, status = ?model_status, "HiGHS stopped without a definite result");
    }

    if solved.primal_solution_status() != HighsSolutionStatus::Feasible {
        return Ok(RawSolution::without_incumbent(status, runtime));
    }

    let values = solved.get_solution().columns().to_vec();
    let discrete = model.variables().iter().any(|v| v.kind.is_discrete());
    let (objective_bound, mip_gap) = if discrete {
        (
            mip_info(&solved, c"mip_dual_bound"),
            mip_info(&solved, c"mip_gap"),
        )
    } else {
        (None, None)
    };

    Ok(RawSolution {
        status,
        runtime,
        objective: Some(solved.objective_value()),
        objective_bound,
        mip_gap,
        values,
    })
}

fn map_status(status: HighsModelStatus) -> SolveStatus {
    match status {
        HighsModelStatus::Optimal => SolveStatus::Optimal,
        HighsModelStatus::Infeasible
        | HighsModelStatus::Unbounded
        | HighsModelStatus::UnboundedOrInfeasible => SolveStatus::InfeasibleOrUnbounded,
        HighsModelStatus::ReachedTimeLimit => SolveStatus::TimeLimit,
        other => SolveStatus::Other(other as i32),
    }
}

/// A finite MIP info value; HiGHS reports infinities when it has none.
fn mip_info(solved: &SolvedModel, key: &std::ffi::CStr) -> Option<f64> {
    solved.double_info_value(key).ok().filter(|v| v.is_finite())
}

fn set_option<V: highs::HighsOptionValue>(
    model: &mut highs::Model,
    key: &str,
    value: V,
) -> Result<()> {
    model
        .try_set_option(key, value)
        .map_err(|_| SolverError::Backend(format!("HiGHS rejected option {key}")).into())
}

fn linear(expr: &Expr, var_list: &[good_lp::Variable]) -> Expression {
    expr.linear.iter().map(|&(col, coef)| coef * var_list[col]).sum()
}
