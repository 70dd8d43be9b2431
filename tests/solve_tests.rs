mod support;

use std::sync::Arc;

use lotfolio::error::{Error, SolverError};
use lotfolio::problem::{Parameters, PortfolioProblem, Variant};
use lotfolio::solver::{HighsSolver, RawSolution, SolveOptions, SolveStatus};
use lotfolio::testkit::{data, solver::optimal, solver::ScriptedSolver};

use support::assertions::{assert_feasible, assert_integral};

fn problem(variant: Variant, params: Parameters) -> PortfolioProblem {
    PortfolioProblem::new(Arc::new(data::three_securities()), variant, params).unwrap()
}

fn small_capital() -> Parameters {
    Parameters {
        capital: 100.0,
        p_max: 0.5,
        w_min: 0.0,
        mu: 0.0,
        ..Parameters::default()
    }
}

// nl[3], a[2], b[2]
const MAD_VALUES: [f64; 7] = [1.0 + 1e-12, 0.0, 1e-13, 0.0, 0.001, 0.001, 0.0];

#[test]
fn extraction_rounds_lots_and_copies_auxiliary() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let solver = ScriptedSolver::new().with_optimal(MAD_VALUES.to_vec(), 0.001);

    let solution = p.solve(&solver, &SolveOptions::default()).unwrap();

    assert_eq!(solution.status, SolveStatus::Optimal);
    assert_eq!(solution.universe_size, 3);
    assert_eq!(solution.cardinality_limit, None);
    let values = solution.values().unwrap();
    assert_eq!(values.lots, vec![1.0, 0.0, 0.0]);
    assert_eq!(values.selection, None);
    assert_eq!(values.selected_count, None);
    assert_eq!(values.total_lots, 1.0);
    assert_eq!(values.auxiliary["a"], vec![0.0, 0.001]);
    assert_eq!(values.auxiliary["b"], vec![0.001, 0.0]);
    assert_eq!(values.objective_bound, Some(0.001));

    assert_eq!(p.last_solved(), Some(values));
    assert_eq!(solver.calls(), 1);
    assert_eq!(solver.models()[0].name(), "MAD Risk Minimization");
}

#[test]
fn extraction_counts_selected_securities() {
    let params = Parameters { k: 2, ..small_capital() };
    let mut p = problem(Variant::MeanVarianceRiskMinimization, params);
    // nl[3], y[3]
    let solver = ScriptedSolver::new()
        .with_optimal(vec![2.0, 0.0, 1.0, 1.0, 0.0, 1.0], 0.05);

    let solution = p.solve(&solver, &SolveOptions::default()).unwrap();
    let values = solution.values().unwrap();

    assert_eq!(solution.cardinality_limit, Some(2));
    assert_eq!(values.selection, Some(vec![1.0, 0.0, 1.0]));
    assert_eq!(values.selected_count, Some(2));
    assert_eq!(values.total_lots, 3.0);
    assert!(values.auxiliary.is_empty());
}

#[test]
fn infeasible_run_has_status_only() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let solver = ScriptedSolver::new().with_status(SolveStatus::InfeasibleOrUnbounded);

    let solution = p.solve(&solver, &SolveOptions::default()).unwrap();

    assert_eq!(solution.status, SolveStatus::InfeasibleOrUnbounded);
    assert!(solution.values().is_none());
    assert!(p.last_solved().is_none());
}

#[test]
fn backend_status_code_is_kept() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let solver = ScriptedSolver::new().with_status(SolveStatus::Other(13));

    let solution = p.solve(&solver, &SolveOptions::default()).unwrap();

    assert_eq!(solution.status, SolveStatus::Other(13));
    assert!(solution.values().is_none());
    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["status"], serde_json::json!({ "other": 13 }));
}

#[test]
fn time_limit_keeps_incumbent() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let raw = RawSolution {
        status: SolveStatus::TimeLimit,
        objective_bound: None,
        mip_gap: None,
        ..optimal(MAD_VALUES.to_vec(), 0.001)
    };
    let solver = ScriptedSolver::new().with_result(Ok(raw));

    let solution = p.solve(&solver, &SolveOptions::default()).unwrap();

    assert_eq!(solution.status, SolveStatus::TimeLimit);
    assert!(!solution.is_optimal());
    let values = solution.values().unwrap();
    assert_eq!(values.objective, 0.001);
    assert_eq!(values.objective_bound, None);
}

#[test]
fn fractional_lots_fail_integrality() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let mut fractional = MAD_VALUES.to_vec();
    fractional[0] = 1.5;
    let solver = ScriptedSolver::new()
        .with_optimal(MAD_VALUES.to_vec(), 0.001)
        .with_optimal(fractional, 0.001);

    let first = p.solve(&solver, &SolveOptions::default()).unwrap();
    let result = p.solve(&solver, &SolveOptions::default());

    assert!(matches!(
        result,
        Err(Error::IntegralityTolerance { ref variable, .. }) if variable == "nl"
    ));
    // The cache still holds the last good extraction.
    assert_eq!(p.last_solved(), first.values());
}

#[test]
fn wrong_value_count_is_a_solver_error() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let solver = ScriptedSolver::new().with_optimal(vec![1.0, 0.0, 0.0], 0.0);

    assert!(matches!(
        p.solve(&solver, &SolveOptions::default()),
        Err(Error::Solver(SolverError::ValueCount {
            expected: 7,
            actual: 3
        }))
    ));
}

#[test]
fn backend_errors_propagate() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let solver = ScriptedSolver::new();

    assert!(matches!(
        p.solve(&solver, &SolveOptions::default()),
        Err(Error::Solver(SolverError::Backend(_)))
    ));
}

#[test]
fn options_reach_the_solver() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let solver = ScriptedSolver::new().with_optimal(MAD_VALUES.to_vec(), 0.001);
    let options = SolveOptions {
        time_limit_secs: 2.5,
        threads: 4,
        verbose: true,
    };

    p.solve(&solver, &options).unwrap();
    assert_eq!(solver.options(), vec![options]);
}

#[test]
fn unimplemented_variant_never_reaches_the_solver() {
    let mut p = problem(Variant::MadReturnMaximization, small_capital());
    let solver = ScriptedSolver::new().with_optimal(MAD_VALUES.to_vec(), 0.0);

    assert!(matches!(
        p.solve(&solver, &SolveOptions::default()),
        Err(Error::NotImplementedVariant {
            variant: Variant::MadReturnMaximization
        })
    ));
    assert_eq!(solver.calls(), 0);
}

#[test]
fn solution_serializes_flat() {
    let mut p = problem(Variant::MadRiskMinimization, small_capital());
    let solver = ScriptedSolver::new().with_optimal(MAD_VALUES.to_vec(), 0.001);
    let solution = p.solve(&solver, &SolveOptions::default()).unwrap();

    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["status"], "optimal");
    assert_eq!(json["variant"], "mad-risk-minimization");
    assert_eq!(json["lots"], serde_json::json!([1.0, 0.0, 0.0]));
    assert!(json.get("selection").is_none());
    assert!(json["runtime_secs"].is_number());
}

#[test]
fn highs_solves_mad_risk_minimization() {
    let params = Parameters {
        w_min: 0.5,
        ..small_capital()
    };
    let mut p = problem(Variant::MadRiskMinimization, params);
    let options = SolveOptions {
        time_limit_secs: 60.0,
        ..SolveOptions::default()
    };

    let solution = p.solve(&HighsSolver::new(), &options).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);

    let values = solution.values().unwrap();
    assert_integral(&values.lots);
    assert!(values.objective >= -1e-9);
    let gap = values.mip_gap.expect("HiGHS reports the MIP gap");
    assert!((0.0..=1e-4).contains(&gap));
    let bound = values.objective_bound.expect("HiGHS reports the dual bound");
    assert!(bound <= values.objective + 1e-9);

    let built = p.build_model().unwrap();
    let mut assignment = vec![0.0; built.model.num_vars()];
    for (i, lots) in values.lots.iter().enumerate() {
        assignment[built.lots.at(i)] = *lots;
    }
    for block in &built.auxiliary {
        for (i, v) in values.auxiliary[block.name()].iter().enumerate() {
            assignment[block.at(i)] = *v;
        }
    }
    assert_feasible(&built.model, &assignment, 1e-6);
}

#[test]
fn highs_reports_infeasible_investment_floor() {
    // Every weight is capped at 0.1, so 90% can never be invested.
    let params = Parameters {
        p_max: 0.1,
        w_min: 0.9,
        ..small_capital()
    };
    let mut p = problem(Variant::MadRiskMinimization, params);

    let solution = p.solve(&HighsSolver::new(), &SolveOptions::default()).unwrap();
    assert_eq!(solution.status, SolveStatus::InfeasibleOrUnbounded);
    assert!(solution.values().is_none());
}

#[test]
fn highs_reports_time_limit_without_incumbent() {
    let dataset = Arc::new(data::synthetic(60, 120));
    let params = Parameters {
        mu: 0.0,
        ..Parameters::default()
    };
    let mut p = PortfolioProblem::new(dataset, Variant::MadRiskMinimization, params).unwrap();
    let options = SolveOptions {
        time_limit_secs: 1e-9,
        ..SolveOptions::default()
    };

    let solution = p.solve(&HighsSolver::new(), &options).unwrap();
    assert_eq!(solution.status, SolveStatus::TimeLimit);
    assert!(!solution.is_optimal());
}

#[test]
fn highs_rejects_quadratic_models() {
    let mut p = problem(Variant::MeanVarianceRiskMinimization, Parameters::default());

    assert!(matches!(
        p.solve(&HighsSolver::new(), &SolveOptions::default()),
        Err(Error::Solver(SolverError::Unsupported { .. }))
    ));
}
