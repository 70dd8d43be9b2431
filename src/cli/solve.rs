//! Solve command: build, optimize and report a portfolio.

use anyhow::{Context, Result};
use tabled::Tabled;

use super::command::SolveArgs;
use super::output;
use crate::config::Config;
use crate::problem::{PortfolioProblem, Solution};
use crate::solver::HighsSolver;

#[derive(Tabled)]
struct HoldingRow {
    #[tabled(rename = "Security")]
    security: String,
    #[tabled(rename = "Lots")]
    lots: f64,
    #[tabled(rename = "Weight")]
    weight: String,
}

/// Execute `solve` with the HiGHS backend.
pub fn execute(config: &Config, args: &SolveArgs) -> Result<()> {
    let dataset = super::load_dataset(config, &args.universe)?;
    let mut problem = super::build_problem(config, dataset, &args.model)?;

    let mut options = config.solver.options();
    if let Some(limit) = args.time_limit {
        options.time_limit_secs = limit;
    }
    if let Some(threads) = args.threads {
        options.threads = if threads == 0 { num_cpus::get() } else { threads };
    }
    options.verbose |= args.verbose;

    let solution = problem
        .solve(&HighsSolver::new(), &options)
        .with_context(|| format!("failed to solve {}", problem.name()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&solution)?);
    } else {
        report(&problem, &solution);
    }
    Ok(())
}

fn report(problem: &PortfolioProblem, solution: &Solution) {
    output::section(problem.name());
    output::key_value("Status", solution.status);
    output::key_value("Runtime", format!("{:.3}s", solution.runtime.as_secs_f64()));
    output::key_value("Securities", solution.universe_size);
    if let Some(k) = solution.cardinality_limit {
        output::key_value("K", k);
    }

    let Some(values) = solution.values() else {
        output::warn("no solution available");
        return;
    };

    output::key_value("Objective", format!("{:.16e}", values.objective));
    output::key_value("Bound", output::optional(values.objective_bound));
    output::key_value("MIP gap", output::optional(values.mip_gap));
    if let Some(selected) = values.selected_count {
        output::key_value("Selected", selected);
    }
    output::key_value("Total lots", values.total_lots);

    let gr = problem.lot_weighted_price_ratio();
    let securities = problem.dataset().securities();
    let rows: Vec<HoldingRow> = values
        .holdings(securities)
        .map(|(security, lots)| {
            let weight = securities
                .iter()
                .position(|s| s == security)
                .map_or(0.0, |i| gr[i] * lots);
            HoldingRow {
                security: security.to_string(),
                lots,
                weight: format!("{:.2}%", weight * 100.0),
            }
        })
        .collect();

    if rows.is_empty() {
        output::warn("portfolio holds no securities");
    } else {
        output::section("Holdings");
        output::table(rows);
    }
}
