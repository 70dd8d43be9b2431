//! Solution extraction and integrality checks.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::info;

use super::{PortfolioModel, Variant};
use crate::error::{Error, Result, SolverError};
use crate::solver::{RawSolution, SolveStatus, VarBlock};

/// Largest Euclidean distance to the nearest integer vector [`round_check`] accepts.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-9;

/// Round `values` to the nearest integers, failing if they were not already
/// integral within [`INTEGRALITY_TOLERANCE`] (Euclidean norm).
pub fn round_check(variable: &str, values: &[f64]) -> Result<Vec<f64>> {
    let rounded: Vec<f64> = values.iter().map(|v| v.round()).collect();
    let deviation = values
        .iter()
        .zip(&rounded)
        .map(|(v, r)| (v - r) * (v - r))
        .sum::<f64>()
        .sqrt();
    if !(deviation <= INTEGRALITY_TOLERANCE) {
        return Err(Error::IntegralityTolerance {
            variable: variable.to_string(),
            deviation,
        });
    }
    Ok(rounded)
}

/// Objective and variable values of a run that produced an incumbent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvedValues {
    pub objective: f64,
    pub objective_bound: Option<f64>,
    pub mip_gap: Option<f64>,
    /// Rounded lot counts `nl`.
    pub lots: Vec<f64>,
    /// Rounded selection indicators `y`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Vec<f64>>,
    /// Continuous helper blocks by name, unrounded.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub auxiliary: BTreeMap<String, Vec<f64>>,
    /// `‖y‖₀`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_count: Option<usize>,
    /// `‖nl‖₁`.
    pub total_lots: f64,
}

impl SolvedValues {
    /// Nonzero lot counts paired with their security.
    pub fn holdings<'a>(&'a self, securities: &'a [String]) -> impl Iterator<Item = (&'a str, f64)> {
        securities
            .iter()
            .zip(&self.lots)
            .filter(|(_, lots)| **lots != 0.0)
            .map(|(s, lots)| (s.as_str(), *lots))
    }
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub variant: Variant,
    pub status: SolveStatus,
    #[serde(rename = "runtime_secs", serialize_with = "as_secs")]
    pub runtime: Duration,
    pub universe_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality_limit: Option<usize>,
    #[serde(flatten)]
    values: Option<SolvedValues>,
}

impl Solution {
    /// Objective and variables, absent when the run found no incumbent.
    pub fn values(&self) -> Option<&SolvedValues> {
        self.values.as_ref()
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

fn as_secs<S: Serializer>(runtime: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(runtime.as_secs_f64())
}

fn block_values<'a>(block: &VarBlock, values: &'a [f64]) -> Result<&'a [f64]> {
    block.slice(values).ok_or_else(|| {
        SolverError::ValueCount {
            expected: block.columns().end,
            actual: values.len(),
        }
        .into()
    })
}

/// Turn raw backend output into a [`Solution`].
pub(super) fn extract(
    variant: Variant,
    built: &PortfolioModel,
    raw: RawSolution,
    securities: &[String],
    cardinality_limit: Option<usize>,
    verbose: bool,
) -> Result<Solution> {
    let mut solution = Solution {
        variant,
        status: raw.status,
        runtime: raw.runtime,
        universe_size: built.lots.len(),
        cardinality_limit,
        values: None,
    };

    let objective = match raw.objective {
        Some(objective) if raw.has_incumbent() => objective,
        _ => {
            info!(
                model = %variant,
                status = %raw.status,
                runtime_secs = raw.runtime.as_secs_f64(),
                "solve finished without a solution"
            );
            return Ok(solution);
        }
    };

    let expected = built.model.num_vars();
    if raw.values.len() != expected {
        return Err(SolverError::ValueCount {
            expected,
            actual: raw.values.len(),
        }
        .into());
    }

    let lots = round_check(built.lots.name(), block_values(&built.lots, &raw.values)?)?;
    let selection = built
        .selection
        .as_ref()
        .map(|y| round_check(y.name(), block_values(y, &raw.values)?))
        .transpose()?;
    let auxiliary = built
        .auxiliary
        .iter()
        .map(|block| Ok((block.name().to_string(), block_values(block, &raw.values)?.to_vec())))
        .collect::<Result<BTreeMap<_, _>>>()?;

    let selected_count = selection
        .as_ref()
        .map(|y| y.iter().filter(|v| **v != 0.0).count());
    let total_lots = lots.iter().map(|v| v.abs()).sum();

    if verbose {
        if let Some(y) = &selection {
            for (security, _) in securities.iter().zip(y).filter(|(_, v)| **v != 0.0) {
                info!(security = %security, "selected");
            }
        }
        for (security, n) in securities.iter().zip(&lots).filter(|(_, v)| **v != 0.0) {
            info!(security = %security, lots = n, "holding");
        }
    }

    info!(
        model = %variant,
        status = %raw.status,
        runtime_secs = raw.runtime.as_secs_f64(),
        objective,
        objective_bound = ?raw.objective_bound,
        selected = ?selected_count,
        total_lots,
        "solve finished"
    );

    solution.values = Some(SolvedValues {
        objective,
        objective_bound: raw.objective_bound,
        mip_gap: raw.mip_gap,
        lots,
        selection,
        auxiliary,
        selected_count,
        total_lots,
    });
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_check_accepts_near_integers() {
        let rounded = round_check("nl", &[1.0 + 1e-12, 2.0, -0.0, 3.0 - 1e-11]).unwrap();
        assert_eq!(rounded, vec![1.0, 2.0, 0.0, 3.0]);
    }

    #[test]
    fn test_round_check_is_idempotent() {
        let once = round_check("nl", &[4.0000000000001, 7.0]).unwrap();
        let twice = round_check("nl", &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_round_check_uses_euclidean_norm() {
        // Each entry is within tolerance, the vector is not.
        let values = vec![1.0 + 8e-10; 4];
        let err = round_check("y", &values).unwrap_err();
        match err {
            Error::IntegralityTolerance { variable, deviation } => {
                assert_eq!(variable, "y");
                assert!(deviation > INTEGRALITY_TOLERANCE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_round_check_rejects_nan() {
        assert!(round_check("nl", &[f64::NAN]).is_err());
    }

    #[test]
    fn test_holdings_skip_zero_lots() {
        let values = SolvedValues {
            objective: 0.0,
            objective_bound: None,
            mip_gap: None,
            lots: vec![0.0, 3.0, 1.0],
            selection: None,
            auxiliary: BTreeMap::new(),
            selected_count: None,
            total_lots: 4.0,
        };
        let securities = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let held: Vec<_> = values.holdings(&securities).collect();
        assert_eq!(held, vec![("BBB", 3.0), ("CCC", 1.0)]);
    }
}
