//! Portfolio selection problems.
//!
//! A [`PortfolioProblem`] binds a shared [`MarketDataset`] to a set of
//! [`Parameters`] and one [`Formulation`]. It derives the lot-weighted
//! quantities every model needs, builds the solver-neutral model and is the
//! single place a [`Solver`] is called from.
//!
//! # Overview
//!
//! - [`Variant`]: which of the four models to build
//! - [`Formulation`]: model construction for one variant
//! - [`PortfolioModel`]: a built model plus the variable blocks extraction reads
//! - [`Solution`]: extracted, integrality-checked result

mod mad;
mod mean_variance;
mod parameters;
mod solution;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{Array1, ArrayD, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use mad::{MadReturnMaximization, MadRiskMinimization};
pub use mean_variance::{MeanVarianceReturnMaximization, MeanVarianceRiskMinimization};
pub use parameters::Parameters;
pub use solution::{round_check, Solution, SolvedValues, INTEGRALITY_TOLERANCE};

use crate::data::{dump, MarketDataset};
use crate::error::Result;
use crate::solver::{ConstraintSense, Expr, Model, SolveOptions, Solver, VarBlock};

/// The four portfolio models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    MadRiskMinimization,
    MadReturnMaximization,
    MeanVarianceRiskMinimization,
    MeanVarianceReturnMaximization,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Self::MadRiskMinimization,
        Self::MadReturnMaximization,
        Self::MeanVarianceRiskMinimization,
        Self::MeanVarianceReturnMaximization,
    ];

    /// Model name as written into the solver model and MPS files.
    pub fn model_name(self) -> &'static str {
        match self {
            Self::MadRiskMinimization => "MAD Risk Minimization",
            Self::MadReturnMaximization => "MAD Return Maximization",
            Self::MeanVarianceRiskMinimization => "Mean-Variance Risk Minimization",
            Self::MeanVarianceReturnMaximization => "Mean-Variance Return Maximization",
        }
    }

    /// Short identifier used on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Self::MadRiskMinimization => "mad-risk-min",
            Self::MadReturnMaximization => "mad-return-max",
            Self::MeanVarianceRiskMinimization => "mv-risk-min",
            Self::MeanVarianceReturnMaximization => "mv-return-max",
        }
    }

    /// Mean-Variance models carry a selection block and a cardinality limit.
    pub fn is_mean_variance(self) -> bool {
        matches!(
            self,
            Self::MeanVarianceRiskMinimization | Self::MeanVarianceReturnMaximization
        )
    }

    /// The formulation that builds this variant.
    pub fn formulation(self) -> Box<dyn Formulation> {
        match self {
            Self::MadRiskMinimization => Box::new(MadRiskMinimization),
            Self::MadReturnMaximization => Box::new(MadReturnMaximization),
            Self::MeanVarianceRiskMinimization => Box::new(MeanVarianceRiskMinimization),
            Self::MeanVarianceReturnMaximization => Box::new(MeanVarianceReturnMaximization),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.key() == s)
            .ok_or_else(|| {
                let keys: Vec<&str> = Self::ALL.iter().map(|v| v.key()).collect();
                format!("unknown model '{s}', expected one of: {}", keys.join(", "))
            })
    }
}

/// Model construction for one [`Variant`].
///
/// Implementations read the problem's dataset and parameters and never call
/// a solver.
pub trait Formulation: Send + Sync + fmt::Debug {
    fn variant(&self) -> Variant;

    /// Build the optimization model.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotImplementedVariant`](crate::error::Error::NotImplementedVariant)
    /// for variants without a formulation, and with
    /// [`Error::AsymmetricCovariance`](crate::error::Error::AsymmetricCovariance)
    /// when a scaled covariance loses symmetry.
    fn build_model(&self, problem: &PortfolioProblem) -> Result<PortfolioModel>;

    /// Named derived arrays for the binary dump.
    fn derived_arrays(&self, problem: &PortfolioProblem) -> Result<Vec<(&'static str, ArrayD<f64>)>>;
}

/// A built model and the blocks extraction reads back.
#[derive(Debug, Clone)]
pub struct PortfolioModel {
    pub model: Model,
    /// Lot counts `nl[W]`.
    pub lots: VarBlock,
    /// Selection indicators `y[W]`, Mean-Variance only.
    pub selection: Option<VarBlock>,
    /// Continuous helper blocks copied unrounded (`a`, `b` for MAD).
    pub auxiliary: Vec<VarBlock>,
}

/// One portfolio model over a shared dataset.
#[derive(Debug)]
pub struct PortfolioProblem {
    dataset: Arc<MarketDataset>,
    params: Parameters,
    formulation: Box<dyn Formulation>,
    last_solved: Option<SolvedValues>,
}

impl PortfolioProblem {
    /// Bind `dataset` to a variant with its own copy of `params`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `params` fail validation.
    pub fn new(dataset: Arc<MarketDataset>, variant: Variant, params: Parameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            dataset,
            params,
            formulation: variant.formulation(),
            last_solved: None,
        })
    }

    pub fn variant(&self) -> Variant {
        self.formulation.variant()
    }

    pub fn name(&self) -> &'static str {
        self.variant().model_name()
    }

    pub fn dataset(&self) -> &MarketDataset {
        &self.dataset
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Replace this problem's parameters.
    pub fn set_parameters(&mut self, params: Parameters) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Number of securities `W`.
    pub fn universe_size(&self) -> usize {
        self.dataset.universe_size()
    }

    pub fn capital(&self) -> f64 {
        self.params.capital
    }

    /// Cardinality limit `K`, Mean-Variance only.
    pub fn cardinality_limit(&self) -> Option<usize> {
        self.variant().is_mean_variance().then_some(self.params.k)
    }

    /// Capital share bought by one lot of each security at the latest close:
    /// `gr = lot_size ⊙ close[0] / capital`.
    pub fn lot_weighted_price_ratio(&self) -> Array1<f64> {
        let latest = self.dataset.close().row(0);
        &latest * self.dataset.lot_size() / self.params.capital
    }

    /// Mean return per security over all periods, optionally scaled
    /// element-wise by `ratio`.
    pub fn expected_return(&self, ratio: Option<&Array1<f64>>) -> Array1<f64> {
        let returns = self.dataset.returns();
        let plain = returns.sum_axis(Axis(0)) / returns.nrows() as f64;
        match ratio {
            Some(ratio) => plain * ratio,
            None => plain,
        }
    }

    /// Build this problem's model without solving it.
    pub fn build_model(&self) -> Result<PortfolioModel> {
        self.formulation.build_model(self)
    }

    /// Values from the most recent successful extraction.
    pub fn last_solved(&self) -> Option<&SolvedValues> {
        self.last_solved.as_ref()
    }

    /// Write the model in free MPS format.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let built = self.build_model()?;
        built.model.write_mps(path.as_ref())?;
        info!(
            model = self.name(),
            path = %path.as_ref().display(),
            variables = built.model.num_vars(),
            constraints = built.model.constraints().len(),
            "wrote MPS model"
        );
        Ok(())
    }

    /// Dump the derived arrays as `<dir>/<name>.bin`.
    pub fn save_bin<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let arrays = self.formulation.derived_arrays(self)?;
        let paths = dump::save_arrays(
            dir.as_ref(),
            arrays.iter().map(|(name, array)| (*name, array.view())),
        )?;
        info!(model = self.name(), dir = %dir.as_ref().display(), files = paths.len(), "saved derived arrays");
        Ok(paths)
    }

    /// Build, solve and extract.
    ///
    /// Infeasible, unbounded and time-limited runs come back as a
    /// [`Solution`] status; errors are reserved for model construction,
    /// backend failures and integrality violations.
    pub fn solve(&mut self, solver: &dyn Solver, options: &SolveOptions) -> Result<Solution> {
        let built = self.build_model()?;
        info!(
            model = self.name(),
            solver = solver.name(),
            securities = self.universe_size(),
            variables = built.model.num_vars(),
            constraints = built.model.constraints().len(),
            time_limit_secs = options.time_limit_secs,
            threads = options.threads,
            "solving"
        );

        let raw = solver.solve(&built.model, options)?;
        let solution = solution::extract(
            self.variant(),
            &built,
            raw,
            self.dataset.securities(),
            self.cardinality_limit(),
            options.verbose,
        )?;

        if let Some(values) = solution.values() {
            self.last_solved = Some(values.clone());
        }
        Ok(solution)
    }
}

/// `w_sum_max` and `w_sum_min`: invest between `w_min` and all of the capital.
fn add_budget(model: &mut Model, lots: &VarBlock, gr: &Array1<f64>, params: &Parameters) {
    let invested = Expr::dot(lots, gr.view());
    model.add_constraint("w_sum_max", invested.clone(), ConstraintSense::LessEqual, 1.0);
    model.add_constraint("w_sum_min", invested, ConstraintSense::GreaterEqual, params.w_min);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::data;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_lot_weighted_price_ratio() {
        let params = Parameters {
            capital: 100.0,
            ..Parameters::default()
        };
        let problem =
            PortfolioProblem::new(Arc::new(data::three_securities()), Variant::MadRiskMinimization, params)
                .unwrap();

        let gr = problem.lot_weighted_price_ratio();
        assert_relative_eq!(gr, array![0.10, 0.20, 0.50], epsilon = 1e-12);
    }

    #[test]
    fn test_expected_return_scaling() {
        let problem = PortfolioProblem::new(
            Arc::new(data::three_securities()),
            Variant::MadRiskMinimization,
            Parameters::default(),
        )
        .unwrap();

        let plain = problem.expected_return(None);
        let ratio = array![2.0, 0.0, 1.0];
        let scaled = problem.expected_return(Some(&ratio));
        assert_relative_eq!(scaled, &plain * &ratio, epsilon = 1e-15);
        // rows [0.01, 0.02, -0.01] and [0.03, 0.00, 0.01]
        assert_relative_eq!(plain, array![0.02, 0.01, 0.0], epsilon = 1e-15);
    }

    #[test]
    fn test_parameters_are_per_problem() {
        let dataset = Arc::new(data::three_securities());
        let mut first =
            PortfolioProblem::new(dataset.clone(), Variant::MadRiskMinimization, Parameters::default())
                .unwrap();
        let second =
            PortfolioProblem::new(dataset, Variant::MadRiskMinimization, Parameters::default()).unwrap();

        first
            .set_parameters(Parameters {
                w_min: 0.5,
                ..Parameters::default()
            })
            .unwrap();

        assert_eq!(first.parameters().w_min, 0.5);
        assert_eq!(second.parameters().w_min, 0.9);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let params = Parameters {
            p_max: 0.0,
            ..Parameters::default()
        };
        let result =
            PortfolioProblem::new(Arc::new(data::three_securities()), Variant::MadRiskMinimization, params);
        assert!(matches!(result, Err(crate::error::Error::Config(_))));
    }

    #[test]
    fn test_variant_keys_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(variant.key().parse::<Variant>(), Ok(variant));
        }
        assert!("cvar".parse::<Variant>().is_err());
        assert_eq!(
            Variant::MeanVarianceRiskMinimization.to_string(),
            "Mean-Variance Risk Minimization"
        );
    }

    #[test]
    fn test_cardinality_limit_only_for_mean_variance() {
        let dataset = Arc::new(data::three_securities());
        let mad =
            PortfolioProblem::new(dataset.clone(), Variant::MadRiskMinimization, Parameters::default())
                .unwrap();
        let mv = PortfolioProblem::new(
            dataset,
            Variant::MeanVarianceRiskMinimization,
            Parameters::default(),
        )
        .unwrap();
        assert_eq!(mad.cardinality_limit(), None);
        assert_eq!(mv.cardinality_limit(), Some(20));
    }
}
