//! Mean-Variance models with cardinality-constrained selection.
//!
//! Both variants share the lot-scaled covariance `C = cov ⊙ (gr grᵀ)`, so
//! `nlᵀ C nl` is the variance of the portfolio's capital weights, and link
//! each lot count to a binary selection indicator through
//! `gr_i nl_i ≤ p_max y_i`.

use ndarray::{Array1, Array2, ArrayD, Axis};

use super::{add_budget, Formulation, PortfolioModel, PortfolioProblem, Variant};
use crate::data::check_symmetric;
use crate::error::{CovarianceStage, Result};
use crate::solver::{
    ConstraintSense, Expr, Model, ObjectiveSense, VarBlock, VarKind, VariableBounds,
};

/// `gr`, `rbar = rbar_plain ⊙ gr` and the scaled covariance `C`.
fn derived(problem: &PortfolioProblem) -> Result<(Array1<f64>, Array1<f64>, Array2<f64>)> {
    let gr = problem.lot_weighted_price_ratio();
    let rbar = problem.expected_return(Some(&gr));

    let column = gr.view().insert_axis(Axis(1));
    let row = gr.view().insert_axis(Axis(0));
    let c = problem.dataset().covariance() * &column.dot(&row);
    check_symmetric(&c, CovarianceStage::Scaled)?;

    Ok((gr, rbar, c))
}

fn mean_variance_arrays(problem: &PortfolioProblem) -> Result<Vec<(&'static str, ArrayD<f64>)>> {
    let (gr, rbar, c) = derived(problem)?;
    Ok(vec![
        ("gr", gr.into_dyn()),
        ("rbar", rbar.into_dyn()),
        ("covariance", c.into_dyn()),
    ])
}

/// Lot and selection blocks shared by both variants.
fn variables(model: &mut Model, w: usize) -> (VarBlock, VarBlock) {
    let nl = model.add_vars("nl", w, VarKind::Integer, VariableBounds::non_negative());
    let y = model.add_vars("y", w, VarKind::Binary, VariableBounds::binary());
    (nl, y)
}

/// `y_sum: Σy ≤ K` and `w_y_p_max[i]: gr_i nl_i − p_max y_i ≤ 0`.
fn add_selection(model: &mut Model, nl: &VarBlock, y: &VarBlock, gr: &Array1<f64>, p_max: f64, k: usize) {
    model.add_constraint("y_sum", Expr::sum(y), ConstraintSense::LessEqual, k as f64);
    for (i, &g) in gr.iter().enumerate() {
        model.add_constraint(
            format!("w_y_p_max[{i}]"),
            Expr::term(nl.at(i), g) + Expr::term(y.at(i), -p_max),
            ConstraintSense::LessEqual,
            0.0,
        );
    }
}

/// Minimize portfolio variance subject to a return floor and at most `K` holdings.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeanVarianceRiskMinimization;

impl Formulation for MeanVarianceRiskMinimization {
    fn variant(&self) -> Variant {
        Variant::MeanVarianceRiskMinimization
    }

    fn build_model(&self, problem: &PortfolioProblem) -> Result<PortfolioModel> {
        let params = problem.parameters();
        let (gr, rbar, c) = derived(problem)?;

        let mut model = Model::new(self.variant().model_name());
        let (nl, y) = variables(&mut model, problem.universe_size());

        model.set_objective(ObjectiveSense::Minimize, Expr::quad_form(&nl, &c));

        add_budget(&mut model, &nl, &gr, params);
        model.add_constraint(
            "w_rbar_mu",
            Expr::dot(&nl, rbar.view()),
            ConstraintSense::GreaterEqual,
            params.mu,
        );
        add_selection(&mut model, &nl, &y, &gr, params.p_max, params.k);

        Ok(PortfolioModel {
            model,
            lots: nl,
            selection: Some(y),
            auxiliary: Vec::new(),
        })
    }

    fn derived_arrays(&self, problem: &PortfolioProblem) -> Result<Vec<(&'static str, ArrayD<f64>)>> {
        mean_variance_arrays(problem)
    }
}

/// Maximize expected return subject to a variance limit and at most `K` holdings.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeanVarianceReturnMaximization;

impl Formulation for MeanVarianceReturnMaximization {
    fn variant(&self) -> Variant {
        Variant::MeanVarianceReturnMaximization
    }

    fn build_model(&self, problem: &PortfolioProblem) -> Result<PortfolioModel> {
        let params = problem.parameters();
        let (gr, rbar, c) = derived(problem)?;

        let mut model = Model::new(self.variant().model_name());
        let (nl, y) = variables(&mut model, problem.universe_size());

        model.set_objective(ObjectiveSense::Maximize, Expr::dot(&nl, rbar.view()));

        add_budget(&mut model, &nl, &gr, params);
        model.add_constraint(
            "w_C_w_sigma",
            Expr::quad_form(&nl, &c),
            ConstraintSense::LessEqual,
            params.sigma,
        );
        add_selection(&mut model, &nl, &y, &gr, params.p_max, params.k);

        Ok(PortfolioModel {
            model,
            lots: nl,
            selection: Some(y),
            auxiliary: Vec::new(),
        })
    }

    fn derived_arrays(&self, problem: &PortfolioProblem) -> Result<Vec<(&'static str, ArrayD<f64>)>> {
        mean_variance_arrays(problem)
    }
}
