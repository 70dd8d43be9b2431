//! Mean Absolute Deviation models.

use ndarray::{Array1, Array2, ArrayD};

use super::{add_budget, Formulation, PortfolioModel, PortfolioProblem, Variant};
use crate::error::{Error, Result};
use crate::solver::{ConstraintSense, Expr, Model, ObjectiveSense, VarKind, VariableBounds};

/// `gr`, `rbar = rbar_plain ⊙ gr` and `rr = (returns − rbar_plain) ⊙ gr`.
fn derived(problem: &PortfolioProblem) -> (Array1<f64>, Array1<f64>, Array2<f64>) {
    let gr = problem.lot_weighted_price_ratio();
    let plain = problem.expected_return(None);
    let rbar = &plain * &gr;
    let rr = (problem.dataset().returns() - &plain) * &gr;
    (gr, rbar, rr)
}

fn mad_arrays(problem: &PortfolioProblem) -> Vec<(&'static str, ArrayD<f64>)> {
    let (gr, rbar, rr) = derived(problem);
    vec![
        ("gr", gr.into_dyn()),
        ("rbar", rbar.into_dyn()),
        ("rr", rr.into_dyn()),
    ]
}

/// Minimize the summed negative deviations `Σ b` subject to a return floor.
#[derive(Debug, Default, Clone, Copy)]
pub struct MadRiskMinimization;

impl Formulation for MadRiskMinimization {
    fn variant(&self) -> Variant {
        Variant::MadRiskMinimization
    }

    fn build_model(&self, problem: &PortfolioProblem) -> Result<PortfolioModel> {
        let params = problem.parameters();
        let (gr, rbar, rr) = derived(problem);
        let w = problem.universe_size();
        let t = rr.nrows();

        let mut model = Model::new(self.variant().model_name());
        let nl = model.add_vars("nl", w, VarKind::Integer, VariableBounds::non_negative());
        let a = model.add_vars("a", t, VarKind::Continuous, VariableBounds::non_negative());
        let b = model.add_vars("b", t, VarKind::Continuous, VariableBounds::non_negative());

        model.set_objective(ObjectiveSense::Minimize, Expr::sum(&b));

        add_budget(&mut model, &nl, &gr, params);
        model.add_constraint(
            "w_rbar_mu",
            Expr::dot(&nl, rbar.view()),
            ConstraintSense::GreaterEqual,
            params.mu,
        );

        // b_t + rr_t · nl = a_t
        for (period, row) in rr.rows().into_iter().enumerate() {
            let linkage = Expr::term(b.at(period), 1.0)
                + Expr::dot(&nl, row)
                + Expr::term(a.at(period), -1.0);
            model.add_constraint(
                format!("b_r_rbar_w_a[{period}]"),
                linkage,
                ConstraintSense::Equal,
                0.0,
            );
        }

        for (i, &g) in gr.iter().enumerate() {
            model.add_constraint(
                format!("w_p_max[{i}]"),
                Expr::term(nl.at(i), g),
                ConstraintSense::LessEqual,
                params.p_max,
            );
        }

        Ok(PortfolioModel {
            model,
            lots: nl,
            selection: None,
            auxiliary: vec![a, b],
        })
    }

    fn derived_arrays(&self, problem: &PortfolioProblem) -> Result<Vec<(&'static str, ArrayD<f64>)>> {
        Ok(mad_arrays(problem))
    }
}

/// Maximize return under the `gamma_mad` risk limit. No formulation exists;
/// building always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct MadReturnMaximization;

impl Formulation for MadReturnMaximization {
    fn variant(&self) -> Variant {
        Variant::MadReturnMaximization
    }

    fn build_model(&self, _problem: &PortfolioProblem) -> Result<PortfolioModel> {
        Err(Error::NotImplementedVariant {
            variant: self.variant(),
        })
    }

    fn derived_arrays(&self, problem: &PortfolioProblem) -> Result<Vec<(&'static str, ArrayD<f64>)>> {
        Ok(mad_arrays(problem))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::problem::Parameters;
    use crate::solver::VarBlock;
    use crate::testkit::data;
    use approx::assert_relative_eq;

    fn problem(params: Parameters) -> PortfolioProblem {
        PortfolioProblem::new(Arc::new(data::three_securities()), Variant::MadRiskMinimization, params)
            .unwrap()
    }

    fn assignment(built: &PortfolioModel, nl: &[f64], a: &[f64], b: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; built.model.num_vars()];
        let mut place = |block: &VarBlock, xs: &[f64]| {
            for (i, x) in xs.iter().enumerate() {
                values[block.at(i)] = *x;
            }
        };
        place(&built.lots, nl);
        place(&built.auxiliary[0], a);
        place(&built.auxiliary[1], b);
        values
    }

    #[test]
    fn test_model_shape() {
        let built = problem(Parameters::default()).build_model().unwrap();
        let m = &built.model;

        assert_eq!(m.name(), "MAD Risk Minimization");
        // nl[3] + a[2] + b[2]
        assert_eq!(m.num_vars(), 7);
        assert!(!m.is_quadratic());
        assert!(built.selection.is_none());
        assert_eq!(built.auxiliary.len(), 2);

        let names: Vec<&str> = m.constraints().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "w_sum_max",
                "w_sum_min",
                "w_rbar_mu",
                "b_r_rbar_w_a[0]",
                "b_r_rbar_w_a[1]",
                "w_p_max[0]",
                "w_p_max[1]",
                "w_p_max[2]",
            ]
        );
        assert_eq!(m.objective().sense, ObjectiveSense::Minimize);
    }

    #[test]
    fn test_deviation_rows_are_centered_and_scaled() {
        let params = Parameters {
            capital: 100.0,
            ..Parameters::default()
        };
        let p = problem(params);
        let (gr, rbar, rr) = derived(&p);

        assert_relative_eq!(gr, ndarray::array![0.1, 0.2, 0.5], epsilon = 1e-12);
        assert_relative_eq!(rbar, ndarray::array![0.002, 0.002, 0.0], epsilon = 1e-12);
        // (returns - mean) * gr, row by row
        assert_relative_eq!(
            rr,
            ndarray::array![[-0.001, 0.002, -0.005], [0.001, -0.002, 0.005]],
            epsilon = 1e-12
        );
        // Deviations of every security sum to zero over time.
        for col in rr.columns() {
            assert!(col.sum().abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_portfolio_violates_w_sum_min() {
        let params = Parameters {
            w_min: 0.9,
            p_max: 0.5,
            ..Parameters::default()
        };
        let built = problem(params).build_model().unwrap();
        let values = vec![0.0; built.model.num_vars()];

        let violated = built.model.violations(&values, 1e-9);
        assert!(violated.contains(&"w_sum_min".to_string()));
    }

    #[test]
    fn test_deviation_linkage_accepts_split_deviation() {
        let params = Parameters {
            capital: 100.0,
            w_min: 0.0,
            mu: 0.0,
            p_max: 1.0,
            ..Parameters::default()
        };
        let built = problem(params).build_model().unwrap();
        // One lot of the first security: deviations rr[:,0] = [-0.001, 0.001].
        // b_t + dev_t = a_t
        let values = assignment(&built, &[1.0, 0.0, 0.0], &[0.0, 0.001], &[0.001, 0.0]);
        assert!(built.model.violations(&values, 1e-12).is_empty());
        assert_relative_eq!(built.model.objective_value(&values), 0.001, epsilon = 1e-15);

        let broken = assignment(&built, &[1.0, 0.0, 0.0], &[0.0, 0.0], &[0.0, 0.0]);
        let violated = built.model.violations(&broken, 1e-12);
        assert_eq!(violated, vec!["b_r_rbar_w_a[0]", "b_r_rbar_w_a[1]"]);
    }

    #[test]
    fn test_per_security_cap() {
        let params = Parameters {
            capital: 100.0,
            p_max: 0.3,
            w_min: 0.0,
            mu: 0.0,
            ..Parameters::default()
        };
        let built = problem(params).build_model().unwrap();
        // Two lots of the second security: weight 0.4 > 0.3.
        let values = assignment(&built, &[0.0, 2.0, 0.0], &[0.004, 0.0], &[0.0, 0.004]);
        assert_eq!(built.model.violations(&values, 1e-12), vec!["w_p_max[1]"]);
    }

    #[test]
    fn test_return_maximization_is_not_implemented() {
        let p = PortfolioProblem::new(
            Arc::new(data::three_securities()),
            Variant::MadReturnMaximization,
            Parameters::default(),
        )
        .unwrap();

        assert!(matches!(
            p.build_model(),
            Err(Error::NotImplementedVariant {
                variant: Variant::MadReturnMaximization
            })
        ));
    }
}
