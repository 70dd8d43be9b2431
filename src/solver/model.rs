//! Solver-neutral optimization models.
//!
//! A [`Model`] holds typed variable blocks, a linear or quadratic objective
//! and named linear or quadratic constraints. Backends translate it into
//! their own representation; [`Model::write_mps`] serializes it for offline
//! runs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{Add, Range};
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Continuous,
    Integer,
    Binary,
}

impl VarKind {
    /// Integer or binary.
    pub fn is_discrete(self) -> bool {
        !matches!(self, Self::Continuous)
    }
}

/// Bounds on a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableBounds {
    /// Lower bound (None = -infinity).
    pub lower: Option<f64>,
    /// Upper bound (None = +infinity).
    pub upper: Option<f64>,
}

impl Default for VariableBounds {
    fn default() -> Self {
        Self {
            lower: Some(0.0),
            upper: None,
        }
    }
}

impl VariableBounds {
    /// Binary variable bounds [0, 1].
    #[must_use]
    pub const fn binary() -> Self {
        Self {
            lower: Some(0.0),
            upper: Some(1.0),
        }
    }

    /// Free variable (no bounds).
    #[must_use]
    pub const fn free() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// Non-negative variable [0, +inf).
    #[must_use]
    pub fn non_negative() -> Self {
        Self::default()
    }

    /// Bounded variable [lower, upper].
    #[must_use]
    pub const fn bounded(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    fn contains(&self, value: f64, tolerance: f64) -> bool {
        self.lower.map_or(true, |l| value >= l - tolerance)
            && self.upper.map_or(true, |u| value <= u + tolerance)
    }
}

/// A single decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub bounds: VariableBounds,
}

/// A contiguous run of variables added together, e.g. `nl[0..W]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBlock {
    name: String,
    start: usize,
    len: usize,
}

impl VarBlock {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Column of element `i` in the model.
    pub fn at(&self, i: usize) -> usize {
        debug_assert!(i < self.len);
        self.start + i
    }

    pub fn columns(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    /// This block's slice of a full assignment.
    pub fn slice<'a>(&self, values: &'a [f64]) -> Option<&'a [f64]> {
        values.get(self.columns())
    }
}

/// `Σ cᵢ xᵢ + Σ c_ij xᵢ xⱼ` over model columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expr {
    pub linear: Vec<(usize, f64)>,
    pub quadratic: Vec<(usize, usize, f64)>,
}

impl Expr {
    pub fn new() -> Self {
        Self::default()
    }

    /// `coef * x`.
    pub fn term(column: usize, coef: f64) -> Self {
        Self {
            linear: vec![(column, coef)],
            quadratic: Vec::new(),
        }
    }

    /// `Σ xᵢ` over a block.
    pub fn sum(block: &VarBlock) -> Self {
        Self {
            linear: block.columns().map(|c| (c, 1.0)).collect(),
            quadratic: Vec::new(),
        }
    }

    /// `coeffs · x` over a block. Zero coefficients are omitted.
    pub fn dot(block: &VarBlock, coeffs: ArrayView1<'_, f64>) -> Self {
        debug_assert_eq!(block.len(), coeffs.len());
        Self {
            linear: coeffs
                .iter()
                .enumerate()
                .filter(|(_, c)| **c != 0.0)
                .map(|(i, &c)| (block.at(i), c))
                .collect(),
            quadratic: Vec::new(),
        }
    }

    /// `xᵀ M x` over a block. Zero entries are omitted.
    pub fn quad_form(block: &VarBlock, matrix: &Array2<f64>) -> Self {
        debug_assert_eq!(matrix.dim(), (block.len(), block.len()));
        Self {
            linear: Vec::new(),
            quadratic: matrix
                .indexed_iter()
                .filter(|(_, c)| **c != 0.0)
                .map(|((i, j), &c)| (block.at(i), block.at(j), c))
                .collect(),
        }
    }

    /// Multiply every coefficient by `factor`.
    #[must_use]
    pub fn scaled(mut self, factor: f64) -> Self {
        self.linear.iter_mut().for_each(|(_, c)| *c *= factor);
        self.quadratic.iter_mut().for_each(|(_, _, c)| *c *= factor);
        self
    }

    pub fn is_quadratic(&self) -> bool {
        !self.quadratic.is_empty()
    }

    /// Value of the expression at a full assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let linear: f64 = self.linear.iter().map(|&(i, c)| c * values[i]).sum();
        let quadratic: f64 = self
            .quadratic
            .iter()
            .map(|&(i, j, c)| c * values[i] * values[j])
            .sum();
        linear + quadratic
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(mut self, rhs: Expr) -> Expr {
        self.linear.extend(rhs.linear);
        self.quadratic.extend(rhs.quadratic);
        self
    }
}

/// Constraint sense (comparison operator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintSense {
    /// Greater than or equal (>=).
    GreaterEqual,
    /// Less than or equal (<=).
    LessEqual,
    /// Equal (=).
    Equal,
}

/// A named constraint: `expr {>=, <=, =} rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: Expr,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            ConstraintSense::LessEqual => lhs <= self.rhs + tolerance,
            ConstraintSense::GreaterEqual => lhs >= self.rhs - tolerance,
            ConstraintSense::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expr: Expr,
}

/// An optimization model ready to hand to a [`Solver`](super::Solver).
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    variables: Vec<Variable>,
    objective: Objective,
    constraints: Vec<Constraint>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            objective: Objective::default(),
            constraints: Vec::new(),
        }
    }

    /// Add `len` variables named `name[i]`.
    pub fn add_vars(
        &mut self,
        name: &str,
        len: usize,
        kind: VarKind,
        bounds: VariableBounds,
    ) -> VarBlock {
        let bounds = match kind {
            VarKind::Binary => VariableBounds::binary(),
            _ => bounds,
        };
        let start = self.variables.len();
        self.variables.extend((0..len).map(|i| Variable {
            name: format!("{name}[{i}]"),
            kind,
            bounds,
        }));
        VarBlock {
            name: name.to_string(),
            start,
            len,
        }
    }

    pub fn set_objective(&mut self, sense: ObjectiveSense, expr: Expr) {
        self.objective = Objective { sense, expr };
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: Expr,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Whether the objective or any constraint has quadratic terms.
    pub fn is_quadratic(&self) -> bool {
        self.objective.expr.is_quadratic() || self.constraints.iter().any(|c| c.expr.is_quadratic())
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.expr.evaluate(values)
    }

    /// Names of constraints, bounds and integrality requirements that
    /// `values` violates by more than `tolerance`.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<String> {
        let mut violated = Vec::new();
        for (var, &value) in self.variables.iter().zip(values) {
            if !var.bounds.contains(value, tolerance) {
                violated.push(format!("{} bounds", var.name));
            }
            if var.kind.is_discrete() && (value - value.round()).abs() > tolerance {
                violated.push(format!("{} integrality", var.name));
            }
        }
        violated.extend(
            self.constraints
                .iter()
                .filter(|c| !c.is_satisfied(values, tolerance))
                .map(|c| c.name.clone()),
        );
        violated
    }

    /// Serialize in free MPS format.
    pub fn write_mps<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        super::mps::write(self, &mut out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn model() -> (Model, VarBlock, VarBlock) {
        let mut m = Model::new("test");
        let x = m.add_vars("x", 2, VarKind::Integer, VariableBounds::non_negative());
        let y = m.add_vars("y", 2, VarKind::Binary, VariableBounds::free());
        (m, x, y)
    }

    #[test]
    fn test_blocks_are_contiguous() {
        let (m, x, y) = model();
        assert_eq!(x.columns(), 0..2);
        assert_eq!(y.columns(), 2..4);
        assert_eq!(m.variables()[3].name, "y[1]");
        assert_eq!(m.variables()[3].bounds, VariableBounds::binary());
    }

    #[test]
    fn test_dot_skips_zero_coefficients() {
        let (_, x, _) = model();
        let e = Expr::dot(&x, array![0.0, 2.5].view());
        assert_eq!(e.linear, vec![(1, 2.5)]);
    }

    #[test]
    fn test_quadratic_evaluation() {
        let (_, x, _) = model();
        let e = Expr::quad_form(&x, &array![[1.0, 0.5], [0.5, 2.0]]);
        // 1*1*1 + 2*(0.5*1*2) + 2*2*2
        assert_eq!(e.evaluate(&[1.0, 2.0, 0.0, 0.0]), 11.0);
        assert!(e.is_quadratic());
    }

    #[test]
    fn test_violations_name_the_broken_rows() {
        let (mut m, x, y) = model();
        m.add_constraint("cap", Expr::sum(&x), ConstraintSense::LessEqual, 3.0);
        m.add_constraint("pick", Expr::sum(&y), ConstraintSense::Equal, 1.0);

        assert!(m.violations(&[1.0, 2.0, 1.0, 0.0], 1e-9).is_empty());

        let broken = m.violations(&[2.0, 2.5, 1.0, 1.0], 1e-9);
        assert_eq!(broken, vec!["x[1] integrality", "cap", "pick"]);

        let negative = m.violations(&[-1.0, 0.0, 1.0, 0.0], 1e-9);
        assert_eq!(negative, vec!["x[0] bounds"]);
    }

    #[test]
    fn test_scaled_and_added() {
        let (_, x, y) = model();
        let e = Expr::sum(&x).scaled(2.0) + Expr::term(y.at(0), -1.0);
        assert_eq!(e.evaluate(&[1.0, 1.0, 1.0, 0.0]), 3.0);
    }
}
