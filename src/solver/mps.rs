//! Free-format MPS writer.
//!
//! Quadratic objectives go to `QMATRIX` using the `½ xᵀQx` convention;
//! quadratic constraint rows get a `QCMATRIX` section each, without the ½.
//! Both list the full symmetric matrix.

use std::collections::BTreeMap;
use std::io::{self, Write};

use super::model::{ConstraintSense, Expr, Model, ObjectiveSense, VarKind};

const OBJECTIVE_ROW: &str = "OBJ";

pub(crate) fn write<W: Write>(model: &Model, out: &mut W) -> io::Result<()> {
    let name: String = model
        .name()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    writeln!(out, "NAME {name}")?;

    writeln!(out, "OBJSENSE")?;
    match model.objective().sense {
        ObjectiveSense::Minimize => writeln!(out, "    MIN")?,
        ObjectiveSense::Maximize => writeln!(out, "    MAX")?,
    }

    writeln!(out, "ROWS")?;
    writeln!(out, " N  {OBJECTIVE_ROW}")?;
    for c in model.constraints() {
        let kind = match c.sense {
            ConstraintSense::LessEqual => "L",
            ConstraintSense::GreaterEqual => "G",
            ConstraintSense::Equal => "E",
        };
        writeln!(out, " {kind}  {}", c.name)?;
    }

    // Column-major view of the linear coefficients.
    let mut entries: Vec<Vec<(&str, f64)>> = vec![Vec::new(); model.num_vars()];
    for (col, coef) in merge_linear(&model.objective().expr) {
        entries[col].push((OBJECTIVE_ROW, coef));
    }
    for c in model.constraints() {
        for (col, coef) in merge_linear(&c.expr) {
            entries[col].push((c.name.as_str(), coef));
        }
    }

    writeln!(out, "COLUMNS")?;
    let mut in_integer_block = false;
    let mut marker = 0usize;
    for (var, rows) in model.variables().iter().zip(&entries) {
        let discrete = var.kind.is_discrete();
        if discrete != in_integer_block {
            let tag = if discrete { "INTORG" } else { "INTEND" };
            writeln!(out, "    MARKER{marker}  'MARKER'  '{tag}'")?;
            marker += 1;
            in_integer_block = discrete;
        }
        if rows.is_empty() {
            writeln!(out, "    {}  {OBJECTIVE_ROW}  0", var.name)?;
        }
        for (row, coef) in rows {
            writeln!(out, "    {}  {row}  {coef}", var.name)?;
        }
    }
    if in_integer_block {
        writeln!(out, "    MARKER{marker}  'MARKER'  'INTEND'")?;
    }

    writeln!(out, "RHS")?;
    for c in model.constraints().iter().filter(|c| c.rhs != 0.0) {
        writeln!(out, "    RHS  {}  {}", c.name, c.rhs)?;
    }

    writeln!(out, "BOUNDS")?;
    for var in model.variables() {
        if var.kind == VarKind::Binary {
            writeln!(out, " BV BND  {}", var.name)?;
            continue;
        }
        match var.bounds.lower {
            None => writeln!(out, " MI BND  {}", var.name)?,
            Some(l) if l != 0.0 => writeln!(out, " LO BND  {}  {l}", var.name)?,
            Some(_) => {}
        }
        match var.bounds.upper {
            Some(u) => writeln!(out, " UP BND  {}  {u}", var.name)?,
            None if var.kind == VarKind::Integer => writeln!(out, " PL BND  {}", var.name)?,
            None => {}
        }
    }

    let objective = symmetric(&model.objective().expr, 2.0);
    if !objective.is_empty() {
        writeln!(out, "QMATRIX")?;
        for ((i, j), q) in objective {
            let (a, b) = (&model.variables()[i].name, &model.variables()[j].name);
            writeln!(out, "    {a}  {b}  {q}")?;
        }
    }

    for c in model.constraints().iter().filter(|c| c.expr.is_quadratic()) {
        writeln!(out, "QCMATRIX   {}", c.name)?;
        for ((i, j), q) in symmetric(&c.expr, 1.0) {
            let (a, b) = (&model.variables()[i].name, &model.variables()[j].name);
            writeln!(out, "    {a}  {b}  {q}")?;
        }
    }

    writeln!(out, "ENDATA")?;
    Ok(())
}

fn merge_linear(expr: &Expr) -> BTreeMap<usize, f64> {
    let mut merged = BTreeMap::new();
    for &(col, coef) in &expr.linear {
        *merged.entry(col).or_insert(0.0) += coef;
    }
    merged.retain(|_, c| *c != 0.0);
    merged
}

/// Full symmetric matrix `Q` with `Σ c xᵢxⱼ = (diagonal_factor / 2) xᵀQx`.
fn symmetric(expr: &Expr, diagonal_factor: f64) -> BTreeMap<(usize, usize), f64> {
    let mut q = BTreeMap::new();
    for &(i, j, c) in &expr.quadratic {
        if i == j {
            *q.entry((i, i)).or_insert(0.0) += diagonal_factor * c;
        } else {
            let half = diagonal_factor * c / 2.0;
            *q.entry((i, j)).or_insert(0.0) += half;
            *q.entry((j, i)).or_insert(0.0) += half;
        }
    }
    q.retain(|_, c| *c != 0.0);
    q
}
