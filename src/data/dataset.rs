//! Aligned per-security market arrays.

use std::collections::HashSet;
use std::fmt;

use ndarray::{s, Array1, Array2, Axis};
use rand::seq::index;
use rand::Rng;
use tracing::warn;

use crate::error::{CovarianceStage, DataError, Error, Result};

/// Frobenius-norm tolerance for covariance symmetry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Market data for `W` securities, all arrays sharing one column order.
///
/// Rows of `close` and `returns` are ordered most recent first.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataset {
    securities: Vec<String>,
    lot_size: Array1<f64>,
    close: Array2<f64>,
    returns: Array2<f64>,
    covariance: Array2<f64>,
}

impl MarketDataset {
    /// Validate and assemble a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataInconsistency`] when any array disagrees with the
    /// security count or is empty, and [`Error::AsymmetricCovariance`] when
    /// `‖C − Cᵀ‖ ≥ 1e-9`.
    pub fn new(
        securities: Vec<String>,
        lot_size: Array1<f64>,
        close: Array2<f64>,
        returns: Array2<f64>,
        covariance: Array2<f64>,
    ) -> Result<Self> {
        let w = securities.len();
        if w == 0 {
            return Err(DataError::Empty {
                array: "securities",
            }
            .into());
        }
        let mut seen = HashSet::with_capacity(w);
        if let Some(dup) = securities.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(DataError::DuplicateLabel {
                table: "dataset".into(),
                axis: "security",
                label: dup.clone(),
            }
            .into());
        }

        check_len("lot_size", w, lot_size.len())?;
        if let Some((i, &value)) = lot_size
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(DataError::InvalidLotSize {
                security: securities[i].clone(),
                value,
            }
            .into());
        }

        check_len("close", w, close.ncols())?;
        if close.nrows() == 0 {
            return Err(DataError::Empty { array: "close" }.into());
        }

        check_len("returns", w, returns.ncols())?;
        if returns.nrows() == 0 {
            return Err(DataError::Empty { array: "returns" }.into());
        }

        if covariance.nrows() != w || covariance.ncols() != w {
            return Err(DataError::NotSquare {
                expected: w,
                rows: covariance.nrows(),
                cols: covariance.ncols(),
            }
            .into());
        }
        check_symmetric(&covariance, CovarianceStage::Dataset)?;

        Ok(Self {
            securities,
            lot_size,
            close,
            returns,
            covariance,
        })
    }

    pub fn securities(&self) -> &[String] {
        &self.securities
    }

    pub fn lot_size(&self) -> &Array1<f64> {
        &self.lot_size
    }

    pub fn close(&self) -> &Array2<f64> {
        &self.close
    }

    pub fn returns(&self) -> &Array2<f64> {
        &self.returns
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Number of securities `W`.
    pub fn universe_size(&self) -> usize {
        self.securities.len()
    }

    /// Number of return periods `T`.
    pub fn periods(&self) -> usize {
        self.returns.nrows()
    }

    /// Number of price days `D`.
    pub fn days(&self) -> usize {
        self.close.nrows()
    }

    /// Draw `new_w` securities uniformly at random, keeping their relative order.
    pub fn random_subset<R: Rng + ?Sized>(&self, new_w: usize, rng: &mut R) -> Result<Self> {
        let w = self.universe_size();
        if new_w <= 1 || new_w >= w {
            return Err(DataError::InvalidSubset {
                requested: new_w,
                available: w,
            }
            .into());
        }
        let mut picked = index::sample(rng, w, new_w).into_vec();
        picked.sort_unstable();
        self.take(&picked)
    }

    /// Restrict to the named securities. Unknown names are skipped.
    pub fn select<S: AsRef<str>>(&self, universe: &[S]) -> Result<Self> {
        let wanted: HashSet<&str> = universe.iter().map(AsRef::as_ref).collect();
        let positions: Vec<usize> = (0..self.universe_size())
            .filter(|&i| wanted.contains(self.securities[i].as_str()))
            .collect();

        let known: HashSet<&str> = self.securities.iter().map(String::as_str).collect();
        let unknown: Vec<&str> = wanted.difference(&known).copied().collect();
        if !unknown.is_empty() {
            warn!(count = unknown.len(), unknown = ?unknown, "securities not in dataset, skipped");
        }

        self.take(&positions)
    }

    /// Keep only the `t` most recent return periods.
    pub fn latest_periods(&self, t: usize) -> Result<Self> {
        let available = self.periods();
        if t == 0 || t > available {
            return Err(DataError::InvalidPeriods {
                requested: t,
                available,
            }
            .into());
        }
        Self::new(
            self.securities.clone(),
            self.lot_size.clone(),
            self.close.clone(),
            self.returns.slice(s![..t, ..]).to_owned(),
            self.covariance.clone(),
        )
    }

    /// One-line description of array shapes.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            securities: self.universe_size(),
            days: self.days(),
            periods: self.periods(),
        }
    }

    fn take(&self, positions: &[usize]) -> Result<Self> {
        Self::new(
            positions.iter().map(|&i| self.securities[i].clone()).collect(),
            self.lot_size.select(Axis(0), positions),
            self.close.select(Axis(1), positions),
            self.returns.select(Axis(1), positions),
            self.covariance
                .select(Axis(0), positions)
                .select(Axis(1), positions),
        )
    }
}

/// Shape overview of a [`MarketDataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSummary {
    pub securities: usize,
    pub days: usize,
    pub periods: usize,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "W={} D={} T={} (close {}x{}, returns {}x{}, covariance {}x{})",
            self.securities,
            self.days,
            self.periods,
            self.days,
            self.securities,
            self.periods,
            self.securities,
            self.securities,
            self.securities
        )
    }
}

fn check_len(array: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(DataError::LengthMismatch {
            array,
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}

/// Frobenius norm of `m − mᵀ`.
pub fn asymmetry(m: &Array2<f64>) -> f64 {
    (m - &m.t()).mapv(|d| d * d).sum().sqrt()
}

/// Fail unless `‖m − mᵀ‖ < 1e-9`.
pub fn check_symmetric(m: &Array2<f64>, stage: CovarianceStage) -> Result<()> {
    if !m.is_square() {
        return Err(Error::AsymmetricCovariance {
            stage,
            reason: format!("matrix is {}x{}", m.nrows(), m.ncols()),
        });
    }
    let norm = asymmetry(m);
    // NaN must fail too.
    if !(norm < SYMMETRY_TOLERANCE) {
        return Err(Error::AsymmetricCovariance {
            stage,
            reason: format!("‖C − Cᵀ‖ = {norm:e}"),
        });
    }
    Ok(())
}
