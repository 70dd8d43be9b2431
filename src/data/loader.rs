//! Reconciles the four market data sources into one [`MarketDataset`].
//!
//! The sources disagree about which securities they cover. Loading sorts
//! every table into a canonical order, intersects the security columns and
//! drops the rest, so that the same files always produce bit-identical arrays.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::dataset::MarketDataset;
use super::frame::{Frame, Order};
use crate::error::{AlignmentError, CovarianceStage, DataError, Error, Result};

/// Meta row holding the lot multiplier per security.
pub const LOT_SIZE_ROW: &str = "LOTSIZE";

/// Locations of the four CSV sources.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct DataSources {
    /// Securities as rows, attributes (including `LOTSIZE`) as columns.
    pub meta: PathBuf,
    /// Close prices, dates as rows.
    pub close: PathBuf,
    /// Periodic returns, periods as rows.
    pub returns: PathBuf,
    /// Square covariance table labelled by security on both axes.
    pub covariance: PathBuf,
}

/// Builds datasets from tabular sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetLoader;

impl DatasetLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load the four CSV files named by `sources`.
    pub fn load(&self, sources: &DataSources) -> Result<MarketDataset> {
        info!(
            meta = %sources.meta.display(),
            close = %sources.close.display(),
            returns = %sources.returns.display(),
            covariance = %sources.covariance.display(),
            "loading market data"
        );
        self.load_paths(
            &sources.meta,
            &sources.close,
            &sources.returns,
            &sources.covariance,
        )
    }

    pub fn load_paths(
        &self,
        meta: &Path,
        close: &Path,
        returns: &Path,
        covariance: &Path,
    ) -> Result<MarketDataset> {
        self.align(
            Frame::from_path(meta)?,
            Frame::from_path(close)?,
            Frame::from_path(returns)?,
            Frame::from_path(covariance)?,
        )
    }

    pub fn load_readers<M, C, R, V>(
        &self,
        meta: M,
        close: C,
        returns: R,
        covariance: V,
    ) -> Result<MarketDataset>
    where
        M: Read,
        C: Read,
        R: Read,
        V: Read,
    {
        self.align(
            Frame::from_reader("meta", meta)?,
            Frame::from_reader("close", close)?,
            Frame::from_reader("returns", returns)?,
            Frame::from_reader("covariance", covariance)?,
        )
    }

    /// Canonicalize, intersect and validate already-parsed tables.
    pub fn align(
        &self,
        meta: Frame,
        mut close: Frame,
        mut returns: Frame,
        mut covariance: Frame,
    ) -> Result<MarketDataset> {
        let mut meta = meta.transpose();
        meta.sort_columns();

        // Fill runs in file (chronological) order, before rows are reversed.
        close.fill_first_row(0.0);
        close.forward_fill();
        close.sort_index(Order::Descending);
        close.sort_columns();

        returns.sort_index(Order::Descending);
        returns.sort_columns();
        let missing = returns.missing_count();
        if missing > 0 {
            warn!(missing, "returns contain missing cells");
        }

        ensure_symmetric(&covariance, CovarianceStage::Source)?;
        covariance.sort_index(Order::Ascending);
        covariance.sort_columns();
        ensure_symmetric(&covariance, CovarianceStage::Sorted)?;

        let shares = intersection([&meta, &close, &returns, &covariance]);
        info!(shares = shares.len(), "security intersection");
        if shares.is_empty() {
            return Err(AlignmentError::EmptyIntersection.into());
        }

        drop_unused(&mut meta, &shares, false);
        drop_unused(&mut close, &shares, false);
        ensure_same_columns(&meta, &close, "close")?;
        drop_unused(&mut returns, &shares, false);
        ensure_same_columns(&meta, &returns, "returns")?;
        drop_unused(&mut covariance, &shares, true);
        ensure_same_columns(&meta, &covariance, "covariance")?;
        ensure_symmetric(&covariance, CovarianceStage::Aligned)?;

        let lot_size = meta
            .row(LOT_SIZE_ROW)
            .ok_or_else(|| DataError::MissingRow {
                table: meta.name().to_string(),
                row: LOT_SIZE_ROW.to_string(),
            })?
            .to_owned();

        let dataset = MarketDataset::new(
            meta.columns().to_vec(),
            lot_size,
            close.into_values(),
            returns.into_values(),
            covariance.into_values(),
        )?;
        info!(summary = %dataset.summary(), "market data aligned");
        Ok(dataset)
    }
}

fn intersection(frames: [&Frame; 4]) -> BTreeSet<String> {
    let mut shares: BTreeSet<String> = frames[0].columns().iter().cloned().collect();
    for frame in &frames[1..] {
        let columns: BTreeSet<&String> = frame.columns().iter().collect();
        shares.retain(|s| columns.contains(s));
    }
    shares
}

fn drop_unused(frame: &mut Frame, shares: &BTreeSet<String>, drop_index: bool) {
    let dropped = frame.retain_columns(shares);
    if drop_index {
        frame.retain_index(shares);
    }
    debug!(table = frame.name(), dropped, "dropped unused securities");
}

fn ensure_same_columns(meta: &Frame, other: &Frame, table: &'static str) -> Result<()> {
    if meta.columns() != other.columns() {
        return Err(AlignmentError::ColumnMismatch { table }.into());
    }
    Ok(())
}

fn ensure_symmetric(covariance: &Frame, stage: CovarianceStage) -> Result<()> {
    if covariance.is_symmetric() {
        return Ok(());
    }
    let reason = if covariance.index() != covariance.columns() {
        "index labels differ from column labels".to_string()
    } else {
        "matrix is not exactly symmetric".to_string()
    };
    Err(Error::AsymmetricCovariance { stage, reason })
}
