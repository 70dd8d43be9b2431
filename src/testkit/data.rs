//! Market data fixtures.
//!
//! [`three_securities`] is the in-memory dataset most unit tests use. The
//! CSV constants describe a slightly larger, deliberately messy set of
//! sources (unsorted rows and columns, gaps, securities missing from some
//! tables) that aligns to the same three securities.

use std::fs;
use std::io;
use std::path::Path;

use ndarray::array;

use crate::data::{DataSources, MarketDataset};

/// Securities `AAA`, `BBB`, `CCC` with lot size 1.
///
/// Latest close is `[10, 20, 50]`, so with capital 100 the lot-weighted
/// price ratio is `[0.1, 0.2, 0.5]`. Mean returns are `[0.02, 0.01, 0.0]`.
pub fn three_securities() -> MarketDataset {
    build(
        array![1.0, 1.0, 1.0],
        array![[10.0, 20.0, 50.0], [9.0, 21.0, 48.0]],
    )
}

/// Like [`three_securities`] with lot sizes `[10, 1, 100]`.
pub fn three_securities_with_lots() -> MarketDataset {
    build(
        array![10.0, 1.0, 100.0],
        array![[10.0, 20.0, 50.0], [9.0, 21.0, 48.0]],
    )
}

fn build(lot_size: ndarray::Array1<f64>, close: ndarray::Array2<f64>) -> MarketDataset {
    MarketDataset::new(
        vec!["AAA".into(), "BBB".into(), "CCC".into()],
        lot_size,
        close,
        array![[0.01, 0.02, -0.01], [0.03, 0.00, 0.01]],
        array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.02], [0.0, 0.02, 0.16]],
    )
    .expect("fixture dataset is consistent")
}

/// `W` securities named `S00`, `S01`, ... with varied but valid arrays.
pub fn synthetic(w: usize, periods: usize) -> MarketDataset {
    let securities = (0..w).map(|i| format!("S{i:02}")).collect();
    let lot_size = ndarray::Array1::from_shape_fn(w, |i| [1.0, 10.0, 100.0][i % 3]);
    let close = ndarray::Array2::from_shape_fn((2, w), |(d, i)| 5.0 + i as f64 + d as f64 * 0.5);
    let returns = ndarray::Array2::from_shape_fn((periods, w), |(t, i)| {
        0.001 * ((t * 7 + i * 3) % 11) as f64 - 0.004
    });
    let covariance = ndarray::Array2::from_shape_fn((w, w), |(i, j)| {
        if i == j {
            0.01 + 0.001 * i as f64
        } else {
            0.0005
        }
    });
    MarketDataset::new(securities, lot_size, close, returns, covariance)
        .expect("synthetic dataset is consistent")
}

/// Meta: securities as rows, `DDD` has no prices.
pub const META_CSV: &str = "SECID,LOTSIZE,DECIMALS\n\
CCC,1,2\n\
AAA,1,2\n\
BBB,1,2\n\
DDD,10,2\n";

/// Close prices oldest first; `BBB` starts late, `CCC` has a gap.
pub const CLOSE_CSV: &str = "TRADEDATE,BBB,AAA,CCC\n\
2021-03-01,,8,47\n\
2021-03-02,21,9,\n\
2021-03-03,20,10,50\n";

/// Returns with an extra security `EEE` unknown to the other sources.
pub const RETURNS_CSV: &str = "TRADEDATE,CCC,AAA,BBB,EEE\n\
2021-03-02,-0.01,0.01,0.02,0.5\n\
2021-03-03,0.01,0.03,0.00,0.5\n";

/// Covariance labelled on both axes, with `DDD` but without `EEE`.
pub const COVARIANCE_CSV: &str = "SECID,DDD,CCC,BBB,AAA\n\
DDD,1,0,0,0\n\
CCC,0,0.16,0.02,0\n\
BBB,0,0.02,0.09,0.01\n\
AAA,0,0,0.01,0.04\n";

/// Write the CSV fixtures into `dir` and return their locations.
pub fn write_sources(dir: &Path) -> io::Result<DataSources> {
    let sources = DataSources {
        meta: dir.join("meta.csv"),
        close: dir.join("close.csv"),
        returns: dir.join("returns.csv"),
        covariance: dir.join("covariance.csv"),
    };
    fs::write(&sources.meta, META_CSV)?;
    fs::write(&sources.close, CLOSE_CSV)?;
    fs::write(&sources.returns, RETURNS_CSV)?;
    fs::write(&sources.covariance, COVARIANCE_CSV)?;
    Ok(sources)
}

/// A config file pointing at sources written by [`write_sources`] in the same directory.
pub fn config_toml(extra: &str) -> String {
    format!(
        "[logging]\nlevel = \"warn\"\n\n\
         [data]\nmeta = \"meta.csv\"\nclose = \"close.csv\"\n\
         returns = \"returns.csv\"\ncovariance = \"covariance.csv\"\n\n{extra}"
    )
}
