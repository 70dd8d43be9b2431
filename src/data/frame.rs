//! Labelled numeric tables.
//!
//! A [`Frame`] is the small subset of a dataframe the loader needs: a row
//! index, column labels and an `f64` matrix where missing cells are `NaN`.
//! Sources are CSV files whose first header cell names the index and whose
//! first column holds the row labels.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use tracing::debug;

use crate::error::{DataError, Error, Result};

/// Row ordering for [`Frame::sort_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// A labelled `rows x columns` table of floats.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    name: String,
    index: Vec<String>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl Frame {
    /// Build a frame, rejecting duplicate labels and shape disagreements.
    pub fn new(
        name: impl Into<String>,
        index: Vec<String>,
        columns: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if values.nrows() != index.len() {
            return Err(DataError::LengthMismatch {
                array: "frame index",
                expected: values.nrows(),
                actual: index.len(),
            }
            .into());
        }
        if values.ncols() != columns.len() {
            return Err(DataError::LengthMismatch {
                array: "frame columns",
                expected: values.ncols(),
                actual: columns.len(),
            }
            .into());
        }
        if let Some(label) = first_duplicate(&index) {
            return Err(DataError::DuplicateLabel {
                table: name,
                axis: "row",
                label: label.to_string(),
            }
            .into());
        }
        if let Some(label) = first_duplicate(&columns) {
            return Err(DataError::DuplicateLabel {
                table: name,
                axis: "column",
                label: label.to_string(),
            }
            .into());
        }
        Ok(Self {
            name,
            index,
            columns,
            values,
        })
    }

    /// Read a CSV table. Empty and non-numeric cells become `NaN`.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let name = name.into();
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        let width = headers.len();
        if width == 0 {
            return Err(DataError::Empty { array: "header" }.into());
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut index = Vec::new();
        let mut data = Vec::new();
        let mut unparsed = 0usize;
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            if record.len() != width {
                return Err(DataError::RaggedRow {
                    table: name,
                    row,
                    expected: width,
                    actual: record.len(),
                }
                .into());
            }
            index.push(record.get(0).unwrap_or_default().to_string());
            for cell in record.iter().skip(1) {
                let value = parse_cell(cell);
                if value.is_nan() && !cell.is_empty() && !cell.eq_ignore_ascii_case("nan") {
                    unparsed += 1;
                }
                data.push(value);
            }
        }

        if unparsed > 0 {
            debug!(table = %name, unparsed, "non-numeric cells read as missing");
        }

        let values = Array2::from_shape_vec((index.len(), columns.len()), data)
            .map_err(|e| Error::Parse(format!("{name}: {e}")))?;
        Self::new(name, index, columns, values)
    }

    /// Read a CSV table from disk, naming it after the file stem.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(name, File::open(path)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// Swap rows and columns.
    #[must_use]
    pub fn transpose(self) -> Self {
        Self {
            name: self.name,
            index: self.columns,
            columns: self.index,
            values: self.values.t().as_standard_layout().into_owned(),
        }
    }

    /// Sort columns lexicographically by label.
    pub fn sort_columns(&mut self) {
        let order = sorted_positions(&self.columns, Order::Ascending);
        self.values = self.values.select(Axis(1), &order);
        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
    }

    /// Sort rows by label.
    pub fn sort_index(&mut self, order: Order) {
        let positions = sorted_positions(&self.index, order);
        self.values = self.values.select(Axis(0), &positions);
        self.index = positions.iter().map(|&i| self.index[i].clone()).collect();
    }

    /// Replace missing cells of the first row with `value`.
    pub fn fill_first_row(&mut self, value: f64) {
        if let Some(mut first) = self.values.axis_iter_mut(Axis(0)).next() {
            first.mapv_inplace(|v| if v.is_nan() { value } else { v });
        }
    }

    /// Carry the last known value of each column down over missing cells.
    pub fn forward_fill(&mut self) {
        for mut column in self.values.axis_iter_mut(Axis(1)) {
            let mut last = None;
            for cell in column.iter_mut() {
                if cell.is_nan() {
                    if let Some(previous) = last {
                        *cell = previous;
                    }
                } else {
                    last = Some(*cell);
                }
            }
        }
    }

    /// Drop every column whose label is not in `keep`. Returns the number dropped.
    pub fn retain_columns(&mut self, keep: &BTreeSet<String>) -> usize {
        let positions: Vec<usize> = (0..self.columns.len())
            .filter(|&i| keep.contains(&self.columns[i]))
            .collect();
        let dropped = self.columns.len() - positions.len();
        self.values = self.values.select(Axis(1), &positions);
        self.columns = positions.iter().map(|&i| self.columns[i].clone()).collect();
        dropped
    }

    /// Drop every row whose label is not in `keep`. Returns the number dropped.
    pub fn retain_index(&mut self, keep: &BTreeSet<String>) -> usize {
        let positions: Vec<usize> = (0..self.index.len())
            .filter(|&i| keep.contains(&self.index[i]))
            .collect();
        let dropped = self.index.len() - positions.len();
        self.values = self.values.select(Axis(0), &positions);
        self.index = positions.iter().map(|&i| self.index[i].clone()).collect();
        dropped
    }

    pub fn row(&self, label: &str) -> Option<ArrayView1<'_, f64>> {
        self.index
            .iter()
            .position(|l| l == label)
            .map(|i| self.values.row(i))
    }

    /// Square with index equal to columns and exactly equal mirrored cells.
    pub fn is_symmetric(&self) -> bool {
        self.index == self.columns
            && self.values.is_square()
            && self.values == self.values.t()
    }

    /// Count of `NaN` cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

fn parse_cell(cell: &str) -> f64 {
    if cell.is_empty() {
        return f64::NAN;
    }
    cell.parse::<f64>().unwrap_or(f64::NAN)
}

fn sorted_positions(labels: &[String], order: Order) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..labels.len()).collect();
    match order {
        Order::Ascending => positions.sort_by(|&a, &b| labels[a].cmp(&labels[b])),
        Order::Descending => positions.sort_by(|&a, &b| labels[b].cmp(&labels[a])),
    }
    positions
}

fn first_duplicate(labels: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(labels.len());
    labels
        .iter()
        .find(|label| !seen.insert(label.as_str()))
        .map(String::as_str)
}
