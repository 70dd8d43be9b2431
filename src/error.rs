use std::fmt;

use thiserror::Error;

use crate::problem::Variant;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Shape, length and label problems among the arrays of a dataset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("{array} is empty")]
    Empty { array: &'static str },

    #[error("{array} has {actual} securities, expected {expected}")]
    LengthMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("covariance must be {expected}x{expected}, got {rows}x{cols}")]
    NotSquare {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("duplicate {axis} label '{label}' in {table}")]
    DuplicateLabel {
        table: String,
        axis: &'static str,
        label: String,
    },

    #[error("lot size for '{security}' must be positive and finite, got {value}")]
    InvalidLotSize { security: String, value: f64 },

    #[error("{table} has no '{row}' row")]
    MissingRow { table: String, row: String },

    #[error("{table} row {row} has {actual} cells, header has {expected}")]
    RaggedRow {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("subset size {requested} must be in (1, {available})")]
    InvalidSubset { requested: usize, available: usize },

    #[error("period count {requested} must be in [1, {available}]")]
    InvalidPeriods { requested: usize, available: usize },
}

/// Post-intersection disagreement between sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("sources share no securities")]
    EmptyIntersection,

    #[error("{table} columns differ from meta columns after intersection")]
    ColumnMismatch { table: &'static str },
}

/// Where a covariance symmetry check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceStage {
    /// As read from the source, before any reordering.
    Source,
    /// After sorting both axes.
    Sorted,
    /// After restricting to the security intersection.
    Aligned,
    /// On dataset construction.
    Dataset,
    /// After scaling by the lot-weighted price ratio.
    Scaled,
}

impl fmt::Display for CovarianceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Sorted => write!(f, "sorted"),
            Self::Aligned => write!(f, "aligned"),
            Self::Dataset => write!(f, "dataset"),
            Self::Scaled => write!(f, "scaled"),
        }
    }
}

/// Errors raised by solver backends.
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    #[error("{solver} cannot solve this model: {reason}")]
    Unsupported {
        solver: &'static str,
        reason: String,
    },

    #[error("solution has {actual} values, model has {expected} variables")]
    ValueCount { expected: usize, actual: usize },

    #[error("solver backend failure: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data inconsistency: {0}")]
    DataInconsistency(#[from] DataError),

    #[error("alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("asymmetric covariance ({stage}): {reason}")]
    AsymmetricCovariance {
        stage: CovarianceStage,
        reason: String,
    },

    #[error("{variable} deviates from the nearest integers by {deviation:e}")]
    IntegralityTolerance {
        variable: String,
        deviation: f64,
    },

    #[error("{variant} has no model formulation")]
    NotImplementedVariant { variant: Variant },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
