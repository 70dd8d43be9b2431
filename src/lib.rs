//! Lotfolio - lot-aware portfolio selection from aligned market data.
//!
//! This crate reconciles four market data sources into one validated dataset
//! and builds integer portfolio models over it: Mean Absolute Deviation and
//! Mean-Variance, each as risk minimization or return maximization. Models
//! are solver-neutral; a pluggable solver backend optimizes them.
//!
//! # Architecture
//!
//! - **`data`** - CSV sources, alignment and the immutable [`data::MarketDataset`]
//! - **`problem`** - Derived quantities, the four formulations and solution extraction
//! - **`solver`** - Solver port, model representation, MPS export
//!   - `HighsSolver` - Open-source HiGHS via good_lp (linear models)
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`data`] - Market data loading and validation
//! - [`problem`] - Portfolio problems and their formulations
//! - [`solver`] - Solver abstraction and models
//! - [`error`] - Error types for the crate
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lotfolio::data::{DataSources, DatasetLoader};
//! use lotfolio::problem::{Parameters, PortfolioProblem, Variant};
//! use lotfolio::solver::{HighsSolver, SolveOptions};
//!
//! # fn main() -> lotfolio::error::Result<()> {
//! let sources = DataSources {
//!     meta: "meta.csv".into(),
//!     close: "close.csv".into(),
//!     returns: "returns.csv".into(),
//!     covariance: "covariance.csv".into(),
//! };
//! let dataset = Arc::new(DatasetLoader::new().load(&sources)?);
//! let mut problem =
//!     PortfolioProblem::new(dataset, Variant::MadRiskMinimization, Parameters::default())?;
//! let solution = problem.solve(&HighsSolver::new(), &SolveOptions::default())?;
//! println!("{}", solution.status);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod problem;
pub mod solver;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
