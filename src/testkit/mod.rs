//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`data`] - Small market datasets and matching CSV sources.
//! - [`solver`] - Scripted [`Solver`](crate::solver::Solver) implementations.

pub mod data;
pub mod solver;
