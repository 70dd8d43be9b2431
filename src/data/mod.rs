//! Market data: tabular sources, alignment and the validated dataset.

mod dataset;
pub mod dump;
mod frame;
mod loader;

pub use dataset::{asymmetry, check_symmetric, DatasetSummary, MarketDataset, SYMMETRY_TOLERANCE};
pub use frame::{Frame, Order};
pub use loader::{DataSources, DatasetLoader, LOT_SIZE_ROW};
