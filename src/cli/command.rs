//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::problem::Variant;

/// Lot-aware portfolio selection (MAD and Mean-Variance models)
#[derive(Parser, Debug)]
#[command(name = "lotfolio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and market data, print a summary
    Check,

    /// Write a model in free MPS format without solving it
    ExportMps(ExportArgs),

    /// Write the model's derived arrays as raw binary files
    Dump(DumpArgs),

    /// Build and solve a model with HiGHS
    ///
    /// HiGHS handles the linear MAD models only. Mean-Variance models are
    /// quadratic: write them with `export-mps` and solve them externally.
    Solve(SolveArgs),
}

/// Which model to build: mad-risk-min, mad-return-max, mv-risk-min, mv-return-max.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Model to build
    #[arg(short, long)]
    pub model: Variant,

    /// Override the cardinality limit K
    #[arg(short = 'k', long)]
    pub max_securities: Option<usize>,
}

/// Restrict the loaded dataset before building a model.
#[derive(Args, Debug, Clone, Default)]
pub struct UniverseArgs {
    /// Keep a random subset of this many securities
    #[arg(long)]
    pub subset: Option<usize>,

    /// Seed for --subset
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Keep only the most recent N return periods
    #[arg(long)]
    pub periods: Option<usize>,
}

/// Arguments for the `export-mps` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub universe: UniverseArgs,

    /// Output MPS file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the `dump` subcommand.
#[derive(Args, Debug)]
pub struct DumpArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub universe: UniverseArgs,

    /// Output directory for `<name>.bin` files
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,
}

/// Arguments for the `solve` subcommand.
#[derive(Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub universe: UniverseArgs,

    /// Override the time limit in seconds
    #[arg(long)]
    pub time_limit: Option<f64>,

    /// Override the solver thread count (0 = all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Print solver output and every nonzero holding
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the solution as JSON
    #[arg(long)]
    pub json: bool,
}
